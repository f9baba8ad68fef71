//! Database user resource and data sources against a mock Atlas

#![allow(clippy::disallowed_methods)]

mod common;

use common::{api_path, configured_server, decode, encode, not_found_body, PROJECT, TOKEN};
use mockito::{Matcher, Server};
use tfplug::types::{AttributePath, Dynamic};

const USER_BODY: &str = r#"{
    "groupId": "5d0f1f73cf09a29120e173cf",
    "databaseName": "admin",
    "username": "app",
    "description": "orders service",
    "x509Type": "NONE",
    "roles": [{"roleName": "readWrite", "databaseName": "orders"}],
    "labels": [],
    "scopes": [{"name": "orders-cluster", "type": "CLUSTER"}]
}"#;

fn planned_user() -> Dynamic {
    Dynamic::object([
        ("id", Dynamic::Null),
        ("project_id", Dynamic::String(PROJECT.into())),
        ("auth_database_name", Dynamic::String("admin".into())),
        ("username", Dynamic::String("app".into())),
        ("password", Dynamic::String("s3cret".into())),
        ("description", Dynamic::String("orders service".into())),
        (
            "roles",
            Dynamic::List(vec![Dynamic::object([
                ("role_name", Dynamic::String("readWrite".into())),
                ("database_name", Dynamic::String("orders".into())),
                ("collection_name", Dynamic::Null),
            ])]),
        ),
        (
            "scopes",
            Dynamic::List(vec![Dynamic::object([
                ("name", Dynamic::String("orders-cluster".into())),
                ("type", Dynamic::String("CLUSTER".into())),
            ])]),
        ),
    ])
}

#[tokio::test(flavor = "multi_thread")]
async fn create_sends_user_and_keeps_password() {
    let mut atlas = Server::new_async().await;
    let create = atlas
        .mock("POST", api_path("/databaseUsers").as_str())
        .match_header("authorization", format!("Bearer {}", TOKEN).as_str())
        .match_body(Matcher::PartialJsonString(
            r#"{"username":"app","databaseName":"admin","password":"s3cret"}"#.to_string(),
        ))
        .with_status(201)
        .with_body(USER_BODY)
        .create_async()
        .await;

    let server = configured_server(&atlas.url()).await;
    let planned = encode(planned_user());
    let applied = server
        .apply_resource_change("mongodbatlas_database_user", &[], &planned, &planned)
        .await;

    create.assert_async().await;
    assert!(applied.diagnostics.is_empty(), "{:?}", applied.diagnostics);
    let state = decode(&applied.new_state);
    assert_eq!(state.get_string(&AttributePath::new("password")).unwrap(), "s3cret");
    assert_eq!(
        state
            .get_string(&AttributePath::new("roles").index(0).attribute("role_name"))
            .unwrap(),
        "readWrite"
    );
    assert_eq!(state.get_string(&AttributePath::new("aws_iam_type")).unwrap(), "NONE");
}

#[tokio::test(flavor = "multi_thread")]
async fn read_of_deleted_user_clears_state() {
    let mut atlas = Server::new_async().await;
    let _get = atlas
        .mock("GET", api_path("/databaseUsers/admin/app").as_str())
        .with_status(404)
        .with_body(not_found_body())
        .create_async()
        .await;

    let server = configured_server(&atlas.url()).await;
    let read = server
        .read_resource("mongodbatlas_database_user", &encode(planned_user()))
        .await;

    assert!(read.diagnostics.is_empty(), "{:?}", read.diagnostics);
    assert!(read.new_state.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn import_by_dashed_id() {
    let mut atlas = Server::new_async().await;
    let _get = atlas
        .mock("GET", api_path("/databaseUsers/admin/app").as_str())
        .with_body(USER_BODY)
        .create_async()
        .await;

    let server = configured_server(&atlas.url()).await;
    let imported = server
        .import_resource_state("mongodbatlas_database_user", &format!("{}-app-admin", PROJECT))
        .await;

    assert!(imported.diagnostics.is_empty(), "{:?}", imported.diagnostics);
    assert_eq!(imported.imported_resources.len(), 1);
    let state = decode(&imported.imported_resources[0].state);
    assert_eq!(state.get_string(&AttributePath::new("username")).unwrap(), "app");
    assert_eq!(state.get_string(&AttributePath::new("project_id")).unwrap(), PROJECT);
    assert!(state.get(&AttributePath::new("password")).is_null());
}

#[tokio::test(flavor = "multi_thread")]
async fn import_rejects_malformed_id() {
    let atlas = Server::new_async().await;
    let server = configured_server(&atlas.url()).await;

    let imported = server
        .import_resource_state("mongodbatlas_database_user", "not-an-id")
        .await;

    assert!(imported.imported_resources.is_empty());
    assert!(imported.diagnostics[0].detail.contains("{project_id}-{username}-{auth_database_name}"));
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_tolerates_missing_user() {
    let mut atlas = Server::new_async().await;
    let delete = atlas
        .mock("DELETE", api_path("/databaseUsers/admin/app").as_str())
        .with_status(404)
        .with_body(not_found_body())
        .create_async()
        .await;

    let server = configured_server(&atlas.url()).await;
    let applied = server
        .apply_resource_change("mongodbatlas_database_user", &encode(planned_user()), &[], &[])
        .await;

    delete.assert_async().await;
    assert!(applied.diagnostics.is_empty(), "{:?}", applied.diagnostics);
    assert!(applied.new_state.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn single_user_data_source_reports_missing_user() {
    let mut atlas = Server::new_async().await;
    let _get = atlas
        .mock("GET", api_path("/databaseUsers/admin/ghost").as_str())
        .with_status(404)
        .with_body(not_found_body())
        .create_async()
        .await;

    let server = configured_server(&atlas.url()).await;
    let read = server
        .read_data_source(
            "mongodbatlas_database_user",
            &encode(Dynamic::object([
                ("project_id", Dynamic::String(PROJECT.into())),
                ("username", Dynamic::String("ghost".into())),
                ("auth_database_name", Dynamic::String("admin".into())),
            ])),
        )
        .await;

    assert!(read.state.is_empty());
    assert_eq!(read.diagnostics[0].summary, "database user not found");
}

#[tokio::test(flavor = "multi_thread")]
async fn users_data_source_walks_every_page() {
    let mut atlas = Server::new_async().await;
    let page = |n: &str| {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("pageNum".into(), n.into()),
            Matcher::UrlEncoded("itemsPerPage".into(), "500".into()),
        ])
    };
    let first = atlas
        .mock("GET", api_path("/databaseUsers").as_str())
        .match_query(page("1"))
        .with_body(format!(r#"{{"results":[{}],"totalCount":2}}"#, USER_BODY))
        .create_async()
        .await;
    let second = atlas
        .mock("GET", api_path("/databaseUsers").as_str())
        .match_query(page("2"))
        .with_body(
            format!(r#"{{"results":[{}],"totalCount":2}}"#, USER_BODY)
                .replace(r#""username": "app""#, r#""username": "reporting""#),
        )
        .create_async()
        .await;

    let server = configured_server(&atlas.url()).await;
    let read = server
        .read_data_source(
            "mongodbatlas_database_users",
            &encode(Dynamic::object([("project_id", Dynamic::String(PROJECT.into()))])),
        )
        .await;

    first.assert_async().await;
    second.assert_async().await;
    assert!(read.diagnostics.is_empty(), "{:?}", read.diagnostics);
    let state = decode(&read.state);
    assert_eq!(state.get_number(&AttributePath::new("total_count")).unwrap(), 2.0);
    assert_eq!(
        state
            .get_string(&AttributePath::new("results").index(1).attribute("username"))
            .unwrap(),
        "reporting"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn users_data_source_reads_one_requested_page() {
    let mut atlas = Server::new_async().await;
    let page = atlas
        .mock("GET", api_path("/databaseUsers").as_str())
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("pageNum".into(), "3".into()),
            Matcher::UrlEncoded("itemsPerPage".into(), "1".into()),
        ]))
        .with_body(format!(r#"{{"results":[{}],"totalCount":12}}"#, USER_BODY))
        .expect(1)
        .create_async()
        .await;

    let server = configured_server(&atlas.url()).await;
    let read = server
        .read_data_source(
            "mongodbatlas_database_users",
            &encode(Dynamic::object([
                ("project_id", Dynamic::String(PROJECT.into())),
                ("page_num", Dynamic::Number(3.0)),
                ("items_per_page", Dynamic::Number(1.0)),
            ])),
        )
        .await;

    page.assert_async().await;
    let state = decode(&read.state);
    assert_eq!(state.get_number(&AttributePath::new("total_count")).unwrap(), 12.0);
    assert_eq!(state.get_number(&AttributePath::new("page_num")).unwrap(), 3.0);
}
