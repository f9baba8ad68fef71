//! Cloud backup snapshot resource and data sources against a mock Atlas

#![allow(clippy::disallowed_methods)]

mod common;

use common::{api_path, configured_server, decode, encode, not_found_body, PROJECT};
use mockito::{Matcher, Server};
use tfplug::types::{AttributePath, Dynamic};

const SNAPSHOT_ID: &str = "5d1285acd5ec13b6c2d1726a";
const CLUSTER: &str = "orders-cluster";

fn snapshots_path(rest: &str) -> String {
    api_path(&format!("/clusters/{}/backup/snapshots{}", CLUSTER, rest))
}

fn snapshot_body(kind: &str) -> String {
    format!(
        r#"{{
            "id": "{SNAPSHOT_ID}",
            "cloudProvider": "AWS",
            "createdAt": "2024-05-01T10:00:00Z",
            "description": "before migration",
            "expiresAt": "2024-05-08T10:00:00Z",
            "mongodVersion": "7.0.8",
            "snapshotType": "onDemand",
            "status": "completed",
            "storageSizeBytes": 1048576,
            "type": "{kind}"
        }}"#
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn import_merges_sharded_detail() {
    let mut atlas = Server::new_async().await;
    let _get = atlas
        .mock("GET", snapshots_path(&format!("/{}", SNAPSHOT_ID)).as_str())
        .with_body(snapshot_body("shardedCluster"))
        .create_async()
        .await;
    let sharded = atlas
        .mock(
            "GET",
            snapshots_path(&format!("/shardedCluster/{}", SNAPSHOT_ID)).as_str(),
        )
        .with_body(
            r#"{
                "id": "5d1285acd5ec13b6c2d1726a",
                "members": [
                    {"cloudProvider": "AWS", "id": "m1", "replicaSetName": "shard-0"},
                    {"cloudProvider": "AWS", "id": "m2", "replicaSetName": "shard-1"}
                ],
                "snapshotIds": ["s0", "s1"]
            }"#,
        )
        .create_async()
        .await;

    let server = configured_server(&atlas.url()).await;
    let imported = server
        .import_resource_state(
            "mongodbatlas_cloud_backup_snapshot",
            &format!("{}-{}-{}", PROJECT, CLUSTER, SNAPSHOT_ID),
        )
        .await;

    sharded.assert_async().await;
    assert!(imported.diagnostics.is_empty(), "{:?}", imported.diagnostics);
    let state = decode(&imported.imported_resources[0].state);
    assert_eq!(state.get_string(&AttributePath::new("cluster_name")).unwrap(), CLUSTER);
    assert_eq!(state.get_string(&AttributePath::new("snapshot_id")).unwrap(), SNAPSHOT_ID);
    assert_eq!(
        state
            .get_string(&AttributePath::new("members").index(1).attribute("replica_set_name"))
            .unwrap(),
        "shard-1"
    );
    assert_eq!(
        state.get_string_list(&AttributePath::new("snapshot_ids")).unwrap(),
        vec!["s0".to_string(), "s1".to_string()]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn sharded_lookup_failure_keeps_snapshot() {
    let mut atlas = Server::new_async().await;
    let _get = atlas
        .mock("GET", snapshots_path(&format!("/{}", SNAPSHOT_ID)).as_str())
        .with_body(snapshot_body("shardedCluster"))
        .create_async()
        .await;
    let _sharded = atlas
        .mock(
            "GET",
            snapshots_path(&format!("/shardedCluster/{}", SNAPSHOT_ID)).as_str(),
        )
        .with_status(400)
        .with_body(r#"{"error":400,"errorCode":"INVALID_PARAMETER","reason":"Bad Request"}"#)
        .create_async()
        .await;

    let server = configured_server(&atlas.url()).await;
    let read = server
        .read_data_source(
            "mongodbatlas_cloud_backup_snapshot",
            &encode(Dynamic::object([
                ("project_id", Dynamic::String(PROJECT.into())),
                ("cluster_name", Dynamic::String(CLUSTER.into())),
                ("snapshot_id", Dynamic::String(SNAPSHOT_ID.into())),
            ])),
        )
        .await;

    assert!(read.diagnostics.is_empty(), "{:?}", read.diagnostics);
    let state = decode(&read.state);
    assert_eq!(state.get_string(&AttributePath::new("status")).unwrap(), "completed");
    assert_eq!(
        state.get(&AttributePath::new("members")),
        Dynamic::List(vec![])
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn import_rejects_short_ids() {
    let atlas = Server::new_async().await;
    let server = configured_server(&atlas.url()).await;

    let imported = server
        .import_resource_state("mongodbatlas_cloud_backup_snapshot", "abc-cluster-def")
        .await;

    assert!(imported.imported_resources.is_empty());
    assert!(imported.diagnostics[0].is_error());
}

#[tokio::test(flavor = "multi_thread")]
async fn read_and_delete_of_missing_snapshot() {
    let mut atlas = Server::new_async().await;
    let item = snapshots_path(&format!("/{}", SNAPSHOT_ID));
    let _get = atlas
        .mock("GET", item.as_str())
        .with_status(404)
        .with_body(not_found_body())
        .create_async()
        .await;
    let delete = atlas
        .mock("DELETE", item.as_str())
        .with_status(404)
        .with_body(not_found_body())
        .create_async()
        .await;

    let server = configured_server(&atlas.url()).await;
    let id = mongodbatlas::conversion::encode_state_id([
        ("project_id", PROJECT),
        ("cluster_name", CLUSTER),
        ("snapshot_id", SNAPSHOT_ID),
    ]);
    let state = encode(Dynamic::object([
        ("id", Dynamic::String(id)),
        ("project_id", Dynamic::String(PROJECT.into())),
        ("cluster_name", Dynamic::String(CLUSTER.into())),
    ]));

    let read = server
        .read_resource("mongodbatlas_cloud_backup_snapshot", &state)
        .await;
    assert!(read.diagnostics.is_empty(), "{:?}", read.diagnostics);
    assert!(read.new_state.is_empty());

    let deleted = server
        .apply_resource_change("mongodbatlas_cloud_backup_snapshot", &state, &[], &[])
        .await;
    delete.assert_async().await;
    assert!(deleted.diagnostics.is_empty(), "{:?}", deleted.diagnostics);
}

#[tokio::test(flavor = "multi_thread")]
async fn snapshots_data_source_reads_requested_page() {
    let mut atlas = Server::new_async().await;
    let page = atlas
        .mock("GET", snapshots_path("").as_str())
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("pageNum".into(), "2".into()),
            Matcher::UrlEncoded("itemsPerPage".into(), "1".into()),
            Matcher::UrlEncoded("includeCount".into(), "true".into()),
        ]))
        .with_body(format!(
            r#"{{"results":[{}],"totalCount":3}}"#,
            snapshot_body("replicaSet")
        ))
        .expect(1)
        .create_async()
        .await;

    let server = configured_server(&atlas.url()).await;
    let read = server
        .read_data_source(
            "mongodbatlas_cloud_backup_snapshots",
            &encode(Dynamic::object([
                ("project_id", Dynamic::String(PROJECT.into())),
                ("cluster_name", Dynamic::String(CLUSTER.into())),
                ("page_num", Dynamic::Number(2.0)),
                ("items_per_page", Dynamic::Number(1.0)),
            ])),
        )
        .await;

    page.assert_async().await;
    assert!(read.diagnostics.is_empty(), "{:?}", read.diagnostics);
    let state = decode(&read.state);
    assert_eq!(state.get_number(&AttributePath::new("total_count")).unwrap(), 3.0);
    assert_eq!(
        state
            .get_number(&AttributePath::new("results").index(0).attribute("storage_size_bytes"))
            .unwrap(),
        1048576.0
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn snapshots_data_source_rejects_out_of_range_paging() {
    let atlas = Server::new_async().await;
    let server = configured_server(&atlas.url()).await;

    let diags = server
        .validate_data_source_config(
            "mongodbatlas_cloud_backup_snapshots",
            &encode(Dynamic::object([
                ("project_id", Dynamic::String(PROJECT.into())),
                ("cluster_name", Dynamic::String(CLUSTER.into())),
                ("page_num", Dynamic::Number(-1.0)),
                ("items_per_page", Dynamic::Number(501.0)),
            ])),
        )
        .await;

    let summaries: Vec<_> = diags.iter().map(|d| d.summary.as_str()).collect();
    assert_eq!(summaries.len(), 2, "{:?}", summaries);
    assert!(summaries.contains(&"page_num must be at least 1"));
    assert!(summaries.contains(&"items_per_page must be at most 500"));
}
