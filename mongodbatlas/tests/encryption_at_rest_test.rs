//! Encryption at rest resource against a mock Atlas

#![allow(clippy::disallowed_methods)]

mod common;

use common::{api_path, configured_server, decode, encode, PROJECT};
use mockito::{Matcher, Server};
use tfplug::types::{AttributePath, Dynamic};

const ENABLED_AWS: &str = r#"{
    "awsKms": {
        "enabled": true,
        "accessKeyID": "AKIA",
        "customerMasterKeyID": "cmk",
        "region": "US_EAST_1",
        "roleId": "role",
        "valid": true
    },
    "azureKeyVault": {"enabled": false},
    "googleCloudKms": {"enabled": false}
}"#;

fn rejection(code: &str) -> String {
    format!(
        r#"{{"detail":"key provider rejected the request","error":400,"errorCode":"{}","reason":"Bad Request"}}"#,
        code
    )
}

fn planned_aws() -> Dynamic {
    Dynamic::object([
        ("id", Dynamic::Unknown),
        ("project_id", Dynamic::String(PROJECT.into())),
        (
            "aws_kms_config",
            Dynamic::List(vec![Dynamic::object([
                ("enabled", Dynamic::Bool(true)),
                ("access_key_id", Dynamic::String("AKIA".into())),
                ("secret_access_key", Dynamic::String("shh".into())),
                ("customer_master_key_id", Dynamic::String("cmk".into())),
                ("region", Dynamic::String("US_EAST_1".into())),
                ("role_id", Dynamic::Null),
            ])]),
        ),
        ("azure_key_vault_config", Dynamic::List(vec![])),
        ("google_cloud_kms_config", Dynamic::List(vec![])),
    ])
}

#[tokio::test(flavor = "multi_thread")]
async fn create_retries_while_role_propagates() {
    let mut atlas = Server::new_async().await;
    let rejected = atlas
        .mock("PATCH", api_path("/encryptionAtRest").as_str())
        .with_status(400)
        .with_body(rejection("CANNOT_ASSUME_ROLE"))
        .expect(1)
        .create_async()
        .await;
    let accepted = atlas
        .mock("PATCH", api_path("/encryptionAtRest").as_str())
        .match_body(Matcher::PartialJsonString(
            r#"{"awsKms":{"enabled":true,"secretAccessKey":"shh"}}"#.to_string(),
        ))
        .with_body(ENABLED_AWS)
        .expect(1)
        .create_async()
        .await;

    let server = configured_server(&atlas.url()).await;
    let planned = encode(planned_aws());
    let applied = server
        .apply_resource_change("mongodbatlas_encryption_at_rest", &[], &planned, &planned)
        .await;

    rejected.assert_async().await;
    accepted.assert_async().await;
    assert!(applied.diagnostics.is_empty(), "{:?}", applied.diagnostics);
    let state = decode(&applied.new_state);
    let aws = AttributePath::new("aws_kms_config").index(0);
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), PROJECT);
    assert_eq!(state.get_string(&aws.clone().attribute("role_id")).unwrap(), "role");
    assert_eq!(
        state.get_string(&aws.attribute("secret_access_key")).unwrap(),
        "shh"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn create_stops_on_permanent_rejection() {
    let mut atlas = Server::new_async().await;
    let rejected = atlas
        .mock("PATCH", api_path("/encryptionAtRest").as_str())
        .with_status(400)
        .with_body(rejection("INVALID_ENCRYPTION_KEY"))
        .expect(1)
        .create_async()
        .await;

    let server = configured_server(&atlas.url()).await;
    let planned = encode(planned_aws());
    let applied = server
        .apply_resource_change("mongodbatlas_encryption_at_rest", &[], &planned, &planned)
        .await;

    rejected.assert_async().await;
    assert_eq!(applied.diagnostics.len(), 1);
    assert!(applied.diagnostics[0].is_error());
    assert!(applied.diagnostics[0].detail.contains("INVALID_ENCRYPTION_KEY"));
}
