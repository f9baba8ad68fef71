#![allow(dead_code)]

use mongodbatlas::MongoDbAtlasProvider;
use tfplug::server::{ProviderServer, ServerConfig};
use tfplug::types::{Dynamic, DynamicValue};

pub const PROJECT: &str = "5d0f1f73cf09a29120e173cf";
pub const TOKEN: &str = "test-access-token";
pub const TERRAFORM_VERSION: &str = "1.9.5";

pub fn encode(value: Dynamic) -> Vec<u8> {
    DynamicValue::new(value).encode_msgpack().unwrap()
}

pub fn decode(bytes: &[u8]) -> DynamicValue {
    DynamicValue::decode_msgpack(bytes).unwrap()
}

pub fn api_path(rest: &str) -> String {
    format!("/api/atlas/v2/groups/{}{}", PROJECT, rest)
}

pub fn not_found_body() -> &'static str {
    r#"{"detail":"not found","error":404,"errorCode":"RESOURCE_NOT_FOUND","reason":"Not Found"}"#
}

/// Server configured against a mock Atlas with a bearer token
pub async fn configured_server(base_url: &str) -> ProviderServer<MongoDbAtlasProvider> {
    let server = ProviderServer::with_config(
        MongoDbAtlasProvider::new(),
        ServerConfig::new()
            .without_logging()
            .with_terraform_version(TERRAFORM_VERSION),
    );
    let diags = server
        .configure_provider(&encode(Dynamic::object([
            ("base_url", Dynamic::String(base_url.to_string())),
            ("access_token", Dynamic::String(TOKEN.into())),
        ])))
        .await;
    assert!(diags.is_empty(), "{:?}", diags);
    server
}
