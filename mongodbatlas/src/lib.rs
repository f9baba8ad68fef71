//! Terraform provider for MongoDB Atlas
//!
//! [`MongoDbAtlasProvider`] resolves credentials, builds one shared
//! [`api::Client`] and hands it to every resource and data source through
//! [`provider_data::MongoDbAtlasProviderData`].

pub mod api;
pub mod config;
pub mod conversion;
pub mod data_sources;
pub mod import_id;
pub mod provider_data;
pub mod resources;
pub mod retry_strategy;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetaSchemaRequest, ProviderMetaSchemaResponse, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
    StopProviderRequest, StopProviderResponse, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, ServerCapabilities};

use crate::config::ProviderConfig;
pub use crate::provider_data::MongoDbAtlasProviderData;

#[derive(Default)]
pub struct MongoDbAtlasProvider {
    provider_data: Option<MongoDbAtlasProviderData>,
}

impl MongoDbAtlasProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

fn resource<R>(make: fn() -> R) -> ResourceFactory
where
    R: ResourceWithConfigure + 'static,
{
    Box::new(move || Box::new(make()) as Box<dyn ResourceWithConfigure>)
}

fn data_source<D>(make: fn() -> D) -> DataSourceFactory
where
    D: DataSourceWithConfigure + 'static,
{
    Box::new(move || Box::new(make()) as Box<dyn DataSourceWithConfigure>)
}

#[async_trait]
impl Provider for MongoDbAtlasProvider {
    fn type_name(&self) -> &str {
        "mongodbatlas"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            server_capabilities: ServerCapabilities {
                plan_destroy: true,
                get_provider_schema_optional: false,
                move_resource_state: false,
            },
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        let string = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .optional()
                .build()
        };
        let secret = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .optional()
                .sensitive()
                .build()
        };

        let schema = SchemaBuilder::new()
            .version(0)
            .description("MongoDB Atlas provider")
            .attribute(string(
                "base_url",
                "Atlas API base URL. Can also be set with MONGODB_ATLAS_BASE_URL",
            ))
            .attribute(
                AttributeBuilder::new("is_mongodbgov_cloud", AttributeType::Bool)
                    .description("Use the MongoDB Atlas for Government endpoint")
                    .optional()
                    .build(),
            )
            .attribute(string(
                "public_key",
                "Programmatic API public key. Can also be set with MONGODB_ATLAS_PUBLIC_KEY",
            ))
            .attribute(secret(
                "private_key",
                "Programmatic API private key. Can also be set with MONGODB_ATLAS_PRIVATE_KEY",
            ))
            .attribute(string(
                "client_id",
                "Service account client ID. Can also be set with MONGODB_ATLAS_CLIENT_ID",
            ))
            .attribute(secret(
                "client_secret",
                "Service account client secret. Can also be set with MONGODB_ATLAS_CLIENT_SECRET",
            ))
            .attribute(secret(
                "access_token",
                "Bearer token used as is. Can also be set with MONGODB_ATLAS_ACCESS_TOKEN",
            ))
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn meta_schema(
        &self,
        _ctx: Context,
        _request: ProviderMetaSchemaRequest,
    ) -> ProviderMetaSchemaResponse {
        ProviderMetaSchemaResponse {
            schema: None,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let (config, mut diagnostics) = match ProviderConfig::from_config(&request.config) {
            Ok(resolved) => resolved,
            Err(diagnostics) => {
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        };

        let client = match api::Client::new(
            &config.base_url,
            config.credentials.clone(),
            &request.terraform_version,
        ) {
            Ok(client) => client,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create Atlas API client",
                    e.to_string(),
                ));
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                };
            }
        };

        tracing::info!(
            base_url = %config.base_url,
            credentials = config.credentials.kind(),
            "configured MongoDB Atlas provider"
        );

        let provider_data = MongoDbAtlasProviderData::new(client);
        self.provider_data = Some(provider_data.clone());

        ConfigureProviderResponse {
            diagnostics,
            provider_data: Some(Arc::new(provider_data)),
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn stop(&self, _ctx: Context, _request: StopProviderRequest) -> StopProviderResponse {
        StopProviderResponse { error: None }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        HashMap::from([
            (
                "mongodbatlas_alert_configuration".to_string(),
                resource(resources::AlertConfigurationResource::new),
            ),
            (
                "mongodbatlas_cloud_backup_snapshot".to_string(),
                resource(resources::CloudBackupSnapshotResource::new),
            ),
            (
                "mongodbatlas_database_user".to_string(),
                resource(resources::DatabaseUserResource::new),
            ),
            (
                "mongodbatlas_encryption_at_rest".to_string(),
                resource(resources::EncryptionAtRestResource::new),
            ),
            (
                "mongodbatlas_flex_cluster".to_string(),
                resource(resources::FlexClusterResource::new),
            ),
            (
                "mongodbatlas_privatelink_endpoint".to_string(),
                resource(resources::PrivateLinkEndpointResource::new),
            ),
        ])
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        HashMap::from([
            (
                "mongodbatlas_cloud_backup_snapshot".to_string(),
                data_source(data_sources::CloudBackupSnapshotDataSource::new),
            ),
            (
                "mongodbatlas_cloud_backup_snapshots".to_string(),
                data_source(data_sources::CloudBackupSnapshotsDataSource::new),
            ),
            (
                "mongodbatlas_database_user".to_string(),
                data_source(data_sources::DatabaseUserDataSource::new),
            ),
            (
                "mongodbatlas_database_users".to_string(),
                data_source(data_sources::DatabaseUsersDataSource::new),
            ),
            (
                "mongodbatlas_flex_cluster".to_string(),
                data_source(data_sources::FlexClusterDataSource::new),
            ),
        ])
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tfplug::types::{ClientCapabilities, Dynamic, DynamicValue};

    fn configure_request(config: Dynamic) -> ConfigureProviderRequest {
        ConfigureProviderRequest {
            terraform_version: "1.9.0".to_string(),
            config: DynamicValue::new(config),
            client_capabilities: ClientCapabilities::default(),
        }
    }

    #[tokio::test]
    #[serial]
    async fn configure_with_api_keys() {
        std::env::remove_var("MONGODB_ATLAS_ACCESS_TOKEN");
        std::env::remove_var("MONGODB_ATLAS_CLIENT_ID");
        std::env::remove_var("MONGODB_ATLAS_CLIENT_SECRET");

        let mut provider = MongoDbAtlasProvider::new();
        let response = provider
            .configure(
                Context::new(),
                configure_request(Dynamic::object([
                    ("base_url", Dynamic::String("https://cloud-dev.mongodb.com/".into())),
                    ("public_key", Dynamic::String("pub".into())),
                    ("private_key", Dynamic::String("priv".into())),
                ])),
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert!(response.provider_data.is_some());
        let data = provider.provider_data.unwrap();
        assert_eq!(data.client.base_url(), "https://cloud-dev.mongodb.com");
    }

    #[tokio::test]
    #[serial]
    async fn configure_rejects_half_an_api_key() {
        std::env::remove_var("MONGODB_ATLAS_ACCESS_TOKEN");
        std::env::remove_var("MONGODB_ATLAS_CLIENT_ID");
        std::env::remove_var("MONGODB_ATLAS_CLIENT_SECRET");
        std::env::remove_var("MONGODB_ATLAS_PRIVATE_KEY");
        std::env::remove_var("MCLI_PRIVATE_API_KEY");

        let mut provider = MongoDbAtlasProvider::new();
        let response = provider
            .configure(
                Context::new(),
                configure_request(Dynamic::object([(
                    "public_key",
                    Dynamic::String("pub".into()),
                )])),
            )
            .await;

        assert!(response.provider_data.is_none());
        assert!(response.diagnostics.iter().any(|d| d.is_error()));
    }

    #[test]
    fn factories_cover_every_type() {
        let provider = MongoDbAtlasProvider::new();

        let resources = provider.resources();
        assert_eq!(resources.len(), 6);
        for (name, factory) in &resources {
            assert_eq!(factory().type_name(), name.as_str());
        }

        let data_sources = provider.data_sources();
        assert_eq!(data_sources.len(), 5);
        for (name, factory) in &data_sources {
            assert_eq!(factory().type_name(), name.as_str());
        }
    }
}
