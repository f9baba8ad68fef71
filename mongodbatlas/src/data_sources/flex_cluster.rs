//! Single flex cluster data source

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Dynamic, DynamicValue};

use super::lookup_error;
use crate::conversion::encode_state_id;
use crate::provider_data::{not_configured, MongoDbAtlasProviderData};
use crate::resources::flex_cluster::{
    backup_settings_type, connection_strings_type, flex_attributes, settings_object_type,
};
use crate::resources::required_string;

#[derive(Default)]
pub struct FlexClusterDataSource {
    provider_data: Option<MongoDbAtlasProviderData>,
}

impl FlexClusterDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for FlexClusterDataSource {
    fn type_name(&self) -> &str {
        "mongodbatlas_flex_cluster"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let computed = |name: &str, attribute_type: AttributeType| {
            AttributeBuilder::new(name, attribute_type).computed().build()
        };

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Reads one flex cluster of a project")
            .attribute(computed("id", AttributeType::String))
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project that owns the flex cluster")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the flex cluster")
                    .required()
                    .build(),
            )
            .attribute(computed("provider_settings", settings_object_type()))
            .attribute(computed("backup_settings", backup_settings_type()))
            .attribute(computed("connection_strings", connection_strings_type()))
            .attribute(computed("cluster_type", AttributeType::String))
            .attribute(computed("create_date", AttributeType::String))
            .attribute(computed("mongo_db_version", AttributeType::String))
            .attribute(computed("state_name", AttributeType::String))
            .attribute(computed(
                "tags",
                AttributeType::Map(Box::new(AttributeType::String)),
            ))
            .attribute(computed("termination_protection_enabled", AttributeType::Bool))
            .attribute(computed("version_release_system", AttributeType::String))
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return ReadDataSourceResponse {
                state: DynamicValue::null(),
                diagnostics,
            };
        };

        let config = &request.config;
        let (project_id, name) = match (
            required_string(config, "project_id"),
            required_string(config, "name"),
        ) {
            (Ok(project_id), Ok(name)) => (project_id, name),
            (project_id, name) => {
                diagnostics.extend(project_id.err());
                diagnostics.extend(name.err());
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        match provider_data.client.flex_clusters().get(&project_id, &name).await {
            Ok(cluster) => {
                let mut fields = flex_attributes(&cluster);
                fields.extend([
                    (
                        "id",
                        Dynamic::String(encode_state_id([
                            ("project_id", project_id.as_str()),
                            ("name", name.as_str()),
                        ])),
                    ),
                    ("project_id", Dynamic::String(project_id.clone())),
                ]);
                ReadDataSourceResponse {
                    state: DynamicValue::new(Dynamic::object(fields)),
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(lookup_error("flex cluster", e));
                ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                }
            }
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for FlexClusterDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];
        match MongoDbAtlasProviderData::from_any(request.provider_data) {
            Ok(data) => self.provider_data = Some(data),
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureDataSourceResponse { diagnostics }
    }
}
