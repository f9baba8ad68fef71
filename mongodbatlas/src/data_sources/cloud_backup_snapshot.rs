//! Single cloud backup snapshot data source

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
use crate::provider_data::{not_configured, MongoDbAtlasProviderData};
use crate::resources::cloud_backup_snapshot::{
    computed_snapshot_schema, fetch_snapshot, snapshot_attributes, SnapshotIdentity,
};
use crate::resources::required_string;

#[derive(Default)]
pub struct CloudBackupSnapshotDataSource {
    provider_data: Option<MongoDbAtlasProviderData>,
}

impl CloudBackupSnapshotDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for CloudBackupSnapshotDataSource {
    fn type_name(&self) -> &str {
        "mongodbatlas_cloud_backup_snapshot"
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
        let required = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .required()
                .build()
        };

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Reads one cloud backup snapshot of a cluster")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(required("project_id", "Project of the cluster"))
            .attribute(required("cluster_name", "Cluster the snapshot was taken from"))
            .attribute(required("snapshot_id", "Snapshot to read"))
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .computed()
                    .build(),
            );

        DataSourceSchemaResponse {
            schema: computed_snapshot_schema(schema).build(),
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
        let identity = match (
            required_string(config, "project_id"),
            required_string(config, "cluster_name"),
            required_string(config, "snapshot_id"),
        ) {
            (Ok(project_id), Ok(cluster_name), Ok(snapshot_id)) => SnapshotIdentity {
                project_id,
                cluster_name,
                snapshot_id,
            },
            (project_id, cluster_name, snapshot_id) => {
                diagnostics.extend(project_id.err());
                diagnostics.extend(cluster_name.err());
                diagnostics.extend(snapshot_id.err());
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        match fetch_snapshot(&provider_data.client, &identity).await {
            Ok((snapshot, sharded)) => {
                let mut fields = vec![
                    ("id", Dynamic::String(identity.state_id())),
                    ("project_id", Dynamic::String(identity.project_id.clone())),
                    ("cluster_name", Dynamic::String(identity.cluster_name.clone())),
                ];
                fields.extend(snapshot_attributes(&snapshot, sharded.as_ref()));
                ReadDataSourceResponse {
                    state: DynamicValue::new(Dynamic::object(fields)),
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(lookup_error("cloud backup snapshot", e));
                ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                }
            }
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for CloudBackupSnapshotDataSource {
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
