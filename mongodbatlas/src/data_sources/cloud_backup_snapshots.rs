//! Cloud backup snapshots of a cluster

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

use super::{lookup_error, object_type, pagination_schema, requested_page};
use crate::api::backup_snapshots::BackupSnapshot;
use crate::api::Paginated;
use crate::conversion::encode_state_id;
use crate::provider_data::{not_configured, MongoDbAtlasProviderData};
use crate::resources::cloud_backup_snapshot::{member_type, snapshot_attributes};
use crate::resources::required_string;

fn result_type() -> AttributeType {
    object_type([
        ("snapshot_id", AttributeType::String),
        ("cloud_provider", AttributeType::String),
        ("created_at", AttributeType::String),
        ("description", AttributeType::String),
        ("expires_at", AttributeType::String),
        ("master_key_uuid", AttributeType::String),
        ("mongod_version", AttributeType::String),
        ("replica_set_name", AttributeType::String),
        ("snapshot_type", AttributeType::String),
        ("status", AttributeType::String),
        ("storage_size_bytes", AttributeType::Number),
        ("type", AttributeType::String),
        ("members", AttributeType::List(Box::new(member_type()))),
        (
            "snapshot_ids",
            AttributeType::List(Box::new(AttributeType::String)),
        ),
    ])
}

/// Listing does not fetch sharded detail, so members stay empty
fn snapshots_state(
    project_id: &str,
    cluster_name: &str,
    page: &DynamicValue,
    listed: Paginated<BackupSnapshot>,
) -> DynamicValue {
    let total = listed
        .total_count
        .unwrap_or(listed.results.len() as u64);
    let results = listed
        .results
        .iter()
        .map(|s| Dynamic::object(snapshot_attributes(s, None)))
        .collect();

    DynamicValue::new(Dynamic::object([
        (
            "id",
            Dynamic::String(encode_state_id([
                ("project_id", project_id),
                ("cluster_name", cluster_name),
            ])),
        ),
        ("project_id", Dynamic::String(project_id.to_string())),
        ("cluster_name", Dynamic::String(cluster_name.to_string())),
        ("page_num", page.get(&AttributePath::new("page_num"))),
        (
            "items_per_page",
            page.get(&AttributePath::new("items_per_page")),
        ),
        ("total_count", Dynamic::Number(total as f64)),
        ("results", Dynamic::List(results)),
    ]))
}

#[derive(Default)]
pub struct CloudBackupSnapshotsDataSource {
    provider_data: Option<MongoDbAtlasProviderData>,
}

impl CloudBackupSnapshotsDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for CloudBackupSnapshotsDataSource {
    fn type_name(&self) -> &str {
        "mongodbatlas_cloud_backup_snapshots"
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
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Lists the cloud backup snapshots of a cluster")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project of the cluster")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cluster_name", AttributeType::String)
                    .description("Cluster whose snapshots are listed")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("results", AttributeType::List(Box::new(result_type())))
                    .description("Snapshots on the requested page, or all of them")
                    .computed()
                    .build(),
            );

        DataSourceSchemaResponse {
            schema: pagination_schema(schema).build(),
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
        let (project_id, cluster_name) = match (
            required_string(config, "project_id"),
            required_string(config, "cluster_name"),
        ) {
            (Ok(project_id), Ok(cluster_name)) => (project_id, cluster_name),
            (project_id, cluster_name) => {
                diagnostics.extend(project_id.err());
                diagnostics.extend(cluster_name.err());
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let api = provider_data.client.backup_snapshots();
        let listed = match requested_page(config) {
            Some(page) => api.list_page(&project_id, &cluster_name, page).await,
            None => api
                .list(&project_id, &cluster_name)
                .await
                .map(|results| Paginated {
                    total_count: Some(results.len() as u64),
                    results,
                }),
        };

        match listed {
            Ok(listed) => {
                tracing::debug!(
                    cluster_name = %cluster_name,
                    count = listed.results.len(),
                    "listed cloud backup snapshots"
                );
                ReadDataSourceResponse {
                    state: snapshots_state(&project_id, &cluster_name, config, listed),
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(lookup_error("cloud backup snapshots", e));
                ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                }
            }
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for CloudBackupSnapshotsDataSource {
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

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn state_reports_page_and_total() {
        let config = DynamicValue::new(Dynamic::object([
            ("page_num", Dynamic::Number(2.0)),
            ("items_per_page", Dynamic::Null),
        ]));
        let listed = Paginated {
            results: vec![BackupSnapshot {
                id: "s1".into(),
                status: Some("completed".into()),
                ..Default::default()
            }],
            total_count: Some(7),
        };

        let state = snapshots_state("p1", "c1", &config, listed);
        assert_eq!(state.get_number(&AttributePath::new("total_count")).unwrap(), 7.0);
        assert_eq!(state.get_number(&AttributePath::new("page_num")).unwrap(), 2.0);
        assert!(state.get(&AttributePath::new("items_per_page")).is_null());
        assert_eq!(
            state
                .get_string(&AttributePath::new("results").index(0).attribute("snapshot_id"))
                .unwrap(),
            "s1"
        );
        assert_eq!(
            state.get(&AttributePath::new("results").index(0).attribute("members")),
            Dynamic::List(vec![])
        );
    }
}
