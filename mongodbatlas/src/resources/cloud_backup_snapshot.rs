//! On-demand cloud backup snapshot resource
//!
//! Taking a snapshot first waits for the cluster to settle, then for the
//! snapshot itself to finish. Snapshots cannot be changed, every argument
//! forces a new one.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::timeouts::{get_timeout, timeouts_attribute, Operation, TIMEOUTS_ATTRIBUTE};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::NumberAtLeast;
use tfplug::StateChangeConf;

use super::{api_error, required_string};
use crate::api::backup_snapshots::{BackupSnapshot, ShardedSnapshot, TakeSnapshotRequest};
use crate::api::Client;
use crate::conversion::{encode_state_id, StateIdFields};
use crate::import_id::parse_snapshot_import_id;
use crate::provider_data::{not_configured, MongoDbAtlasProviderData};
use crate::retry_strategy::{
    cluster_idle_conf, snapshot_conf, DEFAULT_SNAPSHOT_CREATE_TIMEOUT, DELETED, PENDING,
    SNAPSHOT_FAILED,
};

const SHARDED_CLUSTER: &str = "shardedCluster";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SnapshotIdentity {
    pub project_id: String,
    pub cluster_name: String,
    pub snapshot_id: String,
}

impl SnapshotIdentity {
    pub fn state_id(&self) -> String {
        encode_state_id([
            ("project_id", self.project_id.as_str()),
            ("cluster_name", self.cluster_name.as_str()),
            ("snapshot_id", self.snapshot_id.as_str()),
        ])
    }

    /// `None` when the state ID does not name a snapshot
    fn from_state_id(id: &str) -> Option<Self> {
        let fields = StateIdFields::decode(id);
        Some(Self {
            project_id: fields.require("project_id").ok()?.to_string(),
            cluster_name: fields.require("cluster_name").ok()?.to_string(),
            snapshot_id: fields.require("snapshot_id").ok()?.to_string(),
        })
    }
}

/// Snapshot detail, with member replica sets merged in for sharded clusters
///
/// The sharded lookup is best effort: a failure there still yields the
/// primary snapshot.
pub(crate) async fn fetch_snapshot(
    client: &Client,
    identity: &SnapshotIdentity,
) -> Result<(BackupSnapshot, Option<ShardedSnapshot>), crate::api::ApiError> {
    let api = client.backup_snapshots();
    let snapshot = api
        .get(
            &identity.project_id,
            &identity.cluster_name,
            &identity.snapshot_id,
        )
        .await?;

    let sharded = if snapshot.snapshot_kind.as_deref() == Some(SHARDED_CLUSTER) {
        match api
            .get_sharded(
                &identity.project_id,
                &identity.cluster_name,
                &identity.snapshot_id,
            )
            .await
        {
            Ok(sharded) => Some(sharded),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring sharded snapshot lookup failure");
                None
            }
        }
    } else {
        None
    };

    Ok((snapshot, sharded))
}

/// Computed attributes shared by the resource and the data sources
pub(crate) fn snapshot_attributes(
    snapshot: &BackupSnapshot,
    sharded: Option<&ShardedSnapshot>,
) -> Vec<(&'static str, Dynamic)> {
    let members = sharded
        .map(|s| {
            s.members
                .iter()
                .map(|m| {
                    Dynamic::object([
                        ("cloud_provider", Dynamic::string_or_null(m.cloud_provider.clone())),
                        ("id", Dynamic::String(m.id.clone())),
                        (
                            "replica_set_name",
                            Dynamic::string_or_null(m.replica_set_name.clone()),
                        ),
                    ])
                })
                .collect()
        })
        .unwrap_or_default();
    let snapshot_ids = sharded
        .map(|s| s.snapshot_ids.clone())
        .unwrap_or_default();

    vec![
        ("snapshot_id", Dynamic::String(snapshot.id.clone())),
        ("cloud_provider", Dynamic::string_or_null(snapshot.cloud_provider.clone())),
        ("created_at", Dynamic::string_or_null(snapshot.created_at.clone())),
        ("description", Dynamic::string_or_null(snapshot.description.clone())),
        ("expires_at", Dynamic::string_or_null(snapshot.expires_at.clone())),
        ("master_key_uuid", Dynamic::string_or_null(snapshot.master_key_uuid.clone())),
        ("mongod_version", Dynamic::string_or_null(snapshot.mongod_version.clone())),
        ("replica_set_name", Dynamic::string_or_null(snapshot.replica_set_name.clone())),
        ("snapshot_type", Dynamic::string_or_null(snapshot.snapshot_type.clone())),
        ("status", Dynamic::string_or_null(snapshot.status.clone())),
        (
            "storage_size_bytes",
            Dynamic::number_or_null(snapshot.storage_size_bytes.map(|b| b as f64)),
        ),
        ("type", Dynamic::string_or_null(snapshot.snapshot_kind.clone())),
        ("members", Dynamic::List(members)),
        ("snapshot_ids", Dynamic::string_list(snapshot_ids)),
    ]
}

pub(crate) fn member_type() -> AttributeType {
    AttributeType::Object(HashMap::from([
        ("cloud_provider".to_string(), AttributeType::String),
        ("id".to_string(), AttributeType::String),
        ("replica_set_name".to_string(), AttributeType::String),
    ]))
}

/// Computed snapshot attributes, in schema form
pub(crate) fn computed_snapshot_schema(builder: SchemaBuilder) -> SchemaBuilder {
    let computed = |name: &str, attribute_type: AttributeType, description: &str| {
        AttributeBuilder::new(name, attribute_type)
            .description(description)
            .computed()
            .build()
    };
    builder
        .attribute(computed("cloud_provider", AttributeType::String, "Cloud provider hosting the snapshot"))
        .attribute(computed("created_at", AttributeType::String, "UTC timestamp the snapshot was taken"))
        .attribute(computed("expires_at", AttributeType::String, "UTC timestamp the snapshot expires"))
        .attribute(computed("master_key_uuid", AttributeType::String, "Encryption key UUID for encrypted snapshots"))
        .attribute(computed("mongod_version", AttributeType::String, "MongoDB version of the snapshot"))
        .attribute(computed("replica_set_name", AttributeType::String, "Replica set of a replica set snapshot"))
        .attribute(computed("snapshot_type", AttributeType::String, "onDemand or scheduled"))
        .attribute(computed("status", AttributeType::String, "Current status of the snapshot"))
        .attribute(computed("storage_size_bytes", AttributeType::Number, "Size of the snapshot in bytes"))
        .attribute(computed("type", AttributeType::String, "replicaSet or shardedCluster"))
        .attribute(computed(
            "members",
            AttributeType::List(Box::new(member_type())),
            "Member replica sets of a sharded cluster snapshot",
        ))
        .attribute(computed(
            "snapshot_ids",
            AttributeType::List(Box::new(AttributeType::String)),
            "Snapshots of the shards of a sharded cluster snapshot",
        ))
}

#[derive(Default)]
pub struct CloudBackupSnapshotResource {
    provider_data: Option<MongoDbAtlasProviderData>,
}

impl CloudBackupSnapshotResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full state; arguments the API does not echo come from `carried`
    fn snapshot_state(
        identity: &SnapshotIdentity,
        snapshot: &BackupSnapshot,
        sharded: Option<&ShardedSnapshot>,
        carried: &DynamicValue,
    ) -> DynamicValue {
        let mut attributes = snapshot_attributes(snapshot, sharded);
        attributes.extend([
            ("id", Dynamic::String(identity.state_id())),
            ("project_id", Dynamic::String(identity.project_id.clone())),
            ("cluster_name", Dynamic::String(identity.cluster_name.clone())),
            (
                "retention_in_days",
                carried.get(&AttributePath::new("retention_in_days")),
            ),
            (
                TIMEOUTS_ATTRIBUTE,
                carried.get(&AttributePath::new(TIMEOUTS_ATTRIBUTE)),
            ),
        ]);
        DynamicValue::new(Dynamic::object(attributes))
    }

    async fn take_snapshot(
        &self,
        ctx: &Context,
        client: &Client,
        planned: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let create_timeout = get_timeout(planned, Operation::Create, DEFAULT_SNAPSHOT_CREATE_TIMEOUT)
            .map_err(|e| {
                Diagnostic::error("Invalid timeout", e.to_string())
                    .with_attribute(AttributePath::new(TIMEOUTS_ATTRIBUTE))
            })?;
        let ctx = ctx.with_timeout(create_timeout);
        take_with(&ctx, client, planned, &SnapshotWaits::new(create_timeout)).await
    }
}

/// The cluster wait that precedes a snapshot and the wait for the snapshot itself
pub(crate) struct SnapshotWaits {
    cluster_idle: StateChangeConf,
    snapshot: StateChangeConf,
}

impl SnapshotWaits {
    fn new(create_timeout: Duration) -> Self {
        Self {
            cluster_idle: cluster_idle_conf(),
            snapshot: snapshot_conf(create_timeout),
        }
    }
}

async fn take_with(
    ctx: &Context,
    client: &Client,
    planned: &DynamicValue,
    waits: &SnapshotWaits,
) -> Result<DynamicValue, Diagnostic> {
    let project_id = required_string(planned, "project_id")?;
    let cluster_name = required_string(planned, "cluster_name")?;

    let (project, cluster) = (project_id.as_str(), cluster_name.as_str());
    waits
        .cluster_idle
        .wait_for_state(ctx, || async move {
            match client.clusters().get(project, cluster).await {
                Ok(c) => Ok((Some(()), c.state_name.unwrap_or_default())),
                Err(e) if e.is_not_found() => Ok((Some(()), DELETED.to_string())),
                Err(e) if e.status() == Some(503) => Ok((Some(()), PENDING.to_string())),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(|e| {
            Diagnostic::error(
                "Cluster is not ready for a snapshot",
                format!("error waiting for cluster {} to become IDLE: {}", cluster_name, e),
            )
        })?;

    let request = TakeSnapshotRequest {
        description: planned.get_optional_string(&AttributePath::new("description")),
        retention_in_days: planned
            .get_optional_number(&AttributePath::new("retention_in_days"))
            .map(|d| d as i64),
    };
    let taken = client
        .backup_snapshots()
        .take(project, cluster, &request)
        .await
        .map_err(|e| {
            Diagnostic::error("Failed to take snapshot", format!("error taking a snapshot: {}", e))
        })?;
    tracing::info!(snapshot_id = %taken.id, cluster = %cluster_name, "snapshot requested");

    let snapshot_id = taken.id.as_str();
    let outcome = waits
        .snapshot
        .wait_for_state(ctx, || async move {
            match client
                .backup_snapshots()
                .get(project, cluster, snapshot_id)
                .await
            {
                Ok(s) => {
                    let status = s.status.clone().unwrap_or_default();
                    Ok((Some(s), status))
                }
                Err(e) if e.is_not_found() => Ok((None, DELETED.to_string())),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(|e| {
            Diagnostic::error(
                "Failed to take snapshot",
                format!("error waiting for snapshot {}: {}", snapshot_id, e),
            )
        })?;

    if outcome.state == SNAPSHOT_FAILED {
        return Err(Diagnostic::error(
            "Failed to take snapshot",
            format!(
                "error creating MongoDB snapshot({}) status was: {}",
                snapshot_id, outcome.state
            ),
        ));
    }

    let identity = SnapshotIdentity {
        project_id: project_id.clone(),
        cluster_name: cluster_name.clone(),
        snapshot_id: taken.id.clone(),
    };
    let (snapshot, sharded) = fetch_snapshot(client, &identity)
        .await
        .map_err(|e| api_error("Failed to read snapshot", e))?;
    Ok(CloudBackupSnapshotResource::snapshot_state(
        &identity,
        &snapshot,
        sharded.as_ref(),
        planned,
    ))
}

#[async_trait]
impl Resource for CloudBackupSnapshotResource {
    fn type_name(&self) -> &str {
        "mongodbatlas_cloud_backup_snapshot"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let builder = SchemaBuilder::new()
            .version(0)
            .description("Takes an on-demand snapshot of an Atlas cluster")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Encoded identifier of the snapshot")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project of the cluster")
                    .required()
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cluster_name", AttributeType::String)
                    .description("Cluster to snapshot")
                    .required()
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Description of the snapshot")
                    .optional()
                    .computed()
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("retention_in_days", AttributeType::Number)
                    .description("Days the snapshot is kept")
                    .optional()
                    .validator(Box::new(NumberAtLeast::new(1.0)))
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("snapshot_id", AttributeType::String)
                    .description("Atlas identifier of the snapshot")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(timeouts_attribute(&[Operation::Create]));

        ResourceSchemaResponse {
            schema: computed_snapshot_schema(builder).build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        };

        match self
            .take_snapshot(&ctx, &provider_data.client, &request.planned_state)
            .await
        {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                private: vec![],
                diagnostics,
            },
            Err(diag) => {
                diagnostics.push(diag);
                CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
                private: request.private,
            };
        };

        let id = request
            .current_state
            .get_optional_string(&AttributePath::new("id"))
            .unwrap_or_default();
        let Some(identity) = SnapshotIdentity::from_state_id(&id) else {
            return ReadResourceResponse {
                new_state: None,
                diagnostics,
                private: request.private,
            };
        };

        match fetch_snapshot(&provider_data.client, &identity).await {
            Ok((snapshot, sharded)) => ReadResourceResponse {
                new_state: Some(Self::snapshot_state(
                    &identity,
                    &snapshot,
                    sharded.as_ref(),
                    &request.current_state,
                )),
                diagnostics,
                private: request.private,
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!(snapshot_id = %identity.snapshot_id, "snapshot not found, removing from state");
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                    private: request.private,
                }
            }
            Err(e) => {
                diagnostics.push(api_error("Failed to read snapshot", e));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                    private: request.private,
                }
            }
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        // Every argument forces replacement, so only unchanged plans reach here
        UpdateResourceResponse {
            new_state: request.planned_state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return DeleteResourceResponse { diagnostics };
        };

        let id = request
            .prior_state
            .get_optional_string(&AttributePath::new("id"))
            .unwrap_or_default();
        let Some(identity) = SnapshotIdentity::from_state_id(&id) else {
            return DeleteResourceResponse { diagnostics };
        };

        match provider_data
            .client
            .backup_snapshots()
            .delete(
                &identity.project_id,
                &identity.cluster_name,
                &identity.snapshot_id,
            )
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => diagnostics.push(Diagnostic::error(
                "Failed to delete snapshot",
                format!("error deleting a snapshot ({}): {}", identity.snapshot_id, e),
            )),
        }

        DeleteResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for CloudBackupSnapshotResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match MongoDbAtlasProviderData::from_any(request.provider_data) {
            Ok(data) => self.provider_data = Some(data),
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for CloudBackupSnapshotResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };

        match parse_snapshot_import_id(&request.id) {
            Ok(parsed) => {
                let identity = SnapshotIdentity {
                    project_id: parsed.project_id,
                    cluster_name: parsed.cluster_name,
                    snapshot_id: parsed.snapshot_id,
                };
                let state = DynamicValue::new(Dynamic::object([
                    ("id", Dynamic::String(identity.state_id())),
                    ("project_id", Dynamic::String(identity.project_id)),
                    ("cluster_name", Dynamic::String(identity.cluster_name)),
                ]));
                tfplug::import::push_imported(&request, &mut response, state);
            }
            Err(e) => response
                .diagnostics
                .push(Diagnostic::error("Invalid import ID", e.to_string())),
        }
        response
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn sample_snapshot(kind: &str) -> BackupSnapshot {
        BackupSnapshot {
            id: "5d1285acd5ec13b6c2d1726a".into(),
            status: Some("completed".into()),
            storage_size_bytes: Some(1024),
            snapshot_kind: Some(kind.into()),
            description: Some("nightly".into()),
            ..Default::default()
        }
    }

    #[test]
    fn state_id_round_trips_through_decode() {
        let identity = SnapshotIdentity {
            project_id: "p1".into(),
            cluster_name: "c1".into(),
            snapshot_id: "s1".into(),
        };
        assert_eq!(
            SnapshotIdentity::from_state_id(&identity.state_id()),
            Some(identity)
        );
        assert_eq!(SnapshotIdentity::from_state_id("p1-c1-s1"), None);
        assert_eq!(
            SnapshotIdentity::from_state_id(&encode_state_id([("project_id", "p1")])),
            None
        );
    }

    #[test]
    fn state_merges_sharded_members() {
        let identity = SnapshotIdentity {
            project_id: "p1".into(),
            cluster_name: "c1".into(),
            snapshot_id: "5d1285acd5ec13b6c2d1726a".into(),
        };
        let sharded = ShardedSnapshot {
            id: Some(identity.snapshot_id.clone()),
            members: vec![crate::api::backup_snapshots::ShardedSnapshotMember {
                cloud_provider: Some("AWS".into()),
                id: "m1".into(),
                replica_set_name: Some("shard-0".into()),
            }],
            snapshot_ids: vec!["a".into(), "b".into()],
        };
        let carried = DynamicValue::new(Dynamic::object([(
            "retention_in_days",
            Dynamic::Number(3.0),
        )]));

        let state = CloudBackupSnapshotResource::snapshot_state(
            &identity,
            &sample_snapshot(SHARDED_CLUSTER),
            Some(&sharded),
            &carried,
        );

        assert_eq!(
            state
                .get_string(&AttributePath::new("members").index(0).attribute("replica_set_name"))
                .unwrap(),
            "shard-0"
        );
        assert_eq!(
            state
                .get_string_list(&AttributePath::new("snapshot_ids"))
                .unwrap(),
            vec!["a", "b"]
        );
        assert_eq!(
            state.get_number(&AttributePath::new("retention_in_days")).unwrap(),
            3.0
        );
        assert_eq!(
            state.get_number(&AttributePath::new("storage_size_bytes")).unwrap(),
            1024.0
        );
        assert!(state.get(&AttributePath::new(TIMEOUTS_ATTRIBUTE)).is_null());
    }

    #[test]
    fn replica_set_snapshot_has_no_members() {
        let attributes = snapshot_attributes(&sample_snapshot("replicaSet"), None);
        let members = attributes
            .iter()
            .find(|(name, _)| *name == "members")
            .map(|(_, v)| v.clone())
            .unwrap();
        assert_eq!(members, Dynamic::List(vec![]));
    }

    const PROJECT: &str = "5d0f1f73cf09a29120e173cf";
    const SNAPSHOT: &str = "5d1285acd5ec13b6c2d1726a";

    fn quick_waits() -> SnapshotWaits {
        let quick = |conf: StateChangeConf| {
            conf.delay(Duration::ZERO)
                .min_timeout(Duration::from_millis(20))
                .timeout(Duration::from_secs(10))
        };
        SnapshotWaits {
            cluster_idle: quick(cluster_idle_conf()),
            snapshot: quick(snapshot_conf(DEFAULT_SNAPSHOT_CREATE_TIMEOUT)),
        }
    }

    fn planned_snapshot() -> DynamicValue {
        DynamicValue::new(Dynamic::object([
            ("project_id", Dynamic::String(PROJECT.into())),
            ("cluster_name", Dynamic::String("c1".into())),
            ("description", Dynamic::String("before upgrade".into())),
            ("retention_in_days", Dynamic::Number(2.0)),
        ]))
    }

    fn snapshot_json(status: &str) -> String {
        format!(
            r#"{{"id":"{SNAPSHOT}","status":"{status}","type":"replicaSet","snapshotType":"onDemand"}}"#
        )
    }

    /// Cluster that is busy once, then idle; snapshot accepted by Atlas
    async fn mock_idle_cluster_and_take(atlas: &mut mockito::Server) -> Vec<mockito::Mock> {
        let cluster_path = format!("/api/atlas/v2/groups/{}/clusters/c1", PROJECT);
        vec![
            atlas
                .mock("GET", cluster_path.as_str())
                .with_body(r#"{"name":"c1","stateName":"UPDATING"}"#)
                .expect(1)
                .create_async()
                .await,
            atlas
                .mock("GET", cluster_path.as_str())
                .with_body(r#"{"name":"c1","stateName":"IDLE"}"#)
                .create_async()
                .await,
            atlas
                .mock(
                    "POST",
                    format!("/api/atlas/v2/groups/{}/clusters/c1/backup/snapshots", PROJECT)
                        .as_str(),
                )
                .match_body(mockito::Matcher::Json(serde_json::json!({
                    "description": "before upgrade",
                    "retentionInDays": 2
                })))
                .with_status(202)
                .with_body(snapshot_json("queued"))
                .expect(1)
                .create_async()
                .await,
        ]
    }

    fn snapshot_path() -> String {
        format!(
            "/api/atlas/v2/groups/{}/clusters/c1/backup/snapshots/{}",
            PROJECT, SNAPSHOT
        )
    }

    fn client(atlas: &mockito::Server) -> Client {
        Client::new(&atlas.url(), crate::api::Credentials::None, "1.9.5").unwrap()
    }

    #[tokio::test]
    async fn failed_snapshot_is_an_error() {
        let mut atlas = mockito::Server::new_async().await;
        let _cluster = mock_idle_cluster_and_take(&mut atlas).await;
        let _in_progress = atlas
            .mock("GET", snapshot_path().as_str())
            .with_body(snapshot_json("inProgress"))
            .expect(1)
            .create_async()
            .await;
        let _failed = atlas
            .mock("GET", snapshot_path().as_str())
            .with_body(snapshot_json("failed"))
            .create_async()
            .await;

        let err = take_with(&Context::new(), &client(&atlas), &planned_snapshot(), &quick_waits())
            .await
            .unwrap_err();

        assert!(err.is_error());
        assert_eq!(err.summary, "Failed to take snapshot");
        assert!(err.detail.contains("status was: failed"), "{}", err.detail);
    }

    #[tokio::test]
    async fn completed_snapshot_becomes_state() {
        let mut atlas = mockito::Server::new_async().await;
        let cluster = mock_idle_cluster_and_take(&mut atlas).await;
        let _in_progress = atlas
            .mock("GET", snapshot_path().as_str())
            .with_body(snapshot_json("inProgress"))
            .expect(1)
            .create_async()
            .await;
        let _completed = atlas
            .mock("GET", snapshot_path().as_str())
            .with_body(snapshot_json("completed"))
            .create_async()
            .await;

        let state = take_with(&Context::new(), &client(&atlas), &planned_snapshot(), &quick_waits())
            .await
            .unwrap();

        for mock in &cluster {
            mock.assert_async().await;
        }
        assert_eq!(state.get_string(&AttributePath::new("snapshot_id")).unwrap(), SNAPSHOT);
        assert_eq!(state.get_string(&AttributePath::new("status")).unwrap(), "completed");
        assert_eq!(state.get_number(&AttributePath::new("retention_in_days")).unwrap(), 2.0);
    }
}
