//! Cloud backup snapshot API

use super::common::{escape, PageRequest, Paginated};
use super::{ApiError, Client, API_PREFIX};
use serde::{Deserialize, Serialize};

const API_VERSION: &str = "2023-01-01";

/// Snapshot of a replica set or of a whole sharded cluster
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub id: String,
    #[serde(default)]
    pub cloud_provider: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default, rename = "masterKeyUUID")]
    pub master_key_uuid: Option<String>,
    #[serde(default)]
    pub mongod_version: Option<String>,
    #[serde(default)]
    pub replica_set_name: Option<String>,
    #[serde(default)]
    pub snapshot_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub storage_size_bytes: Option<i64>,
    #[serde(default, rename = "type")]
    pub snapshot_kind: Option<String>,
}

/// Extra detail only sharded cluster snapshots carry
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardedSnapshot {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub members: Vec<ShardedSnapshotMember>,
    #[serde(default)]
    pub snapshot_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardedSnapshotMember {
    #[serde(default)]
    pub cloud_provider: Option<String>,
    pub id: String,
    #[serde(default)]
    pub replica_set_name: Option<String>,
}

/// Request body for an on-demand snapshot
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TakeSnapshotRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_in_days: Option<i64>,
}

pub struct BackupSnapshotsApi<'a> {
    client: &'a Client,
}

impl<'a> BackupSnapshotsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn base_path(project_id: &str, cluster_name: &str) -> String {
        format!(
            "{}/groups/{}/clusters/{}/backup/snapshots",
            API_PREFIX,
            escape(project_id),
            escape(cluster_name)
        )
    }

    /// POST /api/atlas/v2/groups/{groupId}/clusters/{clusterName}/backup/snapshots
    pub async fn take(
        &self,
        project_id: &str,
        cluster_name: &str,
        request: &TakeSnapshotRequest,
    ) -> Result<BackupSnapshot, ApiError> {
        self.client
            .post(
                API_VERSION,
                &Self::base_path(project_id, cluster_name),
                request,
            )
            .await
    }

    /// GET /api/atlas/v2/groups/{groupId}/clusters/{clusterName}/backup/snapshots/{snapshotId}
    pub async fn get(
        &self,
        project_id: &str,
        cluster_name: &str,
        snapshot_id: &str,
    ) -> Result<BackupSnapshot, ApiError> {
        self.client
            .get(
                API_VERSION,
                &format!(
                    "{}/{}",
                    Self::base_path(project_id, cluster_name),
                    escape(snapshot_id)
                ),
            )
            .await
    }

    /// GET /api/atlas/v2/groups/{groupId}/clusters/{clusterName}/backup/snapshots/shardedCluster/{snapshotId}
    pub async fn get_sharded(
        &self,
        project_id: &str,
        cluster_name: &str,
        snapshot_id: &str,
    ) -> Result<ShardedSnapshot, ApiError> {
        self.client
            .get(
                API_VERSION,
                &format!(
                    "{}/shardedCluster/{}",
                    Self::base_path(project_id, cluster_name),
                    escape(snapshot_id)
                ),
            )
            .await
    }

    /// GET /api/atlas/v2/groups/{groupId}/clusters/{clusterName}/backup/snapshots
    pub async fn list_page(
        &self,
        project_id: &str,
        cluster_name: &str,
        page: PageRequest,
    ) -> Result<Paginated<BackupSnapshot>, ApiError> {
        self.client
            .get_page(
                API_VERSION,
                &Self::base_path(project_id, cluster_name),
                page,
            )
            .await
    }

    /// Every snapshot of a cluster, across all pages
    pub async fn list(
        &self,
        project_id: &str,
        cluster_name: &str,
    ) -> Result<Vec<BackupSnapshot>, ApiError> {
        self.client
            .list_all(API_VERSION, &Self::base_path(project_id, cluster_name))
            .await
    }

    /// DELETE /api/atlas/v2/groups/{groupId}/clusters/{clusterName}/backup/snapshots/{snapshotId}
    pub async fn delete(
        &self,
        project_id: &str,
        cluster_name: &str,
        snapshot_id: &str,
    ) -> Result<(), ApiError> {
        self.client
            .delete(
                API_VERSION,
                &format!(
                    "{}/{}",
                    Self::base_path(project_id, cluster_name),
                    escape(snapshot_id)
                ),
            )
            .await
    }
}
