//! Flex cluster API

use super::common::escape;
use super::{ApiError, Client, API_PREFIX};
use serde::{Deserialize, Serialize};

const API_VERSION: &str = "2024-11-13";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlexCluster {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub provider_settings: FlexProviderSettings,
    #[serde(default)]
    pub backup_settings: Option<FlexBackupSettings>,
    #[serde(default)]
    pub cluster_type: Option<String>,
    #[serde(default)]
    pub connection_strings: Option<FlexConnectionStrings>,
    #[serde(default)]
    pub create_date: Option<String>,
    #[serde(default, rename = "mongoDBVersion")]
    pub mongo_db_version: Option<String>,
    #[serde(default)]
    pub state_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<ResourceTag>,
    #[serde(default)]
    pub termination_protection_enabled: Option<bool>,
    #[serde(default)]
    pub version_release_system: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlexProviderSettings {
    #[serde(default)]
    pub backing_provider_name: String,
    #[serde(default)]
    pub region_name: String,
    #[serde(default, rename = "diskSizeGB", skip_serializing)]
    pub disk_size_gb: Option<f64>,
    #[serde(default, skip_serializing)]
    pub provider_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FlexBackupSettings {
    #[serde(default)]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlexConnectionStrings {
    #[serde(default)]
    pub standard: Option<String>,
    #[serde(default)]
    pub standard_srv: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceTag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFlexClusterRequest {
    pub name: String,
    pub provider_settings: FlexProviderSettings,
    pub tags: Vec<ResourceTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination_protection_enabled: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFlexClusterRequest {
    pub tags: Vec<ResourceTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination_protection_enabled: Option<bool>,
}

pub struct FlexClustersApi<'a> {
    client: &'a Client,
}

impl<'a> FlexClustersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn collection_path(project_id: &str) -> String {
        format!("{}/groups/{}/flexClusters", API_PREFIX, escape(project_id))
    }

    fn cluster_path(project_id: &str, name: &str) -> String {
        format!("{}/{}", Self::collection_path(project_id), escape(name))
    }

    /// POST /api/atlas/v2/groups/{groupId}/flexClusters
    pub async fn create(
        &self,
        project_id: &str,
        request: &CreateFlexClusterRequest,
    ) -> Result<FlexCluster, ApiError> {
        self.client
            .post(API_VERSION, &Self::collection_path(project_id), request)
            .await
    }

    /// GET /api/atlas/v2/groups/{groupId}/flexClusters/{name}
    pub async fn get(&self, project_id: &str, name: &str) -> Result<FlexCluster, ApiError> {
        self.client
            .get(API_VERSION, &Self::cluster_path(project_id, name))
            .await
    }

    /// PATCH /api/atlas/v2/groups/{groupId}/flexClusters/{name}
    pub async fn update(
        &self,
        project_id: &str,
        name: &str,
        request: &UpdateFlexClusterRequest,
    ) -> Result<FlexCluster, ApiError> {
        self.client
            .patch(API_VERSION, &Self::cluster_path(project_id, name), request)
            .await
    }

    /// DELETE /api/atlas/v2/groups/{groupId}/flexClusters/{name}
    pub async fn delete(&self, project_id: &str, name: &str) -> Result<(), ApiError> {
        self.client
            .delete(API_VERSION, &Self::cluster_path(project_id, name))
            .await
    }
}
