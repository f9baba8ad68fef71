//! Cluster API, used to wait for a cluster to settle before acting on it

use super::common::escape;
use super::{ApiError, Client, API_PREFIX};
use serde::Deserialize;

const API_VERSION: &str = "2024-08-05";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub state_name: Option<String>,
    #[serde(default)]
    pub cluster_type: Option<String>,
}

pub struct ClustersApi<'a> {
    client: &'a Client,
}

impl<'a> ClustersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/atlas/v2/groups/{groupId}/clusters/{clusterName}
    pub async fn get(&self, project_id: &str, cluster_name: &str) -> Result<Cluster, ApiError> {
        self.client
            .get(
                API_VERSION,
                &format!(
                    "{}/groups/{}/clusters/{}",
                    API_PREFIX,
                    escape(project_id),
                    escape(cluster_name)
                ),
            )
            .await
    }
}
