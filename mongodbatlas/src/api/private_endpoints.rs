//! Private endpoint service (privatelink) API

use super::common::escape;
use super::{ApiError, Client, API_PREFIX};
use serde::{Deserialize, Serialize};

const API_VERSION: &str = "2023-01-01";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointService {
    pub id: String,
    #[serde(default)]
    pub cloud_provider: Option<String>,
    #[serde(default)]
    pub region_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub endpoint_service_name: Option<String>,
    #[serde(default)]
    pub interface_endpoints: Vec<String>,
    #[serde(default)]
    pub private_endpoints: Vec<String>,
    #[serde(default)]
    pub private_link_service_name: Option<String>,
    #[serde(default)]
    pub private_link_service_resource_id: Option<String>,
    #[serde(default)]
    pub endpoint_group_names: Vec<String>,
    #[serde(default)]
    pub service_attachment_names: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEndpointServiceRequest {
    pub provider_name: String,
    pub region: String,
}

pub struct PrivateEndpointsApi<'a> {
    client: &'a Client,
}

impl<'a> PrivateEndpointsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn service_path(project_id: &str, provider_name: &str, endpoint_service_id: &str) -> String {
        format!(
            "{}/groups/{}/privateEndpoint/{}/endpointService/{}",
            API_PREFIX,
            escape(project_id),
            escape(provider_name),
            escape(endpoint_service_id)
        )
    }

    /// POST /api/atlas/v2/groups/{groupId}/privateEndpoint/endpointService
    pub async fn create(
        &self,
        project_id: &str,
        request: &CreateEndpointServiceRequest,
    ) -> Result<EndpointService, ApiError> {
        self.client
            .post(
                API_VERSION,
                &format!(
                    "{}/groups/{}/privateEndpoint/endpointService",
                    API_PREFIX,
                    escape(project_id)
                ),
                request,
            )
            .await
    }

    /// GET /api/atlas/v2/groups/{groupId}/privateEndpoint/{cloudProvider}/endpointService/{endpointServiceId}
    pub async fn get(
        &self,
        project_id: &str,
        provider_name: &str,
        endpoint_service_id: &str,
    ) -> Result<EndpointService, ApiError> {
        self.client
            .get(
                API_VERSION,
                &Self::service_path(project_id, provider_name, endpoint_service_id),
            )
            .await
    }

    /// DELETE /api/atlas/v2/groups/{groupId}/privateEndpoint/{cloudProvider}/endpointService/{endpointServiceId}
    pub async fn delete(
        &self,
        project_id: &str,
        provider_name: &str,
        endpoint_service_id: &str,
    ) -> Result<(), ApiError> {
        self.client
            .delete(
                API_VERSION,
                &Self::service_path(project_id, provider_name, endpoint_service_id),
            )
            .await
    }
}
