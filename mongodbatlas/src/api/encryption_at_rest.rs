//! Encryption at rest API
//!
//! A project has exactly one encryption-at-rest configuration; it is never
//! created or deleted, only patched. Disabling every key provider is how the
//! configuration is removed.

use super::common::escape;
use super::{ApiError, Client, API_PREFIX};
use serde::{Deserialize, Serialize};

const API_VERSION: &str = "2023-01-01";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionAtRest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_kms: Option<AwsKmsConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_key_vault: Option<AzureKeyVault>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_cloud_kms: Option<GoogleCloudKms>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsKmsConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, rename = "accessKeyID", skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    #[serde(
        default,
        rename = "customerMasterKeyID",
        skip_serializing_if = "Option::is_none"
    )]
    pub customer_master_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub valid: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureKeyVault {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, rename = "clientID", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_environment: Option<String>,
    #[serde(default, rename = "subscriptionID", skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_vault_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default, rename = "tenantID", skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_private_networking: Option<bool>,
    #[serde(default, skip_serializing)]
    pub valid: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleCloudKms {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_key: Option<String>,
    #[serde(
        default,
        rename = "keyVersionResourceID",
        skip_serializing_if = "Option::is_none"
    )]
    pub key_version_resource_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub valid: Option<bool>,
}

impl EncryptionAtRest {
    /// Body that turns every key provider off
    pub fn disabled() -> Self {
        Self {
            aws_kms: Some(AwsKmsConfiguration {
                enabled: Some(false),
                ..Default::default()
            }),
            azure_key_vault: Some(AzureKeyVault {
                enabled: Some(false),
                ..Default::default()
            }),
            google_cloud_kms: Some(GoogleCloudKms {
                enabled: Some(false),
                ..Default::default()
            }),
        }
    }
}

pub struct EncryptionAtRestApi<'a> {
    client: &'a Client,
}

impl<'a> EncryptionAtRestApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn path(project_id: &str) -> String {
        format!("{}/groups/{}/encryptionAtRest", API_PREFIX, escape(project_id))
    }

    /// GET /api/atlas/v2/groups/{groupId}/encryptionAtRest
    pub async fn get(&self, project_id: &str) -> Result<EncryptionAtRest, ApiError> {
        self.client.get(API_VERSION, &Self::path(project_id)).await
    }

    /// PATCH /api/atlas/v2/groups/{groupId}/encryptionAtRest
    pub async fn update(
        &self,
        project_id: &str,
        request: &EncryptionAtRest,
    ) -> Result<EncryptionAtRest, ApiError> {
        self.client
            .patch(API_VERSION, &Self::path(project_id), request)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computed_validity_is_never_sent() {
        let body = EncryptionAtRest {
            aws_kms: Some(AwsKmsConfiguration {
                enabled: Some(true),
                customer_master_key_id: Some("key".into()),
                valid: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"awsKms": {"enabled": true, "customerMasterKeyID": "key"}})
        );
    }

    #[test]
    fn disabled_turns_off_every_provider() {
        let json = serde_json::to_value(EncryptionAtRest::disabled()).unwrap();
        assert_eq!(json["awsKms"]["enabled"], false);
        assert_eq!(json["azureKeyVault"]["enabled"], false);
        assert_eq!(json["googleCloudKms"]["enabled"], false);
    }
}
