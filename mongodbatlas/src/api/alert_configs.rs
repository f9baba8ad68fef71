//! Alert configuration API

use super::common::escape;
use super::{ApiError, Client, API_PREFIX};
use serde::{Deserialize, Serialize};

const API_VERSION: &str = "2023-01-01";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertConfig {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    #[serde(default, skip_serializing)]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub created: Option<String>,
    #[serde(default, skip_serializing)]
    pub updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    pub event_type_name: String,
    #[serde(default)]
    pub matchers: Vec<AlertMatcher>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_threshold: Option<MetricThreshold>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Threshold>,
    #[serde(default)]
    pub notifications: Vec<AlertNotification>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertMatcher {
    pub field_name: String,
    pub operator: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricThreshold {
    pub metric_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

/// One notification target; which fields apply depends on `type_name`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertNotification {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datadog_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datadog_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ops_genie_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ops_genie_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sms_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub team_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifier_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub victor_ops_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub victor_ops_routing_key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microsoft_teams_webhook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

pub struct AlertConfigsApi<'a> {
    client: &'a Client,
}

impl<'a> AlertConfigsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn collection_path(project_id: &str) -> String {
        format!("{}/groups/{}/alertConfigs", API_PREFIX, escape(project_id))
    }

    fn config_path(project_id: &str, alert_config_id: &str) -> String {
        format!(
            "{}/{}",
            Self::collection_path(project_id),
            escape(alert_config_id)
        )
    }

    /// POST /api/atlas/v2/groups/{groupId}/alertConfigs
    pub async fn create(
        &self,
        project_id: &str,
        config: &AlertConfig,
    ) -> Result<AlertConfig, ApiError> {
        self.client
            .post(API_VERSION, &Self::collection_path(project_id), config)
            .await
    }

    /// GET /api/atlas/v2/groups/{groupId}/alertConfigs/{alertConfigId}
    pub async fn get(
        &self,
        project_id: &str,
        alert_config_id: &str,
    ) -> Result<AlertConfig, ApiError> {
        self.client
            .get(API_VERSION, &Self::config_path(project_id, alert_config_id))
            .await
    }

    /// PUT /api/atlas/v2/groups/{groupId}/alertConfigs/{alertConfigId}
    pub async fn update(
        &self,
        project_id: &str,
        alert_config_id: &str,
        config: &AlertConfig,
    ) -> Result<AlertConfig, ApiError> {
        self.client
            .put(
                API_VERSION,
                &Self::config_path(project_id, alert_config_id),
                config,
            )
            .await
    }

    /// DELETE /api/atlas/v2/groups/{groupId}/alertConfigs/{alertConfigId}
    pub async fn delete(&self, project_id: &str, alert_config_id: &str) -> Result<(), ApiError> {
        self.client
            .delete(API_VERSION, &Self::config_path(project_id, alert_config_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_managed_fields_are_not_sent() {
        let config = AlertConfig {
            id: Some("a1".into()),
            created: Some("2024-01-01T00:00:00Z".into()),
            event_type_name: "OUTSIDE_METRIC_THRESHOLD".into(),
            notifications: vec![AlertNotification {
                type_name: "GROUP".into(),
                team_name: Some("ops".into()),
                interval_min: Some(5),
                ..Default::default()
            }],
            ..Default::default()
        };

        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("id").is_none());
        assert!(json.get("created").is_none());
        assert_eq!(json["eventTypeName"], "OUTSIDE_METRIC_THRESHOLD");
        assert_eq!(json["notifications"][0]["typeName"], "GROUP");
        assert_eq!(json["notifications"][0]["intervalMin"], 5);
        assert!(json["notifications"][0].get("teamName").is_none());
    }
}
