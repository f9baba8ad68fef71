//! Project alert configuration resource
//!
//! Atlas masks notification secrets on read, so those always come from the
//! prior state. Optional fields are only written back when the practitioner
//! set them, unless the block shapes no longer line up (import, or edits made
//! outside Terraform), in which case Atlas' view wins.

use async_trait::async_trait;
use std::collections::HashMap;
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
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlock, NestingMode, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::StringOneOf;

use super::{
    api_error, item_bool, item_number, item_string, object_items, required_string,
    string_list_or_null,
};
use crate::api::alert_configs::{
    AlertConfig, AlertMatcher, AlertNotification, MetricThreshold, Threshold,
};
use crate::conversion::{encode_state_id, StateIdFields};
use crate::import_id::parse_alert_configuration_import_id;
use crate::provider_data::{not_configured, MongoDbAtlasProviderData};

const MATCHER: &str = "matcher";
const METRIC_THRESHOLD: &str = "metric_threshold_config";
const THRESHOLD: &str = "threshold_config";
const NOTIFICATION: &str = "notification";

/// Notification types that page on their own schedule
const SELF_SCHEDULED_TYPES: [&str; 3] = ["PAGER_DUTY", "OPS_GENIE", "VICTOR_OPS"];

const NOTIFICATION_TYPES: [&str; 13] = [
    "EMAIL",
    "SMS",
    "PAGER_DUTY",
    "SLACK",
    "DATADOG",
    "OPS_GENIE",
    "VICTOR_OPS",
    "WEBHOOK",
    "USER",
    "TEAM",
    "GROUP",
    "ORG",
    "MICROSOFT_TEAMS",
];

const SECRET_FIELDS: [&str; 9] = [
    "api_token",
    "datadog_api_key",
    "ops_genie_api_key",
    "service_key",
    "victor_ops_api_key",
    "victor_ops_routing_key",
    "microsoft_teams_webhook_url",
    "webhook_secret",
    "webhook_url",
];

type Item = HashMap<String, Dynamic>;

/// `interval_min` is rejected for notification types that schedule themselves
fn check_interval_min(notifications: &[Item]) -> Vec<Diagnostic> {
    notifications
        .iter()
        .enumerate()
        .filter(|(_, n)| item_number(n, "interval_min").is_some_and(|i| i > 0.0))
        .filter(|(_, n)| {
            item_string(n, "type_name").is_some_and(|t| {
                SELF_SCHEDULED_TYPES
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(&t))
            })
        })
        .map(|(i, _)| {
            Diagnostic::error(
                "Invalid notification",
                "'interval_min' doesn't need to be set if type_name is 'PAGER_DUTY', 'OPS_GENIE' or 'VICTOR_OPS'",
            )
            .with_attribute(
                AttributePath::new(NOTIFICATION)
                    .index(i as i64)
                    .attribute("interval_min"),
            )
        })
        .collect()
}

fn notification_from(item: &Item) -> AlertNotification {
    let roles = item
        .get("roles")
        .and_then(Dynamic::as_list)
        .map(|roles| {
            roles
                .iter()
                .filter_map(Dynamic::as_string)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    AlertNotification {
        type_name: item_string(item, "type_name").unwrap_or_default(),
        api_token: item_string(item, "api_token"),
        channel_name: item_string(item, "channel_name"),
        datadog_api_key: item_string(item, "datadog_api_key"),
        datadog_region: item_string(item, "datadog_region"),
        delay_min: item_number(item, "delay_min").map(|d| d as i64),
        email_address: item_string(item, "email_address"),
        email_enabled: item_bool(item, "email_enabled"),
        interval_min: item_number(item, "interval_min").map(|i| i as i64),
        mobile_number: item_string(item, "mobile_number"),
        ops_genie_api_key: item_string(item, "ops_genie_api_key"),
        ops_genie_region: item_string(item, "ops_genie_region"),
        service_key: item_string(item, "service_key"),
        sms_enabled: item_bool(item, "sms_enabled"),
        team_id: item_string(item, "team_id"),
        team_name: None,
        notifier_id: item_string(item, "notifier_id"),
        username: item_string(item, "username"),
        victor_ops_api_key: item_string(item, "victor_ops_api_key"),
        victor_ops_routing_key: item_string(item, "victor_ops_routing_key"),
        roles,
        microsoft_teams_webhook_url: item_string(item, "microsoft_teams_webhook_url"),
        webhook_secret: item_string(item, "webhook_secret"),
        webhook_url: item_string(item, "webhook_url"),
    }
}

fn matchers_from(value: &DynamicValue) -> Vec<AlertMatcher> {
    object_items(value, MATCHER)
        .iter()
        .map(|m| AlertMatcher {
            field_name: item_string(m, "field_name").unwrap_or_default(),
            operator: item_string(m, "operator").unwrap_or_default(),
            value: item_string(m, "value").unwrap_or_default(),
        })
        .collect()
}

fn metric_threshold_from(value: &DynamicValue) -> Option<MetricThreshold> {
    object_items(value, METRIC_THRESHOLD)
        .first()
        .map(|t| MetricThreshold {
            metric_name: item_string(t, "metric_name").unwrap_or_default(),
            operator: item_string(t, "operator"),
            threshold: item_number(t, "threshold"),
            units: item_string(t, "units"),
            mode: item_string(t, "mode"),
        })
}

fn threshold_from(value: &DynamicValue) -> Option<Threshold> {
    object_items(value, THRESHOLD).first().map(|t| Threshold {
        operator: item_string(t, "operator"),
        threshold: item_number(t, "threshold"),
        units: item_string(t, "units"),
    })
}

/// Full request body from a plan
fn alert_config_from(value: &DynamicValue) -> Result<AlertConfig, Vec<Diagnostic>> {
    let notifications = object_items(value, NOTIFICATION);
    let invalid = check_interval_min(&notifications);
    if !invalid.is_empty() {
        return Err(invalid);
    }

    Ok(AlertConfig {
        enabled: value.get_optional_bool(&AttributePath::new("enabled")),
        event_type_name: required_string(value, "event_type").map_err(|d| vec![d])?,
        matchers: matchers_from(value),
        metric_threshold: metric_threshold_from(value),
        threshold: threshold_from(value),
        notifications: notifications.iter().map(notification_from).collect(),
        ..Default::default()
    })
}

/// Atlas value for a field the practitioner may have left out
///
/// `carried` is `None` when there is no matching prior item to consult.
fn tracked(api: Option<&str>, carried: Option<&Item>, key: &str) -> Dynamic {
    let written = carried.map_or(true, |c| !c.get(key).map_or(true, Dynamic::is_null));
    if written {
        Dynamic::string_or_null(api.filter(|v| !v.is_empty()))
    } else {
        Dynamic::Null
    }
}

fn notification_item(n: &AlertNotification, carried: Option<&Item>) -> Dynamic {
    let mut fields: Vec<(&str, Dynamic)> = vec![
        ("type_name", tracked(Some(n.type_name.as_str()), carried, "type_name")),
        ("channel_name", tracked(n.channel_name.as_deref(), carried, "channel_name")),
        ("datadog_region", tracked(n.datadog_region.as_deref(), carried, "datadog_region")),
        ("email_address", tracked(n.email_address.as_deref(), carried, "email_address")),
        ("mobile_number", tracked(n.mobile_number.as_deref(), carried, "mobile_number")),
        (
            "ops_genie_region",
            tracked(n.ops_genie_region.as_deref(), carried, "ops_genie_region"),
        ),
        ("team_id", tracked(n.team_id.as_deref(), carried, "team_id")),
        ("username", tracked(n.username.as_deref(), carried, "username")),
        (
            "team_name",
            Dynamic::string_or_null(n.team_name.clone().filter(|t| !t.is_empty())),
        ),
        ("notifier_id", Dynamic::string_or_null(n.notifier_id.clone())),
        ("roles", string_list_or_null(&n.roles)),
        ("delay_min", Dynamic::number_or_null(n.delay_min.map(|d| d as f64))),
        (
            "interval_min",
            Dynamic::number_or_null(n.interval_min.map(|i| i as f64)),
        ),
        ("email_enabled", Dynamic::Bool(n.email_enabled == Some(true))),
        ("sms_enabled", Dynamic::Bool(n.sms_enabled == Some(true))),
    ];
    fields.extend(SECRET_FIELDS.iter().map(|key| {
        (
            *key,
            Dynamic::string_or_null(carried.and_then(|c| item_string(c, key))),
        )
    }));
    Dynamic::object(fields)
}

fn alert_state(
    project_id: &str,
    api: &AlertConfig,
    carried: &DynamicValue,
) -> DynamicValue {
    let alert_id = api.id.clone().unwrap_or_default();

    let carried_notifications = object_items(carried, NOTIFICATION);
    let aligned = carried_notifications.len() == api.notifications.len();
    let notifications = api
        .notifications
        .iter()
        .enumerate()
        .map(|(i, n)| {
            notification_item(n, if aligned { carried_notifications.get(i) } else { None })
        })
        .collect();

    let carried_matchers = object_items(carried, MATCHER);
    let matchers_aligned = carried_matchers.len() == api.matchers.len();
    let matchers = api
        .matchers
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let c = if matchers_aligned { carried_matchers.get(i) } else { None };
            Dynamic::object([
                ("field_name", tracked(Some(m.field_name.as_str()), c, "field_name")),
                ("operator", tracked(Some(m.operator.as_str()), c, "operator")),
                ("value", tracked(Some(m.value.as_str()), c, "value")),
            ])
        })
        .collect();

    let carried_metric = object_items(carried, METRIC_THRESHOLD);
    let metric_threshold = api
        .metric_threshold
        .as_ref()
        .map(|t| {
            let c = carried_metric.first();
            vec![Dynamic::object([
                ("metric_name", tracked(Some(t.metric_name.as_str()), c, "metric_name")),
                ("operator", tracked(t.operator.as_deref(), c, "operator")),
                ("threshold", Dynamic::number_or_null(t.threshold)),
                ("units", tracked(t.units.as_deref(), c, "units")),
                ("mode", tracked(t.mode.as_deref(), c, "mode")),
            ])]
        })
        .unwrap_or_default();

    let carried_threshold = object_items(carried, THRESHOLD);
    let threshold = api
        .threshold
        .as_ref()
        .map(|t| {
            let c = carried_threshold.first();
            vec![Dynamic::object([
                ("operator", tracked(t.operator.as_deref(), c, "operator")),
                ("threshold", Dynamic::number_or_null(t.threshold)),
                ("units", tracked(t.units.as_deref(), c, "units")),
            ])]
        })
        .unwrap_or_default();

    DynamicValue::new(Dynamic::object([
        (
            "id",
            Dynamic::String(encode_state_id([
                ("id", alert_id.as_str()),
                ("project_id", project_id),
            ])),
        ),
        ("project_id", Dynamic::String(project_id.to_string())),
        ("alert_configuration_id", Dynamic::String(alert_id.clone())),
        ("event_type", Dynamic::String(api.event_type_name.clone())),
        ("created", Dynamic::string_or_null(api.created.clone())),
        ("updated", Dynamic::string_or_null(api.updated.clone())),
        ("enabled", Dynamic::bool_or_null(api.enabled)),
        (MATCHER, Dynamic::List(matchers)),
        (METRIC_THRESHOLD, Dynamic::List(metric_threshold)),
        (THRESHOLD, Dynamic::List(threshold)),
        (NOTIFICATION, Dynamic::List(notifications)),
    ]))
}

/// `(project_id, alert_configuration_id)` from the encoded id
fn identity(value: &DynamicValue) -> Option<(String, String)> {
    let id = value.get_optional_string(&AttributePath::new("id"))?;
    let fields = StateIdFields::decode(&id);
    Some((
        fields.require("project_id").ok()?.to_string(),
        fields.require("id").ok()?.to_string(),
    ))
}

fn notification_block() -> NestedBlock {
    let optional = |name: &str| {
        AttributeBuilder::new(name, AttributeType::String)
            .optional()
            .build()
    };
    let secret = |name: &str| {
        AttributeBuilder::new(name, AttributeType::String)
            .optional()
            .sensitive()
            .build()
    };
    let region = |name: &str| {
        AttributeBuilder::new(name, AttributeType::String)
            .optional()
            .validator(StringOneOf::boxed(["US", "EU"]))
            .build()
    };
    let optional_computed = |name: &str, attribute_type: AttributeType| {
        AttributeBuilder::new(name, attribute_type)
            .optional()
            .computed()
            .build()
    };

    let schema = SECRET_FIELDS
        .iter()
        .fold(SchemaBuilder::new(), |builder, field| builder.attribute(secret(field)))
        .attribute(
            AttributeBuilder::new("type_name", AttributeType::String)
                .description("Notification channel")
                .required()
                .validator(StringOneOf::boxed(NOTIFICATION_TYPES))
                .build(),
        )
        .attribute(optional("channel_name"))
        .attribute(region("datadog_region"))
        .attribute(optional("email_address"))
        .attribute(optional("mobile_number"))
        .attribute(region("ops_genie_region"))
        .attribute(optional("team_id"))
        .attribute(optional("username"))
        .attribute(
            AttributeBuilder::new("team_name", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(optional_computed("notifier_id", AttributeType::String))
        .attribute(optional_computed("delay_min", AttributeType::Number))
        .attribute(optional_computed("interval_min", AttributeType::Number))
        .attribute(optional_computed("email_enabled", AttributeType::Bool))
        .attribute(optional_computed("sms_enabled", AttributeType::Bool))
        .attribute(
            AttributeBuilder::new("roles", AttributeType::List(Box::new(AttributeType::String)))
                .optional()
                .build(),
        )
        .build();

    NestedBlock::new(NOTIFICATION, NestingMode::List, schema).min_items(1)
}

#[derive(Default)]
pub struct AlertConfigurationResource {
    provider_data: Option<MongoDbAtlasProviderData>,
}

impl AlertConfigurationResource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Resource for AlertConfigurationResource {
    fn type_name(&self) -> &str {
        "mongodbatlas_alert_configuration"
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
        let string = |name: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .optional()
                .build()
        };

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Alert configuration of an Atlas project")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Encoded identifier of the alert configuration")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project the alert belongs to")
                    .required()
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("alert_configuration_id", AttributeType::String)
                    .description("Atlas identifier of the alert configuration")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("event_type", AttributeType::String)
                    .description("Event that triggers the alert")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("created", AttributeType::String)
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("updated", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enabled", AttributeType::Bool)
                    .optional()
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .block(NestedBlock::new(
                MATCHER,
                NestingMode::List,
                SchemaBuilder::new()
                    .attribute(string("field_name"))
                    .attribute(string("operator"))
                    .attribute(string("value"))
                    .build(),
            ))
            .block(
                NestedBlock::new(
                    METRIC_THRESHOLD,
                    NestingMode::List,
                    SchemaBuilder::new()
                        .attribute(string("metric_name"))
                        .attribute(string("operator"))
                        .attribute(
                            AttributeBuilder::new("threshold", AttributeType::Number)
                                .optional()
                                .build(),
                        )
                        .attribute(string("units"))
                        .attribute(string("mode"))
                        .build(),
                )
                .max_items(1),
            )
            .block(
                NestedBlock::new(
                    THRESHOLD,
                    NestingMode::List,
                    SchemaBuilder::new()
                        .attribute(string("operator"))
                        .attribute(
                            AttributeBuilder::new("threshold", AttributeType::Number)
                                .optional()
                                .build(),
                        )
                        .attribute(string("units"))
                        .build(),
                )
                .max_items(1),
            )
            .block(notification_block())
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: check_interval_min(&object_items(&request.config, NOTIFICATION)),
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        };

        let planned = &request.planned_state;
        let (project_id, body) = match (required_string(planned, "project_id"), alert_config_from(planned)) {
            (Ok(project_id), Ok(body)) => (project_id, body),
            (project_id, body) => {
                diagnostics.extend(project_id.err());
                diagnostics.extend(body.err().unwrap_or_default());
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match provider_data.client.alert_configs().create(&project_id, &body).await {
            Ok(created) => {
                tracing::info!(alert_configuration_id = ?created.id, "alert configuration created");
                CreateResourceResponse {
                    new_state: alert_state(&project_id, &created, planned),
                    private: vec![],
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(api_error("error creating Alert Configuration information", e));
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

        let Some((project_id, alert_id)) = identity(&request.current_state) else {
            return ReadResourceResponse {
                new_state: None,
                diagnostics,
                private: request.private,
            };
        };

        match provider_data.client.alert_configs().get(&project_id, &alert_id).await {
            Ok(config) => ReadResourceResponse {
                new_state: Some(alert_state(&project_id, &config, &request.current_state)),
                diagnostics,
                private: request.private,
            },
            Err(e) if e.is_not_found() => ReadResourceResponse {
                new_state: None,
                diagnostics,
                private: request.private,
            },
            Err(e) => {
                diagnostics.push(api_error("error getting Alert Configuration information", e));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                    private: request.private,
                }
            }
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return UpdateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        };
        let api = provider_data.client.alert_configs();
        let planned = &request.planned_state;

        let Some((project_id, alert_id)) = identity(&request.prior_state) else {
            diagnostics.push(Diagnostic::error(
                "error updating Alert Configuration information",
                "prior state does not identify an alert configuration",
            ));
            return UpdateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        };

        let desired = match alert_config_from(planned) {
            Ok(desired) => desired,
            Err(diags) => {
                diagnostics.extend(diags);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        // Atlas wants the whole configuration back, so start from its copy
        let mut body = match api.get(&project_id, &alert_id).await {
            Ok(current) => current,
            Err(e) => {
                diagnostics.push(api_error("error getting Alert Configuration information", e));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let changed = |name: &str| {
            planned.get(&AttributePath::new(name)) != request.prior_state.get(&AttributePath::new(name))
        };
        if changed("enabled") && desired.enabled.is_some() {
            body.enabled = desired.enabled;
        }
        if changed("event_type") {
            body.event_type_name = desired.event_type_name;
        }
        if changed(METRIC_THRESHOLD) {
            body.metric_threshold = desired.metric_threshold;
        }
        if changed(THRESHOLD) {
            body.threshold = desired.threshold;
        }
        if changed(MATCHER) {
            body.matchers = desired.matchers;
        }
        // Notifications come back with masked secrets and are always resent
        body.notifications = desired.notifications;

        match api.update(&project_id, &alert_id, &body).await {
            Ok(updated) => UpdateResourceResponse {
                new_state: alert_state(&project_id, &updated, planned),
                private: vec![],
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(api_error("error updating Alert Configuration information", e));
                UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                }
            }
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return DeleteResourceResponse { diagnostics };
        };

        let Some((project_id, alert_id)) = identity(&request.prior_state) else {
            return DeleteResourceResponse { diagnostics };
        };

        match provider_data.client.alert_configs().delete(&project_id, &alert_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => diagnostics.push(api_error("error deleting Alert Configuration information", e)),
        }

        DeleteResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for AlertConfigurationResource {
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
impl ResourceWithImportState for AlertConfigurationResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };

        match parse_alert_configuration_import_id(&request.id) {
            Ok((project_id, alert_id)) => {
                let state = DynamicValue::new(Dynamic::object([
                    (
                        "id",
                        Dynamic::String(encode_state_id([
                            ("id", alert_id.as_str()),
                            ("project_id", project_id.as_str()),
                        ])),
                    ),
                    ("project_id", Dynamic::String(project_id)),
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

    const PROJECT: &str = "5d0f1f73cf09a29120e173cf";

    fn notification(type_name: &str, interval_min: Option<f64>) -> Dynamic {
        Dynamic::object([
            ("type_name", Dynamic::String(type_name.into())),
            ("interval_min", Dynamic::number_or_null(interval_min)),
            ("service_key", Dynamic::String("pd-key".into())),
            ("channel_name", Dynamic::Null),
            ("roles", Dynamic::Null),
        ])
    }

    fn planned(notifications: Vec<Dynamic>) -> DynamicValue {
        DynamicValue::new(Dynamic::object([
            ("project_id", Dynamic::String(PROJECT.into())),
            ("event_type", Dynamic::String("OUTSIDE_METRIC_THRESHOLD".into())),
            ("enabled", Dynamic::Bool(true)),
            (
                METRIC_THRESHOLD,
                Dynamic::List(vec![Dynamic::object([
                    ("metric_name", Dynamic::String("ASSERT_REGULAR".into())),
                    ("operator", Dynamic::String("LESS_THAN".into())),
                    ("threshold", Dynamic::Number(99.0)),
                    ("units", Dynamic::String("RAW".into())),
                    ("mode", Dynamic::Null),
                ])]),
            ),
            (NOTIFICATION, Dynamic::List(notifications)),
        ]))
    }

    #[test]
    fn interval_min_rejected_for_self_scheduled_types() {
        let value = planned(vec![
            notification("GROUP", Some(5.0)),
            notification("pager_duty", Some(5.0)),
            notification("OPS_GENIE", Some(0.0)),
        ]);
        let diags = check_interval_min(&object_items(&value, NOTIFICATION));
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].attribute.as_ref().unwrap().to_string(),
            "notification[1].interval_min"
        );
        assert!(alert_config_from(&value).is_err());
    }

    #[test]
    fn request_carries_thresholds_and_notifications() {
        let body = alert_config_from(&planned(vec![notification("PAGER_DUTY", None)])).unwrap();
        assert_eq!(body.event_type_name, "OUTSIDE_METRIC_THRESHOLD");
        assert_eq!(body.metric_threshold.unwrap().threshold, Some(99.0));
        assert!(body.threshold.is_none());
        assert_eq!(body.notifications[0].service_key.as_deref(), Some("pd-key"));
        assert!(body.matchers.is_empty());
    }

    #[test]
    fn state_keeps_secrets_and_unset_fields() {
        let plan = planned(vec![notification("PAGER_DUTY", None)]);
        let api = AlertConfig {
            id: Some("a1".into()),
            event_type_name: "OUTSIDE_METRIC_THRESHOLD".into(),
            enabled: Some(true),
            metric_threshold: Some(MetricThreshold {
                metric_name: "ASSERT_REGULAR".into(),
                operator: Some("LESS_THAN".into()),
                threshold: Some(99.0),
                units: Some("RAW".into()),
                mode: Some("AVERAGE".into()),
            }),
            notifications: vec![AlertNotification {
                type_name: "PAGER_DUTY".into(),
                service_key: Some("****key".into()),
                channel_name: Some("ignored".into()),
                delay_min: Some(0),
                ..Default::default()
            }],
            ..Default::default()
        };

        let state = alert_state(PROJECT, &api, &plan);
        let first = AttributePath::new(NOTIFICATION).index(0);
        assert_eq!(
            state
                .get_string(&first.clone().attribute("service_key"))
                .unwrap(),
            "pd-key"
        );
        assert!(state.get(&first.clone().attribute("channel_name")).is_null());
        assert_eq!(state.get_number(&first.attribute("delay_min")).unwrap(), 0.0);
        assert!(state
            .get(&AttributePath::new(METRIC_THRESHOLD).index(0).attribute("mode"))
            .is_null());
        assert_eq!(
            identity(&state),
            Some((PROJECT.to_string(), "a1".to_string()))
        );
    }

    #[test]
    fn imported_state_takes_atlas_view() {
        let imported = DynamicValue::new(Dynamic::object([(
            "project_id",
            Dynamic::String(PROJECT.into()),
        )]));
        let api = AlertConfig {
            id: Some("a1".into()),
            event_type_name: "HOST_DOWN".into(),
            notifications: vec![AlertNotification {
                type_name: "SLACK".into(),
                channel_name: Some("#alerts".into()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let state = alert_state(PROJECT, &api, &imported);
        let first = AttributePath::new(NOTIFICATION).index(0);
        assert_eq!(
            state.get_string(&first.clone().attribute("channel_name")).unwrap(),
            "#alerts"
        );
        assert!(state.get(&first.attribute("api_token")).is_null());
        assert_eq!(
            state.get(&AttributePath::new(THRESHOLD)),
            Dynamic::List(vec![])
        );
    }
}
