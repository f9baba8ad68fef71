//! Flex cluster resource

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tfplug::context::Context;
use tfplug::plan_modifier::{CreateOnly, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::retry::WaitError;
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlock, NestingMode, SchemaBuilder};
use tfplug::timeouts::{get_timeout, timeouts_attribute, Operation, TIMEOUTS_ATTRIBUTE};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use super::{api_error, required_string};
use crate::api::flex_clusters::{
    CreateFlexClusterRequest, FlexCluster, FlexProviderSettings, ResourceTag,
    UpdateFlexClusterRequest,
};
use crate::api::{ApiError, Client};
use crate::conversion::{encode_state_id, StateIdFields};
use crate::import_id::parse_flex_cluster_import_id;
use crate::provider_data::{not_configured, MongoDbAtlasProviderData};
use crate::retry_strategy::{
    flex_create_update_conf, flex_delete_conf, handle_create_timeout,
    resolve_delete_on_create_timeout, CleanupOutcome, DEFAULT_FLEX_TIMEOUT, DELETED,
};

const PROVIDER_SETTINGS: &str = "provider_settings";

/// Poller status for one GET; 404 means the cluster is gone
async fn flex_status(
    client: &Client,
    project_id: &str,
    name: &str,
) -> Result<(Option<FlexCluster>, String), ApiError> {
    match client.flex_clusters().get(project_id, name).await {
        Ok(cluster) => {
            let state = cluster.state_name.clone().unwrap_or_default();
            Ok((Some(cluster), state))
        }
        Err(e) if e.is_not_found() => Ok((None, DELETED.to_string())),
        Err(e) => Err(e),
    }
}

fn tags_from(value: &DynamicValue) -> Vec<ResourceTag> {
    match value.get(&AttributePath::new("tags")) {
        Dynamic::Map(tags) => tags
            .into_iter()
            .filter_map(|(key, value)| value.as_string().map(|v| (key, v.to_string())))
            .collect::<BTreeMap<_, _>>()
            .into_iter()
            .map(|(key, value)| ResourceTag { key, value })
            .collect(),
        _ => vec![],
    }
}

pub(crate) fn settings_object_type() -> AttributeType {
    AttributeType::Object(HashMap::from([
        ("backing_provider_name".to_string(), AttributeType::String),
        ("region_name".to_string(), AttributeType::String),
        ("disk_size_gb".to_string(), AttributeType::Number),
        ("provider_name".to_string(), AttributeType::String),
    ]))
}

pub(crate) fn backup_settings_type() -> AttributeType {
    AttributeType::Object(HashMap::from([("enabled".to_string(), AttributeType::Bool)]))
}

pub(crate) fn connection_strings_type() -> AttributeType {
    AttributeType::Object(HashMap::from([
        ("standard".to_string(), AttributeType::String),
        ("standard_srv".to_string(), AttributeType::String),
    ]))
}

/// Attributes read back from Atlas, shared with the data source
pub(crate) fn flex_attributes(cluster: &FlexCluster) -> Vec<(&'static str, Dynamic)> {
    let settings = &cluster.provider_settings;
    let tags = cluster
        .tags
        .iter()
        .map(|t| (t.key.clone(), Dynamic::String(t.value.clone())))
        .collect::<HashMap<_, _>>();

    vec![
        ("name", Dynamic::String(cluster.name.clone())),
        (
            PROVIDER_SETTINGS,
            Dynamic::object([
                (
                    "backing_provider_name",
                    Dynamic::String(settings.backing_provider_name.clone()),
                ),
                ("region_name", Dynamic::String(settings.region_name.clone())),
                ("disk_size_gb", Dynamic::number_or_null(settings.disk_size_gb)),
                ("provider_name", Dynamic::string_or_null(settings.provider_name.clone())),
            ]),
        ),
        (
            "backup_settings",
            Dynamic::object([(
                "enabled",
                Dynamic::bool_or_null(cluster.backup_settings.as_ref().and_then(|b| b.enabled)),
            )]),
        ),
        (
            "connection_strings",
            Dynamic::object([
                (
                    "standard",
                    Dynamic::string_or_null(
                        cluster.connection_strings.as_ref().and_then(|c| c.standard.clone()),
                    ),
                ),
                (
                    "standard_srv",
                    Dynamic::string_or_null(
                        cluster
                            .connection_strings
                            .as_ref()
                            .and_then(|c| c.standard_srv.clone()),
                    ),
                ),
            ]),
        ),
        ("cluster_type", Dynamic::string_or_null(cluster.cluster_type.clone())),
        ("create_date", Dynamic::string_or_null(cluster.create_date.clone())),
        ("mongo_db_version", Dynamic::string_or_null(cluster.mongo_db_version.clone())),
        ("state_name", Dynamic::string_or_null(cluster.state_name.clone())),
        ("tags", Dynamic::Map(tags)),
        (
            "termination_protection_enabled",
            Dynamic::bool_or_null(cluster.termination_protection_enabled),
        ),
        (
            "version_release_system",
            Dynamic::string_or_null(cluster.version_release_system.clone()),
        ),
    ]
}

#[derive(Default)]
pub struct FlexClusterResource {
    provider_data: Option<MongoDbAtlasProviderData>,
}

impl FlexClusterResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn flex_state(project_id: &str, cluster: &FlexCluster, carried: &DynamicValue) -> DynamicValue {
        let mut attributes = flex_attributes(cluster);

        // No tags reads back as an empty map; keep whatever the practitioner wrote
        if cluster.tags.is_empty() {
            if let Some((_, tags)) = attributes.iter_mut().find(|(name, _)| *name == "tags") {
                *tags = match carried.get(&AttributePath::new("tags")) {
                    Dynamic::Map(m) if m.is_empty() => Dynamic::Map(m),
                    _ => Dynamic::Null,
                };
            }
        }

        attributes.extend([
            (
                "id",
                Dynamic::String(encode_state_id([
                    ("project_id", project_id),
                    ("name", cluster.name.as_str()),
                ])),
            ),
            ("project_id", Dynamic::String(project_id.to_string())),
            (
                "delete_on_create_timeout",
                carried.get(&AttributePath::new("delete_on_create_timeout")),
            ),
            (
                TIMEOUTS_ATTRIBUTE,
                carried.get(&AttributePath::new(TIMEOUTS_ATTRIBUTE)),
            ),
        ]);
        DynamicValue::new(Dynamic::object(attributes))
    }

    /// `(project_id, name)` from the attributes, or the encoded id
    fn identity(value: &DynamicValue) -> Option<(String, String)> {
        let attribute = |name: &str| {
            value
                .get_optional_string(&AttributePath::new(name))
                .filter(|v| !v.is_empty())
        };
        if let (Some(project_id), Some(name)) = (attribute("project_id"), attribute("name")) {
            return Some((project_id, name));
        }
        let fields = StateIdFields::decode(&attribute("id")?);
        Some((
            fields.require("project_id").ok()?.to_string(),
            fields.require("name").ok()?.to_string(),
        ))
    }

    fn extract_create(planned: &DynamicValue) -> Result<(String, CreateFlexClusterRequest), Diagnostic> {
        let project_id = required_string(planned, "project_id")?;
        let name = required_string(planned, "name")?;
        let settings = |field: &str| {
            planned
                .get_optional_string(&AttributePath::new(PROVIDER_SETTINGS).attribute(field))
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    Diagnostic::error(
                        format!("Missing {}.{}", PROVIDER_SETTINGS, field),
                        format!("Attribute {}.{} must be set", PROVIDER_SETTINGS, field),
                    )
                    .with_attribute(AttributePath::new(PROVIDER_SETTINGS).attribute(field))
                })
        };

        Ok((
            project_id,
            CreateFlexClusterRequest {
                name,
                provider_settings: FlexProviderSettings {
                    backing_provider_name: settings("backing_provider_name")?,
                    region_name: settings("region_name")?,
                    disk_size_gb: None,
                    provider_name: None,
                },
                tags: tags_from(planned),
                termination_protection_enabled: planned
                    .get_optional_bool(&AttributePath::new("termination_protection_enabled")),
            },
        ))
    }

    fn timeout_diagnostic(e: impl std::fmt::Display) -> Diagnostic {
        Diagnostic::error("Invalid timeout", e.to_string())
            .with_attribute(AttributePath::new(TIMEOUTS_ATTRIBUTE))
    }

    /// Error for a failed create wait, plus what happened to the cleanup
    fn create_wait_diagnostics(
        name: &str,
        error: &WaitError<ApiError>,
        cleanup: CleanupOutcome,
    ) -> Vec<Diagnostic> {
        let mut diagnostics = vec![];
        let mut detail = format!("error waiting for flex cluster {} to become IDLE: {}", name, error);
        match cleanup {
            CleanupOutcome::NotAttempted => {}
            CleanupOutcome::Deleted => {
                detail.push_str(". The partially created cluster was deleted");
            }
            CleanupOutcome::Failed(reason) => diagnostics.push(Diagnostic::warning(
                "Cleanup after create timeout failed",
                format!(
                    "flex cluster {} could not be deleted and may need manual cleanup: {}",
                    name, reason
                ),
            )),
        }
        diagnostics.insert(0, Diagnostic::error("Failed to create flex cluster", detail));
        diagnostics
    }
}

#[async_trait]
impl Resource for FlexClusterResource {
    fn type_name(&self) -> &str {
        "mongodbatlas_flex_cluster"
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
        let computed = |name: &str, attribute_type: AttributeType, description: &str| {
            AttributeBuilder::new(name, attribute_type)
                .description(description)
                .computed()
                .plan_modifier(Box::new(UseStateForUnknown))
                .build()
        };

        let provider_settings = SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("backing_provider_name", AttributeType::String)
                    .description("Cloud provider hosting the flex cluster")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("region_name", AttributeType::String)
                    .description("Region of the flex cluster")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("disk_size_gb", AttributeType::Number)
                    .description("Storage capacity in gigabytes")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("provider_name", AttributeType::String)
                    .description("Always FLEX")
                    .computed()
                    .build(),
            )
            .build();

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Flex cluster in an Atlas project")
            .attribute(computed("id", AttributeType::String, "Encoded identifier of the flex cluster"))
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project that owns the flex cluster")
                    .required()
                    .plan_modifier(Box::new(CreateOnly))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the flex cluster")
                    .required()
                    .plan_modifier(Box::new(CreateOnly))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::Map(Box::new(AttributeType::String)))
                    .description("Key-value tags of the flex cluster")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("termination_protection_enabled", AttributeType::Bool)
                    .description("Prevents deletion while true")
                    .optional()
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(computed("backup_settings", backup_settings_type(), "Flex backup configuration"))
            .attribute(computed(
                "connection_strings",
                connection_strings_type(),
                "Connection strings of the flex cluster",
            ))
            .attribute(computed("cluster_type", AttributeType::String, "Flex cluster topology"))
            .attribute(computed("create_date", AttributeType::String, "Creation timestamp"))
            .attribute(
                AttributeBuilder::new("mongo_db_version", AttributeType::String)
                    .description("MongoDB version the cluster runs")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("state_name", AttributeType::String)
                    .description("Current operating condition of the cluster")
                    .computed()
                    .build(),
            )
            .attribute(computed(
                "version_release_system",
                AttributeType::String,
                "How the cluster receives MongoDB version upgrades",
            ))
            .attribute(
                AttributeBuilder::new("delete_on_create_timeout", AttributeType::Bool)
                    .description("Delete the cluster when creation times out (default true)")
                    .optional()
                    .plan_modifier(Box::new(CreateOnly))
                    .build(),
            )
            .attribute(timeouts_attribute(&[
                Operation::Create,
                Operation::Update,
                Operation::Delete,
            ]))
            .block(NestedBlock::new(PROVIDER_SETTINGS, NestingMode::Single, provider_settings).min_items(1))
            .build();

        ResourceSchemaResponse {
            schema,
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
        let client = provider_data.client.as_ref();
        let planned = &request.planned_state;

        let (project_id, body) = match Self::extract_create(planned) {
            Ok(extracted) => extracted,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };
        let timeout = match get_timeout(planned, Operation::Create, DEFAULT_FLEX_TIMEOUT) {
            Ok(t) => t,
            Err(e) => {
                diagnostics.push(Self::timeout_diagnostic(e));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };
        let ctx = ctx.with_timeout(timeout);

        if let Err(e) = client.flex_clusters().create(&project_id, &body).await {
            diagnostics.push(api_error("Failed to create flex cluster", e));
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        }
        tracing::info!(project_id = %project_id, name = %body.name, "flex cluster requested");

        let (project, name) = (project_id.as_str(), body.name.as_str());
        let waited = flex_create_update_conf(timeout)
            .wait_for_state(&ctx, || flex_status(client, project, name))
            .await;

        match waited {
            Ok(outcome) => match outcome.result {
                Some(cluster) => CreateResourceResponse {
                    new_state: Self::flex_state(project, &cluster, planned),
                    private: vec![],
                    diagnostics,
                },
                None => {
                    diagnostics.push(Diagnostic::error(
                        "Failed to create flex cluster",
                        format!("flex cluster {} disappeared while being created", name),
                    ));
                    CreateResourceResponse {
                        new_state: request.planned_state,
                        private: vec![],
                        diagnostics,
                    }
                }
            },
            Err(e) => {
                let delete_on_timeout = resolve_delete_on_create_timeout(
                    planned.get_optional_bool(&AttributePath::new("delete_on_create_timeout")),
                );
                let api = client.flex_clusters();
                let cleanup = handle_create_timeout(delete_on_timeout, &e, |cleanup_ctx| async move {
                    tokio::select! {
                        result = api.delete(project, name) => result.map_err(|e| e.to_string()),
                        _ = cleanup_ctx.cancelled() => Err("cleanup deadline exceeded".to_string()),
                    }
                })
                .await;
                diagnostics.extend(Self::create_wait_diagnostics(name, &e, cleanup));
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

        let Some((project_id, name)) = Self::identity(&request.current_state) else {
            return ReadResourceResponse {
                new_state: None,
                diagnostics,
                private: request.private,
            };
        };

        match provider_data.client.flex_clusters().get(&project_id, &name).await {
            Ok(cluster) => ReadResourceResponse {
                new_state: Some(Self::flex_state(&project_id, &cluster, &request.current_state)),
                diagnostics,
                private: request.private,
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!(name = %name, "flex cluster not found, removing from state");
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                    private: request.private,
                }
            }
            Err(e) => {
                diagnostics.push(api_error("Failed to read flex cluster", e));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                    private: request.private,
                }
            }
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return UpdateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        };
        let client = provider_data.client.as_ref();
        let planned = &request.planned_state;

        let Some((project_id, name)) = Self::identity(&request.prior_state) else {
            diagnostics.push(Diagnostic::error(
                "Failed to update flex cluster",
                "prior state does not identify a flex cluster",
            ));
            return UpdateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        };
        let timeout = match get_timeout(planned, Operation::Update, DEFAULT_FLEX_TIMEOUT) {
            Ok(t) => t,
            Err(e) => {
                diagnostics.push(Self::timeout_diagnostic(e));
                return UpdateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let body = UpdateFlexClusterRequest {
            tags: tags_from(planned),
            termination_protection_enabled: planned
                .get_optional_bool(&AttributePath::new("termination_protection_enabled")),
        };
        if let Err(e) = client.flex_clusters().update(&project_id, &name, &body).await {
            diagnostics.push(api_error("Failed to update flex cluster", e));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics,
            };
        }

        let ctx = ctx.with_timeout(timeout);
        let (project, cluster_name) = (project_id.as_str(), name.as_str());
        match flex_create_update_conf(timeout)
            .wait_for_state(&ctx, || flex_status(client, project, cluster_name))
            .await
        {
            Ok(outcome) => match outcome.result {
                Some(cluster) => UpdateResourceResponse {
                    new_state: Self::flex_state(project, &cluster, planned),
                    private: vec![],
                    diagnostics,
                },
                None => {
                    diagnostics.push(Diagnostic::error(
                        "Failed to update flex cluster",
                        format!("flex cluster {} disappeared while being updated", name),
                    ));
                    UpdateResourceResponse {
                        new_state: request.prior_state,
                        private: vec![],
                        diagnostics,
                    }
                }
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to update flex cluster",
                    format!("error waiting for flex cluster {} to become IDLE: {}", name, e),
                ));
                UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                }
            }
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return DeleteResourceResponse { diagnostics };
        };
        let client = provider_data.client.as_ref();

        let Some((project_id, name)) = Self::identity(&request.prior_state) else {
            return DeleteResourceResponse { diagnostics };
        };
        let timeout = match get_timeout(&request.prior_state, Operation::Delete, DEFAULT_FLEX_TIMEOUT) {
            Ok(t) => t,
            Err(e) => {
                diagnostics.push(Self::timeout_diagnostic(e));
                return DeleteResourceResponse { diagnostics };
            }
        };

        match client.flex_clusters().delete(&project_id, &name).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return DeleteResourceResponse { diagnostics },
            Err(e) => {
                diagnostics.push(api_error("Failed to delete flex cluster", e));
                return DeleteResourceResponse { diagnostics };
            }
        }

        let ctx = ctx.with_timeout(timeout);
        let (project, cluster_name) = (project_id.as_str(), name.as_str());
        if let Err(e) = flex_delete_conf(timeout)
            .wait_for_state(&ctx, || flex_status(client, project, cluster_name))
            .await
        {
            diagnostics.push(Diagnostic::error(
                "Failed to delete flex cluster",
                format!("error waiting for flex cluster {} to be deleted: {}", name, e),
            ));
        }

        DeleteResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for FlexClusterResource {
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
impl ResourceWithImportState for FlexClusterResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };

        match parse_flex_cluster_import_id(&request.id) {
            Ok((project_id, name)) => {
                let state = DynamicValue::new(Dynamic::object([
                    ("project_id", Dynamic::String(project_id)),
                    ("name", Dynamic::String(name)),
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
    use std::time::Duration;

    const PROJECT: &str = "5d0f1f73cf09a29120e173cf";

    fn planned() -> DynamicValue {
        DynamicValue::new(Dynamic::object([
            ("project_id", Dynamic::String(PROJECT.into())),
            ("name", Dynamic::String("flexy".into())),
            (
                PROVIDER_SETTINGS,
                Dynamic::object([
                    ("backing_provider_name", Dynamic::String("AWS".into())),
                    ("region_name", Dynamic::String("US_EAST_1".into())),
                    ("disk_size_gb", Dynamic::Unknown),
                    ("provider_name", Dynamic::Unknown),
                ]),
            ),
            (
                "tags",
                Dynamic::object([
                    ("team", Dynamic::String("data".into())),
                    ("env", Dynamic::String("dev".into())),
                ]),
            ),
            ("termination_protection_enabled", Dynamic::Unknown),
            ("delete_on_create_timeout", Dynamic::Bool(false)),
        ]))
    }

    #[test]
    fn create_request_sorts_tags_and_skips_unknowns() {
        let (project_id, body) = FlexClusterResource::extract_create(&planned()).unwrap();
        assert_eq!(project_id, PROJECT);
        assert_eq!(body.provider_settings.backing_provider_name, "AWS");
        assert_eq!(
            body.tags.iter().map(|t| t.key.as_str()).collect::<Vec<_>>(),
            vec!["env", "team"]
        );
        assert_eq!(body.termination_protection_enabled, None);
    }

    #[test]
    fn missing_provider_setting_points_at_nested_attribute() {
        let mut value = planned();
        value
            .set(
                &AttributePath::new(PROVIDER_SETTINGS).attribute("region_name"),
                Dynamic::Null,
            )
            .unwrap();
        let diag = FlexClusterResource::extract_create(&value).unwrap_err();
        assert_eq!(
            diag.attribute.unwrap().to_string(),
            "provider_settings.region_name"
        );
    }

    #[test]
    fn state_keeps_create_only_flags() {
        let cluster = FlexCluster {
            name: "flexy".into(),
            state_name: Some("IDLE".into()),
            provider_settings: FlexProviderSettings {
                backing_provider_name: "AWS".into(),
                region_name: "US_EAST_1".into(),
                disk_size_gb: Some(5.0),
                provider_name: Some("FLEX".into()),
            },
            ..Default::default()
        };
        let state = FlexClusterResource::flex_state(PROJECT, &cluster, &planned());

        assert!(!state.get_bool(&AttributePath::new("delete_on_create_timeout")).unwrap());
        assert!(state.get(&AttributePath::new("tags")).is_null());
        assert_eq!(
            state
                .get_number(&AttributePath::new(PROVIDER_SETTINGS).attribute("disk_size_gb"))
                .unwrap(),
            5.0
        );
        assert_eq!(
            FlexClusterResource::identity(&state),
            Some((PROJECT.to_string(), "flexy".to_string()))
        );

        let by_id = DynamicValue::new(Dynamic::object([(
            "id",
            state.get(&AttributePath::new("id")),
        )]));
        assert_eq!(
            FlexClusterResource::identity(&by_id),
            Some((PROJECT.to_string(), "flexy".to_string()))
        );
    }

    #[test]
    fn timeout_cleanup_outcome_shapes_diagnostics() {
        let error: WaitError<ApiError> = WaitError::Timeout {
            last_state: "CREATING".into(),
            target: "IDLE".into(),
            timeout: Duration::from_secs(60),
        };

        let deleted =
            FlexClusterResource::create_wait_diagnostics("flexy", &error, CleanupOutcome::Deleted);
        assert_eq!(deleted.len(), 1);
        assert!(deleted[0].detail.contains("was deleted"));

        let failed = FlexClusterResource::create_wait_diagnostics(
            "flexy",
            &error,
            CleanupOutcome::Failed("HTTP 500".into()),
        );
        assert_eq!(failed.len(), 2);
        assert!(failed[0].is_error());
        assert!(!failed[1].is_error());
        assert!(failed[1].detail.contains("HTTP 500"));
    }
}
