//! Customer key management (encryption at rest) resource
//!
//! There is one configuration per project. Create and update both PATCH it,
//! delete disables every key provider. Atlas does not echo secrets back, so
//! they are carried over from the plan or the prior state.

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

use super::{api_error, item_bool, item_string, object_items, required_string};
use crate::api::encryption_at_rest::{
    AwsKmsConfiguration, AzureKeyVault, EncryptionAtRest, GoogleCloudKms,
};
use crate::api::{ApiError, Client};
use crate::provider_data::{not_configured, MongoDbAtlasProviderData};
use crate::retry_strategy::{
    encryption_at_rest_conf, COMPLETED, ENCRYPTION_TRANSIENT_ERROR_CODES, PENDING,
};

const AWS_BLOCK: &str = "aws_kms_config";
const AZURE_BLOCK: &str = "azure_key_vault_config";
const GCP_BLOCK: &str = "google_cloud_kms_config";

type Item = HashMap<String, Dynamic>;

/// Poller status for one PATCH attempt
///
/// Atlas rejects the update while the cloud provider role it assumes is
/// still propagating; those rejections are retried.
pub(crate) fn classify_update(
    result: Result<EncryptionAtRest, ApiError>,
) -> Result<(Option<EncryptionAtRest>, String), ApiError> {
    match result {
        Ok(updated) => Ok((Some(updated), COMPLETED.to_string())),
        Err(e)
            if ENCRYPTION_TRANSIENT_ERROR_CODES
                .iter()
                .any(|code| e.has_error_code(code)) =>
        {
            tracing::warn!(error = %e, "key provider not authorized yet, retrying");
            Ok((Some(EncryptionAtRest::default()), PENDING.to_string()))
        }
        Err(e) => Err(e),
    }
}

/// API value, falling back to what the practitioner supplied
fn echoed(api: &Option<String>, carried: Option<&Item>, key: &str) -> Dynamic {
    Dynamic::string_or_null(
        api.clone()
            .filter(|v| !v.is_empty())
            .or_else(|| carried.and_then(|c| item_string(c, key))),
    )
}

/// Practitioner value first; Atlas never returns these
fn write_only(api: &Option<String>, carried: Option<&Item>, key: &str) -> Dynamic {
    Dynamic::string_or_null(
        carried
            .and_then(|c| item_string(c, key))
            .or_else(|| api.clone().filter(|v| !v.is_empty())),
    )
}

fn aws_from_item(item: &Item) -> AwsKmsConfiguration {
    AwsKmsConfiguration {
        enabled: item_bool(item, "enabled"),
        access_key_id: item_string(item, "access_key_id"),
        secret_access_key: item_string(item, "secret_access_key"),
        customer_master_key_id: item_string(item, "customer_master_key_id"),
        region: item_string(item, "region"),
        role_id: item_string(item, "role_id"),
        valid: None,
    }
}

fn aws_item(aws: &AwsKmsConfiguration, carried: Option<&Item>) -> Dynamic {
    Dynamic::object([
        ("enabled", Dynamic::bool_or_null(aws.enabled)),
        ("access_key_id", echoed(&aws.access_key_id, carried, "access_key_id")),
        (
            "secret_access_key",
            write_only(&aws.secret_access_key, carried, "secret_access_key"),
        ),
        (
            "customer_master_key_id",
            echoed(&aws.customer_master_key_id, carried, "customer_master_key_id"),
        ),
        ("region", write_only(&aws.region, carried, "region")),
        ("role_id", echoed(&aws.role_id, carried, "role_id")),
    ])
}

fn azure_from_item(item: &Item) -> AzureKeyVault {
    AzureKeyVault {
        enabled: item_bool(item, "enabled"),
        client_id: item_string(item, "client_id"),
        azure_environment: item_string(item, "azure_environment"),
        subscription_id: item_string(item, "subscription_id"),
        resource_group_name: item_string(item, "resource_group_name"),
        key_vault_name: item_string(item, "key_vault_name"),
        key_identifier: item_string(item, "key_identifier"),
        secret: item_string(item, "secret"),
        tenant_id: item_string(item, "tenant_id"),
        require_private_networking: item_bool(item, "require_private_networking"),
        valid: None,
    }
}

fn azure_item(azure: &AzureKeyVault, carried: Option<&Item>) -> Dynamic {
    Dynamic::object([
        ("enabled", Dynamic::bool_or_null(azure.enabled)),
        ("client_id", echoed(&azure.client_id, carried, "client_id")),
        (
            "azure_environment",
            echoed(&azure.azure_environment, carried, "azure_environment"),
        ),
        (
            "subscription_id",
            echoed(&azure.subscription_id, carried, "subscription_id"),
        ),
        (
            "resource_group_name",
            echoed(&azure.resource_group_name, carried, "resource_group_name"),
        ),
        (
            "key_vault_name",
            echoed(&azure.key_vault_name, carried, "key_vault_name"),
        ),
        (
            "key_identifier",
            echoed(&azure.key_identifier, carried, "key_identifier"),
        ),
        ("secret", write_only(&azure.secret, carried, "secret")),
        ("tenant_id", echoed(&azure.tenant_id, carried, "tenant_id")),
        (
            "require_private_networking",
            Dynamic::bool_or_null(
                azure
                    .require_private_networking
                    .or_else(|| carried.and_then(|c| item_bool(c, "require_private_networking"))),
            ),
        ),
    ])
}

fn gcp_from_item(item: &Item) -> GoogleCloudKms {
    GoogleCloudKms {
        enabled: item_bool(item, "enabled"),
        service_account_key: item_string(item, "service_account_key"),
        key_version_resource_id: item_string(item, "key_version_resource_id"),
        valid: None,
    }
}

fn gcp_item(gcp: &GoogleCloudKms, carried: Option<&Item>) -> Dynamic {
    Dynamic::object([
        ("enabled", Dynamic::bool_or_null(gcp.enabled)),
        (
            "service_account_key",
            write_only(&gcp.service_account_key, carried, "service_account_key"),
        ),
        (
            "key_version_resource_id",
            echoed(&gcp.key_version_resource_id, carried, "key_version_resource_id"),
        ),
    ])
}

/// Request body for the blocks present in `value`
fn request_from(value: &DynamicValue) -> EncryptionAtRest {
    EncryptionAtRest {
        aws_kms: object_items(value, AWS_BLOCK).first().map(aws_from_item),
        azure_key_vault: object_items(value, AZURE_BLOCK).first().map(azure_from_item),
        google_cloud_kms: object_items(value, GCP_BLOCK).first().map(gcp_from_item),
    }
}

/// One block of state
///
/// A block the practitioner never wrote stays empty even though Atlas
/// reports every provider. After import there is nothing to compare with,
/// so disabled providers are left out instead.
fn block_state<T>(
    api: Option<&T>,
    enabled: impl Fn(&T) -> Option<bool>,
    carried: &[Item],
    importing: bool,
    render: impl Fn(&T, Option<&Item>) -> Dynamic,
) -> Dynamic {
    let keep = match api {
        None => false,
        Some(_) if !importing => !carried.is_empty(),
        Some(config) => enabled(config) == Some(true),
    };
    match api {
        Some(config) if keep => Dynamic::List(vec![render(config, carried.first())]),
        _ => Dynamic::List(vec![]),
    }
}

fn encryption_state(
    project_id: &str,
    api: &EncryptionAtRest,
    carried: &DynamicValue,
    importing: bool,
) -> DynamicValue {
    DynamicValue::new(Dynamic::object([
        ("id", Dynamic::String(project_id.to_string())),
        ("project_id", Dynamic::String(project_id.to_string())),
        (
            AWS_BLOCK,
            block_state(
                api.aws_kms.as_ref(),
                |c| c.enabled,
                &object_items(carried, AWS_BLOCK),
                importing,
                aws_item,
            ),
        ),
        (
            AZURE_BLOCK,
            block_state(
                api.azure_key_vault.as_ref(),
                |c| c.enabled,
                &object_items(carried, AZURE_BLOCK),
                importing,
                azure_item,
            ),
        ),
        (
            GCP_BLOCK,
            block_state(
                api.google_cloud_kms.as_ref(),
                |c| c.enabled,
                &object_items(carried, GCP_BLOCK),
                importing,
                gcp_item,
            ),
        ),
    ]))
}

fn key_block(name: &str, fields: &[(&str, AttributeType, bool)]) -> NestedBlock {
    let schema = fields
        .iter()
        .fold(SchemaBuilder::new(), |builder, (field, attribute_type, sensitive)| {
            let attribute = AttributeBuilder::new(field, attribute_type.clone()).optional();
            let attribute = if *field == "enabled" {
                attribute.computed()
            } else {
                attribute
            };
            let attribute = if *sensitive {
                attribute.sensitive()
            } else {
                attribute
            };
            builder.attribute(attribute.build())
        })
        .build();
    NestedBlock::new(name, NestingMode::List, schema).max_items(1)
}

#[derive(Default)]
pub struct EncryptionAtRestResource {
    provider_data: Option<MongoDbAtlasProviderData>,
}

impl EncryptionAtRestResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// PATCH `body`, retrying while the key provider is not yet authorized
    async fn apply(
        ctx: &Context,
        client: &Client,
        project_id: &str,
        body: &EncryptionAtRest,
    ) -> Result<EncryptionAtRest, Diagnostic> {
        let outcome = encryption_at_rest_conf()
            .wait_for_state(ctx, || async move {
                classify_update(client.encryption_at_rest().update(project_id, body).await)
            })
            .await
            .map_err(|e| {
                Diagnostic::error(
                    format!("error creating Encryption At Rest: {}", project_id),
                    e.to_string(),
                )
            })?;
        Ok(outcome.result.unwrap_or_default())
    }
}

#[async_trait]
impl Resource for EncryptionAtRestResource {
    fn type_name(&self) -> &str {
        "mongodbatlas_encryption_at_rest"
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
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Customer-managed encryption keys for an Atlas project")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Same as project_id")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project whose data is encrypted")
                    .required()
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .block(key_block(
                AWS_BLOCK,
                &[
                    ("enabled", AttributeType::Bool, false),
                    ("access_key_id", AttributeType::String, true),
                    ("secret_access_key", AttributeType::String, true),
                    ("customer_master_key_id", AttributeType::String, true),
                    ("region", AttributeType::String, false),
                    ("role_id", AttributeType::String, false),
                ],
            ))
            .block(key_block(
                AZURE_BLOCK,
                &[
                    ("enabled", AttributeType::Bool, false),
                    ("client_id", AttributeType::String, true),
                    ("azure_environment", AttributeType::String, false),
                    ("subscription_id", AttributeType::String, true),
                    ("resource_group_name", AttributeType::String, false),
                    ("key_vault_name", AttributeType::String, false),
                    ("key_identifier", AttributeType::String, true),
                    ("secret", AttributeType::String, true),
                    ("tenant_id", AttributeType::String, true),
                    ("require_private_networking", AttributeType::Bool, false),
                ],
            ))
            .block(key_block(
                GCP_BLOCK,
                &[
                    ("enabled", AttributeType::Bool, false),
                    ("service_account_key", AttributeType::String, true),
                    ("key_version_resource_id", AttributeType::String, true),
                ],
            ))
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

        let project_id = match required_string(&request.planned_state, "project_id") {
            Ok(id) => id,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let body = request_from(&request.planned_state);
        match Self::apply(&ctx, &provider_data.client, &project_id, &body).await {
            Ok(updated) => CreateResourceResponse {
                new_state: encryption_state(&project_id, &updated, &request.planned_state, false),
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

        // Imported state only carries the id
        let state_project = request
            .current_state
            .get_optional_string(&AttributePath::new("project_id"))
            .filter(|p| !p.is_empty());
        let importing = state_project.is_none();
        let Some(project_id) = state_project.or_else(|| {
            request
                .current_state
                .get_optional_string(&AttributePath::new("id"))
                .filter(|id| !id.is_empty())
        }) else {
            return ReadResourceResponse {
                new_state: None,
                diagnostics,
                private: request.private,
            };
        };

        match provider_data.client.encryption_at_rest().get(&project_id).await {
            Ok(current) => ReadResourceResponse {
                new_state: Some(encryption_state(
                    &project_id,
                    &current,
                    &request.current_state,
                    importing,
                )),
                diagnostics,
                private: request.private,
            },
            Err(e) if e.is_not_found() => ReadResourceResponse {
                new_state: None,
                diagnostics,
                private: request.private,
            },
            Err(e) => {
                diagnostics.push(api_error(
                    "error when getting encryption at rest resource during read",
                    e,
                ));
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

        let project_id = match required_string(&request.prior_state, "project_id") {
            Ok(id) => id,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let mut body = match client.encryption_at_rest().get(&project_id).await {
            Ok(current) => current,
            Err(e) => {
                diagnostics.push(api_error(
                    "error when getting encryption at rest resource during update",
                    e,
                ));
                return UpdateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        // Only providers whose block changed are resent
        let planned = request_from(&request.planned_state);
        let changed = |block: &str| {
            request.planned_state.get(&AttributePath::new(block))
                != request.prior_state.get(&AttributePath::new(block))
        };
        if changed(AWS_BLOCK) {
            body.aws_kms = planned.aws_kms;
        }
        if changed(AZURE_BLOCK) {
            body.azure_key_vault = planned.azure_key_vault;
        }
        if changed(GCP_BLOCK) {
            body.google_cloud_kms = planned.google_cloud_kms;
        }

        match Self::apply(&ctx, client, &project_id, &body).await {
            Ok(updated) => UpdateResourceResponse {
                new_state: encryption_state(&project_id, &updated, &request.planned_state, false),
                private: vec![],
                diagnostics,
            },
            Err(diag) => {
                diagnostics.push(diag);
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

        let project_id = match required_string(&request.prior_state, "project_id") {
            Ok(id) => id,
            Err(diag) => {
                diagnostics.push(diag);
                return DeleteResourceResponse { diagnostics };
            }
        };

        let api = provider_data.client.encryption_at_rest();
        match api.get(&project_id).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => return DeleteResourceResponse { diagnostics },
            Err(e) => {
                diagnostics.push(api_error("error when destroying resource", e));
                return DeleteResourceResponse { diagnostics };
            }
        }

        if let Err(e) = api.update(&project_id, &EncryptionAtRest::disabled()).await {
            diagnostics.push(api_error("error when destroying resource", e));
        }

        DeleteResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for EncryptionAtRestResource {
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
impl ResourceWithImportState for EncryptionAtRestResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        tfplug::import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);
        response
    }
}
