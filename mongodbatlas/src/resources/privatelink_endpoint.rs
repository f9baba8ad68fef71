//! Private endpoint service resource
//!
//! Atlas provisions the service asynchronously. Creation is complete once
//! the service is waiting for the user to attach their side of the link.

use async_trait::async_trait;
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
use tfplug::validator::StringOneOf;

use super::required_string;
use crate::api::private_endpoints::{CreateEndpointServiceRequest, EndpointService};
use crate::api::{ApiError, Client};
use crate::conversion::{encode_state_id, StateIdFields};
use crate::import_id::parse_privatelink_import_id;
use crate::provider_data::{not_configured, MongoDbAtlasProviderData};
use crate::retry_strategy::{
    privatelink_create_conf, privatelink_delete_conf, DEFAULT_PRIVATELINK_TIMEOUT, DELETED,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct EndpointIdentity {
    project_id: String,
    private_link_id: String,
    provider_name: String,
    region: String,
}

impl EndpointIdentity {
    fn state_id(&self) -> String {
        encode_state_id([
            ("private_link_id", self.private_link_id.as_str()),
            ("project_id", self.project_id.as_str()),
            ("provider_name", self.provider_name.as_str()),
            ("region", self.region.as_str()),
        ])
    }

    fn from_state_id(id: &str) -> Option<Self> {
        let fields = StateIdFields::decode(id);
        Some(Self {
            project_id: fields.require("project_id").ok()?.to_string(),
            private_link_id: fields.require("private_link_id").ok()?.to_string(),
            provider_name: fields.require("provider_name").ok()?.to_string(),
            region: fields.get("region").unwrap_or_default().to_string(),
        })
    }
}

/// Status the poller sees for one GET; 404 means the service is gone
async fn endpoint_status(
    client: &Client,
    identity: &EndpointIdentity,
) -> Result<(Option<EndpointService>, String), ApiError> {
    match client
        .private_endpoints()
        .get(
            &identity.project_id,
            &identity.provider_name,
            &identity.private_link_id,
        )
        .await
    {
        Ok(service) => {
            let status = service.status.clone().unwrap_or_default();
            Ok((Some(service), status))
        }
        Err(e) if e.is_not_found() => Ok((None, DELETED.to_string())),
        Err(e) => Err(e),
    }
}

#[derive(Default)]
pub struct PrivateLinkEndpointResource {
    provider_data: Option<MongoDbAtlasProviderData>,
}

impl PrivateLinkEndpointResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn endpoint_state(
        identity: &EndpointIdentity,
        service: &EndpointService,
        carried: &DynamicValue,
    ) -> DynamicValue {
        DynamicValue::new(Dynamic::object([
            ("id", Dynamic::String(identity.state_id())),
            ("project_id", Dynamic::String(identity.project_id.clone())),
            ("provider_name", Dynamic::String(identity.provider_name.clone())),
            ("region", Dynamic::String(identity.region.clone())),
            ("private_link_id", Dynamic::String(service.id.clone())),
            (
                "endpoint_service_name",
                Dynamic::string_or_null(service.endpoint_service_name.clone()),
            ),
            ("error_message", Dynamic::string_or_null(service.error_message.clone())),
            (
                "interface_endpoints",
                Dynamic::string_list(service.interface_endpoints.clone()),
            ),
            (
                "private_endpoints",
                Dynamic::string_list(service.private_endpoints.clone()),
            ),
            (
                "private_link_service_name",
                Dynamic::string_or_null(service.private_link_service_name.clone()),
            ),
            (
                "private_link_service_resource_id",
                Dynamic::string_or_null(service.private_link_service_resource_id.clone()),
            ),
            ("status", Dynamic::string_or_null(service.status.clone())),
            (
                "endpoint_group_names",
                Dynamic::string_list(service.endpoint_group_names.clone()),
            ),
            ("region_name", Dynamic::string_or_null(service.region_name.clone())),
            (
                "service_attachment_names",
                Dynamic::string_list(service.service_attachment_names.clone()),
            ),
            (
                TIMEOUTS_ATTRIBUTE,
                carried.get(&AttributePath::new(TIMEOUTS_ATTRIBUTE)),
            ),
        ]))
    }

    /// Read-back shared by create and read; a populated error message fails
    /// the operation but the state is still recorded
    async fn refresh_state(
        client: &Client,
        identity: &EndpointIdentity,
        carried: &DynamicValue,
    ) -> Result<Option<(DynamicValue, Option<Diagnostic>)>, Diagnostic> {
        let service = match client
            .private_endpoints()
            .get(
                &identity.project_id,
                &identity.provider_name,
                &identity.private_link_id,
            )
            .await
        {
            Ok(service) => service,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => {
                return Err(Diagnostic::error(
                    "Failed to read private endpoint service",
                    format!(
                        "error reading MongoDB Private Endpoints Connection({}): {}",
                        identity.private_link_id, e
                    ),
                ))
            }
        };

        let failure = service
            .error_message
            .as_deref()
            .filter(|m| !m.is_empty())
            .map(|m| {
                Diagnostic::error(
                    "Private endpoint service failed",
                    format!("privatelink endpoint is in a failed state: {}", m),
                )
            });
        Ok(Some((Self::endpoint_state(identity, &service, carried), failure)))
    }

    fn timeout_diagnostic(e: impl std::fmt::Display) -> Diagnostic {
        Diagnostic::error("Invalid timeout", e.to_string())
            .with_attribute(AttributePath::new(TIMEOUTS_ATTRIBUTE))
    }
}

#[async_trait]
impl Resource for PrivateLinkEndpointResource {
    fn type_name(&self) -> &str {
        "mongodbatlas_privatelink_endpoint"
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
        let computed_string = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .computed()
                .build()
        };
        let computed_list = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::List(Box::new(AttributeType::String)))
                .description(description)
                .computed()
                .build()
        };

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Private endpoint service for an Atlas project in one cloud region")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Encoded identifier of the endpoint service")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project that owns the endpoint service")
                    .required()
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("provider_name", AttributeType::String)
                    .description("Cloud provider: AWS, AZURE or GCP")
                    .required()
                    .validator(StringOneOf::boxed(["AWS", "AZURE", "GCP"]))
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .description("Cloud provider region of the endpoint service")
                    .required()
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("private_link_id", AttributeType::String)
                    .description("Atlas identifier of the endpoint service")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(computed_string("endpoint_service_name", "AWS endpoint service name"))
            .attribute(computed_string("error_message", "Failure reason, if any"))
            .attribute(computed_list("interface_endpoints", "AWS interface endpoints"))
            .attribute(computed_list("private_endpoints", "Azure private endpoints"))
            .attribute(computed_string("private_link_service_name", "Azure Private Link Service name"))
            .attribute(computed_string(
                "private_link_service_resource_id",
                "Azure Private Link Service resource id",
            ))
            .attribute(computed_string("status", "Status of the endpoint service"))
            .attribute(computed_list("endpoint_group_names", "GCP endpoint groups"))
            .attribute(computed_string("region_name", "Atlas region name"))
            .attribute(computed_list("service_attachment_names", "GCP service attachments"))
            .attribute(timeouts_attribute(&[Operation::Create, Operation::Delete]))
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

        let (project_id, provider_name, region) = match (
            required_string(planned, "project_id"),
            required_string(planned, "provider_name"),
            required_string(planned, "region"),
        ) {
            (Ok(p), Ok(n), Ok(r)) => (p, n, r),
            (p, n, r) => {
                diagnostics.extend([p.err(), n.err(), r.err()].into_iter().flatten());
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let timeout = match get_timeout(planned, Operation::Create, DEFAULT_PRIVATELINK_TIMEOUT) {
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

        let created = match client
            .private_endpoints()
            .create(
                &project_id,
                &CreateEndpointServiceRequest {
                    provider_name: provider_name.clone(),
                    region: region.clone(),
                },
            )
            .await
        {
            Ok(created) => created,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create private endpoint service",
                    format!("error creating MongoDB Private Endpoints Connection: {}", e),
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let identity = EndpointIdentity {
            project_id,
            private_link_id: created.id,
            provider_name,
            region,
        };
        tracing::info!(private_link_id = %identity.private_link_id, "waiting for private endpoint service");

        let waited = privatelink_create_conf(timeout)
            .wait_for_state(&ctx, || endpoint_status(client, &identity))
            .await;
        if let Err(e) = waited {
            diagnostics.push(Diagnostic::error(
                "Failed to create private endpoint service",
                format!("error creating MongoDB Private Endpoints Connection: {}", e),
            ));
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        }

        match Self::refresh_state(client, &identity, planned).await {
            Ok(Some((new_state, failure))) => {
                diagnostics.extend(failure);
                CreateResourceResponse {
                    new_state,
                    private: vec![],
                    diagnostics,
                }
            }
            Ok(None) => {
                diagnostics.push(Diagnostic::error(
                    "Private endpoint service disappeared",
                    format!(
                        "private endpoint service {} was deleted while being created",
                        identity.private_link_id
                    ),
                ));
                CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                }
            }
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
        let Some(identity) = EndpointIdentity::from_state_id(&id) else {
            return ReadResourceResponse {
                new_state: None,
                diagnostics,
                private: request.private,
            };
        };

        match Self::refresh_state(&provider_data.client, &identity, &request.current_state).await {
            Ok(Some((new_state, failure))) => {
                diagnostics.extend(failure);
                ReadResourceResponse {
                    new_state: Some(new_state),
                    diagnostics,
                    private: request.private,
                }
            }
            Ok(None) => ReadResourceResponse {
                new_state: None,
                diagnostics,
                private: request.private,
            },
            Err(diag) => {
                diagnostics.push(diag);
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                    private: request.private,
                }
            }
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        // Only the timeouts block can change in place
        UpdateResourceResponse {
            new_state: request.planned_state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return DeleteResourceResponse { diagnostics };
        };
        let client = provider_data.client.as_ref();

        let id = request
            .prior_state
            .get_optional_string(&AttributePath::new("id"))
            .unwrap_or_default();
        let Some(identity) = EndpointIdentity::from_state_id(&id) else {
            return DeleteResourceResponse { diagnostics };
        };

        let timeout = match get_timeout(
            &request.prior_state,
            Operation::Delete,
            DEFAULT_PRIVATELINK_TIMEOUT,
        ) {
            Ok(t) => t,
            Err(e) => {
                diagnostics.push(Self::timeout_diagnostic(e));
                return DeleteResourceResponse { diagnostics };
            }
        };

        match client
            .private_endpoints()
            .delete(
                &identity.project_id,
                &identity.provider_name,
                &identity.private_link_id,
            )
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return DeleteResourceResponse { diagnostics },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete private endpoint service",
                    format!(
                        "error deleting MongoDB Private Endpoints Connection({}): {}",
                        identity.private_link_id, e
                    ),
                ));
                return DeleteResourceResponse { diagnostics };
            }
        }

        tracing::info!(private_link_id = %identity.private_link_id, "waiting for private endpoint service to be destroyed");
        let ctx = ctx.with_timeout(timeout);
        if let Err(e) = privatelink_delete_conf(timeout)
            .wait_for_state(&ctx, || endpoint_status(client, &identity))
            .await
        {
            diagnostics.push(Diagnostic::error(
                "Failed to delete private endpoint service",
                format!(
                    "error deleting MongoDB Private Endpoints Connection({}): {}",
                    identity.private_link_id, e
                ),
            ));
        }

        DeleteResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for PrivateLinkEndpointResource {
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
impl ResourceWithImportState for PrivateLinkEndpointResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };

        match parse_privatelink_import_id(&request.id) {
            Ok(parsed) => {
                let identity = EndpointIdentity {
                    project_id: parsed.project_id,
                    private_link_id: parsed.private_link_id,
                    provider_name: parsed.provider_name,
                    region: parsed.region,
                };
                let state = DynamicValue::new(Dynamic::object([
                    ("id", Dynamic::String(identity.state_id())),
                    ("project_id", Dynamic::String(identity.project_id)),
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

    fn identity() -> EndpointIdentity {
        EndpointIdentity {
            project_id: "5d0f1f73cf09a29120e173cf".into(),
            private_link_id: "5df264b8f10fab7d2cad2f0d".into(),
            provider_name: "AWS".into(),
            region: "us-east-1".into(),
        }
    }

    #[test]
    fn state_id_keeps_dashed_region() {
        let identity = identity();
        assert_eq!(
            EndpointIdentity::from_state_id(&identity.state_id()),
            Some(identity)
        );
        assert_eq!(EndpointIdentity::from_state_id(""), None);
    }

    #[test]
    fn state_lists_are_never_null() {
        let service = EndpointService {
            id: "5df264b8f10fab7d2cad2f0d".into(),
            status: Some("WAITING_FOR_USER".into()),
            endpoint_service_name: Some("com.amazonaws.vpce.us-east-1.vpce-svc-1".into()),
            ..Default::default()
        };
        let carried = DynamicValue::new(Dynamic::object([(
            TIMEOUTS_ATTRIBUTE,
            Dynamic::object([("create", Dynamic::String("30m".into()))]),
        )]));

        let state = PrivateLinkEndpointResource::endpoint_state(&identity(), &service, &carried);
        assert_eq!(
            state.get(&AttributePath::new("interface_endpoints")),
            Dynamic::List(vec![])
        );
        assert_eq!(
            state.get_string(&AttributePath::new("region")).unwrap(),
            "us-east-1"
        );
        assert_eq!(
            state
                .get_string(&AttributePath::new(TIMEOUTS_ATTRIBUTE).attribute("create"))
                .unwrap(),
            "30m"
        );
        assert!(state.get(&AttributePath::new("error_message")).is_null());
    }
}
