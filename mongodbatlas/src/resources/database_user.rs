//! Database user resource

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticString;
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

use super::{api_error, item_string, object_items, required_string};
use crate::api::database_users::{ComponentLabel, DatabaseUser, DatabaseUserRole, UserScope};
use crate::conversion::{encode_state_id, StateIdFields};
use crate::import_id::parse_database_user_import_id;
use crate::provider_data::{not_configured, MongoDbAtlasProviderData};

const NONE: &str = "NONE";

/// Location of a user: project, authentication database and name
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UserIdentity {
    pub project_id: String,
    pub username: String,
    pub auth_database_name: String,
}

impl UserIdentity {
    pub fn state_id(&self) -> String {
        encode_state_id([
            ("project_id", self.project_id.as_str()),
            ("username", self.username.as_str()),
            ("auth_database_name", self.auth_database_name.as_str()),
        ])
    }

    /// Attributes first, then the encoded state ID, then the import format
    fn from_state(state: &DynamicValue) -> Result<Option<Self>, Diagnostic> {
        let attr = |name: &str| {
            state
                .get_optional_string(&AttributePath::new(name))
                .unwrap_or_default()
        };
        let (project_id, username, auth_database_name) = (
            attr("project_id"),
            attr("username"),
            attr("auth_database_name"),
        );
        if !project_id.is_empty() && !username.is_empty() && !auth_database_name.is_empty() {
            return Ok(Some(Self {
                project_id,
                username,
                auth_database_name,
            }));
        }

        let id = attr("id");
        if id.is_empty() {
            return Ok(None);
        }

        let fields = StateIdFields::decode(&id);
        if let (Ok(project_id), Ok(username), Ok(auth_database_name)) = (
            fields.require("project_id"),
            fields.require("username"),
            fields.require("auth_database_name"),
        ) {
            return Ok(Some(Self {
                project_id: project_id.to_string(),
                username: username.to_string(),
                auth_database_name: auth_database_name.to_string(),
            }));
        }

        let parsed = parse_database_user_import_id(&id).map_err(|e| {
            Diagnostic::error("error splitting database User info from ID", e.to_string())
                .with_attribute(AttributePath::new("id"))
        })?;
        Ok(Some(Self {
            project_id: parsed.project_id,
            username: parsed.username,
            auth_database_name: parsed.auth_database_name,
        }))
    }
}

/// State attributes shared by the resource and the data sources
pub(crate) fn user_attributes(user: &DatabaseUser) -> Vec<(&'static str, Dynamic)> {
    let roles = user
        .roles
        .iter()
        .map(|role| {
            Dynamic::object([
                ("role_name", Dynamic::String(role.role_name.clone())),
                ("database_name", Dynamic::String(role.database_name.clone())),
                (
                    "collection_name",
                    Dynamic::string_or_null(role.collection_name.clone()),
                ),
            ])
        })
        .collect();
    let labels = user
        .labels
        .iter()
        .map(|label| {
            Dynamic::object([
                ("key", Dynamic::string_or_null(label.key.clone())),
                ("value", Dynamic::string_or_null(label.value.clone())),
            ])
        })
        .collect();
    let scopes = user
        .scopes
        .iter()
        .map(|scope| {
            Dynamic::object([
                ("name", Dynamic::String(scope.name.clone())),
                ("type", Dynamic::String(scope.scope_type.clone())),
            ])
        })
        .collect();
    let auth_type = |value: &Option<String>| {
        Dynamic::String(value.clone().unwrap_or_else(|| NONE.to_string()))
    };

    vec![
        ("project_id", Dynamic::String(user.group_id.clone())),
        (
            "auth_database_name",
            Dynamic::String(user.database_name.clone()),
        ),
        ("username", Dynamic::String(user.username.clone())),
        ("description", Dynamic::string_or_null(user.description.clone())),
        ("x509_type", auth_type(&user.x509_type)),
        ("oidc_auth_type", auth_type(&user.oidc_auth_type)),
        ("ldap_auth_type", auth_type(&user.ldap_auth_type)),
        ("aws_iam_type", auth_type(&user.aws_iam_type)),
        ("roles", Dynamic::List(roles)),
        ("labels", Dynamic::List(labels)),
        ("scopes", Dynamic::List(scopes)),
    ]
}

fn role_block(computed_only: bool) -> NestedBlock {
    let field = |name: &str, description: &str| {
        let builder = AttributeBuilder::new(name, AttributeType::String).description(description);
        if computed_only {
            builder.computed().build()
        } else {
            builder.optional().computed().build()
        }
    };
    NestedBlock::new(
        "roles",
        NestingMode::Set,
        SchemaBuilder::new()
            .attribute(field("role_name", "Name of the role to grant"))
            .attribute(field("database_name", "Database on which the role applies"))
            .attribute(field(
                "collection_name",
                "Collection on which the role applies",
            ))
            .build(),
    )
}

fn label_block(computed_only: bool) -> NestedBlock {
    let field = |name: &str| {
        let builder = AttributeBuilder::new(name, AttributeType::String);
        if computed_only {
            builder.computed().build()
        } else {
            builder.optional().computed().build()
        }
    };
    NestedBlock::new(
        "labels",
        NestingMode::Set,
        SchemaBuilder::new()
            .attribute(field("key"))
            .attribute(field("value"))
            .build(),
    )
}

fn scope_block(computed_only: bool) -> NestedBlock {
    let field = |name: &str, description: &str| {
        let builder = AttributeBuilder::new(name, AttributeType::String).description(description);
        if computed_only {
            builder.computed().build()
        } else {
            builder.optional().computed().build()
        }
    };
    NestedBlock::new(
        "scopes",
        NestingMode::Set,
        SchemaBuilder::new()
            .attribute(field("name", "Name of the cluster or data lake"))
            .attribute(field("type", "CLUSTER or DATA_LAKE"))
            .build(),
    )
}

/// Nested blocks of a user, computed-only for data sources
pub(crate) fn user_blocks(computed_only: bool) -> [NestedBlock; 3] {
    [
        role_block(computed_only),
        label_block(computed_only),
        scope_block(computed_only),
    ]
}

#[derive(Default)]
pub struct DatabaseUserResource {
    provider_data: Option<MongoDbAtlasProviderData>,
}

impl DatabaseUserResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_user(&self, value: &DynamicValue) -> Result<DatabaseUser, Diagnostic> {
        let optional = |name: &str| {
            value
                .get_optional_string(&AttributePath::new(name))
                .filter(|v| !v.is_empty())
        };

        let roles = object_items(value, "roles")
            .iter()
            .map(|role| DatabaseUserRole {
                role_name: item_string(role, "role_name").unwrap_or_default(),
                database_name: item_string(role, "database_name").unwrap_or_default(),
                collection_name: item_string(role, "collection_name"),
            })
            .collect();
        let labels = object_items(value, "labels")
            .iter()
            .map(|label| ComponentLabel {
                key: item_string(label, "key"),
                value: item_string(label, "value"),
            })
            .collect();
        let scopes = object_items(value, "scopes")
            .iter()
            .map(|scope| UserScope {
                name: item_string(scope, "name").unwrap_or_default(),
                scope_type: item_string(scope, "type").unwrap_or_default(),
            })
            .collect();

        Ok(DatabaseUser {
            group_id: required_string(value, "project_id")?,
            database_name: required_string(value, "auth_database_name")?,
            username: required_string(value, "username")?,
            password: optional("password"),
            description: optional("description"),
            x509_type: optional("x509_type"),
            oidc_auth_type: optional("oidc_auth_type"),
            ldap_auth_type: optional("ldap_auth_type"),
            aws_iam_type: optional("aws_iam_type"),
            roles,
            labels,
            scopes,
        })
    }

    /// The API never returns the password, it is carried over from config
    fn user_state(user: &DatabaseUser, password: Option<String>) -> DynamicValue {
        let identity = UserIdentity {
            project_id: user.group_id.clone(),
            username: user.username.clone(),
            auth_database_name: user.database_name.clone(),
        };
        let mut attributes = user_attributes(user);
        attributes.push(("id", Dynamic::String(identity.state_id())));
        attributes.push(("password", Dynamic::string_or_null(password)));
        DynamicValue::new(Dynamic::object(attributes))
    }
}

#[async_trait]
impl Resource for DatabaseUserResource {
    fn type_name(&self) -> &str {
        "mongodbatlas_database_user"
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
        let [roles, labels, scopes] = user_blocks(false);
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a database user of an Atlas project")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Encoded identifier of the user")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project the user belongs to")
                    .required()
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("auth_database_name", AttributeType::String)
                    .description("Database the user authenticates against, admin or $external")
                    .required()
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("username", AttributeType::String)
                    .description("Name of the user")
                    .required()
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("password", AttributeType::String)
                    .description("Password for SCRAM authentication")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Free-form description of the user")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("x509_type", AttributeType::String)
                    .description("X.509 authentication method")
                    .default(StaticString::boxed(NONE))
                    .validator(StringOneOf::boxed([NONE, "MANAGED", "CUSTOMER"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("oidc_auth_type", AttributeType::String)
                    .description("OIDC federated authentication method")
                    .default(StaticString::boxed(NONE))
                    .validator(StringOneOf::boxed([NONE, "IDP_GROUP", "USER"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ldap_auth_type", AttributeType::String)
                    .description("LDAP authentication method")
                    .default(StaticString::boxed(NONE))
                    .validator(StringOneOf::boxed([NONE, "USER", "GROUP"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("aws_iam_type", AttributeType::String)
                    .description("AWS IAM authentication method")
                    .default(StaticString::boxed(NONE))
                    .validator(StringOneOf::boxed([NONE, "USER", "ROLE"]))
                    .build(),
            )
            .block(roles.min_items(1))
            .block(labels)
            .block(scopes)
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
        let mut diagnostics = vec![];

        let has_password = request
            .config
            .get_optional_string(&AttributePath::new("password"))
            .is_some_and(|p| !p.is_empty());
        if has_password {
            for other in ["x509_type", "ldap_auth_type", "aws_iam_type"] {
                let value = request.config.get_optional_string(&AttributePath::new(other));
                if value.is_some_and(|v| v != NONE) {
                    diagnostics.push(
                        Diagnostic::error(
                            "Conflicting authentication settings",
                            format!("password cannot be combined with {}", other),
                        )
                        .with_attribute(AttributePath::new("password")),
                    );
                }
            }
        }

        ValidateResourceConfigResponse { diagnostics }
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

        let user = match self.extract_user(&request.planned_state) {
            Ok(user) => user,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match provider_data.client.database_users().create(&user).await {
            Ok(created) => {
                tracing::info!(username = %created.username, "created database user");
                CreateResourceResponse {
                    new_state: Self::user_state(&created, user.password),
                    private: vec![],
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(api_error("error during database user creation", e));
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

        let identity = match UserIdentity::from_state(&request.current_state) {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                return ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                    private: request.private,
                }
            }
            Err(diag) => {
                diagnostics.push(diag);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                    private: request.private,
                };
            }
        };

        let password = request
            .current_state
            .get_optional_string(&AttributePath::new("password"));

        match provider_data
            .client
            .database_users()
            .get(
                &identity.project_id,
                &identity.auth_database_name,
                &identity.username,
            )
            .await
        {
            Ok(user) => ReadResourceResponse {
                new_state: Some(Self::user_state(&user, password)),
                diagnostics,
                private: request.private,
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!(username = %identity.username, "database user not found, removing from state");
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                    private: request.private,
                }
            }
            Err(e) => {
                diagnostics.push(api_error("error getting database user information", e));
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
                new_state: request.prior_state,
                private: vec![],
                diagnostics,
            };
        };

        let user = match self.extract_user(&request.planned_state) {
            Ok(user) => user,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match provider_data.client.database_users().update(&user).await {
            Ok(updated) => UpdateResourceResponse {
                new_state: Self::user_state(&updated, user.password),
                private: vec![],
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(api_error("error during database user update", e));
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

        let identity = match UserIdentity::from_state(&request.prior_state) {
            Ok(Some(identity)) => identity,
            Ok(None) => return DeleteResourceResponse { diagnostics },
            Err(diag) => {
                diagnostics.push(diag);
                return DeleteResourceResponse { diagnostics };
            }
        };

        match provider_data
            .client
            .database_users()
            .delete(
                &identity.project_id,
                &identity.auth_database_name,
                &identity.username,
            )
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!(username = %identity.username, "database user already gone");
            }
            Err(e) => {
                diagnostics.push(api_error(
                    "error when destroying the database user resource",
                    e,
                ));
            }
        }

        DeleteResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for DatabaseUserResource {
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
impl ResourceWithImportState for DatabaseUserResource {
    /// `{project_id}-{username}-{auth_database_name}`, split by the read that follows
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };

        if let Err(e) = parse_database_user_import_id(&request.id) {
            response
                .diagnostics
                .push(Diagnostic::error("Invalid import ID", e.to_string()));
            return response;
        }

        tfplug::import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);
        response
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    const PROJECT: &str = "5d0f1f73cf09a29120e173cf";

    fn planned(password: Option<&str>) -> DynamicValue {
        DynamicValue::new(Dynamic::object([
            ("project_id", Dynamic::String(PROJECT.into())),
            ("auth_database_name", Dynamic::String("admin".into())),
            ("username", Dynamic::String("app".into())),
            ("password", Dynamic::string_or_null(password)),
            ("x509_type", Dynamic::String(NONE.into())),
            (
                "roles",
                Dynamic::List(vec![Dynamic::object([
                    ("role_name", Dynamic::String("readWrite".into())),
                    ("database_name", Dynamic::String("app".into())),
                    ("collection_name", Dynamic::Null),
                ])]),
            ),
            ("labels", Dynamic::Null),
            ("scopes", Dynamic::List(vec![])),
        ]))
    }

    #[test]
    fn extracts_user_from_plan() {
        let user = DatabaseUserResource::new()
            .extract_user(&planned(Some("s3cret")))
            .unwrap();
        assert_eq!(user.group_id, PROJECT);
        assert_eq!(user.password.as_deref(), Some("s3cret"));
        assert_eq!(user.x509_type.as_deref(), Some(NONE));
        assert_eq!(user.roles.len(), 1);
        assert_eq!(user.roles[0].role_name, "readWrite");
        assert!(user.labels.is_empty());
    }

    #[test]
    fn state_keeps_password_and_encodes_id() {
        let user = DatabaseUserResource::new()
            .extract_user(&planned(None))
            .unwrap();
        let state = DatabaseUserResource::user_state(&user, Some("kept".into()));

        assert_eq!(
            state.get_string(&AttributePath::new("password")).unwrap(),
            "kept"
        );
        let id = state.get_string(&AttributePath::new("id")).unwrap();
        let fields = StateIdFields::decode(&id);
        assert_eq!(fields.get("username"), Some("app"));
        assert_eq!(fields.get("auth_database_name"), Some("admin"));
        assert_eq!(
            state.get_string(&AttributePath::new("ldap_auth_type")).unwrap(),
            NONE
        );
    }

    #[test]
    fn identity_falls_back_to_import_format() {
        let state = DynamicValue::new(Dynamic::object([(
            "id",
            Dynamic::String(format!("{PROJECT}-my-user-$external")),
        )]));
        let identity = UserIdentity::from_state(&state).unwrap().unwrap();
        assert_eq!(identity.username, "my-user");
        assert_eq!(identity.auth_database_name, "$external");

        let encoded = DynamicValue::new(Dynamic::object([(
            "id",
            Dynamic::String(identity.state_id()),
        )]));
        assert_eq!(UserIdentity::from_state(&encoded).unwrap(), Some(identity));

        let bad = DynamicValue::new(Dynamic::object([("id", Dynamic::String("junk".into()))]));
        assert!(UserIdentity::from_state(&bad).is_err());
        assert_eq!(UserIdentity::from_state(&DynamicValue::null()).unwrap(), None);
    }

    #[tokio::test]
    async fn password_conflicts_with_other_auth_types() {
        let mut config = planned(Some("pw"));
        config
            .set_string(&AttributePath::new("aws_iam_type"), "USER".into())
            .unwrap();
        let response = DatabaseUserResource::new()
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "mongodbatlas_database_user".into(),
                    config,
                    client_capabilities: Default::default(),
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("aws_iam_type"));
    }
}
