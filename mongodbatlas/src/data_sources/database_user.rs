//! Single database user data source

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Dynamic, DynamicValue};

use super::lookup_error;
use crate::provider_data::{not_configured, MongoDbAtlasProviderData};
use crate::resources::database_user::{user_attributes, user_blocks, UserIdentity};
use crate::resources::required_string;

#[derive(Default)]
pub struct DatabaseUserDataSource {
    provider_data: Option<MongoDbAtlasProviderData>,
}

impl DatabaseUserDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for DatabaseUserDataSource {
    fn type_name(&self) -> &str {
        "mongodbatlas_database_user"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let required = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .required()
                .build()
        };
        let computed = |name: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .computed()
                .build()
        };
        let [roles, labels, scopes] = user_blocks(true);

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Reads one database user of a project")
            .attribute(computed("id"))
            .attribute(required("project_id", "Project the user belongs to"))
            .attribute(required("username", "Name of the user"))
            .attribute(required(
                "auth_database_name",
                "Database the user authenticates against",
            ))
            .attribute(computed("description"))
            .attribute(computed("x509_type"))
            .attribute(computed("oidc_auth_type"))
            .attribute(computed("ldap_auth_type"))
            .attribute(computed("aws_iam_type"))
            .block(roles)
            .block(labels)
            .block(scopes)
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return ReadDataSourceResponse {
                state: DynamicValue::null(),
                diagnostics,
            };
        };

        let config = &request.config;
        let identity = match (
            required_string(config, "project_id"),
            required_string(config, "username"),
            required_string(config, "auth_database_name"),
        ) {
            (Ok(project_id), Ok(username), Ok(auth_database_name)) => UserIdentity {
                project_id,
                username,
                auth_database_name,
            },
            (project_id, username, auth_database_name) => {
                diagnostics.extend(project_id.err());
                diagnostics.extend(username.err());
                diagnostics.extend(auth_database_name.err());
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let user = provider_data
            .client
            .database_users()
            .get(
                &identity.project_id,
                &identity.auth_database_name,
                &identity.username,
            )
            .await;

        match user {
            Ok(user) => {
                let mut fields = vec![("id", Dynamic::String(identity.state_id()))];
                fields.extend(user_attributes(&user));
                ReadDataSourceResponse {
                    state: DynamicValue::new(Dynamic::object(fields)),
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(lookup_error("database user", e));
                ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                }
            }
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for DatabaseUserDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];
        match MongoDbAtlasProviderData::from_any(request.provider_data) {
            Ok(data) => self.provider_data = Some(data),
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureDataSourceResponse { diagnostics }
    }
}
