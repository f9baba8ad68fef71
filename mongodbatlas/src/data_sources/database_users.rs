//! Database users of a project

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

use super::{lookup_error, object_type, pagination_schema, requested_page};
use crate::api::database_users::DatabaseUser;
use crate::api::Paginated;
use crate::conversion::encode_state_id;
use crate::provider_data::{not_configured, MongoDbAtlasProviderData};
use crate::resources::database_user::user_attributes;
use crate::resources::required_string;

fn result_type() -> AttributeType {
    let list_of = |fields: Vec<(&'static str, AttributeType)>| {
        AttributeType::List(Box::new(object_type(fields)))
    };

    object_type([
        ("project_id", AttributeType::String),
        ("auth_database_name", AttributeType::String),
        ("username", AttributeType::String),
        ("description", AttributeType::String),
        ("x509_type", AttributeType::String),
        ("oidc_auth_type", AttributeType::String),
        ("ldap_auth_type", AttributeType::String),
        ("aws_iam_type", AttributeType::String),
        (
            "roles",
            list_of(vec![
                ("role_name", AttributeType::String),
                ("database_name", AttributeType::String),
                ("collection_name", AttributeType::String),
            ]),
        ),
        (
            "labels",
            list_of(vec![
                ("key", AttributeType::String),
                ("value", AttributeType::String),
            ]),
        ),
        (
            "scopes",
            list_of(vec![
                ("name", AttributeType::String),
                ("type", AttributeType::String),
            ]),
        ),
    ])
}

fn users_state(
    project_id: &str,
    page: &DynamicValue,
    listed: Paginated<DatabaseUser>,
) -> DynamicValue {
    let total = listed
        .total_count
        .unwrap_or(listed.results.len() as u64);
    let results = listed
        .results
        .iter()
        .map(|user| Dynamic::object(user_attributes(user)))
        .collect();

    DynamicValue::new(Dynamic::object([
        (
            "id",
            Dynamic::String(encode_state_id([("project_id", project_id)])),
        ),
        ("project_id", Dynamic::String(project_id.to_string())),
        ("page_num", page.get(&AttributePath::new("page_num"))),
        (
            "items_per_page",
            page.get(&AttributePath::new("items_per_page")),
        ),
        ("total_count", Dynamic::Number(total as f64)),
        ("results", Dynamic::List(results)),
    ]))
}

#[derive(Default)]
pub struct DatabaseUsersDataSource {
    provider_data: Option<MongoDbAtlasProviderData>,
}

impl DatabaseUsersDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for DatabaseUsersDataSource {
    fn type_name(&self) -> &str {
        "mongodbatlas_database_users"
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
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Lists the database users of a project")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project whose users are listed")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("results", AttributeType::List(Box::new(result_type())))
                    .description("Users on the requested page, or all of them")
                    .computed()
                    .build(),
            );

        DataSourceSchemaResponse {
            schema: pagination_schema(schema).build(),
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
        let project_id = match required_string(config, "project_id") {
            Ok(project_id) => project_id,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let api = provider_data.client.database_users();
        let listed = match requested_page(config) {
            Some(page) => api.list_page(&project_id, page).await,
            None => api.list(&project_id).await.map(|results| Paginated {
                total_count: Some(results.len() as u64),
                results,
            }),
        };

        match listed {
            Ok(listed) => {
                tracing::debug!(
                    project_id = %project_id,
                    count = listed.results.len(),
                    "listed database users"
                );
                ReadDataSourceResponse {
                    state: users_state(&project_id, config, listed),
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(lookup_error("database users", e));
                ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                }
            }
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for DatabaseUsersDataSource {
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

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn results_follow_user_shape() {
        let config = DynamicValue::new(Dynamic::object([("page_num", Dynamic::Null)]));
        let listed = Paginated {
            results: vec![DatabaseUser {
                group_id: "p1".into(),
                database_name: "admin".into(),
                username: "app".into(),
                ..Default::default()
            }],
            total_count: None,
        };

        let state = users_state("p1", &config, listed);
        let first = AttributePath::new("results").index(0);
        assert_eq!(state.get_number(&AttributePath::new("total_count")).unwrap(), 1.0);
        assert_eq!(
            state.get_string(&first.clone().attribute("username")).unwrap(),
            "app"
        );
        assert_eq!(
            state.get_string(&first.attribute("x509_type")).unwrap(),
            "NONE"
        );
    }
}
