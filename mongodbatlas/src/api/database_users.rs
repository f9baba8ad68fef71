//! Database user API

use super::common::{escape, PageRequest, Paginated};
use super::{ApiError, Client, API_PREFIX};
use serde::{Deserialize, Serialize};

const API_VERSION: &str = "2023-01-01";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseUser {
    pub group_id: String,
    pub database_name: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "x509Type", skip_serializing_if = "Option::is_none")]
    pub x509_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oidc_auth_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ldap_auth_type: Option<String>,
    #[serde(default, rename = "awsIAMType", skip_serializing_if = "Option::is_none")]
    pub aws_iam_type: Option<String>,
    #[serde(default)]
    pub roles: Vec<DatabaseUserRole>,
    #[serde(default)]
    pub labels: Vec<ComponentLabel>,
    #[serde(default)]
    pub scopes: Vec<UserScope>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseUserRole {
    pub role_name: String,
    pub database_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentLabel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserScope {
    pub name: String,
    #[serde(rename = "type")]
    pub scope_type: String,
}

pub struct DatabaseUsersApi<'a> {
    client: &'a Client,
}

impl<'a> DatabaseUsersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn collection_path(project_id: &str) -> String {
        format!("{}/groups/{}/databaseUsers", API_PREFIX, escape(project_id))
    }

    fn user_path(project_id: &str, auth_database_name: &str, username: &str) -> String {
        format!(
            "{}/{}/{}",
            Self::collection_path(project_id),
            escape(auth_database_name),
            escape(username)
        )
    }

    /// POST /api/atlas/v2/groups/{groupId}/databaseUsers
    pub async fn create(&self, user: &DatabaseUser) -> Result<DatabaseUser, ApiError> {
        self.client
            .post(API_VERSION, &Self::collection_path(&user.group_id), user)
            .await
    }

    /// GET /api/atlas/v2/groups/{groupId}/databaseUsers/{databaseName}/{username}
    pub async fn get(
        &self,
        project_id: &str,
        auth_database_name: &str,
        username: &str,
    ) -> Result<DatabaseUser, ApiError> {
        self.client
            .get(
                API_VERSION,
                &Self::user_path(project_id, auth_database_name, username),
            )
            .await
    }

    /// PATCH /api/atlas/v2/groups/{groupId}/databaseUsers/{databaseName}/{username}
    pub async fn update(&self, user: &DatabaseUser) -> Result<DatabaseUser, ApiError> {
        self.client
            .patch(
                API_VERSION,
                &Self::user_path(&user.group_id, &user.database_name, &user.username),
                user,
            )
            .await
    }

    /// DELETE /api/atlas/v2/groups/{groupId}/databaseUsers/{databaseName}/{username}
    pub async fn delete(
        &self,
        project_id: &str,
        auth_database_name: &str,
        username: &str,
    ) -> Result<(), ApiError> {
        self.client
            .delete(
                API_VERSION,
                &Self::user_path(project_id, auth_database_name, username),
            )
            .await
    }

    /// GET /api/atlas/v2/groups/{groupId}/databaseUsers
    pub async fn list_page(
        &self,
        project_id: &str,
        page: PageRequest,
    ) -> Result<Paginated<DatabaseUser>, ApiError> {
        self.client
            .get_page(API_VERSION, &Self::collection_path(project_id), page)
            .await
    }

    /// Every database user of a project, across all pages
    pub async fn list(&self, project_id: &str) -> Result<Vec<DatabaseUser>, ApiError> {
        self.client
            .list_all(API_VERSION, &Self::collection_path(project_id))
            .await
    }
}
