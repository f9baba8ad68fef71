use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use super::auth::{Authenticator, Credentials};
use super::common::{ApiErrorResponse, PageRequest, Paginated};
use super::error::ApiError;
use super::pool::{ConnectionPoolConfig, ConnectionPoolManager, ConnectionStats};

pub const PROVIDER_NAME: &str = "terraform-provider-mongodbatlas";
pub const API_PREFIX: &str = "/api/atlas/v2";

/// Atlas Administration API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth: Authenticator,
    retry_config: RetryConfig,
    pool_manager: ConnectionPoolManager,
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

impl RetryConfig {
    fn backoff_ms(&self, attempt: u32) -> u64 {
        let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
        std::cmp::min(
            self.initial_backoff_ms.saturating_mul(factor),
            self.max_backoff_ms,
        )
    }
}

/// `User-Agent` sent with every request
pub fn user_agent(terraform_version: &str) -> String {
    let terraform_version = if terraform_version.is_empty() {
        "unknown"
    } else {
        terraform_version
    };
    format!(
        "{}/{} Terraform/{}",
        PROVIDER_NAME,
        env!("CARGO_PKG_VERSION"),
        terraform_version
    )
}

/// Methods Atlas applies the same way however often they are sent
fn is_idempotent(method: &Method) -> bool {
    [Method::GET, Method::HEAD, Method::PUT, Method::PATCH, Method::DELETE].contains(method)
}

/// Versioned media type selecting a dated revision of an endpoint
pub fn versioned_media_type(api_version: &str) -> String {
    format!("application/vnd.atlas.{}+json", api_version)
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        terraform_version: &str,
    ) -> Result<Self, ApiError> {
        Self::with_config(
            base_url,
            credentials,
            terraform_version,
            RetryConfig::default(),
        )
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        base_url: &str,
        credentials: Credentials,
        terraform_version: &str,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        let pool_config = ConnectionPoolConfig {
            request_timeout: std::time::Duration::from_secs(retry_config.timeout_seconds),
            ..Default::default()
        };

        let pool_manager = ConnectionPoolManager::new(pool_config);
        let http_client = pool_manager.build_client(&user_agent(terraform_version))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        tracing::debug!(%base_url, auth = credentials.kind(), "creating Atlas API client");
        let auth = Authenticator::new(credentials, &base_url);

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                auth,
                retry_config,
                pool_manager,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: DeserializeOwned>(
        &self,
        api_version: &str,
        path: &str,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(Method::GET, api_version, path, None)
            .await
    }

    /// Execute a POST request with retry logic
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        api_version: &str,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = encode_body(body)?;
        self.execute_with_retry(Method::POST, api_version, path, Some(body))
            .await
    }

    /// Execute a PATCH request with retry logic
    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        api_version: &str,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = encode_body(body)?;
        self.execute_with_retry(Method::PATCH, api_version, path, Some(body))
            .await
    }

    /// Execute a PUT request with retry logic
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        api_version: &str,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = encode_body(body)?;
        self.execute_with_retry(Method::PUT, api_version, path, Some(body))
            .await
    }

    /// Execute a DELETE request with retry logic
    pub async fn delete(&self, api_version: &str, path: &str) -> Result<(), ApiError> {
        self.execute_with_retry::<serde_json::Value>(Method::DELETE, api_version, path, None)
            .await
            .map(|_| ())
    }

    /// Fetch one page of a collection
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        api_version: &str,
        path: &str,
        page: PageRequest,
    ) -> Result<Paginated<T>, ApiError> {
        let query = page.to_query_params().to_query_string();
        let full_path = if path.contains('?') {
            format!("{}&{}", path, query.trim_start_matches('?'))
        } else {
            format!("{}{}", path, query)
        };
        self.get(api_version, &full_path).await
    }

    /// Walk every page of a collection
    ///
    /// Stops once `totalCount` items were collected or a page comes back empty.
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        api_version: &str,
        path: &str,
    ) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut page = PageRequest::default();

        loop {
            let response: Paginated<T> = self.get_page(api_version, path, page).await?;
            if response.results.is_empty() {
                break;
            }
            items.extend(response.results);

            match response.total_count {
                Some(total) if items.len() as u64 >= total => break,
                _ => page.page_num += 1,
            }
        }

        tracing::debug!(path, count = items.len(), "listed collection");
        Ok(items)
    }

    /// Get connection pool statistics
    pub async fn get_connection_stats(&self) -> ConnectionStats {
        self.inner.pool_manager.get_stats().await
    }

    /// Cluster operations
    pub fn clusters(&self) -> crate::api::clusters::ClustersApi<'_> {
        crate::api::clusters::ClustersApi::new(self)
    }

    /// Cloud backup snapshot operations
    pub fn backup_snapshots(&self) -> crate::api::backup_snapshots::BackupSnapshotsApi<'_> {
        crate::api::backup_snapshots::BackupSnapshotsApi::new(self)
    }

    /// Database user operations
    pub fn database_users(&self) -> crate::api::database_users::DatabaseUsersApi<'_> {
        crate::api::database_users::DatabaseUsersApi::new(self)
    }

    /// Encryption at rest operations
    pub fn encryption_at_rest(&self) -> crate::api::encryption_at_rest::EncryptionAtRestApi<'_> {
        crate::api::encryption_at_rest::EncryptionAtRestApi::new(self)
    }

    /// Private endpoint service operations
    pub fn private_endpoints(&self) -> crate::api::private_endpoints::PrivateEndpointsApi<'_> {
        crate::api::private_endpoints::PrivateEndpointsApi::new(self)
    }

    /// Flex cluster operations
    pub fn flex_clusters(&self) -> crate::api::flex_clusters::FlexClustersApi<'_> {
        crate::api::flex_clusters::FlexClustersApi::new(self)
    }

    /// Alert configuration operations
    pub fn alert_configs(&self) -> crate::api::alert_configs::AlertConfigsApi<'_> {
        crate::api::alert_configs::AlertConfigsApi::new(self)
    }

    /// Send one request, answering a digest challenge once if the server asks
    async fn send(
        &self,
        method: &Method,
        api_version: &str,
        path: &str,
        body: Option<&Vec<u8>>,
    ) -> Result<Result<reqwest::Response, reqwest::Error>, ApiError> {
        let authorization = self
            .inner
            .auth
            .authorization(&self.inner.http_client, method, path)
            .await?;
        let first = self.dispatch(method, api_version, path, body, authorization).await;

        let challenge = match &first {
            Ok(response) if response.status() == StatusCode::UNAUTHORIZED => response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            _ => None,
        };
        if !self.inner.auth.accept_challenge(challenge.as_deref()).await {
            return Ok(first);
        }

        tracing::debug!(path, "answering digest challenge");
        let authorization = self
            .inner
            .auth
            .authorization(&self.inner.http_client, method, path)
            .await?;
        Ok(self.dispatch(method, api_version, path, body, authorization).await)
    }

    async fn dispatch(
        &self,
        method: &Method,
        api_version: &str,
        path: &str,
        body: Option<&Vec<u8>>,
        authorization: Option<String>,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let url = format!("{}{}", self.inner.base_url, path);
        tracing::debug!("{} request to: {}", method, url);

        let media_type = versioned_media_type(api_version);
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&media_type) {
            headers.insert(ACCEPT, value.clone());
            if body.is_some() {
                headers.insert(CONTENT_TYPE, value);
            }
        }
        if let Some(value) = authorization.and_then(|a| HeaderValue::from_str(&a).ok()) {
            headers.insert(AUTHORIZATION, value);
        }

        let mut request = self
            .inner
            .http_client
            .request(method.clone(), &url)
            .headers(headers);
        if let Some(body) = body {
            request = request.body(body.clone());
        }
        request.send().await
    }

    /// Execute request with retry logic
    ///
    /// 429 and connection failures are retried with exponential backoff for
    /// every method. 5xx, timeouts and other send failures are retried only for
    /// idempotent methods, since Atlas may already have acted on a POST.
    async fn execute_with_retry<T: DeserializeOwned>(
        &self,
        method: Method,
        api_version: &str,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T, ApiError> {
        let max_retries = self.inner.retry_config.max_retries;
        let idempotent = is_idempotent(&method);
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                let backoff = self.inner.retry_config.backoff_ms(attempt);
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                self.inner.pool_manager.record_retry().await;
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff)).await;
            }
            let can_retry = attempt < max_retries;
            attempt += 1;

            match self.send(&method, api_version, path, body.as_ref()).await? {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        self.inner.pool_manager.record_request(true).await;
                        return self.parse_success_response(response).await;
                    }

                    self.inner.pool_manager.record_request(false).await;

                    let transient = status == StatusCode::TOO_MANY_REQUESTS
                        || (idempotent && status.is_server_error());
                    if transient && can_retry {
                        tracing::warn!(%status, path, "transient API error");
                        continue;
                    }
                    return self.handle_error_response(&method, path, response).await;
                }
                Err(e) => {
                    self.inner.pool_manager.record_request(false).await;

                    let last_error = if e.is_timeout() {
                        ApiError::Timeout(self.inner.retry_config.timeout_seconds)
                    } else if e.is_connect() || e.is_request() {
                        ApiError::ServiceUnavailable
                    } else {
                        return Err(ApiError::RequestError(e));
                    };
                    // only a refused connection proves a POST never reached Atlas
                    if !can_retry || !(idempotent || e.is_connect()) {
                        return Err(last_error);
                    }
                    tracing::warn!(error = %e, path, "request failed");
                }
            }
        }
    }

    /// Parse successful response
    async fn parse_success_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::trace!("API response body: {}", text);

        // DELETE and some PATCH endpoints answer 202/204 without a body
        let text = if text.trim().is_empty() { "null" } else { &text };
        serde_json::from_str::<T>(text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    /// Handle error response
    async fn handle_error_response<T>(
        &self,
        method: &Method,
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let body = serde_json::from_str::<ApiErrorResponse>(&text).unwrap_or_default();
        let detail = body.detail.unwrap_or(text);

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::AuthError(detail));
        }

        Err(ApiError::Api {
            method: method.to_string(),
            path: path.to_string(),
            status: status.as_u16(),
            error_code: body.error_code.unwrap_or_default(),
            detail,
            reason: body
                .reason
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_default(),
        })
    }
}

fn encode_body<B: Serialize>(body: &B) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec(body)
        .map_err(|e| ApiError::ParseError(format!("Failed to encode request body: {}", e)))
}
