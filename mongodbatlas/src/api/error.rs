use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("{method} {path}: HTTP {status} ({error_code}) {detail}")]
    Api {
        method: String,
        path: String,
        status: u16,
        error_code: String,
        detail: String,
        reason: String,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,
}

impl ApiError {
    /// HTTP status of an API error response
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            ApiError::Api { error_code, .. } => Some(error_code),
            _ => None,
        }
    }

    /// 404, or a `*_NOT_FOUND` error code Atlas sometimes returns with a 400
    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::Api {
                status, error_code, ..
            } => {
                *status == 404
                    || (*status == 400 && error_code.ends_with("_NOT_FOUND"))
            }
            _ => false,
        }
    }

    pub fn has_error_code(&self, code: &str) -> bool {
        self.error_code() == Some(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: u16, code: &str) -> ApiError {
        ApiError::Api {
            method: "GET".to_string(),
            path: "/api/atlas/v2/groups/p1/clusters/c1".to_string(),
            status,
            error_code: code.to_string(),
            detail: "detail".to_string(),
            reason: "Not Found".to_string(),
        }
    }

    #[test]
    fn not_found_matches_status_and_codes() {
        assert!(api_error(404, "RESOURCE_NOT_FOUND").is_not_found());
        assert!(api_error(404, "").is_not_found());
        assert!(api_error(400, "CLUSTER_NOT_FOUND").is_not_found());
        assert!(!api_error(400, "INVALID_ATTRIBUTE").is_not_found());
        assert!(!api_error(500, "CLUSTER_NOT_FOUND").is_not_found());
        assert!(!ApiError::ServiceUnavailable.is_not_found());
    }

    #[test]
    fn matches_exact_error_code() {
        let err = api_error(409, "CANNOT_ASSUME_ROLE");
        assert!(err.has_error_code("CANNOT_ASSUME_ROLE"));
        assert!(!err.has_error_code("CANNOT_ASSUME"));
        assert!(!ApiError::ParseError("x".into()).has_error_code("CANNOT_ASSUME_ROLE"));
    }

    #[test]
    fn display_includes_code_and_detail() {
        let err = api_error(404, "CLUSTER_NOT_FOUND");
        let rendered = err.to_string();
        assert!(rendered.contains("HTTP 404"));
        assert!(rendered.contains("CLUSTER_NOT_FOUND"));
        assert!(rendered.contains("detail"));
    }
}
