//! Provider configuration
//!
//! Every attribute falls back to environment variables when it is not set in
//! the provider block.

use crate::api::Credentials;
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

pub const DEFAULT_BASE_URL: &str = "https://cloud.mongodb.com/";
pub const MONGODBGOV_BASE_URL: &str = "https://cloud.mongodbgov.com";

const BASE_URL_ENV: [&str; 2] = ["MONGODB_ATLAS_BASE_URL", "MCLI_OPS_MANAGER_URL"];
const PUBLIC_KEY_ENV: [&str; 2] = ["MONGODB_ATLAS_PUBLIC_KEY", "MCLI_PUBLIC_API_KEY"];
const PRIVATE_KEY_ENV: [&str; 2] = ["MONGODB_ATLAS_PRIVATE_KEY", "MCLI_PRIVATE_API_KEY"];
const CLIENT_ID_ENV: [&str; 1] = ["MONGODB_ATLAS_CLIENT_ID"];
const CLIENT_SECRET_ENV: [&str; 1] = ["MONGODB_ATLAS_CLIENT_SECRET"];
const ACCESS_TOKEN_ENV: [&str; 1] = ["MONGODB_ATLAS_ACCESS_TOKEN"];

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub base_url: String,
    pub credentials: Credentials,
}

/// Config value, then the first non-empty environment variable
fn resolve(config: &DynamicValue, attribute: &str, env_vars: &[&str]) -> Option<String> {
    config
        .get_optional_string(&AttributePath::new(attribute))
        .filter(|v| !v.is_empty())
        .or_else(|| {
            env_vars
                .iter()
                .filter_map(|name| std::env::var(name).ok())
                .find(|v| !v.is_empty())
        })
}

impl ProviderConfig {
    /// Resolve the configuration; warnings are returned alongside the value,
    /// errors instead of it
    pub fn from_config(config: &DynamicValue) -> Result<(Self, Vec<Diagnostic>), Vec<Diagnostic>> {
        let mut warnings = vec![];

        let is_gov = config
            .get_optional_bool(&AttributePath::new("is_mongodbgov_cloud"))
            .unwrap_or(false);
        let base_url = if is_gov {
            MONGODBGOV_BASE_URL.to_string()
        } else {
            resolve(config, "base_url", &BASE_URL_ENV)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
        };

        if let Err(e) = url::Url::parse(&base_url) {
            return Err(vec![Diagnostic::error(
                "Invalid base_url",
                format!("{:?} is not a valid URL: {}", base_url, e),
            )
            .with_attribute(AttributePath::new("base_url"))]);
        }

        let access_token = resolve(config, "access_token", &ACCESS_TOKEN_ENV);
        let client_id = resolve(config, "client_id", &CLIENT_ID_ENV);
        let client_secret = resolve(config, "client_secret", &CLIENT_SECRET_ENV);
        let public_key = resolve(config, "public_key", &PUBLIC_KEY_ENV);
        let private_key = resolve(config, "private_key", &PRIVATE_KEY_ENV);

        let credentials = match (access_token, client_id, client_secret, public_key, private_key) {
            (Some(token), ..) => Credentials::AccessToken(token),
            (None, Some(client_id), Some(client_secret), ..) => Credentials::ServiceAccount {
                client_id,
                client_secret,
            },
            (None, Some(_), None, ..) | (None, None, Some(_), ..) => {
                return Err(vec![Diagnostic::error(
                    "Incomplete service account credentials",
                    "client_id and client_secret must be set together",
                )]);
            }
            (None, None, None, Some(public_key), Some(private_key)) => Credentials::ApiKey {
                public_key,
                private_key,
            },
            (None, None, None, Some(_), None) | (None, None, None, None, Some(_)) => {
                return Err(vec![Diagnostic::error(
                    "Incomplete API key credentials",
                    "public_key and private_key must be set together",
                )]);
            }
            (None, None, None, None, None) => {
                warnings.push(Diagnostic::warning(
                    "No credentials configured",
                    "No API key, service account or access token was found in the provider \
                     block or environment; requests to Atlas will be unauthenticated",
                ));
                Credentials::None
            }
        };

        Ok((
            Self {
                base_url,
                credentials,
            },
            warnings,
        ))
    }
}
