//! Request authentication
//!
//! Atlas accepts three kinds of credentials. A pre-issued access token is sent
//! as a bearer token. Service account credentials are exchanged for a bearer
//! token with the OAuth2 client-credentials grant, cached until shortly before
//! it expires. Programmatic API keys use HTTP digest authentication: requests
//! go out bare until the first `401` challenge, which is answered once and then
//! reused for following requests.

use md5::{Digest, Md5};
use reqwest::header::ACCEPT;
use reqwest::Method;
use serde::Deserialize;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::error::ApiError;

/// Access tokens are refreshed this long before they expire
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    None,
    AccessToken(String),
    ServiceAccount {
        client_id: String,
        client_secret: String,
    },
    ApiKey {
        public_key: String,
        private_key: String,
    },
}

impl Credentials {
    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::None => "none",
            Credentials::AccessToken(_) => "access_token",
            Credentials::ServiceAccount { .. } => "service_account",
            Credentials::ApiKey { .. } => "api_key",
        }
    }
}

// Secrets stay out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::None => write!(f, "None"),
            Credentials::AccessToken(_) => write!(f, "AccessToken(***)"),
            Credentials::ServiceAccount { client_id, .. } => f
                .debug_struct("ServiceAccount")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            Credentials::ApiKey { public_key, .. } => f
                .debug_struct("ApiKey")
                .field("public_key", public_key)
                .finish_non_exhaustive(),
        }
    }
}

pub(crate) enum Authenticator {
    None,
    Bearer(String),
    OAuth(OAuthTokenSource),
    Digest(DigestAuth),
}

impl Authenticator {
    pub fn new(credentials: Credentials, base_url: &str) -> Self {
        match credentials {
            Credentials::None => Authenticator::None,
            Credentials::AccessToken(token) => Authenticator::Bearer(token),
            Credentials::ServiceAccount {
                client_id,
                client_secret,
            } => Authenticator::OAuth(OAuthTokenSource::new(
                format!("{}/api/oauth/token", base_url),
                client_id,
                client_secret,
            )),
            Credentials::ApiKey {
                public_key,
                private_key,
            } => Authenticator::Digest(DigestAuth::new(public_key, private_key)),
        }
    }

    /// Authorization header for a request, `None` to send it unauthenticated
    pub async fn authorization(
        &self,
        http: &reqwest::Client,
        method: &Method,
        uri: &str,
    ) -> Result<Option<String>, ApiError> {
        match self {
            Authenticator::None => Ok(None),
            Authenticator::Bearer(token) => Ok(Some(format!("Bearer {}", token))),
            Authenticator::OAuth(source) => {
                let token = source.token(http).await?;
                Ok(Some(format!("Bearer {}", token)))
            }
            Authenticator::Digest(digest) => Ok(digest.authorization(method, uri).await),
        }
    }

    /// Record a `WWW-Authenticate` challenge from a 401 response
    ///
    /// Returns true when the request should be sent again with credentials.
    pub async fn accept_challenge(&self, header: Option<&str>) -> bool {
        match (self, header.and_then(DigestChallenge::parse)) {
            (Authenticator::Digest(digest), Some(challenge)) => {
                digest.set_challenge(challenge).await;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

pub(crate) struct OAuthTokenSource {
    token_url: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

impl OAuthTokenSource {
    fn new(token_url: String, client_id: String, client_secret: String) -> Self {
        Self {
            token_url,
            client_id,
            client_secret,
            cached: Mutex::new(None),
        }
    }

    async fn token(&self, http: &reqwest::Client) -> Result<String, ApiError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.access_token.clone());
            }
        }

        tracing::debug!(url = %self.token_url, "requesting service account access token");
        let response = http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(ACCEPT, "application/json")
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::AuthError(format!(
                "failed to obtain access token (HTTP {}): {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::ParseError(format!("invalid token response: {}", e)))?;
        let lifetime = token
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);

        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN),
        });
        Ok(token.access_token)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DigestChallenge {
    realm: String,
    nonce: String,
    opaque: Option<String>,
    algorithm: Option<String>,
    qop: Option<String>,
}

impl DigestChallenge {
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, params) = header.split_once(char::is_whitespace)?;
        if !scheme.eq_ignore_ascii_case("digest") {
            return None;
        }

        let re = regex::Regex::new(r#"(\w+)\s*=\s*(?:"([^"]*)"|([^,\s]*))"#).ok()?;
        let mut challenge = DigestChallenge {
            realm: String::new(),
            nonce: String::new(),
            opaque: None,
            algorithm: None,
            qop: None,
        };
        for caps in re.captures_iter(params) {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            match caps[1].to_ascii_lowercase().as_str() {
                "realm" => challenge.realm = value,
                "nonce" => challenge.nonce = value,
                "opaque" => challenge.opaque = Some(value),
                "algorithm" => challenge.algorithm = Some(value),
                "qop" => challenge.qop = Some(value),
                _ => {}
            }
        }

        (!challenge.nonce.is_empty()).then_some(challenge)
    }

    fn supports_qop_auth(&self) -> bool {
        self.qop
            .as_deref()
            .is_some_and(|qop| qop.split(',').any(|q| q.trim() == "auth"))
    }

    fn is_session_algorithm(&self) -> bool {
        self.algorithm
            .as_deref()
            .is_some_and(|a| a.eq_ignore_ascii_case("MD5-sess"))
    }
}

pub(crate) struct DigestAuth {
    username: String,
    password: String,
    challenge: Mutex<Option<DigestChallenge>>,
    nonce_count: AtomicU32,
}

impl DigestAuth {
    fn new(username: String, password: String) -> Self {
        Self {
            username,
            password,
            challenge: Mutex::new(None),
            nonce_count: AtomicU32::new(0),
        }
    }

    async fn set_challenge(&self, challenge: DigestChallenge) {
        let mut current = self.challenge.lock().await;
        if current.as_ref().map(|c| &c.nonce) != Some(&challenge.nonce) {
            self.nonce_count.store(0, Ordering::SeqCst);
        }
        *current = Some(challenge);
    }

    async fn authorization(&self, method: &Method, uri: &str) -> Option<String> {
        let challenge = self.challenge.lock().await.clone()?;
        let nc = self.nonce_count.fetch_add(1, Ordering::SeqCst) + 1;
        let cnonce = uuid::Uuid::new_v4().simple().to_string();
        Some(digest_header(
            &self.username,
            &self.password,
            &challenge,
            method.as_str(),
            uri,
            nc,
            &cnonce,
        ))
    }
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", Md5::digest(input.as_bytes()))
}

fn digest_header(
    username: &str,
    password: &str,
    challenge: &DigestChallenge,
    method: &str,
    uri: &str,
    nc: u32,
    cnonce: &str,
) -> String {
    let mut ha1 = md5_hex(&format!("{}:{}:{}", username, challenge.realm, password));
    if challenge.is_session_algorithm() {
        ha1 = md5_hex(&format!("{}:{}:{}", ha1, challenge.nonce, cnonce));
    }
    let ha2 = md5_hex(&format!("{}:{}", method, uri));
    let nc = format!("{:08x}", nc);

    let mut header = format!(
        r#"Digest username="{}", realm="{}", nonce="{}", uri="{}""#,
        username, challenge.realm, challenge.nonce, uri
    );
    if let Some(algorithm) = &challenge.algorithm {
        header.push_str(&format!(", algorithm={}", algorithm));
    }

    if challenge.supports_qop_auth() {
        let response = md5_hex(&format!(
            "{}:{}:{}:{}:auth:{}",
            ha1, challenge.nonce, nc, cnonce, ha2
        ));
        header.push_str(&format!(
            r#", response="{}", qop=auth, nc={}, cnonce="{}""#,
            response, nc, cnonce
        ));
    } else {
        let response = md5_hex(&format!("{}:{}:{}", ha1, challenge.nonce, ha2));
        header.push_str(&format!(r#", response="{}""#, response));
    }

    if let Some(opaque) = &challenge.opaque {
        header.push_str(&format!(r#", opaque="{}""#, opaque));
    }
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_atlas_digest_challenge() {
        let challenge = DigestChallenge::parse(
            r#"Digest realm="MMS Public API", domain="", nonce="OtH2HpkbK4zgWZlsNz9tM8u9", algorithm=MD5, qop="auth", stale=false"#,
        )
        .unwrap();

        assert_eq!(challenge.realm, "MMS Public API");
        assert_eq!(challenge.nonce, "OtH2HpkbK4zgWZlsNz9tM8u9");
        assert_eq!(challenge.algorithm.as_deref(), Some("MD5"));
        assert!(challenge.supports_qop_auth());
        assert!(challenge.opaque.is_none());
    }

    #[test]
    fn ignores_non_digest_challenges() {
        assert!(DigestChallenge::parse(r#"Basic realm="x""#).is_none());
        assert!(DigestChallenge::parse("Digest realm=\"x\"").is_none());
        assert!(DigestChallenge::parse("").is_none());
    }

    // Worked example from RFC 2617 section 3.5
    #[test]
    fn computes_rfc2617_response() {
        let challenge = DigestChallenge {
            realm: "testrealm@host.com".to_string(),
            nonce: "dcd98b7102dd2f0e8b11d0f600bfb0c093".to_string(),
            opaque: Some("5ccc069c403ebaf9f0171e9517f40e41".to_string()),
            algorithm: None,
            qop: Some("auth,auth-int".to_string()),
        };

        let header = digest_header(
            "Mufasa",
            "Circle Of Life",
            &challenge,
            "GET",
            "/dir/index.html",
            1,
            "0a4f113b",
        );

        assert!(header.starts_with(r#"Digest username="Mufasa""#));
        assert!(header.contains(r#"response="6629fae49393a05397450978507c4ef1""#));
        assert!(header.contains("nc=00000001"));
        assert!(header.contains(r#"cnonce="0a4f113b""#));
        assert!(header.contains(r#"opaque="5ccc069c403ebaf9f0171e9517f40e41""#));
    }

    #[tokio::test]
    async fn digest_has_no_header_before_challenge() {
        let auth = Authenticator::new(
            Credentials::ApiKey {
                public_key: "pub".into(),
                private_key: "priv".into(),
            },
            "https://cloud.mongodb.com",
        );
        let http = reqwest::Client::new();

        let before = auth
            .authorization(&http, &Method::GET, "/api/atlas/v2/groups")
            .await
            .unwrap();
        assert!(before.is_none());

        assert!(
            auth.accept_challenge(Some(r#"Digest realm="MMS Public API", nonce="abc", qop="auth""#))
                .await
        );
        let after = auth
            .authorization(&http, &Method::GET, "/api/atlas/v2/groups")
            .await
            .unwrap()
            .unwrap();
        assert!(after.contains(r#"username="pub""#));
        assert!(after.contains(r#"uri="/api/atlas/v2/groups""#));
    }

    #[tokio::test]
    async fn bearer_token_is_sent_as_is() {
        let auth = Authenticator::new(
            Credentials::AccessToken("tok".into()),
            "https://cloud.mongodb.com",
        );
        let header = auth
            .authorization(&reqwest::Client::new(), &Method::GET, "/")
            .await
            .unwrap();
        assert_eq!(header.as_deref(), Some("Bearer tok"));
        assert!(!auth.accept_challenge(Some("Digest nonce=\"n\"")).await);
    }

    #[test]
    fn debug_output_hides_secrets() {
        let rendered = format!(
            "{:?}",
            Credentials::ApiKey {
                public_key: "pub".into(),
                private_key: "very-secret".into(),
            }
        );
        assert!(rendered.contains("pub"));
        assert!(!rendered.contains("very-secret"));
    }
}
