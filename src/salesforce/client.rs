//! Salesforce HTTP client with bearer-token auth and safe logging.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};
use url::Url;

use crate::error::AppError;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// User agent string for all Salesforce API requests.
const CLIENT_USER_AGENT: &str = concat!("TankLoader/", env!("CARGO_PKG_VERSION"));

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

// ─────────────────────────────────────────────────────────────────────────────
// OrgCredentials
// ─────────────────────────────────────────────────────────────────────────────

/// Connection details for one Salesforce org.
#[derive(Clone)]
pub struct OrgCredentials {
    /// Instance URL (e.g., "https://na1.salesforce.com")
    pub instance_url: String,
    /// OAuth access token or session id
    pub access_token: SecretString,
}

impl std::fmt::Debug for OrgCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrgCredentials")
            .field("instance_url", &self.instance_url)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// URL Sanitization
// ─────────────────────────────────────────────────────────────────────────────

/// Renders a URL for logs: the path only. Scheme, host, query and fragment
/// are dropped.
pub fn sanitize_url_for_logs(url: &Url) -> String {
    url.path().to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// SalesforceClient
// ─────────────────────────────────────────────────────────────────────────────

/// Cloneable HTTP client for authenticated Salesforce calls.
#[derive(Clone)]
pub struct SalesforceClient {
    http: reqwest::Client,
    creds: Arc<OrgCredentials>,
}

impl SalesforceClient {
    /// Creates a client with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the HTTP client fails to initialize.
    pub fn new(creds: OrgCredentials) -> Result<Self, AppError> {
        Self::with_timeout(creds, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(creds: OrgCredentials, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            http: build_http_client(timeout)?,
            creds: Arc::new(creds),
        })
    }

    /// Joins `path` onto the instance URL.
    ///
    /// # Errors
    ///
    /// - `AppError::NotAuthenticated` if no instance URL is configured
    /// - `AppError::Config` if the instance URL or path cannot be parsed
    pub fn build_url(&self, path: &str) -> Result<Url, AppError> {
        if self.creds.instance_url.is_empty() {
            return Err(AppError::NotAuthenticated);
        }

        let base = Url::parse(&self.creds.instance_url)
            .map_err(|_| AppError::Config("Invalid instance URL".to_string()))?;

        base.join(path)
            .map_err(|_| AppError::Config(format!("Invalid path: {}", path)))
    }

    /// Sends an authenticated request and returns the raw response.
    ///
    /// Non-2xx statuses are returned to the caller untouched, except 401,
    /// which means the token is no longer valid.
    ///
    /// # Errors
    ///
    /// - `AppError::NotAuthenticated` - no instance URL or token
    /// - `AppError::SessionExpired` - the org answered 401
    /// - `AppError::ConnectionFailed` - network error or timeout
    pub async fn request_authed(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response, AppError> {
        let url = self.build_url(path)?;
        let token = self.creds.access_token.expose_secret();
        if token.is_empty() {
            return Err(AppError::NotAuthenticated);
        }

        let start = Instant::now();
        let sanitized_url = sanitize_url_for_logs(&url);

        let mut request = self.http.request(method.clone(), url).bearer_auth(token);
        if let Some(body_bytes) = body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(body_bytes);
        }

        let result = request.send().await;
        let duration_ms = start.elapsed().as_millis();

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                // The reqwest error can embed the full URL; log only its kind.
                info!(
                    "[SFDC] {} {} FAILED {}ms (timeout: {})",
                    method,
                    sanitized_url,
                    duration_ms,
                    e.is_timeout()
                );
                return Err(AppError::ConnectionFailed(
                    "Connection to Salesforce failed".to_string(),
                ));
            }
        };

        let status = response.status();
        let x_request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        info!(
            "[SFDC] {} {} {} {}ms {}",
            method,
            sanitized_url,
            status.as_u16(),
            duration_ms,
            x_request_id
        );

        if status == reqwest::StatusCode::UNAUTHORIZED {
            warn!("[SFDC] Access token rejected");
            return Err(AppError::SessionExpired);
        }

        Ok(response)
    }
}

fn build_http_client(timeout: Duration) -> Result<reqwest::Client, AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds(instance_url: &str, token: &str) -> OrgCredentials {
        OrgCredentials {
            instance_url: instance_url.to_string(),
            access_token: SecretString::from(token.to_string()),
        }
    }

    #[test]
    fn sanitize_keeps_path_only() {
        let url = Url::parse(
            "https://na1.salesforce.com/services/apexrest/Tanques?access_token=secret123#frag",
        )
        .unwrap();

        let sanitized = sanitize_url_for_logs(&url);

        assert_eq!(sanitized, "/services/apexrest/Tanques");
        assert!(!sanitized.contains("na1.salesforce.com"));
        assert!(!sanitized.contains("secret123"));
    }

    #[test]
    fn credentials_debug_redacts_token() {
        let debug_output = format!("{:?}", creds("https://na1.salesforce.com", "super_secret"));

        assert!(debug_output.contains("na1.salesforce.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret"));
    }

    #[test]
    fn build_url_joins_instance_and_path() {
        let client = SalesforceClient::new(creds("https://na1.salesforce.com", "t")).unwrap();

        let url = client.build_url("/services/apexrest/CargaMasivaTanquesCSV").unwrap();

        assert_eq!(
            url.as_str(),
            "https://na1.salesforce.com/services/apexrest/CargaMasivaTanquesCSV"
        );
    }

    #[test]
    fn build_url_without_instance_is_not_authenticated() {
        let client = SalesforceClient::new(creds("", "t")).unwrap();

        assert!(matches!(
            client.build_url("/services"),
            Err(AppError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn request_sends_bearer_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/apexrest/Ping"))
            .and(header("authorization", "Bearer token-1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = SalesforceClient::new(creds(&mock_server.uri(), "token-1")).unwrap();
        let response = client
            .request_authed(Method::GET, "/services/apexrest/Ping", None)
            .await
            .unwrap();

        assert!(response.status().is_success());
    }

    #[tokio::test]
    async fn unauthorized_maps_to_session_expired() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let client = SalesforceClient::new(creds(&mock_server.uri(), "stale")).unwrap();
        let result = client
            .request_authed(Method::GET, "/services/apexrest/Ping", None)
            .await;

        assert!(matches!(result, Err(AppError::SessionExpired)));
    }

    #[tokio::test]
    async fn empty_token_is_not_authenticated() {
        let client = SalesforceClient::new(creds("https://na1.salesforce.com", "")).unwrap();

        let result = client
            .request_authed(Method::GET, "/services/apexrest/Ping", None)
            .await;

        assert!(matches!(result, Err(AppError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn unreachable_host_is_connection_failed() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let client = SalesforceClient::with_timeout(
            creds("http://127.0.0.1:9", "t"),
            Duration::from_secs(2),
        )
        .unwrap();

        let result = client
            .request_authed(Method::GET, "/services/apexrest/Ping", None)
            .await;

        match result {
            Err(AppError::ConnectionFailed(msg)) => assert!(!msg.contains("127.0.0.1")),
            other => panic!("Expected ConnectionFailed, got {:?}", other.map(|r| r.status())),
        }
    }
}
