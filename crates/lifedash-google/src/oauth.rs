//! Google token endpoint client.
//!
//! Two grants are used: `refresh_token` (Token Refresher) and
//! `authorization_code` (connect flow). Responses are classified here, once:
//!
//! - transport failure or timeout: [`TokenError::ProviderUnreachable`]
//! - non-2xx status: [`TokenError::ProviderRejected`] with the provider's
//!   `error_description` (or `error`) verbatim
//! - 2xx with an unusable body: [`TokenError::ProviderUnreachable`]

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use lifedash_core::BoxFuture;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{GoogleConfig, OAuthCredentials};
use crate::error::TokenError;

/// Assumed access token lifetime when the provider omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Longest access token lifetime accepted from the provider.
const MAX_EXPIRES_IN_SECS: i64 = 366 * 24 * 3600;

/// Longest slice of a non-JSON error body kept for diagnostics.
const MAX_ERROR_BODY: usize = 200;

/// A successful token endpoint response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime of `access_token` in seconds.
    pub expires_in: i64,
    /// Present on code exchange, and on refresh only when rotated.
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

impl TokenGrant {
    /// Absolute expiry for a grant received at `now`.
    ///
    /// Lifetimes that are not positive, or longer than a year, are
    /// [`TokenError::ProviderUnreachable`].
    pub fn expiry_from(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, TokenError> {
        check_lifetime(self.expires_in)?;
        TimeDelta::try_seconds(self.expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| invalid_lifetime(self.expires_in))
    }
}

/// Exchanges credentials at the provider's token endpoint.
pub trait TokenExchange: Send + Sync {
    /// `grant_type=refresh_token`. Single attempt, no retry.
    fn refresh<'a>(&'a self, refresh_token: &'a str)
    -> BoxFuture<'a, Result<TokenGrant, TokenError>>;

    /// `grant_type=authorization_code`.
    fn exchange_code<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<TokenGrant, TokenError>>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Classifies a token endpoint response.
pub fn parse_token_response(status: u16, body: &str) -> Result<TokenGrant, TokenError> {
    if !(200..300).contains(&status) {
        let detail = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(|e| {
                e.error_description
                    .filter(|d| !d.is_empty())
                    .or(e.error)
            })
            .unwrap_or_else(|| {
                let snippet: String = body.chars().take(MAX_ERROR_BODY).collect();
                format!("HTTP {}: {}", status, snippet.trim())
            });
        return Err(TokenError::rejected(detail));
    }

    let response: TokenResponse = serde_json::from_str(body)
        .map_err(|e| TokenError::unreachable(format!("invalid token response: {}", e)))?;

    if response.access_token.is_empty() {
        return Err(TokenError::unreachable(
            "invalid token response: empty access_token",
        ));
    }

    let expires_in = check_lifetime(response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS))?;

    Ok(TokenGrant {
        access_token: response.access_token,
        expires_in,
        refresh_token: response.refresh_token.filter(|rt| !rt.is_empty()),
        token_type: response.token_type,
        scope: response.scope,
    })
}

fn check_lifetime(expires_in: i64) -> Result<i64, TokenError> {
    if expires_in <= 0 || expires_in > MAX_EXPIRES_IN_SECS {
        return Err(invalid_lifetime(expires_in));
    }
    Ok(expires_in)
}

fn invalid_lifetime(expires_in: i64) -> TokenError {
    TokenError::unreachable(format!(
        "invalid token response: expires_in {} out of range",
        expires_in
    ))
}

/// HTTP client for Google's token endpoint. Built once and reused.
#[derive(Debug, Clone)]
pub struct GoogleOAuthClient {
    credentials: OAuthCredentials,
    token_url: String,
    redirect_uri: String,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl GoogleOAuthClient {
    pub fn new(config: &GoogleConfig) -> reqwest::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            credentials: config.credentials.clone(),
            token_url: config.token_url.clone(),
            redirect_uri: config.redirect_uri.clone(),
            timeout: config.timeout,
            http_client,
        })
    }

    async fn post_form(&self, params: &[(&str, &str)]) -> Result<TokenGrant, TokenError> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TokenError::unreachable(format!(
                        "token request timed out after {:?}",
                        self.timeout
                    ))
                } else if e.is_connect() {
                    TokenError::unreachable(format!("connection failed: {}", e))
                } else {
                    TokenError::unreachable(format!("token request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TokenError::unreachable(format!("failed to read response: {}", e)))?;

        debug!("token endpoint answered {}", status);
        parse_token_response(status.as_u16(), &body)
    }

    async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenGrant, TokenError> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let grant = self.post_form(&params).await?;
        info!("refreshed access token, expires in {}s", grant.expires_in);
        Ok(grant)
    }

    async fn code_grant(&self, code: &str) -> Result<TokenGrant, TokenError> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];
        let grant = self.post_form(&params).await?;
        info!(
            "exchanged authorization code (refresh token issued: {})",
            grant.refresh_token.is_some()
        );
        Ok(grant)
    }
}

impl TokenExchange for GoogleOAuthClient {
    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, Result<TokenGrant, TokenError>> {
        Box::pin(self.refresh_grant(refresh_token))
    }

    fn exchange_code<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<TokenGrant, TokenError>> {
        Box::pin(self.code_grant(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TokenErrorKind;
    use crate::test_support::test_config;
    use chrono::TimeZone;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn success_response() {
        let grant = parse_token_response(
            200,
            r#"{"access_token":"at2","expires_in":3599,"token_type":"Bearer","scope":"https://www.googleapis.com/auth/calendar.readonly"}"#,
        )
        .unwrap();

        assert_eq!(grant.access_token, "at2");
        assert_eq!(grant.expires_in, 3599);
        assert!(grant.refresh_token.is_none());
        assert_eq!(grant.token_type.as_deref(), Some("Bearer"));

        let now = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        assert_eq!(
            grant.expiry_from(now).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 15, 10, 59, 59).unwrap()
        );
    }

    #[test]
    fn missing_expires_in_defaults_to_an_hour() {
        let grant = parse_token_response(200, r#"{"access_token":"at2"}"#).unwrap();
        assert_eq!(grant.expires_in, 3600);
    }

    #[test]
    fn empty_rotated_refresh_token_is_dropped() {
        let grant =
            parse_token_response(200, r#"{"access_token":"at2","refresh_token":""}"#).unwrap();
        assert!(grant.refresh_token.is_none());
    }

    #[test]
    fn rejection_carries_error_code() {
        let err = parse_token_response(400, r#"{"error":"invalid_grant"}"#).unwrap_err();
        assert_eq!(err.kind(), TokenErrorKind::ProviderRejected);
        assert_eq!(err.detail(), "invalid_grant");
    }

    #[test]
    fn rejection_prefers_description() {
        let err = parse_token_response(
            400,
            r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#,
        )
        .unwrap_err();
        assert_eq!(err.detail(), "Token has been expired or revoked.");
    }

    #[test]
    fn rejection_with_non_json_body() {
        let err = parse_token_response(502, "<html>Bad Gateway</html>").unwrap_err();
        assert_eq!(err.kind(), TokenErrorKind::ProviderRejected);
        assert_eq!(err.detail(), "HTTP 502: <html>Bad Gateway</html>");
    }

    #[test]
    fn unparseable_success_is_unreachable() {
        let err = parse_token_response(200, "not json").unwrap_err();
        assert_eq!(err.kind(), TokenErrorKind::ProviderUnreachable);

        let err = parse_token_response(200, r#"{"access_token":""}"#).unwrap_err();
        assert_eq!(err.kind(), TokenErrorKind::ProviderUnreachable);
    }

    #[test]
    fn lifetime_out_of_range_is_unreachable() {
        for expires_in in ["0", "-60", "9223372036854775807", "31708801"] {
            let body = format!(r#"{{"access_token":"at2","expires_in":{}}}"#, expires_in);
            let err = parse_token_response(200, &body).unwrap_err();
            assert_eq!(err.kind(), TokenErrorKind::ProviderUnreachable, "{}", expires_in);
            assert!(err.detail().contains("expires_in"));
        }

        let a_year = parse_token_response(200, r#"{"access_token":"at2","expires_in":31536000}"#);
        assert!(a_year.is_ok());
    }

    #[test]
    fn expiry_never_overflows() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        let grant = |expires_in| TokenGrant {
            access_token: "at2".to_string(),
            expires_in,
            refresh_token: None,
            token_type: None,
            scope: None,
        };

        for expires_in in [i64::MAX, i64::MIN, -1, 0] {
            let err = grant(expires_in).expiry_from(now).unwrap_err();
            assert_eq!(err.kind(), TokenErrorKind::ProviderUnreachable);
        }
    }

    async fn token_endpoint(grant_type: &str, status: u16, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains(format!("grant_type={}", grant_type)))
            .respond_with(
                ResponseTemplate::new(status).set_body_raw(body.to_string(), "application/json"),
            )
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    fn client_for(server: &MockServer) -> GoogleOAuthClient {
        let config = test_config().with_token_url(format!("{}/token", server.uri()));
        GoogleOAuthClient::new(&config).unwrap()
    }

    async fn sent_body(server: &MockServer) -> String {
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        String::from_utf8(requests[0].body.clone()).unwrap()
    }

    #[tokio::test]
    async fn refresh_posts_form_to_token_endpoint() {
        let server = token_endpoint(
            "refresh_token",
            200,
            r#"{"access_token":"at2","expires_in":3600}"#,
        )
        .await;

        let grant = client_for(&server).refresh("rt1").await.unwrap();
        assert_eq!(grant.access_token, "at2");

        let body = sent_body(&server).await;
        assert!(body.contains("refresh_token=rt1"));
        assert!(body.contains("client_id=test-client.apps.googleusercontent.com"));
        assert!(body.contains("client_secret=test-secret"));
    }

    #[tokio::test]
    async fn code_exchange_sends_redirect_uri() {
        let server = token_endpoint(
            "authorization_code",
            200,
            r#"{"access_token":"at1","refresh_token":"rt1","expires_in":3600}"#,
        )
        .await;

        let grant = client_for(&server).exchange_code("4/abc").await.unwrap();
        assert_eq!(grant.refresh_token.as_deref(), Some("rt1"));

        let body = sent_body(&server).await;
        assert!(body.contains("code=4%2Fabc"));
        assert!(body.contains("redirect_uri="));
    }

    #[tokio::test]
    async fn http_rejection_is_classified() {
        let server = token_endpoint("refresh_token", 400, r#"{"error":"invalid_grant"}"#).await;

        let err = client_for(&server).refresh("revoked").await.unwrap_err();
        assert_eq!(err, TokenError::rejected("invalid_grant"));
    }

    #[tokio::test]
    async fn huge_lifetime_from_endpoint_is_unreachable() {
        let server = token_endpoint(
            "refresh_token",
            200,
            r#"{"access_token":"at2","expires_in":9223372036854775807}"#,
        )
        .await;

        let err = client_for(&server).refresh("rt1").await.unwrap_err();
        assert_eq!(err.kind(), TokenErrorKind::ProviderUnreachable);
    }

    #[tokio::test]
    async fn connection_refused_is_unreachable() {
        let config = test_config()
            .with_token_url("http://127.0.0.1:1/token")
            .with_timeout(Duration::from_secs(2));
        let client = GoogleOAuthClient::new(&config).unwrap();

        let err = client.refresh("rt1").await.unwrap_err();
        assert_eq!(err.kind(), TokenErrorKind::ProviderUnreachable);
    }
}
