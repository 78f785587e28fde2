use crate::Result;
use core::time::Duration;
use ohno::IntoAppError;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER};
use serde::Serialize;
use url::Url;

const LOG_TARGET: &str = " transport";

/// One GraphQL request: a query document and its variables.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest {
    pub query: &'static str,
    pub variables: serde_json::Value,

    /// Human-readable description used in logs and error messages.
    #[serde(skip)]
    pub label: String,
}

impl GraphQlRequest {
    #[must_use]
    pub fn new(query: &'static str, variables: serde_json::Value, label: impl Into<String>) -> Self {
        Self {
            query,
            variables,
            label: label.into(),
        }
    }
}

/// What came back from the endpoint, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub retry_after: Option<Duration>,
    pub rate_limit_remaining: Option<u64>,
    pub body: String,
}

impl RawResponse {
    /// A 200 response with the given body.
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            ..Self::default()
        }
    }
}

/// Sends a request and returns the raw response.
///
/// An `Err` means the request never produced an HTTP response (connection failure,
/// timeout) and is treated as transient by the gateway.
pub trait Transport: Send + Sync {
    fn post(&self, request: &GraphQlRequest) -> impl Future<Output = Result<RawResponse>> + Send;
}

/// [`Transport`] over HTTPS with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    api_url: Url,
}

impl HttpTransport {
    pub fn new(token: &str, api_url: Url, timeout: Duration) -> Result<Self> {
        let mut auth_val = HeaderValue::from_str(&format!("bearer {token}")).into_app_err("access token is not a valid header value")?;
        auth_val.set_sensitive(true);

        let mut headers = HeaderMap::new();
        let _ = headers.insert(AUTHORIZATION, auth_val);

        let client = reqwest::Client::builder()
            .user_agent(concat!("ghtally/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .into_app_err("unable to create HTTP client")?;

        Ok(Self { client, api_url })
    }

    #[must_use]
    pub const fn api_url(&self) -> &Url {
        &self.api_url
    }
}

impl Transport for HttpTransport {
    async fn post(&self, request: &GraphQlRequest) -> Result<RawResponse> {
        log::trace!(target: LOG_TARGET, "POST {} ({})", self.api_url, request.label);

        let resp = self
            .client
            .post(self.api_url.clone())
            .json(request)
            .send()
            .await
            .into_app_err_with(|| format!("unable to send request for {}", request.label))?;

        let status = resp.status().as_u16();
        let retry_after = extract_retry_after(resp.headers());
        let rate_limit_remaining = extract_rate_limit_remaining(resp.headers());

        let body = resp
            .text()
            .await
            .into_app_err_with(|| format!("unable to read response body for {}", request.label))?;

        Ok(RawResponse {
            status,
            retry_after,
            rate_limit_remaining,
            body,
        })
    }
}

fn extract_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(secs))
}

fn extract_rate_limit_remaining(headers: &HeaderMap) -> Option<u64> {
    headers.get("x-ratelimit-remaining")?.to_str().ok()?.trim().parse::<u64>().ok()
}
