use super::{RawResponse, RetryPolicy};
use core::fmt::{Display, Formatter};
use core::time::Duration;
use serde::Deserialize;
use serde_json::Value;

const LOG_TARGET: &str = "   gateway";

/// Classified reason a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No HTTP response was received.
    Transport,

    /// HTTP 5xx.
    Server,

    /// Primary or secondary rate limit.
    Throttled,

    /// HTTP 401, the credentials are invalid.
    Unauthorized,

    /// HTTP 403 without any rate-limit indication.
    Forbidden,

    /// The requested node exists but cannot be seen with these credentials.
    NotAccessible,

    /// Any other error reported by the endpoint.
    Query,

    /// The response could not be decoded.
    Decode,

    /// A transient failure persisted through every allowed attempt.
    RetriesExceeded,
}

impl FailureKind {
    /// Whether the failure only affects the node being queried, so the run can continue without it.
    #[must_use]
    pub const fn is_skippable(self) -> bool {
        matches!(self, Self::NotAccessible)
    }

    /// Whether the failure stems from a condition that may clear up on its own.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Transport | Self::Server | Self::Throttled | Self::RetriesExceeded)
    }
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Self::Transport => "transport error",
            Self::Server => "server error",
            Self::Throttled => "rate limited",
            Self::Unauthorized => "invalid credentials",
            Self::Forbidden => "forbidden",
            Self::NotAccessible => "not accessible",
            Self::Query => "query error",
            Self::Decode => "undecodable response",
            Self::RetriesExceeded => "retries exceeded",
        };
        f.write_str(s)
    }
}

/// A request that did not produce usable data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    kind: FailureKind,
    attempts: u32,
    message: String,
}

impl GatewayError {
    #[must_use]
    pub fn new(kind: FailureKind, attempts: u32, message: impl Into<String>) -> Self {
        Self {
            kind,
            attempts,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    /// How many times the request was sent before giving up.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let plural = if self.attempts == 1 { "" } else { "s" };
        write!(f, "{} ({}, {} attempt{plural})", self.message, self.kind, self.attempts)
    }
}

impl core::error::Error for GatewayError {}

/// How the gateway should proceed with a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// The `data` member of a response without errors.
    Success(serde_json::Value),

    /// Worth sending again after a delay.
    Retry {
        kind: FailureKind,
        retry_after: Option<Duration>,
        reason: String,
    },

    /// Sending again would not help.
    Fail { kind: FailureKind, reason: String },
}

impl Classification {
    /// A failure of `kind`, worth retrying only when [`RetryPolicy::is_retryable`] says so.
    pub(super) fn failure(kind: FailureKind, retry_after: Option<Duration>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        if RetryPolicy::is_retryable(kind) {
            Self::Retry { kind, retry_after, reason }
        } else {
            Self::Fail { kind, reason }
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<serde_json::Value>,

    #[serde(default)]
    errors: Vec<ResponseError>,
}

#[derive(Debug, Deserialize)]
struct ResponseError {
    #[serde(default, rename = "type")]
    error_type: Option<String>,

    #[serde(default)]
    message: String,

    /// Location of the failing field in `data`, e.g. `["user", "repositories", "nodes", 1]`.
    #[serde(default)]
    path: Vec<Value>,
}

impl ResponseError {
    fn is_rate_limit(&self) -> bool {
        self.error_type.as_deref() == Some("RATE_LIMITED") || mentions_rate_limit(&self.message)
    }

    fn is_not_accessible(&self) -> bool {
        if matches!(self.error_type.as_deref(), Some("FORBIDDEN" | "NOT_FOUND")) {
            return true;
        }

        let message = self.message.to_ascii_lowercase();
        message.contains("not accessible") || message.contains("could not resolve")
    }

    /// Whether the error nulled out a single node nested inside data that is otherwise present,
    /// such as one entry of a repository list.
    fn is_nested_in(&self, data: &Value) -> bool {
        let Some((_, parents)) = self.path.split_last() else {
            return false;
        };
        if parents.is_empty() {
            return false;
        }

        let mut current = data;
        for segment in parents {
            let next = match segment {
                Value::String(key) => current.get(key.as_str()),
                Value::Number(index) => index.as_u64().and_then(|i| usize::try_from(i).ok()).and_then(|i| current.get(i)),
                _ => None,
            };
            match next {
                Some(value) if !value.is_null() => current = value,
                _ => return false,
            }
        }
        true
    }

    fn path_text(&self) -> String {
        self.path
            .iter()
            .map(|segment| match segment {
                Value::String(key) => key.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

fn mentions_rate_limit(text: &str) -> bool {
    let text = text.to_ascii_lowercase();
    text.contains("rate limit") || text.contains("abuse")
}

/// Decide what a response means.
///
/// | Response | Outcome |
/// |---|---|
/// | 2xx with data and no errors | success |
/// | 2xx with a rate-limit error | retry (throttled) |
/// | 2xx whose errors all name inaccessible nodes nested in present data | success, those nodes are null |
/// | 2xx whose errors all name inaccessible nodes | fail (not accessible) |
/// | 2xx with any other error | fail (query) |
/// | 401 | fail (unauthorized) |
/// | 403 with rate-limit indications | retry (throttled) |
/// | 403 otherwise | fail (forbidden, or not accessible when configured to skip) |
/// | 429 | retry (throttled) |
/// | 5xx | retry (server) |
/// | anything else | fail (query) |
#[must_use]
pub fn classify(response: &RawResponse, policy: &RetryPolicy) -> Classification {
    let retry_after = response.retry_after;
    match response.status {
        200..=299 => classify_body(&response.body, retry_after),
        401 => Classification::failure(FailureKind::Unauthorized, None, "the access token was rejected (HTTP 401)"),
        403 if is_rate_limited(response) => Classification::failure(FailureKind::Throttled, retry_after, "rate limited (HTTP 403)"),
        403 if policy.skip_forbidden => Classification::failure(FailureKind::NotAccessible, None, "forbidden (HTTP 403)"),
        403 => Classification::failure(FailureKind::Forbidden, None, format!("forbidden (HTTP 403): {}", snippet(&response.body))),
        429 => Classification::failure(FailureKind::Throttled, retry_after, "rate limited (HTTP 429)"),
        500..=599 => Classification::failure(FailureKind::Server, retry_after, format!("server error (HTTP {})", response.status)),
        status => Classification::failure(FailureKind::Query, None, format!("unexpected HTTP {status}: {}", snippet(&response.body))),
    }
}

fn classify_body(body: &str, retry_after: Option<Duration>) -> Classification {
    let envelope: Envelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) => return Classification::failure(FailureKind::Decode, None, format!("response is not a GraphQL document: {e}")),
    };

    if !envelope.errors.is_empty() {
        let messages = envelope.errors.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; ");

        if envelope.errors.iter().any(ResponseError::is_rate_limit) {
            return Classification::failure(FailureKind::Throttled, retry_after, messages);
        }

        if !envelope.errors.iter().all(ResponseError::is_not_accessible) {
            return Classification::failure(FailureKind::Query, None, messages);
        }

        return match envelope.data {
            Some(data) if envelope.errors.iter().all(|e| e.is_nested_in(&data)) => {
                for error in &envelope.errors {
                    log::warn!(target: LOG_TARGET, "Skipping inaccessible node at '{}': {}", error.path_text(), error.message);
                }
                Classification::Success(data)
            }
            _ => Classification::failure(FailureKind::NotAccessible, None, messages),
        };
    }

    match envelope.data {
        Some(data) if !data.is_null() => Classification::Success(data),
        _ => Classification::failure(FailureKind::Decode, None, "response carries neither data nor errors"),
    }
}

fn is_rate_limited(response: &RawResponse) -> bool {
    response.retry_after.is_some() || response.rate_limit_remaining == Some(0) || mentions_rate_limit(&response.body)
}

fn snippet(body: &str) -> &str {
    const MAX: usize = 200;
    let end = body.char_indices().map(|(i, _)| i).nth(MAX).unwrap_or(body.len());
    body.get(..end).unwrap_or(body).trim()
}
