use super::{Classification, FailureKind, GatewayError, GraphQlRequest, RetryPolicy, Transport, classify};
use core::sync::atomic::{AtomicU64, Ordering};
use serde::de::DeserializeOwned;

const LOG_TARGET: &str = "   gateway";

/// Sends GraphQL requests, retrying transient failures according to a [`RetryPolicy`].
#[derive(Debug)]
pub struct Gateway<T> {
    transport: T,
    policy: RetryPolicy,
    requests: AtomicU64,
}

impl<T: Transport> Gateway<T> {
    pub const fn new(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            requests: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of requests handed to the transport so far, retries included.
    #[must_use]
    pub fn requests_sent(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Send `request` and decode the `data` member of the response as `R`.
    ///
    /// Transient failures are retried with backoff. When the attempt budget runs out the
    /// error is [`FailureKind::RetriesExceeded`]; every other error carries the kind the
    /// response was classified as.
    pub async fn execute<R: DeserializeOwned>(&self, request: &GraphQlRequest) -> Result<R, GatewayError> {
        let mut attempt = 0_u32;

        loop {
            attempt += 1;
            let _ = self.requests.fetch_add(1, Ordering::Relaxed);

            let classification = match self.transport.post(request).await {
                Ok(response) => classify(&response, &self.policy),
                Err(e) => Classification::failure(FailureKind::Transport, None, format!("{e:#}")),
            };

            let (kind, retry_after, reason) = match classification {
                Classification::Success(data) => {
                    log::trace!(target: LOG_TARGET, "Received {} (attempt {attempt})", request.label);
                    return serde_json::from_value(data).map_err(|e| {
                        GatewayError::new(FailureKind::Decode, attempt, format!("unable to decode response for {}: {e}", request.label))
                    });
                }
                Classification::Retry { kind, retry_after, reason } => (kind, retry_after, reason),
                Classification::Fail { kind, reason } => {
                    return Err(GatewayError::new(kind, attempt, format!("{}: {reason}", request.label)));
                }
            };

            if !self.policy.allows_another(attempt) {
                return Err(GatewayError::new(
                    FailureKind::RetriesExceeded,
                    attempt,
                    format!("{}: giving up, last failure was {kind}: {reason}", request.label),
                ));
            }

            let delay = self.policy.delay_for(kind, attempt, retry_after);
            log::warn!(target: LOG_TARGET,
                "{} failed with {kind} on attempt {attempt}/{}, retrying in {:.1}s: {reason}",
                request.label,
                self.policy.max_attempts,
                delay.as_secs_f64()
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::gateway::RawResponse;
    use crate::stats::gateway::scripted::ScriptedTransport;
    use ohno::app_err;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq, Eq)]
    struct Viewer {
        login: String,
    }

    #[derive(Debug, Deserialize)]
    struct ViewerData {
        viewer: Viewer,
    }

    fn request() -> GraphQlRequest {
        GraphQlRequest::new("query { viewer { login } }", serde_json::json!({}), "viewer")
    }

    const OK_BODY: &str = r#"{ "data": { "viewer": { "login": "alice" } } }"#;

    #[tokio::test]
    async fn test_success_first_try() {
        let gateway = Gateway::new(ScriptedTransport::new(|_| Ok(RawResponse::ok(OK_BODY))), RetryPolicy::without_backoff(3));
        let data: ViewerData = gateway.execute(&request()).await.unwrap();
        assert_eq!(data.viewer.login, "alice");
        assert_eq!(gateway.requests_sent(), 1);
        assert_eq!(gateway.transport().calls(), 1);
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let transport = ScriptedTransport::sequence(vec![
            Ok(RawResponse::with_status(502, "")),
            Err(app_err!("connection reset")),
            Ok(RawResponse::ok(OK_BODY)),
        ]);
        let gateway = Gateway::new(transport, RetryPolicy::without_backoff(3));
        let data: ViewerData = gateway.execute(&request()).await.unwrap();
        assert_eq!(data.viewer.login, "alice");
        assert_eq!(gateway.requests_sent(), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let gateway = Gateway::new(ScriptedTransport::new(|_| Ok(RawResponse::with_status(503, ""))), RetryPolicy::without_backoff(3));
        let err = gateway.execute::<ViewerData>(&request()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::RetriesExceeded);
        assert_eq!(err.attempts(), 3);
        assert!(err.message().contains("server error"));
        assert_eq!(gateway.requests_sent(), 3);
    }

    #[tokio::test]
    async fn test_throttling_is_retried() {
        let transport = ScriptedTransport::sequence(vec![
            Ok(RawResponse::with_status(429, "")),
            Ok(RawResponse::ok(OK_BODY)),
        ]);
        let gateway = Gateway::new(transport, RetryPolicy::without_backoff(3));
        let _: ViewerData = gateway.execute(&request()).await.unwrap();
        assert_eq!(gateway.requests_sent(), 2);
    }

    #[tokio::test]
    async fn test_fatal_not_retried() {
        let gateway = Gateway::new(
            ScriptedTransport::new(|_| Ok(RawResponse::with_status(401, "Bad credentials"))),
            RetryPolicy::without_backoff(3),
        );
        let err = gateway.execute::<ViewerData>(&request()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Unauthorized);
        assert_eq!(err.attempts(), 1);
        assert_eq!(gateway.requests_sent(), 1);
    }

    #[tokio::test]
    async fn test_not_accessible_not_retried() {
        let body = r#"{ "errors": [ { "type": "NOT_FOUND", "message": "Could not resolve to a Repository" } ] }"#;
        let gateway = Gateway::new(ScriptedTransport::new(move |_| Ok(RawResponse::ok(body))), RetryPolicy::without_backoff(3));
        let err = gateway.execute::<ViewerData>(&request()).await.unwrap_err();
        assert!(err.kind().is_skippable());
        assert_eq!(gateway.requests_sent(), 1);
    }

    #[tokio::test]
    async fn test_only_retryable_kinds_are_resent() {
        let cases = [
            (RawResponse::with_status(503, ""), FailureKind::Server),
            (RawResponse::with_status(403, "Forbidden"), FailureKind::Forbidden),
            (RawResponse::with_status(404, "Not Found"), FailureKind::Query),
            (RawResponse::ok("<html>"), FailureKind::Decode),
        ];

        for (response, kind) in cases {
            let gateway = Gateway::new(ScriptedTransport::new(move |_| Ok(response.clone())), RetryPolicy::without_backoff(2));
            let _ = gateway.execute::<ViewerData>(&request()).await.unwrap_err();

            let expected = if RetryPolicy::is_retryable(kind) { 2 } else { 1 };
            assert_eq!(gateway.requests_sent(), expected, "{kind}");
        }
    }

    #[tokio::test]
    async fn test_decode_failure() {
        let body = r#"{ "data": { "viewer": { "name": "no login here" } } }"#;
        let gateway = Gateway::new(ScriptedTransport::new(move |_| Ok(RawResponse::ok(body))), RetryPolicy::without_backoff(3));
        let err = gateway.execute::<ViewerData>(&request()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Decode);
        assert!(err.message().contains("viewer"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_sleeps_between_attempts() {
        let transport = ScriptedTransport::sequence(vec![
            Ok(RawResponse::with_status(500, "")),
            Ok(RawResponse::with_status(500, "")),
            Ok(RawResponse::ok(OK_BODY)),
        ]);
        let gateway = Gateway::new(transport, RetryPolicy::default());

        let start = tokio::time::Instant::now();
        let _: ViewerData = gateway.execute(&request()).await.unwrap();

        // 5s after the first failure, 10s after the second
        assert!(start.elapsed() >= core::time::Duration::from_secs(15));
    }
}
