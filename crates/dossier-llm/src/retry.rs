use std::future::Future;
use std::time::Duration;

/// Bounded retry with exponential backoff for outbound HTTP calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, base_backoff: Duration) -> Self {
        Self {
            max_retries,
            base_backoff,
        }
    }

    /// A policy that sends each request exactly once.
    #[must_use]
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Exponential backoff for `attempt`, saturating instead of overflowing.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_backoff.saturating_mul(factor)
    }

    /// Longest delay a server's `Retry-After` may impose: the final backoff step.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.backoff(self.max_retries)
    }
}

/// Parse the `Retry-After` header value as seconds, capped at [`RetryPolicy::max_delay`],
/// falling back to exponential backoff.
pub(crate) fn retry_delay(
    response: &reqwest::Response,
    policy: &RetryPolicy,
    attempt: u32,
) -> Duration {
    if let Some(val) = response.headers().get("retry-after")
        && let Ok(s) = val.to_str()
        && let Ok(secs) = s.parse::<u64>()
    {
        return Duration::from_secs(secs).min(policy.max_delay());
    }
    policy.backoff(attempt)
}

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

/// Send an HTTP request, retrying up to `policy.max_retries` times on 429, 5xx,
/// connect and timeout failures.
///
/// `f` must build and send a fresh request on every call. When all attempts are
/// exhausted the last response is returned as-is so the caller can map its status
/// onto its own error type.
///
/// # Errors
///
/// Returns the underlying `reqwest::Error` when the final attempt fails at the
/// transport level.
pub async fn send_with_retry<F, Fut>(
    target: &str,
    policy: &RetryPolicy,
    mut f: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        let exhausted = attempt >= policy.max_retries;
        match f().await {
            Ok(response) if is_retryable_status(response.status()) && !exhausted => {
                let delay = retry_delay(&response, policy, attempt);
                tracing::warn!(
                    "{target} returned {}, retrying in {}ms ({}/{})",
                    response.status(),
                    delay.as_millis(),
                    attempt + 1,
                    policy.max_retries
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) if is_retryable_error(&e) && !exhausted => {
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    "{target} request failed: {e}, retrying in {}ms ({}/{})",
                    delay.as_millis(),
                    attempt + 1,
                    policy.max_retries
                );
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(1))
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        assert_eq!(policy.backoff(0), Duration::from_millis(500));
        assert_eq!(policy.backoff(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff(2), Duration::from_millis(2000));
    }

    #[test]
    fn backoff_saturates_on_large_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert_eq!(policy.backoff(40), Duration::from_secs(u64::from(u32::MAX)));
    }

    #[test]
    fn none_policy_has_no_retries() {
        assert_eq!(RetryPolicy::none().max_retries, 0);
    }

    #[tokio::test]
    async fn send_with_retry_success_on_first_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/test"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/test", server.uri());
        let result = send_with_retry("test", &fast_policy(3), || client.get(&url).send()).await;

        assert_eq!(result.unwrap().status(), 200);
    }

    #[tokio::test]
    async fn send_with_retry_returns_last_response_when_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/test"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
            .expect(2)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/test", server.uri());
        // max_retries=1 means: attempt 0 (429 -> retry), attempt 1 (429 -> returned)
        let result = send_with_retry("test", &fast_policy(1), || client.get(&url).send()).await;

        assert_eq!(result.unwrap().status(), 429);
    }

    #[test]
    fn max_delay_is_final_backoff_step() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        assert_eq!(policy.max_delay(), Duration::from_secs(4));
        assert_eq!(RetryPolicy::none().max_delay(), Duration::ZERO);
    }

    #[tokio::test]
    async fn send_with_retry_caps_large_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/test"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "86400"))
            .expect(3)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/test", server.uri());
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            send_with_retry("test", &fast_policy(2), || client.get(&url).send()),
        )
        .await
        .expect("retry-after must be capped by the policy");

        assert_eq!(result.unwrap().status(), 429);
    }

    #[tokio::test]
    async fn send_with_retry_succeeds_after_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/test"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/test"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/test", server.uri());
        let result = send_with_retry("test", &fast_policy(2), || client.get(&url).send()).await;

        assert_eq!(result.unwrap().status(), 200);
    }

    #[tokio::test]
    async fn send_with_retry_does_not_retry_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/test"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/test", server.uri());
        let result = send_with_retry("test", &fast_policy(3), || client.get(&url).send()).await;

        assert_eq!(result.unwrap().status(), 404);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn backoff_is_monotonic(attempt in 0u32..40) {
            let policy = RetryPolicy::new(3, Duration::from_millis(10));
            prop_assert!(policy.backoff(attempt + 1) >= policy.backoff(attempt));
        }
    }
}
