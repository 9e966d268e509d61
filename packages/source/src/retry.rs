//! HTTP retry helper for transient Socrata errors.
//!
//! The Socrata client sends every request through [`send_json`] so that
//! rate limiting (HTTP 429), server errors, and dropped connections get a
//! short exponential backoff. Anything still failing after the last attempt
//! is returned to the caller unchanged.
//!
//! ```ignore
//! let body = retry::send_json(|| client.get(&url).query(&params), MAX_RETRIES).await?;
//! ```

use std::time::Duration;

use crate::SourceError;

/// Default number of retry attempts after the first request.
///
/// With backoff of 1s and 2s the worst-case added wait is 3 seconds.
pub const MAX_RETRIES: u32 = 2;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// Sends an HTTP request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt because
/// [`reqwest::RequestBuilder`] is consumed by `.send()`.
///
/// Retries connection errors, timeouts, HTTP 429, and HTTP 5xx up to
/// `max_retries` times. HTTP 4xx (other than 429) and undecodable bodies
/// are permanent and returned immediately.
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails after all retries, the
/// server returns a non-retryable status code, or the body is not JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(
    build_request: F,
    max_retries: u32,
) -> Result<serde_json::Value, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, max_retries).await?;
    let url = response.url().to_string();
    let status = response.status();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
        log::error!(
            "JSON parse failed\n  \
             url: {url}\n  \
             status: {status}\n  \
             received: {} bytes\n  \
             parse error: {e}\n  \
             body preview: {preview}",
            text.len(),
        );
        SourceError::Json(e)
    })
}

#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    build_request: &F,
    max_retries: u32,
) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = backoff_delay(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }
        let can_retry = attempt < max_retries;
        attempt += 1;

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && can_retry {
                    log::warn!("  transient error: {e}");
                    continue;
                }
                return Err(SourceError::Http(e));
            }
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }
                if is_retryable_status(status.as_u16()) && can_retry {
                    log::warn!("  HTTP {status} from {}", response.url());
                    continue;
                }
                return Err(SourceError::Status {
                    status: status.as_u16(),
                    url: response.url().to_string(),
                });
            }
        }
    }
}

/// Delay before retry number `attempt` (1-based): 1s, 2s, 4s, ...
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.saturating_sub(1).min(6))
}

/// Rate limiting and server errors are worth another try.
const fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500..=599)
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(3), Duration::from_secs(4));
    }

    #[test]
    fn retries_rate_limit_and_server_errors_only() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(403));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(200));
    }
}
