use std::time::Duration;

use reqwest::Client as ReqwestClient;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};
use url::Url;

/// Error raised when a deployed target never accepts a request.
#[derive(Clone, Debug, Error)]
#[error("timeout waiting for {url} to accept requests after {timeout:?}")]
pub struct ReadinessError {
    url: Url,
    timeout: Duration,
}

impl ReadinessError {
    #[must_use]
    pub const fn new(url: Url, timeout: Duration) -> Self {
        Self { url, timeout }
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Actively poll the base URL until the target answers. Any response counts
/// as ready; a freshly bound listener that rejects connections does not.
pub async fn wait_for_http_ready(
    url: &Url,
    timeout_duration: Duration,
    poll_interval: Duration,
) -> Result<(), ReadinessError> {
    info!(
        %url,
        timeout_secs = timeout_duration.as_secs_f32(),
        poll_ms = poll_interval.as_millis(),
        "waiting for HTTP readiness"
    );

    let client = ReqwestClient::new();
    let probe = async {
        loop {
            match client.get(url.clone()).send().await {
                Ok(response) => {
                    debug!(%url, status = %response.status(), "readiness probe answered");
                    return;
                }
                Err(err) => {
                    debug!(%url, error = %err, "readiness probe not answered yet");
                }
            }

            sleep(poll_interval).await;
        }
    };

    timeout(timeout_duration, probe)
        .await
        .map_err(|_| ReadinessError::new(url.clone(), timeout_duration))
}
