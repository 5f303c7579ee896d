use std::{io, path::PathBuf, time::Duration};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    readiness::ReadinessError,
    shutdown::{ShutdownSignal, ShutdownToken},
    timeouts,
};

/// Failure while launching or readying a deployment.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("failed to spawn site process '{binary}': {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("base URI hint '{url}' has no usable host/port")]
    InvalidBaseUri { url: Url },
    #[error("failed to allocate a free backend port")]
    NoFreePort,
    #[error("failed to prepare deployment workdir: {source}")]
    Workdir {
        #[source]
        source: io::Error,
    },
    #[error("target started but never became ready: {source}")]
    Readiness {
        #[source]
        source: ReadinessError,
    },
}

/// Lifecycle of a deployment handle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeploymentState {
    Starting,
    Ready,
    Stopped,
}

/// Variant-specific teardown surface behind a [`Deployment`].
#[async_trait]
pub trait ServerHandle: Send {
    /// Stop the server, waiting up to `grace` before forcing termination.
    async fn stop(&mut self, grace: Duration);

    /// Synchronous last-resort teardown, used when a handle is dropped
    /// without an explicit stop.
    fn force_kill(&mut self);
}

/// Owned handle to a running deployment. The handle owns the spawned
/// process or listener task; releasing the handle stops it. Subsequent
/// tests reuse fixed ports, so a stopped handle must leave its port free.
pub struct Deployment {
    application_base_url: Url,
    signal: ShutdownSignal,
    backend: Option<Box<dyn ServerHandle>>,
    state: DeploymentState,
}

impl Deployment {
    /// Register a freshly launched backend for teardown. The handle starts
    /// in `Starting`; deployers promote it once readiness is observed.
    #[must_use]
    pub fn starting(
        application_base_url: Url,
        signal: ShutdownSignal,
        backend: Box<dyn ServerHandle>,
    ) -> Self {
        Self {
            application_base_url,
            signal,
            backend: Some(backend),
            state: DeploymentState::Starting,
        }
    }

    pub fn mark_ready(&mut self) {
        debug!(url = %self.application_base_url, "deployment ready");
        self.state = DeploymentState::Ready;
    }

    #[must_use]
    pub const fn application_base_url(&self) -> &Url {
        &self.application_base_url
    }

    #[must_use]
    pub const fn state(&self) -> DeploymentState {
        self.state
    }

    /// Token observing host shutdown; fires when the handle stops or the
    /// backing process dies.
    #[must_use]
    pub fn host_shutdown_token(&self) -> ShutdownToken {
        self.signal.token()
    }

    /// Stop the deployment. Idempotent; bounded by the shutdown grace
    /// period, after which the backend is force-killed.
    pub async fn stop(&mut self) {
        let Some(mut backend) = self.backend.take() else {
            debug!(url = %self.application_base_url, "deployment already stopped");
            return;
        };

        info!(url = %self.application_base_url, "stopping deployment");
        self.signal.fire();
        backend.stop(timeouts::shutdown_grace()).await;
        self.state = DeploymentState::Stopped;
    }
}

impl std::fmt::Debug for Deployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployment")
            .field("application_base_url", &self.application_base_url)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Drop for Deployment {
    fn drop(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            warn!(
                url = %self.application_base_url,
                "deployment dropped without stop; force-killing backend"
            );
            self.signal.fire();
            backend.force_kill();
            self.state = DeploymentState::Stopped;
        }
    }
}
