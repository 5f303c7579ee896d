use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use server_comparison_core::{
    ApplicationDeployer, adjust_timeout,
    deployment::{DeployError, Deployment, ServerHandle},
    net,
    params::DeploymentParameters,
    readiness::wait_for_http_ready,
    shutdown::ShutdownSignal,
    timeouts,
};
use server_comparison_site::site_router;
use tokio::{
    net::TcpListener,
    sync::oneshot,
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, info, warn};

/// Serves the site from a listener task inside the calling process.
#[derive(Clone, Debug, Default)]
pub struct InProcessDeployer {}

impl InProcessDeployer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApplicationDeployer for InProcessDeployer {
    async fn deploy(&self, params: &DeploymentParameters) -> Result<Deployment, DeployError> {
        let base_url = params.application_base_uri_hint().clone();
        let listen_addr =
            net::socket_addr_for(&base_url).ok_or_else(|| DeployError::InvalidBaseUri {
                url: base_url.clone(),
            })?;

        let listener = TcpListener::bind(listen_addr)
            .await
            .map_err(|source| DeployError::Bind {
                addr: listen_addr.to_string(),
                source,
            })?;

        // The listener shares the caller's runtime; the flavor parameter is
        // only observable for the process-backed variants.
        debug!(
            addr = %listen_addr,
            environment = %params.environment_name(),
            flavor = %params.runtime_flavor(),
            "starting in-process listener"
        );

        let router = site_router(params.environment_name());
        let signal = ShutdownSignal::new();
        let (task, shutdown_tx) = spawn_site_listener(listener, router, &signal);

        let handle = InProcessHandle {
            task,
            shutdown_tx: Some(shutdown_tx),
        };
        let mut deployment = Deployment::starting(base_url.clone(), signal, Box::new(handle));

        if let Err(source) = wait_for_http_ready(
            &base_url,
            adjust_timeout(timeouts::startup_timeout()),
            timeouts::readiness_poll_interval(),
        )
        .await
        {
            deployment.stop().await;
            return Err(DeployError::Readiness { source });
        }

        deployment.mark_ready();
        info!(url = %base_url, "in-process site deployed");
        Ok(deployment)
    }
}

/// Runs the listener until the returned sender triggers graceful shutdown.
/// The signal fires once the task finishes, whether it was asked to stop or
/// the serve loop errored out, so probes see a dead listener as host
/// shutdown.
fn spawn_site_listener(
    listener: TcpListener,
    router: Router,
    signal: &ShutdownSignal,
) -> (JoinHandle<()>, oneshot::Sender<()>) {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let signal = signal.clone();
    let task = tokio::spawn(async move {
        let serve = axum::serve(listener, router).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        if let Err(err) = serve.await {
            warn!(error = %err, "in-process listener terminated with error");
        }
        signal.fire();
    });
    (task, shutdown_tx)
}

struct InProcessHandle {
    task: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

#[async_trait]
impl ServerHandle for InProcessHandle {
    async fn stop(&mut self, grace: Duration) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if timeout(grace, &mut self.task).await.is_err() {
            warn!("graceful shutdown overran the grace period; aborting listener task");
            self.task.abort();
        }
    }

    fn force_kill(&mut self) {
        self.task.abort();
    }
}
