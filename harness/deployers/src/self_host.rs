use std::{
    fs,
    process::{Child, Command, Stdio},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::json;
use server_comparison_core::{
    ApplicationDeployer, adjust_timeout,
    binary::BinaryResolver,
    deployment::{DeployError, Deployment, ServerHandle},
    net,
    params::DeploymentParameters,
    process::{is_running, kill_child},
    readiness::wait_for_http_ready,
    shutdown::ShutdownSignal,
    timeouts,
};
use server_comparison_env as harness_env;
use tempfile::TempDir;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

const LIVENESS_POLL_INTERVAL: Duration = Duration::from_millis(100);
const CONFIG_FILENAME: &str = "config.json";

/// Spawns the site binary as an external process listening directly on the
/// requested base URL.
#[derive(Clone, Debug, Default)]
pub struct SelfHostDeployer {}

impl SelfHostDeployer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApplicationDeployer for SelfHostDeployer {
    async fn deploy(&self, params: &DeploymentParameters) -> Result<Deployment, DeployError> {
        let base_url = params.application_base_uri_hint().clone();
        let listen_addr =
            net::socket_addr_for(&base_url).ok_or_else(|| DeployError::InvalidBaseUri {
                url: base_url.clone(),
            })?;

        let workdir =
            tempfile::tempdir().map_err(|source| DeployError::Workdir { source })?;

        // The environment name flows through both configuration sources the
        // site merges: the JSON file and the process environment (which
        // wins). Listener address and flavor ride on the environment only.
        let config_path = workdir.path().join(CONFIG_FILENAME);
        let config = json!({ "environment": params.environment_name().name() });
        fs::write(&config_path, config.to_string())
            .map_err(|source| DeployError::Workdir { source })?;

        let binary = BinaryResolver::resolve_site_binary();
        let app_path = params.application_path();
        let current_dir = if app_path.is_dir() {
            app_path.clone()
        } else {
            workdir.path().to_owned()
        };

        debug!(
            binary = %binary.display(),
            addr = %listen_addr,
            environment = %params.environment_name(),
            flavor = %params.runtime_flavor(),
            arch = %params.architecture(),
            "spawning site process"
        );

        let child = Command::new(&binary)
            .current_dir(&current_dir)
            .env("SITE_CONFIG", &config_path)
            .env("SITE_ENVIRONMENT", params.environment_name().name())
            .env("SITE_LISTEN", listen_addr.to_string())
            .env("SITE_RUNTIME_FLAVOR", params.runtime_flavor().label())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| DeployError::Spawn { binary, source })?;

        let child = Arc::new(Mutex::new(child));
        let signal = ShutdownSignal::new();
        spawn_liveness_monitor(Arc::clone(&child), signal.clone());

        let handle = SelfHostHandle {
            child,
            workdir: Some(workdir),
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
        info!(url = %base_url, "self-host site deployed");
        Ok(deployment)
    }
}

/// Fires the host-shutdown signal if the site process dies on its own.
fn spawn_liveness_monitor(child: Arc<Mutex<Child>>, signal: ShutdownSignal) {
    let token = signal.token();
    tokio::spawn(async move {
        loop {
            if token.is_cancelled() {
                return;
            }

            let running = is_running(&mut child.lock().expect("site child lock poisoned"));
            if !running {
                info!("site process exited; firing host shutdown signal");
                signal.fire();
                return;
            }

            sleep(LIVENESS_POLL_INTERVAL).await;
        }
    });
}

struct SelfHostHandle {
    child: Arc<Mutex<Child>>,
    workdir: Option<TempDir>,
}

impl SelfHostHandle {
    fn release_workdir(&mut self) {
        if let Some(workdir) = self.workdir.take() {
            if harness_env::harness_keep_workdirs() {
                let kept = workdir.keep();
                info!(path = %kept.display(), "preserving deployment workdir");
            }
        }
    }
}

#[async_trait]
impl ServerHandle for SelfHostHandle {
    async fn stop(&mut self, grace: Duration) {
        // The site has no stop channel besides ctrl-c, so termination is a
        // kill; `grace` bounds the wait for the exit to be observed.
        {
            let mut child = self.child.lock().expect("site child lock poisoned");
            let _ = child.kill();
        }

        let deadline = Instant::now() + grace;
        loop {
            let running = is_running(&mut self.child.lock().expect("site child lock poisoned"));
            if !running {
                break;
            }
            if Instant::now() >= deadline {
                warn!("site process still running after shutdown grace period");
                break;
            }
            sleep(timeouts::EXIT_POLL_INTERVAL).await;
        }

        self.release_workdir();
    }

    fn force_kill(&mut self) {
        if let Ok(mut child) = self.child.lock() {
            kill_child(&mut child);
        }
        self.release_workdir();
    }
}
