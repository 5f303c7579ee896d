//! Deployment-handle lifecycle guarantees: released handles free their
//! ports, release is idempotent, failed deploys tear down, and the
//! shutdown token aborts probes. Uses ports ranging 5081 - 5086.

use std::{os::unix::fs::PermissionsExt, time::Duration};

use serial_test::serial;
use server_comparison_core::{
    DeployError, DeploymentState, RetryError, RetryPolicy,
    params::{AppEnvironment, RuntimeFlavor, ServerVariant},
    retry_request,
};
use server_comparison_deployers::deployer_for;
use tests_functional::{init_tracing, scenario_parameters};
use tokio::{net::TcpListener, time::sleep};

const PORT_RELEASE_WINDOW: Duration = Duration::from_secs(2);
const PORT_RELEASE_POLL: Duration = Duration::from_millis(50);

async fn assert_port_free(port: u16) {
    let deadline = tokio::time::Instant::now() + PORT_RELEASE_WINDOW;
    loop {
        match TcpListener::bind(("127.0.0.1", port)).await {
            Ok(_) => return,
            Err(err) if tokio::time::Instant::now() >= deadline => {
                panic!("port {port} still bound after release window: {err}");
            }
            Err(_) => sleep(PORT_RELEASE_POLL).await,
        }
    }
}

#[tokio::test]
#[serial]
async fn releasing_the_handle_frees_the_port() -> anyhow::Result<()> {
    init_tracing();
    let params = scenario_parameters(
        ServerVariant::InProcess,
        RuntimeFlavor::MultiThread,
        "http://localhost:5081/",
        AppEnvironment::HelloWorld,
    );

    let deployer = deployer_for(params.server_variant());
    let mut deployment = deployer.deploy(&params).await?;
    assert_eq!(deployment.state(), DeploymentState::Ready);

    deployment.stop().await;
    assert_eq!(deployment.state(), DeploymentState::Stopped);
    assert_port_free(5081).await;
    Ok(())
}

#[tokio::test]
#[serial]
async fn stop_is_idempotent_and_fires_the_shutdown_token() -> anyhow::Result<()> {
    init_tracing();
    let params = scenario_parameters(
        ServerVariant::InProcess,
        RuntimeFlavor::MultiThread,
        "http://localhost:5082/",
        AppEnvironment::HelloWorld,
    );

    let deployer = deployer_for(params.server_variant());
    let mut deployment = deployer.deploy(&params).await?;
    let mut token = deployment.host_shutdown_token();
    assert!(!token.is_cancelled());

    deployment.stop().await;
    deployment.stop().await;
    assert_eq!(deployment.state(), DeploymentState::Stopped);

    tokio::time::timeout(Duration::from_secs(1), token.cancelled())
        .await
        .expect("token fires when the handle is released");
    Ok(())
}

#[tokio::test]
#[serial]
async fn deploying_onto_a_bound_port_fails_with_a_bind_error() -> anyhow::Result<()> {
    init_tracing();
    let blocker = TcpListener::bind(("127.0.0.1", 5083)).await?;
    let params = scenario_parameters(
        ServerVariant::InProcess,
        RuntimeFlavor::MultiThread,
        "http://127.0.0.1:5083/",
        AppEnvironment::HelloWorld,
    );

    let deployer = deployer_for(params.server_variant());
    let err = deployer
        .deploy(&params)
        .await
        .expect_err("bound port cannot be deployed onto");
    assert!(matches!(err, DeployError::Bind { .. }), "got {err}");

    drop(blocker);
    Ok(())
}

#[tokio::test]
#[serial]
async fn probes_against_a_released_handle_cancel_promptly() -> anyhow::Result<()> {
    init_tracing();
    let params = scenario_parameters(
        ServerVariant::InProcess,
        RuntimeFlavor::MultiThread,
        "http://localhost:5084/",
        AppEnvironment::HelloWorld,
    );

    let deployer = deployer_for(params.server_variant());
    let mut deployment = deployer.deploy(&params).await?;
    let token = deployment.host_shutdown_token();
    deployment.stop().await;

    let client = reqwest::Client::new();
    let base = deployment.application_base_url().clone();
    // A generous budget that only cancellation can cut short.
    let policy = RetryPolicy::new(100, Duration::from_secs(10));

    let started = tokio::time::Instant::now();
    let err = retry_request(|| client.get(base.clone()).send(), token, policy)
        .await
        .expect_err("the host is gone");

    assert!(matches!(err, RetryError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));
    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires the site binary (cargo build -p server-comparison-site)"]
async fn backend_death_fires_the_proxy_shutdown_token() -> anyhow::Result<()> {
    init_tracing();
    let params = scenario_parameters(
        ServerVariant::ReverseProxy,
        RuntimeFlavor::MultiThread,
        "http://localhost:5085/",
        AppEnvironment::HelloWorld,
    );

    let deployer = deployer_for(params.server_variant());
    let mut deployment = deployer.deploy(&params).await?;
    let mut token = deployment.host_shutdown_token();
    assert!(!token.is_cancelled());

    // Take the backend site process down out from under the proxy.
    let status = std::process::Command::new("pkill")
        .args(["-f", "server-comparison-site"])
        .status()?;
    assert!(status.success(), "no backend site process found to kill");

    tokio::time::timeout(Duration::from_secs(3), token.cancelled())
        .await
        .expect("token fires when the backend process dies");

    deployment.stop().await;
    Ok(())
}

#[tokio::test]
#[serial]
async fn readiness_failure_tears_the_deployment_down() -> anyhow::Result<()> {
    init_tracing();

    // A stand-in site binary that stays alive but never listens, so
    // readiness can only time out.
    let workdir = tempfile::tempdir()?;
    let stub = workdir.path().join("unresponsive-site");
    let pid_file = workdir.path().join("site.pid");
    std::fs::write(
        &stub,
        format!("#!/bin/sh\necho $$ > {}\nexec sleep 600\n", pid_file.display()),
    )?;
    std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755))?;

    // SAFETY: tests in this suite run serially; nothing else reads or
    // writes the process environment concurrently.
    unsafe {
        std::env::set_var("SITE_BIN", &stub);
        std::env::set_var("HARNESS_STARTUP_TIMEOUT_SECS", "1");
    }

    let params = scenario_parameters(
        ServerVariant::SelfHost,
        RuntimeFlavor::MultiThread,
        "http://localhost:5086/",
        AppEnvironment::HelloWorld,
    );
    let deployer = deployer_for(params.server_variant());
    let result = deployer.deploy(&params).await;

    unsafe {
        std::env::remove_var("SITE_BIN");
        std::env::remove_var("HARNESS_STARTUP_TIMEOUT_SECS");
    }

    let err = result.expect_err("an unresponsive site cannot become ready");
    assert!(matches!(err, DeployError::Readiness { .. }), "got {err}");

    // The failed deploy must not leave its child behind.
    let pid: u32 = std::fs::read_to_string(&pid_file)?.trim().parse()?;
    let deadline = tokio::time::Instant::now() + PORT_RELEASE_WINDOW;
    while std::path::Path::new(&format!("/proc/{pid}")).exists() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "stub site process {pid} survived the failed deploy"
        );
        sleep(PORT_RELEASE_POLL).await;
    }
    Ok(())
}
