//! Hello-world parity matrix across server variants and runtime flavors.
//! Uses ports ranging 5061 - 5066.

use serial_test::serial;
use server_comparison_core::{
    RetryPolicy,
    params::{AppEnvironment, RuntimeFlavor, ServerVariant},
    retry_request,
};
use server_comparison_deployers::deployer_for;
use tests_functional::{architecture_supported, assert_body, init_tracing, scenario_parameters};
use tracing::info;

async fn hello_world(
    variant: ServerVariant,
    flavor: RuntimeFlavor,
    base_url: &str,
) -> anyhow::Result<()> {
    init_tracing();

    let params = scenario_parameters(variant, flavor, base_url, AppEnvironment::HelloWorld);
    if !architecture_supported(params.architecture()) {
        info!(scenario = %params.scenario_label(), "architecture not runnable on this host; skipping");
        return Ok(());
    }

    info!(scenario = %params.scenario_label(), "running hello-world scenario");

    let deployer = deployer_for(params.server_variant());
    let mut deployment = deployer.deploy(&params).await?;

    let client = reqwest::Client::new();
    let base = deployment.application_base_url().clone();
    let response = retry_request(
        || client.get(base.clone()).send(),
        deployment.host_shutdown_token(),
        RetryPolicy::suite_default(),
    )
    .await?;

    // The handle force-kills on drop, so an assertion failure still tears
    // the server down before the next fixed-port test runs.
    assert_body(response, "Hello World").await;

    deployment.stop().await;
    Ok(())
}

#[tokio::test]
#[serial]
async fn hello_world_in_process_multi_thread() -> anyhow::Result<()> {
    hello_world(
        ServerVariant::InProcess,
        RuntimeFlavor::MultiThread,
        "http://localhost:5061/",
    )
    .await
}

#[tokio::test]
#[serial]
async fn hello_world_in_process_current_thread() -> anyhow::Result<()> {
    hello_world(
        ServerVariant::InProcess,
        RuntimeFlavor::CurrentThread,
        "http://localhost:5062/",
    )
    .await
}

#[tokio::test]
#[serial]
#[ignore = "requires the site binary (cargo build -p server-comparison-site)"]
async fn hello_world_self_host_multi_thread() -> anyhow::Result<()> {
    hello_world(
        ServerVariant::SelfHost,
        RuntimeFlavor::MultiThread,
        "http://localhost:5063/",
    )
    .await
}

#[tokio::test]
#[serial]
#[ignore = "requires the site binary (cargo build -p server-comparison-site)"]
async fn hello_world_self_host_current_thread() -> anyhow::Result<()> {
    hello_world(
        ServerVariant::SelfHost,
        RuntimeFlavor::CurrentThread,
        "http://localhost:5064/",
    )
    .await
}

#[tokio::test]
#[serial]
#[ignore = "requires the site binary (cargo build -p server-comparison-site)"]
async fn hello_world_reverse_proxy_multi_thread() -> anyhow::Result<()> {
    hello_world(
        ServerVariant::ReverseProxy,
        RuntimeFlavor::MultiThread,
        "http://localhost:5065/",
    )
    .await
}

#[tokio::test]
#[serial]
#[ignore = "requires the site binary (cargo build -p server-comparison-site)"]
async fn hello_world_reverse_proxy_current_thread() -> anyhow::Result<()> {
    hello_world(
        ServerVariant::ReverseProxy,
        RuntimeFlavor::CurrentThread,
        "http://localhost:5066/",
    )
    .await
}
