//! Shared helpers for the server-comparison functional suite.
//!
//! Each scenario is identified by a (variant, flavor, architecture, base
//! URL) tuple and runs the same flow: build parameters, deploy, probe with
//! retry, assert, release the handle. Fixed ports are reused across tests,
//! so suites are serialized with `serial_test`.

use std::{path::PathBuf, sync::Once};

use reqwest::Response;
use server_comparison_core::params::{
    AppEnvironment, DeploymentParameters, RuntimeArchitecture, RuntimeFlavor, ServerVariant,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Install the test subscriber once per test binary.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Location of the site application sources, used as the working directory
/// for process-backed deployments.
#[must_use]
pub fn application_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../site")
}

/// Build deployment parameters for one scenario on the host architecture.
#[must_use]
pub fn scenario_parameters(
    variant: ServerVariant,
    flavor: RuntimeFlavor,
    base_url: &str,
    environment: AppEnvironment,
) -> DeploymentParameters {
    DeploymentParameters::new(
        application_path(),
        variant,
        flavor,
        RuntimeArchitecture::host(),
        Url::parse(base_url).expect("scenario base URL is valid"),
        environment,
    )
}

/// Declarative applicability gate: scenarios pinned to an architecture the
/// host cannot run are skipped before any deployment happens.
#[must_use]
pub fn architecture_supported(architecture: RuntimeArchitecture) -> bool {
    architecture == RuntimeArchitecture::host()
}

/// Assert the response body, logging status, headers, and raw body first
/// when it mismatches so failures are diagnosable without a rerun.
pub async fn assert_body(response: Response, expected: &str) {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.expect("response body is readable");
    if body != expected {
        warn!(%status, ?headers, body, "unexpected response body");
        panic!("expected body {expected:?}, got {body:?}");
    }
}
