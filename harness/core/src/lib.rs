pub mod binary;
pub mod deployer;
pub mod deployment;
pub mod net;
pub mod params;
pub mod process;
pub mod readiness;
pub mod retry;
pub mod shutdown;
pub mod timeouts;

use std::{env, ops::Mul as _, sync::LazyLock, time::Duration};

pub use deployer::ApplicationDeployer;
pub use deployment::{DeployError, Deployment, DeploymentState, ServerHandle};
pub use params::{
    AppEnvironment, DeploymentParameters, RuntimeArchitecture, RuntimeFlavor, ServerVariant,
};
pub use readiness::{ReadinessError, wait_for_http_ready};
pub use retry::{RetryError, RetryPolicy, retry_request};
pub use shutdown::{ShutdownSignal, ShutdownToken};

static IS_SLOW_TEST_ENV: LazyLock<bool> =
    LazyLock::new(|| env::var("SLOW_TEST_ENV").is_ok_and(|s| s == "true"));

/// In slow test environments like shared CI runners, use 2x timeout.
#[must_use]
pub fn adjust_timeout(d: Duration) -> Duration {
    if *IS_SLOW_TEST_ENV { d.mul(2) } else { d }
}
