use std::time::Duration;

use server_comparison_env as env;

/// Default wait for a deployed target to accept its first request.
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default interval between readiness probe attempts.
pub const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default grace period before a stopping server is force-killed.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Default interval between child exit checks while stopping.
pub const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default probe retry budget.
pub const RETRY_MAX_ATTEMPTS: usize = 10;

/// Default wait between probe retries.
pub const RETRY_INTERVAL: Duration = Duration::from_millis(500);

#[must_use]
pub fn startup_timeout() -> Duration {
    env::env_duration_secs("HARNESS_STARTUP_TIMEOUT_SECS", STARTUP_TIMEOUT)
}

#[must_use]
pub fn readiness_poll_interval() -> Duration {
    env::env_duration_millis("HARNESS_READINESS_POLL_MS", READINESS_POLL_INTERVAL)
}

#[must_use]
pub fn shutdown_grace() -> Duration {
    env::env_duration_secs("HARNESS_SHUTDOWN_GRACE_SECS", SHUTDOWN_GRACE)
}

#[must_use]
pub fn retry_max_attempts() -> usize {
    env::env_usize("HARNESS_RETRY_MAX_ATTEMPTS", RETRY_MAX_ATTEMPTS)
}

#[must_use]
pub fn retry_interval() -> Duration {
    env::env_duration_millis("HARNESS_RETRY_INTERVAL_MS", RETRY_INTERVAL)
}
