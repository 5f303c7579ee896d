use std::{env, path::PathBuf, time::Duration};

#[must_use]
pub fn slow_test_env() -> bool {
    env::var("SLOW_TEST_ENV").is_ok_and(|s| s == "true")
}

#[must_use]
pub fn site_bin_override() -> Option<PathBuf> {
    env::var_os("SITE_BIN").map(PathBuf::from)
}

#[must_use]
pub fn site_config_path() -> Option<PathBuf> {
    env::var_os("SITE_CONFIG").map(PathBuf::from)
}

#[must_use]
pub fn site_environment() -> Option<String> {
    env::var("SITE_ENVIRONMENT").ok()
}

#[must_use]
pub fn site_listen() -> Option<String> {
    env::var("SITE_LISTEN").ok()
}

#[must_use]
pub fn site_runtime_flavor() -> Option<String> {
    env::var("SITE_RUNTIME_FLAVOR").ok()
}

#[must_use]
pub fn site_log_filter() -> Option<String> {
    env::var("SITE_LOG_FILTER").ok()
}

#[must_use]
pub fn harness_keep_workdirs() -> bool {
    env::var("HARNESS_KEEP_WORKDIRS").is_ok()
}

#[must_use]
pub fn rust_log() -> Option<String> {
    env::var("RUST_LOG").ok()
}

/// Parse a duration override given in whole seconds.
#[must_use]
pub fn env_duration_secs(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

/// Parse a duration override given in milliseconds.
#[must_use]
pub fn env_duration_millis(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

/// Parse a numeric override such as a retry budget.
#[must_use]
pub fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}
