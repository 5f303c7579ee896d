use std::{
    fs, io,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use server_comparison_core::params::{AppEnvironment, RuntimeFlavor};
use server_comparison_env as site_env;
use tracing::debug;

const DEFAULT_LISTEN: &str = "127.0.0.1:5000";

#[derive(Debug, thiserror::Error)]
pub enum SiteConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid setting {key}='{value}': {reason}")]
    InvalidSetting {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Optional settings as they appear in `config.json`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfigFile {
    pub environment: Option<String>,
    pub listen: Option<String>,
    pub runtime_flavor: Option<String>,
    pub log_filter: Option<String>,
}

impl SiteConfigFile {
    pub fn load(path: &Path) -> Result<Self, SiteConfigError> {
        let content = fs::read_to_string(path).map_err(|source| SiteConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| SiteConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }
}

/// Settings taken from process environment variables. These override the
/// config file: later sources win, and the environment is always last.
#[derive(Debug, Default)]
pub struct EnvOverrides {
    pub environment: Option<String>,
    pub listen: Option<String>,
    pub runtime_flavor: Option<String>,
    pub log_filter: Option<String>,
}

impl EnvOverrides {
    #[must_use]
    pub fn from_process_env() -> Self {
        Self {
            environment: site_env::site_environment(),
            listen: site_env::site_listen(),
            runtime_flavor: site_env::site_runtime_flavor(),
            log_filter: site_env::site_log_filter(),
        }
    }
}

/// Fully resolved site configuration.
#[derive(Clone, Debug)]
pub struct SiteConfig {
    pub environment: AppEnvironment,
    pub listen: SocketAddr,
    pub runtime_flavor: RuntimeFlavor,
    pub log_filter: Option<String>,
}

impl SiteConfig {
    /// Resolve the effective configuration: built-in defaults, then the
    /// optional JSON file, then environment variables.
    pub fn resolve(
        file_path: Option<&Path>,
        overrides: EnvOverrides,
    ) -> Result<Self, SiteConfigError> {
        let file = match file_path {
            Some(path) => {
                debug!(path = %path.display(), "loading site config file");
                SiteConfigFile::load(path)?
            }
            None => SiteConfigFile::default(),
        };
        Self::merge(file, overrides)
    }

    /// Pure merge step, environment wins over file over defaults.
    pub fn merge(file: SiteConfigFile, overrides: EnvOverrides) -> Result<Self, SiteConfigError> {
        let environment = overrides
            .environment
            .or(file.environment)
            .map_or(Ok(AppEnvironment::default()), |raw| {
                raw.parse().map_err(|err| SiteConfigError::InvalidSetting {
                    key: "environment",
                    value: raw,
                    reason: format!("{err}"),
                })
            })?;

        let listen_raw = overrides
            .listen
            .or(file.listen)
            .unwrap_or_else(|| DEFAULT_LISTEN.to_owned());
        let listen = listen_raw
            .parse::<SocketAddr>()
            .map_err(|err| SiteConfigError::InvalidSetting {
                key: "listen",
                value: listen_raw,
                reason: format!("{err}"),
            })?;

        let runtime_flavor = overrides
            .runtime_flavor
            .or(file.runtime_flavor)
            .map_or(Ok(RuntimeFlavor::default()), |raw| {
                raw.parse().map_err(|err| SiteConfigError::InvalidSetting {
                    key: "runtime_flavor",
                    value: raw,
                    reason: format!("{err}"),
                })
            })?;

        let log_filter = overrides.log_filter.or(file.log_filter);

        Ok(Self {
            environment,
            listen,
            runtime_flavor,
            log_filter,
        })
    }
}
