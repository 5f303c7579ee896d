use std::{fmt, path::PathBuf, str::FromStr};

use url::Url;

/// Hosting backend the sample application is deployed behind.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ServerVariant {
    /// The site binary spawned as an external process, listening directly.
    SelfHost,
    /// The site served from a listener task inside the test process.
    InProcess,
    /// A self-hosted site fronted by an in-process reverse proxy.
    ReverseProxy,
}

impl ServerVariant {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SelfHost => "self-host",
            Self::InProcess => "in-process",
            Self::ReverseProxy => "reverse-proxy",
        }
    }
}

impl fmt::Display for ServerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Runtime flavor the deployed site runs under.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum RuntimeFlavor {
    #[default]
    MultiThread,
    CurrentThread,
}

impl RuntimeFlavor {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MultiThread => "multi-thread",
            Self::CurrentThread => "current-thread",
        }
    }
}

impl fmt::Display for RuntimeFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RuntimeFlavor {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multi-thread" => Ok(Self::MultiThread),
            "current-thread" => Ok(Self::CurrentThread),
            other => Err(UnknownName {
                kind: "runtime flavor",
                value: other.to_owned(),
            }),
        }
    }
}

/// Pointer width of the deployed target.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RuntimeArchitecture {
    X86,
    X64,
}

impl RuntimeArchitecture {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X64 => "x64",
        }
    }

    /// Architecture of the machine running the tests.
    #[must_use]
    pub const fn host() -> Self {
        if cfg!(target_pointer_width = "64") {
            Self::X64
        } else {
            Self::X86
        }
    }
}

impl fmt::Display for RuntimeArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Named application configuration selecting the middleware chain the site
/// serves. A closed set instead of runtime class-name resolution: deployers
/// pass the name through `SITE_ENVIRONMENT` and the site maps it back.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum AppEnvironment {
    #[default]
    HelloWorld,
    NtlmAuthentication,
}

impl AppEnvironment {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::HelloWorld => "HelloWorld",
            Self::NtlmAuthentication => "NtlmAuthentication",
        }
    }
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AppEnvironment {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HelloWorld" => Ok(Self::HelloWorld),
            "NtlmAuthentication" => Ok(Self::NtlmAuthentication),
            other => Err(UnknownName {
                kind: "application environment",
                value: other.to_owned(),
            }),
        }
    }
}

/// Error for names outside the closed enum sets above.
#[derive(Clone, Debug, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownName {
    kind: &'static str,
    value: String,
}

/// Everything a deployer needs to launch one site instance. Immutable once
/// constructed; one value fully determines one deployment.
#[derive(Clone, Debug)]
pub struct DeploymentParameters {
    application_path: PathBuf,
    server_variant: ServerVariant,
    runtime_flavor: RuntimeFlavor,
    architecture: RuntimeArchitecture,
    application_base_uri_hint: Url,
    environment_name: AppEnvironment,
}

impl DeploymentParameters {
    #[must_use]
    pub fn new(
        application_path: PathBuf,
        server_variant: ServerVariant,
        runtime_flavor: RuntimeFlavor,
        architecture: RuntimeArchitecture,
        application_base_uri_hint: Url,
        environment_name: AppEnvironment,
    ) -> Self {
        Self {
            application_path,
            server_variant,
            runtime_flavor,
            architecture,
            application_base_uri_hint,
            environment_name,
        }
    }

    #[must_use]
    pub fn application_path(&self) -> &PathBuf {
        &self.application_path
    }

    #[must_use]
    pub const fn server_variant(&self) -> ServerVariant {
        self.server_variant
    }

    #[must_use]
    pub const fn runtime_flavor(&self) -> RuntimeFlavor {
        self.runtime_flavor
    }

    #[must_use]
    pub const fn architecture(&self) -> RuntimeArchitecture {
        self.architecture
    }

    #[must_use]
    pub const fn application_base_uri_hint(&self) -> &Url {
        &self.application_base_uri_hint
    }

    #[must_use]
    pub const fn environment_name(&self) -> AppEnvironment {
        self.environment_name
    }

    /// Label used to scope per-scenario logging.
    #[must_use]
    pub fn scenario_label(&self) -> String {
        format!(
            "{}:{}:{}",
            self.server_variant, self.runtime_flavor, self.architecture
        )
    }
}
