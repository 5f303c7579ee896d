use std::{env, path::PathBuf};

use server_comparison_env as harness_env;
use tracing::{debug, info};

/// Name of the site binary the process-backed deployers spawn.
pub const SITE_BINARY_NAME: &str = "server-comparison-site";

const TARGET_DEBUG_SUBPATH: &str = "target/debug";

pub struct BinaryResolver;

impl BinaryResolver {
    /// Locate the site binary: `SITE_BIN` override first, then `PATH`, then
    /// the workspace debug target dir.
    #[must_use]
    pub fn resolve_site_binary() -> PathBuf {
        if let Some(path) = harness_env::site_bin_override() {
            info!(path = %path.display(), "resolved site binary from SITE_BIN");
            return path;
        }
        if let Some(path) = Self::which_on_path(SITE_BINARY_NAME) {
            info!(path = %path.display(), "resolved site binary from PATH");
            return path;
        }
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../");
        let fallback = root.join(TARGET_DEBUG_SUBPATH).join(SITE_BINARY_NAME);

        debug!(path = %fallback.display(), "falling back to workspace target dir");
        fallback
    }

    fn which_on_path(bin: &str) -> Option<PathBuf> {
        let path_env = env::var_os("PATH")?;
        env::split_paths(&path_env)
            .map(|p| p.join(bin))
            .find(|candidate| candidate.is_file())
    }
}
