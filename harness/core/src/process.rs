use std::{process::Child, time::Duration};

use tokio::time;
use tracing::debug;

use crate::timeouts::EXIT_POLL_INTERVAL;

/// Check if a child process is still running.
pub fn is_running(child: &mut Child) -> bool {
    match child.try_wait() {
        Ok(None) => true,
        Ok(Some(_)) | Err(_) => false,
    }
}

/// Best-effort termination of a child process.
pub fn kill_child(child: &mut Child) {
    debug!("killing child process");
    let _ = child.kill();
    let _ = child.wait();
}

/// Returns true if the process exited within the timeout, false otherwise.
pub async fn wait_for_exit(child: &mut Child, timeout: Duration) -> bool {
    time::timeout(timeout, async {
        loop {
            if !is_running(child) {
                return;
            }
            time::sleep(EXIT_POLL_INTERVAL).await;
        }
    })
    .await
    .is_ok()
}
