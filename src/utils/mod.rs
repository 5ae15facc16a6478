use std::path::PathBuf;
use tracing::{debug, warn};
use which::which;

/// Finds the redis-cli executable in the system PATH.
///
/// Falls back to the bare name when it cannot be found, so each cycle reports the spawn
/// failure instead of the service refusing to start.
pub fn find_redis_cli_executable() -> PathBuf {
    match which("redis-cli") {
        Ok(path) => {
            debug!("Found redis-cli executable at: {}", path.display());
            path
        }
        Err(e) => {
            warn!("redis-cli executable not found in PATH ({}). Please ensure Redis client tools are installed; backups will fail until then.", e);
            PathBuf::from("redis-cli")
        }
    }
}
