// redis-s3-backup/src/backup/db_dump.rs
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::RedisConfig;
use crate::errors::SnapshotError;
use crate::utils::find_redis_cli_executable;

/// Produces a point-in-time snapshot of the database at a local path.
#[async_trait]
pub trait SnapshotProducer: Send + Sync {
    async fn produce(&self, destination: &Path) -> Result<(), SnapshotError>;
}

/// Dumps Redis through `redis-cli --rdb`.
#[derive(Debug, Clone)]
pub struct RedisCliProducer {
    program: PathBuf,
    redis: RedisConfig,
}

impl RedisCliProducer {
    pub fn new(program: PathBuf, redis: RedisConfig) -> Self {
        Self { program, redis }
    }

    /// Uses whatever `redis-cli` is on `PATH`.
    pub fn from_config(redis: &RedisConfig) -> Self {
        Self::new(find_redis_cli_executable(), redis.clone())
    }

    /// Arguments passed to `redis-cli`. `-a` is only present when a password is configured.
    pub fn command_args(&self, destination: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-h".into(),
            self.redis.host.clone().into(),
            "-p".into(),
            self.redis.port.to_string().into(),
        ];
        if let Some(password) = &self.redis.password {
            args.push("-a".into());
            args.push(password.clone().into());
        }
        args.push("--rdb".into());
        args.push(destination.as_os_str().to_owned());
        args
    }
}

#[async_trait]
impl SnapshotProducer for RedisCliProducer {
    async fn produce(&self, destination: &Path) -> Result<(), SnapshotError> {
        if tokio::fs::try_exists(destination).await.unwrap_or(false) {
            return Err(SnapshotError::DestinationExists(destination.to_path_buf()));
        }

        info!(
            host = %self.redis.host,
            port = self.redis.port,
            "Creating Redis backup from {}:{}",
            self.redis.host,
            self.redis.port
        );

        let output = Command::new(&self.program)
            .args(self.command_args(destination))
            .output()
            .await
            .map_err(|source| SnapshotError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(SnapshotError::Command {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        debug!(stdout = %String::from_utf8_lossy(&output.stdout).trim(), "redis-cli finished");

        if !tokio::fs::try_exists(destination).await.unwrap_or(false) {
            return Err(SnapshotError::MissingOutput(destination.to_path_buf()));
        }

        info!(path = %destination.display(), "Redis dump written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn producer(password: Option<&str>) -> RedisCliProducer {
        RedisCliProducer::new(
            PathBuf::from("redis-cli"),
            RedisConfig {
                host: "db1".to_string(),
                port: 6380,
                password: password.map(str::to_string),
            },
        )
    }

    #[test]
    fn test_command_omits_auth_without_password() {
        let args = producer(None).command_args(Path::new("/tmp/dump-20240102-030405.rdb"));

        let expected: Vec<OsString> = ["-h", "db1", "-p", "6380", "--rdb", "/tmp/dump-20240102-030405.rdb"]
            .iter()
            .map(OsString::from)
            .collect();
        assert_eq!(args, expected);
        assert!(!args.iter().any(|a| a == "-a"));
    }

    #[test]
    fn test_command_includes_auth_with_password() {
        let args = producer(Some("s3cret")).command_args(Path::new("/tmp/out.rdb"));

        let expected: Vec<OsString> = ["-h", "db1", "-p", "6380", "-a", "s3cret", "--rdb", "/tmp/out.rdb"]
            .iter()
            .map(OsString::from)
            .collect();
        assert_eq!(args, expected);
    }

    #[tokio::test]
    async fn test_existing_destination_is_refused() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let destination = dir.path().join("dump.rdb");
        std::fs::write(&destination, b"old")?;

        let result = producer(None).produce(&destination).await;

        assert!(matches!(result, Err(SnapshotError::DestinationExists(_))));
        assert_eq!(std::fs::read(&destination)?, b"old");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_program_is_a_spawn_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let producer = RedisCliProducer::new(
            dir.path().join("no-such-redis-cli"),
            RedisConfig { host: "localhost".to_string(), port: 6379, password: None },
        );

        let result = producer.produce(&dir.path().join("dump.rdb")).await;

        assert!(matches!(result, Err(SnapshotError::Spawn { .. })));
        Ok(())
    }
}
