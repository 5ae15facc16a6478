// redis-s3-backup/src/config/mod.rs
use anyhow::{Context, Result};
use envconfig::Envconfig;
use std::path::PathBuf;
use tracing::warn;
use url::Url;

// Raw environment record, read once at startup.
#[derive(Envconfig, Debug, Clone)]
pub struct EnvConfig {
    #[envconfig(from = "REDIS_HOST", default = "localhost")]
    pub redis_host: String,

    #[envconfig(from = "REDIS_PORT", default = "6379")]
    pub redis_port: String,

    #[envconfig(from = "REDIS_PASSWORD")]
    pub redis_password: Option<String>,

    #[envconfig(from = "S3_BUCKET")]
    pub s3_bucket: Option<String>,

    #[envconfig(from = "S3_PREFIX", default = "redis-backups")]
    pub s3_prefix: String,

    #[envconfig(from = "CRON_SCHEDULE", default = "0 * * * *")]
    pub cron_schedule: String,

    #[envconfig(from = "S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    #[envconfig(from = "S3_ACCESS_KEY")]
    pub s3_access_key: Option<String>,

    #[envconfig(from = "S3_SECRET_KEY")]
    pub s3_secret_key: Option<String>,

    #[envconfig(from = "S3_REGION", default = "us-east-1")]
    pub s3_region: String,

    #[envconfig(from = "BACKUP_DUMP_DIR")]
    pub dump_dir: Option<PathBuf>,
}

// Application's internal configuration structs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Destination bucket. Uploads fail while this is unset.
    pub bucket_name: Option<String>,
    pub folder_prefix: String,
    pub endpoint_url: Option<String>,
    pub region: String,
    /// `None` means the SDK's default credential chain.
    pub credentials: Option<StorageCredentials>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub redis: RedisConfig,
    pub storage: StorageConfig,
    /// Recurrence expression exactly as configured.
    pub cron_schedule: String,
    pub dump_dir: PathBuf,
}

impl AppConfig {
    /// Loads `.env` (if present) and builds the configuration from the process environment.
    pub fn load_from_env() -> Result<Self> {
        if let Err(e) = dotenv::dotenv() {
            if !e.not_found() {
                return Err(anyhow::anyhow!("Failed to load .env file: {}", e));
            }
        }
        let raw = EnvConfig::init_from_env().context("Failed to read configuration from environment")?;
        Self::from_raw(raw)
    }

    /// Same as `load_from_env`, but reads from an explicit map instead of the process environment.
    #[cfg(test)]
    pub fn load_from_map(vars: &std::collections::HashMap<String, String>) -> Result<Self> {
        let raw = EnvConfig::init_from_hashmap(vars).context("Failed to read configuration from map")?;
        Self::from_raw(raw)
    }

    pub fn from_raw(raw: EnvConfig) -> Result<Self> {
        let port: u16 = raw
            .redis_port
            .trim()
            .parse()
            .with_context(|| format!("REDIS_PORT must be a port number, got '{}'", raw.redis_port))?;

        let endpoint_url = match non_empty(raw.s3_endpoint) {
            Some(endpoint) => {
                Url::parse(&endpoint).with_context(|| format!("S3_ENDPOINT is not a valid URL: {}", endpoint))?;
                Some(endpoint)
            }
            None => None,
        };

        let credentials = match (non_empty(raw.s3_access_key), non_empty(raw.s3_secret_key)) {
            (Some(access_key_id), Some(secret_access_key)) => Some(StorageCredentials {
                access_key_id,
                secret_access_key,
            }),
            (None, None) => None,
            _ => {
                warn!("Only one of S3_ACCESS_KEY / S3_SECRET_KEY is set; falling back to the default credential chain");
                None
            }
        };

        let dump_dir = raw.dump_dir.unwrap_or_else(std::env::temp_dir);
        if dump_dir.to_string_lossy().is_empty() {
            return Err(anyhow::anyhow!("BACKUP_DUMP_DIR cannot be empty."));
        }

        Ok(AppConfig {
            redis: RedisConfig {
                host: raw.redis_host,
                port,
                password: non_empty(raw.redis_password),
            },
            storage: StorageConfig {
                bucket_name: non_empty(raw.s3_bucket),
                folder_prefix: raw.s3_prefix,
                endpoint_url,
                region: raw.s3_region,
                credentials,
            },
            cron_schedule: raw.cron_schedule,
            dump_dir,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() -> anyhow::Result<()> {
        let config = AppConfig::load_from_map(&HashMap::new())?;

        assert_eq!(config.redis.host, "localhost");
        assert_eq!(config.redis.port, 6379);
        assert_eq!(config.redis.password, None);
        assert_eq!(config.storage.bucket_name, None);
        assert_eq!(config.storage.folder_prefix, "redis-backups");
        assert_eq!(config.storage.region, "us-east-1");
        assert_eq!(config.storage.endpoint_url, None);
        assert_eq!(config.storage.credentials, None);
        assert_eq!(config.cron_schedule, "0 * * * *");
        assert_eq!(config.dump_dir, std::env::temp_dir());
        Ok(())
    }

    #[test]
    fn test_full_environment() -> anyhow::Result<()> {
        let config = AppConfig::load_from_map(&vars(&[
            ("REDIS_HOST", "db1"),
            ("REDIS_PORT", "6380"),
            ("REDIS_PASSWORD", "hunter2"),
            ("S3_BUCKET", "backups"),
            ("S3_PREFIX", "prod/redis/"),
            ("CRON_SCHEDULE", "0 0 * * *"),
            ("S3_ENDPOINT", "http://minio:9000"),
            ("S3_ACCESS_KEY", "AKIA"),
            ("S3_SECRET_KEY", "secret"),
            ("S3_REGION", "eu-west-1"),
            ("BACKUP_DUMP_DIR", "/var/lib/redis-backup"),
        ]))?;

        assert_eq!(
            config.redis,
            RedisConfig { host: "db1".to_string(), port: 6380, password: Some("hunter2".to_string()) }
        );
        assert_eq!(config.storage.bucket_name.as_deref(), Some("backups"));
        assert_eq!(config.storage.folder_prefix, "prod/redis/");
        assert_eq!(config.storage.endpoint_url.as_deref(), Some("http://minio:9000"));
        assert_eq!(config.storage.region, "eu-west-1");
        assert_eq!(
            config.storage.credentials,
            Some(StorageCredentials { access_key_id: "AKIA".to_string(), secret_access_key: "secret".to_string() })
        );
        assert_eq!(config.cron_schedule, "0 0 * * *");
        assert_eq!(config.dump_dir, PathBuf::from("/var/lib/redis-backup"));
        Ok(())
    }

    #[test]
    fn test_empty_password_is_treated_as_unset() -> anyhow::Result<()> {
        let config = AppConfig::load_from_map(&vars(&[("REDIS_PASSWORD", "")]))?;
        assert_eq!(config.redis.password, None);
        Ok(())
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = AppConfig::load_from_map(&vars(&[("REDIS_PORT", "redis")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let result = AppConfig::load_from_map(&vars(&[("S3_ENDPOINT", "not a url")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_half_credentials_fall_back_to_default_chain() -> anyhow::Result<()> {
        let config = AppConfig::load_from_map(&vars(&[("S3_ACCESS_KEY", "AKIA")]))?;
        assert_eq!(config.storage.credentials, None);
        Ok(())
    }
}
