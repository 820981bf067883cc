use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::SizeError;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_PARTITION_KEY: &str = "task_id";
pub const DEFAULT_TIMEOUT_SECS: u64 = 25;
pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_PRESIGN_EXPIRY_SECS: u64 = 3600;
pub const DEFAULT_MOCK_STORAGE_FILE: &str = "mocks/storage.json";

/// Table names injected through the environment. Empty values count as absent.
#[derive(Debug, Clone, Default)]
pub struct TableNames {
    pub video_task: Option<String>,
    pub video_frame: Option<String>,
    pub video_shot: Option<String>,
    pub video_transcription: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bucket: Option<String>,
    pub region: String,
    pub tables: TableNames,
    pub partition_key: String,
    pub timeout: Duration,
    pub concurrency: usize,
    pub presign_expiry: Duration,
    pub mock_storage: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bucket: None,
            region: DEFAULT_REGION.to_string(),
            tables: TableNames::default(),
            partition_key: DEFAULT_PARTITION_KEY.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            presign_expiry: Duration::from_secs(DEFAULT_PRESIGN_EXPIRY_SECS),
            mock_storage: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let mock_storage = std::env::var("MOCK_MODE")
            .is_ok()
            .then(|| PathBuf::from(env_or("MOCK_STORAGE_FILE", DEFAULT_MOCK_STORAGE_FILE)));

        Self {
            bucket: env_opt("S3_BUCKET"),
            region: env_or("AWS_REGION", DEFAULT_REGION),
            tables: TableNames {
                video_task: env_opt("DYNAMO_VIDEO_TASK_TABLE"),
                video_frame: env_opt("DYNAMO_VIDEO_FRAME_TABLE"),
                video_shot: env_opt("DYNAMO_VIDEO_SHOT_TABLE"),
                video_transcription: env_opt("DYNAMO_VIDEO_TRANS_TABLE"),
            },
            partition_key: env_or("DYNAMO_PARTITION_KEY", DEFAULT_PARTITION_KEY),
            timeout: Duration::from_secs(env_parse("DATA_SIZE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)),
            concurrency: env_parse("DATA_SIZE_CONCURRENCY", DEFAULT_CONCURRENCY).max(1),
            presign_expiry: Duration::from_secs(env_parse(
                "S3_PRESIGNED_URL_EXPIRY_S",
                DEFAULT_PRESIGN_EXPIRY_SECS,
            )),
            mock_storage,
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// The artifact bucket, or `MissingStorageConfig` when it was never configured.
    pub fn bucket(&self) -> Result<&str, SizeError> {
        self.bucket
            .as_deref()
            .filter(|b| !b.is_empty())
            .ok_or(SizeError::MissingStorageConfig)
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => parse_or(key, &raw, default),
        Err(_) => default,
    }
}

fn parse_or<T: FromStr + Copy>(key: &str, raw: &str, default: T) -> T {
    raw.trim().parse().unwrap_or_else(|_| {
        warn!(key, value = raw, "ignoring unparsable setting");
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_bucket_is_a_storage_config_error() {
        let settings = Settings::default();
        assert!(matches!(
            settings.bucket(),
            Err(SizeError::MissingStorageConfig)
        ));
    }

    #[test]
    fn empty_bucket_is_treated_as_missing() {
        let settings = Settings::default().with_bucket("");
        assert!(settings.bucket().is_err());
    }

    #[test]
    fn configured_bucket_is_returned() {
        let settings = Settings::default().with_bucket("artifacts");
        assert_eq!(settings.bucket().unwrap(), "artifacts");
    }

    #[test]
    fn parse_or_falls_back_on_garbage() {
        assert_eq!(parse_or("N", "12", 3u64), 12);
        assert_eq!(parse_or("N", " 7 ", 3u64), 7);
        assert_eq!(parse_or("N", "seven", 3u64), 3);
    }
}
