#![allow(clippy::result_large_err)] // Storage path parsing returns AppError so callers see the RG-PATH code.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage backend named by a URI prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageService {
    Gcs,
    Http,
    Https,
    Minio,
    S3,
    Volume,
}

impl StorageService {
    const ALL: [StorageService; 6] = [
        StorageService::Gcs,
        StorageService::Http,
        StorageService::Https,
        StorageService::Minio,
        StorageService::S3,
        StorageService::Volume,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            StorageService::Gcs => "gs://",
            StorageService::Http => "http://",
            StorageService::Https => "https://",
            StorageService::Minio => "minio://",
            StorageService::S3 => "s3://",
            StorageService::Volume => "volume://",
        }
    }
}

/// Normalized `(source, bucket, key)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoragePath {
    pub source: StorageService,
    pub bucket: String,
    pub key: String,
}

impl StoragePath {
    /// Parse a storage URI. Unknown schemes fail with `RG-PATH-001`.
    pub fn parse(path: &str) -> Result<Self, AppError> {
        for source in StorageService::ALL {
            if let Some(rest) = path.strip_prefix(source.prefix()) {
                let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
                return Ok(StoragePath {
                    source,
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                });
            }
        }
        let mut error = AppError::new(
            ErrorCategory::ValidationError,
            format!("unsupported storage path: {}", path),
        )
        .with_code("RG-PATH-001");
        error.add_context("path", path);
        Err(error)
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.source.prefix(), self.bucket)?;
        if !self.key.is_empty() {
            write!(f, "/{}", self.key)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for StoragePath {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        StoragePath::parse(value)
    }
}
