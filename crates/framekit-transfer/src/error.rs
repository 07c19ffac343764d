use std::path::PathBuf;

use thiserror::Error;

/// Errors that can be returned by framekit-transfer operations.
#[derive(Debug, Error)]
pub enum TransferError {
    /// No credentials could be resolved from the AWS config chain.
    #[error("no AWS credentials found: {message}")]
    MissingCredentials { message: String },

    /// No region is configured (`AWS_REGION`, profile, ...).
    #[error("no AWS region configured; set AWS_REGION or a profile region")]
    MissingRegion,

    /// `HeadBucket` rejected the bucket: absent, forbidden or unreachable.
    #[error("bucket `{bucket}` is not reachable: {message}")]
    BucketUnreachable { bucket: String, message: String },

    /// A single object-store call failed.
    #[error("{message}")]
    Store {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The object does not exist.
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// A local filesystem operation failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A local path or remote key has no counterpart on the other side.
    #[error("cannot map {item}: {reason}")]
    UnmappablePath { item: String, reason: String },

    /// The local root of an upload does not exist or is not a directory.
    #[error("local root {} does not exist or is not a directory", .0.display())]
    LocalRootMissing(PathBuf),
}

impl TransferError {
    pub(crate) fn unmappable(item: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnmappablePath {
            item: item.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
