use std::path::Path;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::TransferError;
use crate::keys::{content_type, normalize_prefix, object_key, relative_path};
use crate::store::ObjectStore;

const PROGRESS_EVERY: usize = 10;

/// Bucket and key prefix of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    pub bucket: String,
    pub prefix: String,
}

impl TransferConfig {
    pub fn new(bucket: impl Into<String>, prefix: impl AsRef<str>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: normalize_prefix(prefix.as_ref()),
        }
    }
}

/// Outcome of a batch transfer. Failures carry the path or key and the
/// error message.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub succeeded: usize,
    pub failed: Vec<(String, String)>,
}

impl TransferReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    fn record_failure(&mut self, item: impl Into<String>, err: &TransferError) {
        let item = item.into();
        warn!(item = %item, error = %err, "transfer failed");
        self.failed.push((item, err.to_string()));
    }

    fn record_success(&mut self) {
        self.succeeded += 1;
        if self.succeeded % PROGRESS_EVERY == 0 {
            info!(done = self.succeeded, "transferred {} files", self.succeeded);
        }
    }
}

/// Upload every regular file under `root` to `prefix`, in sorted path order.
///
/// A missing root is an error. Per-file failures, including files whose path
/// cannot become a key, are collected in the report and the batch continues.
pub async fn upload_directory(
    store: &dyn ObjectStore,
    root: &Path,
    prefix: &str,
) -> Result<TransferReport, TransferError> {
    if !root.is_dir() {
        return Err(TransferError::LocalRootMissing(root.to_path_buf()));
    }
    let prefix = normalize_prefix(prefix);
    let mut report = TransferReport::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                let io = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                report.record_failure(path.display().to_string(), &TransferError::io(path, io));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let key = match path.strip_prefix(root) {
            Ok(rel) => object_key(&prefix, rel),
            Err(_) => Err(TransferError::unmappable(
                path.display().to_string(),
                "path is outside the local root",
            )),
        };
        let key = match key {
            Ok(key) => key,
            Err(e) => {
                report.record_failure(path.display().to_string(), &e);
                continue;
            }
        };

        match upload_file(store, path, &key).await {
            Ok(()) => report.record_success(),
            Err(e) => report.record_failure(path.display().to_string(), &e),
        }
    }

    info!(
        uploaded = report.succeeded,
        failed = report.failed.len(),
        prefix = %prefix,
        "upload finished"
    );
    Ok(report)
}

async fn upload_file(
    store: &dyn ObjectStore,
    path: &Path,
    key: &str,
) -> Result<(), TransferError> {
    let body = tokio::fs::read(path)
        .await
        .map_err(|e| TransferError::io(path, e))?;
    debug!(path = %path.display(), key, bytes = body.len(), "uploading");
    store.put_object(key, body, content_type(path)).await
}

/// Download every object under `prefix` into `root`, recreating the relative
/// layout. `root` is created when absent.
///
/// Listing failures abort. Directory markers are skipped. Per-object
/// failures, including keys with no safe local path, are collected and the
/// batch continues.
pub async fn download_prefix(
    store: &dyn ObjectStore,
    prefix: &str,
    root: &Path,
) -> Result<TransferReport, TransferError> {
    tokio::fs::create_dir_all(root)
        .await
        .map_err(|e| TransferError::io(root, e))?;
    let prefix = normalize_prefix(prefix);
    let keys = store.list_keys(&prefix).await?;
    info!(count = keys.len(), prefix = %prefix, "listed remote objects");

    let mut report = TransferReport::default();
    for key in keys {
        let relative = match relative_path(&prefix, &key) {
            Ok(Some(relative)) => relative,
            Ok(None) => {
                debug!(key = %key, "skipping directory marker");
                continue;
            }
            Err(e) => {
                report.record_failure(key, &e);
                continue;
            }
        };
        let target = root.join(relative);
        match download_object(store, &key, &target).await {
            Ok(()) => report.record_success(),
            Err(e) => report.record_failure(key, &e),
        }
    }

    info!(
        downloaded = report.succeeded,
        failed = report.failed.len(),
        root = %root.display(),
        "download finished"
    );
    Ok(report)
}

async fn download_object(
    store: &dyn ObjectStore,
    key: &str,
    target: &Path,
) -> Result<(), TransferError> {
    let body = store.get_object(key).await?;
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| TransferError::io(parent, e))?;
    }
    debug!(key, path = %target.display(), bytes = body.len(), "writing");
    tokio::fs::write(target, body)
        .await
        .map_err(|e| TransferError::io(target, e))
}
