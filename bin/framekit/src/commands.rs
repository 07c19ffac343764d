use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use framekit_core::{AdapterRegistry, Pipeline, PipelineConfig, validate_dataset};
use framekit_hub::{HubApi, RowsPage};
use framekit_transfer::{S3Store, TransferConfig, TransferReport, download_prefix, upload_directory};
use tracing::{info, warn};

use crate::cli::Action;
use crate::config::Config;

pub struct DownloadArgs {
    pub dataset: String,
    pub split: String,
    pub output: PathBuf,
    pub limit: Option<usize>,
    pub repo: Option<String>,
    pub metadata: bool,
}

pub async fn download(cfg: &Config, args: DownloadArgs) -> anyhow::Result<()> {
    let registry = AdapterRegistry::with_builtin();
    let Some(adapter) = registry.get(&args.dataset) else {
        bail!(
            "unknown dataset `{}` (available: {})",
            args.dataset,
            registry.names().join(", ")
        );
    };
    let repo = args
        .repo
        .or_else(|| adapter.repo_id().map(str::to_owned))
        .with_context(|| {
            format!("dataset `{}` has no default repository; pass --repo", args.dataset)
        })?;

    std::fs::create_dir_all(&args.output)
        .with_context(|| {
            format!("failed to create output directory {}", args.output.display())
        })?;

    let api = HubApi::new(cfg.hub()).context("failed to build hub client")?;
    let split = api
        .dataset(repo.as_str())
        .split(&args.split)
        .await
        .with_context(|| format!("failed to open {repo} split `{}`", args.split))?;

    let mut config = PipelineConfig::new(args.split.as_str(), &args.output).with_limit(args.limit);
    config.writer = config.writer.with_metadata(args.metadata);
    let mut pipeline = Pipeline::new(adapter, config);

    info!(
        dataset = %args.dataset,
        repo = %repo,
        split = %args.split,
        output = %args.output.display(),
        limit = ?args.limit,
        "downloading dataset"
    );

    let mut pager = split.pages(args.limit);
    while let Some(page) = pager
        .next_page()
        .await
        .with_context(|| format!("failed to fetch rows from {repo}"))?
    {
        convert_page(&mut pipeline, &page)?;
    }

    let summary = pipeline.finish();
    if summary.written == 0 {
        warn!(attempted = summary.attempted, "no tasks were written");
    }
    Ok(())
}

/// Run one page through the pipeline. Records are indexed by their position
/// in the split, so task ids continue across pages.
fn convert_page(pipeline: &mut Pipeline, page: &RowsPage) -> anyhow::Result<()> {
    for (i, record) in page.records.iter().enumerate() {
        pipeline
            .process_record(page.offset + i, record)
            .context("failed to write task")?;
    }
    Ok(())
}

pub async fn transfer(
    action: Action,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    config: TransferConfig,
) -> anyhow::Result<()> {
    // Local arguments are checked before any network call.
    let local = match action {
        Action::Upload => {
            let input = input.context("--input is required for upload")?;
            if !input.is_dir() {
                bail!("input directory {} does not exist", input.display());
            }
            input
        }
        Action::Download => output.context("--output is required for download")?,
    };

    let store = S3Store::connect(config.bucket.as_str())
        .await
        .context("S3 setup failed")?;

    info!(
        %action,
        bucket = %config.bucket,
        prefix = %config.prefix,
        local = %local.display(),
        "starting transfer"
    );
    let report = match action {
        Action::Upload => upload_directory(&store, &local, &config.prefix).await?,
        Action::Download => download_prefix(&store, &config.prefix, &local).await?,
    };
    finish_transfer(action, &report)
}

fn finish_transfer(action: Action, report: &TransferReport) -> anyhow::Result<()> {
    info!(%action, succeeded = report.succeeded, failed = report.failed.len(), "transfer complete");
    if !report.is_success() {
        for (item, error) in &report.failed {
            warn!(%item, %error, "not transferred");
        }
        bail!(
            "{action}: {} of {} files failed; re-run to retry",
            report.failed.len(),
            report.total()
        );
    }
    Ok(())
}

pub fn validate(root: &Path) -> anyhow::Result<()> {
    if !root.is_dir() {
        bail!("dataset root {} does not exist", root.display());
    }
    let report = validate_dataset(root);
    for path in &report.invalid {
        warn!(path = %path.display(), "invalid task directory");
    }
    info!(valid = report.valid.len(), invalid = report.invalid.len(), "validation finished");
    if !report.is_clean() {
        bail!("{} of {} task directories are invalid", report.invalid.len(), report.total());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_incomplete_task() {
        let dir = tempfile::tempdir().unwrap();
        let task = dir.path().join("maze_task").join("maze_0001");
        std::fs::create_dir_all(&task).unwrap();
        std::fs::write(task.join("prompt.txt"), "find the exit").unwrap();

        assert!(validate(dir.path()).is_err());
    }

    #[test]
    fn validate_accepts_empty_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate(dir.path()).is_ok());
    }

    #[test]
    fn failed_transfer_report_is_an_error() {
        let ok = TransferReport {
            succeeded: 3,
            failed: Vec::new(),
        };
        assert!(finish_transfer(Action::Upload, &ok).is_ok());

        let bad = TransferReport {
            succeeded: 2,
            failed: vec![("a.png".into(), "timeout".into())],
        };
        let err = finish_transfer(Action::Download, &bad).unwrap_err();
        assert!(err.to_string().contains("1 of 3 files failed"));
    }

    #[tokio::test]
    async fn upload_requires_existing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = transfer(
            Action::Upload,
            Some(dir.path().join("missing")),
            None,
            TransferConfig::new("bucket", ""),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        let err = transfer(Action::Download, None, None, TransferConfig::new("bucket", ""))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--output"));
    }

    #[tokio::test]
    async fn unknown_dataset_lists_available() {
        let dir = tempfile::tempdir().unwrap();
        let err = download(
            &Config::from_env(),
            DownloadArgs {
                dataset: "nope".into(),
                split: "test".into(),
                output: dir.path().to_path_buf(),
                limit: None,
                repo: None,
                metadata: false,
            },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("videothinkbench"));
    }

    #[test]
    fn page_offset_carries_into_task_ids() {
        use framekit_core::{Field, ImageInput, PixelArray, PixelData, Record};

        let frame = || {
            let pixels = PixelArray::new(&[2, 2, 3], PixelData::U8(vec![90; 12])).unwrap();
            Field::Image(ImageInput::Array(pixels))
        };
        let record = |question: &str| {
            Record::new()
                .with("image", frame())
                .with("target_image", frame())
                .with("question", question)
                .with("task_type", "maze")
        };
        let mut unreadable = record("lost");
        unreadable.insert("target_image", Field::Null);

        let dir = tempfile::tempdir().unwrap();
        let adapter = AdapterRegistry::with_builtin().get("videothinkbench").unwrap();
        let mut pipeline = Pipeline::new(adapter, PipelineConfig::new("test", dir.path()));
        let page = RowsPage {
            offset: 100,
            records: vec![record("first"), unreadable, record("third")],
            total: 250,
        };
        convert_page(&mut pipeline, &page).unwrap();

        let domain = dir.path().join("maze_task");
        assert!(domain.join("vtb_test_00100").join("prompt.txt").is_file());
        assert!(!domain.join("vtb_test_00101").exists());
        assert!(domain.join("vtb_test_00102").join("first_frame.png").is_file());

        let summary = pipeline.finish();
        assert_eq!(summary.written, 2);
        assert_eq!(summary.skipped, 1);
    }
}
