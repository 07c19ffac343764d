//! Record → task → disk, one record at a time.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::adapter::{DatasetAdapter, Skip};
use crate::error::WriteError;
use crate::record::Record;
use crate::writer::{TaskWriter, WriterConfig};

/// Knobs for one conversion run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub split: String,
    /// Maximum number of records to process, `None` for all.
    pub limit: Option<usize>,
    pub writer: WriterConfig,
}

impl PipelineConfig {
    pub fn new(split: impl Into<String>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            split: split.into(),
            limit: None,
            writer: WriterConfig::new(output_root),
        }
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// What happened to a single record.
#[derive(Debug)]
pub enum Outcome {
    Written(PathBuf),
    Skipped(Skip),
}

/// Counters for a finished or in-progress run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub attempted: usize,
    pub written: usize,
    pub skipped: usize,
}

pub struct Pipeline {
    adapter: Arc<dyn DatasetAdapter>,
    writer: TaskWriter,
    split: String,
    limit: Option<usize>,
    summary: RunSummary,
}

impl Pipeline {
    pub fn new(adapter: Arc<dyn DatasetAdapter>, config: PipelineConfig) -> Self {
        Self {
            adapter,
            writer: TaskWriter::new(config.writer),
            split: config.split,
            limit: config.limit,
            summary: RunSummary::default(),
        }
    }

    pub fn split(&self) -> &str {
        &self.split
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Adapt and persist one record.
    ///
    /// Records the adapter rejects are logged and counted as skipped. Only a
    /// failure to write to disk is returned as an error.
    pub fn process_record(&mut self, index: usize, record: &Record) -> Result<Outcome, WriteError> {
        self.summary.attempted += 1;

        let outcome = match self.adapter.adapt(record, &self.split, index) {
            Ok(task) => {
                let dir = self.writer.write(&task)?;
                self.summary.written += 1;
                debug!(index, task_id = %task.task_id, "record converted");
                Outcome::Written(dir)
            }
            Err(reason) => {
                warn!(index, dataset = self.adapter.name(), %reason, "skipping record");
                self.summary.skipped += 1;
                Outcome::Skipped(reason)
            }
        };

        if (index + 1) % 10 == 0 {
            info!(processed = index + 1, written = self.summary.written, "progress");
        }
        Ok(outcome)
    }

    /// Process an in-memory batch, honouring the configured limit. Indices
    /// start at zero.
    pub fn run<I>(&mut self, records: I) -> Result<RunSummary, WriteError>
    where
        I: IntoIterator<Item = Record>,
    {
        let limit = self.limit.unwrap_or(usize::MAX);
        for (index, record) in records.into_iter().take(limit).enumerate() {
            self.process_record(index, &record)?;
        }
        Ok(self.finish())
    }

    /// Log and return the final counters.
    pub fn finish(&self) -> RunSummary {
        info!(
            dataset = self.adapter.name(),
            split = %self.split,
            written = self.summary.written,
            attempted = self.summary.attempted,
            skipped = self.summary.skipped,
            "conversion finished"
        );
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::FramePairAdapter;
    use crate::normalize::{ImageInput, PixelArray, PixelData};
    use crate::record::Field;
    use crate::validator::validate_dataset;
    use tracing_test::traced_test;

    fn record(prompt: Option<&str>) -> Record {
        let frame = || {
            Field::Image(ImageInput::Array(
                PixelArray::new(&[3, 3, 3], PixelData::U8(vec![50; 27])).unwrap(),
            ))
        };
        let mut record = Record::new()
            .with("initial_image", frame())
            .with("target_image", frame());
        if let Some(p) = prompt {
            record.insert("instruction", p);
        }
        record
    }

    #[test]
    #[traced_test]
    fn malformed_records_are_skipped_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let mut pipeline = Pipeline::new(
            Arc::new(FramePairAdapter::instruct_pairs()),
            PipelineConfig::new("test", tmp.path()),
        );

        let summary = pipeline
            .run(vec![record(Some("a")), record(None), record(Some("c"))])
            .unwrap();

        assert_eq!(
            summary,
            RunSummary {
                attempted: 3,
                written: 2,
                skipped: 1
            }
        );
        assert!(logs_contain("skipping record"));

        let report = validate_dataset(tmp.path());
        assert_eq!(report.valid.len(), 2);
        assert!(report.valid[1].ends_with("instruct_pairs_task/pairs_test_00002"));
    }

    #[test]
    fn limit_truncates_before_iteration() {
        let tmp = tempfile::tempdir().unwrap();
        let mut pipeline = Pipeline::new(
            Arc::new(FramePairAdapter::instruct_pairs()),
            PipelineConfig::new("train", tmp.path()).with_limit(Some(2)),
        );

        let summary = pipeline
            .run((0..5).map(|i| record(Some(&format!("step {i}")))))
            .unwrap();
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.written, 2);
    }
}
