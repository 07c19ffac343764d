//! Persists [`Task`]s into the `{domain}_task/{task_id}/` tree.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::WriteError;
use crate::record::VideoSource;
use crate::task::{
    FINAL_FRAME_FILE, FIRST_FRAME_FILE, METADATA_FILE, PROMPT_FILE, Task, sanitize_component,
};
use crate::validator::ground_truth_entries;

/// Where and how tasks are written.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub output_root: PathBuf,
    /// Also write `question_metadata.json` when the task carries metadata.
    pub write_metadata: bool,
}

impl WriterConfig {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            write_metadata: false,
        }
    }

    pub fn with_metadata(mut self, enabled: bool) -> Self {
        self.write_metadata = enabled;
        self
    }
}

pub struct TaskWriter {
    config: WriterConfig,
}

impl TaskWriter {
    pub fn new(config: WriterConfig) -> Self {
        Self { config }
    }

    pub fn output_root(&self) -> &Path {
        &self.config.output_root
    }

    /// `{output_root}/{domain}_task/{task_id}`.
    pub fn task_dir(&self, task: &Task) -> PathBuf {
        self.config
            .output_root
            .join(task.domain_dir())
            .join(sanitize_component(&task.task_id))
    }

    /// Write every artifact of `task`, replacing what a previous run left in
    /// the same directory. Returns the task directory.
    pub fn write(&self, task: &Task) -> Result<PathBuf, WriteError> {
        let dir = self.task_dir(task);
        fs::create_dir_all(&dir).map_err(|e| WriteError::io(&dir, e))?;

        for (name, frame) in [
            (FIRST_FRAME_FILE, &task.first_frame),
            (FINAL_FRAME_FILE, &task.final_frame),
        ] {
            let path = dir.join(name);
            frame
                .save_png(&path)
                .map_err(|source| WriteError::Encode { path, source })?;
        }

        let prompt_path = dir.join(PROMPT_FILE);
        fs::write(&prompt_path, &task.prompt).map_err(|e| WriteError::io(&prompt_path, e))?;

        // A clip from an earlier run may have had a different extension.
        for stale in ground_truth_entries(&dir) {
            fs::remove_file(&stale).map_err(|e| WriteError::io(&stale, e))?;
        }
        if let Some(clip) = &task.ground_truth {
            let path = dir.join(clip.file_name());
            match &clip.source {
                VideoSource::Bytes(bytes) => {
                    fs::write(&path, bytes).map_err(|e| WriteError::io(&path, e))?
                }
                VideoSource::Path(src) => {
                    fs::copy(src, &path).map_err(|e| WriteError::io(src, e))?;
                }
            }
        }

        let metadata_path = dir.join(METADATA_FILE);
        match (&task.metadata, self.config.write_metadata) {
            (Some(metadata), true) => {
                let json = serde_json::to_string_pretty(metadata)?;
                fs::write(&metadata_path, json).map_err(|e| WriteError::io(&metadata_path, e))?;
            }
            _ if metadata_path.exists() => {
                fs::remove_file(&metadata_path).map_err(|e| WriteError::io(&metadata_path, e))?;
            }
            _ => {}
        }

        debug!(dir = %dir.display(), task_id = %task.task_id, "task written");
        Ok(dir)
    }
}
