//! Checks that a sample, or a task directory on disk, matches the layout:
//!
//! ```text
//! {root}/{domain}_task/{task_id}/
//! ├── first_frame.png       (required)
//! ├── final_frame.png       (required)
//! ├── prompt.txt            (required)
//! └── ground_truth.<ext>    (optional)
//! ```
//!
//! Validation never errors; every malformed input is simply `false`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::normalize::CanonicalImage;
use crate::task::{FINAL_FRAME_FILE, FIRST_FRAME_FILE, GROUND_TRUTH_STEM, PROMPT_FILE};

/// True iff both frames are present with positive dimensions and the prompt
/// is non-blank.
pub fn validate_task_data(
    first_frame: Option<&CanonicalImage>,
    prompt: Option<&str>,
    final_frame: Option<&CanonicalImage>,
) -> bool {
    let frames_ok = [first_frame, final_frame]
        .into_iter()
        .all(|frame| frame.is_some_and(CanonicalImage::has_area));
    let prompt_ok = prompt.is_some_and(|p| !p.trim().is_empty());
    frames_ok && prompt_ok
}

/// True iff `task_dir` holds non-empty `first_frame.png`, `final_frame.png`
/// and `prompt.txt`. A `ground_truth.*` entry only has to exist.
pub fn validate_task_directory(task_dir: &Path) -> bool {
    if !task_dir.is_dir() {
        return false;
    }

    for name in [FIRST_FRAME_FILE, FINAL_FRAME_FILE, PROMPT_FILE] {
        if !is_non_empty_file(&task_dir.join(name)) {
            debug!(dir = %task_dir.display(), file = name, "missing or empty required file");
            return false;
        }
    }

    ground_truth_entries(task_dir)
        .iter()
        .all(|path| path.exists())
}

fn is_non_empty_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

pub(crate) fn ground_truth_entries(task_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(task_dir) else {
        return Vec::new();
    };
    entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem == GROUND_TRUTH_STEM)
        })
        .collect()
}

/// Outcome of validating every task directory under a dataset root.
#[derive(Debug, Default, Clone)]
pub struct DatasetReport {
    pub valid: Vec<PathBuf>,
    pub invalid: Vec<PathBuf>,
}

impl DatasetReport {
    pub fn total(&self) -> usize {
        self.valid.len() + self.invalid.len()
    }

    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty()
    }
}

/// Validate every `{root}/*_task/*/` directory.
///
/// Entries that are not directories are ignored, as are top-level
/// directories that do not end in `_task`.
pub fn validate_dataset(root: &Path) -> DatasetReport {
    let mut report = DatasetReport::default();

    let domains = walkdir::WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .flatten()
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with("_task"));

    for domain in domains {
        let tasks = walkdir::WalkDir::new(domain.path())
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .flatten()
            .filter(|entry| entry.file_type().is_dir());

        for task in tasks {
            let path = task.into_path();
            if validate_task_directory(&path) {
                report.valid.push(path);
            } else {
                report.invalid.push(path);
            }
        }
    }

    report
}
