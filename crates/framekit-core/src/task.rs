use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::normalize::CanonicalImage;
use crate::record::VideoClip;

pub const FIRST_FRAME_FILE: &str = "first_frame.png";
pub const FINAL_FRAME_FILE: &str = "final_frame.png";
pub const PROMPT_FILE: &str = "prompt.txt";
pub const METADATA_FILE: &str = "question_metadata.json";
pub const GROUND_TRUTH_STEM: &str = "ground_truth";

/// One standardized sample: two frames, an instruction and an optional
/// ground-truth clip.
#[derive(Debug, Clone)]
pub struct Task {
    pub domain: String,
    pub task_id: String,
    pub first_frame: CanonicalImage,
    pub final_frame: CanonicalImage,
    pub prompt: String,
    pub ground_truth: Option<VideoClip>,
    pub metadata: Option<TaskMetadata>,
}

impl Task {
    /// Name of the directory that groups tasks of this domain.
    pub fn domain_dir(&self) -> String {
        format!("{}_task", sanitize_component(&self.domain))
    }
}

/// Provenance written to `question_metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadata {
    pub domain: String,
    pub task_id: String,
    pub source: String,
    pub split: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Reduce a domain or task id to one safe path component.
///
/// Path separators, `..` and control characters are replaced with `_`; an
/// empty result becomes `_`.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.replace("..", "_");
    if cleaned.is_empty() || cleaned == "." {
        "_".to_owned()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_plain_names() {
        assert_eq!(sanitize_component("videothinkbench"), "videothinkbench");
        assert_eq!(sanitize_component("vtb_test_00003"), "vtb_test_00003");
    }

    #[test]
    fn sanitize_strips_separators() {
        assert_eq!(sanitize_component("../etc/passwd"), "__etc_passwd");
        assert_eq!(sanitize_component("a\\b"), "a_b");
        assert_eq!(sanitize_component("  "), "_");
        assert_eq!(sanitize_component("."), "_");
    }
}
