use std::collections::BTreeMap;
use std::path::Path;

use crate::adapter::{DatasetAdapter, Skip};
use crate::normalize::{CanonicalImage, normalize_field};
use crate::record::{Field, Record, VideoClip};
use crate::task::{Task, TaskMetadata};
use crate::validator::validate_task_data;

/// Which record columns feed each part of a task.
///
/// Every list is tried in order and the first present, non-empty column
/// wins.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    pub first_frame: Vec<String>,
    pub final_frame: Vec<String>,
    pub prompt: Vec<String>,
    pub default_prompt: Option<String>,
    pub domain: Vec<String>,
    pub default_domain: String,
    pub ground_truth: Vec<String>,
    pub difficulty: Vec<String>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_owned()).collect()
}

/// Adapter for datasets shaped as "initial frame, goal frame, instruction".
#[derive(Debug, Clone)]
pub struct FramePairAdapter {
    name: String,
    repo_id: Option<String>,
    id_prefix: String,
    fields: FieldMap,
}

impl FramePairAdapter {
    pub fn new(name: impl Into<String>, id_prefix: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            name: name.into(),
            repo_id: None,
            id_prefix: id_prefix.into(),
            fields,
        }
    }

    pub fn with_repo(mut self, repo_id: impl Into<String>) -> Self {
        self.repo_id = Some(repo_id.into());
        self
    }

    /// VideoThinkBench: `image` → `target_image`, prompt from `question`.
    pub fn videothinkbench() -> Self {
        Self::new(
            "videothinkbench",
            "vtb",
            FieldMap {
                first_frame: names(&["image"]),
                final_frame: names(&["target_image"]),
                prompt: names(&["question", "prompt"]),
                default_prompt: Some("Solve this visual reasoning task.".to_owned()),
                domain: names(&["task_type", "category"]),
                default_domain: "videothinkbench".to_owned(),
                ground_truth: names(&["ground_truth_video", "video"]),
                difficulty: names(&["difficulty"]),
            },
        )
        .with_repo("video-think-bench/VideoThinkBench")
    }

    /// Generic instruction-editing pairs; the hub repository is chosen at
    /// run time.
    pub fn instruct_pairs() -> Self {
        Self::new(
            "instruct-pairs",
            "pairs",
            FieldMap {
                first_frame: names(&["initial_image", "first_frame"]),
                final_frame: names(&["target_image", "final_frame"]),
                prompt: names(&["instruction", "prompt"]),
                default_prompt: None,
                domain: Vec::new(),
                default_domain: "instruct_pairs".to_owned(),
                ground_truth: names(&["ground_truth_video", "video"]),
                difficulty: names(&["difficulty"]),
            },
        )
    }

    fn lookup<'r>(
        &self,
        record: &'r Record,
        columns: &'r [String],
    ) -> Option<(&'r str, &'r Field)> {
        columns.iter().find_map(|column| {
            record
                .get(column)
                .filter(|field| field.is_truthy())
                .map(|field| (column.as_str(), field))
        })
    }

    fn frame(&self, record: &Record, columns: &[String]) -> Result<CanonicalImage, Skip> {
        let (column, field) = self
            .lookup(record, columns)
            .ok_or_else(|| Skip::MissingField(first_name(columns)))?;
        normalize_field(field).ok_or_else(|| Skip::InvalidImage(column.to_owned()))
    }

    fn text(&self, record: &Record, columns: &[String]) -> Option<String> {
        self.lookup(record, columns)
            .and_then(|(_, field)| field.to_text())
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
    }

    fn ground_truth(&self, record: &Record) -> Option<VideoClip> {
        match self.lookup(record, &self.fields.ground_truth)?.1 {
            Field::Video(clip) if clip.exists() => Some(clip.clone()),
            Field::Text(path) if Path::new(path.trim()).is_file() => {
                Some(VideoClip::from_path(path.trim()))
            }
            _ => None,
        }
    }

    fn is_mapped(&self, column: &str) -> bool {
        let f = &self.fields;
        [
            &f.first_frame,
            &f.final_frame,
            &f.prompt,
            &f.domain,
            &f.ground_truth,
            &f.difficulty,
        ]
        .iter()
        .any(|list| list.iter().any(|c| c == column))
    }

    fn metadata(&self, record: &Record, domain: &str, task_id: &str, split: &str) -> TaskMetadata {
        let extra: BTreeMap<String, serde_json::Value> = record
            .iter()
            .filter(|(column, _)| !self.is_mapped(column))
            .filter_map(|(column, field)| field.to_json().map(|v| (column.to_owned(), v)))
            .collect();

        TaskMetadata {
            domain: domain.to_owned(),
            task_id: task_id.to_owned(),
            source: self.repo_id.clone().unwrap_or_else(|| self.name.clone()),
            split: split.to_owned(),
            difficulty: self.text(record, &self.fields.difficulty),
            extra,
        }
    }
}

fn first_name(columns: &[String]) -> String {
    columns.first().cloned().unwrap_or_default()
}

impl DatasetAdapter for FramePairAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn repo_id(&self) -> Option<&str> {
        self.repo_id.as_deref()
    }

    fn adapt(&self, record: &Record, split: &str, index: usize) -> Result<Task, Skip> {
        let first_frame = self.frame(record, &self.fields.first_frame)?;

        let prompt = self
            .text(record, &self.fields.prompt)
            .or_else(|| self.fields.default_prompt.clone())
            .ok_or_else(|| Skip::MissingField(first_name(&self.fields.prompt)))?;

        let final_frame = self.frame(record, &self.fields.final_frame)?;

        if !validate_task_data(Some(&first_frame), Some(&prompt), Some(&final_frame)) {
            return Err(Skip::ValidationFailed);
        }

        let domain = self
            .text(record, &self.fields.domain)
            .unwrap_or_else(|| self.fields.default_domain.clone());
        let task_id = format!("{}_{}_{:05}", self.id_prefix, split, index);
        let metadata = self.metadata(record, &domain, &task_id, split);

        Ok(Task {
            ground_truth: self.ground_truth(record),
            metadata: Some(metadata),
            domain,
            task_id,
            first_frame,
            final_frame,
            prompt,
        })
    }
}
