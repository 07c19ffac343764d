//! Dataset adapters and their registry.
//!
//! An adapter maps one upstream [`Record`] to a [`Task`]. Adapters are looked
//! up by dataset name through [`AdapterRegistry`]; new datasets register an
//! adapter instead of extending a central `match`.

mod frame_pair;

pub use frame_pair::{FieldMap, FramePairAdapter};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::record::Record;
use crate::task::Task;

/// Why a record did not produce a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    /// A required field is absent or empty.
    MissingField(String),
    /// The field exists but could not be normalized into an image.
    InvalidImage(String),
    /// The normalized triple failed validation.
    ValidationFailed,
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skip::MissingField(name) => write!(f, "missing field `{name}`"),
            Skip::InvalidImage(name) => write!(f, "invalid image in `{name}`"),
            Skip::ValidationFailed => f.write_str("data validation failed"),
        }
    }
}

/// Contract every dataset adapter satisfies.
pub trait DatasetAdapter: Send + Sync {
    /// Registry key, e.g. `"videothinkbench"`.
    fn name(&self) -> &str;

    /// Hub repository the records come from, when the adapter is bound to one.
    fn repo_id(&self) -> Option<&str>;

    /// Map one record. `index` is the record's position within `split`.
    fn adapt(&self, record: &Record, split: &str, index: usize) -> Result<Task, Skip>;
}

/// Dataset name → adapter.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<dyn DatasetAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the adapters shipped in this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(FramePairAdapter::videothinkbench());
        registry.register(FramePairAdapter::instruct_pairs());
        registry
    }

    /// Add or replace an adapter under its own name.
    pub fn register<A: DatasetAdapter + 'static>(&mut self, adapter: A) {
        self.adapters
            .insert(adapter.name().to_ascii_lowercase(), Arc::new(adapter));
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<Arc<dyn DatasetAdapter>> {
        self.adapters.get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.adapters.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{ImageInput, convert_to_image};
    use image::DynamicImage;

    struct Constant;

    impl DatasetAdapter for Constant {
        fn name(&self) -> &str {
            "Constant"
        }

        fn repo_id(&self) -> Option<&str> {
            None
        }

        fn adapt(&self, _record: &Record, split: &str, index: usize) -> Result<Task, Skip> {
            let frame = convert_to_image(&ImageInput::Decoded(DynamicImage::new_rgb8(1, 1)))
                .ok_or(Skip::ValidationFailed)?;
            Ok(Task {
                domain: "constant".into(),
                task_id: format!("c_{split}_{index}"),
                first_frame: frame.clone(),
                final_frame: frame,
                prompt: "noop".into(),
                ground_truth: None,
                metadata: None,
            })
        }
    }

    #[test]
    fn builtin_adapters_are_registered() {
        let registry = AdapterRegistry::with_builtin();
        assert_eq!(registry.names(), vec!["instruct-pairs", "videothinkbench"]);
        assert!(registry.get("VideoThinkBench").is_some());
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn custom_adapter_registers_without_touching_builtins() {
        let mut registry = AdapterRegistry::with_builtin();
        registry.register(Constant);

        let adapter = registry.get("constant").expect("registered");
        let task = adapter.adapt(&Record::new(), "train", 9).unwrap();
        assert_eq!(task.task_id, "c_train_9");
        assert_eq!(registry.names().len(), 3);
    }

    #[test]
    fn skip_reasons_render() {
        assert_eq!(Skip::MissingField("image".into()).to_string(), "missing field `image`");
        assert_eq!(Skip::ValidationFailed.to_string(), "data validation failed");
    }
}
