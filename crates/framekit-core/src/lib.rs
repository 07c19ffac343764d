//! framekit-core: the standardized task layout and everything needed to
//! produce it from heterogeneous dataset rows.
//!
//! Flow: a [`DatasetAdapter`] maps each [`Record`] to a [`Task`], images are
//! normalized with [`convert_to_image`], the triple is checked with
//! [`validate_task_data`], and [`TaskWriter`] persists it.

pub mod adapter;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod task;
pub mod validator;
pub mod writer;

pub use adapter::{AdapterRegistry, DatasetAdapter, FieldMap, FramePairAdapter, Skip};
pub use error::WriteError;
pub use normalize::{
    CanonicalImage, ColorMode, ImageInput, PixelArray, PixelData, convert_to_image,
    convert_to_image_with_mode, normalize_field,
};
pub use pipeline::{Outcome, Pipeline, PipelineConfig, RunSummary};
pub use record::{Field, Record, VideoClip, VideoSource};
pub use task::{Task, TaskMetadata};
pub use validator::{DatasetReport, validate_dataset, validate_task_data, validate_task_directory};
pub use writer::{TaskWriter, WriterConfig};
