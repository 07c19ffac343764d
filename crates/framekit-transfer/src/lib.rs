//! framekit-transfer - move a dataset tree to and from object storage
//!
//! Files map to keys as `prefix + relative path`, `/`-separated. Both
//! directions keep going past per-file failures and return a
//! [`TransferReport`].

pub mod error;
pub mod keys;
pub mod store;
pub mod sync;

pub use error::TransferError;
pub use keys::{content_type, normalize_prefix, object_key, relative_path};
pub use store::{MemoryStore, ObjectStore, S3Store};
pub use sync::{TransferConfig, TransferReport, download_prefix, upload_directory};
