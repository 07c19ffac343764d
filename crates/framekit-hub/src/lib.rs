//! framekit-hub - dataset hub access for framekit
//!
//! Reads dataset rows through the Hugging Face datasets-server REST API and
//! hands them out as [`framekit_core::Record`]s, media cells already
//! downloaded.

pub mod api;
pub mod client;
pub mod error;
pub mod rows;

pub use api::{DatasetApi, HubApi, HubConfig, RowPager, RowsPage, SplitApi};
pub use error::HubError;
pub use rows::SplitEntry;
