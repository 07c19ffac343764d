//! Wire types of the datasets-server API and their mapping to [`Record`]s.
//!
//! Image and video cells arrive as `{"src": "<url>", ...}` objects. Mapping a
//! row is split in two: [`plan_row`] builds the record from inline values and
//! lists the assets still to be downloaded, then the caller fills each one in
//! with [`asset_field`].

use std::collections::HashMap;

use framekit_core::{Field, ImageInput, Record, VideoClip};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::HubError;

#[derive(Debug, Clone, Deserialize)]
pub struct SplitsResponse {
    pub splits: Vec<SplitEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SplitEntry {
    pub dataset: String,
    pub config: String,
    pub split: String,
}

/// Pick the config that holds `split`, preferring one named `default`.
pub fn resolve_config<'a>(splits: &'a [SplitEntry], split: &str) -> Option<&'a SplitEntry> {
    let mut matching = splits.iter().filter(|s| s.split == split);
    let first = matching.next()?;
    Some(
        std::iter::once(first)
            .chain(matching)
            .find(|s| s.config == "default")
            .unwrap_or(first),
    )
}

#[derive(Debug, Clone, Deserialize)]
pub struct RowsResponse {
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub rows: Vec<RowEntry>,
    #[serde(default)]
    pub num_rows_total: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RowEntry {
    pub row_idx: usize,
    pub row: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    Video,
}

fn feature_kind(kind: &Value) -> Option<AssetKind> {
    match kind.get("_type").and_then(Value::as_str) {
        Some("Image") => Some(AssetKind::Image),
        Some("Video") => Some(AssetKind::Video),
        _ => None,
    }
}

/// Column name → media kind for every media column of a page.
pub fn media_columns(features: &[Feature]) -> HashMap<String, AssetKind> {
    features
        .iter()
        .filter_map(|f| feature_kind(&f.kind).map(|k| (f.name.clone(), k)))
        .collect()
}

/// A media cell still to be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAsset {
    pub column: String,
    pub url: String,
    pub kind: AssetKind,
}

impl PendingAsset {
    /// Extension of the asset file, from the URL path; `mp4` when absent.
    pub fn extension(&self) -> String {
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        let file = path.rsplit('/').next().unwrap_or_default();
        match file.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
            _ => "mp4".to_owned(),
        }
    }
}

fn asset_src(cell: &Value) -> Option<&str> {
    match cell {
        Value::Object(obj) => obj.get("src").and_then(Value::as_str),
        Value::Array(items) => items.first().and_then(asset_src),
        _ => None,
    }
}

/// Map inline cells to fields and collect media cells for download. Media
/// cells are left as [`Field::Null`] until filled in.
pub fn plan_row(
    row: Map<String, Value>,
    media: &HashMap<String, AssetKind>,
) -> (Record, Vec<PendingAsset>) {
    let mut record = Record::new();
    let mut pending = Vec::new();

    for (column, cell) in row {
        match media.get(&column) {
            Some(kind) => {
                if let Some(src) = asset_src(&cell) {
                    pending.push(PendingAsset {
                        column: column.clone(),
                        url: src.to_owned(),
                        kind: *kind,
                    });
                }
                record.insert(column, Field::Null);
            }
            None => record.insert(column, Field::from_json(cell)),
        }
    }

    (record, pending)
}

/// Field for a downloaded asset. A failed download becomes [`Field::Null`],
/// which adapters treat as a missing value.
pub fn asset_field(asset: &PendingAsset, fetched: Result<Vec<u8>, HubError>) -> Field {
    match (fetched, asset.kind) {
        (Ok(bytes), AssetKind::Image) => Field::Image(ImageInput::Encoded(bytes)),
        (Ok(bytes), AssetKind::Video) => {
            Field::Video(VideoClip::from_bytes(bytes, asset.extension()))
        }
        (Err(_), _) => Field::Null,
    }
}
