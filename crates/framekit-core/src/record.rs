//! Upstream dataset rows.
//!
//! A [`Record`] is what a dataset hub hands back for one sample: an ordered
//! map from column name to [`Field`]. Adapters read fields by name and never
//! see the wire format the row came from.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::normalize::ImageInput;

/// A single column value.
#[derive(Debug, Clone)]
pub enum Field {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Image(ImageInput),
    Video(VideoClip),
    /// Anything without a dedicated variant: lists, nested objects, and
    /// numeric arrays that may later be read as pixel data.
    Json(Value),
}

impl Field {
    /// Build a field from a plain JSON value.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Field::Null,
            Value::Bool(b) => Field::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Field::Int(i),
                None => n.as_f64().map(Field::Float).unwrap_or(Field::Null),
            },
            Value::String(s) => Field::Text(s),
            other => Field::Json(other),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Field::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the field as text the way a prompt or a domain name would be
    /// read: text as-is, numbers and booleans formatted, everything else none.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Field::Text(s) => Some(s.clone()),
            Field::Int(i) => Some(i.to_string()),
            Field::Float(f) => Some(f.to_string()),
            Field::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// JSON form used for metadata. Media fields have no JSON form.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Field::Null => Some(Value::Null),
            Field::Bool(b) => Some(Value::Bool(*b)),
            Field::Int(i) => Some(Value::from(*i)),
            Field::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number),
            Field::Text(s) => Some(Value::String(s.clone())),
            Field::Json(v) => Some(v.clone()),
            Field::Image(_) | Field::Video(_) => None,
        }
    }

    /// Whether the field counts as "present" for `a or b or default` style
    /// lookups: null, empty text and empty containers do not.
    pub fn is_truthy(&self) -> bool {
        match self {
            Field::Null => false,
            Field::Bool(b) => *b,
            Field::Int(i) => *i != 0,
            Field::Float(f) => *f != 0.0,
            Field::Text(s) => !s.is_empty(),
            Field::Json(Value::Array(a)) => !a.is_empty(),
            Field::Json(Value::Object(o)) => !o.is_empty(),
            Field::Json(_) | Field::Image(_) | Field::Video(_) => true,
        }
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Field::Text(s.to_owned())
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        Field::Text(s)
    }
}

impl From<i64> for Field {
    fn from(i: i64) -> Self {
        Field::Int(i)
    }
}

impl From<ImageInput> for Field {
    fn from(input: ImageInput) -> Self {
        Field::Image(input)
    }
}

impl From<VideoClip> for Field {
    fn from(clip: VideoClip) -> Self {
        Field::Video(clip)
    }
}

/// Where the bytes of a video live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

/// An optional ground-truth clip attached to a sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoClip {
    pub source: VideoSource,
    /// File extension without the dot, lowercase (`mp4`, `webm`, ...).
    pub extension: String,
}

impl VideoClip {
    pub fn from_bytes(bytes: Vec<u8>, extension: impl Into<String>) -> Self {
        Self {
            source: VideoSource::Bytes(bytes),
            extension: normalize_extension(&extension.into()),
        }
    }

    /// Reference a clip on disk. The extension is taken from the path and
    /// defaults to `mp4`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize_extension)
            .unwrap_or_else(|| "mp4".to_owned());
        Self {
            source: VideoSource::Path(path),
            extension,
        }
    }

    /// File name this clip is stored under inside a task directory.
    pub fn file_name(&self) -> String {
        format!("ground_truth.{}", self.extension)
    }

    pub fn exists(&self) -> bool {
        match &self.source {
            VideoSource::Bytes(b) => !b.is_empty(),
            VideoSource::Path(p) => Path::new(p).is_file(),
        }
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        "mp4".to_owned()
    } else {
        ext
    }
}

/// One dataset row.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: BTreeMap<String, Field>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a JSON object. Non-object values produce an empty
    /// record.
    pub fn from_json(value: Value) -> Self {
        let mut record = Record::new();
        if let Value::Object(map) = value {
            for (name, v) in map {
                record.insert(name, Field::from_json(v));
            }
        }
        record
    }

    pub fn with(mut self, name: impl Into<String>, field: impl Into<Field>) -> Self {
        self.insert(name, field);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, field: impl Into<Field>) {
        self.fields.insert(name.into(), field.into());
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// First field among `names` that is present and truthy.
    pub fn first_of(&self, names: &[&str]) -> Option<&Field> {
        names
            .iter()
            .filter_map(|name| self.fields.get(*name))
            .find(|field| field.is_truthy())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
