//! Mapping between local relative paths and object keys.

use std::path::{Component, Path, PathBuf};

use crate::error::TransferError;

/// Append `/` to a non-empty prefix that lacks one. An empty prefix stays
/// empty so keys sit at the bucket root.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    }
}

/// Key for a root-relative path. Components are joined with `/` on every
/// platform.
///
/// Paths that are not plain relative paths, or whose components are not
/// valid UTF-8, cannot become keys.
pub fn object_key(prefix: &str, relative: &Path) -> Result<String, TransferError> {
    let item = || relative.display().to_string();
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| TransferError::unmappable(item(), "path is not valid UTF-8"))?;
                parts.push(part);
            }
            Component::CurDir => {}
            _ => {
                return Err(TransferError::unmappable(
                    item(),
                    "path is not a plain relative path",
                ));
            }
        }
    }
    if parts.is_empty() {
        return Err(TransferError::unmappable(item(), "empty relative path"));
    }
    Ok(format!("{}{}", normalize_prefix(prefix), parts.join("/")))
}

/// Relative local path for `key` under `prefix`.
///
/// `Ok(None)` for directory markers (`prefix/` and `.../`), which carry no
/// file. Keys outside the prefix and keys with empty, `.` or `..` segments
/// are errors.
pub fn relative_path(prefix: &str, key: &str) -> Result<Option<PathBuf>, TransferError> {
    let rest = key
        .strip_prefix(&normalize_prefix(prefix))
        .ok_or_else(|| TransferError::unmappable(key, "key is outside the prefix"))?;
    if rest.is_empty() || rest.ends_with('/') {
        return Ok(None);
    }

    let mut path = PathBuf::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." | ".." => {
                return Err(TransferError::unmappable(
                    key,
                    format!("segment `{segment}` would not stay inside the local root"),
                ));
            }
            s if !is_portable_segment(s) => {
                return Err(TransferError::unmappable(
                    key,
                    format!("segment `{s}` is not a valid file name on this platform"),
                ));
            }
            s => path.push(s),
        }
    }
    Ok(Some(path))
}

#[cfg(windows)]
fn is_portable_segment(segment: &str) -> bool {
    !segment.contains(['\\', ':'])
}

#[cfg(not(windows))]
fn is_portable_segment(_segment: &str) -> bool {
    true
}

/// Content type sent with an upload, from the file extension.
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_gets_trailing_slash() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("ds"), "ds/");
        assert_eq!(normalize_prefix("ds/"), "ds/");
        assert_eq!(normalize_prefix("/runs/2024"), "runs/2024/");
    }

    #[test]
    fn keys_join_with_forward_slash() {
        let rel = Path::new("a").join("b.png");
        assert_eq!(object_key("ds/", &rel).unwrap(), "ds/a/b.png");
        assert_eq!(object_key("ds", &rel).unwrap(), "ds/a/b.png");
        assert_eq!(object_key("", &rel).unwrap(), "a/b.png");
        assert!(matches!(
            object_key("ds", Path::new("../x")),
            Err(TransferError::UnmappablePath { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_paths_have_no_key() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let rel = Path::new(OsStr::from_bytes(b"bad\xff.png"));
        let err = object_key("ds", rel).unwrap_err();
        assert!(err.to_string().contains("UTF-8"), "{err}");
    }

    #[test]
    fn relative_paths_skip_markers() {
        assert_eq!(
            relative_path("ds/", "ds/maze_task/t1/prompt.txt").unwrap(),
            Some(Path::new("maze_task").join("t1").join("prompt.txt"))
        );
        assert_eq!(relative_path("ds", "ds/folder/").unwrap(), None);
        assert_eq!(relative_path("ds", "ds/").unwrap(), None);
        assert_eq!(relative_path("", "a.txt").unwrap(), Some(PathBuf::from("a.txt")));
    }

    #[test]
    fn relative_paths_reject_escapes() {
        for key in ["ds/../etc/passwd", "ds//a.txt", "ds/./a.txt", "other/file.txt"] {
            assert!(
                matches!(relative_path("ds", key), Err(TransferError::UnmappablePath { .. })),
                "{key}"
            );
        }
        assert!(relative_path("", "/etc/passwd").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn colons_and_backslashes_map_back_on_unix() {
        assert_eq!(
            relative_path("ds", "ds/run:01.txt").unwrap(),
            Some(PathBuf::from("run:01.txt"))
        );
        assert_eq!(
            relative_path("ds", "ds/back\\slash.txt").unwrap(),
            Some(PathBuf::from("back\\slash.txt"))
        );
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(content_type(Path::new("first_frame.png")), "image/png");
        assert_eq!(content_type(Path::new("x.JPEG")), "image/jpeg");
        assert_eq!(content_type(Path::new("question_metadata.json")), "application/json");
        assert_eq!(content_type(Path::new("prompt.txt")), "text/plain");
        assert_eq!(content_type(Path::new("ground_truth.mp4")), "video/mp4");
        assert_eq!(content_type(Path::new("ground_truth.webm")), "application/octet-stream");
        assert_eq!(content_type(Path::new("README")), "application/octet-stream");
    }
}
