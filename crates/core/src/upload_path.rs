//! Filename safety and root-file selection for multi-file Caddyfile uploads.
//!
//! Every uploaded filename is cleaned and checked before anything touches
//! the disk. A single bad entry rejects the whole upload.

use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// Canonical name of a root Caddyfile.
pub const ROOT_CADDYFILE_NAME: &str = "Caddyfile";

/// Maximum accepted filename length.
pub const MAX_UPLOAD_FILENAME_LENGTH: usize = 255;

/// One file of a multi-file upload as supplied by the client.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UploadFile {
    pub filename: String,
    pub content: String,
}

/// A validated upload ready to be written below a session directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan<'a> {
    /// Cleaned relative path of the root file.
    pub root: PathBuf,
    /// Cleaned relative path and content of every file, in request order.
    pub files: Vec<(PathBuf, &'a str)>,
}

/// Clean a client-supplied filename into a relative path that stays
/// inside whatever directory it is later joined to.
///
/// `.` segments, empty segments and backslash separators are normalized
/// away. Absolute paths, drive prefixes, null bytes and any `..` segment
/// are rejected.
pub fn clean_relative_path(filename: &str) -> Result<PathBuf, CoreError> {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Filename cannot be empty".into()));
    }
    if trimmed.len() > MAX_UPLOAD_FILENAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Filename exceeds maximum length of {MAX_UPLOAD_FILENAME_LENGTH} characters"
        )));
    }
    if trimmed.contains('\0') {
        return Err(CoreError::Validation(format!(
            "Invalid filename '{}': contains null bytes",
            trimmed.escape_default()
        )));
    }
    if trimmed.starts_with('/') || trimmed.starts_with('\\') || has_drive_prefix(trimmed) {
        return Err(CoreError::Validation(format!(
            "Invalid filename '{trimmed}': absolute paths are not allowed"
        )));
    }

    let mut cleaned = PathBuf::new();
    for segment in trimmed.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(CoreError::Validation(format!(
                    "Invalid filename '{trimmed}': path traversal is not allowed"
                )));
            }
            part => cleaned.push(part),
        }
    }

    if cleaned.as_os_str().is_empty() {
        return Err(CoreError::Validation(format!(
            "Invalid filename '{trimmed}'"
        )));
    }
    Ok(cleaned)
}

/// Whether a cleaned path sits directly in the session directory.
pub fn is_top_level(path: &Path) -> bool {
    path.components().count() == 1
}

/// Pick the root file: the one named exactly `Caddyfile`, otherwise the
/// first top-level file.
pub fn select_root_file<'p>(paths: impl IntoIterator<Item = &'p Path>) -> Option<&'p Path> {
    let mut first_top_level = None;
    for path in paths {
        if path == Path::new(ROOT_CADDYFILE_NAME) {
            return Some(path);
        }
        if first_top_level.is_none() && is_top_level(path) {
            first_top_level = Some(path);
        }
    }
    first_top_level
}

/// Validate a multi-file upload.
///
/// Checks run in this order and the first failure wins: a root file is
/// present, every filename is safe, every file has non-blank content.
pub fn plan_upload(files: &[UploadFile]) -> Result<UploadPlan<'_>, CoreError> {
    if files.is_empty() {
        return Err(CoreError::Validation("At least one file is required".into()));
    }

    let cleaned: Vec<Result<PathBuf, CoreError>> = files
        .iter()
        .map(|f| clean_relative_path(&f.filename))
        .collect();

    let root = select_root_file(cleaned.iter().filter_map(|r| r.as_ref().ok()).map(PathBuf::as_path))
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            CoreError::Validation(format!(
                "A root file is required: name it '{ROOT_CADDYFILE_NAME}' or place it at the top level"
            ))
        })?;

    let mut planned = Vec::with_capacity(files.len());
    for (file, path) in files.iter().zip(cleaned) {
        planned.push((path?, file.content.as_str()));
    }

    if let Some((path, _)) = planned.iter().find(|(_, content)| content.trim().is_empty()) {
        return Err(CoreError::Validation(format!(
            "File '{}' is empty",
            path.display()
        )));
    }

    Ok(UploadPlan {
        root,
        files: planned,
    })
}

fn has_drive_prefix(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
