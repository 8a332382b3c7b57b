//! Input checks run before any runtime or ledger call.

use crate::error::{Error, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use uuid::Uuid;

fn image_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9._/-]+(:[A-Za-z0-9_][A-Za-z0-9._-]{0,127})?$")
            .expect("image reference pattern is valid")
    })
}

fn last_segment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9._-]+$").expect("segment pattern is valid"))
}

/// Lowercase repository path with an optional tag, e.g. `someone/hello:v1`.
pub fn validate_image_name(name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("image name is empty".into()));
    }
    if !image_ref_re().is_match(name) {
        return Err(Error::Validation(format!(
            "{name:?} is not a valid image name (lowercase letters, digits, '.', '_', '-', '/' and an optional :tag)"
        )));
    }
    let repo = name.split(':').next().unwrap_or(name);
    let last = repo.rsplit('/').next().unwrap_or(repo);
    if !last_segment_re().is_match(last) {
        return Err(Error::Validation(format!(
            "{name:?} has an empty or invalid final path segment"
        )));
    }
    Ok(())
}

/// Turn a display name into an image-safe name: spaces become hyphens, other
/// non-alphanumerics are dropped, everything is lowercased.
pub fn format_image_name(input: &str) -> String {
    input
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_lowercase()
}

/// Where a notebook comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotebookSource {
    Url(reqwest::Url),
    File(std::path::PathBuf),
}

/// Accept an http(s) URL or an existing local `.ipynb` file.
pub fn validate_notebook_source(source: &str) -> Result<NotebookSource> {
    let source = source.trim();
    if let Ok(url) = reqwest::Url::parse(source) {
        if matches!(url.scheme(), "http" | "https") {
            return Ok(NotebookSource::Url(url));
        }
    }
    let path = Path::new(source);
    if source.ends_with(".ipynb") && path.is_file() {
        return Ok(NotebookSource::File(path.to_path_buf()));
    }
    Err(Error::Validation(format!(
        "{source:?} is neither an http(s) URL nor an existing .ipynb file"
    )))
}

/// Tokens are canonical (lowercase, hyphenated) version-4 UUIDs.
pub fn validate_token(token: &str) -> Result<()> {
    match Uuid::parse_str(token) {
        Ok(u) if u.get_version_num() == 4 && u.hyphenated().to_string() == token => Ok(()),
        _ => Err(Error::Validation(format!("token {token:?} is not a valid UUID"))),
    }
}

pub fn generate_token() -> String {
    Uuid::new_v4().to_string()
}

/// Free-text field bounded by the catalog's column sizes.
pub fn validate_field(label: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(Error::Validation(format!(
            "{label} must be between {min} and {max} characters (got {len})"
        )));
    }
    Ok(())
}
