//! Attachment acquisition
//!
//! The conversation only consumes "a URI, or the user backed out".

use crate::runtime::ImagePicker;
use async_trait::async_trait;
use std::path::PathBuf;

/// Result of asking the user for an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    Picked(String),
    Cancelled,
}

/// Resolves an image typed on the terminal
///
/// URIs pass through untouched. Anything else is treated as a local path
/// and must point at an existing file. Empty input means the user cancelled.
#[derive(Debug, Clone)]
pub struct PathImagePicker {
    input: String,
    base_dir: PathBuf,
}

impl PathImagePicker {
    pub fn new(input: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            base_dir: base_dir.into(),
        }
    }
}

fn has_uri_scheme(input: &str) -> bool {
    let lower = input.to_ascii_lowercase();
    ["http://", "https://", "file://"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}

#[async_trait]
impl ImagePicker for PathImagePicker {
    async fn pick_image(&self) -> PickOutcome {
        let input = self.input.trim();
        if input.is_empty() {
            return PickOutcome::Cancelled;
        }
        if has_uri_scheme(input) {
            return PickOutcome::Picked(input.to_string());
        }

        let path = self.base_dir.join(input);
        let resolved = match tokio::fs::canonicalize(&path).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not resolve image path");
                return PickOutcome::Cancelled;
            }
        };

        match tokio::fs::metadata(&resolved).await {
            Ok(meta) if meta.is_file() => {
                PickOutcome::Picked(format!("file://{}", resolved.display()))
            }
            _ => {
                tracing::warn!(path = %resolved.display(), "Picked path is not a file");
                PickOutcome::Cancelled
            }
        }
    }
}
