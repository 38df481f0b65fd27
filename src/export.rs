//! Message export
//!
//! Renders one message as a minimal HTML document and hands it to an
//! `Exporter`, which turns it into a file the platform can share.

use crate::runtime::Exporter;
use crate::state_machine::{Attachment, AttachmentKind, Message};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

const DOCUMENT_HEADING: &str = "Message Content";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Message not found: {0}")]
    MessageNotFound(Uuid),
    #[error("Attachment location is not an http(s) or file URI: {0}")]
    UnsupportedLocation(String),
    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

/// A rendered message ready to be written out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub message_id: Uuid,
    pub html: String,
}

impl ExportDocument {
    pub fn file_name(&self) -> String {
        format!("message-{}.html", self.message_id)
    }
}

/// Render a message snapshot as HTML
pub fn render_document(message: &Message) -> Result<ExportDocument, ExportError> {
    let mut body = format!("<h1>{DOCUMENT_HEADING}</h1>\n");

    if let Some(text) = &message.text {
        let _ = writeln!(body, "<p>{}</p>", escape_html(text));
    }

    if let Some(Attachment {
        kind: AttachmentKind::Image,
        location,
    }) = &message.attachment
    {
        let src = image_source(location)?;
        let _ = writeln!(
            body,
            "<img src=\"{}\" style=\"max-width: 100%; height: auto;\" />",
            escape_html(&src)
        );
    }

    let html = format!(
        "<html>\n<body style=\"font-family: Arial; padding: 20px;\">\n{body}</body>\n</html>\n"
    );

    Ok(ExportDocument {
        message_id: message.id,
        html,
    })
}

/// Accept http(s) and file URIs; absolute paths become file URIs
fn image_source(location: &str) -> Result<String, ExportError> {
    let lower = location.to_ascii_lowercase();
    if ["http://", "https://", "file://"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return Ok(location.to_string());
    }
    if Path::new(location).is_absolute() {
        return Ok(format!("file://{location}"));
    }
    Err(ExportError::UnsupportedLocation(location.to_string()))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Writes documents into a directory
#[derive(Debug, Clone)]
pub struct FileExporter {
    dir: PathBuf,
}

impl FileExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Exporter for FileExporter {
    async fn export(&self, document: &ExportDocument) -> Result<PathBuf, ExportError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(document.file_name());
        tokio::fs::write(&path, document.html.as_bytes()).await?;
        tracing::info!(
            message_id = %document.message_id,
            path = %path.display(),
            "Exported message"
        );
        Ok(path)
    }
}
