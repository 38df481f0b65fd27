//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the session with mock implementations.

use crate::attachment::PickOutcome;
use crate::export::{ExportDocument, ExportError};
use crate::reply::ReplyError;
use crate::state_machine::{Message, ReplyRequest};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Produces the automated answer to a user message
#[async_trait]
pub trait ReplySource: Send + Sync {
    /// Answer one request; resolves once the reply is ready
    async fn reply(&self, request: &ReplyRequest) -> Result<Message, ReplyError>;

    /// Name used in diagnostics
    fn name(&self) -> &str;
}

/// Turns a rendered document into a shareable file
#[async_trait]
pub trait Exporter: Send + Sync {
    async fn export(&self, document: &ExportDocument) -> Result<PathBuf, ExportError>;
}

/// Lets the user choose an image
#[async_trait]
pub trait ImagePicker: Send + Sync {
    async fn pick_image(&self) -> PickOutcome;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ReplySource + ?Sized> ReplySource for Arc<T> {
    async fn reply(&self, request: &ReplyRequest) -> Result<Message, ReplyError> {
        (**self).reply(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<T: Exporter + ?Sized> Exporter for Arc<T> {
    async fn export(&self, document: &ExportDocument) -> Result<PathBuf, ExportError> {
        (**self).export(document).await
    }
}

#[async_trait]
impl<T: ImagePicker + ?Sized> ImagePicker for Arc<T> {
    async fn pick_image(&self) -> PickOutcome {
        (**self).pick_image().await
    }
}
