//! Render job and response types

use url::Url;

use super::source::FetchError;
use super::types::{DocumentInfo, PageImage, Viewport};
use crate::surface::SurfaceError;

/// Unique identifier for render chains
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One render chain handed to a worker
#[derive(Clone, Debug)]
pub struct RenderJob {
    pub id: RequestId,
    /// Resolved document location
    pub url: Url,
    /// Page to render (1-based)
    pub page: u32,
    /// Scale applied to the page's native size
    pub scale: f32,
}

/// Errors from render workers
#[derive(Debug, thiserror::Error)]
pub enum WorkerFault {
    #[error("fetching document: {0}")]
    Fetch(#[from] FetchError),

    #[error("not a PDF document ({url})")]
    NotAPdf { url: Url },

    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: usize },

    #[error("page too large to rasterize: {0}")]
    PageTooLarge(#[from] SurfaceError),

    #[error("{detail}")]
    Generic { detail: String },
}

impl WorkerFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Progress reported by a worker, one message per completed stage
#[derive(Debug)]
pub enum RenderResponse {
    /// Document fetched and parsed
    DocumentLoaded { id: RequestId, info: DocumentInfo },

    /// Requested page loaded and its viewport computed
    PageLoaded {
        id: RequestId,
        page: u32,
        viewport: Viewport,
    },

    /// Page rasterized at the viewport's scale
    PageRendered { id: RequestId, image: PageImage },

    /// Chain failed; no further messages follow
    Error { id: RequestId, error: WorkerFault },
}

impl RenderResponse {
    #[must_use]
    pub fn id(&self) -> RequestId {
        match self {
            Self::DocumentLoaded { id, .. }
            | Self::PageLoaded { id, .. }
            | Self::PageRendered { id, .. }
            | Self::Error { id, .. } => *id,
        }
    }
}
