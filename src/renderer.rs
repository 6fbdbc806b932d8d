//! Page renderer - drives one render chain per request
//!
//! `PageRenderer::render` locates the viewer element, resolves its document
//! URL and hands the chain to a dedicated worker thread. The returned
//! `RenderTask` is the caller's side of the chain: it follows the worker's
//! stage reports, sizes the surface once the viewport is known and draws the
//! page when it arrives.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

use flume::{Receiver, TryRecvError};
use log::{debug, info, warn};
use url::Url;

use crate::host::{HostPage, dataset_attribute_name};
use crate::pdf::{
    DEFAULT_SCALE, DocumentInfo, FIRST_PAGE, Fetch, RenderJob, RenderResponse, RequestId,
    Viewport, WorkerFault, render_worker,
};
use crate::settings::{MissingElementPolicy, Settings};
use crate::surface::{Surface, SurfaceError};

pub const DEFAULT_WORKER_NAME: &str = "pdf-worker";

/// Errors surfaced to the caller of a render chain
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no element with id {0:?}")]
    MissingElement(String),

    #[error("element {id:?} is a <{tag}>, not a <canvas>")]
    NotACanvas { id: String, tag: String },

    #[error("element {id:?} has no {attribute} attribute")]
    MissingSource { id: String, attribute: String },

    #[error("invalid document URL {url:?}: {source}")]
    InvalidSource {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("starting render worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("sizing the surface: {0}")]
    Surface(#[from] SurfaceError),

    #[error(transparent)]
    Worker(#[from] WorkerFault),
}

/// Stage a render chain is in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderState {
    /// Worker started, caller has not polled yet
    Idle,
    DocumentLoading,
    PageLoading,
    Rendering,
    Done,
    Failed,
}

impl RenderState {
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Result of a completed chain
#[derive(Clone, Debug, PartialEq)]
pub struct RenderOutcome {
    pub id: RequestId,
    pub url: Url,
    pub document: DocumentInfo,
    pub viewport: Viewport,
    /// Surface size after the chain, equal to the viewport's pixel size
    pub surface_size: (u32, u32),
}

/// Worker configuration, passed once when the renderer is built
#[derive(Clone)]
pub struct WorkerOptions {
    /// Prefix for worker thread names
    pub thread_name: String,
    /// Source of document bytes
    pub fetcher: Arc<dyn Fetch>,
}

impl WorkerOptions {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            thread_name: DEFAULT_WORKER_NAME.to_string(),
            fetcher,
        }
    }
}

impl std::fmt::Debug for WorkerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerOptions")
            .field("thread_name", &self.thread_name)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub struct RendererOptions {
    /// Scale applied to the page's native size
    pub scale: f32,
    /// Dataset key holding the document URL
    pub data_attribute: String,
    pub on_missing_element: MissingElementPolicy,
    pub worker: WorkerOptions,
}

impl RendererOptions {
    pub fn new(worker: WorkerOptions) -> Self {
        Self {
            scale: DEFAULT_SCALE,
            data_attribute: "url".to_string(),
            on_missing_element: MissingElementPolicy::default(),
            worker,
        }
    }

    pub fn from_settings(settings: &Settings, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            scale: settings.scale,
            data_attribute: settings.data_attribute.clone(),
            on_missing_element: settings.on_missing_element,
            worker: WorkerOptions {
                thread_name: settings.worker_thread_name.clone(),
                fetcher,
            },
        }
    }
}

/// Renders page one of a viewer element's document onto its surface
pub struct PageRenderer {
    options: RendererOptions,
    next_request_id: AtomicU64,
}

impl PageRenderer {
    #[must_use]
    pub fn new(options: RendererOptions) -> Self {
        Self {
            options,
            next_request_id: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    /// Start rendering for the element `element_id` of `page`.
    ///
    /// Returns `Ok(None)` without fetching anything when the element is absent
    /// and the missing-element policy is `Ignore`.
    pub fn render(
        &self,
        page: &HostPage,
        element_id: &str,
    ) -> Result<Option<RenderTask>, RenderError> {
        let Some(element) = page.element_by_id(element_id) else {
            return match self.options.on_missing_element {
                MissingElementPolicy::Ignore => {
                    debug!("No #{element_id} element on the page, nothing to render");
                    Ok(None)
                }
                MissingElementPolicy::Error => {
                    Err(RenderError::MissingElement(element_id.to_string()))
                }
            };
        };

        let Some(reference) = element.dataset(&self.options.data_attribute) else {
            return Err(RenderError::MissingSource {
                id: element_id.to_string(),
                attribute: dataset_attribute_name(&self.options.data_attribute),
            });
        };

        if element.canvas().is_none() {
            return Err(RenderError::NotACanvas {
                id: element_id.to_string(),
                tag: element.tag().to_string(),
            });
        }

        let url = page
            .resolve(reference)
            .map_err(|source| RenderError::InvalidSource {
                url: reference.to_string(),
                source,
            })?;

        self.render_url(url).map(Some)
    }

    /// Start rendering page one of the document at `url`
    pub fn render_url(&self, url: Url) -> Result<RenderTask, RenderError> {
        let id = RequestId::new(self.next_request_id.fetch_add(1, Ordering::Relaxed));
        let job = RenderJob {
            id,
            url: url.clone(),
            page: FIRST_PAGE,
            scale: self.options.scale,
        };

        let (response_tx, response_rx) = flume::unbounded();
        let fetcher = Arc::clone(&self.options.worker.fetcher);
        let worker = std::thread::Builder::new()
            .name(format!("{}-{}", self.options.worker.thread_name, id.0))
            .spawn(move || render_worker(job, fetcher, response_tx))
            .map_err(RenderError::Spawn)?;

        debug!("Started render chain {id} for {url}");
        Ok(RenderTask {
            id,
            url,
            state: RenderState::Idle,
            responses: response_rx,
            document: None,
            viewport: None,
            worker: Some(worker),
        })
    }
}

/// Caller-side handle of a running render chain
pub struct RenderTask {
    id: RequestId,
    url: Url,
    state: RenderState,
    responses: Receiver<RenderResponse>,
    document: Option<DocumentInfo>,
    viewport: Option<Viewport>,
    worker: Option<JoinHandle<()>>,
}

impl RenderTask {
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Document metadata, once the document has loaded
    #[must_use]
    pub fn document(&self) -> Option<&DocumentInfo> {
        self.document.as_ref()
    }

    /// Viewport, once the page has loaded
    #[must_use]
    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Apply every stage report that has already arrived.
    ///
    /// Returns `Some` exactly once, when the chain finishes.
    pub fn poll<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
    ) -> Option<Result<RenderOutcome, RenderError>> {
        self.start();
        while !self.state.is_finished() {
            match self.responses.try_recv() {
                Ok(response) => {
                    if let Some(result) = self.apply(response, surface) {
                        return Some(result);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => return Some(self.worker_lost()),
            }
        }
        None
    }

    /// Block until the chain finishes, applying each stage to `surface`
    pub fn wait<S: Surface + ?Sized>(mut self, surface: &mut S) -> Result<RenderOutcome, RenderError> {
        self.start();
        while !self.state.is_finished() {
            let result = match self.responses.recv() {
                Ok(response) => self.apply(response, surface),
                Err(_) => Some(self.worker_lost()),
            };
            if let Some(result) = result {
                return result;
            }
        }
        Err(RenderError::Worker(WorkerFault::generic(format!(
            "render chain {} already finished",
            self.id
        ))))
    }

    fn start(&mut self) {
        if self.state == RenderState::Idle {
            self.state = RenderState::DocumentLoading;
        }
    }

    fn apply<S: Surface + ?Sized>(
        &mut self,
        response: RenderResponse,
        surface: &mut S,
    ) -> Option<Result<RenderOutcome, RenderError>> {
        if response.id() != self.id {
            warn!(
                "Ignoring response for chain {} on chain {}",
                response.id(),
                self.id
            );
            return None;
        }

        match response {
            RenderResponse::DocumentLoaded { info, .. } => {
                debug!("Chain {}: document has {} pages", self.id, info.page_count);
                self.document = Some(info);
                self.state = RenderState::PageLoading;
                None
            }
            RenderResponse::PageLoaded { page, viewport, .. } => {
                let (width, height) = viewport.pixel_size();
                debug!(
                    "Chain {}: page {page} viewport {}x{}, sizing surface to {width}x{height}",
                    self.id, viewport.width, viewport.height
                );
                if let Err(e) = surface.set_size(width, height) {
                    return Some(self.fail(e.into()));
                }
                self.viewport = Some(viewport);
                self.state = RenderState::Rendering;
                None
            }
            RenderResponse::PageRendered { image, .. } => {
                let Some(viewport) = self.viewport else {
                    return Some(self.fail(
                        WorkerFault::generic("page rendered before its viewport was reported")
                            .into(),
                    ));
                };
                surface.draw_page(&image);
                self.state = RenderState::Done;
                self.join_worker();
                info!("Page rendered");
                Some(Ok(RenderOutcome {
                    id: self.id,
                    url: self.url.clone(),
                    document: self.document.clone().unwrap_or_default(),
                    viewport,
                    surface_size: surface.size(),
                }))
            }
            RenderResponse::Error { error, .. } => Some(self.fail(error.into())),
        }
    }

    fn worker_lost(&mut self) -> Result<RenderOutcome, RenderError> {
        self.fail(WorkerFault::generic("render worker exited before finishing").into())
    }

    fn fail(&mut self, error: RenderError) -> Result<RenderOutcome, RenderError> {
        self.state = RenderState::Failed;
        self.join_worker();
        Err(error)
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Render worker for chain {} panicked", self.id);
            }
        }
    }
}

impl std::fmt::Debug for RenderTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTask")
            .field("id", &self.id)
            .field("url", &self.url.as_str())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
