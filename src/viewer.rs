//! Content-loaded trigger for the page viewer

use std::sync::Arc;

use log::warn;

use crate::host::{HostElement, HostPage};
use crate::pdf::Fetch;
use crate::renderer::{PageRenderer, RenderError, RenderOutcome, RendererOptions};
use crate::settings::{FailurePolicy, Settings};

/// Runs one render chain each time a page finishes loading
pub struct Viewer {
    renderer: PageRenderer,
    element_id: String,
    on_failure: FailurePolicy,
}

impl Viewer {
    #[must_use]
    pub fn new(renderer: PageRenderer, element_id: impl Into<String>, on_failure: FailurePolicy) -> Self {
        Self {
            renderer,
            element_id: element_id.into(),
            on_failure,
        }
    }

    pub fn from_settings(settings: &Settings, fetcher: Arc<dyn Fetch>) -> Self {
        let renderer = PageRenderer::new(RendererOptions::from_settings(settings, fetcher));
        Self::new(renderer, settings.element_id.clone(), settings.on_failure)
    }

    #[must_use]
    pub fn renderer(&self) -> &PageRenderer {
        &self.renderer
    }

    #[must_use]
    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    /// Handle the page's "content loaded" event.
    ///
    /// Returns the outcome when a page was drawn onto the viewer canvas,
    /// `Ok(None)` when there was nothing to draw or a failure was logged.
    pub fn on_content_loaded(
        &self,
        page: &mut HostPage,
    ) -> Result<Option<RenderOutcome>, RenderError> {
        match self.run(page) {
            Ok(outcome) => Ok(outcome),
            Err(e) => match self.on_failure {
                FailurePolicy::Log => {
                    warn!("Rendering #{} failed: {e}", self.element_id);
                    Ok(None)
                }
                FailurePolicy::Propagate => Err(e),
            },
        }
    }

    fn run(&self, page: &mut HostPage) -> Result<Option<RenderOutcome>, RenderError> {
        let Some(task) = self.renderer.render(page, &self.element_id)? else {
            return Ok(None);
        };

        let canvas = page
            .element_by_id_mut(&self.element_id)
            .and_then(HostElement::canvas_mut)
            .ok_or_else(|| RenderError::MissingElement(self.element_id.clone()))?;
        task.wait(canvas).map(Some)
    }
}
