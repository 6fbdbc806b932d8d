//! Render the first page of the PDF referenced by a host page's viewer canvas.
//!
//! A [`Viewer`] handles the page's "content loaded" event: it looks up the
//! viewer element (`#pdf-viewer` by default), reads the document URL from its
//! `data-url` attribute and runs a [`PageRenderer`] chain that loads the
//! document, takes page one, sizes the canvas to the page's viewport at scale
//! 1.5 and draws the page into it.

pub mod host;
pub mod panic_handler;
pub mod pdf;
pub mod renderer;
pub mod settings;
pub mod surface;
pub mod viewer;

pub use host::{HostElement, HostPage};
pub use renderer::{PageRenderer, RenderError, RenderOutcome, RenderState, RenderTask};
pub use settings::Settings;
pub use surface::{Canvas, Surface, SurfaceError};
pub use viewer::Viewer;
