//! PDF rendering infrastructure

mod request;
mod source;
mod types;
mod worker;

pub use request::{RenderJob, RenderResponse, RequestId, WorkerFault};
pub use source::{DEFAULT_USER_AGENT, DocumentFetcher, Fetch, FetchError};
pub use types::*;
pub use worker::{render_page, render_worker};
