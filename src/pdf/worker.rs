//! PDF render worker - runs one render chain in a dedicated thread

use std::sync::Arc;

use flume::Sender;
use log::{debug, info};
use mupdf::{Colorspace, Document, Matrix, Page, Pixmap};

use super::request::{RenderJob, RenderResponse, WorkerFault};
use super::source::Fetch;
use super::types::{DocumentInfo, PageImage, Viewport};
use crate::surface::check_canvas_size;

const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_MIME: &str = "application/pdf";
/// Readers accept junk before the header as long as it starts within this window
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Main worker function - fetch, open, load page, render.
///
/// Every stage reports over `responses` before the next one starts. A failure
/// ends the chain with a single `RenderResponse::Error`.
pub fn render_worker(job: RenderJob, fetcher: Arc<dyn Fetch>, responses: Sender<RenderResponse>) {
    let id = job.id;
    if let Err(error) = run_chain(&job, fetcher.as_ref(), &responses) {
        debug!("Render chain {id} failed: {error}");
        let _ = responses.send(RenderResponse::Error { id, error });
    }
}

fn run_chain(
    job: &RenderJob,
    fetcher: &dyn Fetch,
    responses: &Sender<RenderResponse>,
) -> Result<(), WorkerFault> {
    let id = job.id;

    let bytes = fetcher.fetch(&job.url)?;
    if !has_pdf_header(&bytes) {
        return Err(WorkerFault::NotAPdf {
            url: job.url.clone(),
        });
    }

    let doc = Document::from_bytes(&bytes, PDF_MIME)?;
    let info = document_info(&doc)?;
    info!(
        "Loaded {} ({} pages) for chain {id}",
        job.url, info.page_count
    );
    let page_count = info.page_count;
    if responses
        .send(RenderResponse::DocumentLoaded { id, info })
        .is_err()
    {
        // Task handle dropped, nobody is waiting for the page.
        return Ok(());
    }

    let page = load_page(&doc, job.page, page_count)?;
    let viewport = page_viewport(&page, job.scale)?;
    if responses
        .send(RenderResponse::PageLoaded {
            id,
            page: job.page,
            viewport,
        })
        .is_err()
    {
        return Ok(());
    }

    let (width, height) = viewport.pixel_size();
    check_canvas_size(width, height)?;
    let image = render_page(&page, &viewport)?;
    let _ = responses.send(RenderResponse::PageRendered { id, image });
    Ok(())
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    let window_len = HEADER_SEARCH_WINDOW + PDF_MAGIC.len() - 1;
    let window = &bytes[..bytes.len().min(window_len)];
    window
        .windows(PDF_MAGIC.len())
        .any(|candidate| candidate == PDF_MAGIC)
}

fn document_info(doc: &Document) -> Result<DocumentInfo, WorkerFault> {
    let page_count = usize::try_from(doc.page_count()?).unwrap_or(0);
    let title = doc
        .metadata(mupdf::MetadataName::Title)
        .ok()
        .filter(|t| !t.is_empty());
    Ok(DocumentInfo { page_count, title })
}

/// Load a 1-based page
fn load_page(doc: &Document, page: u32, page_count: usize) -> Result<Page, WorkerFault> {
    let out_of_range = || WorkerFault::PageOutOfRange { page, page_count };
    if page == 0 || page as usize > page_count {
        return Err(out_of_range());
    }
    let index = i32::try_from(page - 1).map_err(|_| out_of_range())?;
    Ok(doc.load_page(index)?)
}

fn page_viewport(page: &Page, scale: f32) -> Result<Viewport, WorkerFault> {
    let bounds = page.bounds()?;
    Ok(Viewport::from_page_size(
        bounds.x1 - bounds.x0,
        bounds.y1 - bounds.y0,
        scale,
    ))
}

/// Rasterize a page at the viewport's scale
pub fn render_page(page: &Page, viewport: &Viewport) -> Result<PageImage, WorkerFault> {
    let transform = Matrix::new_scale(viewport.scale, viewport.scale);
    let rgb = Colorspace::device_rgb();
    let pixmap = page.to_pixmap(&transform, &rgb, false, false)?;

    let pixels = pixmap_to_rgba(&pixmap)?;
    Ok(PageImage {
        pixels,
        width_px: pixmap.width(),
        height_px: pixmap.height(),
    })
}

fn pixmap_to_rgba(pixmap: &Pixmap) -> Result<Vec<u8>, WorkerFault> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(WorkerFault::generic(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    let expected_min = stride.saturating_mul(height);
    if samples.len() < expected_min || row_bytes > stride {
        return Err(WorkerFault::generic("Pixmap buffer size mismatch"));
    }

    let mut out = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        let row_start = y * stride;
        let row = &samples[row_start..row_start + row_bytes];
        for px in row.chunks_exact(n) {
            out.extend_from_slice(&px[..3]);
            out.push(if n > 3 { px[3] } else { u8::MAX });
        }
    }

    Ok(out)
}
