mod common;

use std::sync::Arc;

use common::{TestServer, empty_pdf, page_at, single_page_pdf, write_site};
use pdfcanvas::pdf::{DEFAULT_USER_AGENT, DocumentFetcher, FetchError, WorkerFault};
use pdfcanvas::settings::FailurePolicy;
use pdfcanvas::{HostPage, RenderError, RenderState, Settings, Surface, SurfaceError, Viewer};

fn fetcher() -> Arc<DocumentFetcher> {
    Arc::new(DocumentFetcher::new(DEFAULT_USER_AGENT).unwrap())
}

fn strict_viewer() -> Viewer {
    let settings = Settings {
        on_failure: FailurePolicy::Propagate,
        ..Settings::default()
    };
    Viewer::from_settings(&settings, fetcher())
}

fn canvas_size(page: &HostPage) -> (u32, u32) {
    page.element_by_id("pdf-viewer")
        .and_then(|el| el.canvas())
        .map(|c| c.size())
        .unwrap()
}

#[test]
fn letter_page_renders_at_one_and_a_half_scale() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_site(dir.path(), &single_page_pdf(612.0, 792.0, 0));
    let mut page = HostPage::load(path.to_str().unwrap(), fetcher().as_ref()).unwrap();
    assert_eq!(canvas_size(&page), (300, 150));

    let outcome = strict_viewer()
        .on_content_loaded(&mut page)
        .unwrap()
        .expect("viewer canvas present");

    assert_eq!(outcome.surface_size, (918, 1188));
    assert_eq!(outcome.viewport.pixel_size(), (918, 1188));
    assert_eq!(outcome.document.page_count, 1);
    assert_eq!(outcome.document.title.as_deref(), Some("Sample Book"));
    assert_eq!(canvas_size(&page), (918, 1188));

    let canvas = page.element_by_id("pdf-viewer").unwrap().canvas().unwrap();
    assert_eq!(canvas.pixel(459, 594), Some([255, 0, 0, 255]));
}

#[test]
fn fractional_sizes_round_up() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_site(dir.path(), &single_page_pdf(595.0, 842.0, 0));
    let mut page = HostPage::load(path.to_str().unwrap(), fetcher().as_ref()).unwrap();

    let outcome = strict_viewer().on_content_loaded(&mut page).unwrap().unwrap();
    assert_eq!(outcome.surface_size, (893, 1263));
    assert_eq!(canvas_size(&page), (893, 1263));
}

#[test]
fn rotated_page_swaps_viewport() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_site(dir.path(), &single_page_pdf(612.0, 792.0, 90));
    let mut page = HostPage::load(path.to_str().unwrap(), fetcher().as_ref()).unwrap();

    let outcome = strict_viewer().on_content_loaded(&mut page).unwrap().unwrap();
    assert_eq!(outcome.surface_size, (1188, 918));
}

#[test]
fn two_content_loaded_events_run_independent_chains() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_site(dir.path(), &single_page_pdf(612.0, 792.0, 0));
    let source = path.to_str().unwrap();
    let viewer = strict_viewer();

    let mut first = HostPage::load(source, fetcher().as_ref()).unwrap();
    let mut second = HostPage::load(source, fetcher().as_ref()).unwrap();
    let a = viewer.on_content_loaded(&mut first).unwrap().unwrap();
    let b = viewer.on_content_loaded(&mut second).unwrap().unwrap();

    assert_ne!(a.id, b.id);
    assert_eq!(a.surface_size, b.surface_size);
    assert_eq!(canvas_size(&first), (918, 1188));
    assert_eq!(canvas_size(&second), (918, 1188));
}

#[test]
fn concurrent_tasks_do_not_interfere() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_site(dir.path(), &single_page_pdf(612.0, 792.0, 0));
    let page = HostPage::load(path.to_str().unwrap(), fetcher().as_ref()).unwrap();
    let viewer = strict_viewer();

    let first = viewer.renderer().render(&page, "pdf-viewer").unwrap().unwrap();
    let second = viewer.renderer().render(&page, "pdf-viewer").unwrap().unwrap();

    let mut canvas_a = pdfcanvas::Canvas::default();
    let mut canvas_b = pdfcanvas::Canvas::new(10, 10).unwrap();
    let b = second.wait(&mut canvas_b).unwrap();
    let a = first.wait(&mut canvas_a).unwrap();

    assert_ne!(a.id, b.id);
    assert_eq!(canvas_a.size(), (918, 1188));
    assert_eq!(canvas_b.size(), (918, 1188));
}

#[test]
fn served_document_renders() {
    let server = TestServer::start(200, single_page_pdf(612.0, 792.0, 0), 1);
    let mut page = page_at(&server.url("/books/1"), "/uploads/doc.pdf");

    let outcome = strict_viewer().on_content_loaded(&mut page).unwrap().unwrap();
    assert_eq!(outcome.surface_size, (918, 1188));
    assert_eq!(server.join(), vec!["/uploads/doc.pdf".to_string()]);
}

#[test]
fn not_found_leaves_canvas_at_defaults() {
    let server = TestServer::start(404, b"Not Found".to_vec(), 1);
    let mut page = page_at(&server.url("/books/1"), "/uploads/missing.pdf");

    let err = strict_viewer().on_content_loaded(&mut page).unwrap_err();
    assert!(
        matches!(
            err,
            RenderError::Worker(WorkerFault::Fetch(FetchError::Status { status: 404, .. }))
        ),
        "{err:?}"
    );
    assert_eq!(canvas_size(&page), (300, 150));
    server.join();
}

#[test]
fn not_found_is_only_logged_by_default() {
    let server = TestServer::start(404, Vec::new(), 1);
    let mut page = page_at(&server.url("/"), "missing.pdf");
    let viewer = Viewer::from_settings(&Settings::default(), fetcher());

    assert!(viewer.on_content_loaded(&mut page).unwrap().is_none());
    assert_eq!(canvas_size(&page), (300, 150));
    server.join();
}

#[test]
fn html_instead_of_pdf_is_rejected() {
    let server = TestServer::start(200, b"<html>login required</html>".to_vec(), 1);
    let mut page = page_at(&server.url("/"), "doc.pdf");

    let err = strict_viewer().on_content_loaded(&mut page).unwrap_err();
    assert!(matches!(err, RenderError::Worker(WorkerFault::NotAPdf { .. })), "{err:?}");
    assert_eq!(canvas_size(&page), (300, 150));
    server.join();
}

#[test]
fn document_without_pages_is_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_site(dir.path(), &empty_pdf());
    let mut page = HostPage::load(path.to_str().unwrap(), fetcher().as_ref()).unwrap();

    let err = strict_viewer().on_content_loaded(&mut page).unwrap_err();
    assert!(
        matches!(
            err,
            RenderError::Worker(WorkerFault::PageOutOfRange {
                page: 1,
                page_count: 0
            })
        ),
        "{err:?}"
    );
    assert_eq!(canvas_size(&page), (300, 150));
}

#[test]
fn oversized_page_fails_without_resizing() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_site(dir.path(), &single_page_pdf(30000.0, 30000.0, 0));
    let mut page = HostPage::load(path.to_str().unwrap(), fetcher().as_ref()).unwrap();

    let err = strict_viewer().on_content_loaded(&mut page).unwrap_err();
    assert!(
        matches!(
            err,
            RenderError::Surface(SurfaceError::TooLarge {
                width: 45000,
                height: 45000
            })
        ),
        "{err:?}"
    );
    assert_eq!(canvas_size(&page), (300, 150));
}

#[test]
fn task_reports_each_stage() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_site(dir.path(), &single_page_pdf(612.0, 792.0, 0));
    let page = HostPage::load(path.to_str().unwrap(), fetcher().as_ref()).unwrap();
    let viewer = strict_viewer();

    let mut task = viewer.renderer().render(&page, "pdf-viewer").unwrap().unwrap();
    assert_eq!(task.state(), RenderState::Idle);

    let mut canvas = pdfcanvas::Canvas::default();
    let outcome = loop {
        if let Some(result) = task.poll(&mut canvas) {
            break result.unwrap();
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    };

    assert_eq!(task.state(), RenderState::Done);
    assert_eq!(task.viewport(), Some(outcome.viewport));
    assert_eq!(task.document().map(|d| d.page_count), Some(1));
    assert_eq!(canvas.size(), (918, 1188));
}
