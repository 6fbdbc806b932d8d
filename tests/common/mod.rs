#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use pdfcanvas::HostPage;
use url::Url;

/// Build a one-page PDF whose page is filled solid red
pub fn single_page_pdf(width: f32, height: f32, rotate: i32) -> Vec<u8> {
    let content = format!("1 0 0 rg 0 0 {width} {height} re f\n");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {width} {height}] /Rotate {rotate} \
             /Resources << >> /Contents 4 0 R >>"
        ),
        format!(
            "<< /Length {} >>\nstream\n{content}endstream",
            content.len()
        ),
        "<< /Title (Sample Book) >>".to_string(),
    ];
    assemble_pdf(&objects)
}

/// Build a PDF whose page tree is empty
pub fn empty_pdf() -> Vec<u8> {
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [] /Count 0 >>".to_string(),
        "<< /Title (Empty) >>".to_string(),
    ];
    assemble_pdf(&objects)
}

/// Number `objects` from 1 and write them with an xref table. The last
/// object is the document info dictionary.
fn assemble_pdf(objects: &[String]) -> Vec<u8> {
    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, object) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{object}\nendobj\n", i + 1).as_bytes());
    }

    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            objects.len() + 1,
            objects.len()
        )
        .as_bytes(),
    );
    out
}

pub fn viewer_html(data_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Book</title></head>
<body>
  <canvas id="pdf-viewer" data-url="{data_url}"></canvas>
</body>
</html>"#
    )
}

/// Write `doc.pdf` and `index.html` into `dir`, returning the page path
pub fn write_site(dir: &Path, pdf: &[u8]) -> PathBuf {
    std::fs::write(dir.join("doc.pdf"), pdf).unwrap();
    let page = dir.join("index.html");
    std::fs::write(&page, viewer_html("doc.pdf")).unwrap();
    page
}

/// Parse a viewer page located at `location`
pub fn page_at(location: &str, data_url: &str) -> HostPage {
    HostPage::parse(&viewer_html(data_url), Some(Url::parse(location).unwrap()))
}

/// Local HTTP server answering `requests` requests with a fixed response
pub struct TestServer {
    pub base: String,
    pub paths: Arc<Mutex<Vec<String>>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub fn start(status: u16, body: Vec<u8>, requests: usize) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        let paths = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&paths);

        let handle = std::thread::spawn(move || {
            for _ in 0..requests {
                let Ok(request) = server.recv() else {
                    break;
                };
                seen.lock().unwrap().push(request.url().to_string());
                let response =
                    tiny_http::Response::from_data(body.clone()).with_status_code(status);
                let _ = request.respond(response);
            }
        });

        Self {
            base: format!("http://127.0.0.1:{port}"),
            paths,
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub fn join(mut self) -> Vec<String> {
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
        self.paths.lock().unwrap().clone()
    }
}
