use std::cell::RefCell;
use std::path::Path;

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use log::{debug, warn};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use url::Url;

use crate::pdf::{Fetch, FetchError};
use crate::surface::{Canvas, DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH};

/// Errors while loading a host page
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("loading host page: {0}")]
    Fetch(#[from] FetchError),

    #[error("cannot resolve host page location {source_ref:?}: {reason}")]
    Location { source_ref: String, reason: String },
}

/// An element of the host page that carries an `id`
#[derive(Clone, Debug)]
pub struct HostElement {
    id: String,
    tag: String,
    attributes: Vec<(String, String)>,
    canvas: Option<Canvas>,
}

impl HostElement {
    fn new(id: String, tag: String, attributes: Vec<(String, String)>) -> Self {
        let canvas = (tag == "canvas").then(|| {
            let width = parse_dimension(&attributes, "width").unwrap_or(DEFAULT_CANVAS_WIDTH);
            let height = parse_dimension(&attributes, "height").unwrap_or(DEFAULT_CANVAS_HEIGHT);
            Canvas::new(width, height).unwrap_or_else(|e| {
                warn!("Canvas #{id}: {e}, using the default size");
                Canvas::default()
            })
        });
        Self {
            id,
            tag,
            attributes,
            canvas,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Lowercase tag name
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Look up a `data-*` attribute by its dataset key (`pdfUrl` -> `data-pdf-url`)
    #[must_use]
    pub fn dataset(&self, key: &str) -> Option<&str> {
        self.attribute(&dataset_attribute_name(key))
    }

    /// 2D drawing surface, present only for `<canvas>` elements
    #[must_use]
    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    pub fn canvas_mut(&mut self) -> Option<&mut Canvas> {
        self.canvas.as_mut()
    }
}

/// Convert a camelCase dataset key to its `data-kebab-case` attribute name
#[must_use]
pub fn dataset_attribute_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 8);
    name.push_str("data-");
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            name.push('-');
            name.push(c.to_ascii_lowercase());
        } else {
            name.push(c);
        }
    }
    name
}

/// HTML non-negative integer: optional leading whitespace and `+`, then the
/// leading digits. Anything after the digits is ignored.
fn parse_dimension(attributes: &[(String, String)], name: &str) -> Option<u32> {
    let (_, value) = attributes.iter().find(|(attr, _)| attr == name)?;
    let value = value.trim_start_matches(|c: char| c.is_ascii_whitespace());
    let value = value.strip_prefix('+').unwrap_or(value);
    let digits = value.len() - value.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    // Too many digits for u32 is an oversized canvas, not a missing one.
    Some(value[..digits].parse().unwrap_or(u32::MAX))
}

/// A parsed host page: its location and every element addressable by id
#[derive(Clone, Debug, Default)]
pub struct HostPage {
    location: Option<Url>,
    base: Option<Url>,
    title: Option<String>,
    elements: Vec<HostElement>,
}

impl HostPage {
    /// Parse HTML. `location` is where the page was loaded from and anchors
    /// relative URLs.
    #[must_use]
    pub fn parse(html: &str, location: Option<Url>) -> Self {
        let dom = parse_document(RcDom::default(), Default::default()).one(html);

        let mut collector = Collector::default();
        collector.visit(&dom.document);

        let base = collector
            .base_href
            .and_then(|href| match &location {
                Some(loc) => loc.join(&href).ok(),
                None => Url::parse(&href).ok(),
            })
            .or_else(|| location.clone());

        debug!(
            "Parsed host page with {} identified elements",
            collector.elements.len()
        );

        Self {
            location,
            base,
            title: collector.title,
            elements: collector.elements,
        }
    }

    /// Load a host page from a filesystem path or a URL
    pub fn load(source: &str, fetcher: &dyn Fetch) -> Result<Self, HostError> {
        let location = page_location(source)?;
        let bytes = fetcher.fetch(&location)?;
        let html = String::from_utf8_lossy(&bytes);
        Ok(Self::parse(&html, Some(location)))
    }

    #[must_use]
    pub fn location(&self) -> Option<&Url> {
        self.location.as_ref()
    }

    /// URL relative references resolve against: `<base href>` or the location
    #[must_use]
    pub fn base_url(&self) -> Option<&Url> {
        self.base.as_ref()
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Resolve a URL as found in the page
    pub fn resolve(&self, reference: &str) -> Result<Url, url::ParseError> {
        match &self.base {
            Some(base) => base.join(reference.trim()),
            None => Url::parse(reference.trim()),
        }
    }

    #[must_use]
    pub fn element_by_id(&self, id: &str) -> Option<&HostElement> {
        self.elements.iter().find(|el| el.id == id)
    }

    pub fn element_by_id_mut(&mut self, id: &str) -> Option<&mut HostElement> {
        self.elements.iter_mut().find(|el| el.id == id)
    }
}

fn page_location(source: &str) -> Result<Url, HostError> {
    if let Ok(url) = Url::parse(source) {
        if matches!(url.scheme(), "http" | "https" | "file") {
            return Ok(url);
        }
    }

    let location_err = |reason: String| HostError::Location {
        source_ref: source.to_string(),
        reason,
    };
    let path = std::fs::canonicalize(Path::new(source)).map_err(|e| location_err(e.to_string()))?;
    Url::from_file_path(&path).map_err(|()| location_err("not an absolute path".to_string()))
}

#[derive(Default)]
struct Collector {
    elements: Vec<HostElement>,
    base_href: Option<String>,
    title: Option<String>,
}

impl Collector {
    fn visit(&mut self, node: &Handle) {
        if let NodeData::Element {
            ref name,
            ref attrs,
            ..
        } = node.data
        {
            let tag = name.local.to_string();
            let attributes = collect_attributes(attrs);

            if tag == "base" && self.base_href.is_none() {
                self.base_href = attributes
                    .iter()
                    .find(|(attr, _)| attr == "href")
                    .map(|(_, value)| value.clone());
            }
            if tag == "title" && self.title.is_none() {
                let text = text_content(node);
                let text = text.trim();
                if !text.is_empty() {
                    self.title = Some(text.to_string());
                }
            }

            let id = attributes
                .iter()
                .find(|(attr, _)| attr == "id")
                .map(|(_, value)| value.clone());
            if let Some(id) = id {
                if self.elements.iter().any(|el| el.id == id) {
                    warn!("Duplicate element id {id:?}, keeping the first occurrence");
                } else {
                    self.elements.push(HostElement::new(id, tag, attributes));
                }
            }
        }

        for child in node.children.borrow().iter() {
            self.visit(child);
        }
    }
}

fn collect_attributes(attrs: &RefCell<Vec<html5ever::Attribute>>) -> Vec<(String, String)> {
    attrs
        .borrow()
        .iter()
        .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
        .collect()
}

fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    for child in node.children.borrow().iter() {
        match child.data {
            NodeData::Text { ref contents } => text.push_str(&contents.borrow()),
            NodeData::Element { .. } => text.push_str(&text_content(child)),
            _ => {}
        }
    }
    text
}
