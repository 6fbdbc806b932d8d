//! Document source - fetches document bytes for a resolved URL

use std::path::PathBuf;

use log::debug;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = concat!("pdfcanvas/", env!("CARGO_PKG_VERSION"));

/// Errors while fetching a document or host page
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{url} is not a local file path")]
    NotAFile { url: Url },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: Url, status: u16 },

    #[error("unsupported URL scheme `{0}`")]
    UnsupportedScheme(String),
}

impl FetchError {
    /// HTTP status for failed responses, if the server answered at all
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Retrieves the bytes behind a URL.
///
/// Implementations run on render worker threads.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

/// Fetcher for `file://` and `http(s)://` URLs
pub struct DocumentFetcher {
    client: reqwest::blocking::Client,
}

impl DocumentFetcher {
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    fn fetch_file(url: &Url) -> Result<Vec<u8>, FetchError> {
        let path = url
            .to_file_path()
            .map_err(|()| FetchError::NotAFile { url: url.clone() })?;
        std::fs::read(&path).map_err(|source| FetchError::Io { path, source })
    }

    fn fetch_http(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url.as_str()).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}

impl Fetch for DocumentFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        debug!("Fetching {url}");
        match url.scheme() {
            "file" => Self::fetch_file(url),
            "http" | "https" => self.fetch_http(url),
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }
}
