//! Content fetch collaborators
//!
//! Imports and `ref:` entries name other documents by identifier. A
//! [`Fetcher`] turns an identifier into text; the parser never touches the
//! filesystem or network directly.

use std::collections::HashMap;

use tracing::trace;

use crate::error::FetchError;

pub trait Fetcher {
    fn fetch(&self, location: &str) -> Result<String, FetchError>;
}

impl<T: Fetcher + ?Sized> Fetcher for &T {
    fn fetch(&self, location: &str) -> Result<String, FetchError> {
        (**self).fetch(location)
    }
}

impl<T: Fetcher + ?Sized> Fetcher for Box<T> {
    fn fetch(&self, location: &str) -> Result<String, FetchError> {
        (**self).fetch(location)
    }
}

/// Whether `location` carries a `scheme://` prefix.
pub fn is_url(location: &str) -> bool {
    location.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Reads local files. `file://` prefixes are accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

impl Fetcher for FileFetcher {
    fn fetch(&self, location: &str) -> Result<String, FetchError> {
        let path = location.strip_prefix("file://").unwrap_or(location);
        if is_url(path) {
            return Err(FetchError::Unsupported(location.to_string()));
        }
        trace!(path, "reading file");
        Ok(std::fs::read_to_string(path)?)
    }
}

/// Serves documents from memory, keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    documents: HashMap<String, String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, location: impl Into<String>, text: impl Into<String>) {
        self.documents.insert(location.into(), text.into());
    }

    pub fn with(mut self, location: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(location, text);
        self
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, location: &str) -> Result<String, FetchError> {
        self.documents
            .get(location)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(location.to_string()))
    }
}

/// Fetches `http(s)://` identifiers with a blocking client and falls back to
/// [`FileFetcher`] for everything else.
#[cfg(feature = "remote")]
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "remote")]
impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "remote")]
impl Fetcher for HttpFetcher {
    fn fetch(&self, location: &str) -> Result<String, FetchError> {
        if !(location.starts_with("http://") || location.starts_with("https://")) {
            return FileFetcher.fetch(location);
        }
        trace!(url = location, "fetching over http");
        let response = self
            .client
            .get(location)
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Network(format!("{} returned {}", location, status)));
        }
        response
            .text()
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}
