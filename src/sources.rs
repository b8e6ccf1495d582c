//! Catalog Sources
//!
//! Where catalog bytes come from. The index only needs a JSON byte buffer, so
//! retrieval is kept behind [`CatalogSource`] and fails before any parsing.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use reqwest::blocking::Client;
use thiserror::Error;
use tracing::debug;

use crate::catalog::{Catalog, CatalogError};

/// Default timeout for remote catalog requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur while retrieving catalog bytes.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// An HTTP transport error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("catalog request to {url} failed with status {status}")]
    Status {
        /// Requested URL
        url: String,

        /// HTTP status code
        status: u16,
    },

    /// Reading a local catalog failed.
    #[error("failed to read catalog file {}: {source}", .path.display())]
    Io {
        /// Path that could not be read
        path: PathBuf,

        /// The underlying IO error
        source: std::io::Error,
    },
}

/// Errors that can occur while fetching and parsing a catalog.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The catalog could not be retrieved.
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    /// The catalog could not be parsed.
    #[error(transparent)]
    Parse(#[from] CatalogError),
}

/// Supplies raw catalog bytes.
pub trait CatalogSource: fmt::Debug {
    /// Retrieve the catalog bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`RetrievalError`] if the bytes cannot be obtained.
    fn fetch(&self) -> Result<Vec<u8>, RetrievalError>;

    /// Where the catalog comes from, for logs.
    fn location(&self) -> String;
}

/// Fetches the catalog with an HTTP GET request.
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    http: Client,
}

impl HttpSource {
    /// Create a source for `url` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Http`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RetrievalError> {
        Ok(Self {
            url: url.into(),
            http: Client::builder().timeout(timeout).build()?,
        })
    }
}

impl CatalogSource for HttpSource {
    fn fetch(&self) -> Result<Vec<u8>, RetrievalError> {
        let response = self.http.get(&self.url).send()?;

        let status = response.status();

        if !status.is_success() {
            return Err(RetrievalError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes()?.to_vec())
    }

    fn location(&self) -> String {
        self.url.clone()
    }
}

/// Reads the catalog from a local file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Create a source for the file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CatalogSource for FileSource {
    fn fetch(&self) -> Result<Vec<u8>, RetrievalError> {
        fs::read(&self.path).map_err(|source| RetrievalError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Serves catalog bytes already in memory, e.g. an embedded fixture.
#[derive(Debug, Clone)]
pub struct StaticSource {
    bytes: Vec<u8>,
}

impl StaticSource {
    /// Create a source serving `bytes`.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

impl CatalogSource for StaticSource {
    fn fetch(&self) -> Result<Vec<u8>, RetrievalError> {
        Ok(self.bytes.clone())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// Pick a source for a location: `http(s)://` URLs are fetched remotely,
/// anything else is read as a file path.
///
/// # Errors
///
/// Returns [`RetrievalError::Http`] if the HTTP client cannot be built.
pub fn source_for(
    location: &str,
    timeout: Duration,
) -> Result<Box<dyn CatalogSource>, RetrievalError> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Ok(Box::new(HttpSource::new(location, timeout)?))
    } else {
        Ok(Box::new(FileSource::new(location)))
    }
}

/// Retrieve and parse a catalog.
///
/// # Errors
///
/// Returns [`LoadError::Retrieval`] if the bytes cannot be obtained and
/// [`LoadError::Parse`] if they are not a valid catalog.
pub fn fetch_catalog(source: &dyn CatalogSource) -> Result<Catalog, LoadError> {
    let start = Instant::now();

    let bytes = source.fetch()?;

    debug!(
        location = %source.location(),
        bytes = bytes.len(),
        elapsed = ?start.elapsed(),
        "fetched catalog"
    );

    Ok(Catalog::from_slice(&bytes)?)
}
