//! Best-effort persistence of a quote to a running server.
//!
//! Saving tries the server first and falls back to writing the document into
//! a local download directory, the way a browser would download the file
//! when the page cannot reach its server. The operator then replaces the data
//! file by hand.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::api::{SaveResponse, ADMIN_PAGE, DATA_PATH, SAVE_PATH};
use crate::error::{Error, Result};
use crate::quote::Quote;

/// Name the fallback download is written under.
pub const DOWNLOAD_FILE_NAME: &str = "data.json";

/// How the client talks to the server.
///
/// The HTTP implementation is [`HttpTransport`]; tests substitute their own.
#[async_trait]
pub trait SaveTransport: Send + Sync {
    /// True when the server answers the liveness probe.
    async fn probe(&self) -> bool;

    /// Submit the document.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    async fn save(&self, quote: &Quote) -> Result<SaveResponse>;

    /// True when there is no server to talk to at all (a `file:` origin).
    fn is_local_file(&self) -> bool {
        false
    }

    /// Where the editor lives, for operator messages.
    fn admin_url(&self) -> String;
}

/// [`SaveTransport`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: Url,
}

impl HttpTransport {
    /// Create a transport for the server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or the HTTP client cannot
    /// be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| Error::ServerUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base.join(path).map_err(|e| Error::ServerUrl {
            url: self.base.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl SaveTransport for HttpTransport {
    async fn probe(&self) -> bool {
        let Ok(url) = self.endpoint(DATA_PATH) else {
            return false;
        };
        match self.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Liveness probe failed: {}", e);
                false
            }
        }
    }

    async fn save(&self, quote: &Quote) -> Result<SaveResponse> {
        let response = self
            .client
            .post(self.endpoint(SAVE_PATH)?)
            .json(quote)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    fn is_local_file(&self) -> bool {
        self.base.scheme() == "file"
    }

    fn admin_url(&self) -> String {
        self.endpoint(ADMIN_PAGE)
            .map_or_else(|_| self.base.to_string(), |url| url.to_string())
    }
}

/// Why a save ended up as a local download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The editor has no server origin.
    NoServerUrl,
    /// The liveness probe failed.
    ServerUnavailable,
    /// The save request itself failed.
    RequestFailed(String),
}

/// Result of [`SaveClient::save`].
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// The server wrote the document.
    Saved(SaveResponse),
    /// The server answered but refused the document.
    Rejected {
        /// The server's explanation.
        error: String,
    },
    /// The document was written locally instead.
    Downloaded {
        /// Where the file was written.
        path: PathBuf,
        /// Why the server path was abandoned.
        reason: FallbackReason,
    },
}

impl SaveOutcome {
    /// True only when the server wrote the document.
    #[must_use]
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved(_))
    }

    /// Operator-facing explanation and next step.
    #[must_use]
    pub fn message(&self, admin_url: &str) -> String {
        match self {
            Self::Saved(_) => "Data saved successfully.".to_string(),
            Self::Rejected { error } => format!("Save failed: {error}"),
            Self::Downloaded { path, reason } => {
                let next = format!(
                    "To update the file directly:\n1. Start the server: quotesheet serve\n2. Open: {admin_url}"
                );
                match reason {
                    FallbackReason::NoServerUrl => format!(
                        "Downloaded JSON to {}. Replace data.json with it manually.\n\n{next}",
                        path.display()
                    ),
                    FallbackReason::ServerUnavailable => format!(
                        "Server unavailable. Downloaded JSON to {}.\n\n{next}",
                        path.display()
                    ),
                    FallbackReason::RequestFailed(cause) => format!(
                        "Could not reach the server ({cause}). Downloaded JSON to {} instead.\n\n{next}",
                        path.display()
                    ),
                }
            }
        }
    }
}

/// Runs the save fallback chain.
#[derive(Debug)]
pub struct SaveClient<T> {
    transport: T,
    download_dir: PathBuf,
}

impl<T: SaveTransport> SaveClient<T> {
    /// Create a client that falls back to `download_dir`.
    pub fn new(transport: T, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            download_dir: download_dir.into(),
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Save the document, falling back to a local download.
    ///
    /// The document is normalized first, so both paths write the same bytes.
    ///
    /// # Errors
    ///
    /// Returns an error only if the fallback download itself fails.
    pub async fn save(&self, quote: &Quote) -> Result<SaveOutcome> {
        let quote = quote.clone().normalized();

        if self.transport.is_local_file() {
            return self.download(&quote, FallbackReason::NoServerUrl);
        }

        if !self.transport.probe().await {
            warn!("Server unavailable, downloading instead");
            return self.download(&quote, FallbackReason::ServerUnavailable);
        }

        match self.transport.save(&quote).await {
            Ok(response) if response.success => {
                info!("Saved quote to server");
                Ok(SaveOutcome::Saved(response))
            }
            Ok(response) => {
                let error = response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string());
                warn!("Server rejected quote: {}", error);
                Ok(SaveOutcome::Rejected { error })
            }
            Err(e) => {
                warn!("Save request failed: {}", e);
                self.download(&quote, FallbackReason::RequestFailed(e.to_string()))
            }
        }
    }

    fn download(&self, quote: &Quote, reason: FallbackReason) -> Result<SaveOutcome> {
        let path = write_download(&self.download_dir, quote)?;
        info!("Downloaded quote to {}", path.display());
        Ok(SaveOutcome::Downloaded { path, reason })
    }
}

/// Pick `data.json`, then `data (1).json`, `data (2).json`, ... in `dir`.
#[must_use]
pub fn next_download_path(dir: &Path) -> PathBuf {
    let first = dir.join(DOWNLOAD_FILE_NAME);
    if !first.exists() {
        return first;
    }
    let (stem, ext) = DOWNLOAD_FILE_NAME
        .rsplit_once('.')
        .unwrap_or((DOWNLOAD_FILE_NAME, ""));
    (1..)
        .map(|n| dir.join(format!("{stem} ({n}).{ext}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

fn write_download(dir: &Path, quote: &Quote) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|source| Error::DirectoryCreate {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = next_download_path(dir);
    let json = quote.to_pretty_json()?;
    std::fs::write(&path, json).map_err(|source| Error::DataWrite {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
