//! Streaming HTTP file sink.
//!
//! [`HttpFileSink`] fetches a resolved document URL and streams the body to
//! the destination file. A failed transfer never leaves a partial file behind.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::error::DownloadError;
use super::{FileSink, check_destination};
use crate::user_agent;

/// Connect timeout for document downloads.
pub const CONNECT_TIMEOUT_SECS: u64 = 30;
/// Read timeout for document downloads (large scans take a while).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// File sink that downloads over HTTP.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use bibdl_core::download::{FileSink, HttpFileSink};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let sink = HttpFileSink::new(false)?;
/// let path = Path::new("./pdfs/SICP.pdf");
/// sink.check_destination(path)?;
/// let bytes = sink.write("https://example.org/sicp.pdf", path).await?;
/// println!("wrote {bytes} bytes");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpFileSink {
    client: Client,
    overwrite: bool,
}

impl HttpFileSink {
    /// Creates a sink with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(overwrite: bool) -> Result<Self, DownloadError> {
        Self::with_timeouts(overwrite, CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a sink with explicit timeouts in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the HTTP client cannot be built.
    pub fn with_timeouts(
        overwrite: bool,
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, DownloadError> {
        let client = build_client(connect_timeout_secs, read_timeout_secs)?;
        Ok(Self { client, overwrite })
    }

    /// Whether existing files are replaced.
    #[must_use]
    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;

        if !response.status().is_success() {
            return Err(DownloadError::http_status(url, response.status().as_u16()));
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            && content_type
                .split(';')
                .next()
                .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("text/html"))
        {
            return Err(DownloadError::UnexpectedContent {
                url: url.to_string(),
                content_type: content_type.to_string(),
            });
        }

        Ok(response)
    }

    async fn open_destination(&self, path: &Path) -> Result<File, DownloadError> {
        let mut options = OpenOptions::new();
        options.write(true);
        if self.overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        options.open(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                DownloadError::AlreadyExists {
                    path: path.to_path_buf(),
                }
            } else {
                DownloadError::io(path, e)
            }
        })
    }
}

#[async_trait]
impl FileSink for HttpFileSink {
    fn check_destination(&self, path: &Path) -> Result<(), DownloadError> {
        check_destination(path, self.overwrite)
    }

    #[instrument(skip(self, path), fields(url = %url, path = %path.display()))]
    async fn write(&self, url: &str, path: &Path) -> Result<u64, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
        self.check_destination(path)?;

        let response = self.send(url).await?;
        let mut file = self.open_destination(path).await?;

        let stream_result = stream_to_file(&mut file, response, url, path).await;
        if stream_result.is_err() {
            debug!(path = %path.display(), "cleaning up partial file after error");
            drop(file);
            if let Err(error) = tokio::fs::remove_file(path).await {
                warn!(path = %path.display(), error = %error, "failed to remove partial file");
            }
        }
        let bytes_written = stream_result?;

        info!(path = %path.display(), bytes = bytes_written, "download complete");
        Ok(bytes_written)
    }
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;
    Ok(bytes_written)
}

fn build_client(connect_timeout_secs: u64, read_timeout_secs: u64) -> Result<Client, DownloadError> {
    let build = |no_proxy: bool| {
        catch_unwind(AssertUnwindSafe(move || {
            let mut builder = Client::builder()
                .connect_timeout(Duration::from_secs(connect_timeout_secs))
                .timeout(Duration::from_secs(read_timeout_secs))
                .user_agent(user_agent::default_download_user_agent())
                .gzip(true);
            if no_proxy {
                builder = builder.no_proxy();
            }
            builder.build()
        }))
    };

    match build(false) {
        Ok(result) => result.map_err(|e| DownloadError::ClientBuild {
            reason: e.to_string(),
        }),
        Err(_) => {
            warn!("download client hit system proxy panic; building without proxy lookup");
            match build(true) {
                Ok(result) => result.map_err(|e| DownloadError::ClientBuild {
                    reason: e.to_string(),
                }),
                Err(_) => Err(DownloadError::ClientBuild {
                    reason: "client construction panicked while loading proxy settings".to_string(),
                }),
            }
        }
    }
}
