//! Writing resolved documents to disk.
//!
//! The batch talks to a [`FileSink`]: it checks the destination before any
//! provider call is made, then writes the resolved URL to it. The bundled
//! [`HttpFileSink`] streams the document over HTTP.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large files)
//! - Destination `<output_dir>/<key>.pdf`, key folded to ASCII
//! - Refuses to overwrite unless asked to
//! - Partial files removed on failure

mod client;
mod error;
mod filename;

pub use client::{CONNECT_TIMEOUT_SECS, HttpFileSink, READ_TIMEOUT_SECS};
pub use error::DownloadError;
pub use filename::{destination_path, file_stem_for_key};

use std::path::Path;

use async_trait::async_trait;

/// Destination for resolved documents.
#[async_trait]
pub trait FileSink: Send + Sync {
    /// Verifies that `path` can be written: its directory exists and the file
    /// is absent unless overwriting is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::DestinationMissing`] or [`DownloadError::AlreadyExists`].
    fn check_destination(&self, path: &Path) -> Result<(), DownloadError>;

    /// Fetches `url` into `path`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] for transfer or file system failures.
    async fn write(&self, url: &str, path: &Path) -> Result<u64, DownloadError>;
}

/// Shared destination check used by sink implementations.
///
/// # Errors
///
/// Returns [`DownloadError::DestinationMissing`] when the parent directory is
/// absent or not a directory, [`DownloadError::AlreadyExists`] when the file
/// exists and `overwrite` is false.
pub fn check_destination(path: &Path, overwrite: bool) -> Result<(), DownloadError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.is_dir() {
        return Err(DownloadError::DestinationMissing {
            dir: dir.to_path_buf(),
        });
    }
    if !overwrite && path.exists() {
        return Err(DownloadError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}
