//! # Acquirer
//!
//! Fetches a remote weights file into a given cache path. Direct files are
//! streamed straight to disk; archives are first copied to a scratch file, then
//! scanned, and only the selected member is written out.
//!
//! Every write goes to a `.part` file next to the target and is renamed into
//! place once complete, so a cache path either holds a whole file or nothing.

use std::fs::File as StdFile;
use std::io::BufWriter as StdBufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use humansize::{BINARY, format_size};
use reqwest::{Client, Response};
use tempfile::NamedTempFile;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use crate::archive::{ArchiveMember, extract_member, scan_members, select_member};
use crate::client::create_client;
use crate::progress::{AcquireState, ProgressCallback, ProgressEvent};
use crate::source::ResourceKind;
use crate::{FetchError, FetcherConfig};

/// Downloads resources and materializes cache entries
pub struct Acquirer {
    client: Client,
    config: FetcherConfig,
    progress: Option<ProgressCallback>,
}

impl Acquirer {
    /// Create a new Acquirer with default configuration
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(FetcherConfig::default())
    }

    /// Create a new Acquirer with custom configuration
    pub fn with_config(config: FetcherConfig) -> Result<Self, FetchError> {
        let client = create_client(&config)?;
        Ok(Self {
            client,
            config,
            progress: None,
        })
    }

    /// Attach a progress callback
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    #[inline]
    fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.progress {
            callback(event);
        }
    }

    fn set_state(&self, url: &Arc<str>, state: AcquireState) {
        debug!(url = %url, %state, "Acquisition state changed");
        self.emit(ProgressEvent::StateChanged {
            url: url.clone(),
            state,
        });
    }

    /// Fetch `url` into `target_path` and return that path.
    #[instrument(skip(self), level = "debug")]
    pub async fn acquire(
        &self,
        url: &str,
        target_path: &Path,
        kind: ResourceKind,
    ) -> Result<PathBuf, FetchError> {
        let url: Arc<str> = Arc::from(url);

        let result = match kind {
            ResourceKind::Direct => self.acquire_direct(&url, target_path).await,
            ResourceKind::Archive => self.acquire_archive(&url, target_path).await,
        };

        match &result {
            Ok(path) => {
                self.set_state(&url, AcquireState::Done);
                self.emit(ProgressEvent::Finished {
                    url: url.clone(),
                    path: path.clone(),
                });
            }
            Err(e) => {
                self.set_state(&url, AcquireState::Failed);
                warn!(url = %url, error = %e, "Acquisition failed");
            }
        }
        result
    }

    async fn acquire_direct(
        &self,
        url: &Arc<str>,
        target_path: &Path,
    ) -> Result<PathBuf, FetchError> {
        self.set_state(url, AcquireState::Downloading);
        let response = self.start_request(url).await?;

        let part = part_file(target_path)?;
        self.download_to(url, response, part.as_file().try_clone()?)
            .await?;
        persist(part, target_path)?;

        Ok(target_path.to_path_buf())
    }

    async fn acquire_archive(
        &self,
        url: &Arc<str>,
        target_path: &Path,
    ) -> Result<PathBuf, FetchError> {
        self.set_state(url, AcquireState::Downloading);
        let response = self.start_request(url).await?;

        // Removed on every exit path when dropped
        let scratch = ScratchArchive::create(&self.config.scratch_dir())?;
        self.download_to(url, response, scratch.file()?).await?;

        self.set_state(url, AcquireState::Scanning);
        let archive_path = scratch.path().to_path_buf();
        let target = self.config.member_target.clone();
        let member = tokio::task::spawn_blocking(move || -> Result<ArchiveMember, FetchError> {
            let members = scan_members(&archive_path)?;
            select_member(&members, &target)
                .cloned()
                .ok_or_else(|| FetchError::MemberNotFound {
                    target: target.suffix(),
                    entries: members.len(),
                })
        })
        .await??;

        info!(
            url = %url,
            member = %member.path,
            size = %format_size(member.size, BINARY),
            "Selected archive member"
        );

        self.set_state(url, AcquireState::Extracting);
        let part = part_file(target_path)?;
        let archive_path = scratch.path().to_path_buf();
        let chunk_size = self.config.chunk_size;
        let progress = self.progress.clone();
        let event_url = url.clone();
        let total_bytes = Some(member.size);

        let part = tokio::task::spawn_blocking(move || -> Result<NamedTempFile, FetchError> {
            let mut part = part;
            let mut report = |bytes: u64| {
                if let Some(callback) = &progress {
                    callback(ProgressEvent::Progress {
                        url: event_url.clone(),
                        bytes,
                        total_bytes,
                    });
                }
            };

            {
                let mut writer = StdBufWriter::with_capacity(chunk_size, part.as_file_mut());
                extract_member(&archive_path, &member, &mut writer, chunk_size, &mut report)?;
            }
            part.as_file().sync_all()?;
            Ok(part)
        })
        .await??;

        persist(part, target_path)?;
        drop(scratch);

        Ok(target_path.to_path_buf())
    }

    /// Send the GET request and reject non-success statuses
    async fn start_request(&self, url: &str) -> Result<Response, FetchError> {
        info!(url = %url, "Starting download request");
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::StatusCode(response.status()));
        }

        if let Some(content_length) = response.content_length() {
            info!(
                url = %url,
                size = %format_size(content_length, BINARY),
                "Download size information available"
            );
        } else {
            debug!(url = %url, "Content length not available");
        }

        Ok(response)
    }

    /// Stream the response body into `file` in chunks of at most `chunk_size` bytes
    async fn download_to(
        &self,
        url: &Arc<str>,
        response: Response,
        file: StdFile,
    ) -> Result<u64, FetchError> {
        let total_bytes = response.content_length();
        let chunk_size = self.config.chunk_size.max(1);
        let mut writer = BufWriter::with_capacity(chunk_size, tokio::fs::File::from_std(file));
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for piece in chunk.chunks(chunk_size) {
                writer.write_all(piece).await?;
                downloaded += piece.len() as u64;
                self.emit(ProgressEvent::Progress {
                    url: url.clone(),
                    bytes: downloaded,
                    total_bytes,
                });
            }
        }

        writer.flush().await?;
        writer.into_inner().sync_all().await?;

        info!(url = %url, size = %format_size(downloaded, BINARY), "Download complete");
        Ok(downloaded)
    }
}

/// Hidden sibling of `target` that receives data before the final rename
fn part_file(target: &Path) -> Result<NamedTempFile, FetchError> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let part = tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".part")
        .tempfile_in(dir)?;
    Ok(part)
}

fn persist(part: NamedTempFile, target: &Path) -> Result<(), FetchError> {
    part.persist(target)
        .map(|_| ())
        .map_err(|e| FetchError::Io(e.error))
}

/// Temporary local copy of a downloaded archive, deleted when dropped
struct ScratchArchive {
    path: PathBuf,
    file: Option<NamedTempFile>,
}

impl ScratchArchive {
    fn create(dir: &Path) -> Result<Self, FetchError> {
        std::fs::create_dir_all(dir)?;
        let file = tempfile::Builder::new()
            .prefix("lorafetch-")
            .suffix(".archive")
            .tempfile_in(dir)?;
        let path = file.path().to_path_buf();
        debug!(path = ?path, "Created temporary archive");
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// A second handle to the underlying file, for writing
    fn file(&self) -> Result<StdFile, FetchError> {
        match &self.file {
            Some(file) => Ok(file.as_file().try_clone()?),
            None => Err(FetchError::Io(std::io::Error::other(
                "temporary archive already released",
            ))),
        }
    }
}

impl Drop for ScratchArchive {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            match file.close() {
                Ok(()) => debug!(path = ?self.path, "Removed temporary archive"),
                Err(e) => {
                    warn!(path = ?self.path, error = %e, "Failed to remove temporary archive")
                }
            }
        }
    }
}
