// SPDX-FileCopyrightText: Copyright © 2025-2026 Depot Tools Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Depot download orchestration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{stream, StreamExt, TryStreamExt};
use log::debug;
use sha1::{Digest, Sha1};
use thiserror::Error;
use tokio::fs;

use crypto::Key;
use manifest::Manifest;

use crate::request::{Http, Transport};
use crate::server::Pool;
use crate::{environment, request, server};

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory files are reconstructed beneath
    pub output_dir: PathBuf,
    /// Server pool size, doubling as the chunk fetch concurrency bound
    pub max_servers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            max_servers: environment::DEFAULT_MAX_SERVERS,
        }
    }
}

/// One download run
pub struct DownloadRequest {
    pub manifest_path: PathBuf,
    pub key: Key,
}

/// Messages surfaced to the caller over the lifetime of a run
pub enum Event<'a> {
    Progress(&'a str),
    Finished(&'a Summary),
    Failed(&'a Error),
}

/// Terminal outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    /// Every scheduled file was written
    Completed {
        depot_id: u64,
        files: usize,
        elapsed: Duration,
    },
    /// Resume filtering left nothing to download
    NothingToDo { depot_id: u64 },
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Summary::Completed {
                depot_id,
                files,
                elapsed,
            } => {
                write!(f, "downloaded depot {depot_id}: {files} files in {elapsed:.2?}")
            }
            Summary::NothingToDo { depot_id } => write!(f, "depot {depot_id}: nothing to do"),
        }
    }
}

/// A depot download client
pub struct Client {
    config: Config,
    transport: Arc<dyn Transport>,
}

impl Client {
    pub fn new(config: Config) -> Self {
        Self::with_transport(config, Http)
    }

    /// Construct with a custom transport (local mirrors, tests)
    pub fn with_transport(config: Config, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
        }
    }

    /// Download every file the manifest describes into
    /// `{output_dir}/{depot_id}/`.
    ///
    /// Files already on disk with the declared byte length are skipped;
    /// completeness is judged by size alone, not content hash. The first
    /// failing operation aborts the run and drops in-flight siblings;
    /// anything fully written before the failure stays on disk and is
    /// picked up by the resume filter next run.
    pub async fn download(
        &self,
        request: DownloadRequest,
        on_event: impl Fn(Event<'_>) + Sync,
    ) -> Result<Summary, Error> {
        let result = self.run(&request, &on_event).await;

        match &result {
            Ok(summary) => on_event(Event::Finished(summary)),
            Err(error) => on_event(Event::Failed(error)),
        }

        result
    }

    async fn run(
        &self,
        request: &DownloadRequest,
        on_event: &(dyn Fn(Event<'_>) + Sync),
    ) -> Result<Summary, Error> {
        on_event(Event::Progress("parsing manifest"));
        let bytes = fs::read(&request.manifest_path).await?;
        let mut parsed = manifest::parse(&bytes)?;
        if parsed.filenames_encrypted {
            parsed.decrypt_filenames(&request.key)?;
        }
        let depot_id = parsed.depot_id;

        on_event(Event::Progress("filtering completed files"));
        let files = resolve_files(&self.config.output_dir, &parsed);
        let scheduled = filter_complete(files).await;
        if scheduled.is_empty() {
            return Ok(Summary::NothingToDo { depot_id });
        }

        on_event(Event::Progress("creating directories"));
        for file in &scheduled {
            if let Some(parent) = file.path.parent() {
                fs::create_dir_all(parent).await?;
            }
        }

        on_event(Event::Progress("resolving server pool"));
        let pool = Pool::resolve(self.transport.as_ref(), self.config.max_servers).await?;
        debug!("resolved {} cdn servers", pool.len());

        on_event(Event::Progress("downloading depot"));
        let start = Instant::now();

        let run = RunContext {
            depot_id,
            pool,
            transport: self.transport.as_ref(),
            key: &request.key,
            total_files: scheduled.len(),
            files_done: AtomicUsize::new(0),
            on_event,
        };
        let total = scheduled.len();
        run.download_all(scheduled).await?;

        Ok(Summary::Completed {
            depot_id,
            files: total,
            elapsed: start.elapsed(),
        })
    }
}

/// A file entry resolved to its on-disk destination
#[derive(Debug, Clone, PartialEq, Eq)]
struct QueuedFile {
    path: PathBuf,
    size: u64,
    chunks: Vec<manifest::Chunk>,
}

/// State owned by a single run and threaded through every chunk
/// operation
struct RunContext<'a> {
    depot_id: u64,
    pool: Pool,
    transport: &'a dyn Transport,
    key: &'a Key,
    total_files: usize,
    files_done: AtomicUsize,
    on_event: &'a (dyn Fn(Event<'_>) + Sync),
}

impl RunContext<'_> {
    /// Drive every scheduled file to disk. The pool size bounds the
    /// total number of in-flight chunk operations across both phases;
    /// the first error drops the stream and cancels unfinished siblings.
    async fn download_all(&self, scheduled: Vec<QueuedFile>) -> Result<(), Error> {
        let limit = self.pool.len();
        let (single, multi): (Vec<_>, Vec<_>) =
            scheduled.into_iter().partition(|file| file.chunks.len() == 1);

        // Single chunk files are each their own unit of work
        stream::iter(single.iter().map(|file| async move {
            let bytes = self.process_chunk(&file.chunks[0]).await?;
            write_file(file, bytes).await?;
            self.files_done.fetch_add(1, Ordering::Relaxed);
            self.chunk_progress(file, 1);
            Ok(()) as Result<(), Error>
        }))
        .buffer_unordered(limit)
        .try_collect::<Vec<_>>()
        .await?;

        // Multi chunk files are reassembled one file at a time with all
        // of the current file's chunks in flight together, joined back
        // in offset order
        for file in &multi {
            let resolved = AtomicUsize::new(0);
            let buffers = stream::iter(file.chunks.iter().map(|chunk| {
                let resolved = &resolved;
                async move {
                    let bytes = self.process_chunk(chunk).await?;
                    self.chunk_progress(file, resolved.fetch_add(1, Ordering::Relaxed) + 1);
                    Ok(bytes) as Result<_, Error>
                }
            }))
            .buffered(limit)
            .try_collect::<Vec<_>>()
            .await?;

            write_file(file, buffers.concat()).await?;
            self.files_done.fetch_add(1, Ordering::Relaxed);
            self.chunk_progress(file, file.chunks.len());
        }

        Ok(())
    }

    /// Fetch, decrypt, decompress and verify one chunk
    async fn process_chunk(&self, chunk: &manifest::Chunk) -> Result<Vec<u8>, Error> {
        let server = self.pool.next();
        let url = server.chunk_url(self.depot_id, &chunk.sha)?;
        debug!("fetching {url}");

        let raw = self.transport.fetch(url).await?;
        let decrypted = crypto::symmetric_decrypt(&raw, self.key, false)?;
        let plain = chunk::unpack(&decrypted)?;

        // The content hash is the sole authority that the chunk arrived
        // and decoded intact
        let computed = hex::encode(Sha1::digest(&plain));
        if computed != chunk.sha {
            return Err(Error::ChunkHashMismatch {
                expected: chunk.sha.clone(),
                computed,
            });
        }

        Ok(plain)
    }

    fn chunk_progress(&self, file: &QueuedFile, resolved_chunks: usize) {
        let depot_pct =
            self.files_done.load(Ordering::Relaxed) as f64 / self.total_files as f64 * 100.0;
        let file_pct = resolved_chunks as f64 / file.chunks.len() as f64 * 100.0;
        let text = format!(
            "{depot_pct:6.2}% | {file_pct:6.2}% - {}",
            file.path.display()
        );
        (self.on_event)(Event::Progress(&text));
    }
}

/// Join each entry onto the output root, smallest files first.
/// Wire paths use backslash separators; they become `/` here.
fn resolve_files(output_dir: &Path, parsed: &Manifest) -> Vec<QueuedFile> {
    let depot_dir = output_dir.join(parsed.depot_id.to_string());

    let mut files: Vec<_> = parsed
        .files
        .iter()
        .map(|file| QueuedFile {
            path: depot_dir.join(file.filename.replace('\\', "/")),
            size: file.size,
            chunks: file.chunks.clone(),
        })
        .collect();
    files.sort_by_key(|file| file.size);
    files
}

/// Coarse resumability: keep only entries whose output is missing or has
/// the wrong byte length. Content is not re-verified.
async fn filter_complete(files: Vec<QueuedFile>) -> Vec<QueuedFile> {
    let mut scheduled = Vec::with_capacity(files.len());

    for file in files {
        match fs::metadata(&file.path).await {
            Ok(existing) if existing.len() == file.size => {
                debug!("already complete: {}", file.path.display());
            }
            _ => scheduled.push(file),
        }
    }

    scheduled
}

/// Write a fully reassembled file, enforcing the declared size
async fn write_file(file: &QueuedFile, bytes: Vec<u8>) -> Result<(), Error> {
    if bytes.len() as u64 != file.size {
        return Err(Error::SizeMismatch {
            path: file.path.clone(),
            declared: file.size,
            got: bytes.len() as u64,
        });
    }

    fs::write(&file.path, bytes).await?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("manifest format")]
    Manifest(#[from] manifest::Error),
    #[error("filename decryption")]
    FilenameDecrypt(#[from] manifest::DecryptError),
    #[error("chunk decryption")]
    Crypto(#[from] crypto::Error),
    #[error("chunk decompression")]
    Unpack(#[from] chunk::Error),
    #[error("chunk content hash mismatch: expected {expected}, computed {computed}")]
    ChunkHashMismatch { expected: String, computed: String },
    #[error("{}: reassembled {got} bytes, manifest declares {declared}", .path.display())]
    SizeMismatch {
        path: PathBuf,
        declared: u64,
        got: u64,
    },
    #[error("server pool")]
    Server(#[from] server::Error),
    #[error("chunk fetch")]
    Fetch(#[from] request::Error),
    #[error("io")]
    Io(#[from] std::io::Error),
}
