//! Durable file-backed vector index.
//!
//! [`FileVectorIndex`] keeps its state in a directory:
//!
//! ```text
//! <dir>/manifest.json     {"format_version": 1, "dimensions": 1536}
//! <dir>/fragments.jsonl   one JSON-encoded fragment per line, append-only
//! ```
//!
//! The full fragment set is replayed into memory on open and searched
//! exactly. Each upsert is appended with a single write followed by
//! `fsync`, and only then published to readers, all under the write lock.
//! The index remembers how many log bytes are committed; bytes past that
//! mark (from a failed write) are cut off before the next append.

use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::document::{Fragment, RetrievalResult};
use crate::error::{RagError, Result};
use crate::similarity::{SearchParams, rank};
use crate::vectorstore::{VectorIndex, validate_dimensions};

const BACKEND: &str = "FileIndex";
const MANIFEST_FILE: &str = "manifest.json";
const LOG_FILE: &str = "fragments.jsonl";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    format_version: u32,
    dimensions: usize,
}

fn unavailable(message: impl Into<String>) -> RagError {
    RagError::IndexUnavailable { backend: BACKEND.to_string(), message: message.into() }
}

/// A vector index persisted to a directory, surviving process restarts.
///
/// # Example
///
/// ```rust,ignore
/// use finops_rag::{FileVectorIndex, VectorIndex};
///
/// let index = FileVectorIndex::open("data/processed/vector_store", 1536).await?;
/// index.upsert(&fragments).await?;
/// ```
#[derive(Debug)]
pub struct FileVectorIndex {
    dir: PathBuf,
    dimensions: usize,
    state: RwLock<LogState>,
}

#[derive(Debug)]
struct LogState {
    fragments: Vec<Fragment>,
    /// Length of the log prefix that holds only complete, acknowledged lines.
    committed_len: u64,
}

impl FileVectorIndex {
    /// Open (or create) the index rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexUnavailable`] if the directory cannot be
    /// created, the files cannot be read, the log is corrupt, or the stored
    /// dimensionality differs from `dimensions`.
    pub async fn open(dir: impl AsRef<Path>, dimensions: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| unavailable(format!("cannot create '{}': {e}", dir.display())))?;

        ensure_manifest(&dir.join(MANIFEST_FILE), dimensions).await?;

        let log_path = dir.join(LOG_FILE);
        let (fragments, needs_rewrite) = replay_log(&log_path, dimensions).await?;
        if needs_rewrite {
            rewrite_log(&log_path, &fragments).await?;
        }
        let committed_len = match tokio::fs::metadata(&log_path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => {
                return Err(unavailable(format!("cannot stat '{}': {e}", log_path.display())));
            }
        };

        info!(
            path = %dir.display(),
            fragment_count = fragments.len(),
            dimensions,
            "opened vector index"
        );

        Ok(Self { dir, dimensions, state: RwLock::new(LogState { fragments, committed_len }) })
    }

    /// The directory holding the index files.
    pub fn path(&self) -> &Path {
        &self.dir
    }
}

async fn ensure_manifest(path: &Path, dimensions: usize) -> Result<()> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let manifest: Manifest = serde_json::from_slice(&bytes)
                .map_err(|e| unavailable(format!("corrupt manifest '{}': {e}", path.display())))?;
            if manifest.format_version != FORMAT_VERSION {
                return Err(unavailable(format!(
                    "unsupported index format version {}",
                    manifest.format_version
                )));
            }
            if manifest.dimensions != dimensions {
                return Err(unavailable(format!(
                    "index was built with {} dimensions, embedder produces {dimensions}",
                    manifest.dimensions
                )));
            }
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let manifest = Manifest { format_version: FORMAT_VERSION, dimensions };
            let bytes = serde_json::to_vec_pretty(&manifest)
                .map_err(|e| unavailable(format!("cannot encode manifest: {e}")))?;
            tokio::fs::write(path, bytes)
                .await
                .map_err(|e| unavailable(format!("cannot write '{}': {e}", path.display())))
        }
        Err(e) => Err(unavailable(format!("cannot read '{}': {e}", path.display()))),
    }
}

/// Load every fragment from the log. The boolean is true when the log must
/// be rewritten: an incomplete final line was dropped, or the last line
/// lacks its newline.
///
/// Lines are parsed as raw bytes, so a tail cut inside a multi-byte
/// character is just another incomplete line.
async fn replay_log(path: &Path, dimensions: usize) -> Result<(Vec<Fragment>, bool)> {
    let contents = match tokio::fs::read(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok((Vec::new(), false)),
        Err(e) => return Err(unavailable(format!("cannot read '{}': {e}", path.display()))),
    };

    let lines: Vec<&[u8]> = contents
        .split(|byte| *byte == b'\n')
        .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
        .collect();
    let mut fragments = Vec::with_capacity(lines.len());
    let mut truncated_tail = false;

    for (number, line) in lines.iter().enumerate() {
        match serde_json::from_slice::<Fragment>(line) {
            Ok(fragment) => fragments.push(fragment),
            Err(e) if number + 1 == lines.len() => {
                warn!(path = %path.display(), error = %e, "dropping incomplete trailing fragment");
                truncated_tail = true;
            }
            Err(e) => {
                return Err(unavailable(format!(
                    "corrupt fragment on line {} of '{}': {e}",
                    number + 1,
                    path.display()
                )));
            }
        }
    }

    validate_dimensions(&fragments, dimensions)
        .map_err(|e| unavailable(format!("stored fragment rejected: {e}")))?;
    let unterminated = contents.last().is_some_and(|byte| *byte != b'\n');
    Ok((fragments, truncated_tail || unterminated))
}

fn encode_lines(fragments: &[Fragment]) -> Result<String> {
    let mut buffer = String::new();
    for fragment in fragments {
        let line = serde_json::to_string(fragment)
            .map_err(|e| unavailable(format!("cannot encode fragment '{}': {e}", fragment.id)))?;
        buffer.push_str(&line);
        buffer.push('\n');
    }
    Ok(buffer)
}

async fn rewrite_log(path: &Path, fragments: &[Fragment]) -> Result<()> {
    let buffer = encode_lines(fragments)?;
    tokio::fs::write(path, buffer)
        .await
        .map_err(|e| unavailable(format!("cannot rewrite '{}': {e}", path.display())))
}

/// Drop anything past `offset`, then write `bytes` there and fsync.
async fn append_at(file: &mut tokio::fs::File, offset: u64, bytes: &[u8]) -> std::io::Result<()> {
    file.set_len(offset).await?;
    file.seek(SeekFrom::Start(offset)).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}

#[async_trait]
impl VectorIndex for FileVectorIndex {
    async fn upsert(&self, fragments: &[Fragment]) -> Result<()> {
        if fragments.is_empty() {
            return Ok(());
        }
        validate_dimensions(fragments, self.dimensions)?;
        let buffer = encode_lines(fragments)?;

        let mut state = self.state.write().await;
        let log_path = self.dir.join(LOG_FILE);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&log_path)
            .await
            .map_err(|e| unavailable(format!("cannot open '{}': {e}", log_path.display())))?;

        let committed = state.committed_len;
        if let Err(e) = append_at(&mut file, committed, buffer.as_bytes()).await {
            if let Err(rollback) = file.set_len(committed).await {
                error!(
                    path = %log_path.display(),
                    error = %rollback,
                    "failed to roll back partial append"
                );
            }
            return Err(unavailable(format!("cannot append to '{}': {e}", log_path.display())));
        }

        state.committed_len = committed + buffer.len() as u64;
        state.fragments.extend_from_slice(fragments);
        debug!(
            added = fragments.len(),
            total = state.fragments.len(),
            "appended fragments to index"
        );
        Ok(())
    }

    async fn search(
        &self,
        embedding: &[f32],
        k: usize,
        diversify: bool,
        params: &SearchParams,
    ) -> Result<RetrievalResult> {
        if embedding.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }
        let state = self.state.read().await;
        Ok(rank(&state.fragments, embedding, k, diversify, params))
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        let log_path = self.dir.join(LOG_FILE);
        tokio::fs::write(&log_path, b"")
            .await
            .map_err(|e| unavailable(format!("cannot truncate '{}': {e}", log_path.display())))?;
        state.fragments.clear();
        state.committed_len = 0;
        info!(path = %self.dir.display(), "cleared vector index");
        Ok(())
    }

    async fn len(&self) -> usize {
        self.state.read().await.fragments.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
