//! Persistent log of uploaded files and their chunk counts.
//!
//! Two JSON files live in the data directory:
//!
//! - `uploaded_files.json` - sorted array of every filename ever ingested
//! - `chunk_log.json` - object mapping filename to its latest chunk count
//!
//! A single task owns both files. Handles send it commands over a channel, so
//! concurrent uploads are serialized and no update is lost. Every mutation
//! rewrites both files through a `*.json.tmp` sibling and a rename.

use crate::types::{AppError, FileDetail, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};

pub const FILES_LOG_NAME: &str = "uploaded_files.json";
pub const CHUNK_LOG_NAME: &str = "chunk_log.json";

const COMMAND_BUFFER: usize = 64;

enum Command {
    Record {
        filename: String,
        chunks: usize,
        reply: oneshot::Sender<Result<Option<usize>>>,
    },
    Files {
        reply: oneshot::Sender<Vec<String>>,
    },
    Details {
        reply: oneshot::Sender<Vec<FileDetail>>,
    },
    ChunkCount {
        filename: String,
        reply: oneshot::Sender<Option<usize>>,
    },
}

/// Handle to the upload log task. Cheap to clone.
#[derive(Clone)]
pub struct UploadLog {
    tx: mpsc::Sender<Command>,
    data_dir: PathBuf,
}

#[derive(Clone, Default)]
struct LogState {
    files: BTreeSet<String>,
    chunks: BTreeMap<String, usize>,
}

impl UploadLog {
    /// Load the log from `data_dir` (creating the directory if needed) and
    /// start the writer task.
    ///
    /// Missing files start empty. Unparseable files are logged and treated
    /// as empty; they are replaced on the next write.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir).await.map_err(|e| {
            AppError::LogIo(format!("cannot create {}: {}", data_dir.display(), e))
        })?;

        let files: Vec<String> = load_json(&data_dir.join(FILES_LOG_NAME)).await?;
        let chunks: BTreeMap<String, usize> = load_json(&data_dir.join(CHUNK_LOG_NAME)).await?;
        let state = LogState {
            files: files.into_iter().collect(),
            chunks,
        };
        tracing::debug!(
            dir = %data_dir.display(),
            files = state.files.len(),
            "Loaded upload log"
        );

        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(run(data_dir.clone(), state, rx));

        Ok(Self { tx, data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Record an ingestion of `filename` producing `chunks` chunks.
    ///
    /// Returns the chunk count of the previous ingestion, if any.
    pub async fn record(&self, filename: &str, chunks: usize) -> Result<Option<usize>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Record {
            filename: filename.to_string(),
            chunks,
            reply,
        })
        .await?;
        rx.await.map_err(|_| writer_gone())?
    }

    /// Uploaded filenames, sorted.
    pub async fn files(&self) -> Result<Vec<String>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Files { reply }).await?;
        rx.await.map_err(|_| writer_gone())
    }

    /// `(filename, chunks)` pairs sorted by filename.
    pub async fn details(&self) -> Result<Vec<FileDetail>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Details { reply }).await?;
        rx.await.map_err(|_| writer_gone())
    }

    /// Chunk count recorded for `filename`.
    pub async fn chunk_count(&self, filename: &str) -> Result<Option<usize>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::ChunkCount {
            filename: filename.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| writer_gone())
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).await.map_err(|_| writer_gone())
    }
}

fn writer_gone() -> AppError {
    AppError::LogIo("upload log writer is not running".to_string())
}

async fn run(data_dir: PathBuf, mut state: LogState, mut rx: mpsc::Receiver<Command>) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Record {
                filename,
                chunks,
                reply,
            } => {
                let previous = state.chunks.get(&filename).copied();
                let mut next = state.clone();
                next.files.insert(filename.clone());
                next.chunks.insert(filename.clone(), chunks);

                let result = match persist(&data_dir, &next).await {
                    Ok(()) => {
                        state = next;
                        tracing::debug!(%filename, chunks, "Recorded upload");
                        Ok(previous)
                    }
                    Err(e) => {
                        tracing::error!(%filename, error = %e, "Failed to write upload log");
                        Err(e)
                    }
                };
                let _ = reply.send(result);
            }
            Command::Files { reply } => {
                let _ = reply.send(state.files.iter().cloned().collect());
            }
            Command::Details { reply } => {
                let details = state
                    .chunks
                    .iter()
                    .map(|(filename, chunks)| FileDetail {
                        filename: filename.clone(),
                        chunks: *chunks,
                    })
                    .collect();
                let _ = reply.send(details);
            }
            Command::ChunkCount { filename, reply } => {
                let _ = reply.send(state.chunks.get(&filename).copied());
            }
        }
    }
}

async fn load_json<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => {
            return Err(AppError::LogIo(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )))
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring corrupt upload log");
            Ok(T::default())
        }
    }
}

async fn persist(data_dir: &Path, state: &LogState) -> Result<()> {
    let files: Vec<&String> = state.files.iter().collect();
    write_atomic(&data_dir.join(FILES_LOG_NAME), &files).await?;
    write_atomic(&data_dir.join(CHUNK_LOG_NAME), &state.chunks).await
}

async fn write_atomic<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::LogIo(format!("cannot serialize {}: {}", path.display(), e)))?;

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| AppError::LogIo(format!("cannot write {}: {}", tmp.display(), e)))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| AppError::LogIo(format!("cannot replace {}: {}", path.display(), e)))
}
