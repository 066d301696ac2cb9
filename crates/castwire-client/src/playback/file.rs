//! File-backed media source: every appended chunk is written to one file.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::info;

use castwire_core::error::{CastwireError, Result};

use super::{MediaSource, SourceBuffer};

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MediaSource for FileSource {
    fn add_source_buffer(&mut self, mime: &str) -> Result<Box<dyn SourceBuffer>> {
        let file = std::fs::File::create(&self.path).map_err(|e| {
            CastwireError::Internal(format!("create {} failed: {e}", self.path.display()))
        })?;
        info!(path = %self.path.display(), mime = %mime, "playback sink open");
        Ok(Box::new(FileSourceBuffer {
            file: tokio::fs::File::from_std(file),
        }))
    }
}

struct FileSourceBuffer {
    file: tokio::fs::File,
}

#[async_trait]
impl SourceBuffer for FileSourceBuffer {
    async fn append(&mut self, chunk: Bytes) -> Result<()> {
        self.file
            .write_all(&chunk)
            .await
            .map_err(|e| CastwireError::Decode(format!("sink write failed: {e}")))?;
        self.file
            .flush()
            .await
            .map_err(|e| CastwireError::Decode(format!("sink flush failed: {e}")))
    }
}
