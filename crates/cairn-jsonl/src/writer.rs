//! JSONL writing operations.
//!
//! [`JsonlWriter`] serializes one JSON value per line over any buffered
//! async sink. The [`write_jsonl_atomic`] helpers layer crash safety on top:
//! data is written to a sibling `.tmp` file which is then renamed over the
//! target, so the target file is never observed half-written.
//!
//! On POSIX systems a rename within one filesystem is atomic; a crash before
//! the rename leaves the previous file intact (at worst with a stray `.tmp`
//! alongside it).

use crate::error::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// Buffered writer for JSONL (JSON Lines) data.
///
/// Each call to [`write`](Self::write) emits one JSON document followed by a
/// newline. Output is buffered; call [`flush`](Self::flush) before dropping
/// the writer or the tail of the data may be lost.
pub struct JsonlWriter<W> {
    writer: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> JsonlWriter<W> {
    /// Creates a writer over the given sink.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Creates a writer with a custom buffer capacity in bytes.
    #[must_use]
    pub fn with_capacity(writer: W, capacity: usize) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, writer),
        }
    }

    /// Serializes one value as a single JSON line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails, or
    /// [`Error::Io`](crate::Error::Io) if the underlying write fails.
    pub async fn write<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        Ok(())
    }

    /// Serializes every value from the iterator, one JSON line each.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first serialization or IO failure; values
    /// already written stay in the buffer.
    pub async fn write_all<T, I>(&mut self, values: I) -> Result<()>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        for value in values {
            self.write(&value).await?;
        }
        Ok(())
    }

    /// Flushes buffered data to the underlying sink.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the flush fails.
    pub async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }
}

/// Atomically writes a slice of values to a JSONL file.
///
/// The file at `path` either keeps its previous content or ends up with
/// exactly the serialized `values`; readers never observe a partial write.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be created, a value fails
/// to serialize, an IO error occurs while writing, or the final rename
/// fails. On failure the target file is unchanged and the temporary file is
/// removed on a best-effort basis.
pub async fn write_jsonl_atomic<T, P>(path: P, values: &[T]) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    write_jsonl_atomic_iter(path, values.iter()).await
}

/// Atomically writes an iterator of values to a JSONL file.
///
/// Iterator-accepting form of [`write_jsonl_atomic`], for callers that do
/// not want to collect into a slice first.
///
/// # Errors
///
/// See [`write_jsonl_atomic`].
pub async fn write_jsonl_atomic_iter<T, I, P>(path: P, values: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let temp_path = make_temp_path(path);

    let written = write_to_temp_file(&temp_path, values).await;
    if let Err(error) = written {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(error);
    }

    tokio::fs::rename(&temp_path, path).await?;

    tracing::debug!(path = %path.display(), "atomic JSONL write committed");
    Ok(())
}

/// Derives the sibling temp path by appending `.tmp` to the filename.
fn make_temp_path(path: &Path) -> PathBuf {
    let mut temp_path = path.to_path_buf();
    let new_extension = match path.extension() {
        Some(ext) => {
            let mut ext = ext.to_os_string();
            ext.push(".tmp");
            ext
        }
        None => std::ffi::OsString::from("tmp"),
    };
    temp_path.set_extension(new_extension);
    temp_path
}

/// Writes all values to the temp file and flushes it.
async fn write_to_temp_file<T, I>(temp_path: &Path, values: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let file = File::create(temp_path).await?;
    let mut writer = JsonlWriter::new(file);
    writer.write_all(values).await?;
    writer.flush().await?;
    Ok(())
}
