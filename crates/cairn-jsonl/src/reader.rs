//! JSONL reading operations.
//!
//! Two reading modes are offered:
//!
//! - **Strict**: [`JsonlReader::read_line`] returns an error on the first
//!   malformed line. Use this when the input is trusted (for example, a file
//!   this process wrote itself moments ago).
//! - **Resilient**: [`read_jsonl_resilient`] and
//!   [`JsonlReader::stream_resilient`] skip malformed lines, reporting each
//!   skip as a [`Warning`] with its 1-based line number. Use this for
//!   long-lived ledger files that may have been touched by other tools.
//!
//! Blank and whitespace-only lines are skipped in both modes.

use crate::error::Result;
use crate::warning::{Warning, WarningCollector};
use futures::stream::Stream;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Buffered reader for JSONL (JSON Lines) data.
///
/// Wraps any [`AsyncRead`] source and tracks the 1-based number of the last
/// line read, so parse failures can be reported against the source file.
///
/// # Examples
///
/// ```no_run
/// use cairn_jsonl::JsonlReader;
/// use tokio::fs::File;
///
/// # #[derive(serde::Deserialize)]
/// # struct Record { id: u32 }
/// # async fn example() -> cairn_jsonl::Result<()> {
/// let file = File::open("data.jsonl").await?;
/// let mut reader = JsonlReader::new(file);
/// while let Some(record) = reader.read_line::<Record>().await? {
///     // use record
/// }
/// # Ok(())
/// # }
/// ```
pub struct JsonlReader<R> {
    reader: BufReader<R>,
    /// 1-based number of the last line read; 0 before any read.
    line_number: usize,
}

impl<R: AsyncRead + Unpin> JsonlReader<R> {
    /// Creates a reader over the given source.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
        }
    }

    /// Creates a reader with a custom buffer capacity in bytes.
    #[must_use]
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(capacity, reader),
            line_number: 0,
        }
    }

    /// Returns the 1-based number of the last line read, or 0 before any
    /// line has been read.
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Reads the next raw line, or `None` at end of input.
    ///
    /// The trailing newline (and carriage return, for CRLF input) is
    /// stripped. Every physical line counts toward [`line_number`],
    /// including blank ones.
    ///
    /// [`line_number`]: Self::line_number
    async fn next_line(&mut self) -> Result<Option<String>> {
        let mut buf = String::new();
        let bytes = self.reader.read_line(&mut buf).await?;
        if bytes == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        Ok(Some(buf))
    }

    /// Reads and deserializes the next non-blank line, strictly.
    ///
    /// Returns `Ok(None)` at end of input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the underlying read fails,
    /// or [`Error::Json`](crate::Error::Json) on the first line that does not
    /// deserialize into `T`.
    pub async fn read_line<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        loop {
            let Some(line) = self.next_line().await? else {
                return Ok(None);
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Ok(Some(serde_json::from_str(trimmed)?));
        }
    }

    /// Converts the reader into a stream of successfully parsed records,
    /// plus a collector that accumulates a [`Warning`] for every line that
    /// failed to parse.
    ///
    /// The stream never yields an error: malformed lines are skipped, and an
    /// IO failure ends the stream after recording a
    /// [`Warning::SkippedLine`]. The returned collector shares state with
    /// the stream, so it can be inspected mid-iteration or drained with
    /// [`WarningCollector::into_warnings`] once the stream is exhausted.
    ///
    /// # Examples
    ///
    /// ```
    /// use cairn_jsonl::JsonlReader;
    /// use futures::stream::StreamExt;
    /// use std::io::Cursor;
    /// use std::pin::pin;
    ///
    /// # #[derive(serde::Deserialize)]
    /// # struct Record { id: u32 }
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let input = "{\"id\": 1}\nnot json\n{\"id\": 2}";
    /// let reader = JsonlReader::new(Cursor::new(input.as_bytes()));
    /// let (stream, warnings) = reader.stream_resilient::<Record>();
    ///
    /// let records: Vec<Record> = pin!(stream).collect().await;
    /// assert_eq!(records.len(), 2);
    /// assert_eq!(warnings.len(), 1);
    /// assert_eq!(warnings.warnings()[0].line_number(), 2);
    /// # }
    /// ```
    pub fn stream_resilient<T: DeserializeOwned>(
        self,
    ) -> (impl Stream<Item = T>, WarningCollector) {
        let collector = WarningCollector::new();
        let shared = collector.clone();

        let stream = futures::stream::unfold(self, move |mut reader| {
            let collector = shared.clone();
            async move {
                loop {
                    match reader.next_line().await {
                        Ok(None) => return None,
                        Ok(Some(line)) => {
                            let trimmed = line.trim();
                            if trimmed.is_empty() {
                                continue;
                            }
                            match serde_json::from_str::<T>(trimmed) {
                                Ok(value) => return Some((value, reader)),
                                Err(error) => {
                                    collector.add(Warning::MalformedJson {
                                        line_number: reader.line_number(),
                                        error: error.to_string(),
                                    });
                                }
                            }
                        }
                        Err(error) => {
                            collector.add(Warning::SkippedLine {
                                line_number: reader.line_number() + 1,
                                reason: format!("read aborted: {error}"),
                            });
                            return None;
                        }
                    }
                }
            }
        });

        (stream, collector)
    }
}

/// Reads a whole JSONL file resiliently.
///
/// Returns every record that parsed as `T`, in file order, together with a
/// [`Warning`] for each line that did not. Blank lines are skipped without a
/// warning.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) only for file-level failures
/// (missing file, permission denied, read aborted mid-file); per-line parse
/// failures are reported through the warning list instead.
pub async fn read_jsonl_resilient<T, P>(path: P) -> Result<(Vec<T>, Vec<Warning>)>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).await?;
    let mut reader = JsonlReader::new(file);

    let mut records = Vec::new();
    let mut warnings = Vec::new();

    while let Some(line) = reader.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str(trimmed) {
            Ok(value) => records.push(value),
            Err(error) => warnings.push(Warning::MalformedJson {
                line_number: reader.line_number(),
                error: error.to_string(),
            }),
        }
    }

    tracing::debug!(
        path = %path.display(),
        records = records.len(),
        warnings = warnings.len(),
        "finished resilient JSONL read"
    );

    Ok((records, warnings))
}
