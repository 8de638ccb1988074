//! Reopenable line sources
//!
//! Every pass over the input -- the main scan and each correlation pass --
//! opens the source afresh and reads it front to back. A reader is owned by
//! the pass that opened it and is released when the pass returns, whether it
//! ran to the end, stopped early or failed.
//!
//! - [`FileSource`]: a file on disk; `.gz` files are decompressed on the fly
//! - [`MemorySource`]: in-memory text

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::read::MultiGzDecoder;
use tracing::trace;

use crate::error::TraceError;

/// A sequence of text lines that can be re-read from the start.
pub trait LogSource {
    /// Opens a fresh reader positioned at offset zero.
    fn open(&self) -> Result<Box<dyn BufRead>, TraceError>;

    /// Human-readable name used in diagnostics.
    fn describe(&self) -> String;
}

/// Log file on disk, plain or gzip-compressed
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    compressed: bool,
}

impl FileSource {
    /// Creates a source for `path`.
    ///
    /// The file must exist and open for reading up front, so a missing or
    /// unreadable input is reported before any scanning starts. Compression
    /// is detected by the `.gz` suffix.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TraceError::NotFound {
                path: path.display().to_string(),
            });
        }
        File::open(path).map_err(|source| TraceError::Unreadable {
            path: path.display().to_string(),
            source,
        })?;

        let compressed = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));

        Ok(Self {
            path: path.to_path_buf(),
            compressed,
        })
    }

    /// Whether reads go through the gzip decoder.
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }
}

impl LogSource for FileSource {
    fn open(&self) -> Result<Box<dyn BufRead>, TraceError> {
        let file = File::open(&self.path).map_err(|source| TraceError::Open {
            input: self.describe(),
            source,
        })?;

        trace!(path = %self.path.display(), compressed = self.compressed, "opened input");

        if self.compressed {
            Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
        } else {
            Ok(Box::new(BufReader::new(file)))
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory text source
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    content: Arc<[u8]>,
}

impl MemorySource {
    /// Wraps `content` under a display `name`.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let content: String = content.into();
        Self {
            name: name.into(),
            content: Arc::from(content.into_bytes()),
        }
    }
}

impl LogSource for MemorySource {
    fn open(&self) -> Result<Box<dyn BufRead>, TraceError> {
        Ok(Box::new(Cursor::new(Arc::clone(&self.content))))
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// Runs `f` over every line of a fresh pass of `source`.
///
/// Lines are decoded as UTF-8 with invalid sequences replaced, line endings
/// included. `f` returns [`ControlFlow::Break`] to end the pass early. Errors
/// from `f` and read failures abort the pass. Returns the number of lines
/// handed to `f`.
pub fn for_each_line<F>(source: &dyn LogSource, mut f: F) -> Result<usize, TraceError>
where
    F: FnMut(&str) -> Result<ControlFlow<()>, TraceError>,
{
    let mut reader = source.open()?;
    let mut buf = Vec::with_capacity(512);
    let mut line_no = 0usize;

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source_err| TraceError::Read {
                input: source.describe(),
                line: line_no + 1,
                source: source_err,
            })?;
        if read == 0 {
            break;
        }
        line_no += 1;

        let line = String::from_utf8_lossy(&buf);
        if f(&line)?.is_break() {
            break;
        }
    }

    Ok(line_no)
}
