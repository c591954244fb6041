//! Batch reading of persisted session files.
//!
//! An ordinal file is a plain concatenation of fixed-size records, so
//! reading it back is a matter of slicing `record_len` bytes at a time and
//! handing each slice to the decoder. [`RecordReader`] does exactly that as
//! a lazy iterator: it stops cleanly at end of file and reports a
//! [`CaptureError::TruncatedRecord`] if the file ends with a non-empty
//! partial record instead of silently dropping the tail.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::record::DiagnosticRecord;
use crate::{CaptureError, RecordLayout, Result, SampleFlags};

/// Iterates the records of one session ordinal file.
pub struct RecordReader {
    reader: BufReader<File>,
    path: PathBuf,
    layout: RecordLayout,
    records_read: usize,
    /// Set once EOF or an error was reached; further `next` calls yield
    /// `None` so a truncated tail is reported exactly once.
    done: bool,
}

impl RecordReader {
    /// Open the file for `ordinal` inside a session directory.
    pub fn open(session_dir: impl AsRef<Path>, ordinal: u64, flags: SampleFlags) -> Result<Self> {
        Self::open_path(session_dir.as_ref().join(ordinal.to_string()), flags)
    }

    /// Open a record file directly by path.
    pub fn open_path(path: impl Into<PathBuf>, flags: SampleFlags) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path).map_err(|e| CaptureError::file_error(path.clone(), e))?;
        let layout = RecordLayout::new(flags);

        debug!(path = %path.display(), record_len = layout.record_len(), "record file opened");

        Ok(Self { reader: BufReader::new(file), path, layout, records_read: 0, done: false })
    }

    /// The layout records are decoded under.
    pub fn layout(&self) -> RecordLayout {
        self.layout
    }

    /// Number of complete records yielded so far.
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Restart iteration from the beginning of the file.
    pub fn rewind(&mut self) -> Result<()> {
        self.reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| CaptureError::file_error(self.path.clone(), e))?;
        self.records_read = 0;
        self.done = false;
        Ok(())
    }

    /// Read and decode the next record, if any.
    fn read_next(&mut self) -> Result<Option<DiagnosticRecord>> {
        let expected = self.layout.record_len();
        let mut buf = vec![0u8; expected];
        let mut filled = 0;

        while filled < expected {
            let n = self
                .reader
                .read(&mut buf[filled..])
                .map_err(|e| CaptureError::file_error(self.path.clone(), e))?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        match filled {
            0 => Ok(None),
            n if n < expected => Err(CaptureError::TruncatedRecord { expected, actual: n }),
            _ => {
                let record = DiagnosticRecord::decode(&buf, self.layout.flags())?;
                self.records_read += 1;
                Ok(Some(record))
            }
        }
    }
}

impl Iterator for RecordReader {
    type Item = Result<DiagnosticRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
