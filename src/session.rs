//! Per-session output files.
//!
//! Each capture run gets one uniquely named directory,
//! `<output_root>/<module_name>_<YYYYMMDD_HHMMSS>/`, holding one append-only
//! binary file per preamble ordinal. Ordinal files contain zero or more
//! concatenated fixed-size records in frame-completion order; the writer
//! only ever appends, and because ordinals only increase, a file is never
//! revisited once the assembler has moved past its ordinal.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info};

use crate::assembler::CompletedFrame;
use crate::{CaptureError, Result};

/// Appends completed frames to per-ordinal files in one session directory.
pub struct SessionWriter {
    dir: PathBuf,
    current: Option<(u64, File)>,
}

impl SessionWriter {
    /// Create the session directory for this run.
    ///
    /// Fails if the directory cannot be created; that failure is fatal at
    /// worker startup (there is no retry).
    pub fn create(output_root: impl AsRef<Path>, module_name: &str) -> Result<Self> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let dir = output_root.as_ref().join(format!("{module_name}_{stamp}"));

        fs::create_dir_all(&dir).map_err(|e| CaptureError::file_error(dir.clone(), e))?;
        info!(dir = %dir.display(), "session directory created");

        Ok(Self { dir, current: None })
    }

    /// The session directory this writer appends into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append one completed frame to its ordinal's file.
    ///
    /// The file is opened append-only on the first frame of each ordinal.
    /// With `flush` set, buffered bytes are pushed to the OS immediately
    /// after the write.
    pub fn append(&mut self, frame: &CompletedFrame, flush: bool) -> Result<()> {
        let file = self.file_for(frame.ordinal)?;
        file.write_all(&frame.bytes)
            .and_then(|()| if flush { file.flush() } else { Ok(()) })
            .map_err(|e| CaptureError::file_error(self.dir.join(frame.ordinal.to_string()), e))
    }

    fn file_for(&mut self, ordinal: u64) -> Result<&mut File> {
        let reopen = match &self.current {
            Some((current, _)) => *current != ordinal,
            None => true,
        };
        if reopen {
            let path = self.dir.join(ordinal.to_string());
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(&path)
                .map_err(|e| CaptureError::file_error(path.clone(), e))?;
            debug!(path = %path.display(), "ordinal file opened");
            self.current = Some((ordinal, file));
        }
        // Invariant: `current` was just populated on the reopen path.
        Ok(&mut self.current.as_mut().expect("ordinal file open").1)
    }
}
