//! Frame capture and diagnostics decoding for DW3000-class UWB radio
//! modules.
//!
//! `uwbdiag` ingests the continuous byte stream a UWB module pushes over a
//! serial link, reassembles its multi-packet diagnostic frames, persists
//! them to per-session record files, and decodes those files into typed
//! diagnostic records (ranging timestamps, channel-impulse-response
//! samples, auxiliary telemetry).
//!
//! # Pipeline
//!
//! ```text
//! serial bytes → FrameAssembler → SessionWriter → output/<module>_<stamp>/<ordinal>
//! (offline)      RecordReader  → DiagnosticRecord sequence
//! ```
//!
//! Capture and decode are fully decoupled: capture appends raw frame bytes
//! only, and decoding is a pure function of those bytes plus the module's
//! [`SampleFlags`].
//!
//! # Quick start
//!
//! ## Capture (one worker per configured port)
//!
//! ```rust,no_run
//! use uwbdiag::{Capture, CaptureConfig};
//!
//! fn main() -> uwbdiag::Result<()> {
//!     let config = CaptureConfig::from_yaml_file("capture.yaml")?;
//!     let handle = Capture::spawn(&config)?;
//!     // ... run until told to stop ...
//!     for (module, result) in handle.shutdown() {
//!         if let Err(e) = result {
//!             eprintln!("{module}: {e}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Decode a session file
//!
//! ```rust,no_run
//! use uwbdiag::{RecordReader, SampleFlags};
//!
//! fn main() -> uwbdiag::Result<()> {
//!     let flags = SampleFlags { acc: true, sts: true };
//!     for record in RecordReader::open("output/module_1_20250101_120000", 1, flags)? {
//!         let record = record?;
//!         println!("ipatov rx time: {:.12}s", record.ipatov.rx_time);
//!     }
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod assembler;
pub mod capture;
pub mod config;
mod error;
pub mod layout;
pub mod reader;
pub mod record;
pub mod session;
#[cfg(test)]
pub mod test_utils;
pub mod transport;

pub use assembler::{AssemblerStats, ChunkEvent, CompletedFrame, FrameAssembler, FrameEvent};
pub use capture::{Capture, CaptureHandle, ChannelHandle, ChannelSettings};
pub use config::{CaptureConfig, PortConfig};
pub use error::{CaptureError, Result};
pub use layout::{RecordLayout, SampleFlags};
pub use reader::RecordReader;
pub use record::{CirSampleBlock, DiagnosticRecord, PathDiagnostics, PeakDescriptor, RxData};
pub use session::SessionWriter;
pub use transport::{SerialTransport, Transport, TransportStatus, verify_checksum};
