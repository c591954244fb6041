//! Transport abstraction over the link layer.
//!
//! The radio module speaks a packetized serial protocol whose framing and
//! CRC live on the device side; from the capture pipeline's point of view a
//! transport is just a byte-producing channel with an availability check and
//! a status code. The [`Transport`] trait captures exactly that contract so
//! the assembler can be driven by a real serial port, a replayed byte log,
//! or a scripted test double.

pub mod serial;

pub use serial::SerialTransport;

use std::fmt;

/// Outcome of the most recent transport poll.
///
/// A closed enumeration so call sites match exhaustively; each failure kind
/// must stay distinguishable for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStatus {
    /// Last delivery succeeded (or nothing happened yet).
    Ok,
    /// Link-layer checksum mismatch.
    CrcError,
    /// Payload length disagreed with the link-layer header.
    PayloadError,
    /// Packet terminator byte missing or wrong.
    StopByteError,
    /// Any other non-success status code reported by the link layer.
    Other(i16),
}

impl TransportStatus {
    /// Whether the last delivery succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, TransportStatus::Ok)
    }
}

impl fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportStatus::Ok => write!(f, "OK"),
            TransportStatus::CrcError => write!(f, "CRC_ERROR"),
            TransportStatus::PayloadError => write!(f, "PAYLOAD_ERROR"),
            TransportStatus::StopByteError => write!(f, "STOP_BYTE_ERROR"),
            TransportStatus::Other(code) => write!(f, "STATUS({code})"),
        }
    }
}

/// A byte-producing channel feeding one capture worker.
///
/// Implementations own the most recently received chunk; `available()`
/// performs the poll and reports how many bytes the chunk holds, `chunk()`
/// exposes them, and `status()` reports the link-layer outcome when no data
/// arrived. Workers busy-poll, so `available()` must not block longer than
/// its configured read timeout.
pub trait Transport: Send {
    /// Open the underlying channel. Fatal to the worker on failure.
    fn open(&mut self) -> crate::Result<()>;

    /// Close the underlying channel. Best effort.
    fn close(&mut self);

    /// Poll for data; returns the byte length of the current chunk.
    fn available(&mut self) -> usize;

    /// Link-layer status of the most recent poll.
    fn status(&self) -> TransportStatus;

    /// Bytes of the most recently received chunk.
    fn chunk(&self) -> &[u8];
}

/// Verify a 16-bit ones'-complement-style checksum.
///
/// Sums the payload bytes, truncates to 16 bits, complements, and compares
/// against the received value. Standalone verification primitive for callers
/// that want to re-check payloads; the assembly path itself trusts the link
/// layer's own integrity reporting.
pub fn verify_checksum(data: &[u8], received_checksum: u16) -> bool {
    let calculated: u16 = data.iter().fold(0u16, |acc, &b| acc.wrapping_add(b as u16));
    !calculated == received_checksum
}
