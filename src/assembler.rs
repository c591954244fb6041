//! Streaming frame assembly.
//!
//! The transport delivers an unbounded sequence of byte chunks with no
//! alignment guarantees beyond the link layer's own packetization. Frames
//! are delimited by the 24-byte [`PREAMBLE`] marker: a preamble-bearing
//! chunk opens a new ordinal, and every subsequent group of
//! `packets_per_frame` deliveries forms one frame under that ordinal until
//! the next preamble arrives.
//!
//! The assembler is a per-channel state machine fed one poll outcome at a
//! time:
//!
//! - A data chunk containing the preamble starts (or restarts) assembly; the
//!   marker bytes themselves are discarded and never reach a session file.
//!   A preamble arriving mid-frame silently abandons the partial frame.
//! - Any other data chunk is appended verbatim and consumes one packet slot.
//! - A transport error consumes a packet slot without contributing bytes and
//!   poisons the current frame; an errored frame is counted and discarded
//!   when it fills. There is no retry and no intra-frame resynchronization —
//!   recovery means waiting for the next preamble.

use tracing::warn;

use crate::layout::PREAMBLE;
use crate::transport::TransportStatus;

/// Completed-or-errored frame count between observability checkpoints.
pub const CHECKPOINT_INTERVAL: u64 = 3600;

/// One poll outcome handed to the assembler.
#[derive(Debug, Clone, Copy)]
pub enum ChunkEvent<'a> {
    /// The transport delivered a chunk of bytes.
    Data(&'a [u8]),
    /// The transport reported a failed delivery.
    TransportError(TransportStatus),
}

/// A fully assembled, clean frame ready for the session writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedFrame {
    /// Preamble ordinal this frame belongs to.
    pub ordinal: u64,
    /// Concatenated packet payloads, preamble stripped.
    pub bytes: Vec<u8>,
}

/// Frame boundary emitted by [`FrameAssembler::feed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// A clean frame filled all its packet slots.
    Completed(CompletedFrame),
    /// A frame filled its slots but at least one slot was a transport
    /// error; its bytes are dropped.
    Discarded { ordinal: u64 },
}

/// Counters kept by the assembler.
///
/// The per-ordinal counts reset each time a new preamble is detected; the
/// totals cover the whole channel lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblerStats {
    /// Number of preambles detected so far.
    pub ordinal: u64,
    /// Clean frames committed under the current ordinal.
    pub frames_completed: u64,
    /// Errored frames discarded under the current ordinal.
    pub frames_errored: u64,
    /// Clean frames committed since channel start.
    pub total_completed: u64,
    /// Errored frames discarded since channel start.
    pub total_errored: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No preamble seen yet; data chunks are ignored.
    Idle,
    /// Accumulating packets under the current ordinal.
    Assembling,
}

/// Per-channel frame assembly state machine.
#[derive(Debug)]
pub struct FrameAssembler {
    packets_per_frame: usize,
    state: State,
    buffer: Vec<u8>,
    packets_received: usize,
    is_error: bool,
    stats: AssemblerStats,
}

impl FrameAssembler {
    /// Create an assembler expecting `packets_per_frame` deliveries per
    /// frame (see [`crate::RecordLayout::packets_per_frame`]).
    pub fn new(packets_per_frame: usize) -> Self {
        assert!(packets_per_frame > 0, "packets_per_frame must be non-zero");
        Self {
            packets_per_frame,
            state: State::Idle,
            buffer: Vec::new(),
            packets_received: 0,
            is_error: false,
            stats: AssemblerStats::default(),
        }
    }

    /// Current counters.
    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }

    /// Current ordinal (0 before the first preamble).
    pub fn ordinal(&self) -> u64 {
        self.stats.ordinal
    }

    /// Whether the frame count under the current ordinal just crossed a
    /// checkpoint boundary. Meaningful right after `feed` returned a frame
    /// event.
    pub fn checkpoint_due(&self) -> bool {
        let frames = self.stats.frames_completed + self.stats.frames_errored;
        frames > 0 && frames % CHECKPOINT_INTERVAL == 0
    }

    /// Feed one poll outcome; returns a frame event when a frame boundary
    /// was reached.
    pub fn feed(&mut self, event: ChunkEvent<'_>) -> Option<FrameEvent> {
        match event {
            ChunkEvent::Data(chunk) if contains_preamble(chunk) => {
                self.start_ordinal();
                None
            }
            ChunkEvent::Data(chunk) => {
                if self.state == State::Idle {
                    // Bytes before the first preamble belong to no frame.
                    return None;
                }
                self.buffer.extend_from_slice(chunk);
                self.packets_received += 1;
                self.try_finish_frame()
            }
            ChunkEvent::TransportError(status) => {
                if self.state == State::Idle {
                    return None;
                }
                self.log_transport_error(status);
                self.is_error = true;
                self.packets_received += 1;
                self.try_finish_frame()
            }
        }
    }

    /// New preamble: abandon any partial frame, advance the ordinal, reset
    /// the per-ordinal counters.
    fn start_ordinal(&mut self) {
        self.state = State::Assembling;
        self.buffer.clear();
        self.packets_received = 0;
        self.is_error = false;
        self.stats.ordinal += 1;
        self.stats.frames_completed = 0;
        self.stats.frames_errored = 0;
    }

    fn try_finish_frame(&mut self) -> Option<FrameEvent> {
        if self.packets_received < self.packets_per_frame {
            return None;
        }

        let ordinal = self.stats.ordinal;
        let event = if self.is_error {
            self.stats.frames_errored += 1;
            self.stats.total_errored += 1;
            self.buffer.clear();
            FrameEvent::Discarded { ordinal }
        } else {
            self.stats.frames_completed += 1;
            self.stats.total_completed += 1;
            FrameEvent::Completed(CompletedFrame {
                ordinal,
                bytes: std::mem::take(&mut self.buffer),
            })
        };

        self.packets_received = 0;
        self.is_error = false;
        Some(event)
    }

    fn log_transport_error(&self, status: TransportStatus) {
        // Each failure kind stays distinguishable in the log stream.
        match status {
            TransportStatus::CrcError => warn!(ordinal = self.stats.ordinal, "CRC_ERROR"),
            TransportStatus::PayloadError => warn!(ordinal = self.stats.ordinal, "PAYLOAD_ERROR"),
            TransportStatus::StopByteError => {
                warn!(ordinal = self.stats.ordinal, "STOP_BYTE_ERROR")
            }
            TransportStatus::Other(code) => {
                warn!(ordinal = self.stats.ordinal, code, "transport error")
            }
            TransportStatus::Ok => {}
        }
    }
}

/// Whether `chunk` contains the frame preamble at any offset.
fn contains_preamble(chunk: &[u8]) -> bool {
    chunk.windows(PREAMBLE.len()).any(|w| w == PREAMBLE)
}
