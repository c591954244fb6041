//! Fixed record layout for DW3000 diagnostic frames.
//!
//! Every frame a module streams has the same byte layout, parameterized only
//! by which of the two optional channel-impulse-response sample blocks the
//! firmware was built to include:
//!
//! 1. **Diagnostics block** (108 bytes) — ranging timestamps, peak
//!    descriptors and power figures for the three path detectors.
//! 2. **Scalar telemetry** (17 bytes) — DGC decision, carrier frequency
//!    offset, temperature, voltage.
//! 3. **Receive-data header** (8 bytes) — stream id, sequence number, FCS.
//! 4. **Ipatov accumulator samples** (optional, 1 dummy byte + 1016 × 6).
//! 5. **STS accumulator samples** (optional, 1 dummy byte + 512 × 6).
//!
//! [`RecordLayout`] derives the total record length and the number of
//! transport packets per frame from these constants. Both are fixed for the
//! lifetime of a run; if `packets_per_frame` disagrees with the firmware's
//! packetization the stream silently desynchronizes, so the arithmetic here
//! must match the device exactly.

use serde::{Deserialize, Serialize};

/// Which optional CIR sample blocks a module's firmware streams.
///
/// Decoding is a pure function of record bytes plus these two flags; they
/// must match the firmware build on the other end of the serial link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleFlags {
    /// Ipatov accumulator samples present.
    #[serde(default)]
    pub acc: bool,
    /// STS accumulator samples present.
    #[serde(default)]
    pub sts: bool,
}

/// Length of the fixed diagnostics block in bytes.
pub const DIAGNOSTIC_LEN: usize = 108;
/// Length of the DGC (automatic gain control) decision field.
pub const DGC_LEN: usize = 1;
/// Length of the carrier-frequency-offset field (IEEE-754 f32).
pub const CFO_LEN: usize = 4;
/// Length of the temperature field (IEEE-754 f32).
pub const TEMPERATURE_LEN: usize = 4;
/// Length of the voltage field (IEEE-754 f32).
pub const VOLTAGE_LEN: usize = 4;
/// Length of the receive-data header.
pub const RX_DATA_LEN: usize = 8;

/// Number of Ipatov accumulator samples per record.
pub const NUM_ACC_SAMPLES: usize = 1016;
/// Number of STS accumulator samples per record.
pub const NUM_STS_SAMPLES: usize = 512;
/// Bytes per complex accumulator sample (18-bit I and Q, packed).
pub const SAMPLE_LEN: usize = 6;

/// Ipatov sample block length: one dummy byte, then the packed samples.
pub const ACC_DATA_LEN: usize = NUM_ACC_SAMPLES * SAMPLE_LEN + 1;
/// STS sample block length: one dummy byte, then the packed samples.
pub const STS_DATA_LEN: usize = NUM_STS_SAMPLES * SAMPLE_LEN + 1;

/// Maximum payload bytes per transport packet.
pub const MAX_PACKET_SIZE: usize = 254;

/// One DW3000 time tick in seconds (1 / 499.2 MHz / 128).
pub const DW_TIME_UNIT: f64 = 1.0 / 499.2e6 / 128.0;

/// Frame preamble: an 8-byte magic pattern repeated three times.
///
/// The preamble appears in the raw transport stream ahead of each new
/// ordinal and is stripped by the assembler; it never reaches a session
/// file.
pub const PREAMBLE: [u8; 24] = {
    const PATTERN: [u8; 8] = [0x09, 0x09, 0x07, 0x05, 0x09, 0x01, 0x01, 0x05];
    let mut bytes = [0u8; 24];
    let mut i = 0;
    while i < 24 {
        bytes[i] = PATTERN[i % 8];
        i += 1;
    }
    bytes
};

/// Derived byte layout of one diagnostic record.
///
/// Pure computation from compile-time constants plus the two capability
/// flags; construct once at startup and pass explicitly to the assembler,
/// decoder and reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    flags: SampleFlags,
}

impl RecordLayout {
    /// Build the layout for the given sample-block capabilities.
    pub fn new(flags: SampleFlags) -> Self {
        Self { flags }
    }

    /// The capability flags this layout was built from.
    pub fn flags(&self) -> SampleFlags {
        self.flags
    }

    /// Bytes in the fixed (always-present) section of a record.
    pub const fn fixed_len() -> usize {
        DIAGNOSTIC_LEN + DGC_LEN + CFO_LEN + TEMPERATURE_LEN + VOLTAGE_LEN + RX_DATA_LEN
    }

    /// Total byte length of one record under this layout.
    pub fn record_len(&self) -> usize {
        let mut len = Self::fixed_len();
        if self.flags.acc {
            len += ACC_DATA_LEN;
        }
        if self.flags.sts {
            len += STS_DATA_LEN;
        }
        len
    }

    /// Number of transport packets that make up one frame.
    ///
    /// Each record section is packetized independently by the firmware, so
    /// the counts are rounded up per section, not over the whole record.
    pub fn packets_per_frame(&self, max_packet_size: usize) -> usize {
        let mut packets = Self::fixed_len().div_ceil(max_packet_size);
        if self.flags.acc {
            packets += ACC_DATA_LEN.div_ceil(max_packet_size);
        }
        if self.flags.sts {
            packets += STS_DATA_LEN.div_ceil(max_packet_size);
        }
        packets
    }
}
