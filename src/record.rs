//! Diagnostic record structures and binary decoding.
//!
//! One complete frame's bytes decode into one [`DiagnosticRecord`]. The wire
//! layout is fixed (see [`crate::layout`]) and entirely little-endian:
//!
//! - Receive times are 40-bit unsigned integers in DW3000 time ticks,
//!   scaled to seconds by [`DW_TIME_UNIT`]; the TDoA field is 48-bit.
//! - Peak words pack an 11-bit index (high bits) over a 17-bit amplitude.
//! - First-path index fields carry a 10.6 fixed-point value; the integer
//!   part is the raw field shifted right by 6.
//! - CIR samples pack two signed 18-bit values into 6 bytes, I then Q.
//!
//! Decoding is a pure function of the record bytes plus the two
//! [`SampleFlags`]; it never touches external state and fails only with
//! [`CaptureError::LayoutMismatch`] on a size mismatch.

use crate::layout::{
    self, DIAGNOSTIC_LEN, DW_TIME_UNIT, NUM_ACC_SAMPLES, NUM_STS_SAMPLES, RX_DATA_LEN, SAMPLE_LEN,
};
use crate::{CaptureError, RecordLayout, Result, SampleFlags};

/// Peak index and amplitude extracted from one packed 32-bit peak word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeakDescriptor {
    /// Accumulator index of the detected peak (upper 11 bits).
    pub index: u16,
    /// Peak amplitude (lower 17 bits).
    pub amplitude: u32,
}

impl PeakDescriptor {
    fn from_word(word: u32) -> Self {
        Self { index: (word >> 21) as u16, amplitude: word & 0x1FFFF }
    }
}

/// Path-detection results for one of the three detectors (Ipatov, STS,
/// STS2).
///
/// The wire widths differ between detectors (the Ipatov status is one byte
/// and its power four, where STS/STS2 carry two-byte status and power);
/// fields here are widened to the largest wire width so one type covers all
/// three groups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathDiagnostics {
    /// Receive timestamp in seconds (40-bit tick count × [`DW_TIME_UNIT`]).
    pub rx_time: f64,
    /// Receiver status code (0 = success; 24–28 are first-path estimation
    /// failures reported by the CIA engine).
    pub rx_status: u16,
    /// Phase of arrival, raw units.
    pub poa: u16,
    /// Detected peak index and amplitude.
    pub peak: PeakDescriptor,
    /// Channel power figure, raw units.
    pub power: u32,
    /// First frequency-domain component.
    pub f1: u32,
    /// Second frequency-domain component.
    pub f2: u32,
    /// Third frequency-domain component.
    pub f3: u32,
    /// First-path index (integer part of the 10.6 fixed-point field).
    pub fp_index: u16,
    /// Number of symbols accumulated.
    pub accum_count: u16,
}

/// Receive-data header trailing the telemetry scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxData {
    /// Stream identifier.
    pub stream_id: u32,
    /// Frame sequence number.
    pub seq_num: u16,
    /// Frame check sequence, copied verbatim.
    pub fcs: [u8; 2],
}

/// One decoded channel-impulse-response sample block.
///
/// `i`, `q` and `magnitude` are index-aligned; `magnitude[n]` is the
/// Euclidean norm of `(i[n], q[n])`.
#[derive(Debug, Clone, PartialEq)]
pub struct CirSampleBlock {
    /// In-phase values, sign-extended from 18 bits.
    pub i: Vec<i32>,
    /// Quadrature values, sign-extended from 18 bits.
    pub q: Vec<i32>,
    /// Per-sample magnitudes.
    pub magnitude: Vec<f64>,
}

/// The decoded form of one complete frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticRecord {
    /// Ipatov preamble path detection results.
    pub ipatov: PathDiagnostics,
    /// STS path detection results.
    pub sts: PathDiagnostics,
    /// Second STS path detection results.
    pub sts2: PathDiagnostics,
    /// Time difference of arrival in seconds (48-bit tick count).
    pub tdoa: f64,
    /// Phase difference of arrival, raw signed units.
    pub pdoa: i16,
    /// Crystal offset estimate in parts per million.
    pub xtal_offset_ppm: f64,
    /// CIA engine diagnostic word.
    pub cia_diag1: u32,
    /// DGC (automatic gain control) decision byte.
    pub dgc_decision: u8,
    /// Carrier frequency offset.
    pub cfo: f32,
    /// Die temperature.
    pub temperature: f32,
    /// Supply voltage.
    pub voltage: f32,
    /// Receive-data header.
    pub rx_data: RxData,
    /// Ipatov accumulator samples, when the firmware streams them.
    pub acc_samples: Option<CirSampleBlock>,
    /// STS accumulator samples, when the firmware streams them.
    pub sts_samples: Option<CirSampleBlock>,
}

impl DiagnosticRecord {
    /// Decode one fixed-size record.
    ///
    /// `bytes` must be exactly `RecordLayout::new(flags).record_len()` long;
    /// anything else fails with [`CaptureError::LayoutMismatch`]. Undersized
    /// input is never zero-filled.
    pub fn decode(bytes: &[u8], flags: SampleFlags) -> Result<Self> {
        let expected = RecordLayout::new(flags).record_len();
        if bytes.len() != expected {
            return Err(CaptureError::LayoutMismatch { expected, actual: bytes.len() });
        }

        let mut cursor = Cursor::new(bytes);

        let diag = cursor.take(DIAGNOSTIC_LEN)?;
        let (ipatov, sts, sts2, tdoa, pdoa, xtal_offset_ppm, cia_diag1) = decode_diagnostics(diag)?;

        let dgc_decision = cursor.u8()?;
        let cfo = cursor.f32_le()?;
        let temperature = cursor.f32_le()?;
        let voltage = cursor.f32_le()?;

        let rx = cursor.take(RX_DATA_LEN)?;
        let rx_data = RxData {
            stream_id: u32::from_le_bytes([rx[0], rx[1], rx[2], rx[3]]),
            seq_num: u16::from_le_bytes([rx[4], rx[5]]),
            fcs: [rx[6], rx[7]],
        };

        let acc_samples = if flags.acc {
            Some(decode_sample_block(cursor.take(layout::ACC_DATA_LEN)?, NUM_ACC_SAMPLES))
        } else {
            None
        };
        let sts_samples = if flags.sts {
            Some(decode_sample_block(cursor.take(layout::STS_DATA_LEN)?, NUM_STS_SAMPLES))
        } else {
            None
        };

        Ok(Self {
            ipatov,
            sts,
            sts2,
            tdoa,
            pdoa,
            xtal_offset_ppm,
            cia_diag1,
            dgc_decision,
            cfo,
            temperature,
            voltage,
            rx_data,
            acc_samples,
            sts_samples,
        })
    }
}

/// Sign-extend an 18-bit two's-complement value.
pub(crate) fn sign_extend_18(raw: u32) -> i32 {
    let raw = raw & 0x3FFFF;
    if raw & 0x20000 != 0 { raw as i32 - 0x40000 } else { raw as i32 }
}

/// Decode one packed 6-byte complex sample into sign-extended (I, Q).
pub(crate) fn unpack_sample(group: &[u8]) -> (i32, i32) {
    let i_raw = group[0] as u32 | (group[1] as u32) << 8 | ((group[2] & 0x03) as u32) << 16;
    let q_raw = group[3] as u32 | (group[4] as u32) << 8 | ((group[5] & 0x03) as u32) << 16;
    (sign_extend_18(i_raw), sign_extend_18(q_raw))
}

fn decode_sample_block(block: &[u8], num_samples: usize) -> CirSampleBlock {
    // First byte of the block is firmware padding.
    let samples = &block[1..];
    let mut i_values = Vec::with_capacity(num_samples);
    let mut q_values = Vec::with_capacity(num_samples);
    let mut magnitude = Vec::with_capacity(num_samples);

    for group in samples.chunks_exact(SAMPLE_LEN).take(num_samples) {
        let (i, q) = unpack_sample(group);
        i_values.push(i);
        q_values.push(q);
        magnitude.push(((i as f64) * (i as f64) + (q as f64) * (q as f64)).sqrt());
    }

    CirSampleBlock { i: i_values, q: q_values, magnitude }
}

type Diagnostics = (PathDiagnostics, PathDiagnostics, PathDiagnostics, f64, i16, f64, u32);

fn decode_diagnostics(diag: &[u8]) -> Result<Diagnostics> {
    let mut c = Cursor::new(diag);

    // Timestamp/status/POA header for all three detectors; the Ipatov
    // status is the lone one-byte field.
    let ipatov_rx_time = c.u40_le_time()?;
    let ipatov_rx_status = c.u8()? as u16;
    let ipatov_poa = c.u16_le()?;
    let sts_rx_time = c.u40_le_time()?;
    let sts_rx_status = c.u16_le()?;
    let sts_poa = c.u16_le()?;
    let sts2_rx_time = c.u40_le_time()?;
    let sts2_rx_status = c.u16_le()?;
    let sts2_poa = c.u16_le()?;

    let tdoa = c.u48_le()? as f64 * DW_TIME_UNIT;
    let pdoa = c.i16_le()?;
    let xtal_offset_ppm = c.i16_le()? as f64 / (1u64 << 26) as f64 * 1e6;
    let cia_diag1 = c.u32_le()?;

    let ipatov = PathDiagnostics {
        rx_time: ipatov_rx_time,
        rx_status: ipatov_rx_status,
        poa: ipatov_poa,
        peak: PeakDescriptor::from_word(c.u32_le()?),
        power: c.u32_le()?,
        f1: c.u32_le()?,
        f2: c.u32_le()?,
        f3: c.u32_le()?,
        fp_index: c.u16_le()? >> 6,
        accum_count: c.u16_le()?,
    };
    let sts = PathDiagnostics {
        rx_time: sts_rx_time,
        rx_status: sts_rx_status,
        poa: sts_poa,
        peak: PeakDescriptor::from_word(c.u32_le()?),
        power: c.u16_le()? as u32,
        f1: c.u32_le()?,
        f2: c.u32_le()?,
        f3: c.u32_le()?,
        fp_index: c.u16_le()? >> 6,
        accum_count: c.u16_le()?,
    };
    let sts2 = PathDiagnostics {
        rx_time: sts2_rx_time,
        rx_status: sts2_rx_status,
        poa: sts2_poa,
        peak: PeakDescriptor::from_word(c.u32_le()?),
        power: c.u16_le()? as u32,
        f1: c.u32_le()?,
        f2: c.u32_le()?,
        f3: c.u32_le()?,
        fp_index: c.u16_le()? >> 6,
        accum_count: c.u16_le()?,
    };

    Ok((ipatov, sts, sts2, tdoa, pdoa, xtal_offset_ppm, cia_diag1))
}

/// Bounds-checked forward reader over a record slice.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos + len;
        let slice = self.bytes.get(self.pos..end).ok_or(CaptureError::LayoutMismatch {
            expected: end,
            actual: self.bytes.len(),
        })?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16_le(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn i16_le(&mut self) -> Result<i16> {
        let b = self.take(2)?;
        Ok(i16::from_le_bytes([b[0], b[1]]))
    }

    fn u32_le(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f32_le(&mut self) -> Result<f32> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// 40-bit little-endian receive time, scaled to seconds.
    fn u40_le_time(&mut self) -> Result<f64> {
        let b = self.take(5)?;
        let mut buf = [0u8; 8];
        buf[..5].copy_from_slice(b);
        Ok(u64::from_le_bytes(buf) as f64 * DW_TIME_UNIT)
    }

    /// 48-bit little-endian unsigned integer.
    fn u48_le(&mut self) -> Result<u64> {
        let b = self.take(6)?;
        let mut buf = [0u8; 8];
        buf[..6].copy_from_slice(b);
        Ok(u64::from_le_bytes(buf))
    }
}
