//! Test fixtures for capture and decode tests.
//!
//! [`RecordBuilder`] is a reference encoder — the inverse of
//! [`DiagnosticRecord::decode`](crate::DiagnosticRecord::decode) — that
//! writes fields at their wire offsets so tests can build well-formed
//! records without a radio attached. [`ScriptedTransport`] replays a fixed
//! sequence of poll outcomes through the [`Transport`] trait.

use crate::layout::{DIAGNOSTIC_LEN, SAMPLE_LEN};
use crate::transport::{Transport, TransportStatus};
use crate::{RecordLayout, SampleFlags};

// Wire offsets inside the record, diagnostics block first.
const OFF_IPATOV_RX_TIME: usize = 0;
const OFF_IPATOV_RX_STATUS: usize = 5;
const OFF_IPATOV_POA: usize = 6;
const OFF_STS_RX_TIME: usize = 8;
const OFF_STS_RX_STATUS: usize = 13;
const OFF_STS_POA: usize = 15;
const OFF_STS2_RX_TIME: usize = 17;
const OFF_STS2_RX_STATUS: usize = 22;
const OFF_STS2_POA: usize = 24;
const OFF_TDOA: usize = 26;
const OFF_PDOA: usize = 32;
const OFF_XTAL: usize = 34;
const OFF_CIA_DIAG1: usize = 36;
const OFF_IPATOV_PEAK: usize = 40;
const OFF_IPATOV_POWER: usize = 44;
const OFF_IPATOV_FP_INDEX: usize = 60;
const OFF_IPATOV_ACCUM: usize = 62;
const OFF_STS_PEAK: usize = 64;
const OFF_STS_POWER: usize = 68;
const OFF_STS_FP_INDEX: usize = 82;
const OFF_STS_ACCUM: usize = 84;
const OFF_STS2_PEAK: usize = 86;
const OFF_STS2_POWER: usize = 90;
const OFF_STS2_FP_INDEX: usize = 104;
const OFF_STS2_ACCUM: usize = 106;

const OFF_DGC: usize = DIAGNOSTIC_LEN;
const OFF_CFO: usize = OFF_DGC + 1;
const OFF_TEMPERATURE: usize = OFF_CFO + 4;
const OFF_VOLTAGE: usize = OFF_TEMPERATURE + 4;
const OFF_RX_DATA: usize = OFF_VOLTAGE + 4;

/// Reference encoder for one diagnostic record.
///
/// Starts from an all-zero record of the correct length for the given flags;
/// setters overwrite individual fields at their wire offsets.
pub struct RecordBuilder {
    bytes: Vec<u8>,
    flags: SampleFlags,
}

impl RecordBuilder {
    pub fn new(flags: SampleFlags) -> Self {
        Self { bytes: vec![0u8; RecordLayout::new(flags).record_len()], flags }
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }

    fn put(&mut self, offset: usize, bytes: &[u8]) {
        self.bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    fn put_u40(mut self, offset: usize, value: u64) -> Self {
        self.put(offset, &value.to_le_bytes()[..5]);
        self
    }

    fn put_u16(mut self, offset: usize, value: u16) -> Self {
        self.put(offset, &value.to_le_bytes());
        self
    }

    fn put_u32(mut self, offset: usize, value: u32) -> Self {
        self.put(offset, &value.to_le_bytes());
        self
    }

    fn put_f32(mut self, offset: usize, value: f32) -> Self {
        self.put(offset, &value.to_le_bytes());
        self
    }

    pub fn ipatov_rx_time_ticks(self, ticks: u64) -> Self {
        self.put_u40(OFF_IPATOV_RX_TIME, ticks)
    }

    pub fn sts_rx_time_ticks(self, ticks: u64) -> Self {
        self.put_u40(OFF_STS_RX_TIME, ticks)
    }

    pub fn sts2_rx_time_ticks(self, ticks: u64) -> Self {
        self.put_u40(OFF_STS2_RX_TIME, ticks)
    }

    pub fn ipatov_rx_status(mut self, status: u8) -> Self {
        self.bytes[OFF_IPATOV_RX_STATUS] = status;
        self
    }

    pub fn sts_rx_status(self, status: u16) -> Self {
        self.put_u16(OFF_STS_RX_STATUS, status)
    }

    pub fn sts2_rx_status(self, status: u16) -> Self {
        self.put_u16(OFF_STS2_RX_STATUS, status)
    }

    pub fn ipatov_poa(self, poa: u16) -> Self {
        self.put_u16(OFF_IPATOV_POA, poa)
    }

    pub fn sts_poa(self, poa: u16) -> Self {
        self.put_u16(OFF_STS_POA, poa)
    }

    pub fn sts2_poa(self, poa: u16) -> Self {
        self.put_u16(OFF_STS2_POA, poa)
    }

    pub fn tdoa_ticks(mut self, ticks: u64) -> Self {
        let bytes = ticks.to_le_bytes();
        self.put(OFF_TDOA, &bytes[..6]);
        self
    }

    pub fn pdoa(self, pdoa: i16) -> Self {
        self.put_u16(OFF_PDOA, pdoa as u16)
    }

    pub fn xtal_offset_raw(self, raw: i16) -> Self {
        self.put_u16(OFF_XTAL, raw as u16)
    }

    pub fn cia_diag1(self, word: u32) -> Self {
        self.put_u32(OFF_CIA_DIAG1, word)
    }

    pub fn ipatov_peak_word(self, word: u32) -> Self {
        self.put_u32(OFF_IPATOV_PEAK, word)
    }

    pub fn sts_peak_word(self, word: u32) -> Self {
        self.put_u32(OFF_STS_PEAK, word)
    }

    pub fn sts2_peak_word(self, word: u32) -> Self {
        self.put_u32(OFF_STS2_PEAK, word)
    }

    pub fn ipatov_power(self, power: u32) -> Self {
        self.put_u32(OFF_IPATOV_POWER, power)
    }

    pub fn sts_power(self, power: u16) -> Self {
        self.put_u16(OFF_STS_POWER, power)
    }

    pub fn sts2_power(self, power: u16) -> Self {
        self.put_u16(OFF_STS2_POWER, power)
    }

    pub fn ipatov_fp_index_raw(self, raw: u16) -> Self {
        self.put_u16(OFF_IPATOV_FP_INDEX, raw)
    }

    pub fn sts_fp_index_raw(self, raw: u16) -> Self {
        self.put_u16(OFF_STS_FP_INDEX, raw)
    }

    pub fn sts2_fp_index_raw(self, raw: u16) -> Self {
        self.put_u16(OFF_STS2_FP_INDEX, raw)
    }

    pub fn ipatov_accum_count(self, count: u16) -> Self {
        self.put_u16(OFF_IPATOV_ACCUM, count)
    }

    pub fn sts_accum_count(self, count: u16) -> Self {
        self.put_u16(OFF_STS_ACCUM, count)
    }

    pub fn sts2_accum_count(self, count: u16) -> Self {
        self.put_u16(OFF_STS2_ACCUM, count)
    }

    pub fn dgc_decision(mut self, dgc: u8) -> Self {
        self.bytes[OFF_DGC] = dgc;
        self
    }

    pub fn cfo(self, cfo: f32) -> Self {
        self.put_f32(OFF_CFO, cfo)
    }

    pub fn temperature(self, temperature: f32) -> Self {
        self.put_f32(OFF_TEMPERATURE, temperature)
    }

    pub fn voltage(self, voltage: f32) -> Self {
        self.put_f32(OFF_VOLTAGE, voltage)
    }

    pub fn stream_id(self, id: u32) -> Self {
        self.put_u32(OFF_RX_DATA, id)
    }

    pub fn seq_num(self, seq: u16) -> Self {
        self.put_u16(OFF_RX_DATA + 4, seq)
    }

    pub fn fcs(mut self, fcs: [u8; 2]) -> Self {
        self.put(OFF_RX_DATA + 6, &fcs);
        self
    }

    /// Set one Ipatov accumulator sample. Panics if the layout was built
    /// without the acc block.
    pub fn acc_sample(mut self, index: usize, i: i32, q: i32) -> Self {
        assert!(self.flags.acc, "layout has no acc sample block");
        let base = OFF_RX_DATA + 8;
        let offset = base + 1 + index * SAMPLE_LEN;
        let group = pack_sample(i, q);
        self.put(offset, &group);
        self
    }

    /// Set one STS accumulator sample. Panics if the layout was built
    /// without the sts block.
    pub fn sts_sample(mut self, index: usize, i: i32, q: i32) -> Self {
        assert!(self.flags.sts, "layout has no sts sample block");
        let mut base = OFF_RX_DATA + 8;
        if self.flags.acc {
            base += crate::layout::ACC_DATA_LEN;
        }
        let offset = base + 1 + index * SAMPLE_LEN;
        let group = pack_sample(i, q);
        self.put(offset, &group);
        self
    }
}

/// Pack a signed (I, Q) pair into the 6-byte wire group.
pub fn pack_sample(i: i32, q: i32) -> [u8; 6] {
    let i_raw = (i as u32) & 0x3FFFF;
    let q_raw = (q as u32) & 0x3FFFF;
    [
        i_raw as u8,
        (i_raw >> 8) as u8,
        (i_raw >> 16) as u8,
        q_raw as u8,
        (q_raw >> 8) as u8,
        (q_raw >> 16) as u8,
    ]
}

/// One scripted poll outcome.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// A chunk of bytes arrives.
    Data(Vec<u8>),
    /// No data; the link layer reports the given status.
    Status(TransportStatus),
    /// No data, status OK (idle poll).
    Idle,
}

/// A [`Transport`] that replays a fixed script of poll outcomes, then goes
/// idle forever.
pub struct ScriptedTransport {
    script: std::collections::VecDeque<ScriptStep>,
    chunk: Vec<u8>,
    status: TransportStatus,
    pub opened: bool,
    pub closed: bool,
    close_flag: Option<std::sync::Arc<std::sync::atomic::AtomicBool>>,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            script: script.into_iter().collect(),
            chunk: Vec::new(),
            status: TransportStatus::Ok,
            opened: false,
            closed: false,
            close_flag: None,
        }
    }

    /// Mirror `close()` into a shared flag, for workers that consume the
    /// transport.
    pub fn with_close_flag(
        mut self,
        flag: std::sync::Arc<std::sync::atomic::AtomicBool>,
    ) -> Self {
        self.close_flag = Some(flag);
        self
    }

    /// Whether every scripted step has been consumed.
    pub fn exhausted(&self) -> bool {
        self.script.is_empty()
    }
}

impl Transport for ScriptedTransport {
    fn open(&mut self) -> crate::Result<()> {
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
        if let Some(flag) = &self.close_flag {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    }

    fn available(&mut self) -> usize {
        self.chunk.clear();
        match self.script.pop_front() {
            Some(ScriptStep::Data(bytes)) => {
                self.chunk = bytes;
                self.status = TransportStatus::Ok;
            }
            Some(ScriptStep::Status(status)) => {
                self.status = status;
            }
            Some(ScriptStep::Idle) | None => {
                self.status = TransportStatus::Ok;
            }
        }
        self.chunk.len()
    }

    fn status(&self) -> TransportStatus {
        self.status
    }

    fn chunk(&self) -> &[u8] {
        &self.chunk
    }
}
