//! Serial port transport.
//!
//! Thin adapter from a [`serialport`] handle to the [`Transport`] contract.
//! The device firmware handles link-layer packetization and CRC; this side
//! reads whatever bytes have arrived since the last poll and surfaces them
//! as one chunk. Read timeouts are the normal idle case and map to "no data,
//! status OK" so the worker's busy-poll loop keeps spinning.

use std::io::Read;
use std::time::Duration;

use serialport::SerialPort;
use tracing::debug;

use super::{Transport, TransportStatus};
use crate::{CaptureError, Result};

/// Upper bound on bytes consumed per poll.
const READ_BUF_SIZE: usize = 1024;

/// Default per-poll read timeout.
const READ_TIMEOUT: Duration = Duration::from_millis(10);

/// A [`Transport`] backed by a physical serial port.
pub struct SerialTransport {
    port_name: String,
    baud_rate: u32,
    port: Option<Box<dyn SerialPort>>,
    buf: [u8; READ_BUF_SIZE],
    chunk_len: usize,
    status: TransportStatus,
}

impl SerialTransport {
    /// Create an unopened transport for the named port.
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            port: None,
            buf: [0u8; READ_BUF_SIZE],
            chunk_len: 0,
            status: TransportStatus::Ok,
        }
    }

    /// The configured port name.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl Transport for SerialTransport {
    fn open(&mut self) -> Result<()> {
        let port = serialport::new(&self.port_name, self.baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| {
                CaptureError::transport_failed_with_source(
                    self.port_name.clone(),
                    "failed to open serial port",
                    Box::new(e),
                )
            })?;

        debug!(port = %self.port_name, baud = self.baud_rate, "serial port opened");
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!(port = %self.port_name, "serial port closed");
        }
    }

    fn available(&mut self) -> usize {
        self.chunk_len = 0;
        let Some(port) = self.port.as_mut() else {
            return 0;
        };

        match port.read(&mut self.buf) {
            Ok(n) => {
                self.chunk_len = n;
                self.status = TransportStatus::Ok;
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                // Idle link; nothing arrived within the poll timeout.
                self.status = TransportStatus::Ok;
            }
            Err(e) => {
                debug!(port = %self.port_name, error = %e, "serial read failed");
                self.status = TransportStatus::Other(e.raw_os_error().unwrap_or(-1) as i16);
            }
        }
        self.chunk_len
    }

    fn status(&self) -> TransportStatus {
        self.status
    }

    fn chunk(&self) -> &[u8] {
        &self.buf[..self.chunk_len]
    }
}
