//! Capture workers and their supervisor.
//!
//! One worker runs per configured serial channel, each on its own OS thread
//! so a stalled port cannot block another channel's capture. A worker owns
//! its transport, frame assembler and session writer outright — no state is
//! shared between channels. The only cross-worker coordination primitive is
//! a single [`CancellationToken`] that every worker polls once per loop
//! iteration; on cancellation a worker finishes its current iteration,
//! closes its transport, drops any partially assembled frame and exits.
//!
//! Workers broadcast their counters through a `watch` channel on every frame
//! boundary, and log an observability checkpoint every
//! [`CHECKPOINT_INTERVAL`](crate::assembler::CHECKPOINT_INTERVAL)
//! completed-or-errored frames.

use std::path::PathBuf;
use std::thread::JoinHandle;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::assembler::{AssemblerStats, ChunkEvent, FrameAssembler, FrameEvent};
use crate::layout::MAX_PACKET_SIZE;
use crate::session::SessionWriter;
use crate::transport::{SerialTransport, Transport};
use crate::{CaptureConfig, CaptureError, RecordLayout, Result, SampleFlags};

/// Per-channel settings handed to a spawned worker.
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    /// Module name; prefixes the session directory.
    pub module_name: String,
    /// Sample-block capabilities of the module's firmware.
    pub flags: SampleFlags,
    /// Directory under which the session directory is created.
    pub output_root: PathBuf,
    /// Flush the ordinal file after every frame append.
    pub flush_writes: bool,
}

/// Handle to one running capture worker.
pub struct ChannelHandle {
    module_name: String,
    stats: watch::Receiver<AssemblerStats>,
    join: JoinHandle<Result<()>>,
}

impl ChannelHandle {
    /// Module name of the channel.
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Watch receiver for the worker's counters; updated on every frame
    /// boundary.
    pub fn stats(&self) -> watch::Receiver<AssemblerStats> {
        self.stats.clone()
    }

    /// Wait for the worker to exit and return its terminal result.
    pub fn join(self) -> Result<()> {
        self.join.join().unwrap_or_else(|_| {
            Err(CaptureError::transport_failed(self.module_name, "capture worker panicked"))
        })
    }
}

/// Handle to a full capture run: all channel workers plus the shared stop
/// token.
pub struct CaptureHandle {
    cancel: CancellationToken,
    channels: Vec<ChannelHandle>,
}

impl CaptureHandle {
    /// The shared stop token. Cancelling it stops every worker.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The running channels.
    pub fn channels(&self) -> &[ChannelHandle] {
        &self.channels
    }

    /// Cancel all workers and wait for each to exit.
    ///
    /// Returns one `(module_name, result)` pair per channel, in
    /// configuration order.
    pub fn shutdown(self) -> Vec<(String, Result<()>)> {
        self.cancel.cancel();
        self.channels
            .into_iter()
            .map(|channel| {
                let name = channel.module_name.clone();
                (name, channel.join())
            })
            .collect()
    }
}

/// Entry point for capture runs.
pub struct Capture;

impl Capture {
    /// Spawn one serial capture worker per configured port.
    pub fn spawn(config: &CaptureConfig) -> Result<CaptureHandle> {
        let cancel = CancellationToken::new();
        let mut channels = Vec::with_capacity(config.ports.len());

        for port in &config.ports {
            let transport = SerialTransport::new(&port.port, config.baud_rate);
            let settings = ChannelSettings {
                module_name: port.module_name.clone(),
                flags: config.flags,
                output_root: config.output_root.clone(),
                flush_writes: config.flush_writes,
            };
            channels.push(Self::spawn_channel(transport, settings, cancel.clone())?);
        }

        info!(channels = channels.len(), "capture started");
        Ok(CaptureHandle { cancel, channels })
    }

    /// Spawn a single capture worker over an arbitrary transport.
    pub fn spawn_channel<T: Transport + 'static>(
        transport: T,
        settings: ChannelSettings,
        cancel: CancellationToken,
    ) -> Result<ChannelHandle> {
        let (stats_tx, stats_rx) = watch::channel(AssemblerStats::default());
        let module_name = settings.module_name.clone();

        let join = std::thread::Builder::new()
            .name(format!("uwb-capture-{module_name}"))
            .spawn(move || run_channel(transport, settings, cancel, stats_tx))
            .map_err(|e| {
                CaptureError::transport_failed_with_source(
                    module_name.clone(),
                    "failed to spawn capture worker",
                    Box::new(e),
                )
            })?;

        Ok(ChannelHandle { module_name, stats: stats_rx, join })
    }
}

/// Per-channel capture loop: poll, assemble, persist.
fn run_channel<T: Transport>(
    mut transport: T,
    settings: ChannelSettings,
    cancel: CancellationToken,
    stats_tx: watch::Sender<AssemblerStats>,
) -> Result<()> {
    transport.open()?;
    let mut writer = SessionWriter::create(&settings.output_root, &settings.module_name)?;

    let layout = RecordLayout::new(settings.flags);
    let packets_per_frame = layout.packets_per_frame(MAX_PACKET_SIZE);
    let mut assembler = FrameAssembler::new(packets_per_frame);

    info!(
        module = %settings.module_name,
        packets_per_frame,
        record_len = layout.record_len(),
        "capture worker started"
    );

    let result = (|| {
        while !cancel.is_cancelled() {
            let event = if transport.available() > 0 {
                ChunkEvent::Data(transport.chunk())
            } else if !transport.status().is_ok() {
                ChunkEvent::TransportError(transport.status())
            } else {
                // Idle poll; the transport's read timeout paces the loop.
                continue;
            };

            let Some(frame_event) = assembler.feed(event) else {
                continue;
            };

            match frame_event {
                FrameEvent::Completed(frame) => {
                    writer.append(&frame, settings.flush_writes)?;
                }
                FrameEvent::Discarded { ordinal } => {
                    debug!(module = %settings.module_name, ordinal, "errored frame discarded");
                }
            }

            let stats = assembler.stats();
            stats_tx.send_replace(stats);

            if assembler.checkpoint_due() {
                info!(
                    module = %settings.module_name,
                    ordinal = stats.ordinal,
                    rx_frames = stats.frames_completed,
                    err_frames = stats.frames_errored,
                    "capture checkpoint"
                );
            }
        }
        Ok(())
    })();

    // Any partially assembled frame is dropped with the assembler.
    transport.close();
    info!(module = %settings.module_name, "capture worker stopped");
    result
}
