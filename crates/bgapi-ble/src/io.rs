//! The IO task.
//!
//! A single Tokio task owns the transport. It writes queued frames one at a
//! time, feeds every received byte to the [`FrameAssembler`], decodes
//! completed frames through the [`PacketRegistry`] and routes the result:
//! events to the [`EventDispatcher`], responses to the [`WaiterRegistry`].
//!
//! The task ends on cancellation (shutdown), when every handle has been
//! dropped, or on a fatal transport condition: end of stream, or more
//! consecutive I/O errors than the configured budget allows.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use bgapi_core::error::{Error, Result};
use bgapi_core::transport::Transport;

use crate::dispatcher::EventDispatcher;
use crate::frame::{Frame, FrameAssembler, MAX_FRAME_LEN};
use crate::handler::Lifecycle;
use crate::registry::PacketRegistry;
use crate::transaction::WaiterRegistry;

/// Configuration for the IO task.
#[derive(Debug, Clone)]
pub(crate) struct IoConfig {
    /// How long one transport read may wait before the loop checks for
    /// outbound frames and cancellation again.
    pub poll_interval: Duration,
    /// Consecutive I/O errors tolerated before the handler is declared dead.
    pub max_io_errors: u32,
    /// Depth of the outbound queue.
    pub outbound_capacity: usize,
}

/// State shared between the handler and the IO task.
pub(crate) struct Shared {
    pub registry: PacketRegistry,
    pub waiters: Arc<WaiterRegistry>,
    pub dispatcher: EventDispatcher,
    pub lifecycle: Lifecycle,
}

/// A request from the handler to the IO task.
pub(crate) enum Request {
    /// Write one serialized frame.
    Write {
        frame: Vec<u8>,
        written: oneshot::Sender<Result<()>>,
    },
}

/// Handle to the IO task, owned by the handler.
pub(crate) struct HandlerIo {
    pub cmd_tx: mpsc::Sender<Request>,
    pub cancel: CancellationToken,
    pub task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl HandlerIo {
    /// Queue a frame for writing.
    pub async fn write(&self, frame: Vec<u8>) -> Result<oneshot::Receiver<Result<()>>> {
        let (written, rx) = oneshot::channel();
        self.cmd_tx
            .send(Request::Write { frame, written })
            .await
            .map_err(|_| Error::DeadHandler)?;
        Ok(rx)
    }
}

/// Spawn the IO task.
pub(crate) fn spawn_io_task(
    transport: Box<dyn Transport>,
    config: IoConfig,
    shared: Arc<Shared>,
) -> HandlerIo {
    let (cmd_tx, cmd_rx) = mpsc::channel::<Request>(config.outbound_capacity.max(1));
    let cancel = CancellationToken::new();
    let task = tokio::spawn(io_loop(transport, config, shared, cmd_rx, cancel.clone()));

    HandlerIo {
        cmd_tx,
        cancel,
        task: std::sync::Mutex::new(Some(task)),
    }
}

/// Why the loop stopped.
enum Exit {
    /// Shutdown requested or every handle dropped.
    Stopped,
    /// Unrecoverable transport condition.
    Fatal(String),
}

/// Pause after a recoverable receive error so a failing port is not spun on.
const ERROR_BACKOFF: Duration = Duration::from_millis(10);

async fn io_loop(
    mut transport: Box<dyn Transport>,
    config: IoConfig,
    shared: Arc<Shared>,
    mut cmd_rx: mpsc::Receiver<Request>,
    cancel: CancellationToken,
) {
    let mut assembler = FrameAssembler::new();
    let mut buf = [0u8; MAX_FRAME_LEN * 4];
    let mut io_errors: u32 = 0;

    let exit = loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("IO task cancelled");
                break Exit::Stopped;
            }

            req = cmd_rx.recv() => {
                match req {
                    Some(Request::Write { frame, written }) => {
                        trace!(tx = ?frame, "writing frame");
                        match transport.send(&frame).await {
                            Ok(()) => {
                                io_errors = 0;
                                let _ = written.send(Ok(()));
                            }
                            Err(e) => {
                                io_errors += 1;
                                warn!(error = %e, io_errors, "frame write failed");
                                let cause = format!("write failed: {e}");
                                let _ = written.send(Err(e));
                                if io_errors > config.max_io_errors {
                                    break Exit::Fatal(cause);
                                }
                            }
                        }
                    }
                    None => {
                        debug!("all handler references dropped, exiting IO task");
                        break Exit::Stopped;
                    }
                }
            }

            result = transport.receive(&mut buf, config.poll_interval) => {
                match result {
                    Ok(0) => break Exit::Fatal("end of stream".into()),
                    Ok(n) => {
                        io_errors = 0;
                        trace!(rx = ?&buf[..n], "received bytes");
                        for &byte in &buf[..n] {
                            if let Some(frame) = assembler.push(byte) {
                                route(&shared, frame);
                            }
                        }
                    }
                    Err(Error::Timeout) => {}
                    Err(e) => {
                        io_errors += 1;
                        warn!(error = %e, io_errors, "transport read failed");
                        if io_errors > config.max_io_errors {
                            break Exit::Fatal(format!("read failed: {e}"));
                        }
                        tokio::time::sleep(ERROR_BACKOFF).await;
                    }
                }
            }
        }
    };

    match exit {
        Exit::Stopped => {
            shared.waiters.close(|| Error::DeadHandler);
        }
        Exit::Fatal(cause) => {
            error!(cause = %cause, "transport failed, handler terminated");
            shared.lifecycle.terminate(&Error::TransportFatal(cause.clone()));
            shared
                .waiters
                .close(|| Error::TransportFatal(cause.clone()));
        }
    }

    // Anything still queued will never be written.
    cmd_rx.close();
    while let Ok(Request::Write { written, .. }) = cmd_rx.try_recv() {
        let _ = written.send(Err(Error::DeadHandler));
    }

    shared.dispatcher.close();
    if let Err(e) = transport.close().await {
        warn!(error = %e, "failed to close transport");
    }
    debug!("IO task exited");
}

/// Decode one frame and hand it to waiters or listeners.
///
/// The header's message-kind bit decides the path, not the decoded type.
fn route(shared: &Shared, frame: Frame) {
    let id = frame.id();
    let response = match shared.registry.decode(&frame) {
        Ok(response) => response,
        Err(Error::UnknownPacket { .. }) => {
            debug!(
                class_id = frame.class_id,
                command_id = frame.command_id,
                is_event = id.is_event,
                "unknown packet dropped"
            );
            return;
        }
        Err(e) if e.is_frame_local() => {
            warn!(
                error = %e,
                raw = ?frame.to_bytes(),
                "packet decode failed, frame dropped"
            );
            return;
        }
        Err(e) => {
            error!(error = %e, packet = ?id, "decoder failed, frame dropped");
            return;
        }
    };

    debug!(packet = response.name(), event = id.is_event, "received packet");

    if id.is_event {
        shared.dispatcher.publish(response);
    } else if let Err(response) = shared.waiters.resolve(id, response) {
        debug!(packet = response.name(), "response with no pending transaction");
    }
}
