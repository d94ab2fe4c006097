//! Pending transactions and the waiter registry.
//!
//! A waiter is registered before its command is queued, so a response can
//! never arrive ahead of the waiter that expects it. The IO task offers every
//! decoded non-event frame to [`WaiterRegistry::resolve`], which completes
//! the oldest waiter whose command has the same class and command id.
//! Frames with the event bit set are never offered to waiters.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

use bgapi_core::error::{Error, Result};

use crate::frame::PacketId;
use crate::packets::Response;

struct Waiter {
    id: u64,
    expects: PacketId,
    reply: oneshot::Sender<Result<Response>>,
}

#[derive(Default)]
struct Waiters {
    next_id: u64,
    pending: VecDeque<Waiter>,
    closed: bool,
}

/// One-shot waiters for command responses.
#[derive(Default)]
pub(crate) struct WaiterRegistry {
    inner: Mutex<Waiters>,
}

impl WaiterRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Waiters> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a waiter for the response to a command with identity
    /// `expects`. Fails with [`Error::DeadHandler`] once the registry has been
    /// closed.
    pub(crate) fn register(
        &self,
        expects: PacketId,
    ) -> Result<(u64, oneshot::Receiver<Result<Response>>)> {
        let mut waiters = self.lock();
        if waiters.closed {
            return Err(Error::DeadHandler);
        }
        waiters.next_id += 1;
        let id = waiters.next_id;
        let (reply, rx) = oneshot::channel();
        waiters.pending.push_back(Waiter { id, expects, reply });
        Ok((id, rx))
    }

    /// Remove a waiter that will no longer be awaited.
    pub(crate) fn remove(&self, id: u64) -> bool {
        let mut waiters = self.lock();
        let before = waiters.pending.len();
        waiters.pending.retain(|w| w.id != id);
        waiters.pending.len() != before
    }

    /// Complete the oldest waiter expecting `id`, the identity read from the
    /// frame header that carried `response`.
    ///
    /// Returns the response back when no waiter accepted it. A frame with
    /// the event bit set never completes a waiter, whatever it decoded to.
    pub(crate) fn resolve(
        &self,
        id: PacketId,
        response: Response,
    ) -> std::result::Result<(), Response> {
        if id.is_event {
            return Err(response);
        }
        let waiter = {
            let mut waiters = self.lock();
            let Some(pos) = waiters.pending.iter().position(|w| w.expects == id) else {
                return Err(response);
            };
            waiters.pending.remove(pos)
        };
        match waiter {
            Some(waiter) => {
                debug!(
                    transaction = waiter.id,
                    packet = response.name(),
                    "transaction complete"
                );
                // The caller may have given up in the meantime.
                let _ = waiter.reply.send(Ok(response));
                Ok(())
            }
            None => Err(response),
        }
    }

    /// Fail every pending waiter and reject all later registrations.
    pub(crate) fn close(&self, error: impl Fn() -> Error) {
        let drained: Vec<Waiter> = {
            let mut waiters = self.lock();
            waiters.closed = true;
            waiters.pending.drain(..).collect()
        };
        if !drained.is_empty() {
            debug!(count = drained.len(), "failing pending transactions");
        }
        for waiter in drained {
            let _ = waiter.reply.send(Err(error()));
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().pending.len()
    }
}

/// Completion of a queued write.
#[derive(Debug)]
pub struct SendHandle {
    pub(crate) rx: oneshot::Receiver<Result<()>>,
}

impl SendHandle {
    /// Wait until the frame has been written to the transport.
    ///
    /// Fails with the transport's error if the write failed, or with
    /// [`Error::DeadHandler`] if the handler stopped before writing it.
    pub async fn written(self) -> Result<()> {
        self.rx.await.unwrap_or(Err(Error::DeadHandler))
    }
}

/// A command that has been queued and is awaiting its response.
///
/// Dropping a `Transaction` without waiting removes its waiter.
pub struct Transaction {
    pub(crate) id: u64,
    pub(crate) rx: Option<oneshot::Receiver<Result<Response>>>,
    pub(crate) written: Option<SendHandle>,
    pub(crate) waiters: Arc<WaiterRegistry>,
}

impl Transaction {
    /// Wait for the response, up to `timeout` if one is given.
    ///
    /// The timeout covers both the write and the response. On timeout the
    /// waiter is removed and [`Error::Timeout`] returned; the command is not
    /// resent.
    pub async fn wait(mut self, timeout: Option<Duration>) -> Result<Response> {
        let written = self.written.take();
        let rx = self.rx.take();
        let exchange = async move {
            if let Some(written) = written {
                written.written().await?;
            }
            match rx {
                Some(rx) => rx.await.unwrap_or(Err(Error::DeadHandler)),
                None => Err(Error::DeadHandler),
            }
        };

        match timeout {
            Some(limit) => match tokio::time::timeout(limit, exchange).await {
                Ok(result) => result,
                Err(_) => {
                    debug!(transaction = self.id, ?limit, "transaction timed out");
                    Err(Error::Timeout)
                }
            },
            None => exchange.await,
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        self.waiters.remove(self.id);
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction").field("id", &self.id).finish()
    }
}
