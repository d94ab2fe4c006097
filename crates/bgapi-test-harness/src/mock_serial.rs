//! Mock transport for deterministic testing of the BGAPI driver.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs. When the driver writes a frame that matches the
//! next expectation, the paired response bytes become readable. Unlike a
//! strict request/reply script, the mock behaves like a byte stream:
//! responses, injected events and noise all land in one receive queue and
//! may be delivered in arbitrarily small chunks.
//!
//! Once the mock has been moved into a handler, a [`MockHandle`] obtained
//! from [`MockTransport::handle`] can still inject bytes, simulate faults and
//! inspect what was written.
//!
//! # Example
//!
//! ```
//! use bgapi_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // system_hello command -> system_hello response
//! mock.expect(&[0x00, 0x00, 0x00, 0x01], &[0x00, 0x00, 0x00, 0x01]);
//! let handle = mock.handle();
//! // boot event arriving unsolicited
//! handle.inject(&[0x80, 0x0C, 0x00, 0x00, 1, 0, 4, 0, 0, 0, 0x33, 0x01, 0x03, 0x00, 0x01, 0x01]);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

use bgapi_core::error::{Error, Result};
use bgapi_core::transport::Transport;

/// A pre-loaded request/response pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    request: Vec<u8>,
    response: Vec<u8>,
}

/// Simulated receive-side failure.
#[derive(Debug, Clone)]
enum Fault {
    /// Every receive fails with a transport error.
    Io(String),
    /// Every receive reports end of stream.
    EndOfStream,
}

#[derive(Debug)]
struct Shared {
    expectations: VecDeque<Expectation>,
    rx: VecDeque<u8>,
    sent_log: Vec<Vec<u8>>,
    connected: bool,
    fault: Option<Fault>,
    fail_sends: bool,
    chunk_size: usize,
}

/// A mock [`Transport`] for testing without hardware.
///
/// Sends that arrive while the expectation queue is empty are recorded and
/// succeed without producing a response, which models a module that never
/// answers. A send that does not match the next expectation fails with
/// [`Error::Protocol`].
#[derive(Debug, Clone)]
pub struct MockTransport {
    shared: Arc<Mutex<Shared>>,
    notify: Arc<Notify>,
}

/// Control handle for a [`MockTransport`] that has been handed off.
#[derive(Debug, Clone)]
pub struct MockHandle {
    shared: Arc<Mutex<Shared>>,
    notify: Arc<Notify>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            shared: Arc::new(Mutex::new(Shared {
                expectations: VecDeque::new(),
                rx: VecDeque::new(),
                sent_log: Vec::new(),
                connected: true,
                fault: None,
                fail_sends: false,
                chunk_size: usize::MAX,
            })),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Add an expected request/response pair.
    ///
    /// When `send()` is called with data matching `request`, `response`
    /// is appended to the receive queue.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        lock(&self.shared).expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// Limit how many bytes a single `receive()` call returns.
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        lock(&self.shared).chunk_size = chunk_size.max(1);
    }

    /// Get a control handle sharing this mock's state.
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            shared: Arc::clone(&self.shared),
            notify: Arc::clone(&self.notify),
        }
    }

    /// Return all data that has been sent through this transport.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.handle().sent_data()
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.handle().remaining_expectations()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHandle {
    /// Append bytes to the receive queue as if the module had sent them.
    pub fn inject(&self, bytes: &[u8]) {
        lock(&self.shared).rx.extend(bytes.iter().copied());
        self.notify.notify_waiters();
    }

    /// Make every subsequent `receive()` fail with [`Error::Transport`].
    pub fn fail_receives(&self, reason: &str) {
        lock(&self.shared).fault = Some(Fault::Io(reason.to_string()));
        self.notify.notify_waiters();
    }

    /// Make every subsequent `receive()` report end of stream.
    pub fn end_of_stream(&self) {
        lock(&self.shared).fault = Some(Fault::EndOfStream);
        self.notify.notify_waiters();
    }

    /// Clear a fault set by [`fail_receives`](Self::fail_receives) or
    /// [`end_of_stream`](Self::end_of_stream).
    pub fn clear_fault(&self) {
        lock(&self.shared).fault = None;
    }

    /// Make every subsequent `send()` fail with [`Error::Transport`].
    pub fn fail_sends(&self, fail: bool) {
        lock(&self.shared).fail_sends = fail;
    }

    /// Return every frame written so far, one element per `send()` call.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        lock(&self.shared).sent_log.clone()
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        lock(&self.shared).expectations.len()
    }

    /// Whether the transport is still open.
    pub fn is_connected(&self) -> bool {
        lock(&self.shared).connected
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut shared = lock(&self.shared);
        if !shared.connected {
            return Err(Error::NotConnected);
        }
        if shared.fail_sends {
            return Err(Error::Transport("simulated write failure".into()));
        }

        shared.sent_log.push(data.to_vec());

        match shared.expectations.pop_front() {
            Some(expectation) => {
                if data != expectation.request.as_slice() {
                    return Err(Error::Protocol(format!(
                        "unexpected send data: expected {:02X?}, got {:02X?}",
                        expectation.request, data
                    )));
                }
                shared.rx.extend(expectation.response);
                drop(shared);
                self.notify.notify_waiters();
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Registered before the state check so an inject between the
            // check and the await is not missed.
            let notified = self.notify.notified();
            {
                let mut shared = lock(&self.shared);
                if !shared.connected {
                    return Err(Error::NotConnected);
                }
                match &shared.fault {
                    Some(Fault::Io(reason)) => return Err(Error::Transport(reason.clone())),
                    Some(Fault::EndOfStream) => return Ok(0),
                    None => {}
                }
                if !shared.rx.is_empty() {
                    let n = shared.rx.len().min(buf.len()).min(shared.chunk_size);
                    for (slot, byte) in buf.iter_mut().zip(shared.rx.drain(..n)) {
                        *slot = byte;
                    }
                    return Ok(n);
                }
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(Error::Timeout);
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        {
            let mut shared = lock(&self.shared);
            shared.connected = false;
            shared.rx.clear();
        }
        self.notify.notify_waiters();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        lock(&self.shared).connected
    }
}
