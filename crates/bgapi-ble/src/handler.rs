//! BgapiHandler -- the transaction coordinator.
//!
//! The handler is the public face of a running driver. It queues commands
//! for the IO task, registers waiters for their responses, and exposes the
//! event dispatcher and lifecycle notifications.
//!
//! Correlation is structural: a waiter is completed by the first response
//! whose class and command id equal those of the command it sent. Two
//! outstanding commands with the same identity cannot be told apart, so
//! [`BgapiHandler::send_and_wait`] serializes its callers and only one such
//! exchange is in flight at a time.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info};

use bgapi_core::address::BdAddr;
use bgapi_core::error::{Error, Result};

use crate::commands;
use crate::dispatcher::{EventListener, SubscriptionId};
use crate::frame::Command;
use crate::io::{HandlerIo, Shared};
use crate::packets::{
    Response, SystemGetConnectionsResponse, SystemGetCountersResponse, SystemGetInfoResponse,
};
use crate::transaction::{SendHandle, Transaction};

/// Notified when the handler terminates because the transport failed.
///
/// The call happens once, synchronously on the IO task, after which no
/// further responses or events are delivered. An orderly
/// [`shutdown`](BgapiHandler::shutdown) does not notify.
pub trait HandlerListener: Send + Sync + 'static {
    fn handler_closed(&self, cause: &Error);
}

impl<F> HandlerListener for F
where
    F: Fn(&Error) + Send + Sync + 'static,
{
    fn handler_closed(&self, cause: &Error) {
        self(cause)
    }
}

#[derive(Default)]
struct LifecycleState {
    dead: bool,
    listeners: Vec<Arc<dyn HandlerListener>>,
}

/// Alive/dead state plus lifecycle listeners.
#[derive(Default)]
pub(crate) struct Lifecycle {
    state: Mutex<LifecycleState>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_alive(&self) -> bool {
        !self.lock().dead
    }

    pub(crate) fn add_listener(&self, listener: Arc<dyn HandlerListener>) {
        self.lock().listeners.push(listener);
    }

    /// Mark the handler dead and notify listeners with `cause`. Only the
    /// first call after the handler was alive notifies anyone.
    pub(crate) fn terminate(&self, cause: &Error) {
        let listeners = {
            let mut state = self.lock();
            if state.dead {
                return;
            }
            state.dead = true;
            std::mem::take(&mut state.listeners)
        };
        for listener in listeners {
            listener.handler_closed(cause);
        }
    }

    /// Mark the handler dead without notifying. Returns `true` if it was
    /// alive.
    pub(crate) fn stop(&self) -> bool {
        let mut state = self.lock();
        let was_alive = !state.dead;
        state.dead = true;
        state.listeners.clear();
        was_alive
    }
}

/// A running BGAPI driver.
///
/// Construct with [`BgapiBuilder`](crate::builder::BgapiBuilder).
pub struct BgapiHandler {
    io: HandlerIo,
    shared: Arc<Shared>,
    command_timeout: Duration,
    exchange: tokio::sync::Mutex<()>,
}

impl Drop for BgapiHandler {
    fn drop(&mut self) {
        self.shared.lifecycle.stop();
        self.io.cancel.cancel();
        self.shared.waiters.close(|| Error::DeadHandler);
        self.shared.dispatcher.close();
        if let Some(task) = self
            .io
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

impl BgapiHandler {
    pub(crate) fn new(io: HandlerIo, shared: Arc<Shared>, command_timeout: Duration) -> Self {
        BgapiHandler {
            io,
            shared,
            command_timeout,
            exchange: tokio::sync::Mutex::new(()),
        }
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.shared.lifecycle.is_alive() {
            Ok(())
        } else {
            Err(Error::DeadHandler)
        }
    }

    /// Queue a command without waiting for a response.
    ///
    /// Frames are written in the order they are queued, one at a time. The
    /// returned handle resolves once the frame has been written.
    pub async fn send(&self, command: &Command) -> Result<SendHandle> {
        self.ensure_alive()?;
        debug!(
            class_id = command.class_id(),
            command_id = command.command_id(),
            "queueing command"
        );
        let rx = self.io.write(command.to_bytes()).await?;
        Ok(SendHandle { rx })
    }

    /// Queue a command and return a [`Transaction`] for its response.
    ///
    /// The waiter is registered before the command is queued.
    pub async fn send_async(&self, command: &Command) -> Result<Transaction> {
        self.ensure_alive()?;
        let (id, rx) = self.shared.waiters.register(command.response_id())?;
        let mut transaction = Transaction {
            id,
            rx: Some(rx),
            written: None,
            waiters: Arc::clone(&self.shared.waiters),
        };
        // On error the transaction is dropped, which removes the waiter.
        transaction.written = Some(self.send(command).await?);
        Ok(transaction)
    }

    /// Send a command and wait for its response.
    ///
    /// Callers are serialized: a second call waits until the first has its
    /// response or has timed out. `timeout` starts when the call is made and
    /// also covers the time spent queued behind earlier callers. `None`
    /// waits without limit, which is only safe when the transport is known
    /// to fail rather than hang.
    pub async fn send_and_wait(
        &self,
        command: &Command,
        timeout: Option<Duration>,
    ) -> Result<Response> {
        let exchange = async {
            let _exchange = self.exchange.lock().await;
            let transaction = self.send_async(command).await?;
            transaction.wait(None).await
        };

        match timeout {
            // Dropping the exchange on expiry drops its transaction, which
            // removes the waiter.
            Some(limit) => tokio::time::timeout(limit, exchange).await.unwrap_or_else(|_| {
                debug!(
                    class_id = command.class_id(),
                    command_id = command.command_id(),
                    ?limit,
                    "command timed out"
                );
                Err(Error::Timeout)
            }),
            None => exchange.await,
        }
    }

    /// [`send_and_wait`](Self::send_and_wait) with the configured command
    /// timeout.
    pub async fn transaction(&self, command: &Command) -> Result<Response> {
        self.send_and_wait(command, Some(self.command_timeout)).await
    }

    // ---------------------------------------------------------------
    // Events and lifecycle
    // ---------------------------------------------------------------

    /// Register a listener for unsolicited events.
    pub fn add_event_listener(&self, listener: impl EventListener) -> SubscriptionId {
        self.shared.dispatcher.subscribe(listener)
    }

    /// Remove an event listener. Returns `false` if it was not registered.
    pub fn remove_event_listener(&self, id: SubscriptionId) -> bool {
        self.shared.dispatcher.unsubscribe(id)
    }

    /// Subscribe to the event stream.
    ///
    /// Slow receivers may observe [`broadcast::error::RecvError::Lagged`].
    /// Once the handler is dead the stream ends with
    /// [`broadcast::error::RecvError::Closed`].
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Response>> {
        self.shared.dispatcher.stream()
    }

    /// Register a listener for fatal termination.
    ///
    /// A listener added after the handler has died is never called.
    pub fn add_handler_listener(&self, listener: impl HandlerListener) {
        self.shared.lifecycle.add_listener(Arc::new(listener));
    }

    pub fn is_alive(&self) -> bool {
        self.shared.lifecycle.is_alive()
    }

    /// Number of transactions awaiting a response.
    pub fn pending_transactions(&self) -> usize {
        self.shared.waiters.len()
    }

    /// The default timeout used by [`transaction`](Self::transaction).
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Stop the IO task and close the transport.
    ///
    /// Pending transactions fail with [`Error::DeadHandler`]. Safe to call
    /// more than once and after a fatal termination.
    pub async fn shutdown(&self) -> Result<()> {
        if self.shared.lifecycle.stop() {
            info!("shutting down BGAPI handler");
        }
        self.io.cancel.cancel();
        let task = self
            .io
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                debug!(error = %e, "IO task ended abnormally");
            }
        }
        self.shared.waiters.close(|| Error::DeadHandler);
        self.shared.dispatcher.close();
        Ok(())
    }

    // ---------------------------------------------------------------
    // System convenience calls
    // ---------------------------------------------------------------

    /// Check that the module answers.
    pub async fn hello(&self) -> Result<()> {
        match self.transaction(&commands::system_hello()).await? {
            Response::SystemHello(_) => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn get_info(&self) -> Result<SystemGetInfoResponse> {
        match self.transaction(&commands::system_get_info()).await? {
            Response::SystemGetInfo(info) => Ok(info),
            other => Err(unexpected(&other)),
        }
    }

    /// The module's own device address.
    pub async fn address(&self) -> Result<BdAddr> {
        match self.transaction(&commands::system_address_get()).await? {
            Response::SystemAddressGet(rsp) => Ok(rsp.address),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn get_counters(&self) -> Result<SystemGetCountersResponse> {
        match self.transaction(&commands::system_get_counters()).await? {
            Response::SystemGetCounters(counters) => Ok(counters),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn get_connections(&self) -> Result<SystemGetConnectionsResponse> {
        match self.transaction(&commands::system_get_connections()).await? {
            Response::SystemGetConnections(rsp) => Ok(rsp),
            other => Err(unexpected(&other)),
        }
    }

    /// Reset the module. Does not wait for the boot event.
    pub async fn reset(&self, boot_in_dfu: bool) -> Result<()> {
        self.send(&commands::system_reset(boot_in_dfu))
            .await?
            .written()
            .await
    }
}

fn unexpected(response: &Response) -> Error {
    Error::Protocol(format!("unexpected response {}", response.name()))
}

impl std::fmt::Debug for BgapiHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BgapiHandler")
            .field("alive", &self.is_alive())
            .field("pending_transactions", &self.pending_transactions())
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BgapiBuilder;
    use crate::enums::{BgApiResponse, GapDiscoverMode};
    use crate::frame::PacketId;
    use crate::packets::SystemHelloResponse;
    use crate::registry::PacketRegistry;
    use bgapi_test_harness::{MockHandle, MockTransport};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const HELLO: [u8; 4] = [0x00, 0x00, 0x00, 0x01];
    const GET_CONNECTIONS_CMD: [u8; 4] = [0x00, 0x00, 0x00, 0x06];
    const GET_CONNECTIONS_RSP: [u8; 5] = [0x00, 0x01, 0x00, 0x06, 0x03];
    const DISCONNECTED_EVT: [u8; 7] = [0x80, 0x03, 0x03, 0x04, 0x00, 0x13, 0x02];

    async fn handler_with(mock: MockTransport) -> (BgapiHandler, MockHandle) {
        let handle = mock.handle();
        let handler = BgapiBuilder::new()
            .poll_interval(Duration::from_millis(10))
            .max_io_errors(2)
            .command_timeout(Duration::from_millis(500))
            .build_with_transport(Box::new(mock))
            .await
            .unwrap();
        (handler, handle)
    }

    #[tokio::test]
    async fn hello_round_trip() {
        let mut mock = MockTransport::new();
        mock.expect(&HELLO, &HELLO);
        let (handler, handle) = handler_with(mock).await;

        handler.hello().await.unwrap();
        assert_eq!(handle.remaining_expectations(), 0);
        assert_eq!(handler.pending_transactions(), 0);
        handler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn typed_system_calls() {
        let mut mock = MockTransport::new();
        mock.expect(&GET_CONNECTIONS_CMD, &GET_CONNECTIONS_RSP);
        mock.expect(
            &[0x00, 0x00, 0x00, 0x02],
            &[0x00, 0x06, 0x00, 0x02, 0xF2, 0x9E, 0x2D, 0x80, 0x07, 0x00],
        );
        let (handler, _) = handler_with(mock).await;

        assert_eq!(handler.get_connections().await.unwrap().maxconn, 3);
        assert_eq!(
            handler.address().await.unwrap().to_string(),
            "00:07:80:2D:9E:F2"
        );
        handler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn response_after_unrelated_frame_correlates() {
        let mut mock = MockTransport::new();
        // The module answers get_connections with an unrelated response
        // first (a stale hello), then the real one.
        let mut reply = HELLO.to_vec();
        reply.extend_from_slice(&GET_CONNECTIONS_RSP);
        mock.expect(&GET_CONNECTIONS_CMD, &reply);
        let (handler, _) = handler_with(mock).await;

        let rsp = handler
            .send_and_wait(&commands::system_get_connections(), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        match rsp {
            Response::SystemGetConnections(r) => assert_eq!(r.maxconn, 3),
            other => panic!("resolved with {other:?}"),
        }
        handler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn event_with_matching_ids_does_not_resolve_waiter() {
        let mut mock = MockTransport::new();
        // An event with the same class/command as the command, then the
        // actual response.
        let mut reply = vec![0x80, 0x01, 0x00, 0x06, 0x09];
        reply.extend_from_slice(&GET_CONNECTIONS_RSP);
        mock.expect(&GET_CONNECTIONS_CMD, &reply);
        let (handler, _) = handler_with(mock).await;

        let rsp = handler
            .transaction(&commands::system_get_connections())
            .await
            .unwrap();
        assert!(matches!(rsp, Response::SystemGetConnections(r) if r.maxconn == 3));
        handler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn event_listener_receives_events() {
        let (handler, handle) = handler_with(MockTransport::new()).await;
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = Arc::clone(&seen);
        handler.add_event_listener(move |event: &Response| {
            if matches!(event, Response::ConnectionDisconnected(_)) {
                seen2.fetch_add(1, Ordering::SeqCst);
            }
        });
        let mut stream = handler.subscribe();

        handle.inject(&DISCONNECTED_EVT);
        let event = stream.recv().await.unwrap();
        match &*event {
            Response::ConnectionDisconnected(e) => {
                assert_eq!(e.reason, BgApiResponse::RemoteUserTerminatedConnection)
            }
            other => panic!("unexpected event {other:?}"),
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        handler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn timeout_without_response_removes_waiter() {
        let (handler, _) = handler_with(MockTransport::new()).await;

        let start = tokio::time::Instant::now();
        let result = handler
            .send_and_wait(&commands::system_hello(), Some(Duration::from_millis(50)))
            .await;
        let elapsed = start.elapsed();

        assert!(matches!(result, Err(Error::Timeout)));
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(500));
        assert_eq!(handler.pending_transactions(), 0);
        assert!(handler.is_alive());
        handler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn dropped_transaction_removes_waiter() {
        let (handler, _) = handler_with(MockTransport::new()).await;
        let txn = handler.send_async(&commands::system_hello()).await.unwrap();
        assert_eq!(handler.pending_transactions(), 1);
        drop(txn);
        assert_eq!(handler.pending_transactions(), 0);
        handler.shutdown().await.unwrap();
    }

    async fn wait_for_sent(handle: &MockHandle, count: usize) {
        for _ in 0..100 {
            if handle.sent_data().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {count} frames to be written");
    }

    #[tokio::test]
    async fn send_and_wait_callers_are_serialized() {
        let (handler, handle) = handler_with(MockTransport::new()).await;
        let handler = Arc::new(handler);

        let h1 = Arc::clone(&handler);
        let first = tokio::spawn(async move {
            h1.send_and_wait(&commands::system_hello(), Some(Duration::from_secs(1)))
                .await
        });
        wait_for_sent(&handle, 1).await;

        let h2 = Arc::clone(&handler);
        let second = tokio::spawn(async move {
            h2.send_and_wait(&commands::system_get_connections(), Some(Duration::from_secs(1)))
                .await
        });
        // The second command waits for the first exchange to finish.
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(handle.sent_data().len(), 1);

        handle.inject(&HELLO);
        assert!(matches!(
            first.await.unwrap().unwrap(),
            Response::SystemHello(_)
        ));

        wait_for_sent(&handle, 2).await;
        assert_eq!(handle.sent_data()[1], GET_CONNECTIONS_CMD.to_vec());
        handle.inject(&GET_CONNECTIONS_RSP);
        assert!(matches!(
            second.await.unwrap().unwrap(),
            Response::SystemGetConnections(_)
        ));
        handler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn timeout_covers_time_queued_behind_another_caller() {
        let (handler, handle) = handler_with(MockTransport::new()).await;
        let handler = Arc::new(handler);

        // The first caller waits without limit for a response that never comes.
        let h1 = Arc::clone(&handler);
        let first =
            tokio::spawn(async move { h1.send_and_wait(&commands::system_hello(), None).await });
        wait_for_sent(&handle, 1).await;

        let start = tokio::time::Instant::now();
        let result = tokio::time::timeout(
            Duration::from_secs(1),
            handler.send_and_wait(
                &commands::system_get_connections(),
                Some(Duration::from_millis(50)),
            ),
        )
        .await
        .expect("queued call must honour its own timeout");
        assert!(matches!(result, Err(Error::Timeout)));
        assert!(start.elapsed() < Duration::from_millis(500));
        // Only the first command was ever written.
        assert_eq!(handle.sent_data().len(), 1);
        assert_eq!(handler.pending_transactions(), 1);

        handle.inject(&HELLO);
        assert!(matches!(
            first.await.unwrap().unwrap(),
            Response::SystemHello(_)
        ));
        assert_eq!(handler.pending_transactions(), 0);
        handler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn event_frame_never_resolves_waiter_even_if_decoded_as_response() {
        let mock = MockTransport::new();
        let handle = mock.handle();
        let mut registry = PacketRegistry::standard();
        // An event id whose decoder yields a response-typed value.
        registry.register(PacketId::event(0x00, 0x01), |_: &[u8]| {
            Ok(Response::SystemHello(SystemHelloResponse {}))
        });
        let handler = BgapiBuilder::new()
            .poll_interval(Duration::from_millis(10))
            .registry(registry)
            .build_with_transport(Box::new(mock))
            .await
            .unwrap();
        let mut events = handler.subscribe();

        let pending = handler.send_async(&commands::system_hello()).await.unwrap();
        handle.inject(&[0x80, 0x00, 0x00, 0x01]);

        // The frame goes to the event path.
        let event = events.recv().await.unwrap();
        assert!(matches!(*event, Response::SystemHello(_)));
        assert!(matches!(
            pending.wait(Some(Duration::from_millis(50))).await,
            Err(Error::Timeout)
        ));
        handler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn event_stream_closes_when_transport_ends() {
        let (handler, handle) = handler_with(MockTransport::new()).await;
        let mut events = handler.subscribe();

        handle.end_of_stream();
        let result = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap();
        assert!(matches!(result, Err(broadcast::error::RecvError::Closed)));
        assert!(!handler.is_alive());

        let mut late = handler.subscribe();
        assert!(matches!(
            late.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[tokio::test]
    async fn event_stream_closes_on_shutdown() {
        let (handler, _) = handler_with(MockTransport::new()).await;
        let mut events = handler.subscribe();
        handler.shutdown().await.unwrap();
        assert!(matches!(
            events.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn event_listener_added_from_plain_thread() {
        let (handler, handle) = handler_with(MockTransport::new()).await;
        let handler = Arc::new(handler);
        let seen = Arc::new(AtomicUsize::new(0));

        let (h2, seen2) = (Arc::clone(&handler), Arc::clone(&seen));
        std::thread::spawn(move || {
            h2.add_event_listener(move |_: &Response| {
                seen2.fetch_add(1, Ordering::SeqCst);
            });
        })
        .join()
        .unwrap();

        handle.inject(&DISCONNECTED_EVT);
        for _ in 0..100 {
            if seen.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        handler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn fatal_error_fails_pending_and_later_calls() {
        let (handler, handle) = handler_with(MockTransport::new()).await;
        let notified = Arc::new(AtomicUsize::new(0));
        let notified2 = Arc::clone(&notified);
        handler.add_handler_listener(move |cause: &Error| {
            assert!(matches!(cause, Error::TransportFatal(_)));
            notified2.fetch_add(1, Ordering::SeqCst);
        });

        let pending = handler.send_async(&commands::system_hello()).await.unwrap();
        handle.end_of_stream();

        let result = tokio::time::timeout(Duration::from_secs(1), pending.wait(None))
            .await
            .unwrap();
        assert!(matches!(result, Err(Error::TransportFatal(_))));
        assert!(!handler.is_alive());
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        let start = tokio::time::Instant::now();
        assert!(matches!(
            handler.send(&commands::system_hello()).await,
            Err(Error::DeadHandler)
        ));
        assert!(matches!(
            handler.transaction(&commands::system_hello()).await,
            Err(Error::DeadHandler)
        ));
        assert!(start.elapsed() < Duration::from_millis(100));

        // Shutdown after death is fine and does not notify again.
        handler.shutdown().await.unwrap();
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn write_errors_beyond_budget_kill_handler() {
        let (handler, handle) = handler_with(MockTransport::new()).await;
        handle.fail_sends(true);

        for _ in 0..3 {
            let sent = handler.send(&commands::system_hello()).await;
            if let Ok(sent) = sent {
                assert!(sent.written().await.is_err());
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handler.is_alive());
        assert!(matches!(
            handler.send(&commands::system_hello()).await,
            Err(Error::DeadHandler)
        ));
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_and_fails_pending() {
        let (handler, handle) = handler_with(MockTransport::new()).await;
        let notified = Arc::new(AtomicUsize::new(0));
        let notified2 = Arc::clone(&notified);
        handler.add_handler_listener(move |_: &Error| {
            notified2.fetch_add(1, Ordering::SeqCst);
        });

        let pending = handler
            .send_async(&commands::gap_discover(GapDiscoverMode::Generic))
            .await
            .unwrap();
        handler.shutdown().await.unwrap();
        handler.shutdown().await.unwrap();

        assert!(matches!(pending.wait(None).await, Err(Error::DeadHandler)));
        assert!(!handler.is_alive());
        assert!(!handle.is_connected());
        assert_eq!(notified.load(Ordering::SeqCst), 0);
        assert!(matches!(
            handler.send_async(&commands::system_hello()).await,
            Err(Error::DeadHandler)
        ));
    }

    #[tokio::test]
    async fn reset_is_fire_and_forget() {
        let (handler, handle) = handler_with(MockTransport::new()).await;
        handler.reset(false).await.unwrap();
        assert_eq!(handle.sent_data(), vec![vec![0x00, 0x01, 0x00, 0x00, 0x00]]);
        assert_eq!(handler.pending_transactions(), 0);
        handler.shutdown().await.unwrap();
    }
}
