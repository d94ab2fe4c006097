//! The byte stream between host and module.
//!
//! BGAPI frames carry their own length, so a [`Transport`] only moves bytes:
//! the handler writes one complete frame per [`send`](Transport::send) and
//! reassembles inbound frames from whatever chunks
//! [`receive`](Transport::receive) returns. `bgapi-transport` provides the
//! serial implementation and `bgapi-test-harness` a scripted mock.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Asynchronous byte link to a module. Owned by a single IO task.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write one frame. Returns once every byte has been handed to the link.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Read whatever is available into `buf`, waiting at most `timeout`.
    ///
    /// Returns the byte count, [`Error::Timeout`](crate::error::Error::Timeout)
    /// if nothing arrived in time, or `Ok(0)` when the link reached end of
    /// stream. End of stream is permanent.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Release the link. Later `send` and `receive` calls fail with
    /// [`Error::NotConnected`](crate::error::Error::NotConnected); closing
    /// twice is not an error.
    async fn close(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;
}
