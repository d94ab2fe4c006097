//! bgapi-test-harness: Test utilities for the BGAPI driver.
//!
//! This crate provides [`MockTransport`] for deterministic testing of the
//! frame assembler, transaction coordinator and event dispatcher without a
//! real module attached, and [`MockHandle`] for steering the mock after it
//! has been moved into a handler.

pub mod mock_serial;

pub use mock_serial::{MockHandle, MockTransport};
