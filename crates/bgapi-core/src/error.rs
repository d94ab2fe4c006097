//! Error types for the BGAPI driver.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer, framing-layer and
//! transaction-layer failures are all captured here.
//!
//! Only a few variants ever reach calling code: [`Error::Timeout`],
//! [`Error::TransportFatal`] and [`Error::DeadHandler`]. Framing noise,
//! unknown packets and short payloads are recovered inside the reader task
//! and only show up in the logs.

/// The error type for all BGAPI operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port, mock transport).
    #[error("transport error: {0}")]
    Transport(String),

    /// The transport failed beyond the retry budget or reached end of
    /// stream. The handler that observed it is terminated.
    #[error("transport failed: {0}")]
    TransportFatal(String),

    /// A protocol-level error (bad header, unexpected frame layout).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No entry in the packet registry for this identity.
    #[error(
        "unknown packet class=0x{class_id:02X} command=0x{command_id:02X} event={is_event}"
    )]
    UnknownPacket {
        class_id: u8,
        command_id: u8,
        is_event: bool,
    },

    /// A decode primitive would have read past the end of the frame.
    #[error("truncated payload: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    /// An invalid parameter was passed to a command builder.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Timed out waiting for a response from the module.
    #[error("timeout waiting for response")]
    Timeout,

    /// The handler has terminated and rejects all further operations.
    #[error("handler is dead")]
    DeadHandler,

    /// No connection to the module has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the module was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` for errors that are recovered locally by dropping the
    /// offending frame rather than surfaced to a caller.
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            Error::Protocol(_) | Error::UnknownPacket { .. } | Error::Truncated { .. }
        )
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_transport() {
        let e = Error::Transport("device or resource busy".into());
        assert_eq!(e.to_string(), "transport error: device or resource busy");
    }

    #[test]
    fn error_display_transport_fatal() {
        let e = Error::TransportFatal("end of stream".into());
        assert_eq!(e.to_string(), "transport failed: end of stream");
    }

    #[test]
    fn error_display_unknown_packet() {
        let e = Error::UnknownPacket {
            class_id: 0x06,
            command_id: 0x0A,
            is_event: true,
        };
        assert_eq!(
            e.to_string(),
            "unknown packet class=0x06 command=0x0A event=true"
        );
    }

    #[test]
    fn error_display_truncated() {
        let e = Error::Truncated {
            needed: 2,
            available: 1,
        };
        assert_eq!(e.to_string(), "truncated payload: needed 2 bytes, 1 available");
    }

    #[test]
    fn error_display_timeout() {
        assert_eq!(Error::Timeout.to_string(), "timeout waiting for response");
    }

    #[test]
    fn error_display_dead_handler() {
        assert_eq!(Error::DeadHandler.to_string(), "handler is dead");
    }

    #[test]
    fn io_errors_convert() {
        let e: Error = std::io::Error::other("dongle unplugged").into();
        assert!(matches!(e, Error::Io(_)));
        assert_eq!(e.to_string(), "I/O error: dongle unplugged");
    }

    #[test]
    fn frame_local_classification() {
        assert!(Error::Protocol("bad header".into()).is_frame_local());
        assert!(
            Error::Truncated {
                needed: 1,
                available: 0
            }
            .is_frame_local()
        );
        assert!(!Error::Timeout.is_frame_local());
        assert!(!Error::DeadHandler.is_frame_local());
        assert!(!Error::TransportFatal("x".into()).is_frame_local());
    }

    #[test]
    fn crosses_task_boundaries() {
        fn thread_safe<T: Send + Sync + 'static>() {}
        thread_safe::<Error>();
    }
}
