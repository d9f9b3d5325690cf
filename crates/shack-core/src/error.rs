//! Error types for shack.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Variants fall into four groups that a
//! caller at the request boundary can act on differently:
//!
//! - transient conditions (busy port, silent device) that a rediscovery pass
//!   or a later attempt may clear,
//! - protocol violations (CRC, length, non-ack) that are never retried inside
//!   the codec,
//! - lexical errors from the text scanners,
//! - resource absence, split into "no ports at all" and "no port matched".

use crate::types::Role;

/// The error type for all shack operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port open/configure failure).
    #[error("transport error: {0}")]
    Transport(String),

    /// A protocol-level error not covered by a more specific variant.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Timed out waiting for a response from a device.
    ///
    /// Devices that cannot answer within the read timeout are treated as
    /// absent, not slow.
    #[error("timeout waiting for response")]
    Timeout,

    /// An invalid parameter was passed to a device command.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The transport has been closed.
    #[error("not connected")]
    NotConnected,

    /// The connection to the device was lost unexpectedly (unplugged).
    #[error("connection lost")]
    ConnectionLost,

    /// The OS enumeration returned no serial ports at all.
    #[error("no serial ports were found")]
    NoPorts,

    /// Serial ports exist but none passed the USB / vendor filter.
    #[error("no port matched the USB vendor filter")]
    NoPortMatch,

    /// The OS reports the port as already in use.
    #[error("serial port busy: {0}")]
    PortBusy(String),

    /// The role has no live device even after a discovery pass.
    #[error("remote {0} is down")]
    RemoteDown(Role),

    /// Fewer bytes were written than the fixed frame length.
    #[error("short write: expected {expected} bytes, wrote {actual}")]
    ShortWrite {
        /// Bytes the frame requires.
        expected: usize,
        /// Bytes actually written.
        actual: usize,
    },

    /// Fewer bytes were read than the fixed reply length.
    #[error("short read: expected {expected} bytes, read {actual}")]
    ShortRead {
        /// Bytes the reply requires.
        expected: usize,
        /// Bytes actually read.
        actual: usize,
    },

    /// The device answered with something other than the ack byte.
    #[error("remote replied 0x{0:02X} instead of ack")]
    Nack(u8),

    /// A received frame failed its CRC check.
    #[error("CRC mismatch: computed 0x{expected:04X}, received 0x{actual:04X}")]
    CrcMismatch {
        /// CRC computed over the received payload.
        expected: u16,
        /// CRC carried in the frame.
        actual: u16,
    },

    /// A lexer emitted an error token.
    #[error("lexer error: {0}")]
    Lex(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` for conditions a rediscovery pass or a later attempt
    /// may clear (busy port, silent or unplugged device).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Timeout
                | Error::PortBusy(_)
                | Error::ConnectionLost
                | Error::NotConnected
                | Error::RemoteDown(_)
        )
    }

    /// Returns `true` for wire-protocol violations. These point at wiring or
    /// firmware faults and are surfaced to the caller unchanged.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Error::Protocol(_)
                | Error::ShortWrite { .. }
                | Error::ShortRead { .. }
                | Error::Nack(_)
                | Error::CrcMismatch { .. }
        )
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_no_ports_vs_no_match() {
        assert_eq!(Error::NoPorts.to_string(), "no serial ports were found");
        assert_eq!(
            Error::NoPortMatch.to_string(),
            "no port matched the USB vendor filter"
        );
    }

    #[test]
    fn error_display_remote_down() {
        let e = Error::RemoteDown(Role::Vfo);
        assert_eq!(e.to_string(), "remote vfo is down");
    }

    #[test]
    fn error_display_nack() {
        assert_eq!(
            Error::Nack(0x00).to_string(),
            "remote replied 0x00 instead of ack"
        );
    }

    #[test]
    fn error_display_crc_mismatch() {
        let e = Error::CrcMismatch {
            expected: 0x3063,
            actual: 0x3062,
        };
        assert_eq!(
            e.to_string(),
            "CRC mismatch: computed 0x3063, received 0x3062"
        );
    }

    #[test]
    fn error_display_short_read() {
        let e = Error::ShortRead {
            expected: 3,
            actual: 1,
        };
        assert_eq!(e.to_string(), "short read: expected 3 bytes, read 1");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn transient_classification() {
        assert!(Error::Timeout.is_transient());
        assert!(Error::PortBusy("/dev/ttyUSB0".into()).is_transient());
        assert!(Error::RemoteDown(Role::Cw).is_transient());
        assert!(!Error::Nack(0).is_transient());
        assert!(!Error::NoPorts.is_transient());
    }

    #[test]
    fn protocol_violation_classification() {
        assert!(Error::Nack(0x00).is_protocol_violation());
        assert!(
            Error::CrcMismatch {
                expected: 1,
                actual: 2
            }
            .is_protocol_violation()
        );
        assert!(
            Error::ShortWrite {
                expected: 8,
                actual: 5
            }
            .is_protocol_violation()
        );
        assert!(!Error::Timeout.is_protocol_violation());
        assert!(!Error::Lex("no frequency field".into()).is_protocol_violation());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
