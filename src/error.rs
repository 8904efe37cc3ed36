//! Error taxonomy for the scanner.
//!
//! Every fallible operation in this crate returns [`Result<T>`], built
//! around a single [`Error`] enum. Nothing here retries or logs at
//! `error` level — errors are returned to the caller, who decides how
//! loudly to report them.

use std::io;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A null or out-of-range input was detected before any I/O began.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation was attempted before [`crate::Scanner::init`] / after
    /// [`crate::Scanner::shutdown`].
    #[error("scanner is not initialized")]
    NotInitialized,

    /// DNS/connect/send/recv failure at the socket layer.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// The declared operation timeout elapsed before a reply arrived.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// A request or response buffer could not be allocated.
    #[error("out of memory: could not allocate {0} bytes")]
    OutOfMemory(usize),

    /// Well-formed at the transport layer but wrong at the ENIP/CPF
    /// layer: unexpected item type, short response, wrong command echo.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The CIP reply carried a nonzero general status.
    #[error("CIP status 0x{code:02X}: {name}")]
    CipStatus { code: u8, name: &'static str },

    /// The data-type dispatch table has no entry for this code.
    #[error("unsupported CIP data type 0x{0:02X}")]
    UnsupportedType(u16),

    /// A parser needed more bytes than the buffer actually held.
    #[error("buffer underrun: needed {needed} bytes, had {available}")]
    BufferUnderrun { needed: usize, available: usize },
}

impl Error {
    pub(crate) fn buffer_underrun(needed: usize, available: usize) -> Error {
        Error::BufferUnderrun { needed, available }
    }

    /// Maps an I/O failure from a bounded socket call into [`Error`]:
    /// a timeout-shaped `io::Error` (`WouldBlock`/`TimedOut` — which
    /// kind libc reports for an expired `SO_RCVTIMEO`/`SO_SNDTIMEO`
    /// varies by platform) becomes [`Error::Timeout`], carrying the
    /// bound that elapsed; anything else is a [`Error::Transport`].
    pub(crate) fn from_io(e: io::Error, timeout: Duration) -> Error {
        match e.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Error::Timeout(timeout),
            _ => Error::Transport(e),
        }
    }

    pub(crate) fn protocol(msg: impl Into<String>) -> Error {
        Error::Protocol(msg.into())
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Error {
        Error::InvalidArgument(msg.into())
    }

    /// Builds a [`Error::CipStatus`] from a general-status byte, looking up
    /// its human-readable name in [`CIP_STATUS_TABLE`].
    pub(crate) fn cip_status(code: u8) -> Error {
        let name = CIP_STATUS_TABLE
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, name)| *name)
            .unwrap_or("Unknown CIP status");
        Error::CipStatus { code, name }
    }
}

/// General-status codes defined by the CIP specification, 0x01..0x2B, plus
/// the vendor-reserved 0x81 that Motoman controllers use for an invalid
/// instance/attribute.
pub const CIP_STATUS_TABLE: &[(u8, &str)] = &[
    (0x01, "Connection failure"),
    (0x02, "Resource unavailable"),
    (0x03, "Invalid parameter value"),
    (0x04, "Path segment error"),
    (0x05, "Path destination unknown"),
    (0x06, "Partial transfer"),
    (0x07, "Connection lost"),
    (0x08, "Service not supported"),
    (0x09, "Invalid attribute value"),
    (0x0A, "Attribute list error"),
    (0x0B, "Already in requested mode/state"),
    (0x0C, "Object state conflict"),
    (0x0D, "Object already exists"),
    (0x0E, "Attribute not settable"),
    (0x0F, "Privilege violation"),
    (0x10, "Device state conflict"),
    (0x11, "Reply data too large"),
    (0x12, "Fragmentation of a primitive value"),
    (0x13, "Not enough data"),
    (0x14, "Attribute not supported"),
    (0x15, "Too much data"),
    (0x16, "Object does not exist"),
    (0x17, "Service fragmentation sequence not in progress"),
    (0x18, "No stored attribute data"),
    (0x19, "Store operation failure"),
    (0x1A, "Routing failure, request too large"),
    (0x1B, "Routing failure, response too large"),
    (0x1C, "Missing attribute list entry data"),
    (0x1D, "Invalid attribute value list"),
    (0x1E, "Embedded service error"),
    (0x1F, "Vendor specific error"),
    (0x20, "Invalid parameter"),
    (0x21, "Write-once value or medium already written"),
    (0x22, "Invalid reply received"),
    (0x23, "Buffer overflow"),
    (0x24, "Invalid message format"),
    (0x25, "Key failure in path"),
    (0x26, "Path size invalid"),
    (0x27, "Unexpected attribute in list"),
    (0x28, "Invalid member ID"),
    (0x29, "Member not settable"),
    (0x2A, "Group 2 only server general failure"),
    (0x2B, "Unknown Modbus error"),
    (0x81, "Vendor invalid instance/attribute"),
];
