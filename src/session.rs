//! Session registration, the one stateful object in this crate.
//!
//! A [`Session`] moves through `Opening → Registered → Closed` and never
//! comes back: `Closed` is terminal. Unregistering on every exit path is
//! modeled as an RAII guard rather than a manually-threaded cleanup call
//! — `Session`'s `Drop` impl sends `UnRegisterSession` if the session is
//! still open, so a CIP operation that returns early via `?` still closes
//! its session.

use crate::codec::require_bytes;
use crate::enip::{self, CMD_REGISTER_SESSION, HEADER_LEN};
use crate::error::{Error, Result};
use crate::transport;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Opening,
    Registered,
    Closed,
}

/// An open TCP socket plus the 32-bit handle the peer issued for it.
/// Exclusively owned by whichever operation opened it — there is no
/// session pooling across calls.
pub struct Session {
    stream: TcpStream,
    handle: u32,
    state: State,
    timeout: Duration,
}

impl Session {
    /// Connects to `endpoint` and performs the `RegisterSession`
    /// exchange, bounded by `timeout`.
    pub fn open(endpoint: SocketAddr, timeout: Duration) -> Result<Session> {
        let stream = transport::tcp_connect(endpoint, timeout)?;
        let mut session = Session {
            stream,
            handle: 0,
            state: State::Opening,
            timeout,
        };
        let request = enip::build_register_session();
        transport::send_all(&mut session.stream, &request, timeout)?;

        let reply = read_full_header_and_body(&mut session.stream, 4, timeout)?;
        let parsed = enip::parse_header(&reply, CMD_REGISTER_SESSION)?;
        if parsed.header.status != 0 {
            return Err(Error::protocol(format!(
                "RegisterSession failed with ENIP status 0x{:08X}",
                parsed.header.status
            )));
        }
        session.handle = parsed.header.session_handle;
        session.state = State::Registered;
        debug!(session_handle = session.handle, %endpoint, "registered ENIP session");
        Ok(session)
    }

    pub fn handle(&self) -> u32 {
        self.handle
    }

    pub fn stream(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    /// Explicit unregister; ordinarily callers just let `Session` drop,
    /// but an operation that wants to observe unregister failures (the
    /// distilled contract: "logged but do not mask a prior successful
    /// result") can call this and inspect the result directly.
    pub fn close(mut self) -> Result<()> {
        self.unregister()
    }

    fn unregister(&mut self) -> Result<()> {
        if self.state != State::Registered {
            return Ok(());
        }
        let request = enip::build_unregister_session(self.handle);
        transport::send_all(&mut self.stream, &request, self.timeout)?;
        self.state = State::Closed;
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state == State::Registered {
            if let Err(e) = self.unregister() {
                warn!(error = %e, session_handle = self.handle, "UnRegisterSession failed during drop");
            }
        }
    }
}

/// Reads until at least `HEADER_LEN + min_body` bytes are in hand,
/// performing one or two `recv_some` calls as the distilled contract
/// requires, then returns whatever was actually read (which may still be
/// short of the full declared length for large replies; [`crate::cip`]
/// handles that case against the CPF item length, not this helper).
pub(crate) fn read_full_header_and_body(stream: &mut TcpStream, min_body: usize, timeout: Duration) -> Result<Vec<u8>> {
    let want = HEADER_LEN + min_body;
    let mut buf = transport::recv_some(stream, want.max(HEADER_LEN + 40), timeout)?;
    while buf.len() < want {
        let more = transport::recv_some(stream, want - buf.len(), timeout)?;
        if more.is_empty() {
            break;
        }
        buf.extend_from_slice(&more);
    }
    require_bytes(&buf, HEADER_LEN)?;
    Ok(buf)
}
