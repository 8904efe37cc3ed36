//! TCP connect-with-timeout and UDP broadcast-and-gather.
//!
//! The host platform's network facilities are treated as an external
//! collaborator: this module is a thin, explicit wrapper around
//! `std::net`, not an abstraction layer with injectable backends. Every
//! blocking point here is bounded by a caller-supplied timeout.

use crate::error::{Error, Result};
use std::io::{Read, Write};
use std::net::{IpAddr, SocketAddr, TcpStream, UdpSocket};
use std::time::{Duration, Instant};
use tracing::trace;

/// Opens a TCP connection to `endpoint`, bounded by `timeout`, and sets
/// both the read and write timeouts on the resulting socket to `timeout`
/// so every later `send_all`/`recv_some` call on it is itself bounded.
pub fn tcp_connect(endpoint: SocketAddr, timeout: Duration) -> Result<TcpStream> {
    let stream = TcpStream::connect_timeout(&endpoint, timeout).map_err(|e| Error::from_io(e, timeout))?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;
    stream.set_nodelay(true)?;
    trace!(%endpoint, ?timeout, "tcp_connect");
    Ok(stream)
}

/// Writes `bytes` in full, bounded by the socket's configured write
/// timeout; `timeout` is only consulted to label a `WouldBlock`/
/// `TimedOut` failure as [`Error::Timeout`] rather than a generic
/// transport error.
pub fn send_all(stream: &mut TcpStream, bytes: &[u8], timeout: Duration) -> Result<()> {
    stream.write_all(bytes).map_err(|e| Error::from_io(e, timeout))?;
    Ok(())
}

/// Reads up to `max` bytes, bounded by `timeout` (reapplied to the
/// socket on every call, so a caller looping against a shrinking
/// deadline — see `cip::execute`'s reply top-up loop — actually gets a
/// shorter read timeout on later iterations rather than the connection's
/// original one). May return fewer bytes than `max` on a short read;
/// callers reassemble up to whatever length the protocol declared.
pub fn recv_some(stream: &mut TcpStream, max: usize, timeout: Duration) -> Result<Vec<u8>> {
    stream.set_read_timeout(Some(timeout))?;
    let mut buf = vec![0u8; max];
    let n = stream.read(&mut buf).map_err(|e| Error::from_io(e, timeout))?;
    buf.truncate(n);
    Ok(buf)
}

/// Broadcasts `payload` to `port` on the limited broadcast address and
/// collects `(source_ip, bytes)` pairs until `gather_window` elapses or
/// `max_results` raw datagrams have arrived, whichever comes first. Does
/// not deduplicate; callers (see [`crate::discovery`]) decide how to fold
/// duplicate responses, so `max_results` bounds the network-level gather
/// loop, not the final device count.
pub fn udp_broadcast(
    port: u16,
    payload: &[u8],
    gather_window: Duration,
    max_results: usize,
) -> Result<Vec<(IpAddr, Vec<u8>)>> {
    let socket = UdpSocket::bind(("0.0.0.0", 0))?;
    socket.set_broadcast(true)?;
    socket.send_to(payload, ("255.255.255.255", port))?;

    let deadline = Instant::now() + gather_window;
    let mut out = Vec::new();
    let mut buf = [0u8; 1500];
    while out.len() < max_results {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        socket.set_read_timeout(Some(remaining))?;
        match socket.recv_from(&mut buf) {
            Ok((n, from)) => out.push((from.ip(), buf[..n].to_vec())),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
            Err(e) => return Err(Error::from(e)),
        }
    }
    trace!(port, responses = out.len(), "udp_broadcast gathered");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn tcp_connect_and_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut buf = [0u8; 5];
            sock.read_exact(&mut buf).unwrap();
            sock.write_all(&buf).unwrap();
        });

        let mut client = tcp_connect(addr, Duration::from_secs(1)).unwrap();
        send_all(&mut client, b"hello", Duration::from_secs(1)).unwrap();
        let got = recv_some(&mut client, 5, Duration::from_secs(1)).unwrap();
        assert_eq!(got, b"hello");
        server.join().unwrap();
    }

    #[test]
    fn tcp_connect_times_out_against_a_dead_address() {
        // A non-routable TEST-NET-1 address; connect_timeout must fail
        // within the bound rather than hang, and surface as Error::Timeout
        // rather than a generic transport error.
        let addr: SocketAddr = "192.0.2.1:44818".parse().unwrap();
        let result = tcp_connect(addr, Duration::from_millis(200));
        assert!(matches!(result, Err(Error::Timeout(_))));
    }
}
