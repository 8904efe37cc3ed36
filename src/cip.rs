//! The CIP request/response engine: the single place that turns a
//! `{class, instance, attribute, service, payload}` tuple into bytes on
//! the wire and a response (or a diagnostic) back.
//!
//! Every call here opens its own socket and session — there is no
//! connection reuse across operations, per the concurrency model: each
//! caller gets an independently torn-down round trip.

use crate::codec::{read_u8, require_bytes};
use crate::enip;
use crate::error::{Error, Result};
use crate::path::CipPath;
use crate::session::{self, Session};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::trace;

pub const SERVICE_GET_ATTRIBUTE_ALL: u8 = 0x01;
pub const SERVICE_SET_ATTRIBUTE_ALL: u8 = 0x02;
pub const SERVICE_GET_ATTRIBUTE_SINGLE: u8 = 0x0E;
pub const SERVICE_SET_ATTRIBUTE_SINGLE: u8 = 0x10;
pub const SERVICE_READ_TAG: u8 = 0x4C;
pub const SERVICE_WRITE_TAG: u8 = 0x4D;

const REPLY_SERVICE_MASK: u8 = 0x80;

/// The CIP-layer portion of a reply: the payload (with the CIP header
/// and any additional-status words stripped) and how many bytes of it
/// were actually read off the wire versus declared by the CPF item.
pub struct CipResponse {
    pub data: Vec<u8>,
    pub data_length: usize,
}

/// Builds `service | path_size_words | path | payload`, per the
/// distilled wire format for a CIP request.
fn build_cip_request(service: u8, path: &CipPath, payload: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(2 + path.bytes().len() + payload.len());
    out.push(service);
    out.push(path.size_words()?);
    out.extend_from_slice(path.bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Parses `service|0x80 | reserved | general_status | additional_status_size_words
/// | additional_status[...] | response_data` and returns the data,
/// raising [`Error::CipStatus`] for a nonzero general status.
fn parse_cip_reply(bytes: &[u8]) -> Result<&[u8]> {
    require_bytes(bytes, 4)?;
    let reply_service = read_u8(bytes, 0)?;
    if reply_service & REPLY_SERVICE_MASK == 0 {
        return Err(Error::protocol(format!(
            "CIP reply service 0x{reply_service:02X} does not have the reply bit set"
        )));
    }
    let general_status = read_u8(bytes, 2)?;
    let additional_words = read_u8(bytes, 3)? as usize;
    let additional_bytes = additional_words * 2;
    let data_at = 4 + additional_bytes;
    require_bytes(bytes, data_at)?;
    if general_status != 0 {
        return Err(Error::cip_status(general_status));
    }
    Ok(&bytes[data_at..])
}

/// Executes one CIP request against `endpoint`: opens a socket, opens a
/// session, sends the request wrapped in `SendRRData`, waits for and
/// parses the reply, then lets the session close (via `Drop`) before
/// returning.
///
/// `attribute` is folded into the path by the caller (the facades decide
/// whether their service takes one); this function only cares about
/// `service`, `path`, and `payload`.
pub fn execute(
    endpoint: SocketAddr,
    service: u8,
    path: &CipPath,
    payload: &[u8],
    timeout: Duration,
) -> Result<CipResponse> {
    let mut session = Session::open(endpoint, timeout)?;
    let cip_request = build_cip_request(service, path, payload)?;
    let cip_timeout_secs = timeout.as_secs().clamp(1, 255) as u8;
    let request = enip::build_send_rr_data(session.handle(), cip_timeout_secs, &cip_request);

    crate::transport::send_all(session.stream(), &request, timeout)?;
    // Only the header is guaranteed up front; the CPF item's declared
    // length (read below) drives how much more to pull off the wire, so
    // asking for more than the bare header here would just block this
    // first read until the peer's reply happens to be that long.
    let raw = session::read_full_header_and_body(session.stream(), 0, timeout)?;

    let parsed = enip::parse_header(&raw, enip::CMD_SEND_RR_DATA)?;
    let mut body = parsed.rest.to_vec();
    // The declared CPF item-2 length may exceed what a short first read
    // delivered; top up from the socket against that declared length.
    // The whole top-up loop is bounded by one `timeout`, not one per
    // recv_some call — a deadline computed once up front, mirroring
    // transport::udp_broadcast's gather loop, rather than re-passing the
    // full timeout to every iteration.
    let deadline = Instant::now() + timeout;
    let declared_total = loop {
        match enip::parse_send_rr_data_body(&parsed.header, &body) {
            Ok(reply) => break reply,
            Err(_) if body.len() < 65535 => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(Error::Timeout(timeout));
                }
                let more = crate::transport::recv_some(session.stream(), 4096, remaining)?;
                if more.is_empty() {
                    return Err(Error::protocol("SendRRData reply ended before a full CPF item"));
                }
                body.extend_from_slice(&more);
                continue;
            }
            Err(e) => return Err(e),
        }
    };

    trace!(
        service,
        declared_len = declared_total.declared_len,
        got_len = declared_total.cip_bytes.len(),
        "parsed SendRRData reply"
    );

    let data = parse_cip_reply(&declared_total.cip_bytes)?;
    Ok(CipResponse {
        data: data.to_vec(),
        data_length: data.len(),
    })
}
