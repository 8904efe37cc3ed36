//! The EtherNet/IP encapsulation header and Common Packet Format (CPF)
//! item list used inside `SendRRData` and `ListIdentity`.
//!
//! This is the layer a real peer is least forgiving about: every
//! multi-byte field is little-endian, every CPF item is a
//! `{type, length, payload}` triple, and a `SendRRData` reply always
//! carries exactly two items (a zero-length Null Address item followed
//! by the Unconnected Data item that actually holds the CIP reply).
//!
//! [`parse_header`] tolerates a small amount of garbage before the
//! header: some peers prepend noise, and a partial socket read can
//! resync mid-stream. The scan is deliberately narrow (the first 8
//! bytes, on a 2-byte stride) so it can't accidentally swallow a
//! legitimate short response.

use crate::codec::*;
use crate::error::{Error, Result};
use tracing::warn;

pub const HEADER_LEN: usize = 24;
pub const ENIP_PORT: u16 = 44818;

pub const CMD_LIST_IDENTITY: u16 = 0x0063;
pub const CMD_REGISTER_SESSION: u16 = 0x0065;
pub const CMD_UNREGISTER_SESSION: u16 = 0x0066;
pub const CMD_SEND_RR_DATA: u16 = 0x006F;

pub const CPF_NULL_ADDRESS: u16 = 0x0000;
pub const CPF_IDENTITY: u16 = 0x000C;
pub const CPF_UNCONNECTED_DATA: u16 = 0x00B2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnipHeader {
    pub command: u16,
    pub length: u16,
    pub session_handle: u32,
    pub status: u32,
    pub sender_context: [u8; 8],
    pub options: u32,
}

impl EnipHeader {
    pub fn encode(&self, out: &mut Vec<u8>) {
        write_u16(out, self.command);
        write_u16(out, self.length);
        write_u32(out, self.session_handle);
        write_u32(out, self.status);
        out.extend_from_slice(&self.sender_context);
        write_u32(out, self.options);
    }

    fn decode(buf: &[u8]) -> Result<EnipHeader> {
        require_bytes(buf, HEADER_LEN)?;
        let mut sender_context = [0u8; 8];
        sender_context.copy_from_slice(&buf[8..16]);
        Ok(EnipHeader {
            command: read_u16(buf, 0)?,
            length: read_u16(buf, 2)?,
            session_handle: read_u32(buf, 4)?,
            status: read_u32(buf, 16)?,
            sender_context,
            options: read_u32(buf, 20)?,
        })
    }
}

/// The result of [`parse_header`]: the header itself, the offset it was
/// found at (nonzero means resync occurred), and the slice of `buf`
/// following the header.
pub struct ParsedHeader<'a> {
    pub header: EnipHeader,
    pub skipped: usize,
    pub rest: &'a [u8],
}

/// Parses an ENIP header out of `buf`, tolerating up to 6 bytes of
/// garbage in front of it. Scans the first 8 bytes on a 2-byte stride
/// looking for `expected_command` in the first two bytes of a
/// plausible header; the first offset where that holds wins.
pub fn parse_header(buf: &[u8], expected_command: u16) -> Result<ParsedHeader<'_>> {
    let scan_limit = buf.len().saturating_sub(HEADER_LEN).min(6);
    for skip in (0..=scan_limit).step_by(2) {
        let candidate = &buf[skip..];
        if candidate.len() < HEADER_LEN {
            break;
        }
        if read_u16(candidate, 0)? == expected_command {
            if skip != 0 {
                warn!(skipped = skip, "resynchronized ENIP frame");
            }
            let header = EnipHeader::decode(candidate)?;
            return Ok(ParsedHeader {
                header,
                skipped: skip,
                rest: &candidate[HEADER_LEN..],
            });
        }
    }
    Err(Error::protocol(format!(
        "did not find ENIP command 0x{expected_command:04X} within the first {} bytes",
        scan_limit + 2
    )))
}

pub fn build_register_session() -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + 4);
    EnipHeader {
        command: CMD_REGISTER_SESSION,
        length: 4,
        session_handle: 0,
        status: 0,
        sender_context: [0; 8],
        options: 0,
    }
    .encode(&mut out);
    write_u16(&mut out, 1); // protocol version
    write_u16(&mut out, 0); // options flags
    out
}

pub fn build_unregister_session(session_handle: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN);
    EnipHeader {
        command: CMD_UNREGISTER_SESSION,
        length: 0,
        session_handle,
        status: 0,
        sender_context: [0; 8],
        options: 0,
    }
    .encode(&mut out);
    out
}

pub fn build_list_identity() -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN);
    EnipHeader {
        command: CMD_LIST_IDENTITY,
        length: 0,
        session_handle: 0,
        status: 0,
        sender_context: [0; 8],
        options: 0,
    }
    .encode(&mut out);
    out
}

/// Wraps a CIP request in the two-item CPF list `SendRRData` requires
/// (Null Address, then Unconnected Data carrying `cip_message`), and
/// wraps that in the encapsulation header.
///
/// `cip_timeout_secs` is clamped to `[1, 255]`, matching the single-byte
/// field the wire format actually has room for (the high byte is
/// reserved and always zero).
pub fn build_send_rr_data(session_handle: u32, cip_timeout_secs: u8, cip_message: &[u8]) -> Vec<u8> {
    let cip_timeout_secs = cip_timeout_secs.clamp(1, 255);
    let mut body = Vec::with_capacity(10 + cip_message.len());
    write_u32(&mut body, 0); // interface handle, always 0 (CIP)
    write_u16(&mut body, u16::from(cip_timeout_secs));
    write_u16(&mut body, 2); // item count
    write_u16(&mut body, CPF_NULL_ADDRESS);
    write_u16(&mut body, 0); // null address item has no payload
    write_u16(&mut body, CPF_UNCONNECTED_DATA);
    write_u16(&mut body, cip_message.len() as u16);
    body.extend_from_slice(cip_message);

    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    EnipHeader {
        command: CMD_SEND_RR_DATA,
        length: body.len() as u16,
        session_handle,
        status: 0,
        sender_context: [0; 8],
        options: 0,
    }
    .encode(&mut out);
    out.extend_from_slice(&body);
    out
}

/// The CIP payload of a `SendRRData` reply, together with the length
/// actually declared by CPF item 2 (which may differ from
/// `cip_bytes.len()` if the caller only handed us a short read — see
/// [`crate::cip::execute`]'s truncation rule).
pub struct SendRRDataReply {
    pub session_handle: u32,
    pub cip_bytes: Vec<u8>,
    pub declared_len: usize,
}

/// Parses the body of a `SendRRData` reply (the bytes after the
/// encapsulation header). Validates the item count and that item 2 is
/// Unconnected Data; does not look inside the CIP bytes themselves.
pub fn parse_send_rr_data_body(header: &EnipHeader, body: &[u8]) -> Result<SendRRDataReply> {
    if header.status != 0 {
        return Err(Error::protocol(format!(
            "ENIP status 0x{:08X} on SendRRData reply",
            header.status
        )));
    }
    require_bytes(body, 10)?;
    let item_count = read_u16(body, 6)?;
    if item_count != 2 {
        return Err(Error::protocol(format!(
            "expected 2 CPF items in SendRRData reply, got {item_count}"
        )));
    }
    let item1_type = read_u16(body, 8)?;
    let item1_len = read_u16(body, 10)? as usize;
    if item1_type != CPF_NULL_ADDRESS {
        return Err(Error::protocol(format!(
            "expected Null Address as CPF item 1, got type 0x{item1_type:04X}"
        )));
    }
    let item2_hdr_at = 12 + item1_len;
    require_bytes(body, item2_hdr_at + 4)?;
    let item2_type = read_u16(body, item2_hdr_at)?;
    let declared_len = read_u16(body, item2_hdr_at + 2)? as usize;
    if item2_type != CPF_UNCONNECTED_DATA {
        return Err(Error::protocol(format!(
            "expected Unconnected Data as CPF item 2, got type 0x{item2_type:04X}"
        )));
    }
    let data_at = item2_hdr_at + 4;
    let available = body.len().saturating_sub(data_at);
    let take = available.min(declared_len);
    let cip_bytes = body[data_at..data_at + take].to_vec();
    Ok(SendRRDataReply {
        session_handle: header.session_handle,
        cip_bytes,
        declared_len,
    })
}

/// Parses the CPF identity item (type 0x000C) out of a `ListIdentity`
/// reply body. Returns the raw item payload; [`crate::discovery`]
/// decodes the individual fields.
pub fn parse_list_identity_body(body: &[u8]) -> Result<&[u8]> {
    require_bytes(body, 2)?;
    let item_count = read_u16(body, 0)?;
    if item_count < 1 {
        return Err(Error::protocol("ListIdentity reply had no CPF items"));
    }
    require_bytes(body, 6)?;
    let item_type = read_u16(body, 2)?;
    let item_len = read_u16(body, 4)? as usize;
    if item_type != CPF_IDENTITY {
        return Err(Error::protocol(format!(
            "expected Identity as CPF item 1, got type 0x{item_type:04X}"
        )));
    }
    require_bytes(body, 6 + item_len)?;
    Ok(&body[6..6 + item_len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_session_round_trip() {
        let req = build_register_session();
        assert_eq!(req.len(), HEADER_LEN + 4);
        let parsed = parse_header(&req, CMD_REGISTER_SESSION).unwrap();
        assert_eq!(parsed.header.session_handle, 0);
        assert_eq!(parsed.header.length, 4);
    }

    #[test]
    fn resync_skips_two_garbage_bytes() {
        let mut buf = vec![0xFF, 0xFF];
        buf.extend_from_slice(&build_register_session());
        let parsed = parse_header(&buf, CMD_REGISTER_SESSION).unwrap();
        assert_eq!(parsed.skipped, 2);
    }

    #[test]
    fn resync_skips_four_garbage_bytes() {
        let mut buf = vec![0xAA, 0xAA, 0xBB, 0xBB];
        buf.extend_from_slice(&build_register_session());
        let parsed = parse_header(&buf, CMD_REGISTER_SESSION).unwrap();
        assert_eq!(parsed.skipped, 4);
    }

    #[test]
    fn send_rr_data_wraps_exactly_two_cpf_items() {
        let cip = vec![0x0E, 0x02, 0x20, 0x04, 0x24, 0x01];
        let req = build_send_rr_data(1234, 5, &cip);
        let parsed = parse_header(&req, CMD_SEND_RR_DATA).unwrap();
        assert_eq!(parsed.header.session_handle, 1234);
        let body = parsed.rest;
        let item_count = read_u16(body, 6).unwrap();
        assert_eq!(item_count, 2);
    }

    #[test]
    fn send_rr_data_reply_truncated_below_declared_length() {
        // declare 10 bytes of CIP payload but only actually provide 4
        let mut body = Vec::new();
        write_u32(&mut body, 0);
        write_u16(&mut body, 0);
        write_u16(&mut body, 2);
        write_u16(&mut body, CPF_NULL_ADDRESS);
        write_u16(&mut body, 0);
        write_u16(&mut body, CPF_UNCONNECTED_DATA);
        write_u16(&mut body, 10);
        body.extend_from_slice(&[1, 2, 3, 4]);

        let header = EnipHeader {
            command: CMD_SEND_RR_DATA,
            length: body.len() as u16,
            session_handle: 1,
            status: 0,
            sender_context: [0; 8],
            options: 0,
        };
        let reply = parse_send_rr_data_body(&header, &body).unwrap();
        assert_eq!(reply.declared_len, 10);
        assert_eq!(reply.cip_bytes, vec![1, 2, 3, 4]);
    }

    #[test]
    fn send_rr_data_reply_rejects_wrong_item_type() {
        let mut body = Vec::new();
        write_u32(&mut body, 0);
        write_u16(&mut body, 0);
        write_u16(&mut body, 2);
        write_u16(&mut body, CPF_NULL_ADDRESS);
        write_u16(&mut body, 0);
        write_u16(&mut body, 0x00A1); // wrong type
        write_u16(&mut body, 0);

        let header = EnipHeader {
            command: CMD_SEND_RR_DATA,
            length: body.len() as u16,
            session_handle: 1,
            status: 0,
            sender_context: [0; 8],
            options: 0,
        };
        assert!(parse_send_rr_data_body(&header, &body).is_err());
    }
}
