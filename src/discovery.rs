//! UDP `ListIdentity` device discovery.
//!
//! Broadcasts one `ListIdentity` request and decodes whatever Identity
//! CPF items come back within the gather window. The identity item's
//! embedded socket address is the one place in this protocol that is
//! genuinely big-endian (it's a raw `sockaddr_in`, copied onto the wire
//! byte for byte); everything else here, like everywhere else in this
//! crate, is little-endian.

use crate::codec::{read_u16, read_u32, read_u8, require_bytes};
use crate::enip::{self, ENIP_PORT};
use crate::error::Result;
use byteorder::{BigEndian, ByteOrder};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// The decoded fields of a CIP Identity object, as returned in a
/// `ListIdentity` reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityRecord {
    pub address: Ipv4Addr,
    pub vendor_id: u16,
    pub device_type: u16,
    pub product_code: u16,
    pub revision_major: u8,
    pub revision_minor: u8,
    pub status: u16,
    pub serial_number: u32,
    pub product_name: String,
    pub state: u8,
}

/// Broadcasts `ListIdentity` on port 44818 and returns one
/// [`IdentityRecord`] per responding device, deduplicated by the source
/// address the UDP datagram actually arrived from (not the address the
/// identity payload claims, which some devices misreport). Stops
/// collecting once `max_devices` distinct devices have answered, even if
/// `gather_window` has not yet elapsed.
pub fn discover(gather_window: Duration, max_devices: usize) -> Result<Vec<IdentityRecord>> {
    let request = enip::build_list_identity();
    // Raw datagrams can outnumber distinct devices (retransmits, a peer
    // answering twice), so the network-level gather loop is bounded
    // generously; the real cap is enforced below, after dedup.
    let raw_cap = max_devices.saturating_mul(4).max(max_devices);
    let responses = crate::transport::udp_broadcast(ENIP_PORT, &request, gather_window, raw_cap)?;

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (from, bytes) in responses {
        if out.len() >= max_devices {
            break;
        }
        let parsed = match enip::parse_header(&bytes, enip::CMD_LIST_IDENTITY) {
            Ok(p) => p,
            Err(_) => continue, // not an ENIP reply; ignore stray UDP noise
        };
        let item = match enip::parse_list_identity_body(parsed.rest) {
            Ok(item) => item,
            Err(_) => continue,
        };
        let record = match parse_identity_record(item) {
            Ok(record) => record,
            Err(_) => continue,
        };
        if seen.insert(from) {
            out.push(record);
        }
    }
    Ok(out)
}

/// Decodes one CIP Identity object payload (the bytes of CPF item
/// 0x000C, past its own `{type, length}` header).
pub fn parse_identity_record(item: &[u8]) -> Result<IdentityRecord> {
    // protocol version (u16 LE) + sockaddr_in (16 bytes, big-endian
    // fields) = 18 bytes before the vendor-id field begins.
    require_bytes(item, 18)?;
    let sin_addr = BigEndian::read_u32(&item[8..12]);
    let address = Ipv4Addr::from(sin_addr);

    let mut at = 18;
    let vendor_id = read_u16(item, at)?;
    at += 2;
    let device_type = read_u16(item, at)?;
    at += 2;
    let product_code = read_u16(item, at)?;
    at += 2;
    let revision_major = read_u8(item, at)?;
    at += 1;
    let revision_minor = read_u8(item, at)?;
    at += 1;
    let status = read_u16(item, at)?;
    at += 2;
    let serial_number = read_u32(item, at)?;
    at += 4;
    let name_len = read_u8(item, at)? as usize;
    at += 1;
    require_bytes(item, at + name_len + 1)?;
    let product_name = String::from_utf8_lossy(&item[at..at + name_len]).into_owned();
    at += name_len;
    let state = read_u8(item, at)?;

    Ok(IdentityRecord {
        address,
        vendor_id,
        device_type,
        product_code,
        revision_major,
        revision_minor,
        status,
        serial_number,
        product_name,
        state,
    })
}

impl IdentityRecord {
    pub fn socket_addr(&self) -> IpAddr {
        IpAddr::V4(self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_identity_bytes(name: &str) -> Vec<u8> {
        let mut item = Vec::new();
        item.extend_from_slice(&1u16.to_le_bytes()); // protocol version
        item.extend_from_slice(&2u16.to_be_bytes()); // sin_family (AF_INET)
        item.extend_from_slice(&44818u16.to_be_bytes()); // sin_port
        item.extend_from_slice(&Ipv4Addr::new(10, 0, 0, 42).octets()); // sin_addr, big-endian octets
        item.extend_from_slice(&[0u8; 8]); // sin_zero
        item.extend_from_slice(&0x0001u16.to_le_bytes()); // vendor id
        item.extend_from_slice(&0x000Cu16.to_le_bytes()); // device type
        item.extend_from_slice(&0x0036u16.to_le_bytes()); // product code
        item.push(2); // revision major
        item.push(1); // revision minor
        item.extend_from_slice(&0x0030u16.to_le_bytes()); // status
        item.extend_from_slice(&0xCAFEBABEu32.to_le_bytes()); // serial
        item.push(name.len() as u8);
        item.extend_from_slice(name.as_bytes());
        item.push(3); // state
        item
    }

    #[test]
    fn parses_every_identity_field() {
        let item = sample_identity_bytes("Micro850");
        let record = parse_identity_record(&item).unwrap();
        assert_eq!(record.address, Ipv4Addr::new(10, 0, 0, 42));
        assert_eq!(record.vendor_id, 0x0001);
        assert_eq!(record.device_type, 0x000C);
        assert_eq!(record.product_code, 0x0036);
        assert_eq!(record.revision_major, 2);
        assert_eq!(record.revision_minor, 1);
        assert_eq!(record.status, 0x0030);
        assert_eq!(record.serial_number, 0xCAFEBABE);
        assert_eq!(record.product_name, "Micro850");
        assert_eq!(record.state, 3);
    }

    #[test]
    fn sockaddr_fields_are_read_big_endian() {
        // a little-endian misread of sin_addr would produce 42.0.0.10
        let item = sample_identity_bytes("x");
        let record = parse_identity_record(&item).unwrap();
        assert_ne!(record.address, Ipv4Addr::new(42, 0, 0, 10));
    }

    #[test]
    fn truncated_identity_item_is_rejected() {
        let mut item = sample_identity_bytes("Micro850");
        item.truncate(20);
        assert!(parse_identity_record(&item).is_err());
    }
}
