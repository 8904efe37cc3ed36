//! Micro800 symbolic tag read/write (`Read_Tag` / `Write_Tag`).
//!
//! Unlike Assembly or Motoman addressing, a tag request carries its CIP
//! data type alongside the value: a read reply is `{type_code, value}`
//! and a write request is `{type_code, value}`, so this module leans on
//! [`crate::datatype`] in both directions.

use crate::cip;
use crate::codec::read_u16;
use crate::datatype::CipType;
use crate::error::{Error, Result};
use crate::path::{parse_tag_path, CipPath};
use std::net::SocketAddr;
use std::time::Duration;

/// A tag value read back from the controller: its CIP type and the raw
/// (still type-encoded) wire bytes. Callers decode via
/// [`crate::datatype::CipType::decode`] once they know what they expect,
/// or just match on `data_type`.
pub struct TagValue {
    pub data_type: CipType,
    pub bytes: Vec<u8>,
}

/// Reads the tag named by `tag_path` (e.g. `"Program.Counter[3]"`).
pub fn read_tag(endpoint: SocketAddr, tag_path: &str, timeout: Duration) -> Result<TagValue> {
    let segments = parse_tag_path(tag_path)?;
    let path = CipPath::symbolic(&segments)?;
    let element_count = 1u16.to_le_bytes();
    let response = cip::execute(endpoint, cip::SERVICE_READ_TAG, &path, &element_count, timeout)?;
    require_reply(&response.data)
}

/// Writes `value` (already encoded via [`CipType::encode`]) to the tag
/// named by `tag_path`.
pub fn write_tag(
    endpoint: SocketAddr,
    tag_path: &str,
    data_type: CipType,
    value: &[u8],
    timeout: Duration,
) -> Result<()> {
    let segments = parse_tag_path(tag_path)?;
    let path = CipPath::symbolic(&segments)?;
    let encoded = data_type.encode(value)?;

    let mut payload = Vec::with_capacity(4 + encoded.len());
    payload.extend_from_slice(&data_type.code().to_le_bytes());
    payload.extend_from_slice(&1u16.to_le_bytes()); // element count, always 1 for a scalar write
    payload.extend_from_slice(&encoded);

    cip::execute(endpoint, cip::SERVICE_WRITE_TAG, &path, &payload, timeout)?;
    Ok(())
}

fn require_reply(data: &[u8]) -> Result<TagValue> {
    if data.len() < 2 {
        return Err(Error::buffer_underrun(2, data.len()));
    }
    let code = read_u16(data, 0)?;
    let data_type = CipType::from_code(code)?;
    Ok(TagValue {
        data_type,
        bytes: data[2..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::TagSegment;
    use crate::test_support::FakeEnipServer;

    #[test]
    fn read_tag_round_trips_through_a_fake_controller() {
        let server = FakeEnipServer::spawn();
        let mut reply = Vec::new();
        reply.extend_from_slice(&0xC3u16.to_le_bytes()); // INT
        reply.extend_from_slice(&7i16.to_le_bytes());
        server.set_attribute_reply(0, 0, 0, reply);
        let value = read_tag(server.addr(), "Counter", Duration::from_secs(1)).unwrap();
        assert_eq!(value.data_type, CipType::Int);
        assert_eq!(value.bytes, 7i16.to_le_bytes());
    }

    #[test]
    fn write_tag_surfaces_cip_errors() {
        let server = FakeEnipServer::spawn();
        server.set_general_status(0x0E); // "attribute not settable"
        let err = write_tag(
            server.addr(),
            "Counter",
            CipType::Dint,
            &42i32.to_le_bytes(),
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, Error::CipStatus { code: 0x0E, .. }));
    }

    #[test]
    fn read_tag_decodes_the_leading_type_code() {
        let mut reply = Vec::new();
        reply.extend_from_slice(&0xC4u16.to_le_bytes()); // DINT
        reply.extend_from_slice(&42i32.to_le_bytes());
        let value = require_reply(&reply).unwrap();
        assert_eq!(value.data_type, CipType::Dint);
        assert_eq!(value.bytes, 42i32.to_le_bytes());
    }

    #[test]
    fn read_tag_reply_shorter_than_a_type_code_is_rejected() {
        assert!(require_reply(&[0x01]).is_err());
    }

    #[test]
    fn write_tag_path_syntax_matches_read_tag() {
        let segs = parse_tag_path("Program.Array[2]").unwrap();
        assert_eq!(
            segs,
            vec![
                TagSegment::Name("Program".to_string()),
                TagSegment::Name("Array".to_string()),
                TagSegment::Element(2),
            ]
        );
    }
}
