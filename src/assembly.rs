//! Assembly Object (class 0x04) read/write.
//!
//! An assembly instance's I/O data lives at attribute 3 ("Data"); reading
//! and writing it is just `Get_Attribute_Single`/`Set_Attribute_Single`
//! against `{class 0x04, instance, attribute 3}`, with no type
//! information involved — the caller already knows the byte layout of
//! whatever assembly they're addressing.

use crate::cip;
use crate::error::Result;
use crate::path::CipPath;
use std::net::SocketAddr;
use std::time::Duration;

const CLASS_ASSEMBLY: u32 = 0x04;
const ATTRIBUTE_DATA: u32 = 3;

/// Reads the Data attribute of assembly `instance`.
pub fn read_assembly(endpoint: SocketAddr, instance: u32, timeout: Duration) -> Result<Vec<u8>> {
    let path = CipPath::class_instance_attribute(CLASS_ASSEMBLY, instance, Some(ATTRIBUTE_DATA));
    let response = cip::execute(
        endpoint,
        cip::SERVICE_GET_ATTRIBUTE_SINGLE,
        &path,
        &[],
        timeout,
    )?;
    Ok(response.data)
}

/// Writes `data` to the Data attribute of assembly `instance`.
pub fn write_assembly(endpoint: SocketAddr, instance: u32, data: &[u8], timeout: Duration) -> Result<()> {
    let path = CipPath::class_instance_attribute(CLASS_ASSEMBLY, instance, Some(ATTRIBUTE_DATA));
    cip::execute(
        endpoint,
        cip::SERVICE_SET_ATTRIBUTE_SINGLE,
        &path,
        data,
        timeout,
    )?;
    Ok(())
}

/// Probes every instance in `candidates` with a `Get_Attribute_Single`
/// and returns the ones that answered without a CIP error and with a
/// nonzero byte count. There is no "list all assembly instances" service
/// in CIP, so discovery is just brute-force probing over a
/// caller-supplied range.
pub fn discover_instances(
    endpoint: SocketAddr,
    candidates: impl IntoIterator<Item = u32>,
    timeout: Duration,
) -> Vec<u32> {
    candidates
        .into_iter()
        .filter(|&instance| {
            matches!(read_assembly(endpoint, instance, timeout), Ok(data) if !data.is_empty())
        })
        .collect()
}
