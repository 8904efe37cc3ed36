//! Motoman vendor CIP objects: the robot-controller-specific classes
//! 0x70–0x81 and 0x8C.
//!
//! Three distinct addressing/shape conventions live in this one vendor
//! space, and telling them apart is most of what this module does:
//!
//! * **Scalar variables and registers** (0x79–0x7D, 0x8C) are addressed
//!   by `Get/Set_Attribute_Single` at attribute 1, with the user-facing
//!   number translated to a CIP instance (`number + 1`, or `number`
//!   directly under RS022 addressing — see [`AddressingMode`]).
//! * **Position-shaped variables** (0x7F, 0x80, 0x81) use the same
//!   instance translation but go through `Get/Set_Attribute_All` with no
//!   attribute segment, since their payload is a whole axis array rather
//!   than one scalar.
//! * **Control-group reads** (0x72–0x77) take the instance the caller
//!   states directly — a robot/base/station control group number, not a
//!   translated variable number — again via `Get_Attribute_All`.
//!
//! I/O (0x78) has its own instance rule (`signal / 10`) since one CIP
//! instance there covers a ten-point signal group, not a single point.

#![cfg(feature = "motoman")]

use crate::cip;
use crate::codec::read_u32;
use crate::error::{Error, Result};
use crate::path::CipPath;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::time::Duration;

pub const CLASS_CURRENT_ALARM: u32 = 0x70;
pub const CLASS_ALARM_HISTORY: u32 = 0x71;
pub const CLASS_STATUS: u32 = 0x72;
pub const CLASS_JOB_INFO: u32 = 0x73;
pub const CLASS_AXIS_CONFIGURATION: u32 = 0x74;
pub const CLASS_POSITION: u32 = 0x75;
pub const CLASS_POSITION_DEVIATION: u32 = 0x76;
pub const CLASS_TORQUE: u32 = 0x77;
pub const CLASS_IO: u32 = 0x78;
pub const CLASS_REGISTER: u32 = 0x79;
pub const CLASS_BYTE_VARIABLE: u32 = 0x7A;
pub const CLASS_INTEGER_VARIABLE: u32 = 0x7B;
pub const CLASS_DOUBLE_INTEGER_VARIABLE: u32 = 0x7C;
pub const CLASS_REAL_VARIABLE: u32 = 0x7D;
pub const CLASS_POSITION_VARIABLE: u32 = 0x7F;
pub const CLASS_BASE_POSITION_VARIABLE: u32 = 0x80;
pub const CLASS_EXTERNAL_AXIS_VARIABLE: u32 = 0x81;
pub const CLASS_STRING_VARIABLE: u32 = 0x8C;

/// General I/O signal-number ranges, per the controller's fixed signal
/// map. Only the ranges the map documents as writable accept
/// [`write_io`]; the rest are read-only, matching real general-purpose
/// and external I/O wiring, which a scanner has no business driving.
pub const IO_GENERAL_INPUT: RangeInclusive<u32> = 1..=256;
pub const IO_GENERAL_OUTPUT: RangeInclusive<u32> = 1001..=1256;
pub const IO_EXTERNAL_INPUT: RangeInclusive<u32> = 2001..=2256;
pub const IO_NETWORK_INPUT: RangeInclusive<u32> = 2501..=2756;
pub const IO_EXTERNAL_OUTPUT: RangeInclusive<u32> = 3001..=3256;
pub const IO_NETWORK_OUTPUT: RangeInclusive<u32> = 3501..=3756;

const ATTRIBUTE_DATA: u32 = 1;
const ATTRIBUTE_ALARM_CODE: u32 = 1;
const ATTRIBUTE_ALARM_DATA: u32 = 2;
const ATTRIBUTE_ALARM_DATA_TYPE: u32 = 3;
const ATTRIBUTE_ALARM_DATETIME: u32 = 4;
const ATTRIBUTE_ALARM_DESCRIPTION: u32 = 5;

/// A control group's axis array is padded out to this many axes when a
/// short reply is received (see [`decode_axis_array`]). Eight covers
/// every Motoman control group in practice (6-axis arms plus base and
/// station groups never exceed it).
pub const MAX_AXES: usize = 8;

const MOTOMAN_STRING_LEN: usize = 32;

/// The addressing mode a given controller is configured for. An RS022
/// controller wants the caller's number used as the CIP instance
/// directly; anything else wants the number/signal translated first.
/// This mirrors a process-wide controller setting, not a per-call
/// choice, which is why [`crate::Scanner`] stores it behind its
/// initialization mutex rather than threading it through every call
/// site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressingMode {
    pub rs022_instance_direct: bool,
}

impl AddressingMode {
    fn variable_instance(self, number: u32) -> u32 {
        if self.rs022_instance_direct {
            number
        } else {
            number + 1
        }
    }

    /// `instance = signal / 10`. The spec does not document whether
    /// instance 0 (signals 0..9) is a legal instance on real hardware;
    /// per the distilled contract's open question, this function does
    /// not second-guess it — an out-of-range instance just comes back
    /// as whatever CIP status the peer chooses to report.
    fn io_instance(self, signal: u32) -> u32 {
        if self.rs022_instance_direct {
            signal
        } else {
            signal / 10
        }
    }
}

fn get_attribute_single(
    endpoint: SocketAddr,
    class: u32,
    instance: u32,
    attribute: u32,
    timeout: Duration,
) -> Result<Vec<u8>> {
    let path = CipPath::class_instance_attribute(class, instance, Some(attribute));
    let response = cip::execute(endpoint, cip::SERVICE_GET_ATTRIBUTE_SINGLE, &path, &[], timeout)?;
    Ok(response.data)
}

fn set_attribute_single(
    endpoint: SocketAddr,
    class: u32,
    instance: u32,
    attribute: u32,
    data: &[u8],
    timeout: Duration,
) -> Result<()> {
    let path = CipPath::class_instance_attribute(class, instance, Some(attribute));
    cip::execute(endpoint, cip::SERVICE_SET_ATTRIBUTE_SINGLE, &path, data, timeout)?;
    Ok(())
}

fn get_attribute_all(endpoint: SocketAddr, class: u32, instance: u32, timeout: Duration) -> Result<Vec<u8>> {
    let path = CipPath::class_instance_attribute(class, instance, None);
    let response = cip::execute(endpoint, cip::SERVICE_GET_ATTRIBUTE_ALL, &path, &[], timeout)?;
    Ok(response.data)
}

fn set_attribute_all(endpoint: SocketAddr, class: u32, instance: u32, data: &[u8], timeout: Duration) -> Result<()> {
    let path = CipPath::class_instance_attribute(class, instance, None);
    cip::execute(endpoint, cip::SERVICE_SET_ATTRIBUTE_ALL, &path, data, timeout)?;
    Ok(())
}

/// Reads a scalar variable or register (classes 0x79–0x7D) by its
/// user-facing number.
pub fn read_variable(
    endpoint: SocketAddr,
    class: u32,
    number: u32,
    mode: AddressingMode,
    timeout: Duration,
) -> Result<Vec<u8>> {
    get_attribute_single(endpoint, class, mode.variable_instance(number), ATTRIBUTE_DATA, timeout)
}

/// Writes a scalar variable or register by its user-facing number.
pub fn write_variable(
    endpoint: SocketAddr,
    class: u32,
    number: u32,
    data: &[u8],
    mode: AddressingMode,
    timeout: Duration,
) -> Result<()> {
    set_attribute_single(endpoint, class, mode.variable_instance(number), ATTRIBUTE_DATA, data, timeout)
}

/// Reads a Motoman string variable (class 0x8C): a fixed 32-byte field,
/// NUL-terminated if the stored value is shorter than the field.
pub fn read_string_variable(
    endpoint: SocketAddr,
    number: u32,
    mode: AddressingMode,
    timeout: Duration,
) -> Result<String> {
    let bytes = read_variable(endpoint, CLASS_STRING_VARIABLE, number, mode, timeout)?;
    Ok(decode_fixed_string(&bytes))
}

/// Writes a Motoman string variable (class 0x8C), zero-padding the value
/// out to the full 32-byte field.
pub fn write_string_variable(
    endpoint: SocketAddr,
    number: u32,
    value: &str,
    mode: AddressingMode,
    timeout: Duration,
) -> Result<()> {
    let encoded = encode_fixed_string(value.as_bytes())?;
    write_variable(endpoint, CLASS_STRING_VARIABLE, number, &encoded, mode, timeout)
}

fn encode_fixed_string(value: &[u8]) -> Result<Vec<u8>> {
    if value.len() > MOTOMAN_STRING_LEN {
        return Err(Error::invalid_argument(format!(
            "Motoman string variable value of {} bytes exceeds the {MOTOMAN_STRING_LEN}-byte field",
            value.len()
        )));
    }
    let mut out = vec![0u8; MOTOMAN_STRING_LEN];
    out[..value.len()].copy_from_slice(value);
    Ok(out)
}

fn decode_fixed_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Reads a position-shaped variable (classes 0x7F/0x80/0x81) by its
/// user-facing number, via `Get_Attribute_All` with no attribute
/// segment, applying the same short-axis tolerance as the control-group
/// position reads.
pub fn read_position_variable(
    endpoint: SocketAddr,
    class: u32,
    number: u32,
    mode: AddressingMode,
    timeout: Duration,
) -> Result<Vec<i32>> {
    let bytes = get_attribute_all(endpoint, class, mode.variable_instance(number), timeout)?;
    decode_axis_array(&bytes)
}

/// Writes a position-shaped variable by its user-facing number, via
/// `Set_Attribute_All`.
pub fn write_position_variable(
    endpoint: SocketAddr,
    class: u32,
    number: u32,
    axes: &[i32],
    mode: AddressingMode,
    timeout: Duration,
) -> Result<()> {
    set_attribute_all(endpoint, class, mode.variable_instance(number), &encode_axis_array(axes), timeout)
}

/// Reads a control-group record (status 0x72, job info 0x73, or axis
/// configuration 0x74) as its raw `Get_Attribute_All` bytes. `instance`
/// is the control-group number the caller states directly — unlike
/// variables and registers, these are not offset by the RS022 rule.
pub fn read_control_group(endpoint: SocketAddr, class: u32, instance: u32, timeout: Duration) -> Result<Vec<u8>> {
    get_attribute_all(endpoint, class, instance, timeout)
}

/// Reads an axis-array control-group record (position 0x75, position
/// deviation 0x76, or torque 0x77) and applies the short-axis tolerance:
/// a reply shorter than a full 8-axis frame but an exact multiple of 4
/// bytes populates that many axes and zero-fills the rest.
pub fn read_axis_array(endpoint: SocketAddr, class: u32, instance: u32, timeout: Duration) -> Result<Vec<i32>> {
    let bytes = get_attribute_all(endpoint, class, instance, timeout)?;
    decode_axis_array(&bytes)
}

/// Decodes a little-endian `i32`-per-axis reply, zero-filling up to
/// [`MAX_AXES`] when the peer returned fewer whole words than that.
/// Only fails when fewer than 4 bytes (one axis) came back at all.
pub fn decode_axis_array(bytes: &[u8]) -> Result<Vec<i32>> {
    let word_count = bytes.len() / 4;
    if word_count == 0 {
        return Err(Error::buffer_underrun(4, bytes.len()));
    }
    let populated = word_count.min(MAX_AXES);
    let mut axes = vec![0i32; MAX_AXES];
    for (i, axis) in axes.iter_mut().take(populated).enumerate() {
        let word = &bytes[i * 4..i * 4 + 4];
        *axis = i32::from_le_bytes([word[0], word[1], word[2], word[3]]);
    }
    Ok(axes)
}

fn encode_axis_array(axes: &[i32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(axes.len() * 4);
    for axis in axes {
        out.extend_from_slice(&axis.to_le_bytes());
    }
    out
}

/// Reads the ten-point I/O group containing `signal` (class 0x78).
pub fn read_io(endpoint: SocketAddr, signal: u32, mode: AddressingMode, timeout: Duration) -> Result<Vec<u8>> {
    get_attribute_single(endpoint, CLASS_IO, mode.io_instance(signal), ATTRIBUTE_DATA, timeout)
}

/// Writes the ten-point I/O group containing `signal`. Rejects signals
/// outside the documented writable ranges (general output, network
/// input) before touching the network.
pub fn write_io(endpoint: SocketAddr, signal: u32, data: &[u8], mode: AddressingMode, timeout: Duration) -> Result<()> {
    if !IO_GENERAL_OUTPUT.contains(&signal) && !IO_NETWORK_INPUT.contains(&signal) {
        return Err(Error::invalid_argument(format!(
            "signal {signal} is not in a writable I/O range (general output 1001..=1256, network input 2501..=2756)"
        )));
    }
    set_attribute_single(endpoint, CLASS_IO, mode.io_instance(signal), ATTRIBUTE_DATA, data, timeout)
}

/// One entry from the current-alarm (class 0x70) or alarm-history (class
/// 0x71) table: code, auxiliary data, the data's CIP type code, a
/// datetime string, and a description, read as five sequential
/// `Get_Attribute_Single` calls (attributes 1..5).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlarmRecord {
    pub code: u32,
    pub data: u32,
    pub data_type: u32,
    pub datetime: String,
    pub description: String,
}

/// Reads alarm `index` from the current-alarm table (class 0x70) or the
/// alarm-history table (class 0x71).
pub fn read_alarm(
    endpoint: SocketAddr,
    class: u32,
    index: u32,
    mode: AddressingMode,
    timeout: Duration,
) -> Result<AlarmRecord> {
    let instance = mode.variable_instance(index);
    let code = read_u32(&get_attribute_single(endpoint, class, instance, ATTRIBUTE_ALARM_CODE, timeout)?, 0)?;
    let data = read_u32(&get_attribute_single(endpoint, class, instance, ATTRIBUTE_ALARM_DATA, timeout)?, 0)?;
    let data_type = read_u32(
        &get_attribute_single(endpoint, class, instance, ATTRIBUTE_ALARM_DATA_TYPE, timeout)?,
        0,
    )?;
    let datetime_bytes = get_attribute_single(endpoint, class, instance, ATTRIBUTE_ALARM_DATETIME, timeout)?;
    let description_bytes = get_attribute_single(endpoint, class, instance, ATTRIBUTE_ALARM_DESCRIPTION, timeout)?;
    Ok(AlarmRecord {
        code,
        data,
        data_type,
        datetime: decode_fixed_string(&datetime_bytes),
        description: decode_fixed_string(&description_bytes),
    })
}
