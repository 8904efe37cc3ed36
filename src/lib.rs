//! A client for EtherNet/IP + CIP: device discovery, Assembly I/O,
//! Micro800 symbolic tags, and Motoman vendor CIP objects.
//!
//! [`Scanner`] is the crate's single entry point. It holds no open
//! sockets of its own — every operation opens, uses, and tears down its
//! own TCP session (see [`session`] and [`cip::execute`]) — so the
//! `Mutex<ScannerState>` it guards isn't a connection pool. It carries
//! exactly the two pieces of process-wide mutable state this crate has:
//! the "have I been initialized" latch, and the RS022 instance-direct
//! flag a Motoman controller's own configuration dictates.

pub mod assembly;
pub mod cip;
pub mod codec;
pub mod config;
pub mod datatype;
pub mod discovery;
pub mod enip;
pub mod error;
#[cfg(feature = "motoman")]
pub mod motoman;
pub mod path;
pub mod session;
#[cfg(feature = "tags")]
pub mod tag;
#[cfg(test)]
mod test_support;
mod transport;

pub use config::ScannerConfig;
pub use error::{Error, Result};

use discovery::IdentityRecord;
use std::net::SocketAddr;
use std::sync::Mutex;
use tracing::info;

#[cfg(feature = "tags")]
use tag::TagValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScannerState {
    initialized: bool,
    rs022_instance_direct: bool,
}

/// The crate's entry point: `init()` before use, `shutdown()` (or just
/// drop it) when done. Every outward operation checks the latch first
/// and returns [`Error::NotInitialized`] if it's not been brought up.
pub struct Scanner {
    config: ScannerConfig,
    state: Mutex<ScannerState>,
}

impl Scanner {
    pub fn new(config: ScannerConfig) -> Scanner {
        let rs022_instance_direct = config.rs022_instance_direct;
        Scanner {
            config,
            state: Mutex::new(ScannerState {
                initialized: false,
                rs022_instance_direct,
            }),
        }
    }

    pub fn init(&self) -> Result<()> {
        self.state.lock().unwrap().initialized = true;
        info!("scanner initialized");
        Ok(())
    }

    pub fn shutdown(&self) -> Result<()> {
        self.state.lock().unwrap().initialized = false;
        info!("scanner shut down");
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.state.lock().unwrap().initialized {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    /// Flips the process-wide RS022 instance-direct flag, guarded by the
    /// same mutex as the initialization latch and held only long enough
    /// to write it — no I/O happens under this lock. Takes effect for
    /// every Motoman operation issued after it returns.
    #[cfg(feature = "motoman")]
    pub fn set_rs022_instance_direct(&self, enabled: bool) {
        self.state.lock().unwrap().rs022_instance_direct = enabled;
    }

    #[cfg(feature = "motoman")]
    fn motoman_mode(&self) -> motoman::AddressingMode {
        motoman::AddressingMode {
            rs022_instance_direct: self.state.lock().unwrap().rs022_instance_direct,
        }
    }

    /// Broadcasts `ListIdentity` and returns every device that answered
    /// within the configured discovery window, up to `max_devices`.
    pub fn discover(&self) -> Result<Vec<IdentityRecord>> {
        self.ensure_initialized()?;
        discovery::discover(self.config.discovery_window, self.config.max_devices)
    }

    pub fn read_assembly(&self, endpoint: SocketAddr, instance: u32) -> Result<Vec<u8>> {
        self.ensure_initialized()?;
        assembly::read_assembly(endpoint, instance, self.config.timeout)
    }

    pub fn write_assembly(&self, endpoint: SocketAddr, instance: u32, data: &[u8]) -> Result<()> {
        self.ensure_initialized()?;
        assembly::write_assembly(endpoint, instance, data, self.config.timeout)
    }

    pub fn discover_assembly_instances(
        &self,
        endpoint: SocketAddr,
        candidates: impl IntoIterator<Item = u32>,
    ) -> Result<Vec<u32>> {
        self.ensure_initialized()?;
        Ok(assembly::discover_instances(endpoint, candidates, self.config.timeout))
    }

    #[cfg(feature = "tags")]
    pub fn read_tag(&self, endpoint: SocketAddr, tag_path: &str) -> Result<TagValue> {
        self.ensure_initialized()?;
        tag::read_tag(endpoint, tag_path, self.config.timeout)
    }

    #[cfg(feature = "tags")]
    pub fn write_tag(
        &self,
        endpoint: SocketAddr,
        tag_path: &str,
        data_type: datatype::CipType,
        value: &[u8],
    ) -> Result<()> {
        self.ensure_initialized()?;
        tag::write_tag(endpoint, tag_path, data_type, value, self.config.timeout)
    }

    /// Reads a scalar Motoman variable or register (classes 0x79–0x7D).
    #[cfg(feature = "motoman")]
    pub fn read_motoman_variable(&self, endpoint: SocketAddr, class: u32, number: u32) -> Result<Vec<u8>> {
        self.ensure_initialized()?;
        motoman::read_variable(endpoint, class, number, self.motoman_mode(), self.config.timeout)
    }

    /// Writes a scalar Motoman variable or register.
    #[cfg(feature = "motoman")]
    pub fn write_motoman_variable(&self, endpoint: SocketAddr, class: u32, number: u32, data: &[u8]) -> Result<()> {
        self.ensure_initialized()?;
        motoman::write_variable(endpoint, class, number, data, self.motoman_mode(), self.config.timeout)
    }

    /// Reads a Motoman string variable (class 0x8C).
    #[cfg(feature = "motoman")]
    pub fn read_motoman_string_variable(&self, endpoint: SocketAddr, number: u32) -> Result<String> {
        self.ensure_initialized()?;
        motoman::read_string_variable(endpoint, number, self.motoman_mode(), self.config.timeout)
    }

    /// Writes a Motoman string variable (class 0x8C).
    #[cfg(feature = "motoman")]
    pub fn write_motoman_string_variable(&self, endpoint: SocketAddr, number: u32, value: &str) -> Result<()> {
        self.ensure_initialized()?;
        motoman::write_string_variable(endpoint, number, value, self.motoman_mode(), self.config.timeout)
    }

    /// Reads a position-shaped Motoman variable (classes 0x7F/0x80/0x81)
    /// as its per-axis array.
    #[cfg(feature = "motoman")]
    pub fn read_motoman_position_variable(&self, endpoint: SocketAddr, class: u32, number: u32) -> Result<Vec<i32>> {
        self.ensure_initialized()?;
        motoman::read_position_variable(endpoint, class, number, self.motoman_mode(), self.config.timeout)
    }

    /// Writes a position-shaped Motoman variable.
    #[cfg(feature = "motoman")]
    pub fn write_motoman_position_variable(
        &self,
        endpoint: SocketAddr,
        class: u32,
        number: u32,
        axes: &[i32],
    ) -> Result<()> {
        self.ensure_initialized()?;
        motoman::write_position_variable(endpoint, class, number, axes, self.motoman_mode(), self.config.timeout)
    }

    /// Reads a Motoman control-group record (status 0x72, job info 0x73,
    /// or axis configuration 0x74) by its stated control-group instance.
    #[cfg(feature = "motoman")]
    pub fn read_motoman_control_group(&self, endpoint: SocketAddr, class: u32, instance: u32) -> Result<Vec<u8>> {
        self.ensure_initialized()?;
        motoman::read_control_group(endpoint, class, instance, self.config.timeout)
    }

    /// Reads a Motoman axis-array control-group record (position 0x75,
    /// position deviation 0x76, or torque 0x77) by its stated
    /// control-group instance.
    #[cfg(feature = "motoman")]
    pub fn read_motoman_axis_array(&self, endpoint: SocketAddr, class: u32, instance: u32) -> Result<Vec<i32>> {
        self.ensure_initialized()?;
        motoman::read_axis_array(endpoint, class, instance, self.config.timeout)
    }

    /// Reads the ten-point Motoman I/O group containing `signal`.
    #[cfg(feature = "motoman")]
    pub fn read_motoman_io(&self, endpoint: SocketAddr, signal: u32) -> Result<Vec<u8>> {
        self.ensure_initialized()?;
        motoman::read_io(endpoint, signal, self.motoman_mode(), self.config.timeout)
    }

    /// Writes the ten-point Motoman I/O group containing `signal`.
    #[cfg(feature = "motoman")]
    pub fn write_motoman_io(&self, endpoint: SocketAddr, signal: u32, data: &[u8]) -> Result<()> {
        self.ensure_initialized()?;
        motoman::write_io(endpoint, signal, data, self.motoman_mode(), self.config.timeout)
    }

    /// Reads alarm `index` from the current-alarm table (`class =
    /// `[`motoman::CLASS_CURRENT_ALARM`]`) or the alarm-history table
    /// (`class = `[`motoman::CLASS_ALARM_HISTORY`]`).
    #[cfg(feature = "motoman")]
    pub fn read_motoman_alarm(&self, endpoint: SocketAddr, class: u32, index: u32) -> Result<motoman::AlarmRecord> {
        self.ensure_initialized()?;
        motoman::read_alarm(endpoint, class, index, self.motoman_mode(), self.config.timeout)
    }
}
