//! [`ScannerConfig`]: the handful of knobs every operation reads from.

use std::time::Duration;

/// Runtime configuration for a [`crate::Scanner`]. There is no
/// builder here — the fields are few enough, and all public, that
/// constructing one directly (or via [`Default`]) is plainer than a
/// fluent API would be.
#[derive(Clone, Debug, PartialEq)]
pub struct ScannerConfig {
    /// Bound on every TCP connect, send, and recv, and on the CIP
    /// timeout field carried inside `SendRRData`.
    pub timeout: Duration,

    /// How long [`crate::Scanner::discover`] waits for `ListIdentity`
    /// replies after broadcasting.
    pub discovery_window: Duration,

    /// Upper bound on the number of distinct devices
    /// [`crate::Scanner::discover`] returns, regardless of how many
    /// answer within the gather window.
    pub max_devices: usize,

    /// The initial value of the process-wide RS022 instance-direct
    /// flag: whether Motoman operations address CIP instances directly
    /// (`true`, an RS022-compatible controller) or translate
    /// variable/signal numbers first (`false`, the default — see
    /// [`crate::motoman::AddressingMode`]). This only seeds the flag;
    /// [`crate::Scanner::set_rs022_instance_direct`] changes it for the
    /// scanner's whole remaining lifetime, mirroring the controller
    /// setting it tracks.
    pub rs022_instance_direct: bool,

    /// Gates a handful of `trace`-level spans the engine would
    /// otherwise skip computing the arguments for. Installing a
    /// `tracing` subscriber is the caller's job; this flag only avoids
    /// paying for argument formatting when nobody's listening.
    pub debug: bool,
}

impl Default for ScannerConfig {
    fn default() -> ScannerConfig {
        ScannerConfig {
            timeout: Duration::from_secs(5),
            discovery_window: Duration::from_millis(500),
            max_devices: 32,
            rs022_instance_direct: false,
            debug: false,
        }
    }
}
