//! Hardware-wallet detection and validation.
//!
//! The bridge binary (`cardano-hw-cli`) is polled until the connected device
//! reports itself unlocked, then the vendor is classified and its
//! firmware/app version checked against the vendor-specific floor.

mod handshake;
mod probe;
mod retry;

pub use handshake::{DeviceHandshake, HandshakeOptions};
pub use probe::{BridgeDeviceProbe, DeviceProbe};
pub use retry::{BackoffStrategy, FixedBackoff, Sleeper, TokioSleeper};

#[cfg(test)]
pub use probe::MockDeviceProbe;

use std::fmt::{Display, Formatter};

use clap::ValueEnum;

/// Hardware-wallet manufacturer, classified from the device status text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum DeviceVendor {
    Ledger,
    Trezor,
}

impl DeviceVendor {
    /// Classify the vendor from a raw device status payload.
    pub fn classify(status: &str) -> Option<Self> {
        if status.contains("Ledger") {
            Some(Self::Ledger)
        } else if status.contains("Trezor") {
            Some(Self::Trezor)
        } else {
            None
        }
    }
}

impl Display for DeviceVendor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ledger => write!(f, "Ledger"),
            Self::Trezor => write!(f, "Trezor"),
        }
    }
}

/// Outcome of a successful handshake, created fresh per attempt sequence.
#[derive(Debug, Clone)]
pub struct DeviceSession {
    pub vendor: DeviceVendor,
    /// Version string as reported by the device, last whitespace-delimited
    /// token of the status payload.
    pub reported_version: String,
    /// Attempts consumed, at most the configured maximum.
    pub attempts_used: u32,
    pub unlocked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_known_vendors() {
        assert_eq!(
            Some(DeviceVendor::Ledger),
            DeviceVendor::classify("Ledger Nano S Plus app version 6.1.2")
        );
        assert_eq!(
            Some(DeviceVendor::Trezor),
            DeviceVendor::classify("Trezor Model T firmware 2.6.0")
        );
        assert_eq!(None, DeviceVendor::classify("some usb gadget 1.0.0"));
    }
}
