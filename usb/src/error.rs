use crate::session::{ReadStep, SessionState};
use airsensor_types::{DeviceSelector, Direction};

/// Failures while looking for devices, kept apart so listing and opening can be told apart.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("Unable to list USB devices: {0}")]
    Enumerate(rusb::Error),

    #[error("Unable to open device at bus {bus} address {address}: {source}")]
    Open {
        bus: u8,
        address: u8,
        source: rusb::Error,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("No device matching {selector} was found")]
    DeviceNotFound { selector: DeviceSelector },

    #[error("Unable to list USB devices: {0}")]
    DeviceEnumeration(rusb::Error),

    #[error("Found a matching device at bus {bus} address {address} but could not open it: {source}")]
    DeviceOpen {
        bus: u8,
        address: u8,
        source: rusb::Error,
    },

    #[error("{count} devices match {selector}, refusing to pick one")]
    AmbiguousDevice {
        selector: DeviceSelector,
        count: usize,
    },

    #[error("Unable to Claim Interface {interface}: {source}")]
    InterfaceClaimFailed { interface: u8, source: rusb::Error },

    #[error("Failed to open {direction} endpoint {endpoint}: {source}")]
    EndpointOpenFailed {
        direction: Direction,
        endpoint: u8,
        source: rusb::Error,
    },

    #[error("Failed to write request command: {0}")]
    WriteFailed(rusb::Error),

    #[error("Short write of request command, wrote {written} of {expected} bytes")]
    WriteIncomplete { written: usize, expected: usize },

    #[error("Failed to read {step}: {source}")]
    ReadFailed { step: ReadStep, source: rusb::Error },

    #[error("Malformed response from sensor, received {received} bytes")]
    ResponseTooShort { received: usize },

    #[error("Session is {state}, a session performs exactly one request")]
    InvalidState { state: SessionState },
}

impl From<DiscoveryError> for SessionError {
    fn from(error: DiscoveryError) -> Self {
        match error {
            DiscoveryError::Enumerate(source) => SessionError::DeviceEnumeration(source),
            DiscoveryError::Open {
                bus,
                address,
                source,
            } => SessionError::DeviceOpen {
                bus,
                address,
                source,
            },
        }
    }
}
