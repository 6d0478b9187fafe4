use crate::error::DiscoveryError;
use airsensor_types::{DeviceSelector, Direction};

// These traits are the only view the session has of USB. The libusb adapter implements them
// for real hardware, anything else (tests, alternative stacks) only needs to do the same.

pub trait SensorTransport {
    type Device: SensorDevice;

    /// Opens every attached device matching the selector. Handles are released when the
    /// returned devices are dropped.
    fn find_devices(
        &mut self,
        selector: &DeviceSelector,
    ) -> Result<Vec<Self::Device>, DiscoveryError>;
}

pub trait SensorDevice {
    fn claim_interface(&mut self, setting: &InterfaceSetting) -> Result<(), rusb::Error>;
    fn release_interface(&mut self, setting: &InterfaceSetting) -> Result<(), rusb::Error>;

    fn open_endpoint(
        &mut self,
        setting: &InterfaceSetting,
        number: u8,
        direction: Direction,
    ) -> Result<Endpoint, rusb::Error>;
    fn close_endpoint(&mut self, endpoint: &Endpoint) -> Result<(), rusb::Error>;

    fn read(&mut self, endpoint: &Endpoint, buf: &mut [u8]) -> Result<usize, rusb::Error>;
    fn write(&mut self, endpoint: &Endpoint, buf: &[u8]) -> Result<usize, rusb::Error>;

    fn close(&mut self) -> Result<(), rusb::Error>;
    fn describe(&self) -> Result<UsbData, rusb::Error>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InterfaceSetting {
    pub configuration: u8,
    pub interface: u8,
    pub alt_setting: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransferKind {
    Bulk,
    Interrupt,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub number: u8,
    pub direction: Direction,
    pub transfer: TransferKind,
}

impl Endpoint {
    pub fn address(&self) -> u8 {
        self.direction.address(self.number)
    }
}

#[derive(Debug, Clone)]
pub struct UsbData {
    pub vendor_id: u16,
    pub product_id: u16,
    pub device_version: (u8, u8, u8),
    pub device_manufacturer: Option<String>,
    pub product_name: Option<String>,
}
