use crate::device::base::{
    Endpoint, InterfaceSetting, SensorDevice, SensorTransport, TransferKind, UsbData,
};
use crate::error::DiscoveryError;
use airsensor_types::{DeviceSelector, Direction};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Every call the session makes against the mock, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    FindDevices,
    ClaimInterface(u8),
    ReleaseInterface(u8),
    OpenEndpoint(Direction, u8),
    CloseEndpoint(Direction, u8),
    Read(u8, usize),
    Write(u8, Vec<u8>),
    Close,
    /// A device handle went away without `close` ever being called on it.
    Dropped,
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

/// Scripted behaviour for a single mock device.
#[derive(Clone, Debug, Default)]
pub struct MockScript {
    pub claim_error: Option<rusb::Error>,
    pub read_open_error: Option<rusb::Error>,
    pub write_open_error: Option<rusb::Error>,
    /// Handed out one per read, in order. Ok(bytes) is copied into the caller's buffer.
    pub reads: VecDeque<Result<Vec<u8>, rusb::Error>>,
    /// Overrides the byte count a write reports, defaults to the full buffer.
    pub write_result: Option<Result<usize, rusb::Error>>,
}

impl MockScript {
    /// A device which behaves: no stale bytes, a full response, no trailing bytes.
    pub fn responding(response: Vec<u8>) -> Self {
        Self {
            reads: VecDeque::from(vec![Ok(vec![]), Ok(response), Ok(vec![])]),
            ..Default::default()
        }
    }
}

pub struct MockTransport {
    pub calls: CallLog,
    pub devices: Vec<MockScript>,
    pub list_error: Option<DiscoveryError>,
}

impl MockTransport {
    pub fn new(devices: Vec<MockScript>) -> Self {
        Self {
            calls: Rc::new(RefCell::new(Vec::new())),
            devices,
            list_error: None,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }
}

impl SensorTransport for MockTransport {
    type Device = MockDevice;

    fn find_devices(
        &mut self,
        _selector: &DeviceSelector,
    ) -> Result<Vec<MockDevice>, DiscoveryError> {
        self.calls.borrow_mut().push(Call::FindDevices);
        if let Some(error) = self.list_error {
            return Err(error);
        }

        Ok(self
            .devices
            .drain(..)
            .map(|script| MockDevice {
                calls: self.calls.clone(),
                script,
                closed: false,
            })
            .collect())
    }
}

pub struct MockDevice {
    calls: CallLog,
    script: MockScript,
    closed: bool,
}

impl MockDevice {
    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl SensorDevice for MockDevice {
    fn claim_interface(&mut self, setting: &InterfaceSetting) -> Result<(), rusb::Error> {
        self.record(Call::ClaimInterface(setting.interface));
        match self.script.claim_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn release_interface(&mut self, setting: &InterfaceSetting) -> Result<(), rusb::Error> {
        self.record(Call::ReleaseInterface(setting.interface));
        Ok(())
    }

    fn open_endpoint(
        &mut self,
        _setting: &InterfaceSetting,
        number: u8,
        direction: Direction,
    ) -> Result<Endpoint, rusb::Error> {
        self.record(Call::OpenEndpoint(direction, number));
        let error = match direction {
            Direction::In => self.script.read_open_error,
            Direction::Out => self.script.write_open_error,
        };
        match error {
            Some(error) => Err(error),
            None => Ok(Endpoint {
                number,
                direction,
                transfer: TransferKind::Interrupt,
            }),
        }
    }

    fn close_endpoint(&mut self, endpoint: &Endpoint) -> Result<(), rusb::Error> {
        self.record(Call::CloseEndpoint(endpoint.direction, endpoint.number));
        Ok(())
    }

    fn read(&mut self, endpoint: &Endpoint, buf: &mut [u8]) -> Result<usize, rusb::Error> {
        self.record(Call::Read(endpoint.number, buf.len()));
        let bytes = self.script.reads.pop_front().unwrap_or(Ok(vec![]))?;
        let length = bytes.len().min(buf.len());
        buf[..length].copy_from_slice(&bytes[..length]);
        Ok(length)
    }

    fn write(&mut self, endpoint: &Endpoint, buf: &[u8]) -> Result<usize, rusb::Error> {
        self.record(Call::Write(endpoint.number, buf.to_vec()));
        self.script.write_result.unwrap_or(Ok(buf.len()))
    }

    fn close(&mut self) -> Result<(), rusb::Error> {
        self.record(Call::Close);
        self.closed = true;
        Ok(())
    }

    fn describe(&self) -> Result<UsbData, rusb::Error> {
        Ok(UsbData {
            vendor_id: 0x03eb,
            product_id: 0x2013,
            device_version: (1, 1, 0),
            device_manufacturer: Some(String::from("AppliedSensor")),
            product_name: Some(String::from("iAQ Stick")),
        })
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        if !self.closed {
            self.record(Call::Dropped);
        }
    }
}
