pub use rusb;
pub mod commands;
pub mod error;
pub mod reading;
pub mod session;

pub mod device;

pub use device::base::{SensorDevice, SensorTransport};
pub use device::libusb::LibUsbTransport;
pub use error::SessionError;
pub use session::{read_sensor, SensorSession};
