pub mod device;

pub use device::{LibUsbDevice, LibUsbTransport};
