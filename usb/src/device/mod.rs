pub mod base;

// libusb covers every platform the stick is used on, so there's only the one backend.
pub mod libusb;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
