use crate::device::base::{
    Endpoint, InterfaceSetting, SensorDevice, SensorTransport, TransferKind, UsbData,
};
use crate::error::DiscoveryError;
use airsensor_types::{DeviceSelector, Direction};
use log::{debug, info, log_enabled, Level};
use rusb::{Context, Device, DeviceDescriptor, DeviceHandle, LogLevel, TransferType, UsbContext};
use std::time::Duration;

/// Holds the one libusb context used for the lifetime of the process. Dropping the transport
/// releases it.
pub struct LibUsbTransport {
    context: Context,
    timeout: Duration,
}

impl LibUsbTransport {
    /// `debug` follows libusb's own verbosity scale (0 = silent through 4 = debug). A zero
    /// timeout leaves transfers waiting until the device answers.
    pub fn new(debug: u8, timeout: Duration) -> Result<Self, rusb::Error> {
        let mut context = Context::new()?;
        context.set_log_level(log_level(debug));

        Ok(Self { context, timeout })
    }
}

fn log_level(debug: u8) -> LogLevel {
    match debug {
        0 => LogLevel::None,
        1 => LogLevel::Error,
        2 => LogLevel::Warning,
        3 => LogLevel::Info,
        _ => LogLevel::Debug,
    }
}

impl SensorTransport for LibUsbTransport {
    type Device = LibUsbDevice;

    fn find_devices(
        &mut self,
        selector: &DeviceSelector,
    ) -> Result<Vec<LibUsbDevice>, DiscoveryError> {
        let mut found_devices = Vec::new();
        let devices = self.context.devices().map_err(DiscoveryError::Enumerate)?;

        for device in devices.iter() {
            let Ok(descriptor) = device.device_descriptor() else {
                continue;
            };

            if !selector.matches(descriptor.vendor_id(), descriptor.product_id()) {
                continue;
            }

            info!(
                "Found {} at bus {} address {}",
                selector,
                device.bus_number(),
                device.address()
            );
            if log_enabled!(Level::Debug) {
                log_descriptor(&device, &descriptor);
            }

            // Usually a permissions problem, missing udev rules and the like.
            let handle = device.open().map_err(|source| DiscoveryError::Open {
                bus: device.bus_number(),
                address: device.address(),
                source,
            })?;
            found_devices.push(LibUsbDevice {
                handle: Some(handle),
                device,
                descriptor,
                timeout: self.timeout,
            });
        }

        Ok(found_devices)
    }
}

pub struct LibUsbDevice {
    handle: Option<DeviceHandle<Context>>,
    device: Device<Context>,
    descriptor: DeviceDescriptor,
    timeout: Duration,
}

impl LibUsbDevice {
    fn handle(&mut self) -> Result<&mut DeviceHandle<Context>, rusb::Error> {
        self.handle.as_mut().ok_or(rusb::Error::NoDevice)
    }

    fn find_transfer_kind(
        &self,
        setting: &InterfaceSetting,
        address: u8,
    ) -> Result<TransferKind, rusb::Error> {
        for index in 0..self.descriptor.num_configurations() {
            let config = self.device.config_descriptor(index)?;
            if config.number() != setting.configuration {
                continue;
            }

            let endpoint = config
                .interfaces()
                .filter(|interface| interface.number() == setting.interface)
                .flat_map(|interface| interface.descriptors())
                .filter(|alt| alt.setting_number() == setting.alt_setting)
                .flat_map(|alt| alt.endpoint_descriptors().collect::<Vec<_>>())
                .find(|endpoint| endpoint.address() == address);

            return match endpoint.map(|endpoint| endpoint.transfer_type()) {
                Some(TransferType::Bulk) => Ok(TransferKind::Bulk),
                Some(TransferType::Interrupt) => Ok(TransferKind::Interrupt),
                Some(other) => {
                    debug!("Endpoint {:#04x} uses {:?} transfers", address, other);
                    Err(rusb::Error::NotSupported)
                }
                None => Err(rusb::Error::NotFound),
            };
        }
        Err(rusb::Error::NotFound)
    }
}

impl SensorDevice for LibUsbDevice {
    fn claim_interface(&mut self, setting: &InterfaceSetting) -> Result<(), rusb::Error> {
        let handle = self.handle()?;

        // Not every platform can detach kernel drivers, claiming will tell us if it mattered.
        if let Err(error) = handle.set_auto_detach_kernel_driver(true) {
            debug!("Kernel driver auto-detach unavailable: {}", error);
        }

        if handle.active_configuration().ok() != Some(setting.configuration) {
            debug!(
                "Set Active Config: {:?}",
                handle.set_active_configuration(setting.configuration)
            );
        }

        handle.claim_interface(setting.interface)?;
        if let Err(error) = handle.set_alternate_setting(setting.interface, setting.alt_setting) {
            let _ = handle.release_interface(setting.interface);
            return Err(error);
        }
        Ok(())
    }

    fn release_interface(&mut self, setting: &InterfaceSetting) -> Result<(), rusb::Error> {
        self.handle()?.release_interface(setting.interface)
    }

    fn open_endpoint(
        &mut self,
        setting: &InterfaceSetting,
        number: u8,
        direction: Direction,
    ) -> Result<Endpoint, rusb::Error> {
        self.handle()?;
        let transfer = self.find_transfer_kind(setting, direction.address(number))?;

        let endpoint = Endpoint {
            number,
            direction,
            transfer,
        };
        debug!(
            "Opened {} endpoint {:#04x} ({:?})",
            direction,
            endpoint.address(),
            transfer
        );
        Ok(endpoint)
    }

    fn close_endpoint(&mut self, endpoint: &Endpoint) -> Result<(), rusb::Error> {
        // libusb endpoints carry no state of their own, they go away with the interface.
        debug!("Closed {} endpoint {:#04x}", endpoint.direction, endpoint.address());
        Ok(())
    }

    fn read(&mut self, endpoint: &Endpoint, buf: &mut [u8]) -> Result<usize, rusb::Error> {
        let timeout = self.timeout;
        let handle = self.handle()?;

        // Nothing to fill, so don't start a transfer which may never complete.
        if buf.is_empty() {
            return Ok(0);
        }
        match endpoint.transfer {
            TransferKind::Bulk => handle.read_bulk(endpoint.address(), buf, timeout),
            TransferKind::Interrupt => handle.read_interrupt(endpoint.address(), buf, timeout),
        }
    }

    fn write(&mut self, endpoint: &Endpoint, buf: &[u8]) -> Result<usize, rusb::Error> {
        let timeout = self.timeout;
        let handle = self.handle()?;
        match endpoint.transfer {
            TransferKind::Bulk => handle.write_bulk(endpoint.address(), buf, timeout),
            TransferKind::Interrupt => handle.write_interrupt(endpoint.address(), buf, timeout),
        }
    }

    fn close(&mut self) -> Result<(), rusb::Error> {
        // Dropping the handle is what hands it back to libusb.
        match self.handle.take() {
            Some(handle) => {
                drop(handle);
                Ok(())
            }
            None => Err(rusb::Error::NoDevice),
        }
    }

    fn describe(&self) -> Result<UsbData, rusb::Error> {
        let version = self.descriptor.usb_version();
        let handle = self.handle.as_ref().ok_or(rusb::Error::NoDevice)?;

        let timeout = Duration::from_millis(100);
        let language = handle.read_languages(timeout)?.first().copied();

        let (device_manufacturer, product_name) = match language {
            Some(language) => (
                handle
                    .read_manufacturer_string(language, &self.descriptor, timeout)
                    .ok(),
                handle
                    .read_product_string(language, &self.descriptor, timeout)
                    .ok(),
            ),
            None => (None, None),
        };

        Ok(UsbData {
            vendor_id: self.descriptor.vendor_id(),
            product_id: self.descriptor.product_id(),
            device_version: (version.0, version.1, version.2),
            device_manufacturer,
            product_name,
        })
    }
}

fn log_descriptor(device: &Device<Context>, descriptor: &DeviceDescriptor) {
    debug!("  {:?}", descriptor);
    for index in 0..descriptor.num_configurations() {
        let config = match device.config_descriptor(index) {
            Ok(config) => config,
            Err(error) => {
                debug!("  Config {}: unreadable ({})", index, error);
                continue;
            }
        };

        debug!(
            "  Config {} ({} interfaces, max power {}mA)",
            config.number(),
            config.num_interfaces(),
            config.max_power()
        );
        for interface in config.interfaces() {
            debug!("    --------------");
            for alt in interface.descriptors() {
                debug!(
                    "    Interface {} Setup {}: class {:#04x} subclass {:#04x} protocol {:#04x}",
                    alt.interface_number(),
                    alt.setting_number(),
                    alt.class_code(),
                    alt.sub_class_code(),
                    alt.protocol_code()
                );
                for endpoint in alt.endpoint_descriptors() {
                    debug!(
                        "      Endpoint {:#04x} {:?} {:?} max packet {}",
                        endpoint.address(),
                        endpoint.direction(),
                        endpoint.transfer_type(),
                        endpoint.max_packet_size()
                    );
                }
            }
        }
        debug!("    --------------");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_levels_follow_libusb_scale() {
        assert!(matches!(log_level(0), LogLevel::None));
        assert!(matches!(log_level(1), LogLevel::Error));
        assert!(matches!(log_level(2), LogLevel::Warning));
        assert!(matches!(log_level(3), LogLevel::Info));
        assert!(matches!(log_level(4), LogLevel::Debug));
        assert!(matches!(log_level(9), LogLevel::Debug));
    }
}
