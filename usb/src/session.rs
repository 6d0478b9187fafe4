use crate::commands::{COMMAND_FRAME, RESPONSE_LENGTH, STALE_FLUSH_LENGTH, TRAILING_FLUSH_LENGTH};
use crate::device::base::{Endpoint, InterfaceSetting, SensorDevice, SensorTransport};
use crate::error::SessionError;
use crate::reading::{classify, decode_response};
use airsensor_types::{Direction, SelectionPolicy, SensorConfig, VocReading};
use log::{debug, info, log_enabled, warn, Level};
use strum::Display;

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
pub enum SessionState {
    Unopened,
    Opened,
    Flushed,
    Requested,
    Decoded,
    Closed,
    Failed,
}

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
pub enum ReadStep {
    #[strum(to_string = "pending bytes before the request")]
    StaleFlush,
    #[strum(to_string = "response")]
    Response,
    #[strum(to_string = "trailing bytes after the response")]
    TrailingFlush,
}

/// One connection to one sensor, good for exactly one reading.
///
/// Resources are acquired in the order device, interface, IN endpoint, OUT endpoint and handed
/// back in reverse. Release happens once, on whichever comes first of [`close`], a failed step,
/// or the session being dropped.
///
/// [`close`]: SensorSession::close
pub struct SensorSession<D: SensorDevice> {
    device: D,
    setting: InterfaceSetting,
    interface_claimed: bool,
    reader: Option<Endpoint>,
    writer: Option<Endpoint>,
    state: SessionState,
    released: bool,
}

impl<D: SensorDevice> SensorSession<D> {
    pub fn open<T>(transport: &mut T, config: &SensorConfig) -> Result<Self, SessionError>
    where
        T: SensorTransport<Device = D>,
    {
        let selector = config.selector;
        info!("Scanning for device {}...", selector);

        let devices = transport.find_devices(&selector)?;

        if devices.len() > 1 {
            match config.selection {
                SelectionPolicy::First => {
                    warn!(
                        "{} devices match {}, using the first one found",
                        devices.len(),
                        selector
                    );
                }
                SelectionPolicy::Exclusive => {
                    return Err(SessionError::AmbiguousDevice {
                        selector,
                        count: devices.len(),
                    });
                }
            }
        }

        // Anything past the first match is dropped here, closing its handle.
        let device = devices
            .into_iter()
            .next()
            .ok_or(SessionError::DeviceNotFound { selector })?;

        let mut session = Self {
            device,
            setting: InterfaceSetting {
                configuration: config.configuration,
                interface: config.interface,
                alt_setting: config.alt_setting,
            },
            interface_claimed: false,
            reader: None,
            writer: None,
            state: SessionState::Unopened,
            released: false,
        };

        if log_enabled!(Level::Debug) {
            if let Ok(data) = session.device.describe() {
                debug!("Connected to {:?}", data);
            }
        }

        if let Err(error) = session.acquire(config) {
            session.fail();
            return Err(error);
        }

        session.state = SessionState::Opened;
        Ok(session)
    }

    fn acquire(&mut self, config: &SensorConfig) -> Result<(), SessionError> {
        self.device
            .claim_interface(&self.setting)
            .map_err(|source| SessionError::InterfaceClaimFailed {
                interface: self.setting.interface,
                source,
            })?;
        self.interface_claimed = true;

        self.reader = Some(self.open_endpoint(config.read_endpoint, Direction::In)?);
        debug!("Got read endpoint: {:?}", self.reader);

        self.writer = Some(self.open_endpoint(config.write_endpoint, Direction::Out)?);
        debug!("Got write endpoint: {:?}", self.writer);
        Ok(())
    }

    fn open_endpoint(&mut self, number: u8, direction: Direction) -> Result<Endpoint, SessionError> {
        self.device
            .open_endpoint(&self.setting, number, direction)
            .map_err(|source| SessionError::EndpointOpenFailed {
                direction,
                endpoint: number,
                source,
            })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Reads whatever the device has pending into `buf` and throws it away. Before the request
    /// this is the stale flush (and moves the session to `Flushed`), after decoding it drains
    /// the trailing report. A failure here leaves the session unusable, there's no telling a
    /// stuck read from a desynchronised device.
    pub fn flush(&mut self, buf: &mut [u8]) -> Result<usize, SessionError> {
        let step = match self.state {
            SessionState::Opened => ReadStep::StaleFlush,
            SessionState::Decoded => ReadStep::TrailingFlush,
            state => return Err(SessionError::InvalidState { state }),
        };

        match self.read(step, buf) {
            Ok(count) => {
                if step == ReadStep::StaleFlush {
                    self.state = SessionState::Flushed;
                }
                Ok(count)
            }
            Err(error) => {
                self.fail();
                Err(error)
            }
        }
    }

    /// Runs the exchange. A session which has already been flushed by hand goes straight to
    /// the request.
    pub fn request_reading(&mut self) -> Result<VocReading, SessionError> {
        if !matches!(self.state, SessionState::Opened | SessionState::Flushed) {
            return Err(SessionError::InvalidState { state: self.state });
        }

        match self.exchange() {
            Ok(reading) => Ok(reading),
            Err(error) => {
                self.fail();
                Err(error)
            }
        }
    }

    fn exchange(&mut self) -> Result<VocReading, SessionError> {
        if self.state == SessionState::Opened {
            let mut stale = [0; STALE_FLUSH_LENGTH];
            let count = self.read(ReadStep::StaleFlush, &mut stale)?;
            debug!("Read {} bytes into temporary buffer", count);
            self.state = SessionState::Flushed;
        }

        let writer = self.writer.ok_or(SessionError::InvalidState { state: self.state })?;
        let written = self
            .device
            .write(&writer, &COMMAND_FRAME)
            .map_err(SessionError::WriteFailed)?;
        debug!("Request data - wrote {} bytes: {:02x?}", written, COMMAND_FRAME);
        if written < COMMAND_FRAME.len() {
            return Err(SessionError::WriteIncomplete {
                written,
                expected: COMMAND_FRAME.len(),
            });
        }
        self.state = SessionState::Requested;

        let mut response = [0; RESPONSE_LENGTH];
        let received = self.read(ReadStep::Response, &mut response)?;
        debug!(
            "Response data - read {} bytes: {:02x?}",
            received,
            &response[..received]
        );

        let value = decode_response(&response[..received])
            .ok_or(SessionError::ResponseTooShort { received })?;
        let reading = classify(value);
        self.state = SessionState::Decoded;

        // The stick follows every response with one more report, which has to go.
        let mut trailing = [0; TRAILING_FLUSH_LENGTH];
        let count = self.read(ReadStep::TrailingFlush, &mut trailing)?;
        debug!("Read {} bytes into temporary buffer", count);

        Ok(reading)
    }

    fn read(&mut self, step: ReadStep, buf: &mut [u8]) -> Result<usize, SessionError> {
        let reader = self.reader.ok_or(SessionError::InvalidState { state: self.state })?;
        self.device
            .read(&reader, buf)
            .map_err(|source| SessionError::ReadFailed { step, source })
    }

    /// Hands everything back. Taking the session by value means it can't be used afterwards.
    pub fn close(mut self) {
        if self.state != SessionState::Failed {
            self.state = SessionState::Closed;
        }
        self.release();
    }

    fn fail(&mut self) {
        self.state = SessionState::Failed;
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        for endpoint in [self.writer.take(), self.reader.take()].into_iter().flatten() {
            if let Err(error) = self.device.close_endpoint(&endpoint) {
                warn!(
                    "Unable to close {} endpoint {}: {}",
                    endpoint.direction, endpoint.number, error
                );
            }
        }

        if self.interface_claimed {
            self.interface_claimed = false;
            if let Err(error) = self.device.release_interface(&self.setting) {
                warn!(
                    "Unable to release interface {}: {}",
                    self.setting.interface, error
                );
            }
        }

        if let Err(error) = self.device.close() {
            warn!("Unable to close device: {}", error);
        }
    }
}

impl<D: SensorDevice> Drop for SensorSession<D> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Opens a session, takes one reading and closes it again.
pub fn read_sensor<T: SensorTransport>(
    transport: &mut T,
    config: &SensorConfig,
) -> Result<VocReading, SessionError> {
    let mut session = SensorSession::open(transport, config)?;
    let reading = session.request_reading();
    session.close();
    reading
}
