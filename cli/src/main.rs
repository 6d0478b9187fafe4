use airsensor_types::SensorConfig;
use airsensor_usb::{read_sensor, LibUsbTransport, SensorTransport};
use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};
use std::io::Write;

use crate::cli::Cli;
use crate::settings::{default_settings_location, RunSettings, Settings};

mod cli;
mod settings;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    CombinedLogger::init(vec![TermLogger::new(
        args.log_level.into(),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )])
    .context("Could not configure the logger")?;

    info!("Starting airsensor v{}", VERSION);

    let settings = match args.settings.clone().or_else(default_settings_location) {
        Some(path) => Settings::read(&path)?,
        None => Settings::default(),
    };
    let run = RunSettings::resolve(&args, settings);

    // One libusb context for the whole run, released when the transport goes out of scope.
    let mut transport =
        LibUsbTransport::new(run.debug, run.timeout).context("Could not initialise libusb")?;

    report(&mut transport, &run.sensor, &mut std::io::stdout().lock())
}

/// Takes one reading and prints it. A value outside the stick's range is still a reading, only
/// a failed exchange is an error.
fn report<T: SensorTransport>(
    transport: &mut T,
    sensor: &SensorConfig,
    out: &mut impl Write,
) -> Result<()> {
    let reading = read_sensor(transport, sensor)
        .with_context(|| format!("Unable to take a reading from {}", sensor.selector))?;

    if !reading.is_valid() {
        warn!("Sensor returned a value outside of its documented range");
    }
    writeln!(out, "{}", reading).context("Could not write the reading")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use airsensor_usb::device::mock::{MockScript, MockTransport};

    fn response(lo: u8, hi: u8) -> Vec<u8> {
        let mut response = vec![0x40, 0x69, lo, hi];
        response.resize(16, 0x40);
        response
    }

    #[test]
    fn prints_a_valid_reading() {
        let mut transport = MockTransport::new(vec![MockScript::responding(response(0xc2, 0x06))]);
        let mut out = Vec::new();

        report(&mut transport, &SensorConfig::default(), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "VOC concentration: 1730 ppm CO2-equivalent\n"
        );
    }

    #[test]
    fn out_of_range_reading_exits_cleanly() {
        let mut transport = MockTransport::new(vec![MockScript::responding(response(0xff, 0x7f))]);
        let mut out = Vec::new();

        assert!(report(&mut transport, &SensorConfig::default(), &mut out).is_ok());
        assert_eq!(String::from_utf8(out).unwrap(), "invalid value 32767 received\n");
    }

    #[test]
    fn missing_device_is_an_error() {
        let mut transport = MockTransport::new(vec![]);
        let mut out = Vec::new();

        let error = report(&mut transport, &SensorConfig::default(), &mut out).unwrap_err();
        assert!(format!("{:#}", error).contains("No device matching 03eb:2013"));
        assert!(out.is_empty());
    }
}
