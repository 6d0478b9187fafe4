use airsensor_types::{DeviceSelector, SelectionPolicy};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

// Anything left unset here falls back to the settings file, then to the built-in defaults.
#[derive(Parser, Debug)]
#[clap(about, version)]
pub struct Cli {
    /// Device to which to connect, as vendor:product [default: 03eb:2013]
    #[clap(long)]
    pub device: Option<DeviceSelector>,

    /// USB configuration to activate on the device [default: 1]
    #[clap(long)]
    pub config: Option<u8>,

    /// Interface to claim [default: 0]
    #[clap(long)]
    pub interface: Option<u8>,

    /// Alternate setting of the interface [default: 0]
    #[clap(long)]
    pub setup: Option<u8>,

    /// Endpoint number the response is read from [default: 1]
    #[clap(long)]
    pub endpoint: Option<u8>,

    /// Endpoint number the request is written to [default: 2]
    #[clap(long)]
    pub write_endpoint: Option<u8>,

    /// What to do when more than one device matches [default: first]
    #[clap(long, value_enum)]
    pub selection: Option<SelectionPolicy>,

    /// Debug level for libusb, 0 (silent) to 4 [default: 3]
    #[clap(long)]
    pub debug: Option<u8>,

    /// Transfer timeout in milliseconds, 0 waits forever [default: 0]
    #[clap(long)]
    pub timeout_ms: Option<u64>,

    /// Location of a JSON settings file
    #[clap(long)]
    pub settings: Option<PathBuf>,

    /// Minimum log level to print out
    #[clap(long, value_enum, default_value = "info")]
    pub log_level: LevelFilter,
}

#[repr(usize)]
#[derive(ValueEnum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum LevelFilter {
    /// A level lower than all log levels.
    Off,
    /// Corresponds to the `Error` log level.
    Error,
    /// Corresponds to the `Warn` log level.
    Warn,
    /// Corresponds to the `Info` log level.
    Info,
    /// Corresponds to the `Debug` log level.
    Debug,
    /// Corresponds to the `Trace` log level.
    Trace,
}

impl From<LevelFilter> for log::LevelFilter {
    fn from(value: LevelFilter) -> Self {
        match value {
            LevelFilter::Off => log::LevelFilter::Off,
            LevelFilter::Error => log::LevelFilter::Error,
            LevelFilter::Warn => log::LevelFilter::Warn,
            LevelFilter::Info => log::LevelFilter::Info,
            LevelFilter::Debug => log::LevelFilter::Debug,
            LevelFilter::Trace => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_original_flag_names() {
        let args = Cli::try_parse_from([
            "airsensor",
            "--device",
            "03eb:2013",
            "--config",
            "1",
            "--interface",
            "0",
            "--setup",
            "0",
            "--endpoint",
            "1",
            "--debug",
            "2",
        ])
        .unwrap();

        assert_eq!(args.device, Some(DeviceSelector::default()));
        assert_eq!(args.config, Some(1));
        assert_eq!(args.debug, Some(2));
        assert_eq!(args.write_endpoint, None);
        assert_eq!(args.log_level, LevelFilter::Info);
    }

    #[test]
    fn rejects_bad_selector() {
        assert!(Cli::try_parse_from(["airsensor", "--device", "nonsense"]).is_err());
    }

    #[test]
    fn parses_selection_policy() {
        let args = Cli::try_parse_from(["airsensor", "--selection", "exclusive"]).unwrap();
        assert_eq!(args.selection, Some(SelectionPolicy::Exclusive));
    }
}
