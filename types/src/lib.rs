#[cfg(feature = "clap")]
use clap::ValueEnum;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::Formatter;
use std::str::FromStr;
use strum::{Display, EnumIter};

// AppliedSensor iAQ-Stick (and the rebadged Voltcraft CO-20)
pub const VID_AIRSENSOR: u16 = 0x03eb;
pub const PID_AIRSENSOR: u16 = 0x2013;

/// Identifies which attached device a session should target, written and parsed in the
/// familiar `vvvv:pppp` form used by `lsusb`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct DeviceSelector {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceSelector {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }
}

impl Default for DeviceSelector {
    fn default() -> Self {
        Self::new(VID_AIRSENSOR, PID_AIRSENSOR)
    }
}

impl std::fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorParseError {
    #[error("Expected a selector in the form vvvv:pppp, got {0:?}")]
    MissingSeparator(String),

    #[error("Invalid {part} id {value:?}, expected up to four hex digits")]
    InvalidId { part: &'static str, value: String },
}

impl FromStr for DeviceSelector {
    type Err = SelectorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (vendor, product) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| SelectorParseError::MissingSeparator(s.to_string()))?;

        Ok(Self {
            vendor_id: parse_id("vendor", vendor)?,
            product_id: parse_id("product", product)?,
        })
    }
}

fn parse_id(part: &'static str, value: &str) -> Result<u16, SelectorParseError> {
    // from_str_radix would happily accept a leading '+' or extra leading zeros.
    if value.is_empty() || value.len() > 4 || !value.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SelectorParseError::InvalidId {
            part,
            value: value.to_string(),
        });
    }
    u16::from_str_radix(value, 16).map_err(|_| SelectorParseError::InvalidId {
        part,
        value: value.to_string(),
    })
}

impl TryFrom<String> for DeviceSelector {
    type Error = SelectorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceSelector> for String {
    fn from(value: DeviceSelector) -> Self {
        value.to_string()
    }
}

#[derive(Copy, Clone, Debug, Display, EnumIter, PartialEq, Eq)]
pub enum Direction {
    #[strum(to_string = "IN")]
    In,
    #[strum(to_string = "OUT")]
    Out,
}

impl Direction {
    /// Builds the USB endpoint address for an endpoint number travelling in this direction.
    pub fn address(&self, endpoint: u8) -> u8 {
        match self {
            Direction::In => 0x80 | (endpoint & 0x0f),
            Direction::Out => endpoint & 0x0f,
        }
    }
}

/// What to do when more than one attached device matches the selector.
#[derive(Copy, Clone, Debug, Default, Display, EnumIter, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(ValueEnum))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SelectionPolicy {
    /// Use the first matching device in enumeration order
    #[default]
    First,
    /// Refuse to continue unless exactly one device matches
    Exclusive,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SensorConfig {
    pub selector: DeviceSelector,
    pub configuration: u8,
    pub interface: u8,
    pub alt_setting: u8,
    pub read_endpoint: u8,
    pub write_endpoint: u8,
    pub selection: SelectionPolicy,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            selector: DeviceSelector::default(),
            configuration: 1,
            interface: 0,
            alt_setting: 0,
            read_endpoint: 1,
            write_endpoint: 2,
            selection: SelectionPolicy::First,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VocReading {
    Valid(i16),
    OutOfRange(i16),
}

impl VocReading {
    pub fn value(&self) -> i16 {
        match self {
            VocReading::Valid(value) | VocReading::OutOfRange(value) => *value,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, VocReading::Valid(_))
    }
}

impl std::fmt::Display for VocReading {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VocReading::Valid(value) => write!(f, "VOC concentration: {} ppm CO2-equivalent", value),
            VocReading::OutOfRange(value) => write!(f, "invalid value {} received", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_selector() {
        let selector: DeviceSelector = "03eb:2013".parse().unwrap();
        assert_eq!(selector, DeviceSelector::default());
        assert_eq!(selector.to_string(), "03eb:2013");
    }

    #[test]
    fn parses_uppercase_and_short_ids() {
        let selector: DeviceSelector = "ABCD:1".parse().unwrap();
        assert_eq!(selector, DeviceSelector::new(0xabcd, 0x0001));
        assert_eq!(selector.to_string(), "abcd:0001");
    }

    #[test]
    fn rejects_malformed_selectors() {
        assert!(matches!(
            "03eb2013".parse::<DeviceSelector>(),
            Err(SelectorParseError::MissingSeparator(_))
        ));
        assert!(matches!(
            ":2013".parse::<DeviceSelector>(),
            Err(SelectorParseError::InvalidId { part: "vendor", .. })
        ));
        assert!(matches!(
            "03eb:zz".parse::<DeviceSelector>(),
            Err(SelectorParseError::InvalidId { part: "product", .. })
        ));
        assert!(matches!(
            "03eb:12345".parse::<DeviceSelector>(),
            Err(SelectorParseError::InvalidId { part: "product", .. })
        ));
        assert!("+3eb:2013".parse::<DeviceSelector>().is_err());
    }

    #[test]
    fn rejects_ids_longer_than_four_digits() {
        assert!(matches!(
            "00001:2013".parse::<DeviceSelector>(),
            Err(SelectorParseError::InvalidId { part: "vendor", .. })
        ));
        assert!(matches!(
            "03eb:02013".parse::<DeviceSelector>(),
            Err(SelectorParseError::InvalidId { part: "product", .. })
        ));
    }

    #[test]
    fn endpoint_addresses() {
        assert_eq!(Direction::In.address(1), 0x81);
        assert_eq!(Direction::Out.address(2), 0x02);
        assert_eq!(Direction::In.to_string(), "IN");
        assert_eq!(Direction::Out.to_string(), "OUT");
    }

    #[test]
    fn reading_output_lines() {
        assert_eq!(
            VocReading::Valid(1730).to_string(),
            "VOC concentration: 1730 ppm CO2-equivalent"
        );
        assert_eq!(
            VocReading::OutOfRange(32767).to_string(),
            "invalid value 32767 received"
        );
        assert_eq!(VocReading::OutOfRange(-3).value(), -3);
        assert!(!VocReading::OutOfRange(-3).is_valid());
    }

    #[test]
    #[cfg(feature = "serde")]
    fn config_fills_missing_fields() {
        let config: SensorConfig =
            serde_json::from_str(r#"{"selector": "1234:abcd", "interface": 3}"#).unwrap();
        assert_eq!(config.selector, DeviceSelector::new(0x1234, 0xabcd));
        assert_eq!(config.interface, 3);
        assert_eq!(config.write_endpoint, 2);
    }
}
