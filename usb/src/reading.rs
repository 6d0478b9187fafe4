use airsensor_types::VocReading;
use byteorder::{ByteOrder, LittleEndian};

// Sensor documentation puts real readings between these, everything else is garbage.
pub const VOC_MIN: i16 = 450;
pub const VOC_MAX: i16 = 2000;

pub fn decode_le_int16(bytes: [u8; 2]) -> i16 {
    LittleEndian::read_i16(&bytes)
}

/// Pulls the reading out of bytes 2 and 3 of a response, if the response is long enough to
/// carry one.
pub fn decode_response(response: &[u8]) -> Option<i16> {
    let bytes = response.get(2..4)?;
    Some(decode_le_int16([bytes[0], bytes[1]]))
}

pub fn classify(value: i16) -> VocReading {
    if (VOC_MIN..=VOC_MAX).contains(&value) {
        VocReading::Valid(value)
    } else {
        VocReading::OutOfRange(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_matches_reference_for_every_pair() {
        for lo in 0..=u8::MAX {
            for hi in 0..=u8::MAX {
                let expected = (lo as u16 | ((hi as u16) << 8)) as i16;
                assert_eq!(decode_le_int16([lo, hi]), expected, "{:02x} {:02x}", lo, hi);
            }
        }
    }

    #[test]
    fn decode_known_values() {
        assert_eq!(decode_le_int16([0xc2, 0x06]), 1730);
        assert_eq!(decode_le_int16([0xff, 0x7f]), i16::MAX);
        assert_eq!(decode_le_int16([0x00, 0x80]), i16::MIN);
        assert_eq!(decode_le_int16([0xff, 0xff]), -1);
    }

    #[test]
    fn decode_response_uses_bytes_two_and_three() {
        let response = [0x40, 0x69, 0xc2, 0x06, 0x00, 0x00, 0x99];
        assert_eq!(decode_response(&response), Some(1730));
        assert_eq!(decode_response(&[0x40, 0x69, 0xc2]), None);
        assert_eq!(decode_response(&[]), None);
    }

    #[test]
    fn classify_boundaries() {
        assert_eq!(classify(450), VocReading::Valid(450));
        assert_eq!(classify(2000), VocReading::Valid(2000));
        assert_eq!(classify(449), VocReading::OutOfRange(449));
        assert_eq!(classify(2001), VocReading::OutOfRange(2001));
        assert_eq!(classify(i16::MIN), VocReading::OutOfRange(i16::MIN));
        assert_eq!(classify(i16::MAX), VocReading::OutOfRange(i16::MAX));
    }

    #[test]
    fn classify_is_stable() {
        for value in [i16::MIN, -1, 0, 449, 450, 1200, 2000, 2001, i16::MAX] {
            assert_eq!(classify(value), classify(value));
        }
    }
}
