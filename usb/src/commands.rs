/// The request which triggers a reading, "@h*TR\n" padded out to a full frame with '@'.
pub const COMMAND_FRAME: [u8; 16] = [
    0x40, 0x68, 0x2a, 0x54, 0x52, 0x0a, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40,
];

// The stick always answers in 16 byte reports. The stale flush asks for nothing at all, an
// idle stick has nothing queued and a real read would sit there until one arrives.
pub const RESPONSE_LENGTH: usize = 16;
pub const STALE_FLUSH_LENGTH: usize = 0;
pub const TRAILING_FLUSH_LENGTH: usize = 16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_frame_layout() {
        assert_eq!(&COMMAND_FRAME[..6], b"@h*TR\n");
        assert!(COMMAND_FRAME[6..].iter().all(|&b| b == b'@'));
    }
}
