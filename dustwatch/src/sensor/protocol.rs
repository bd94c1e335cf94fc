//! SDS011 wire protocol framing.
//!
//! The sensor speaks a fixed-size binary protocol at 9600 baud:
//!
//! - **Commands** (host → sensor): 19 bytes,
//!   `AA B4 <cmd> <12 data bytes> FF FF <checksum> AB`.
//! - **Replies** (sensor → host): 10 bytes,
//!   `AA <reply id> <6 payload bytes> <checksum> AB`, where the reply id is
//!   `C0` for a measurement frame and `C5` for a command acknowledgment.
//!
//! Both checksums are the low 8 bits of the sum of the bytes between the
//! header pair and the checksum byte. PM values arrive as little-endian
//! u16 tenths of µg/m³.
//!
//! Everything here is pure byte manipulation so framing can be tested
//! without a serial device.

use thiserror::Error;

/// First byte of every packet in either direction.
pub const FRAME_HEADER: u8 = 0xAA;

/// Last byte of every packet in either direction.
pub const FRAME_TAIL: u8 = 0xAB;

/// Second byte of a host-to-sensor command packet.
pub const COMMAND_ID: u8 = 0xB4;

/// Reply id carried by a measurement frame.
pub const REPLY_DATA: u8 = 0xC0;

/// Reply id carried by a command acknowledgment frame.
pub const REPLY_ACK: u8 = 0xC5;

/// Total length of a host-to-sensor command packet.
pub const COMMAND_LEN: usize = 19;

/// Total length of a sensor-to-host reply frame.
pub const REPLY_LEN: usize = 10;

// Command opcodes.
const CMD_SET_MODE: u8 = 2;
const CMD_QUERY_DATA: u8 = 4;
const CMD_SET_SLEEP: u8 = 6;

// Sub-values for CMD_SET_MODE / CMD_SET_SLEEP.
const MODE_QUERY: u8 = 1;
const SLEEP_WORK: u8 = 1;
const SLEEP_SLEEP: u8 = 0;

/// A single parsed measurement frame, before validation and timestamping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// PM2.5 concentration in µg/m³.
    pub pm2_5: f64,
    /// PM10 concentration in µg/m³.
    pub pm10_0: f64,
}

/// Structural problems with a sensor reply frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Frame did not start with [`FRAME_HEADER`].
    #[error("bad frame header {0:#04x}")]
    BadHeader(u8),

    /// Frame did not end with [`FRAME_TAIL`].
    #[error("bad frame tail {0:#04x}")]
    BadTail(u8),

    /// Frame carried an unexpected reply id.
    #[error("unexpected reply id {0:#04x}")]
    UnexpectedReply(u8),

    /// The carried checksum did not match the computed one.
    #[error("checksum mismatch: computed {computed:#04x}, frame carries {carried:#04x}")]
    Checksum { computed: u8, carried: u8 },

    /// No frame header found within the scan window.
    #[error("no frame header within {0} bytes")]
    HeaderNotFound(usize),
}

/// Build the command that turns the fan on and starts measuring.
pub fn wake_command() -> [u8; COMMAND_LEN] {
    encode_command(CMD_SET_SLEEP, &[0x01, SLEEP_WORK])
}

/// Build the command that turns the fan off and stops measuring.
pub fn sleep_command() -> [u8; COMMAND_LEN] {
    encode_command(CMD_SET_SLEEP, &[0x01, SLEEP_SLEEP])
}

/// Build the command that switches the sensor to query mode, where it only
/// reports when polled instead of streaming a frame every second.
pub fn query_mode_command() -> [u8; COMMAND_LEN] {
    encode_command(CMD_SET_MODE, &[0x01, MODE_QUERY])
}

/// Build the command that requests one measurement frame.
pub fn query_data_command() -> [u8; COMMAND_LEN] {
    encode_command(CMD_QUERY_DATA, &[])
}

/// Encode a command packet for the given opcode and data bytes.
///
/// `data` may hold at most 12 bytes; the remainder is zero-padded. The two
/// `FF` bytes address all sensors regardless of device id.
fn encode_command(cmd: u8, data: &[u8]) -> [u8; COMMAND_LEN] {
    debug_assert!(data.len() <= 12);

    let mut packet = [0u8; COMMAND_LEN];
    packet[0] = FRAME_HEADER;
    packet[1] = COMMAND_ID;
    packet[2] = cmd;
    packet[3..3 + data.len()].copy_from_slice(data);
    packet[15] = 0xFF;
    packet[16] = 0xFF;
    packet[17] = checksum(&packet[2..17]);
    packet[18] = FRAME_TAIL;
    packet
}

/// Low 8 bits of the byte sum.
fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Validate the envelope shared by all reply frames: header, tail, checksum.
fn validate_envelope(frame: &[u8; REPLY_LEN]) -> Result<(), FrameError> {
    if frame[0] != FRAME_HEADER {
        return Err(FrameError::BadHeader(frame[0]));
    }
    if frame[9] != FRAME_TAIL {
        return Err(FrameError::BadTail(frame[9]));
    }
    let computed = checksum(&frame[2..8]);
    if computed != frame[8] {
        return Err(FrameError::Checksum {
            computed,
            carried: frame[8],
        });
    }
    Ok(())
}

/// Parse a measurement frame into a [`Sample`].
pub fn parse_data_frame(frame: &[u8; REPLY_LEN]) -> Result<Sample, FrameError> {
    validate_envelope(frame)?;
    if frame[1] != REPLY_DATA {
        return Err(FrameError::UnexpectedReply(frame[1]));
    }

    let pm2_5 = u16::from_le_bytes([frame[2], frame[3]]) as f64 / 10.0;
    let pm10_0 = u16::from_le_bytes([frame[4], frame[5]]) as f64 / 10.0;
    Ok(Sample { pm2_5, pm10_0 })
}

/// Validate a command acknowledgment frame.
pub fn validate_ack(frame: &[u8; REPLY_LEN]) -> Result<(), FrameError> {
    validate_envelope(frame)?;
    if frame[1] != REPLY_ACK {
        return Err(FrameError::UnexpectedReply(frame[1]));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a reply frame with a correct checksum for the given id/payload.
    fn reply_frame(reply_id: u8, payload: [u8; 6]) -> [u8; REPLY_LEN] {
        let mut frame = [0u8; REPLY_LEN];
        frame[0] = FRAME_HEADER;
        frame[1] = reply_id;
        frame[2..8].copy_from_slice(&payload);
        frame[8] = checksum(&payload);
        frame[9] = FRAME_TAIL;
        frame
    }

    #[test]
    fn test_wake_command_bytes() {
        let cmd = wake_command();
        assert_eq!(cmd.len(), COMMAND_LEN);
        assert_eq!(cmd[0], 0xAA);
        assert_eq!(cmd[1], 0xB4);
        assert_eq!(cmd[2], 6);
        assert_eq!(&cmd[3..5], &[0x01, 0x01]);
        assert_eq!(&cmd[5..15], &[0u8; 10]);
        assert_eq!(&cmd[15..17], &[0xFF, 0xFF]);
        // (6 + 1 + 1 + 0xFF + 0xFF) mod 256
        assert_eq!(cmd[17], 0x06);
        assert_eq!(cmd[18], 0xAB);
    }

    #[test]
    fn test_sleep_command_bytes() {
        let cmd = sleep_command();
        assert_eq!(cmd[2], 6);
        assert_eq!(&cmd[3..5], &[0x01, 0x00]);
        assert_eq!(cmd[17], 0x05);
    }

    #[test]
    fn test_query_mode_command_bytes() {
        let cmd = query_mode_command();
        assert_eq!(cmd[2], 2);
        assert_eq!(&cmd[3..5], &[0x01, 0x01]);
        assert_eq!(cmd[17], 0x02);
    }

    #[test]
    fn test_query_data_command_bytes() {
        let cmd = query_data_command();
        assert_eq!(cmd[2], 4);
        assert_eq!(&cmd[3..15], &[0u8; 12]);
        assert_eq!(cmd[17], 0x02);
    }

    #[test]
    fn test_parse_data_frame() {
        // PM2.5 = 25.5 (255 = 0x00FF), PM10 = 28.8 (288 = 0x0120)
        let frame = reply_frame(REPLY_DATA, [0xFF, 0x00, 0x20, 0x01, 0xAB, 0xCD]);
        let sample = parse_data_frame(&frame).unwrap();
        assert_eq!(sample.pm2_5, 25.5);
        assert_eq!(sample.pm10_0, 28.8);
    }

    #[test]
    fn test_parse_data_frame_zero_values() {
        let frame = reply_frame(REPLY_DATA, [0, 0, 0, 0, 0x12, 0x34]);
        let sample = parse_data_frame(&frame).unwrap();
        assert_eq!(sample.pm2_5, 0.0);
        assert_eq!(sample.pm10_0, 0.0);
    }

    #[test]
    fn test_parse_rejects_bad_header() {
        let mut frame = reply_frame(REPLY_DATA, [1, 0, 2, 0, 0, 0]);
        frame[0] = 0x55;
        assert_eq!(parse_data_frame(&frame), Err(FrameError::BadHeader(0x55)));
    }

    #[test]
    fn test_parse_rejects_bad_tail() {
        let mut frame = reply_frame(REPLY_DATA, [1, 0, 2, 0, 0, 0]);
        frame[9] = 0x00;
        assert_eq!(parse_data_frame(&frame), Err(FrameError::BadTail(0x00)));
    }

    #[test]
    fn test_parse_rejects_corrupt_checksum() {
        let mut frame = reply_frame(REPLY_DATA, [1, 0, 2, 0, 0, 0]);
        frame[8] = frame[8].wrapping_add(1);
        assert!(matches!(
            parse_data_frame(&frame),
            Err(FrameError::Checksum { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_ack_frame_as_data() {
        let frame = reply_frame(REPLY_ACK, [6, 1, 1, 0, 0, 0]);
        assert_eq!(
            parse_data_frame(&frame),
            Err(FrameError::UnexpectedReply(REPLY_ACK))
        );
    }

    #[test]
    fn test_validate_ack() {
        let frame = reply_frame(REPLY_ACK, [6, 1, 1, 0, 0, 0]);
        assert!(validate_ack(&frame).is_ok());
    }

    #[test]
    fn test_validate_ack_rejects_data_frame() {
        let frame = reply_frame(REPLY_DATA, [0xFF, 0x00, 0x20, 0x01, 0, 0]);
        assert_eq!(
            validate_ack(&frame),
            Err(FrameError::UnexpectedReply(REPLY_DATA))
        );
    }
}
