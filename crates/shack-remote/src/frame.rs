//! Fixed-length frame encoder/decoder.
//!
//! # Frame format
//!
//! ```text
//! <address> <command> <p0> <p1> <p2> <p3> <crc_hi> <crc_lo>
//! ```
//!
//! - `address`: device address (`0x80` CW generator, `0x81` VFO)
//! - `command`: command byte, interpreted per address
//! - `p0..p3`: payload, zero-padded to four bytes
//! - `crc`: [`crc16`] over the six preceding bytes, big-endian
//!
//! Replies are either a single [`ACK`] byte or, for the band read, a
//! status byte followed by the CRC of that byte.

use bytes::{BufMut, BytesMut};
use shack_core::{Error, Result};

use crate::crc::crc16;

/// Total length of every send frame.
pub const FRAME_LEN: usize = 8;

/// Payload bytes between the header and the CRC.
pub const PAYLOAD_LEN: usize = 4;

/// Header bytes (address and command).
pub const HEADER_LEN: usize = 2;

/// Positive acknowledgement.
pub const ACK: u8 = 0xFF;

/// Negative acknowledgement.
pub const NACK: u8 = 0x00;

/// Length of an ack reply.
pub const ACK_LEN: usize = 1;

/// Length of a status reply (status byte + CRC).
pub const STATUS_REPLY_LEN: usize = 3;

/// Liveness probe command, valid at every address.
pub const CMD_PROBE: u8 = 0x01;

/// CW tone generator address.
pub const CW_ADDRESS: u8 = 0x80;

/// VFO synthesizer address.
pub const VFO_ADDRESS: u8 = 0x81;

/// A decoded send frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame {
    /// Device address.
    pub address: u8,
    /// Command byte.
    pub command: u8,
    /// Payload, zero-padded.
    pub payload: [u8; PAYLOAD_LEN],
}

impl Frame {
    /// A frame with an all-zero payload.
    pub fn new(address: u8, command: u8) -> Self {
        Frame {
            address,
            command,
            payload: [0; PAYLOAD_LEN],
        }
    }

    /// A frame carrying `payload`, zero-padded on the right.
    ///
    /// Fails with [`Error::InvalidParameter`] if the payload is longer than
    /// [`PAYLOAD_LEN`].
    pub fn with_payload(address: u8, command: u8, payload: &[u8]) -> Result<Self> {
        if payload.len() > PAYLOAD_LEN {
            return Err(Error::InvalidParameter(format!(
                "payload of {} bytes exceeds {PAYLOAD_LEN}",
                payload.len()
            )));
        }
        let mut frame = Frame::new(address, command);
        frame.payload[..payload.len()].copy_from_slice(payload);
        Ok(frame)
    }

    /// The liveness probe for `address`.
    pub fn probe(address: u8) -> Self {
        Frame::new(address, CMD_PROBE)
    }

    /// Encode into wire bytes, CRC appended.
    ///
    /// ```
    /// use shack_remote::Frame;
    ///
    /// let bytes = Frame::probe(0x81).encode();
    /// assert_eq!(bytes, [0x81, 0x01, 0x00, 0x00, 0x00, 0x00, 0x3B, 0xD1]);
    /// ```
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(FRAME_LEN);
        buf.put_u8(self.address);
        buf.put_u8(self.command);
        buf.put_slice(&self.payload);
        let crc = crc16(&buf);
        buf.put_u16(crc);
        buf.to_vec()
    }

    /// Decode wire bytes, validating length and CRC.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != FRAME_LEN {
            return Err(Error::Protocol(format!(
                "frame is {} bytes, expected {FRAME_LEN}",
                bytes.len()
            )));
        }
        let body = &bytes[..FRAME_LEN - 2];
        let carried = u16::from_be_bytes([bytes[FRAME_LEN - 2], bytes[FRAME_LEN - 1]]);
        let computed = crc16(body);
        if computed != carried {
            return Err(Error::CrcMismatch {
                expected: computed,
                actual: carried,
            });
        }
        let mut payload = [0u8; PAYLOAD_LEN];
        payload.copy_from_slice(&body[HEADER_LEN..]);
        Ok(Frame {
            address: body[0],
            command: body[1],
            payload,
        })
    }
}

/// Validate a single-byte ack reply.
///
/// Anything other than exactly one [`ACK`] byte is a failure: no bytes is a
/// short read, and any other byte (including [`NACK`]) is [`Error::Nack`].
pub fn check_ack(reply: &[u8]) -> Result<()> {
    match reply {
        [] => Err(Error::ShortRead {
            expected: ACK_LEN,
            actual: 0,
        }),
        [ACK] => Ok(()),
        [other] => Err(Error::Nack(*other)),
        _ => Err(Error::Protocol(format!(
            "ack reply is {} bytes, expected {ACK_LEN}",
            reply.len()
        ))),
    }
}

/// Encode a status reply: the byte followed by its CRC.
pub fn encode_status_reply(status: u8) -> [u8; STATUS_REPLY_LEN] {
    let [hi, lo] = crc16(&[status]).to_be_bytes();
    [status, hi, lo]
}

/// Validate a status reply and return the status byte.
///
/// Both CRC bytes must match; a mismatch in either is rejected.
pub fn decode_status_reply(reply: &[u8]) -> Result<u8> {
    if reply.len() != STATUS_REPLY_LEN {
        return Err(Error::ShortRead {
            expected: STATUS_REPLY_LEN,
            actual: reply.len(),
        });
    }
    let computed = crc16(&reply[..1]);
    let carried = u16::from_be_bytes([reply[1], reply[2]]);
    if computed != carried {
        return Err(Error::CrcMismatch {
            expected: computed,
            actual: carried,
        });
    }
    Ok(reply[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ---------------------------------------------------------------
    // Encoding
    // ---------------------------------------------------------------

    #[test]
    fn encode_probe_vfo() {
        assert_eq!(
            Frame::probe(VFO_ADDRESS).encode(),
            vec![0x81, 0x01, 0x00, 0x00, 0x00, 0x00, 0x3B, 0xD1]
        );
    }

    #[test]
    fn encode_probe_cw() {
        assert_eq!(
            Frame::probe(CW_ADDRESS).encode(),
            vec![0x80, 0x01, 0x00, 0x00, 0x00, 0x00, 0x7E, 0x71]
        );
    }

    #[test]
    fn short_payload_is_zero_padded() {
        let frame = Frame::with_payload(VFO_ADDRESS, 0x02, &[0xFF]).unwrap();
        assert_eq!(frame.payload, [0xFF, 0x00, 0x00, 0x00]);
        assert_eq!(
            frame.encode(),
            vec![0x81, 0x02, 0xFF, 0x00, 0x00, 0x00, 0x9E, 0xA0]
        );
    }

    #[test]
    fn oversized_payload_rejected() {
        let result = Frame::with_payload(VFO_ADDRESS, 0x03, &[1, 2, 3, 4, 5]);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn every_frame_is_fixed_length() {
        for cmd in 0x01..=0x05 {
            assert_eq!(Frame::new(VFO_ADDRESS, cmd).encode().len(), FRAME_LEN);
        }
    }

    // ---------------------------------------------------------------
    // Decoding
    // ---------------------------------------------------------------

    #[test]
    fn decode_rejects_wrong_length() {
        let result = Frame::decode(&[0x81, 0x01, 0x00]);
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[test]
    fn decode_rejects_bad_crc() {
        let mut bytes = Frame::probe(CW_ADDRESS).encode();
        bytes[7] ^= 0x01;
        let result = Frame::decode(&bytes);
        assert!(matches!(
            result,
            Err(Error::CrcMismatch {
                expected: 0x7E71,
                actual: 0x7E70
            })
        ));
    }

    // ---------------------------------------------------------------
    // Ack replies
    // ---------------------------------------------------------------

    #[test]
    fn ack_accepted() {
        assert!(check_ack(&[ACK]).is_ok());
    }

    #[test]
    fn nack_rejected() {
        assert!(matches!(check_ack(&[NACK]), Err(Error::Nack(0x00))));
    }

    #[test]
    fn empty_reply_rejected() {
        assert!(matches!(
            check_ack(&[]),
            Err(Error::ShortRead {
                expected: 1,
                actual: 0
            })
        ));
    }

    #[test]
    fn every_non_ack_byte_rejected() {
        for b in 0u8..=0xFE {
            assert!(matches!(check_ack(&[b]), Err(Error::Nack(x)) if x == b));
        }
    }

    // ---------------------------------------------------------------
    // Status replies
    // ---------------------------------------------------------------

    #[test]
    fn status_reply_validates() {
        let reply = encode_status_reply(0x03);
        assert_eq!(reply, [0x03, 0x30, 0x63]);
        assert_eq!(decode_status_reply(&reply).unwrap(), 0x03);
    }

    #[test]
    fn status_reply_any_crc_bit_flip_fails() {
        let reply = encode_status_reply(0x03);
        for byte in 1..STATUS_REPLY_LEN {
            for bit in 0..8 {
                let mut bad = reply;
                bad[byte] ^= 1 << bit;
                assert!(
                    matches!(decode_status_reply(&bad), Err(Error::CrcMismatch { .. })),
                    "flip of bit {bit} in byte {byte} was accepted"
                );
            }
        }
    }

    #[test]
    fn status_reply_only_one_crc_byte_wrong_fails() {
        // Only the low byte differs; the high byte alone still matches.
        let reply = [0x03, 0x30, 0x00];
        assert!(decode_status_reply(&reply).is_err());
        let reply = [0x03, 0x00, 0x63];
        assert!(decode_status_reply(&reply).is_err());
    }

    #[test]
    fn status_reply_short_rejected() {
        assert!(matches!(
            decode_status_reply(&[0x03]),
            Err(Error::ShortRead {
                expected: 3,
                actual: 1
            })
        ));
    }

    // ---------------------------------------------------------------
    // Properties
    // ---------------------------------------------------------------

    proptest! {
        #[test]
        fn frame_round_trip(address in any::<u8>(), command in any::<u8>(), payload in any::<[u8; 4]>()) {
            let frame = Frame { address, command, payload };
            let bytes = frame.encode();
            prop_assert_eq!(bytes.len(), FRAME_LEN);
            prop_assert_eq!(Frame::decode(&bytes).unwrap(), frame);
        }

        #[test]
        fn status_round_trip(status in any::<u8>()) {
            prop_assert_eq!(decode_status_reply(&encode_status_reply(status)).unwrap(), status);
        }
    }
}
