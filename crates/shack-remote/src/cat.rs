//! CAT text-protocol encoder/decoder for the transceiver.
//!
//! The radio speaks semicolon-terminated ASCII commands: a two-letter prefix
//! followed by parameters, terminated with `;`. The error response for an
//! unrecognised or invalid command is `?;`.
//!
//! ```text
//! ID;           -> ID0761;
//! KM1CQ TEST};  (load keyer memory 1)
//! KY6;          (play keyer memory 1)
//! ```

use bytes::{BufMut, BytesMut};
use shack_core::{Error, Result};

/// CAT command/response terminator byte.
pub const TERMINATOR: u8 = b';';

/// Error response from the radio: `?;`.
pub const ERROR_RESPONSE: &[u8] = b"?;";

/// Identification command prefix.
pub const ID: &str = "ID";

/// Keyer memory load prefix.
pub const KEYER_MEMORY: &str = "KM";

/// Keyer playback prefix.
pub const KEY: &str = "KY";

/// End-of-message marker inside a keyer memory text.
const MEMORY_END: char = '}';

/// Identification reply of the default station radio.
pub const DEFAULT_RADIO_ID: &str = "0761";

/// Number of loadable keyer memories.
pub const MEMORY_SLOTS: u8 = 5;

/// Highest playable slot (function keys F1-F10).
pub const PLAY_SLOTS: u8 = 10;

/// Slot whose memory carries per-contact text (call, serial).
pub const VARIABLE_SLOT: u8 = 5;

/// Result of attempting to decode a CAT response from a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeResult {
    /// A complete response was decoded.
    Response {
        /// Command prefix echoed in the response.
        prefix: String,
        /// Data payload (everything between the prefix and the terminator).
        data: String,
        /// Number of bytes consumed from the input buffer.
        consumed: usize,
    },

    /// The radio returned the error response `?;`.
    Error(usize),

    /// The buffer does not yet contain a complete response.
    Incomplete,
}

/// Encode a CAT command: prefix, parameters, terminator.
///
/// ```
/// use shack_remote::cat::encode_command;
///
/// assert_eq!(encode_command("ID", ""), b"ID;");
/// assert_eq!(encode_command("KY", "6"), b"KY6;");
/// ```
pub fn encode_command(prefix: &str, params: &str) -> Vec<u8> {
    let capacity = prefix.len() + params.len() + 1;
    let mut buf = BytesMut::with_capacity(capacity);
    buf.put_slice(prefix.as_bytes());
    buf.put_slice(params.as_bytes());
    buf.put_u8(TERMINATOR);
    buf.to_vec()
}

/// Attempt to decode one CAT response from a byte buffer.
///
/// The prefix is the leading alphabetic run; the data is everything after
/// it up to the terminator.
pub fn decode_response(buf: &[u8]) -> DecodeResult {
    let Some(term_pos) = buf.iter().position(|&b| b == TERMINATOR) else {
        return DecodeResult::Incomplete;
    };

    let consumed = term_pos + 1;
    let body = &buf[..term_pos];

    if body == b"?" {
        return DecodeResult::Error(consumed);
    }

    let Ok(body_str) = std::str::from_utf8(body) else {
        return DecodeResult::Error(consumed);
    };

    let alpha_end = body_str
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(body_str.len());

    DecodeResult::Response {
        prefix: body_str[..alpha_end].to_string(),
        data: body_str[alpha_end..].to_string(),
        consumed,
    }
}

/// The identification query.
pub fn identify() -> Vec<u8> {
    encode_command(ID, "")
}

/// The reply expected from a radio whose id is `radio_id`.
pub fn identify_reply(radio_id: &str) -> Vec<u8> {
    encode_command(ID, radio_id)
}

/// Check an identification reply against `radio_id`.
pub fn is_identify_reply(reply: &[u8], radio_id: &str) -> bool {
    matches!(
        decode_response(reply),
        DecodeResult::Response { prefix, data, consumed }
            if prefix == ID && data == radio_id && consumed == reply.len()
    )
}

/// Load keyer memory `slot` (1-5) with `text`.
///
/// The radio stores upper-case text; `}` marks the end of the message, so
/// it cannot appear inside the text, nor can the CAT terminator.
pub fn load_memory(slot: u8, text: &str) -> Result<Vec<u8>> {
    if !(1..=MEMORY_SLOTS).contains(&slot) {
        return Err(Error::InvalidParameter(format!(
            "keyer memory slot {slot} is outside 1-{MEMORY_SLOTS}"
        )));
    }
    if text.contains([MEMORY_END, TERMINATOR as char]) || !text.is_ascii() {
        return Err(Error::InvalidParameter(format!(
            "keyer memory text {text:?} contains characters the radio cannot store"
        )));
    }
    let params = format!("{slot}{}{MEMORY_END}", text.to_ascii_uppercase());
    Ok(encode_command(KEYER_MEMORY, &params))
}

/// Play keyer memory `slot` (1-10).
///
/// Slots 1-4 play the fixed memories (codes `6`-`9`); slots 5-10 all play
/// the variable memory (code `A`), which the caller loads first.
pub fn play_memory(slot: u8) -> Result<Vec<u8>> {
    let code = match slot {
        1..=4 => char::from(b'5' + slot),
        5..=PLAY_SLOTS => 'A',
        _ => {
            return Err(Error::InvalidParameter(format!(
                "keyer slot {slot} is outside 1-{PLAY_SLOTS}"
            )));
        }
    };
    Ok(encode_command(KEY, code.encode_utf8(&mut [0; 4])))
}

/// Map a browser function-key code (F1 = 112 ... F10 = 121) to a slot.
pub fn function_key_slot(key_code: u32) -> Result<u8> {
    match key_code {
        112..=121 => Ok((key_code - 111) as u8),
        _ => Err(Error::InvalidParameter(format!(
            "function key number {key_code} is out of range"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---------------------------------------------------------------
    // Encoding/decoding
    // ---------------------------------------------------------------

    #[test]
    fn decode_id_reply() {
        match decode_response(b"ID0761;") {
            DecodeResult::Response {
                prefix,
                data,
                consumed,
            } => {
                assert_eq!(prefix, "ID");
                assert_eq!(data, "0761");
                assert_eq!(consumed, 7);
            }
            other => panic!("expected Response, got {other:?}"),
        }
    }

    #[test]
    fn decode_error_reply() {
        assert_eq!(decode_response(ERROR_RESPONSE), DecodeResult::Error(2));
    }

    #[test]
    fn decode_incomplete() {
        assert_eq!(decode_response(b"ID07"), DecodeResult::Incomplete);
        assert_eq!(decode_response(b""), DecodeResult::Incomplete);
    }

    // ---------------------------------------------------------------
    // Identification
    // ---------------------------------------------------------------

    #[test]
    fn identify_round_trip() {
        assert_eq!(identify(), b"ID;");
        assert_eq!(identify_reply(DEFAULT_RADIO_ID), b"ID0761;");
        assert_eq!(identify_reply(DEFAULT_RADIO_ID).len(), 7);
        assert!(is_identify_reply(b"ID0761;", "0761"));
        assert!(!is_identify_reply(b"ID0570;", "0761"));
        assert!(!is_identify_reply(b"?;", "0761"));
        assert!(!is_identify_reply(&[0xFF], "0761"));
    }

    // ---------------------------------------------------------------
    // Keyer memories
    // ---------------------------------------------------------------

    #[test]
    fn load_memory_uppercases() {
        assert_eq!(load_memory(1, "cq test ad2cc").unwrap(), b"KM1CQ TEST AD2CC};");
    }

    #[test]
    fn load_memory_rejects_bad_slot_and_text() {
        assert!(load_memory(0, "x").is_err());
        assert!(load_memory(6, "x").is_err());
        assert!(load_memory(2, "a;b").is_err());
        assert!(load_memory(2, "a}b").is_err());
    }

    #[test]
    fn play_memory_codes() {
        assert_eq!(play_memory(1).unwrap(), b"KY6;");
        assert_eq!(play_memory(4).unwrap(), b"KY9;");
        for slot in 5..=10 {
            assert_eq!(play_memory(slot).unwrap(), b"KYA;");
        }
        assert!(play_memory(0).is_err());
        assert!(play_memory(11).is_err());
    }

    #[test]
    fn function_keys() {
        assert_eq!(function_key_slot(112).unwrap(), 1);
        assert_eq!(function_key_slot(121).unwrap(), 10);
        assert!(function_key_slot(111).is_err());
        assert!(function_key_slot(122).is_err());
    }
}
