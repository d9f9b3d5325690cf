//! Typed requests for the frame-protocol peripherals.
//!
//! Each [`Request`] maps to exactly one 8-byte [`Frame`] and knows the
//! length of the reply the device sends back.

use shack_core::{Error, Result};

use crate::frame::{
    ACK_LEN, CMD_PROBE, CW_ADDRESS, Frame, PAYLOAD_LEN, STATUS_REPLY_LEN, VFO_ADDRESS,
};

/// CW generator: sidetone tutor mode.
pub const CMD_TUTOR: u8 = 0x02;
/// CW generator: keyer mode.
pub const CMD_KEYER: u8 = 0x03;

/// VFO: enable/disable split.
pub const CMD_SET_SPLIT: u8 = 0x02;
/// VFO: set transmit tuning word.
pub const CMD_SET_TX: u8 = 0x03;
/// VFO: set receive tuning word.
pub const CMD_SET_RX: u8 = 0x04;
/// VFO: read the band switch.
pub const CMD_READ_BAND: u8 = 0x05;

/// Split payload byte: split on.
pub const SPLIT_ON: u8 = 0xFF;
/// Split payload byte: split off.
pub const SPLIT_OFF: u8 = 0x00;

/// Dit length in milliseconds at one word per minute (PARIS timing).
const DIT_MS_AT_1_WPM: u32 = 1200;

/// Operating mode of the CW generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CwMode {
    /// Practice oscillator driven by the paddle.
    Tutor,
    /// Iambic keyer.
    Keyer,
}

impl CwMode {
    /// Command byte for this mode.
    pub fn command(&self) -> u8 {
        match self {
            CwMode::Tutor => CMD_TUTOR,
            CwMode::Keyer => CMD_KEYER,
        }
    }

    /// Mode for a command byte.
    pub fn from_command(command: u8) -> Option<CwMode> {
        match command {
            CMD_TUTOR => Some(CwMode::Tutor),
            CMD_KEYER => Some(CwMode::Keyer),
            _ => None,
        }
    }
}

/// Settings sent to the CW generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CwCommand {
    pub mode: CwMode,
    /// Sidetone frequency in hertz.
    pub tone_hz: u16,
    /// Volume, device units.
    pub volume: u8,
    /// Dit length in milliseconds (dah is three dits).
    pub dit_ms: u8,
}

impl CwCommand {
    /// Build a command from a speed in words per minute.
    ///
    /// The dit length is `1200 / wpm` milliseconds, truncated.
    ///
    /// ```
    /// use shack_remote::{CwCommand, CwMode};
    ///
    /// let cmd = CwCommand::new(CwMode::Keyer, 650, 5, 22).unwrap();
    /// assert_eq!(cmd.dit_ms, 54);
    /// ```
    pub fn new(mode: CwMode, tone_hz: u16, volume: u8, wpm: u32) -> Result<Self> {
        Ok(CwCommand {
            mode,
            tone_hz,
            volume,
            dit_ms: dit_length(wpm)?,
        })
    }

    /// Speed in words per minute implied by the dit length.
    pub fn wpm(&self) -> u32 {
        match self.dit_ms {
            0 => 0,
            d => DIT_MS_AT_1_WPM / d as u32,
        }
    }
}

/// Dit length in milliseconds for `wpm`.
///
/// Zero wpm, a speed so slow the dit no longer fits a byte, or one so fast
/// it rounds to zero, is rejected.
pub fn dit_length(wpm: u32) -> Result<u8> {
    if wpm == 0 {
        return Err(Error::InvalidParameter("speed must be at least 1 wpm".into()));
    }
    match u8::try_from(DIT_MS_AT_1_WPM / wpm) {
        Ok(0) => Err(Error::InvalidParameter(format!("speed {wpm} wpm is too fast"))),
        Ok(dit) => Ok(dit),
        Err(_) => Err(Error::InvalidParameter(format!("speed {wpm} wpm is too slow"))),
    }
}

/// Commands understood by the VFO synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VfoCommand {
    /// Enable (`true`) or disable split operation.
    SetSplit(bool),
    /// Load the transmit tuning word.
    SetTx(u32),
    /// Load the receive tuning word.
    SetRx(u32),
    /// Read the band switch and transmit flag.
    ReadBand,
}

/// One request to a frame-protocol peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Request {
    /// Liveness probe.
    Probe { address: u8 },
    /// CW generator settings.
    Cw(CwCommand),
    /// VFO command.
    Vfo(VfoCommand),
}

impl Request {
    /// Device address this request is sent to.
    pub fn address(&self) -> u8 {
        match self {
            Request::Probe { address } => *address,
            Request::Cw(_) => CW_ADDRESS,
            Request::Vfo(_) => VFO_ADDRESS,
        }
    }

    /// Length of the reply the device sends back.
    pub fn reply_len(&self) -> usize {
        match self {
            Request::Vfo(VfoCommand::ReadBand) => STATUS_REPLY_LEN,
            _ => ACK_LEN,
        }
    }

    /// Build the frame for this request.
    pub fn to_frame(&self) -> Frame {
        match self {
            Request::Probe { address } => Frame::probe(*address),
            Request::Cw(cw) => {
                let [hi, lo] = cw.tone_hz.to_be_bytes();
                Frame {
                    address: CW_ADDRESS,
                    command: cw.mode.command(),
                    payload: [hi, lo, cw.volume, cw.dit_ms],
                }
            }
            Request::Vfo(cmd) => {
                let (command, payload) = match cmd {
                    VfoCommand::SetSplit(on) => {
                        let flag = if *on { SPLIT_ON } else { SPLIT_OFF };
                        (CMD_SET_SPLIT, [flag, 0, 0, 0])
                    }
                    VfoCommand::SetTx(word) => (CMD_SET_TX, word.to_be_bytes()),
                    VfoCommand::SetRx(word) => (CMD_SET_RX, word.to_be_bytes()),
                    VfoCommand::ReadBand => (CMD_READ_BAND, [0; PAYLOAD_LEN]),
                };
                Frame {
                    address: VFO_ADDRESS,
                    command,
                    payload,
                }
            }
        }
    }

    /// Encode this request to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        self.to_frame().encode()
    }

    /// Interpret a decoded frame as a request.
    pub fn from_frame(frame: &Frame) -> Result<Request> {
        let p = frame.payload;
        if frame.command == CMD_PROBE {
            return Ok(Request::Probe {
                address: frame.address,
            });
        }
        match frame.address {
            CW_ADDRESS => {
                let mode = CwMode::from_command(frame.command).ok_or_else(|| {
                    Error::Protocol(format!("unknown CW command 0x{:02X}", frame.command))
                })?;
                Ok(Request::Cw(CwCommand {
                    mode,
                    tone_hz: u16::from_be_bytes([p[0], p[1]]),
                    volume: p[2],
                    dit_ms: p[3],
                }))
            }
            VFO_ADDRESS => {
                let cmd = match frame.command {
                    CMD_SET_SPLIT => match p[0] {
                        SPLIT_ON => VfoCommand::SetSplit(true),
                        SPLIT_OFF => VfoCommand::SetSplit(false),
                        other => {
                            return Err(Error::Protocol(format!(
                                "split flag 0x{other:02X} is neither on nor off"
                            )));
                        }
                    },
                    CMD_SET_TX => VfoCommand::SetTx(u32::from_be_bytes(p)),
                    CMD_SET_RX => VfoCommand::SetRx(u32::from_be_bytes(p)),
                    CMD_READ_BAND => VfoCommand::ReadBand,
                    other => {
                        return Err(Error::Protocol(format!(
                            "unknown VFO command 0x{other:02X}"
                        )));
                    }
                };
                Ok(Request::Vfo(cmd))
            }
            other => Err(Error::Protocol(format!("no device at address 0x{other:02X}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::crc16;
    use proptest::prelude::*;

    // ---------------------------------------------------------------
    // CW generator
    // ---------------------------------------------------------------

    #[test]
    fn keyer_frame_bytes() {
        let cmd = CwCommand::new(CwMode::Keyer, 650, 5, 22).unwrap();
        let bytes = Request::Cw(cmd).encode();
        assert_eq!(&bytes[..6], &[0x80, 0x03, 0x02, 0x8A, 0x05, 0x36]);
        let crc = crc16(&bytes[..6]);
        assert_eq!(bytes[6], (crc >> 8) as u8);
        assert_eq!(bytes[7], crc as u8);
        assert_eq!(&bytes[6..], &[0x82, 0x61]);
    }

    #[test]
    fn tutor_uses_command_two() {
        let cmd = CwCommand::new(CwMode::Tutor, 650, 5, 22).unwrap();
        assert_eq!(Request::Cw(cmd).to_frame().command, 0x02);
    }

    #[test]
    fn dit_length_truncates() {
        assert_eq!(dit_length(22).unwrap(), 54);
        assert_eq!(dit_length(20).unwrap(), 60);
        assert_eq!(dit_length(13).unwrap(), 92);
    }

    #[test]
    fn dit_length_rejects_out_of_range() {
        assert!(matches!(dit_length(0), Err(Error::InvalidParameter(_))));
        // 1200 / 4 = 300 ms does not fit a byte.
        assert!(matches!(dit_length(4), Err(Error::InvalidParameter(_))));
        assert_eq!(dit_length(5).unwrap(), 240);
        assert!(matches!(dit_length(1201), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn wpm_from_dit() {
        let cmd = CwCommand::new(CwMode::Keyer, 700, 3, 25).unwrap();
        assert_eq!(cmd.dit_ms, 48);
        assert_eq!(cmd.wpm(), 25);
    }

    // ---------------------------------------------------------------
    // VFO
    // ---------------------------------------------------------------

    #[test]
    fn split_frames() {
        let on = Request::Vfo(VfoCommand::SetSplit(true)).encode();
        assert_eq!(on, vec![0x81, 0x02, 0xFF, 0x00, 0x00, 0x00, 0x9E, 0xA0]);
        let off = Request::Vfo(VfoCommand::SetSplit(false)).encode();
        assert_eq!(off, vec![0x81, 0x02, 0x00, 0x00, 0x00, 0x00, 0xD5, 0x03]);
    }

    #[test]
    fn tuning_word_is_big_endian() {
        let bytes = Request::Vfo(VfoCommand::SetTx(0x0A3D_70A4)).encode();
        assert_eq!(
            bytes,
            vec![0x81, 0x03, 0x0A, 0x3D, 0x70, 0xA4, 0x6D, 0x3A]
        );
    }

    #[test]
    fn read_band_has_status_reply() {
        let req = Request::Vfo(VfoCommand::ReadBand);
        assert_eq!(req.reply_len(), 3);
        assert_eq!(
            req.encode(),
            vec![0x81, 0x05, 0x00, 0x00, 0x00, 0x00, 0xB2, 0xD7]
        );
        assert_eq!(Request::Vfo(VfoCommand::SetRx(1)).reply_len(), 1);
        assert_eq!(Request::Probe { address: 0x80 }.reply_len(), 1);
    }

    // ---------------------------------------------------------------
    // Decoding
    // ---------------------------------------------------------------

    #[test]
    fn from_frame_rejects_unknown_address() {
        let frame = Frame::new(0x90, 0x02);
        assert!(matches!(Request::from_frame(&frame), Err(Error::Protocol(_))));
    }

    #[test]
    fn from_frame_rejects_bad_split_flag() {
        let frame = Frame::with_payload(VFO_ADDRESS, CMD_SET_SPLIT, &[0x01]).unwrap();
        assert!(matches!(Request::from_frame(&frame), Err(Error::Protocol(_))));
    }

    #[test]
    fn from_frame_rejects_unknown_vfo_command() {
        let frame = Frame::new(VFO_ADDRESS, 0x09);
        assert!(Request::from_frame(&frame).is_err());
    }

    fn any_request() -> impl Strategy<Value = Request> {
        let cw = (any::<bool>(), any::<u16>(), any::<u8>(), any::<u8>()).prop_map(
            |(keyer, tone_hz, volume, dit_ms)| {
                Request::Cw(CwCommand {
                    mode: if keyer { CwMode::Keyer } else { CwMode::Tutor },
                    tone_hz,
                    volume,
                    dit_ms,
                })
            },
        );
        let vfo = prop_oneof![
            any::<bool>().prop_map(VfoCommand::SetSplit),
            any::<u32>().prop_map(VfoCommand::SetTx),
            any::<u32>().prop_map(VfoCommand::SetRx),
            Just(VfoCommand::ReadBand),
        ]
        .prop_map(Request::Vfo);
        let probe = prop_oneof![Just(CW_ADDRESS), Just(VFO_ADDRESS)]
            .prop_map(|address| Request::Probe { address });
        prop_oneof![cw, vfo, probe]
    }

    proptest! {
        #[test]
        fn request_round_trip(req in any_request()) {
            let bytes = req.encode();
            prop_assert_eq!(bytes.len(), crate::frame::FRAME_LEN);
            let frame = Frame::decode(&bytes).unwrap();
            prop_assert_eq!(Request::from_frame(&frame).unwrap(), req);
        }
    }
}
