//! Core types used throughout shack.

use std::fmt;
use std::str::FromStr;

/// A peripheral role the station drives over a serial link.
///
/// The VFO synthesizer and the CW tone generator are purpose-built
/// microcontroller boards answering a binary frame protocol at a fixed
/// address byte. The radio is a commercial transceiver identified by a
/// text handshake instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// The transceiver (CAT text protocol).
    Radio,
    /// The VFO synthesizer board.
    Vfo,
    /// The CW tone generator / keyer board.
    Cw,
}

impl Role {
    /// Every role, in discovery order. The radio is tried first on each port
    /// because its text handshake does not disturb the frame-based boards.
    pub const ALL: [Role; 3] = [Role::Radio, Role::Vfo, Role::Cw];

    /// Protocol address byte for frame-based peripherals.
    ///
    /// Returns `None` for [`Role::Radio`], which has no address.
    pub fn address(&self) -> Option<u8> {
        match self {
            Role::Radio => None,
            Role::Vfo => Some(0x81),
            Role::Cw => Some(0x80),
        }
    }

    /// Look up the frame-based role answering at `address`.
    pub fn from_address(address: u8) -> Option<Role> {
        match address {
            0x81 => Some(Role::Vfo),
            0x80 => Some(Role::Cw),
            _ => None,
        }
    }

    /// Returns the lowercase name used in logs and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Role::Radio => "radio",
            Role::Vfo => "vfo",
            Role::Cw => "cw",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Error returned when a string cannot be parsed into a [`Role`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError(String);

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {:?}", self.0)
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "radio" => Ok(Role::Radio),
            "vfo" => Ok(Role::Vfo),
            "cw" | "keyer" => Ok(Role::Cw),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_addresses() {
        assert_eq!(Role::Vfo.address(), Some(0x81));
        assert_eq!(Role::Cw.address(), Some(0x80));
        assert_eq!(Role::Radio.address(), None);
    }

    #[test]
    fn role_from_address_round_trip() {
        for role in Role::ALL {
            if let Some(addr) = role.address() {
                assert_eq!(Role::from_address(addr), Some(role));
            }
        }
        assert_eq!(Role::from_address(0x01), None);
    }

    #[test]
    fn role_display_and_parse() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>(), Ok(role));
        }
        assert_eq!("CW".parse::<Role>(), Ok(Role::Cw));
        assert_eq!("keyer".parse::<Role>(), Ok(Role::Cw));
        assert!("amp".parse::<Role>().is_err());
    }

    #[test]
    fn discovery_order_puts_radio_first() {
        assert_eq!(Role::ALL[0], Role::Radio);
    }
}
