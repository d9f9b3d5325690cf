//! CRC-16/CCITT (XMODEM variant) checksum.
//!
//! Polynomial `0x1021`, initial value `0x0000`, no reflection, no final XOR.
//! The checksum is appended to every frame big-endian, so running the CRC
//! over a frame including its checksum yields zero.

/// Generator polynomial.
pub const POLY: u16 = 0x1021;

/// Compute the CRC over `data`.
///
/// ```
/// use shack_remote::crc16;
///
/// assert_eq!(crc16(b"123456789"), 0x31C3);
/// ```
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0x0000;
    for &b in data {
        crc ^= (b as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ POLY;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// CRC over `data` as the two bytes appended on the wire (high byte first).
pub fn crc_bytes(data: &[u8]) -> [u8; 2] {
    crc16(data).to_be_bytes()
}
