//! shack-remote: Framed serial protocol and remote device registry.
//!
//! The station drives three peripherals over USB serial links:
//!
//! - a VFO synthesizer board (frame address `0x81`),
//! - a CW tone generator / keyer board (frame address `0x80`),
//! - the transceiver itself (CAT text protocol).
//!
//! The two boards share one fixed-length binary frame format:
//!
//! ```text
//! <address> <command> <payload x4> <crc_hi> <crc_lo>
//! ```
//!
//! Every send frame is 8 bytes. Replies are a single ack byte (`0xFF`), or
//! for the band read a status byte followed by its CRC. There is no
//! delimiter to resynchronize on, so every read and write is exact-length.
//!
//! Devices may be plugged in, unplugged, or powered at any time. The
//! [`RemoteRegistry`] owns one lock over all ports and rediscovers a role
//! on demand whenever it is found down.
//!
//! # Example
//!
//! ```no_run
//! use shack_remote::{CwMode, RegistryBuilder};
//! use shack_transport::SerialPortProvider;
//!
//! # async fn example() -> shack_core::Result<()> {
//! let registry = RegistryBuilder::new()
//!     .build_and_discover(Box::new(SerialPortProvider::new()))
//!     .await;
//!
//! registry.send_cw(CwMode::Keyer, 650, 5, 22).await?;
//! let band = registry.read_band().await?;
//! println!("band switch at {}", band.selection());
//! # Ok(())
//! # }
//! ```

pub mod band;
pub mod builder;
pub mod cat;
pub mod commands;
pub mod crc;
pub mod cw;
pub mod discovery;
pub mod frame;
pub mod radio;
pub mod registry;
pub mod vfo;

pub use band::{BandSelection, BandStatus, Sideband, VfoPlan};
pub use builder::RegistryBuilder;
pub use cat::function_key_slot;
pub use commands::{CwCommand, CwMode, Request, VfoCommand};
pub use crc::{crc_bytes, crc16};
pub use discovery::ProbePolicy;
pub use frame::Frame;
pub use registry::{RegistryConfig, RemoteRegistry, RemoteStatus};
pub use vfo::VfoChannel;
