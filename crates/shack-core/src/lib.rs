//! shack-core: Core traits, types, and error definitions for shack.
//!
//! This crate defines the device-agnostic abstractions shared by the serial
//! transport, the remote-device protocol layer, and the text lexers. Station
//! applications depend on these types without pulling in a specific serial
//! backend.
//!
//! # Key types
//!
//! - [`Role`] -- the peripheral roles a station drives (radio, VFO, CW keyer)
//! - [`Transport`] -- byte-level communication channel
//! - [`PortProvider`] -- serial port enumeration and opening
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod ports;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use shack_core::*`.
pub use error::{Error, Result};
pub use ports::{PortInfo, PortProvider};
pub use transport::{Transport, receive_exact};
pub use types::*;
