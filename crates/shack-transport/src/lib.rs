//! Serial transport for shack.
//!
//! This crate provides the hardware side of the [`Transport`](shack_core::Transport)
//! and [`PortProvider`](shack_core::PortProvider) traits from `shack-core`:
//!
//! - [`SerialTransport`]: USB virtual COM ports and RS-232 serial connections
//! - [`SerialPortProvider`]: OS serial port enumeration with USB metadata
//!
//! # Example
//!
//! ```no_run
//! use shack_transport::SerialTransport;
//! use shack_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> shack_core::Result<()> {
//! // Open the VFO board and probe it
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 38400).await?;
//! transport.send(&[0x81, 0x01, 0x00, 0x00, 0x00, 0x00, 0x3B, 0xD1]).await?;
//!
//! let mut ack = [0u8; 1];
//! let n = transport.receive(&mut ack, Duration::from_millis(150)).await?;
//! # Ok(())
//! # }
//! ```

pub mod ports;
pub mod serial;

pub use ports::SerialPortProvider;
pub use serial::{DataBits, Parity, SerialConfig, SerialTransport, StopBits};
