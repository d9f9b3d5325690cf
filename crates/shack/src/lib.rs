//! # shack -- Station control for a home-built amateur radio rig
//!
//! `shack` drives the USB peripherals of a home-built HF station and reads
//! the text formats a contest/DX operator deals with:
//!
//! - a CW tone generator and keyer board,
//! - a VFO synthesizer board with a band switch,
//! - the transceiver itself over its CAT text protocol,
//! - DX-cluster spot listings and LoTW ADIF confirmation exports.
//!
//! ## Quick Start
//!
//! ```no_run
//! use shack::{CwMode, RegistryBuilder, VfoChannel};
//! use shack::transport::SerialPortProvider;
//!
//! #[tokio::main]
//! async fn main() -> shack::Result<()> {
//!     let registry = RegistryBuilder::new()
//!         .build_and_discover(Box::new(SerialPortProvider::new()))
//!         .await;
//!
//!     registry.send_cw(CwMode::Keyer, 650, 5, 22).await?;
//!     registry.set_frequency_mhz(VfoChannel::Tx, "20m", 14.025).await?;
//!     println!("{}", registry.read_band().await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                | Purpose                                                 |
//! |----------------------|---------------------------------------------------------|
//! | `shack-core`         | [`Transport`] and [`PortProvider`] traits, [`Role`], errors |
//! | `shack-transport`    | tokio-serial transport and OS port enumeration          |
//! | `shack-remote`       | Frame codec, CRC16, discovery, [`RemoteRegistry`]       |
//! | `shack-lex`          | DX-spot and ADIF lexers with record accumulators        |
//! | **`shack`**          | This facade crate -- re-exports everything              |
//!
//! ## Feature Flags
//!
//! | Feature  | Enables                                   | Default |
//! |----------|-------------------------------------------|---------|
//! | `serial` | [`transport`] module (real serial ports)  | yes     |
//! | `lex`    | [`lex`] module (DX spots, ADIF)           | yes     |
//!
//! ## Reading a DX listing
//!
//! ```
//! # #[cfg(feature = "lex")]
//! # fn main() -> shack::Result<()> {
//! let listing = "AD2CC de W1NR >\n  14043.0 KE0YDN  28-Jul-2023 2100Z CW <KC3M>\nAD2CC de W1NR >";
//! let spots = shack::lex::parse_spots(listing, "ad2cc")?;
//! assert_eq!(spots[0].dx_call, "KE0YDN");
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "lex"))]
//! # fn main() {}
//! ```

pub use shack_core::*;
pub use shack_remote::{
    BandSelection, BandStatus, CwCommand, CwMode, RegistryBuilder, RegistryConfig, RemoteRegistry,
    RemoteStatus, Request, Sideband, VfoChannel, VfoCommand, VfoPlan,
};

/// Frame protocol, discovery, and the device registry.
pub mod remote {
    pub use shack_remote::*;
}

/// Serial port transport and enumeration.
///
/// Provides [`SerialTransport`](transport::SerialTransport) and
/// [`SerialPortProvider`](transport::SerialPortProvider), the hardware side
/// of the [`Transport`] and [`PortProvider`] traits.
#[cfg(feature = "serial")]
pub mod transport {
    pub use shack_transport::*;
}

/// DX-cluster and ADIF lexers.
#[cfg(feature = "lex")]
pub mod lex {
    pub use shack_lex::*;
}
