//! shack-test-harness: Test utilities and simulated hardware for shack.
//!
//! This crate provides [`MockTransport`] for deterministic unit testing of
//! protocol code without real hardware, and [`SimBench`], a hot-pluggable
//! bench of simulated USB serial devices (CW keyer, VFO board, radio) that
//! implements [`PortProvider`](shack_core::PortProvider) for registry and
//! discovery tests.

pub mod mock_serial;
pub mod sim;

pub use mock_serial::MockTransport;
pub use sim::{SimBench, SimDevice, SimPeripheral, SimRadio};
