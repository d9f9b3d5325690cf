//! RegistryBuilder -- fluent builder for [`RemoteRegistry`].
//!
//! Defaults match the station bench: 38400 baud, a 150 ms read timeout, one
//! probe attempt per address, and any USB port accepted.
//!
//! # Example
//!
//! ```no_run
//! use shack_remote::RegistryBuilder;
//! use shack_transport::SerialPortProvider;
//! use std::time::Duration;
//!
//! # async fn example() -> shack_core::Result<()> {
//! let registry = RegistryBuilder::new()
//!     .read_timeout(Duration::from_millis(200))
//!     .probe_attempts(3)
//!     .build_and_discover(Box::new(SerialPortProvider::new()))
//!     .await;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use shack_core::{Error, PortProvider};

use crate::cat::DEFAULT_RADIO_ID;
use crate::registry::{RegistryConfig, RemoteRegistry};

/// Fluent builder for [`RemoteRegistry`].
#[derive(Debug, Clone)]
pub struct RegistryBuilder {
    baud_rate: u32,
    read_timeout: Duration,
    probe_attempts: u32,
    probe_retry_delay: Duration,
    vendor_filter: Vec<u16>,
    radio_id: String,
    band_read_delay: Duration,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        RegistryBuilder {
            baud_rate: 38_400,
            read_timeout: Duration::from_millis(150),
            probe_attempts: 1,
            probe_retry_delay: Duration::from_millis(500),
            vendor_filter: Vec::new(),
            radio_id: DEFAULT_RADIO_ID.to_string(),
            band_read_delay: Duration::from_millis(120),
        }
    }

    /// Baud rate for every port (default: 38400).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Read timeout for every reply (default: 150ms).
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Probe attempts per address during discovery (default: 1).
    pub fn probe_attempts(mut self, n: u32) -> Self {
        self.probe_attempts = n.max(1);
        self
    }

    /// Pause between failed probe attempts (default: 500ms).
    pub fn probe_retry_delay(mut self, delay: Duration) -> Self {
        self.probe_retry_delay = delay;
        self
    }

    /// Restrict discovery to these USB vendor ids. Empty (the default)
    /// accepts any USB-attached port.
    pub fn vendor_filter(mut self, vids: &[u16]) -> Self {
        self.vendor_filter = vids.to_vec();
        self
    }

    /// Identification the radio answers `ID;` with (default: `0761`).
    pub fn radio_id(mut self, id: &str) -> Self {
        self.radio_id = id.to_string();
        self
    }

    /// Pause between a band read and its reply (default: 120ms).
    pub fn band_read_delay(mut self, delay: Duration) -> Self {
        self.band_read_delay = delay;
        self
    }

    /// The configuration this builder would produce.
    pub fn config(&self) -> RegistryConfig {
        RegistryConfig {
            baud_rate: self.baud_rate,
            read_timeout: self.read_timeout,
            probe_attempts: self.probe_attempts,
            probe_retry_delay: self.probe_retry_delay,
            vendor_filter: self.vendor_filter.clone(),
            radio_id: self.radio_id.clone(),
            band_read_delay: self.band_read_delay,
        }
    }

    /// Build a registry with every role down. Nothing is opened until the
    /// first request or [`RemoteRegistry::classify`].
    pub fn build(self, provider: Box<dyn PortProvider>) -> RemoteRegistry {
        RemoteRegistry::new(provider, self.config())
    }

    /// Build a registry and run an initial discovery pass.
    ///
    /// Devices may be plugged in later, so a failed pass is logged rather
    /// than returned; the registry rediscovers on first use.
    pub async fn build_and_discover(self, provider: Box<dyn PortProvider>) -> RemoteRegistry {
        let registry = self.build(provider);
        match registry.classify().await {
            Ok(()) => {}
            Err(e @ (Error::NoPorts | Error::NoPortMatch)) => {
                tracing::info!(error = %e, "No peripherals found at startup");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Initial discovery failed");
            }
        }
        for status in registry.status().await {
            tracing::info!(
                role = %status.role,
                up = status.up,
                port = status.port_name.as_deref().unwrap_or("-"),
                "Remote"
            );
        }
        registry
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_station() {
        let config = RegistryBuilder::new().config();
        assert_eq!(config.baud_rate, 38_400);
        assert_eq!(config.read_timeout, Duration::from_millis(150));
        assert_eq!(config.probe_attempts, 1);
        assert_eq!(config.probe_retry_delay, Duration::from_millis(500));
        assert!(config.vendor_filter.is_empty());
        assert_eq!(config.radio_id, "0761");
        assert_eq!(config.band_read_delay, Duration::from_millis(120));
    }

    #[test]
    fn overrides() {
        let config = RegistryBuilder::new()
            .baud_rate(115_200)
            .probe_attempts(0)
            .vendor_filter(&crate::discovery::DEFAULT_VENDOR_IDS)
            .radio_id("0570")
            .config();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.probe_attempts, 1);
        assert_eq!(config.vendor_filter, vec![0x10c4, 0x2341]);
        assert_eq!(config.radio_id, "0570");
    }
}
