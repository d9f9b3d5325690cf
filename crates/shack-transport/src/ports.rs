//! OS serial port enumeration.

use async_trait::async_trait;
use shack_core::error::{Error, Result};
use shack_core::ports::{PortInfo, PortProvider};
use shack_core::transport::Transport;
use std::time::Duration;
use tokio_serial::SerialPortType;

use crate::serial::{DEFAULT_SETTLE_DELAY, SerialConfig, SerialTransport};

/// [`PortProvider`] backed by the operating system's serial port list.
#[derive(Debug, Clone)]
pub struct SerialPortProvider {
    settle_delay: Duration,
}

impl SerialPortProvider {
    /// Create a provider using the default settle delay.
    pub fn new() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Set the pause between opening a port and its first use.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

impl Default for SerialPortProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert one enumerated port into a [`PortInfo`].
fn port_info(p: tokio_serial::SerialPortInfo) -> PortInfo {
    match p.port_type {
        SerialPortType::UsbPort(info) => PortInfo {
            name: p.port_name,
            vid: Some(info.vid),
            pid: Some(info.pid),
            serial_number: info.serial_number,
            is_usb: true,
        },
        _ => PortInfo::native(p.port_name),
    }
}

#[async_trait]
impl PortProvider for SerialPortProvider {
    fn list_ports(&self) -> Result<Vec<PortInfo>> {
        let ports = tokio_serial::available_ports()
            .map_err(|e| Error::Transport(format!("failed to enumerate ports: {e}")))?;
        let ports: Vec<PortInfo> = ports
            .into_iter()
            // On macOS only the cu.* callout devices open without waiting
            // for carrier detect.
            .filter(|_p| {
                #[cfg(target_os = "macos")]
                {
                    !_p.port_name.starts_with("/dev/tty.")
                }
                #[cfg(not(target_os = "macos"))]
                {
                    true
                }
            })
            .map(port_info)
            .collect();
        tracing::debug!(count = ports.len(), "Enumerated serial ports");
        Ok(ports)
    }

    async fn open(&self, name: &str, baud_rate: u32) -> Result<Box<dyn Transport>> {
        let config = SerialConfig {
            baud_rate,
            settle_delay: self.settle_delay,
            ..Default::default()
        };
        let transport = SerialTransport::open_with_config(name, config).await?;
        Ok(Box::new(transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_serial::SerialPortInfo;

    #[test]
    fn pci_port_is_not_usb() {
        let info = port_info(SerialPortInfo {
            port_name: "/dev/ttyS0".into(),
            port_type: SerialPortType::PciPort,
        });
        assert!(!info.is_usb);
        assert_eq!(info.vid, None);
    }

    #[test]
    fn default_settle_delay() {
        assert_eq!(SerialPortProvider::default().settle_delay, DEFAULT_SETTLE_DELAY);
    }
}
