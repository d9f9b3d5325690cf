//! Serial port enumeration.
//!
//! Discovery treats the operating system's port list as a black box
//! returning [`PortInfo`] tuples. The [`PortProvider`] trait lets the
//! registry enumerate and open ports without knowing whether they are real
//! hardware or a simulated bench.

use async_trait::async_trait;
use std::fmt;

use crate::error::Result;
use crate::transport::Transport;

/// One serial port as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortInfo {
    /// OS device name, e.g. `/dev/ttyUSB0` or `COM3`.
    pub name: String,
    /// USB vendor id, when the port is USB-attached.
    pub vid: Option<u16>,
    /// USB product id.
    pub pid: Option<u16>,
    /// USB serial number string, if the device reports one.
    pub serial_number: Option<String>,
    /// Whether the OS reports the port as USB-attached.
    pub is_usb: bool,
}

impl PortInfo {
    /// A USB-attached port.
    pub fn usb(name: impl Into<String>, vid: u16, pid: u16) -> Self {
        PortInfo {
            name: name.into(),
            vid: Some(vid),
            pid: Some(pid),
            serial_number: None,
            is_usb: true,
        }
    }

    /// A non-USB port (onboard UART, Bluetooth, PCI).
    pub fn native(name: impl Into<String>) -> Self {
        PortInfo {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Attach a USB serial number.
    pub fn with_serial_number(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    /// Vendor and product id formatted as `vvvv:pppp` (lowercase hex).
    pub fn vid_pid(&self) -> Option<String> {
        match (self.vid, self.pid) {
            (Some(v), Some(p)) => Some(format!("{v:04x}:{p:04x}")),
            _ => None,
        }
    }
}

impl fmt::Display for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(vp) = self.vid_pid() {
            write!(f, " [{vp}]")?;
        }
        if let Some(sn) = &self.serial_number {
            write!(f, " sn={sn}")?;
        }
        Ok(())
    }
}

/// Source of serial ports.
///
/// [`list_ports`](PortProvider::list_ports) enumerates what is attached right
/// now; [`open`](PortProvider::open) opens one at a fixed 8N1 framing. Both
/// may be called many times as devices come and go.
#[async_trait]
pub trait PortProvider: Send + Sync {
    /// Enumerate the serial ports currently attached.
    fn list_ports(&self) -> Result<Vec<PortInfo>>;

    /// Open `name` at `baud_rate`, 8 data bits, no parity, 1 stop bit.
    ///
    /// Returns [`Error::PortBusy`](crate::Error::PortBusy) when another
    /// process holds the port.
    async fn open(&self, name: &str, baud_rate: u32) -> Result<Box<dyn Transport>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vid_pid_formatting() {
        let p = PortInfo::usb("/dev/ttyUSB0", 0x10c4, 0xea60);
        assert_eq!(p.vid_pid().as_deref(), Some("10c4:ea60"));
        assert!(p.is_usb);
    }

    #[test]
    fn native_port_has_no_ids() {
        let p = PortInfo::native("/dev/ttyS0");
        assert_eq!(p.vid_pid(), None);
        assert!(!p.is_usb);
    }

    #[test]
    fn display_includes_serial() {
        let p = PortInfo::usb("/dev/ttyACM0", 0x2341, 0x0043).with_serial_number("A1B2");
        assert_eq!(p.to_string(), "/dev/ttyACM0 [2341:0043] sn=A1B2");
    }
}
