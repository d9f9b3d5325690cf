//! Serial port transport for peripheral communication.
//!
//! This module provides [`SerialTransport`], which implements the [`Transport`]
//! trait for USB virtual COM ports and physical RS-232 serial connections.
//!
//! Every device on the station bench speaks 8N1. The microcontroller boards
//! run at 38400 baud and reset when the port opens, so a short settle delay
//! follows each open before the first frame is sent.

use async_trait::async_trait;
use shack_core::error::{Error, Result};
use shack_core::transport::Transport;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};

/// Default baud rate of the station peripherals.
pub const DEFAULT_BAUD_RATE: u32 = 38_400;

/// Default pause between opening a port and first use.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(10);

/// Serial port configuration.
///
/// Defaults match the station peripherals:
/// - 38400 baud
/// - 8 data bits
/// - 1 stop bit
/// - No parity
/// - 10 ms settle delay
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate (e.g., 9600, 19200, 38400, 115200)
    pub baud_rate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Number of stop bits (typically 1)
    pub stop_bits: StopBits,
    /// Parity checking (typically None)
    pub parity: Parity,
    /// Pause after opening before the port is handed out.
    pub settle_delay: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Seven,
    Eight,
}

impl From<DataBits> for tokio_serial::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Seven => tokio_serial::DataBits::Seven,
            DataBits::Eight => tokio_serial::DataBits::Eight,
        }
    }
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

/// Map an open failure to the shack error taxonomy.
///
/// A port held by another process is [`Error::PortBusy`] so discovery can
/// move on to the next candidate; everything else is a transport failure.
fn open_error(port: &str, e: &tokio_serial::Error) -> Error {
    let busy = matches!(
        e.kind,
        tokio_serial::ErrorKind::Io(std::io::ErrorKind::ResourceBusy)
    ) || e.description.to_ascii_lowercase().contains("busy");
    if busy {
        Error::PortBusy(port.to_string())
    } else {
        Error::Transport(format!("failed to open serial port {port}: {e}"))
    }
}

fn io_error(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::NotConnected => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}

/// Serial port transport for station peripherals.
///
/// Implements the [`Transport`] trait for USB virtual COM ports and
/// physical RS-232 connections.
pub struct SerialTransport {
    /// The underlying serial port stream
    port: Option<SerialStream>,
    /// Port name for logging/debugging
    port_name: String,
}

impl SerialTransport {
    /// Open a serial port at `baud_rate` with 8N1 framing and the default
    /// settle delay.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use shack_transport::SerialTransport;
    /// # async fn example() -> shack_core::Result<()> {
    /// let transport = SerialTransport::open("/dev/ttyUSB0", 38400).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open(port: &str, baud_rate: u32) -> Result<Self> {
        let config = SerialConfig {
            baud_rate,
            ..Default::default()
        };
        Self::open_with_config(port, config).await
    }

    /// Open a serial port with full configuration control.
    pub async fn open_with_config(port: &str, config: SerialConfig) -> Result<Self> {
        tracing::debug!(
            port = %port,
            baud_rate = config.baud_rate,
            data_bits = ?config.data_bits,
            stop_bits = ?config.stop_bits,
            parity = ?config.parity,
            "Opening serial port"
        );

        let mut serial_stream = tokio_serial::new(port, config.baud_rate)
            .data_bits(config.data_bits.into())
            .stop_bits(config.stop_bits.into())
            .parity(config.parity.into())
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| {
                let err = open_error(port, &e);
                match &err {
                    Error::PortBusy(_) => tracing::warn!(port = %port, "Serial port busy"),
                    _ => tracing::error!(port = %port, error = %e, "Failed to open serial port"),
                }
                err
            })?;

        // Keep the boards out of their bootloader: DTR/RTS asserted on open
        // holds some USB bridges in reset.
        if let Err(e) = serial_stream.write_data_terminal_ready(false) {
            tracing::warn!(port = %port, error = %e, "Failed to de-assert DTR");
        }
        if let Err(e) = serial_stream.write_request_to_send(false) {
            tracing::warn!(port = %port, error = %e, "Failed to de-assert RTS");
        }

        if !config.settle_delay.is_zero() {
            tokio::time::sleep(config.settle_delay).await;
        }
        // Drop whatever the device printed while it booted.
        if let Err(e) = serial_stream.clear(ClearBuffer::Input) {
            tracing::warn!(port = %port, error = %e, "Failed to clear input buffer");
        }

        tracing::debug!(port = %port, baud_rate = config.baud_rate, "Serial port opened");

        Ok(Self {
            port: Some(serial_stream),
            port_name: port.to_string(),
        })
    }

    /// Get the name of the serial port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<usize> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(
            port = %self.port_name,
            bytes = data.len(),
            data = ?data,
            "Sending data"
        );

        port.write_all(data).await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "Failed to send data");
            io_error(e)
        })?;

        port.flush().await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "Failed to flush serial port");
            io_error(e)
        })?;

        Ok(data.len())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        match tokio::time::timeout(timeout, port.read(buf)).await {
            Ok(Ok(0)) => {
                // EOF on a tty means the device went away.
                tracing::debug!(port = %self.port_name, "Serial port returned EOF");
                Err(Error::ConnectionLost)
            }
            Ok(Ok(n)) => {
                tracing::trace!(
                    port = %self.port_name,
                    bytes = n,
                    data = ?&buf[..n],
                    "Received data"
                );
                Ok(n)
            }
            Ok(Err(e)) => {
                tracing::error!(port = %self.port_name, error = %e, "Failed to receive data");
                Err(io_error(e))
            }
            Err(_) => {
                tracing::trace!(
                    port = %self.port_name,
                    timeout_ms = timeout.as_millis(),
                    "Timeout waiting for data"
                );
                Err(Error::Timeout)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            if let Err(e) = port.flush().await {
                tracing::warn!(
                    port = %self.port_name,
                    error = %e,
                    "Failed to flush before closing (continuing anyway)"
                );
            }
            tracing::debug!(port = %self.port_name, "Serial port closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.port.is_some() {
            tracing::debug!(port = %self.port_name, "SerialTransport dropped, closing port");
        }
    }
}
