//! Simulated USB serial bench.
//!
//! [`SimBench`] stands in for the operating system's serial ports. Tests
//! plug simulated devices into named ports, unplug them, power them off,
//! or mark ports busy at any point, and the registry under test sees the
//! same [`PortProvider`] surface real hardware presents.
//!
//! Each `send()` is handled as one unit by the device on the port, like a
//! board whose receive buffer flushes on an inter-byte timeout: a complete
//! valid frame gets an answer, anything else is dropped.
//!
//! # Example
//!
//! ```
//! use shack_test_harness::{SimBench, SimDevice};
//!
//! let bench = SimBench::new();
//! bench.plug("/dev/ttyUSB0", SimDevice::vfo());
//! bench.plug("/dev/ttyUSB1", SimDevice::cw_keyer());
//! bench.plug("/dev/ttyUSB2", SimDevice::radio("0761"));
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use shack_core::{Error, PortInfo, PortProvider, Result, Transport};
use shack_remote::cat;
use shack_remote::commands::{CwCommand, Request, VfoCommand};
use shack_remote::frame::{ACK, CW_ADDRESS, FRAME_LEN, Frame, NACK, VFO_ADDRESS, encode_status_reply};

/// Vendor id simulated ports report.
pub const SIM_VID: u16 = 0x10c4;
/// Product id simulated ports report.
pub const SIM_PID: u16 = 0xea60;

/// A simulated frame-protocol board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimPeripheral {
    pub address: u8,
    /// Status byte returned by a band read.
    pub band_status: u8,
    /// Answer every command with a nack.
    pub nack: bool,
    /// Corrupt the CRC of band-read replies.
    pub corrupt_crc: bool,
    pub split: Option<bool>,
    pub tx_word: Option<u32>,
    pub rx_word: Option<u32>,
    pub cw: Option<CwCommand>,
    /// Valid frames received.
    pub frames: usize,
}

impl SimPeripheral {
    fn new(address: u8) -> Self {
        SimPeripheral {
            address,
            band_status: 0,
            nack: false,
            corrupt_crc: false,
            split: None,
            tx_word: None,
            rx_word: None,
            cw: None,
            frames: 0,
        }
    }

    fn respond(&mut self, data: &[u8]) -> Vec<u8> {
        if data.len() != FRAME_LEN || data[0] != self.address {
            return Vec::new();
        }
        let Ok(frame) = Frame::decode(data) else {
            return vec![NACK];
        };
        let Ok(request) = Request::from_frame(&frame) else {
            return vec![NACK];
        };
        self.frames += 1;
        if self.nack {
            return vec![NACK];
        }
        match request {
            Request::Probe { .. } => vec![ACK],
            Request::Cw(cmd) => {
                self.cw = Some(cmd);
                vec![ACK]
            }
            Request::Vfo(VfoCommand::SetSplit(on)) => {
                self.split = Some(on);
                vec![ACK]
            }
            Request::Vfo(VfoCommand::SetTx(word)) => {
                self.tx_word = Some(word);
                vec![ACK]
            }
            Request::Vfo(VfoCommand::SetRx(word)) => {
                self.rx_word = Some(word);
                vec![ACK]
            }
            Request::Vfo(VfoCommand::ReadBand) => {
                let mut reply = encode_status_reply(self.band_status);
                if self.corrupt_crc {
                    reply[2] ^= 0x01;
                }
                reply.to_vec()
            }
        }
    }
}

/// A simulated CAT transceiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimRadio {
    pub id: String,
    /// Every non-ID command received, as text.
    pub commands: Vec<String>,
}

impl SimRadio {
    fn respond(&mut self, data: &[u8]) -> Vec<u8> {
        let Some(end) = data.iter().position(|&b| b == cat::TERMINATOR) else {
            return Vec::new();
        };
        let command = &data[..=end];
        if command == cat::identify().as_slice() {
            return cat::identify_reply(&self.id);
        }
        if command.starts_with(cat::KEYER_MEMORY.as_bytes()) || command.starts_with(cat::KEY.as_bytes()) {
            self.commands.push(String::from_utf8_lossy(command).into_owned());
            return Vec::new();
        }
        cat::ERROR_RESPONSE.to_vec()
    }
}

/// A device plugged into a simulated port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimDevice {
    Peripheral(SimPeripheral),
    Radio(SimRadio),
    /// A USB serial adapter with nothing answering behind it.
    Silent,
}

impl SimDevice {
    /// The VFO synthesizer board.
    pub fn vfo() -> Self {
        SimDevice::Peripheral(SimPeripheral::new(VFO_ADDRESS))
    }

    /// The CW tone generator board.
    pub fn cw_keyer() -> Self {
        SimDevice::Peripheral(SimPeripheral::new(CW_ADDRESS))
    }

    /// A transceiver answering `ID;` with `id`.
    pub fn radio(id: &str) -> Self {
        SimDevice::Radio(SimRadio {
            id: id.to_string(),
            commands: Vec::new(),
        })
    }

    fn respond(&mut self, data: &[u8]) -> Vec<u8> {
        match self {
            SimDevice::Peripheral(p) => p.respond(data),
            SimDevice::Radio(r) => r.respond(data),
            SimDevice::Silent => Vec::new(),
        }
    }
}

#[derive(Debug)]
struct SimPort {
    info: PortInfo,
    device: SimDevice,
    powered: bool,
    busy: bool,
    open: bool,
    /// Changes on every plug so stale handles from an earlier plug-in fail.
    generation: u64,
    opens: usize,
    sent: Vec<Vec<u8>>,
}

#[derive(Debug, Default)]
struct BenchState {
    ports: BTreeMap<String, SimPort>,
    native: Vec<String>,
    next_generation: u64,
}

/// A bench of simulated USB serial devices.
///
/// Cloning shares the bench, so a test can keep a handle for plugging and
/// inspecting devices after boxing another clone as the registry's
/// [`PortProvider`].
#[derive(Debug, Clone, Default)]
pub struct SimBench {
    state: Arc<Mutex<BenchState>>,
}

impl SimBench {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BenchState> {
        // A panic in another test thread must not cascade here.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Plug `device` into a USB port called `name`, replacing whatever was
    /// there.
    pub fn plug(&self, name: &str, device: SimDevice) {
        let mut state = self.lock();
        state.next_generation += 1;
        let generation = state.next_generation;
        let info = PortInfo::usb(name, SIM_VID, SIM_PID)
            .with_serial_number(format!("SIM{generation:04}"));
        state.ports.insert(
            name.to_string(),
            SimPort {
                info,
                device,
                powered: true,
                busy: false,
                open: false,
                generation,
                opens: 0,
                sent: Vec::new(),
            },
        );
    }

    /// Add a non-USB port (onboard UART) that discovery must ignore.
    pub fn add_native(&self, name: &str) {
        self.lock().native.push(name.to_string());
    }

    /// Unplug the device on `name`. Open handles fail from now on.
    pub fn unplug(&self, name: &str) {
        self.lock().ports.remove(name);
    }

    /// Power a device on or off. An unpowered device never answers.
    pub fn set_powered(&self, name: &str, powered: bool) {
        if let Some(port) = self.lock().ports.get_mut(name) {
            port.powered = powered;
        }
    }

    /// Mark a port as held by another process.
    pub fn set_busy(&self, name: &str, busy: bool) {
        if let Some(port) = self.lock().ports.get_mut(name) {
            port.busy = busy;
        }
    }

    /// Set the status byte a VFO board returns from a band read.
    pub fn set_band_status(&self, name: &str, status: u8) {
        self.with_peripheral(name, |p| p.band_status = status);
    }

    /// Make a board nack everything.
    pub fn set_nack(&self, name: &str, nack: bool) {
        self.with_peripheral(name, |p| p.nack = nack);
    }

    /// Make a board corrupt the CRC of its band-read replies.
    pub fn set_corrupt_crc(&self, name: &str, corrupt: bool) {
        self.with_peripheral(name, |p| p.corrupt_crc = corrupt);
    }

    fn with_peripheral(&self, name: &str, f: impl FnOnce(&mut SimPeripheral)) {
        if let Some(SimPort {
            device: SimDevice::Peripheral(p),
            ..
        }) = self.lock().ports.get_mut(name)
        {
            f(p);
        }
    }

    /// Snapshot of the device on `name`.
    pub fn device(&self, name: &str) -> Option<SimDevice> {
        self.lock().ports.get(name).map(|p| p.device.clone())
    }

    /// Snapshot of the board on `name`, if it is one.
    pub fn peripheral(&self, name: &str) -> Option<SimPeripheral> {
        match self.device(name)? {
            SimDevice::Peripheral(p) => Some(p),
            _ => None,
        }
    }

    /// Snapshot of the radio on `name`, if it is one.
    pub fn radio(&self, name: &str) -> Option<SimRadio> {
        match self.device(name)? {
            SimDevice::Radio(r) => Some(r),
            _ => None,
        }
    }

    /// Every byte string sent to `name`, one entry per `send()`.
    pub fn sent(&self, name: &str) -> Vec<Vec<u8>> {
        self.lock()
            .ports
            .get(name)
            .map(|p| p.sent.clone())
            .unwrap_or_default()
    }

    /// How many times `name` has been opened.
    pub fn open_count(&self, name: &str) -> usize {
        self.lock().ports.get(name).map_or(0, |p| p.opens)
    }

    /// Whether `name` is currently held open.
    pub fn is_open(&self, name: &str) -> bool {
        self.lock().ports.get(name).is_some_and(|p| p.open)
    }
}

#[async_trait]
impl PortProvider for SimBench {
    fn list_ports(&self) -> Result<Vec<PortInfo>> {
        let state = self.lock();
        let mut ports: Vec<PortInfo> = state.ports.values().map(|p| p.info.clone()).collect();
        ports.extend(state.native.iter().map(|n| PortInfo::native(n.as_str())));
        Ok(ports)
    }

    async fn open(&self, name: &str, _baud_rate: u32) -> Result<Box<dyn Transport>> {
        let mut state = self.lock();
        let Some(port) = state.ports.get_mut(name) else {
            return Err(Error::Transport(format!("no such port {name}")));
        };
        if port.busy || port.open {
            return Err(Error::PortBusy(name.to_string()));
        }
        port.open = true;
        port.opens += 1;
        tracing::trace!(port = %name, generation = port.generation, "Simulated port opened");
        Ok(Box::new(SimTransport {
            state: Arc::clone(&self.state),
            name: name.to_string(),
            generation: port.generation,
            pending: VecDeque::new(),
            connected: true,
        }))
    }
}

/// A handle on one open simulated port.
struct SimTransport {
    state: Arc<Mutex<BenchState>>,
    name: String,
    generation: u64,
    pending: VecDeque<u8>,
    connected: bool,
}

impl SimTransport {
    fn with_port<T>(&self, f: impl FnOnce(&mut SimPort) -> T) -> Result<T> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match state.ports.get_mut(&self.name) {
            Some(port) if port.generation == self.generation => Ok(f(port)),
            _ => Err(Error::ConnectionLost),
        }
    }
}

#[async_trait]
impl Transport for SimTransport {
    async fn send(&mut self, data: &[u8]) -> Result<usize> {
        let reply = self.with_port(|port| {
            port.sent.push(data.to_vec());
            if port.powered {
                port.device.respond(data)
            } else {
                Vec::new()
            }
        })?;
        self.pending.extend(reply);
        Ok(data.len())
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        self.with_port(|_| ())?;
        if self.pending.is_empty() {
            return Err(Error::Timeout);
        }
        let n = self.pending.len().min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        if !self.connected {
            return Ok(());
        }
        // The port may already be gone; closing a dead handle is fine.
        let _ = self.with_port(|port| port.open = false);
        self.connected = false;
        self.pending.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

impl Drop for SimTransport {
    fn drop(&mut self) {
        if self.connected {
            let _ = self.with_port(|port| port.open = false);
        }
    }
}
