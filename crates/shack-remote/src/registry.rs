//! The remote registry: one entry per role, one lock over all of them.
//!
//! Each role moves through three states:
//!
//! ```text
//! Unknown --build--> Down --discovery--> Up
//!                     ^                   |
//!                     +---- I/O error ----+
//! ```
//!
//! Any caller that finds its role down triggers a full discovery pass while
//! holding the registry lock. Discovery enumerates every port, so it must
//! not race with I/O on another role; the lock is therefore global rather
//! than per role.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

use shack_core::{Error, PortInfo, PortProvider, Result, Role, Transport, receive_exact};
use tokio::sync::Mutex;

use crate::commands::Request;
use crate::discovery::{self, DiscoveryConfig, ProbePolicy};

/// Registry settings. Built by [`RegistryBuilder`](crate::RegistryBuilder).
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub baud_rate: u32,
    /// Read timeout for every reply.
    pub read_timeout: Duration,
    pub probe_attempts: u32,
    pub probe_retry_delay: Duration,
    /// USB vendor ids to consider; empty accepts any USB port.
    pub vendor_filter: Vec<u16>,
    /// Identification string the radio answers `ID;` with.
    pub radio_id: String,
    /// Pause between sending a band read and reading its reply.
    pub band_read_delay: Duration,
}

impl RegistryConfig {
    pub(crate) fn probe_policy(&self) -> ProbePolicy {
        ProbePolicy {
            attempts: self.probe_attempts,
            retry_delay: self.probe_retry_delay,
            timeout: self.read_timeout,
        }
    }
}

/// One peripheral role and the port it lives on.
///
/// `up` is only ever true while a port is attached.
struct Remote {
    role: Role,
    port: Option<Box<dyn Transport>>,
    info: Option<PortInfo>,
    up: bool,
}

impl Remote {
    fn new(role: Role) -> Self {
        Remote {
            role,
            port: None,
            info: None,
            up: false,
        }
    }

    fn is_up(&self) -> bool {
        self.up && self.port.is_some()
    }

    fn attach(&mut self, info: PortInfo, transport: Box<dyn Transport>) {
        self.port = Some(transport);
        self.info = Some(info);
        self.up = true;
    }

    /// Mark down and close the port. The port description is kept for
    /// display.
    async fn detach(&mut self) {
        self.up = false;
        if let Some(mut port) = self.port.take() {
            if let Err(e) = port.close().await {
                tracing::debug!(role = %self.role, error = %e, "Close failed");
            }
        }
    }

    fn port_name(&self) -> Option<&str> {
        self.info.as_ref().map(|i| i.name.as_str())
    }

    fn status(&self) -> RemoteStatus {
        RemoteStatus {
            role: self.role,
            address: self.role.address(),
            port_name: self.port_name().map(str::to_string),
            vid_pid: self.info.as_ref().and_then(PortInfo::vid_pid),
            serial_number: self.info.as_ref().and_then(|i| i.serial_number.clone()),
            port_open: self.port.is_some(),
            up: self.is_up(),
        }
    }
}

/// Snapshot of one role for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStatus {
    pub role: Role,
    pub address: Option<u8>,
    /// Last port the role was found on.
    pub port_name: Option<String>,
    pub vid_pid: Option<String>,
    pub serial_number: Option<String>,
    /// Whether a port handle is currently held.
    pub port_open: bool,
    pub up: bool,
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<6}", self.role)?;
        match self.address {
            Some(a) => write!(f, " 0x{a:02X}")?,
            None => write!(f, "  -  ")?,
        }
        write!(f, " {:<4}", if self.up { "up" } else { "down" })?;
        if let Some(name) = &self.port_name {
            write!(f, " {name}")?;
        }
        if let Some(vp) = &self.vid_pid {
            write!(f, " [{vp}]")?;
        }
        if let Some(sn) = &self.serial_number {
            write!(f, " sn={sn}")?;
        }
        Ok(())
    }
}

/// Registry of station peripherals.
///
/// Owns the port provider and every open port. All reads, writes, and
/// discovery passes are serialized by one lock.
pub struct RemoteRegistry {
    provider: Box<dyn PortProvider>,
    config: RegistryConfig,
    remotes: Mutex<HashMap<Role, Remote>>,
}

impl RemoteRegistry {
    /// Create a registry with a Down placeholder for every role.
    pub fn new(provider: Box<dyn PortProvider>, config: RegistryConfig) -> Self {
        let remotes = Role::ALL.iter().map(|&r| (r, Remote::new(r))).collect();
        RemoteRegistry {
            provider,
            config,
            remotes: Mutex::new(remotes),
        }
    }

    /// The registry's settings.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Run a discovery pass now.
    ///
    /// Roles already up keep their ports. Returns the discovery error
    /// ([`Error::NoPorts`], [`Error::NoPortMatch`]) if enumeration fails.
    pub async fn classify(&self) -> Result<()> {
        let mut remotes = self.remotes.lock().await;
        self.rediscover(&mut remotes).await
    }

    /// Whether `role` is currently up. Does not trigger discovery.
    pub async fn is_up(&self, role: Role) -> bool {
        let remotes = self.remotes.lock().await;
        remotes.get(&role).is_some_and(Remote::is_up)
    }

    /// Snapshot of every role, in discovery order.
    pub async fn status(&self) -> Vec<RemoteStatus> {
        let remotes = self.remotes.lock().await;
        Role::ALL
            .iter()
            .map(|role| match remotes.get(role) {
                Some(r) => r.status(),
                None => Remote::new(*role).status(),
            })
            .collect()
    }

    /// Close every port. Roles go down; a later call rediscovers them.
    pub async fn shutdown(&self) {
        let mut remotes = self.remotes.lock().await;
        for remote in remotes.values_mut() {
            remote.detach().await;
        }
        tracing::info!("Remote registry shut down");
    }

    /// Write `data` to `role`'s port.
    ///
    /// Rediscovers the role first if it is down. The byte count and any I/O
    /// error are returned as-is; an error takes the role down.
    pub async fn write_remote(&self, role: Role, data: &[u8]) -> Result<usize> {
        let mut remotes = self.remotes.lock().await;
        let port = self.ready_port(&mut remotes, role).await?;
        match port.send(data).await {
            Ok(n) => Ok(n),
            Err(e) => {
                self.take_down(&mut remotes, role, &e).await;
                Err(e)
            }
        }
    }

    /// Read into `buf` from `role`'s port, waiting up to the read timeout
    /// for the buffer to fill.
    ///
    /// Returns the number of bytes read, which may be short. An error takes
    /// the role down.
    pub async fn read_remote(&self, role: Role, buf: &mut [u8]) -> Result<usize> {
        let mut remotes = self.remotes.lock().await;
        let timeout = self.config.read_timeout;
        let port = self.ready_port(&mut remotes, role).await?;
        match receive_exact(port, buf, timeout).await {
            Ok(n) => Ok(n),
            Err(e) => {
                self.take_down(&mut remotes, role, &e).await;
                Err(e)
            }
        }
    }

    /// Write `request` and read exactly `reply.len()` bytes back, holding the
    /// lock across both so no other caller's frame lands in between.
    ///
    /// `pause` is slept between the write and the read. A short write, a
    /// short read, or an I/O error takes the role down, since the wire is
    /// no longer in frame sync.
    pub async fn transact(
        &self,
        role: Role,
        request: &[u8],
        reply: &mut [u8],
        pause: Duration,
    ) -> Result<()> {
        let mut remotes = self.remotes.lock().await;
        let timeout = self.config.read_timeout;
        let port = self.ready_port(&mut remotes, role).await?;

        let result: Result<()> = async {
            let written = port.send(request).await?;
            if written != request.len() {
                return Err(Error::ShortWrite {
                    expected: request.len(),
                    actual: written,
                });
            }
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
            let n = receive_exact(port, reply, timeout).await?;
            if n != reply.len() {
                return Err(Error::ShortRead {
                    expected: reply.len(),
                    actual: n,
                });
            }
            Ok(())
        }
        .await;

        if let Err(e) = &result {
            self.take_down(&mut remotes, role, e).await;
        }
        result
    }

    /// Send one frame request and return its raw reply, `reply_len()`
    /// bytes long. Reply validation is left to the caller.
    pub async fn request(&self, request: &Request, pause: Duration) -> Result<Vec<u8>> {
        let address = request.address();
        let role = Role::from_address(address).ok_or_else(|| {
            Error::InvalidParameter(format!("no role at address 0x{address:02X}"))
        })?;
        let frame = request.encode();
        tracing::trace!(role = %role, frame = ?frame, "Sending frame");
        let mut reply = vec![0u8; request.reply_len()];
        self.transact(role, &frame, &mut reply, pause).await?;
        tracing::trace!(role = %role, reply = ?reply, "Frame reply");
        Ok(reply)
    }

    /// Make sure `role` is up, rediscovering if needed, and hand out its
    /// port.
    async fn ready_port<'a>(
        &self,
        remotes: &'a mut HashMap<Role, Remote>,
        role: Role,
    ) -> Result<&'a mut dyn Transport> {
        let up = remotes.get(&role).is_some_and(Remote::is_up);
        if !up {
            tracing::debug!(role = %role, "Remote down, running discovery");
            self.rediscover(remotes).await?;
        }
        match remotes.get_mut(&role) {
            Some(remote) if remote.is_up() => match remote.port.as_deref_mut() {
                Some(port) => Ok(port),
                None => Err(Error::RemoteDown(role)),
            },
            _ => Err(Error::RemoteDown(role)),
        }
    }

    async fn take_down(&self, remotes: &mut HashMap<Role, Remote>, role: Role, cause: &Error) {
        if let Some(remote) = remotes.get_mut(&role) {
            tracing::info!(
                role = %role,
                port = remote.port_name().unwrap_or("-"),
                error = %cause,
                "Remote went down"
            );
            remote.detach().await;
        }
    }

    /// One discovery pass over all roles. Caller holds the lock.
    async fn rediscover(&self, remotes: &mut HashMap<Role, Remote>) -> Result<()> {
        for role in Role::ALL {
            remotes.entry(role).or_insert_with(|| Remote::new(role));
        }

        // An up role whose port no longer lists the same device holds a
        // stale handle.
        if let Ok(listed) = self.provider.list_ports() {
            for remote in remotes.values_mut() {
                if !remote.is_up() {
                    continue;
                }
                let Some(held) = remote.info.as_ref() else {
                    continue;
                };
                let same = listed.iter().any(|p| {
                    p.name == held.name
                        && p.vid == held.vid
                        && p.pid == held.pid
                        && p.serial_number == held.serial_number
                });
                if !same {
                    tracing::info!(
                        role = %remote.role,
                        port = %held.name,
                        "Device on port changed; remote down"
                    );
                    remote.detach().await;
                }
            }
        }

        // Release ports of down roles so they can be reopened and probed.
        let mut skip = HashSet::new();
        for remote in remotes.values_mut() {
            if remote.is_up() {
                if let Some(name) = remote.port_name() {
                    skip.insert(name.to_string());
                }
            } else {
                remote.detach().await;
            }
        }

        let config = DiscoveryConfig {
            baud_rate: self.config.baud_rate,
            vendor_filter: &self.config.vendor_filter,
            radio_id: &self.config.radio_id,
            probe: self.config.probe_policy(),
        };
        let found = discovery::discover(self.provider.as_ref(), &config, &skip).await?;

        for f in found {
            let Some(remote) = remotes.get_mut(&f.role) else {
                continue;
            };
            if remote.is_up() {
                tracing::warn!(
                    role = %f.role,
                    port = %f.info.name,
                    "Second device answered for role; closing it"
                );
                let mut extra = f.transport;
                if let Err(e) = extra.close().await {
                    tracing::debug!(port = %f.info.name, error = %e, "Close failed");
                }
                continue;
            }
            tracing::info!(role = %f.role, port = %f.info.name, "Remote up");
            remote.attach(f.info, f.transport);
        }

        for role in Role::ALL {
            if !remotes.get(&role).is_some_and(Remote::is_up) {
                tracing::debug!(role = %role, "Remote still down after discovery");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shack_test_harness::MockTransport;

    struct NoPorts;

    #[async_trait]
    impl PortProvider for NoPorts {
        fn list_ports(&self) -> Result<Vec<PortInfo>> {
            Ok(Vec::new())
        }

        async fn open(&self, _name: &str, _baud_rate: u32) -> Result<Box<dyn Transport>> {
            Err(Error::NotConnected)
        }
    }

    fn config() -> RegistryConfig {
        crate::RegistryBuilder::new()
            .read_timeout(Duration::from_millis(20))
            .config()
    }

    #[tokio::test]
    async fn remote_invariant_on_attach_and_detach() {
        let mut remote = Remote::new(Role::Vfo);
        assert!(!remote.is_up());
        remote.attach(
            PortInfo::usb("/dev/ttyUSB0", 0x10c4, 0xea60),
            Box::new(MockTransport::new()),
        );
        assert!(remote.is_up());
        assert!(remote.status().port_open);

        remote.detach().await;
        let status = remote.status();
        assert!(!status.up);
        assert!(!status.port_open);
        assert_eq!(status.port_name.as_deref(), Some("/dev/ttyUSB0"));
    }

    #[tokio::test]
    async fn new_registry_has_every_role_down() {
        let registry = RemoteRegistry::new(Box::new(NoPorts), config());
        let status = registry.status().await;
        assert_eq!(status.len(), 3);
        assert!(status.iter().all(|s| !s.up && !s.port_open));
    }

    #[tokio::test]
    async fn write_with_no_ports_reports_no_ports() {
        let registry = RemoteRegistry::new(Box::new(NoPorts), config());
        let result = registry.write_remote(Role::Cw, &[0x80]).await;
        assert!(matches!(result, Err(Error::NoPorts)));
    }

    #[test]
    fn status_display() {
        let status = RemoteStatus {
            role: Role::Vfo,
            address: Some(0x81),
            port_name: Some("/dev/ttyUSB1".into()),
            vid_pid: Some("10c4:ea60".into()),
            serial_number: None,
            port_open: true,
            up: true,
        };
        assert_eq!(status.to_string(), "vfo    0x81 up   /dev/ttyUSB1 [10c4:ea60]");
    }
}
