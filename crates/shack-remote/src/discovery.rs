//! Port discovery and liveness probes.
//!
//! A discovery pass enumerates the USB serial ports, opens each candidate,
//! and asks what is on the other end. The radio answers a CAT `ID;` query;
//! the VFO and CW boards answer a probe frame at their own address with a
//! single ack byte. Anything that stays silent past the read timeout is
//! treated as absent.

use std::collections::HashSet;
use std::time::Duration;

use shack_core::{Error, PortInfo, PortProvider, Result, Role, Transport, receive_exact};

use crate::cat;
use crate::frame::{ACK_LEN, FRAME_LEN, Frame, check_ack};

/// USB vendor ids of the station's serial bridges (Silicon Labs CP210x,
/// Arduino).
pub const DEFAULT_VENDOR_IDS: [u16; 2] = [0x10c4, 0x2341];

/// How hard to try a liveness probe before declaring a device absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    /// Probe attempts per address.
    pub attempts: u32,
    /// Pause between failed attempts.
    pub retry_delay: Duration,
    /// Read timeout for each reply.
    pub timeout: Duration,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        ProbePolicy {
            attempts: 1,
            retry_delay: Duration::from_millis(500),
            timeout: Duration::from_millis(150),
        }
    }
}

/// Enumerate candidate ports.
///
/// A port is a candidate when the OS reports it as USB-attached and, if
/// `vendor_filter` is non-empty, its vendor id is in the filter.
///
/// Fails with [`Error::NoPorts`] when the OS lists no ports at all and
/// [`Error::NoPortMatch`] when ports exist but none qualify.
pub fn find_ports(provider: &dyn PortProvider, vendor_filter: &[u16]) -> Result<Vec<PortInfo>> {
    let ports = provider.list_ports()?;
    if ports.is_empty() {
        return Err(Error::NoPorts);
    }
    let total = ports.len();
    let candidates: Vec<PortInfo> = ports
        .into_iter()
        .filter(|p| p.is_usb)
        .filter(|p| {
            vendor_filter.is_empty() || p.vid.is_some_and(|vid| vendor_filter.contains(&vid))
        })
        .collect();
    tracing::debug!(total, candidates = candidates.len(), "Filtered serial ports");
    if candidates.is_empty() {
        return Err(Error::NoPortMatch);
    }
    Ok(candidates)
}

/// Send one liveness probe to `address` and check for an ack.
pub async fn test_remote(port: &mut dyn Transport, address: u8, timeout: Duration) -> Result<()> {
    let frame = Frame::probe(address).encode();
    let written = port.send(&frame).await?;
    if written != FRAME_LEN {
        return Err(Error::ShortWrite {
            expected: FRAME_LEN,
            actual: written,
        });
    }
    let mut reply = [0u8; ACK_LEN];
    let n = receive_exact(port, &mut reply, timeout).await?;
    check_ack(&reply[..n])
}

/// Probe `address` up to `policy.attempts` times.
pub async fn remote_up(port: &mut dyn Transport, address: u8, policy: &ProbePolicy) -> bool {
    let attempts = policy.attempts.max(1);
    for attempt in 1..=attempts {
        match test_remote(port, address, policy.timeout).await {
            Ok(()) => return true,
            Err(e) => {
                tracing::debug!(
                    address = format_args!("0x{:02X}", address),
                    attempt,
                    error = %e,
                    "Probe failed"
                );
            }
        }
        if attempt < attempts {
            tokio::time::sleep(policy.retry_delay).await;
        }
    }
    false
}

/// Ask the port for a CAT identification and compare it with `radio_id`.
///
/// `Ok(false)` means something answered but it is not our radio.
pub async fn test_radio(port: &mut dyn Transport, radio_id: &str, timeout: Duration) -> Result<bool> {
    let query = cat::identify();
    let written = port.send(&query).await?;
    if written != query.len() {
        return Err(Error::ShortWrite {
            expected: query.len(),
            actual: written,
        });
    }
    let expected = cat::identify_reply(radio_id);
    let mut reply = vec![0u8; expected.len()];
    let n = receive_exact(port, &mut reply, timeout).await?;
    if n != expected.len() {
        return Err(Error::ShortRead {
            expected: expected.len(),
            actual: n,
        });
    }
    Ok(cat::is_identify_reply(&reply, radio_id))
}

/// A device found by a discovery pass.
pub struct Found {
    pub role: Role,
    pub info: PortInfo,
    pub transport: Box<dyn Transport>,
}

impl std::fmt::Debug for Found {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Found")
            .field("role", &self.role)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Settings for one discovery pass.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig<'a> {
    pub baud_rate: u32,
    pub vendor_filter: &'a [u16],
    pub radio_id: &'a str,
    pub probe: ProbePolicy,
}

/// Identify what answers on one open port.
async fn identify_port(port: &mut dyn Transport, config: &DiscoveryConfig<'_>) -> Option<Role> {
    match test_radio(port, config.radio_id, config.probe.timeout).await {
        Ok(true) => return Some(Role::Radio),
        Ok(false) => tracing::debug!("Port answered ID with a different radio"),
        Err(e) => tracing::trace!(error = %e, "No radio on port"),
    }
    for role in [Role::Vfo, Role::Cw] {
        let Some(address) = role.address() else {
            continue;
        };
        if remote_up(port, address, &config.probe).await {
            return Some(role);
        }
    }
    None
}

/// Run one discovery pass.
///
/// Ports named in `skip` are in use by live roles and are left alone. Busy
/// ports are skipped. Each remaining candidate is opened and identified;
/// ports with nothing recognisable on them are closed again. A role may be
/// returned more than once if several ports answer for it; the caller
/// decides which to keep.
pub async fn discover(
    provider: &dyn PortProvider,
    config: &DiscoveryConfig<'_>,
    skip: &HashSet<String>,
) -> Result<Vec<Found>> {
    let candidates = find_ports(provider, config.vendor_filter)?;
    let mut found = Vec::new();

    for info in candidates {
        if skip.contains(&info.name) {
            tracing::trace!(port = %info.name, "Port held by a live remote");
            continue;
        }
        let mut transport = match provider.open(&info.name, config.baud_rate).await {
            Ok(t) => t,
            Err(Error::PortBusy(_)) => {
                tracing::warn!(port = %info.name, "Skipping busy port");
                continue;
            }
            Err(e) => {
                tracing::debug!(port = %info.name, error = %e, "Could not open port");
                continue;
            }
        };

        match identify_port(transport.as_mut(), config).await {
            Some(role) => {
                tracing::info!(
                    port = %info.name,
                    role = %role,
                    vid_pid = info.vid_pid().as_deref().unwrap_or("-"),
                    "Remote found"
                );
                found.push(Found {
                    role,
                    info,
                    transport,
                });
            }
            None => {
                tracing::debug!(port = %info.name, "Nothing recognised on port");
                if let Err(e) = transport.close().await {
                    tracing::debug!(port = %info.name, error = %e, "Close failed");
                }
            }
        }
    }
    Ok(found)
}
