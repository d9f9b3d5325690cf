//! VFO synthesizer operations.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use shack_core::{Error, Result};

use crate::band::{BandStatus, VfoPlan};
use crate::commands::{Request, VfoCommand};
use crate::frame::{check_ack, decode_status_reply};
use crate::registry::RemoteRegistry;

/// Which synthesizer output a frequency is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VfoChannel {
    Tx,
    Rx,
}

impl fmt::Display for VfoChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VfoChannel::Tx => write!(f, "tx"),
            VfoChannel::Rx => write!(f, "rx"),
        }
    }
}

impl FromStr for VfoChannel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tx" => Ok(VfoChannel::Tx),
            "rx" => Ok(VfoChannel::Rx),
            _ => Err(Error::InvalidParameter(format!("unknown VFO channel {s:?}"))),
        }
    }
}

impl RemoteRegistry {
    /// Turn split operation on or off.
    pub async fn set_split(&self, split: bool) -> Result<()> {
        self.vfo_command(VfoCommand::SetSplit(split)).await
    }

    /// Load a raw DDS tuning word into the transmit or receive channel.
    pub async fn set_frequency(&self, channel: VfoChannel, word: u32) -> Result<()> {
        let cmd = match channel {
            VfoChannel::Tx => VfoCommand::SetTx(word),
            VfoChannel::Rx => VfoCommand::SetRx(word),
        };
        self.vfo_command(cmd).await
    }

    /// Tune a channel to `freq_mhz` on `band`, converting through the band's
    /// frequency plan.
    pub async fn set_frequency_mhz(&self, channel: VfoChannel, band: &str, freq_mhz: f64) -> Result<u32> {
        let plan = VfoPlan::for_label(band)
            .ok_or_else(|| Error::InvalidParameter(format!("no frequency plan for band {band:?}")))?;
        let word = plan.tuning_word(freq_mhz)?;
        self.set_frequency(channel, word).await?;
        tracing::debug!(channel = %channel, band = plan.label, freq_mhz, word, "VFO tuned");
        Ok(word)
    }

    /// Read the band switch and the transmit flag.
    pub async fn read_band(&self) -> Result<BandStatus> {
        let pause = self.config().band_read_delay;
        let reply = self.request(&Request::Vfo(VfoCommand::ReadBand), pause).await?;
        let status = BandStatus(decode_status_reply(&reply)?);
        tracing::trace!(status = %status, "Band read");
        Ok(status)
    }

    async fn vfo_command(&self, cmd: VfoCommand) -> Result<()> {
        let reply = self.request(&Request::Vfo(cmd), Duration::ZERO).await?;
        check_ack(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_parse() {
        assert_eq!("TX".parse::<VfoChannel>().unwrap(), VfoChannel::Tx);
        assert_eq!("rx".parse::<VfoChannel>().unwrap(), VfoChannel::Rx);
        assert!("both".parse::<VfoChannel>().is_err());
    }
}
