//! CW tone generator operations.

use std::time::Duration;

use shack_core::Result;

use crate::commands::{CwCommand, CwMode, Request};
use crate::frame::check_ack;
use crate::registry::RemoteRegistry;

impl RemoteRegistry {
    /// Configure the CW generator: mode, sidetone in hertz, volume, and
    /// speed in words per minute.
    pub async fn send_cw(&self, mode: CwMode, tone_hz: u16, volume: u8, wpm: u32) -> Result<()> {
        let command = CwCommand::new(mode, tone_hz, volume, wpm)?;
        self.send_cw_command(command).await
    }

    /// Send a prepared CW command and wait for its ack.
    pub async fn send_cw_command(&self, command: CwCommand) -> Result<()> {
        let reply = self.request(&Request::Cw(command), Duration::ZERO).await?;
        check_ack(&reply)?;
        tracing::debug!(
            mode = ?command.mode,
            tone_hz = command.tone_hz,
            volume = command.volume,
            dit_ms = command.dit_ms,
            "CW generator updated"
        );
        Ok(())
    }
}
