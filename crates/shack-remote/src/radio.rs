//! Transceiver operations over CAT.
//!
//! Keyer commands are fire-and-forget: the radio does not answer them, so
//! only the write is checked.

use std::time::Duration;

use shack_core::{Error, Result, Role};

use crate::cat::{self, DecodeResult, VARIABLE_SLOT};
use crate::registry::RemoteRegistry;

impl RemoteRegistry {
    /// Query the radio's identification string.
    pub async fn identify_radio(&self) -> Result<String> {
        let query = cat::identify();
        let mut reply = vec![0u8; cat::identify_reply(&self.config().radio_id).len()];
        self.transact(Role::Radio, &query, &mut reply, Duration::ZERO).await?;
        match cat::decode_response(&reply) {
            DecodeResult::Response { prefix, data, .. } if prefix == cat::ID => Ok(data),
            DecodeResult::Error(_) => Err(Error::Protocol("radio rejected ID query".into())),
            _ => Err(Error::Protocol(format!(
                "unexpected identification reply {:?}",
                String::from_utf8_lossy(&reply)
            ))),
        }
    }

    /// Store `text` in keyer memory `slot` (1-5).
    pub async fn load_keyer_memory(&self, slot: u8, text: &str) -> Result<()> {
        let command = cat::load_memory(slot, text)?;
        self.write_radio(&command).await?;
        tracing::debug!(slot, "Keyer memory loaded");
        Ok(())
    }

    /// Load keyer memories 1 through `texts.len()` in order.
    pub async fn load_keyer_memories(&self, texts: &[&str]) -> Result<()> {
        for (i, text) in texts.iter().enumerate() {
            let slot = u8::try_from(i + 1)
                .map_err(|_| Error::InvalidParameter("too many keyer memories".into()))?;
            self.load_keyer_memory(slot, text).await?;
        }
        Ok(())
    }

    /// Play keyer memory `slot` (1-10).
    pub async fn play_keyer_memory(&self, slot: u8) -> Result<()> {
        let command = cat::play_memory(slot)?;
        self.write_radio(&command).await?;
        tracing::debug!(slot, "Keyer memory played");
        Ok(())
    }

    /// Send a one-off message through the variable memory: load it, then
    /// play it.
    pub async fn send_keyer_text(&self, text: &str) -> Result<()> {
        self.load_keyer_memory(VARIABLE_SLOT, text).await?;
        self.play_keyer_memory(VARIABLE_SLOT).await
    }

    async fn write_radio(&self, command: &[u8]) -> Result<()> {
        let written = self.write_remote(Role::Radio, command).await?;
        if written != command.len() {
            return Err(Error::ShortWrite {
                expected: command.len(),
                actual: written,
            });
        }
        Ok(())
    }
}
