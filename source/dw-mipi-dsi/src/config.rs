//! Host configuration.
use serde::{Deserialize, Serialize};

use crate::{
    error::InvalidConfig,
    poll::{DEFAULT_MAX_RETRIES, DEFAULT_POLL_INTERVAL_US},
};

/// Settings for a [`DsiHost`](crate::DsiHost).
///
/// Every field has a default, so an empty table deserializes to
/// [`DsiConfig::new()`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DsiConfig {
    /// Virtual channel that [`DsiHost::send`](crate::DsiHost::send) addresses.
    #[serde(default = "DsiConfig::default_virtual_channel")]
    pub virtual_channel: u8,
    /// Depth of the generic write payload FIFO, in bytes. Long writes larger
    /// than this are rejected.
    #[serde(default = "DsiConfig::default_payload_fifo_depth")]
    pub payload_fifo_depth: usize,
    #[serde(default)]
    pub poll: PollSettings,
}

/// How long and how often status registers are polled.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollSettings {
    /// Status reads before a wait gives up.
    #[serde(default = "PollSettings::default_max_retries")]
    pub max_retries: u32,
    /// Sleep between two status reads, in microseconds.
    #[serde(default = "PollSettings::default_interval_us")]
    pub interval_us: u32,
}

// === impl DsiConfig ===

impl DsiConfig {
    pub const DEFAULT_VIRTUAL_CHANNEL: u8 = 0;
    pub const DEFAULT_PAYLOAD_FIFO_DEPTH: usize = 200;

    const fn default_virtual_channel() -> u8 {
        Self::DEFAULT_VIRTUAL_CHANNEL
    }
    const fn default_payload_fifo_depth() -> usize {
        Self::DEFAULT_PAYLOAD_FIFO_DEPTH
    }

    pub const fn new() -> Self {
        Self {
            virtual_channel: Self::DEFAULT_VIRTUAL_CHANNEL,
            payload_fifo_depth: Self::DEFAULT_PAYLOAD_FIFO_DEPTH,
            poll: PollSettings::new(),
        }
    }

    /// Checks that the settings describe a usable host.
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.virtual_channel > 3 {
            return Err(InvalidConfig::VirtualChannel(self.virtual_channel));
        }
        if self.payload_fifo_depth == 0 {
            return Err(InvalidConfig::ZeroFifoDepth);
        }
        if self.poll.max_retries == 0 {
            return Err(InvalidConfig::ZeroRetries);
        }
        Ok(())
    }
}

impl Default for DsiConfig {
    fn default() -> Self {
        Self::new()
    }
}

// === impl PollSettings ===

impl PollSettings {
    const fn default_max_retries() -> u32 {
        DEFAULT_MAX_RETRIES
    }
    const fn default_interval_us() -> u32 {
        DEFAULT_POLL_INTERVAL_US
    }

    pub const fn new() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            interval_us: DEFAULT_POLL_INTERVAL_US,
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::new()
    }
}
