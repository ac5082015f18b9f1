//! Bounded busy-polling of controller status.
use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::{
    config::PollSettings,
    error::Timeout,
    regs::{CmdPktStatus, Register, RegisterAccess},
};

/// Default number of status reads before a wait gives up.
pub const DEFAULT_MAX_RETRIES: u32 = 1000;

/// Default sleep between two status reads, in microseconds.
pub const DEFAULT_POLL_INTERVAL_US: u32 = 10;

/// The FIFO conditions the command engine waits on, all read from
/// `DSI_CMD_PKT_STATUS`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Wait {
    /// Room for another word in the write payload FIFO.
    PayloadWriteNotFull,
    /// Write payload FIFO drained.
    PayloadWriteEmpty,
    /// Read payload FIFO full.
    PayloadReadFull,
    /// At least one word in the read payload FIFO.
    PayloadReadNotEmpty,
    /// Room for another header in the command FIFO.
    CommandNotFull,
    /// Command FIFO drained.
    CommandEmpty,
}

/// Polls status registers with a fixed sleep between reads and a bounded
/// number of attempts.
#[derive(Debug)]
pub(crate) struct Poller<D> {
    delay: D,
    max_retries: u32,
    interval_us: u32,
}

// === impl Wait ===

impl Wait {
    /// Every wait, for callers that report or check the whole FIFO state.
    pub const ALL: [Wait; 6] = [
        Wait::PayloadWriteNotFull,
        Wait::PayloadWriteEmpty,
        Wait::PayloadReadFull,
        Wait::PayloadReadNotEmpty,
        Wait::CommandNotFull,
        Wait::CommandEmpty,
    ];

    /// Returns `true` if `status` satisfies this wait.
    pub fn is_met(self, status: CmdPktStatus) -> bool {
        match self {
            Wait::PayloadWriteNotFull => !status.get(CmdPktStatus::GEN_PLD_W_FULL),
            Wait::PayloadWriteEmpty => status.get(CmdPktStatus::GEN_PLD_W_EMPTY),
            Wait::PayloadReadFull => status.get(CmdPktStatus::GEN_PLD_R_FULL),
            Wait::PayloadReadNotEmpty => !status.get(CmdPktStatus::GEN_PLD_R_EMPTY),
            Wait::CommandNotFull => !status.get(CmdPktStatus::GEN_CMD_FULL),
            Wait::CommandEmpty => status.get(CmdPktStatus::GEN_CMD_EMPTY),
        }
    }
}

impl fmt::Display for Wait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Wait::PayloadWriteNotFull => "payload write FIFO not full",
            Wait::PayloadWriteEmpty => "payload write FIFO empty",
            Wait::PayloadReadFull => "payload read FIFO full",
            Wait::PayloadReadNotEmpty => "payload read FIFO not empty",
            Wait::CommandNotFull => "command FIFO not full",
            Wait::CommandEmpty => "command FIFO empty",
        })
    }
}

// === impl Poller ===

impl<D: DelayNs> Poller<D> {
    pub(crate) fn new(delay: D, settings: &PollSettings) -> Self {
        Self {
            delay,
            max_retries: settings.max_retries,
            interval_us: settings.interval_us,
        }
    }

    /// Waits for a FIFO condition.
    pub(crate) fn wait_for<A>(&mut self, regs: &A, wait: Wait) -> Result<(), Timeout>
    where
        A: RegisterAccess + ?Sized,
    {
        self.poll_until(regs, Timeout::Fifo(wait), |status: CmdPktStatus| {
            wait.is_met(status)
        })
    }

    /// Reads `R` until `done` accepts it, sleeping between reads. Fails with
    /// `timeout` once the retry budget is spent.
    pub(crate) fn poll_until<A, R>(
        &mut self,
        regs: &A,
        timeout: Timeout,
        mut done: impl FnMut(R) -> bool,
    ) -> Result<(), Timeout>
    where
        A: RegisterAccess + ?Sized,
        R: Register,
    {
        for attempt in 0..self.max_retries {
            if done(regs.read::<R>()) {
                if attempt > 0 {
                    tracing::trace!(register = R::NAME, attempt, "condition met after polling");
                }
                return Ok(());
            }
            self.delay.delay_us(self.interval_us);
        }

        tracing::warn!(
            register = R::NAME,
            retries = self.max_retries,
            "timed out {timeout}"
        );
        Err(timeout)
    }

    pub(crate) fn into_delay(self) -> D {
        self.delay
    }
}
