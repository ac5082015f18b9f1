//! # DesignWare MIPI DSI host: command mode
//!
//! This crate drives the command-mode half of the Synopsys DesignWare MIPI
//! DSI host controller, the part panel drivers use to configure a display
//! over DSI before video starts flowing. It knows how to:
//!
//! * encode generic and DCS (Display Command Set) packets as header words
//!   and payload FIFO words,
//! * pick a short write, long write or short read encoding for a transfer,
//! * pace writes and reads against the controller's command and payload
//!   FIFOs, and
//! * perform the bus turn-around (BTA) handshake that lets the panel answer
//!   reads and acknowledge writes.
//!
//! ## Using the host
//!
//! Platform code creates a [`DsiHost`] with a delay provider and a
//! [`DsiConfig`], then binds it to the controller's registers with
//! [`DsiHost::initialize`]. Registers are reached through the
//! [`RegisterAccess`] trait; [`Mmio`] implements it for a mapped register
//! block.
//!
//! Panel code then calls [`DsiHost::send`] with the bytes to transmit and,
//! for reads, a buffer for the answer. Commands that don't fit the
//! classification in [`Command::classify`] (for instance writes that the
//! panel should acknowledge) can be built by hand and sent with
//! [`DsiHost::command`].
//!
//! ## Waiting
//!
//! The controller has no interrupt for FIFO space, so every wait is a
//! bounded busy-poll: a status register is read up to
//! [`PollSettings::max_retries`] times with a
//! [`PollSettings::interval_us`] sleep in between. A wait that runs out of
//! retries fails the whole operation with [`Error::Timeout`], naming which
//! wait expired.
#![cfg_attr(not(test), no_std)]

mod bta;
pub mod config;
pub mod error;
mod host;
pub mod packet;
pub mod poll;
pub mod regs;

#[cfg(test)]
pub(crate) mod test_util;

pub use self::{
    config::{DsiConfig, PollSettings},
    error::{Error, InvalidCommand, InvalidConfig, Timeout},
    host::DsiHost,
    packet::{Addressing, Command, CommandFlags, DataType, Packet},
    poll::Wait,
    regs::{Mmio, RegisterAccess},
};
