//! Bus turn-around.
//!
//! With BTA enabled the host gives the bus to the peripheral after each
//! packet. The peripheral then answers (a read response or an acknowledge)
//! and hands the bus back. The handshake is observed through the lane 0
//! direction bit in `DSI_PHY_STATUS`: it flips to receive while the
//! peripheral drives the lane, and back to transmit when it lets go.
use embedded_hal::delay::DelayNs;

use crate::{
    error::Timeout,
    poll::Poller,
    regs::{CmdModeCfg, PckhdlCfg, PhyDirection, PhyStatus, RegisterAccess},
};

/// Request acknowledges and enable turn-around after each packet.
pub(crate) fn enable(regs: &mut impl RegisterAccess) {
    set(regs, true)
}

pub(crate) fn disable(regs: &mut impl RegisterAccess) {
    set(regs, false)
}

fn set(regs: &mut impl RegisterAccess, enabled: bool) {
    regs.modify(|cfg: CmdModeCfg| cfg.with(CmdModeCfg::ACK_RQST_EN, enabled));
    regs.modify(|cfg: PckhdlCfg| cfg.with(PckhdlCfg::BTA_EN, enabled));
    tracing::trace!(enabled, "bus turn-around");
}

/// Waits for the peripheral to take the bus and then give it back.
pub(crate) fn wait_for_ack<D: DelayNs>(
    regs: &impl RegisterAccess,
    poller: &mut Poller<D>,
) -> Result<(), Timeout> {
    poller.poll_until(regs, Timeout::BtaTransmit, |phy: PhyStatus| {
        phy.get(PhyStatus::DIRECTION) != PhyDirection::Transmit
    })?;
    poller.poll_until(regs, Timeout::BtaReceive, |phy: PhyStatus| {
        phy.get(PhyStatus::DIRECTION) != PhyDirection::Receive
    })?;
    tracing::trace!("peripheral released the bus");
    Ok(())
}
