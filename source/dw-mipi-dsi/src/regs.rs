//! Register map for the command-mode half of the DesignWare MIPI DSI host.
//!
//! Only the registers the command engine touches are described here. Each
//! layout is a [`bitfield!`] bound to its offset through the [`Register`]
//! trait, so protocol code reads and writes named fields rather than shifting
//! bits by hand.
// Unusual groupings are used in binary literals in this file in order to
// separate the bits by which field they represent, rather than by their byte.
#![allow(clippy::unusual_byte_groupings)]

use core::{fmt, ptr::NonNull};

use mycelium_bitfield::{bitfield, enum_from_bits};

use crate::packet::DataType;

/// Register offsets within the DSI host block.
pub mod offset {
    pub const PCKHDL_CFG: usize = 0x2c;
    pub const CMD_MODE_CFG: usize = 0x68;
    pub const GEN_HDR: usize = 0x6c;
    pub const GEN_PLD_DATA: usize = 0x70;
    pub const CMD_PKT_STATUS: usize = 0x74;
    pub const PHY_STATUS: usize = 0xb0;
}

/// 32-bit access to the DSI host's register block.
///
/// This is the only way the command engine reaches the hardware. Platform
/// code provides an implementation over whatever mapping it owns; [`Mmio`]
/// covers the common case of a raw mapped base pointer.
pub trait RegisterAccess {
    /// Read the register at `offset` bytes from the start of the block.
    fn read32(&self, offset: usize) -> u32;

    /// Write `value` to the register at `offset` bytes from the start of the
    /// block.
    fn write32(&mut self, offset: usize, value: u32);

    /// Read a typed register.
    #[inline]
    fn read<R: Register>(&self) -> R {
        R::from_raw(self.read32(R::OFFSET))
    }

    /// Write a typed register.
    #[inline]
    fn write<R: Register>(&mut self, reg: R) {
        self.write32(R::OFFSET, reg.into_raw())
    }

    /// Read-modify-write a typed register.
    #[inline]
    fn modify<R: Register>(&mut self, f: impl FnOnce(R) -> R) {
        let reg = self.read::<R>();
        self.write(f(reg))
    }
}

impl<A: RegisterAccess + ?Sized> RegisterAccess for &mut A {
    #[inline]
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    #[inline]
    fn write32(&mut self, offset: usize, value: u32) {
        (**self).write32(offset, value)
    }
}

/// A register layout at a fixed offset.
pub trait Register: Copy + fmt::Debug {
    const OFFSET: usize;
    const NAME: &'static str;

    fn from_raw(bits: u32) -> Self;
    fn into_raw(self) -> u32;
}

macro_rules! registers {
    ($($Reg:ident @ $offset:expr),+ $(,)?) => {
        $(
            impl Register for $Reg {
                const OFFSET: usize = $offset;
                const NAME: &'static str = stringify!($Reg);

                #[inline]
                fn from_raw(bits: u32) -> Self {
                    Self::from_bits(bits)
                }

                #[inline]
                fn into_raw(self) -> u32 {
                    self.bits()
                }
            }
        )+
    };
}

registers! {
    PckhdlCfg @ offset::PCKHDL_CFG,
    CmdModeCfg @ offset::CMD_MODE_CFG,
    GenHdr @ offset::GEN_HDR,
    CmdPktStatus @ offset::CMD_PKT_STATUS,
    PhyStatus @ offset::PHY_STATUS,
}

bitfield! {
    /// Register `DSI_PCKHDL_CFG` (offset `0x2c`)
    #[derive(PartialEq, Eq)]
    pub struct PckhdlCfg<u32> {
        /// `EOTP_TX_EN`: send an EoTp packet at the end of HS transmissions.
        pub const EOTP_TX_EN: bool;
        /// `EOTP_RX_EN`: accept EoTp packets from the peripheral.
        pub const EOTP_RX_EN: bool;
        /// `BTA_EN`: bus turn-around request enable.
        ///
        /// While set, the host hands the bus to the peripheral after each
        /// packet so that it can acknowledge or answer a read.
        pub const BTA_EN: bool;
        /// `ECC_RX_EN`: ECC check on received packets.
        pub const ECC_RX_EN: bool;
        /// `CRC_RX_EN`: CRC check on received long packets.
        pub const CRC_RX_EN: bool;
        /// `EOTP_TX_LP_EN`: send EoTp packets in low-power mode as well.
        pub const EOTP_TX_LP_EN: bool;
    }
}

bitfield! {
    /// Register `DSI_CMD_MODE_CFG` (offset `0x68`)
    ///
    /// The `*_TX` bits select low-power (`true`) or high-speed (`false`)
    /// transmission per packet type.
    #[derive(PartialEq, Eq)]
    pub struct CmdModeCfg<u32> {
        /// `TEAR_FX_EN`: tearing effect acknowledge request enable.
        pub const TEAR_FX_EN: bool;
        /// `ACK_RQST_EN`: request an acknowledge from the peripheral after
        /// each packet.
        pub const ACK_RQST_EN: bool;
        const _RESERVED_0 = 6;
        pub const GEN_SW_0P_TX: bool;
        pub const GEN_SW_1P_TX: bool;
        pub const GEN_SW_2P_TX: bool;
        pub const GEN_SR_0P_TX: bool;
        pub const GEN_SR_1P_TX: bool;
        pub const GEN_SR_2P_TX: bool;
        pub const GEN_LW_TX: bool;
        const _RESERVED_1 = 1;
        pub const DCS_SW_0P_TX: bool;
        pub const DCS_SW_1P_TX: bool;
        pub const DCS_SR_0P_TX: bool;
        pub const DCS_LW_TX: bool;
        const _RESERVED_2 = 4;
        /// `MAX_RD_PKT_SIZE`: send maximum return packet size requests in
        /// low-power mode.
        pub const MAX_RD_PKT_SIZE: bool;
    }
}

bitfield! {
    /// Register `DSI_GEN_HDR` (offset `0x6c`)
    ///
    /// Writing this register queues a packet header in the command FIFO and
    /// starts transmission. For short packets the two word count bytes carry
    /// the packet's parameters; for long packets they carry the payload
    /// length, and the payload must already be in the payload FIFO.
    #[derive(PartialEq, Eq)]
    pub struct GenHdr<u32> {
        /// `GEN_DT`: packet data type.
        pub const DATA_TYPE: DataType;
        /// `GEN_VC`: virtual channel.
        pub const VIRTUAL_CHANNEL = 2;
        /// `GEN_WC_LSBYTE`: word count low byte, or the first parameter.
        pub const WORD_COUNT_LSB: u8;
        /// `GEN_WC_MSBYTE`: word count high byte, or the second parameter.
        pub const WORD_COUNT_MSB: u8;
    }
}

bitfield! {
    /// Register `DSI_CMD_PKT_STATUS` (offset `0x74`)
    #[derive(PartialEq, Eq)]
    pub struct CmdPktStatus<u32> {
        /// `GEN_CMD_EMPTY`: the generic command (header) FIFO is empty.
        pub const GEN_CMD_EMPTY: bool;
        /// `GEN_CMD_FULL`: the generic command (header) FIFO is full.
        pub const GEN_CMD_FULL: bool;
        /// `GEN_PLD_W_EMPTY`: the generic write payload FIFO is empty.
        pub const GEN_PLD_W_EMPTY: bool;
        /// `GEN_PLD_W_FULL`: the generic write payload FIFO is full.
        pub const GEN_PLD_W_FULL: bool;
        /// `GEN_PLD_R_EMPTY`: the generic read payload FIFO is empty.
        pub const GEN_PLD_R_EMPTY: bool;
        /// `GEN_PLD_R_FULL`: the generic read payload FIFO is full.
        pub const GEN_PLD_R_FULL: bool;
        /// `GEN_RD_CMD_BUSY`: a generic read command is in progress.
        pub const GEN_RD_CMD_BUSY: bool;
    }
}

enum_from_bits! {
    /// Direction of the D-PHY data lane 0.
    #[derive(Debug, Eq, PartialEq)]
    pub enum PhyDirection<u8> {
        Transmit = 0,
        Receive = 1,
    }
}

bitfield! {
    /// Register `DSI_PHY_STATUS` (offset `0xb0`)
    #[derive(PartialEq, Eq)]
    pub struct PhyStatus<u32> {
        /// `PHY_LOCK`: the D-PHY PLL is locked.
        pub const LOCK: bool;
        /// `PHY_DIRECTION`: which side currently drives lane 0.
        pub const DIRECTION: PhyDirection;
        pub const STOP_STATE_CLK_LANE: bool;
        pub const ULPS_ACTIVE_NOT_CLK: bool;
        pub const STOP_STATE_LANE0: bool;
        pub const ULPS_ACTIVE_NOT_LANE0: bool;
        pub const RX_ULPS_ESC_LANE0: bool;
    }
}

/// Volatile access to a memory-mapped DSI host register block.
pub struct Mmio {
    base: NonNull<u32>,
}

// The block is only reachable through the `Mmio` that owns it.
unsafe impl Send for Mmio {}

impl Mmio {
    /// # Safety
    ///
    /// - `base` must point to the start of a mapped DesignWare DSI host
    ///   register block, valid for the lifetime of the returned `Mmio`.
    /// - Nothing else may access the command-mode registers while the
    ///   returned `Mmio` is in use.
    pub const unsafe fn new(base: NonNull<u32>) -> Self {
        Self { base }
    }

    #[inline]
    fn reg(&self, offset: usize) -> *mut u32 {
        debug_assert_eq!(offset % 4, 0, "unaligned DSI register offset {offset:#x}");
        self.base.as_ptr().wrapping_add(offset / 4)
    }
}

impl RegisterAccess for Mmio {
    #[inline]
    fn read32(&self, offset: usize) -> u32 {
        // Safety: the constructor's contract covers every offset in the block.
        unsafe { self.reg(offset).read_volatile() }
    }

    #[inline]
    fn write32(&mut self, offset: usize, value: u32) {
        // Safety: the constructor's contract covers every offset in the block.
        unsafe { self.reg(offset).write_volatile(value) }
    }
}

impl fmt::Debug for Mmio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mmio").field("base", &self.base).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_are_valid() {
        PckhdlCfg::assert_valid();
        CmdModeCfg::assert_valid();
        GenHdr::assert_valid();
        CmdPktStatus::assert_valid();
        PhyStatus::assert_valid();
    }

    #[test]
    fn bit_positions() {
        assert_eq!(PckhdlCfg::new().with(PckhdlCfg::BTA_EN, true).bits(), 1 << 2);
        assert_eq!(
            CmdModeCfg::new().with(CmdModeCfg::ACK_RQST_EN, true).bits(),
            1 << 1
        );
        assert_eq!(
            CmdModeCfg::new().with(CmdModeCfg::MAX_RD_PKT_SIZE, true).bits(),
            1 << 24
        );
        assert_eq!(
            CmdModeCfg::new().with(CmdModeCfg::DCS_SW_0P_TX, true).bits(),
            1 << 16
        );

        let status = CmdPktStatus::from_bits(0b0101_1010);
        assert!(!status.get(CmdPktStatus::GEN_CMD_EMPTY));
        assert!(status.get(CmdPktStatus::GEN_CMD_FULL));
        assert!(!status.get(CmdPktStatus::GEN_PLD_W_EMPTY));
        assert!(status.get(CmdPktStatus::GEN_PLD_W_FULL));
        assert!(status.get(CmdPktStatus::GEN_PLD_R_EMPTY));
        assert!(!status.get(CmdPktStatus::GEN_PLD_R_FULL));
        assert!(status.get(CmdPktStatus::GEN_RD_CMD_BUSY));

        assert_eq!(
            PhyStatus::from_bits(0b10).get(PhyStatus::DIRECTION),
            PhyDirection::Receive
        );
        assert_eq!(
            PhyStatus::from_bits(0b01).get(PhyStatus::DIRECTION),
            PhyDirection::Transmit
        );
    }

    #[test]
    fn generic_header_layout() {
        //          unused   WC MSB   WC LSB   VC DT
        let manual = 0b00000000_10111011_10101010_10_101001;
        let hdr = GenHdr::new()
            .with(GenHdr::DATA_TYPE, DataType::GenericLongWrite)
            .with(GenHdr::VIRTUAL_CHANNEL, 0b10)
            .with(GenHdr::WORD_COUNT_LSB, 0xaa)
            .with(GenHdr::WORD_COUNT_MSB, 0xbb);
        assert_eq!(manual, hdr.bits(), "\n{manual:032b} (expected), vs:\n{hdr}");
    }

    #[test]
    fn mmio_reads_and_writes_words() {
        let mut block = [0u32; 0x100 / 4];
        block[offset::CMD_PKT_STATUS / 4] = 0b0101;
        let base = NonNull::new(block.as_mut_ptr()).unwrap();
        let mut mmio = unsafe { Mmio::new(base) };

        assert!(mmio.read::<CmdPktStatus>().get(CmdPktStatus::GEN_PLD_W_EMPTY));
        mmio.modify(|cfg: PckhdlCfg| cfg.with(PckhdlCfg::BTA_EN, true));
        mmio.write32(offset::GEN_PLD_DATA, 0xdead_beef);
        drop(mmio);

        assert_eq!(block[offset::PCKHDL_CFG / 4], 1 << 2);
        assert_eq!(block[offset::GEN_PLD_DATA / 4], 0xdead_beef);
    }
}
