use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, VecDeque},
    rc::Rc,
};

use embedded_hal::delay::DelayNs;

use crate::{
    packet::DataType,
    regs::{
        offset, CmdModeCfg, CmdPktStatus, PckhdlCfg, PhyDirection, PhyStatus,
        RegisterAccess,
    },
};

/// Words the mock's read payload FIFO holds before it reports full.
const READ_FIFO_FULL: usize = 4;

/// A scripted DSI host register block.
///
/// Clones share state, so a test can hand one clone to the host and inspect
/// the other afterwards.
#[derive(Clone, Default)]
pub(crate) struct MockRegs(Rc<RefCell<MockState>>);

/// How the peripheral behaves when a header goes out with BTA enabled.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub(crate) enum Turnaround {
    /// Takes the bus and hands it back.
    #[default]
    Ack,
    /// Never takes the bus.
    Ignore,
    /// Takes the bus and never hands it back.
    Hold,
}

#[derive(Default)]
struct MockState {
    regs: BTreeMap<usize, u32>,
    writes: Vec<(usize, u32)>,
    headers: Vec<u32>,
    payload: Vec<u32>,
    read_fifo: VecDeque<u32>,
    responses: VecDeque<Vec<u32>>,
    stall_payload_writes: bool,
    stall_commands_for: usize,
    stall_commands_after: Option<usize>,
    status_reads: usize,
    phy: VecDeque<PhyDirection>,
    phy_idle: Option<PhyDirection>,
    turnaround: Turnaround,
}

/// A delay that only counts.
#[derive(Clone, Default)]
pub(crate) struct MockDelay {
    calls: Rc<Cell<usize>>,
    total_ns: Rc<Cell<u64>>,
}

pub(crate) fn trace_init() {
    use tracing_subscriber::filter::{EnvFilter, LevelFilter};

    let env = std::env::var("RUST_LOG").unwrap_or_default();
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into());
    let filter = if env.is_empty() {
        builder.parse("dw_mipi_dsi=trace").unwrap()
    } else {
        builder.parse_lossy(env)
    };

    let _res = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .without_time()
        .try_init();
}

// === impl MockRegs ===

impl MockRegs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Report the write payload FIFO as full until cleared.
    pub(crate) fn stall_payload_writes(&self, stall: bool) {
        self.0.borrow_mut().stall_payload_writes = stall;
    }

    /// Report the command FIFO as full for the next `reads` status reads.
    pub(crate) fn stall_commands_for(&self, reads: usize) {
        self.0.borrow_mut().stall_commands_for = reads;
    }

    /// Report the command FIFO as full forever once `headers` headers have
    /// been written.
    pub(crate) fn stall_commands_after(&self, headers: usize) {
        self.0.borrow_mut().stall_commands_after = Some(headers);
    }

    /// Put words in the read payload FIFO right away.
    pub(crate) fn push_response(&self, words: &[u32]) {
        self.0.borrow_mut().read_fifo.extend(words);
    }

    /// Answer the next read request header with `words`.
    pub(crate) fn queue_response(&self, words: &[u32]) {
        self.0.borrow_mut().responses.push_back(words.to_vec());
    }

    pub(crate) fn set_turnaround(&self, turnaround: Turnaround) {
        self.0.borrow_mut().turnaround = turnaround;
    }

    pub(crate) fn status_reads(&self) -> usize {
        self.0.borrow().status_reads
    }

    /// Every register write, in order.
    pub(crate) fn writes(&self) -> Vec<(usize, u32)> {
        self.0.borrow().writes.clone()
    }

    pub(crate) fn headers(&self) -> Vec<u32> {
        self.0.borrow().headers.clone()
    }

    pub(crate) fn payload_writes(&self) -> Vec<u32> {
        self.0.borrow().payload.clone()
    }

    pub(crate) fn read_fifo_len(&self) -> usize {
        self.0.borrow().read_fifo.len()
    }

    /// Whether either half of the BTA configuration is still set.
    pub(crate) fn bta_enabled(&self) -> bool {
        let state = self.0.borrow();
        let pckhdl = PckhdlCfg::from_bits(state.reg(offset::PCKHDL_CFG));
        let cmd_mode = CmdModeCfg::from_bits(state.reg(offset::CMD_MODE_CFG));
        pckhdl.get(PckhdlCfg::BTA_EN) || cmd_mode.get(CmdModeCfg::ACK_RQST_EN)
    }

    /// Preload a raw register value.
    pub(crate) fn set_reg(&self, addr: usize, value: u32) {
        self.0.borrow_mut().regs.insert(addr, value);
    }

    pub(crate) fn reg(&self, addr: usize) -> u32 {
        self.0.borrow().reg(addr)
    }
}

impl RegisterAccess for MockRegs {
    fn read32(&self, addr: usize) -> u32 {
        let mut state = self.0.borrow_mut();
        match addr {
            offset::CMD_PKT_STATUS => state.status().bits(),
            offset::PHY_STATUS => {
                let direction = state
                    .phy
                    .pop_front()
                    .or(state.phy_idle)
                    .unwrap_or(PhyDirection::Transmit);
                PhyStatus::new()
                    .with(PhyStatus::LOCK, true)
                    .with(PhyStatus::DIRECTION, direction)
                    .bits()
            }
            offset::GEN_PLD_DATA => state.read_fifo.pop_front().unwrap_or(0),
            addr => state.reg(addr),
        }
    }

    fn write32(&mut self, addr: usize, value: u32) {
        let mut state = self.0.borrow_mut();
        state.writes.push((addr, value));
        match addr {
            offset::GEN_HDR => state.header(value),
            offset::GEN_PLD_DATA => state.payload.push(value),
            addr => {
                state.regs.insert(addr, value);
            }
        }
    }
}

// === impl MockState ===

impl MockState {
    fn reg(&self, addr: usize) -> u32 {
        self.regs.get(&addr).copied().unwrap_or(0)
    }

    fn status(&mut self) -> CmdPktStatus {
        self.status_reads += 1;
        let mut cmd_full = match self.stall_commands_after {
            Some(headers) => self.headers.len() >= headers,
            None => false,
        };
        if self.stall_commands_for > 0 {
            self.stall_commands_for -= 1;
            cmd_full = true;
        }
        CmdPktStatus::new()
            .with(CmdPktStatus::GEN_CMD_EMPTY, !cmd_full)
            .with(CmdPktStatus::GEN_CMD_FULL, cmd_full)
            .with(CmdPktStatus::GEN_PLD_W_EMPTY, !self.stall_payload_writes)
            .with(CmdPktStatus::GEN_PLD_W_FULL, self.stall_payload_writes)
            .with(CmdPktStatus::GEN_PLD_R_EMPTY, self.read_fifo.is_empty())
            .with(
                CmdPktStatus::GEN_PLD_R_FULL,
                self.read_fifo.len() >= READ_FIFO_FULL,
            )
    }

    fn header(&mut self, value: u32) {
        self.headers.push(value);

        let bta = PckhdlCfg::from_bits(self.reg(offset::PCKHDL_CFG)).get(PckhdlCfg::BTA_EN);
        if bta {
            match self.turnaround {
                Turnaround::Ack => self
                    .phy
                    .extend([PhyDirection::Receive, PhyDirection::Transmit]),
                Turnaround::Ignore => {}
                Turnaround::Hold => self.phy_idle = Some(PhyDirection::Receive),
            }
        }

        let data_type = (value & 0x3f) as u8;
        let is_read = [
            DataType::GenericShortRead0,
            DataType::GenericShortRead1,
            DataType::GenericShortRead2,
            DataType::DcsRead,
        ]
        .iter()
        .any(|&dt| dt as u8 == data_type);
        if is_read {
            if let Some(words) = self.responses.pop_front() {
                self.read_fifo.extend(words);
            }
        }
    }
}

// === impl MockDelay ===

impl MockDelay {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.get()
    }

    pub(crate) fn total_us(&self) -> u64 {
        self.total_ns.get() / 1_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.calls.set(self.calls.get() + 1);
        self.total_ns.set(self.total_ns.get() + u64::from(ns));
    }

    fn delay_us(&mut self, us: u32) {
        self.calls.set(self.calls.get() + 1);
        self.total_ns
            .set(self.total_ns.get() + u64::from(us) * 1_000);
    }
}
