//! The command-mode DSI host.
use embedded_hal::delay::DelayNs;
use tracing::Level;

use crate::{
    bta,
    config::DsiConfig,
    error::{Error, InvalidCommand, InvalidConfig, Timeout},
    packet::{self, Addressing, Command, CommandFlags, DataType, Packet},
    poll::{Poller, Wait},
    regs::{offset, CmdPktStatus, GenHdr, RegisterAccess},
};

/// Sends generic and DCS commands through a DesignWare MIPI DSI host.
///
/// A `DsiHost` starts out unbound. Until [`initialize`](Self::initialize)
/// hands it a register block, every operation fails with
/// [`Error::NotInitialized`]. Commands are sent one at a time: each call
/// either finishes its transfer or times out before returning, and `&mut self`
/// keeps a second caller out of the FIFOs in the meantime.
pub struct DsiHost<R, D> {
    regs: Option<R>,
    poller: Poller<D>,
    config: DsiConfig,
}

/// Borrowed halves of an initialized host for the duration of one command.
struct Engine<'host, R, D> {
    regs: &'host mut R,
    poller: &'host mut Poller<D>,
}

// === impl DsiHost ===

impl<R, D> DsiHost<R, D>
where
    R: RegisterAccess,
    D: DelayNs,
{
    /// Returns a host that sleeps on `delay` between status polls.
    pub fn new(delay: D, config: DsiConfig) -> Result<Self, InvalidConfig> {
        config.validate()?;
        Ok(Self {
            regs: None,
            poller: Poller::new(delay, &config.poll),
            config,
        })
    }

    /// Binds the host to its register block.
    ///
    /// Only the first call has an effect; later calls drop `regs` and leave
    /// the host as it was.
    pub fn initialize(&mut self, regs: R) {
        if self.regs.is_some() {
            tracing::debug!("DSI host already initialized");
            return;
        }
        self.regs = Some(regs);
        tracing::info!(
            virtual_channel = self.config.virtual_channel,
            payload_fifo_depth = self.config.payload_fifo_depth,
            "DSI host initialized"
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.regs.is_some()
    }

    pub fn config(&self) -> &DsiConfig {
        &self.config
    }

    /// Sends `tx` to the peripheral on the configured virtual channel.
    ///
    /// If `rx` is present and non-empty, this is a read: `tx` holds at most
    /// two parameter bytes and the peripheral's answer is written into `rx`.
    /// Otherwise `tx` is written, as a short packet when it fits in the
    /// header and as a long packet when it doesn't. See [`Command::classify`]
    /// for the exact table.
    #[tracing::instrument(
        name = "DsiHost::send",
        level = Level::DEBUG,
        skip_all,
        fields(
            tx_len = tx.len(),
            rx_len = rx.as_ref().map_or(0, |rx| rx.len()),
            ?addressing,
        )
    )]
    pub fn send(
        &mut self,
        tx: &[u8],
        rx: Option<&mut [u8]>,
        addressing: Addressing,
    ) -> Result<(), Error> {
        let command = Command::classify(self.config.virtual_channel, tx, rx, addressing)
            .map_err(|error| {
                tracing::debug!(%error, "rejected DSI transfer");
                error
            })?;
        self.command(command)
    }

    /// Sends a command.
    ///
    /// The command is checked against the encoding limits and the payload
    /// FIFO depth before any register is touched. If sending fails, the
    /// command is logged at `ERROR` level.
    #[tracing::instrument(
        name = "DsiHost::command",
        level = Level::TRACE,
        skip_all,
        fields(vc = command.virtual_channel)
    )]
    pub fn command(&mut self, mut command: Command<'_>) -> Result<(), Error> {
        let regs = self.regs.as_mut().ok_or(Error::NotInitialized)?;
        let mut engine = Engine {
            regs,
            poller: &mut self.poller,
        };

        let result = command
            .data_type(self.config.payload_fifo_depth)
            .map_err(Error::from)
            .and_then(|data_type| engine.dispatch(data_type, &mut command));

        match result {
            Ok(()) => tracing::debug!("DSI command sent"),
            Err(error) => tracing::error!(%error, "DSI command failed: {command}"),
        }
        result
    }

    /// Returns a snapshot of the command and payload FIFO status.
    ///
    /// [`Wait::is_met`] tells which waits the snapshot would satisfy; iterate
    /// [`Wait::ALL`] to report all of them.
    pub fn fifo_status(&self) -> Result<CmdPktStatus, Error> {
        let regs = self.regs.as_ref().ok_or(Error::NotInitialized)?;
        Ok(regs.read())
    }

    /// Waits for a FIFO condition.
    pub fn wait_for(&mut self, wait: Wait) -> Result<(), Error> {
        let regs = self.regs.as_ref().ok_or(Error::NotInitialized)?;
        self.poller.wait_for(regs, wait)?;
        Ok(())
    }

    /// Waits for every queued header and payload word to go out.
    pub fn flush(&mut self) -> Result<(), Error> {
        self.wait_for(Wait::CommandEmpty)?;
        self.wait_for(Wait::PayloadWriteEmpty)
    }

    /// Takes the host apart, returning the register block (if it was ever
    /// bound) and the delay.
    pub fn release(self) -> (Option<R>, D) {
        (self.regs, self.poller.into_delay())
    }
}

// === impl Engine ===

impl<R, D> Engine<'_, R, D>
where
    R: RegisterAccess,
    D: DelayNs,
{
    fn dispatch(&mut self, data_type: DataType, command: &mut Command<'_>) -> Result<(), Error> {
        let vc = command.virtual_channel;
        let ack = command.flags.get(CommandFlags::ACK);
        let set_max = command.flags.get(CommandFlags::SET_MAX_RETURN_SIZE);

        match command.packet {
            Packet::ShortWrite { payload, .. } => {
                let hdr = packet::short_header(data_type, vc, payload);
                self.acked(ack, |engine| engine.write_header(hdr))?;
            }
            Packet::LongWrite { payload, .. } => {
                let len = u16::try_from(payload.len()).map_err(|_| {
                    InvalidCommand::LongPayloadTooLong {
                        len: payload.len(),
                        fifo_depth: usize::from(u16::MAX),
                    }
                })?;
                let hdr = packet::long_header(data_type, vc, len);
                self.acked(ack, |engine| {
                    engine.write_payload(payload)?;
                    engine.write_header(hdr)
                })?;
            }
            Packet::Read {
                payload,
                ref mut response,
                ..
            } => {
                let size = u16::try_from(response.len())
                    .map_err(|_| InvalidCommand::ResponseTooLong {
                        len: response.len(),
                    })?;
                let result = self.read(data_type, vc, set_max.then_some(size), payload, response);
                // leave the link in its normal state no matter where the read
                // stopped
                bta::disable(&mut *self.regs);
                result?;
            }
        }
        Ok(())
    }

    /// Runs `write`, wrapped in a bus turn-around if the peripheral is
    /// expected to acknowledge it.
    fn acked(
        &mut self,
        ack: bool,
        write: impl FnOnce(&mut Self) -> Result<(), Timeout>,
    ) -> Result<(), Timeout> {
        if !ack {
            return write(&mut *self);
        }

        bta::enable(&mut *self.regs);
        let result =
            write(&mut *self).and_then(|()| bta::wait_for_ack(&*self.regs, &mut *self.poller));
        bta::disable(&mut *self.regs);
        result
    }

    fn read(
        &mut self,
        data_type: DataType,
        vc: u8,
        max_return_size: Option<u16>,
        params: &[u8],
        response: &mut [u8],
    ) -> Result<(), Timeout> {
        if let Some(size) = max_return_size {
            self.write_header(packet::max_return_size_header(vc, size))?;
        }

        bta::enable(&mut *self.regs);
        self.write_header(packet::short_header(data_type, vc, params))?;
        bta::wait_for_ack(&*self.regs, &mut *self.poller)?;

        for chunk in response.chunks_mut(4) {
            self.poller
                .wait_for(&*self.regs, Wait::PayloadReadNotEmpty)?;
            let word = self.regs.read32(offset::GEN_PLD_DATA);
            tracing::trace!("read payload word {word:#010x}");
            packet::unpack_word(word, chunk);
        }
        Ok(())
    }

    fn write_header(&mut self, hdr: GenHdr) -> Result<(), Timeout> {
        self.poller.wait_for(&*self.regs, Wait::CommandNotFull)?;
        tracing::trace!("write header {:#010x}", hdr.bits());
        self.regs.write(hdr);
        Ok(())
    }

    fn write_payload(&mut self, payload: &[u8]) -> Result<(), Timeout> {
        for word in packet::payload_words(payload) {
            self.poller
                .wait_for(&*self.regs, Wait::PayloadWriteNotFull)?;
            tracing::trace!("write payload word {word:#010x}");
            self.regs.write32(offset::GEN_PLD_DATA, word);
        }
        Ok(())
    }
}
