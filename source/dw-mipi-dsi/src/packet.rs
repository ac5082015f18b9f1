//! DSI command descriptors and their wire encoding.
//!
//! A [`Command`] is built per call, either by [`Command::classify`] from raw
//! transmit/receive buffers or by hand, and consumed by
//! [`DsiHost::command`](crate::DsiHost::command). Everything in this module is
//! pure: turning a command into a header word and payload words never touches
//! the hardware, so a command is fully validated before anything is written.
use core::fmt;

use mycelium_bitfield::{bitfield, enum_from_bits};
use crate::{error::InvalidCommand, regs::GenHdr};

/// Maximum parameter bytes carried by a generic short packet.
pub const GENERIC_SHORT_MAX: usize = 2;

/// Maximum parameter bytes carried by a DCS short write.
pub const DCS_SHORT_MAX: usize = 1;

/// Highest virtual channel id; the header field is two bits wide.
pub const MAX_VIRTUAL_CHANNEL: u8 = 3;

enum_from_bits! {
    /// Processor-to-peripheral DSI data types used in command mode.
    #[derive(Debug, Eq, PartialEq)]
    pub enum DataType<u8> {
        GenericShortWrite0 = 0x03,
        GenericShortRead0 = 0x04,
        DcsShortWrite0 = 0x05,
        DcsRead = 0x06,
        GenericShortWrite1 = 0x13,
        GenericShortRead1 = 0x14,
        DcsShortWrite1 = 0x15,
        GenericShortWrite2 = 0x23,
        GenericShortRead2 = 0x24,
        GenericLongWrite = 0x29,
        SetMaxReturnPacketSize = 0x37,
        DcsLongWrite = 0x39,
    }
}

bitfield! {
    /// Per-command flags.
    #[derive(PartialEq, Eq)]
    pub struct CommandFlags<u8> {
        /// The peripheral is expected to acknowledge the packet, so the host
        /// performs a bus turn-around after sending it.
        pub const ACK: bool;
        /// Send a maximum return packet size request, sized to the response
        /// buffer, ahead of a read.
        pub const SET_MAX_RETURN_SIZE: bool;
    }
}

/// How a command addresses the peripheral.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Addressing {
    /// Manufacturer-specific generic packets.
    Generic,
    /// Display Command Set packets.
    Dcs,
}

/// A single DSI command.
#[derive(Debug)]
pub struct Command<'a> {
    /// Virtual channel the command is addressed to (`0..=3`).
    pub virtual_channel: u8,
    pub flags: CommandFlags,
    pub packet: Packet<'a>,
}

/// The packet a [`Command`] sends, keyed by how it goes out on the wire.
#[derive(Debug)]
pub enum Packet<'a> {
    /// A short write: parameters travel inline in the header.
    ShortWrite {
        addressing: Addressing,
        payload: &'a [u8],
    },
    /// A long write: the payload goes through the payload FIFO and the header
    /// carries its length.
    LongWrite {
        addressing: Addressing,
        payload: &'a [u8],
    },
    /// A short read request; the answer is written into `response`.
    Read {
        addressing: Addressing,
        payload: &'a [u8],
        response: &'a mut [u8],
    },
}

/// The loggable part of a [`Command`].
#[derive(Copy, Clone, Debug)]
pub struct Summary<'a> {
    /// Virtual channel, as given (it may be out of range).
    pub virtual_channel: u8,
    /// The data type the packet encodes as, or `None` if its payload or
    /// response doesn't fit any encoding.
    pub data_type: Option<DataType>,
    pub flags: CommandFlags,
    /// Bytes sent to the peripheral.
    pub payload: &'a [u8],
    /// Length of the response buffer; zero for writes.
    pub response_len: usize,
}

// === impl Command ===

impl<'a> Command<'a> {
    /// Picks the wire encoding for a transfer of `tx` bytes, optionally
    /// expecting an answer in `rx`.
    ///
    /// A response counts as requested only when `rx` is present and non-empty.
    ///
    /// | `tx.len()` | response | addressing | packet |
    /// |---|---|---|---|
    /// | 0 | yes | any | read (DCS read / generic read 0) |
    /// | 0 | no | any | short write, no parameters |
    /// | 1 | yes | generic | generic read, 1 parameter |
    /// | 1 | yes | DCS | rejected |
    /// | 1 | no | any | short write, 1 parameter |
    /// | 2 | yes | generic | generic read, 2 parameters |
    /// | 2 | any | DCS | rejected |
    /// | 2 | no | generic | generic short write, 2 parameters |
    /// | >2 | yes | any | rejected |
    /// | >2 | no | any | long write |
    ///
    /// Reads always carry [`CommandFlags::ACK`] and
    /// [`CommandFlags::SET_MAX_RETURN_SIZE`].
    pub fn classify(
        virtual_channel: u8,
        tx: &'a [u8],
        rx: Option<&'a mut [u8]>,
        addressing: Addressing,
    ) -> Result<Self, InvalidCommand> {
        let response = rx.filter(|rx| !rx.is_empty());
        let dcs = addressing == Addressing::Dcs;
        let read_flags = CommandFlags::new()
            .with(CommandFlags::ACK, true)
            .with(CommandFlags::SET_MAX_RETURN_SIZE, true);

        let (flags, packet) = match (tx.len(), response) {
            (0, Some(response)) => (
                read_flags,
                Packet::Read {
                    addressing,
                    payload: tx,
                    response,
                },
            ),
            (len @ (1 | 2), Some(_)) if dcs => {
                return Err(InvalidCommand::DcsReadWithPayload { len })
            }
            (1 | 2, Some(response)) => (
                read_flags,
                Packet::Read {
                    addressing,
                    payload: tx,
                    response,
                },
            ),
            (len @ 2, None) if dcs => {
                return Err(InvalidCommand::ShortPayloadTooLong {
                    len,
                    max: DCS_SHORT_MAX,
                })
            }
            (0..=2, None) => (
                CommandFlags::new(),
                Packet::ShortWrite {
                    addressing,
                    payload: tx,
                },
            ),
            (len, Some(_)) => return Err(InvalidCommand::ReadWithLongPayload { len }),
            (_, None) => (
                CommandFlags::new(),
                Packet::LongWrite {
                    addressing,
                    payload: tx,
                },
            ),
        };

        Ok(Self {
            virtual_channel,
            flags,
            packet,
        })
    }

    /// Checks the command against its encoding's limits and returns the data
    /// type it will be sent as.
    ///
    /// `fifo_depth` is the payload write FIFO depth in bytes.
    pub fn data_type(&self, fifo_depth: usize) -> Result<DataType, InvalidCommand> {
        if self.virtual_channel > MAX_VIRTUAL_CHANNEL {
            return Err(InvalidCommand::VirtualChannel(self.virtual_channel));
        }
        self.packet.data_type(fifo_depth)
    }

    pub fn summary(&self) -> Summary<'_> {
        let (payload, response_len) = match &self.packet {
            Packet::ShortWrite { payload, .. } | Packet::LongWrite { payload, .. } => (*payload, 0),
            Packet::Read {
                payload, response, ..
            } => (*payload, response.len()),
        };
        Summary {
            virtual_channel: self.virtual_channel,
            data_type: self.packet.data_type(usize::MAX).ok(),
            flags: self.flags,
            payload,
            response_len,
        }
    }
}

impl fmt::Display for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.summary(), f)
    }
}

// === impl Packet ===

impl Packet<'_> {
    fn data_type(&self, fifo_depth: usize) -> Result<DataType, InvalidCommand> {
        match *self {
            Packet::ShortWrite {
                addressing: Addressing::Generic,
                payload,
            } => match payload.len() {
                0 => Ok(DataType::GenericShortWrite0),
                1 => Ok(DataType::GenericShortWrite1),
                2 => Ok(DataType::GenericShortWrite2),
                len => Err(InvalidCommand::ShortPayloadTooLong {
                    len,
                    max: GENERIC_SHORT_MAX,
                }),
            },
            Packet::ShortWrite {
                addressing: Addressing::Dcs,
                payload,
            } => match payload.len() {
                0 => Ok(DataType::DcsShortWrite0),
                1 => Ok(DataType::DcsShortWrite1),
                len => Err(InvalidCommand::ShortPayloadTooLong {
                    len,
                    max: DCS_SHORT_MAX,
                }),
            },
            Packet::LongWrite { payload, .. } if payload.len() > fifo_depth => {
                Err(InvalidCommand::LongPayloadTooLong {
                    len: payload.len(),
                    fifo_depth,
                })
            }
            Packet::LongWrite {
                addressing: Addressing::Generic,
                ..
            } => Ok(DataType::GenericLongWrite),
            Packet::LongWrite {
                addressing: Addressing::Dcs,
                ..
            } => Ok(DataType::DcsLongWrite),
            Packet::Read { ref response, .. } if response.is_empty() => {
                Err(InvalidCommand::MissingResponse)
            }
            Packet::Read { ref response, .. } if response.len() > u16::MAX as usize => {
                Err(InvalidCommand::ResponseTooLong {
                    len: response.len(),
                })
            }
            Packet::Read {
                addressing: Addressing::Dcs,
                payload,
                ..
            } => match payload.len() {
                0 => Ok(DataType::DcsRead),
                len => Err(InvalidCommand::DcsReadWithPayload { len }),
            },
            Packet::Read {
                addressing: Addressing::Generic,
                payload,
                ..
            } => match payload.len() {
                0 => Ok(DataType::GenericShortRead0),
                1 => Ok(DataType::GenericShortRead1),
                2 => Ok(DataType::GenericShortRead2),
                len => Err(InvalidCommand::ShortPayloadTooLong {
                    len,
                    max: GENERIC_SHORT_MAX,
                }),
            },
        }
    }
}

// === impl Summary ===

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            virtual_channel,
            data_type,
            flags,
            payload,
            response_len,
        } = self;
        write!(f, "VC {virtual_channel}, type ")?;
        match data_type {
            Some(dt) => write!(f, "{dt:?} ({:#04x})", *dt as u8)?,
            None => f.write_str("<invalid>")?,
        }
        write!(
            f,
            ", ack {}, set max {}, payload {} bytes {payload:02x?}",
            flags.get(CommandFlags::ACK),
            flags.get(CommandFlags::SET_MAX_RETURN_SIZE),
            payload.len(),
        )?;
        if *response_len > 0 {
            write!(f, ", response {response_len} bytes")?;
        }
        Ok(())
    }
}

// === encoding ===

/// Header for a short packet. Up to two parameter bytes travel in the word
/// count field.
///
/// # Panics
///
/// If `virtual_channel` is greater than [`MAX_VIRTUAL_CHANNEL`].
/// [`Command::data_type`] rejects such commands.
pub fn short_header(data_type: DataType, virtual_channel: u8, params: &[u8]) -> GenHdr {
    let mut hdr = GenHdr::new()
        .with(GenHdr::DATA_TYPE, data_type)
        .with(GenHdr::VIRTUAL_CHANNEL, u32::from(virtual_channel));
    if let Some(&lsb) = params.first() {
        hdr.set(GenHdr::WORD_COUNT_LSB, lsb);
    }
    if let Some(&msb) = params.get(1) {
        hdr.set(GenHdr::WORD_COUNT_MSB, msb);
    }
    hdr
}

/// Header for a long packet whose `len` payload bytes are already queued in
/// the payload FIFO.
///
/// # Panics
///
/// If `virtual_channel` is greater than [`MAX_VIRTUAL_CHANNEL`].
pub fn long_header(data_type: DataType, virtual_channel: u8, len: u16) -> GenHdr {
    let [lsb, msb] = len.to_le_bytes();
    GenHdr::new()
        .with(GenHdr::DATA_TYPE, data_type)
        .with(GenHdr::VIRTUAL_CHANNEL, u32::from(virtual_channel))
        .with(GenHdr::WORD_COUNT_LSB, lsb)
        .with(GenHdr::WORD_COUNT_MSB, msb)
}

/// Maximum return packet size request for a `size` byte response.
pub fn max_return_size_header(virtual_channel: u8, size: u16) -> GenHdr {
    long_header(DataType::SetMaxReturnPacketSize, virtual_channel, size)
}

/// Packs `payload` into little-endian payload FIFO words. A trailing partial
/// word is zero-padded in its high bytes.
pub fn payload_words(payload: &[u8]) -> impl Iterator<Item = u32> + '_ {
    payload.chunks(4).map(|chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        u32::from_le_bytes(word)
    })
}

/// Unpacks a little-endian payload FIFO word into `out`, which holds at most
/// four bytes. Bytes past `out.len()` are dropped.
pub fn unpack_word(word: u32, out: &mut [u8]) {
    let len = out.len().min(4);
    out[..len].copy_from_slice(&word.to_le_bytes()[..len]);
}
