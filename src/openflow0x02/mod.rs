//! OpenFlow 1.1 (wire version `0x02`) structures needed to describe installed flows and
//! report them through flow statistics.

use std::io::{Cursor, Write};

use byteorder::{BigEndian, WriteBytesExt};

use crate::ofp_header::{OfpHeader, OFP_VERSION};
use crate::ofp_message::OfpSerializationError;

mod action;
mod flow_stats;
mod instruction;
pub mod message;
mod pattern;

pub use self::action::{Action, ActionList, PseudoPort};
pub use self::flow_stats::{FlowStats, FlowStatsReply, FlowStatsRequest, StatsReplyFlags};
pub use self::instruction::{Instruction, InstructionList};
pub use self::pattern::{Pattern, Wildcards, OFPVID_ANY, OFPVID_NONE};

/// OpenFlow 1.1 message type codes, used by headers to identify meaning of the rest of a message.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MsgCode {
    Hello,
    Error,
    EchoReq,
    EchoResp,
    Experimenter,
    FeaturesReq,
    FeaturesResp,
    GetConfigReq,
    GetConfigResp,
    SetConfig,
    PacketIn,
    FlowRemoved,
    PortStatus,
    PacketOut,
    FlowMod,
    GroupMod,
    PortMod,
    TableMod,
    StatsReq,
    StatsResp,
    BarrierReq,
    BarrierResp,
    QueueGetConfigReq,
    QueueGetConfigResp,
}

impl MsgCode {
    pub fn of_int(code: u8) -> Result<MsgCode, OfpSerializationError> {
        let msg_code = match code {
            0 => MsgCode::Hello,
            1 => MsgCode::Error,
            2 => MsgCode::EchoReq,
            3 => MsgCode::EchoResp,
            4 => MsgCode::Experimenter,
            5 => MsgCode::FeaturesReq,
            6 => MsgCode::FeaturesResp,
            7 => MsgCode::GetConfigReq,
            8 => MsgCode::GetConfigResp,
            9 => MsgCode::SetConfig,
            10 => MsgCode::PacketIn,
            11 => MsgCode::FlowRemoved,
            12 => MsgCode::PortStatus,
            13 => MsgCode::PacketOut,
            14 => MsgCode::FlowMod,
            15 => MsgCode::GroupMod,
            16 => MsgCode::PortMod,
            17 => MsgCode::TableMod,
            18 => MsgCode::StatsReq,
            19 => MsgCode::StatsResp,
            20 => MsgCode::BarrierReq,
            21 => MsgCode::BarrierResp,
            22 => MsgCode::QueueGetConfigReq,
            23 => MsgCode::QueueGetConfigResp,
            c => {
                return Err(OfpSerializationError::UnexpectedValue {
                    field: "ofp_header.type",
                    value: c as u64,
                })
            }
        };
        Ok(msg_code)
    }
}

/// Common API for the fixed and self-length-prefixed structures that make up a message body.
pub trait MessageType: Sized {
    /// Return the byte-size of the structure once marshaled.
    fn size_of(&self) -> usize;
    /// Parse one structure from the cursor, advancing it past the structure.
    fn parse(bytes: &mut Cursor<&[u8]>) -> Result<Self, OfpSerializationError>;
    /// Marshal the structure into a `u8` buffer.
    fn marshal(&self, bytes: &mut Vec<u8>) -> Result<(), OfpSerializationError>;

    /// Return a fresh buffer holding only this structure.
    fn pack(&self) -> Result<Vec<u8>, OfpSerializationError> {
        let mut bytes = Vec::with_capacity(self.size_of());
        self.marshal(&mut bytes)?;
        Ok(bytes)
    }

    /// Parse a buffer holding exactly one structure.
    fn unpack(buf: &[u8]) -> Result<Self, OfpSerializationError> {
        let mut bytes = Cursor::new(buf);
        let parsed = Self::parse(&mut bytes)?;
        let trailing = remaining(&bytes);
        if trailing != 0 {
            return Err(OfpSerializationError::UnexpectedValue {
                field: "trailing bytes",
                value: trailing as u64,
            });
        }
        Ok(parsed)
    }
}

/// How long before a flow entry expires.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Timeout {
    #[default]
    Permanent,
    ExpiresAfter(u16),
}

impl Timeout {
    fn of_int(tm: u16) -> Timeout {
        match tm {
            0 => Timeout::Permanent,
            d => Timeout::ExpiresAfter(d),
        }
    }

    fn to_int(tm: Timeout) -> u16 {
        match tm {
            Timeout::Permanent => 0,
            Timeout::ExpiresAfter(d) => d,
        }
    }
}

fn remaining(bytes: &Cursor<&[u8]>) -> usize {
    bytes.get_ref().len().saturating_sub(bytes.position() as usize)
}

/// Fail unless `needed` more bytes can be read from `bytes`.
fn need(bytes: &Cursor<&[u8]>, needed: usize, what: &'static str) -> Result<(), OfpSerializationError> {
    let available = remaining(bytes);
    if available < needed {
        return Err(OfpSerializationError::Truncated {
            what,
            needed,
            available,
        });
    }
    Ok(())
}

/// Split the next `len` bytes off the cursor.
fn take<'a>(bytes: &mut Cursor<&'a [u8]>,
            len: usize,
            what: &'static str)
            -> Result<&'a [u8], OfpSerializationError> {
    need(bytes, len, what)?;
    let buf: &'a [u8] = *bytes.get_ref();
    let start = bytes.position() as usize;
    bytes.set_position((start + len) as u64);
    Ok(&buf[start..start + len])
}

fn pad(bytes: &mut Vec<u8>, len: usize) -> Result<(), OfpSerializationError> {
    bytes.write_all(&[0; 8][..len])?;
    Ok(())
}

fn check_range(field: &'static str, value: u64, max: u64) -> Result<(), OfpSerializationError> {
    if value > max {
        return Err(OfpSerializationError::FieldOutOfRange { field, value, max });
    }
    Ok(())
}

/// Convert a structure length into the 16-bit value carried on the wire.
fn length_u16(what: &'static str, length: usize) -> Result<u16, OfpSerializationError> {
    u16::try_from(length).map_err(|_| OfpSerializationError::LengthOverflow { what, length })
}

fn write_length(bytes: &mut Vec<u8>, what: &'static str, length: usize) -> Result<(), OfpSerializationError> {
    bytes.write_u16::<BigEndian>(length_u16(what, length)?)?;
    Ok(())
}

/// Marshal an OpenFlow header for a `body_len`-byte body followed by the body itself.
fn marshal_message<F>(xid: u32,
                      code: MsgCode,
                      body_len: usize,
                      body: F)
                      -> Result<Vec<u8>, OfpSerializationError>
    where F: FnOnce(&mut Vec<u8>) -> Result<(), OfpSerializationError>
{
    let length = OfpHeader::size() + body_len;
    let hdr = OfpHeader::new(OFP_VERSION, code as u8, length_u16("message", length)?, xid);
    let mut bytes = Vec::with_capacity(length);
    OfpHeader::marshal(&mut bytes, hdr)?;
    body(&mut bytes)?;
    debug_assert_eq!(bytes.len(), length);
    Ok(bytes)
}
