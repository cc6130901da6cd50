use std::io::Cursor;
use std::mem::size_of;
use byteorder::{BigEndian, WriteBytesExt, ReadBytesExt};

use crate::ofp_message::OfpSerializationError;
use crate::openflow0x02::MsgCode;

/// Wire version byte of OpenFlow 1.1.
pub const OFP_VERSION: u8 = 0x02;

/// OpenFlow Header
///
/// The first fields of every OpenFlow message, no matter the protocol version.
/// This is parsed to determine version and length of the remaining message, so that
/// it can be properly handled.
#[repr(packed)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OfpHeader {
    version: u8,
    typ: u8,
    length: u16,
    xid: u32,
}

impl OfpHeader {
    /// Create an `OfpHeader` out of the arguments.
    pub fn new(version: u8, typ: u8, length: u16, xid: u32) -> OfpHeader {
        OfpHeader {
            version,
            typ,
            length,
            xid,
        }
    }

    /// Return the byte-size of an `OfpHeader`.
    pub fn size() -> usize {
        size_of::<OfpHeader>()
    }

    /// Fills a message buffer with the header fields of an `OfpHeader`.
    pub fn marshal(bytes: &mut Vec<u8>, header: OfpHeader) -> Result<(), OfpSerializationError> {
        bytes.write_u8(header.version())?;
        bytes.write_u8(header.typ)?;
        bytes.write_u16::<BigEndian>(header.length() as u16)?;
        bytes.write_u32::<BigEndian>(header.xid())?;
        Ok(())
    }

    /// Takes a message buffer (at least sized for an `OfpHeader`) and returns an `OfpHeader`.
    pub fn parse(buf: &[u8]) -> Result<Self, OfpSerializationError> {
        if buf.len() < OfpHeader::size() {
            return Err(OfpSerializationError::Truncated {
                what: "ofp_header",
                needed: OfpHeader::size(),
                available: buf.len(),
            });
        }
        let mut bytes = Cursor::new(buf);
        let version = bytes.read_u8()?;
        if version != OFP_VERSION {
            return Err(OfpSerializationError::UnexpectedValue {
                field: "ofp_header.version",
                value: version as u64,
            });
        }
        Ok(OfpHeader {
            version,
            typ: bytes.read_u8()?,
            length: bytes.read_u16::<BigEndian>()?,
            xid: bytes.read_u32::<BigEndian>()?,
        })
    }

    /// Return the `version` field of a header.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Return the OpenFlow message type code of a header, failing on codes outside
    /// the OpenFlow 1.1 range.
    pub fn type_code(&self) -> Result<MsgCode, OfpSerializationError> {
        MsgCode::of_int(self.typ)
    }

    /// Return the `length` field of a header. Includes the length of the header itself.
    pub fn length(&self) -> usize {
        self.length as usize
    }

    /// Return the `xid` field of a header, the transaction id associated with this packet.
    ///  Replies use the same id to facilitate pairing.
    pub fn xid(&self) -> u32 {
        self.xid
    }
}
