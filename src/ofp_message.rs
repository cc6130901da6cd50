use std::io;

use thiserror::Error;

use crate::ofp_header::OfpHeader;

/// Failures while building, marshaling or parsing OpenFlow structures.
#[derive(Error, Debug)]
pub enum OfpSerializationError {
    /// A field value does not fit its fixed-width slot on the wire.
    #[error("{field} value {value:#x} exceeds maximum {max:#x}")]
    FieldOutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },

    /// A packed structure is longer than its 16-bit length field can express.
    #[error("{what} of {length} bytes overflows its length field")]
    LengthOverflow { what: &'static str, length: usize },

    /// An action or instruction was refused by the list it was added to.
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("unexpected value {value:#x} for {field}")]
    UnexpectedValue { field: &'static str, value: u64 },

    #[error("{what} needs {needed} bytes, {available} available")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// OpenFlow Message
///
/// Version-agnostic API for handling OpenFlow messages at the byte-buffer level.
pub trait OfpMessage: Sized {
    /// Return the byte-size of an `OfpMessage`, header included.
    fn size_of(msg: &Self) -> usize;
    /// Create an `OfpHeader` for the given transaction id and OpenFlow message.
    fn header_of(xid: u32, msg: &Self) -> Result<OfpHeader, OfpSerializationError>;
    /// Return a marshaled buffer containing an OpenFlow header and the message `msg`.
    fn marshal(xid: u32, msg: &Self) -> Result<Vec<u8>, OfpSerializationError>;
    /// Returns a pair `(u32, OfpMessage)` of the transaction id and OpenFlow message parsed from
    /// the given OpenFlow header `header`, and buffer `buf`.
    fn parse(header: &OfpHeader, buf: &[u8]) -> Result<(u32, Self), OfpSerializationError>;
}
