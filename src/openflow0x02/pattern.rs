use std::io::{BufRead, Cursor, Read};
use std::mem::size_of;

use bitflags::bitflags;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::{check_range, need, pad, MessageType, PseudoPort};
use crate::ofp_message::OfpSerializationError;

/// `dl_vlan` value matching packets with or without a VLAN tag.
pub const OFPVID_ANY: u16 = 0xfffe;
/// `dl_vlan` value matching only packets without a VLAN tag.
pub const OFPVID_NONE: u16 = 0xffff;

const OFPMT_STANDARD: u16 = 0;

bitflags! {
    /// Fields of a `Pattern` that are ignored when matching.
    ///
    /// Addresses and metadata are not listed here; they are wildcarded bit by bit through
    /// their masks.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Wildcards: u32 {
        const IN_PORT = 1 << 0;
        const DL_VLAN = 1 << 1;
        const DL_VLAN_PCP = 1 << 2;
        const DL_TYPE = 1 << 3;
        const NW_TOS = 1 << 4;
        const NW_PROTO = 1 << 5;
        const TP_SRC = 1 << 6;
        const TP_DST = 1 << 7;
        const MPLS_LABEL = 1 << 8;
        const MPLS_TC = 1 << 9;

        const ALL = (1 << 10) - 1;
    }
}

impl Default for Wildcards {
    fn default() -> Self {
        Wildcards::ALL
    }
}

/// Fields to match against flows.
///
/// Masks use OpenFlow 1.1 polarity: a set bit is ignored. The default pattern matches every
/// packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    pub in_port: u32,
    pub wildcards: Wildcards,
    pub dl_src: [u8; 6],
    pub dl_src_mask: [u8; 6],
    pub dl_dst: [u8; 6],
    pub dl_dst_mask: [u8; 6],
    pub dl_vlan: u16,
    pub dl_vlan_pcp: u8,
    pub dl_type: u16,
    /// DSCP, six bits.
    pub nw_tos: u8,
    pub nw_proto: u8,
    pub nw_src: u32,
    pub nw_src_mask: u32,
    pub nw_dst: u32,
    pub nw_dst_mask: u32,
    pub tp_src: u16,
    pub tp_dst: u16,
    pub mpls_label: u32,
    pub mpls_tc: u8,
    pub metadata: u64,
    pub metadata_mask: u64,
}

#[repr(packed)]
struct OfpMatch(u16, u16, u32, u32, [u8; 6], [u8; 6], [u8; 6], [u8; 6], u16, u8, u8, u16, u8, u8,
                u32, u32, u32, u32, u16, u16, u32, u8, [u8; 3], u64, u64);

impl Default for Pattern {
    fn default() -> Self {
        Pattern {
            in_port: 0,
            wildcards: Wildcards::ALL,
            dl_src: [0; 6],
            dl_src_mask: [0xff; 6],
            dl_dst: [0; 6],
            dl_dst_mask: [0xff; 6],
            dl_vlan: 0,
            dl_vlan_pcp: 0,
            dl_type: 0,
            nw_tos: 0,
            nw_proto: 0,
            nw_src: 0,
            nw_src_mask: u32::MAX,
            nw_dst: 0,
            nw_dst_mask: u32::MAX,
            tp_src: 0,
            tp_dst: 0,
            mpls_label: 0,
            mpls_tc: 0,
            metadata: 0,
            metadata_mask: u64::MAX,
        }
    }
}

impl Pattern {
    /// Return the byte-size of every `Pattern` on the wire.
    pub fn size() -> usize {
        size_of::<OfpMatch>()
    }

    /// A pattern with every field wildcarded.
    pub fn match_all() -> Pattern {
        Pattern::default()
    }

    pub fn set_in_port(&mut self, port: u32) {
        self.in_port = port;
        self.wildcards.remove(Wildcards::IN_PORT);
    }

    /// Match the Ethernet source exactly.
    pub fn set_dl_src(&mut self, addr: [u8; 6]) {
        self.dl_src = addr;
        self.dl_src_mask = [0; 6];
    }

    /// Match the Ethernet destination exactly.
    pub fn set_dl_dst(&mut self, addr: [u8; 6]) {
        self.dl_dst = addr;
        self.dl_dst_mask = [0; 6];
    }

    pub fn set_dl_vlan(&mut self, vid: u16) {
        self.dl_vlan = vid;
        self.wildcards.remove(Wildcards::DL_VLAN);
    }

    pub fn set_dl_vlan_pcp(&mut self, pcp: u8) {
        self.dl_vlan_pcp = pcp;
        self.wildcards.remove(Wildcards::DL_VLAN_PCP);
    }

    pub fn set_dl_type(&mut self, ethertype: u16) {
        self.dl_type = ethertype;
        self.wildcards.remove(Wildcards::DL_TYPE);
    }

    pub fn set_nw_tos(&mut self, dscp: u8) {
        self.nw_tos = dscp;
        self.wildcards.remove(Wildcards::NW_TOS);
    }

    pub fn set_nw_proto(&mut self, proto: u8) {
        self.nw_proto = proto;
        self.wildcards.remove(Wildcards::NW_PROTO);
    }

    /// Match the IPv4 source under `mask`, where set mask bits are ignored.
    pub fn set_nw_src(&mut self, addr: u32, mask: u32) {
        self.nw_src = addr;
        self.nw_src_mask = mask;
    }

    /// Match the IPv4 destination under `mask`, where set mask bits are ignored.
    pub fn set_nw_dst(&mut self, addr: u32, mask: u32) {
        self.nw_dst = addr;
        self.nw_dst_mask = mask;
    }

    pub fn set_tp_src(&mut self, port: u16) {
        self.tp_src = port;
        self.wildcards.remove(Wildcards::TP_SRC);
    }

    pub fn set_tp_dst(&mut self, port: u16) {
        self.tp_dst = port;
        self.wildcards.remove(Wildcards::TP_DST);
    }

    pub fn set_mpls_label(&mut self, label: u32) {
        self.mpls_label = label;
        self.wildcards.remove(Wildcards::MPLS_LABEL);
    }

    pub fn set_mpls_tc(&mut self, tc: u8) {
        self.mpls_tc = tc;
        self.wildcards.remove(Wildcards::MPLS_TC);
    }

    pub fn set_metadata(&mut self, metadata: u64, mask: u64) {
        self.metadata = metadata;
        self.metadata_mask = mask;
    }

    /// Check that every field fits the bits the wire gives it.
    pub fn validate(&self) -> Result<(), OfpSerializationError> {
        PseudoPort::check_port_no("ofp_match.in_port", self.in_port)?;
        if self.dl_vlan != OFPVID_ANY && self.dl_vlan != OFPVID_NONE {
            check_range("ofp_match.dl_vlan", self.dl_vlan as u64, 0xfff)?;
        }
        check_range("ofp_match.dl_vlan_pcp", self.dl_vlan_pcp as u64, 0x7)?;
        check_range("ofp_match.nw_tos", self.nw_tos as u64, 0x3f)?;
        check_range("ofp_match.mpls_label", self.mpls_label as u64, 0xfffff)?;
        check_range("ofp_match.mpls_tc", self.mpls_tc as u64, 0x7)?;
        Ok(())
    }
}

fn read_addr(bytes: &mut Cursor<&[u8]>) -> Result<[u8; 6], OfpSerializationError> {
    let mut addr = [0; 6];
    bytes.read_exact(&mut addr)?;
    Ok(addr)
}

impl MessageType for Pattern {
    fn size_of(&self) -> usize {
        Pattern::size()
    }

    fn parse(bytes: &mut Cursor<&[u8]>) -> Result<Pattern, OfpSerializationError> {
        need(bytes, size_of::<OfpMatch>(), "ofp_match")?;
        let typ = bytes.read_u16::<BigEndian>()?;
        if typ != OFPMT_STANDARD {
            return Err(OfpSerializationError::UnexpectedValue {
                field: "ofp_match.type",
                value: typ as u64,
            });
        }
        let length = bytes.read_u16::<BigEndian>()?;
        if length as usize != size_of::<OfpMatch>() {
            return Err(OfpSerializationError::UnexpectedValue {
                field: "ofp_match.length",
                value: length as u64,
            });
        }
        let in_port = bytes.read_u32::<BigEndian>()?;
        let wildcards = {
            let d = bytes.read_u32::<BigEndian>()?;
            Wildcards::from_bits(d).ok_or(OfpSerializationError::UnexpectedValue {
                field: "ofp_match.wildcards",
                value: d as u64,
            })?
        };
        let dl_src = read_addr(bytes)?;
        let dl_src_mask = read_addr(bytes)?;
        let dl_dst = read_addr(bytes)?;
        let dl_dst_mask = read_addr(bytes)?;
        let dl_vlan = bytes.read_u16::<BigEndian>()?;
        let dl_vlan_pcp = bytes.read_u8()?;
        bytes.consume(1);
        let dl_type = bytes.read_u16::<BigEndian>()?;
        let nw_tos = bytes.read_u8()?;
        let nw_proto = bytes.read_u8()?;
        let nw_src = bytes.read_u32::<BigEndian>()?;
        let nw_src_mask = bytes.read_u32::<BigEndian>()?;
        let nw_dst = bytes.read_u32::<BigEndian>()?;
        let nw_dst_mask = bytes.read_u32::<BigEndian>()?;
        let tp_src = bytes.read_u16::<BigEndian>()?;
        let tp_dst = bytes.read_u16::<BigEndian>()?;
        let mpls_label = bytes.read_u32::<BigEndian>()?;
        let mpls_tc = bytes.read_u8()?;
        bytes.consume(3);
        let metadata = bytes.read_u64::<BigEndian>()?;
        let metadata_mask = bytes.read_u64::<BigEndian>()?;
        let pattern = Pattern {
            in_port,
            wildcards,
            dl_src,
            dl_src_mask,
            dl_dst,
            dl_dst_mask,
            dl_vlan,
            dl_vlan_pcp,
            dl_type,
            nw_tos,
            nw_proto,
            nw_src,
            nw_src_mask,
            nw_dst,
            nw_dst_mask,
            tp_src,
            tp_dst,
            mpls_label,
            mpls_tc,
            metadata,
            metadata_mask,
        };
        pattern.validate()?;
        Ok(pattern)
    }

    fn marshal(&self, bytes: &mut Vec<u8>) -> Result<(), OfpSerializationError> {
        self.validate()?;
        bytes.write_u16::<BigEndian>(OFPMT_STANDARD)?;
        bytes.write_u16::<BigEndian>(size_of::<OfpMatch>() as u16)?;
        bytes.write_u32::<BigEndian>(self.in_port)?;
        bytes.write_u32::<BigEndian>(self.wildcards.bits())?;
        bytes.extend_from_slice(&self.dl_src);
        bytes.extend_from_slice(&self.dl_src_mask);
        bytes.extend_from_slice(&self.dl_dst);
        bytes.extend_from_slice(&self.dl_dst_mask);
        bytes.write_u16::<BigEndian>(self.dl_vlan)?;
        bytes.write_u8(self.dl_vlan_pcp)?;
        pad(bytes, 1)?;
        bytes.write_u16::<BigEndian>(self.dl_type)?;
        bytes.write_u8(self.nw_tos)?;
        bytes.write_u8(self.nw_proto)?;
        bytes.write_u32::<BigEndian>(self.nw_src)?;
        bytes.write_u32::<BigEndian>(self.nw_src_mask)?;
        bytes.write_u32::<BigEndian>(self.nw_dst)?;
        bytes.write_u32::<BigEndian>(self.nw_dst_mask)?;
        bytes.write_u16::<BigEndian>(self.tp_src)?;
        bytes.write_u16::<BigEndian>(self.tp_dst)?;
        bytes.write_u32::<BigEndian>(self.mpls_label)?;
        bytes.write_u8(self.mpls_tc)?;
        pad(bytes, 3)?;
        bytes.write_u64::<BigEndian>(self.metadata)?;
        bytes.write_u64::<BigEndian>(self.metadata_mask)?;
        Ok(())
    }
}
