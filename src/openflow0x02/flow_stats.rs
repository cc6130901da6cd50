use std::io::{BufRead, Cursor};
use std::mem::size_of;

use bitflags::bitflags;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::trace;

use super::{check_range, marshal_message, need, pad, remaining, take, write_length,
            InstructionList, MessageType, MsgCode, Pattern, PseudoPort, Timeout};
use crate::ofp_message::OfpSerializationError;

const OFPST_FLOW: u16 = 1;
const OFPG_ANY: u32 = 0xffffffff;
const OFPTT_ALL: u8 = 0xff;

bitflags! {
    /// Flags of a statistics reply.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct StatsReplyFlags: u16 {
        /// More replies to follow.
        const REPLY_MORE = 1 << 0;
    }
}

/// Statistics of an individual flow, as reported by a flow stats reply.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlowStats {
    pub table_id: u8,
    pub duration_sec: u32,
    pub duration_nsec: u32,
    pub priority: u16,
    pub idle_timeout: Timeout,
    pub hard_timeout: Timeout,
    pub cookie: u64,
    pub packet_count: u64,
    pub byte_count: u64,
    pub pattern: Pattern,
    pub instructions: InstructionList,
}

#[repr(packed)]
struct OfpFlowStats(u16, u8, u8, u32, u32, u16, u16, u16, [u8; 6], u64, u64, u64);

/// Stats type and flags heading every stats request and reply body.
#[repr(packed)]
struct OfpStatsHeader(u16, u16);

impl FlowStats {
    pub fn new() -> FlowStats {
        FlowStats::default()
    }
}

impl MessageType for FlowStats {
    fn size_of(&self) -> usize {
        size_of::<OfpFlowStats>() + self.pattern.size_of() + self.instructions.size_of()
    }

    fn parse(bytes: &mut Cursor<&[u8]>) -> Result<FlowStats, OfpSerializationError> {
        need(bytes, 2, "flow_stats")?;
        let length = bytes.read_u16::<BigEndian>()? as usize;
        let fixed = size_of::<OfpFlowStats>() + Pattern::size();
        if length < fixed {
            return Err(OfpSerializationError::UnexpectedValue {
                field: "flow_stats.length",
                value: length as u64,
            });
        }
        let mut flow = Cursor::new(take(bytes, length - 2, "flow_stats")?);
        let table_id = flow.read_u8()?;
        flow.consume(1);
        let duration_sec = flow.read_u32::<BigEndian>()?;
        let duration_nsec = flow.read_u32::<BigEndian>()?;
        let priority = flow.read_u16::<BigEndian>()?;
        let idle_timeout = Timeout::of_int(flow.read_u16::<BigEndian>()?);
        let hard_timeout = Timeout::of_int(flow.read_u16::<BigEndian>()?);
        flow.consume(6);
        let cookie = flow.read_u64::<BigEndian>()?;
        let packet_count = flow.read_u64::<BigEndian>()?;
        let byte_count = flow.read_u64::<BigEndian>()?;
        let pattern = Pattern::parse(&mut flow)?;
        let instructions = InstructionList::parse(&mut flow, length - fixed)?;
        Ok(FlowStats {
            table_id,
            duration_sec,
            duration_nsec,
            priority,
            idle_timeout,
            hard_timeout,
            cookie,
            packet_count,
            byte_count,
            pattern,
            instructions,
        })
    }

    fn marshal(&self, bytes: &mut Vec<u8>) -> Result<(), OfpSerializationError> {
        write_length(bytes, "flow_stats", self.size_of())?;
        bytes.write_u8(self.table_id)?;
        pad(bytes, 1)?;
        bytes.write_u32::<BigEndian>(self.duration_sec)?;
        bytes.write_u32::<BigEndian>(self.duration_nsec)?;
        bytes.write_u16::<BigEndian>(self.priority)?;
        bytes.write_u16::<BigEndian>(Timeout::to_int(self.idle_timeout))?;
        bytes.write_u16::<BigEndian>(Timeout::to_int(self.hard_timeout))?;
        pad(bytes, 6)?;
        bytes.write_u64::<BigEndian>(self.cookie)?;
        bytes.write_u64::<BigEndian>(self.packet_count)?;
        bytes.write_u64::<BigEndian>(self.byte_count)?;
        self.pattern.marshal(bytes)?;
        self.instructions.marshal(bytes)
    }
}

/// Reply to a flow stats request: every flow entry that matched it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlowStatsReply {
    pub flags: StatsReplyFlags,
    pub stats: Vec<FlowStats>,
}

impl FlowStatsReply {
    pub fn new() -> FlowStatsReply {
        FlowStatsReply::default()
    }

    /// Add one flow entry after the ones already present.
    pub fn append(&mut self, entry: FlowStats) {
        self.stats.push(entry);
    }

    /// Return the byte-size of the reply without its OpenFlow header.
    pub fn size_of_body(&self) -> usize {
        size_of::<OfpStatsHeader>() + self.stats.iter().map(|s| s.size_of()).sum::<usize>()
    }

    /// Return a complete `STATS_REPLY` message with transaction id `xid`.
    pub fn pack(&self, xid: u32) -> Result<Vec<u8>, OfpSerializationError> {
        marshal_message(xid, MsgCode::StatsResp, self.size_of_body(), |bytes| self.marshal_body(bytes))
    }

    pub fn marshal_body(&self, bytes: &mut Vec<u8>) -> Result<(), OfpSerializationError> {
        bytes.write_u16::<BigEndian>(OFPST_FLOW)?;
        bytes.write_u16::<BigEndian>(self.flags.bits())?;
        for entry in &self.stats {
            entry.marshal(bytes)?;
        }
        Ok(())
    }

    pub fn parse_body(buf: &[u8]) -> Result<FlowStatsReply, OfpSerializationError> {
        let mut bytes = Cursor::new(buf);
        let flags = parse_stats_header(&mut bytes)?;
        let flags = StatsReplyFlags::from_bits(flags).ok_or(OfpSerializationError::UnexpectedValue {
            field: "stats_reply.flags",
            value: flags as u64,
        })?;
        let mut stats = vec![];
        while remaining(&bytes) > 0 {
            stats.push(FlowStats::parse(&mut bytes)?);
        }
        trace!("parsed flow stats reply with {} entries", stats.len());
        Ok(FlowStatsReply { flags, stats })
    }
}

/// Request for the statistics of the flows matching `pattern`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowStatsRequest {
    /// Table to read, `0xff` for all tables.
    pub table_id: u8,
    /// Only flows with an output to this port; `None` for any. The request carries no
    /// `max_len`, so `Controller` must hold 0.
    pub out_port: Option<PseudoPort>,
    /// Only flows with an output to this group; `None` for any.
    pub out_group: Option<u32>,
    pub cookie: u64,
    /// Cookie bits that must match; zero places no restriction.
    pub cookie_mask: u64,
    pub pattern: Pattern,
}

#[repr(packed)]
struct OfpFlowStatsRequest(u8, [u8; 3], u32, u32, [u8; 4], u64, u64);

impl Default for FlowStatsRequest {
    fn default() -> Self {
        FlowStatsRequest {
            table_id: OFPTT_ALL,
            out_port: None,
            out_group: None,
            cookie: 0,
            cookie_mask: 0,
            pattern: Pattern::match_all(),
        }
    }
}

impl FlowStatsRequest {
    /// Return the byte-size of the request without its OpenFlow header.
    pub fn size_of_body(&self) -> usize {
        size_of::<OfpStatsHeader>() + size_of::<OfpFlowStatsRequest>() + self.pattern.size_of()
    }

    /// Return a complete `STATS_REQUEST` message with transaction id `xid`.
    pub fn pack(&self, xid: u32) -> Result<Vec<u8>, OfpSerializationError> {
        marshal_message(xid, MsgCode::StatsReq, self.size_of_body(), |bytes| self.marshal_body(bytes))
    }

    pub fn marshal_body(&self, bytes: &mut Vec<u8>) -> Result<(), OfpSerializationError> {
        bytes.write_u16::<BigEndian>(OFPST_FLOW)?;
        bytes.write_u16::<BigEndian>(0)?;
        bytes.write_u8(self.table_id)?;
        pad(bytes, 3)?;
        if let Some(PseudoPort::Controller(max_len)) = self.out_port {
            check_range("flow_stats_request.out_port max_len", max_len as u64, 0)?;
        }
        PseudoPort::marshal(self.out_port, bytes)?;
        bytes.write_u32::<BigEndian>(self.out_group.unwrap_or(OFPG_ANY))?;
        pad(bytes, 4)?;
        bytes.write_u64::<BigEndian>(self.cookie)?;
        bytes.write_u64::<BigEndian>(self.cookie_mask)?;
        self.pattern.marshal(bytes)
    }

    pub fn parse_body(buf: &[u8]) -> Result<FlowStatsRequest, OfpSerializationError> {
        let mut bytes = Cursor::new(buf);
        parse_stats_header(&mut bytes)?;
        need(&bytes, size_of::<OfpFlowStatsRequest>(), "flow_stats_request")?;
        let table_id = bytes.read_u8()?;
        bytes.consume(3);
        let out_port = PseudoPort::of_int(bytes.read_u32::<BigEndian>()?)?;
        let out_group = match bytes.read_u32::<BigEndian>()? {
            OFPG_ANY => None,
            g => Some(g),
        };
        bytes.consume(4);
        let cookie = bytes.read_u64::<BigEndian>()?;
        let cookie_mask = bytes.read_u64::<BigEndian>()?;
        let pattern = Pattern::parse(&mut bytes)?;
        Ok(FlowStatsRequest {
            table_id,
            out_port,
            out_group,
            cookie,
            cookie_mask,
            pattern,
        })
    }
}

/// Read the stats header, failing unless it announces flow stats. Returns the flags.
fn parse_stats_header(bytes: &mut Cursor<&[u8]>) -> Result<u16, OfpSerializationError> {
    need(bytes, size_of::<OfpStatsHeader>(), "stats header")?;
    let typ = bytes.read_u16::<BigEndian>()?;
    if typ != OFPST_FLOW {
        return Err(OfpSerializationError::UnexpectedValue {
            field: "stats.type",
            value: typ as u64,
        });
    }
    Ok(bytes.read_u16::<BigEndian>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openflow0x02::{Action, Instruction, Wildcards};
    use pretty_assertions::assert_eq;

    fn entry_with_output(port: u32) -> FlowStats {
        let mut inst = Instruction::apply_actions();
        inst.actions_mut()
            .unwrap()
            .add(Action::Output(PseudoPort::PhysicalPort(port)))
            .unwrap();
        let mut entry = FlowStats::new();
        entry.instructions.add(inst).unwrap();
        entry
    }

    #[test]
    fn empty_entry_is_136_bytes() {
        let mut entry = FlowStats::new();
        entry.pattern.wildcards.remove(Wildcards::IN_PORT);
        assert_eq!(entry.size_of(), 136);
        let bytes = entry.pack().unwrap();
        assert_eq!(bytes.len(), 136);
        assert_eq!(&bytes[0..2], &[0x00, 0x88]);
    }

    #[test]
    fn entry_grows_by_instruction_length() {
        let entry = entry_with_output(3);
        let bytes = entry.pack().unwrap();
        assert_eq!(bytes.len(), 160);
        assert_eq!(&bytes[0..2], &[0x00, 0xa0]);
        // the instruction follows the embedded match
        assert_eq!(&bytes[136..140], &[0x00, 0x04, 0x00, 0x18]);
    }

    #[test]
    fn entry_field_layout() {
        let mut entry = FlowStats::new();
        entry.table_id = 2;
        entry.duration_sec = 10;
        entry.priority = 0x8000;
        entry.idle_timeout = Timeout::ExpiresAfter(5);
        entry.cookie = 0x0102030405060708;
        entry.byte_count = 0xff;
        let bytes = entry.pack().unwrap();
        assert_eq!(bytes[2], 2);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 10]);
        assert_eq!(&bytes[12..14], &[0x80, 0x00]);
        assert_eq!(&bytes[14..16], &[0x00, 0x05]);
        assert_eq!(&bytes[16..18], &[0x00, 0x00]);
        assert_eq!(&bytes[24..32], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&bytes[40..48], &[0, 0, 0, 0, 0, 0, 0, 0xff]);
        assert_eq!(&bytes[48..52], &[0x00, 0x00, 0x00, 0x58]);
    }

    #[test]
    fn entry_parse_reads_back_packed_entry() {
        let mut entry = entry_with_output(3);
        entry.packet_count = 42;
        entry.hard_timeout = Timeout::ExpiresAfter(60);
        entry.pattern.set_in_port(1);
        entry.instructions.add(Instruction::GotoTable(3)).unwrap();
        let bytes = entry.pack().unwrap();
        assert_eq!(FlowStats::unpack(&bytes).unwrap(), entry);
    }

    #[test]
    fn entry_parse_rejects_short_length() {
        let mut bytes = FlowStats::new().pack().unwrap();
        bytes[1] = 0x40;
        assert!(FlowStats::unpack(&bytes).is_err());
    }

    #[test]
    fn empty_reply_is_12_bytes() {
        let reply = FlowStatsReply::new();
        let bytes = reply.pack(1).unwrap();
        assert_eq!(bytes.len(), 12);
        assert_eq!(bytes, vec![0x02, 19, 0x00, 0x0c, 0, 0, 0, 1, 0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn reply_grows_by_entry_length() {
        let mut reply = FlowStatsReply::new();
        reply.append(entry_with_output(3));
        let bytes = reply.pack(1).unwrap();
        assert_eq!(bytes.len(), 172);
        assert_eq!(&bytes[2..4], &[0x00, 0xac]);
    }

    #[test]
    fn reply_order_matters_but_not_length() {
        let a = entry_with_output(1);
        let b = entry_with_output(2);
        let mut ab = FlowStatsReply::new();
        ab.append(a.clone());
        ab.append(b.clone());
        let mut ba = FlowStatsReply::new();
        ba.append(b);
        ba.append(a);
        let ab_bytes = ab.pack(7).unwrap();
        let ba_bytes = ba.pack(7).unwrap();
        assert_eq!(ab_bytes.len(), ba_bytes.len());
        assert!(ab_bytes != ba_bytes);
    }

    #[test]
    fn reply_body_parse_reads_every_entry() {
        let mut reply = FlowStatsReply::new();
        reply.flags = StatsReplyFlags::REPLY_MORE;
        reply.append(entry_with_output(1));
        reply.append(FlowStats::new());
        let mut body = vec![];
        reply.marshal_body(&mut body).unwrap();
        assert_eq!(body.len(), reply.size_of_body());
        assert_eq!(FlowStatsReply::parse_body(&body).unwrap(), reply);
    }

    #[test]
    fn reply_body_parse_rejects_other_stats_types() {
        let mut body = vec![];
        FlowStatsReply::new().marshal_body(&mut body).unwrap();
        body[1] = 2;
        assert!(FlowStatsReply::parse_body(&body).is_err());
    }

    #[test]
    fn request_is_132_bytes() {
        let req = FlowStatsRequest::default();
        let bytes = req.pack(3).unwrap();
        assert_eq!(bytes.len(), 132);
        assert_eq!(bytes[1], 18);
        assert_eq!(bytes[12], 0xff);
        assert_eq!(&bytes[16..24], &[0xff; 8]);
    }

    #[test]
    fn request_body_parse_reads_back() {
        let mut req = FlowStatsRequest::default();
        req.table_id = 1;
        req.out_port = Some(PseudoPort::PhysicalPort(4));
        req.out_group = Some(2);
        req.cookie = 0xc0;
        req.cookie_mask = 0xff;
        req.pattern.set_dl_type(0x0806);
        let mut body = vec![];
        req.marshal_body(&mut body).unwrap();
        assert_eq!(body.len(), req.size_of_body());
        assert_eq!(FlowStatsRequest::parse_body(&body).unwrap(), req);
    }

    #[test]
    fn request_out_port_to_controller_has_no_max_len() {
        let mut req = FlowStatsRequest::default();
        req.out_port = Some(PseudoPort::Controller(128));
        let mut body = vec![];
        match req.marshal_body(&mut body) {
            Err(OfpSerializationError::FieldOutOfRange { value: 128, max: 0, .. }) => (),
            other => panic!("unexpected {:?}", other),
        }

        req.out_port = Some(PseudoPort::Controller(0));
        let bytes = req.pack(1).unwrap();
        assert_eq!(FlowStatsRequest::parse_body(&bytes[8..]).unwrap(), req);
    }
}
