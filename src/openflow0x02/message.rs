//! Encapsulates handling of whole OpenFlow 1.1 messages, header included.

use log::debug;

use super::{length_u16, marshal_message, FlowStats, FlowStatsReply, FlowStatsRequest, MsgCode};
use crate::ofp_header::{OfpHeader, OFP_VERSION};
use crate::ofp_message::{OfpMessage, OfpSerializationError};

/// Abstractions of OpenFlow messages mapping to message codes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    FlowStatsRequest(FlowStatsRequest),
    FlowStatsReply(FlowStatsReply),
}

impl Message {
    /// Map `Message` to associated OpenFlow message type code `MsgCode`.
    fn msg_code_of_message(msg: &Message) -> MsgCode {
        match *msg {
            Message::FlowStatsRequest(_) => MsgCode::StatsReq,
            Message::FlowStatsReply(_) => MsgCode::StatsResp,
        }
    }

    fn size_of_body(msg: &Message) -> usize {
        match *msg {
            Message::FlowStatsRequest(ref req) => req.size_of_body(),
            Message::FlowStatsReply(ref reply) => reply.size_of_body(),
        }
    }

    /// Marshal the body of the OpenFlow message `msg`.
    fn marshal_body(msg: &Message, bytes: &mut Vec<u8>) -> Result<(), OfpSerializationError> {
        match *msg {
            Message::FlowStatsRequest(ref req) => req.marshal_body(bytes),
            Message::FlowStatsReply(ref reply) => reply.marshal_body(bytes),
        }
    }
}

impl OfpMessage for Message {
    fn size_of(msg: &Message) -> usize {
        OfpHeader::size() + Message::size_of_body(msg)
    }

    fn header_of(xid: u32, msg: &Message) -> Result<OfpHeader, OfpSerializationError> {
        let sizeof_buf = Self::size_of(msg);
        Ok(OfpHeader::new(OFP_VERSION,
                          Self::msg_code_of_message(msg) as u8,
                          length_u16("message", sizeof_buf)?,
                          xid))
    }

    fn marshal(xid: u32, msg: &Message) -> Result<Vec<u8>, OfpSerializationError> {
        let code = Self::msg_code_of_message(msg);
        debug!("marshaling {:?} xid={}", code, xid);
        marshal_message(xid,
                        code,
                        Message::size_of_body(msg),
                        |bytes| Message::marshal_body(msg, bytes))
    }

    /// Parse the body `buf` that followed `header` on the wire. `buf` may hold more than one
    /// message; only the bytes the header accounts for are read.
    fn parse(header: &OfpHeader, buf: &[u8]) -> Result<(u32, Message), OfpSerializationError> {
        let body_len = header.length().saturating_sub(OfpHeader::size());
        if header.length() < OfpHeader::size() || buf.len() < body_len {
            return Err(OfpSerializationError::Truncated {
                what: "message body",
                needed: body_len,
                available: buf.len(),
            });
        }
        let body = &buf[..body_len];
        let typ = header.type_code()?;
        debug!("parsing {:?} xid={} length={}", typ, header.xid(), header.length());
        let msg = match typ {
            MsgCode::StatsReq => Message::FlowStatsRequest(FlowStatsRequest::parse_body(body)?),
            MsgCode::StatsResp => Message::FlowStatsReply(FlowStatsReply::parse_body(body)?),
            t => {
                return Err(OfpSerializationError::UnexpectedValue {
                    field: "ofp_header.type",
                    value: t as u64,
                })
            }
        };
        Ok((header.xid(), msg))
    }
}

/// Return a `FlowStatsReply` message carrying `entries` in the order given.
pub fn flow_stats_reply<I>(entries: I) -> Message
    where I: IntoIterator<Item = FlowStats>
{
    let mut reply = FlowStatsReply::new();
    for entry in entries {
        reply.append(entry);
    }
    Message::FlowStatsReply(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openflow0x02::{Action, Instruction, PseudoPort};
    use pretty_assertions::assert_eq;

    const TEST_XID: u32 = 0x12345678;

    fn entry() -> FlowStats {
        let mut inst = Instruction::apply_actions();
        inst.actions_mut()
            .unwrap()
            .add(Action::Output(PseudoPort::PhysicalPort(3)))
            .unwrap();
        let mut entry = FlowStats::new();
        entry.instructions.add(inst).unwrap();
        entry
    }

    fn round_trip(msg: Message) {
        let bytes = Message::marshal(TEST_XID, &msg).unwrap();
        assert_eq!(bytes.len(), Message::size_of(&msg));
        let header = OfpHeader::parse(&bytes).unwrap();
        assert_eq!(header.length(), bytes.len());
        let (xid, parsed) = Message::parse(&header, &bytes[OfpHeader::size()..]).unwrap();
        assert_eq!(xid, TEST_XID);
        assert_eq!(parsed, msg);
    }

    #[test]
    fn reply_message_matches_direct_pack() {
        let msg = flow_stats_reply(vec![entry()]);
        let bytes = Message::marshal(TEST_XID, &msg).unwrap();
        assert_eq!(bytes.len(), 172);
        if let Message::FlowStatsReply(ref reply) = msg {
            assert_eq!(bytes, reply.pack(TEST_XID).unwrap());
        }
    }

    #[test]
    fn header_of_counts_header() {
        let hdr = Message::header_of(TEST_XID, &flow_stats_reply(vec![])).unwrap();
        assert_eq!(hdr.length(), 12);
        assert_eq!(hdr.type_code().unwrap(), MsgCode::StatsResp);
    }

    #[test]
    fn reply_round_trip() {
        round_trip(flow_stats_reply(vec![entry(), FlowStats::new()]));
    }

    #[test]
    fn request_round_trip() {
        let mut req = FlowStatsRequest::default();
        req.out_port = Some(PseudoPort::Controller(0));
        round_trip(Message::FlowStatsRequest(req));
    }

    #[test]
    fn parse_rejects_other_message_types() {
        let hdr = OfpHeader::new(OFP_VERSION, MsgCode::Hello as u8, 8, 1);
        assert!(Message::parse(&hdr, &[]).is_err());
    }

    #[test]
    fn parse_rejects_short_body() {
        let bytes = Message::marshal(TEST_XID, &flow_stats_reply(vec![entry()])).unwrap();
        let header = OfpHeader::parse(&bytes).unwrap();
        match Message::parse(&header, &bytes[OfpHeader::size()..100]) {
            Err(OfpSerializationError::Truncated { .. }) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn oversized_reply_overflows_length() {
        let entries: Vec<FlowStats> = (0..500).map(|_| entry()).collect();
        let msg = flow_stats_reply(entries);
        match Message::marshal(TEST_XID, &msg) {
            Err(OfpSerializationError::LengthOverflow { .. }) => (),
            other => panic!("unexpected {:?}", other),
        }
    }
}
