use std::io::{BufRead, Cursor, Read};
use std::mem::size_of;
use std::slice;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::warn;

use super::{check_range, need, pad, remaining, take, MessageType};
use crate::ofp_message::OfpSerializationError;

/// Port behavior.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PseudoPort {
    /// A switch port numbered `1..=0xffffff00`. Port 0 is not a valid port.
    PhysicalPort(u32),
    InPort,
    Table,
    Normal,
    Flood,
    AllPorts,
    /// Send to the controller, with at most this many bytes of the packet.
    Controller(u16),
    Local,
}

#[repr(u32)]
enum OfpPort {
    OFPPMax = 0xffffff00,
    OFPPInPort = 0xfffffff8,
    OFPPTable = 0xfffffff9,
    OFPPNormal = 0xfffffffa,
    OFPPFlood = 0xfffffffb,
    OFPPAll = 0xfffffffc,
    OFPPController = 0xfffffffd,
    OFPPLocal = 0xfffffffe,
    OFPPAny = 0xffffffff,
}

impl PseudoPort {
    /// Decode a port field where `OFPP_ANY` stands for "no port".
    pub(super) fn of_int(p: u32) -> Result<Option<PseudoPort>, OfpSerializationError> {
        if (OfpPort::OFPPAny as u32) == p {
            Ok(None)
        } else {
            PseudoPort::make(p, 0).map(Some)
        }
    }

    pub(super) fn make(p: u32, len: u16) -> Result<PseudoPort, OfpSerializationError> {
        let pp = match p {
            p if p == (OfpPort::OFPPInPort as u32) => PseudoPort::InPort,
            p if p == (OfpPort::OFPPTable as u32) => PseudoPort::Table,
            p if p == (OfpPort::OFPPNormal as u32) => PseudoPort::Normal,
            p if p == (OfpPort::OFPPFlood as u32) => PseudoPort::Flood,
            p if p == (OfpPort::OFPPAll as u32) => PseudoPort::AllPorts,
            p if p == (OfpPort::OFPPController as u32) => PseudoPort::Controller(len),
            p if p == (OfpPort::OFPPLocal as u32) => PseudoPort::Local,
            _ => {
                if p != 0 && p <= (OfpPort::OFPPMax as u32) {
                    PseudoPort::PhysicalPort(p)
                } else {
                    return Err(OfpSerializationError::UnexpectedValue {
                        field: "port",
                        value: p as u64,
                    });
                }
            }
        };
        Ok(pp)
    }

    pub(super) fn to_int(&self) -> Result<u32, OfpSerializationError> {
        let p = match *self {
            PseudoPort::PhysicalPort(0) => {
                return Err(OfpSerializationError::UnexpectedValue { field: "port", value: 0 })
            }
            PseudoPort::PhysicalPort(p) => {
                check_range("port", p as u64, OfpPort::OFPPMax as u64)?;
                p
            }
            PseudoPort::InPort => OfpPort::OFPPInPort as u32,
            PseudoPort::Table => OfpPort::OFPPTable as u32,
            PseudoPort::Normal => OfpPort::OFPPNormal as u32,
            PseudoPort::Flood => OfpPort::OFPPFlood as u32,
            PseudoPort::AllPorts => OfpPort::OFPPAll as u32,
            PseudoPort::Controller(_) => OfpPort::OFPPController as u32,
            PseudoPort::Local => OfpPort::OFPPLocal as u32,
        };
        Ok(p)
    }

    /// Check a raw port number that is either a physical port or a reserved one. Values between
    /// `OFPP_MAX` and the first reserved port are unassigned.
    pub(super) fn check_port_no(field: &'static str, p: u32) -> Result<(), OfpSerializationError> {
        if p > (OfpPort::OFPPMax as u32) && p < (OfpPort::OFPPInPort as u32) {
            return Err(OfpSerializationError::FieldOutOfRange {
                field,
                value: p as u64,
                max: OfpPort::OFPPMax as u64,
            });
        }
        Ok(())
    }

    pub(super) fn marshal(pp: Option<PseudoPort>, bytes: &mut Vec<u8>) -> Result<(), OfpSerializationError> {
        let p = match pp {
            None => OfpPort::OFPPAny as u32,
            Some(pp) => pp.to_int()?,
        };
        bytes.write_u32::<BigEndian>(p)?;
        Ok(())
    }
}

/// Actions associated with flows and packets.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Output(PseudoPort),
    SetVlanVid(u16),
    SetVlanPcp(u8),
    SetDlSrc([u8; 6]),
    SetDlDst([u8; 6]),
    SetNwSrc(u32),
    SetNwDst(u32),
    /// DSCP, six bits.
    SetNwTos(u8),
    SetNwEcn(u8),
    SetTpSrc(u16),
    SetTpDst(u16),
    CopyTtlOut,
    CopyTtlIn,
    SetMplsLabel(u32),
    SetMplsTc(u8),
    SetMplsTtl(u8),
    DecMplsTtl,
    /// Push a VLAN tag with the given ethertype.
    PushVlan(u16),
    PopVlan,
    /// Push an MPLS shim with the given ethertype.
    PushMpls(u16),
    /// Pop the outer MPLS shim, leaving the given ethertype.
    PopMpls(u16),
    SetQueue(u32),
    Group(u32),
    SetNwTtl(u8),
    DecNwTtl,
}

#[repr(packed)]
struct OfpActionHeader(u16, u16, [u8; 4]);

#[repr(packed)]
struct OfpActionOutput(u16, u16, u32, u16, [u8; 6]);

#[repr(packed)]
struct OfpActionDlAddr(u16, u16, [u8; 6], [u8; 6]);

#[repr(u16)]
#[derive(Copy, Clone)]
enum OfpActionType {
    OFPATOutput,
    OFPATSetVlanVid,
    OFPATSetVlanPcp,
    OFPATSetDlSrc,
    OFPATSetDlDst,
    OFPATSetNwSrc,
    OFPATSetNwDst,
    OFPATSetNwTos,
    OFPATSetNwEcn,
    OFPATSetTpSrc,
    OFPATSetTpDst,
    OFPATCopyTtlOut,
    OFPATCopyTtlIn,
    OFPATSetMplsLabel,
    OFPATSetMplsTc,
    OFPATSetMplsTtl,
    OFPATDecMplsTtl,
    OFPATPushVlan,
    OFPATPopVlan,
    OFPATPushMpls,
    OFPATPopMpls,
    OFPATSetQueue,
    OFPATGroup,
    OFPATSetNwTtl,
    OFPATDecNwTtl,
}

impl OfpActionType {
    fn of_int(t: u16) -> Option<OfpActionType> {
        let typ = match t {
            0 => OfpActionType::OFPATOutput,
            1 => OfpActionType::OFPATSetVlanVid,
            2 => OfpActionType::OFPATSetVlanPcp,
            3 => OfpActionType::OFPATSetDlSrc,
            4 => OfpActionType::OFPATSetDlDst,
            5 => OfpActionType::OFPATSetNwSrc,
            6 => OfpActionType::OFPATSetNwDst,
            7 => OfpActionType::OFPATSetNwTos,
            8 => OfpActionType::OFPATSetNwEcn,
            9 => OfpActionType::OFPATSetTpSrc,
            10 => OfpActionType::OFPATSetTpDst,
            11 => OfpActionType::OFPATCopyTtlOut,
            12 => OfpActionType::OFPATCopyTtlIn,
            13 => OfpActionType::OFPATSetMplsLabel,
            14 => OfpActionType::OFPATSetMplsTc,
            15 => OfpActionType::OFPATSetMplsTtl,
            16 => OfpActionType::OFPATDecMplsTtl,
            17 => OfpActionType::OFPATPushVlan,
            18 => OfpActionType::OFPATPopVlan,
            19 => OfpActionType::OFPATPushMpls,
            20 => OfpActionType::OFPATPopMpls,
            21 => OfpActionType::OFPATSetQueue,
            22 => OfpActionType::OFPATGroup,
            23 => OfpActionType::OFPATSetNwTtl,
            24 => OfpActionType::OFPATDecNwTtl,
            _ => return None,
        };
        Some(typ)
    }

    /// Record length every action of this type has on the wire.
    fn size(self) -> usize {
        match self {
            OfpActionType::OFPATOutput => size_of::<OfpActionOutput>(),
            OfpActionType::OFPATSetDlSrc |
            OfpActionType::OFPATSetDlDst => size_of::<OfpActionDlAddr>(),
            _ => size_of::<OfpActionHeader>(),
        }
    }
}

impl Action {
    fn type_code(&self) -> OfpActionType {
        match *self {
            Action::Output(_) => OfpActionType::OFPATOutput,
            Action::SetVlanVid(_) => OfpActionType::OFPATSetVlanVid,
            Action::SetVlanPcp(_) => OfpActionType::OFPATSetVlanPcp,
            Action::SetDlSrc(_) => OfpActionType::OFPATSetDlSrc,
            Action::SetDlDst(_) => OfpActionType::OFPATSetDlDst,
            Action::SetNwSrc(_) => OfpActionType::OFPATSetNwSrc,
            Action::SetNwDst(_) => OfpActionType::OFPATSetNwDst,
            Action::SetNwTos(_) => OfpActionType::OFPATSetNwTos,
            Action::SetNwEcn(_) => OfpActionType::OFPATSetNwEcn,
            Action::SetTpSrc(_) => OfpActionType::OFPATSetTpSrc,
            Action::SetTpDst(_) => OfpActionType::OFPATSetTpDst,
            Action::CopyTtlOut => OfpActionType::OFPATCopyTtlOut,
            Action::CopyTtlIn => OfpActionType::OFPATCopyTtlIn,
            Action::SetMplsLabel(_) => OfpActionType::OFPATSetMplsLabel,
            Action::SetMplsTc(_) => OfpActionType::OFPATSetMplsTc,
            Action::SetMplsTtl(_) => OfpActionType::OFPATSetMplsTtl,
            Action::DecMplsTtl => OfpActionType::OFPATDecMplsTtl,
            Action::PushVlan(_) => OfpActionType::OFPATPushVlan,
            Action::PopVlan => OfpActionType::OFPATPopVlan,
            Action::PushMpls(_) => OfpActionType::OFPATPushMpls,
            Action::PopMpls(_) => OfpActionType::OFPATPopMpls,
            Action::SetQueue(_) => OfpActionType::OFPATSetQueue,
            Action::Group(_) => OfpActionType::OFPATGroup,
            Action::SetNwTtl(_) => OfpActionType::OFPATSetNwTtl,
            Action::DecNwTtl => OfpActionType::OFPATDecNwTtl,
        }
    }

    /// Check that the payload fits the bits the wire gives it.
    pub fn validate(&self) -> Result<(), OfpSerializationError> {
        match *self {
            Action::Output(pp) => pp.to_int().map(|_| ()),
            Action::SetVlanVid(vid) => check_range("set_vlan_vid", vid as u64, 0xfff),
            Action::SetVlanPcp(pcp) => check_range("set_vlan_pcp", pcp as u64, 0x7),
            Action::SetNwTos(tos) => check_range("set_nw_tos", tos as u64, 0x3f),
            Action::SetNwEcn(ecn) => check_range("set_nw_ecn", ecn as u64, 0x3),
            Action::SetMplsLabel(label) => check_range("set_mpls_label", label as u64, 0xfffff),
            Action::SetMplsTc(tc) => check_range("set_mpls_tc", tc as u64, 0x7),
            _ => Ok(()),
        }
    }

    fn size_of_sequence(actions: &[Action]) -> usize {
        actions.iter().fold(0, |acc, x| x.size_of() + acc)
    }
}

impl MessageType for Action {
    fn size_of(&self) -> usize {
        self.type_code().size()
    }

    fn parse(bytes: &mut Cursor<&[u8]>) -> Result<Action, OfpSerializationError> {
        need(bytes, size_of::<OfpActionHeader>(), "action")?;
        let action_code = bytes.read_u16::<BigEndian>()?;
        let len = bytes.read_u16::<BigEndian>()? as usize;
        let typ = OfpActionType::of_int(action_code).ok_or(OfpSerializationError::UnexpectedValue {
            field: "action.type",
            value: action_code as u64,
        })?;
        if len != typ.size() {
            return Err(OfpSerializationError::UnexpectedValue {
                field: "action.len",
                value: len as u64,
            });
        }
        need(bytes, len - 4, "action")?;
        let action = match typ {
            OfpActionType::OFPATOutput => {
                let port_code = bytes.read_u32::<BigEndian>()?;
                let max_len = bytes.read_u16::<BigEndian>()?;
                bytes.consume(6);
                Action::Output(PseudoPort::make(port_code, max_len)?)
            }
            OfpActionType::OFPATSetVlanVid => {
                let vid = bytes.read_u16::<BigEndian>()?;
                bytes.consume(2);
                Action::SetVlanVid(vid)
            }
            OfpActionType::OFPATSetVlanPcp => {
                let pcp = bytes.read_u8()?;
                bytes.consume(3);
                Action::SetVlanPcp(pcp)
            }
            OfpActionType::OFPATSetDlSrc | OfpActionType::OFPATSetDlDst => {
                let mut addr = [0; 6];
                bytes.read_exact(&mut addr)?;
                bytes.consume(6);
                match typ {
                    OfpActionType::OFPATSetDlSrc => Action::SetDlSrc(addr),
                    _ => Action::SetDlDst(addr),
                }
            }
            OfpActionType::OFPATSetNwSrc => Action::SetNwSrc(bytes.read_u32::<BigEndian>()?),
            OfpActionType::OFPATSetNwDst => Action::SetNwDst(bytes.read_u32::<BigEndian>()?),
            OfpActionType::OFPATSetNwTos => {
                let tos = bytes.read_u8()?;
                bytes.consume(3);
                Action::SetNwTos(tos)
            }
            OfpActionType::OFPATSetNwEcn => {
                let ecn = bytes.read_u8()?;
                bytes.consume(3);
                Action::SetNwEcn(ecn)
            }
            OfpActionType::OFPATSetTpSrc => {
                let port = bytes.read_u16::<BigEndian>()?;
                bytes.consume(2);
                Action::SetTpSrc(port)
            }
            OfpActionType::OFPATSetTpDst => {
                let port = bytes.read_u16::<BigEndian>()?;
                bytes.consume(2);
                Action::SetTpDst(port)
            }
            OfpActionType::OFPATCopyTtlOut => {
                bytes.consume(4);
                Action::CopyTtlOut
            }
            OfpActionType::OFPATCopyTtlIn => {
                bytes.consume(4);
                Action::CopyTtlIn
            }
            OfpActionType::OFPATSetMplsLabel => {
                Action::SetMplsLabel(bytes.read_u32::<BigEndian>()?)
            }
            OfpActionType::OFPATSetMplsTc => {
                let tc = bytes.read_u8()?;
                bytes.consume(3);
                Action::SetMplsTc(tc)
            }
            OfpActionType::OFPATSetMplsTtl => {
                let ttl = bytes.read_u8()?;
                bytes.consume(3);
                Action::SetMplsTtl(ttl)
            }
            OfpActionType::OFPATDecMplsTtl => {
                bytes.consume(4);
                Action::DecMplsTtl
            }
            OfpActionType::OFPATPushVlan => {
                let ethertype = bytes.read_u16::<BigEndian>()?;
                bytes.consume(2);
                Action::PushVlan(ethertype)
            }
            OfpActionType::OFPATPopVlan => {
                bytes.consume(4);
                Action::PopVlan
            }
            OfpActionType::OFPATPushMpls => {
                let ethertype = bytes.read_u16::<BigEndian>()?;
                bytes.consume(2);
                Action::PushMpls(ethertype)
            }
            OfpActionType::OFPATPopMpls => {
                let ethertype = bytes.read_u16::<BigEndian>()?;
                bytes.consume(2);
                Action::PopMpls(ethertype)
            }
            OfpActionType::OFPATSetQueue => Action::SetQueue(bytes.read_u32::<BigEndian>()?),
            OfpActionType::OFPATGroup => Action::Group(bytes.read_u32::<BigEndian>()?),
            OfpActionType::OFPATSetNwTtl => {
                let ttl = bytes.read_u8()?;
                bytes.consume(3);
                Action::SetNwTtl(ttl)
            }
            OfpActionType::OFPATDecNwTtl => {
                bytes.consume(4);
                Action::DecNwTtl
            }
        };
        Ok(action)
    }

    fn marshal(&self, bytes: &mut Vec<u8>) -> Result<(), OfpSerializationError> {
        self.validate()?;
        bytes.write_u16::<BigEndian>(self.type_code() as u16)?;
        bytes.write_u16::<BigEndian>(self.size_of() as u16)?;
        match *self {
            Action::Output(pp) => {
                PseudoPort::marshal(Some(pp), bytes)?;
                bytes.write_u16::<BigEndian>(match pp {
                    PseudoPort::Controller(w) => w,
                    _ => 0,
                })?;
                pad(bytes, 6)?;
            }
            Action::SetVlanVid(vid) => {
                bytes.write_u16::<BigEndian>(vid)?;
                pad(bytes, 2)?;
            }
            Action::SetVlanPcp(v) |
            Action::SetNwTos(v) |
            Action::SetNwEcn(v) |
            Action::SetMplsTc(v) |
            Action::SetMplsTtl(v) |
            Action::SetNwTtl(v) => {
                bytes.write_u8(v)?;
                pad(bytes, 3)?;
            }
            Action::SetDlSrc(addr) | Action::SetDlDst(addr) => {
                bytes.extend_from_slice(&addr);
                pad(bytes, 6)?;
            }
            Action::SetNwSrc(v) |
            Action::SetNwDst(v) |
            Action::SetMplsLabel(v) |
            Action::SetQueue(v) |
            Action::Group(v) => bytes.write_u32::<BigEndian>(v)?,
            Action::SetTpSrc(v) |
            Action::SetTpDst(v) |
            Action::PushVlan(v) |
            Action::PushMpls(v) |
            Action::PopMpls(v) => {
                bytes.write_u16::<BigEndian>(v)?;
                pad(bytes, 2)?;
            }
            Action::CopyTtlOut |
            Action::CopyTtlIn |
            Action::DecMplsTtl |
            Action::PopVlan |
            Action::DecNwTtl => pad(bytes, 4)?,
        }
        Ok(())
    }
}

/// An ordered sequence of actions. Insertion order is the order they are marshaled and applied in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionList {
    actions: Vec<Action>,
}

impl ActionList {
    pub fn new() -> ActionList {
        ActionList::default()
    }

    /// Append `act`, or refuse it and leave the list untouched.
    ///
    /// Output to `Table` is refused since it is only meaningful for packet-out, as are actions
    /// whose payload does not fit the wire.
    pub fn add(&mut self, act: Action) -> Result<(), OfpSerializationError> {
        if let Action::Output(PseudoPort::Table) = act {
            warn!("refusing action {:?}: OFPP_TABLE not allowed in installed flow", act);
            return Err(OfpSerializationError::Rejected("OFPP_TABLE not allowed in installed flow"
                .to_string()));
        }
        if let Err(e) = act.validate() {
            warn!("refusing action {:?}: {}", act, e);
            return Err(OfpSerializationError::Rejected(format!("action {:?}: {}", act, e)));
        }
        self.actions.push(act);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Action> {
        self.actions.iter()
    }

    /// Return the byte-size of every action in the list.
    pub fn size_of(&self) -> usize {
        Action::size_of_sequence(&self.actions)
    }

    pub(super) fn marshal(&self, bytes: &mut Vec<u8>) -> Result<(), OfpSerializationError> {
        for act in &self.actions {
            act.marshal(bytes)?;
        }
        Ok(())
    }

    /// Parse actions until `len` bytes have been consumed.
    pub(super) fn parse(bytes: &mut Cursor<&[u8]>, len: usize) -> Result<ActionList, OfpSerializationError> {
        let mut region = Cursor::new(take(bytes, len, "action list")?);
        let mut actions = ActionList::new();
        while remaining(&region) > 0 {
            actions.add(Action::parse(&mut region)?)?;
        }
        Ok(actions)
    }
}

impl<'a> IntoIterator for &'a ActionList {
    type Item = &'a Action;
    type IntoIter = slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn output_action_is_16_bytes() {
        let act = Action::Output(PseudoPort::PhysicalPort(3));
        assert_eq!(act.size_of(), 16);
        assert_eq!(act.pack().unwrap(),
                   vec![0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn output_to_controller_carries_max_len() {
        let bytes = Action::Output(PseudoPort::Controller(128)).pack().unwrap();
        assert_eq!(&bytes[4..10], &[0xff, 0xff, 0xff, 0xfd, 0x00, 0x80]);
    }

    #[test]
    fn every_action_packs_to_its_size() {
        let actions = [Action::Output(PseudoPort::Flood),
                       Action::SetVlanVid(100),
                       Action::SetVlanPcp(3),
                       Action::SetDlSrc([1, 2, 3, 4, 5, 6]),
                       Action::SetDlDst([6, 5, 4, 3, 2, 1]),
                       Action::SetNwSrc(0x0a000001),
                       Action::SetNwDst(0x0a000002),
                       Action::SetNwTos(0x2e),
                       Action::SetNwEcn(1),
                       Action::SetTpSrc(1234),
                       Action::SetTpDst(80),
                       Action::CopyTtlOut,
                       Action::CopyTtlIn,
                       Action::SetMplsLabel(0xabcde),
                       Action::SetMplsTc(2),
                       Action::SetMplsTtl(64),
                       Action::DecMplsTtl,
                       Action::PushVlan(0x8100),
                       Action::PopVlan,
                       Action::PushMpls(0x8847),
                       Action::PopMpls(0x0800),
                       Action::SetQueue(7),
                       Action::Group(9),
                       Action::SetNwTtl(32),
                       Action::DecNwTtl];
        for act in actions.iter() {
            let bytes = act.pack().unwrap();
            assert_eq!(bytes.len(), act.size_of());
            assert_eq!(bytes.len() % 8, 0);
            assert_eq!(Action::unpack(&bytes).unwrap(), *act);
        }
    }

    #[test]
    fn physical_port_above_max_fails_to_encode() {
        let act = Action::Output(PseudoPort::PhysicalPort(0xffffff01));
        match act.pack() {
            Err(OfpSerializationError::FieldOutOfRange { field: "port", .. }) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn physical_port_zero_is_refused() {
        match Action::Output(PseudoPort::PhysicalPort(0)).pack() {
            Err(OfpSerializationError::UnexpectedValue { field: "port", value: 0 }) => (),
            other => panic!("unexpected {:?}", other),
        }
        let mut bytes = Action::Output(PseudoPort::PhysicalPort(1)).pack().unwrap();
        bytes[7] = 0;
        assert!(Action::unpack(&bytes).is_err());
    }

    #[test]
    fn unassigned_port_numbers_are_refused() {
        assert!(PseudoPort::check_port_no("port", 0xffffff01).is_err());
        assert!(PseudoPort::check_port_no("port", 0xfffffff7).is_err());
        assert!(PseudoPort::check_port_no("port", 0xffffff00).is_ok());
        assert!(PseudoPort::check_port_no("port", 0xfffffff8).is_ok());
        assert!(PseudoPort::check_port_no("port", 0).is_ok());
    }

    #[test]
    fn add_accepts_valid_actions_in_order() {
        let mut actions = ActionList::new();
        assert!(actions.add(Action::SetVlanVid(10)).is_ok());
        assert!(actions.add(Action::Output(PseudoPort::PhysicalPort(3))).is_ok());
        assert_eq!(actions.len(), 2);
        assert_eq!(actions.size_of(), 24);
        let order: Vec<Action> = actions.iter().cloned().collect();
        assert_eq!(order,
                   vec![Action::SetVlanVid(10), Action::Output(PseudoPort::PhysicalPort(3))]);
    }

    #[test]
    fn add_rejects_without_mutating() {
        let mut actions = ActionList::new();
        actions.add(Action::Output(PseudoPort::PhysicalPort(1))).unwrap();
        let before = actions.clone();

        assert!(actions.add(Action::Output(PseudoPort::Table)).is_err());
        assert!(actions.add(Action::SetVlanVid(0x1000)).is_err());
        match actions.add(Action::Output(PseudoPort::PhysicalPort(0xffffff10))) {
            Err(OfpSerializationError::Rejected(_)) => (),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(actions, before);
    }

    #[test]
    fn parse_rejects_unknown_type_and_bad_length() {
        let mut bytes = Action::DecNwTtl.pack().unwrap();
        bytes[1] = 0x40;
        assert!(Action::unpack(&bytes).is_err());

        let mut bytes = Action::Output(PseudoPort::Local).pack().unwrap();
        bytes[3] = 8;
        assert!(Action::unpack(&bytes).is_err());
    }

    #[test]
    fn parse_sequence_reads_all_actions() {
        let mut actions = ActionList::new();
        actions.add(Action::SetDlDst([0xaa; 6])).unwrap();
        actions.add(Action::Output(PseudoPort::Normal)).unwrap();
        let mut bytes = vec![];
        actions.marshal(&mut bytes).unwrap();
        let mut cursor = Cursor::new(&bytes[..]);
        let parsed = ActionList::parse(&mut cursor, bytes.len()).unwrap();
        assert_eq!(parsed, actions);
    }

    #[test]
    fn parse_sequence_refuses_output_to_table() {
        let mut bytes = Action::Output(PseudoPort::Normal).pack().unwrap();
        bytes.extend(Action::Output(PseudoPort::Table).pack().unwrap());
        let mut cursor = Cursor::new(&bytes[..]);
        match ActionList::parse(&mut cursor, bytes.len()) {
            Err(OfpSerializationError::Rejected(_)) => (),
            other => panic!("unexpected {:?}", other),
        }
    }
}
