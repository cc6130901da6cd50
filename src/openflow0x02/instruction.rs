use std::io::{BufRead, Cursor};
use std::mem::size_of;
use std::slice;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::warn;

use super::{need, pad, remaining, take, write_length, ActionList, MessageType};
use crate::ofp_message::OfpSerializationError;

/// Table id standing for "all tables"; never a valid goto target.
const OFPTT_ALL: u8 = 0xff;

/// What to do with the packets of a flow once it is matched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Continue matching in a later table.
    GotoTable(u8),
    /// Overwrite the bits of the packet metadata selected by `mask`.
    WriteMetadata { metadata: u64, mask: u64 },
    /// Merge these actions into the packet's action set.
    WriteActions(ActionList),
    /// Apply these actions immediately, in order.
    ApplyActions(ActionList),
    /// Empty the packet's action set.
    ClearActions,
}

#[repr(packed)]
struct OfpInstructionGotoTable(u16, u16, u8, [u8; 3]);

#[repr(packed)]
struct OfpInstructionWriteMetadata(u16, u16, [u8; 4], u64, u64);

#[repr(packed)]
struct OfpInstructionActions(u16, u16, [u8; 4]);

#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum OfpInstructionType {
    OFPITGotoTable = 1,
    OFPITWriteMetadata = 2,
    OFPITWriteActions = 3,
    OFPITApplyActions = 4,
    OFPITClearActions = 5,
}

impl Instruction {
    /// An apply-actions instruction with no actions yet.
    pub fn apply_actions() -> Instruction {
        Instruction::ApplyActions(ActionList::new())
    }

    /// A write-actions instruction with no actions yet.
    pub fn write_actions() -> Instruction {
        Instruction::WriteActions(ActionList::new())
    }

    /// The action list of an apply-actions or write-actions instruction.
    pub fn actions_mut(&mut self) -> Option<&mut ActionList> {
        match *self {
            Instruction::WriteActions(ref mut acts) |
            Instruction::ApplyActions(ref mut acts) => Some(acts),
            _ => None,
        }
    }

    fn type_code(&self) -> OfpInstructionType {
        match *self {
            Instruction::GotoTable(_) => OfpInstructionType::OFPITGotoTable,
            Instruction::WriteMetadata { .. } => OfpInstructionType::OFPITWriteMetadata,
            Instruction::WriteActions(_) => OfpInstructionType::OFPITWriteActions,
            Instruction::ApplyActions(_) => OfpInstructionType::OFPITApplyActions,
            Instruction::ClearActions => OfpInstructionType::OFPITClearActions,
        }
    }
}

impl MessageType for Instruction {
    fn size_of(&self) -> usize {
        match *self {
            Instruction::GotoTable(_) => size_of::<OfpInstructionGotoTable>(),
            Instruction::WriteMetadata { .. } => size_of::<OfpInstructionWriteMetadata>(),
            Instruction::WriteActions(ref acts) |
            Instruction::ApplyActions(ref acts) => size_of::<OfpInstructionActions>() + acts.size_of(),
            Instruction::ClearActions => size_of::<OfpInstructionActions>(),
        }
    }

    fn parse(bytes: &mut Cursor<&[u8]>) -> Result<Instruction, OfpSerializationError> {
        need(bytes, 4, "instruction")?;
        let typ = bytes.read_u16::<BigEndian>()?;
        let len = bytes.read_u16::<BigEndian>()? as usize;
        let expect_len = |fixed: usize| if len == fixed {
            Ok(())
        } else {
            Err(OfpSerializationError::UnexpectedValue {
                field: "instruction.len",
                value: len as u64,
            })
        };
        let inst = match typ {
            t if t == OfpInstructionType::OFPITGotoTable as u16 => {
                expect_len(size_of::<OfpInstructionGotoTable>())?;
                need(bytes, 4, "goto_table instruction")?;
                let table_id = bytes.read_u8()?;
                bytes.consume(3);
                Instruction::GotoTable(table_id)
            }
            t if t == OfpInstructionType::OFPITWriteMetadata as u16 => {
                expect_len(size_of::<OfpInstructionWriteMetadata>())?;
                need(bytes, 20, "write_metadata instruction")?;
                bytes.consume(4);
                let metadata = bytes.read_u64::<BigEndian>()?;
                let mask = bytes.read_u64::<BigEndian>()?;
                Instruction::WriteMetadata { metadata, mask }
            }
            t if t == OfpInstructionType::OFPITWriteActions as u16 ||
                 t == OfpInstructionType::OFPITApplyActions as u16 => {
                let header = size_of::<OfpInstructionActions>();
                if len < header {
                    return Err(OfpSerializationError::UnexpectedValue {
                        field: "instruction.len",
                        value: len as u64,
                    });
                }
                need(bytes, len - 4, "actions instruction")?;
                bytes.consume(4);
                let acts = ActionList::parse(bytes, len - header)?;
                if t == OfpInstructionType::OFPITWriteActions as u16 {
                    Instruction::WriteActions(acts)
                } else {
                    Instruction::ApplyActions(acts)
                }
            }
            t if t == OfpInstructionType::OFPITClearActions as u16 => {
                expect_len(size_of::<OfpInstructionActions>())?;
                need(bytes, 4, "clear_actions instruction")?;
                bytes.consume(4);
                Instruction::ClearActions
            }
            t => {
                return Err(OfpSerializationError::UnexpectedValue {
                    field: "instruction.type",
                    value: t as u64,
                })
            }
        };
        Ok(inst)
    }

    fn marshal(&self, bytes: &mut Vec<u8>) -> Result<(), OfpSerializationError> {
        bytes.write_u16::<BigEndian>(self.type_code() as u16)?;
        write_length(bytes, "instruction", self.size_of())?;
        match *self {
            Instruction::GotoTable(table_id) => {
                bytes.write_u8(table_id)?;
                pad(bytes, 3)?;
            }
            Instruction::WriteMetadata { metadata, mask } => {
                pad(bytes, 4)?;
                bytes.write_u64::<BigEndian>(metadata)?;
                bytes.write_u64::<BigEndian>(mask)?;
            }
            Instruction::WriteActions(ref acts) |
            Instruction::ApplyActions(ref acts) => {
                pad(bytes, 4)?;
                acts.marshal(bytes)?;
            }
            Instruction::ClearActions => pad(bytes, 4)?,
        }
        Ok(())
    }
}

/// The instructions of a flow entry, in the order they were added. Holds at most one
/// instruction of each type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstructionList {
    instructions: Vec<Instruction>,
}

impl InstructionList {
    pub fn new() -> InstructionList {
        InstructionList::default()
    }

    /// Append `inst`, or refuse it and leave the list untouched.
    pub fn add(&mut self, inst: Instruction) -> Result<(), OfpSerializationError> {
        let typ = inst.type_code();
        if self.instructions.iter().any(|i| i.type_code() == typ) {
            warn!("refusing instruction {:?}: {:?} already present", inst, typ);
            return Err(OfpSerializationError::Rejected(format!("duplicate instruction {:?}", typ)));
        }
        if let Instruction::GotoTable(OFPTT_ALL) = inst {
            warn!("refusing instruction {:?}: not a table", inst);
            return Err(OfpSerializationError::Rejected("goto_table to OFPTT_ALL".to_string()));
        }
        self.instructions.push(inst);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// Return the byte-size of every instruction in the list.
    pub fn size_of(&self) -> usize {
        self.instructions.iter().map(|i| i.size_of()).sum()
    }

    pub(super) fn marshal(&self, bytes: &mut Vec<u8>) -> Result<(), OfpSerializationError> {
        for inst in &self.instructions {
            inst.marshal(bytes)?;
        }
        Ok(())
    }

    /// Parse instructions until `len` bytes have been consumed.
    pub(super) fn parse(bytes: &mut Cursor<&[u8]>, len: usize) -> Result<InstructionList, OfpSerializationError> {
        let mut region = Cursor::new(take(bytes, len, "instruction list")?);
        let mut instructions = InstructionList::new();
        while remaining(&region) > 0 {
            instructions.add(Instruction::parse(&mut region)?)?;
        }
        Ok(instructions)
    }
}

impl<'a> IntoIterator for &'a InstructionList {
    type Item = &'a Instruction;
    type IntoIter = slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}
