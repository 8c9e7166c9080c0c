//! Stable, serializable references to instructions and operand uses.
//!
//! A descriptor never holds a position in the module. It names an anchor (a
//! block label or a result id), an opcode and a number of same-opcode
//! instructions to skip, and is resolved against the live module whenever it
//! is used. Resolution is total: anything that cannot be found is `None`.

use crate::instruction::{Id, Opcode, Operand};
use crate::module::{InstructionRef, Location, Module};
use serde::{Deserialize, Serialize};

/// Names an instruction in a function body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstructionDescriptor {
    /// A block label (search starts at the first instruction of that block) or
    /// the result id of an instruction (search starts at that instruction)
    pub base_instruction_result_id: Id,
    pub target_instruction_opcode: Opcode,
    /// Instructions with the target opcode to skip, counted from the anchor
    pub num_opcodes_to_ignore: u32,
}

impl InstructionDescriptor {
    pub fn new(base: Id, opcode: Opcode, num_opcodes_to_ignore: u32) -> Self {
        Self {
            base_instruction_result_id: base,
            target_instruction_opcode: opcode,
            num_opcodes_to_ignore,
        }
    }

    /// The canonical descriptor of the instruction at `at`: anchored at the
    /// nearest result-bearing instruction at or before it, or else at the block
    /// label, so the skip count never spans a result-bearing instruction.
    pub fn for_instruction(module: &Module, at: InstructionRef) -> Option<Self> {
        let block = module.block(at.block_ref())?;
        let target = block.instructions.get(at.index)?;
        let opcode = target.opcode;

        if let Some(result) = target.result_id {
            return Some(Self::new(result, opcode, 0));
        }

        let mut skip = 0;
        for inst in block.instructions[..at.index].iter().rev() {
            if inst.opcode == opcode {
                skip += 1;
            }
            if let Some(result) = inst.result_id {
                return Some(Self::new(result, opcode, skip));
            }
        }
        Some(Self::new(block.label, opcode, skip))
    }

    /// Resolve to a live instruction handle
    pub fn resolve(&self, module: &Module) -> Option<InstructionRef> {
        let (block_ref, start) = match module.def_location(self.base_instruction_result_id)? {
            Location::Label(block) => (block, 0),
            Location::Body(at) => (at.block_ref(), at.index),
            _ => return None,
        };
        let block = module.block(block_ref)?;

        block.instructions[start..]
            .iter()
            .enumerate()
            .filter(|(_, inst)| inst.opcode == self.target_instruction_opcode)
            .nth(self.num_opcodes_to_ignore as usize)
            .map(|(offset, _)| InstructionRef {
                function: block_ref.function,
                block: block_ref.block,
                index: start + offset,
            })
    }
}

/// Names one id operand of one instruction in a function body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdUseDescriptor {
    /// The id expected in the operand slot; resolution fails if it differs
    pub id_of_interest: Id,
    pub enclosing_instruction: InstructionDescriptor,
    /// Index among the input operands (result type and result id excluded)
    pub in_operand_index: u32,
}

impl IdUseDescriptor {
    pub fn new(id_of_interest: Id, enclosing_instruction: InstructionDescriptor, in_operand_index: u32) -> Self {
        Self {
            id_of_interest,
            enclosing_instruction,
            in_operand_index,
        }
    }

    /// Describe operand `operand_index` of the instruction at `at`
    pub fn for_use(module: &Module, at: InstructionRef, operand_index: usize) -> Option<Self> {
        let id = module.get_instruction(at)?.id_operand(operand_index)?;
        Some(Self::new(
            id,
            InstructionDescriptor::for_instruction(module, at)?,
            u32::try_from(operand_index).ok()?,
        ))
    }

    /// Resolve to the using instruction, checking the slot still holds the id of interest
    pub fn resolve(&self, module: &Module) -> Option<InstructionRef> {
        let at = self.enclosing_instruction.resolve(module)?;
        let inst = module.get_instruction(at)?;
        match inst.operands.get(self.in_operand_index as usize)? {
            Operand::Id(id) if *id == self.id_of_interest => Some(at),
            _ => None,
        }
    }
}
