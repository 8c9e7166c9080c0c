use super::{insertion_point, reject, Transform, NOT_APPLICABLE};
use crate::data_descriptor::DataDescriptor;
use crate::fact_manager::FactManager;
use crate::legality::{can_insert_before, id_is_available_before, is_value};
use irfuzz_ir::{Id, Instruction, InstructionDescriptor, Module, Opcode, Operand};
use serde::{Deserialize, Serialize};

/// Copy a composite with one nested component replaced:
/// `%fresh = CompositeInsert %object %composite i0 i1 ...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeInsert {
    pub instruction_to_insert_before: InstructionDescriptor,
    pub fresh_id: Id,
    pub composite_id: Id,
    pub object_id: Id,
    pub index: Vec<u32>,
}

impl CompositeInsert {
    pub fn new(
        instruction_to_insert_before: InstructionDescriptor,
        fresh_id: Id,
        composite_id: Id,
        object_id: Id,
        index: Vec<u32>,
    ) -> Self {
        Self {
            instruction_to_insert_before,
            fresh_id,
            composite_id,
            object_id,
            index,
        }
    }
}

impl Transform for CompositeInsert {
    const NAME: &'static str = "CompositeInsert";

    fn is_applicable(&self, module: &Module, _facts: &FactManager) -> bool {
        if !module.is_fresh_id(self.fresh_id) {
            return reject(Self::NAME, "fresh id is already in use");
        }
        let Some(at) = self.instruction_to_insert_before.resolve(module) else {
            return reject(Self::NAME, "insertion point not found");
        };
        if !can_insert_before(module, Opcode::CompositeInsert, at) {
            return reject(Self::NAME, "cannot insert before the target instruction");
        }
        if !is_value(module, self.composite_id) || !is_value(module, self.object_id) {
            return reject(Self::NAME, "an operand is not a value");
        }
        if self.index.is_empty() {
            return reject(Self::NAME, "empty index path");
        }
        let slot_type = DataDescriptor::new(self.composite_id, self.index.clone()).type_id(module);
        if slot_type.is_none() {
            return reject(Self::NAME, "index path does not lead into the composite");
        }
        if module.type_of_id(self.object_id) != slot_type {
            return reject(Self::NAME, "object type does not match the replaced component");
        }
        if !id_is_available_before(module, self.composite_id, at)
            || !id_is_available_before(module, self.object_id, at)
        {
            return reject(Self::NAME, "an operand is not available at the insertion point");
        }
        true
    }

    fn apply(&self, module: &mut Module, facts: &mut FactManager) {
        let at = insertion_point(module, &self.instruction_to_insert_before);
        let composite_type = module.type_of_id(self.composite_id).expect(NOT_APPLICABLE);
        module.insert_before(
            at,
            Instruction::new(Opcode::CompositeInsert)
                .with_result(self.fresh_id)
                .with_type(composite_type)
                .with_operand(Operand::Id(self.object_id))
                .with_operand(Operand::Id(self.composite_id))
                .with_literals(self.index.iter().copied()),
        );

        // Every component off the replaced path is unchanged, at each level
        let fresh = DataDescriptor::whole(self.fresh_id);
        let original = DataDescriptor::whole(self.composite_id);
        let (mut fresh_level, mut original_level) = (fresh, original);
        for &taken in &self.index {
            let level_type = original_level.type_id(module).expect(NOT_APPLICABLE);
            let width = module.composite_len(level_type).expect(NOT_APPLICABLE);
            for sibling in (0..width).filter(|&i| i != taken) {
                facts.add_synonym(module, fresh_level.child(sibling), original_level.child(sibling));
            }
            fresh_level = fresh_level.child(taken);
            original_level = original_level.child(taken);
        }

        facts.add_synonym(module, fresh_level, DataDescriptor::whole(self.object_id));
    }
}
