use super::{insertion_point, reject, Transform, NOT_APPLICABLE};
use crate::data_descriptor::DataDescriptor;
use crate::fact_manager::FactManager;
use crate::legality::{can_insert_before, id_is_available_before, is_value};
use irfuzz_ir::{Id, Instruction, InstructionDescriptor, Module, Opcode};
use serde::{Deserialize, Serialize};

/// Make a fresh copy of a value: `%fresh = CopyObject %object`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyObject {
    pub object: Id,
    pub instruction_to_insert_before: InstructionDescriptor,
    pub fresh_id: Id,
}

impl CopyObject {
    pub fn new(object: Id, instruction_to_insert_before: InstructionDescriptor, fresh_id: Id) -> Self {
        Self {
            object,
            instruction_to_insert_before,
            fresh_id,
        }
    }
}

impl Transform for CopyObject {
    const NAME: &'static str = "CopyObject";

    fn is_applicable(&self, module: &Module, _facts: &FactManager) -> bool {
        if !module.is_fresh_id(self.fresh_id) {
            return reject(Self::NAME, "fresh id is already in use");
        }
        if !is_value(module, self.object) {
            return reject(Self::NAME, "object is not a value");
        }
        if module.get_def(self.object).map(|def| def.opcode) == Some(Opcode::Undef) {
            return reject(Self::NAME, "undefined values are not copied");
        }
        let Some(at) = self.instruction_to_insert_before.resolve(module) else {
            return reject(Self::NAME, "insertion point not found");
        };
        if !can_insert_before(module, Opcode::CopyObject, at) {
            return reject(Self::NAME, "cannot insert before the target instruction");
        }
        if !id_is_available_before(module, self.object, at) {
            return reject(Self::NAME, "object is not available at the insertion point");
        }
        true
    }

    fn apply(&self, module: &mut Module, facts: &mut FactManager) {
        let at = insertion_point(module, &self.instruction_to_insert_before);
        let type_id = module.type_of_id(self.object).expect(NOT_APPLICABLE);
        module.insert_before(at, Instruction::copy_object(self.fresh_id, type_id, self.object));
        facts.add_synonym(
            module,
            DataDescriptor::whole(self.fresh_id),
            DataDescriptor::whole(self.object),
        );
    }
}
