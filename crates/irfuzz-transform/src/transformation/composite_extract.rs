use super::{insertion_point, reject, Transform};
use crate::data_descriptor::DataDescriptor;
use crate::fact_manager::FactManager;
use crate::legality::{can_insert_before, id_is_available_before, is_value};
use irfuzz_ir::{Id, Instruction, InstructionDescriptor, Module, Opcode, Operand};
use serde::{Deserialize, Serialize};

/// Read a nested component out of a composite:
/// `%fresh = CompositeExtract %composite i0 i1 ...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeExtract {
    pub instruction_to_insert_before: InstructionDescriptor,
    pub fresh_id: Id,
    pub composite_id: Id,
    pub index: Vec<u32>,
}

impl CompositeExtract {
    pub fn new(
        instruction_to_insert_before: InstructionDescriptor,
        fresh_id: Id,
        composite_id: Id,
        index: Vec<u32>,
    ) -> Self {
        Self {
            instruction_to_insert_before,
            fresh_id,
            composite_id,
            index,
        }
    }

    fn result_type(&self, module: &Module) -> Option<Id> {
        DataDescriptor::new(self.composite_id, self.index.clone()).type_id(module)
    }
}

impl Transform for CompositeExtract {
    const NAME: &'static str = "CompositeExtract";

    fn is_applicable(&self, module: &Module, _facts: &FactManager) -> bool {
        if !module.is_fresh_id(self.fresh_id) {
            return reject(Self::NAME, "fresh id is already in use");
        }
        let Some(at) = self.instruction_to_insert_before.resolve(module) else {
            return reject(Self::NAME, "insertion point not found");
        };
        if !can_insert_before(module, Opcode::CompositeExtract, at) {
            return reject(Self::NAME, "cannot insert before the target instruction");
        }
        if !is_value(module, self.composite_id) {
            return reject(Self::NAME, "composite is not a value");
        }
        if self.index.is_empty() || self.result_type(module).is_none() {
            return reject(Self::NAME, "index path does not lead into the composite");
        }
        if !id_is_available_before(module, self.composite_id, at) {
            return reject(Self::NAME, "composite is not available at the insertion point");
        }
        true
    }

    fn apply(&self, module: &mut Module, facts: &mut FactManager) {
        let at = insertion_point(module, &self.instruction_to_insert_before);
        let result_type = self.result_type(module).expect(super::NOT_APPLICABLE);

        module.insert_before(
            at,
            Instruction::new(Opcode::CompositeExtract)
                .with_result(self.fresh_id)
                .with_type(result_type)
                .with_operand(Operand::Id(self.composite_id))
                .with_literals(self.index.iter().copied()),
        );

        facts.add_synonym(
            module,
            DataDescriptor::whole(self.fresh_id),
            DataDescriptor::new(self.composite_id, self.index.clone()),
        );
    }
}
