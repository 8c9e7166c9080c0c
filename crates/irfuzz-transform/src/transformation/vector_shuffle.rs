use super::{insertion_point, reject, Transform, NOT_APPLICABLE};
use crate::data_descriptor::DataDescriptor;
use crate::fact_manager::FactManager;
use crate::legality::{can_insert_before, id_is_available_before, is_value};
use irfuzz_ir::{Id, Instruction, InstructionDescriptor, Module, Opcode, Operand, Type};
use serde::{Deserialize, Serialize};

/// Selector meaning "no particular component"
pub const UNDEFINED_COMPONENT: u32 = 0xFFFF_FFFF;

/// Select components from two vectors into a new vector:
/// `%fresh = VectorShuffle %vector1 %vector2 s0 s1 ...`
///
/// A selector below the width of `vector1` picks from it; larger selectors
/// pick from `vector2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorShuffle {
    pub instruction_to_insert_before: InstructionDescriptor,
    pub fresh_id: Id,
    pub vector1: Id,
    pub vector2: Id,
    pub component: Vec<u32>,
}

impl VectorShuffle {
    pub fn new(
        instruction_to_insert_before: InstructionDescriptor,
        fresh_id: Id,
        vector1: Id,
        vector2: Id,
        component: Vec<u32>,
    ) -> Self {
        Self {
            instruction_to_insert_before,
            fresh_id,
            vector1,
            vector2,
            component,
        }
    }

    /// Component type and width of each input, if both are vectors of the same component type
    fn input_shapes(&self, module: &Module) -> Option<(Id, u32, u32)> {
        let Type::Vector {
            component: c1,
            count: n1,
        } = module.value_type(self.vector1)?
        else {
            return None;
        };
        let Type::Vector {
            component: c2,
            count: n2,
        } = module.value_type(self.vector2)?
        else {
            return None;
        };
        (c1 == c2).then_some((c1, n1, n2))
    }

    fn result_type(&self, module: &Module, component: Id) -> Option<Id> {
        module.find_type(&Type::Vector {
            component,
            count: u32::try_from(self.component.len()).ok()?,
        })
    }
}

impl Transform for VectorShuffle {
    const NAME: &'static str = "VectorShuffle";

    fn is_applicable(&self, module: &Module, _facts: &FactManager) -> bool {
        if !module.is_fresh_id(self.fresh_id) {
            return reject(Self::NAME, "fresh id is already in use");
        }
        let Some(at) = self.instruction_to_insert_before.resolve(module) else {
            return reject(Self::NAME, "insertion point not found");
        };
        if !can_insert_before(module, Opcode::VectorShuffle, at) {
            return reject(Self::NAME, "cannot insert before the target instruction");
        }
        if !is_value(module, self.vector1) || !is_value(module, self.vector2) {
            return reject(Self::NAME, "an input is not a value");
        }
        let Some((component, n1, n2)) = self.input_shapes(module) else {
            return reject(Self::NAME, "inputs are not vectors of the same component type");
        };
        let total = n1 + n2;
        if self
            .component
            .iter()
            .any(|&s| s != UNDEFINED_COMPONENT && s >= total)
        {
            return reject(Self::NAME, "selector out of range");
        }
        if self.result_type(module, component).is_none() {
            return reject(Self::NAME, "no vector type of the result width");
        }
        if !id_is_available_before(module, self.vector1, at) || !id_is_available_before(module, self.vector2, at) {
            return reject(Self::NAME, "an input is not available at the insertion point");
        }
        true
    }

    fn apply(&self, module: &mut Module, facts: &mut FactManager) {
        let at = insertion_point(module, &self.instruction_to_insert_before);
        let (component, n1, _) = self.input_shapes(module).expect(NOT_APPLICABLE);
        let result_type = self.result_type(module, component).expect(NOT_APPLICABLE);
        module.insert_before(
            at,
            Instruction::new(Opcode::VectorShuffle)
                .with_result(self.fresh_id)
                .with_type(result_type)
                .with_operand(Operand::Id(self.vector1))
                .with_operand(Operand::Id(self.vector2))
                .with_literals(self.component.iter().copied()),
        );

        for (i, &selector) in (0u32..).zip(&self.component) {
            if selector == UNDEFINED_COMPONENT {
                continue;
            }
            let source = if selector < n1 {
                DataDescriptor::new(self.vector1, vec![selector])
            } else {
                DataDescriptor::new(self.vector2, vec![selector - n1])
            };
            facts.add_synonym(module, DataDescriptor::new(self.fresh_id, vec![i]), source);
        }
    }
}
