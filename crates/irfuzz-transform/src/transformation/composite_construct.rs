use super::{insertion_point, reject, Transform};
use crate::data_descriptor::DataDescriptor;
use crate::fact_manager::FactManager;
use crate::legality::{can_insert_before, id_is_available_before, is_value};
use irfuzz_ir::{Id, Instruction, InstructionDescriptor, Module, Opcode, Type};
use serde::{Deserialize, Serialize};

/// Build a composite from existing values:
/// `%fresh = CompositeConstruct %type %c0 %c1 ...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeConstruct {
    pub composite_type_id: Id,
    pub component: Vec<Id>,
    pub instruction_to_insert_before: InstructionDescriptor,
    pub fresh_id: Id,
}

impl CompositeConstruct {
    pub fn new(
        composite_type_id: Id,
        component: Vec<Id>,
        instruction_to_insert_before: InstructionDescriptor,
        fresh_id: Id,
    ) -> Self {
        Self {
            composite_type_id,
            component,
            instruction_to_insert_before,
            fresh_id,
        }
    }

    /// Whether the components exactly fill the composite type. Vectors may be
    /// built from a mix of scalars and smaller vectors of the same component type.
    fn components_fit(&self, module: &Module) -> bool {
        let component_types: Option<Vec<Id>> = self
            .component
            .iter()
            .map(|&c| module.type_of_id(c))
            .collect();
        let Some(component_types) = component_types else {
            return false;
        };

        match module.type_of(self.composite_type_id) {
            Some(Type::Array { element, .. }) => {
                module.composite_len(self.composite_type_id) == u32::try_from(component_types.len()).ok()
                    && component_types.iter().all(|&t| t == element)
            }
            Some(Type::Matrix { column, count }) => {
                component_types.len() == count as usize && component_types.iter().all(|&t| t == column)
            }
            Some(Type::Struct { members }) => members == component_types,
            Some(Type::Vector { component, count }) => {
                let mut total = 0u32;
                for &t in &component_types {
                    if t == component {
                        total += 1;
                        continue;
                    }
                    match module.type_of(t) {
                        Some(Type::Vector {
                            component: inner,
                            count: inner_count,
                        }) if inner == component => total += inner_count,
                        _ => return false,
                    }
                }
                total == count
            }
            _ => false,
        }
    }
}

impl Transform for CompositeConstruct {
    const NAME: &'static str = "CompositeConstruct";

    fn is_applicable(&self, module: &Module, _facts: &FactManager) -> bool {
        if !module.is_fresh_id(self.fresh_id) {
            return reject(Self::NAME, "fresh id is already in use");
        }
        let Some(at) = self.instruction_to_insert_before.resolve(module) else {
            return reject(Self::NAME, "insertion point not found");
        };
        if !can_insert_before(module, Opcode::CompositeConstruct, at) {
            return reject(Self::NAME, "cannot insert before the target instruction");
        }
        if !self.component.iter().all(|&c| is_value(module, c)) {
            return reject(Self::NAME, "a component is not a value");
        }
        if !self.components_fit(module) {
            return reject(Self::NAME, "components do not match the composite type");
        }
        if !self
            .component
            .iter()
            .all(|&c| id_is_available_before(module, c, at))
        {
            return reject(Self::NAME, "a component is not available at the insertion point");
        }
        true
    }

    fn apply(&self, module: &mut Module, facts: &mut FactManager) {
        let at = insertion_point(module, &self.instruction_to_insert_before);
        module.insert_before(
            at,
            Instruction::new(Opcode::CompositeConstruct)
                .with_result(self.fresh_id)
                .with_type(self.composite_type_id)
                .with_id_operands(self.component.iter().copied()),
        );

        let builds_vector = matches!(module.type_of(self.composite_type_id), Some(Type::Vector { .. }));
        let mut index = 0u32;
        for &component in &self.component {
            let nested = match module.value_type(component) {
                Some(Type::Vector { count, .. }) if builds_vector => Some(count),
                _ => None,
            };
            match nested {
                Some(count) => {
                    for i in 0..count {
                        facts.add_synonym(
                            module,
                            DataDescriptor::new(self.fresh_id, vec![index]),
                            DataDescriptor::new(component, vec![i]),
                        );
                        index += 1;
                    }
                }
                None => {
                    facts.add_synonym(
                        module,
                        DataDescriptor::new(self.fresh_id, vec![index]),
                        DataDescriptor::whole(component),
                    );
                    index += 1;
                }
            }
        }
    }
}
