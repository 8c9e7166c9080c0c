use super::{reject, Transform, NOT_APPLICABLE};
use crate::data_descriptor::DataDescriptor;
use crate::fact_manager::FactManager;
use crate::legality::{id_is_available_at_use, use_can_be_replaced};
use irfuzz_ir::{IdUseDescriptor, Module, Operand};
use serde::{Deserialize, Serialize};

/// Replace one use of an id with an id known to hold the same value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceIdWithSynonym {
    pub id_use_descriptor: IdUseDescriptor,
    pub synonymous: DataDescriptor,
}

impl ReplaceIdWithSynonym {
    pub fn new(id_use_descriptor: IdUseDescriptor, synonymous: DataDescriptor) -> Self {
        Self {
            id_use_descriptor,
            synonymous,
        }
    }
}

impl Transform for ReplaceIdWithSynonym {
    const NAME: &'static str = "ReplaceIdWithSynonym";

    fn is_applicable(&self, module: &Module, facts: &FactManager) -> bool {
        let original = self.id_use_descriptor.id_of_interest;
        let replacement = self.synonymous.object;

        if !self.synonymous.is_whole_object() {
            return reject(Self::NAME, "replacement must be a whole object");
        }
        if replacement == original {
            return reject(Self::NAME, "replacement is the id being replaced");
        }
        let Some(at) = self.id_use_descriptor.resolve(module) else {
            return reject(Self::NAME, "use not found");
        };
        if !facts.is_synonymous(&DataDescriptor::whole(original), &self.synonymous) {
            return reject(Self::NAME, "ids are not known to be synonymous");
        }
        match (module.type_of_id(original), module.type_of_id(replacement)) {
            (Some(a), Some(b)) if a == b => {}
            _ => return reject(Self::NAME, "types differ"),
        }
        let operand = self.id_use_descriptor.in_operand_index as usize;
        if !use_can_be_replaced(module, at, operand, replacement) {
            return reject(Self::NAME, "use cannot hold a different id");
        }
        if !id_is_available_at_use(module, replacement, at, operand) {
            return reject(Self::NAME, "replacement is not available at the use");
        }
        true
    }

    fn apply(&self, module: &mut Module, _facts: &mut FactManager) {
        let at = self.id_use_descriptor.resolve(module).expect(NOT_APPLICABLE);
        module.set_operand(
            at,
            self.id_use_descriptor.in_operand_index as usize,
            Operand::Id(self.synonymous.object),
        );
    }
}
