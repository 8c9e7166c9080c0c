use super::{reject, Transform, NOT_APPLICABLE};
use crate::fact_manager::FactManager;
use crate::legality::{id_is_available_at_use, is_value, use_can_be_replaced};
use irfuzz_ir::{Id, IdUseDescriptor, Module, Operand};
use serde::{Deserialize, Serialize};

/// Replace a use of an irrelevant id with any other value of the same type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceIrrelevantId {
    pub id_use_descriptor: IdUseDescriptor,
    pub replacement_id: Id,
}

impl ReplaceIrrelevantId {
    pub fn new(id_use_descriptor: IdUseDescriptor, replacement_id: Id) -> Self {
        Self {
            id_use_descriptor,
            replacement_id,
        }
    }
}

impl Transform for ReplaceIrrelevantId {
    const NAME: &'static str = "ReplaceIrrelevantId";

    fn is_applicable(&self, module: &Module, facts: &FactManager) -> bool {
        let original = self.id_use_descriptor.id_of_interest;
        if !facts.is_irrelevant(original) {
            return reject(Self::NAME, "id of interest is not irrelevant");
        }
        if self.replacement_id == original {
            return reject(Self::NAME, "replacement is the id being replaced");
        }
        if !is_value(module, self.replacement_id) {
            return reject(Self::NAME, "replacement is not a value");
        }
        if module.type_of_id(original) != module.type_of_id(self.replacement_id) {
            return reject(Self::NAME, "types differ");
        }
        let Some(at) = self.id_use_descriptor.resolve(module) else {
            return reject(Self::NAME, "use not found");
        };
        let operand = self.id_use_descriptor.in_operand_index as usize;
        if !use_can_be_replaced(module, at, operand, self.replacement_id) {
            return reject(Self::NAME, "use cannot hold a different id");
        }
        if !id_is_available_at_use(module, self.replacement_id, at, operand) {
            return reject(Self::NAME, "replacement is not available at the use");
        }
        true
    }

    fn apply(&self, module: &mut Module, _facts: &mut FactManager) {
        let at = self.id_use_descriptor.resolve(module).expect(NOT_APPLICABLE);
        module.set_operand(
            at,
            self.id_use_descriptor.in_operand_index as usize,
            Operand::Id(self.replacement_id),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{self, *};
    use irfuzz_ir::{Instruction, StorageClass};

    fn use_of(module: &Module, user: Id, operand: usize) -> IdUseDescriptor {
        IdUseDescriptor::for_use(module, fixture::at(module, user), operand).unwrap()
    }

    #[test]
    fn test_replace_irrelevant_use() {
        let mut module = fixture::module();
        let mut facts = FactManager::default();
        facts.add_irrelevant(LOAD);

        let t = ReplaceIrrelevantId::new(use_of(&module, MERGE_IADD, 0), INT_2);
        assert!(t.is_applicable(&module, &facts));
        t.apply(&mut module, &mut facts);
        irfuzz_ir::validate_module(&module).unwrap();
        assert_eq!(module.get_def(MERGE_IADD).unwrap().id_operand(0), Some(INT_2));
    }

    #[test]
    fn test_requires_irrelevance() {
        let module = fixture::module();
        let facts = FactManager::default();
        let t = ReplaceIrrelevantId::new(use_of(&module, MERGE_IADD, 0), INT_2);
        assert!(!t.is_applicable(&module, &facts));
    }

    #[test]
    fn test_rejects_bad_replacements() {
        let module = fixture::module();
        let mut facts = FactManager::default();
        facts.add_irrelevant(LOAD);
        let merge_use = use_of(&module, MERGE_IADD, 0);

        for replacement in [LOAD, INT, MERGE, MAIN, FLOAT_1, IADD] {
            let t = ReplaceIrrelevantId::new(merge_use, replacement);
            assert!(!t.is_applicable(&module, &facts), "{}", replacement);
        }
    }

    #[test]
    fn test_pointer_arguments_need_variables() {
        let mut module = fixture::module();
        let mut facts = FactManager::default();
        facts.add_irrelevant(VAR_INT);
        let entry = fixture::in_block(&module, ENTRY, 0);
        module.insert_before(entry, Instruction::variable(Id(90), PTR_INT, StorageClass::Function));
        module.insert_before(
            fixture::at(&module, CALL),
            Instruction::copy_object(Id(91), PTR_INT, VAR_INT),
        );

        let t = ReplaceIrrelevantId::new(use_of(&module, CALL, 1), Id(91));
        assert!(!t.is_applicable(&module, &facts));
        let t = ReplaceIrrelevantId::new(use_of(&module, CALL, 1), Id(90));
        assert!(t.is_applicable(&module, &facts));
        t.apply(&mut module, &mut facts);
        irfuzz_ir::validate_module(&module).unwrap();
    }
}
