use super::{reject, Transform, NOT_APPLICABLE};
use crate::data_descriptor::DataDescriptor;
use crate::fact_manager::FactManager;
use crate::legality::can_insert_before;
use irfuzz_ir::{Id, IdUseDescriptor, Instruction, InstructionRef, Module, Opcode, Operand, ScalarValue, Type};
use serde::{Deserialize, Serialize};

/// Replace a use of `true` or `false` with a comparison of two constants
/// that evaluates to the same value: `%fresh = <opcode> %lhs %rhs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceBooleanConstantWithConstantBinary {
    pub id_use_descriptor: IdUseDescriptor,
    pub lhs_id: Id,
    pub rhs_id: Id,
    pub opcode: Opcode,
    pub fresh_id_for_binary_operation: Id,
}

impl ReplaceBooleanConstantWithConstantBinary {
    pub fn new(
        id_use_descriptor: IdUseDescriptor,
        lhs_id: Id,
        rhs_id: Id,
        opcode: Opcode,
        fresh_id_for_binary_operation: Id,
    ) -> Self {
        Self {
            id_use_descriptor,
            lhs_id,
            rhs_id,
            opcode,
            fresh_id_for_binary_operation,
        }
    }

    /// Where the comparison goes: directly before the use, or before the
    /// merge instruction when the use is the terminator that follows one
    fn insertion_point(module: &Module, use_at: InstructionRef) -> InstructionRef {
        let preceded_by_merge = use_at
            .index
            .checked_sub(1)
            .and_then(|i| {
                module.get_instruction(InstructionRef {
                    index: i,
                    ..use_at
                })
            })
            .is_some_and(|inst| inst.opcode.is_merge());
        if preceded_by_merge {
            InstructionRef {
                index: use_at.index - 1,
                ..use_at
            }
        } else {
            use_at
        }
    }

    /// Evaluate the comparison if the operands suit the opcode
    fn evaluate(&self, module: &Module) -> Option<bool> {
        let lhs_def = module.get_def(self.lhs_id)?;
        let rhs_def = module.get_def(self.rhs_id)?;
        if lhs_def.opcode != Opcode::Constant || rhs_def.opcode != Opcode::Constant {
            return None;
        }
        if lhs_def.result_type? != rhs_def.result_type? {
            return None;
        }

        match module.value_type(self.lhs_id)? {
            Type::Float { width: 32 | 64 } if self.opcode.is_float_comparison() => {
                let lhs = module.scalar_constant(self.lhs_id)?.as_f64()?;
                let rhs = module.scalar_constant(self.rhs_id)?.as_f64()?;
                if !lhs.is_finite() || !rhs.is_finite() {
                    return None;
                }
                compare_floats(self.opcode, lhs, rhs)
            }
            Type::Int { width: 32 | 64, signed }
                if (signed && self.opcode.is_signed_int_comparison())
                    || (!signed && self.opcode.is_unsigned_int_comparison()) =>
            {
                let lhs = module.scalar_constant(self.lhs_id)?.as_i128()?;
                let rhs = module.scalar_constant(self.rhs_id)?.as_i128()?;
                compare_ints(self.opcode, lhs, rhs)
            }
            _ => None,
        }
    }
}

fn compare_floats(opcode: Opcode, lhs: f64, rhs: f64) -> Option<bool> {
    // Operands are finite, so ordered and unordered comparisons agree
    let result = match opcode {
        Opcode::FOrdEqual | Opcode::FUnordEqual => lhs == rhs,
        Opcode::FOrdNotEqual | Opcode::FUnordNotEqual => lhs != rhs,
        Opcode::FOrdLessThan | Opcode::FUnordLessThan => lhs < rhs,
        Opcode::FOrdLessThanEqual | Opcode::FUnordLessThanEqual => lhs <= rhs,
        Opcode::FOrdGreaterThan | Opcode::FUnordGreaterThan => lhs > rhs,
        Opcode::FOrdGreaterThanEqual | Opcode::FUnordGreaterThanEqual => lhs >= rhs,
        _ => return None,
    };
    Some(result)
}

fn compare_ints(opcode: Opcode, lhs: i128, rhs: i128) -> Option<bool> {
    let result = match opcode {
        Opcode::IEqual => lhs == rhs,
        Opcode::INotEqual => lhs != rhs,
        Opcode::SLessThan | Opcode::ULessThan => lhs < rhs,
        Opcode::SLessThanEqual | Opcode::ULessThanEqual => lhs <= rhs,
        Opcode::SGreaterThan | Opcode::UGreaterThan => lhs > rhs,
        Opcode::SGreaterThanEqual | Opcode::UGreaterThanEqual => lhs >= rhs,
        _ => return None,
    };
    Some(result)
}

impl Transform for ReplaceBooleanConstantWithConstantBinary {
    const NAME: &'static str = "ReplaceBooleanConstantWithConstantBinary";

    fn is_applicable(&self, module: &Module, _facts: &FactManager) -> bool {
        if !module.is_fresh_id(self.fresh_id_for_binary_operation) {
            return reject(Self::NAME, "fresh id is already in use");
        }
        let Some(ScalarValue::Bool(expected)) = module.scalar_constant(self.id_use_descriptor.id_of_interest) else {
            return reject(Self::NAME, "id of interest is not a boolean constant");
        };
        let Some(result) = self.evaluate(module) else {
            return reject(Self::NAME, "operands cannot be compared with this opcode");
        };
        if result != expected {
            return reject(Self::NAME, "comparison does not evaluate to the constant");
        }
        let Some(use_at) = self.id_use_descriptor.resolve(module) else {
            return reject(Self::NAME, "use not found");
        };
        if module.get_instruction(use_at).map(|inst| inst.opcode) == Some(Opcode::Phi) {
            return reject(Self::NAME, "phi operands cannot be replaced");
        }
        if !can_insert_before(module, self.opcode, Self::insertion_point(module, use_at)) {
            return reject(Self::NAME, "cannot insert the comparison before the use");
        }
        true
    }

    fn apply(&self, module: &mut Module, facts: &mut FactManager) {
        let use_at = self.id_use_descriptor.resolve(module).expect(NOT_APPLICABLE);
        let at = Self::insertion_point(module, use_at);
        let bool_type = module
            .type_of_id(self.id_use_descriptor.id_of_interest)
            .expect(NOT_APPLICABLE);
        module.insert_before(
            at,
            Instruction::binary(
                self.opcode,
                self.fresh_id_for_binary_operation,
                bool_type,
                self.lhs_id,
                self.rhs_id,
            ),
        );

        // the use moved down by one
        let use_at = InstructionRef {
            index: use_at.index + 1,
            ..use_at
        };
        module.set_operand(
            use_at,
            self.id_use_descriptor.in_operand_index as usize,
            Operand::Id(self.fresh_id_for_binary_operation),
        );

        facts.add_synonym(
            module,
            DataDescriptor::whole(self.fresh_id_for_binary_operation),
            DataDescriptor::whole(self.id_use_descriptor.id_of_interest),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{self, *};

    fn use_of(module: &Module, at: InstructionRef, operand: usize) -> IdUseDescriptor {
        IdUseDescriptor::for_use(module, at, operand).unwrap()
    }

    fn and_true_use(module: &Module) -> IdUseDescriptor {
        use_of(module, fixture::at(module, AND), 0)
    }

    fn and_false_use(module: &Module) -> IdUseDescriptor {
        use_of(module, fixture::at(module, AND), 1)
    }

    fn t(
        use_descriptor: IdUseDescriptor,
        lhs: Id,
        rhs: Id,
        opcode: Opcode,
    ) -> ReplaceBooleanConstantWithConstantBinary {
        ReplaceBooleanConstantWithConstantBinary::new(use_descriptor, lhs, rhs, opcode, Id(100))
    }

    #[test]
    fn test_replace_true_with_signed_comparison() {
        let mut module = fixture::module();
        let mut facts = FactManager::default();
        let r = t(and_true_use(&module), INT_0, INT_1, Opcode::SLessThan);
        assert!(r.is_applicable(&module, &facts));
        r.apply(&mut module, &mut facts);
        irfuzz_ir::validate_module(&module).unwrap();

        let and = module.get_def(AND).unwrap();
        assert_eq!(and.id_operand(0), Some(Id(100)));
        assert_eq!(module.get_def(Id(100)).unwrap().opcode, Opcode::SLessThan);
        assert_eq!(module.type_of_id(Id(100)), Some(BOOL));
        assert!(facts.is_synonymous(&DataDescriptor::whole(Id(100)), &DataDescriptor::whole(TRUE)));
    }

    #[test]
    fn test_evaluation_must_match_constant() {
        let module = fixture::module();
        let facts = FactManager::default();
        assert!(!t(and_false_use(&module), INT_0, INT_1, Opcode::SLessThan).is_applicable(&module, &facts));
        assert!(t(and_false_use(&module), INT_0, INT_1, Opcode::SGreaterThanEqual).is_applicable(&module, &facts));
        assert!(t(and_false_use(&module), INT_1, INT_1_DUP, Opcode::INotEqual).is_applicable(&module, &facts));
        assert!(t(and_true_use(&module), FLOAT_1, FLOAT_2, Opcode::FUnordLessThan).is_applicable(&module, &facts));
        assert!(t(and_true_use(&module), UINT_7, UINT_5, Opcode::UGreaterThan).is_applicable(&module, &facts));
        assert!(t(and_true_use(&module), INT64_NEG3, INT64_NEG3, Opcode::SLessThanEqual).is_applicable(&module, &facts));
        assert!(t(and_true_use(&module), DOUBLE_1_5, DOUBLE_2_5, Opcode::FOrdNotEqual).is_applicable(&module, &facts));
    }

    #[test]
    fn test_opcode_family_must_match_type() {
        let module = fixture::module();
        let facts = FactManager::default();
        // signedness mismatch
        assert!(!t(and_true_use(&module), UINT_7, UINT_5, Opcode::SGreaterThan).is_applicable(&module, &facts));
        assert!(!t(and_true_use(&module), INT_0, INT_1, Opcode::ULessThan).is_applicable(&module, &facts));
        // float operands with an integer opcode and the reverse
        assert!(!t(and_true_use(&module), FLOAT_1, FLOAT_2, Opcode::SLessThan).is_applicable(&module, &facts));
        assert!(!t(and_true_use(&module), INT_0, INT_1, Opcode::FOrdLessThan).is_applicable(&module, &facts));
        // different types
        assert!(!t(and_true_use(&module), INT_0, UINT_5, Opcode::IEqual).is_applicable(&module, &facts));
        // not a comparison
        assert!(!t(and_true_use(&module), INT_0, INT_1, Opcode::IAdd).is_applicable(&module, &facts));
        // operands must be scalar constants
        assert!(!t(and_true_use(&module), LOAD, INT_1, Opcode::INotEqual).is_applicable(&module, &facts));
    }

    #[test]
    fn test_rejects_non_finite_floats() {
        let module = fixture::module();
        let facts = FactManager::default();
        for bad in [FLOAT_NAN, FLOAT_INF, FLOAT_NEG_INF] {
            assert!(!t(and_false_use(&module), bad, FLOAT_1, Opcode::FOrdEqual).is_applicable(&module, &facts));
            assert!(!t(and_true_use(&module), FLOAT_1, bad, Opcode::FUnordNotEqual).is_applicable(&module, &facts));
        }
    }

    #[test]
    fn test_rejects_non_boolean_use() {
        let module = fixture::module();
        let facts = FactManager::default();
        let int_use = use_of(&module, fixture::at(&module, SELECT), 1);
        assert!(!t(int_use, INT_0, INT_1, Opcode::SLessThan).is_applicable(&module, &facts));
    }

    #[test]
    fn test_branch_condition_goes_before_merge() {
        let mut module = fixture::module();
        let mut facts = FactManager::default();
        let branch = fixture::in_block(&module, ENTRY, 7);
        let r = t(use_of(&module, branch, 0), INT_2, INT_1, Opcode::SGreaterThan);
        assert!(r.is_applicable(&module, &facts));
        r.apply(&mut module, &mut facts);
        irfuzz_ir::validate_module(&module).unwrap();

        let entry = module.block(branch.block_ref()).unwrap();
        assert_eq!(entry.instructions[6].result_id, Some(Id(100)));
        assert_eq!(entry.instructions[7].opcode, Opcode::SelectionMerge);
        assert_eq!(entry.instructions[8].id_operand(0), Some(Id(100)));
    }

    #[test]
    fn test_loop_condition_goes_before_loop_merge() {
        let mut module = fixture::module();
        let mut facts = FactManager::default();
        let header = fixture::add_loop_function(&mut module, Id(90));
        let branch = fixture::in_block(&module, header, 1);
        let r = t(use_of(&module, branch, 0), FLOAT_0, FLOAT_1, Opcode::FOrdLessThan);
        assert!(r.is_applicable(&module, &facts));
        r.apply(&mut module, &mut facts);
        irfuzz_ir::validate_module(&module).unwrap();

        let block = module.block(branch.block_ref()).unwrap();
        assert_eq!(block.instructions[0].result_id, Some(Id(100)));
        assert_eq!(block.instructions[1].opcode, Opcode::LoopMerge);
        assert_eq!(block.instructions[2].id_operand(0), Some(Id(100)));
    }

    #[test]
    fn test_rejects_phi_operand() {
        let mut module = fixture::module();
        let facts = FactManager::default();
        let phi = fixture::at(&module, PHI);
        module.insert_before(phi, Instruction::phi(Id(90), BOOL, [(TRUE, THEN), (FALSE, ELSE)]));
        let phi_use = use_of(&module, fixture::at(&module, Id(90)), 0);
        assert!(!t(phi_use, INT_0, INT_1, Opcode::SLessThan).is_applicable(&module, &facts));
    }

    #[test]
    fn test_rejects_fresh_id_collision() {
        let module = fixture::module();
        let facts = FactManager::default();
        let r = ReplaceBooleanConstantWithConstantBinary::new(
            and_true_use(&module),
            INT_0,
            INT_1,
            Opcode::SLessThan,
            LOAD,
        );
        assert!(!r.is_applicable(&module, &facts));
    }
}
