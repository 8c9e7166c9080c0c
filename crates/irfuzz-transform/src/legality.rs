//! Queries deciding where ids may be used and where instructions may go.

use irfuzz_ir::{Function, Id, InstructionRef, Location, Module, Opcode, Type};

/// True if `id` names a value usable as an operand: not a type, label or
/// function, and not a void call result
pub fn is_value(module: &Module, id: Id) -> bool {
    let Some(def) = module.get_def(id) else {
        return false;
    };
    def.opcode != Opcode::Function && !matches!(module.value_type(id), None | Some(Type::Void))
}

/// True if `id` names a value that is visible just before the instruction at
/// `at`: module-scope values everywhere, parameters in their own function,
/// and body results when their definition strictly dominates `at`.
///
/// Blocks unreachable from the entry are dominated by nothing but themselves,
/// so only same-block definitions are visible there.
pub fn id_is_available_before(module: &Module, id: Id, at: InstructionRef) -> bool {
    match module.def_location(id) {
        Some(Location::Global(_)) | Some(Location::FunctionHeader(_)) => true,
        Some(Location::Parameter { function, .. }) => function == at.function,
        Some(Location::Label(_)) | None => false,
        Some(Location::Body(def)) => {
            if def.function != at.function {
                false
            } else if def.block == at.block {
                def.index < at.index
            } else {
                module.block_dominates(def.block_ref(), at.block_ref())
            }
        }
    }
}

/// True if `id` may fill operand `operand_index` of the instruction at `at`.
///
/// A phi's incoming value only needs to be available at the end of the
/// matching predecessor block.
pub fn id_is_available_at_use(module: &Module, id: Id, at: InstructionRef, operand_index: usize) -> bool {
    let Some(inst) = module.get_instruction(at) else {
        return false;
    };
    if inst.opcode != Opcode::Phi || operand_index % 2 != 0 {
        return id_is_available_before(module, id, at);
    }

    let Some(predecessor) = inst
        .id_operand(operand_index + 1)
        .and_then(|label| module.block_ref(label))
    else {
        return false;
    };
    match module.def_location(id) {
        Some(Location::Global(_)) | Some(Location::FunctionHeader(_)) => true,
        Some(Location::Parameter { function, .. }) => function == at.function,
        Some(Location::Body(def)) => module.block_dominates(def.block_ref(), predecessor),
        Some(Location::Label(_)) | None => false,
    }
}

/// True if an instruction with `opcode` may be placed directly before the
/// instruction at `at` without breaking block structure
pub fn can_insert_before(module: &Module, opcode: Opcode, at: InstructionRef) -> bool {
    let Some(block) = module.block(at.block_ref()) else {
        return false;
    };
    let Some(target) = block.instructions.get(at.index) else {
        return false;
    };
    let previous = at
        .index
        .checked_sub(1)
        .and_then(|i| block.instructions.get(i));

    // a merge instruction must stay directly before its terminator
    if previous.is_some_and(|p| p.opcode.is_merge()) {
        return false;
    }

    if target.opcode == Opcode::Phi {
        return opcode == Opcode::Phi;
    }
    if opcode == Opcode::Phi {
        return previous.map_or(true, |p| p.opcode == Opcode::Phi);
    }

    if target.opcode == Opcode::Variable {
        return opcode == Opcode::Variable;
    }
    if opcode == Opcode::Variable {
        let in_entry = module
            .function(at.function)
            .and_then(Function::entry_block)
            .is_some_and(|entry| entry.label == block.label);
        return in_entry && previous.map_or(true, |p| p.opcode == Opcode::Variable);
    }

    true
}

/// Structural restrictions on replacing operand `operand_index` of the
/// instruction at `at` with `replacement`, independent of availability:
///
/// - a call's callee cannot change
/// - pointer arguments to calls must be variables or parameters
/// - struct indices of an access chain must stay constants
pub fn use_can_be_replaced(module: &Module, at: InstructionRef, operand_index: usize, replacement: Id) -> bool {
    let Some(inst) = module.get_instruction(at) else {
        return false;
    };
    match inst.opcode {
        Opcode::FunctionCall => {
            if operand_index == 0 {
                return false;
            }
            let original_is_pointer = inst
                .id_operand(operand_index)
                .and_then(|id| module.value_type(id))
                .is_some_and(|ty| ty.is_pointer());
            let replacement_is_pointer = module.value_type(replacement).is_some_and(|ty| ty.is_pointer());
            if original_is_pointer != replacement_is_pointer {
                return false;
            }
            !original_is_pointer
                || matches!(
                    module.get_def(replacement).map(|def| def.opcode),
                    Some(Opcode::Variable) | Some(Opcode::FunctionParameter)
                )
        }
        Opcode::AccessChain if operand_index > 0 => {
            let preceding: Vec<Option<Id>> = (1..operand_index).map(|i| inst.id_operand(i)).collect();
            !indexes_struct(module, inst.id_operand(0), &preceding)
                || module.get_def(replacement).map(|def| def.opcode) == Some(Opcode::Constant)
        }
        _ => true,
    }
}

/// True if the access chain index following `preceding` indexes into a struct
fn indexes_struct(module: &Module, base: Option<Id>, preceding: &[Option<Id>]) -> bool {
    let Some(Type::Pointer { pointee, .. }) = base.and_then(|b| module.value_type(b)) else {
        return false;
    };

    let mut current = pointee;
    for index in preceding {
        let next = match module.type_of(current) {
            Some(Type::Struct { members }) => index
                .and_then(|id| module.scalar_constant(id))
                .and_then(|value| value.as_i128())
                .and_then(|value| usize::try_from(value).ok())
                .and_then(|value| members.get(value).copied()),
            Some(Type::Vector { component, .. }) => Some(component),
            Some(Type::Matrix { column, .. }) => Some(column),
            Some(Type::Array { element, .. }) => Some(element),
            _ => None,
        };
        match next {
            Some(next) => current = next,
            None => return false,
        }
    }
    matches!(module.type_of(current), Some(Type::Struct { .. }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{self, *};
    use irfuzz_ir::Instruction;

    #[test]
    fn test_availability_follows_dominance() {
        let module = fixture::module();
        let merge_add = fixture::at(&module, MERGE_IADD);

        assert!(id_is_available_before(&module, LOAD, merge_add));
        assert!(id_is_available_before(&module, INT_1, merge_add));
        // defined in a sibling branch
        assert!(!id_is_available_before(&module, IADD, merge_add));
        assert!(!id_is_available_before(&module, FMUL, merge_add));
        // not before itself
        assert!(!id_is_available_before(&module, MERGE_IADD, merge_add));
        // later in the same block
        assert!(!id_is_available_before(&module, LOAD, fixture::at(&module, VAR_INT)));
        // labels are not values
        assert!(!id_is_available_before(&module, ENTRY, merge_add));
        assert!(!id_is_available_before(&module, Id(999), merge_add));
    }

    #[test]
    fn test_parameters_are_local_to_their_function() {
        let module = fixture::module();
        assert!(id_is_available_before(&module, PARAM, fixture::at(&module, HELPER_LOAD)));
        assert!(!id_is_available_before(&module, PARAM, fixture::at(&module, LOAD)));
        assert!(!id_is_available_before(&module, LOAD, fixture::at(&module, HELPER_LOAD)));
    }

    #[test]
    fn test_phi_operands_use_predecessor() {
        let module = fixture::module();
        let phi = fixture::at(&module, PHI);
        // %64 flows in from the then-branch, where it is defined
        assert!(id_is_available_at_use(&module, IADD, phi, 0));
        // but not from the else-branch
        assert!(!id_is_available_at_use(&module, IADD, phi, 2));
        assert!(id_is_available_at_use(&module, LOAD, phi, 2));
        assert!(id_is_available_at_use(&module, INT_0, phi, 2));
        // non-phi uses fall back to plain availability
        let select = fixture::at(&module, SELECT);
        assert!(!id_is_available_at_use(&module, IADD, select, 1));
    }

    #[test]
    fn test_unreachable_block_sees_only_its_own_definitions() {
        let mut module = fixture::module();
        let mut dead = irfuzz_ir::Block::new(Id(90));
        dead.add_instruction(Instruction::copy_object(Id(91), INT, INT_1));
        dead.add_instruction(Instruction::copy_object(Id(92), INT, Id(91)));
        dead.add_instruction(Instruction::return_void());
        let mut func = irfuzz_ir::Function::new(Id(93), VOID, FN_VOID);
        func.add_block(irfuzz_ir::Block::with_instructions(Id(94), vec![Instruction::return_void()]));
        func.add_block(dead);
        module.add_function(func);

        let second = fixture::in_block(&module, Id(90), 1);
        assert!(id_is_available_before(&module, Id(91), second));
        assert!(id_is_available_before(&module, INT_1, second));
    }

    #[test]
    fn test_insertion_points() {
        let module = fixture::module();
        // before the first variable and between variables
        assert!(can_insert_before(&module, Opcode::Variable, fixture::in_block(&module, ENTRY, 0)));
        assert!(can_insert_before(&module, Opcode::Variable, fixture::in_block(&module, ENTRY, 1)));
        assert!(!can_insert_before(&module, Opcode::CopyObject, fixture::in_block(&module, ENTRY, 1)));
        // right after the variables
        assert!(can_insert_before(&module, Opcode::Variable, fixture::at(&module, LOAD)));
        assert!(can_insert_before(&module, Opcode::CopyObject, fixture::at(&module, LOAD)));
        // variables only in the entry block
        assert!(!can_insert_before(&module, Opcode::Variable, fixture::at(&module, FADD)));
        // before a merge, not between a merge and its terminator
        let merge = fixture::in_block(&module, ENTRY, 6);
        assert!(can_insert_before(&module, Opcode::CopyObject, merge));
        assert!(!can_insert_before(
            &module,
            Opcode::CopyObject,
            InstructionRef {
                index: merge.index + 1,
                ..merge
            }
        ));
        // phis stay at the head of the block
        let phi = fixture::at(&module, PHI);
        assert!(can_insert_before(&module, Opcode::Phi, phi));
        assert!(!can_insert_before(&module, Opcode::CopyObject, phi));
        assert!(can_insert_before(&module, Opcode::Phi, fixture::at(&module, SELECT)));
        assert!(!can_insert_before(&module, Opcode::Phi, fixture::at(&module, AND)));
        // stale handles
        assert!(!can_insert_before(&module, Opcode::CopyObject, fixture::in_block(&module, ELSE, 9)));
    }

    #[test]
    fn test_insertion_around_loop_merge() {
        let mut module = fixture::module();
        let header = fixture::add_loop_function(&mut module, Id(90));
        let loop_merge = fixture::in_block(&module, header, 0);
        let branch = fixture::in_block(&module, header, 1);
        assert_eq!(module.get_instruction(loop_merge).map(|i| i.opcode), Some(Opcode::LoopMerge));

        assert!(can_insert_before(&module, Opcode::CopyObject, loop_merge));
        assert!(!can_insert_before(&module, Opcode::CopyObject, branch));
        assert!(!can_insert_before(&module, Opcode::SLessThan, branch));
    }

    #[test]
    fn test_call_operands() {
        let mut module = fixture::module();
        let call = fixture::at(&module, CALL);
        assert!(!use_can_be_replaced(&module, call, 0, HELPER));
        assert!(use_can_be_replaced(&module, call, 1, VAR_INT));

        // a copied pointer is not a variable
        module.insert_before(call, Instruction::copy_object(Id(100), PTR_INT, VAR_INT));
        let call = fixture::at(&module, CALL);
        assert!(!use_can_be_replaced(&module, call, 1, Id(100)));
        assert!(!use_can_be_replaced(&module, call, 1, INT_1));
    }

    #[test]
    fn test_access_chain_struct_index() {
        let module = fixture::module();
        let access = fixture::at(&module, ACCESS);
        assert!(use_can_be_replaced(&module, access, 1, INT_1_DUP));
        assert!(!use_can_be_replaced(&module, access, 1, LOAD));
        // the base pointer is not an index
        assert!(use_can_be_replaced(&module, access, 0, VAR_STRUCT));
    }

    #[test]
    fn test_values() {
        let mut module = fixture::module();
        fixture::add_value_function(&mut module, Id(80), FLOAT, FLOAT_1);
        for value in [LOAD, INT_1, VEC2_01, PARAM, VAR_INT] {
            assert!(is_value(&module, value), "{}", value);
        }
        // a function's header carries its return type but is not a value
        for not_value in [Id(80), MAIN, INT, ENTRY, CALL, Id(99)] {
            assert!(!is_value(&module, not_value), "{}", not_value);
        }
    }
}
