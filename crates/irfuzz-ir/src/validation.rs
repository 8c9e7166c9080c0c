//! Structural well-formedness checks for modules.

use crate::instruction::{Id, Instruction, Opcode};
use crate::module::{BlockRef, Function, InstructionRef, Location, Module};
use irfuzz_core::{Error, Result};
use std::collections::HashSet;

/// Validate that a module is well-formed
pub fn validate_module(module: &Module) -> Result<()> {
    check_result_ids(module)?;

    for inst in module.globals() {
        check_references(module, inst)?;
    }

    // Validate each function
    for (idx, func) in module.functions().iter().enumerate() {
        validate_function(module, func, idx)?;
    }

    Ok(())
}

fn check_result_ids(module: &Module) -> Result<()> {
    let mut seen = HashSet::new();
    let mut define = |id: Id| -> Result<()> {
        if id.0 == 0 || id.0 >= module.id_bound() {
            return Err(Error::Validation(format!(
                "Id {} is outside the id bound {}",
                id,
                module.id_bound()
            )));
        }
        if !seen.insert(id) {
            return Err(Error::Validation(format!("Id {} is defined more than once", id)));
        }
        Ok(())
    };

    for inst in module.globals() {
        if let Some(id) = inst.result_id {
            define(id)?;
        }
    }
    for func in module.functions() {
        for inst in std::iter::once(&func.header).chain(func.params.iter()) {
            if let Some(id) = inst.result_id {
                define(id)?;
            }
        }
        for block in &func.blocks {
            define(block.label)?;
            for id in block.instructions.iter().filter_map(|inst| inst.result_id) {
                define(id)?;
            }
        }
    }
    Ok(())
}

/// Every referenced id must be defined, and result types must name types
fn check_references(module: &Module, inst: &Instruction) -> Result<()> {
    if let Some(type_id) = inst.result_type {
        if !module.is_type(type_id) {
            return Err(Error::Validation(format!(
                "Result type {} of {:?} is not a type",
                type_id, inst.opcode
            )));
        }
    }
    for (_, id) in inst.id_operands() {
        if module.def_location(id).is_none() {
            return Err(Error::Validation(format!(
                "{:?} references undefined id {}",
                inst.opcode, id
            )));
        }
    }
    Ok(())
}

fn validate_function(module: &Module, func: &Function, idx: usize) -> Result<()> {
    // Check that function has at least one block
    if func.blocks.is_empty() {
        return Err(Error::Validation(format!(
            "Function {} has no basic blocks",
            idx
        )));
    }

    check_references(module, &func.header)?;
    for param in &func.params {
        check_references(module, param)?;
    }

    for (block_idx, block) in func.blocks.iter().enumerate() {
        let fail = |what: &str| {
            Err(Error::Validation(format!(
                "Function {} block {}: {}",
                idx, block.label, what
            )))
        };

        if block.terminator().is_none() {
            return fail("does not end with a terminator");
        }

        let last = block.instructions.len() - 1;
        let mut leading_phis = true;
        let mut leading_variables = block_idx == 0;
        for (i, inst) in block.instructions.iter().enumerate() {
            check_references(module, inst)?;

            if inst.opcode.is_terminator() && i != last {
                return fail("has a terminator before its end");
            }
            if inst.opcode.is_merge() && i + 1 != last {
                return fail("has a merge instruction that is not second-to-last");
            }

            if inst.opcode == Opcode::Phi {
                if !leading_phis {
                    return fail("has a phi after a non-phi instruction");
                }
            } else {
                leading_phis = false;
            }

            if inst.opcode == Opcode::Variable {
                if !leading_variables {
                    return fail("has a variable outside the leading run of the entry block");
                }
            } else {
                leading_variables = false;
            }

            for target in inst.branch_targets() {
                if func.block_index(target).is_none() {
                    return fail("branches to a label outside the function");
                }
            }

            let at = InstructionRef {
                function: idx,
                block: block_idx,
                index: i,
            };
            check_dominance(module, at, inst)?;
        }
    }

    Ok(())
}

/// Every id used in a reachable block must be defined where it is visible
fn check_dominance(module: &Module, at: InstructionRef, inst: &Instruction) -> Result<()> {
    let block = at.block_ref();
    if !module.is_reachable(block) {
        return Ok(());
    }

    for (operand, id) in inst.id_operands() {
        let visible = match module.def_location(id) {
            Some(Location::Global(_)) | Some(Location::Label(_)) => true,
            // functions are only referenced as a call's callee
            Some(Location::FunctionHeader(_)) => inst.opcode == Opcode::FunctionCall && operand == 0,
            Some(Location::Parameter { function, .. }) => function == at.function,
            Some(Location::Body(def)) => {
                if def.function != at.function {
                    false
                } else if inst.opcode == Opcode::Phi {
                    match inst.id_operand(operand + 1).and_then(|p| module.block_ref(p)) {
                        Some(pred) if operand % 2 == 0 => visible_at_end_of(module, def, pred),
                        _ => true,
                    }
                } else if def.block == at.block {
                    def.index < at.index
                } else {
                    module.block_dominates(def.block_ref(), block)
                }
            }
            None => false,
        };
        if !visible {
            return Err(Error::Validation(format!(
                "{:?} at {:?} uses {} where it is not visible",
                inst.opcode, at, id
            )));
        }
    }
    Ok(())
}

fn visible_at_end_of(module: &Module, def: InstructionRef, block: BlockRef) -> bool {
    !module.is_reachable(block) || module.block_dominates(def.block_ref(), block)
}
