//! Shared module used by the unit tests of this crate.
//!
//! ```text
//! main:
//!   entry(%50): %60 = var int*   %74 = var struct*   %61 = load %60
//!               %62 = copy %26   %75 = access_chain %74 [%21]
//!               %69 = call %41(%60)   selection_merge %53   br %4 ? %51 : %52
//!   then(%51):  %63 = fadd %24 %25   %64 = iadd %20 %21   store %60 %64   br %53
//!   else(%52):  %65 = fmul %24 %24   br %53
//!   merge(%53): %66 = phi [%64, %51] [%20, %52]   %67 = select %4 %21 %22
//!               %68 = logical_and %4 %5   %73 = iadd %61 %21   return
//! helper(%70: int*):
//!   entry(%71): %72 = load %70   return
//! ```

use irfuzz_ir::{Block, Function, Id, Instruction, InstructionRef, Module, Opcode, StorageClass};

pub const VOID: Id = Id(1);
pub const FN_VOID: Id = Id(2);
pub const BOOL: Id = Id(3);
pub const TRUE: Id = Id(4);
pub const FALSE: Id = Id(5);
pub const INT: Id = Id(6);
pub const UINT: Id = Id(7);
pub const FLOAT: Id = Id(8);
pub const VEC2: Id = Id(9);
pub const VEC3: Id = Id(10);
pub const VEC4: Id = Id(11);
pub const MAT2: Id = Id(12);
pub const UINT_3: Id = Id(13);
pub const INT_ARRAY3: Id = Id(14);
/// struct { int, float, vec2 }
pub const STRUCT: Id = Id(15);
pub const PTR_INT: Id = Id(16);
pub const INT64: Id = Id(17);
pub const DOUBLE: Id = Id(18);
pub const FN_VOID_PTR: Id = Id(19);

pub const INT_0: Id = Id(20);
pub const INT_1: Id = Id(21);
pub const INT_2: Id = Id(22);
pub const FLOAT_0: Id = Id(23);
pub const FLOAT_1: Id = Id(24);
pub const FLOAT_2: Id = Id(25);
/// vec2(0.0, 1.0)
pub const VEC2_01: Id = Id(26);
pub const FLOAT_NAN: Id = Id(27);
pub const FLOAT_INF: Id = Id(28);
pub const UINT_5: Id = Id(29);
pub const UINT_7: Id = Id(30);
pub const INT64_NEG3: Id = Id(31);
pub const DOUBLE_1_5: Id = Id(32);
pub const DOUBLE_2_5: Id = Id(33);
/// int[3] { 0, 1, 2 }
pub const ARRAY_012: Id = Id(34);
/// struct { 1, 1.0, vec2(0.0, 1.0) }
pub const STRUCT_CONST: Id = Id(35);
/// mat2 { vec2(0.0, 1.0), vec2(0.0, 1.0) }
pub const MAT_CONST: Id = Id(36);
pub const FLOAT_NEG_INF: Id = Id(37);
pub const PTR_STRUCT: Id = Id(38);
pub const PTR_FLOAT: Id = Id(39);
/// A second int constant with value 1
pub const INT_1_DUP: Id = Id(45);

pub const MAIN: Id = Id(40);
pub const HELPER: Id = Id(41);

pub const ENTRY: Id = Id(50);
pub const THEN: Id = Id(51);
pub const ELSE: Id = Id(52);
pub const MERGE: Id = Id(53);
pub const HELPER_ENTRY: Id = Id(71);

pub const VAR_INT: Id = Id(60);
pub const LOAD: Id = Id(61);
pub const COPY_VEC2: Id = Id(62);
pub const FADD: Id = Id(63);
pub const IADD: Id = Id(64);
pub const FMUL: Id = Id(65);
pub const PHI: Id = Id(66);
pub const SELECT: Id = Id(67);
pub const AND: Id = Id(68);
pub const CALL: Id = Id(69);
pub const PARAM: Id = Id(70);
pub const HELPER_LOAD: Id = Id(72);
pub const MERGE_IADD: Id = Id(73);
pub const VAR_STRUCT: Id = Id(74);
pub const ACCESS: Id = Id(75);

fn float_bits(value: f32) -> [u32; 1] {
    [value.to_bits()]
}

fn double_bits(value: f64) -> [u32; 2] {
    let bits = value.to_bits();
    [bits as u32, (bits >> 32) as u32]
}

pub fn module() -> Module {
    let mut module = Module::new();
    let globals = [
        Instruction::type_void(VOID),
        Instruction::type_function(FN_VOID, VOID, []),
        Instruction::type_bool(BOOL),
        Instruction::constant_bool(TRUE, BOOL, true),
        Instruction::constant_bool(FALSE, BOOL, false),
        Instruction::type_int(INT, 32, true),
        Instruction::type_int(UINT, 32, false),
        Instruction::type_float(FLOAT, 32),
        Instruction::type_vector(VEC2, FLOAT, 2),
        Instruction::type_vector(VEC3, FLOAT, 3),
        Instruction::type_vector(VEC4, FLOAT, 4),
        Instruction::type_matrix(MAT2, VEC2, 2),
        Instruction::constant(UINT_3, UINT, [3]),
        Instruction::type_array(INT_ARRAY3, INT, UINT_3),
        Instruction::type_struct(STRUCT, [INT, FLOAT, VEC2]),
        Instruction::type_pointer(PTR_INT, StorageClass::Function, INT),
        Instruction::type_int(INT64, 64, true),
        Instruction::type_float(DOUBLE, 64),
        Instruction::type_function(FN_VOID_PTR, VOID, [PTR_INT]),
        Instruction::type_pointer(PTR_STRUCT, StorageClass::Function, STRUCT),
        Instruction::type_pointer(PTR_FLOAT, StorageClass::Function, FLOAT),
        Instruction::constant(INT_0, INT, [0]),
        Instruction::constant(INT_1, INT, [1]),
        Instruction::constant(INT_2, INT, [2]),
        Instruction::constant(INT_1_DUP, INT, [1]),
        Instruction::constant(FLOAT_0, FLOAT, float_bits(0.0)),
        Instruction::constant(FLOAT_1, FLOAT, float_bits(1.0)),
        Instruction::constant(FLOAT_2, FLOAT, float_bits(2.0)),
        Instruction::constant_composite(VEC2_01, VEC2, [FLOAT_0, FLOAT_1]),
        Instruction::constant(FLOAT_NAN, FLOAT, float_bits(f32::NAN)),
        Instruction::constant(FLOAT_INF, FLOAT, float_bits(f32::INFINITY)),
        Instruction::constant(FLOAT_NEG_INF, FLOAT, float_bits(f32::NEG_INFINITY)),
        Instruction::constant(UINT_5, UINT, [5]),
        Instruction::constant(UINT_7, UINT, [7]),
        Instruction::constant(INT64_NEG3, INT64, [0xFFFF_FFFD, 0xFFFF_FFFF]),
        Instruction::constant(DOUBLE_1_5, DOUBLE, double_bits(1.5)),
        Instruction::constant(DOUBLE_2_5, DOUBLE, double_bits(2.5)),
        Instruction::constant_composite(ARRAY_012, INT_ARRAY3, [INT_0, INT_1, INT_2]),
        Instruction::constant_composite(STRUCT_CONST, STRUCT, [INT_1, FLOAT_1, VEC2_01]),
        Instruction::constant_composite(MAT_CONST, MAT2, [VEC2_01, VEC2_01]),
    ];
    for inst in globals {
        module.add_global(inst);
    }

    let mut main = Function::new(MAIN, VOID, FN_VOID);
    main.add_block(Block::with_instructions(
        ENTRY,
        vec![
            Instruction::variable(VAR_INT, PTR_INT, StorageClass::Function),
            Instruction::variable(VAR_STRUCT, PTR_STRUCT, StorageClass::Function),
            Instruction::load(LOAD, INT, VAR_INT),
            Instruction::copy_object(COPY_VEC2, VEC2, VEC2_01),
            Instruction::new(Opcode::AccessChain)
                .with_result(ACCESS)
                .with_type(PTR_FLOAT)
                .with_id_operands([VAR_STRUCT, INT_1]),
            Instruction::new(Opcode::FunctionCall)
                .with_result(CALL)
                .with_type(VOID)
                .with_id_operands([HELPER, VAR_INT]),
            Instruction::selection_merge(MERGE),
            Instruction::branch_conditional(TRUE, THEN, ELSE),
        ],
    ));
    main.add_block(Block::with_instructions(
        THEN,
        vec![
            Instruction::binary(Opcode::FAdd, FADD, FLOAT, FLOAT_1, FLOAT_2),
            Instruction::binary(Opcode::IAdd, IADD, INT, INT_0, INT_1),
            Instruction::store(VAR_INT, IADD),
            Instruction::branch(MERGE),
        ],
    ));
    main.add_block(Block::with_instructions(
        ELSE,
        vec![
            Instruction::binary(Opcode::FMul, FMUL, FLOAT, FLOAT_1, FLOAT_1),
            Instruction::branch(MERGE),
        ],
    ));
    main.add_block(Block::with_instructions(
        MERGE,
        vec![
            Instruction::phi(PHI, INT, [(IADD, THEN), (INT_0, ELSE)]),
            Instruction::new(Opcode::Select)
                .with_result(SELECT)
                .with_type(INT)
                .with_id_operands([TRUE, INT_1, INT_2]),
            Instruction::binary(Opcode::LogicalAnd, AND, BOOL, TRUE, FALSE),
            Instruction::binary(Opcode::IAdd, MERGE_IADD, INT, LOAD, INT_1),
            Instruction::return_void(),
        ],
    ));
    module.add_function(main);

    let mut helper = Function::new(HELPER, VOID, FN_VOID_PTR);
    helper.add_param(PARAM, PTR_INT);
    helper.add_block(Block::with_instructions(
        HELPER_ENTRY,
        vec![
            Instruction::load(HELPER_LOAD, INT, PARAM),
            Instruction::return_void(),
        ],
    ));
    module.add_function(helper);

    module
}

/// Add a parameterless function `id` returning `value`.
///
/// Its function type and entry label take the two ids after `id`.
pub fn add_value_function(module: &mut Module, id: Id, return_type: Id, value: Id) {
    let function_type = Id(id.0 + 1);
    module.add_global(Instruction::type_function(function_type, return_type, []));
    let mut function = Function::new(id, return_type, function_type);
    function.add_block(Block::with_instructions(
        Id(id.0 + 2),
        vec![Instruction::return_value(value)],
    ));
    module.add_function(function);
}

/// Add a void function `id` containing a loop, returning the header label.
///
/// ```text
/// entry(id+1): br header
/// header(id+2): loop_merge id+4 id+3   br %4 ? id+3 : id+4
/// continue(id+3): br header
/// exit(id+4): return
/// ```
pub fn add_loop_function(module: &mut Module, id: Id) -> Id {
    let [entry, header, continue_target, exit] = [1, 2, 3, 4].map(|offset| Id(id.0 + offset));
    let mut function = Function::new(id, VOID, FN_VOID);
    function.add_block(Block::with_instructions(entry, vec![Instruction::branch(header)]));
    function.add_block(Block::with_instructions(
        header,
        vec![
            Instruction::loop_merge(exit, continue_target),
            Instruction::branch_conditional(TRUE, continue_target, exit),
        ],
    ));
    function.add_block(Block::with_instructions(
        continue_target,
        vec![Instruction::branch(header)],
    ));
    function.add_block(Block::with_instructions(exit, vec![Instruction::return_void()]));
    module.add_function(function);
    header
}

/// Handle of the instruction whose result is `id`
pub fn at(module: &Module, id: Id) -> InstructionRef {
    match module.def_location(id) {
        Some(irfuzz_ir::Location::Body(at)) => at,
        other => panic!("{} is not defined in a function body: {:?}", id, other),
    }
}

/// Handle of instruction `index` of the block labelled `label`
pub fn in_block(module: &Module, label: Id, index: usize) -> InstructionRef {
    let block = module.block_ref(label).expect("label");
    InstructionRef {
        function: block.function,
        block: block.block,
        index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_is_valid() {
        let module = module();
        irfuzz_ir::validate_module(&module).unwrap();
        assert!(module.is_fresh_id(Id(100)));
        assert_eq!(at(&module, IADD), in_block(&module, THEN, 1));

        let mut module = module;
        add_value_function(&mut module, Id(80), FLOAT, FLOAT_1);
        irfuzz_ir::validate_module(&module).unwrap();
        assert_eq!(module.type_of_id(Id(80)), Some(FLOAT));

        let header = add_loop_function(&mut module, Id(90));
        irfuzz_ir::validate_module(&module).unwrap();
        assert_eq!(module.predecessors(header).len(), 2);
    }
}
