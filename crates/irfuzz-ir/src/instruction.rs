//! Instruction set for the SSA IR.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Module-wide identifier of a result (type, constant, value, label, function)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id(pub u32);

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Storage class of a pointer type or variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageClass {
    Input,
    Output,
    Uniform,
    Private,
    Function,
}

impl StorageClass {
    pub fn to_word(self) -> u32 {
        match self {
            StorageClass::Input => 1,
            StorageClass::Uniform => 2,
            StorageClass::Output => 3,
            StorageClass::Private => 6,
            StorageClass::Function => 7,
        }
    }

    pub fn from_word(word: u32) -> Option<Self> {
        match word {
            1 => Some(StorageClass::Input),
            2 => Some(StorageClass::Uniform),
            3 => Some(StorageClass::Output),
            6 => Some(StorageClass::Private),
            7 => Some(StorageClass::Function),
            _ => None,
        }
    }
}

/// IR Opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // Types
    TypeVoid,
    TypeBool,
    TypeInt,
    TypeFloat,
    TypeVector,
    TypeMatrix,
    TypeArray,
    TypeStruct,
    TypePointer,
    TypeFunction,

    // Constants
    ConstantTrue,
    ConstantFalse,
    Constant,
    ConstantComposite,
    Undef,

    // Functions
    Function,
    FunctionParameter,
    FunctionCall,

    // Memory
    Variable,
    Load,
    Store,
    AccessChain,

    // Composites
    CompositeConstruct,
    CompositeExtract,
    CompositeInsert,
    VectorShuffle,
    CopyObject,

    // Arithmetic and logic
    IAdd,
    ISub,
    IMul,
    FAdd,
    FSub,
    FMul,
    LogicalNot,
    LogicalAnd,
    LogicalOr,
    Select,

    // Comparison
    IEqual,
    INotEqual,
    SLessThan,
    SLessThanEqual,
    SGreaterThan,
    SGreaterThanEqual,
    ULessThan,
    ULessThanEqual,
    UGreaterThan,
    UGreaterThanEqual,
    FOrdEqual,
    FOrdNotEqual,
    FOrdLessThan,
    FOrdLessThanEqual,
    FOrdGreaterThan,
    FOrdGreaterThanEqual,
    FUnordEqual,
    FUnordNotEqual,
    FUnordLessThan,
    FUnordLessThanEqual,
    FUnordGreaterThan,
    FUnordGreaterThanEqual,

    // Control flow
    Phi,
    SelectionMerge,
    LoopMerge,
    Branch,
    BranchConditional,
    Return,
    ReturnValue,
    Unreachable,
    Kill,
}

impl Opcode {
    /// Returns true if this opcode ends a block
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Opcode::Branch
                | Opcode::BranchConditional
                | Opcode::Return
                | Opcode::ReturnValue
                | Opcode::Unreachable
                | Opcode::Kill
        )
    }

    /// Returns true for the structured-control-flow merge declarations,
    /// which must sit directly before their block's terminator
    pub fn is_merge(&self) -> bool {
        matches!(self, Opcode::SelectionMerge | Opcode::LoopMerge)
    }

    pub fn is_type_declaration(&self) -> bool {
        matches!(
            self,
            Opcode::TypeVoid
                | Opcode::TypeBool
                | Opcode::TypeInt
                | Opcode::TypeFloat
                | Opcode::TypeVector
                | Opcode::TypeMatrix
                | Opcode::TypeArray
                | Opcode::TypeStruct
                | Opcode::TypePointer
                | Opcode::TypeFunction
        )
    }

    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            Opcode::ConstantTrue
                | Opcode::ConstantFalse
                | Opcode::Constant
                | Opcode::ConstantComposite
                | Opcode::Undef
        )
    }

    /// Relational operators over floating-point scalars
    pub fn is_float_comparison(&self) -> bool {
        matches!(
            self,
            Opcode::FOrdEqual
                | Opcode::FOrdNotEqual
                | Opcode::FOrdLessThan
                | Opcode::FOrdLessThanEqual
                | Opcode::FOrdGreaterThan
                | Opcode::FOrdGreaterThanEqual
                | Opcode::FUnordEqual
                | Opcode::FUnordNotEqual
                | Opcode::FUnordLessThan
                | Opcode::FUnordLessThanEqual
                | Opcode::FUnordGreaterThan
                | Opcode::FUnordGreaterThanEqual
        )
    }

    /// Relational operators accepted for signed integers
    pub fn is_signed_int_comparison(&self) -> bool {
        matches!(
            self,
            Opcode::IEqual
                | Opcode::INotEqual
                | Opcode::SLessThan
                | Opcode::SLessThanEqual
                | Opcode::SGreaterThan
                | Opcode::SGreaterThanEqual
        )
    }

    /// Relational operators accepted for unsigned integers
    pub fn is_unsigned_int_comparison(&self) -> bool {
        matches!(
            self,
            Opcode::IEqual
                | Opcode::INotEqual
                | Opcode::ULessThan
                | Opcode::ULessThanEqual
                | Opcode::UGreaterThan
                | Opcode::UGreaterThanEqual
        )
    }
}

/// An input operand: a reference to a result id, or a literal word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    Id(Id),
    Literal(u32),
}

impl Operand {
    pub fn as_id(&self) -> Option<Id> {
        match self {
            Operand::Id(id) => Some(*id),
            Operand::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<u32> {
        match self {
            Operand::Literal(word) => Some(*word),
            Operand::Id(_) => None,
        }
    }
}

/// A single instruction in the IR
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub result_type: Option<Id>,
    pub result_id: Option<Id>,
    /// Input operands, excluding the result type and result id
    pub operands: Vec<Operand>,
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            result_type: None,
            result_id: None,
            operands: Vec::new(),
        }
    }

    pub fn with_result(mut self, id: Id) -> Self {
        self.result_id = Some(id);
        self
    }

    pub fn with_type(mut self, type_id: Id) -> Self {
        self.result_type = Some(type_id);
        self
    }

    pub fn with_operand(mut self, operand: Operand) -> Self {
        self.operands.push(operand);
        self
    }

    pub fn with_id_operands(mut self, ids: impl IntoIterator<Item = Id>) -> Self {
        self.operands.extend(ids.into_iter().map(Operand::Id));
        self
    }

    pub fn with_literals(mut self, words: impl IntoIterator<Item = u32>) -> Self {
        self.operands.extend(words.into_iter().map(Operand::Literal));
        self
    }

    /// Returns the id operand at `index`, if that operand exists and is an id
    pub fn id_operand(&self, index: usize) -> Option<Id> {
        self.operands.get(index).and_then(Operand::as_id)
    }

    /// Returns the literal operand at `index`, if that operand exists and is a literal
    pub fn literal_operand(&self, index: usize) -> Option<u32> {
        self.operands.get(index).and_then(Operand::as_literal)
    }

    /// Iterate over `(operand index, id)` for every id operand
    pub fn id_operands(&self) -> impl Iterator<Item = (usize, Id)> + '_ {
        self.operands
            .iter()
            .enumerate()
            .filter_map(|(i, operand)| operand.as_id().map(|id| (i, id)))
    }

    // Type declarations

    pub fn type_void(id: Id) -> Self {
        Self::new(Opcode::TypeVoid).with_result(id)
    }

    pub fn type_bool(id: Id) -> Self {
        Self::new(Opcode::TypeBool).with_result(id)
    }

    pub fn type_int(id: Id, width: u32, signed: bool) -> Self {
        Self::new(Opcode::TypeInt)
            .with_result(id)
            .with_literals([width, signed as u32])
    }

    pub fn type_float(id: Id, width: u32) -> Self {
        Self::new(Opcode::TypeFloat)
            .with_result(id)
            .with_literals([width])
    }

    pub fn type_vector(id: Id, component: Id, count: u32) -> Self {
        Self::new(Opcode::TypeVector)
            .with_result(id)
            .with_operand(Operand::Id(component))
            .with_operand(Operand::Literal(count))
    }

    pub fn type_matrix(id: Id, column: Id, count: u32) -> Self {
        Self::new(Opcode::TypeMatrix)
            .with_result(id)
            .with_operand(Operand::Id(column))
            .with_operand(Operand::Literal(count))
    }

    pub fn type_array(id: Id, element: Id, length: Id) -> Self {
        Self::new(Opcode::TypeArray)
            .with_result(id)
            .with_id_operands([element, length])
    }

    pub fn type_struct(id: Id, members: impl IntoIterator<Item = Id>) -> Self {
        Self::new(Opcode::TypeStruct)
            .with_result(id)
            .with_id_operands(members)
    }

    pub fn type_pointer(id: Id, storage: StorageClass, pointee: Id) -> Self {
        Self::new(Opcode::TypePointer)
            .with_result(id)
            .with_operand(Operand::Literal(storage.to_word()))
            .with_operand(Operand::Id(pointee))
    }

    pub fn type_function(id: Id, return_type: Id, params: impl IntoIterator<Item = Id>) -> Self {
        Self::new(Opcode::TypeFunction)
            .with_result(id)
            .with_operand(Operand::Id(return_type))
            .with_id_operands(params)
    }

    // Constants

    pub fn constant_bool(id: Id, bool_type: Id, value: bool) -> Self {
        let opcode = if value {
            Opcode::ConstantTrue
        } else {
            Opcode::ConstantFalse
        };
        Self::new(opcode).with_result(id).with_type(bool_type)
    }

    /// A scalar constant given by its literal words (low word first)
    pub fn constant(id: Id, type_id: Id, words: impl IntoIterator<Item = u32>) -> Self {
        Self::new(Opcode::Constant)
            .with_result(id)
            .with_type(type_id)
            .with_literals(words)
    }

    pub fn constant_composite(id: Id, type_id: Id, constituents: impl IntoIterator<Item = Id>) -> Self {
        Self::new(Opcode::ConstantComposite)
            .with_result(id)
            .with_type(type_id)
            .with_id_operands(constituents)
    }

    // Values

    pub fn variable(id: Id, pointer_type: Id, storage: StorageClass) -> Self {
        Self::new(Opcode::Variable)
            .with_result(id)
            .with_type(pointer_type)
            .with_operand(Operand::Literal(storage.to_word()))
    }

    pub fn load(id: Id, type_id: Id, pointer: Id) -> Self {
        Self::new(Opcode::Load)
            .with_result(id)
            .with_type(type_id)
            .with_operand(Operand::Id(pointer))
    }

    pub fn store(pointer: Id, object: Id) -> Self {
        Self::new(Opcode::Store).with_id_operands([pointer, object])
    }

    pub fn binary(opcode: Opcode, id: Id, type_id: Id, lhs: Id, rhs: Id) -> Self {
        Self::new(opcode)
            .with_result(id)
            .with_type(type_id)
            .with_id_operands([lhs, rhs])
    }

    pub fn copy_object(id: Id, type_id: Id, object: Id) -> Self {
        Self::new(Opcode::CopyObject)
            .with_result(id)
            .with_type(type_id)
            .with_operand(Operand::Id(object))
    }

    /// A phi given as `(value, predecessor label)` pairs
    pub fn phi(id: Id, type_id: Id, incoming: impl IntoIterator<Item = (Id, Id)>) -> Self {
        let mut inst = Self::new(Opcode::Phi).with_result(id).with_type(type_id);
        for (value, predecessor) in incoming {
            inst = inst.with_id_operands([value, predecessor]);
        }
        inst
    }

    // Control flow

    pub fn selection_merge(merge_block: Id) -> Self {
        Self::new(Opcode::SelectionMerge)
            .with_operand(Operand::Id(merge_block))
            .with_operand(Operand::Literal(0))
    }

    pub fn loop_merge(merge_block: Id, continue_block: Id) -> Self {
        Self::new(Opcode::LoopMerge)
            .with_id_operands([merge_block, continue_block])
            .with_operand(Operand::Literal(0))
    }

    pub fn branch(target: Id) -> Self {
        Self::new(Opcode::Branch).with_operand(Operand::Id(target))
    }

    pub fn branch_conditional(condition: Id, if_true: Id, if_false: Id) -> Self {
        Self::new(Opcode::BranchConditional).with_id_operands([condition, if_true, if_false])
    }

    pub fn return_void() -> Self {
        Self::new(Opcode::Return)
    }

    pub fn return_value(value: Id) -> Self {
        Self::new(Opcode::ReturnValue).with_operand(Operand::Id(value))
    }

    /// Labels of the blocks this terminator may transfer control to
    pub fn branch_targets(&self) -> Vec<Id> {
        match self.opcode {
            Opcode::Branch => self.id_operand(0).into_iter().collect(),
            Opcode::BranchConditional => [self.id_operand(1), self.id_operand(2)]
                .into_iter()
                .flatten()
                .collect(),
            _ => Vec::new(),
        }
    }
}
