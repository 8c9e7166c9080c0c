//! Type and constant queries over a module.

use crate::instruction::{Id, Instruction, Opcode, StorageClass};
use crate::module::Module;

/// Decoded type declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Void,
    Bool,
    Int { width: u32, signed: bool },
    Float { width: u32 },
    Vector { component: Id, count: u32 },
    Matrix { column: Id, count: u32 },
    Array { element: Id, length: Id },
    Struct { members: Vec<Id> },
    Pointer { storage: StorageClass, pointee: Id },
    Function { return_type: Id, params: Vec<Id> },
}

impl Type {
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            Type::Vector { .. } | Type::Matrix { .. } | Type::Array { .. } | Type::Struct { .. }
        )
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer { .. })
    }

    fn decode(inst: &Instruction) -> Option<Self> {
        let ty = match inst.opcode {
            Opcode::TypeVoid => Type::Void,
            Opcode::TypeBool => Type::Bool,
            Opcode::TypeInt => Type::Int {
                width: inst.literal_operand(0)?,
                signed: inst.literal_operand(1)? != 0,
            },
            Opcode::TypeFloat => Type::Float {
                width: inst.literal_operand(0)?,
            },
            Opcode::TypeVector => Type::Vector {
                component: inst.id_operand(0)?,
                count: inst.literal_operand(1)?,
            },
            Opcode::TypeMatrix => Type::Matrix {
                column: inst.id_operand(0)?,
                count: inst.literal_operand(1)?,
            },
            Opcode::TypeArray => Type::Array {
                element: inst.id_operand(0)?,
                length: inst.id_operand(1)?,
            },
            Opcode::TypeStruct => Type::Struct {
                members: inst
                    .operands
                    .iter()
                    .map(|operand| operand.as_id())
                    .collect::<Option<Vec<_>>>()?,
            },
            Opcode::TypePointer => Type::Pointer {
                storage: StorageClass::from_word(inst.literal_operand(0)?)?,
                pointee: inst.id_operand(1)?,
            },
            Opcode::TypeFunction => Type::Function {
                return_type: inst.id_operand(0)?,
                params: inst
                    .operands
                    .get(1..)?
                    .iter()
                    .map(|operand| operand.as_id())
                    .collect::<Option<Vec<_>>>()?,
            },
            _ => return None,
        };
        Some(ty)
    }
}

/// Value of a scalar constant
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Int { width: u32, signed: bool, bits: u64 },
    Float32(f32),
    Float64(f64),
}

impl ScalarValue {
    /// Integer value, sign-extended when the type is signed
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            ScalarValue::Int {
                width,
                signed: true,
                bits,
            } => Some(match width {
                32 => bits as u32 as i32 as i128,
                _ => bits as i64 as i128,
            }),
            ScalarValue::Int {
                signed: false,
                bits,
                ..
            } => Some(bits as i128),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            ScalarValue::Float32(v) => Some(v as f64),
            ScalarValue::Float64(v) => Some(v),
            _ => None,
        }
    }
}

impl Module {
    /// Decode the type declared by `type_id`
    pub fn type_of(&self, type_id: Id) -> Option<Type> {
        let inst = self.get_def(type_id)?;
        Type::decode(inst)
    }

    /// Decode the type of the value named by `id`
    pub fn value_type(&self, id: Id) -> Option<Type> {
        self.type_of(self.type_of_id(id)?)
    }

    pub fn is_type(&self, id: Id) -> bool {
        self.get_def(id)
            .map(|inst| inst.opcode.is_type_declaration())
            .unwrap_or(false)
    }

    /// Find an existing type declaration equal to `ty`
    pub fn find_type(&self, ty: &Type) -> Option<Id> {
        self.globals()
            .iter()
            .filter(|inst| inst.opcode.is_type_declaration())
            .find(|inst| Type::decode(inst).as_ref() == Some(ty))
            .and_then(|inst| inst.result_id)
    }

    /// Number of components of a composite type
    pub fn composite_len(&self, type_id: Id) -> Option<u32> {
        match self.type_of(type_id)? {
            Type::Vector { count, .. } | Type::Matrix { count, .. } => Some(count),
            Type::Array { length, .. } => {
                let len = self.scalar_constant(length)?.as_i128()?;
                u32::try_from(len).ok()
            }
            Type::Struct { members } => u32::try_from(members.len()).ok(),
            _ => None,
        }
    }

    /// Type of component `index` of a composite type
    pub fn member_type(&self, type_id: Id, index: u32) -> Option<Id> {
        if index >= self.composite_len(type_id)? {
            return None;
        }
        match self.type_of(type_id)? {
            Type::Vector { component, .. } => Some(component),
            Type::Matrix { column, .. } => Some(column),
            Type::Array { element, .. } => Some(element),
            Type::Struct { members } => members.get(index as usize).copied(),
            _ => None,
        }
    }

    /// Walk `path` through a composite type, returning the type reached
    pub fn walk_composite(&self, type_id: Id, path: &[u32]) -> Option<Id> {
        path.iter()
            .try_fold(type_id, |current, &index| self.member_type(current, index))
    }

    /// Decode a scalar `ConstantTrue`, `ConstantFalse` or `Constant`
    pub fn scalar_constant(&self, id: Id) -> Option<ScalarValue> {
        let inst = self.get_def(id)?;
        match inst.opcode {
            Opcode::ConstantTrue => return Some(ScalarValue::Bool(true)),
            Opcode::ConstantFalse => return Some(ScalarValue::Bool(false)),
            Opcode::Constant => {}
            _ => return None,
        }

        let low = inst.literal_operand(0)?;
        let high = inst.literal_operand(1);
        match self.type_of(inst.result_type?)? {
            Type::Int { width: 32, signed } => Some(ScalarValue::Int {
                width: 32,
                signed,
                bits: low as u64,
            }),
            Type::Int { width: 64, signed } => Some(ScalarValue::Int {
                width: 64,
                signed,
                bits: (low as u64) | ((high? as u64) << 32),
            }),
            Type::Float { width: 32 } => Some(ScalarValue::Float32(f32::from_bits(low))),
            Type::Float { width: 64 } => Some(ScalarValue::Float64(f64::from_bits(
                (low as u64) | ((high? as u64) << 32),
            ))),
            _ => None,
        }
    }
}
