//! Intermediate Representation (IR) operated on by the transformation engine.
//!
//! This crate defines a mutable, SSA-style module made of typed instructions
//! grouped into functions and basic blocks, together with:
//! - Def-use and dominance analyses, cached until the next mutation
//! - Type and constant queries
//! - Descriptors: stable references to instructions and operand uses
//! - A structural well-formedness check

pub mod analysis;
pub mod descriptor;
pub mod dominance;
pub mod instruction;
pub mod module;
pub mod types;
pub mod validation;

pub use analysis::{DefUseIndex, UseSite};
pub use descriptor::{IdUseDescriptor, InstructionDescriptor};
pub use dominance::DominatorTree;
pub use instruction::{Id, Instruction, Opcode, Operand, StorageClass};
pub use module::{Block, BlockRef, Function, InstructionRef, Location, Module};
pub use types::{ScalarValue, Type};
pub use validation::validate_module;
