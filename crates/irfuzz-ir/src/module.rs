//! Module structure: functions, blocks, and the cached analyses over them.

use crate::analysis::{DefUseIndex, FunctionAnalysis, UseSite};
use crate::dominance::DominatorTree;
use crate::instruction::{Id, Instruction, Opcode, Operand};
use irfuzz_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;

/// A basic block: a label followed by instructions, the last of which is the terminator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub label: Id,
    pub instructions: Vec<Instruction>,
}

impl Block {
    pub fn new(label: Id) -> Self {
        Self {
            label,
            instructions: Vec::new(),
        }
    }

    pub fn with_instructions(label: Id, instructions: Vec<Instruction>) -> Self {
        Self {
            label,
            instructions,
        }
    }

    pub fn add_instruction(&mut self, inst: Instruction) {
        self.instructions.push(inst);
    }

    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|inst| inst.opcode.is_terminator())
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }
}

/// A function: its header instruction, its parameters and its blocks (entry first)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub header: Instruction,
    pub params: Vec<Instruction>,
    pub blocks: Vec<Block>,
}

impl Function {
    pub fn new(id: Id, return_type: Id, function_type: Id) -> Self {
        Self {
            header: Instruction::new(Opcode::Function)
                .with_result(id)
                .with_type(return_type)
                .with_operand(Operand::Literal(0))
                .with_operand(Operand::Id(function_type)),
            params: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn id(&self) -> Option<Id> {
        self.header.result_id
    }

    pub fn add_param(&mut self, id: Id, type_id: Id) {
        self.params.push(
            Instruction::new(Opcode::FunctionParameter)
                .with_result(id)
                .with_type(type_id),
        );
    }

    pub fn add_block(&mut self, block: Block) -> usize {
        self.blocks.push(block);
        self.blocks.len() - 1
    }

    pub fn entry_block(&self) -> Option<&Block> {
        self.blocks.first()
    }

    pub fn block_index(&self, label: Id) -> Option<usize> {
        self.blocks.iter().position(|b| b.label == label)
    }

    /// Count total instructions in the function body
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(|b| b.len()).sum()
    }
}

/// Position of a block inside a module. Only valid until the next mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRef {
    pub function: usize,
    pub block: usize,
}

/// Position of an instruction inside a function body. Only valid until the next mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstructionRef {
    pub function: usize,
    pub block: usize,
    pub index: usize,
}

impl InstructionRef {
    pub fn block_ref(&self) -> BlockRef {
        BlockRef {
            function: self.function,
            block: self.block,
        }
    }
}

/// Where an id is defined, or where a using instruction lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Global(usize),
    FunctionHeader(usize),
    Parameter { function: usize, index: usize },
    Label(BlockRef),
    Body(InstructionRef),
}

/// A complete module
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Module {
    globals: Vec<Instruction>,
    functions: Vec<Function>,
    id_bound: u32,
    #[serde(skip)]
    def_use: OnceCell<DefUseIndex>,
    #[serde(skip)]
    function_analyses: OnceCell<Vec<FunctionAnalysis>>,
}

impl Module {
    pub fn new() -> Self {
        Self {
            id_bound: 1,
            ..Default::default()
        }
    }

    /// Append a type, constant or module-scope variable
    pub fn add_global(&mut self, inst: Instruction) {
        if let Some(id) = inst.result_id {
            self.bump_id_bound(id);
        }
        self.globals.push(inst);
        self.invalidate_analyses();
    }

    pub fn add_function(&mut self, function: Function) -> usize {
        let ids: Vec<Id> = std::iter::once(&function.header)
            .chain(function.params.iter())
            .chain(function.blocks.iter().flat_map(|b| b.instructions.iter()))
            .filter_map(|inst| inst.result_id)
            .chain(function.blocks.iter().map(|b| b.label))
            .collect();
        for id in ids {
            self.bump_id_bound(id);
        }
        self.functions.push(function);
        self.invalidate_analyses();
        self.functions.len() - 1
    }

    pub fn globals(&self) -> &[Instruction] {
        &self.globals
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn function(&self, index: usize) -> Option<&Function> {
        self.functions.get(index)
    }

    pub fn block(&self, at: BlockRef) -> Option<&Block> {
        self.functions.get(at.function)?.blocks.get(at.block)
    }

    pub fn get_instruction(&self, at: InstructionRef) -> Option<&Instruction> {
        self.block(at.block_ref())?.instructions.get(at.index)
    }

    /// The instruction at a location; labels have no instruction
    pub fn instruction_at(&self, location: Location) -> Option<&Instruction> {
        match location {
            Location::Global(index) => self.globals.get(index),
            Location::FunctionHeader(function) => Some(&self.functions.get(function)?.header),
            Location::Parameter { function, index } => {
                self.functions.get(function)?.params.get(index)
            }
            Location::Label(_) => None,
            Location::Body(at) => self.get_instruction(at),
        }
    }

    /// Iterate over every instruction in every function body, in order
    pub fn body_instructions(&self) -> impl Iterator<Item = (InstructionRef, &Instruction)> + '_ {
        self.functions.iter().enumerate().flat_map(|(f, function)| {
            function.blocks.iter().enumerate().flat_map(move |(b, block)| {
                block.instructions.iter().enumerate().map(move |(index, inst)| {
                    (
                        InstructionRef {
                            function: f,
                            block: b,
                            index,
                        },
                        inst,
                    )
                })
            })
        })
    }

    /// Count total instructions in the module, globals included
    pub fn total_instructions(&self) -> usize {
        self.globals.len()
            + self
                .functions
                .iter()
                .map(|f| 1 + f.params.len() + f.instruction_count())
                .sum::<usize>()
    }

    // Ids

    pub fn id_bound(&self) -> u32 {
        self.id_bound
    }

    /// Advance the fresh-id bound past `id`
    pub fn bump_id_bound(&mut self, id: Id) {
        self.id_bound = self.id_bound.max(id.0.saturating_add(1));
    }

    /// An id is fresh when it is non-zero and nothing in the module defines it
    pub fn is_fresh_id(&self, id: Id) -> bool {
        id.0 != 0 && self.def_location(id).is_none()
    }

    // Def-use

    pub fn def_use(&self) -> &DefUseIndex {
        self.def_use.get_or_init(|| DefUseIndex::build(self))
    }

    pub fn def_location(&self, id: Id) -> Option<Location> {
        self.def_use().def(id)
    }

    /// The instruction producing `id`; block labels have none
    pub fn get_def(&self, id: Id) -> Option<&Instruction> {
        self.instruction_at(self.def_location(id)?)
    }

    pub fn uses(&self, id: Id) -> &[UseSite] {
        self.def_use().uses(id)
    }

    /// The type of the value named by `id`
    pub fn type_of_id(&self, id: Id) -> Option<Id> {
        self.get_def(id)?.result_type
    }

    /// The block holding the definition of `id`. Module-scope ids, functions
    /// and function parameters have no containing block.
    pub fn get_containing_block(&self, id: Id) -> Option<BlockRef> {
        match self.def_location(id)? {
            Location::Label(block) => Some(block),
            Location::Body(at) => Some(at.block_ref()),
            _ => None,
        }
    }

    pub fn block_ref(&self, label: Id) -> Option<BlockRef> {
        match self.def_location(label)? {
            Location::Label(block) => Some(block),
            _ => None,
        }
    }

    // Control flow

    fn function_analyses(&self) -> &[FunctionAnalysis] {
        self.function_analyses.get_or_init(|| {
            tracing::trace!(functions = self.functions.len(), "Building control flow analyses");
            self.functions
                .iter()
                .map(FunctionAnalysis::build)
                .collect()
        })
    }

    pub fn dominator_tree(&self, function: usize) -> Option<&DominatorTree> {
        self.function_analyses().get(function).map(|a| &a.dominators)
    }

    /// True if every path from the entry to block `b` passes through block `a`.
    /// Blocks in different functions never dominate each other.
    pub fn dominates(&self, a: Id, b: Id) -> bool {
        match (self.block_ref(a), self.block_ref(b)) {
            (Some(a), Some(b)) => self.block_dominates(a, b),
            _ => false,
        }
    }

    pub fn block_dominates(&self, a: BlockRef, b: BlockRef) -> bool {
        if a.function != b.function {
            return false;
        }
        self.dominator_tree(a.function)
            .map(|tree| tree.dominates(a.block, b.block))
            .unwrap_or(false)
    }

    pub fn is_reachable(&self, block: BlockRef) -> bool {
        self.dominator_tree(block.function)
            .map(|tree| tree.is_reachable(block.block))
            .unwrap_or(false)
    }

    /// Labels of the blocks branching to `label`
    pub fn predecessors(&self, label: Id) -> Vec<Id> {
        let Some(block) = self.block_ref(label) else {
            return Vec::new();
        };
        let function = &self.functions[block.function];
        self.function_analyses()[block.function]
            .cfg
            .predecessors(block.block)
            .iter()
            .map(|&p| function.blocks[p].label)
            .collect()
    }

    // Mutation

    /// Insert `inst` directly before the instruction at `at`.
    ///
    /// # Panics
    ///
    /// Panics if `inst` defines an id that is not fresh, or `at` is stale.
    pub fn insert_before(&mut self, at: InstructionRef, inst: Instruction) {
        if let Some(id) = inst.result_id {
            assert!(self.is_fresh_id(id), "result id {} is not fresh", id);
            self.bump_id_bound(id);
        }
        let block = &mut self.functions[at.function].blocks[at.block];
        assert!(at.index < block.instructions.len(), "stale instruction handle {:?}", at);
        block.instructions.insert(at.index, inst);
        self.invalidate_analyses();
    }

    /// Replace input operand `operand_index` of the instruction at `at`.
    ///
    /// # Panics
    ///
    /// Panics if `at` or `operand_index` is out of range.
    pub fn set_operand(&mut self, at: InstructionRef, operand_index: usize, operand: Operand) {
        let inst = &mut self.functions[at.function].blocks[at.block].instructions[at.index];
        inst.operands[operand_index] = operand;
        self.invalidate_analyses();
    }

    fn invalidate_analyses(&mut self) {
        self.def_use = OnceCell::new();
        self.function_analyses = OnceCell::new();
    }

    // Serialization

    /// Serialize the module to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(Error::from)
    }

    /// Deserialize a module from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(Error::from)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Error::from)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::from)
    }
}
