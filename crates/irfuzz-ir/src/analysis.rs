//! Def-use index and per-function control-flow graphs.
//!
//! Both are rebuilt from scratch when first queried after a mutation.

use crate::dominance::DominatorTree;
use crate::instruction::{Id, Instruction};
use crate::module::{BlockRef, Function, InstructionRef, Location, Module};
use std::collections::HashMap;

/// One id operand slot: the using instruction and the input operand index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UseSite {
    pub user: Location,
    pub operand: usize,
}

/// Definition site of every id, and every input-operand use of it.
/// Result-type references are not recorded as uses.
#[derive(Debug, Clone, Default)]
pub struct DefUseIndex {
    defs: HashMap<Id, Location>,
    uses: HashMap<Id, Vec<UseSite>>,
}

impl DefUseIndex {
    pub fn build(module: &Module) -> Self {
        let mut index = Self::default();

        for (i, inst) in module.globals().iter().enumerate() {
            index.record(Location::Global(i), inst);
        }
        for (f, function) in module.functions().iter().enumerate() {
            index.record(Location::FunctionHeader(f), &function.header);
            for (i, param) in function.params.iter().enumerate() {
                index.record(Location::Parameter { function: f, index: i }, param);
            }
            for (b, block) in function.blocks.iter().enumerate() {
                index.defs.insert(
                    block.label,
                    Location::Label(BlockRef {
                        function: f,
                        block: b,
                    }),
                );
            }
        }
        for (at, inst) in module.body_instructions() {
            index.record(Location::Body(at), inst);
        }

        index
    }

    fn record(&mut self, location: Location, inst: &Instruction) {
        if let Some(id) = inst.result_id {
            self.defs.insert(id, location);
        }
        for (operand, id) in inst.id_operands() {
            self.uses.entry(id).or_default().push(UseSite {
                user: location,
                operand,
            });
        }
    }

    pub fn def(&self, id: Id) -> Option<Location> {
        self.defs.get(&id).copied()
    }

    pub fn uses(&self, id: Id) -> &[UseSite] {
        self.uses.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Body instructions using `id`, with the operand index of each use
    pub fn body_uses(&self, id: Id) -> impl Iterator<Item = (InstructionRef, usize)> + '_ {
        self.uses(id).iter().filter_map(|site| match site.user {
            Location::Body(at) => Some((at, site.operand)),
            _ => None,
        })
    }
}

/// Successor and predecessor lists of a function, by block index.
/// Branches to labels outside the function are ignored.
#[derive(Debug, Clone, Default)]
pub struct ControlFlowGraph {
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
}

impl ControlFlowGraph {
    pub fn build(function: &Function) -> Self {
        let index_of: HashMap<Id, usize> = function
            .blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (b.label, i))
            .collect();

        let n = function.blocks.len();
        let mut successors = vec![Vec::new(); n];
        let mut predecessors = vec![Vec::new(); n];
        for (i, block) in function.blocks.iter().enumerate() {
            let Some(terminator) = block.terminator() else {
                continue;
            };
            for target in terminator.branch_targets() {
                if let Some(&j) = index_of.get(&target) {
                    if !successors[i].contains(&j) {
                        successors[i].push(j);
                        predecessors[j].push(i);
                    }
                }
            }
        }

        Self {
            successors,
            predecessors,
        }
    }

    pub fn num_blocks(&self) -> usize {
        self.successors.len()
    }

    pub fn successors(&self, block: usize) -> &[usize] {
        &self.successors[block]
    }

    pub fn predecessors(&self, block: usize) -> &[usize] {
        &self.predecessors[block]
    }
}

/// Cached control-flow analyses of one function
#[derive(Debug, Clone)]
pub struct FunctionAnalysis {
    pub cfg: ControlFlowGraph,
    pub dominators: DominatorTree,
}

impl FunctionAnalysis {
    pub fn build(function: &Function) -> Self {
        let cfg = ControlFlowGraph::build(function);
        let dominators = DominatorTree::compute(&cfg);
        Self { cfg, dominators }
    }
}
