//! Facts known to hold about a module.
//!
//! The fact manager records which data descriptors are synonymous, which ids
//! are irrelevant to the module's observable behavior, and which blocks are
//! dead. Facts are monotone: they are only ever added.

mod data_synonym;

use crate::data_descriptor::DataDescriptor;
use data_synonym::DataSynonyms;
use irfuzz_core::FactConfig;
use irfuzz_ir::{Id, Module, Opcode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::trace;

/// A single fact, in the form used to seed a fact manager from a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fact {
    DataSynonym(DataDescriptor, DataDescriptor),
    IdIrrelevant(Id),
    BlockDead(Id),
}

/// True if `descriptor` names an irrelevant object or one defined in a dead block
fn is_suppressed(
    module: &Module,
    irrelevant: &HashSet<Id>,
    dead: &HashSet<Id>,
    descriptor: &DataDescriptor,
) -> bool {
    if irrelevant.contains(&descriptor.object) {
        return true;
    }
    module
        .get_containing_block(descriptor.object)
        .and_then(|block| module.block(block))
        .is_some_and(|block| dead.contains(&block.label))
}

/// Store of facts about a module
#[derive(Debug, Clone)]
pub struct FactManager {
    synonyms: DataSynonyms,
    irrelevant_ids: HashSet<Id>,
    dead_blocks: HashSet<Id>,
}

impl Default for FactManager {
    fn default() -> Self {
        Self::new(FactConfig::default())
    }
}

impl FactManager {
    pub fn new(config: FactConfig) -> Self {
        Self {
            synonyms: DataSynonyms::new(config.max_decomposition_width),
            irrelevant_ids: HashSet::new(),
            dead_blocks: HashSet::new(),
        }
    }

    /// A fact manager seeded with what the module already states: each
    /// component of a composite constant is synonymous with its constituent
    pub fn from_module(module: &Module, config: FactConfig) -> Self {
        let mut facts = Self::new(config);
        for inst in module.globals() {
            if inst.opcode != Opcode::ConstantComposite {
                continue;
            }
            let Some(composite) = inst.result_id else {
                continue;
            };
            for (i, constituent) in inst.id_operands() {
                if let Ok(index) = u32::try_from(i) {
                    facts.add_synonym(
                        module,
                        DataDescriptor::new(composite, vec![index]),
                        DataDescriptor::whole(constituent),
                    );
                }
            }
        }
        facts
    }

    /// Record a fact. Returns false if a synonym fact was suppressed.
    pub fn add_fact(&mut self, module: &Module, fact: Fact) -> bool {
        match fact {
            Fact::DataSynonym(a, b) => self.add_synonym(module, a, b),
            Fact::IdIrrelevant(id) => {
                self.add_irrelevant(id);
                true
            }
            Fact::BlockDead(label) => {
                self.add_dead_block(label);
                true
            }
        }
    }

    /// Record that `a` and `b` always hold the same value.
    ///
    /// The fact is dropped when either object is irrelevant or is defined in a
    /// dead block. Returns whether the fact was recorded.
    pub fn add_synonym(&mut self, module: &Module, a: DataDescriptor, b: DataDescriptor) -> bool {
        let (irrelevant, dead) = (&self.irrelevant_ids, &self.dead_blocks);
        let suppressed = |d: &DataDescriptor| is_suppressed(module, irrelevant, dead, d);
        if suppressed(&a) || suppressed(&b) {
            trace!(lhs = %a, rhs = %b, "Dropping synonym fact about an irrelevant or dead object");
            return false;
        }
        // facts derived by the closure are held to the same rule
        self.synonyms.add(module, a, b, suppressed);
        true
    }

    pub fn is_synonymous(&self, a: &DataDescriptor, b: &DataDescriptor) -> bool {
        self.synonyms.is_synonymous(a, b)
    }

    /// All descriptors known to be synonymous with `descriptor`, excluding itself
    pub fn synonyms_of(&self, descriptor: &DataDescriptor) -> Vec<DataDescriptor> {
        self.synonyms.class_of(descriptor)
    }

    /// Ids whose whole value is synonymous with the whole value of `id`
    pub fn synonymous_ids(&self, id: Id) -> Vec<Id> {
        self.synonyms
            .class_of(&DataDescriptor::whole(id))
            .into_iter()
            .filter(|d| d.is_whole_object())
            .map(|d| d.object)
            .collect()
    }

    pub fn add_irrelevant(&mut self, id: Id) {
        self.irrelevant_ids.insert(id);
    }

    pub fn is_irrelevant(&self, id: Id) -> bool {
        self.irrelevant_ids.contains(&id)
    }

    pub fn add_dead_block(&mut self, label: Id) {
        self.dead_blocks.insert(label);
    }

    pub fn is_dead_block(&self, label: Id) -> bool {
        self.dead_blocks.contains(&label)
    }
}
