//! A module, its facts, and the transformations applied to it so far.

use crate::fact_manager::{Fact, FactManager};
use crate::transformation::{Transformation, TransformationRecord};
use irfuzz_core::{Error, Result, SessionConfig};
use irfuzz_ir::{validate_module, Module};
use tracing::{debug, info, trace, warn};

/// Owns a module and its fact manager for the length of a run
pub struct Session {
    module: Module,
    facts: FactManager,
    config: SessionConfig,
    applied: Vec<Transformation>,
}

impl Session {
    /// Start a session with facts seeded from the module's constants
    pub fn new(module: Module, config: SessionConfig) -> Self {
        let facts = FactManager::from_module(&module, config.facts.clone());
        Self::with_facts(module, facts, config)
    }

    pub fn with_facts(module: Module, facts: FactManager, config: SessionConfig) -> Self {
        Self {
            module,
            facts,
            config,
            applied: Vec::new(),
        }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn facts(&self) -> &FactManager {
        &self.facts
    }

    /// Record externally known facts, such as irrelevant ids or dead blocks
    pub fn add_facts(&mut self, facts: impl IntoIterator<Item = Fact>) {
        for fact in facts {
            self.facts.add_fact(&self.module, fact);
        }
    }

    pub fn applied(&self) -> &[Transformation] {
        &self.applied
    }

    /// Apply `transformation` if it is applicable.
    ///
    /// Returns `Ok(false)` when it was not applicable or the session limit
    /// has been reached. When validation is enabled, an applied
    /// transformation that leaves the module ill-formed is an error; the
    /// session should be discarded after that.
    pub fn try_apply(&mut self, transformation: Transformation) -> Result<bool> {
        if let Some(max) = self.config.max_transformations {
            if self.applied.len() >= max {
                debug!(max, "Transformation limit reached");
                return Ok(false);
            }
        }

        if !transformation.is_applicable(&self.module, &self.facts) {
            trace!(transformation = transformation.name(), "Skipping inapplicable transformation");
            return Ok(false);
        }
        transformation.apply(&mut self.module, &mut self.facts);

        if self.config.validate_after_apply {
            if let Err(e) = validate_module(&self.module) {
                warn!(
                    transformation = transformation.name(),
                    error = %e,
                    "Transformation left the module ill-formed"
                );
                return Err(Error::InvalidState(format!(
                    "{} left the module ill-formed: {}",
                    transformation.name(),
                    e
                )));
            }
        }

        self.applied.push(transformation);
        Ok(true)
    }

    /// Apply a sequence of records in order, returning how many applied
    pub fn replay(&mut self, records: impl IntoIterator<Item = TransformationRecord>) -> Result<usize> {
        let mut count = 0;
        let mut total = 0;
        for record in records {
            total += 1;
            if self.try_apply(Transformation::from_record(record)?)? {
                count += 1;
            }
        }
        info!(applied = count, total, "Replay finished");
        Ok(count)
    }

    /// Records of every applied transformation, in order
    pub fn records(&self) -> Vec<TransformationRecord> {
        self.applied.iter().map(Transformation::to_record).collect()
    }

    pub fn into_parts(self) -> (Module, FactManager) {
        (self.module, self.facts)
    }
}
