//! Semantics-preserving transformations.
//!
//! Every transformation is a plain value naming everything it touches through
//! descriptors and fresh ids, so it can be serialized, replayed against a
//! different copy of the same module, and checked before it is applied.
//! `apply` must only be called after `is_applicable` returned true for the
//! same module and facts; violating that is a programming error and panics.

mod composite_construct;
mod composite_extract;
mod composite_insert;
mod copy_object;
mod record;
mod replace_boolean_constant;
mod replace_id_with_synonym;
mod replace_irrelevant_id;
mod vector_shuffle;

pub use composite_construct::CompositeConstruct;
pub use composite_extract::CompositeExtract;
pub use composite_insert::CompositeInsert;
pub use copy_object::CopyObject;
pub use record::{TransformationRecord, RECORD_VERSION};
pub use replace_boolean_constant::ReplaceBooleanConstantWithConstantBinary;
pub use replace_id_with_synonym::ReplaceIdWithSynonym;
pub use replace_irrelevant_id::ReplaceIrrelevantId;
pub use vector_shuffle::{VectorShuffle, UNDEFINED_COMPONENT};

use crate::fact_manager::FactManager;
use irfuzz_ir::{InstructionDescriptor, InstructionRef, Module};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Panic message for `apply` called on an inapplicable transformation
pub(crate) const NOT_APPLICABLE: &str = "transformation applied without being applicable";

/// The operations every transformation supports
pub trait Transform {
    /// Short name used in logs
    const NAME: &'static str;

    /// Decide, without mutating anything, whether the transformation can be applied
    fn is_applicable(&self, module: &Module, facts: &FactManager) -> bool;

    /// Mutate the module and record the facts the change establishes
    fn apply(&self, module: &mut Module, facts: &mut FactManager);
}

/// Any transformation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transformation {
    CompositeConstruct(CompositeConstruct),
    CompositeExtract(CompositeExtract),
    CompositeInsert(CompositeInsert),
    VectorShuffle(VectorShuffle),
    CopyObject(CopyObject),
    ReplaceIdWithSynonym(ReplaceIdWithSynonym),
    ReplaceBooleanConstantWithConstantBinary(ReplaceBooleanConstantWithConstantBinary),
    ReplaceIrrelevantId(ReplaceIrrelevantId),
}

macro_rules! dispatch {
    ($self:expr, $t:ident => $body:expr) => {
        match $self {
            Transformation::CompositeConstruct($t) => $body,
            Transformation::CompositeExtract($t) => $body,
            Transformation::CompositeInsert($t) => $body,
            Transformation::VectorShuffle($t) => $body,
            Transformation::CopyObject($t) => $body,
            Transformation::ReplaceIdWithSynonym($t) => $body,
            Transformation::ReplaceBooleanConstantWithConstantBinary($t) => $body,
            Transformation::ReplaceIrrelevantId($t) => $body,
        }
    };
}

impl Transformation {
    pub fn name(&self) -> &'static str {
        fn name_of<T: Transform>(_: &T) -> &'static str {
            T::NAME
        }
        dispatch!(self, t => name_of(t))
    }

    pub fn is_applicable(&self, module: &Module, facts: &FactManager) -> bool {
        dispatch!(self, t => t.is_applicable(module, facts))
    }

    /// # Panics
    ///
    /// Panics if the transformation is not applicable to `module`.
    pub fn apply(&self, module: &mut Module, facts: &mut FactManager) {
        debug!(transformation = self.name(), "Applying transformation");
        dispatch!(self, t => t.apply(module, facts))
    }

    pub fn to_record(&self) -> TransformationRecord {
        TransformationRecord::new(self.clone())
    }

    pub fn from_record(record: TransformationRecord) -> irfuzz_core::Result<Self> {
        record.into_transformation()
    }
}

macro_rules! impl_from {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Transformation {
                fn from(t: $variant) -> Self {
                    Transformation::$variant(t)
                }
            }
        )*
    };
}

impl_from!(
    CompositeConstruct,
    CompositeExtract,
    CompositeInsert,
    VectorShuffle,
    CopyObject,
    ReplaceIdWithSynonym,
    ReplaceBooleanConstantWithConstantBinary,
    ReplaceIrrelevantId
);

/// Log why a transformation was rejected and return false
pub(crate) fn reject(name: &str, reason: &str) -> bool {
    trace!(transformation = name, reason, "Transformation not applicable");
    false
}

/// Resolve an insertion point that `is_applicable` already checked
pub(crate) fn insertion_point(module: &Module, descriptor: &InstructionDescriptor) -> InstructionRef {
    descriptor.resolve(module).expect(NOT_APPLICABLE)
}
