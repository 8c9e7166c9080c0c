//! Semantics-preserving transformations over the SSA IR.
//!
//! This crate provides:
//! - Data descriptors naming sub-values of composites
//! - A fact manager tracking synonyms, irrelevant ids and dead blocks
//! - Legality queries for availability and insertion points
//! - The transformation library and its serialized records
//! - Sessions that apply and replay transformations against one module

pub mod data_descriptor;
pub mod fact_manager;
pub mod legality;
pub mod session;
pub mod transformation;

#[cfg(test)]
mod fixture;

pub use data_descriptor::DataDescriptor;
pub use fact_manager::{Fact, FactManager};
pub use session::Session;
pub use transformation::{
    CompositeConstruct, CompositeExtract, CompositeInsert, CopyObject, ReplaceBooleanConstantWithConstantBinary,
    ReplaceIdWithSynonym, ReplaceIrrelevantId, Transform, Transformation, TransformationRecord, VectorShuffle,
    RECORD_VERSION,
};
