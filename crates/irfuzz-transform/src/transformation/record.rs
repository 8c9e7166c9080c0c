//! Serialized form of transformations, used for replay.

use super::Transformation;
use irfuzz_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Version written into every record; anything else is rejected on load
pub const RECORD_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationRecord {
    pub version: u32,
    pub transformation: Transformation,
}

impl TransformationRecord {
    pub fn new(transformation: Transformation) -> Self {
        Self {
            version: RECORD_VERSION,
            transformation,
        }
    }

    pub fn into_transformation(self) -> Result<Transformation> {
        if self.version != RECORD_VERSION {
            return Err(Error::UnsupportedVersion {
                found: self.version,
                expected: RECORD_VERSION,
            });
        }
        Ok(self.transformation)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::from)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::from)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(Error::from)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(Error::from)
    }

    /// Serialize a sequence of records as a JSON array
    pub fn sequence_to_json(records: &[TransformationRecord]) -> Result<String> {
        serde_json::to_string_pretty(records).map_err(Error::from)
    }

    pub fn sequence_from_json(json: &str) -> Result<Vec<TransformationRecord>> {
        serde_json::from_str(json).map_err(Error::from)
    }
}
