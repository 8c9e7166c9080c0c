//! Configuration types for transformation sessions.

use serde::{Deserialize, Serialize};

/// Fact manager tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactConfig {
    /// Composites with more components than this are not decomposed into
    /// per-component synonyms (the aggregate synonym is still recorded)
    pub max_decomposition_width: u32,
}

impl Default for FactConfig {
    fn default() -> Self {
        Self {
            max_decomposition_width: 64,
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Run the well-formedness oracle after every applied transformation
    pub validate_after_apply: bool,
    /// Stop accepting transformations once this many have been applied
    pub max_transformations: Option<usize>,
    /// Fact manager configuration
    #[serde(default)]
    pub facts: FactConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            validate_after_apply: true,
            max_transformations: None,
            facts: FactConfig::default(),
        }
    }
}
