//! Names for sub-values of composite objects.

use irfuzz_ir::{Id, Module};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An object id plus a path of indices into its composite type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataDescriptor {
    pub object: Id,
    pub index: Vec<u32>,
}

impl DataDescriptor {
    pub fn new(object: Id, index: Vec<u32>) -> Self {
        Self { object, index }
    }

    /// The whole object, with an empty index path
    pub fn whole(object: Id) -> Self {
        Self::new(object, Vec::new())
    }

    pub fn child(&self, index: u32) -> Self {
        let mut path = self.index.clone();
        path.push(index);
        Self::new(self.object, path)
    }

    /// The descriptor one level up, or `None` for a whole object
    pub fn parent(&self) -> Option<Self> {
        let (_, prefix) = self.index.split_last()?;
        Some(Self::new(self.object, prefix.to_vec()))
    }

    pub fn is_whole_object(&self) -> bool {
        self.index.is_empty()
    }

    /// Type of the described sub-value, if the object exists and the path is valid
    pub fn type_id(&self, module: &Module) -> Option<Id> {
        let object_type = module.type_of_id(self.object)?;
        module.walk_composite(object_type, &self.index)
    }
}

impl fmt::Display for DataDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", self.object, self.index)
    }
}
