//! Equivalence closure over data descriptors.
//!
//! Classes are kept in a union-find structure. Two rules are applied until a
//! fixpoint is reached each time a pair is merged:
//!
//! - decomposition: if two composites are synonymous, so are their
//!   corresponding components
//! - composition: if every component of two composites of the same type is
//!   synonymous, so are the composites

use crate::data_descriptor::DataDescriptor;
use irfuzz_ir::Module;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone)]
pub(crate) struct DataSynonyms {
    descriptors: Vec<DataDescriptor>,
    indices: HashMap<DataDescriptor, usize>,
    parent: Vec<usize>,
    /// Members of each class; only meaningful at class roots
    members: Vec<Vec<usize>>,
    max_decomposition_width: u32,
}

impl DataSynonyms {
    pub fn new(max_decomposition_width: u32) -> Self {
        Self {
            descriptors: Vec::new(),
            indices: HashMap::new(),
            parent: Vec::new(),
            members: Vec::new(),
            max_decomposition_width,
        }
    }

    fn intern(&mut self, descriptor: DataDescriptor) -> usize {
        if let Some(&index) = self.indices.get(&descriptor) {
            return index;
        }
        let index = self.descriptors.len();
        self.indices.insert(descriptor.clone(), index);
        self.descriptors.push(descriptor);
        self.parent.push(index);
        self.members.push(vec![index]);
        index
    }

    /// Classes are merged smaller-into-larger, so paths stay logarithmic
    fn find(&self, mut index: usize) -> usize {
        while self.parent[index] != index {
            index = self.parent[index];
        }
        index
    }

    fn root_of(&self, descriptor: &DataDescriptor) -> Option<usize> {
        self.indices.get(descriptor).map(|&index| self.find(index))
    }

    /// Merge the classes of `a` and `b`, returning the new root if anything changed
    fn union(&mut self, a: usize, b: usize) -> Option<usize> {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return None;
        }
        let (big, small) = if self.members[ra].len() >= self.members[rb].len() {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small] = big;
        let moved = std::mem::take(&mut self.members[small]);
        self.members[big].extend(moved);
        Some(big)
    }

    /// Record `a ≡ b` and close over decomposition and composition.
    ///
    /// Derived pairs touching a descriptor for which `suppressed` holds are
    /// not recorded.
    pub fn add(
        &mut self,
        module: &Module,
        a: DataDescriptor,
        b: DataDescriptor,
        suppressed: impl Fn(&DataDescriptor) -> bool,
    ) {
        let mut pending = VecDeque::from([(a, b)]);

        while let Some((a, b)) = pending.pop_front() {
            if suppressed(&a) || suppressed(&b) {
                continue;
            }
            let ia = self.intern(a.clone());
            let ib = self.intern(b.clone());
            let Some(root) = self.union(ia, ib) else {
                continue;
            };

            let width = self
                .decomposition_width(module, &a)
                .or_else(|| self.decomposition_width(module, &b));
            if let Some(width) = width {
                for i in 0..width {
                    pending.push_back((a.child(i), b.child(i)));
                }
            }
            self.compose(module, root, &mut pending);
        }
    }

    /// Number of components to propagate through, or `None` for scalars and
    /// composites wider than the cap
    fn decomposition_width(&self, module: &Module, descriptor: &DataDescriptor) -> Option<u32> {
        let width = module.composite_len(descriptor.type_id(module)?)?;
        (width <= self.max_decomposition_width).then_some(width)
    }

    /// Find pairs of parents of `root`'s members whose components now all agree
    fn compose(&self, module: &Module, root: usize, pending: &mut VecDeque<(DataDescriptor, DataDescriptor)>) {
        let parents: Vec<DataDescriptor> = self.members[root]
            .iter()
            .filter_map(|&m| self.descriptors[m].parent())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        for (i, p) in parents.iter().enumerate() {
            let Some(p_type) = p.type_id(module) else {
                continue;
            };
            let Some(width) = self.decomposition_width(module, p) else {
                continue;
            };
            for q in &parents[i + 1..] {
                if q.type_id(module) != Some(p_type) || self.is_synonymous(p, q) {
                    continue;
                }
                let all_agree = (0..width).all(|k| {
                    matches!(
                        (self.root_of(&p.child(k)), self.root_of(&q.child(k))),
                        (Some(x), Some(y)) if x == y
                    )
                });
                if all_agree {
                    pending.push_back((p.clone(), q.clone()));
                }
            }
        }
    }

    pub fn is_synonymous(&self, a: &DataDescriptor, b: &DataDescriptor) -> bool {
        if a == b {
            return true;
        }
        match (self.root_of(a), self.root_of(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /// Every other descriptor known to be synonymous with `descriptor`
    pub fn class_of(&self, descriptor: &DataDescriptor) -> Vec<DataDescriptor> {
        let Some(root) = self.root_of(descriptor) else {
            return Vec::new();
        };
        self.members[root]
            .iter()
            .map(|&m| &self.descriptors[m])
            .filter(|d| *d != descriptor)
            .cloned()
            .collect()
    }
}
