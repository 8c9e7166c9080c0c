//! Dominator tree computation.
//!
//! Uses the iterative algorithm of Cooper, Harvey and Kennedy over a reverse
//! postorder of the blocks reachable from the entry (block 0). Blocks that are
//! unreachable from the entry have no immediate dominator and are dominated
//! only by themselves.

use crate::analysis::ControlFlowGraph;

#[derive(Debug, Clone)]
pub struct DominatorTree {
    /// Immediate dominator per block; the entry maps to itself, unreachable blocks to `None`
    idom: Vec<Option<usize>>,
}

impl DominatorTree {
    pub fn compute(cfg: &ControlFlowGraph) -> Self {
        let n = cfg.num_blocks();
        if n == 0 {
            return Self { idom: Vec::new() };
        }

        let order = reverse_postorder(cfg);
        let mut rpo_number = vec![usize::MAX; n];
        for (i, &block) in order.iter().enumerate() {
            rpo_number[block] = i;
        }

        let mut idom: Vec<Option<usize>> = vec![None; n];
        idom[0] = Some(0);

        let mut changed = true;
        while changed {
            changed = false;
            for &block in order.iter().skip(1) {
                let mut new_idom: Option<usize> = None;
                for &pred in cfg.predecessors(block) {
                    if idom[pred].is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => intersect(&idom, &rpo_number, pred, current),
                    });
                }
                if new_idom.is_some() && idom[block] != new_idom {
                    idom[block] = new_idom;
                    changed = true;
                }
            }
        }

        Self { idom }
    }

    /// Returns the immediate dominator of a block, or `None` for the entry and
    /// for unreachable blocks
    pub fn immediate_dominator(&self, block: usize) -> Option<usize> {
        if block == 0 {
            return None;
        }
        self.idom.get(block).copied().flatten()
    }

    pub fn is_reachable(&self, block: usize) -> bool {
        matches!(self.idom.get(block), Some(Some(_)))
    }

    /// Checks if block `a` dominates block `b`. A block dominates itself.
    pub fn dominates(&self, a: usize, b: usize) -> bool {
        if a == b {
            return true;
        }
        if !self.is_reachable(a) || !self.is_reachable(b) {
            return false;
        }

        let mut current = b;
        while let Some(idom) = self.immediate_dominator(current) {
            if idom == a {
                return true;
            }
            current = idom;
        }
        false
    }

    pub fn strictly_dominates(&self, a: usize, b: usize) -> bool {
        a != b && self.dominates(a, b)
    }
}

fn intersect(idom: &[Option<usize>], rpo_number: &[usize], mut a: usize, mut b: usize) -> usize {
    while a != b {
        while rpo_number[a] > rpo_number[b] {
            a = idom[a].unwrap_or(0);
        }
        while rpo_number[b] > rpo_number[a] {
            b = idom[b].unwrap_or(0);
        }
    }
    a
}

/// Reverse postorder of the blocks reachable from block 0
fn reverse_postorder(cfg: &ControlFlowGraph) -> Vec<usize> {
    let n = cfg.num_blocks();
    let mut visited = vec![false; n];
    let mut postorder = Vec::with_capacity(n);
    // (block, next successor position)
    let mut stack = vec![(0usize, 0usize)];
    visited[0] = true;

    while let Some((block, next)) = stack.last_mut() {
        let successors = cfg.successors(*block);
        if *next < successors.len() {
            let succ = successors[*next];
            *next += 1;
            if !visited[succ] {
                visited[succ] = true;
                stack.push((succ, 0));
            }
        } else {
            postorder.push(*block);
            stack.pop();
        }
    }

    postorder.reverse();
    postorder
}
