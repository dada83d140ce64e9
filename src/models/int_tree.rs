//! Integer-keyed nested tree
//!
//! Cast-off uses a two-level instance (`staff @n → layer @n`) to decide the
//! order in which layers are processed. Keys iterate in ascending order.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntTree {
    pub child: BTreeMap<i32, IntTree>,
}

impl IntTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a path of keys, creating intermediate levels as needed
    pub fn insert(&mut self, path: &[i32]) {
        if let Some((first, rest)) = path.split_first() {
            self.child.entry(*first).or_default().insert(rest);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.child.is_empty()
    }

    /// First-level keys
    pub fn keys(&self) -> impl Iterator<Item = i32> + '_ {
        self.child.keys().copied()
    }

    /// `(first, second)` key pairs in order, e.g. `(staff n, layer n)`
    pub fn pairs(&self) -> Vec<(i32, i32)> {
        self.child
            .iter()
            .flat_map(|(&a, sub)| sub.child.keys().map(move |&b| (a, b)))
            .collect()
    }
}
