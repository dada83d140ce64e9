use crate::models::{Document, IntTree, NodeId};

use super::{Functor, FunctorCode};

/// Collects the `staff @n → layer @n` pairs present under a node
#[derive(Debug, Default)]
pub struct InitProcessingListsFunctor {
    layer_tree: IntTree,
}

impl InitProcessingListsFunctor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer_tree(&self) -> &IntTree {
        &self.layer_tree
    }

    pub fn into_layer_tree(self) -> IntTree {
        self.layer_tree
    }
}

impl Functor for InitProcessingListsFunctor {
    fn visit_layer(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        let layer_n = doc.kind(id).layer_n();
        let staff_n = doc.parent(id).and_then(|staff| doc.kind(staff).staff_n());
        if let (Some(staff_n), Some(layer_n)) = (staff_n, layer_n) {
            self.layer_tree.insert(&[staff_n, layer_n]);
        }
        FunctorCode::SkipChildren
    }
}
