use crate::models::NodeKind;

/// Restricts a walk to one staff and/or one layer
///
/// Staff and Layer nodes with another `@n` are skipped together with their
/// subtree. Everything else passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Filters {
    pub staff_n: Option<i32>,
    pub layer_n: Option<i32>,
}

impl Filters {
    pub fn new(staff_n: Option<i32>, layer_n: Option<i32>) -> Self {
        Self { staff_n, layer_n }
    }

    pub fn accepts(&self, kind: &NodeKind) -> bool {
        match kind {
            NodeKind::Staff(staff) => self.staff_n.map_or(true, |n| n == staff.n),
            NodeKind::Layer(layer) => self.layer_n.map_or(true, |n| n == layer.n),
            _ => true,
        }
    }
}
