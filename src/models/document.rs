//! Arena-backed score tree
//!
//! Nodes live in one vector and refer to each other by [`NodeId`]. Parents own
//! their children through the child list; every other reference (milestone
//! ends, the "current system" of a pass) is a plain id and never owns.
//! Detaching a node leaves it in the arena, unreachable from the root.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::elements::{NodeClass, NodeKind};

/// Index of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node of the score tree
#[derive(Debug, Clone)]
pub struct Node {
    xml_id: String,
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn xml_id(&self) -> &str {
        &self.xml_id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Errors raised when building a document from its nested form
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("Document root must be a <doc> element, found <{0}>")]
    RootNotDoc(String),

    #[error("Duplicate xml:id '{0}'")]
    DuplicateId(String),
}

/// Nested, serializable form of a document (JSON exchange format)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTree {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xml_id: Option<String>,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DocumentTree>,
}

impl DocumentTree {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            xml_id: None,
            kind,
            children: Vec::new(),
        }
    }
}

/// The score tree
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    id_index: HashMap<String, NodeId>,
    next_serial: usize,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only the `<doc>` root
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            id_index: HashMap::new(),
            next_serial: 0,
        };
        doc.root = doc.create(NodeKind::Doc);
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the arena, detached ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[self.root.index()].children.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.index()].kind
    }

    pub fn class(&self, id: NodeId) -> NodeClass {
        self.kind(id).class()
    }

    pub fn xml_id(&self, id: NodeId) -> &str {
        &self.nodes[id.index()].xml_id
    }

    /// Re-key a node; the previous xml:id is released
    pub fn set_xml_id(&mut self, id: NodeId, xml_id: impl Into<String>) {
        let xml_id = xml_id.into();
        let old = std::mem::replace(&mut self.nodes[id.index()].xml_id, xml_id.clone());
        if self.id_index.get(&old) == Some(&id) {
            self.id_index.remove(&old);
        }
        self.id_index.insert(xml_id, id);
    }

    pub fn find_by_xml_id(&self, xml_id: &str) -> Option<NodeId> {
        self.id_index.get(xml_id).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// Allocate a detached node with a generated xml:id
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let xml_id = self.generate_xml_id(kind.tag());
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            xml_id: xml_id.clone(),
            kind,
            parent: None,
            children: Vec::new(),
        });
        self.id_index.insert(xml_id, id);
        id
    }

    /// Allocate a node and append it to `parent`
    pub fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.create(kind);
        self.attach(parent, id);
        id
    }

    /// Append a node with an explicit xml:id
    pub fn append_with_id(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        xml_id: impl Into<String>,
    ) -> NodeId {
        let id = self.append(parent, kind);
        self.set_xml_id(id, xml_id);
        id
    }

    /// Copy a node's kind into a new detached node; children are not copied
    pub fn clone_shallow(&mut self, id: NodeId) -> NodeId {
        let kind = self.kind(id).clone();
        self.create(kind)
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    /// Insert `child` at `index` among the children of `parent`
    pub fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.nodes[parent.index()].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.index()].parent = Some(parent);
    }

    /// Relocate a node (with its subtree) to the end of `new_parent`
    pub fn move_to(&mut self, id: NodeId, new_parent: NodeId) {
        self.attach(new_parent, id);
    }

    /// Move every child of `from` to the end of `to`, keeping order
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        let children = std::mem::take(&mut self.nodes[from.index()].children);
        for child in children {
            self.nodes[child.index()].parent = Some(to);
            self.nodes[to.index()].children.push(child);
        }
    }

    /// Remove a node from its parent; the node and its subtree stay in the arena
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|&c| c != id);
        }
    }

    /// Put `new` where `old` is and detach `old`
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        let Some(parent) = self.parent(old) else {
            return;
        };
        let index = self.index_in_parent(old).unwrap_or(0);
        self.detach(old);
        self.insert_at(parent, index, new);
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Closest ancestor of the given class
    pub fn ancestor(&self, id: NodeId, class: NodeClass) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if self.class(node) == class {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    pub fn find_child(&self, parent: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| pred(self.kind(c)))
    }

    /// All descendants in document order, `id` excluded
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    pub fn descendants_of_class(&self, id: NodeId, class: NodeClass) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.class(n) == class)
            .collect()
    }

    /// Whether the node is reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Page-based documents carry their content in `<pages>`
    pub fn is_page_based(&self) -> bool {
        self.find_child(self.root, |k| matches!(k, NodeKind::Pages))
            .is_some()
    }

    pub fn pages(&self) -> Vec<NodeId> {
        self.children(self.root)
            .iter()
            .filter(|&&c| self.class(c) == NodeClass::Pages)
            .flat_map(|&pages| self.children(pages).iter().copied())
            .filter(|&p| self.class(p) == NodeClass::Page)
            .collect()
    }

    /// Build a document from its nested form
    pub fn from_tree(tree: &DocumentTree) -> Result<Document, TreeError> {
        if tree.kind != NodeKind::Doc {
            return Err(TreeError::RootNotDoc(tree.kind.tag().to_string()));
        }
        let mut seen = HashSet::new();
        check_unique_ids(tree, &mut seen)?;

        let mut doc = Document::new();
        let root = doc.root;
        if let Some(xml_id) = &tree.xml_id {
            doc.set_xml_id(root, xml_id.clone());
        }
        for child in &tree.children {
            doc.append_tree(root, child);
        }
        Ok(doc)
    }

    fn append_tree(&mut self, parent: NodeId, tree: &DocumentTree) -> NodeId {
        let id = self.append(parent, tree.kind.clone());
        if let Some(xml_id) = &tree.xml_id {
            // explicit ids win over generated ones
            if let Some(other) = self.find_by_xml_id(xml_id) {
                let fresh = self.generate_xml_id(self.kind(other).tag());
                self.set_xml_id(other, fresh);
            }
            self.set_xml_id(id, xml_id.clone());
        }
        for child in &tree.children {
            self.append_tree(id, child);
        }
        id
    }

    /// Nested form of the attached tree
    pub fn to_tree(&self) -> DocumentTree {
        self.subtree(self.root)
    }

    pub fn subtree(&self, id: NodeId) -> DocumentTree {
        DocumentTree {
            xml_id: Some(self.xml_id(id).to_string()),
            kind: self.kind(id).clone(),
            children: self.children(id).iter().map(|&c| self.subtree(c)).collect(),
        }
    }

    fn generate_xml_id(&mut self, tag: &str) -> String {
        loop {
            self.next_serial += 1;
            let candidate = format!("{}-{:04}", tag, self.next_serial);
            if !self.id_index.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

fn check_unique_ids<'a>(tree: &'a DocumentTree, seen: &mut HashSet<&'a str>) -> Result<(), TreeError> {
    if let Some(xml_id) = &tree.xml_id {
        if !seen.insert(xml_id.as_str()) {
            return Err(TreeError::DuplicateId(xml_id.clone()));
        }
    }
    tree.children
        .iter()
        .try_for_each(|child| check_unique_ids(child, seen))
}
