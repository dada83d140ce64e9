//! Models module for the score tree
//!
//! This module contains the arena document, its node kinds, and the pitch
//! primitives the passes operate on.

pub mod document;
pub mod elements;
pub mod int_tree;
pub mod pitch;

// Re-export commonly used types
pub use document::{Document, DocumentTree, Node, NodeId, TreeError};
pub use elements::*;
pub use int_tree::IntTree;
pub use pitch::{Accidental, Mode, PitchName};
