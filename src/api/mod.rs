//! Score passes WASM API
//!
//! This module provides the JavaScript-facing API over the pass pipeline.
//!
//! # Module Structure
//!
//! - `helpers`: Shared utilities for serialization, validation, error handling, and logging
//! - `passes`: One entry point per pass plus the full pipeline

pub mod helpers;
pub mod passes;

pub use passes::{
    cast_off_mensural, convert_to_page_based, document_outline, run_pipeline, transpose_document,
};
