//! Score Passes WASM Module
//!
//! Tree rewriting passes over a music score document: conversion to
//! page-based form, mensural cast-off into measures, and transposition.
//! The passes run natively through [`pipeline::Pipeline`] or from JavaScript
//! through [`api`].

pub mod api;
pub mod converters;
pub mod functor;
pub mod models;
pub mod pipeline;
pub mod transposition;

// Re-export commonly used types
pub use functor::{Functor, FunctorCode};
pub use models::*;
pub use pipeline::{Pipeline, PipelineOptions, PipelineReport, TransformError};

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    #[cfg(feature = "console_log")]
    if let Err(e) = console_log::init_with_level(log::Level::Debug) {
        api::helpers::log_warn(&format!("Logger not initialized: {}", e));
    }

    log::info!("Score passes WASM module initialized");
}
