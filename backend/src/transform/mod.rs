//! Transformation module.
//!
//! - Operations: the deterministic tabular operations
//! - Selector: operation names and instruction keywords → [`Operation`]
//! - Pipeline: load, route to AI or tabular, fall back

pub mod operations;
pub mod pipeline;
pub mod selector;

pub use operations::{apply, operations_description, Operation, TextCase};
pub use pipeline::*;
