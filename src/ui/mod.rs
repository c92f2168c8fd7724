//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Verbosity-gated diagnostics and JSON responses
//!
//! # Design
//!
//! All output goes through this module so that stdout stays reserved for
//! the JSON response a pipeline reads.

pub mod output;
