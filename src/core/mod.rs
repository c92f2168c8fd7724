//! core
//!
//! Core domain types, path routing and configuration.
//!
//! # Modules
//!
//! - [`types`] - Strong types: PoolName, LockName, Oid
//! - [`paths`] - Tree path routing for pool collections
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Names are validated once, at the boundary
//! - Tree paths are computed in exactly one place

pub mod config;
pub mod paths;
pub mod types;
