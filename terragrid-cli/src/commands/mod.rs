//! CLI command implementations.
//!
//! - [`config`] - configuration file management (path, init)
//! - [`probe`] - compute one column and print what it holds

pub mod config;
pub mod probe;
