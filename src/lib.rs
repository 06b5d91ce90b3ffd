//! Pagehush host library.
//!
//! Assembles the whole in-process rig (page host, store, router, contexts)
//! for the CLI binary and the integration tests.

pub mod cli;
pub mod config;
pub mod runtime;

pub use config::AppCfg;
pub use runtime::AppRuntime;
