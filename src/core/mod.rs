//! core
//!
//! Core domain types and the stack inference engine.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid
//! - [`stack`] - Stack model: commit log input, stacks, problems
//! - [`infer`] - Stack inference from commit ancestry
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Inference is pure and deterministic; ambiguity is data, not failure

pub mod config;
pub mod infer;
pub mod stack;
pub mod types;
