//! ui
//!
//! User-facing text.
//!
//! # Modules
//!
//! - [`output`] - Terminal output formatting for commands
//! - [`stack_description`] - Stack section generation for PR descriptions
//!
//! # Design
//!
//! Everything here is a pure function of its inputs, so the exact text can be
//! tested without a repository or a forge.

pub mod output;
pub mod stack_description;
