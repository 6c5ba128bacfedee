//! core::types
//!
//! Strong types for the values that flow between git, the inference engine,
//! and the forge.
//!
//! # Types
//!
//! - [`BranchName`] - Validated local branch name
//! - [`Oid`] - Full hexadecimal commit hash
//!
//! Both types validate at construction time, so the inference engine and the
//! orchestrator never have to re-check the strings they carry.
//!
//! # Examples
//!
//! ```
//! use git_stack::core::types::{BranchName, Oid};
//!
//! let branch = BranchName::new("feature/login").unwrap();
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! assert_eq!(branch.as_str(), "feature/login");
//! assert_eq!(oid.short(7), "abc123d");
//!
//! assert!(BranchName::new("bad..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected input to one of the constructors below.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),
}

/// Conversions shared by the validated string newtypes below.
macro_rules! string_newtype {
    ($ty:ident) => {
        impl TryFrom<String> for $ty {
            type Error = TypeError;

            fn try_from(value: String) -> Result<Self, TypeError> {
                $ty::new(value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> String {
                value.0
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

/// Substrings git refuses anywhere in a ref name.
const FORBIDDEN_SEQUENCES: [&str; 3] = ["..", "@{", "//"];

/// Characters git refuses anywhere in a ref name.
const FORBIDDEN_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];

/// A validated local branch name.
///
/// The rules follow `git check-ref-format --branch`: no empty names, no
/// leading `.` or `-`, no trailing `/` or `.lock`, none of `..`, `@{`, `//`,
/// no control characters or glob/refspec punctuation, and not exactly `@`.
///
/// # Example
///
/// ```
/// use git_stack::core::types::BranchName;
///
/// assert!(BranchName::new("user/topic-1").is_ok());
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("topic.lock").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Validate `name`; the error names the first rule it breaks.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if let Some(reason) = Self::violation(&name) {
            return Err(TypeError::InvalidBranchName(format!("'{name}': {reason}")));
        }
        Ok(Self(name))
    }

    /// Return the first rule `name` breaks, if any.
    fn violation(name: &str) -> Option<String> {
        if name.is_empty() {
            return Some("name cannot be empty".into());
        }
        if name == "@" {
            return Some("'@' is reserved".into());
        }
        if name.starts_with('-') {
            return Some("cannot start with '-'".into());
        }
        if name.ends_with('/') {
            return Some("cannot end with '/'".into());
        }
        if let Some(seq) = FORBIDDEN_SEQUENCES.iter().find(|s| name.contains(**s)) {
            return Some(format!("cannot contain '{seq}'"));
        }
        if let Some(c) = name
            .chars()
            .find(|c| FORBIDDEN_CHARS.contains(c) || c.is_ascii_control())
        {
            return Some(format!("cannot contain {c:?}"));
        }
        name.split('/')
            .filter(|component| !component.is_empty())
            .find_map(|component| {
                if component.starts_with('.') {
                    Some(format!("component '{component}' cannot start with '.'"))
                } else if component.ends_with(".lock") {
                    Some(format!("component '{component}' cannot end with '.lock'"))
                } else {
                    None
                }
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A full commit hash (SHA-1 or SHA-256), normalized to lowercase.
///
/// HEAD and every log entry are carried at full length so that equality
/// checks never depend on abbreviation length.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Accepts 40 (SHA-1) or 64 (SHA-256) hex digits in either case.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(format!("'{oid}' is not hexadecimal")));
        }
        Ok(Self(oid))
    }

    /// Abbreviated form for display; the full hash if `len` exceeds it.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

string_newtype!(BranchName);
string_newtype!(Oid);
