//! Policy: shape-based allowlisting for generated shell commands.
//!
//! Operators compose named rule-sets (base shell, build tools, per-language
//! test runners, deployment commands) into one compiled allowlist. Any
//! matching pattern allows a command; no match means the command is dropped.
//!
//! # Modules
//!
//! - [`catalog`] — built-in rule-sets and the always-on baseline pattern
//! - [`engine`]  — `PolicyEngine`, `AllowlistRule`, `CommandVerdict`

pub mod catalog;
pub mod engine;

pub use catalog::{builtin_set, BASELINE_PATTERN, BUILTIN_SETS};
pub use engine::{AllowlistRule, CommandVerdict, PolicyEngine};
