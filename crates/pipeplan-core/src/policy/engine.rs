//! Compiled allowlist evaluation: any-match allows, everything else is denied.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::catalog::{builtin_set, BASELINE_PATTERN, BASELINE_SET};
use crate::config::{AllowlistMode, PlannerConfig};
use crate::error::{PlannerError, Result};

/// A compiled pattern and the rule-set it came from.
#[derive(Debug, Clone)]
pub struct AllowlistRule {
    pub set: String,
    pub pattern: String,
    regex: Regex,
}

impl AllowlistRule {
    /// Compile `pattern`, anchored at the start of the command.
    pub fn compile(set: &str, pattern: &str) -> Result<Self> {
        let regex =
            Regex::new(&format!("^(?:{pattern})")).map_err(|source| PlannerError::InvalidPattern {
                set: set.to_string(),
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self {
            set: set.to_string(),
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, command: &str) -> bool {
        self.regex.is_match(command)
    }
}

/// Why a command was allowed or rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum CommandVerdict {
    /// Matched a pattern from `rule_set`.
    Allowed { rule_set: String },
    /// Enforcement is disabled.
    PolicyOff,
    /// Trimmed command exceeds the configured maximum.
    TooLong { len: usize, max: usize },
    /// No active pattern matched.
    NoMatchingRule,
}

impl CommandVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(
            self,
            CommandVerdict::Allowed { .. } | CommandVerdict::PolicyOff
        )
    }
}

impl std::fmt::Display for CommandVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandVerdict::Allowed { rule_set } => write!(f, "allowed by '{rule_set}'"),
            CommandVerdict::PolicyOff => write!(f, "allowed (policy off)"),
            CommandVerdict::TooLong { len, max } => {
                write!(f, "denied: {len} chars exceeds limit of {max}")
            }
            CommandVerdict::NoMatchingRule => write!(f, "denied: no allowlist rule matched"),
        }
    }
}

/// Immutable command allowlist, built once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    mode: AllowlistMode,
    max_command_length: usize,
    rules: Vec<AllowlistRule>,
}

impl PolicyEngine {
    /// Build the engine from planner configuration.
    ///
    /// Selected set names are resolved against `custom_sets` first, then the
    /// built-in catalog. Unknown names are skipped. The baseline pattern is
    /// always appended if no selected set already carries it. Any pattern that
    /// fails to compile aborts construction, in `off` mode too.
    pub fn from_config(config: &PlannerConfig) -> Result<Self> {
        let mut rules = Vec::new();

        for name in config.active_set_names() {
            let patterns: Vec<String> = match config.custom_sets.get(&name) {
                Some(custom) => custom.clone(),
                None => match builtin_set(&name) {
                    Some(builtin) => builtin.iter().map(|p| p.to_string()).collect(),
                    None => {
                        warn!(set = %name, "Ignoring unknown allowlist set");
                        continue;
                    }
                },
            };
            for pattern in &patterns {
                rules.push(AllowlistRule::compile(&name, pattern)?);
            }
        }

        if !rules.iter().any(|r| r.pattern == BASELINE_PATTERN) {
            rules.push(AllowlistRule::compile(BASELINE_SET, BASELINE_PATTERN)?);
        }

        debug!(
            mode = %config.allowlist_mode,
            rules = rules.len(),
            "Compiled allowlist"
        );

        Ok(Self {
            mode: config.allowlist_mode,
            max_command_length: config.max_command_length,
            rules,
        })
    }

    pub fn mode(&self) -> AllowlistMode {
        self.mode
    }

    pub fn max_command_length(&self) -> usize {
        self.max_command_length
    }

    pub fn rules(&self) -> &[AllowlistRule] {
        &self.rules
    }

    /// Decide whether `command` may appear in an executable plan.
    pub fn is_allowed(&self, command: &str) -> bool {
        self.evaluate(command).is_allowed()
    }

    /// Like [`is_allowed`](Self::is_allowed), with the reason attached.
    pub fn evaluate(&self, command: &str) -> CommandVerdict {
        if self.mode == AllowlistMode::Off {
            return CommandVerdict::PolicyOff;
        }

        let cmd = command.trim();
        let len = cmd.chars().count();
        if len > self.max_command_length {
            return CommandVerdict::TooLong {
                len,
                max: self.max_command_length,
            };
        }

        match self.rules.iter().find(|rule| rule.matches(cmd)) {
            Some(rule) => CommandVerdict::Allowed {
                rule_set: rule.set.clone(),
            },
            None => CommandVerdict::NoMatchingRule,
        }
    }
}
