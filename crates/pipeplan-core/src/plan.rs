//! Plan and stage types.
//!
//! [`RawPlan`] is whatever the generator claimed; [`Plan`] is what survived
//! sanitization. Only the sanitizer builds a `Plan`, so every `Plan` in the
//! system already satisfies the stage invariants.

use serde::{Deserialize, Serialize};

/// Maximum stage name length, in characters.
pub const MAX_STAGE_NAME_LEN: usize = 40;

/// Name given to stages whose sanitized name is empty.
pub const DEFAULT_STAGE_NAME: &str = "Stage";

/// One named unit of work with a single shell command line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Stage {
    name: String,
    command: String,
}

impl Stage {
    pub(crate) fn new(name: String, command: String) -> Self {
        Self { name, command }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

/// Ordered, policy-filtered sequence of stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    stages: Vec<Stage>,
}

impl Plan {
    pub(crate) fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Commands in execution order.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(Stage::command)
    }
}

/// An unsanitized stage as decoded from generator output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStage {
    pub name: Option<String>,
    pub command: Option<String>,
}

impl RawStage {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            command: Some(command.into()),
        }
    }
}

/// An unsanitized plan as decoded from generator output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPlan {
    pub stages: Vec<RawStage>,
}

impl From<&Plan> for RawPlan {
    fn from(plan: &Plan) -> Self {
        Self {
            stages: plan
                .stages()
                .iter()
                .map(|s| RawStage::new(s.name(), s.command()))
                .collect(),
        }
    }
}
