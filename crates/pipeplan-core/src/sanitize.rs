//! Response parsing and sanitization.
//!
//! Turns untrusted generator text into a bounded, policy-filtered [`Plan`]:
//! 1. [`extract_payload`] strips code fences and surrounding prose
//! 2. [`parse_plan`] decodes the JSON into a [`RawPlan`]
//! 3. [`sanitize_and_filter`] normalizes names, keeps single-line commands,
//!    and drops anything the [`PolicyEngine`] rejects
//!
//! An empty result is returned as an empty plan; no default stages are added.

use serde_json::Value;

use crate::error::PlanParseError;
use crate::obs::emit_stage_rejected;
use crate::plan::{Plan, RawPlan, RawStage, Stage, DEFAULT_STAGE_NAME, MAX_STAGE_NAME_LEN};
use crate::policy::PolicyEngine;

const FENCE: &str = "```";

/// Drop a leading fence (with its language tag) and a trailing fence.
///
/// Backticks elsewhere in the line are left alone so string values inside
/// the payload reach the policy unchanged.
fn strip_fence_markers(line: &str) -> &str {
    let mut line = line.trim();
    if let Some(rest) = line.strip_prefix(FENCE) {
        line = rest
            .trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    }
    if let Some(rest) = line.strip_suffix(FENCE) {
        line = rest;
    }
    line
}

/// Pull the JSON object out of free-form generator text.
///
/// Returns the widest `{ ... }` span after removing code fences. If the text
/// has no such span, the cleaned text is returned as-is and decoding will
/// fail later with an explicit error.
pub fn extract_payload(text: &str) -> String {
    let cleaned = text
        .lines()
        .map(strip_fence_markers)
        .collect::<Vec<_>>()
        .join("\n");

    match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => cleaned[start..=end].to_string(),
        _ => cleaned.trim().to_string(),
    }
}

/// Scalars become text; structured or missing values become `None`.
fn field_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Decode a `{"stages": [{"name": ..., "command": ...}]}` payload.
pub fn parse_plan(payload: &str) -> Result<RawPlan, PlanParseError> {
    let value: Value = serde_json::from_str(payload)?;
    let object = value.as_object().ok_or(PlanParseError::NotAnObject)?;
    let entries = object
        .get("stages")
        .and_then(Value::as_array)
        .ok_or(PlanParseError::MissingStages)?;

    let stages = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let stage = entry
                .as_object()
                .ok_or(PlanParseError::InvalidStage { index })?;
            Ok(RawStage {
                name: field_text(stage.get("name")),
                command: field_text(stage.get("command")),
            })
        })
        .collect::<Result<Vec<_>, PlanParseError>>()?;

    Ok(RawPlan { stages })
}

/// Keep `[A-Za-z0-9 ._-]`, cap at 40 chars, fall back to `"Stage"`.
pub fn sanitize_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '-' | '_'))
        .take(MAX_STAGE_NAME_LEN)
        .collect();
    match kept.trim() {
        "" => DEFAULT_STAGE_NAME.to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// Any character that ends a line, including bare `\r` and Unicode separators.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c'..='\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// First line only, trimmed. `None` when nothing is left.
pub fn sanitize_command(command: &str) -> Option<String> {
    let first = command.split(is_line_break).next().unwrap_or("").trim();
    (!first.is_empty()).then(|| first.to_string())
}

/// Bound, normalize, and policy-filter a raw plan.
pub fn sanitize_and_filter(raw: &RawPlan, policy: &PolicyEngine, max_stages: usize) -> Plan {
    let mut stages = Vec::new();

    for (index, raw_stage) in raw.stages.iter().take(max_stages).enumerate() {
        let name = sanitize_name(raw_stage.name.as_deref().unwrap_or(""));

        let Some(command) = raw_stage.command.as_deref().and_then(sanitize_command) else {
            emit_stage_rejected(index, &name, "empty command");
            continue;
        };

        let verdict = policy.evaluate(&command);
        if !verdict.is_allowed() {
            emit_stage_rejected(index, &name, &verdict.to_string());
            continue;
        }

        stages.push(Stage::new(name, command));
    }

    Plan::new(stages)
}

/// Extract, decode, and sanitize in one step.
pub fn process_response(
    text: &str,
    policy: &PolicyEngine,
    max_stages: usize,
) -> Result<Plan, PlanParseError> {
    let payload = extract_payload(text);
    let raw = parse_plan(&payload)?;
    Ok(sanitize_and_filter(&raw, policy, max_stages))
}
