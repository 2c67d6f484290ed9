//! Prompt construction for the plan generator.

use crate::context::Context;
use crate::plan::MAX_STAGE_NAME_LEN;

/// Build the instruction text for one context.
///
/// The schema hint mirrors what the sanitizer enforces, so a well-behaved
/// generator produces plans that survive filtering intact.
pub fn build_prompt(context: &Context, max_stages: usize) -> String {
    let context_json = serde_json::to_string_pretty(context.as_map())
        .unwrap_or_else(|_| context.canonical_json());

    format!(
        r#"You are a CI/CD planner that outputs STRICT JSON only.
Given this CI event context:
{context_json}

Respond with STRICT JSON only (no markdown, no code fences). The JSON must follow:
{{
  "stages": [
    {{ "name": "Build", "command": "bash command here" }},
    {{ "name": "Test",  "command": "bash command here" }}
  ]
}}
Rules:
- At most {max_stages} stages.
- Each 'name' is <= {MAX_STAGE_NAME_LEN} chars, letters/digits/space/.-_ only.
- Each 'command' is a SINGLE shell line (no multiline, no heredocs).
- Prefer commonly available tools; avoid destructive ops and secrets.

Focus:
- If the commit message mentions tests or docs only, skip heavy builds.
- If the branch is 'main' or 'release/*', include deploy (safe, idempotent commands).
- Prefer commands commonly used by Python, Node, Java and Go projects.
- Keep commands one-liners compatible with 'sh'.
- Avoid secrets and inline tokens.
"#
    )
}
