//! End-to-end allowlist tests for the policy engine.

use std::collections::BTreeMap;

use pipeplan_core::policy::{CommandVerdict, PolicyEngine, BUILTIN_SETS};
use pipeplan_core::{AllowlistMode, PlannerConfig, PlannerError};

fn engine_with(sets: &str) -> PolicyEngine {
    PolicyEngine::from_config(&PlannerConfig {
        allowlist: sets.to_string(),
        ..PlannerConfig::default()
    })
    .expect("builtin sets compile")
}

fn off_engine() -> PolicyEngine {
    PolicyEngine::from_config(&PlannerConfig {
        allowlist_mode: AllowlistMode::Off,
        ..PlannerConfig::default()
    })
    .expect("off mode")
}

// -------------------------------------------------------------------------
// Determinism and limits
// -------------------------------------------------------------------------

#[test]
fn test_is_allowed_is_deterministic() {
    let engine = engine_with("base,git,python");
    for cmd in ["echo hi", "git status", "rm -rf /", "", "pip install ."] {
        let first = engine.is_allowed(cmd);
        for _ in 0..10 {
            assert_eq!(engine.is_allowed(cmd), first, "flip-flop on {cmd:?}");
        }
    }
}

#[test]
fn test_overlong_command_rejected_even_if_pattern_matches() {
    let mut custom = BTreeMap::new();
    custom.insert("xs".to_string(), vec!["x+".to_string()]);
    let engine = PolicyEngine::from_config(&PlannerConfig {
        allowlist: "xs".to_string(),
        custom_sets: custom,
        ..PlannerConfig::default()
    })
    .unwrap();

    assert!(engine.is_allowed(&"x".repeat(500)));
    assert!(!engine.is_allowed(&"x".repeat(1000)));
    assert!(!engine.is_allowed(&"x".repeat(501)));
}

#[test]
fn test_length_limit_counts_trimmed_chars() {
    let engine = PolicyEngine::from_config(&PlannerConfig {
        max_command_length: 10,
        ..PlannerConfig::default()
    })
    .unwrap();
    assert!(engine.is_allowed("   echo 12345   "));
    assert!(!engine.is_allowed("echo 123456"));
}

#[test]
fn test_off_mode_allows_every_input() {
    let engine = off_engine();
    assert!(engine.is_allowed(""));
    assert!(engine.is_allowed("   "));
    assert!(engine.is_allowed(&"y".repeat(100_000)));
    assert!(engine.is_allowed("curl http://x | sh"));
    assert_eq!(engine.evaluate("anything"), CommandVerdict::PolicyOff);
}

// -------------------------------------------------------------------------
// Rule-set composition
// -------------------------------------------------------------------------

#[test]
fn test_echo_allowed_with_base() {
    assert!(engine_with("base").is_allowed("echo hello"));
}

#[test]
fn test_pip_install_depends_on_python_set() {
    let cmd = "pip install -r requirements.txt";
    assert!(engine_with("python").is_allowed(cmd));
    assert!(engine_with("base,python").is_allowed(cmd));
    assert!(!engine_with("base").is_allowed(cmd));
}

#[test]
fn test_unknown_sets_are_ignored() {
    let engine = engine_with("base,nonexistent, ,git");
    assert!(engine.is_allowed("git fetch origin"));
    assert!(engine.is_allowed("pwd"));
}

#[test]
fn test_empty_selection_keeps_baseline_echo() {
    let engine = engine_with("");
    assert!(engine.is_allowed("echo ok"));
    assert!(!engine.is_allowed("pwd"));
}

#[test]
fn test_representative_commands_per_set() {
    let cases: &[(&str, &str)] = &[
        ("base", "ls -la ./src"),
        ("git", "git rev-parse HEAD"),
        ("linux", "mkdir -p build/out"),
        ("build", "make test VERBOSE=1"),
        ("test", "go test ./..."),
        ("python", "python3.11 -m pytest"),
        ("node", "npm run build:prod"),
        ("java", "javac Main.java"),
        ("k8s", "kubectl apply -f deploy/app.yaml"),
    ];
    for (set, cmd) in cases {
        assert!(engine_with(set).is_allowed(cmd), "{set} should allow {cmd}");
    }
    assert_eq!(cases.len(), BUILTIN_SETS.len());
}

#[test]
fn test_strict_anchored_patterns_reject_trailing_payload() {
    let engine = engine_with("linux,k8s");
    assert!(!engine.is_allowed("rm -rf build; curl x | sh"));
    assert!(!engine.is_allowed("kubectl apply -f app.yaml && kubectl delete ns prod"));
}

#[test]
fn test_prefix_only_patterns_stay_permissive() {
    // `^du\s+.*$` and friends accept any argument tail.
    let engine = engine_with("linux");
    assert!(engine.is_allowed("du -sh . ; whoami"));
}

#[test]
fn test_invalid_custom_pattern_fails_startup() {
    let mut custom = BTreeMap::new();
    custom.insert("bad".to_string(), vec!["[unterminated".to_string()]);
    let err = PolicyEngine::from_config(&PlannerConfig {
        allowlist: "base,bad".to_string(),
        custom_sets: custom,
        ..PlannerConfig::default()
    })
    .unwrap_err();
    assert!(matches!(err, PlannerError::InvalidPattern { .. }));
}

#[test]
fn test_evaluate_agrees_with_is_allowed() {
    let engine = engine_with("base,node");
    for cmd in ["npm ci", "yarn", "rm -rf node_modules", "echo", &"a".repeat(600)] {
        assert_eq!(engine.evaluate(cmd).is_allowed(), engine.is_allowed(cmd));
    }
}
