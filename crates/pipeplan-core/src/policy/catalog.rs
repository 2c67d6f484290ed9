//! Built-in allowlist rule-sets.
//!
//! Each set is a capability bundle an operator can switch on by name. Sets
//! overlap on purpose (`pytest` lives in both `test` and `python`) so they
//! compose without ordering concerns.

/// Always-on harmless pattern, included whatever sets are selected.
pub const BASELINE_PATTERN: &str = r"^echo\b.*$";

/// Name recorded as the origin of the baseline pattern.
pub const BASELINE_SET: &str = "baseline";

const BASE: &[&str] = &[
    r"^echo\b.*$",
    r"^true$",
    r"^false$",
    r"^pwd$",
    r"^printenv$",
    r"^env$",
    r"^ls(\s+-[a-zA-Z]+)*(\s+[\w\./\-\*]+)*$",
    r"^cat\s+[\w\./\-\*]+$",
    r"^tee\s+[\w\./\-\*]+$",
];

const GIT: &[&str] = &[
    r"^git\s+status\b.*$",
    r"^git\s+fetch\b.*$",
    r"^git\s+pull\b.*$",
    r"^git\s+submodule\b.*$",
    r"^git\s+rev-parse\b.*$",
    r"^git\s+log\b.*$",
];

const LINUX: &[&str] = &[
    r"^chmod\s+[-+rwxs0-7]+\s+[\w\./\-\*]+$",
    r"^chown\s+[\w:\-]+\s+[\w\./\-\*]+$",
    r"^mv\s+[\w\./\-\*]+\s+[\w\./\-\*]+$",
    r"^cp\s+(-r\s+)?[\w\./\-\*]+\s+[\w\./\-\*]+$",
    r"^rm\s+(-rf|-f|-r)\s+[\w\./\-\*]+$",
    r"^mkdir\s+(-p\s+)?[\w\./\-\*]+$",
    r"^du\s+.*$",
    r"^df\s+.*$",
];

const BUILD: &[&str] = &[
    r"^make(\s+[\w\-=]+)*$",
    r"^cmake\s+.*$",
    r"^mvn\s+.*$",
    r"^gradle\s+.*$",
    r"^gradlew\s+.*$",
];

const TEST: &[&str] = &[
    r"^pytest(\s+.*)?$",
    r"^nose(\s+.*)?$",
    r"^pytest-xdist(\s+.*)?$",
    r"^go\s+test(\s+.*)?$",
    r"^npm\s+test(\s+.*)?$",
    r"^yarn\s+test(\s+.*)?$",
];

const PYTHON: &[&str] = &[
    r"^python(\d+(\.\d+)?)?\s+[-\w\./]+(\s+.*)?$",
    r"^pip(\d+)?\s+install\s+.*$",
    r"^ruff\s+.*$",
    r"^flake8\s+.*$",
    r"^black\s+.*$",
    r"^pytest(\s+.*)?$",
];

const NODE: &[&str] = &[
    r"^npm\s+(ci|i|install)\b.*$",
    r"^npm\s+run\s+[\w\-:]+(\s+.*)?$",
    r"^yarn(\s+.*)?$",
    r"^pnpm(\s+.*)?$",
];

const JAVA: &[&str] = &[
    r"^mvn\s+.*$",
    r"^gradle\s+.*$",
    r"^gradlew\s+.*$",
    r"^java\s+.*$",
    r"^javac\s+.*$",
];

const K8S: &[&str] = &[
    r"^kubectl\s+apply\s+-f\s+[\w\./\-\*]+$",
    r"^kubectl\s+rollout\s+status\s+.*$",
    r"^kubectl\s+get\s+.*$",
];

/// Every built-in set, in catalog order.
pub const BUILTIN_SETS: &[(&str, &[&str])] = &[
    ("base", BASE),
    ("git", GIT),
    ("linux", LINUX),
    ("build", BUILD),
    ("test", TEST),
    ("python", PYTHON),
    ("node", NODE),
    ("java", JAVA),
    ("k8s", K8S),
];

/// Look up a built-in set by name.
pub fn builtin_set(name: &str) -> Option<&'static [&'static str]> {
    BUILTIN_SETS
        .iter()
        .find(|(set_name, _)| *set_name == name)
        .map(|(_, patterns)| *patterns)
}
