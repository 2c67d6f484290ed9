//! Pipeplan CLI
//!
//! The `pipeplan` command exposes the plan-safety core for operators and CI
//! scripts.
//!
//! ## Commands
//!
//! - `check`: validate shell commands against the active allowlist
//! - `sanitize`: turn raw generator output into a filtered plan
//! - `sets`: list built-in allowlist rule-sets
//! - `fingerprint`: print the cache fingerprint of a context file
//! - `prompt`: print the generator prompt for a context file
//! - `config`: print the effective configuration

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn, Level};

use pipeplan_core::policy::BUILTIN_SETS;
use pipeplan_core::{
    build_prompt, process_response, AllowlistMode, Context, PlannerConfig, PolicyEngine,
};

#[derive(Parser)]
#[command(name = "pipeplan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Validate and sanitize generated CI/CD pipeline plans", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    policy: PolicyArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Allowlist settings, overridable through the environment.
#[derive(Args, Debug, Clone)]
struct PolicyArgs {
    /// Comma-separated allowlist rule-sets to enable
    #[arg(long, global = true, env = "ALLOWLIST", default_value = "base")]
    allowlist: String,

    /// Allowlist mode: strict or off
    #[arg(long, global = true, env = "ALLOWLIST_MODE", default_value = "strict")]
    allowlist_mode: String,

    /// Maximum number of stages kept from a plan
    #[arg(long, global = true, env = "MAX_STAGES", default_value_t = 12)]
    max_stages: usize,

    /// Maximum command length in characters
    #[arg(long, global = true, env = "MAX_CMD_LENGTH", default_value_t = 500)]
    max_cmd_length: usize,

    /// JSON file mapping extra rule-set names to regex pattern lists
    #[arg(long, global = true, env = "ALLOWLIST_CUSTOM_SETS")]
    custom_sets: Option<PathBuf>,

    /// Plan cache TTL in milliseconds
    #[arg(long, global = true, env = "PLAN_CACHE_TTL_MS", default_value_t = 300_000)]
    cache_ttl_ms: u64,

    /// Per-attempt generator timeout in milliseconds
    #[arg(long, global = true, env = "GENERATOR_TIMEOUT_MS", default_value_t = 30_000)]
    generator_timeout_ms: u64,

    /// Generator attempts per request
    #[arg(long, global = true, env = "GENERATOR_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Base backoff between generator attempts in milliseconds
    #[arg(long, global = true, env = "GENERATOR_BACKOFF_BASE_MS", default_value_t = 500)]
    backoff_base_ms: u64,
}

impl PolicyArgs {
    fn to_config(&self) -> Result<PlannerConfig> {
        let allowlist_mode: AllowlistMode = self.allowlist_mode.parse()?;
        let custom_sets = match &self.custom_sets {
            Some(path) => read_custom_sets(path)?,
            None => BTreeMap::new(),
        };
        let config = PlannerConfig {
            allowlist: self.allowlist.clone(),
            allowlist_mode,
            custom_sets,
            max_stages: self.max_stages,
            max_command_length: self.max_cmd_length,
            cache_ttl_ms: self.cache_ttl_ms,
            generator_timeout_ms: self.generator_timeout_ms,
            max_attempts: self.max_attempts,
            backoff_base_ms: self.backoff_base_ms,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether shell commands are allowed by the active allowlist
    Check {
        /// Commands to check (quote each one)
        #[arg(required = true)]
        commands: Vec<String>,
    },

    /// Extract, decode and filter a raw generator response
    Sanitize {
        /// File with the raw response (default: stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// List built-in allowlist rule-sets
    Sets {
        /// Also print every pattern
        #[arg(long)]
        patterns: bool,
    },

    /// Print the cache fingerprint of a context JSON file
    Fingerprint {
        /// Path to the context JSON object
        #[arg(short, long)]
        context: PathBuf,
    },

    /// Print the generator prompt for a context JSON file
    Prompt {
        /// Path to the context JSON object
        #[arg(short, long)]
        context: PathBuf,
    },

    /// Print the effective planner configuration as JSON
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    pipeplan_core::init_tracing(cli.json, level);

    let config = cli
        .policy
        .to_config()
        .context("Invalid allowlist configuration")?;

    match cli.command {
        Commands::Check { commands } => cmd_check(&config, &commands),
        Commands::Sanitize { input } => cmd_sanitize(&config, input.as_deref()),
        Commands::Sets { patterns } => {
            print!("{}", render_sets(&config, patterns));
            Ok(())
        }
        Commands::Fingerprint { context } => {
            let ctx = read_context(&context)?;
            println!("{}", ctx.fingerprint());
            Ok(())
        }
        Commands::Prompt { context } => {
            let ctx = read_context(&context)?;
            print!("{}", build_prompt(&ctx, config.max_stages));
            Ok(())
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn cmd_check(config: &PlannerConfig, commands: &[String]) -> Result<()> {
    let engine = PolicyEngine::from_config(config)?;
    info!(
        mode = %engine.mode(),
        rules = engine.rules().len(),
        "Checking {} command(s)",
        commands.len()
    );

    let mut denied = 0usize;
    for command in commands {
        let verdict = engine.evaluate(command);
        let mark = if verdict.is_allowed() { "✓" } else { "✗" };
        if !verdict.is_allowed() {
            denied += 1;
        }
        println!("{} {} ({})", mark, command, verdict);
    }

    if denied == 0 {
        Ok(())
    } else {
        anyhow::bail!("{} of {} command(s) denied", denied, commands.len())
    }
}

fn cmd_sanitize(config: &PlannerConfig, input: Option<&Path>) -> Result<()> {
    let engine = PolicyEngine::from_config(config)?;

    let raw = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read response file {:?}", path))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read response from stdin")?;
            buf
        }
    };

    let plan = process_response(&raw, &engine, config.max_stages)
        .context("Generator response is not a valid plan")?;
    if plan.is_empty() {
        warn!("No stage survived filtering");
    }

    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn render_sets(config: &PlannerConfig, with_patterns: bool) -> String {
    let active = config.active_set_names();
    let mut out = String::new();
    for (name, patterns) in BUILTIN_SETS {
        let marker = if active.iter().any(|a| a == name) {
            "*"
        } else {
            " "
        };
        out.push_str(&format!("{} {} ({} patterns)\n", marker, name, patterns.len()));
        if with_patterns {
            for pattern in *patterns {
                out.push_str(&format!("      {}\n", pattern));
            }
        }
    }
    out
}

fn read_context(path: &Path) -> Result<Context> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read context file {:?}", path))?;
    let value: serde_json::Value =
        serde_json::from_str(&data).with_context(|| format!("Invalid JSON in {:?}", path))?;
    Ok(Context::from_value(value)?)
}

fn read_custom_sets(path: &Path) -> Result<BTreeMap<String, Vec<String>>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read custom sets file {:?}", path))?;
    serde_json::from_str(&data).with_context(|| format!("Invalid custom sets in {:?}", path))
}
