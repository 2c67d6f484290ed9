//! Pipeplan Core Library
//!
//! Turns untrusted, machine-generated CI/CD plans into safe, bounded,
//! cached plans:
//! - [`policy`] decides which shell commands may appear in a plan
//! - [`sanitize`] extracts and filters plans from noisy generator text
//! - [`cache`] keeps validated plans per context fingerprint for a TTL
//! - [`orchestrator`] drives the external [`Generator`] with bounded retries

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod generator;
pub mod obs;
pub mod orchestrator;
pub mod plan;
pub mod policy;
pub mod prompt;
pub mod sanitize;
pub mod telemetry;

pub use cache::PlanCache;
pub use config::{AllowlistMode, PlannerConfig, RetryPolicy};
pub use context::{Context, Fingerprint};
pub use error::{PlanParseError, PlannerError, Result};
pub use generator::{Generator, GeneratorError};
pub use orchestrator::{call_with_retry, GeneratorCall, PlanOutcome, PlanService};
pub use plan::{Plan, RawPlan, RawStage, Stage};
pub use policy::{AllowlistRule, CommandVerdict, PolicyEngine};
pub use prompt::build_prompt;
pub use sanitize::{extract_payload, parse_plan, process_response, sanitize_and_filter};
pub use telemetry::init_tracing;

/// Pipeplan version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
