//! Plan orchestration: cache lookup, bounded generator retries, sanitization.
//!
//! Every call to [`PlanService::generate_plan`] ends in exactly one
//! [`PlanOutcome`]. Nothing below this layer panics or returns an error for
//! bad generator output; failures are reported as outcomes.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::Instrument;

use crate::cache::PlanCache;
use crate::config::{PlannerConfig, RetryPolicy};
use crate::context::{Context, Fingerprint};
use crate::error::Result;
use crate::generator::{Generator, GeneratorError};
use crate::obs::{
    emit_attempt_failed, emit_cache_hit, emit_plan_outcome, emit_plan_requested, request_span,
};
use crate::plan::Plan;
use crate::policy::PolicyEngine;
use crate::prompt::build_prompt;
use crate::sanitize::process_response;

/// Terminal result of one plan request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    /// At least one stage survived filtering.
    Success(Arc<Plan>),
    /// The response parsed but every stage was filtered out.
    EmptyPlan,
    /// The response could not be decoded into a plan.
    ParseError(String),
    /// No usable generator response; carries the last error seen.
    UpstreamExhausted(String),
}

impl PlanOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PlanOutcome::Success(_))
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PlanOutcome::Success(_) => "success",
            PlanOutcome::EmptyPlan => "empty_plan",
            PlanOutcome::ParseError(_) => "parse_error",
            PlanOutcome::UpstreamExhausted(_) => "upstream_exhausted",
        }
    }

    pub fn plan(&self) -> Option<&Arc<Plan>> {
        match self {
            PlanOutcome::Success(plan) => Some(plan),
            _ => None,
        }
    }
}

/// Result of driving the generator through its retry schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorCall {
    /// Generator invocations made (1 = first attempt succeeded or was terminal).
    pub attempts: u32,
    /// Non-empty response text, or the last error message.
    pub result: std::result::Result<String, String>,
}

/// Call `generator` with per-attempt timeout and exponential backoff.
///
/// Empty text and timeouts count as transient failures. A
/// [`GeneratorError::Terminal`] stops immediately. No sleep precedes the
/// first attempt or follows the last one.
pub async fn call_with_retry(
    generator: &dyn Generator,
    prompt: &str,
    policy: &RetryPolicy,
) -> GeneratorCall {
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 0..max_attempts {
        if attempt > 0 {
            tokio::time::sleep(policy.delay_before(attempt)).await;
        }

        let response = tokio::time::timeout(
            policy.attempt_timeout,
            generator.generate(prompt, policy.attempt_timeout),
        )
        .await;

        let error = match response {
            Ok(Ok(text)) if !text.trim().is_empty() => {
                return GeneratorCall {
                    attempts: attempt + 1,
                    result: Ok(text),
                };
            }
            Ok(Ok(_)) => GeneratorError::Transient("generator returned empty text".to_string()),
            Ok(Err(err)) => err,
            Err(_elapsed) => GeneratorError::Transient(format!(
                "generator call timed out after {}ms",
                policy.attempt_timeout.as_millis()
            )),
        };

        emit_attempt_failed(attempt + 1, error.is_transient(), &error);
        last_error = error.to_string();

        if !error.is_transient() {
            return GeneratorCall {
                attempts: attempt + 1,
                result: Err(last_error),
            };
        }
    }

    GeneratorCall {
        attempts: max_attempts,
        result: Err(last_error),
    }
}

/// Policy-filtered, cached plan generation over a fallible [`Generator`].
///
/// Cheap to share behind an `Arc`; requests run concurrently and only
/// contend on the cache lock.
pub struct PlanService {
    config: PlannerConfig,
    policy: Arc<PolicyEngine>,
    cache: PlanCache,
    generator: Arc<dyn Generator>,
}

impl PlanService {
    /// Validate `config`, compile the allowlist, and wire up the generator.
    ///
    /// Fails fast on any configuration error.
    pub fn new(config: PlannerConfig, generator: Arc<dyn Generator>) -> Result<Self> {
        config.validate()?;
        let policy = Arc::new(PolicyEngine::from_config(&config)?);
        Self::with_policy(config, policy, generator)
    }

    /// Build around an already compiled policy engine.
    ///
    /// `config` is still validated; its allowlist fields are ignored.
    pub fn with_policy(
        config: PlannerConfig,
        policy: Arc<PolicyEngine>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            policy,
            cache: PlanCache::new(),
            generator,
        })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn policy(&self) -> &Arc<PolicyEngine> {
        &self.policy
    }

    pub fn cache(&self) -> &PlanCache {
        &self.cache
    }

    /// Ad-hoc command validation against the active allowlist.
    pub fn is_allowed(&self, command: &str) -> bool {
        self.policy.is_allowed(command)
    }

    /// Produce a plan for `context`, from cache when fresh.
    pub async fn generate_plan(&self, context: &Context) -> PlanOutcome {
        let fingerprint = context.fingerprint();
        let span = request_span(fingerprint.as_str());
        self.run(context, fingerprint).instrument(span).await
    }

    /// Like [`generate_plan`](Self::generate_plan), bounded by an overall
    /// wall-clock `deadline`.
    ///
    /// An in-flight generator call is dropped when the deadline passes; the
    /// remote side may still finish the work.
    pub async fn generate_plan_within(&self, context: &Context, deadline: Duration) -> PlanOutcome {
        match tokio::time::timeout(deadline, self.generate_plan(context)).await {
            Ok(outcome) => outcome,
            Err(_elapsed) => {
                let outcome = PlanOutcome::UpstreamExhausted(format!(
                    "deadline of {}ms exceeded",
                    deadline.as_millis()
                ));
                emit_plan_outcome(outcome.kind(), 0, deadline.as_millis() as u64);
                outcome
            }
        }
    }

    async fn run(&self, context: &Context, fingerprint: Fingerprint) -> PlanOutcome {
        let started = Instant::now();
        emit_plan_requested(fingerprint.as_str());

        if let Some(plan) = self.cache.get(&fingerprint) {
            emit_cache_hit(fingerprint.as_str(), plan.len());
            emit_plan_outcome("success", 0, started.elapsed().as_millis() as u64);
            return PlanOutcome::Success(plan);
        }

        let prompt = build_prompt(context, self.config.max_stages);
        let call = call_with_retry(
            self.generator.as_ref(),
            &prompt,
            &self.config.retry_policy(),
        )
        .await;

        let outcome = match call.result {
            Err(last_error) => PlanOutcome::UpstreamExhausted(last_error),
            Ok(text) => match process_response(&text, &self.policy, self.config.max_stages) {
                Err(err) => PlanOutcome::ParseError(err.to_string()),
                Ok(plan) if plan.is_empty() => PlanOutcome::EmptyPlan,
                Ok(plan) => {
                    let plan = Arc::new(plan);
                    self.cache
                        .put(fingerprint, Arc::clone(&plan), self.config.cache_ttl());
                    PlanOutcome::Success(plan)
                }
            },
        };

        emit_plan_outcome(
            outcome.kind(),
            call.attempts,
            started.elapsed().as_millis() as u64,
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlannerError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Replays a fixed script of responses, repeating the last one.
    struct Scripted {
        script: Vec<std::result::Result<String, GeneratorError>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(script: Vec<std::result::Result<String, GeneratorError>>) -> Self {
            Self {
                script,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Generator for Scripted {
        async fn generate(
            &self,
            _prompt: &str,
            _timeout: Duration,
        ) -> std::result::Result<String, GeneratorError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            self.script[n.min(self.script.len() - 1)].clone()
        }
    }

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts: attempts,
            backoff_base: Duration::from_millis(10),
            attempt_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_first_attempt() {
        let gen = Scripted::new(vec![Ok("{}".into())]);
        let call = call_with_retry(&gen, "p", &policy(3)).await;
        assert_eq!(call.attempts, 1);
        assert_eq!(call.result, Ok("{}".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_error_short_circuits() {
        let gen = Scripted::new(vec![Err(GeneratorError::Terminal("bad key".into()))]);
        let call = call_with_retry(&gen, "p", &policy(5)).await;
        assert_eq!(call.attempts, 1);
        assert!(call.result.unwrap_err().contains("bad key"));
        assert_eq!(gen.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_whitespace_text_counts_as_empty() {
        let gen = Scripted::new(vec![Ok("   \n".into())]);
        let call = call_with_retry(&gen, "p", &policy(2)).await;
        assert_eq!(call.attempts, 2);
        assert!(call.result.unwrap_err().contains("empty text"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_calls_once() {
        let gen = Scripted::new(vec![Ok("{}".into())]);
        let call = call_with_retry(&gen, "p", &policy(0)).await;
        assert_eq!(call.attempts, 1);
    }

    #[test]
    fn test_outcome_kinds() {
        assert_eq!(PlanOutcome::EmptyPlan.kind(), "empty_plan");
        assert_eq!(PlanOutcome::ParseError("x".into()).kind(), "parse_error");
        assert_eq!(
            PlanOutcome::UpstreamExhausted("x".into()).kind(),
            "upstream_exhausted"
        );
        let ok = PlanOutcome::Success(Arc::new(Plan::default()));
        assert!(ok.is_success());
        assert!(ok.plan().is_some());
    }

    #[test]
    fn test_service_rejects_invalid_config() {
        let gen: Arc<dyn Generator> = Arc::new(Scripted::new(vec![Ok("{}".into())]));
        let config = PlannerConfig {
            max_stages: 0,
            ..PlannerConfig::default()
        };
        assert!(PlanService::new(config, gen).is_err());
    }

    #[test]
    fn test_with_policy_validates_config() {
        let gen: Arc<dyn Generator> = Arc::new(Scripted::new(vec![Ok("{}".into())]));
        let engine = Arc::new(PolicyEngine::from_config(&PlannerConfig::default()).unwrap());
        let zero_stages = PlannerConfig {
            max_stages: 0,
            ..PlannerConfig::default()
        };
        let err = PlanService::with_policy(zero_stages, engine.clone(), gen.clone());
        assert!(matches!(err, Err(PlannerError::InvalidConfig(_))));
        assert!(PlanService::with_policy(PlannerConfig::default(), engine, gen).is_ok());
    }
}
