//! The multi-seed optimization driver.
//!
//! One run is a strictly sequential walk over a seed sequence: each attempt
//! feeds the (possibly reordered) model to the generator, re-projects the
//! rows into declared order, proves coverage, and competes for the
//! best-so-far slot under a total selection ordering. The loop stops early
//! when a verified suite hits the pairwise lower bound, when the seed budget
//! is exhausted, or when the total wall-clock budget runs out.

use std::time::{Duration, Instant};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

use paircert_model::{
    pairwise_lower_bound, verify_coverage, CoverageReport, Model, OrderingMode, OrderingPlan,
};
use paircert_pict::{parse_suite, GeneratorFailure, SuiteGenerator};

/// The failure taxonomy. Every run-level fault is one of these kinds; the
/// numeric exit contract is derived from the kind in [`crate::exit`].
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Generator(String),
    #[error("coverage verification failed: a {n}-row suite does not cover all pairs")]
    Verification {
        seed: u64,
        n: usize,
        report: CoverageReport,
    },
    #[error("{0}")]
    Timeout(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Recognized options for one driver run.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub ordering: OrderingMode,
    pub tries: u32,
    /// Hard upper clamp on `tries`.
    pub max_tries: u32,
    /// Base of the seed sequence.
    pub seed: u64,
    pub strength: u32,
    /// Stable tie-breaking and the fixed `seed, seed+1, ...` progression.
    pub deterministic: bool,
    /// Stop as soon as a verified suite of size LB is found.
    pub early_stop: bool,
    /// Prove coverage of every produced suite.
    pub verify: bool,
    /// Never select an unverified suite as best.
    pub require_verified: bool,
    pub pict_timeout: Duration,
    pub total_timeout: Duration,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            ordering: OrderingMode::Auto,
            tries: 50,
            max_tries: 5000,
            seed: 0,
            strength: 2,
            deterministic: false,
            early_stop: true,
            verify: true,
            require_verified: true,
            pict_timeout: Duration::from_secs(10),
            total_timeout: Duration::from_secs(30),
        }
    }
}

impl DriverOptions {
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.tries < 1 {
            return Err(DriverError::Validation(
                "tries must be at least 1".to_string(),
            ));
        }
        if self.tries > self.max_tries {
            return Err(DriverError::Validation(format!(
                "tries must be between 1 and {} (got {})",
                self.max_tries, self.tries
            )));
        }
        if self.strength < 2 {
            return Err(DriverError::Validation(
                "strength must be at least 2".to_string(),
            ));
        }
        if self.pict_timeout.is_zero() {
            return Err(DriverError::Validation(
                "per-attempt timeout must be greater than zero".to_string(),
            ));
        }
        if self.total_timeout.is_zero() {
            return Err(DriverError::Validation(
                "total timeout must be greater than zero".to_string(),
            ));
        }
        if !self.verify && self.require_verified {
            return Err(DriverError::Validation(
                "require-verified contradicts no-verify: nothing could ever be selected"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// What one generator invocation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// A suite accepted without a coverage proof (`verify` off).
    Suite { n: usize },
    /// A suite proven to cover every pair.
    Verified { n: usize },
    /// A suite that failed the coverage proof.
    Unverified { n: usize, missing: usize },
    /// The per-attempt wall budget expired.
    Timeout,
    /// The generator failed to produce a usable suite.
    GeneratorError { message: String },
}

/// Append-only record of one generator execution.
#[derive(Debug, Clone)]
pub struct RunAttempt {
    pub index: usize,
    pub seed: u64,
    pub outcome: AttemptOutcome,
    pub wall_time: Duration,
}

/// The suite currently winning the selection ordering.
#[derive(Debug, Clone)]
pub struct BestCandidate {
    pub seed: u64,
    pub attempt_index: usize,
    pub verified: bool,
    pub rows: Vec<Vec<String>>,
}

impl BestCandidate {
    pub fn n(&self) -> usize {
        self.rows.len()
    }
}

/// Smallest verification-failed attempt, kept for the final diagnosis.
#[derive(Debug, Clone)]
pub struct UnverifiedRecord {
    pub seed: u64,
    pub n: usize,
    pub report: CoverageReport,
}

/// Final state of one driver run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub best: Option<BestCandidate>,
    pub attempts: Vec<RunAttempt>,
    /// Pairwise lower bound; absent at any strength other than 2.
    pub lb: Option<usize>,
    pub early_stopped: bool,
    pub total_timed_out: bool,
    pub ordering: OrderingMode,
    pub seed_base: u64,
    pub strength: u32,
    pub deterministic: bool,
    pub verify: bool,
    pub smallest_unverified: Option<UnverifiedRecord>,
    pub last_generator_error: Option<String>,
}

impl RunResult {
    pub fn attempts_used(&self) -> usize {
        self.attempts.len()
    }

    /// Verified, the lower bound is defined, and the suite meets it.
    pub fn provably_minimum(&self) -> bool {
        match (&self.best, self.lb) {
            (Some(best), Some(lb)) => best.verified && best.n() == lb,
            _ => false,
        }
    }

    /// Map the run to the outcome contract: `Ok` means a suite is emitted.
    pub fn conclusion(&self) -> Result<(), DriverError> {
        if let Some(best) = &self.best {
            if best.verified || !self.verify {
                return Ok(());
            }
            // verify was on, nothing verified ever appeared, best is the
            // smallest failed suite
            let record = self
                .smallest_unverified
                .as_ref()
                .cloned()
                .unwrap_or_else(|| UnverifiedRecord {
                    seed: best.seed,
                    n: best.n(),
                    report: CoverageReport::default(),
                });
            return Err(DriverError::Verification {
                seed: record.seed,
                n: record.n,
                report: record.report,
            });
        }

        let saw_timeout = self.total_timed_out
            || self
                .attempts
                .iter()
                .any(|a| a.outcome == AttemptOutcome::Timeout);
        if saw_timeout {
            return Err(DriverError::Timeout(
                "no suite was produced before the time budget expired".to_string(),
            ));
        }
        if let Some(message) = &self.last_generator_error {
            return Err(DriverError::Generator(format!(
                "all generation attempts failed; last error: {message}"
            )));
        }
        if let Some(record) = &self.smallest_unverified {
            return Err(DriverError::Verification {
                seed: record.seed,
                n: record.n,
                report: record.report.clone(),
            });
        }
        Err(DriverError::Internal(
            "run finished without attempts or a recorded failure".to_string(),
        ))
    }
}

/// The seed sequence: a fixed progression in deterministic mode, otherwise a
/// PRNG stream that is itself a pure function of the base seed.
enum SeedSequence {
    Progression { base: u64, next: u64 },
    Drawn(ChaCha8Rng),
}

impl SeedSequence {
    fn new(base: u64, deterministic: bool) -> Self {
        if deterministic {
            SeedSequence::Progression { base, next: 0 }
        } else {
            SeedSequence::Drawn(ChaCha8Rng::seed_from_u64(base))
        }
    }

    fn next_seed(&mut self) -> u64 {
        match self {
            SeedSequence::Progression { base, next } => {
                let seed = base.wrapping_add(*next);
                *next += 1;
                seed
            }
            SeedSequence::Drawn(rng) => u64::from(rng.next_u32()),
        }
    }
}

/// Strict total preference: verified class first, then smaller suites, then
/// the deterministic tie-break on the lower seed. Without `deterministic`,
/// ties keep the earliest attempt.
fn improves(challenger: &BestCandidate, best: &BestCandidate, deterministic: bool) -> bool {
    if challenger.verified != best.verified {
        return challenger.verified;
    }
    if challenger.n() != best.n() {
        return challenger.n() < best.n();
    }
    deterministic && challenger.seed < best.seed
}

/// Run the best-of-N search over `generator`.
pub fn run_search<G: SuiteGenerator>(
    model: &Model,
    generator: &mut G,
    options: &DriverOptions,
) -> Result<RunResult, DriverError> {
    options.validate()?;

    if options.total_timeout < options.pict_timeout {
        warn!(
            total_secs = options.total_timeout.as_secs_f64(),
            per_attempt_secs = options.pict_timeout.as_secs_f64(),
            "total timeout is lower than the per-attempt timeout; both limits are enforced"
        );
    }

    let plan = OrderingPlan::for_mode(model, options.ordering);
    let generator_text = model.to_generator_text(&plan);
    let lb = (options.strength == 2).then(|| pairwise_lower_bound(&model.cardinalities()));

    let mut result = RunResult {
        best: None,
        attempts: Vec::new(),
        lb,
        early_stopped: false,
        total_timed_out: false,
        ordering: options.ordering,
        seed_base: options.seed,
        strength: options.strength,
        deterministic: options.deterministic,
        verify: options.verify,
        smallest_unverified: None,
        last_generator_error: None,
    };

    let start = Instant::now();
    let mut seeds = SeedSequence::new(options.seed, options.deterministic);

    for k in 0..options.tries as usize {
        let elapsed = start.elapsed();
        if elapsed >= options.total_timeout {
            result.total_timed_out = true;
            break;
        }
        let remaining = options.total_timeout - elapsed;
        let attempt_timeout = options.pict_timeout.min(remaining);

        let seed = seeds.next_seed();
        let attempt_start = Instant::now();
        let outcome = run_attempt(
            model,
            generator,
            &generator_text,
            options,
            seed,
            attempt_timeout,
            k,
            &mut result,
        );
        let wall_time = attempt_start.elapsed();

        debug!(
            attempt = k + 1,
            tries = options.tries,
            seed,
            outcome = outcome_label(&outcome),
            wall_ms = wall_time.as_millis() as u64,
            "attempt finished"
        );

        result.attempts.push(RunAttempt {
            index: k,
            seed,
            outcome,
            wall_time,
        });

        if options.early_stop
            && options.verify
            && options.strength == 2
            && result.provably_minimum()
        {
            result.early_stopped = true;
            info!(
                n = result.best.as_ref().map(BestCandidate::n).unwrap_or(0),
                attempts = result.attempts.len(),
                "stopping early: verified suite met the lower bound"
            );
            break;
        }
    }

    Ok(result)
}

#[allow(clippy::too_many_arguments)]
fn run_attempt<G: SuiteGenerator>(
    model: &Model,
    generator: &mut G,
    generator_text: &str,
    options: &DriverOptions,
    seed: u64,
    attempt_timeout: Duration,
    attempt_index: usize,
    result: &mut RunResult,
) -> AttemptOutcome {
    let raw = match generator.generate(generator_text, options.strength, seed, attempt_timeout) {
        Ok(raw) => raw,
        Err(GeneratorFailure::Timeout) => return AttemptOutcome::Timeout,
        Err(GeneratorFailure::Failed { message }) => {
            result.last_generator_error = Some(message.clone());
            return AttemptOutcome::GeneratorError { message };
        }
    };

    let rows = match parse_suite(&raw, model) {
        Ok(rows) => rows,
        Err(error) => {
            let message = error.to_string();
            result.last_generator_error = Some(message.clone());
            return AttemptOutcome::GeneratorError { message };
        }
    };
    let n = rows.len();

    if !options.verify {
        offer_candidate(result, seed, attempt_index, false, rows, options);
        return AttemptOutcome::Suite { n };
    }

    let report = verify_coverage(model, &rows);
    if report.covered() {
        offer_candidate(result, seed, attempt_index, true, rows, options);
        return AttemptOutcome::Verified { n };
    }

    let missing = report.defects.len();
    let replace = match &result.smallest_unverified {
        Some(existing) => n < existing.n,
        None => true,
    };
    if replace {
        result.smallest_unverified = Some(UnverifiedRecord { seed, n, report });
    }
    if !options.require_verified {
        offer_candidate(result, seed, attempt_index, false, rows, options);
    }
    AttemptOutcome::Unverified { n, missing }
}

fn offer_candidate(
    result: &mut RunResult,
    seed: u64,
    attempt_index: usize,
    verified: bool,
    rows: Vec<Vec<String>>,
    options: &DriverOptions,
) {
    let challenger = BestCandidate {
        seed,
        attempt_index,
        verified,
        rows,
    };
    let take = match &result.best {
        Some(best) => improves(&challenger, best, options.deterministic),
        None => true,
    };
    if take {
        debug!(
            seed,
            n = challenger.n(),
            verified,
            "new best candidate"
        );
        result.best = Some(challenger);
    }
}

fn outcome_label(outcome: &AttemptOutcome) -> &'static str {
    match outcome {
        AttemptOutcome::Suite { .. } => "suite",
        AttemptOutcome::Verified { .. } => "verified",
        AttemptOutcome::Unverified { .. } => "unverified",
        AttemptOutcome::Timeout => "timeout",
        AttemptOutcome::GeneratorError { .. } => "generator-error",
    }
}
