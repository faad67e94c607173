//! The paircert engine: best-of-N generator search with independent
//! verification, deterministic selection, and minimality certification.
//!
//! The driver owns the whole run: it applies the ordering plan, walks the
//! seed sequence under two wall-clock budgets, gates every suite through the
//! coverage verifier, and keeps the best candidate under a total selection
//! ordering. Formatting and the exit-code contract live beside it so every
//! outcome is mapped in exactly one place.

pub mod driver;
pub mod exit;
pub mod format;

pub use driver::{
    run_search, AttemptOutcome, BestCandidate, DriverError, DriverOptions, RunAttempt, RunResult,
    UnverifiedRecord,
};
pub use exit::{
    exit_code, EXIT_GENERATOR, EXIT_SUCCESS, EXIT_TIMEOUT, EXIT_VALIDATION, EXIT_VERIFICATION,
};
pub use format::{format_csv, format_table, render_structured, OutputFormat, SuiteMetadata};
