//! CLI argument definitions: top-level `Cli` struct and `Commands` enum.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub(crate) const CLI_LONG_ABOUT: &str =
    "Pairwise (2-way) combinatorial test suite generator, verifier, and certifier.\n\n\
    paircert drives Microsoft PICT across many seeds, independently proves that\n\
    every produced suite covers all value pairs, keeps the smallest verified\n\
    suite, and certifies provable minimality when the suite size matches the\n\
    pairwise lower bound.\n\n\
    Typical path:\n  \
    1. paircert generate --model my_model.pict\n  \
    2. paircert verify --model my_model.pict --cases suite.csv\n\n\
    Run `paircert doctor` if the external generator cannot be found.";

#[derive(Parser)]
#[command(name = "paircert")]
#[command(about = "Pairwise test suite generator and certifier driving Microsoft PICT")]
#[command(long_about = CLI_LONG_ABOUT)]
#[command(version)]
pub(crate) struct Cli {
    /// Print per-attempt progress to the diagnostic stream
    #[arg(long, global = true, default_value_t = false)]
    pub(crate) verbose: bool,

    /// Running with no command starts the interactive wizard
    #[command(subcommand)]
    pub(crate) command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Generate a pairwise suite from a model file
    #[command(display_order = 10)]
    Generate(GenerateArgs),

    /// Verify pair coverage of an existing suite (CSV or JSON)
    #[command(display_order = 11)]
    Verify(VerifyArgs),

    /// Check that the external generator is installed and runnable
    #[command(display_order = 20)]
    Doctor(DoctorArgs),

    /// Build a model interactively, then generate
    #[command(display_order = 21)]
    Wizard,

    /// Print version information
    #[command(display_order = 30)]
    Version,

    /// Print third-party license notices
    #[command(display_order = 31)]
    Licenses,
}

#[derive(Args)]
pub(crate) struct GenerateArgs {
    /// Path to the model file (`NAME : V1, V2, ...` lines)
    #[arg(long)]
    pub(crate) model: PathBuf,

    /// Output format: table | csv | json
    #[arg(long, default_value = "table")]
    pub(crate) format: String,

    /// Write the suite to a file instead of standard output
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,

    /// Parameter ordering fed to the generator: auto | keep
    #[arg(long, default_value = "auto")]
    pub(crate) ordering: String,

    /// Shorthand for `--ordering keep`
    #[arg(long, default_value_t = false)]
    pub(crate) keep_order: bool,

    /// Number of seeds to try when hunting for the smallest suite
    #[arg(long, default_value_t = 50)]
    pub(crate) tries: u32,

    /// Hard upper limit on `--tries`
    #[arg(long, default_value_t = 5000)]
    pub(crate) max_tries: u32,

    /// Base seed of the attempt sequence
    #[arg(long, default_value_t = 0)]
    pub(crate) seed: u64,

    /// Combinatorial interaction strength (the lower bound exists only at 2)
    #[arg(long, default_value_t = 2)]
    pub(crate) strength: u32,

    /// Fixed seed progression and stable tie-breaking (lower seed wins)
    #[arg(long, default_value_t = false)]
    pub(crate) deterministic: bool,

    /// Stop as soon as a verified suite reaches the lower bound (default)
    #[arg(long, default_value_t = false)]
    pub(crate) early_stop: bool,

    /// Keep trying even after the lower bound is reached
    #[arg(long, default_value_t = false, conflicts_with = "early_stop")]
    pub(crate) no_early_stop: bool,

    /// Prove pair coverage of every produced suite (default)
    #[arg(long, default_value_t = false)]
    pub(crate) verify: bool,

    /// Accept suites without a coverage proof
    #[arg(long, default_value_t = false, conflicts_with = "verify")]
    pub(crate) no_verify: bool,

    /// Never select an unverified suite as best (default when verifying)
    #[arg(long, default_value_t = false)]
    pub(crate) require_verified: bool,

    /// Allow an unverified suite to be selected when nothing verifies
    #[arg(long, default_value_t = false, conflicts_with = "require_verified")]
    pub(crate) no_require_verified: bool,

    /// Wall-clock budget per generator invocation, in seconds
    #[arg(long, default_value_t = 10.0)]
    pub(crate) pict_timeout_sec: f64,

    /// Wall-clock budget for the whole run, in seconds
    #[arg(long, default_value_t = 30.0)]
    pub(crate) total_timeout_sec: f64,

    /// Explicit path to the PICT binary (overrides PAIRCERT_PICT and PATH)
    #[arg(long)]
    pub(crate) pict_path: Option<PathBuf>,

    /// Maximum number of parameters accepted
    #[arg(long, default_value_t = 50)]
    pub(crate) max_params: usize,

    /// Maximum number of values per parameter accepted
    #[arg(long, default_value_t = 50)]
    pub(crate) max_values_per_param: usize,

    /// Maximum total value count accepted
    #[arg(long, default_value_t = 500)]
    pub(crate) max_total_values: usize,

    /// Withhold table/csv console output larger than this many cases
    #[arg(long, default_value_t = 100_000)]
    pub(crate) max_output_cases: usize,

    /// Print the suite to the console regardless of its size
    #[arg(long, default_value_t = false)]
    pub(crate) print_all: bool,

    /// Parse the model and plan the seeds, but do not run the generator
    #[arg(long, default_value_t = false)]
    pub(crate) dry_run: bool,
}

impl GenerateArgs {
    pub(crate) fn early_stop_effective(&self) -> bool {
        self.early_stop || !self.no_early_stop
    }

    pub(crate) fn verify_effective(&self) -> bool {
        self.verify || !self.no_verify
    }

    pub(crate) fn require_verified_effective(&self) -> bool {
        if self.no_require_verified {
            false
        } else if self.require_verified {
            true
        } else {
            self.verify_effective()
        }
    }
}

#[derive(Args)]
pub(crate) struct VerifyArgs {
    /// Path to the model file
    #[arg(long)]
    pub(crate) model: PathBuf,

    /// Path to the cases file (.csv, or .json in the structured shape)
    #[arg(long)]
    pub(crate) cases: PathBuf,
}

#[derive(Args)]
pub(crate) struct DoctorArgs {
    /// Explicit path to the PICT binary to check
    #[arg(long)]
    pub(crate) pict_path: Option<PathBuf>,
}
