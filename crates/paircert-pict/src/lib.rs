//! Adapter around the external PICT pairwise generator.
//!
//! PICT runs as a child process: the model is staged to a temporary file, the
//! seed and strength travel on the documented flags, stdout is captured as
//! TSV and re-projected into the caller's declared column order. The adapter
//! owns the wall-clock budget and the terminate/kill sequence; nothing above
//! it touches the child.

pub mod locate;
pub mod runner;
pub mod tsv;

pub use locate::{resolve_pict, LocateError, PICT_ENV_VAR};
pub use runner::{GeneratorFailure, PictError, PictRunner, SuiteGenerator, STDERR_TAIL_BYTES};
pub use tsv::{parse_suite, TsvError};
