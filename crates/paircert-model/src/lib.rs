//! Parameter model for pairwise suite generation.
//!
//! This crate owns everything that is true about a model independently of any
//! generator run: parsing and normalizing the textual model form, deriving
//! generator-safe parameter names, the pairwise lower bound, and the coverage
//! verifier that proves a candidate suite covers every value pair.

pub mod bounds;
pub mod model;
pub mod verify;

pub use bounds::pairwise_lower_bound;
pub use model::{
    Model, ModelBuilder, ModelError, ModelLimits, OrderingMode, OrderingPlan, Parameter,
    ParameterError,
};
pub use verify::{verify_coverage, CoverageDefect, CoverageReport, DEFECT_REPORT_LIMIT};
