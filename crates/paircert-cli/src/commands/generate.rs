// The `generate` command: model -> multi-seed search -> emission.

use std::time::Duration;

use tracing::info;

use paircert_engine::{run_search, DriverError, DriverOptions};
use paircert_model::{ModelLimits, OrderingPlan};
use paircert_pict::{resolve_pict, PictRunner};

use super::helpers::{
    emit_suite, parse_ordering_mode, parse_output_format, read_model, report_coverage_defects,
};
use crate::cli::GenerateArgs;

pub(crate) fn run(args: &GenerateArgs) -> Result<(), DriverError> {
    let format = parse_output_format(&args.format)?;
    let ordering = parse_ordering_mode(&args.ordering, args.keep_order)?;

    if args.pict_timeout_sec <= 0.0 {
        return Err(DriverError::Validation(
            "--pict-timeout-sec must be greater than 0".to_string(),
        ));
    }
    if args.total_timeout_sec <= 0.0 {
        return Err(DriverError::Validation(
            "--total-timeout-sec must be greater than 0".to_string(),
        ));
    }
    if args.no_verify && args.require_verified {
        return Err(DriverError::Validation(
            "--require-verified contradicts --no-verify".to_string(),
        ));
    }

    let options = DriverOptions {
        ordering,
        tries: args.tries,
        max_tries: args.max_tries,
        seed: args.seed,
        strength: args.strength,
        deterministic: args.deterministic,
        early_stop: args.early_stop_effective(),
        verify: args.verify_effective(),
        require_verified: args.require_verified_effective(),
        pict_timeout: Duration::from_secs_f64(args.pict_timeout_sec),
        total_timeout: Duration::from_secs_f64(args.total_timeout_sec),
    };
    // Fail fast on flag errors before any file or binary is touched.
    options.validate()?;

    let limits = ModelLimits {
        max_parameters: args.max_params,
        max_values_per_parameter: args.max_values_per_param,
        max_total_values: args.max_total_values,
    };
    let model = read_model(&args.model, &limits)?;

    if args.dry_run {
        let plan = OrderingPlan::for_mode(&model, options.ordering);
        eprintln!("Model parsed successfully.");
        eprintln!("Internal generator model ({} ordering):", options.ordering.as_str());
        eprintln!("----------------------------------------");
        eprint!("{}", model.to_generator_text(&plan));
        eprintln!("----------------------------------------");
        eprintln!("Would invoke up to {} tries.", options.tries);
        if options.deterministic {
            eprintln!(
                "Planned seed range: {} through {}.",
                options.seed,
                options.seed.saturating_add(u64::from(options.tries) - 1)
            );
        } else {
            eprintln!("Seeds drawn from a PRNG stream based at {}.", options.seed);
        }
        return Ok(());
    }

    let binary = resolve_pict(args.pict_path.as_deref())
        .map_err(|error| DriverError::Validation(error.to_string()))?;
    info!(binary = %binary.display(), "using generator binary");
    let mut runner = PictRunner::new(binary);

    let result = run_search(&model, &mut runner, &options)?;
    if let Err(error) = result.conclusion() {
        if let DriverError::Verification { report, .. } = &error {
            eprintln!("Coverage verification failed; uncovered pairs:");
            report_coverage_defects(report);
        }
        return Err(error);
    }

    let Some(best) = result.best.as_ref() else {
        return Err(DriverError::Internal(
            "run concluded successfully without a best suite".to_string(),
        ));
    };
    if result.provably_minimum() {
        info!(
            n = best.n(),
            seed = best.seed,
            "suite is provably minimum: size equals the pairwise lower bound"
        );
    }

    emit_suite(
        &model,
        &result,
        best,
        format,
        args.out.as_deref(),
        args.max_output_cases,
        args.print_all,
    )
}
