// Shared helper functions used across CLI command handlers: string-to-enum
// parsing, model loading, and suite emission.

use std::fs;
use std::path::Path;

use paircert_engine::{format_csv, format_table, render_structured, OutputFormat};
use paircert_engine::{BestCandidate, DriverError, RunResult};
use paircert_model::{Model, ModelLimits, OrderingMode};

pub(crate) fn parse_output_format(raw: &str) -> Result<OutputFormat, DriverError> {
    OutputFormat::parse(raw).ok_or_else(|| {
        DriverError::Validation(format!(
            "unknown output format `{raw}`; use `table`, `csv`, or `json`"
        ))
    })
}

pub(crate) fn parse_ordering_mode(raw: &str, keep_order: bool) -> Result<OrderingMode, DriverError> {
    if keep_order {
        return Ok(OrderingMode::Keep);
    }
    match raw {
        "auto" => Ok(OrderingMode::Auto),
        "keep" => Ok(OrderingMode::Keep),
        other => Err(DriverError::Validation(format!(
            "unknown ordering mode `{other}`; use `auto` or `keep`"
        ))),
    }
}

/// Read and validate a model file, mapping every fault to the validation
/// category (including non-UTF-8 bytes and missing files).
pub(crate) fn read_model(path: &Path, limits: &ModelLimits) -> Result<Model, DriverError> {
    let bytes = fs::read(path).map_err(|error| {
        DriverError::Validation(format!("could not read model file `{}`: {error}", path.display()))
    })?;
    let model = Model::from_bytes(&bytes)
        .map_err(|error| DriverError::Validation(error.to_string()))?;
    model
        .check_limits(limits)
        .map_err(|error| DriverError::Validation(error.to_string()))?;
    Ok(model)
}

/// Render the winning suite and place it on the primary stream or in a file.
///
/// Oversized table/csv bodies are withheld from the console (with a stderr
/// notice) unless forced; the structured form is never withheld.
pub(crate) fn emit_suite(
    model: &Model,
    result: &RunResult,
    best: &BestCandidate,
    format: OutputFormat,
    out: Option<&Path>,
    max_output_cases: usize,
    print_all: bool,
) -> Result<(), DriverError> {
    let n = best.n();
    let suppress_console = out.is_none()
        && format != OutputFormat::Json
        && n > max_output_cases
        && !print_all;
    if suppress_console {
        eprintln!(
            "Generated {n} cases, more than the console limit of {max_output_cases}; \
             pass --print-all or write to a file with --out FILE"
        );
        return Ok(());
    }

    let headers = model.display_names();
    let body = match format {
        OutputFormat::Table => format_table(&headers, &best.rows),
        OutputFormat::Csv => format_csv(&headers, &best.rows),
        OutputFormat::Json => render_structured(model, result, best),
    };

    match out {
        Some(path) => fs::write(path, body).map_err(|error| {
            DriverError::Validation(format!(
                "could not write output file `{}`: {error}",
                path.display()
            ))
        }),
        None => {
            print!("{body}");
            Ok(())
        }
    }
}

/// Print up to the bounded list of coverage defects to the diagnostic stream.
pub(crate) fn report_coverage_defects(report: &paircert_model::CoverageReport) {
    for defect in &report.defects {
        eprintln!("  {defect}");
    }
    if report.truncated {
        eprintln!("  (more defects were truncated)");
    }
}
