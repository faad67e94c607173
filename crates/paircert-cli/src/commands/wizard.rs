// The interactive wizard: build a model on stdin, then run the normal
// generation path with defaults and print the suite as a table.
//
// Prompts and progress stay on stderr; only the final table reaches stdout.

use std::io::{self, BufRead, Write as _};

use paircert_engine::{run_search, DriverError, DriverOptions, OutputFormat};
use paircert_model::{Model, ModelBuilder};
use paircert_pict::{resolve_pict, PictRunner};

use super::helpers::{emit_suite, report_coverage_defects};

pub(crate) fn run() -> Result<(), DriverError> {
    let stdin = io::stdin();
    let model = prompt_model(&mut stdin.lock())?;

    let binary = resolve_pict(None)
        .map_err(|error| DriverError::Validation(error.to_string()))?;
    let mut runner = PictRunner::new(binary);

    let options = DriverOptions::default();
    eprintln!(
        "Searching across up to {} seeds (verified, early stop at the lower bound)...",
        options.tries
    );
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

    eprintln!(
        "Best suite: {} cases (seed {}, {} attempts{}).",
        best.n(),
        best.seed,
        result.attempts_used(),
        if result.provably_minimum() {
            ", provably minimum"
        } else {
            ""
        }
    );
    emit_suite(
        &model,
        &result,
        best,
        OutputFormat::Table,
        None,
        usize::MAX,
        true,
    )
}

/// Read `Name: v1, v2, ...` lines until a blank line ends the model.
fn prompt_model(input: &mut impl BufRead) -> Result<Model, DriverError> {
    eprintln!("Enter parameters as `Name: value1, value2, ...`.");
    eprintln!("Finish with an empty line (at least two parameters).");

    let mut builder = ModelBuilder::new();
    loop {
        eprint!("parameter {}> ", builder.len() + 1);
        let _ = io::stderr().flush();
        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .map_err(|error| DriverError::Validation(format!("could not read input: {error}")))?;
        let line = line.trim();
        if read == 0 || line.is_empty() {
            break;
        }
        let Some((name, values)) = line.split_once(':') else {
            eprintln!("Missing `:` separator; try again.");
            continue;
        };
        let values: Vec<String> = values.split(',').map(|v| v.trim().to_string()).collect();
        if let Err(error) = builder.push(name.trim(), values) {
            eprintln!("{error}; try again.");
        }
    }

    builder
        .finish()
        .map_err(|error| DriverError::Validation(error.to_string()))
}
