// The `verify` command: re-prove pair coverage of an existing suite.
//
// Cases arrive as CSV (header row of display names) or as JSON in either the
// structured `{"metadata": ..., "test_cases": [...]}` shape or a bare array
// of objects. Columns are matched by display name; missing columns read as
// empty strings and fail verification as unknown values.

use std::fs;
use std::path::Path;

use serde_json::Value;

use paircert_engine::DriverError;
use paircert_model::{verify_coverage, Model, ModelLimits};

use super::helpers::{read_model, report_coverage_defects};
use crate::cli::VerifyArgs;

pub(crate) fn run(args: &VerifyArgs) -> Result<(), DriverError> {
    let model = read_model(&args.model, &ModelLimits::default())?;
    let rows = read_cases(&args.cases, &model)?;

    let report = verify_coverage(&model, &rows);
    if !report.covered() {
        eprintln!("Coverage verification failed; defects:");
        report_coverage_defects(&report);
        return Err(DriverError::Verification {
            seed: 0,
            n: rows.len(),
            report,
        });
    }
    eprintln!("Coverage verified successfully ({} cases).", rows.len());
    Ok(())
}

fn read_cases(path: &Path, model: &Model) -> Result<Vec<Vec<String>>, DriverError> {
    let bytes = fs::read(path).map_err(|error| {
        DriverError::Validation(format!(
            "could not read cases file `{}`: {error}",
            path.display()
        ))
    })?;
    let text = String::from_utf8(bytes).map_err(|_| {
        DriverError::Validation(format!(
            "cases file `{}` is not valid UTF-8 text",
            path.display()
        ))
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    if path.extension().is_some_and(|ext| ext == "json") {
        rows_from_json(text, model)
    } else {
        rows_from_csv(text, model)
    }
}

fn rows_from_json(text: &str, model: &Model) -> Result<Vec<Vec<String>>, DriverError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|error| DriverError::Validation(format!("cases JSON is invalid: {error}")))?;

    let cases = match &value {
        Value::Object(object) => object
            .get("test_cases")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                DriverError::Validation(
                    "cases JSON object must contain a `test_cases` array".to_string(),
                )
            })?,
        Value::Array(array) => array,
        _ => {
            return Err(DriverError::Validation(
                "cases JSON must be an array or contain a `test_cases` array".to_string(),
            ))
        }
    };

    let headers = model.display_names();
    let mut rows = Vec::with_capacity(cases.len());
    for case in cases {
        let Value::Object(object) = case else {
            return Err(DriverError::Validation(
                "each JSON case must be an object keyed by parameter name".to_string(),
            ));
        };
        let row = headers
            .iter()
            .map(|header| match object.get(*header) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            })
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn rows_from_csv(text: &str, model: &Model) -> Result<Vec<Vec<String>>, DriverError> {
    let mut records = parse_csv(text).into_iter();
    let header = records
        .next()
        .ok_or_else(|| DriverError::Validation("cases file is empty".to_string()))?;

    let headers = model.display_names();
    let column_of: Vec<Option<usize>> = headers
        .iter()
        .map(|name| header.iter().position(|h| h == name))
        .collect();

    let rows = records
        .map(|record| {
            column_of
                .iter()
                .map(|col| match col {
                    Some(i) if *i < record.len() => record[*i].clone(),
                    _ => String::new(),
                })
                .collect()
        })
        .collect();
    Ok(rows)
}

/// Minimal RFC 4180 reader: quoted fields, doubled quotes, CRLF records.
/// Blank records are skipped.
fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                other => field.push(other),
            }
            continue;
        }
        match ch {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                if record.len() == 1 && record[0].is_empty() {
                    record.clear();
                } else {
                    records.push(std::mem::take(&mut record));
                }
            }
            other => field.push(other),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}
