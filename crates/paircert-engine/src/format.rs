//! Emission of a finished run: padded table, RFC 4180 CSV, or a structured
//! JSON object with a metadata block. All three are deterministic for a
//! given run result.

use indexmap::IndexMap;
use serde::Serialize;

use paircert_model::Model;

use crate::driver::{BestCandidate, RunResult};

/// Output form selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

impl OutputFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "table" => Some(OutputFormat::Table),
            "csv" => Some(OutputFormat::Csv),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// The metadata block of the structured form.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteMetadata {
    pub n: usize,
    pub lb: Option<usize>,
    pub verified: bool,
    pub ordering_mode: &'static str,
    pub seed: u64,
    pub strength: u32,
    pub attempts: usize,
    pub early_stopped: bool,
    pub provably_minimum: bool,
}

impl SuiteMetadata {
    pub fn from_run(result: &RunResult, best: &BestCandidate) -> Self {
        Self {
            n: best.n(),
            lb: result.lb,
            verified: best.verified,
            ordering_mode: result.ordering.as_str(),
            seed: best.seed,
            strength: result.strength,
            attempts: result.attempts_used(),
            early_stopped: result.early_stopped,
            provably_minimum: result.provably_minimum(),
        }
    }
}

#[derive(Debug, Serialize)]
struct StructuredSuite<'a> {
    metadata: &'a SuiteMetadata,
    test_cases: Vec<IndexMap<&'a str, &'a str>>,
}

/// Padded columns sized to the widest cell, header underlined with dashes.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (col, cell) in row.iter().enumerate() {
            if col < widths.len() {
                widths[col] = widths[col].max(cell.chars().count());
            }
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(pad_line(headers.iter().map(|h| h.to_string()), &widths));
    lines.push(pad_line(widths.iter().map(|w| "-".repeat(*w)), &widths));
    for row in rows {
        lines.push(pad_line(row.iter().cloned(), &widths));
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn pad_line(cells: impl Iterator<Item = String>, widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    padded.join("  ").trim_end().to_string()
}

/// Comma-separated values with RFC 4180 quoting, `\n` line endings, no BOM.
pub fn format_csv(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    push_csv_record(&mut out, headers.iter().copied());
    for row in rows {
        push_csv_record(&mut out, row.iter().map(String::as_str));
    }
    out
}

fn push_csv_record<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&csv_field(field));
    }
    out.push('\n');
}

fn csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// The structured form: `{"metadata": ..., "test_cases": [...]}` with test
/// cases keyed by display name in declared order. This is the only content
/// allowed on the primary stream when selected.
pub fn render_structured(model: &Model, result: &RunResult, best: &BestCandidate) -> String {
    let metadata = SuiteMetadata::from_run(result, best);
    let headers = model.display_names();
    let test_cases: Vec<IndexMap<&str, &str>> = best
        .rows
        .iter()
        .map(|row| {
            headers
                .iter()
                .copied()
                .zip(row.iter().map(String::as_str))
                .collect()
        })
        .collect();
    let doc = StructuredSuite {
        metadata: &metadata,
        test_cases,
    };
    let mut rendered =
        serde_json::to_string_pretty(&doc).expect("structured suite serializes to JSON");
    rendered.push('\n');
    rendered
}
