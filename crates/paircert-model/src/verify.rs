//! Independent pair-coverage verification.
//!
//! The verifier is the proof side of the tool: a suite is only reported as
//! `verified` after this pass shows that, for every unordered parameter pair,
//! every combination of their values appears in at least one row. It never
//! trusts the generator.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::model::Model;

/// Upper bound on reported defects; enough for diagnostics without flooding.
pub const DEFECT_REPORT_LIMIT: usize = 20;

/// One reason a suite failed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverageDefect {
    /// The value combination never appears at the pair's columns.
    MissingPair {
        first_param: String,
        first_value: String,
        second_param: String,
        second_value: String,
    },
    /// A row holds a label the model does not declare for that column.
    UnknownValue {
        row: usize,
        param: String,
        value: String,
    },
    /// A row's column count differs from the model's parameter count.
    SchemaMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for CoverageDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageDefect::MissingPair {
                first_param,
                first_value,
                second_param,
                second_value,
            } => write!(
                f,
                "missing pair ({first_param}: {first_value}, {second_param}: {second_value})"
            ),
            CoverageDefect::UnknownValue { row, param, value } => write!(
                f,
                "row {row}: unknown value `{value}` for parameter `{param}`"
            ),
            CoverageDefect::SchemaMismatch {
                row,
                expected,
                found,
            } => write!(f, "row {row}: expected {expected} columns, found {found}"),
        }
    }
}

/// Outcome of a verification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageReport {
    /// Ordered defects, capped at [`DEFECT_REPORT_LIMIT`].
    pub defects: Vec<CoverageDefect>,
    /// True when the cap cut the list short.
    pub truncated: bool,
}

impl CoverageReport {
    /// True iff the suite covers every pair and every row was well-formed.
    pub fn covered(&self) -> bool {
        self.defects.is_empty()
    }

    pub fn missing_pair_count(&self) -> usize {
        self.defects
            .iter()
            .filter(|d| matches!(d, CoverageDefect::MissingPair { .. }))
            .count()
    }

    fn push(&mut self, defect: CoverageDefect) -> bool {
        if self.defects.len() >= DEFECT_REPORT_LIMIT {
            self.truncated = true;
            return false;
        }
        self.defects.push(defect);
        true
    }
}

/// Prove that `rows` covers every unordered value pair of `model`.
///
/// Rows must be in the model's declared column order. Runs in
/// `O(rows * parameters^2)` and is fully deterministic: defects are listed in
/// row order first (schema/unknown-value), then in pair enumeration order.
pub fn verify_coverage(model: &Model, rows: &[Vec<String>]) -> CoverageReport {
    let params = model.parameters();
    let n = params.len();
    let mut report = CoverageReport::default();

    // value label -> dense index, per parameter
    let value_index: Vec<HashMap<&str, usize>> = params
        .iter()
        .map(|p| {
            p.values()
                .iter()
                .enumerate()
                .map(|(i, v)| (v.as_str(), i))
                .collect()
        })
        .collect();

    // Resolve each row to dense indices; malformed cells poison only the
    // affected columns, so the rest of the row still contributes coverage.
    let mut resolved: Vec<Vec<Option<usize>>> = Vec::with_capacity(rows.len());
    for (row_no, row) in rows.iter().enumerate() {
        if row.len() != n {
            report.push(CoverageDefect::SchemaMismatch {
                row: row_no + 1,
                expected: n,
                found: row.len(),
            });
            resolved.push(vec![None; n]);
            continue;
        }
        let mut indices = Vec::with_capacity(n);
        for (col, cell) in row.iter().enumerate() {
            match value_index[col].get(cell.as_str()) {
                Some(&i) => indices.push(Some(i)),
                None => {
                    report.push(CoverageDefect::UnknownValue {
                        row: row_no + 1,
                        param: params[col].display_name().to_string(),
                        value: cell.clone(),
                    });
                    indices.push(None);
                }
            }
        }
        resolved.push(indices);
    }

    for i in 0..n {
        for j in (i + 1)..n {
            let mut seen: HashSet<(usize, usize)> = HashSet::new();
            for indices in &resolved {
                if let (Some(a), Some(b)) = (indices[i], indices[j]) {
                    seen.insert((a, b));
                }
            }
            let expected = params[i].cardinality() * params[j].cardinality();
            if seen.len() == expected {
                continue;
            }
            for (a, va) in params[i].values().iter().enumerate() {
                for (b, vb) in params[j].values().iter().enumerate() {
                    if seen.contains(&(a, b)) {
                        continue;
                    }
                    let recorded = report.push(CoverageDefect::MissingPair {
                        first_param: params[i].display_name().to_string(),
                        first_value: va.clone(),
                        second_param: params[j].display_name().to_string(),
                        second_value: vb.clone(),
                    });
                    if !recorded {
                        return report;
                    }
                }
            }
        }
    }

    report
}
