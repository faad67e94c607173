//! Model parsing, normalization, and serialization.
//!
//! A [`Model`] is an ordered, immutable list of named parameters. Each
//! parameter keeps its user-facing `display_name` plus a derived `safe_name`
//! that satisfies the external generator's identifier rules. Models are built
//! either from the line-oriented textual form (`NAME : V1, V2, ...`) or
//! programmatically through [`ModelBuilder`]; both paths enforce the same
//! invariants.

use std::collections::HashSet;
use std::fmt::Write as _;

use thiserror::Error;

/// A defect in a single parameter declaration, independent of source location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("parameter name is empty")]
    EmptyName,
    #[error("duplicate parameter name `{0}`")]
    DuplicateName(String),
    #[error("parameter `{name}` declares no values")]
    NoValues { name: String },
    #[error("parameter `{name}` contains an empty value")]
    EmptyValue { name: String },
    #[error("parameter `{name}` value `{value}` contains a comma, tab, or newline")]
    UnsafeValue { name: String, value: String },
    #[error("parameter `{name}` repeats value `{value}`")]
    DuplicateValue { name: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("model is not valid UTF-8 text")]
    InvalidUtf8,
    #[error("line {line}: missing `:` separator in parameter definition: `{text}`")]
    MissingSeparator { line: usize, text: String },
    #[error("line {line}: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: ParameterError,
    },
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    #[error("model must declare at least two parameters")]
    TooFewParameters,
    #[error("no parameter has two or more values, so no value pair exists")]
    NoPairs,
    #[error("model has {count} parameters, exceeding the limit of {limit}")]
    TooManyParameters { count: usize, limit: usize },
    #[error("parameter `{name}` has {count} values, exceeding the limit of {limit}")]
    TooManyValues {
        name: String,
        count: usize,
        limit: usize,
    },
    #[error("model has {count} total values, exceeding the limit of {limit}")]
    TooManyTotalValues { count: usize, limit: usize },
}

/// A named dimension with an ordered list of distinct value labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    display_name: String,
    safe_name: String,
    values: Vec<String>,
}

impl Parameter {
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Generator-compatible identifier, unique across the model.
    pub fn safe_name(&self) -> &str {
        &self.safe_name
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn cardinality(&self) -> usize {
        self.values.len()
    }
}

/// Structural size caps applied before a model is handed to the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelLimits {
    pub max_parameters: usize,
    pub max_values_per_parameter: usize,
    pub max_total_values: usize,
}

impl Default for ModelLimits {
    fn default() -> Self {
        Self {
            max_parameters: 50,
            max_values_per_parameter: 50,
            max_total_values: 500,
        }
    }
}

/// How parameters are ordered in the model fed to the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderingMode {
    /// Stable sort by value count descending; tends to shrink suites.
    #[default]
    Auto,
    /// Identity: generator sees the declared order.
    Keep,
}

impl OrderingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderingMode::Auto => "auto",
            OrderingMode::Keep => "keep",
        }
    }
}

/// A permutation over parameter indices. `slots()[k]` is the declared index
/// of the parameter placed in generator column `k`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingPlan {
    slots: Vec<usize>,
}

impl OrderingPlan {
    pub fn for_mode(model: &Model, mode: OrderingMode) -> Self {
        let mut slots: Vec<usize> = (0..model.parameters.len()).collect();
        if mode == OrderingMode::Auto {
            slots.sort_by_key(|&i| std::cmp::Reverse(model.parameters[i].cardinality()));
        }
        Self { slots }
    }

    pub fn slots(&self) -> &[usize] {
        &self.slots
    }
}

/// An ordered sequence of parameters. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    parameters: Vec<Parameter>,
}

impl Model {
    /// Parse the textual model form from raw bytes, rejecting non-UTF-8 input
    /// as a validation error rather than a decoder fault.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ModelError::InvalidUtf8)?;
        Self::parse(text)
    }

    /// Parse the line-oriented textual form.
    ///
    /// A leading BOM is tolerated, CRLF and LF both accepted, `#` and `//`
    /// start comment lines, and empty lines are skipped. Every error carries
    /// the 1-based line number of the offending declaration.
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut builder = ModelBuilder::new();

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }
            let Some((name_part, values_part)) = line.split_once(':') else {
                return Err(ModelError::MissingSeparator {
                    line: line_no,
                    text: line.to_string(),
                });
            };
            let values: Vec<String> = values_part.split(',').map(|v| v.trim().to_string()).collect();
            builder
                .push(name_part.trim(), values)
                .map_err(|source| ModelError::AtLine {
                    line: line_no,
                    source,
                })?;
        }

        builder.finish()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Value counts in declared order.
    pub fn cardinalities(&self) -> Vec<usize> {
        self.parameters.iter().map(Parameter::cardinality).collect()
    }

    pub fn display_names(&self) -> Vec<&str> {
        self.parameters.iter().map(Parameter::display_name).collect()
    }

    /// Declared index of the parameter with the given safe name.
    pub fn index_of_safe_name(&self, safe_name: &str) -> Option<usize> {
        self.parameters
            .iter()
            .position(|p| p.safe_name == safe_name)
    }

    /// Serialize to the generator's text form, columns ordered by `plan`.
    /// Safe names go on the left; stripped value labels on the right.
    pub fn to_generator_text(&self, plan: &OrderingPlan) -> String {
        let mut out = String::new();
        for &idx in plan.slots() {
            let p = &self.parameters[idx];
            let _ = writeln!(out, "{}: {}", p.safe_name, p.values.join(", "));
        }
        out
    }

    /// Enforce structural size caps.
    pub fn check_limits(&self, limits: &ModelLimits) -> Result<(), ModelError> {
        if self.parameters.len() > limits.max_parameters {
            return Err(ModelError::TooManyParameters {
                count: self.parameters.len(),
                limit: limits.max_parameters,
            });
        }
        let mut total = 0usize;
        for p in &self.parameters {
            if p.cardinality() > limits.max_values_per_parameter {
                return Err(ModelError::TooManyValues {
                    name: p.display_name.clone(),
                    count: p.cardinality(),
                    limit: limits.max_values_per_parameter,
                });
            }
            total += p.cardinality();
        }
        if total > limits.max_total_values {
            return Err(ModelError::TooManyTotalValues {
                count: total,
                limit: limits.max_total_values,
            });
        }
        Ok(())
    }
}

/// Incremental model construction with per-parameter validation.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    parameters: Vec<Parameter>,
    safe_names: HashSet<String>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Append one parameter. Labels are stripped of surrounding whitespace;
    /// interior whitespace is preserved.
    pub fn push(
        &mut self,
        display_name: &str,
        values: Vec<String>,
    ) -> Result<(), ParameterError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(ParameterError::EmptyName);
        }
        let lowered = display_name.to_lowercase();
        if self
            .parameters
            .iter()
            .any(|p| p.display_name.to_lowercase() == lowered)
        {
            return Err(ParameterError::DuplicateName(display_name.to_string()));
        }

        let mut cleaned = Vec::with_capacity(values.len());
        let mut seen = HashSet::new();
        for value in &values {
            let value = value.trim();
            if value.is_empty() {
                return Err(ParameterError::EmptyValue {
                    name: display_name.to_string(),
                });
            }
            if value.contains(',') || value.contains('\t') || value.contains('\n') {
                return Err(ParameterError::UnsafeValue {
                    name: display_name.to_string(),
                    value: value.to_string(),
                });
            }
            if !seen.insert(value.to_string()) {
                return Err(ParameterError::DuplicateValue {
                    name: display_name.to_string(),
                    value: value.to_string(),
                });
            }
            cleaned.push(value.to_string());
        }
        if cleaned.is_empty() {
            return Err(ParameterError::NoValues {
                name: display_name.to_string(),
            });
        }

        let safe_name = make_safe_name(display_name, &self.safe_names);
        self.safe_names.insert(safe_name.clone());
        self.parameters.push(Parameter {
            display_name: display_name.to_string(),
            safe_name,
            values: cleaned,
        });
        Ok(())
    }

    /// Seal the model, enforcing the whole-model invariants.
    pub fn finish(self) -> Result<Model, ModelError> {
        if self.parameters.len() < 2 {
            return Err(ModelError::TooFewParameters);
        }
        if !self.parameters.iter().any(|p| p.cardinality() >= 2) {
            return Err(ModelError::NoPairs);
        }
        Ok(Model {
            parameters: self.parameters,
        })
    }
}

/// Map a display name to a generator-safe identifier: runs of characters
/// outside `[A-Za-z0-9_]` collapse to a single `_`, leading digits and
/// underscores are trimmed, and a numeric suffix keeps the result unique.
/// Deterministic and idempotent.
fn make_safe_name(display_name: &str, taken: &HashSet<String>) -> String {
    let mut folded = String::with_capacity(display_name.len());
    let mut in_run = false;
    for ch in display_name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            folded.push(ch);
            in_run = false;
        } else if !in_run {
            folded.push('_');
            in_run = true;
        }
    }
    let trimmed = folded.trim_start_matches(|c: char| c == '_' || c.is_ascii_digit());
    let trimmed = trimmed.trim_end_matches('_');
    let base = if trimmed.is_empty() {
        "P".to_string()
    } else {
        trimmed.to_string()
    };

    if !taken.contains(&base) {
        return base;
    }
    let mut suffix = 2usize;
    loop {
        let candidate = format!("{base}_{suffix}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}
