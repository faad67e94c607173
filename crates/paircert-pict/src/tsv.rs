//! Parsing the generator's TSV output and re-projecting it into the model's
//! declared column order.

use paircert_model::Model;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TsvError {
    #[error("generator output has no header row")]
    MissingHeader,
    #[error("generator header contains unknown column `{0}`")]
    UnknownColumn(String),
    #[error("generator header repeats column `{0}`")]
    DuplicateColumn(String),
    #[error("generator header is missing column `{0}`")]
    MissingColumn(String),
    #[error("generator row {row} has {found} fields, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Parse raw generator stdout into suite rows in the model's declared order.
///
/// The header carries safe names in whatever order the generator chose
/// (possibly a reordered model); each column is matched back to its declared
/// parameter. A leading BOM and CRLF endings are tolerated. Cell labels are
/// trimmed of surrounding whitespace only.
pub fn parse_suite(raw: &str, model: &Model) -> Result<Vec<Vec<String>>, TsvError> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut lines = raw.lines().filter(|line| !line.trim().is_empty());

    let header_line = lines.next().ok_or(TsvError::MissingHeader)?;
    let header: Vec<&str> = header_line.split('\t').map(str::trim).collect();

    // generator column -> declared index
    let mut projection = Vec::with_capacity(header.len());
    for column in &header {
        let declared = model
            .index_of_safe_name(column)
            .ok_or_else(|| TsvError::UnknownColumn(column.to_string()))?;
        if projection.contains(&declared) {
            return Err(TsvError::DuplicateColumn(column.to_string()));
        }
        projection.push(declared);
    }
    for parameter in model.parameters() {
        if !header.contains(&parameter.safe_name()) {
            return Err(TsvError::MissingColumn(parameter.safe_name().to_string()));
        }
    }

    let width = header.len();
    let mut rows = Vec::new();
    for (row_no, line) in lines.enumerate() {
        let cells: Vec<&str> = line.split('\t').map(str::trim).collect();
        if cells.len() != width {
            return Err(TsvError::RowWidth {
                row: row_no + 1,
                expected: width,
                found: cells.len(),
            });
        }
        let mut projected = vec![String::new(); width];
        for (col, cell) in cells.into_iter().enumerate() {
            projected[projection[col]] = cell.to_string();
        }
        rows.push(projected);
    }
    Ok(rows)
}
