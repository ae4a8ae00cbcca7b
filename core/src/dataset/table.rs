//! Tabular data model
//!
//! A small row-major table used for uploaded datasets and inference
//! instances. Cells are null, numeric, or text; column kinds are inferred
//! from the cells so the preprocessing layer can decide between numeric
//! and categorical treatment.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// A single table cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Null,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Parse a raw CSV field into a cell. Empty fields are nulls; fields
    /// that parse as f64 are numbers.
    pub fn from_csv_field(field: &str) -> Self {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return Cell::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Cell::Number(n),
            _ => Cell::Text(field.to_string()),
        }
    }

    /// Convert a JSON value into a cell. Booleans become 0.0/1.0; nested
    /// arrays and objects are rejected.
    pub fn from_json(value: &Value) -> Result<Self, CoreError> {
        match value {
            Value::Null => Ok(Cell::Null),
            Value::Bool(b) => Ok(Cell::Number(if *b { 1.0 } else { 0.0 })),
            Value::Number(n) => n
                .as_f64()
                .filter(|f| f.is_finite())
                .map(Cell::Number)
                .ok_or_else(|| CoreError::DatasetParse(format!("non-finite number: {}", n))),
            Value::String(s) => Ok(Cell::Text(s.clone())),
            other => Err(CoreError::DatasetParse(format!(
                "unsupported cell value: {}",
                other
            ))),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// String form used for categorical matching.
    pub fn as_category(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Number(n) => Some(format_number(*n)),
            Cell::Text(s) => Some(s.clone()),
        }
    }

    /// CSV rendition of the cell.
    fn to_csv_field(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Number(n) => format_number(*n),
            Cell::Text(s) => escape_csv(s),
        }
    }
}

/// How a column should be treated by the preprocessing layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Row-major table with named columns
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl DataTable {
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }

    /// Parse CSV text (RFC 4180 quoting) into a table.
    pub fn from_csv(text: &str) -> Result<Self, CoreError> {
        let records = parse_csv_records(text)?;
        let mut iter = records.into_iter();

        let header = iter.next().ok_or(CoreError::EmptyDataset)?;
        let columns: Vec<String> = header.into_iter().map(|f| f.trim().to_string()).collect();
        if columns.is_empty() || columns.iter().all(|c| c.is_empty()) {
            return Err(CoreError::EmptyDataset);
        }

        let mut rows = Vec::new();
        for (line_no, record) in iter.enumerate() {
            // Trailing blank record from a final newline
            if record.len() == 1 && record[0].is_empty() {
                continue;
            }
            if record.len() != columns.len() {
                return Err(CoreError::DatasetParse(format!(
                    "row {} has {} fields, expected {}",
                    line_no + 2,
                    record.len(),
                    columns.len()
                )));
            }
            rows.push(record.iter().map(|f| Cell::from_csv_field(f)).collect());
        }

        Ok(Self { columns, rows })
    }

    /// Parse JSON into a table. Accepts an array of records
    /// (`[{"a": 1}, ...]`) or a column map (`{"a": [1, 2], ...}`).
    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| CoreError::DatasetParse(e.to_string()))?;

        match value {
            Value::Array(records) => Self::from_json_records(&records),
            Value::Object(map) => {
                let mut columns = Vec::new();
                let mut series: Vec<Vec<Cell>> = Vec::new();
                let mut length: Option<usize> = None;

                for (name, column) in map {
                    let values = column.as_array().ok_or_else(|| {
                        CoreError::DatasetParse(format!("column {} is not an array", name))
                    })?;
                    match length {
                        Some(n) if n != values.len() => {
                            return Err(CoreError::DatasetParse(format!(
                                "column {} has {} values, expected {}",
                                name,
                                values.len(),
                                n
                            )))
                        }
                        None => length = Some(values.len()),
                        _ => {}
                    }
                    let cells = values.iter().map(Cell::from_json).collect::<Result<_, _>>()?;
                    columns.push(name);
                    series.push(cells);
                }

                let n_rows = length.unwrap_or(0);
                let rows = (0..n_rows)
                    .map(|i| series.iter().map(|col| col[i].clone()).collect())
                    .collect();
                Ok(Self { columns, rows })
            }
            other => Err(CoreError::DatasetParse(format!(
                "expected a JSON array or object, got {}",
                other
            ))),
        }
    }

    /// Build a table from JSON record objects. Columns appear in order of
    /// first occurrence; missing keys become nulls.
    pub fn from_json_records(records: &[Value]) -> Result<Self, CoreError> {
        let mut columns: Vec<String> = Vec::new();
        let mut objects = Vec::with_capacity(records.len());
        for record in records {
            let object = record.as_object().ok_or_else(|| {
                CoreError::DatasetParse(format!("expected a JSON object, got {}", record))
            })?;
            for key in object.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
            objects.push(object);
        }

        let mut rows = Vec::with_capacity(objects.len());
        for object in objects {
            let mut row = Vec::with_capacity(columns.len());
            for column in &columns {
                match object.get(column) {
                    Some(value) => row.push(Cell::from_json(value)?),
                    None => row.push(Cell::Null),
                }
            }
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

    /// Serialize the table back to CSV text.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        out.push_str(
            &self
                .columns
                .iter()
                .map(|c| escape_csv(c))
                .collect::<Vec<_>>()
                .join(","),
        );
        out.push('\n');
        for row in &self.rows {
            out.push_str(
                &row.iter()
                    .map(|c| c.to_csv_field())
                    .collect::<Vec<_>>()
                    .join(","),
            );
            out.push('\n');
        }
        out
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Infer the kind of a column: numeric when every non-null cell is a
    /// number (all-null columns count as numeric), categorical otherwise.
    pub fn column_kind(&self, index: usize) -> ColumnKind {
        let all_numeric = self
            .rows
            .iter()
            .map(|row| &row[index])
            .all(|cell| matches!(cell, Cell::Number(_) | Cell::Null));
        if all_numeric {
            ColumnKind::Numeric
        } else {
            ColumnKind::Categorical
        }
    }

    /// Drop a column, returning the removed cells.
    pub fn take_column(&mut self, index: usize) -> Vec<Cell> {
        self.columns.remove(index);
        self.rows.iter_mut().map(|row| row.remove(index)).collect()
    }
}

fn format_number(n: f64) -> String {
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn escape_csv(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split CSV text into records of raw fields, honoring quoted fields.
fn parse_csv_records(text: &str) -> Result<Vec<Vec<String>>, CoreError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(ch),
            }
            continue;
        }
        match ch {
            '"' => {
                if !field.is_empty() {
                    return Err(CoreError::DatasetParse(
                        "unexpected quote inside unquoted field".to_string(),
                    ));
                }
                in_quotes = true;
            }
            ',' => {
                record.push(std::mem::take(&mut field));
            }
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            '\r' => {
                // swallow; the following \n terminates the record
            }
            _ => field.push(ch),
        }
    }

    if in_quotes {
        return Err(CoreError::DatasetParse("unterminated quoted field".to_string()));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    if records.is_empty() {
        return Err(CoreError::EmptyDataset);
    }
    Ok(records)
}
