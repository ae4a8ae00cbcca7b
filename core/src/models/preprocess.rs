//! Feature preprocessing
//!
//! Fits a feature schema on the training partition and turns rows into
//! numeric vectors: numeric columns are median-imputed, categorical
//! columns are most-frequent-imputed and one-hot encoded over the
//! categories seen at fit time (unknown categories encode to zeros).
//! The vector layout is the numeric block followed by the categorical
//! one-hot blocks, both in dataset column order.

use std::collections::HashMap;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dataset::table::{Cell, ColumnKind, DataTable};
use crate::error::CoreError;

/// Fitted statistics for one feature column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ColumnStats {
    Numeric { median: f64 },
    Categorical { fill: String, categories: Vec<String> },
}

/// One feature column of the fitted schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub stats: ColumnStats,
}

/// Fitted feature schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub columns: Vec<ColumnSchema>,
}

impl FeatureSchema {
    /// Fit the schema on a table of feature columns.
    pub fn fit(table: &DataTable) -> Self {
        let columns = table
            .columns
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let stats = match table.column_kind(index) {
                    ColumnKind::Numeric => ColumnStats::Numeric {
                        median: column_median(table, index),
                    },
                    ColumnKind::Categorical => {
                        let (fill, categories) = column_categories(table, index);
                        ColumnStats::Categorical { fill, categories }
                    }
                };
                ColumnSchema {
                    name: name.clone(),
                    stats,
                }
            })
            .collect();
        Self { columns }
    }

    /// Names of the feature columns, in dataset order.
    pub fn feature_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Width of the encoded feature vector.
    pub fn n_features(&self) -> usize {
        self.columns
            .iter()
            .map(|c| match &c.stats {
                ColumnStats::Numeric { .. } => 1,
                ColumnStats::Categorical { categories, .. } => categories.len(),
            })
            .sum()
    }

    /// Encode a table into a feature matrix. Columns are located by name;
    /// a column absent from the table is a schema mismatch.
    pub fn transform(&self, table: &DataTable) -> Result<Array2<f64>, CoreError> {
        let mut indices = Vec::with_capacity(self.columns.len());
        let mut missing = Vec::new();
        for column in &self.columns {
            match table.column_index(&column.name) {
                Some(idx) => indices.push(idx),
                None => missing.push(column.name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(CoreError::SchemaMismatch { columns: missing });
        }

        let width = self.n_features();
        let mut flat = Vec::with_capacity(table.n_rows() * width);
        for row in &table.rows {
            // Numeric block first, then the one-hot blocks.
            for (column, &idx) in self.columns.iter().zip(&indices) {
                if let ColumnStats::Numeric { median } = &column.stats {
                    flat.push(match &row[idx] {
                        Cell::Number(n) => *n,
                        _ => *median,
                    });
                }
            }
            for (column, &idx) in self.columns.iter().zip(&indices) {
                if let ColumnStats::Categorical { fill, categories } = &column.stats {
                    let value = row[idx].as_category().unwrap_or_else(|| fill.clone());
                    for category in categories {
                        flat.push(if *category == value { 1.0 } else { 0.0 });
                    }
                }
            }
        }

        Array2::from_shape_vec((table.n_rows(), width), flat)
            .map_err(|e| CoreError::Training(e.to_string()))
    }
}

/// A target label value. Kept as a closed enum so the fitted artifact
/// stays representable in the binary artifact format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Label {
    Number(f64),
    Text(String),
}

impl Label {
    fn from_cell(cell: &Cell) -> Result<Self, CoreError> {
        match cell {
            Cell::Null => Err(CoreError::Training(
                "target column contains empty values".to_string(),
            )),
            Cell::Number(n) if n.is_finite() => Ok(Label::Number(*n)),
            Cell::Number(n) => Err(CoreError::Training(format!(
                "non-finite target value: {}",
                n
            ))),
            Cell::Text(s) => Ok(Label::Text(s.clone())),
        }
    }

    /// JSON rendition of the label.
    pub fn to_value(&self) -> Value {
        match self {
            Label::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Label::Text(s) => Value::String(s.clone()),
        }
    }

    fn sort_key(&self) -> String {
        self.to_value().to_string()
    }
}

/// Maps target labels to class indices and back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetEncoder {
    pub classes: Vec<Label>,
}

impl TargetEncoder {
    /// Fit the encoder on the target cells of the full dataset.
    pub fn fit(cells: &[Cell]) -> Result<Self, CoreError> {
        let mut classes: Vec<Label> = Vec::new();
        for cell in cells {
            let label = Label::from_cell(cell)?;
            if !classes.contains(&label) {
                classes.push(label);
            }
        }
        if classes.is_empty() {
            return Err(CoreError::Training("target column has no values".to_string()));
        }
        classes.sort_by_key(|label| label.sort_key());
        Ok(Self { classes })
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Encode target cells into class indices.
    pub fn encode(&self, cells: &[Cell]) -> Result<Array1<usize>, CoreError> {
        let mut encoded = Vec::with_capacity(cells.len());
        for cell in cells {
            let label = Label::from_cell(cell)?;
            let index = self.classes.iter().position(|c| *c == label).ok_or_else(|| {
                CoreError::Training(format!("unknown target label: {}", label.to_value()))
            })?;
            encoded.push(index);
        }
        Ok(Array1::from_vec(encoded))
    }

    /// Decode a class index back to the original label value.
    pub fn decode(&self, index: usize) -> Value {
        self.classes
            .get(index)
            .map(Label::to_value)
            .unwrap_or(Value::Null)
    }
}

fn column_median(table: &DataTable, index: usize) -> f64 {
    let mut values: Vec<f64> = table
        .rows
        .iter()
        .filter_map(|row| match &row[index] {
            Cell::Number(n) => Some(*n),
            _ => None,
        })
        .collect();
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}

fn column_categories(table: &DataTable, index: usize) -> (String, Vec<String>) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in &table.rows {
        if let Some(value) = row[index].as_category() {
            *counts.entry(value).or_insert(0) += 1;
        }
    }

    let mut categories: Vec<String> = counts.keys().cloned().collect();
    categories.sort();

    // Most frequent value; lexicographic tiebreak for determinism.
    let fill = categories
        .iter()
        .max_by_key(|c| (counts[*c], std::cmp::Reverse((*c).clone())))
        .cloned()
        .unwrap_or_default();

    (fill, categories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature_table() -> DataTable {
        DataTable::from_csv("age,city\n30,berlin\n,berlin\n50,\n40,paris\n").unwrap()
    }

    #[test]
    fn test_fit_infers_stats() {
        let schema = FeatureSchema::fit(&feature_table());
        assert_eq!(schema.columns.len(), 2);
        match &schema.columns[0].stats {
            ColumnStats::Numeric { median } => assert_eq!(*median, 40.0),
            other => panic!("expected numeric stats, got {:?}", other),
        }
        match &schema.columns[1].stats {
            ColumnStats::Categorical { fill, categories } => {
                assert_eq!(fill, "berlin");
                assert_eq!(categories, &vec!["berlin".to_string(), "paris".to_string()]);
            }
            other => panic!("expected categorical stats, got {:?}", other),
        }
    }

    #[test]
    fn test_transform_layout_and_imputation() {
        let schema = FeatureSchema::fit(&feature_table());
        let matrix = schema.transform(&feature_table()).unwrap();

        assert_eq!(matrix.dim(), (4, 3));
        // Row 1: null age imputed with the median, city=berlin one-hot.
        assert_eq!(matrix.row(1).to_vec(), vec![40.0, 1.0, 0.0]);
        // Row 2: null city imputed with the most frequent category.
        assert_eq!(matrix.row(2).to_vec(), vec![50.0, 1.0, 0.0]);
        assert_eq!(matrix.row(3).to_vec(), vec![40.0, 0.0, 1.0]);
    }

    #[test]
    fn test_transform_unknown_category_is_zeros() {
        let schema = FeatureSchema::fit(&feature_table());
        let unseen = DataTable::from_csv("age,city\n33,tokyo\n").unwrap();
        let matrix = schema.transform(&unseen).unwrap();
        assert_eq!(matrix.row(0).to_vec(), vec![33.0, 0.0, 0.0]);
    }

    #[test]
    fn test_transform_missing_column_is_schema_mismatch() {
        let schema = FeatureSchema::fit(&feature_table());
        let partial = DataTable::from_csv("age\n33\n").unwrap();
        match schema.transform(&partial) {
            Err(CoreError::SchemaMismatch { columns }) => {
                assert_eq!(columns, vec!["city".to_string()])
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_target_encoder_roundtrip() {
        let cells = vec![
            Cell::Text("yes".to_string()),
            Cell::Text("no".to_string()),
            Cell::Text("yes".to_string()),
        ];
        let encoder = TargetEncoder::fit(&cells).unwrap();
        assert_eq!(encoder.n_classes(), 2);

        let encoded = encoder.encode(&cells).unwrap();
        assert_eq!(encoded.to_vec(), vec![1, 0, 1]);
        assert_eq!(encoder.decode(1), json!("yes"));
    }

    #[test]
    fn test_target_encoder_numeric_labels() {
        let cells = vec![Cell::Number(0.0), Cell::Number(1.0), Cell::Number(0.0)];
        let encoder = TargetEncoder::fit(&cells).unwrap();
        assert_eq!(encoder.decode(0), json!(0.0));
        assert_eq!(encoder.decode(1), json!(1.0));
    }

    #[test]
    fn test_target_encoder_rejects_nulls() {
        let cells = vec![Cell::Text("yes".to_string()), Cell::Null];
        assert!(TargetEncoder::fit(&cells).is_err());
    }
}
