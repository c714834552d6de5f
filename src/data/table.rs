//! Per-sample metadata table with ordered columns

use serde::{Deserialize, Serialize};

use crate::error::{BulkError, Result};

/// One metadata column: categorical (factor) or numeric values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Column {
    Categorical(Vec<String>),
    Numeric(Vec<f64>),
}

impl Column {
    fn len(&self) -> usize {
        match self {
            Column::Categorical(v) => v.len(),
            Column::Numeric(v) => v.len(),
        }
    }
}

/// Sample metadata: one row per sample, columns in insertion order.
///
/// Inserting a column under a name that already exists is a silent no-op;
/// the first occurrence wins. This is the dedup policy that keeps canonical
/// columns (sample id, total read count) from being overwritten by model-fit
/// covariates of the same name.
/// R equivalent: colData(dds) in SummarizedExperiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleTable {
    /// Sample identifiers (row keys)
    sample_ids: Vec<String>,
    /// Column names, in insertion order
    names: Vec<String>,
    /// Column values, parallel to `names`
    columns: Vec<Column>,
}

impl SampleTable {
    /// Create an empty table keyed by the given samples
    pub fn new(sample_ids: Vec<String>) -> Self {
        {
            let mut seen = std::collections::HashSet::new();
            for id in &sample_ids {
                if !seen.insert(id) {
                    log::warn!("Duplicate sample id '{}'; sample ids should be unique", id);
                }
            }
        }
        Self {
            sample_ids,
            names: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Number of samples (rows)
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Sample identifiers
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Column names, in insertion order
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// True if a column with this name exists
    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// A column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    /// A categorical column's values, if the column exists and is categorical
    pub fn categorical(&self, name: &str) -> Option<&Vec<String>> {
        match self.column(name) {
            Some(Column::Categorical(v)) => Some(v),
            _ => None,
        }
    }

    /// A numeric column's values, if the column exists and is numeric
    pub fn numeric(&self, name: &str) -> Option<&Vec<f64>> {
        match self.column(name) {
            Some(Column::Numeric(v)) => Some(v),
            _ => None,
        }
    }

    /// Add a categorical column. Dropped silently if the name is taken.
    pub fn push_categorical(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        self.push_column(name, Column::Categorical(values))
    }

    /// Add a numeric column. Dropped silently if the name is taken.
    pub fn push_numeric(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        self.push_column(name, Column::Numeric(values))
    }

    fn push_column(&mut self, name: &str, column: Column) -> Result<()> {
        if column.len() != self.sample_ids.len() {
            return Err(BulkError::ShapeMismatch {
                expected: format!("{} values in column '{}'", self.sample_ids.len(), name),
                got: format!("{} values", column.len()),
            });
        }
        if self.has_column(name) {
            log::debug!("Column '{}' already present; keeping the first occurrence", name);
            return Ok(());
        }
        self.names.push(name.to_string());
        self.columns.push(column);
        Ok(())
    }

    /// Append every column of `other`, first occurrence winning on collisions
    pub fn absorb(&mut self, other: &SampleTable) -> Result<()> {
        for (name, column) in other.names.iter().zip(&other.columns) {
            self.push_column(name, column.clone())?;
        }
        Ok(())
    }

    /// Unique levels of a categorical column, sorted
    pub fn levels(&self, name: &str) -> Option<Vec<String>> {
        self.categorical(name).map(|values| {
            let mut unique: Vec<String> = values.to_vec();
            unique.sort();
            unique.dedup();
            unique
        })
    }

    /// Row indices of samples at a given level of a categorical column
    pub fn samples_with_level(&self, name: &str, level: &str) -> Vec<usize> {
        self.categorical(name)
            .map(|values| {
                values
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| v.as_str() == level)
                    .map(|(i, _)| i)
                    .collect()
            })
            .unwrap_or_default()
    }
}
