//! Named assay matrices for bulk RNA-seq data

use std::collections::HashMap;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{BulkError, Result};

/// Deduplicate feature ids by appending _1, _2, etc. to duplicates
fn deduplicate_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for id in &ids {
        *seen.entry(id.clone()).or_insert(0) += 1;
    }
    if !seen.values().any(|&c| c > 1) {
        return ids;
    }
    seen.clear();
    let mut result = Vec::with_capacity(ids.len());
    for id in ids {
        let count = seen.entry(id.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            result.push(id);
        } else {
            let new_id = format!("{}_{}", id, *count - 1);
            log::warn!("Duplicate feature id '{}' renamed to '{}'", id, new_id);
            result.push(new_id);
        }
    }
    result
}

/// A named numeric matrix with features as rows and samples as columns.
///
/// Used for both the raw count matrix and the variance-stabilized expression
/// matrix; the two always carry identical row and column ids inside a
/// container.
/// R equivalent: assay(se) in SummarizedExperiment
#[derive(Debug, Clone)]
pub struct AssayMatrix {
    /// Values (features x samples)
    values: Array2<f64>,
    /// Feature (gene) identifiers
    feature_ids: Vec<String>,
    /// Sample identifiers
    sample_ids: Vec<String>,
}

impl AssayMatrix {
    /// Create a new assay matrix from real-valued data.
    ///
    /// Validates that the id lists match the matrix dimensions and that every
    /// value is finite. Duplicate feature ids are renamed with a warning.
    pub fn new(
        values: Array2<f64>,
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (n_features, n_samples) = values.dim();

        if feature_ids.len() != n_features {
            return Err(BulkError::ShapeMismatch {
                expected: format!("{} feature ids", n_features),
                got: format!("{} feature ids", feature_ids.len()),
            });
        }

        if sample_ids.len() != n_samples {
            return Err(BulkError::ShapeMismatch {
                expected: format!("{} sample ids", n_samples),
                got: format!("{} sample ids", sample_ids.len()),
            });
        }

        if values.iter().any(|&x| x.is_nan() || x.is_infinite()) {
            return Err(BulkError::InvalidInput {
                reason: "Matrix values must be finite".to_string(),
            });
        }

        let feature_ids = deduplicate_ids(feature_ids);

        Ok(Self {
            values,
            feature_ids,
            sample_ids,
        })
    }

    /// Create a count matrix, with the stricter validation raw counts get.
    ///
    /// Counts must be non-negative and not all zero; non-integer values are
    /// tolerated with a warning.
    pub fn from_counts(
        counts: Array2<f64>,
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        if counts.iter().any(|&x| x < 0.0 || x.is_nan() || x.is_infinite()) {
            return Err(BulkError::InvalidInput {
                reason: "Counts must be non-negative finite values".to_string(),
            });
        }

        if !counts.is_empty() && counts.iter().all(|&x| x == 0.0) {
            return Err(BulkError::MissingData {
                reason: "All samples have 0 counts for all features".to_string(),
            });
        }

        if counts.iter().any(|&x| x != x.round()) {
            log::warn!("Some count values are not integers; raw counts are expected to be integral");
        }

        Self::new(counts, feature_ids, sample_ids)
    }

    /// Number of features (rows)
    pub fn n_features(&self) -> usize {
        self.values.nrows()
    }

    /// Number of samples (columns)
    pub fn n_samples(&self) -> usize {
        self.values.ncols()
    }

    /// The values as a view
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Feature identifiers, in row order
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Sample identifiers, in column order
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Row index of a feature id
    pub fn feature_index(&self, feature_id: &str) -> Option<usize> {
        self.feature_ids.iter().position(|id| id == feature_id)
    }

    /// Column index of a sample id
    pub fn sample_index(&self, sample_id: &str) -> Option<usize> {
        self.sample_ids.iter().position(|id| id == sample_id)
    }

    /// Values for one feature across all samples
    pub fn feature_row(&self, feature_idx: usize) -> ArrayView1<'_, f64> {
        self.values.row(feature_idx)
    }

    /// Total read count per sample (column sums)
    /// R equivalent: colSums(counts(dds))
    pub fn library_sizes(&self) -> Vec<f64> {
        self.values
            .axis_iter(Axis(1))
            .map(|col| col.sum())
            .collect()
    }

    /// Subset to specific features, in the given order
    pub fn select_features(&self, feature_indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = feature_indices.iter().find(|&&i| i >= self.n_features()) {
            return Err(BulkError::InvalidInput {
                reason: format!(
                    "feature index {} out of range for {} features",
                    bad,
                    self.n_features()
                ),
            });
        }
        let new_values = self.values.select(Axis(0), feature_indices);
        let new_ids: Vec<String> = feature_indices
            .iter()
            .map(|&i| self.feature_ids[i].clone())
            .collect();

        Self::new(new_values, new_ids, self.sample_ids.clone())
    }

    /// True if `other` has the same feature and sample ids, in the same order
    pub fn ids_match(&self, other: &AssayMatrix) -> bool {
        self.feature_ids == other.feature_ids && self.sample_ids == other.sample_ids
    }
}
