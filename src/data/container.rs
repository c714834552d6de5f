//! The unified bulk RNA-seq data container

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ndarray::{Array1, Array2};

use super::{AssayMatrix, SampleTable};
use crate::error::{BulkError, Result};
use crate::model::ModelFit;

/// A named principal-component embedding
/// R equivalent: a stored prcomp() result
#[derive(Debug, Clone)]
pub struct Embedding {
    /// Per-sample coordinates (samples x k), rows in `sample_names` order
    pub scores: Array2<f64>,
    /// Per-feature loadings (features x k)
    pub loadings: Array2<f64>,
    /// Row labels of `loadings`
    pub feature_ids: Vec<String>,
    /// Fraction of total variance captured by each component
    pub variance_explained: Array1<f64>,
    /// Whether variables were mean-centered before decomposition
    pub centered: bool,
    /// Whether variables were scaled to unit variance before decomposition
    pub scaled: bool,
}

/// Unified data container for bulk RNA-seq analysis.
///
/// Holds raw counts, the variance-stabilized expression derived from the
/// model fit, per-sample metadata, and any number of named PC embeddings.
/// Downstream plotting code reads these fields; nothing here is written
/// outside of construction and the PCA pipeline.
#[derive(Clone)]
pub struct BulkDataSet {
    /// Raw count matrix (features x samples)
    counts: AssayMatrix,
    /// Variance-stabilized expression, same ids as `counts`
    expression: AssayMatrix,
    /// Back-reference to the upstream model fit; shared, never mutated
    model_fit: Arc<dyn ModelFit>,
    /// Per-sample metadata, one row per sample
    sample_metadata: SampleTable,
    /// Sample identifiers, equal to the count matrix column order
    sample_names: Vec<String>,
    /// Named embeddings, side by side
    embeddings: HashMap<String, Embedding>,
    /// Features chosen by the most recent automatic PCA run, best first
    selected_features: Option<Vec<String>>,
    /// Per-feature result of the most recent expression-presence filter
    expression_filter: Option<Vec<bool>>,
    /// Per-feature coefficient of variation over `expression`
    coefficients_of_variation: Option<Array1<f64>>,
    /// Caller-owned auxiliary data; opaque to this crate
    extensions: HashMap<String, serde_json::Value>,
}

impl BulkDataSet {
    /// Assemble a container from already-validated parts.
    ///
    /// Used by the builder; enforces the shape invariants that every later
    /// mutation also preserves.
    pub(crate) fn assemble(
        counts: AssayMatrix,
        expression: AssayMatrix,
        model_fit: Arc<dyn ModelFit>,
        sample_metadata: SampleTable,
    ) -> Result<Self> {
        if !expression.ids_match(&counts) {
            return Err(BulkError::ShapeMismatch {
                expected: format!(
                    "expression with the count matrix ids ({} features x {} samples)",
                    counts.n_features(),
                    counts.n_samples()
                ),
                got: format!(
                    "{} features x {} samples",
                    expression.n_features(),
                    expression.n_samples()
                ),
            });
        }
        if sample_metadata.sample_ids() != counts.sample_ids() {
            return Err(BulkError::ShapeMismatch {
                expected: "metadata rows matching the count matrix columns".to_string(),
                got: format!("{} metadata rows", sample_metadata.n_samples()),
            });
        }

        let sample_names = counts.sample_ids().to_vec();

        Ok(Self {
            counts,
            expression,
            model_fit,
            sample_metadata,
            sample_names,
            embeddings: HashMap::new(),
            selected_features: None,
            expression_filter: None,
            coefficients_of_variation: None,
            extensions: HashMap::new(),
        })
    }

    /// Create a builder for a new container
    pub fn builder() -> super::builder::BulkDataSetBuilder {
        super::builder::BulkDataSetBuilder::new()
    }

    /// Build a container from a model fit with all defaults: counts taken
    /// from the fit, transform not blinded, no embedding computed.
    pub fn from_model(model: Arc<dyn ModelFit>) -> Result<Self> {
        Self::builder().model(model).build()
    }

    // Getters (the read-only contract for plotting consumers)

    pub fn counts(&self) -> &AssayMatrix {
        &self.counts
    }

    pub fn expression(&self) -> &AssayMatrix {
        &self.expression
    }

    pub fn model_fit(&self) -> &Arc<dyn ModelFit> {
        &self.model_fit
    }

    pub fn sample_metadata(&self) -> &SampleTable {
        &self.sample_metadata
    }

    pub fn sample_names(&self) -> &[String] {
        &self.sample_names
    }

    pub fn feature_ids(&self) -> &[String] {
        self.counts.feature_ids()
    }

    pub fn n_features(&self) -> usize {
        self.counts.n_features()
    }

    pub fn n_samples(&self) -> usize {
        self.counts.n_samples()
    }

    /// All stored embeddings by name
    pub fn embeddings(&self) -> &HashMap<String, Embedding> {
        &self.embeddings
    }

    /// A stored embedding by name
    pub fn embedding(&self, name: &str) -> Option<&Embedding> {
        self.embeddings.get(name)
    }

    /// Features chosen by the most recent automatic PCA run
    pub fn selected_features(&self) -> Option<&[String]> {
        self.selected_features.as_deref()
    }

    /// Presence-filter outcome of the most recent automatic PCA run
    pub fn expression_filter(&self) -> Option<&[bool]> {
        self.expression_filter.as_deref()
    }

    /// Per-feature coefficients of variation from the most recent automatic run
    pub fn coefficients_of_variation(&self) -> Option<&Array1<f64>> {
        self.coefficients_of_variation.as_ref()
    }

    /// Caller-owned extension slots; never touched by this crate
    pub fn extensions(&self) -> &HashMap<String, serde_json::Value> {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut HashMap<String, serde_json::Value> {
        &mut self.extensions
    }

    // Mutation boundary (builder and PCA pipeline only)

    /// Store an embedding, replacing any existing entry of the same name
    pub(crate) fn set_embedding(&mut self, name: &str, embedding: Embedding) -> Result<()> {
        if embedding.scores.nrows() != self.n_samples() {
            return Err(BulkError::ShapeMismatch {
                expected: format!("{} score rows (one per sample)", self.n_samples()),
                got: format!("{}", embedding.scores.nrows()),
            });
        }
        if embedding.loadings.nrows() != embedding.feature_ids.len() {
            return Err(BulkError::ShapeMismatch {
                expected: format!("{} loading rows", embedding.feature_ids.len()),
                got: format!("{}", embedding.loadings.nrows()),
            });
        }
        let k = embedding.scores.ncols();
        if embedding.loadings.ncols() != k || embedding.variance_explained.len() != k {
            return Err(BulkError::ShapeMismatch {
                expected: format!("{} components in scores, loadings, and variances", k),
                got: format!(
                    "{} loading columns, {} variances",
                    embedding.loadings.ncols(),
                    embedding.variance_explained.len()
                ),
            });
        }
        self.embeddings.insert(name.to_string(), embedding);
        Ok(())
    }

    /// Store the selection metadata of an automatic PCA run, overwriting any
    /// previous run's values
    pub(crate) fn set_selection(
        &mut self,
        expression_filter: Vec<bool>,
        coefficients_of_variation: Array1<f64>,
        selected_features: Vec<String>,
    ) -> Result<()> {
        if expression_filter.len() != self.n_features() {
            return Err(BulkError::ShapeMismatch {
                expected: format!("{} filter entries", self.n_features()),
                got: format!("{}", expression_filter.len()),
            });
        }
        if coefficients_of_variation.len() != self.n_features() {
            return Err(BulkError::ShapeMismatch {
                expected: format!("{} coefficients of variation", self.n_features()),
                got: format!("{}", coefficients_of_variation.len()),
            });
        }
        self.expression_filter = Some(expression_filter);
        self.coefficients_of_variation = Some(coefficients_of_variation);
        self.selected_features = Some(selected_features);
        Ok(())
    }

    /// Re-derive the expression matrix through the retained model fit,
    /// e.g. to switch the transform's blinding after construction.
    pub fn refresh_expression(&mut self, blind: bool) -> Result<()> {
        let expression = self.model_fit.variance_stabilized(blind)?;
        if !expression.ids_match(&self.counts) {
            return Err(BulkError::ShapeMismatch {
                expected: "transform output with the count matrix ids".to_string(),
                got: format!(
                    "{} features x {} samples",
                    expression.n_features(),
                    expression.n_samples()
                ),
            });
        }
        self.expression = expression;
        Ok(())
    }
}

impl fmt::Debug for BulkDataSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkDataSet")
            .field("n_features", &self.n_features())
            .field("n_samples", &self.n_samples())
            .field("metadata_columns", &self.sample_metadata.column_names())
            .field("embeddings", &self.embeddings.keys().collect::<Vec<_>>())
            .field("selected_features", &self.selected_features.as_ref().map(Vec::len))
            .finish()
    }
}
