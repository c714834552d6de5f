//! Gene selection and principal-component pipeline
//!
//! Two mutually exclusive modes over a built [`BulkDataSet`]:
//! automatic feature selection (per-condition presence filter, then
//! coefficient-of-variation ranking truncated to the top N), or an explicit
//! feature list that bypasses filtering and ranking entirely. Both end in the
//! same centered, scaled principal-component decomposition, stored under a
//! caller-chosen embedding name.

mod select;
mod solver;

pub use solver::{principal_components, PcaSolution};

use crate::data::{AssayMatrix, BulkDataSet, Embedding};
use crate::error::{BulkError, Result};

/// Default number of top-variance features kept by automatic selection
pub const DEFAULT_TOP_N: usize = 500;

/// Default per-condition presence threshold, in percent of samples
pub const DEFAULT_MIN_EXPRESSED_PCT: f64 = 75.0;

/// Parameters for a PCA pipeline run
#[derive(Debug, Clone)]
pub struct PcaParams {
    /// Name the embedding is stored under; an existing entry of the same
    /// name is replaced
    pub name: String,
    /// Explicit feature list. When set, filtering, ranking, `top_n`, and
    /// `min_expressed_pct` are all bypassed and the selection metadata on the
    /// container is left untouched.
    pub features: Option<Vec<String>>,
    /// Number of top-variance features kept in automatic mode
    pub top_n: usize,
    /// Percent of samples per condition that must have a positive raw count
    pub min_expressed_pct: f64,
}

impl Default for PcaParams {
    fn default() -> Self {
        Self {
            name: "pca".to_string(),
            features: None,
            top_n: DEFAULT_TOP_N,
            min_expressed_pct: DEFAULT_MIN_EXPRESSED_PCT,
        }
    }
}

impl PcaParams {
    /// Automatic selection, stored under the given name
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Explicit feature list, stored under the given name
    pub fn explicit(name: &str, features: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            features: Some(features),
            ..Default::default()
        }
    }
}

/// Run the PCA pipeline on a container.
///
/// Automatic mode rewrites the container's `expression_filter`,
/// `coefficients_of_variation`, and `selected_features`; explicit mode only
/// stores the named embedding. Nothing is written until every fallible step
/// has succeeded.
pub fn run_pca(ds: &mut BulkDataSet, params: &PcaParams) -> Result<()> {
    match &params.features {
        Some(features) => run_explicit(ds, &params.name, features),
        None => run_automatic(ds, params),
    }
}

fn run_automatic(ds: &mut BulkDataSet, params: &PcaParams) -> Result<()> {
    if params.top_n == 0 {
        return Err(BulkError::InvalidInput {
            reason: "top_n must be positive".to_string(),
        });
    }

    let term = ds.model_fit().design().grouping_term()?.to_string();
    let groups = match ds.sample_metadata().categorical(&term) {
        Some(values) => values.clone(),
        None => {
            let reason = if ds.sample_metadata().has_column(&term) {
                format!("grouping covariate '{}' is not categorical", term)
            } else {
                format!("grouping covariate '{}' not found in sample metadata", term)
            };
            return Err(BulkError::DesignParse { reason });
        }
    };

    let filter = select::presence_filter(ds.counts(), &groups, params.min_expressed_pct);
    let cv = select::coefficients_of_variation(ds.expression());
    let order = select::rank_by_variation(&cv, &filter, params.top_n);

    if order.is_empty() {
        return Err(BulkError::EmptySelection {
            reason: format!(
                "no features pass the {}% presence filter in every '{}' group",
                params.min_expressed_pct, term
            ),
        });
    }

    log::debug!(
        "presence filter kept {}/{} features; embedding the top {} by coefficient of variation",
        filter.iter().filter(|&&p| p).count(),
        ds.n_features(),
        order.len()
    );

    let working = ds.expression().select_features(&order)?;
    ensure_nonconstant_rows(&working)?;

    // Samples as observations, selected features as variables
    let solution = principal_components(working.values().t(), true, true)?;

    let selected = working.feature_ids().to_vec();
    let embedding = Embedding {
        scores: solution.scores,
        loadings: solution.loadings,
        feature_ids: selected.clone(),
        variance_explained: solution.variance_explained,
        centered: solution.centered,
        scaled: solution.scaled,
    };

    ds.set_selection(filter, cv, selected)?;
    ds.set_embedding(&params.name, embedding)?;
    Ok(())
}

fn run_explicit(ds: &mut BulkDataSet, name: &str, features: &[String]) -> Result<()> {
    if features.is_empty() {
        return Err(BulkError::InvalidInput {
            reason: "explicit feature list is empty".to_string(),
        });
    }

    let expression = ds.expression();
    let mut indices = Vec::with_capacity(features.len());
    let mut missing = Vec::new();
    for feature in features {
        match expression.feature_index(feature) {
            Some(i) => indices.push(i),
            None => missing.push(feature.clone()),
        }
    }
    if !missing.is_empty() {
        return Err(BulkError::UnknownFeature { missing });
    }

    // Requested order is preserved; no filtering, ranking, or truncation
    let working = expression.select_features(&indices)?;
    ensure_nonconstant_rows(&working)?;

    let solution = principal_components(working.values().t(), true, true)?;

    let embedding = Embedding {
        scores: solution.scores,
        loadings: solution.loadings,
        feature_ids: working.feature_ids().to_vec(),
        variance_explained: solution.variance_explained,
        centered: solution.centered,
        scaled: solution.scaled,
    };

    ds.set_embedding(name, embedding)?;
    Ok(())
}

/// The solver scales variables to unit variance; a constant expression row
/// cannot be scaled, so fail with the feature named instead of a bare index.
fn ensure_nonconstant_rows(matrix: &AssayMatrix) -> Result<()> {
    if matrix.n_samples() == 0 {
        return Ok(());
    }
    for (i, id) in matrix.feature_ids().iter().enumerate() {
        let row = matrix.feature_row(i);
        let first = row[0];
        if row.iter().all(|&x| x == first) {
            return Err(BulkError::InvalidInput {
                reason: format!(
                    "feature '{}' has constant expression and cannot be scaled for PCA",
                    id
                ),
            });
        }
    }
    Ok(())
}
