//! bulkrna: a unified analytical object for bulk RNA-seq data
//!
//! This crate normalizes the heterogeneous outputs of a differential-expression
//! analysis (raw counts, the fitted model, regularized-log expression) into one
//! container with predictable fields, and computes filtered, variance-ranked
//! principal-component embeddings over it. Downstream plotting code can then
//! treat bulk results the same way it treats single-cell results.
//!
//! # Example
//!
//! ```ignore
//! use bulkrna::prelude::*;
//!
//! // `fit` implements ModelFit (the output contract of the upstream fitter)
//! let mut ds = BulkDataSet::from_model(fit)?;
//!
//! // Filter by condition, rank by coefficient of variation, embed the top 500
//! run_pca(&mut ds, &PcaParams::default())?;
//!
//! let embedding = ds.embedding("pca").unwrap();
//! let pc1 = embedding.scores.column(0);
//! ```

pub mod data;
pub mod error;
pub mod model;
pub mod pca;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::data::{AssayMatrix, BulkDataSet, BulkDataSetBuilder, Column, Embedding, SampleTable};
    pub use crate::error::{BulkError, Result};
    pub use crate::model::{Design, ModelFit};
    pub use crate::pca::{principal_components, run_pca, PcaParams, PcaSolution};
}
