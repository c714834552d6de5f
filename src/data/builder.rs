//! Builder for the unified data container
//!
//! Wires a fitted model (and optionally explicit raw counts) into a populated
//! [`BulkDataSet`], optionally running the PCA pipeline before returning.

use std::sync::Arc;

use super::{AssayMatrix, BulkDataSet, SampleTable};
use crate::error::{BulkError, Result};
use crate::model::ModelFit;
use crate::pca::PcaParams;

/// Builder for [`BulkDataSet`]
///
/// # Example
///
/// ```ignore
/// let ds = BulkDataSetBuilder::new()
///     .model(fit)
///     .blind(true)
///     .pca(PcaParams::default())
///     .build()?;
/// ```
#[derive(Default)]
pub struct BulkDataSetBuilder {
    model: Option<Arc<dyn ModelFit>>,
    counts: Option<AssayMatrix>,
    blind: bool,
    pca: Option<PcaParams>,
}

impl BulkDataSetBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fitted model (required)
    pub fn model(mut self, model: Arc<dyn ModelFit>) -> Self {
        self.model = Some(model);
        self
    }

    /// Supply the raw count matrix explicitly instead of taking it from the
    /// model fit
    pub fn counts(mut self, counts: AssayMatrix) -> Self {
        self.counts = Some(counts);
        self
    }

    /// Run the variance-stabilizing transform blind to the sample grouping.
    ///
    /// Defaults to false: the transform may use the fitted design. Pass true
    /// when the grouping assumption does not hold for the dataset.
    pub fn blind(mut self, blind: bool) -> Self {
        self.blind = blind;
        self
    }

    /// Run the PCA pipeline with these parameters as part of construction
    pub fn pca(mut self, params: PcaParams) -> Self {
        self.pca = Some(params);
        self
    }

    /// Build the container
    pub fn build(self) -> Result<BulkDataSet> {
        let model = self.model.ok_or_else(|| BulkError::InvalidInput {
            reason: "model fit is required".to_string(),
        })?;

        // Explicit counts win; otherwise fall back to the model fit's copy.
        let counts = match self.counts.or_else(|| model.counts()) {
            Some(counts) => counts,
            None => {
                return Err(BulkError::MissingData {
                    reason: "no counts supplied and the model fit exposes none".to_string(),
                })
            }
        };

        let covariates = model.covariates();
        if covariates.sample_ids() != counts.sample_ids() {
            return Err(BulkError::ShapeMismatch {
                expected: format!("model covariates for samples {:?}", counts.sample_ids()),
                got: format!("covariates for samples {:?}", covariates.sample_ids()),
            });
        }

        // Canonical columns first; model covariates may not displace them.
        let sample_names = counts.sample_ids().to_vec();
        let mut metadata = SampleTable::new(sample_names.clone());
        metadata.push_categorical("sample", sample_names)?;
        metadata.push_numeric("total_counts", counts.library_sizes())?;
        metadata.absorb(covariates)?;

        log::debug!(
            "building container: {} features, {} samples, blind={}",
            counts.n_features(),
            counts.n_samples(),
            self.blind
        );

        let expression = model.variance_stabilized(self.blind)?;

        let mut ds = BulkDataSet::assemble(counts, expression, model, metadata)?;

        if let Some(params) = self.pca {
            crate::pca::run_pca(&mut ds, &params)?;
        }

        Ok(ds)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::model::mock::MockModel;
    use crate::model::Design;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn two_group_model() -> MockModel {
        let counts = AssayMatrix::from_counts(
            array![
                [100.0, 110.0, 90.0, 400.0, 420.0, 380.0],
                [500.0, 520.0, 480.0, 500.0, 510.0, 490.0],
                [300.0, 310.0, 290.0, 75.0, 80.0, 70.0],
                [50.0, 55.0, 45.0, 50.0, 52.0, 48.0],
            ],
            ids(&["gene1", "gene2", "gene3", "gene4"]),
            ids(&["s1", "s2", "s3", "s4", "s5", "s6"]),
        )
        .unwrap();

        let mut covariates = SampleTable::new(counts.sample_ids().to_vec());
        covariates
            .push_categorical(
                "treatment",
                ids(&["control", "control", "control", "treated", "treated", "treated"]),
            )
            .unwrap();

        MockModel::new(counts, covariates, Design::single_term("treatment"))
    }

    #[test]
    fn test_build_from_model_counts() {
        let ds = BulkDataSetBuilder::new()
            .model(Arc::new(two_group_model()))
            .build()
            .unwrap();

        assert_eq!(ds.n_features(), 4);
        assert_eq!(ds.n_samples(), 6);
        assert_eq!(ds.sample_names(), ds.counts().sample_ids());
        assert!(ds.counts().ids_match(ds.expression()));
        assert!(ds.embeddings().is_empty());
    }

    #[test]
    fn test_explicit_counts_win() {
        let model = two_group_model();
        let explicit = AssayMatrix::from_counts(
            array![
                [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
                [6.0, 5.0, 4.0, 3.0, 2.0, 1.0],
                [2.0, 2.0, 2.0, 2.0, 2.0, 2.0],
                [9.0, 9.0, 9.0, 9.0, 9.0, 9.0],
            ],
            ids(&["gene1", "gene2", "gene3", "gene4"]),
            ids(&["s1", "s2", "s3", "s4", "s5", "s6"]),
        )
        .unwrap();

        let ds = BulkDataSetBuilder::new()
            .model(Arc::new(model))
            .counts(explicit)
            .build()
            .unwrap();

        assert_eq!(ds.counts().values()[[0, 0]], 1.0);
        // Library sizes come from the explicit matrix
        assert_eq!(
            ds.sample_metadata().numeric("total_counts").unwrap()[0],
            1.0 + 6.0 + 2.0 + 9.0
        );
    }

    #[test]
    fn test_missing_counts_everywhere() {
        let counts = AssayMatrix::from_counts(
            array![[1.0, 2.0]],
            ids(&["gene1"]),
            ids(&["s1", "s2"]),
        )
        .unwrap();
        let mut covariates = SampleTable::new(ids(&["s1", "s2"]));
        covariates
            .push_categorical("treatment", ids(&["a", "b"]))
            .unwrap();
        let model = MockModel::without_counts(counts, covariates, Design::single_term("treatment"));

        let result = BulkDataSetBuilder::new().model(Arc::new(model)).build();
        assert!(matches!(result, Err(BulkError::MissingData { .. })));
    }

    #[test]
    fn test_metadata_column_precedence() {
        let ds = BulkDataSetBuilder::new()
            .model(Arc::new(two_group_model()))
            .build()
            .unwrap();

        let meta = ds.sample_metadata();
        assert_eq!(meta.column_names(), &["sample", "total_counts", "treatment"]);
        assert_eq!(meta.categorical("sample").unwrap(), ds.sample_names());
        // Column sums of the counts
        assert_eq!(
            meta.numeric("total_counts").unwrap()[0],
            100.0 + 500.0 + 300.0 + 50.0
        );
    }

    #[test]
    fn test_canonical_columns_survive_covariate_collision() {
        let counts = AssayMatrix::from_counts(
            array![[10.0, 20.0], [30.0, 40.0]],
            ids(&["gene1", "gene2"]),
            ids(&["s1", "s2"]),
        )
        .unwrap();
        let mut covariates = SampleTable::new(ids(&["s1", "s2"]));
        covariates
            .push_categorical("sample", ids(&["not_s1", "not_s2"]))
            .unwrap();
        covariates
            .push_numeric("total_counts", vec![-1.0, -1.0])
            .unwrap();
        covariates
            .push_categorical("treatment", ids(&["a", "b"]))
            .unwrap();
        let model = MockModel::new(counts, covariates, Design::single_term("treatment"));

        let ds = BulkDataSetBuilder::new().model(Arc::new(model)).build().unwrap();
        let meta = ds.sample_metadata();
        assert_eq!(meta.categorical("sample").unwrap(), &ids(&["s1", "s2"]));
        assert_eq!(meta.numeric("total_counts").unwrap(), &vec![40.0, 60.0]);
        assert_eq!(meta.categorical("treatment").unwrap(), &ids(&["a", "b"]));
    }

    #[test]
    fn test_blind_flag_reaches_transform() {
        let model = Arc::new(two_group_model());
        BulkDataSetBuilder::new()
            .model(model.clone())
            .build()
            .unwrap();
        assert_eq!(model.last_blind.get(), Some(false));

        BulkDataSetBuilder::new()
            .model(model.clone())
            .blind(true)
            .build()
            .unwrap();
        assert_eq!(model.last_blind.get(), Some(true));
    }

    #[test]
    fn test_covariate_sample_mismatch_rejected() {
        let counts = AssayMatrix::from_counts(
            array![[10.0, 20.0], [30.0, 40.0]],
            ids(&["gene1", "gene2"]),
            ids(&["s1", "s2"]),
        )
        .unwrap();
        let mut covariates = SampleTable::new(ids(&["other1", "other2"]));
        covariates
            .push_categorical("treatment", ids(&["a", "b"]))
            .unwrap();
        let model = MockModel::new(counts, covariates, Design::single_term("treatment"));

        let result = BulkDataSetBuilder::new().model(Arc::new(model)).build();
        assert!(matches!(result, Err(BulkError::ShapeMismatch { .. })));
    }
}
