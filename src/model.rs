//! Input contract for the upstream differential-expression model fitter
//!
//! The fitter itself is out of scope: this crate only consumes its outputs
//! (raw counts, per-sample covariates, the design formula, and the
//! variance-stabilized expression transform) through the [`ModelFit`] trait.

use crate::data::{AssayMatrix, SampleTable};
use crate::error::{BulkError, Result};

/// A fitted differential-expression model, seen through its output contract.
///
/// Implementations are shared handles: the container holds an `Arc<dyn ModelFit>`
/// back-reference and never mutates the model.
pub trait ModelFit {
    /// Raw count matrix (features x samples), if the fit retained one.
    fn counts(&self) -> Option<AssayMatrix>;

    /// Per-sample covariate table used to fit the model.
    /// R equivalent: colData(dds)
    fn covariates(&self) -> &SampleTable;

    /// The design specification the model was fitted with.
    fn design(&self) -> &Design;

    /// Variance-stabilized (regularized-log) expression, features x samples.
    ///
    /// With `blind = true` the transform must ignore the sample grouping;
    /// with `blind = false` it may use the fitted design to improve the fit.
    /// R equivalent: rlog(dds, blind=...)
    fn variance_stabilized(&self, blind: bool) -> Result<AssayMatrix>;
}

/// A design specification: the right-hand side terms of an R-style formula.
///
/// Only single-term designs (one grouping covariate) are supported by the
/// PCA pipeline; the terms are kept verbatim so the error can say what was
/// actually in the formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Design {
    terms: Vec<String>,
}

impl Design {
    /// Create a design from explicit term names.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a single-term design naming the grouping covariate.
    pub fn single_term(name: &str) -> Self {
        Self {
            terms: vec![name.to_string()],
        }
    }

    /// Parse an R-style formula string such as `"~ condition"` or `"~a + b"`.
    ///
    /// The leading `~` is optional; terms are split on `+` and trimmed.
    /// A bare intercept (`~ 1`) yields an empty term list.
    pub fn from_formula(formula: &str) -> Self {
        let rhs = formula.trim().trim_start_matches('~');
        let terms = rhs
            .split('+')
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != "1")
            .map(str::to_string)
            .collect();
        Self { terms }
    }

    /// All terms, in formula order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// The single grouping term of this design.
    ///
    /// Fails if the design is intercept-only or names more than one term
    /// (multi-factor designs are unsupported).
    pub fn grouping_term(&self) -> Result<&str> {
        match self.terms.as_slice() {
            [term] => Ok(term),
            [] => Err(BulkError::DesignParse {
                reason: "design has no grouping term".to_string(),
            }),
            terms => Err(BulkError::DesignParse {
                reason: format!(
                    "design has {} terms ({:?}); exactly one grouping covariate is supported",
                    terms.len(),
                    terms
                ),
            }),
        }
    }
}
