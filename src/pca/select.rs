//! Feature selection for the PCA pipeline: per-condition expression-presence
//! filtering and coefficient-of-variation ranking

use std::cmp::Ordering;

use ndarray::Array1;
use rayon::prelude::*;

use crate::data::AssayMatrix;

/// Per-condition expression-presence filter.
///
/// A feature passes when, within every level of the grouping variable, the
/// fraction of samples with a strictly positive raw count is at least
/// `min_pct / 100`. The comparison is `>=`.
pub(crate) fn presence_filter(counts: &AssayMatrix, groups: &[String], min_pct: f64) -> Vec<bool> {
    // Sample indices per group level, in first-seen order
    let mut levels: Vec<(&str, Vec<usize>)> = Vec::new();
    for (j, level) in groups.iter().enumerate() {
        match levels.iter_mut().find(|(name, _)| *name == level.as_str()) {
            Some((_, indices)) => indices.push(j),
            None => levels.push((level.as_str(), vec![j])),
        }
    }

    let threshold = min_pct / 100.0;
    let values = counts.values();

    (0..counts.n_features())
        .into_par_iter()
        .map(|i| {
            levels.iter().all(|(_, indices)| {
                let expressed = indices.iter().filter(|&&j| values[[i, j]] > 0.0).count();
                expressed as f64 / indices.len() as f64 >= threshold
            })
        })
        .collect()
}

/// Coefficient of variation per feature row of the expression matrix.
///
/// Sample (n-1) standard deviation over the row mean. A row whose mean and
/// standard deviation are both zero yields NaN; ranking puts those last.
pub(crate) fn coefficients_of_variation(expression: &AssayMatrix) -> Array1<f64> {
    let values = expression.values();
    let n_samples = expression.n_samples();

    let cvs: Vec<f64> = (0..expression.n_features())
        .into_par_iter()
        .map(|i| {
            let row = values.row(i);
            let mean = row.sum() / n_samples as f64;
            let sd = if n_samples > 1 {
                let ss: f64 = row.iter().map(|&x| (x - mean) * (x - mean)).sum();
                (ss / (n_samples - 1) as f64).sqrt()
            } else {
                0.0
            };
            sd / mean
        })
        .collect();

    Array1::from_vec(cvs)
}

/// Rank filter-passing features by descending coefficient of variation and
/// keep the first `min(top_n, candidates)`.
///
/// The sort is stable, so ties keep their original row order; NaN
/// coefficients sort after every finite value.
pub(crate) fn rank_by_variation(cv: &Array1<f64>, filter: &[bool], top_n: usize) -> Vec<usize> {
    let mut candidates: Vec<usize> = filter
        .iter()
        .enumerate()
        .filter(|(_, &pass)| pass)
        .map(|(i, _)| i)
        .collect();

    candidates.sort_by(|&a, &b| {
        let ca = cv[a];
        let cb = cv[b];
        match (ca.is_nan(), cb.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => cb.partial_cmp(&ca).unwrap_or(Ordering::Equal),
        }
    });

    candidates.truncate(top_n.min(candidates.len()));
    candidates
}
