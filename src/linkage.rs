use crate::metric::{ResolvedWeight, weighted_distance};
use kodama::{Method, linkage};

/// One agglomeration step. References below the leaf count address leaves;
/// references at or above it address the merge step at (reference - leaf count).
#[derive(Debug, Clone, PartialEq)]
pub struct MergeStep {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    pub size: usize,
}

/// Condensed pairwise dissimilarity matrix in (0,1), (0,2), .., (n-2,n-1) order.
pub fn condensed_distances(rows: &[Vec<f64>], weights: &[ResolvedWeight]) -> Vec<f64> {
    let n = rows.len();
    let mut condensed = Vec::with_capacity(n * (n.saturating_sub(1)) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            condensed.push(weighted_distance(&rows[i], &rows[j], weights));
        }
    }
    condensed
}

/// Run complete-linkage agglomeration over the observation matrix and return
/// the ordered merge sequence. Complete linkage guarantees the sequence is
/// non-decreasing in distance. Requires at least two observations.
pub fn complete_linkage(rows: &[Vec<f64>], weights: &[ResolvedWeight]) -> Vec<MergeStep> {
    let n = rows.len();
    let mut condensed = condensed_distances(rows, weights);
    let dendrogram = linkage(&mut condensed, n, Method::Complete);

    dendrogram
        .steps()
        .iter()
        .map(|step| MergeStep {
            left: step.cluster1,
            right: step.cluster2,
            distance: step.dissimilarity,
            size: step.size,
        })
        .collect()
}
