use crate::KindredError;
use crate::dendrogram::MergeTree;
use crate::labeler::{self, UNCLUSTERED};
use crate::linkage;
use crate::metric::ResolvedWeight;
use crate::partition;
use tracing::debug;

/// Group assignments for one record across every requested threshold.
#[derive(Debug, Clone)]
pub struct RowAssignment {
    pub internal_order: usize,
    pub labels: Vec<String>,
    pub max_dists: Vec<f64>,
}

/// Everything one partition contributes to the output, rows restored to
/// original within-partition order.
#[derive(Debug, Clone)]
pub struct PartitionOutcome {
    pub label: u32,
    pub rows: Vec<RowAssignment>,
}

/// Cluster one partition: shuffle deterministically, run the agglomeration
/// over the tolerance matrix rows, build the merge tree once, then cut it at
/// every threshold. Single-record partitions skip all of that and come back
/// unclustered; zero-record partitions are an input-consistency failure.
pub fn process_partition(
    label: u32,
    row_indices: &[usize],
    matrix: &[Vec<f64>],
    weights: &[ResolvedWeight],
    eps_values: &[f64],
) -> Result<PartitionOutcome, KindredError> {
    if row_indices.is_empty() {
        return Err(KindredError::DegenerateInput(format!(
            "partition {} has zero records",
            label
        )));
    }

    if row_indices.len() == 1 {
        let rows = vec![RowAssignment {
            internal_order: row_indices[0],
            labels: vec![UNCLUSTERED.to_string(); eps_values.len()],
            max_dists: vec![0.0; eps_values.len()],
        }];
        return Ok(PartitionOutcome { label, rows });
    }

    let shuffled = partition::shuffled(row_indices);
    let observations: Vec<Vec<f64>> = shuffled.iter().map(|&row| matrix[row].clone()).collect();

    let steps = linkage::complete_linkage(&observations, weights);
    let tree = MergeTree::build(&steps, shuffled.len()).ok_or_else(|| {
        KindredError::Worker(format!("partition {}: empty merge sequence", label))
    })?;
    debug!(
        partition = label,
        records = shuffled.len(),
        nodes = tree.node_count(),
        "built merge tree"
    );

    let mut rows: Vec<RowAssignment> = shuffled
        .iter()
        .map(|&row| RowAssignment {
            internal_order: row,
            labels: Vec::with_capacity(eps_values.len()),
            max_dists: Vec::with_capacity(eps_values.len()),
        })
        .collect();

    // One O(N) walk per threshold over the same tree
    for &eps in eps_values {
        let cut = labeler::assign_groups(&tree, eps);
        for (leaf, assignment) in rows.iter_mut().enumerate() {
            let group = &cut.labels[leaf];
            if group == UNCLUSTERED {
                assignment.labels.push(UNCLUSTERED.to_string());
            } else {
                assignment.labels.push(format!("{}@{}", label, group));
            }
            assignment.max_dists.push(cut.max_dists[leaf]);
        }
    }

    // Restore original within-partition row order
    rows.sort_by_key(|assignment| assignment.internal_order);

    Ok(PartitionOutcome { label, rows })
}
