use crate::KindredError;
use crate::config::RunConfig;
use crate::labeler::UNCLUSTERED;
use crate::metric::ResolvedWeight;
use crate::partition::{self, Partition};
use crate::spec_cache::SpecCache;
use crate::table::{self, Table};
use crate::worker::{self, PartitionOutcome};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::info;

/// Where a finished run landed.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: u32,
    pub output_path: PathBuf,
    pub rows: usize,
    pub partitions: usize,
}

/// Execute one clustering request end to end: read the table, cluster every
/// partition on the worker pool, recombine in original row order, and write
/// the output table under the run id from the spec cache.
pub fn run(
    config: &RunConfig,
    data_path: &Path,
    output_dir: &Path,
    n_workers: usize,
) -> Result<RunOutcome, KindredError> {
    config.validate()?;

    info!(path = %data_path.display(), "reading input table");
    let table = Table::read_csv(data_path)?;
    config.validate_against_table(&table)?;

    // Eager numeric extraction: bad cells abort before any clustering
    let matrix = table::tolerance_matrix(&table, config)?;
    let weights = config.resolved_weights()?;

    let partitions = partition::assign_partitions(&table, &config.partition_vars)?;
    info!(
        rows = table.len(),
        partitions = partitions.len(),
        workers = n_workers,
        "dispatching partitions"
    );

    let n_partitions = partitions.len();
    let outcomes = dispatch(partitions, &matrix, &weights, &config.eps, n_workers)?;

    let (extra_headers, extra_columns) = recombine(&outcomes, table.len(), &config.eps);

    let cache = SpecCache::new(output_dir);
    let run_id = cache.allocate(config)?;

    std::fs::create_dir_all(output_dir).map_err(KindredError::Io)?;
    let output_path = output_dir.join(format!("groups_df_spec={}.csv", run_id));
    table.write_csv_with_columns(&output_path, &extra_headers, &extra_columns)?;
    info!(run_id, path = %output_path.display(), "run complete");

    Ok(RunOutcome {
        run_id,
        output_path,
        rows: table.len(),
        partitions: n_partitions,
    })
}

/// Fan partitions out over a fixed-size thread pool fed by a channel task
/// queue. Blocks until every partition completes; the first worker failure
/// aborts the whole run with no output written.
pub fn dispatch(
    partitions: Vec<Partition>,
    matrix: &[Vec<f64>],
    weights: &[ResolvedWeight],
    eps_values: &[f64],
    n_workers: usize,
) -> Result<Vec<PartitionOutcome>, KindredError> {
    let n_tasks = partitions.len();
    let (task_tx, task_rx) = crossbeam_channel::unbounded::<Partition>();
    let (result_tx, result_rx) =
        crossbeam_channel::unbounded::<Result<PartitionOutcome, KindredError>>();

    for partition in partitions {
        task_tx
            .send(partition)
            .map_err(|_| KindredError::Worker("partition queue disconnected".to_string()))?;
    }
    drop(task_tx);

    thread::scope(|scope| {
        for _ in 0..n_workers.max(1) {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for task in task_rx.iter() {
                    let outcome = worker::process_partition(
                        task.label,
                        &task.row_indices,
                        matrix,
                        weights,
                        eps_values,
                    );
                    if result_tx.send(outcome).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let mut outcomes = Vec::with_capacity(n_tasks);
        for outcome in result_rx.iter() {
            outcomes.push(outcome?);
        }
        Ok(outcomes)
    })
}

/// Merge worker results back into per-threshold output columns, indexing
/// directly on each row's internal order. Arrival order never matters.
fn recombine(
    outcomes: &[PartitionOutcome],
    n_rows: usize,
    eps_values: &[f64],
) -> (Vec<String>, Vec<Vec<String>>) {
    let n_eps = eps_values.len();
    let mut label_columns = vec![vec![UNCLUSTERED.to_string(); n_rows]; n_eps];
    let mut dist_columns = vec![vec![0.0_f64; n_rows]; n_eps];

    for outcome in outcomes {
        for row in &outcome.rows {
            for e in 0..n_eps {
                label_columns[e][row.internal_order] = row.labels[e].clone();
                dist_columns[e][row.internal_order] = row.max_dists[e];
            }
        }
    }

    // Group-id columns first, then max-dist columns, both in eps order
    let mut headers = Vec::with_capacity(2 * n_eps);
    let mut columns = Vec::with_capacity(2 * n_eps);
    for (e, eps) in eps_values.iter().enumerate() {
        headers.push(format!("group_id_eps_{}", eps));
        columns.push(std::mem::take(&mut label_columns[e]));
    }
    for (e, eps) in eps_values.iter().enumerate() {
        headers.push(format!("eps_{}_max_dist", eps));
        columns.push(dist_columns[e].iter().map(|d| format!("{}", d)).collect());
    }

    (headers, columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::ResolvedWeight;

    fn unit_weights(n: usize) -> Vec<ResolvedWeight> {
        vec![ResolvedWeight::Constant(1.0); n]
    }

    fn two_partitions() -> (Vec<Partition>, Vec<Vec<f64>>) {
        // Partition 0: rows 0,2 close together; partition 1: rows 1,3 far apart
        let partitions = vec![
            Partition { label: 0, row_indices: vec![0, 2] },
            Partition { label: 1, row_indices: vec![1, 3] },
        ];
        let matrix = vec![vec![0.0], vec![100.0], vec![0.5], vec![400.0]];
        (partitions, matrix)
    }

    #[test]
    fn test_dispatch_collects_every_partition() {
        let (partitions, matrix) = two_partitions();
        let outcomes = dispatch(partitions, &matrix, &unit_weights(1), &[1.0], 4).unwrap();
        assert_eq!(outcomes.len(), 2);

        let mut labels: Vec<u32> = outcomes.iter().map(|o| o.label).collect();
        labels.sort();
        assert_eq!(labels, vec![0, 1]);
    }

    #[test]
    fn test_dispatch_result_is_worker_count_invariant() {
        let (partitions, matrix) = two_partitions();
        let mut single =
            dispatch(partitions.clone(), &matrix, &unit_weights(1), &[1.0], 1).unwrap();
        let mut many = dispatch(partitions, &matrix, &unit_weights(1), &[1.0], 8).unwrap();

        single.sort_by_key(|o| o.label);
        many.sort_by_key(|o| o.label);
        for (a, b) in single.iter().zip(&many) {
            assert_eq!(a.label, b.label);
            for (ra, rb) in a.rows.iter().zip(&b.rows) {
                assert_eq!(ra.internal_order, rb.internal_order);
                assert_eq!(ra.labels, rb.labels);
                assert_eq!(ra.max_dists, rb.max_dists);
            }
        }
    }

    #[test]
    fn test_dispatch_aborts_on_degenerate_partition() {
        let partitions = vec![
            Partition { label: 0, row_indices: vec![0] },
            Partition { label: 1, row_indices: vec![] },
        ];
        let matrix = vec![vec![0.0]];
        let err = dispatch(partitions, &matrix, &unit_weights(1), &[1.0], 2).unwrap_err();
        assert!(matches!(err, KindredError::DegenerateInput(_)));
    }

    #[test]
    fn test_recombine_indexes_by_internal_order() {
        let (partitions, matrix) = two_partitions();
        // Reverse completion order on purpose: recombination must not care
        let mut outcomes = dispatch(partitions, &matrix, &unit_weights(1), &[1.0], 2).unwrap();
        outcomes.sort_by_key(|o| std::cmp::Reverse(o.label));

        let (headers, columns) = recombine(&outcomes, 4, &[1.0]);
        assert_eq!(headers, vec!["group_id_eps_1", "eps_1_max_dist"]);

        // Rows 0 and 2 (partition 0) cluster; rows 1 and 3 (partition 1) do not
        assert_eq!(columns[0][0], columns[0][2]);
        assert!(columns[0][0].starts_with("0@"));
        assert_eq!(columns[0][1], "-1");
        assert_eq!(columns[0][3], "-1");
        assert_eq!(columns[1][0], "0.5");
        assert_eq!(columns[1][1], "0");
    }

    #[test]
    fn test_column_names_use_shortest_eps_form() {
        let (headers, _) = recombine(&[], 0, &[0.0, 1.0, 2.5]);
        assert_eq!(
            headers,
            vec![
                "group_id_eps_0",
                "group_id_eps_1",
                "group_id_eps_2.5",
                "eps_0_max_dist",
                "eps_1_max_dist",
                "eps_2.5_max_dist",
            ]
        );
    }
}
