use crate::KindredError;
use crate::table::Table;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rustc_hash::FxHashMap;

/// Fixed shuffle seed, identical for every partition and every invocation.
/// Shuffling exists to wash out order-dependent tie-breaking in the
/// agglomeration step; the contract is "deterministic given fixed seed".
pub const SHUFFLE_SEED: u64 = 5238;

/// One independent clustering unit: the rows whose partition-key columns are
/// all equal. Row indices are in original table order.
#[derive(Debug, Clone)]
pub struct Partition {
    pub label: u32,
    pub row_indices: Vec<usize>,
}

/// Group rows by equality of the partition-key columns. Labels are assigned
/// first-seen: the partition of the earliest row gets label 0, and so on.
pub fn assign_partitions(
    table: &Table,
    partition_vars: &[String],
) -> Result<Vec<Partition>, KindredError> {
    let mut key_columns = Vec::with_capacity(partition_vars.len());
    for var in partition_vars {
        let col = table.column_index(var).ok_or_else(|| {
            KindredError::Config(format!(
                "partition variable '{}' is not a column of the input table",
                var
            ))
        })?;
        key_columns.push(col);
    }

    let mut key_to_label: FxHashMap<Vec<String>, u32> = FxHashMap::default();
    let mut partitions: Vec<Partition> = Vec::new();

    for row in 0..table.len() {
        let key: Vec<String> = key_columns
            .iter()
            .map(|&col| table.cell(row, col).to_string())
            .collect();

        let label = *key_to_label.entry(key).or_insert_with(|| {
            let label = partitions.len() as u32;
            partitions.push(Partition { label, row_indices: Vec::new() });
            label
        });
        partitions[label as usize].row_indices.push(row);
    }

    Ok(partitions)
}

/// Deterministic permutation of the partition's rows under the fixed seed.
pub fn shuffled(row_indices: &[usize]) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(SHUFFLE_SEED);
    let mut shuffled: Vec<usize> = row_indices.to_vec();
    shuffled.shuffle(&mut rng);
    shuffled
}
