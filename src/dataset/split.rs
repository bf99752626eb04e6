//! Seeded train/test partitioning.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::dataset::types::{Dataset, DatasetDict, DatasetError, DatasetResult, TEST_SPLIT, TRAIN_SPLIT};

/// Partition `dataset` into `train` and `test` subsets.
///
/// `ceil(test_size * n)` records go to `test`, the rest to `train`. The
/// permutation comes from a PRNG seeded with `seed`, so the same input order
/// and seed always produce the same partition.
pub fn train_test_split(dataset: Dataset, test_size: f64, seed: u64) -> DatasetResult<DatasetDict> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(DatasetError::InvalidSplit(format!(
            "test_size must be between 0 and 1 (exclusive), got {}",
            test_size
        )));
    }

    let n = dataset.len();
    let n_test = (test_size * n as f64).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(DatasetError::InvalidSplit(format!(
            "{} records with test_size {} leaves train={} test={}",
            n, test_size, n_train, n_test
        )));
    }

    let mut permutation: Vec<usize> = (0..n).collect();
    permutation.shuffle(&mut StdRng::seed_from_u64(seed));

    let Dataset { records, labels } = dataset;
    let mut slots: Vec<_> = records.into_iter().map(Some).collect();
    let mut take = |indices: &[usize]| -> Vec<_> {
        indices.iter().filter_map(|&i| slots[i].take()).collect()
    };

    let test = take(&permutation[..n_test]);
    let train = take(&permutation[n_test..]);

    tracing::info!(train = train.len(), test = test.len(), seed, "Dataset split");

    let mut dict = DatasetDict::default();
    dict.splits.insert(
        TRAIN_SPLIT.to_string(),
        Dataset {
            records: train,
            labels: labels.clone(),
        },
    );
    dict.splits.insert(
        TEST_SPLIT.to_string(),
        Dataset {
            records: test,
            labels,
        },
    );
    Ok(dict)
}
