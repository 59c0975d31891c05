use super::Fold;
use crate::error::DatasetError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::seq::index;

/// Leave-pair-out cross-validation over `n_records` records.
///
/// The record indices are shuffled once with a generator seeded from
/// `random_state` and cut into `n_cv_splits` contiguous buckets whose sizes
/// differ by at most one. Fold `i` tests on bucket `i` and trains on the rest.
/// With `split_validation`, `round(validation_ratio * |pool|)` records of each
/// training pool are drawn without replacement, from the same generator and in
/// fold order, and moved to the validation set.
///
/// Every record lands in exactly one test set across the run.
pub fn leave_pair_out_cv(
    n_records: usize,
    n_cv_splits: usize,
    split_validation: bool,
    validation_ratio: f64,
    random_state: u64,
) -> Result<Vec<Fold>, DatasetError> {
    if n_cv_splits < 2 {
        return Err(DatasetError::InvalidArgument(format!(
            "n_cv_splits must be at least 2, got {n_cv_splits}"
        )));
    }
    if n_cv_splits > n_records {
        return Err(DatasetError::InvalidArgument(format!(
            "cannot create {n_cv_splits} folds from {n_records} records"
        )));
    }
    if split_validation && !(0.0..1.0).contains(&validation_ratio) {
        return Err(DatasetError::InvalidArgument(format!(
            "validation_ratio must lie in [0, 1), got {validation_ratio}"
        )));
    }

    let mut rng = StdRng::seed_from_u64(random_state);
    let mut order: Vec<usize> = (0..n_records).collect();
    order.shuffle(&mut rng);
    let buckets = balanced_chunks(&order, n_cv_splits);

    let mut folds = Vec::with_capacity(n_cv_splits);
    for (held_out, bucket) in buckets.iter().enumerate() {
        let pool: Vec<usize> = buckets
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != held_out)
            .flat_map(|(_, records)| records.iter().copied())
            .collect();

        let (mut train, mut validation) = if split_validation {
            carve_validation(pool, validation_ratio, &mut rng)
        } else {
            (pool, Vec::new())
        };
        let mut test = bucket.clone();

        train.sort_unstable();
        validation.sort_unstable();
        test.sort_unstable();

        log::debug!(
            "Fold {}: {} train, {} validation, {} test records",
            held_out + 1,
            train.len(),
            validation.len(),
            test.len()
        );
        folds.push(Fold {
            train,
            validation,
            test,
        });
    }

    log::info!(
        "Created {} leave-pair-out folds over {} records (seed {})",
        n_cv_splits,
        n_records,
        random_state
    );
    Ok(folds)
}

/// Cuts `order` into `k` contiguous pieces; the first `len % k` pieces get one
/// extra element.
fn balanced_chunks(order: &[usize], k: usize) -> Vec<Vec<usize>> {
    let base = order.len() / k;
    let extra = order.len() % k;
    let mut start = 0;
    (0..k)
        .map(|i| {
            let size = base + usize::from(i < extra);
            let chunk = order[start..start + size].to_vec();
            start += size;
            chunk
        })
        .collect()
}

/// Splits `pool` into (train, validation).
fn carve_validation(pool: Vec<usize>, ratio: f64, rng: &mut StdRng) -> (Vec<usize>, Vec<usize>) {
    let n_validation = ((pool.len() as f64 * ratio).round() as usize).min(pool.len());
    let mut is_validation = vec![false; pool.len()];
    for position in index::sample(rng, pool.len(), n_validation) {
        is_validation[position] = true;
    }

    pool.into_iter()
        .zip(is_validation)
        .fold((Vec::new(), Vec::new()), |(mut train, mut validation), (record, held)| {
            if held {
                validation.push(record);
            } else {
                train.push(record);
            }
            (train, validation)
        })
}
