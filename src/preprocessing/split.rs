//! Seeded stratified train/test split.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{Error, Result};
use crate::types::Value;

/// Row indices of the two partitions, in partition order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split row indices `0..target.len()` into train and test, preserving class proportions.
///
/// - The test partition holds `ceil(test_size * n)` rows.
/// - Each class gets its proportional share of test rows, rounded by largest remainder and
///   kept within `[1, class_size - 1]` so every class lands in both partitions.
/// - Rows are shuffled within each class, then each partition is permuted, all from one
///   generator seeded with `seed`. The same inputs always produce the same split.
///
/// Fails with [`Error::InsufficientClassSamples`] if a class has fewer than two members or
/// either partition would be smaller than the number of classes, and with
/// [`Error::MissingTarget`] if a target value is null.
pub fn stratified_split(target: &[Value], column: &str, test_size: f64, seed: u64) -> Result<SplitIndices> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(Error::InvalidConfig {
            message: format!("test_size must be in (0, 1), got {test_size}"),
        });
    }

    let mut classes: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, v) in target.iter().enumerate() {
        if v.is_null() {
            return Err(Error::MissingTarget {
                column: column.to_string(),
                row: i + 1,
            });
        }
        classes.entry(v.render()).or_default().push(i);
    }

    let n = target.len();
    let n_test = ((test_size * n as f64).ceil() as usize).min(n);
    let n_train = n - n_test;

    if let Some((label, members)) = classes.iter().find(|(_, m)| m.len() < 2) {
        return Err(Error::InsufficientClassSamples {
            message: format!(
                "class '{label}' of '{column}' has {} member(s); at least 2 are required",
                members.len()
            ),
        });
    }
    if n_test < classes.len() || n_train < classes.len() {
        return Err(Error::InsufficientClassSamples {
            message: format!(
                "train size {n_train} and test size {n_test} must each be at least the number of classes ({})",
                classes.len()
            ),
        });
    }

    let counts: Vec<usize> = classes.values().map(Vec::len).collect();
    let alloc = allocate_test_counts(&counts, n_test).ok_or_else(|| Error::InsufficientClassSamples {
        message: format!("cannot place {n_test} test rows across {} classes", classes.len()),
    })?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);
    for (members, &k) in classes.values().zip(&alloc) {
        let mut members = members.clone();
        members.shuffle(&mut rng);
        test.extend_from_slice(&members[..k]);
        train.extend_from_slice(&members[k..]);
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok(SplitIndices { train, test })
}

/// Per-class test counts summing to `n_test`, each within `[1, count - 1]`.
///
/// `None` when the bounds cannot be met.
fn allocate_test_counts(counts: &[usize], n_test: usize) -> Option<Vec<usize>> {
    let n: usize = counts.iter().sum();
    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * n_test as f64 / n as f64)
        .collect();
    let mut alloc: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    // Largest remainder; ties go to the larger class, then the earlier one.
    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let (ra, rb) = (exact[a] - exact[a].floor(), exact[b] - exact[b].floor());
        rb.total_cmp(&ra).then(counts[b].cmp(&counts[a])).then(a.cmp(&b))
    });
    let floor_sum: usize = alloc.iter().sum();
    for &i in order.iter().take(n_test.saturating_sub(floor_sum)) {
        alloc[i] += 1;
    }

    for (a, &c) in alloc.iter_mut().zip(counts) {
        *a = (*a).clamp(1, c.checked_sub(1)?.max(1));
    }

    loop {
        let total: usize = alloc.iter().sum();
        if total == n_test {
            return Some(alloc);
        }
        if total > n_test {
            let i = (0..alloc.len())
                .filter(|&i| alloc[i] > 1)
                .max_by(|&a, &b| {
                    let (sa, sb) = (alloc[a] as f64 - exact[a], alloc[b] as f64 - exact[b]);
                    sa.total_cmp(&sb).then(b.cmp(&a))
                })?;
            alloc[i] -= 1;
        } else {
            let i = (0..alloc.len())
                .filter(|&i| alloc[i] + 1 < counts[i])
                .max_by(|&a, &b| {
                    let (da, db) = (exact[a] - alloc[a] as f64, exact[b] - alloc[b] as f64);
                    da.total_cmp(&db).then(b.cmp(&a))
                })?;
            alloc[i] += 1;
        }
    }
}
