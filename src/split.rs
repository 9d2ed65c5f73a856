//! Stratified train/test splitting
//!
//! The test partition holds `ceil(test_fraction * n)` rows. Each class
//! contributes in proportion to its frequency (largest-remainder rounding),
//! with at least one row of every class on each side. Shuffling uses a
//! seeded ChaCha8 generator so a split is reproducible.

use crate::error::StressError;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Row indices of each partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split row indices into stratified train and test partitions
pub fn stratified_split(
    labels: &[u8],
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit, StressError> {
    let n = labels.len();
    let mut by_class: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    for (i, &label) in labels.iter().enumerate() {
        by_class[usize::from(label.min(1))].push(i);
    }

    if by_class.iter().any(|members| members.len() < 2) {
        return Err(StressError::InsufficientClasses(format!(
            "need at least 2 windows of each class, got {} non-stress and {} stress",
            by_class[0].len(),
            by_class[1].len()
        )));
    }

    let n_test = (test_fraction * n as f64).ceil() as usize;
    if n_test < 2 || n - n_test.min(n) < 2 {
        return Err(StressError::InsufficientClasses(format!(
            "a test fraction of {test_fraction} over {n} windows leaves a partition \
             without both classes"
        )));
    }

    let sizes = [by_class[0].len(), by_class[1].len()];
    let test_counts = allocate_test_counts(sizes, n_test);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);

    for (members, &take) in by_class.iter_mut().zip(test_counts.iter()) {
        members.shuffle(&mut rng);
        test.extend_from_slice(&members[..take]);
        train.extend_from_slice(&members[take..]);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok(TrainTestSplit { train, test })
}

/// Per-class test counts summing to `n_test`, each within `1..size`
fn allocate_test_counts(sizes: [usize; 2], n_test: usize) -> [usize; 2] {
    let n: usize = sizes.iter().sum();
    let exact: Vec<f64> = sizes
        .iter()
        .map(|&size| n_test as f64 * size as f64 / n as f64)
        .collect();
    let mut counts = [exact[0].floor() as usize, exact[1].floor() as usize];

    // Hand out the remainder by largest fractional part, larger class first on ties
    let mut order = [0usize, 1];
    order.sort_by(|&a, &b| {
        let frac_a = exact[a] - exact[a].floor();
        let frac_b = exact[b] - exact[b].floor();
        frac_b
            .partial_cmp(&frac_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(sizes[b].cmp(&sizes[a]))
    });
    let mut remaining = n_test - counts.iter().sum::<usize>();
    for &class in order.iter().cycle() {
        if remaining == 0 {
            break;
        }
        counts[class] += 1;
        remaining -= 1;
    }

    // Keep every class on both sides of the split
    for class in 0..2 {
        let other = 1 - class;
        if counts[class] == 0 {
            counts[class] = 1;
            counts[other] -= 1;
        } else if counts[class] >= sizes[class] {
            let excess = counts[class] - (sizes[class] - 1);
            counts[class] -= excess;
            counts[other] += excess;
        }
    }

    counts
}
