use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::{Dataset, DatasetError};

/// Train/test partition of one dataset.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
}

/// Partition `dataset` so each class keeps its share in both halves.
///
/// Within each class the indices are shuffled with a generator seeded from
/// `seed`, and `round(n * test_fraction)` of them go to the test set. Classes
/// with two or more samples always keep at least one training sample.
/// Both halves keep generation order.
pub fn stratified_split(
    dataset: &Dataset,
    test_fraction: f64,
    seed: u64,
) -> Result<Split, DatasetError> {
    if !(0.0..1.0).contains(&test_fraction) {
        return Err(DatasetError::InvalidFraction(test_fraction));
    }
    if dataset.is_empty() {
        return Err(DatasetError::Empty);
    }

    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); dataset.class_count()];
    for (idx, &label) in dataset.labels().iter().enumerate() {
        by_class[label].push(idx);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_idx = Vec::with_capacity(dataset.len());
    let mut test_idx = Vec::new();
    for mut members in by_class {
        let n = members.len();
        if n == 0 {
            continue;
        }
        members.shuffle(&mut rng);
        let mut test_n = ((n as f64) * test_fraction).round() as usize;
        if n == 1 {
            test_n = 0;
        } else if test_n >= n {
            test_n = n - 1;
        }
        test_idx.extend_from_slice(&members[..test_n]);
        train_idx.extend_from_slice(&members[test_n..]);
    }
    train_idx.sort_unstable();
    test_idx.sort_unstable();

    Ok(Split {
        train: dataset.select(&train_idx),
        test: dataset.select(&test_idx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn cycling_dataset(n: usize, classes: usize) -> Dataset {
        let mut features = Array2::<f32>::zeros((n, 1));
        for (idx, mut row) in features.rows_mut().into_iter().enumerate() {
            row[0] = idx as f32;
        }
        let labels = (0..n).map(|idx| idx % classes).collect();
        let names = (0..classes).map(|c| format!("c{c}")).collect();
        Dataset::new(features, labels, names).unwrap()
    }

    #[test]
    fn preserves_class_proportions() {
        let dataset = cycling_dataset(100, 5);
        let split = stratified_split(&dataset, 0.2, 0).unwrap();
        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);
        assert_eq!(split.test.label_counts(), vec![4; 5]);
        assert_eq!(split.train.label_counts(), vec![16; 5]);
    }

    #[test]
    fn halves_are_disjoint_and_cover_everything() {
        let dataset = cycling_dataset(37, 5);
        let split = stratified_split(&dataset, 0.3, 7).unwrap();
        let mut seen: Vec<usize> = split
            .train
            .features()
            .column(0)
            .iter()
            .chain(split.test.features().column(0).iter())
            .map(|&v| v as usize)
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..37).collect::<Vec<_>>());
    }

    #[test]
    fn same_seed_gives_same_split() {
        let dataset = cycling_dataset(50, 5);
        let a = stratified_split(&dataset, 0.2, 3).unwrap();
        let b = stratified_split(&dataset, 0.2, 3).unwrap();
        assert_eq!(a.test, b.test);
        let c = stratified_split(&dataset, 0.2, 4).unwrap();
        assert_ne!(a.test, c.test);
    }

    #[test]
    fn singleton_classes_stay_in_training() {
        let dataset = cycling_dataset(3, 3);
        let split = stratified_split(&dataset, 0.5, 0).unwrap();
        assert_eq!(split.train.len(), 3);
        assert!(split.test.is_empty());
    }

    #[test]
    fn rejects_out_of_range_fraction() {
        let dataset = cycling_dataset(10, 2);
        assert!(matches!(
            stratified_split(&dataset, 1.0, 0),
            Err(DatasetError::InvalidFraction(_))
        ));
    }
}
