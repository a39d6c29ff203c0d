use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Shuffles `0..n` with `seed` and splits it into (train, test) index lists.
///
/// The test partition holds `ceil(test_fraction * n)` rows; the same `n` and `seed` always
/// produce the same split.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((test_fraction * n as f64).ceil() as usize).min(n);
    let train = indices.split_off(n_test);
    (train, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_sizes_follow_ceiling() {
        let (train, test) = train_test_split(10, 0.2, 42);
        assert_eq!((train.len(), test.len()), (8, 2));

        let (train, test) = train_test_split(3, 0.2, 42);
        assert_eq!((train.len(), test.len()), (2, 1));

        let (train, test) = train_test_split(1, 0.2, 42);
        assert_eq!((train.len(), test.len()), (0, 1));
    }

    #[test]
    fn split_is_deterministic_and_disjoint() {
        let a = train_test_split(50, 0.2, 42);
        let b = train_test_split(50, 0.2, 42);
        assert_eq!(a, b);

        let mut all: Vec<usize> = a.0.iter().chain(a.1.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }
}
