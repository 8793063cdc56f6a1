// ============================================================
// Layer 4 — Holdout Splitter
// ============================================================
// Splits the training images into (train, validation) for the
// group-count search, so the test set is never used to pick a
// hyperparameter.
//
// The split is deterministic: the first `holdout` images become
// the validation set and the rest stay for training. CIFAR-10
// batch files are already in random order, so no shuffle is
// needed and every candidate sees exactly the same split.
//
// Reference: Rust Book §8 (Vectors)

/// Split `samples` into (train, validation), taking the first
/// `holdout` items as validation.
///
/// A `holdout` larger than the input moves everything into
/// validation instead of panicking.
pub fn split_holdout<T>(mut samples: Vec<T>, holdout: usize) -> (Vec<T>, Vec<T>) {
    let total    = samples.len();
    let split_at = holdout.min(total);

    // split_off(n) leaves [0..n] in `samples` and returns [n..total]
    let train = samples.split_off(split_at);
    let val   = samples;

    tracing::debug!(
        "Holdout split: {} training, {} validation",
        train.len(),
        val.len(),
    );

    (train, val)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, val)      = split_holdout(items, 20);
        assert_eq!(train.len(), 80);
        assert_eq!(val.len(),   20);
    }

    #[test]
    fn test_validation_is_the_head() {
        let items: Vec<usize> = (0..10).collect();
        let (train, val)      = split_holdout(items, 3);
        assert_eq!(val,   vec![0, 1, 2]);
        assert_eq!(train, (3..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_dataset() {
        let items: Vec<usize> = Vec::new();
        let (train, val)      = split_holdout(items, 5);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }

    #[test]
    fn test_oversized_holdout() {
        let items: Vec<usize> = (0..4).collect();
        let (train, val)      = split_holdout(items, 10);
        assert!(train.is_empty());
        assert_eq!(val.len(), 4);
    }
}
