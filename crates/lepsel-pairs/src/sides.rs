//! Side views gathered from the full lepton collection.

/// Elements of `values` at the positions listed in `index`, in index order.
///
/// Negative or out-of-range indices are skipped, so a stale or empty index
/// list yields a shorter (possibly empty) side rather than an error.
pub fn gather<T: Copy>(values: &[T], index: &[i32]) -> Vec<T> {
    index
        .iter()
        .filter_map(|&i| usize::try_from(i).ok().and_then(|i| values.get(i)).copied())
        .collect()
}
