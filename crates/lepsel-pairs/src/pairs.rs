//! Two-lepton combinations classified by sign and flavor agreement.

use lepsel_core::PairCategory;

/// Index pair `(i, j)` with `i < j`.
pub type Pair = (usize, usize);

/// The four category lists of one event and scope.
///
/// Together they partition all `C(n, 2)` combinations of the `n` leptons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairLists {
    lists: [Vec<Pair>; 4],
}

impl PairLists {
    /// Pairs of one category.
    pub fn get(&self, category: PairCategory) -> &[Pair] {
        &self.lists[category.index()]
    }

    /// Take ownership of one category's pairs.
    pub fn into_category(mut self, category: PairCategory) -> Vec<Pair> {
        std::mem::take(&mut self.lists[category.index()])
    }

    /// Total number of pairs over all categories.
    pub fn total(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }

    /// Iterate `(category, pairs)` in [`PairCategory::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (PairCategory, &[Pair])> {
        PairCategory::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

/// Number of leptons both arrays describe.
fn lepton_count(flavor: &[i32], charge: &[i32]) -> usize {
    flavor.len().min(charge.len())
}

/// Classify every pair of the event in one pass.
///
/// `flavor` and `charge` are parallel per-lepton arrays; with fewer than two
/// leptons all four lists are empty.
pub fn generate(flavor: &[i32], charge: &[i32]) -> PairLists {
    let n = lepton_count(flavor, charge);
    let mut out = PairLists::default();
    for i in 0..n {
        for j in (i + 1)..n {
            let category = PairCategory::classify(flavor[i] == flavor[j], charge[i] == charge[j]);
            out.lists[category.index()].push((i, j));
        }
    }
    out
}

/// Pairs of a single category, without allocating the other three lists.
pub fn category_pairs(category: PairCategory, flavor: &[i32], charge: &[i32]) -> Vec<Pair> {
    let n = lepton_count(flavor, charge);
    let mut out = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            if PairCategory::classify(flavor[i] == flavor[j], charge[i] == charge[j]) == category {
                out.push((i, j));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_lepton_example() {
        let lists = generate(&[0, 0, 1], &[1, -1, 1]);
        assert_eq!(lists.get(PairCategory::Ossf), [(0, 1)]);
        assert_eq!(lists.get(PairCategory::Ssof), [(0, 2)]);
        assert_eq!(lists.get(PairCategory::Osof), [(1, 2)]);
        assert!(lists.get(PairCategory::Sssf).is_empty());
        assert_eq!(lists.total(), 3);
    }

    #[test]
    fn fewer_than_two_leptons() {
        assert_eq!(generate(&[], &[]), PairLists::default());
        assert_eq!(generate(&[1], &[-1]).total(), 0);
    }

    #[test]
    fn single_category_agrees_with_full_pass() {
        let flavor = [0, 1, 1, 0, 1];
        let charge = [1, 1, -1, -1, 1];
        let all = generate(&flavor, &charge);
        for (category, pairs) in all.iter() {
            assert_eq!(category_pairs(category, &flavor, &charge), pairs);
        }
        assert_eq!(all.clone().into_category(PairCategory::Sssf), all.get(PairCategory::Sssf));
    }
}
