//! Property tests for pair generation and pair kinematics.

use std::collections::HashSet;
use std::f64::consts::TAU;

use lepsel_core::PairCategory;
use lepsel_pairs::{LeptonKinematics, delta_r, generate, invariant_mass};
use proptest::prelude::*;

fn leptons(max: usize) -> impl Strategy<Value = (Vec<i32>, Vec<i32>)> {
    (0..=max).prop_flat_map(|n| {
        (
            proptest::collection::vec(0i32..=1, n),
            proptest::collection::vec(prop_oneof![Just(-1i32), Just(1i32)], n),
        )
    })
}

proptest! {
    #[test]
    fn categories_partition_all_combinations((flavor, charge) in leptons(8)) {
        let n = flavor.len();
        let lists = generate(&flavor, &charge);
        let mut seen = HashSet::new();
        for (category, pairs) in lists.iter() {
            for &(i, j) in pairs {
                prop_assert!(i < j && j < n);
                prop_assert!(seen.insert((i, j)), "pair {:?} listed twice", (i, j));
                let expected = PairCategory::classify(flavor[i] == flavor[j], charge[i] == charge[j]);
                prop_assert_eq!(category, expected);
            }
        }
        prop_assert_eq!(seen.len(), n * n.saturating_sub(1) / 2);
    }

    #[test]
    fn mass_is_non_negative(
        pt in proptest::collection::vec(0.0f64..500.0, 2),
        eta in proptest::collection::vec(-4.0f64..4.0, 2),
        phi in proptest::collection::vec(-4.0f64..4.0, 2),
        m in proptest::collection::vec(0.0f64..2.0, 2),
    ) {
        let k = LeptonKinematics { pt: &pt, eta: &eta, phi: &phi, mass: &m };
        let mass = invariant_mass(&k, 0, 1);
        prop_assert!(mass >= 0.0);
        prop_assert!(mass.is_finite());
    }

    #[test]
    fn delta_r_is_periodic_in_phi(
        eta in proptest::collection::vec(-4.0f64..4.0, 2),
        phi in proptest::collection::vec(-3.1f64..3.1, 2),
        which in 0usize..2,
    ) {
        let dr = delta_r(&eta, &phi, 0, 1);
        let mut shifted = phi.clone();
        shifted[which] += TAU;
        let dr_shifted = delta_r(&eta, &shifted, 0, 1);
        prop_assert!(dr >= 0.0);
        prop_assert!((dr - dr_shifted).abs() < 1e-9, "{} vs {}", dr, dr_shifted);
    }
}
