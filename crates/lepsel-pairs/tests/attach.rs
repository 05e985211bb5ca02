//! Pair quantities attached to an event graph.

use approx::assert_relative_eq;
use lepsel_core::Scope;
use lepsel_frame::{Column, DType, EventTable, Node};
use lepsel_pairs::{attach_all, skipped_sides};

/// Three events: an e+e- pair plus a muon, a single lepton, and a
/// same-sign muon pair. Side A takes the first lepton(s), side B the rest.
fn table(with_sides: bool) -> EventTable {
    let mut t = EventTable::new()
        .with_column("PT_lep", Column::jagged(vec![vec![45.0, 40.0, 20.0], vec![30.0], vec![25.0, 15.0]]))
        .unwrap()
        .with_column("Eta_lep", Column::jagged(vec![vec![0.0, 0.0, 1.0], vec![0.5], vec![0.3, -0.3]]))
        .unwrap()
        .with_column(
            "Phi_lep",
            Column::jagged(vec![vec![0.0, std::f64::consts::PI, 1.0], vec![0.0], vec![0.0, 0.0]]),
        )
        .unwrap()
        .with_column("M_lep", Column::jagged(vec![vec![0.0, 0.0, 0.0], vec![0.0], vec![0.0, 0.0]]))
        .unwrap()
        .with_column("Charge_lep", Column::jagged(vec![vec![1, -1, 1], vec![-1], vec![-1, -1]]))
        .unwrap()
        .with_column("PDGID_lep", Column::jagged(vec![vec![-11, 11, -13], vec![13], vec![13, 13]]))
        .unwrap()
        .with_column("Quality_lep", Column::jagged(vec![vec![0, 1, 0], vec![2], vec![0, 0]]))
        .unwrap();
    if with_sides {
        t = t
            .with_column("Index_lep_a", Column::jagged(vec![vec![0, 1], vec![0], vec![0]]))
            .unwrap()
            .with_column("Index_lep_b", Column::jagged(vec![vec![2], vec![], vec![1, 7]]))
            .unwrap();
    }
    t
}

#[test]
fn full_collection_pairs() {
    let node = attach_all(&Node::new(table(true))).unwrap();
    assert_eq!(node.take::<Vec<i32>>("Flavor_lep").unwrap()[0], vec![0, 0, 1]);
    assert_eq!(node.take::<u64>("NumOSSFPairs").unwrap(), vec![1, 0, 0]);
    assert_eq!(node.take::<u64>("NumSSSFPairs").unwrap(), vec![0, 0, 1]);
    assert_eq!(node.take::<Vec<(usize, usize)>>("OSOFPairs").unwrap()[0], vec![(1, 2)]);

    let mass = node.take::<Vec<f64>>("Mass_All_OSSFPairs").unwrap();
    assert_eq!(mass[0].len(), 1);
    // Back-to-back massless leptons: m = 2 sqrt(pt1 pt2).
    assert_relative_eq!(mass[0][0], 2.0 * (45.0f64 * 40.0).sqrt(), epsilon = 1e-9);
    assert!(mass[1].is_empty());

    let dr = node.take::<Vec<f64>>("DeltaR_All_SSSFPairs").unwrap();
    assert_relative_eq!(dr[2][0], 0.6, epsilon = 1e-12);
}

#[test]
fn side_views_gather_in_order() {
    let node = attach_all(&Node::new(table(true))).unwrap();
    assert_eq!(
        node.take::<Vec<f64>>("PT_lep_a").unwrap(),
        vec![vec![45.0, 40.0], vec![30.0], vec![25.0]]
    );
    // Index 7 does not exist in the third event and is skipped.
    assert_eq!(node.take::<Vec<i32>>("Charge_lep_b").unwrap(), vec![vec![1], vec![], vec![-1]]);
    assert_eq!(node.take::<u64>("A_NumOSSFPairs").unwrap(), vec![1, 0, 0]);
    assert_eq!(node.take::<u64>("B_NumOSSFPairs").unwrap(), vec![0, 0, 0]);
    assert_eq!(node.dtype("Mass_B_SSOFPairs"), Some(DType::SEQ_F64));
}

#[test]
fn missing_index_lists_skip_sides() {
    let node = attach_all(&Node::new(table(false))).unwrap();
    assert!(node.has_column("NumOSSFPairs"));
    assert!(!node.has_column("A_NumOSSFPairs"));
    assert!(!node.has_column("PT_lep_b"));
    assert_eq!(skipped_sides(&Node::new(table(false))), vec![Scope::A, Scope::B]);
    assert!(skipped_sides(&Node::new(table(true))).is_empty());
}

#[test]
fn attaching_twice_is_harmless() {
    let once = attach_all(&Node::new(table(true))).unwrap();
    let twice = attach_all(&once).unwrap();
    assert_eq!(once.column_names(), twice.column_names());
}
