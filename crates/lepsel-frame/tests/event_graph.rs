//! End-to-end checks of the event graph over a JSON dump.

use lepsel_frame::{Column, DType, EventTable, FrameError, Node, ScalarType};
use proptest::prelude::*;

const DUMP: &str = r#"{
  "columns": [
    {"name": "weight", "dtype": "f64", "values": [0.5, 1.0, 2.0, 1.5]},
    {"name": "MET", "dtype": "f32", "values": [12.0, 85.5, 140.0, "nan"]},
    {"name": "Charge_lep", "dtype": "seq<i32>", "values": [[1, -1], [1, 1, -1], [], [-1]]},
    {"name": "PT_lep", "dtype": "seq<f64>", "values": [[41.0, 22.5], [60.0, 35.0, 11.0], [], [18.0]]}
  ]
}"#;

fn dump_node() -> Node {
    Node::new(EventTable::from_json_str(DUMP).unwrap())
}

#[test]
fn json_types_drive_expression_types() {
    let node = dump_node()
        .define("met2", "MET * 2")
        .unwrap()
        .define("npos", "ROOT::VecOps::Sum(Charge_lep == 1)")
        .unwrap()
        .define("ht", "Sum(PT_lep)")
        .unwrap();
    assert_eq!(node.dtype("met2"), Some(DType::Scalar(ScalarType::F32)));
    assert_eq!(node.dtype("npos"), Some(DType::Scalar(ScalarType::I32)));
    assert_eq!(node.dtype("ht"), Some(DType::F64));
    assert_eq!(node.take::<i32>("npos").unwrap(), vec![1, 2, 0, 0]);
}

#[test]
fn non_finite_values_fail_comparisons() {
    let node = dump_node().filter("MET > 50").unwrap();
    assert_eq!(node.count().unwrap(), 2);
    assert_eq!(node.sum("weight").unwrap(), 3.0);
}

#[test]
fn bounded_take_reads_prefix_only() {
    let node = dump_node().range(0, 2).define("first_pt", "PT_lep[0]").unwrap();
    // Row 2 has no leptons; the range stops before reaching it.
    assert_eq!(node.take::<f64>("first_pt").unwrap(), vec![41.0, 60.0]);
    let unbounded = dump_node().define("first_pt", "PT_lep[0]").unwrap();
    assert!(matches!(unbounded.take::<f64>("first_pt"), Err(FrameError::Evaluation { row: 2, .. })));
}

#[test]
fn column_listing() {
    let node = dump_node().define("x", "1").unwrap();
    assert_eq!(node.column_names(), vec!["weight", "MET", "Charge_lep", "PT_lep", "x"]);
    assert!(node.has_column("x"));
    assert_eq!(node.dtype("nope"), None);
}

proptest! {
    #[test]
    fn mask_sum_counts_matches(values in proptest::collection::vec(-50.0f64..50.0, 0..12), cut in -50.0f64..50.0) {
        let table = EventTable::new()
            .with_column("v", Column::jagged(vec![values.clone()]))
            .unwrap();
        let node = Node::new(table)
            .define("n", &format!("Sum(v > {cut:?})"))
            .unwrap()
            .define("m", &format!("Size(v[v > {cut:?}])"))
            .unwrap();
        let expected = values.iter().filter(|&&x| x > cut).count();
        prop_assert_eq!(node.take::<i32>("n").unwrap(), vec![expected as i32]);
        prop_assert_eq!(node.take::<u64>("m").unwrap(), vec![expected as u64]);
    }
}
