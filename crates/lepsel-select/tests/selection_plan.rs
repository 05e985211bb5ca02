//! Full selection plan over the shared fixtures.

use std::path::PathBuf;

use approx::assert_relative_eq;
use lepsel_frame::{DType, EventTable, Node};
use lepsel_select::{Component, SelectionConfig, Validator, compile_cut, prepare_node, run_regions};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures").join(name)
}

fn setup() -> (lepsel_select::PreparedNode, SelectionConfig) {
    let table = EventTable::from_json_path(fixture_path("events.json")).unwrap();
    let config = SelectionConfig::from_path(fixture_path("selection.yaml")).unwrap();
    let expander = config.macro_expander().unwrap();
    let validator = Validator::new(config.validation);
    let prepared = prepare_node(&Node::new(table), &config, &expander, &validator).unwrap();
    (prepared, config)
}

#[test]
fn derived_variables_are_validated() {
    let (prepared, _) = setup();
    let verdicts: Vec<(&str, bool, Option<DType>)> =
        prepared.validations.iter().map(|v| (v.name.as_str(), v.accepted, v.dtype)).collect();
    assert_eq!(
        verdicts,
        vec![
            ("HT_lep", true, Some(DType::F64)),
            ("lead_pt", false, None),
            ("lead_pt_safe", true, Some(DType::F64)),
            ("met_over_ht", true, Some(DType::F64)),
        ]
    );
    assert_eq!(prepared.node.take::<f64>("lead_pt_safe").unwrap(), vec![45.0, 30.0, 60.0, 25.0, 0.0, 70.0]);
    let ratio = prepared.node.take::<f64>("met_over_ht").unwrap();
    assert!(ratio[4].is_infinite());
    assert_relative_eq!(ratio[0], 250.0 / 83.0);
}

#[test]
fn side_views_and_pairs_are_attached() {
    let (prepared, _) = setup();
    let node = &prepared.node;
    assert_eq!(node.take::<Vec<i32>>("Charge_lep_a").unwrap()[2], vec![1, 1]);
    assert_eq!(node.take::<Vec<f64>>("PT_lep_b").unwrap()[5], vec![31.0, 12.0]);
    assert_eq!(node.take::<u64>("NumOSSFPairs").unwrap(), vec![1, 0, 1, 0, 0, 2]);
    assert_eq!(node.take::<u64>("B_NumOSOFPairs").unwrap(), vec![0, 0, 0, 0, 0, 1]);
    let masses = node.take::<Vec<f64>>("Mass_All_OSSFPairs").unwrap();
    assert_relative_eq!(masses[0][0], 84.14, epsilon = 0.01);
    assert_relative_eq!(masses[2][0], 33.01, epsilon = 0.02);
    assert_eq!(masses[5].len(), 2);
}

#[test]
fn region_yields() {
    let (prepared, config) = setup();
    let expander = config.macro_expander().unwrap();
    let report = run_regions(&prepared.node, &config, &expander, &Validator::new(config.validation));

    let lowmass = report.region("SR_OSSF_lowmass").unwrap();
    let flow = lowmass.cutflow.as_ref().unwrap();
    assert_eq!(flow.total.events, 6);
    assert_relative_eq!(flow.total.sumw, 70.0, epsilon = 1e-9);
    assert_eq!(flow.steps.iter().map(|s| s.events).collect::<Vec<_>>(), vec![1, 1]);
    assert_relative_eq!(lowmass.region_yield.unwrap().sumw, 20.0, epsilon = 1e-9);

    let zveto = report.region("SR_Zveto").unwrap().region_yield.unwrap();
    assert_eq!(zveto.events, 2);
    assert_relative_eq!(zveto.sumw, 32.0, epsilon = 1e-9);
    assert_relative_eq!(zveto.err, 544.0f64.sqrt(), epsilon = 1e-9);

    let ss = report.region("CR_SS").unwrap();
    assert_eq!(ss.filters.len(), 2);
    assert_eq!(ss.region_yield.unwrap().events, 1);
    assert!(ss.diagnostics.iter().any(|d| d.component == Component::Plan && d.subject == "jets"));

    let side = report.region("SideA_1L").unwrap().region_yield.unwrap();
    assert_eq!(side.events, 2);
    assert_relative_eq!(side.sumw, 22.0, epsilon = 1e-9);

    assert!(report.region("broken").unwrap().is_dropped());
    assert_eq!(report.regions.iter().filter(|r| r.is_dropped()).count(), 1);
}

#[test]
fn extreme_thresholds_filter_as_floats() {
    let (prepared, config) = setup();
    let expander = config.macro_expander().unwrap();
    let expr = expander.expand(&compile_cut(">=1OSSF|mass<1e20|mass>1e-7", ""));
    assert!(expr.contains("1e20") && expr.contains("1e-7"), "{expr}");
    assert_eq!(prepared.node.filter(&expr).unwrap().count().unwrap(), 3);
}
