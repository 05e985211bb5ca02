use std::path::PathBuf;
use std::process::{Command, Output};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_lepsel"))
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn lines(out: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&out.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("bad JSON line {l:?}: {e}")))
        .collect()
}

#[test]
fn compile_prints_one_line_per_token() {
    let out = run(&["compile", ">=1OSSF_a", ">=1OSSF|mass<65", "AllSS"]);
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));

    let v = lines(&out);
    assert_eq!(v.len(), 3);

    assert_eq!(v[0]["token"], ">=1OSSF_a");
    assert_eq!(v[0]["scope"], "a");
    assert_eq!(v[0]["compiled"], "(A_NumOSSFPairs >= 1)");

    assert_eq!(v[1]["scope"], "");
    assert_eq!(v[1]["compiled"], "(SUM(Mass_All_OSSFPairs < 65) >= 1)");
    assert_eq!(v[1]["expanded"], "(ROOT::VecOps::Sum(Mass_All_OSSFPairs < 65) >= 1)");

    let expanded = v[2]["expanded"].as_str().unwrap();
    assert!(expanded.contains("ROOT::VecOps::Size(Charge_lep)"), "{expanded}");
    assert!(!expanded.contains("SUM("), "{expanded}");
}

#[test]
fn compile_side_overrides_suffix() {
    let out = run(&["compile", "--side", "b", ">=1OSSF_a", "=2Elec"]);
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));
    let v = lines(&out);
    assert_eq!(v[0]["compiled"], "(B_NumOSSFPairs >= 1)");
    assert_eq!(v[1]["compiled"], "(SUM(Flavor_lep_b == 0) == 2)");
}

#[test]
fn compile_invalid_token_yields_empty_expression() {
    let out = run(&["compile", "<1garbage"]);
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));
    let v = lines(&out);
    assert_eq!(v[0]["compiled"], "");
    assert_eq!(v[0]["expanded"], "");
    let diags = v[0]["diagnostics"].as_array().unwrap();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0]["component"], "cut");
    assert_eq!(diags[0]["level"], "error");
}

#[test]
fn compile_rejects_unknown_side() {
    let out = run(&["compile", "--side", "c", ">=1OSSF"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("--side"));
}
