//! Compiled shorthand cuts evaluated on the event graph.

use lepsel_core::Scope;
use lepsel_frame::{Column, EventTable, Node};
use lepsel_select::{MacroExpander, compile, compile_cut};
use proptest::prelude::*;

fn passes(table: EventTable, token: &str) -> bool {
    let expr = MacroExpander::with_defaults().unwrap().expand(&compile_cut(token, ""));
    assert!(!expr.is_empty(), "{token} did not compile");
    Node::new(table).filter(&expr).unwrap().count().unwrap() == 1
}

fn one_event(name: &str, values: Vec<i32>) -> EventTable {
    EventTable::new().with_column(name, Column::jagged(vec![values])).unwrap()
}

fn keyword() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "Gold", "Silver", "Bronze", "Pos", "Neg", "OSSF", "OSOF", "SSSF", "SSOF", "Elec", "Muon", "Mu",
    ])
}

fn cmp() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["<", "<=", "=", ">=", ">"])
}

proptest! {
    #[test]
    fn all_ss_is_true_iff_one_sign(charges in prop::collection::vec(prop_oneof![Just(1), Just(-1)], 0..7)) {
        let expected = charges.windows(2).all(|w| w[0] == w[1]);
        prop_assert_eq!(passes(one_event("Charge_lep", charges), "AllSS"), expected);
    }

    #[test]
    fn gold_count_matches(quality in prop::collection::vec(0..3i32, 0..6), n in 0u32..4) {
        let golds = quality.iter().filter(|&&q| q == 0).count() as u32;
        prop_assert_eq!(passes(one_event("Quality_lep", quality), &format!(">={n}Gold")), golds >= n);
    }

    #[test]
    fn unscoped_flavor_uses_pdg_id(ids in prop::collection::vec(prop_oneof![Just(11i32), Just(-11), Just(13), Just(-13)], 0..6)) {
        let muons = ids.iter().filter(|id| id.abs() == 13).count();
        prop_assert_eq!(passes(one_event("PDGID_lep", ids.clone()), "=1Mu"), muons == 1);
        let same = ids.windows(2).all(|w| w[0].abs() == w[1].abs());
        prop_assert_eq!(passes(one_event("PDGID_lep", ids), "AllSF"), same);
    }

    #[test]
    fn suffix_and_explicit_scope_agree(op in cmp(), n in 0u32..5, kw in keyword(), side in prop_oneof![Just("a"), Just("b")]) {
        let bare = format!("{op}{n}{kw}");
        let suffixed = format!("{bare}_{side}");
        let via_suffix = compile_cut(&suffixed, "");
        prop_assert!(!via_suffix.is_empty());
        prop_assert_eq!(&via_suffix, &compile_cut(&bare, side));
        prop_assert_eq!(&via_suffix, &compile_cut(&suffixed, ""));
    }

    #[test]
    fn compilation_is_pure(token in "[<>=]{0,2}[0-9]{0,2}[A-Za-z]{0,6}(_[ab])?(\\|[a-zA-Z]{0,6}[<>!]?[0-9.,\\[\\]]{0,6}){0,2}") {
        let first = compile(&token, None);
        let second = compile(&token, None);
        prop_assert_eq!(&first, &second);
        if first.is_valid() {
            prop_assert!(first.diagnostics.iter().all(|d| d.level == lepsel_select::Level::Warning));
        } else {
            prop_assert_eq!(first.diagnostics.len(), 1);
        }
    }
}

#[test]
fn scope_reaches_every_name() {
    let c = compile(">=1SSOF|mass<40|DeltaR>0.2", Some(Scope::B));
    assert_eq!(c.expression(), "(SUM(Mass_B_SSOFPairs < 40 && DeltaR_B_SSOFPairs > 0.2) >= 1)");
    assert_eq!(c.scope, Scope::B);
}
