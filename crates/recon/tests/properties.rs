// Property-based tests for reconciliation invariants.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;
use salesgrid_recon::classify::classify;
use salesgrid_recon::config::{ClassifyRules, ReconRules};
use salesgrid_recon::model::{Cell, Dataset};
use salesgrid_recon::{reconcile, summarize, Registry};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Quantity cell: mostly numbers (negatives and zero included), sometimes
/// junk text or empty.
fn arb_quantity() -> impl Strategy<Value = Cell> {
    prop_oneof![
        4 => (-50i64..500).prop_map(|n| Cell::Number(n as f64)),
        1 => r"[0-9]{1,3}".prop_map(Cell::Text),
        1 => r"[a-z?]{1,4}".prop_map(Cell::Text),
        1 => Just(Cell::Empty),
    ]
}

fn arb_rows() -> impl Strategy<Value = Vec<(String, String, Cell)>> {
    prop::collection::vec(("D[1-3]", "S[1-3]", arb_quantity()), 0..25)
}

fn build(columns: [&str; 3], rows: &[(String, String, Cell)]) -> Dataset {
    Dataset::new(
        columns.iter().map(|s| s.to_string()).collect(),
        rows.iter()
            .map(|(d, s, q)| vec![Cell::from(d.as_str()), Cell::from(s.as_str()), q.clone()])
            .collect(),
    )
    .unwrap()
}

fn registry(target: &[(String, String, Cell)], actual: &[(String, String, Cell)]) -> Registry {
    let mut reg = Registry::new();
    reg.insert("t.xlsx::s", build(["經銷商代碼", "據點代碼", "目標"], target))
        .unwrap();
    reg.insert("a.xlsx::s", build(["經銷商代碼", "營業所代碼", "實績"], actual))
        .unwrap();
    reg
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn inputs_keep_every_row(target in arb_rows(), actual in arb_rows()) {
        let mut reg = registry(&target, &actual);
        let before_t = reg.get("t.xlsx::s").unwrap().clone();
        let before_a = reg.get("a.xlsx::s").unwrap().clone();

        let res = reconcile(&mut reg, "t.xlsx::s", "a.xlsx::s", &ReconRules::default()).unwrap();
        prop_assert_eq!(res.diagnostics.target_rows, target.len());
        prop_assert_eq!(res.diagnostics.actual_rows, actual.len());
        prop_assert_eq!(reg.get("t.xlsx::s").unwrap(), &before_t);
        prop_assert_eq!(reg.get("a.xlsx::s").unwrap(), &before_a);
    }

    #[test]
    fn met_flag_matches_sums(target in arb_rows(), actual in arb_rows()) {
        let mut reg = registry(&target, &actual);
        let res = reconcile(&mut reg, "t.xlsx::s", "a.xlsx::s", &ReconRules::default()).unwrap();
        for r in &res.records {
            prop_assert_eq!(r.met_target, r.actual_sales >= r.target_sales);
        }
        prop_assert_eq!(res.met_count, res.records.iter().filter(|r| r.met_target).count());
    }

    #[test]
    fn rates_stay_bounded(target in arb_rows(), actual in arb_rows()) {
        let mut reg = registry(&target, &actual);
        let rules = ReconRules::default();
        let res = reconcile(&mut reg, "t.xlsx::s", "a.xlsx::s", &rules).unwrap();
        prop_assert!((0.0..=100.0).contains(&res.met_rate));
        if res.record_count == 0 {
            prop_assert_eq!(res.met_rate, 0.0);
        }

        let s = summarize(&reg, &res.merged_key, None, &rules).unwrap();
        prop_assert!((0.0..=100.0).contains(&s.met_rate));
        prop_assert!(s.overall_rate.is_finite());
        prop_assert!(s.overall_rate >= 0.0);
        if s.total_target <= 0.0 {
            prop_assert_eq!(s.overall_rate, 0.0);
        }
        prop_assert_eq!(s.met_count, res.met_count);
        prop_assert_eq!(s.record_count, res.record_count);
    }

    #[test]
    fn reconcile_is_idempotent(target in arb_rows(), actual in arb_rows()) {
        let mut reg = registry(&target, &actual);
        let rules = ReconRules::default();
        let first = reconcile(&mut reg, "t.xlsx::s", "a.xlsx::s", &rules).unwrap();
        let stored = reg.get(&first.merged_key).unwrap().clone();
        let second = reconcile(&mut reg, "t.xlsx::s", "a.xlsx::s", &rules).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(reg.get(&second.merged_key).unwrap(), &stored);
    }

    #[test]
    fn classifier_is_deterministic(
        source in r"[a-z目標實績統計]{1,8}\.xlsx",
        sheets in prop::collection::vec(
            ("[a-z目標實績]{1,4}", prop::collection::vec("目標|實績|銷售|經銷商|[a-z]{1,3}", 0..5)),
            0..4,
        ),
    ) {
        let rules = ClassifyRules::default();
        let run = || classify(
            &source,
            sheets.iter().map(|(name, cols)| (name.as_str(), cols.as_slice())),
            &rules,
        );
        prop_assert_eq!(run(), run());
    }
}
