use serde::Serialize;
use takeoff_engine::{Category, EvaluationReport, Evaluator, Ledger, RuleRegistry};

use crate::classify::compare_item;
use crate::config::CompareConfig;
use crate::evidence::{compute_categories, compute_summary};
use crate::model::{ComparisonRecord, ExpectedList, Report, ReportMeta};

/// Score a completed ledger against ground truth. Never mutates the ledger
/// and always yields a report.
pub fn run(config: &CompareConfig, expected: &ExpectedList, ledger: &Ledger) -> Report {
    build_report(config, expected, ledger, None)
}

fn build_report(
    config: &CompareConfig,
    expected: &ExpectedList,
    ledger: &Ledger,
    rule_set: Option<&str>,
) -> Report {
    let records: Vec<ComparisonRecord> = expected
        .iter()
        .map(|item| compare_item(item, ledger, &config.bands))
        .collect();

    let categories = compute_categories(&records);
    let overall = compute_summary(&records);

    let listed = expected.item_set();
    let unscored = ledger
        .iter()
        .filter(|(item, entry)| entry.category != Category::Subtotal && !listed.contains(item))
        .map(|(item, _)| item.clone())
        .collect();

    let report = Report {
        meta: ReportMeta {
            config_name: config.name.clone(),
            rule_set: rule_set.map(str::to_string),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        records,
        categories,
        overall,
        unscored,
    };

    log::info!("{}", report.log_line());
    report
}

/// Result of evaluate-then-compare.
#[derive(Debug, Clone, Serialize)]
pub struct TakeoffOutcome {
    pub ledger: Ledger,
    pub evaluation: EvaluationReport,
    pub report: Report,
}

/// Expand `seed` through `registry`, then score the result.
pub fn run_takeoff(
    registry: &RuleRegistry,
    seed: &Ledger,
    expected: &ExpectedList,
    config: &CompareConfig,
) -> TakeoffOutcome {
    let (ledger, evaluation) = Evaluator::new(registry).evaluate_seed(seed);
    let report = build_report(config, expected, &ledger, Some(registry.name()));
    TakeoffOutcome {
        ledger,
        evaluation,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExpectedItem, Tier};
    use takeoff_engine::{ItemId, Provenance, Quantity};

    fn id(s: &'static str) -> ItemId {
        ItemId::from_static(s)
    }

    fn q(v: f64) -> Quantity {
        Quantity::new(v).unwrap()
    }

    fn expected(items: &[(&'static str, f64, Category)]) -> ExpectedList {
        let items: Vec<ExpectedItem> = items
            .iter()
            .map(|(item, qty, category)| ExpectedItem {
                item: id(item),
                quantity: q(*qty),
                category: *category,
            })
            .collect();
        ExpectedList::try_from(items).unwrap()
    }

    #[test]
    fn records_follow_expected_order() {
        let mut ledger = Ledger::new();
        ledger.put(id("jhooks"), q(230.0), Provenance::Derived, Category::Technology);
        ledger.put(id("cat6_cable_ft"), q(920.0), Provenance::Derived, Category::Technology);

        let list = expected(&[
            ("jhooks", 230.0, Category::Technology),
            ("cat6_cable_ft", 1000.0, Category::Technology),
            ("thhn_3_ft", 150.0, Category::Wire),
        ]);
        let report = run(&CompareConfig::default(), &list, &ledger);

        let order: Vec<&str> = report.records.iter().map(|r| r.item.as_str()).collect();
        assert_eq!(order, ["jhooks", "cat6_cable_ft", "thhn_3_ft"]);
        assert_eq!(report.records[0].tier, Tier::Exact);
        assert_eq!(report.records[1].tier, Tier::Moderate);
        assert_eq!(report.records[2].tier, Tier::NotImplemented);
        assert_eq!(report.overall.counts.miss, 0);
        assert_eq!(report.overall.covered, 2);
        assert!(report.meta.rule_set.is_none());
    }

    #[test]
    fn unscored_skips_subtotals_and_listed_items() {
        let mut ledger = Ledger::new();
        ledger.put(id("total_devices"), q(171.0), Provenance::Derived, Category::Subtotal);
        ledger.put(id("putty_pads"), q(4.0), Provenance::Derived, Category::FireStopping);
        ledger.put(id("jhooks"), q(230.0), Provenance::Derived, Category::Technology);
        ledger.put(id("fixture_whips"), q(7.0), Provenance::Derived, Category::Accessories);

        let list = expected(&[("jhooks", 230.0, Category::Technology)]);
        let report = run(&CompareConfig::default(), &list, &ledger);
        assert_eq!(report.unscored, vec![id("fixture_whips"), id("putty_pads")]);
    }

    #[test]
    fn comparison_leaves_ledger_untouched() {
        let mut ledger = Ledger::new();
        ledger.put(id("jhooks"), q(230.0), Provenance::Derived, Category::Technology);
        let before = ledger.clone();
        let list = expected(&[("power_packs", 14.0, Category::Controls)]);
        let _ = run(&CompareConfig::default(), &list, &ledger);
        assert_eq!(ledger, before);
    }

    #[test]
    fn stale_derived_seed_is_not_scored() {
        let registry = takeoff_engine::RuleSet::standard().unwrap().build().unwrap();
        let mut seed = Ledger::new();
        seed.put(id("cat6_cable_ft"), q(4000.0), Provenance::Derived, Category::Technology);

        let list = expected(&[
            ("cat6_cable_ft", 920.0, Category::Technology),
            ("jhooks", 230.0, Category::Technology),
        ]);
        let outcome = run_takeoff(&registry, &seed, &list, &CompareConfig::default());

        assert_eq!(outcome.report.records[0].tier, Tier::NotImplemented);
        assert_eq!(outcome.report.records[1].tier, Tier::NotImplemented);
        assert!(!outcome.ledger.contains(&id("jhooks")));
        // seed is left as given
        assert_eq!(seed.quantity(&id("cat6_cable_ft")), Some(q(4000.0)));
    }

    #[test]
    fn log_line_format() {
        let list = expected(&[("power_packs", 14.0, Category::Controls)]);
        let report = run(&CompareConfig::default(), &list, &Ledger::new());
        assert_eq!(
            report.log_line(),
            "[compare] items=1 covered=0 exact=0 close=0 moderate=0 miss=0 not_implemented=1"
        );
    }
}
