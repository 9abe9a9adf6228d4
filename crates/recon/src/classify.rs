use takeoff_engine::{Ledger, Quantity};

use crate::config::TierBands;
use crate::model::{ComparisonRecord, ExpectedItem, Tier};

/// Tier for one expected/actual pair.
///
/// Priority: absent → NotImplemented; exact → Exact; zero expected with any
/// difference → Miss; then the relative bands, both inclusive.
pub fn classify(expected: Quantity, actual: Option<Quantity>, bands: &TierBands) -> Tier {
    let Some(actual) = actual else {
        return Tier::NotImplemented;
    };
    let diff = actual.value() - expected.value();
    if diff == 0.0 {
        return Tier::Exact;
    }
    if expected.is_zero() {
        return Tier::Miss;
    }
    let relative = diff.abs() / expected.value();
    if relative <= bands.close {
        Tier::Close
    } else if relative <= bands.moderate {
        Tier::Moderate
    } else {
        Tier::Miss
    }
}

/// `max(0, 1 - |diff| / expected) * 100`. Against a zero expectation only an
/// exact zero scores.
pub fn accuracy_pct(expected: Quantity, actual: Quantity) -> f64 {
    let diff = (actual.value() - expected.value()).abs();
    if expected.is_zero() {
        return if diff == 0.0 { 100.0 } else { 0.0 };
    }
    ((1.0 - diff / expected.value()).max(0.0)) * 100.0
}

/// Build the record for one expected item. Reads the ledger, never writes it.
pub fn compare_item(expected: &ExpectedItem, ledger: &Ledger, bands: &TierBands) -> ComparisonRecord {
    let entry = ledger.get(&expected.item);
    let actual = entry.map(|e| e.quantity);
    let tier = classify(expected.quantity, actual, bands);

    let (diff, relative, accuracy) = match actual {
        Some(actual) => {
            let diff = actual.value() - expected.quantity.value();
            let relative = if expected.quantity.is_zero() {
                None
            } else {
                Some(diff.abs() / expected.quantity.value())
            };
            (Some(diff), relative, Some(accuracy_pct(expected.quantity, actual)))
        }
        None => (None, None, None),
    };

    ComparisonRecord {
        item: expected.item.clone(),
        category: expected.category,
        expected: expected.quantity,
        actual,
        diff,
        relative,
        accuracy_pct: accuracy,
        provenance: entry.map(|e| e.provenance),
        tier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use takeoff_engine::{Category, ItemId, Provenance};

    fn q(v: f64) -> Quantity {
        Quantity::new(v).unwrap()
    }

    fn bands() -> TierBands {
        TierBands::default()
    }

    #[test]
    fn exact_match() {
        assert_eq!(classify(q(14.0), Some(q(14.0)), &bands()), Tier::Exact);
    }

    #[test]
    fn close_boundary_is_inclusive() {
        assert_eq!(classify(q(100.0), Some(q(105.0)), &bands()), Tier::Close);
        assert_eq!(classify(q(100.0), Some(q(95.0)), &bands()), Tier::Close);
    }

    #[test]
    fn just_past_close_is_moderate() {
        assert_eq!(classify(q(100.0), Some(q(106.0)), &bands()), Tier::Moderate);
    }

    #[test]
    fn moderate_boundary_is_inclusive() {
        assert_eq!(classify(q(100.0), Some(q(115.0)), &bands()), Tier::Moderate);
        assert_eq!(classify(q(100.0), Some(q(116.0)), &bands()), Tier::Miss);
    }

    #[test]
    fn zero_expected_uses_absolute_rule() {
        assert_eq!(classify(Quantity::ZERO, Some(Quantity::ZERO), &bands()), Tier::Exact);
        assert_eq!(classify(Quantity::ZERO, Some(q(1.0)), &bands()), Tier::Miss);
    }

    #[test]
    fn absent_is_not_implemented() {
        assert_eq!(classify(q(150.0), None, &bands()), Tier::NotImplemented);
        // a zero ledger value is a value, not an absence
        assert_eq!(classify(q(150.0), Some(Quantity::ZERO), &bands()), Tier::Miss);
    }

    #[test]
    fn custom_bands() {
        let strict = TierBands { close: 0.01, moderate: 0.02 };
        assert_eq!(classify(q(100.0), Some(q(102.0)), &strict), Tier::Moderate);
        assert_eq!(classify(q(100.0), Some(q(103.0)), &strict), Tier::Miss);
    }

    #[test]
    fn accuracy() {
        assert_eq!(accuracy_pct(q(100.0), q(100.0)), 100.0);
        assert!((accuracy_pct(q(600.0), q(684.0)) - 86.0).abs() < 1e-9);
        assert_eq!(accuracy_pct(q(24.0), q(80.0)), 0.0);
        assert_eq!(accuracy_pct(Quantity::ZERO, Quantity::ZERO), 100.0);
        assert_eq!(accuracy_pct(Quantity::ZERO, q(3.0)), 0.0);
    }

    #[test]
    fn record_carries_provenance_and_diff() {
        let mut ledger = Ledger::new();
        ledger.put(ItemId::from_static("power_packs"), q(14.0), Provenance::Derived, Category::Controls);
        let expected = ExpectedItem {
            item: ItemId::from_static("power_packs"),
            quantity: q(16.0),
            category: Category::Controls,
        };
        let record = compare_item(&expected, &ledger, &bands());
        assert_eq!(record.actual, Some(q(14.0)));
        assert_eq!(record.diff, Some(-2.0));
        assert_eq!(record.relative, Some(0.125));
        assert_eq!(record.provenance, Some(Provenance::Derived));
        assert_eq!(record.tier, Tier::Moderate);
    }

    #[test]
    fn missing_record_has_no_numbers() {
        let expected = ExpectedItem {
            item: ItemId::from_static("thhn_3_ft"),
            quantity: q(150.0),
            category: Category::Wire,
        };
        let record = compare_item(&expected, &Ledger::new(), &bands());
        assert_eq!(record.tier, Tier::NotImplemented);
        assert_eq!(record.actual, None);
        assert_eq!(record.diff, None);
        assert_eq!(record.accuracy_pct, None);
        assert_eq!(record.provenance, None);
    }
}
