use takeoff_engine::Category;

use crate::model::{CategoryRollup, ComparisonRecord, OverallSummary, TierCounts};

/// Per-category tier counts, categories in first-appearance order.
pub fn compute_categories(records: &[ComparisonRecord]) -> Vec<CategoryRollup> {
    let mut rollups: Vec<CategoryRollup> = Vec::new();
    for r in records {
        match rollups.iter_mut().find(|c| c.category == r.category) {
            Some(rollup) => rollup.counts.add(r.tier),
            None => {
                let mut counts = TierCounts::default();
                counts.add(r.tier);
                rollups.push(CategoryRollup {
                    category: r.category,
                    counts,
                });
            }
        }
    }
    rollups
}

/// Overall coverage and match rates. A rate with a zero denominator is 0.
pub fn compute_summary(records: &[ComparisonRecord]) -> OverallSummary {
    let mut counts = TierCounts::default();
    for r in records {
        counts.add(r.tier);
    }

    let total = counts.total();
    let covered = counts.covered();

    OverallSummary {
        total,
        covered,
        counts,
        coverage_rate: ratio(covered, total),
        exact_rate: ratio(counts.exact, covered),
        within_close_rate: ratio(counts.exact + counts.close, covered),
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Categories whose every expected item is missing from the ledger.
pub fn uncovered_categories(rollups: &[CategoryRollup]) -> Vec<Category> {
    rollups
        .iter()
        .filter(|c| c.counts.covered() == 0)
        .map(|c| c.category)
        .collect()
}
