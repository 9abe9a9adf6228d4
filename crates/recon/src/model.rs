use std::collections::HashSet;

use serde::Serialize;
use takeoff_engine::{Category, ItemId, Provenance, Quantity};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Expected list
// ---------------------------------------------------------------------------

/// One line of ground truth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpectedItem {
    pub item: ItemId,
    pub quantity: Quantity,
    pub category: Category,
}

/// Ground truth in display order. Each item appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExpectedList {
    items: Vec<ExpectedItem>,
}

impl ExpectedList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: ExpectedItem) -> Result<(), ReconError> {
        if self.contains(&item.item) {
            return Err(ReconError::DuplicateExpectedItem {
                item: item.item.to_string(),
            });
        }
        self.items.push(item);
        Ok(())
    }

    pub fn contains(&self, item: &ItemId) -> bool {
        self.items.iter().any(|e| &e.item == item)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExpectedItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn item_set(&self) -> HashSet<&ItemId> {
        self.items.iter().map(|e| &e.item).collect()
    }
}

impl TryFrom<Vec<ExpectedItem>> for ExpectedList {
    type Error = ReconError;

    fn try_from(items: Vec<ExpectedItem>) -> Result<Self, Self::Error> {
        let mut list = ExpectedList::new();
        for item in items {
            list.push(item)?;
        }
        Ok(list)
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// How close the system came to the expected quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Exact,
    Close,
    Moderate,
    Miss,
    /// No ledger value at all. Counts against coverage, never as a Miss.
    NotImplemented,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Exact,
        Tier::Close,
        Tier::Moderate,
        Tier::Miss,
        Tier::NotImplemented,
    ];

    pub fn is_covered(self) -> bool {
        self != Tier::NotImplemented
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Close => write!(f, "close"),
            Self::Moderate => write!(f, "moderate"),
            Self::Miss => write!(f, "miss"),
            Self::NotImplemented => write!(f, "not_implemented"),
        }
    }
}

/// Outcome for one expected item. Built once per comparison, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRecord {
    pub item: ItemId,
    pub category: Category,
    pub expected: Quantity,
    pub actual: Option<Quantity>,
    /// `actual - expected`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<f64>,
    /// `|diff| / expected`; absent when expected is zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
    pub tier: Tier,
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub exact: usize,
    pub close: usize,
    pub moderate: usize,
    pub miss: usize,
    pub not_implemented: usize,
}

impl TierCounts {
    pub fn add(&mut self, tier: Tier) {
        match tier {
            Tier::Exact => self.exact += 1,
            Tier::Close => self.close += 1,
            Tier::Moderate => self.moderate += 1,
            Tier::Miss => self.miss += 1,
            Tier::NotImplemented => self.not_implemented += 1,
        }
    }

    pub fn get(&self, tier: Tier) -> usize {
        match tier {
            Tier::Exact => self.exact,
            Tier::Close => self.close,
            Tier::Moderate => self.moderate,
            Tier::Miss => self.miss,
            Tier::NotImplemented => self.not_implemented,
        }
    }

    pub fn total(&self) -> usize {
        Tier::ALL.iter().map(|t| self.get(*t)).sum()
    }

    pub fn covered(&self) -> usize {
        self.total() - self.not_implemented
    }
}

/// Tier counts for one category, in first-appearance order of the expected list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRollup {
    pub category: Category,
    pub counts: TierCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallSummary {
    pub total: usize,
    pub covered: usize,
    pub counts: TierCounts,
    /// covered / total
    pub coverage_rate: f64,
    /// exact / covered
    pub exact_rate: f64,
    /// (exact + close) / covered
    pub within_close_rate: f64,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub config_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_set: Option<String>,
    pub engine_version: String,
    pub run_at: String,
}

/// Everything a renderer needs. The core never formats it.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub meta: ReportMeta,
    /// One per expected item, in expected-list order.
    pub records: Vec<ComparisonRecord>,
    pub categories: Vec<CategoryRollup>,
    pub overall: OverallSummary,
    /// Non-subtotal ledger items the expected list never mentions. Sorted.
    pub unscored: Vec<ItemId>,
}

impl Report {
    pub fn record(&self, item: &ItemId) -> Option<&ComparisonRecord> {
        self.records.iter().find(|r| &r.item == item)
    }

    pub fn category(&self, category: Category) -> Option<&TierCounts> {
        self.categories
            .iter()
            .find(|c| c.category == category)
            .map(|c| &c.counts)
    }

    /// Format: `[compare] items=119 covered=112 exact=80 close=9 moderate=6 miss=17 not_implemented=7`
    pub fn log_line(&self) -> String {
        let c = &self.overall.counts;
        format!(
            "[compare] items={} covered={} exact={} close={} moderate={} miss={} not_implemented={}",
            self.overall.total,
            self.overall.covered,
            c.exact,
            c.close,
            c.moderate,
            c.miss,
            c.not_implemented,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected(item: &'static str, qty: f64) -> ExpectedItem {
        ExpectedItem {
            item: ItemId::from_static(item),
            quantity: Quantity::new(qty).unwrap(),
            category: Category::Controls,
        }
    }

    #[test]
    fn expected_list_keeps_order() {
        let list = ExpectedList::try_from(vec![
            expected("power_packs", 14.0),
            expected("ceiling_sensors", 16.0),
            expected("air_handlers", 2.0),
        ])
        .unwrap();
        let items: Vec<&str> = list.iter().map(|e| e.item.as_str()).collect();
        assert_eq!(items, ["power_packs", "ceiling_sensors", "air_handlers"]);
    }

    #[test]
    fn expected_list_rejects_duplicates() {
        let err = ExpectedList::try_from(vec![
            expected("power_packs", 14.0),
            expected("power_packs", 15.0),
        ])
        .unwrap_err();
        assert!(matches!(err, ReconError::DuplicateExpectedItem { item } if item == "power_packs"));
    }

    #[test]
    fn tier_counts() {
        let mut counts = TierCounts::default();
        for tier in [Tier::Exact, Tier::Exact, Tier::Close, Tier::Miss, Tier::NotImplemented] {
            counts.add(tier);
        }
        assert_eq!(counts.total(), 5);
        assert_eq!(counts.covered(), 4);
        assert_eq!(counts.get(Tier::Exact), 2);
    }

    #[test]
    fn tier_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Tier::NotImplemented).unwrap(), "\"not_implemented\"");
        assert_eq!(Tier::NotImplemented.to_string(), "not_implemented");
    }
}
