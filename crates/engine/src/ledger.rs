//! Quantity ledger keyed by item.
//!
//! # Precedence
//!
//! ```text
//! Observed / Reference  >  Derived
//! ```
//!
//! A direct value (counted, or supplied by the user) always outranks a value a
//! rule computed. Writing a direct value over a derived one is allowed; writing
//! a derived value over a direct one is a no-op. Two direct writes: the later
//! one wins, which is how a schedule-table count replaces a floor-plan count
//! when the schedule source is merged last.
//!
//! Direct entries are never removed; derived ones are dropped only when an
//! evaluation pass recomputes them. Iteration and serialization are ordered by
//! [`ItemId`], so equal ledgers serialize byte-identically.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TakeoffError;
use crate::item::{Category, ItemId};
use crate::quantity::Quantity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Came from counting or extraction.
    Observed,
    /// User-supplied known value (e.g. a prior bid's conduit footage).
    Reference,
    /// Computed by a derivation rule.
    Derived,
}

impl Provenance {
    /// Observed and Reference are direct knowledge.
    pub fn is_direct(self) -> bool {
        !matches!(self, Self::Derived)
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim() {
            "observed" => Some(Self::Observed),
            "reference" => Some(Self::Reference),
            "derived" => Some(Self::Derived),
            _ => None,
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Observed => write!(f, "observed"),
            Self::Reference => write!(f, "reference"),
            Self::Derived => write!(f, "derived"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub quantity: Quantity,
    pub provenance: Provenance,
    pub category: Category,
}

/// One ingest tuple from an extraction collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub item: ItemId,
    pub quantity: Quantity,
    pub provenance: Provenance,
    pub category: Category,
}

impl Observation {
    /// Validating constructor for raw collaborator output.
    pub fn new(
        item: &str,
        quantity: f64,
        provenance: Provenance,
        category: Category,
    ) -> Result<Self, TakeoffError> {
        let item = ItemId::new(item)?;
        let quantity = Quantity::new(quantity).ok_or_else(|| TakeoffError::InvalidQuantity {
            item: item.to_string(),
            value: quantity,
        })?;
        Ok(Self {
            item,
            quantity,
            provenance,
            category,
        })
    }
}

/// What a `put` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Inserted,
    Replaced,
    /// A derived value tried to displace a direct one.
    Rejected,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: BTreeMap<ItemId, LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite, honouring direct-over-derived precedence.
    pub fn put(
        &mut self,
        item: ItemId,
        quantity: Quantity,
        provenance: Provenance,
        category: Category,
    ) -> PutOutcome {
        let entry = LedgerEntry {
            quantity,
            provenance,
            category,
        };
        match self.entries.entry(item) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
                PutOutcome::Inserted
            }
            Entry::Occupied(slot) if slot.get().provenance.is_direct() && !provenance.is_direct() => {
                PutOutcome::Rejected
            }
            Entry::Occupied(mut slot) => {
                slot.insert(entry);
                PutOutcome::Replaced
            }
        }
    }

    /// Absent means unknown, which is not the same as zero.
    pub fn get(&self, item: &ItemId) -> Option<&LedgerEntry> {
        self.entries.get(item)
    }

    pub fn quantity(&self, item: &ItemId) -> Option<Quantity> {
        self.entries.get(item).map(|e| e.quantity)
    }

    pub fn contains(&self, item: &ItemId) -> bool {
        self.entries.contains_key(item)
    }

    /// True when the item holds an Observed or Reference value.
    pub fn has_direct(&self, item: &ItemId) -> bool {
        self.entries
            .get(item)
            .map_or(false, |e| e.provenance.is_direct())
    }

    /// Fold `other` into `self` entry by entry with `put` precedence.
    pub fn merge(&mut self, other: &Ledger) {
        for (item, entry) in &other.entries {
            self.put(item.clone(), entry.quantity, entry.provenance, entry.category);
        }
    }

    pub fn ingest<I>(&mut self, observations: I)
    where
        I: IntoIterator<Item = Observation>,
    {
        for obs in observations {
            self.put(obs.item, obs.quantity, obs.provenance, obs.category);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &LedgerEntry)> {
        self.entries.iter()
    }

    /// Drop every derived entry. Returns how many were removed.
    pub fn retain_direct(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.provenance.is_direct());
        before - self.entries.len()
    }

    /// Copy of the entries a replay would start from.
    pub fn direct_entries(&self) -> Ledger {
        Ledger {
            entries: self
                .entries
                .iter()
                .filter(|(_, e)| e.provenance.is_direct())
                .map(|(k, e)| (k.clone(), *e))
                .collect(),
        }
    }
}

impl FromIterator<Observation> for Ledger {
    fn from_iter<T: IntoIterator<Item = Observation>>(iter: T) -> Self {
        let mut ledger = Ledger::new();
        ledger.ingest(iter);
        ledger
    }
}

// ---------------------------------------------------------------------------
// Tally
// ---------------------------------------------------------------------------

/// Additive accumulator for one extraction source spread over several sheets.
///
/// Counting the same symbol on E200 and E201 adds up; it is not a conflict.
/// Precedence only applies once tallies from different sources are merged as
/// ledgers.
#[derive(Debug, Clone)]
pub struct Tally {
    provenance: Provenance,
    totals: BTreeMap<ItemId, (f64, Category)>,
}

impl Tally {
    pub fn new(provenance: Provenance) -> Self {
        Self {
            provenance,
            totals: BTreeMap::new(),
        }
    }

    /// Add a per-sheet count. The first category seen for an item sticks.
    pub fn add(&mut self, item: ItemId, quantity: Quantity, category: Category) {
        let slot = self.totals.entry(item).or_insert((0.0, category));
        slot.0 += quantity.value();
    }

    /// Fails with `InvalidQuantity` if a sum overflowed.
    pub fn into_ledger(self) -> Result<Ledger, TakeoffError> {
        let mut ledger = Ledger::new();
        for (item, (total, category)) in self.totals {
            let quantity = Quantity::new(total).ok_or_else(|| TakeoffError::InvalidQuantity {
                item: item.to_string(),
                value: total,
            })?;
            ledger.put(item, quantity, self.provenance, category);
        }
        Ok(ledger)
    }
}
