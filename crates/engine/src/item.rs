//! Item identity and static item metadata.
//!
//! An [`ItemId`] is an opaque catalog code. Category and unit membership live
//! in the [`Catalog`], never on the id itself, so the same code always groups
//! the same way across runs.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TakeoffError;

/// Stable key for one material or device type.
///
/// Backed by a shared `Arc<str>` so cloning an id into graph nodes, ledger
/// keys and report rows never copies the string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(Arc<str>);

impl ItemId {
    /// Parse an item code. Rejects empty codes and codes with leading or
    /// trailing whitespace.
    pub fn new(code: &str) -> Result<Self, TakeoffError> {
        if code.is_empty() || code.trim() != code {
            return Err(TakeoffError::InvalidItemId(code.to_string()));
        }
        Ok(Self(Arc::from(code)))
    }

    /// Build an id from a literal known to be valid. Test and fixture helper.
    pub fn from_static(code: &'static str) -> Self {
        debug_assert!(!code.is_empty() && code.trim() == code);
        Self(Arc::from(code))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl Serialize for ItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        ItemId::new(&code).map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for ItemId {
    type Err = TakeoffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemId::new(s)
    }
}

// ---------------------------------------------------------------------------
// Category + Unit
// ---------------------------------------------------------------------------

/// Reporting group. Declaration order is the rollup display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Fixtures,
    LinearFixtures,
    Pendants,
    Controls,
    PowerDevices,
    Panel,
    Demo,
    Technology,
    Conduit,
    Fittings,
    Boxes,
    Rings,
    Plates,
    Wire,
    Consumables,
    Accessories,
    FireStopping,
    Labor,
    /// Intermediate rollups rules chain through (device totals etc.).
    Subtotal,
}

impl Category {
    pub const ALL: [Category; 19] = [
        Self::Fixtures,
        Self::LinearFixtures,
        Self::Pendants,
        Self::Controls,
        Self::PowerDevices,
        Self::Panel,
        Self::Demo,
        Self::Technology,
        Self::Conduit,
        Self::Fittings,
        Self::Boxes,
        Self::Rings,
        Self::Plates,
        Self::Wire,
        Self::Consumables,
        Self::Accessories,
        Self::FireStopping,
        Self::Labor,
        Self::Subtotal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixtures => "fixtures",
            Self::LinearFixtures => "linear_fixtures",
            Self::Pendants => "pendants",
            Self::Controls => "controls",
            Self::PowerDevices => "power_devices",
            Self::Panel => "panel",
            Self::Demo => "demo",
            Self::Technology => "technology",
            Self::Conduit => "conduit",
            Self::Fittings => "fittings",
            Self::Boxes => "boxes",
            Self::Rings => "rings",
            Self::Plates => "plates",
            Self::Wire => "wire",
            Self::Consumables => "consumables",
            Self::Accessories => "accessories",
            Self::FireStopping => "fire_stopping",
            Self::Labor => "labor",
            Self::Subtotal => "subtotal",
        }
    }

    /// Parse the snake_case label used in rule sets and CSV files.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.iter().copied().find(|c| c.as_str() == label)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    #[default]
    Each,
    Feet,
    Roll,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Each => write!(f, "ea"),
            Self::Feet => write!(f, "ft"),
            Self::Roll => write!(f, "roll"),
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSpec {
    pub category: Category,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Static item → category/unit membership.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    items: BTreeMap<ItemId, ItemSpec>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an item. Re-declaring replaces the previous spec.
    pub fn declare(&mut self, item: ItemId, category: Category, unit: Unit) {
        self.items.insert(
            item,
            ItemSpec {
                category,
                unit,
                description: None,
            },
        );
    }

    pub fn insert(&mut self, item: ItemId, spec: ItemSpec) {
        self.items.insert(item, spec);
    }

    pub fn get(&self, item: &ItemId) -> Option<&ItemSpec> {
        self.items.get(item)
    }

    pub fn category(&self, item: &ItemId) -> Option<Category> {
        self.items.get(item).map(|s| s.category)
    }

    pub fn contains(&self, item: &ItemId) -> bool {
        self.items.contains_key(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &ItemSpec)> {
        self.items.iter()
    }
}
