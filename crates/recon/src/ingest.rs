//! CSV loaders for collaborator output and ground truth.
//!
//! Observations: `item,category,quantity,provenance`
//! Expected:     `item,category,quantity` (row order is display order)
//!
//! Extra columns are ignored; missing ones fail with `MissingColumn`.

use std::path::Path;

use csv::StringRecord;
use takeoff_engine::{Category, ItemId, Ledger, Observation, Provenance, Quantity, Tally};

use crate::error::ReconError;
use crate::model::{ExpectedItem, ExpectedList};

/// Parse observation rows in file order.
pub fn load_observations(csv_data: &str) -> Result<Vec<Observation>, ReconError> {
    const SOURCE: &str = "observations";
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(csv_data.as_bytes());

    let headers = reader.headers()?.clone();
    let item_idx = column(SOURCE, &headers, "item")?;
    let category_idx = column(SOURCE, &headers, "category")?;
    let quantity_idx = column(SOURCE, &headers, "quantity")?;
    let provenance_idx = column(SOURCE, &headers, "provenance")?;

    let mut observations = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = line_of(&record);

        let item = record.get(item_idx).unwrap_or("");
        let category = parse_category(SOURCE, line, record.get(category_idx).unwrap_or(""))?;
        let quantity = parse_number(SOURCE, line, item, record.get(quantity_idx).unwrap_or(""))?;

        let label = record.get(provenance_idx).unwrap_or("");
        let provenance = match Provenance::parse(label) {
            Some(p) if p.is_direct() => p,
            _ => {
                return Err(ReconError::InvalidProvenance {
                    source_name: SOURCE.into(),
                    line,
                    value: label.to_string(),
                })
            }
        };

        observations.push(Observation::new(item, quantity, provenance, category)?);
    }

    log::debug!("loaded {} observations", observations.len());
    Ok(observations)
}

/// Build a seed ledger from observation rows.
///
/// Rows for the same item and provenance add up (one row per sheet). Observed
/// totals go in first, then reference totals are merged over them, so a
/// reference value supplied for a counted item replaces the count.
pub fn load_ledger(csv_data: &str) -> Result<Ledger, ReconError> {
    let mut observed = Tally::new(Provenance::Observed);
    let mut reference = Tally::new(Provenance::Reference);
    for obs in load_observations(csv_data)? {
        match obs.provenance {
            Provenance::Reference => reference.add(obs.item, obs.quantity, obs.category),
            _ => observed.add(obs.item, obs.quantity, obs.category),
        }
    }
    let mut ledger = observed.into_ledger()?;
    ledger.merge(&reference.into_ledger()?);
    Ok(ledger)
}

/// Parse an expected list, preserving row order.
pub fn load_expected(csv_data: &str) -> Result<ExpectedList, ReconError> {
    const SOURCE: &str = "expected";
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(csv_data.as_bytes());

    let headers = reader.headers()?.clone();
    let item_idx = column(SOURCE, &headers, "item")?;
    let category_idx = column(SOURCE, &headers, "category")?;
    let quantity_idx = column(SOURCE, &headers, "quantity")?;

    let mut list = ExpectedList::new();
    for record in reader.records() {
        let record = record?;
        let line = line_of(&record);

        let item = record.get(item_idx).unwrap_or("");
        let category = parse_category(SOURCE, line, record.get(category_idx).unwrap_or(""))?;
        let raw = record.get(quantity_idx).unwrap_or("");
        let value = parse_number(SOURCE, line, item, raw)?;
        let quantity = Quantity::new(value).ok_or_else(|| ReconError::QuantityParse {
            source_name: SOURCE.into(),
            line,
            item: item.to_string(),
            value: raw.to_string(),
        })?;

        list.push(ExpectedItem {
            item: ItemId::new(item)?,
            quantity,
            category,
        })?;
    }

    log::debug!("loaded {} expected items", list.len());
    Ok(list)
}

impl ExpectedList {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ReconError> {
        let data = std::fs::read_to_string(path)?;
        load_expected(&data)
    }
}

fn column(source: &str, headers: &StringRecord, name: &str) -> Result<usize, ReconError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| ReconError::MissingColumn {
            source_name: source.into(),
            column: name.into(),
        })
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

fn parse_category(source: &str, line: u64, value: &str) -> Result<Category, ReconError> {
    Category::parse(value).ok_or_else(|| ReconError::UnknownCategory {
        source_name: source.into(),
        line,
        value: value.to_string(),
    })
}

fn parse_number(source: &str, line: u64, item: &str, value: &str) -> Result<f64, ReconError> {
    value
        .replace(',', "")
        .parse::<f64>()
        .map_err(|_| ReconError::QuantityParse {
            source_name: source.into(),
            line,
            item: item.to_string(),
            value: value.to_string(),
        })
}
