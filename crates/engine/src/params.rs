//! Named numeric parameters rules read their constants from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Flat `name → f64` mapping.
///
/// Rules never embed tunable literals; they bind parameter names, and the
/// registry checks at registration that every bound name is declared here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters {
    values: BTreeMap<String, f64>,
}

/// Calibrated defaults for the standard rule set.
const STANDARD: &[(&str, f64)] = &[
    // controls
    ("power_pack_ratio", 0.74),
    // technology
    ("cable_per_jack_ft", 10.0),
    ("jhook_spacing_ft", 4.0),
    // 1/2" EMT fittings per 100 ft
    ("emt_1_2_connector_per_100ft", 10.0),
    ("emt_1_2_coupling_per_100ft", 8.0),
    ("emt_1_2_bushing_per_100ft", 10.0),
    ("emt_1_2_strap_1hole_per_100ft", 12.0),
    // 3/4" EMT fittings per 100 ft
    ("emt_3_4_connector_per_100ft", 10.5),
    ("emt_3_4_coupling_per_100ft", 9.2),
    ("emt_3_4_bushing_per_100ft", 10.5),
    ("emt_3_4_strap_1hole_per_100ft", 9.2),
    ("emt_3_4_strap_unistrut_per_100ft", 3.1),
    // 1" EMT fittings per 100 ft
    ("emt_1_connector_per_100ft", 4.9),
    ("emt_1_coupling_per_100ft", 8.1),
    ("emt_1_bushing_per_100ft", 4.9),
    ("emt_1_strap_1hole_per_100ft", 1.9),
    ("emt_1_strap_unistrut_per_100ft", 10.1),
    // 1-1/4" EMT fittings per 100 ft
    ("emt_1_1_4_connector_per_100ft", 11.8),
    ("emt_1_1_4_coupling_per_100ft", 5.8),
    ("emt_1_1_4_bushing_per_100ft", 11.8),
    ("emt_1_1_4_strap_1hole_per_100ft", 4.1),
    ("emt_1_1_4_strap_unistrut_per_100ft", 7.3),
    // wire footage per conduit foot
    ("thhn_14_per_emt_1_2_ft", 3.0),
    ("thhn_12_per_emt_3_4_ft", 2.3),
    ("thhn_10_per_emt_1_ft", 8.4),
    ("thhn_8_per_emt_1_1_4_ft", 0.08),
    // boxes, rings, plates
    ("deep_box_ratio", 0.10),
    ("data_box_ratio", 0.15),
    ("devices_per_two_gang", 2.0),
    ("blank_ko_ratio", 0.3),
    // consumables
    ("red_wirenuts_per_device", 4.0),
    ("yellow_wirenuts_per_device", 2.0),
    ("tapping_screws_per_device", 4.0),
    ("pull_line_per_conduit_ft", 0.5),
    ("devices_per_black_tape", 50.0),
    ("devices_per_phase_tape", 100.0),
    ("minimum_rolls", 1.0),
    // accessories
    ("pendant_cables_per_linear", 4.0),
    ("aircraft_kits_per_pendant", 4.0),
    // fire stopping
    ("penetrations_per_caulk_tube", 3.0),
    ("minimum_caulk_tubes", 1.0),
];

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// The documented defaults every standard rule binds to.
    pub fn standard() -> Self {
        Self {
            values: STANDARD
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
        }
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Overlay `overrides` on top of `self`; overriding keys win.
    pub fn overlay(&mut self, overrides: &Parameters) {
        for (name, value) in &overrides.values {
            self.values.insert(name.clone(), *value);
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_defaults_present() {
        let params = Parameters::standard();
        assert_eq!(params.get("power_pack_ratio"), Some(0.74));
        assert_eq!(params.get("cable_per_jack_ft"), Some(10.0));
        assert_eq!(params.get("jhook_spacing_ft"), Some(4.0));
        assert_eq!(params.len(), STANDARD.len());
    }

    #[test]
    fn overlay_replaces_only_named_keys() {
        let mut params = Parameters::standard();
        let overrides = Parameters::new().with("power_pack_ratio", 0.5);
        params.overlay(&overrides);
        assert_eq!(params.get("power_pack_ratio"), Some(0.5));
        assert_eq!(params.get("cable_per_jack_ft"), Some(10.0));
    }

    #[test]
    fn parses_from_toml_table() {
        let params: Parameters = toml::from_str("cable_per_jack_ft = 12.0\njhook_spacing_ft = 5.0\n").unwrap();
        assert_eq!(params.get("cable_per_jack_ft"), Some(12.0));
        assert!(!params.contains("power_pack_ratio"));
    }
}
