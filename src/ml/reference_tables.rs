/*!
 * # Commodity Reference Tables
 *
 * Static per-commodity storage data consumed by the spoilage risk model.
 * Lookups are case-insensitive and never fail: unknown commodities get the
 * generic defaults.
 */

use super::catalog;
use super::spoilage_model::StorageType;
use serde::Serialize;
use std::collections::HashMap;

/// Optimal storage temperature used for commodities not in the table
pub const DEFAULT_OPTIMAL_TEMPERATURE_C: f64 = 10.0;
/// Risk multiplier used for commodities not in the table
pub const DEFAULT_RISK_MULTIPLIER: f64 = 1.0;
/// Optimal relative humidity for everything except onion
pub const DEFAULT_OPTIMAL_HUMIDITY_PCT: f64 = 85.0;
const ONION_OPTIMAL_HUMIDITY_PCT: f64 = 70.0;

const OPTIMAL_TEMPERATURES: [(&str, f64); 8] = [
    ("tomato", 12.0),
    ("potato", 8.0),
    ("onion", 15.0),
    ("apple", 2.0),
    ("banana", 14.0),
    ("carrot", 5.0),
    ("lettuce", 2.0),
    ("mango", 10.0),
];

const RISK_MULTIPLIERS: [(&str, f64); 8] = [
    ("lettuce", 1.5),
    ("banana", 1.3),
    ("mango", 1.2),
    ("tomato", 1.0),
    ("apple", 0.8),
    ("carrot", 0.7),
    ("potato", 0.5),
    ("onion", 0.4),
];

const SUGGESTED_CONDITIONS: [(&str, SuggestedConditions); 8] = [
    ("tomato", SuggestedConditions::new(12.0, 85.0, StorageType::ColdStorage)),
    ("potato", SuggestedConditions::new(8.0, 90.0, StorageType::ColdStorage)),
    ("onion", SuggestedConditions::new(15.0, 70.0, StorageType::Ambient)),
    ("apple", SuggestedConditions::new(2.0, 90.0, StorageType::ColdStorage)),
    ("banana", SuggestedConditions::new(14.0, 85.0, StorageType::Ambient)),
    ("carrot", SuggestedConditions::new(5.0, 95.0, StorageType::ColdStorage)),
    ("lettuce", SuggestedConditions::new(2.0, 98.0, StorageType::ColdStorage)),
    ("mango", SuggestedConditions::new(10.0, 80.0, StorageType::Ambient)),
];

/// Canonical lookup key for a commodity name.
pub fn normalize_commodity(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Storage conditions pre-filled into a listing form when a commodity is picked
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SuggestedConditions {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub storage_type: StorageType,
}

impl SuggestedConditions {
    const fn new(temperature_c: f64, humidity_pct: f64, storage_type: StorageType) -> Self {
        Self {
            temperature_c,
            humidity_pct,
            storage_type,
        }
    }
}

/// Everything the tables know about one commodity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommodityProfile {
    pub name: String,
    pub known: bool,
    pub category: &'static str,
    pub optimal_temperature_c: f64,
    pub optimal_humidity_pct: f64,
    pub risk_multiplier: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_conditions: Option<SuggestedConditions>,
}

/// Immutable table set. Built once at startup and shared behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTables {
    optimal_temperatures: HashMap<String, f64>,
    risk_multipliers: HashMap<String, f64>,
}

impl Default for ReferenceTables {
    fn default() -> Self {
        Self {
            optimal_temperatures: OPTIMAL_TEMPERATURES
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
            risk_multipliers: RISK_MULTIPLIERS
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
        }
    }
}

impl ReferenceTables {
    /// Default tables with configured entries merged over them. Override keys
    /// are normalized the same way lookups are.
    pub fn with_overrides(
        temperature_overrides: &HashMap<String, f64>,
        multiplier_overrides: &HashMap<String, f64>,
    ) -> Self {
        let mut tables = Self::default();
        for (name, value) in temperature_overrides {
            tables
                .optimal_temperatures
                .insert(normalize_commodity(name), *value);
        }
        for (name, value) in multiplier_overrides {
            tables
                .risk_multipliers
                .insert(normalize_commodity(name), *value);
        }
        tables
    }

    pub fn optimal_temperature(&self, commodity: &str) -> f64 {
        self.optimal_temperatures
            .get(&normalize_commodity(commodity))
            .copied()
            .unwrap_or(DEFAULT_OPTIMAL_TEMPERATURE_C)
    }

    pub fn risk_multiplier(&self, commodity: &str) -> f64 {
        self.risk_multipliers
            .get(&normalize_commodity(commodity))
            .copied()
            .unwrap_or(DEFAULT_RISK_MULTIPLIER)
    }

    pub fn optimal_humidity(&self, commodity: &str) -> f64 {
        if normalize_commodity(commodity) == "onion" {
            ONION_OPTIMAL_HUMIDITY_PCT
        } else {
            DEFAULT_OPTIMAL_HUMIDITY_PCT
        }
    }

    /// True when either table has an entry for the commodity.
    pub fn is_known(&self, commodity: &str) -> bool {
        let key = normalize_commodity(commodity);
        self.optimal_temperatures.contains_key(&key) || self.risk_multipliers.contains_key(&key)
    }

    pub fn suggested_conditions(&self, commodity: &str) -> Option<SuggestedConditions> {
        let key = normalize_commodity(commodity);
        SUGGESTED_CONDITIONS
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, conditions)| *conditions)
    }

    pub fn profile(&self, commodity: &str) -> CommodityProfile {
        CommodityProfile {
            name: normalize_commodity(commodity),
            known: self.is_known(commodity),
            category: catalog::category_for(commodity),
            optimal_temperature_c: self.optimal_temperature(commodity),
            optimal_humidity_pct: self.optimal_humidity(commodity),
            risk_multiplier: self.risk_multiplier(commodity),
            suggested_conditions: self.suggested_conditions(commodity),
        }
    }
}
