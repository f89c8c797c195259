//! Surveyed price tiers and the fare attached to each.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One of the fixed price points at which willingness-to-ride was asked.
///
/// Declaration order is ascending fare, which is also the order tiers are
/// reported and plotted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTier {
    Free,
    Half,
    Normal,
    Extra,
    Double,
}

impl PriceTier {
    pub const ALL: [PriceTier; 5] = [
        PriceTier::Free,
        PriceTier::Half,
        PriceTier::Normal,
        PriceTier::Extra,
        PriceTier::Double,
    ];

    /// Identifier used as the survey column prefix, e.g. `half` in `half_1`.
    pub fn id(self) -> &'static str {
        match self {
            PriceTier::Free => "free",
            PriceTier::Half => "half",
            PriceTier::Normal => "normal",
            PriceTier::Extra => "extra",
            PriceTier::Double => "double",
        }
    }

    pub fn column_prefix(self) -> String {
        format!("{}_", self.id())
    }

    /// Name of the derived per-respondent average column.
    pub fn avg_column(self) -> String {
        format!("avg_demand_{}", self.id())
    }
}

impl fmt::Display for PriceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Immutable tier → fare table shared by every pipeline.
///
/// Stored on disk as a plain JSON object:
/// ```json
/// { "free": 0.0, "half": 1.13, "normal": 2.25, "extra": 3.37, "double": 5.5 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceSchedule {
    prices: BTreeMap<PriceTier, f64>,
}

impl Default for PriceSchedule {
    fn default() -> Self {
        Self::from_pairs([
            (PriceTier::Free, 0.0),
            (PriceTier::Half, 1.13),
            (PriceTier::Normal, 2.25),
            (PriceTier::Extra, 3.37),
            (PriceTier::Double, 5.50),
        ])
    }
}

impl PriceSchedule {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (PriceTier, f64)>) -> Self {
        Self {
            prices: pairs.into_iter().collect(),
        }
    }

    /// Loads the schedule from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let schedule: PriceSchedule = serde_json::from_str(&content)?;
        if schedule.prices.is_empty() {
            anyhow::bail!("price schedule '{path}' defines no tiers");
        }
        Ok(schedule)
    }

    pub fn price(&self, tier: PriceTier) -> Option<f64> {
        self.prices.get(&tier).copied()
    }

    /// Iterates over `(tier, price)` pairs in ascending tier order.
    pub fn iter(&self) -> impl Iterator<Item = (PriceTier, f64)> + '_ {
        self.prices.iter().map(|(t, p)| (*t, *p))
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Returns a copy with every fare multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::from_pairs(self.iter().map(|(t, p)| (t, p * factor)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[test]
    fn test_default_schedule_matches_survey_fares() {
        let schedule = PriceSchedule::default();
        assert_eq!(schedule.len(), 5);
        assert_eq!(schedule.price(PriceTier::Free), Some(0.0));
        assert_eq!(schedule.price(PriceTier::Half), Some(1.13));
        assert_eq!(schedule.price(PriceTier::Double), Some(5.50));
    }

    #[test]
    fn test_iter_is_in_tier_order() {
        let schedule = PriceSchedule::from_pairs([
            (PriceTier::Double, 5.5),
            (PriceTier::Free, 0.0),
            (PriceTier::Normal, 2.25),
        ]);
        let tiers: Vec<_> = schedule.iter().map(|(t, _)| t).collect();
        assert_eq!(tiers, vec![PriceTier::Free, PriceTier::Normal, PriceTier::Double]);
    }

    #[test]
    fn test_column_names() {
        assert_eq!(PriceTier::Half.column_prefix(), "half_");
        assert_eq!(PriceTier::Extra.avg_column(), "avg_demand_extra");
    }

    #[test]
    fn test_load_from_json() {
        let path = format!("{}/ridership_demand_tiers.json", env::temp_dir().display());
        fs::write(&path, r#"{"free": 0.0, "normal": 3.0}"#).unwrap();

        let schedule = PriceSchedule::load(&path).unwrap();
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule.price(PriceTier::Normal), Some(3.0));
        assert_eq!(schedule.price(PriceTier::Half), None);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_rejects_unknown_tier() {
        let path = format!("{}/ridership_demand_bad_tiers.json", env::temp_dir().display());
        fs::write(&path, r#"{"premium": 9.0}"#).unwrap();

        assert!(PriceSchedule::load(&path).is_err());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_scaled_doubles_every_fare() {
        let doubled = PriceSchedule::default().scaled(2.0);
        assert_eq!(doubled.price(PriceTier::Normal), Some(4.5));
        assert_eq!(doubled.price(PriceTier::Free), Some(0.0));
    }
}
