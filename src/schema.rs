//! Column schema for raw survey exports.
//!
//! [`TierSchema`] maps each price tier to the demand questions asked at that
//! fare. [`AttentionCheck`] is the predicate a respondent must pass to count.

use serde::Serialize;
use tracing::debug;

use crate::error::SchemaError;
use crate::parser::SurveyTable;
use crate::tiers::{PriceSchedule, PriceTier};

/// Sub-answers whose column name contains this marker are not demand figures.
pub const DEFAULT_EXCLUDE_MARKER: &str = "conf";

/// Resolved demand columns for one tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierColumns {
    pub tier: PriceTier,
    pub price: f64,
    pub columns: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TierSchema {
    pub tiers: Vec<TierColumns>,
}

impl TierSchema {
    /// Groups the header's columns by tier prefix.
    ///
    /// A column belongs to a tier when its name starts with `<tier>_` and does
    /// not contain `exclude_marker`.
    ///
    /// # Errors
    ///
    /// [`SchemaError::EmptyTier`] if any scheduled tier matches no columns.
    pub fn resolve(
        headers: &[String],
        schedule: &PriceSchedule,
        exclude_marker: &str,
    ) -> Result<Self, SchemaError> {
        let mut tiers = Vec::with_capacity(schedule.len());

        for (tier, price) in schedule.iter() {
            let prefix = tier.column_prefix();
            let columns: Vec<usize> = headers
                .iter()
                .enumerate()
                .filter(|(_, name)| {
                    name.starts_with(&prefix)
                        && (exclude_marker.is_empty() || !name.contains(exclude_marker))
                })
                .map(|(i, _)| i)
                .collect();

            if columns.is_empty() {
                return Err(SchemaError::EmptyTier { tier, prefix });
            }

            debug!(tier = %tier, columns = columns.len(), "Tier columns resolved");
            tiers.push(TierColumns {
                tier,
                price,
                columns,
            });
        }

        Ok(Self { tiers })
    }
}

/// Validation predicate: the answer in `column` must equal `expected`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttentionCheck {
    pub column: String,
    pub expected: String,
}

impl Default for AttentionCheck {
    fn default() -> Self {
        Self {
            column: "Q136".to_string(),
            expected: "2".to_string(),
        }
    }
}

impl AttentionCheck {
    /// Binds the check to a table's header.
    pub fn bind(&self, table: &SurveyTable) -> Result<BoundCheck<'_>, SchemaError> {
        let column = table
            .column_index(&self.column)
            .ok_or_else(|| SchemaError::MissingColumn(self.column.clone()))?;
        Ok(BoundCheck {
            column,
            expected: self.expected.trim(),
        })
    }
}

/// An [`AttentionCheck`] resolved to a column position.
#[derive(Debug, Clone, Copy)]
pub struct BoundCheck<'a> {
    column: usize,
    expected: &'a str,
}

impl BoundCheck<'_> {
    pub fn passes(&self, row: &[String]) -> bool {
        row.get(self.column)
            .is_some_and(|answer| answer.trim() == self.expected)
    }
}
