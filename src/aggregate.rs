//! Per-respondent demand aggregation.
//!
//! Drops respondents who fail the attention check, then appends one
//! `avg_demand_<tier>` column per price tier holding the respondent's mean
//! stated demand across that tier's questions.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::parser::SurveyTable;
use crate::schema::{AttentionCheck, TierSchema};
use crate::stats::{mean_present, parse_numeric};
use crate::tiers::{PriceSchedule, PriceTier};

/// Summary of one aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub tiers: Vec<TierReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierReport {
    pub tier: PriceTier,
    pub columns: usize,
    /// Kept respondents with at least one numeric answer for the tier.
    pub respondents: usize,
}

/// Mean of the numeric answers in `columns`, `None` if none are numeric.
pub fn row_average(row: &[String], columns: &[usize]) -> Option<f64> {
    mean_present(
        columns
            .iter()
            .map(|&c| row.get(c).and_then(|cell| parse_numeric(cell))),
    )
}

/// Filters `table` by `check` and appends the per-tier average columns.
///
/// Original columns and cells are carried through untouched. If the input
/// already has an `avg_demand_<tier>` column it is overwritten in place.
#[tracing::instrument(skip_all, fields(rows = table.len()))]
pub fn aggregate_survey(
    table: &SurveyTable,
    schedule: &PriceSchedule,
    check: &AttentionCheck,
    exclude_marker: &str,
) -> Result<(SurveyTable, AggregateReport)> {
    let bound = check.bind(table)?;
    let schema = TierSchema::resolve(&table.headers, schedule, exclude_marker)?;

    let mut headers = table.headers.clone();
    let targets: Vec<usize> = schema
        .tiers
        .iter()
        .map(|t| {
            let name = t.tier.avg_column();
            match headers.iter().position(|h| *h == name) {
                Some(existing) => {
                    warn!(column = %name, "Overwriting existing average column");
                    existing
                }
                None => {
                    headers.push(name);
                    headers.len() - 1
                }
            }
        })
        .collect();

    let mut respondents = vec![0usize; schema.tiers.len()];
    let mut rows = Vec::new();

    for row in table.rows.iter().filter(|r| bound.passes(r)) {
        let mut out = row.clone();
        out.resize(headers.len(), String::new());

        for (i, tier) in schema.tiers.iter().enumerate() {
            let avg = row_average(row, &tier.columns);
            if avg.is_some() {
                respondents[i] += 1;
            }
            out[targets[i]] = avg.map(|v| v.to_string()).unwrap_or_default();
        }

        rows.push(out);
    }

    let report = AggregateReport {
        rows_read: table.len(),
        rows_kept: rows.len(),
        tiers: schema
            .tiers
            .iter()
            .zip(&respondents)
            .map(|(t, &n)| TierReport {
                tier: t.tier,
                columns: t.columns.len(),
                respondents: n,
            })
            .collect(),
    };

    info!(
        rows_read = report.rows_read,
        rows_kept = report.rows_kept,
        dropped = report.rows_read - report.rows_kept,
        "Attention check applied"
    );

    Ok((SurveyTable { headers, rows }, report))
}
