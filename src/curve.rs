//! Demand-curve fitting over respondent populations.
//!
//! Each population (the whole survey, or one value of a demographic field) is
//! reduced to one `(mean demand, fare)` sample per tier, and price is fitted
//! as a linear function of demand.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::SchemaError;
use crate::parser::SurveyTable;
use crate::regression::{LinearFit, fit_ols, linspace};
use crate::stats::{mean, parse_numeric, stddev};
use crate::tiers::{PriceSchedule, PriceTier};

/// Number of points on a predicted demand line.
pub const LINE_POINTS: usize = 100;

/// Population-average demand at one fare.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandSample {
    pub tier: PriceTier,
    pub quantity: f64,
    pub price: f64,
    /// Respondents contributing a value.
    pub respondents: usize,
    /// Population standard deviation of the contributing values.
    pub spread: f64,
}

/// An augmented survey bound to the `avg_demand_<tier>` columns it carries.
#[derive(Debug)]
pub struct DemandTable<'a> {
    table: &'a SurveyTable,
    columns: Vec<(PriceTier, f64, usize)>,
}

impl<'a> DemandTable<'a> {
    /// Finds the average-demand column for every scheduled tier.
    ///
    /// Tiers whose column is absent are skipped; a table with none of them
    /// is rejected.
    pub fn bind(table: &'a SurveyTable, schedule: &PriceSchedule) -> Result<Self, SchemaError> {
        let columns: Vec<_> = schedule
            .iter()
            .filter_map(|(tier, price)| {
                let idx = table.column_index(&tier.avg_column());
                if idx.is_none() {
                    debug!(tier = %tier, "No average column for tier");
                }
                idx.map(|i| (tier, price, i))
            })
            .collect();

        if columns.is_empty() {
            return Err(SchemaError::NoDemandColumns);
        }
        Ok(Self { table, columns })
    }

    pub fn table(&self) -> &SurveyTable {
        self.table
    }

    /// One sample per tier with at least one present value among `rows`.
    pub fn samples(&self, rows: &[usize]) -> Vec<DemandSample> {
        self.columns
            .iter()
            .filter_map(|&(tier, price, col)| {
                let values: Vec<f64> = rows
                    .iter()
                    .filter_map(|&r| parse_numeric(self.table.cell(r, col)))
                    .collect();
                if values.is_empty() {
                    return None;
                }
                let quantity = mean(&values);
                Some(DemandSample {
                    tier,
                    quantity,
                    price,
                    respondents: values.len(),
                    spread: stddev(&values, quantity),
                })
            })
            .collect()
    }

    /// Samples over every row in the table.
    pub fn population_samples(&self) -> Vec<DemandSample> {
        let all: Vec<usize> = (0..self.table.len()).collect();
        self.samples(&all)
    }
}

/// The fitted curve for one population.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCurve {
    pub label: String,
    pub samples: Vec<DemandSample>,
    /// `None` when the samples do not determine a line.
    pub fit: Option<LinearFit>,
    /// Predicted `(demand, price)` from zero to the largest observed demand.
    pub line: Vec<(f64, f64)>,
}

impl GroupCurve {
    /// Fits `samples`; an undetermined fit is logged and left empty.
    pub fn from_samples(label: impl Into<String>, samples: Vec<DemandSample>) -> Self {
        let label = label.into();
        let points = sample_points(&samples);

        let fit = match fit_ols(&points) {
            Ok(fit) => Some(fit),
            Err(e) => {
                warn!(group = %label, error = %e, "Demand line not fitted");
                None
            }
        };

        let line = fit
            .map(|f| {
                let max_q = points.iter().map(|p| p.0).fold(0.0, f64::max);
                linspace(0.0, max_q, LINE_POINTS)
                    .into_iter()
                    .map(|q| (q, f.predict(q)))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            label,
            samples,
            fit,
            line,
        }
    }
}

/// `(quantity, price)` pairs for fitting and plotting.
pub fn sample_points(samples: &[DemandSample]) -> Vec<(f64, f64)> {
    samples.iter().map(|s| (s.quantity, s.price)).collect()
}

/// All curves drawn on one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveSet {
    /// Grouping field, `None` for the whole population.
    pub field: Option<String>,
    pub curves: Vec<GroupCurve>,
}

impl CurveSet {
    /// Output file name, e.g. `by_days_on_campus.png`.
    pub fn file_name(&self) -> String {
        match &self.field {
            Some(field) => format!("by_{}.png", sanitize_field_name(field)),
            None => "demand_curve.png".to_string(),
        }
    }
}

/// Lower-cases `field`, turns spaces into underscores and strips trailing
/// underscores.
pub fn sanitize_field_name(field: &str) -> String {
    field
        .to_lowercase()
        .replace(' ', "_")
        .trim_end_matches('_')
        .to_string()
}

/// Row indices for each distinct non-blank value of column `col`, in order of
/// first appearance.
pub fn group_rows(table: &SurveyTable, col: usize) -> Vec<(String, Vec<usize>)> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for r in 0..table.len() {
        let value = table.cell(r, col);
        if value.trim().is_empty() {
            continue;
        }
        match index.get(value) {
            Some(&g) => groups[g].1.push(r),
            None => {
                index.insert(value.to_string(), groups.len());
                groups.push((value.to_string(), vec![r]));
            }
        }
    }

    groups
}

/// Fits one demand curve per value of `field`, or one for the whole table.
///
/// Groups without any sample get no curve.
#[tracing::instrument(skip(demand), fields(rows = demand.table().len()))]
pub fn fit_curves(demand: &DemandTable<'_>, field: Option<&str>) -> Result<CurveSet, SchemaError> {
    let table = demand.table();

    let Some(field) = field else {
        let curve = GroupCurve::from_samples("All respondents", demand.population_samples());
        let curves = if curve.samples.is_empty() {
            Vec::new()
        } else {
            vec![curve]
        };
        return Ok(CurveSet {
            field: None,
            curves,
        });
    };

    let col = table
        .column_index(field)
        .ok_or_else(|| SchemaError::MissingColumn(field.to_string()))?;

    let mut curves = Vec::new();
    for (value, rows) in group_rows(table, col) {
        let samples = demand.samples(&rows);
        if samples.is_empty() {
            warn!(group = %value, respondents = rows.len(), "Group has no demand samples");
            continue;
        }
        debug!(group = %value, respondents = rows.len(), samples = samples.len(), "Group sampled");
        curves.push(GroupCurve::from_samples(value, samples));
    }

    info!(field, groups = curves.len(), "Demand curves fitted");
    Ok(CurveSet {
        field: Some(field.to_string()),
        curves,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_survey;
    use approx::assert_abs_diff_eq;

    fn schedule() -> PriceSchedule {
        PriceSchedule::from_pairs([
            (PriceTier::Free, 0.0),
            (PriceTier::Half, 1.13),
            (PriceTier::Normal, 2.25),
        ])
    }

    fn augmented() -> SurveyTable {
        let data = "Year,avg_demand_free,avg_demand_half,avg_demand_normal\n\
                    Senior,10,6,4\n\
                    Senior,8,4,2\n\
                    Junior,5,,\n\
                    ,12,9,6\n\
                    Junior,7,,\n\
                    Freshman,,,\n";
        parse_survey(data.as_bytes()).unwrap()
    }

    #[test]
    fn test_bind_requires_an_average_column() {
        let table = parse_survey("Year,free_1\nSenior,3\n".as_bytes()).unwrap();
        let err = DemandTable::bind(&table, &schedule()).unwrap_err();
        assert!(matches!(err, SchemaError::NoDemandColumns));
    }

    #[test]
    fn test_population_samples_average_present_values() {
        let table = augmented();
        let demand = DemandTable::bind(&table, &schedule()).unwrap();
        let samples = demand.population_samples();

        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].tier, PriceTier::Free);
        assert_abs_diff_eq!(samples[0].quantity, 42.0 / 5.0, epsilon = 1e-12);
        assert_eq!(samples[0].respondents, 5);
        assert_abs_diff_eq!(samples[1].quantity, 19.0 / 3.0, epsilon = 1e-12);
        assert_eq!(samples[2].price, 2.25);
    }

    #[test]
    fn test_tier_without_values_is_dropped() {
        let table = augmented();
        let demand = DemandTable::bind(&table, &schedule()).unwrap();

        // Junior rows only answered the free tier.
        let samples = demand.samples(&[2, 4]);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].tier, PriceTier::Free);
        assert_abs_diff_eq!(samples[0].quantity, 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(samples[0].spread, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_group_rows_keeps_first_appearance_order_and_skips_blank() {
        let table = augmented();
        let groups = group_rows(&table, 0);
        let names: Vec<&str> = groups.iter().map(|(n, _)| n.as_str()).collect();

        assert_eq!(names, vec!["Senior", "Junior", "Freshman"]);
        assert_eq!(groups[1].1, vec![2, 4]);
    }

    #[test]
    fn test_grouped_curves_one_series_per_group_with_samples() {
        let table = augmented();
        let demand = DemandTable::bind(&table, &schedule()).unwrap();
        let set = fit_curves(&demand, Some("Year")).unwrap();

        let labels: Vec<&str> = set.curves.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Senior", "Junior"]);

        let senior = &set.curves[0];
        assert!(senior.fit.unwrap().slope < 0.0);
        assert_eq!(senior.line.len(), LINE_POINTS);
        assert_eq!(senior.line[0].0, 0.0);
        assert_abs_diff_eq!(senior.line[LINE_POINTS - 1].0, 9.0, epsilon = 1e-12);

        // A single sample is still plotted but gets no line.
        let junior = &set.curves[1];
        assert_eq!(junior.samples.len(), 1);
        assert!(junior.fit.is_none());
        assert!(junior.line.is_empty());
    }

    #[test]
    fn test_ungrouped_curve_covers_everyone() {
        let table = augmented();
        let demand = DemandTable::bind(&table, &schedule()).unwrap();
        let set = fit_curves(&demand, None).unwrap();

        assert_eq!(set.curves.len(), 1);
        assert_eq!(set.curves[0].samples.len(), 3);
        assert_eq!(set.file_name(), "demand_curve.png");
    }

    #[test]
    fn test_unknown_grouping_field() {
        let table = augmented();
        let demand = DemandTable::bind(&table, &schedule()).unwrap();
        let err = fit_curves(&demand, Some("Gender")).unwrap_err();
        assert!(matches!(err, SchemaError::MissingColumn(f) if f == "Gender"));
    }

    #[test]
    fn test_sanitize_field_name() {
        assert_eq!(sanitize_field_name("Days on Campus "), "days_on_campus");
        assert_eq!(sanitize_field_name("Bus Pass Impact"), "bus_pass_impact");
        assert_eq!(sanitize_field_name("Year"), "year");
        assert_eq!(sanitize_field_name("Class Pass  "), "class_pass");
    }

    #[test]
    fn test_file_name_for_grouped_chart() {
        let set = CurveSet {
            field: Some("Support Class Pass ".to_string()),
            curves: Vec::new(),
        };
        assert_eq!(set.file_name(), "by_support_class_pass.png");
    }
}
