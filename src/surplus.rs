//! Consumer surplus under a linear demand curve.

use serde::Serialize;
use tracing::info;

use crate::curve::{DemandSample, LINE_POINTS, sample_points};
use crate::error::SurplusError;
use crate::regression::{LinearFit, fit_ols, linspace};

/// Whole-population demand fit with its surplus triangle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurplusEstimate {
    pub samples: Vec<DemandSample>,
    pub fit: LinearFit,
    /// Demand at which the fitted price reaches zero.
    pub quantity_intercept: f64,
    /// Fitted price at zero demand.
    pub price_intercept: f64,
    pub consumer_surplus: f64,
    /// Predicted `(demand, price)` up to the larger of the highest observed
    /// demand and the quantity-intercept.
    pub line: Vec<(f64, f64)>,
    /// Upper edge of the shaded surplus region, zero to quantity-intercept.
    pub region: Vec<(f64, f64)>,
}

/// Quantity-intercept and triangle area for a downward-sloping `fit`.
///
/// # Errors
///
/// [`SurplusError::NonDownwardSlope`] for a flat or rising line,
/// [`SurplusError::NonPositiveIntercept`] when the line never reaches a
/// positive price.
pub fn consumer_surplus(fit: &LinearFit) -> Result<(f64, f64), SurplusError> {
    if fit.slope >= 0.0 {
        return Err(SurplusError::NonDownwardSlope { slope: fit.slope });
    }
    if fit.intercept <= 0.0 {
        return Err(SurplusError::NonPositiveIntercept {
            intercept: fit.intercept,
        });
    }
    let quantity_intercept = -fit.intercept / fit.slope;
    Ok((quantity_intercept, 0.5 * quantity_intercept * fit.intercept))
}

/// Fits the population `samples` and derives the consumer surplus.
#[tracing::instrument(skip_all, fields(samples = samples.len()))]
pub fn estimate_surplus(samples: Vec<DemandSample>) -> Result<SurplusEstimate, SurplusError> {
    let points = sample_points(&samples);
    let fit = fit_ols(&points)?;
    let (quantity_intercept, surplus) = consumer_surplus(&fit)?;

    let max_q = points
        .iter()
        .map(|p| p.0)
        .fold(quantity_intercept, f64::max);
    let line = linspace(0.0, max_q, LINE_POINTS)
        .into_iter()
        .map(|q| (q, fit.predict(q)))
        .collect();
    let region = linspace(0.0, quantity_intercept, LINE_POINTS)
        .into_iter()
        .map(|q| (q, fit.predict(q).max(0.0)))
        .collect();

    info!(
        intercept = fit.intercept,
        slope = fit.slope,
        quantity_intercept,
        consumer_surplus = surplus,
        "Consumer surplus estimated"
    );

    Ok(SurplusEstimate {
        samples,
        fit,
        quantity_intercept,
        price_intercept: fit.intercept,
        consumer_surplus: surplus,
        line,
        region,
    })
}
