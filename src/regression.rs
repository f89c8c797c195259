//! Single-feature ordinary least squares.

use serde::Serialize;

use crate::error::FitError;

/// Fitted line `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub intercept: f64,
    pub slope: f64,
    /// Coefficient of determination; 1.0 when the targets have no variance.
    pub r_squared: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// `x` at which the line crosses `y = 0`, `None` for a flat line.
    pub fn x_intercept(&self) -> Option<f64> {
        if self.slope == 0.0 {
            None
        } else {
            Some(-self.intercept / self.slope)
        }
    }
}

/// Least-squares fit of `y` on `x` over `(x, y)` points.
///
/// # Errors
///
/// * [`FitError::InsufficientSamples`] for fewer than two points.
/// * [`FitError::DegenerateQuantities`] when every `x` is identical.
pub fn fit_ols(points: &[(f64, f64)]) -> Result<LinearFit, FitError> {
    let n = points.len();
    if n < 2 {
        return Err(FitError::InsufficientSamples(n));
    }

    let x_mean = points.iter().map(|p| p.0).sum::<f64>() / n as f64;
    let y_mean = points.iter().map(|p| p.1).sum::<f64>() / n as f64;

    let (sxx, sxy, syy) = points.iter().fold((0.0, 0.0, 0.0), |(sxx, sxy, syy), &(x, y)| {
        let dx = x - x_mean;
        let dy = y - y_mean;
        (sxx + dx * dx, sxy + dx * dy, syy + dy * dy)
    });

    if sxx == 0.0 {
        return Err(FitError::DegenerateQuantities(n));
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let r_squared = if syy == 0.0 {
        1.0
    } else {
        (sxy * sxy) / (sxx * syy)
    };

    Ok(LinearFit {
        intercept,
        slope,
        r_squared,
    })
}

/// `count` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| start + step * i as f64).collect()
        }
    }
}
