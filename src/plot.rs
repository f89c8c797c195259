//! PNG rendering of demand curves and the consumer-surplus region.

use anyhow::Result;
use plotters::prelude::*;
use std::path::Path;
use tracing::debug;

use crate::curve::CurveSet;
use crate::surplus::SurplusEstimate;

const SIZE: (u32, u32) = (800, 600);
const X_DESC: &str = "Quantity Demanded (Rides per Week)";
const Y_DESC: &str = "Price ($ per Ride)";
const Y_FLOOR: f64 = -0.5;
const LIGHT_GREEN: RGBColor = RGBColor(144, 238, 144);

/// Chart title: `Demand Curve for <subject>` plus ` by <field>` when grouped.
pub fn chart_title(subject: &str, field: Option<&str>) -> String {
    match field {
        Some(field) => format!("Demand Curve for {subject} by {}", field.trim()),
        None => format!("Demand Curve for {subject}"),
    }
}

pub fn surplus_label(surplus: f64) -> String {
    format!("Consumer Surplus = ${surplus:.2}")
}

/// Upper x and y bounds covering `points`, with headroom.
pub fn axis_bounds<'a>(points: impl IntoIterator<Item = &'a (f64, f64)>) -> (f64, f64) {
    let (x_max, y_max) = points
        .into_iter()
        .fold((1.0f64, 1.0f64), |(x, y), p| (x.max(p.0), y.max(p.1)));
    (x_max * 1.05, y_max * 1.1)
}

/// Draws every curve in `set` on one chart: sample markers plus the fitted
/// line, one color per group.
#[tracing::instrument(skip_all, fields(path = %path.display(), groups = set.curves.len()))]
pub fn render_curves(path: &Path, set: &CurveSet, subject: &str) -> Result<()> {
    let sample_points: Vec<(f64, f64)> = set
        .curves
        .iter()
        .flat_map(|c| c.samples.iter().map(|s| (s.quantity, s.price)))
        .collect();
    let (x_max, y_max) = axis_bounds(
        sample_points
            .iter()
            .chain(set.curves.iter().flat_map(|c| c.line.iter())),
    );

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(chart_title(subject, set.field.as_deref()), ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..x_max, Y_FLOOR..y_max)?;

    chart.configure_mesh().x_desc(X_DESC).y_desc(Y_DESC).draw()?;

    for (i, curve) in set.curves.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();

        chart
            .draw_series(
                curve
                    .samples
                    .iter()
                    .map(|s| Circle::new((s.quantity, s.price), 4, color.filled())),
            )?
            .label(format!("Avg. Demand at Price Point for {}", curve.label))
            .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));

        if !curve.line.is_empty() {
            chart
                .draw_series(LineSeries::new(curve.line.iter().copied(), &color))?
                .label(format!("Demand Curve for {}", curve.label))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    debug!("Curve chart written");
    Ok(())
}

/// Draws the population demand curve with its consumer-surplus triangle
/// shaded.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn render_surplus(path: &Path, estimate: &SurplusEstimate, subject: &str) -> Result<()> {
    let sample_points: Vec<(f64, f64)> = estimate
        .samples
        .iter()
        .map(|s| (s.quantity, s.price))
        .collect();
    let (x_max, y_max) = axis_bounds(sample_points.iter().chain(estimate.line.iter()));

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(chart_title(subject, None), ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..x_max, Y_FLOOR..y_max)?;

    chart.configure_mesh().x_desc(X_DESC).y_desc(Y_DESC).draw()?;

    let fill = LIGHT_GREEN.mix(0.5);
    chart
        .draw_series(AreaSeries::new(estimate.region.iter().copied(), 0.0, fill))?
        .label(surplus_label(estimate.consumer_surplus))
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], fill.filled()));

    chart
        .draw_series(
            sample_points
                .iter()
                .map(|&p| Circle::new(p, 4, BLUE.filled())),
        )?
        .label("Avg. Demand at Price Point")
        .legend(|(x, y)| Circle::new((x + 10, y), 4, BLUE.filled()));

    chart
        .draw_series(LineSeries::new(estimate.line.iter().copied(), &BLACK))?
        .label("Demand Curve")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    debug!("Surplus chart written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_title() {
        assert_eq!(
            chart_title("AC Transit", Some("Days on Campus ")),
            "Demand Curve for AC Transit by Days on Campus"
        );
        assert_eq!(chart_title("AC Transit", None), "Demand Curve for AC Transit");
    }

    #[test]
    fn test_surplus_label_rounds_to_cents() {
        assert_eq!(surplus_label(15.528), "Consumer Surplus = $15.53");
    }

    #[test]
    fn test_axis_bounds_add_headroom() {
        let points = [(10.0, 2.0), (4.0, 5.0)];
        let (x, y) = axis_bounds(points.iter());
        assert!((x - 10.5).abs() < 1e-12);
        assert!((y - 5.5).abs() < 1e-12);
    }

    #[test]
    fn test_axis_bounds_never_collapse() {
        let (x, y) = axis_bounds(std::iter::empty());
        assert!(x > 0.0 && y > 0.0);
    }
}
