use super::{chart_err, padded_range, render_message};
use crate::config::ChartSettings;
use crate::core::{ColumnGuard, EmptyState, FilteredView};
use crate::error::CarteraResult;
use crate::types::Metric;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::Serialize;

/// Marker area bounds, in square pixels
pub const MIN_MARKER_AREA: f64 = 50.0;
pub const MAX_MARKER_AREA: f64 = 700.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub label: String,
    pub business_unit: String,
    pub balance: f64,
    /// Marker area, scaled linearly with balance into the marker bounds
    pub area: f64,
}

impl ScatterPoint {
    pub fn radius(&self) -> f64 {
        self.area.sqrt() / 2.0
    }
}

/// Scatter of two metrics, one series per business unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterChart {
    pub title: String,
    pub x_metric: Metric,
    pub y_metric: Metric,
    pub points: Vec<ScatterPoint>,
    /// Series names in drawing order
    pub series: Vec<String>,
    pub empty_state: Option<EmptyState>,
}

impl ScatterChart {
    /// Rows without both axes, or with a zero on either, are not plotted
    pub fn guard(x: Metric, y: Metric) -> ColumnGuard {
        ColumnGuard::plotted(&[x, y])
    }

    pub fn build(view: &FilteredView, x: Metric, y: Metric) -> Self {
        let balances: Vec<f64> = view.rows.iter().map(|r| r.capital_balance.unwrap_or(0.0)).collect();
        let (lo, hi) = balances
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| (lo.min(*b), hi.max(*b)));

        let mut series: Vec<String> = Vec::new();
        let points = view
            .rows
            .iter()
            .zip(balances.iter())
            .filter_map(|(row, balance)| {
                let (px, py) = (row.metric(x)?, row.metric(y)?);
                if !series.contains(&row.business_unit) {
                    series.push(row.business_unit.clone());
                }
                Some(ScatterPoint {
                    x: px,
                    y: py,
                    label: row.department.clone(),
                    business_unit: row.business_unit.clone(),
                    balance: *balance,
                    area: marker_area(*balance, lo, hi),
                })
            })
            .collect::<Vec<_>>();

        let empty_state = view
            .empty_state()
            .or(if points.is_empty() { Some(EmptyState::NoMatchingRows) } else { None });

        Self {
            title: format!("{} vs {}: {}", y.header(), x.header(), view.caption()),
            x_metric: x,
            y_metric: y,
            points,
            series,
            empty_state,
        }
    }

    pub fn render_svg(&self, settings: &ChartSettings) -> CarteraResult<String> {
        if let Some(state) = self.empty_state {
            return render_message(state.message(), settings);
        }

        let colors = settings.palette.colors(self.series.len());
        let x_range = padded_range(self.points.iter().map(|p| p.x));
        let y_range = padded_range(self.points.iter().map(|p| p.y));

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (settings.width, settings.height)).into_drawing_area();
            root.fill(&WHITE).map_err(chart_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(&self.title, ("sans-serif", 20))
                .margin(15)
                .x_label_area_size(45)
                .y_label_area_size(70)
                .build_cartesian_2d(x_range, y_range)
                .map_err(chart_err)?;

            chart
                .configure_mesh()
                .x_desc(self.x_metric.header())
                .y_desc(self.y_metric.header())
                .draw()
                .map_err(chart_err)?;

            for (unit, color) in self.series.iter().zip(colors.iter().copied()) {
                chart
                    .draw_series(
                        self.points
                            .iter()
                            .filter(|p| &p.business_unit == unit)
                            .map(|p| Circle::new((p.x, p.y), p.radius().round() as i32, color.mix(0.7).filled())),
                    )
                    .map_err(chart_err)?
                    .label(unit.as_str())
                    .legend(move |(lx, ly)| Circle::new((lx, ly), 5, color.filled()));
            }

            let label_style = ("sans-serif", 11)
                .into_font()
                .style(FontStyle::Bold)
                .color(&BLACK)
                .pos(Pos::new(HPos::Right, VPos::Bottom));
            chart
                .draw_series(
                    self.points
                        .iter()
                        .map(|p| Text::new(p.label.clone(), (p.x, p.y), label_style.clone())),
                )
                .map_err(chart_err)?;

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(chart_err)?;

            root.present().map_err(chart_err)?;
        }
        Ok(svg)
    }
}

/// Map a balance into the marker-area bounds
pub fn marker_area(balance: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if !span.is_finite() || span <= 0.0 {
        return (MIN_MARKER_AREA + MAX_MARKER_AREA) / 2.0;
    }
    MIN_MARKER_AREA + (balance - min) / span * (MAX_MARKER_AREA - MIN_MARKER_AREA)
}
