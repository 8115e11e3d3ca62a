use super::{chart_err, padded_range, render_message, TOMATO};
use crate::config::ChartSettings;
use crate::core::{ColumnGuard, EmptyState, FilteredView};
use crate::error::{CarteraError, CarteraResult};
use crate::types::Metric;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::Serialize;

/// Share of each category slot taken by its bar group
const GROUP_WIDTH: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub metric: Metric,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineOverlay {
    pub metric: Metric,
    pub values: Vec<Option<f64>>,
}

/// Grouped bars per department with an optional line on a secondary axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarLineChart {
    pub title: String,
    pub categories: Vec<String>,
    pub bars: Vec<BarSeries>,
    pub line: Option<LineOverlay>,
    pub empty_state: Option<EmptyState>,
}

impl BarLineChart {
    /// Every plotted metric must be present; bar metrics must also be nonzero
    pub fn guard(bars: &[Metric], line: Option<Metric>) -> ColumnGuard {
        let mut guard = ColumnGuard::plotted(bars);
        if let Some(metric) = line {
            if !guard.required.contains(&metric) {
                guard.required.push(metric);
            }
        }
        guard
    }

    pub fn build(view: &FilteredView, bars: &[Metric], line: Option<Metric>) -> CarteraResult<Self> {
        let first = *bars
            .first()
            .ok_or_else(|| CarteraError::Validation("Select at least one bar metric".to_string()))?;

        let sorted = view.clone().sorted_desc(first);
        let rows: Vec<_> = sorted
            .rows
            .iter()
            .filter(|r| bars.iter().all(|m| r.metric(*m).is_some()))
            .collect();

        let categories = rows.iter().map(|r| r.department.clone()).collect();
        let series = bars
            .iter()
            .map(|m| BarSeries {
                metric: *m,
                values: rows.iter().filter_map(|r| r.metric(*m)).collect(),
            })
            .collect();
        let line = line.map(|m| LineOverlay {
            metric: m,
            values: rows.iter().map(|r| r.metric(m)).collect(),
        });

        let names: Vec<&str> = bars.iter().map(|m| m.header()).collect();
        let empty_state = view
            .empty_state()
            .or(if rows.is_empty() { Some(EmptyState::NoMatchingRows) } else { None });

        Ok(Self {
            title: format!("{} by department: {}", names.join(", "), view.caption()),
            categories,
            bars: series,
            line,
            empty_state,
        })
    }

    /// Left offset and width of bar `series` inside its category segment,
    /// both as fractions of the segment width
    pub fn bar_slot(&self, series: usize) -> (f64, f64) {
        let width = GROUP_WIDTH / self.bars.len().max(1) as f64;
        ((1.0 - GROUP_WIDTH) / 2.0 + series as f64 * width, width)
    }

    pub fn render_svg(&self, settings: &ChartSettings) -> CarteraResult<String> {
        if let Some(state) = self.empty_state {
            return render_message(state.message(), settings);
        }

        let n = self.categories.len();
        // A single-value integer range collapses; keep at least two segments
        let last = (n.max(2) - 1) as u32;
        let y_range = padded_range(
            self.bars
                .iter()
                .flat_map(|s| s.values.iter().copied())
                .chain(std::iter::once(0.0)),
        );
        let line_range = padded_range(
            self.line
                .iter()
                .flat_map(|l| l.values.iter().flatten().copied()),
        );

        // One series: colour per department. Several: colour per metric.
        let per_category = self.bars.len() == 1;
        let colors = settings
            .palette
            .colors(if per_category { n } else { self.bars.len() });

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (settings.width, settings.height)).into_drawing_area();
            root.fill(&WHITE).map_err(chart_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(&self.title, ("sans-serif", 20))
                .margin(15)
                .x_label_area_size(110)
                .y_label_area_size(60)
                .right_y_label_area_size(if self.line.is_some() { 60 } else { 0 })
                .build_cartesian_2d((0u32..last).into_segmented(), y_range)
                .map_err(chart_err)?
                .set_secondary_coord((0u32..last).into_segmented(), line_range);

            let categories = &self.categories;
            let first_metric = self.bars.first().map(|s| s.metric.header()).unwrap_or_default();
            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(n)
                .x_label_formatter(&|v: &SegmentValue<u32>| match v {
                    SegmentValue::CenterOf(i) => categories.get(*i as usize).cloned().unwrap_or_default(),
                    _ => String::new(),
                })
                .x_label_style(
                    ("sans-serif", 11)
                        .into_font()
                        .transform(FontTransform::Rotate90),
                )
                .y_desc(first_metric)
                .draw()
                .map_err(chart_err)?;

            let segment_px = f64::from(
                chart.backend_coord(&(SegmentValue::Exact(1), 0.0)).0
                    - chart.backend_coord(&(SegmentValue::Exact(0), 0.0)).0,
            );
            let value_style = ("sans-serif", 10)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Bottom));

            for (s, series) in self.bars.iter().enumerate() {
                let (left, width) = self.bar_slot(s);
                let margin_left = (left * segment_px).round().max(0.0) as u32;
                let margin_right = ((1.0 - left - width) * segment_px).round().max(0.0) as u32;
                let center = ((left + width / 2.0) * segment_px).round() as i32;

                let bars = series.values.iter().enumerate().map(|(i, v)| {
                    let color = if per_category { colors[i] } else { colors[s] };
                    let i = i as u32;
                    let mut bar = Rectangle::new(
                        [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *v)],
                        color.filled(),
                    );
                    bar.set_margin(0, 0, margin_left, margin_right);
                    bar
                });
                let anno = chart.draw_series(bars).map_err(chart_err)?;
                if !per_category {
                    let color = colors[s];
                    anno.label(series.metric.header())
                        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
                }

                chart
                    .draw_series(series.values.iter().enumerate().map(|(i, v)| {
                        EmptyElement::at((SegmentValue::Exact(i as u32), *v))
                            + Text::new(format!("{:.1}x", v), (center, -2), value_style.clone())
                    }))
                    .map_err(chart_err)?;
            }

            if let Some(line) = &self.line {
                let points: Vec<(SegmentValue<u32>, f64)> = line
                    .values
                    .iter()
                    .enumerate()
                    .filter_map(|(i, v)| v.map(|v| (SegmentValue::CenterOf(i as u32), v)))
                    .collect();

                chart
                    .configure_secondary_axes()
                    .y_desc(line.metric.header())
                    .draw()
                    .map_err(chart_err)?;

                chart
                    .draw_secondary_series(LineSeries::new(
                        points.iter().cloned(),
                        TOMATO.stroke_width(2),
                    ))
                    .map_err(chart_err)?
                    .label(line.metric.header())
                    .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], TOMATO.stroke_width(2)));

                chart
                    .draw_secondary_series(points.iter().map(|p| Circle::new(p.clone(), 4, TOMATO.filled())))
                    .map_err(chart_err)?;
            }

            if self.line.is_some() || !per_category {
                chart
                    .configure_series_labels()
                    .position(SeriesLabelPosition::UpperRight)
                    .background_style(WHITE.mix(0.8))
                    .border_style(BLACK)
                    .draw()
                    .map_err(chart_err)?;
            }

            root.present().map_err(chart_err)?;
        }
        Ok(svg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FilterParams, TenorSelection};
    use crate::types::{Portfolio, PortfolioRecord, Sheet, SheetKind};

    fn row(department: &str, rrr: f64, margin_rrr: f64, pct: Option<f64>) -> PortfolioRecord {
        PortfolioRecord {
            business_unit: "ELEKTRA".to_string(),
            department: department.to_string(),
            tenor_months: Some(6),
            rate_flag: "CON TASA".to_string(),
            capital_balance: Some(1_000_000.0),
            rrr: Some(rrr),
            rrr_with_margin: Some(margin_rrr),
            usgaap90_pct: pct,
            ..Default::default()
        }
    }

    fn view(guard: &ColumnGuard, units: &[&str]) -> FilteredView {
        let portfolio = Portfolio::new(vec![Sheet::new(
            SheetKind::Total,
            "TOTAL CARTERA_resumen",
            vec![
                row("MOTOS", 1.2, 1.4, Some(0.04)),
                row("CELULARES", 2.6, 2.9, Some(0.07)),
                row("LINEA BLANCA", 0.0, 0.5, Some(0.02)),
                row("MUEBLES", 1.9, 2.1, None),
            ],
        )]);
        let params = FilterParams::default()
            .with_business_units(units.iter().copied())
            .with_tenor(TenorSelection::Months(6));
        FilteredView::derive(&portfolio, &params, guard).unwrap()
    }

    #[test]
    fn test_guard_requires_line_but_only_bars_nonzero() {
        let guard = BarLineChart::guard(&[Metric::Rrr], Some(Metric::Usgaap90Pct));
        assert_eq!(guard.required, vec![Metric::Rrr, Metric::Usgaap90Pct]);
        assert_eq!(guard.nonzero, vec![Metric::Rrr]);
    }

    #[test]
    fn test_build_sorts_by_first_bar_metric() {
        let guard = BarLineChart::guard(&[Metric::Rrr], Some(Metric::Usgaap90Pct));
        let chart = BarLineChart::build(
            &view(&guard, &["ELEKTRA"]),
            &[Metric::Rrr],
            Some(Metric::Usgaap90Pct),
        )
        .unwrap();

        // LINEA BLANCA has RRR 0 and MUEBLES lacks the line metric
        assert_eq!(chart.categories, vec!["CELULARES", "MOTOS"]);
        assert_eq!(chart.bars[0].values, vec![2.6, 1.2]);
        assert_eq!(chart.line.as_ref().unwrap().values, vec![Some(0.07), Some(0.04)]);
    }

    #[test]
    fn test_build_without_bar_metrics_is_rejected() {
        let guard = BarLineChart::guard(&[], None);
        let result = BarLineChart::build(&view(&guard, &["ELEKTRA"]), &[], None);
        assert!(matches!(result, Err(CarteraError::Validation(_))));
    }

    #[test]
    fn test_bar_slots_split_the_group() {
        let guard = BarLineChart::guard(&[Metric::Rrr, Metric::RrrWithMargin], None);
        let chart = BarLineChart::build(
            &view(&guard, &["ELEKTRA"]),
            &[Metric::Rrr, Metric::RrrWithMargin],
            None,
        )
        .unwrap();

        let (left0, width) = chart.bar_slot(0);
        let (left1, _) = chart.bar_slot(1);
        assert!((width - 0.4).abs() < 1e-12);
        assert!((left0 - 0.1).abs() < 1e-12);
        assert!((left1 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_render_svg_annotates_bars() {
        let guard = BarLineChart::guard(&[Metric::Rrr], Some(Metric::Usgaap90Pct));
        let chart = BarLineChart::build(
            &view(&guard, &["ELEKTRA"]),
            &[Metric::Rrr],
            Some(Metric::Usgaap90Pct),
        )
        .unwrap();
        let svg = chart.render_svg(&ChartSettings::default()).unwrap();

        assert!(svg.contains("2.6x"));
        assert!(svg.contains("1.2x"));
        assert!(svg.contains("CELULARES"));
        assert!(svg.contains("<rect"));
    }

    #[test]
    fn test_render_svg_grouped_bars_label_every_department() {
        let metrics = [Metric::Rrr, Metric::RrrWithMargin];
        let guard = BarLineChart::guard(&metrics, Some(Metric::Usgaap90Pct));
        let chart = BarLineChart::build(&view(&guard, &["ELEKTRA"]), &metrics, Some(Metric::Usgaap90Pct)).unwrap();
        let svg = chart.render_svg(&ChartSettings::default()).unwrap();

        for label in ["CELULARES", "MOTOS", "2.6x", "2.9x", "1.2x", "1.4x"] {
            assert!(svg.contains(label), "missing {}", label);
        }
        assert!(svg.contains(Metric::RrrWithMargin.header()));
        assert!(svg.contains(Metric::Usgaap90Pct.header()));
    }

    #[test]
    fn test_render_svg_single_department() {
        let chart = BarLineChart {
            title: "RRR by department".to_string(),
            categories: vec!["MOTOS".to_string()],
            bars: vec![BarSeries {
                metric: Metric::Rrr,
                values: vec![1.2],
            }],
            line: None,
            empty_state: None,
        };
        let svg = chart.render_svg(&ChartSettings::default()).unwrap();
        assert!(svg.contains("MOTOS"));
        assert!(svg.contains("1.2x"));
        assert!(svg.contains("<rect"));
    }

    #[test]
    fn test_empty_view_renders_message() {
        let guard = BarLineChart::guard(&[Metric::Rrr], None);
        let chart = BarLineChart::build(&view(&guard, &["BANCO"]), &[Metric::Rrr], None).unwrap();
        assert_eq!(chart.empty_state, Some(EmptyState::NoMatchingRows));

        let svg = chart.render_svg(&ChartSettings::default()).unwrap();
        assert!(svg.contains(EmptyState::NoMatchingRows.message()));
    }
}
