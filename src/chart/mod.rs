//! SVG chart rendering
//!
//! Charts are prepared from a [`crate::core::FilteredView`] into plain data
//! (points, bars, labels) and only then drawn, so the preparation can be
//! tested without parsing SVG.

mod bar_line;
mod scatter;

pub use bar_line::{BarLineChart, BarSeries, LineOverlay};
pub use scatter::{ScatterChart, ScatterPoint};

use crate::config::ChartSettings;
use crate::error::{CarteraError, CarteraResult};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

pub const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);
pub const TOMATO: RGBColor = RGBColor(255, 99, 71);

//==============================================================================
// Palettes
//==============================================================================

const VIRIDIS: [(u8, u8, u8); 5] = [
    (0x44, 0x01, 0x54),
    (0x3b, 0x52, 0x8b),
    (0x21, 0x91, 0x8c),
    (0x5e, 0xc9, 0x62),
    (0xfd, 0xe7, 0x25),
];

const MAGMA: [(u8, u8, u8); 5] = [
    (0x00, 0x00, 0x04),
    (0x51, 0x12, 0x7c),
    (0xb7, 0x37, 0x79),
    (0xfc, 0x89, 0x61),
    (0xfc, 0xfd, 0xbf),
];

const BLUES: [(u8, u8, u8); 5] = [
    (0xde, 0xeb, 0xf7),
    (0x9e, 0xca, 0xe1),
    (0x6b, 0xae, 0xd6),
    (0x31, 0x82, 0xbd),
    (0x08, 0x51, 0x9c),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartPalette {
    Viridis,
    Magma,
    Blues,
}

impl ChartPalette {
    fn stops(self) -> &'static [(u8, u8, u8); 5] {
        match self {
            ChartPalette::Viridis => &VIRIDIS,
            ChartPalette::Magma => &MAGMA,
            ChartPalette::Blues => &BLUES,
        }
    }

    /// `n` colours spread evenly along the palette, trimmed at both ends so
    /// the lightest colour stays visible on white.
    pub fn colors(self, n: usize) -> Vec<RGBColor> {
        (0..n)
            .map(|i| {
                let t = if n == 1 {
                    0.5
                } else {
                    0.1 + 0.8 * i as f64 / (n - 1) as f64
                };
                self.at(t)
            })
            .collect()
    }

    /// Linear interpolation between the palette stops, `t` in [0, 1]
    pub fn at(self, t: f64) -> RGBColor {
        let stops = self.stops();
        let scaled = t.clamp(0.0, 1.0) * (stops.len() - 1) as f64;
        let lo = scaled.floor() as usize;
        let hi = (lo + 1).min(stops.len() - 1);
        let frac = scaled - lo as f64;
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
        let (a, b) = (stops[lo], stops[hi]);
        RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
    }
}

impl fmt::Display for ChartPalette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChartPalette::Viridis => "viridis",
            ChartPalette::Magma => "magma",
            ChartPalette::Blues => "blues",
        })
    }
}

impl FromStr for ChartPalette {
    type Err = CarteraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "viridis" => Ok(ChartPalette::Viridis),
            "magma" => Ok(ChartPalette::Magma),
            "blues" => Ok(ChartPalette::Blues),
            other => Err(CarteraError::Validation(format!(
                "Unknown palette '{}'. Expected viridis, magma or blues",
                other
            ))),
        }
    }
}

//==============================================================================
// Shared helpers
//==============================================================================

pub(crate) fn chart_err<E: fmt::Display>(e: E) -> CarteraError {
    CarteraError::Chart(e.to_string())
}

/// Axis range covering `values` with a little breathing room
pub(crate) fn padded_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    let span = max - min;
    let pad = if span == 0.0 {
        (max.abs() * 0.1).max(1.0)
    } else {
        span * 0.08
    };
    (min - pad)..(max + pad)
}

/// An SVG holding only a centred message, used for empty views
pub fn render_message(message: &str, settings: &ChartSettings) -> CarteraResult<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (settings.width, settings.height)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;
        let style = ("sans-serif", 20)
            .into_font()
            .color(&RGBColor(0x55, 0x55, 0x55))
            .pos(Pos::new(HPos::Center, VPos::Center));
        root.draw(&Text::new(
            message.to_string(),
            (settings.width as i32 / 2, settings.height as i32 / 2),
            style,
        ))
        .map_err(chart_err)?;
        root.present().map_err(chart_err)?;
    }
    Ok(svg)
}
