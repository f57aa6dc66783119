//! Plot-side state: samples, annotation points and the hover/selection markers.
//!
//! Rasterizing the chart is left to the front end; this module only decides
//! what to draw.

use vxt_service::XyzSeries;

use crate::color_map::{Color, ZDomain, color_in};
use crate::constants::colors;

/// One point of the timeseries projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    pub timestamp: f64,
    pub y: f64,
    pub z: Option<f64>,
}

/// Zip an `{x, y, z}` projection into samples. Rows without a finite y are dropped.
pub fn samples_from_series(series: &XyzSeries) -> Vec<TimeSample> {
    series
        .x
        .iter()
        .enumerate()
        .filter_map(|(i, &timestamp)| {
            let y = series.y.get(i).copied().flatten().filter(|y| y.is_finite())?;
            let z = series.z.get(i).copied().flatten();
            timestamp.is_finite().then_some(TimeSample { timestamp, y, z })
        })
        .collect()
}

/// Which interaction a vertical marker line stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// Transient preview under the pointer
    Hover,
    /// The selected timestamp
    Selected,
}

/// A vertical line at `x` spanning the current y range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerLine {
    pub kind: MarkerKind,
    pub x: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub color: Color,
    pub dashed: bool,
}

/// A plotted point with its resolved color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotPoint {
    pub timestamp: f64,
    pub y: f64,
    pub color: Color,
}

const HOVER_COLOR: Color = Color::new(0.55, 0.55, 0.55, 1.0);
const SELECTED_COLOR: Color = Color::new(0.9, 0.1, 0.1, 1.0);

#[derive(Debug, Clone, Default)]
pub struct PlotState {
    samples: Vec<TimeSample>,
    annotation_points: Vec<TimeSample>,
    hover: Option<f64>,
    selected: Option<f64>,
}

impl PlotState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_series(&mut self, series: &XyzSeries) {
        self.samples = samples_from_series(series);
        log::debug!("Plot series: {} samples ({} rows)", self.samples.len(), series.len());
    }

    pub fn set_annotation_points(&mut self, series: &XyzSeries) {
        self.annotation_points = samples_from_series(series);
    }

    /// Drop all data, e.g. when the sequence changes. Markers are kept.
    pub fn clear_data(&mut self) {
        self.samples.clear();
        self.annotation_points.clear();
    }

    pub fn samples(&self) -> &[TimeSample] {
        &self.samples
    }

    pub fn annotation_points(&self) -> &[TimeSample] {
        &self.annotation_points
    }

    pub fn hover(&mut self, x: f64) {
        self.hover = Some(x);
    }

    pub fn unhover(&mut self) {
        self.hover = None;
    }

    pub fn hovered(&self) -> Option<f64> {
        self.hover
    }

    /// Move the selection marker, replacing the previous one.
    pub fn select(&mut self, x: f64) {
        self.selected = Some(x);
    }

    pub fn selected(&self) -> Option<f64> {
        self.selected
    }

    /// Y extent of everything plotted; `(0, 1)` when empty, padded when flat.
    pub fn y_range(&self) -> (f64, f64) {
        let mut ys = self.samples.iter().chain(&self.annotation_points).map(|s| s.y);
        let Some(first) = ys.next() else {
            return (0.0, 1.0);
        };
        let (min, max) = ys.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y)));
        if min == max {
            (min - 0.5, max + 0.5)
        } else {
            (min, max)
        }
    }

    /// z values of the plotted samples, for the shared color domain.
    pub fn z_values(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.samples.iter().map(|s| s.z)
    }

    /// Samples colored in `domain`.
    pub fn points(&self, domain: Option<ZDomain>) -> Vec<PlotPoint> {
        let fallback = Color::from_array(colors::DETECTION);
        self.samples
            .iter()
            .map(|s| PlotPoint {
                timestamp: s.timestamp,
                y: s.y,
                color: color_in(domain, s.z, fallback),
            })
            .collect()
    }

    /// Annotation points, all in the annotation point color.
    pub fn annotation_dots(&self) -> Vec<PlotPoint> {
        let color = Color::from_array(colors::ANNOTATION_POINT);
        self.annotation_points
            .iter()
            .map(|s| PlotPoint {
                timestamp: s.timestamp,
                y: s.y,
                color,
            })
            .collect()
    }

    /// Marker lines to draw: the selection first, then the hover preview on top.
    pub fn markers(&self) -> Vec<MarkerLine> {
        let (y_min, y_max) = self.y_range();
        let selected = self.selected.map(|x| MarkerLine {
            kind: MarkerKind::Selected,
            x,
            y_min,
            y_max,
            color: SELECTED_COLOR,
            dashed: false,
        });
        let hover = self.hover.map(|x| MarkerLine {
            kind: MarkerKind::Hover,
            x,
            y_min,
            y_max,
            color: HOVER_COLOR,
            dashed: true,
        });
        selected.into_iter().chain(hover).collect()
    }
}
