use rand::Rng;
use serde::Serialize;

use crate::error::ChartResult;
use crate::palette::{with_alpha, ColorAllocator};
use crate::value::{CellValue, Record};

pub const BORDER_WIDTH: u32 = 2;
pub const BACKGROUND_ALPHA: f64 = 0.7;

/// One plottable `{x, y}` point of a time series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub x: CellValue,
    pub y: CellValue,
}

/// Series values: scalars aligned with chart labels, or explicit points.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SeriesData {
    Values(Vec<CellValue>),
    Points(Vec<Point>),
}

impl SeriesData {
    pub fn len(&self) -> usize {
        match self {
            SeriesData::Values(v) => v.len(),
            SeriesData::Points(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named, colored chart dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub label: String,
    pub data: SeriesData,
    pub border_color: String,
    pub border_width: u32,
    pub background_color: String,
    pub fill: bool,
    pub hidden: bool,
}

/// Payload handed to the chart renderer.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ChartData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<CellValue>>,
    pub datasets: Vec<Series>,
}

/// Build a series whose background is `color` at reduced opacity.
pub fn build_series(
    data: SeriesData,
    label: impl Into<String>,
    color: String,
) -> ChartResult<Series> {
    build_series_with_alpha(data, label, color, BACKGROUND_ALPHA)
}

pub fn build_series_with_alpha(
    data: SeriesData,
    label: impl Into<String>,
    color: String,
    background_alpha: f64,
) -> ChartResult<Series> {
    let background_color = with_alpha(&color, background_alpha)?;
    Ok(Series {
        label: label.into(),
        data,
        border_color: color,
        border_width: BORDER_WIDTH,
        background_color,
        fill: false,
        hidden: false,
    })
}

/// `{x, y}` points from the named fields of each record.
pub fn points(records: &[Record], x: &str, y: &str) -> Vec<Point> {
    records
        .iter()
        .map(|r| Point {
            x: r.get(x).clone(),
            y: r.get(y).clone(),
        })
        .collect()
}

/// Values of one field, in record order.
pub fn column(records: &[Record], field: &str) -> Vec<CellValue> {
    records.iter().map(|r| r.get(field).clone()).collect()
}

/// Partition records by their legend value into `{x, y}` point lists.
///
/// Groups appear in first-seen order of their legend value.
pub fn group_by_legend(
    records: &[Record],
    x: &str,
    y: &str,
    legend: &str,
) -> Vec<(CellValue, Vec<Point>)> {
    let mut groups: Vec<(CellValue, Vec<Point>)> = Vec::new();

    for record in records {
        let key = record.get(legend);
        let point = Point {
            x: record.get(x).clone(),
            y: record.get(y).clone(),
        };
        match groups.iter_mut().find(|(k, _)| *k == *key) {
            Some((_, points)) => points.push(point),
            None => groups.push((key.clone(), vec![point])),
        }
    }

    groups
}

/// One series per legend group, each drawing its own color from the front
/// of the palette. Blank legend values fall back to `default_label`.
pub fn legend_series<R: Rng>(
    groups: Vec<(CellValue, Vec<Point>)>,
    default_label: &str,
    background_alpha: f64,
    colors: &mut ColorAllocator<R>,
) -> ChartResult<Vec<Series>> {
    groups
        .into_iter()
        .map(|(legend, points)| {
            let label = if legend.is_blank() {
                default_label.to_string()
            } else {
                legend.key_text()
            };
            build_series_with_alpha(
                SeriesData::Points(points),
                label,
                colors.pick_color(false),
                background_alpha,
            )
        })
        .collect()
}
