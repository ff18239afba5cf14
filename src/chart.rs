//! Chart sessions: the renderer seam, UI control access, and the
//! datetime/category chart controllers that drive the pipeline.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use tracing::debug;

use crate::aggregate::{aggregate, DateAggregation};
use crate::data::{FieldType, SourceData};
use crate::error::{ChartError, ChartResult};
use crate::filter::{filter, DateRange};
use crate::mapping::FieldMapping;
use crate::palette::ColorAllocator;
use crate::project::project;
use crate::series::{
    build_series_with_alpha, column, group_by_legend, legend_series, points, ChartData, Series,
    SeriesData,
};
use crate::sort::{sort_by_date, sort_by_number, SortDirection};
use crate::timebucket::Granularity;
use crate::ChartOptions;

pub const CATEGORY_CANVAS: &str = "charfield-canvas";
pub const CATEGORY_FIELD_SELECTOR: &str = "charfield-selector";
pub const SORT_DIRECTION_SELECTOR: &str = "sort-direction-selector";
pub const FIRST_DATETIME_START_INPUT: &str = "first-datetime-start-date-input";
pub const FIRST_DATETIME_END_INPUT: &str = "first-datetime-end-date-input";

/// Per-field control suffixes of a datetime chart, e.g. `created-time-unit-selector`.
pub const DATETIME_CONTROL_SUFFIXES: [&str; 4] = [
    "time-unit-selector",
    "legend-selector",
    "start-date-input",
    "end-date-input",
];

pub fn datetime_control_id(field: &str, suffix: &str) -> String {
    format!("{}-{}", field, suffix)
}

pub fn datetime_canvas_id(field: &str) -> String {
    format!("{}-canvas", field)
}

/// Time-axis options of a line chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeAxis {
    pub unit: Granularity,
    pub tooltip_format: String,
    pub display_formats: BTreeMap<String, String>,
}

impl TimeAxis {
    pub fn for_level(level: Granularity) -> Self {
        Self {
            unit: level,
            tooltip_format: level.display_format().to_string(),
            display_formats: Granularity::ALL
                .iter()
                .map(|g| (g.as_str().to_string(), g.display_format().to_string()))
                .collect(),
        }
    }
}

/// A live chart owned by the rendering collaborator.
pub trait ChartHandle {
    fn set_data(&mut self, data: ChartData);
    fn set_time_axis(&mut self, axis: TimeAxis);
    fn datasets_mut(&mut self) -> &mut Vec<Series>;
    /// Redraw with the current data and options.
    fn update(&mut self);
}

/// Constructs charts on named canvases.
pub trait ChartRenderer {
    type Handle: ChartHandle;

    fn line_chart(&mut self, canvas: &str, data: ChartData, axis: TimeAxis) -> Self::Handle;
    fn bar_chart(&mut self, canvas: &str, data: ChartData) -> Self::Handle;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
}

/// A chart handle that keeps the latest payload so it can be written out as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonChart {
    pub kind: ChartKind,
    pub canvas: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_axis: Option<TimeAxis>,
    pub data: ChartData,
    pub revision: u32,
}

impl ChartHandle for JsonChart {
    fn set_data(&mut self, data: ChartData) {
        self.data = data;
    }

    fn set_time_axis(&mut self, axis: TimeAxis) {
        self.time_axis = Some(axis);
    }

    fn datasets_mut(&mut self) -> &mut Vec<Series> {
        &mut self.data.datasets
    }

    fn update(&mut self) {
        self.revision += 1;
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

impl ChartRenderer for JsonRenderer {
    type Handle = JsonChart;

    fn line_chart(&mut self, canvas: &str, data: ChartData, axis: TimeAxis) -> JsonChart {
        JsonChart {
            kind: ChartKind::Line,
            canvas: canvas.to_string(),
            time_axis: Some(axis),
            data,
            revision: 0,
        }
    }

    fn bar_chart(&mut self, canvas: &str, data: ChartData) -> JsonChart {
        JsonChart {
            kind: ChartKind::Bar,
            canvas: canvas.to_string(),
            time_axis: None,
            data,
            revision: 0,
        }
    }
}

/// A rendered chart together with the field mapping it was built from.
#[derive(Debug, Clone)]
pub struct ChartSession<H> {
    pub handle: H,
    pub mapped_attributes: FieldMapping,
}

/// Read access to the page's UI inputs, by element id.
pub trait Controls {
    /// Current value of the element, or `None` when it is not on the page.
    fn value(&self, id: &str) -> Option<&str>;

    fn exists(&self, id: &str) -> bool {
        self.value(id).is_some()
    }
}

/// Control values held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlValues {
    values: HashMap<String, String>,
}

impl ControlValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: impl Into<String>, value: impl Into<String>) {
        self.values.insert(id.into(), value.into());
    }

    pub fn remove(&mut self, id: &str) -> Option<String> {
        self.values.remove(id)
    }

    pub fn apply(&mut self, change: &ControlChange) {
        self.set(change.id.clone(), change.value.clone());
    }

    /// Every element the dashboard expects for `source`, at its initial value.
    pub fn defaults_for(source: &SourceData, options: &ChartOptions) -> Self {
        let mut controls = Self::new();

        for (_, field) in source.datetime_fields() {
            controls.set(datetime_canvas_id(field), "");
            controls.set(
                datetime_control_id(field, "time-unit-selector"),
                options.default_level.as_str(),
            );
            controls.set(datetime_control_id(field, "legend-selector"), "");
            controls.set(datetime_control_id(field, "start-date-input"), "");
            controls.set(datetime_control_id(field, "end-date-input"), "");
        }

        if let Some(index) = source.first_of(&FieldType::CharField) {
            controls.set(CATEGORY_CANVAS, "");
            controls.set(CATEGORY_FIELD_SELECTOR, index.to_string());
            controls.set(SORT_DIRECTION_SELECTOR, "");
            if source.has_type(&FieldType::DateTimeField) {
                controls.set(FIRST_DATETIME_START_INPUT, "");
                controls.set(FIRST_DATETIME_END_INPUT, "");
            }
        }

        controls
    }
}

impl Controls for ControlValues {
    fn value(&self, id: &str) -> Option<&str> {
        self.values.get(id).map(String::as_str)
    }
}

/// A single control change written as `id=value`; the value may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlChange {
    pub id: String,
    pub value: String,
}

impl FromStr for ControlChange {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((id, value)) if !id.trim().is_empty() => Ok(Self {
                id: id.trim().to_string(),
                value: value.trim().to_string(),
            }),
            _ => Err(ChartError::InvalidControlValue {
                id: s.trim().to_string(),
                value: String::new(),
            }),
        }
    }
}

fn require<'a>(controls: &'a dyn Controls, id: &str) -> ChartResult<&'a str> {
    controls
        .value(id)
        .ok_or_else(|| ChartError::MissingUiElement(id.to_string()))
}

fn parse_column(id: &str, value: &str) -> ChartResult<usize> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| ChartError::InvalidControlValue {
            id: id.to_string(),
            value: value.to_string(),
        })
}

fn time_series(
    source: &SourceData,
    mapping: &FieldMapping,
    level: Granularity,
    range: Option<&DateRange>,
    legend: bool,
    options: &ChartOptions,
) -> ChartResult<Vec<Series>> {
    let rows = source.rows()?;
    let reduced = project(rows, mapping);
    let filtered = match range {
        Some(range) => filter(&reduced, None, Some(&vec![("x".to_string(), *range)]))?,
        None => reduced,
    };

    let group_fields: &[&str] = if legend { &["legend"] } else { &[] };
    let aggregated = aggregate(
        &filtered,
        Some("y"),
        group_fields,
        Some(&DateAggregation::new("x", level)),
    )?;
    let sorted = sort_by_date(&aggregated, "x")?;
    debug!(%mapping, rows = rows.len(), points = sorted.len(), %level, "built time series");

    let mut colors = ColorAllocator::new(options.palette.clone());
    if legend {
        let groups = group_by_legend(&sorted, "x", "y", "legend");
        legend_series(groups, &options.series_label, options.background_alpha, &mut colors)
    } else {
        let series = build_series_with_alpha(
            SeriesData::Points(points(&sorted, "x", "y")),
            options.series_label.clone(),
            colors.pick_color(false),
            options.background_alpha,
        )?;
        Ok(vec![series])
    }
}

/// Create the line chart for the datetime column at `field_index`.
pub fn init_datetime_chart<R: ChartRenderer>(
    renderer: &mut R,
    source: &SourceData,
    field_index: usize,
    controls: &dyn Controls,
    options: &ChartOptions,
) -> ChartResult<ChartSession<R::Handle>> {
    let field = source
        .fields
        .get(field_index)
        .ok_or(ChartError::MissingSourceData)?;
    let canvas = datetime_canvas_id(field);
    require(controls, &canvas)?;

    let mapping = FieldMapping::from_pairs([("x", field_index), ("y", source.value_column())]);
    let level = options.default_level;
    let datasets = time_series(source, &mapping, level, None, false, options)?;

    let handle = renderer.line_chart(
        &canvas,
        ChartData {
            labels: None,
            datasets,
        },
        TimeAxis::for_level(level),
    );

    Ok(ChartSession {
        handle,
        mapped_attributes: mapping,
    })
}

/// Rebuild a datetime chart from its time-unit, legend and date-range controls.
pub fn update_datetime_chart<H: ChartHandle>(
    session: &mut ChartSession<H>,
    field: &str,
    source: &SourceData,
    controls: &dyn Controls,
    options: &ChartOptions,
) -> ChartResult<()> {
    let time_unit = require(controls, &datetime_control_id(field, "time-unit-selector"))?;
    let legend_id = datetime_control_id(field, "legend-selector");
    let legend = require(controls, &legend_id)?;
    let start = require(controls, &datetime_control_id(field, "start-date-input"))?;
    let end = require(controls, &datetime_control_id(field, "end-date-input"))?;

    let level = Granularity::parse_or_default(time_unit);
    let mut mapping = session.mapped_attributes.clone();
    let grouped = if legend.is_empty() {
        mapping.remove("legend");
        false
    } else {
        mapping.insert("legend", parse_column(&legend_id, legend)?);
        true
    };

    let range = DateRange::from_inputs(start, end)?;
    let range = (!range.is_unbounded()).then_some(range);
    let datasets = time_series(source, &mapping, level, range.as_ref(), grouped, options)?;

    session.handle.set_time_axis(TimeAxis::for_level(level));
    session.handle.set_data(ChartData {
        labels: None,
        datasets,
    });
    session.mapped_attributes = mapping;
    session.handle.update();
    Ok(())
}

fn category_data(
    source: &SourceData,
    mapping: &FieldMapping,
    range: Option<&DateRange>,
    direction: SortDirection,
    options: &ChartOptions,
) -> ChartResult<ChartData> {
    let rows = source.rows()?;
    let reduced = project(rows, mapping);
    let filtered = match range {
        Some(range) => filter(&reduced, None, Some(&vec![("date".to_string(), *range)]))?,
        None => reduced,
    };
    let aggregated = aggregate(&filtered, Some("value"), &["label"], None)?;
    let sorted = sort_by_number(&aggregated, "value", direction);

    let label_index = mapping.get("label").unwrap_or_default();
    let display_name = source.display_name(label_index).unwrap_or_default();
    let mut colors = ColorAllocator::new(options.palette.clone());
    let series = build_series_with_alpha(
        SeriesData::Values(column(&sorted, "value")),
        format!("{} by {}", options.series_label, display_name),
        colors.pick_color(true),
        options.background_alpha,
    )?;

    Ok(ChartData {
        labels: Some(column(&sorted, "label")),
        datasets: vec![series],
    })
}

/// Create the bar chart summing the measure per value of the first text column.
pub fn init_category_chart<R: ChartRenderer>(
    renderer: &mut R,
    source: &SourceData,
    controls: &dyn Controls,
    options: &ChartOptions,
) -> ChartResult<ChartSession<R::Handle>> {
    require(controls, CATEGORY_CANVAS)?;
    let label_index = source
        .first_of(&FieldType::CharField)
        .ok_or(ChartError::MissingSourceData)?;

    let mapping =
        FieldMapping::from_pairs([("label", label_index), ("value", source.value_column())]);
    let data = category_data(source, &mapping, None, SortDirection::Unsorted, options)?;
    let handle = renderer.bar_chart(CATEGORY_CANVAS, data);

    Ok(ChartSession {
        handle,
        mapped_attributes: mapping,
    })
}

/// Rebuild the bar chart from the field selector, sort direction and the
/// first datetime chart's date inputs.
pub fn update_category_chart<H: ChartHandle>(
    session: &mut ChartSession<H>,
    source: &SourceData,
    controls: &dyn Controls,
    options: &ChartOptions,
) -> ChartResult<()> {
    let field = require(controls, CATEGORY_FIELD_SELECTOR)?;
    let direction: SortDirection = require(controls, SORT_DIRECTION_SELECTOR)?.parse()?;
    let start = controls.value(FIRST_DATETIME_START_INPUT).unwrap_or_default();
    let end = controls.value(FIRST_DATETIME_END_INPUT).unwrap_or_default();

    let mut mapping = session.mapped_attributes.clone();
    mapping.insert("label", parse_column(CATEGORY_FIELD_SELECTOR, field)?);

    let range = DateRange::from_inputs(start, end)?;
    let date_column = source.first_of(&FieldType::DateTimeField);
    let range = match date_column {
        Some(index) if !range.is_unbounded() => {
            mapping.insert("date", index);
            Some(range)
        }
        _ => {
            mapping.remove("date");
            None
        }
    };

    let data = category_data(source, &mapping, range.as_ref(), direction, options)?;
    session.handle.set_data(data);
    session.mapped_attributes = mapping;
    session.handle.update();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CellValue;
    use serde_json::json;

    fn source() -> SourceData {
        SourceData::from_json(&json!({
            "fields": ["created", "kind", "team", "count"],
            "fieldtypes": ["DateTimeField", "CharField", "CharField", "IntegerField"],
            "displaynames": ["Created", "Kind", "Team", "Count"],
            "dataset": [
                ["2024-01-01T09:00:00Z", "web", "red", 2],
                ["2024-01-01T15:00:00Z", "api", "blue", 3],
                ["2024-01-02T10:00:00Z", "web", "red", 4],
                ["2024-01-03T10:00:00Z", "web", "blue", 1]
            ]
        }))
        .unwrap()
    }

    fn point_ys(series: &Series) -> Vec<f64> {
        match &series.data {
            SeriesData::Points(points) => points.iter().map(|p| p.y.as_number()).collect(),
            SeriesData::Values(values) => values.iter().map(CellValue::as_number).collect(),
        }
    }

    fn datetime_session() -> (ChartSession<JsonChart>, ControlValues, ChartOptions, SourceData) {
        let source = source();
        let options = ChartOptions::default();
        let controls = ControlValues::defaults_for(&source, &options);
        let session =
            init_datetime_chart(&mut JsonRenderer, &source, 0, &controls, &options).unwrap();
        (session, controls, options, source)
    }

    #[test]
    fn test_time_axis_for_level() {
        let axis = TimeAxis::for_level(Granularity::Month);
        assert_eq!(axis.tooltip_format, "yyyy MMM");
        assert_eq!(axis.display_formats.len(), 4);
        assert_eq!(axis.display_formats["hour"], "yyyy MMM d HH:00");
    }

    #[test]
    fn test_init_datetime_chart_sums_per_day() {
        let (session, _, _, _) = datetime_session();
        let chart = &session.handle;
        assert_eq!(chart.kind, ChartKind::Line);
        assert_eq!(chart.canvas, "created-canvas");
        assert_eq!(chart.data.datasets.len(), 1);
        assert_eq!(chart.data.datasets[0].label, "Activity Events");
        assert_eq!(chart.data.datasets[0].border_color, "rgba(30, 144, 255, 1)");
        assert_eq!(point_ys(&chart.data.datasets[0]), vec![5.0, 4.0, 1.0]);
        assert_eq!(session.mapped_attributes.to_string(), "x=0,y=3");
    }

    #[test]
    fn test_init_datetime_chart_missing_canvas() {
        let source = source();
        let options = ChartOptions::default();
        let controls = ControlValues::new();
        let err =
            init_datetime_chart(&mut JsonRenderer, &source, 0, &controls, &options).unwrap_err();
        assert_eq!(err, ChartError::MissingUiElement("created-canvas".to_string()));
    }

    #[test]
    fn test_update_datetime_with_legend_and_month() {
        let (mut session, mut controls, options, source) = datetime_session();
        controls.set("created-legend-selector", "1");
        controls.set("created-time-unit-selector", "month");

        update_datetime_chart(&mut session, "created", &source, &controls, &options).unwrap();

        let chart = &session.handle;
        assert_eq!(chart.revision, 1);
        assert_eq!(chart.time_axis.as_ref().unwrap().unit, Granularity::Month);
        let labels: Vec<&str> = chart.data.datasets.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["web", "api"]);
        assert_eq!(point_ys(&chart.data.datasets[0]), vec![7.0]);
        assert_eq!(chart.data.datasets[1].border_color, "rgba(255, 20, 147, 1)");
        assert_eq!(session.mapped_attributes.get("legend"), Some(1));

        controls.set("created-legend-selector", "");
        update_datetime_chart(&mut session, "created", &source, &controls, &options).unwrap();
        assert!(!session.mapped_attributes.contains("legend"));
        assert_eq!(session.handle.data.datasets.len(), 1);
    }

    #[test]
    fn test_update_datetime_date_range() {
        let (mut session, mut controls, options, source) = datetime_session();
        controls.set("created-start-date-input", "2024-01-02");
        controls.set("created-end-date-input", "2024-01-02");

        update_datetime_chart(&mut session, "created", &source, &controls, &options).unwrap();
        assert_eq!(point_ys(&session.handle.data.datasets[0]), vec![4.0]);
    }

    #[test]
    fn test_update_datetime_missing_control_aborts() {
        let (mut session, mut controls, options, source) = datetime_session();
        controls.remove("created-legend-selector");

        let err = update_datetime_chart(&mut session, "created", &source, &controls, &options)
            .unwrap_err();
        assert_eq!(err, ChartError::MissingUiElement("created-legend-selector".to_string()));
        assert_eq!(session.handle.revision, 0);
    }

    #[test]
    fn test_init_category_chart() {
        let source = source();
        let options = ChartOptions::default();
        let controls = ControlValues::defaults_for(&source, &options);
        let session = init_category_chart(&mut JsonRenderer, &source, &controls, &options).unwrap();

        let chart = &session.handle;
        assert_eq!(chart.kind, ChartKind::Bar);
        assert_eq!(
            chart.data.labels,
            Some(vec![CellValue::from("web"), CellValue::from("api")])
        );
        assert_eq!(chart.data.datasets[0].label, "Activity Events by Kind");
        assert_eq!(chart.data.datasets[0].border_color, "rgba(255, 99, 132, 1)");
        assert_eq!(point_ys(&chart.data.datasets[0]), vec![7.0, 3.0]);
    }

    #[test]
    fn test_update_category_chart_field_sort_and_dates() {
        let source = source();
        let options = ChartOptions::default();
        let mut controls = ControlValues::defaults_for(&source, &options);
        let mut session =
            init_category_chart(&mut JsonRenderer, &source, &controls, &options).unwrap();

        controls.set(CATEGORY_FIELD_SELECTOR, "2");
        controls.set(SORT_DIRECTION_SELECTOR, "Ascending");
        update_category_chart(&mut session, &source, &controls, &options).unwrap();
        assert_eq!(
            session.handle.data.labels,
            Some(vec![CellValue::from("blue"), CellValue::from("red")])
        );
        assert_eq!(point_ys(&session.handle.data.datasets[0]), vec![4.0, 6.0]);
        assert_eq!(session.handle.data.datasets[0].label, "Activity Events by Team");
        assert!(!session.mapped_attributes.contains("date"));

        controls.set(FIRST_DATETIME_START_INPUT, "2024-01-02");
        update_category_chart(&mut session, &source, &controls, &options).unwrap();
        assert_eq!(session.mapped_attributes.get("date"), Some(0));
        assert_eq!(point_ys(&session.handle.data.datasets[0]), vec![1.0, 4.0]);
    }

    #[test]
    fn test_update_category_rejects_bad_selector() {
        let source = source();
        let options = ChartOptions::default();
        let mut controls = ControlValues::defaults_for(&source, &options);
        let mut session =
            init_category_chart(&mut JsonRenderer, &source, &controls, &options).unwrap();

        controls.set(CATEGORY_FIELD_SELECTOR, "kind");
        let err = update_category_chart(&mut session, &source, &controls, &options).unwrap_err();
        assert!(matches!(err, ChartError::InvalidControlValue { .. }));
    }

    #[test]
    fn test_missing_source_rows() {
        let mut source = source();
        source.dataset = None;
        let options = ChartOptions::default();
        let controls = ControlValues::defaults_for(&source, &options);
        let err = init_category_chart(&mut JsonRenderer, &source, &controls, &options).unwrap_err();
        assert_eq!(err, ChartError::MissingSourceData);
    }

    #[test]
    fn test_control_change_from_str() {
        let change: ControlChange = " created-legend-selector = 1 ".parse().unwrap();
        assert_eq!(change.id, "created-legend-selector");
        assert_eq!(change.value, "1");

        let cleared: ControlChange = "sort-direction-selector=".parse().unwrap();
        assert_eq!(cleared.value, "");

        assert!("novalue".parse::<ControlChange>().is_err());
        assert!("=1".parse::<ControlChange>().is_err());

        let mut controls = ControlValues::new();
        controls.apply(&change);
        assert_eq!(controls.value("created-legend-selector"), Some("1"));
    }
}
