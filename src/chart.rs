// src/chart.rs
use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::Serialize;

use crate::config::{BIN_RANGE, DEFAULT_BINS};
use crate::data_types::{Cell, Column, ColumnKind, Dataset};
use crate::error::ChartError;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
    Histogram,
    Scatter,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [
        ChartKind::Line,
        ChartKind::Bar,
        ChartKind::Histogram,
        ChartKind::Scatter,
    ];
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChartKind::Line => "Line Chart",
            ChartKind::Bar => "Bar Chart",
            ChartKind::Histogram => "Histogram",
            ChartKind::Scatter => "Scatter Plot",
        };
        f.write_str(label)
    }
}

/// Entry of the optional color picker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ColorChoice {
    #[default]
    None,
    Column(String),
}

impl fmt::Display for ColorChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorChoice::None => f.write_str("None"),
            ColorChoice::Column(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub kind: ChartKind,
    pub x: Option<String>,
    pub y: Option<String>,
    pub histogram_column: Option<String>,
    pub color: ColorChoice,
    pub bins: u32,
    pub show_stats: bool,
}

impl Default for Selection {
    fn default() -> Self {
        Selection {
            kind: ChartKind::default(),
            x: None,
            y: None,
            histogram_column: None,
            color: ColorChoice::None,
            bins: DEFAULT_BINS,
            show_stats: false,
        }
    }
}

/// Option lists for the pickers shown with the current chart kind.
///
/// Lists belonging to pickers that the kind does not show are left empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PickerOptions {
    pub x: Vec<String>,
    pub y: Vec<String>,
    pub histogram: Vec<String>,
    pub color: Vec<ColorChoice>,
}

impl PickerOptions {
    pub fn for_dataset(dataset: &Dataset, kind: ChartKind) -> Self {
        let numeric = dataset.numeric_column_names();

        match kind {
            ChartKind::Line | ChartKind::Bar => PickerOptions {
                x: dataset.column_names(),
                y: numeric,
                ..Default::default()
            },
            ChartKind::Histogram => PickerOptions {
                histogram: numeric,
                ..Default::default()
            },
            ChartKind::Scatter => {
                let color = std::iter::once(ColorChoice::None)
                    .chain(dataset.column_names().into_iter().map(ColorChoice::Column))
                    .collect();
                PickerOptions {
                    x: numeric.clone(),
                    y: numeric,
                    color,
                    ..Default::default()
                }
            }
        }
    }
}

fn keep_or_first(current: &mut Option<String>, options: &[String]) {
    let still_offered = current
        .as_ref()
        .map_or(false, |name| options.contains(name));
    if !still_offered {
        *current = options.first().cloned();
    }
}

impl Selection {
    /// Keeps each choice that is still offered and falls back to the first option otherwise.
    pub fn reconcile(&mut self, options: &PickerOptions) {
        match self.kind {
            ChartKind::Line | ChartKind::Bar | ChartKind::Scatter => {
                keep_or_first(&mut self.x, &options.x);
                keep_or_first(&mut self.y, &options.y);
            }
            ChartKind::Histogram => keep_or_first(&mut self.histogram_column, &options.histogram),
        }
        if self.kind == ChartKind::Scatter && !options.color.contains(&self.color) {
            self.color = ColorChoice::None;
        }
    }

    /// Turns the selection into a fully specified chart configuration.
    pub fn resolve(&self) -> Result<ChartConfig, ChartError> {
        let numeric = |pick: &Option<String>| pick.clone().ok_or(ChartError::NoNumericColumns(self.kind));

        let config = match self.kind {
            ChartKind::Line => ChartConfig::Line {
                x: self.x.clone().ok_or(ChartError::NoColumns)?,
                y: numeric(&self.y)?,
            },
            ChartKind::Bar => ChartConfig::Bar {
                x: self.x.clone().ok_or(ChartError::NoColumns)?,
                y: numeric(&self.y)?,
            },
            ChartKind::Histogram => {
                if !BIN_RANGE.contains(&self.bins) {
                    return Err(ChartError::BinsOutOfRange(self.bins));
                }
                ChartConfig::Histogram {
                    column: numeric(&self.histogram_column)?,
                    bins: self.bins,
                }
            }
            ChartKind::Scatter => ChartConfig::Scatter {
                x: numeric(&self.x)?,
                y: numeric(&self.y)?,
                color: match &self.color {
                    ColorChoice::None => None,
                    ColorChoice::Column(name) => Some(name.clone()),
                },
            },
        };
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartConfig {
    Line { x: String, y: String },
    Bar { x: String, y: String },
    Histogram { column: String, bins: u32 },
    Scatter { x: String, y: String, color: Option<String> },
}

impl ChartConfig {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartConfig::Line { .. } => ChartKind::Line,
            ChartConfig::Bar { .. } => ChartKind::Bar,
            ChartConfig::Histogram { .. } => ChartKind::Histogram,
            ChartConfig::Scatter { .. } => ChartKind::Scatter,
        }
    }

    pub fn title(&self) -> String {
        match self {
            ChartConfig::Line { x, y } => format!("{y} vs {x}"),
            ChartConfig::Bar { x, y } => format!("{y} by {x}"),
            ChartConfig::Histogram { column, .. } => format!("Histogram of {column}"),
            ChartConfig::Scatter { x, y, color: None } => format!("{y} vs {x}"),
            ChartConfig::Scatter { x, y, color: Some(color) } => format!("{y} vs {x} by {color}"),
        }
    }
}

/// How x positions map back to labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Axis {
    Linear,
    /// Milliseconds since the Unix epoch.
    Temporal,
    /// Position `i` is `categories[i]`.
    Categorical { categories: Vec<String> },
}

impl Axis {
    pub fn format(&self, value: f64) -> String {
        match self {
            Axis::Linear => format_number(value),
            Axis::Temporal => format_timestamp(value),
            Axis::Categorical { categories } => {
                let index = value.round();
                if index < 0.0 {
                    return String::new();
                }
                categories.get(index as usize).cloned().unwrap_or_default()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    /// Source row in the dataset.
    pub row: usize,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub label: String,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScatterColor {
    Uniform,
    /// One group per distinct value of `column`.
    Discrete { column: String },
    /// `values[i]` shades `groups[0].points[i]`.
    Continuous {
        column: String,
        min: f64,
        max: f64,
        values: Vec<Option<f64>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Marks {
    Line { points: Vec<Point> },
    Bar { points: Vec<Point> },
    Histogram { bins: Vec<Bin> },
    Scatter { groups: Vec<Group>, color: ScatterColor },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub config: ChartConfig,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x_axis: Axis,
    pub marks: Marks,
}

/// Picker options and the chart (or the reason there is none) for one dataset and selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared {
    pub options: PickerOptions,
    pub selection: Selection,
    pub chart: Result<ChartSpec, ChartError>,
}

pub fn prepare(dataset: &Dataset, selection: &Selection) -> Prepared {
    let options = PickerOptions::for_dataset(dataset, selection.kind);
    let mut selection = selection.clone();
    selection.reconcile(&options);

    let chart = selection
        .resolve()
        .and_then(|config| build_chart(dataset, &config));

    Prepared {
        options,
        selection,
        chart,
    }
}

fn column<'a>(dataset: &'a Dataset, name: &str) -> Result<&'a Column, ChartError> {
    dataset
        .column(name)
        .ok_or_else(|| ChartError::UnknownColumn(name.to_string()))
}

fn numeric_column<'a>(dataset: &'a Dataset, name: &str) -> Result<&'a Column, ChartError> {
    let column = column(dataset, name)?;
    if column.is_numeric() {
        Ok(column)
    } else {
        Err(ChartError::NotNumeric(name.to_string()))
    }
}

pub fn build_chart(dataset: &Dataset, config: &ChartConfig) -> Result<ChartSpec, ChartError> {
    let title = config.title();

    let spec = match config {
        ChartConfig::Line { x, y } | ChartConfig::Bar { x, y } => {
            let x_column = column(dataset, x)?;
            let y_column = numeric_column(dataset, y)?;
            let (x_axis, xs) = x_positions(x_column);
            let points = pair_points(&xs, &y_column.numbers());
            let marks = if config.kind() == ChartKind::Line {
                Marks::Line { points }
            } else {
                Marks::Bar { points }
            };
            ChartSpec {
                config: config.clone(),
                title,
                x_label: x.clone(),
                y_label: y.clone(),
                x_axis,
                marks,
            }
        }
        ChartConfig::Histogram { column: name, bins } => {
            if !BIN_RANGE.contains(bins) {
                return Err(ChartError::BinsOutOfRange(*bins));
            }
            let values: Vec<f64> = numeric_column(dataset, name)?
                .numbers()
                .into_iter()
                .flatten()
                .collect();
            ChartSpec {
                config: config.clone(),
                title,
                x_label: name.clone(),
                y_label: "count".to_string(),
                x_axis: Axis::Linear,
                marks: Marks::Histogram {
                    bins: histogram(&values, *bins),
                },
            }
        }
        ChartConfig::Scatter { x, y, color } => {
            let xs = numeric_column(dataset, x)?.numbers();
            let ys = numeric_column(dataset, y)?.numbers();
            let points = pair_points(&xs, &ys);
            let (groups, color) = match color {
                None => (
                    vec![Group {
                        label: y.clone(),
                        points,
                    }],
                    ScatterColor::Uniform,
                ),
                Some(name) => color_points(column(dataset, name)?, points),
            };
            ChartSpec {
                config: config.clone(),
                title,
                x_label: x.clone(),
                y_label: y.clone(),
                x_axis: Axis::Linear,
                marks: Marks::Scatter { groups, color },
            }
        }
    };
    Ok(spec)
}

fn pair_points(xs: &[Option<f64>], ys: &[Option<f64>]) -> Vec<Point> {
    xs.iter()
        .zip(ys)
        .enumerate()
        .filter_map(|(row, (x, y))| Some(Point { row, x: (*x)?, y: (*y)? }))
        .collect()
}

fn color_points(color_column: &Column, points: Vec<Point>) -> (Vec<Group>, ScatterColor) {
    let name = color_column.name.clone();

    if color_column.is_numeric() {
        let shades = color_column.numbers();
        let values: Vec<Option<f64>> = points.iter().map(|p| shades[p.row]).collect();
        let (min, max) = values
            .iter()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
        let (min, max) = if min <= max { (min, max) } else { (0.0, 0.0) };
        let group = Group {
            label: name.clone(),
            points,
        };
        return (
            vec![group],
            ScatterColor::Continuous {
                column: name,
                min,
                max,
                values,
            },
        );
    }

    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for point in points {
        let cell = &color_column.cells[point.row];
        if cell.is_missing() {
            continue;
        }
        let label = cell.to_string();
        let slot = *index.entry(label.clone()).or_insert_with(|| {
            groups.push(Group {
                label,
                points: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].points.push(point);
    }

    (groups, ScatterColor::Discrete { column: name })
}

// Numbers stay linear, date text becomes temporal, anything else is categorical.
fn x_positions(column: &Column) -> (Axis, Vec<Option<f64>>) {
    if column.is_numeric() {
        return (Axis::Linear, column.numbers());
    }

    if column.kind == ColumnKind::Text {
        let stamps: Vec<Option<Option<i64>>> = column
            .cells
            .iter()
            .map(|cell| match cell {
                Cell::Missing => Some(None),
                Cell::Text(s) => parse_timestamp(s).map(Some),
                _ => None,
            })
            .collect();
        let all_dates = stamps.iter().all(Option::is_some);
        let any_present = stamps.iter().any(|s| matches!(s, Some(Some(_))));
        if all_dates && any_present {
            let xs = stamps
                .into_iter()
                .map(|s| s.flatten().map(|ms| ms as f64))
                .collect();
            return (Axis::Temporal, xs);
        }
    }

    let mut categories: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let xs = column
        .cells
        .iter()
        .map(|cell| {
            if cell.is_missing() {
                return None;
            }
            let label = cell.to_string();
            let position = *index.entry(label.clone()).or_insert_with(|| {
                categories.push(label);
                categories.len() - 1
            });
            Some(position as f64)
        })
        .collect();

    (Axis::Categorical { categories }, xs)
}

/// Milliseconds since the epoch for a date or date-time string.
pub fn parse_timestamp(value: &str) -> Option<i64> {
    let value = value.trim();
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp_millis());
        }
    }
    None
}

pub fn format_timestamp(millis: f64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(millis.round() as i64) {
        Some(dt) if dt.num_seconds_from_midnight() == 0 => dt.format("%Y-%m-%d").to_string(),
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => format_number(millis),
    }
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else if value.abs() >= 1e6 || (value != 0.0 && value.abs() < 1e-3) {
        format!("{value:.3e}")
    } else {
        let text = format!("{value:.4}");
        let text = text.trim_end_matches('0').trim_end_matches('.');
        if text == "-0" {
            "0".to_string()
        } else {
            text.to_string()
        }
    }
}

/// Counts finite values into exactly `bins` equal-width bins; the last bin is closed on the right.
pub fn histogram(values: &[f64], bins: u32) -> Vec<Bin> {
    let bins = bins.max(1) as usize;
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));

    let (start, end) = if min > max {
        (0.0, 1.0)
    } else if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };
    let width = (end - start) / bins as f64;

    let mut counts = vec![0usize; bins];
    for value in values.iter().filter(|v| v.is_finite()) {
        let slot = ((value - start) / width).floor();
        let slot = if slot < 0.0 { 0 } else { (slot as usize).min(bins - 1) };
        counts[slot] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| Bin {
            start: start + width * i as f64,
            end: if i + 1 == bins { end } else { start + width * (i + 1) as f64 },
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_handler::CSVHandler;
    use pretty_assertions::assert_eq;

    fn load(text: &str) -> Dataset {
        CSVHandler::parse_bytes(text.as_bytes()).expect("test csv parses")
    }

    fn sales() -> Dataset {
        let mut text = String::from("date,sales\n");
        for day in 1..=10 {
            text.push_str(&format!("2024-03-{day:02},{}\n", day * 10));
        }
        load(&text)
    }

    fn iris() -> Dataset {
        load(
            "sepal,petal,species,size\n\
             5.1,1.4,setosa,3\n\
             4.9,1.5,setosa,1\n\
             6.3,4.9,virginica,5\n\
             5.8,,versicolor,2\n",
        )
    }

    fn selection(kind: ChartKind) -> Selection {
        Selection {
            kind,
            ..Selection::default()
        }
    }

    #[test]
    fn line_chart_of_sales_over_dates() {
        let ds = sales();
        let mut sel = selection(ChartKind::Line);
        sel.x = Some("date".into());
        sel.y = Some("sales".into());

        let prepared = prepare(&ds, &sel);
        assert_eq!(prepared.options.y, vec!["sales".to_string()]);
        assert_eq!(prepared.options.x, vec!["date".to_string(), "sales".to_string()]);

        let chart = prepared.chart.expect("line chart");
        assert_eq!(chart.title, "sales vs date");
        assert_eq!(chart.x_axis, Axis::Temporal);
        match chart.marks {
            Marks::Line { points } => {
                assert_eq!(points.len(), 10);
                assert_eq!(points[0].y, 10.0);
                assert!(points.windows(2).all(|w| w[0].x < w[1].x));
            }
            other => panic!("expected line marks, got {other:?}"),
        }
    }

    #[test]
    fn defaults_pick_first_offered_columns() {
        let prepared = prepare(&sales(), &selection(ChartKind::Bar));
        assert_eq!(prepared.selection.x.as_deref(), Some("date"));
        assert_eq!(prepared.selection.y.as_deref(), Some("sales"));
        assert_eq!(prepared.chart.expect("bar chart").title, "sales by date");
    }

    #[test]
    fn histogram_uses_exact_bin_count() {
        let ds = iris();
        for bins in [5, 50] {
            let mut sel = selection(ChartKind::Histogram);
            sel.histogram_column = Some("sepal".into());
            sel.bins = bins;

            let chart = prepare(&ds, &sel).chart.expect("histogram");
            assert_eq!(chart.title, "Histogram of sepal");
            assert_eq!(
                chart.config,
                ChartConfig::Histogram {
                    column: "sepal".into(),
                    bins
                }
            );
            match chart.marks {
                Marks::Histogram { bins: out } => {
                    assert_eq!(out.len(), bins as usize);
                    assert_eq!(out.iter().map(|b| b.count).sum::<usize>(), 4);
                }
                other => panic!("expected histogram marks, got {other:?}"),
            }
        }
    }

    #[test]
    fn bins_outside_slider_range_are_rejected() {
        let mut sel = selection(ChartKind::Histogram);
        sel.bins = 4;
        assert_eq!(prepare(&iris(), &sel).chart, Err(ChartError::BinsOutOfRange(4)));
    }

    #[test]
    fn scatter_title_and_grouping_follow_color_choice() {
        let ds = iris();
        let mut sel = selection(ChartKind::Scatter);
        sel.x = Some("sepal".into());
        sel.y = Some("petal".into());

        let plain = prepare(&ds, &sel).chart.expect("scatter");
        assert_eq!(plain.title, "petal vs sepal");
        assert!(!plain.title.contains(" by "));
        assert!(matches!(plain.marks, Marks::Scatter { color: ScatterColor::Uniform, .. }));

        sel.color = ColorChoice::Column("species".into());
        let grouped = prepare(&ds, &sel).chart.expect("grouped scatter");
        assert_eq!(grouped.title, "petal vs sepal by species");
        match grouped.marks {
            Marks::Scatter { groups, color } => {
                assert_eq!(color, ScatterColor::Discrete { column: "species".into() });
                let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
                assert_eq!(labels, vec!["setosa", "virginica"]);
                assert_eq!(groups[0].points.len(), 2);
            }
            other => panic!("expected scatter marks, got {other:?}"),
        }
    }

    #[test]
    fn numeric_color_column_gets_continuous_scale() {
        let mut sel = selection(ChartKind::Scatter);
        sel.x = Some("sepal".into());
        sel.y = Some("sepal".into());
        sel.color = ColorChoice::Column("size".into());

        match prepare(&iris(), &sel).chart.expect("scatter").marks {
            Marks::Scatter {
                color: ScatterColor::Continuous { min, max, values, .. },
                groups,
            } => {
                assert_eq!((min, max), (1.0, 5.0));
                assert_eq!(values.len(), groups[0].points.len());
            }
            other => panic!("expected continuous color, got {other:?}"),
        }
    }

    #[test]
    fn same_selection_builds_identical_specs() {
        let ds = iris();
        let mut sel = selection(ChartKind::Scatter);
        sel.color = ColorChoice::Column("species".into());

        let first = prepare(&ds, &sel);
        let second = prepare(&ds, &sel);
        assert_eq!(first, second);
    }

    #[test]
    fn text_only_dataset_gives_guidance_instead_of_chart() {
        let ds = load("name,city\nann,oslo\nbob,rome\n");

        let hist = prepare(&ds, &selection(ChartKind::Histogram));
        assert!(hist.options.histogram.is_empty());
        assert_eq!(hist.chart, Err(ChartError::NoNumericColumns(ChartKind::Histogram)));

        let line = prepare(&ds, &selection(ChartKind::Line));
        assert_eq!(line.selection.x.as_deref(), Some("name"));
        assert_eq!(line.chart, Err(ChartError::NoNumericColumns(ChartKind::Line)));
    }

    #[test]
    fn reconcile_drops_choices_from_a_previous_dataset() {
        let mut sel = selection(ChartKind::Scatter);
        sel.x = Some("sepal".into());
        sel.y = Some("petal".into());
        sel.color = ColorChoice::Column("species".into());

        let prepared = prepare(&sales(), &sel);
        assert_eq!(prepared.selection.x.as_deref(), Some("sales"));
        assert_eq!(prepared.selection.y.as_deref(), Some("sales"));
        assert_eq!(prepared.selection.color, ColorChoice::None);
    }

    #[test]
    fn reconcile_keeps_choices_still_offered() {
        let ds = iris();
        let mut sel = selection(ChartKind::Line);
        sel.x = Some("species".into());
        sel.y = Some("petal".into());
        let options = PickerOptions::for_dataset(&ds, ChartKind::Line);
        sel.reconcile(&options);
        assert_eq!(sel.x.as_deref(), Some("species"));
        assert_eq!(sel.y.as_deref(), Some("petal"));
    }

    #[test]
    fn scatter_color_options_start_with_none() {
        let options = PickerOptions::for_dataset(&iris(), ChartKind::Scatter);
        assert_eq!(options.color.first(), Some(&ColorChoice::None));
        assert_eq!(options.color.len(), 5);
        assert_eq!(options.x, vec!["sepal", "petal", "size"]);
    }

    #[test]
    fn categorical_x_keeps_first_appearance_order_and_skips_missing() {
        let ds = load("fruit,qty\npear,1\napple,2\npear,3\n,4\n");
        let config = ChartConfig::Bar {
            x: "fruit".into(),
            y: "qty".into(),
        };
        let chart = build_chart(&ds, &config).expect("bar chart");
        assert_eq!(
            chart.x_axis,
            Axis::Categorical {
                categories: vec!["pear".into(), "apple".into()]
            }
        );
        match chart.marks {
            Marks::Bar { points } => {
                let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
                assert_eq!(xs, vec![0.0, 1.0, 0.0]);
            }
            other => panic!("expected bar marks, got {other:?}"),
        }
    }

    #[test]
    fn unknown_and_non_numeric_columns_are_errors() {
        let ds = iris();
        let missing = ChartConfig::Line {
            x: "nope".into(),
            y: "sepal".into(),
        };
        assert_eq!(build_chart(&ds, &missing), Err(ChartError::UnknownColumn("nope".into())));

        let text_y = ChartConfig::Line {
            x: "sepal".into(),
            y: "species".into(),
        };
        assert_eq!(build_chart(&ds, &text_y), Err(ChartError::NotNumeric("species".into())));
    }

    #[test]
    fn histogram_edges_cover_the_range() {
        let bins = histogram(&[0.0, 1.0, 2.0, 10.0], 5);
        assert_eq!(bins.len(), 5);
        assert_eq!(bins[0].start, 0.0);
        assert_eq!(bins[4].end, 10.0);
        assert_eq!(bins.iter().map(|b| b.count).collect::<Vec<_>>(), vec![2, 1, 0, 0, 1]);

        let single = histogram(&[3.0, 3.0], 5);
        assert_eq!(single[0].start, 2.5);
        assert_eq!(single[4].end, 3.5);
        assert_eq!(single.iter().map(|b| b.count).sum::<usize>(), 2);

        assert_eq!(histogram(&[], 7).len(), 7);
    }

    #[test]
    fn histogram_skips_infinite_values() {
        let bins = histogram(&[1.0, f64::INFINITY, 2.0, f64::NEG_INFINITY, 3.0], 5);
        assert_eq!(bins.len(), 5);
        assert_eq!(bins[0].start, 1.0);
        assert_eq!(bins[4].end, 3.0);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 3);

        let ds = load("v
1.5
inf
2.5
");
        let mut sel = selection(ChartKind::Histogram);
        sel.histogram_column = Some("v".into());
        sel.bins = 5;
        match prepare(&ds, &sel).chart.expect("histogram").marks {
            Marks::Histogram { bins } => {
                assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
            }
            other => panic!("expected histogram marks, got {other:?}"),
        }
    }

    #[test]
    fn timestamps_round_trip_through_labels() {
        let ms = parse_timestamp("2024-03-05").expect("date");
        assert_eq!(format_timestamp(ms as f64), "2024-03-05");
        let ms = parse_timestamp("2024-03-05 14:30:00").expect("datetime");
        assert_eq!(format_timestamp(ms as f64), "2024-03-05 14:30");
        assert_eq!(parse_timestamp("march"), None);
    }

    #[test]
    fn number_labels_are_compact() {
        assert_eq!(format_number(20.0), "20");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.125), "0.125");
        assert_eq!(format_number(-0.00001), "-1.000e-5");
    }

    #[test]
    fn chart_spec_serializes_to_json() {
        let chart = prepare(&sales(), &selection(ChartKind::Line)).chart.expect("line");
        let json = serde_json::to_value(&chart).expect("serializable");
        assert_eq!(json["title"], "sales vs date");
        assert_eq!(json["config"]["type"], "line");
        assert_eq!(json["marks"]["points"].as_array().map(Vec::len), Some(10));
    }
}
