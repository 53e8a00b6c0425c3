// src/stats.rs
use std::collections::HashMap;

use crate::data_types::{Cell, Column, Dataset};

pub const NUMERIC_ROWS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
pub const CATEGORICAL_ROWS: [&str; 4] = ["count", "unique", "top", "freq"];

#[derive(Debug, Clone, PartialEq)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q1: Option<f64>,
    pub median: Option<f64>,
    pub q3: Option<f64>,
    pub max: Option<f64>,
}

impl NumericSummary {
    pub fn of(column: &Column) -> Self {
        let mut values: Vec<f64> = column.numbers().into_iter().flatten().collect();
        values.sort_by(|a, b| a.total_cmp(b));

        let count = values.len();
        let mean = (count > 0).then(|| values.iter().sum::<f64>() / count as f64);
        let std = mean.filter(|_| count > 1).map(|mean| {
            let squares: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
            (squares / (count - 1) as f64).sqrt()
        });

        NumericSummary {
            column: column.name.clone(),
            count,
            mean,
            std,
            min: values.first().copied(),
            q1: quantile(&values, 0.25),
            median: quantile(&values, 0.5),
            q3: quantile(&values, 0.75),
            max: values.last().copied(),
        }
    }

    /// Formatted values in [`NUMERIC_ROWS`] order.
    pub fn cells(&self) -> Vec<String> {
        let fmt = |v: Option<f64>| v.map_or_else(|| "NaN".to_string(), |v| format!("{v:.6}"));
        vec![
            format!("{:.6}", self.count as f64),
            fmt(self.mean),
            fmt(self.std),
            fmt(self.min),
            fmt(self.q1),
            fmt(self.median),
            fmt(self.q3),
            fmt(self.max),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalSummary {
    pub column: String,
    pub count: usize,
    pub unique: usize,
    pub top: Option<String>,
    pub freq: Option<usize>,
}

impl CategoricalSummary {
    pub fn of(column: &Column) -> Self {
        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for cell in column.cells.iter().filter(|c| !c.is_missing()) {
            let label = cell.to_string();
            let entry = counts.entry(label.clone()).or_insert_with(|| {
                order.push(label);
                0
            });
            *entry += 1;
        }

        // First value wins ties.
        let mut top: Option<(String, usize)> = None;
        for label in &order {
            let n = counts[label];
            if top.as_ref().map_or(true, |(_, best)| n > *best) {
                top = Some((label.clone(), n));
            }
        }

        CategoricalSummary {
            column: column.name.clone(),
            count: column.cells.iter().filter(|c| !matches!(c, Cell::Missing)).count(),
            unique: order.len(),
            freq: top.as_ref().map(|(_, n)| *n),
            top: top.map(|(label, _)| label),
        }
    }

    /// Formatted values in [`CATEGORICAL_ROWS`] order.
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.count.to_string(),
            self.unique.to_string(),
            self.top.clone().unwrap_or_else(|| "NaN".to_string()),
            self.freq.map_or_else(|| "NaN".to_string(), |n| n.to_string()),
        ]
    }
}

/// Descriptive statistics for a dataset: numeric columns when it has any, every column otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Description {
    Numeric(Vec<NumericSummary>),
    Categorical(Vec<CategoricalSummary>),
}

impl Description {
    pub fn row_labels(&self) -> &'static [&'static str] {
        match self {
            Description::Numeric(_) => &NUMERIC_ROWS,
            Description::Categorical(_) => &CATEGORICAL_ROWS,
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        match self {
            Description::Numeric(cols) => cols.iter().map(|c| c.column.clone()).collect(),
            Description::Categorical(cols) => cols.iter().map(|c| c.column.clone()).collect(),
        }
    }

    /// Table rows: one per statistic, each with one formatted value per column.
    pub fn rows(&self) -> Vec<(&'static str, Vec<String>)> {
        let columns: Vec<Vec<String>> = match self {
            Description::Numeric(cols) => cols.iter().map(NumericSummary::cells).collect(),
            Description::Categorical(cols) => cols.iter().map(CategoricalSummary::cells).collect(),
        };

        self.row_labels()
            .iter()
            .enumerate()
            .map(|(i, label)| (*label, columns.iter().map(|c| c[i].clone()).collect()))
            .collect()
    }
}

pub fn describe(dataset: &Dataset) -> Description {
    let numeric: Vec<NumericSummary> = dataset
        .columns()
        .iter()
        .filter(|c| c.is_numeric())
        .map(NumericSummary::of)
        .collect();

    if numeric.is_empty() {
        Description::Categorical(dataset.columns().iter().map(CategoricalSummary::of).collect())
    } else {
        Description::Numeric(numeric)
    }
}

/// Linearly interpolated quantile of sorted values.
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}
