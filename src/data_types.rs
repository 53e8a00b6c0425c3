// src/data_types.rs
use std::fmt;

/// Tokens read as missing values, matching the usual CSV tooling defaults.
pub const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const TRUE_TOKENS: &[&str] = &["True", "TRUE", "true"];
const FALSE_TOKENS: &[&str] = &["False", "FALSE", "false"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Text,
    Empty,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }

    /// Infers the kind shared by every cell of a raw column.
    pub fn infer<S: AsRef<str>>(raw: &[S]) -> Self {
        let mut present = 0usize;
        let mut missing = 0usize;
        let mut all_int = true;
        let mut all_num = true;
        let mut all_bool = true;

        for value in raw {
            let value = value.as_ref();
            if is_missing(value) {
                missing += 1;
                continue;
            }
            present += 1;

            let trimmed = value.trim();
            if all_int && trimmed.parse::<i64>().is_err() {
                all_int = false;
            }
            if all_num && trimmed.parse::<f64>().is_err() {
                all_num = false;
            }
            if all_bool && parse_bool(value).is_none() {
                all_bool = false;
            }
            if !all_num && !all_bool {
                return ColumnKind::Text;
            }
        }

        if present == 0 {
            ColumnKind::Empty
        } else if all_int && missing == 0 {
            ColumnKind::Integer
        } else if all_num {
            ColumnKind::Float
        } else if all_bool && missing == 0 {
            ColumnKind::Boolean
        } else {
            ColumnKind::Text
        }
    }
}

pub fn is_missing(value: &str) -> bool {
    MISSING_TOKENS.contains(&value)
}

fn parse_bool(value: &str) -> Option<bool> {
    if TRUE_TOKENS.contains(&value) {
        Some(true)
    } else if FALSE_TOKENS.contains(&value) {
        Some(false)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Cell {
    fn typed(raw: String, kind: ColumnKind) -> Self {
        if is_missing(&raw) {
            return Cell::Missing;
        }
        let parsed = match kind {
            ColumnKind::Integer => raw.trim().parse().ok().map(Cell::Int),
            ColumnKind::Float => raw.trim().parse().ok().map(Cell::Float),
            ColumnKind::Boolean => parse_bool(&raw).map(Cell::Bool),
            ColumnKind::Empty => Some(Cell::Missing),
            ColumnKind::Text => None,
        };
        parsed.unwrap_or(Cell::Text(raw))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => f.write_str("NaN"),
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Float(v) => f.write_str(&format_float(*v)),
            Cell::Bool(true) => f.write_str("True"),
            Cell::Bool(false) => f.write_str("False"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Formats a float with at least one decimal place: `3.0`, `2.5`, `1e20`.
pub fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn from_raw(name: String, raw: Vec<String>) -> Self {
        let kind = ColumnKind::infer(&raw);
        let cells = raw.into_iter().map(|value| Cell::typed(value, kind)).collect();
        Column { name, kind, cells }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind.is_numeric()
    }

    /// Numeric view of the column, `None` where a cell is missing or not a number.
    pub fn numbers(&self) -> Vec<Option<f64>> {
        self.cells.iter().map(Cell::as_f64).collect()
    }
}

/// The parsed, immutable table behind one upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl Dataset {
    /// Builds a dataset from headers and row-major records of equal width.
    pub fn from_records(headers: Vec<String>, records: Vec<Vec<String>>) -> Self {
        let row_count = records.len();
        let mut raw_columns: Vec<Vec<String>> =
            headers.iter().map(|_| Vec::with_capacity(row_count)).collect();

        for record in records {
            for (i, value) in record.into_iter().enumerate() {
                if let Some(column) = raw_columns.get_mut(i) {
                    column.push(value);
                }
            }
        }

        let columns = headers
            .into_iter()
            .zip(raw_columns)
            .map(|(name, raw)| Column::from_raw(name, raw))
            .collect();

        Dataset { columns, row_count }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Names of the columns whose kind is integer or float, in column order.
    pub fn numeric_column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.is_numeric())
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.row_count, self.columns.len())
    }

    /// First `n` rows (or all of them, when there are fewer) as display strings.
    pub fn head(&self, n: usize) -> Vec<Vec<String>> {
        (0..self.row_count.min(n))
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| c.cells[row].to_string())
                    .collect()
            })
            .collect()
    }
}
