// src/csv_handler.rs
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use csv::ReaderBuilder;
use tokio::task;
use tracing::{debug, info, warn};

use crate::data_types::Dataset;
use crate::error::LoadError;

const BOM: char = '\u{feff}';

pub struct CSVHandler {}

impl CSVHandler {
    pub fn new() -> Self {
        CSVHandler {}
    }

    /// Reads and parses a CSV file on a blocking worker thread.
    pub async fn read_csv<P: AsRef<Path> + Send + 'static>(
        &self,
        path: P,
    ) -> Result<Arc<Dataset>, LoadError> {
        let shown = path.as_ref().display().to_string();

        let result = task::spawn_blocking(move || {
            let bytes = std::fs::read(&path).map_err(|e| LoadError::Io {
                path: path.as_ref().display().to_string(),
                message: e.to_string(),
            })?;
            Self::parse_bytes(&bytes)
        })
        .await
        .map_err(|e| LoadError::Worker(e.to_string()))
        .and_then(|parsed| parsed);

        match &result {
            Ok(dataset) => {
                let (rows, cols) = dataset.shape();
                info!(file = %shown, rows, cols, "loaded dataset");
            }
            Err(err) => warn!(file = %shown, error = %err, "failed to load dataset"),
        }

        result.map(Arc::new)
    }

    /// Parses an in-memory CSV document, picking the delimiter from its header line.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Dataset, LoadError> {
        let delimiter = Self::detect_delimiter(bytes);
        debug!(delimiter = %(delimiter as char), "parsing csv");
        Self::from_reader(bytes, delimiter)
    }

    pub fn from_reader<R: Read>(source: R, delimiter: u8) -> Result<Dataset, LoadError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(false)
            .from_reader(source);

        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        if headers.is_empty() {
            return Err(LoadError::Empty);
        }
        let headers = Self::process_headers(headers);

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            records.push(record.iter().map(String::from).collect());
        }

        Ok(Dataset::from_records(headers, records))
    }

    /// `;` when the header line uses semicolons and no commas, `,` otherwise.
    fn detect_delimiter(bytes: &[u8]) -> u8 {
        let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or_default();

        if first_line.contains(&b';') && !first_line.contains(&b',') {
            b';'
        } else {
            b','
        }
    }

    /// Names blank headers `Unnamed: {i}` and suffixes repeated names with `.1`, `.2`, ...
    fn process_headers(headers: Vec<String>) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut processed = Vec::with_capacity(headers.len());

        for (i, header) in headers.into_iter().enumerate() {
            let header = if i == 0 {
                header.trim_start_matches(BOM).to_string()
            } else {
                header
            };
            let base = if header.is_empty() {
                format!("Unnamed: {i}")
            } else {
                header
            };

            let mut name = base.clone();
            let mut suffix = 1;
            while seen.contains(&name) {
                name = format!("{base}.{suffix}");
                suffix += 1;
            }
            seen.insert(name.clone());
            processed.push(name);
        }

        processed
    }
}

impl Default for CSVHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::ColumnKind;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::io::Write;

    fn parse(text: &str) -> Result<Dataset, LoadError> {
        CSVHandler::parse_bytes(text.as_bytes())
    }

    #[test]
    fn parses_shape_and_kinds() {
        let ds = parse("date,sales,region\n2024-01-01,10,north\n2024-01-02,12.5,south\n")
            .expect("valid csv");

        assert_eq!(ds.shape(), (2, 3));
        let kinds: Vec<ColumnKind> = ds.columns().iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ColumnKind::Text, ColumnKind::Float, ColumnKind::Text]);
        assert_eq!(ds.numeric_column_names(), vec!["sales".to_string()]);
    }

    #[test]
    fn header_only_file_has_zero_rows() {
        let ds = parse("a,b,c\n").expect("header only");
        assert_eq!(ds.shape(), (0, 3));
        assert!(ds.head(5).is_empty());
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(parse(""), Err(LoadError::Empty));
    }

    #[test]
    fn inconsistent_field_counts_are_rejected() {
        let err = parse("a,b\n1,2\n3\n").expect_err("short row");
        assert_eq!(err, LoadError::Malformed { line: 3, expected: 2, found: 1 });
        assert!(err.to_string().contains("Expected 2 fields in line 3, saw 1"));
    }

    #[test]
    fn binary_garbage_is_rejected() {
        let garbage: Vec<u8> = vec![0x00, 0xff, 0xfe, b',', 0x80, b'\n', 0xc3, 0x28, b',', 0x01, b'\n'];
        assert!(CSVHandler::parse_bytes(&garbage).is_err());
    }

    #[test]
    fn semicolon_headers_switch_delimiter() {
        let ds = parse("name;score\nann;3\nbob;4\n").expect("semicolon csv");
        assert_eq!(ds.column_names(), vec!["name".to_string(), "score".to_string()]);
        assert_eq!(ds.numeric_column_names(), vec!["score".to_string()]);
    }

    #[test]
    fn blank_and_duplicate_headers_are_renamed() {
        let ds = parse("\u{feff}x,,x,x.1,x\n1,2,3,4,5\n").expect("valid csv");
        assert_eq!(
            ds.column_names(),
            vec!["x", "Unnamed: 1", "x.1", "x.1.1", "x.2"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn quoted_fields_keep_delimiters() {
        let ds = parse("label,value\n\"a, b\",1\n").expect("quoted csv");
        assert_eq!(ds.head(1), vec![vec!["a, b".to_string(), "1".to_string()]]);
    }

    #[tokio::test]
    async fn reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "x,y\n1,2\n3,4\n").expect("write csv");

        let ds = CSVHandler::new()
            .read_csv(file.path().to_path_buf())
            .await
            .expect("readable csv");
        assert_eq!(ds.shape(), (2, 2));
    }

    #[tokio::test]
    async fn missing_file_reports_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = CSVHandler::new()
            .read_csv(dir.path().join("nope.csv"))
            .await
            .expect_err("file does not exist");
        assert!(matches!(err, LoadError::Io { .. }));
    }

    proptest! {
        #[test]
        fn shape_and_preview_match_input(rows in 0usize..40, cols in 1usize..6) {
            let header: Vec<String> = (0..cols).map(|c| format!("c{c}")).collect();
            let mut text = header.join(",");
            text.push('\n');
            for r in 0..rows {
                let line: Vec<String> = (0..cols).map(|c| (r * cols + c).to_string()).collect();
                text.push_str(&line.join(","));
                text.push('\n');
            }

            let ds = CSVHandler::parse_bytes(text.as_bytes()).expect("generated csv is valid");
            prop_assert_eq!(ds.shape(), (rows, cols));
            prop_assert_eq!(ds.head(5).len(), rows.min(5));
        }

        #[test]
        fn numeric_names_are_exactly_the_all_numeric_columns(
            columns in proptest::collection::vec(
                (any::<bool>(), proptest::collection::vec(-1000i64..1000, 3)),
                1..6,
            )
        ) {
            let headers: Vec<String> = (0..columns.len()).map(|c| format!("c{c}")).collect();
            let mut text = headers.join(",");
            text.push('\n');
            for row in 0..3 {
                let cells: Vec<String> = columns
                    .iter()
                    .map(|(numeric, values)| {
                        if *numeric {
                            values[row].to_string()
                        } else {
                            format!("t{}", values[row])
                        }
                    })
                    .collect();
                text.push_str(&cells.join(","));
                text.push('\n');
            }

            let ds = CSVHandler::parse_bytes(text.as_bytes()).expect("generated csv is valid");
            let expected: Vec<String> = columns
                .iter()
                .zip(&headers)
                .filter(|((numeric, _), _)| *numeric)
                .map(|(_, name)| name.clone())
                .collect();
            prop_assert_eq!(ds.numeric_column_names(), expected);
        }
    }
}
