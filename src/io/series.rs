//! Raw scan series: CSV ingest and writing.
//!
//! A scan file holds every pixel of one chip and phase in long form:
//!
//! ```text
//! element,x,y
//! 0,0,0
//! 0,1,3
//! ...
//! ```
//!
//! Header names are case-insensitive and may appear in any order. Rows that
//! fail to parse are skipped and reported; points keep file order, so an
//! element whose `x` decreases is rejected when it is loaded.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use log::{debug, warn};

use crate::domain::{Point, RawSeries};
use crate::error::AppError;

/// Source of raw series, one per element index.
pub trait SeriesSource {
    /// Series of `element`, or `None` if the source has no data for it.
    fn load(&self, element: u32) -> Result<Option<RawSeries>, AppError>;
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Scan file read once into memory.
#[derive(Debug, Clone)]
pub struct CsvSeriesSource {
    path: PathBuf,
    by_element: BTreeMap<u32, Vec<Point>>,
    row_errors: Vec<RowError>,
    rows_read: usize,
}

impl CsvSeriesSource {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path)
            .map_err(|e| AppError::io(format!("Failed to open scan file '{}': {e}", path.display())))?;

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| AppError::invalid_input(format!("Failed to read scan file headers: {e}")))?
            .clone();
        let header_map = build_header_map(&headers);
        for column in ["element", "x", "y"] {
            if !header_map.contains_key(column) {
                return Err(AppError::invalid_input(format!(
                    "Scan file '{}' is missing required column: `{column}`",
                    path.display()
                )));
            }
        }

        let mut by_element: BTreeMap<u32, Vec<Point>> = BTreeMap::new();
        let mut row_errors = Vec::new();
        let mut rows_read = 0usize;

        for (idx, result) in reader.records().enumerate() {
            // records() starts after the header, lines are 1-based
            let line = idx + 2;
            rows_read += 1;

            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    row_errors.push(RowError {
                        line,
                        message: format!("CSV parse error: {e}"),
                    });
                    continue;
                }
            };

            match parse_row(&record, &header_map) {
                Ok((element, point)) => by_element.entry(element).or_default().push(point),
                Err(message) => row_errors.push(RowError { line, message }),
            }
        }

        for err in &row_errors {
            warn!("{}:{}: {}", path.display(), err.line, err.message);
        }
        debug!(
            "Read {} rows for {} elements from '{}'",
            rows_read,
            by_element.len(),
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            by_element,
            row_errors,
            rows_read,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Element indices present in the file, ascending.
    pub fn elements(&self) -> impl Iterator<Item = u32> + '_ {
        self.by_element.keys().copied()
    }

    pub fn row_errors(&self) -> &[RowError] {
        &self.row_errors
    }

    pub fn rows_read(&self) -> usize {
        self.rows_read
    }
}

impl SeriesSource for CsvSeriesSource {
    fn load(&self, element: u32) -> Result<Option<RawSeries>, AppError> {
        let Some(points) = self.by_element.get(&element) else {
            return Ok(None);
        };
        RawSeries::new(element.to_string(), points.clone()).map(Some)
    }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase(), idx))
        .collect()
}

fn get_required<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn parse_f64(s: &str, name: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|_| format!("Invalid `{name}` value: '{s}'"))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Non-finite `{name}` value: '{s}'"))
    }
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<(u32, Point), String> {
    let raw = get_required(record, header_map, "element")?;
    let element: u32 = raw.parse().map_err(|_| format!("Invalid `element` value: '{raw}'"))?;
    let x = parse_f64(get_required(record, header_map, "x")?, "x")?;
    let y = parse_f64(get_required(record, header_map, "y")?, "y")?;
    Ok((element, Point::new(x, y)))
}

/// Write scans in the long `element,x,y` form read by [`CsvSeriesSource`].
pub fn write_scan_csv(path: &Path, scans: &[(u32, Vec<Point>)]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::io(format!("Failed to create directory '{}': {e}", parent.display()))
            })?;
        }
    }

    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create scan file '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    let csv_err = |e: csv::Error| AppError::io(format!("Failed to write scan file '{}': {e}", path.display()));

    writer.write_record(["element", "x", "y"]).map_err(csv_err)?;
    for (element, points) in scans {
        for p in points {
            writer
                .write_record(&[element.to_string(), format!("{}", p.x), format!("{:.6}", p.y)])
                .map_err(csv_err)?;
        }
    }
    writer.flush().map_err(|e| AppError::io(format!("Failed to flush scan file '{}': {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_series_by_element() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "scan.csv", "X,Element,y\n0,3,1\n1,3,4\n0,5,2\n2,3,9\n");

        let source = CsvSeriesSource::open(&path).unwrap();
        assert_eq!(source.elements().collect::<Vec<_>>(), vec![3, 5]);
        assert_eq!(source.rows_read(), 4);

        let s = source.load(3).unwrap().unwrap();
        assert_eq!(s.name(), "3");
        let ys: Vec<f64> = s.points().iter().map(|p| p.y).collect();
        assert_eq!(ys, vec![1.0, 4.0, 9.0]);
        assert!(source.load(4).unwrap().is_none());
    }

    #[test]
    fn bad_rows_are_skipped_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "scan.csv", "element,x,y\n0,0,1\nzero,1,2\n0,1,\n0,2,inf\n0,3,5\n");

        let source = CsvSeriesSource::open(&path).unwrap();
        let lines: Vec<usize> = source.row_errors().iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
        assert_eq!(source.load(0).unwrap().unwrap().len(), 2);
    }

    #[test]
    fn missing_column_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "scan.csv", "element,x\n0,0\n");
        let err = CsvSeriesSource::open(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("`y`"));
    }

    #[test]
    fn decreasing_x_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "scan.csv", "element,x,y\n1,2,0\n1,1,0\n");
        let source = CsvSeriesSource::open(&path).unwrap();
        assert_eq!(source.load(1).unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = CsvSeriesSource::open(Path::new("/nonexistent/scan.csv")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn written_scans_are_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/scan_0_pre.csv");
        let scans = vec![
            (0, vec![Point::new(0.0, 1.0), Point::new(1.0, 2.5)]),
            (7, vec![Point::new(0.0, 0.0)]),
        ];
        write_scan_csv(&path, &scans).unwrap();

        let source = CsvSeriesSource::open(&path).unwrap();
        assert_eq!(source.elements().collect::<Vec<_>>(), vec![0, 7]);
        assert_eq!(source.load(0).unwrap().unwrap().points()[1], Point::new(1.0, 2.5));
    }
}
