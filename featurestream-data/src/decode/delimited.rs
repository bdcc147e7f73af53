//! Delimited-text decoder built on the `csv` crate.

use std::{
    fs::File,
    io::{BufRead, BufReader, Seek},
    ops::ControlFlow,
};

use camino::{Utf8Path, Utf8PathBuf};
use csv::{ReaderBuilder, StringRecord, Trim};
use geojson::{Geometry, JsonObject, Value as GeometryValue};
use log::warn;
use serde_json::{Number, Value};

use super::{CSV_PLUGIN, ColumnRole, DecodeError, numbered_feature, registry};

const DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Pick the candidate delimiter that occurs most often in `header`.
fn detect_delimiter(header: &str) -> u8 {
    let mut best = (b',', 0usize);
    for candidate in DELIMITERS {
        let count = header.bytes().filter(|byte| *byte == candidate).count();
        if count > best.1 {
            best = (candidate, count);
        }
    }
    best.0
}

/// Columns that carry a row's geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GeometryColumns {
    Coordinates { lon: usize, lat: usize },
    GeoJson { column: usize },
}

impl GeometryColumns {
    fn locate<'a>(headers: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let registry = registry();
        let mut lon = None;
        let mut lat = None;
        let mut geojson = None;
        for (index, name) in headers.into_iter().enumerate() {
            match registry.column_role(name) {
                Some(ColumnRole::Longitude) => {
                    lon.get_or_insert(index);
                }
                Some(ColumnRole::Latitude) => {
                    lat.get_or_insert(index);
                }
                Some(ColumnRole::GeoJson) => {
                    geojson.get_or_insert(index);
                }
                None => {}
            }
        }
        match (lon, lat, geojson) {
            (Some(lon), Some(lat), _) => Some(Self::Coordinates { lon, lat }),
            (_, _, Some(column)) => Some(Self::GeoJson { column }),
            _ => None,
        }
    }

    fn skips(self, index: usize) -> bool {
        matches!(self, Self::GeoJson { column } if column == index)
    }
}

/// Whether `line` looks like a delimited header naming geometry columns.
pub(crate) fn sniff_header(line: &str) -> bool {
    let line = line.trim_start_matches('\u{feff}').trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return false;
    }
    let delimiter = char::from(detect_delimiter(line));
    GeometryColumns::locate(line.split(delimiter)).is_some()
}

/// Decoder over a delimited text file with a header row.
#[derive(Debug)]
pub struct CsvDatasource {
    path: Utf8PathBuf,
    reader: csv::Reader<File>,
    headers: StringRecord,
    geometry: GeometryColumns,
    strict: bool,
}

impl CsvDatasource {
    /// Open `path`, detecting its delimiter and geometry columns.
    pub fn open(path: &Utf8Path, strict: bool) -> Result<Self, DecodeError> {
        let file =
            featurestream_fs::open_std_file(path).map_err(|err| DecodeError::io(path, err))?;
        let mut buffered = BufReader::new(file);
        let mut first_line = Vec::new();
        buffered
            .read_until(b'\n', &mut first_line)
            .map_err(|err| DecodeError::io(path, err))?;
        let first_line = String::from_utf8_lossy(&first_line);
        if first_line.trim_start_matches('\u{feff}').trim().is_empty() {
            return Err(DecodeError::invalid(format!(
                "{CSV_PLUGIN}: no header row in {path}"
            )));
        }
        let delimiter = detect_delimiter(&first_line);

        let mut file = buffered.into_inner();
        file.rewind().map_err(|err| DecodeError::io(path, err))?;
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(!strict)
            .trim(Trim::All)
            .from_reader(file);
        let headers = reader
            .headers()
            .map_err(|err| csv_failure(path, err))?
            .clone();
        let geometry = GeometryColumns::locate(headers.iter()).ok_or_else(|| {
            DecodeError::invalid(format!("{CSV_PLUGIN}: no geometry columns found in {path}"))
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            headers,
            geometry,
            strict,
        })
    }

    /// Feed each row to `visit` as a feature.
    pub fn for_each_feature<F>(mut self, mut visit: F) -> Result<(), DecodeError>
    where
        F: FnMut(geojson::Feature) -> ControlFlow<()>,
    {
        let mut record = StringRecord::new();
        let mut ordinal = 0u64;
        loop {
            match self.reader.read_record(&mut record) {
                Ok(false) => return Ok(()),
                Ok(true) => {}
                Err(err) if self.strict || err.is_io_error() => {
                    return Err(csv_failure(&self.path, err));
                }
                Err(err) => {
                    warn!("{CSV_PLUGIN}: skipping malformed row in {}: {err}", self.path);
                    continue;
                }
            }

            let line = record.position().map_or(0, csv::Position::line);
            let feature = match self.row_feature(&record, line, ordinal + 1) {
                Ok(feature) => feature,
                Err(err) if self.strict => return Err(err),
                Err(err) => {
                    warn!("skipping row on line {line} of {}: {err}", self.path);
                    continue;
                }
            };
            ordinal += 1;
            if visit(feature).is_break() {
                return Ok(());
            }
        }
    }

    fn row_feature(
        &self,
        record: &StringRecord,
        line: u64,
        ordinal: u64,
    ) -> Result<geojson::Feature, DecodeError> {
        if record.len() != self.headers.len() {
            return Err(DecodeError::invalid(format!(
                "{CSV_PLUGIN}: expected {} fields on line {line} but found {}",
                self.headers.len(),
                record.len()
            )));
        }

        let geometry = match self.geometry {
            GeometryColumns::Coordinates { lon, lat } => {
                let lon = parse_coordinate("Longitude", record.get(lon), line)?;
                let lat = parse_coordinate("Latitude", record.get(lat), line)?;
                Geometry::new(GeometryValue::Point(vec![lon, lat]))
            }
            GeometryColumns::GeoJson { column } => {
                let raw = record.get(column).unwrap_or_default();
                serde_json::from_str::<Geometry>(raw).map_err(|err| {
                    DecodeError::invalid(format!(
                        "{CSV_PLUGIN}: failed to parse geojson geometry on line {line}: {err}"
                    ))
                })?
            }
        };

        let properties: JsonObject = self
            .headers
            .iter()
            .zip(record.iter())
            .enumerate()
            .filter(|(index, _)| !self.geometry.skips(*index))
            .map(|(_, (name, cell))| {
                let name = name.trim_start_matches('\u{feff}').to_owned();
                (name, infer_value(cell))
            })
            .collect();

        Ok(numbered_feature(ordinal, Some(geometry), properties))
    }
}

fn parse_coordinate(axis: &str, raw: Option<&str>, line: u64) -> Result<f64, DecodeError> {
    let raw = raw.unwrap_or_default();
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| {
            DecodeError::invalid(format!("Failed to parse {axis} '{raw}' on line {line}"))
        })
}

/// Integers stay integral, finite floats become numbers, everything else is text.
fn infer_value(cell: &str) -> Value {
    if let Ok(integer) = cell.parse::<i64>() {
        return Value::from(integer);
    }
    cell.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or_else(|| Value::String(cell.to_owned()), Value::Number)
}

fn csv_failure(path: &Utf8Path, err: csv::Error) -> DecodeError {
    let message = format!("{CSV_PLUGIN}: {err}");
    match err.into_kind() {
        csv::ErrorKind::Io(source) => DecodeError::io(path, source),
        _ => DecodeError::invalid(message),
    }
}
