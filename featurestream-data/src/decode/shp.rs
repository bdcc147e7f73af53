//! Shapefile decoder built on the `shapefile` crate.

use std::{collections::HashMap, fmt, fs::File, io, io::BufReader, ops::ControlFlow};

use camino::{Utf8Path, Utf8PathBuf};
use geojson::JsonObject;
use serde_json::Value;
use shapefile::{
    Shape,
    dbase::{FieldValue, Record},
};

use super::{DecodeError, SHAPE_PLUGIN, numbered_feature};

type ShapeReader = shapefile::Reader<BufReader<File>, BufReader<File>>;

/// Decoder over a `.shp` file and its sidecars.
pub struct ShapeDatasource {
    path: Utf8PathBuf,
    reader: ShapeReader,
}

impl fmt::Debug for ShapeDatasource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeDatasource")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ShapeDatasource {
    /// Open `path` and read its header.
    ///
    /// The `.dbf` attribute file must sit beside the `.shp`.
    pub fn open(path: &Utf8Path) -> Result<Self, DecodeError> {
        let dbf = path.with_extension("dbf");
        let has_dbf =
            featurestream_fs::path_is_file(&dbf).map_err(|err| DecodeError::io(&dbf, err))?;
        if !has_dbf {
            return Err(DecodeError::invalid(format!(
                "{SHAPE_PLUGIN}: missing attribute file {dbf}"
            )));
        }

        let reader = shapefile::Reader::from_path(path).map_err(|err| match err {
            shapefile::Error::IoError(source) if source.kind() == io::ErrorKind::NotFound => {
                DecodeError::io(path, source)
            }
            other => DecodeError::invalid(format!("{SHAPE_PLUGIN}: {other}")),
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            reader,
        })
    }

    /// Feed each shape and its attributes to `visit` as a feature.
    pub fn for_each_feature<F>(mut self, mut visit: F) -> Result<(), DecodeError>
    where
        F: FnMut(geojson::Feature) -> ControlFlow<()>,
    {
        let path = self.path;
        for (index, entry) in self.reader.iter_shapes_and_records().enumerate() {
            let (shape, record) = entry.map_err(|err| shape_failure(&path, err))?;
            let geometry = shape_geometry(shape)?;
            let ordinal = u64::try_from(index).unwrap_or(u64::MAX).saturating_add(1);
            let feature = numbered_feature(ordinal, geometry, record_properties(record));
            if visit(feature).is_break() {
                break;
            }
        }
        Ok(())
    }
}

/// Short or garbled records are bad content; only other I/O failures stay `Io`.
fn shape_failure(path: &Utf8Path, err: shapefile::Error) -> DecodeError {
    match err {
        shapefile::Error::IoError(source)
            if matches!(
                source.kind(),
                io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData
            ) =>
        {
            DecodeError::invalid(format!("{SHAPE_PLUGIN}: {source}"))
        }
        shapefile::Error::IoError(source) => DecodeError::io(path, source),
        other => DecodeError::invalid(format!("{SHAPE_PLUGIN}: {other}")),
    }
}

fn shape_geometry(shape: Shape) -> Result<Option<geojson::Geometry>, DecodeError> {
    if matches!(shape, Shape::NullShape) {
        return Ok(None);
    }
    let geometry = geo::Geometry::<f64>::try_from(shape)
        .map_err(|err| DecodeError::invalid(format!("{SHAPE_PLUGIN}: {err}")))?;
    Ok(Some(geojson::Geometry::new(geojson::Value::from(&geometry))))
}

fn record_properties(record: Record) -> JsonObject {
    HashMap::<String, FieldValue>::from(record)
        .into_iter()
        .map(|(name, value)| (name, field_value(value)))
        .collect()
}

fn field_value(value: FieldValue) -> Value {
    match value {
        FieldValue::Character(text) => text.map_or(Value::Null, Value::String),
        FieldValue::Memo(text) => Value::String(text),
        FieldValue::Numeric(number) => number.map_or(Value::Null, float_value),
        FieldValue::Float(number) => number.map_or(Value::Null, |n| float_value(f64::from(n))),
        FieldValue::Integer(number) => Value::from(number),
        FieldValue::Double(number) | FieldValue::Currency(number) => float_value(number),
        FieldValue::Logical(flag) => flag.map_or(Value::Null, Value::Bool),
        FieldValue::Date(date) => date.map_or(Value::Null, |date| {
            Value::String(format!(
                "{:04}-{:02}-{:02}",
                date.year(),
                date.month(),
                date.day()
            ))
        }),
        other => Value::String(format!("{other:?}")),
    }
}

/// dBase stores every numeric as a float; whole values come back as integers.
#[expect(
    clippy::cast_possible_truncation,
    reason = "guarded by the range and fract checks"
)]
fn float_value(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() < 9.0e15 {
        Value::from(number as i64)
    } else {
        serde_json::Number::from_f64(number).map_or(Value::Null, Value::Number)
    }
}
