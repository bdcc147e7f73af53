//! Incremental GeoJSON streaming.
//!
//! FeatureCollections are never materialised: the `features` array is
//! walked element by element with a [`DeserializeSeed`], and each element is
//! pushed to the sink as soon as it has been parsed. Other top-level members
//! are skipped. A bare Feature is small by definition and is parsed whole.

use std::{
    fmt,
    io::{self, BufReader, Read},
};

use camino::Utf8Path;
use featurestream_core::{FeatureRecord, StreamError};
use log::debug;
use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::Value;

use crate::sink::{FeatureSink, Halt};

pub mod shape;

/// Stream the Feature or FeatureCollection stored at `path` into `sink`.
pub(crate) fn stream(sink: &mut FeatureSink, path: &Utf8Path) -> Result<(), Halt> {
    if shape::is_feature_collection(path)? {
        stream_collection(sink, path)
    } else {
        stream_single(sink, path)
    }
}

fn stream_single(sink: &mut FeatureSink, path: &Utf8Path) -> Result<(), Halt> {
    let mut file =
        featurestream_fs::open_std_file(path).map_err(|err| StreamError::from_io(path, err))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|err| StreamError::from_io(path, err))?;
    let feature: Value =
        serde_json::from_slice(&bytes).map_err(|err| classify_json_error(path, err))?;
    sink.push(FeatureRecord::new(feature))
}

fn stream_collection(sink: &mut FeatureSink, path: &Utf8Path) -> Result<(), Halt> {
    let file =
        featurestream_fs::open_std_file(path).map_err(|err| StreamError::from_io(path, err))?;
    let mut deserializer = serde_json::Deserializer::from_reader(BufReader::new(file));
    let mut halted = None;
    let outcome = CollectionSeed {
        sink: &mut *sink,
        halted: &mut halted,
    }
    .deserialize(&mut deserializer)
    .and_then(|()| deserializer.end());

    if let Some(halt) = halted {
        return Err(halt);
    }
    outcome.map_err(|err| Halt::Failed(classify_json_error(path, err)))?;
    debug!("streamed {} GeoJSON features from {path}", sink.pushed());
    Ok(())
}

/// Parser failures are invalid input; failures of the reader keep their
/// I/O classification.
fn classify_json_error(path: &Utf8Path, err: serde_json::Error) -> StreamError {
    if err.is_io() {
        StreamError::from_io(path, io::Error::from(err))
    } else {
        StreamError::invalid_with_source(format!("Invalid JSON: {err}"), err)
    }
}

/// Visits the top-level FeatureCollection object.
struct CollectionSeed<'a> {
    sink: &'a mut FeatureSink,
    halted: &'a mut Option<Halt>,
}

impl<'de> DeserializeSeed<'de> for CollectionSeed<'_> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for CollectionSeed<'_> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a GeoJSON FeatureCollection object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let Self { sink, halted } = self;
        while let Some(key) = map.next_key::<String>()? {
            if key == "features" {
                map.next_value_seed(FeaturesSeed {
                    sink: &mut *sink,
                    halted: &mut *halted,
                })?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }
}

/// Visits the `features` array, pushing each element as it completes.
struct FeaturesSeed<'a> {
    sink: &'a mut FeatureSink,
    halted: &'a mut Option<Halt>,
}

impl<'de> DeserializeSeed<'de> for FeaturesSeed<'_> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for FeaturesSeed<'_> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an array of GeoJSON features")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        while let Some(feature) = seq.next_element::<Value>()? {
            if let Err(halt) = self.sink.push(FeatureRecord::new(feature)) {
                *self.halted = Some(halt);
                return Err(de::Error::custom("feature stream halted"));
            }
        }
        Ok(())
    }
}
