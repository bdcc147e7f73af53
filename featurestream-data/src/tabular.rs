//! Streams CSV and Shapefile records through the vector decoders.

use std::ops::ControlFlow;

use camino::Utf8Path;
use featurestream_core::{FeatureRecord, StreamError, StreamOptions};
use log::debug;

use crate::{
    decode::{Datasource, DatasourceOptions, DecodeError, VectorKind},
    sink::{FeatureSink, Halt},
};

/// Decode `path` as `kind` and push each record into `sink`.
///
/// Records reach the consumer without the decoder's synthetic `id`.
pub(crate) fn stream(
    sink: &mut FeatureSink,
    path: &Utf8Path,
    kind: VectorKind,
    options: &StreamOptions,
) -> Result<(), Halt> {
    let source_options = DatasourceOptions::new(path, kind).with_strict(options.csv_strict);
    let datasource = Datasource::open(&source_options).map_err(|err| classify(path, err))?;

    let mut halted = None;
    let decoded = datasource.for_each_feature(|feature| {
        let pushed = normalise(feature)
            .map_err(Halt::Failed)
            .and_then(|record| sink.push(record));
        match pushed {
            Ok(()) => ControlFlow::Continue(()),
            Err(halt) => {
                halted = Some(halt);
                ControlFlow::Break(())
            }
        }
    });

    if let Some(halt) = halted {
        return Err(halt);
    }
    decoded.map_err(|err| classify(path, err))?;
    debug!("streamed {} {kind} records from {path}", sink.pushed());
    Ok(())
}

fn normalise(feature: geojson::Feature) -> Result<FeatureRecord, StreamError> {
    let value = serde_json::to_value(feature).map_err(StreamError::system)?;
    let mut record = FeatureRecord::new(value);
    record.remove_id();
    Ok(record)
}

fn classify(path: &Utf8Path, err: DecodeError) -> Halt {
    let err = match err {
        DecodeError::Invalid { message } => StreamError::invalid(message),
        DecodeError::Io { source, .. } => StreamError::from_io(path, source),
    };
    Halt::Failed(err)
}
