//! Zipped Shapefile support.
//!
//! An archive is unpacked into a private temporary directory and its single
//! `.shp` is handed to the Shapefile decoder. The directory lives exactly as
//! long as the stream that reads from it.

use camino::Utf8Path;
use featurestream_core::{StreamError, StreamOptions};
use log::debug;

use crate::{
    decode::VectorKind,
    sink::{FeatureSink, Halt},
    tabular,
};

mod extract;

pub use extract::{ExtractError, ExtractedShapefile, extract_shapefile};

/// Stream the Shapefile held in the zip archive at `path`.
pub(crate) fn stream(
    sink: &mut FeatureSink,
    path: &Utf8Path,
    options: &StreamOptions,
) -> Result<(), Halt> {
    let extracted = extract_shapefile(path, options.extract_dir.as_deref()).map_err(classify)?;
    debug!("streaming {} from archive {path}", extracted.shp_path());
    let outcome = tabular::stream(sink, extracted.shp_path(), VectorKind::Shapefile, options);
    drop(extracted);
    outcome
}

fn classify(err: ExtractError) -> StreamError {
    match err {
        ExtractError::Invalid { message } => {
            StreamError::invalid(format!("Invalid zipfile: {message}"))
        }
        ExtractError::Io { path, source } => StreamError::from_io(&path, source),
    }
}
