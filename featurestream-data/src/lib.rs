//! File-to-feature streaming for the featurestream workspace.
//!
//! Responsibilities:
//! - Sniff a file's real type from its leading bytes.
//! - Stream GeoJSON, CSV, Shapefile and zipped Shapefile inputs as
//!   normalized feature records.
//! - Classify every failure as a [`StreamError`] before it reaches a
//!   consumer.
//!
//! Boundaries:
//! - No geometry validation or reprojection; records pass through as
//!   decoded.
//! - Blocking decoders run off the async executor.
//!
//! Invariants:
//! - A stream delivers at most one error, and nothing after its terminal
//!   event.
//! - Temporary extraction directories live no longer than their stream.

#![forbid(unsafe_code)]

mod archive;
mod decode;
mod geojson_file;
mod sink;
mod sniff;
mod stream;
mod tabular;

#[cfg(test)]
mod test_support;

pub use archive::{ExtractError, ExtractedShapefile, extract_shapefile};
pub use decode::{
    CSV_PLUGIN, CsvDatasource, Datasource, DatasourceOptions, DecodeError, SHAPE_PLUGIN,
    ShapeDatasource, VectorKind,
};
pub use featurestream_core::{FeatureRecord, FileType, StreamError, StreamOptions};
pub use geojson_file::shape::is_feature_collection;
pub use sniff::sniff;
pub use stream::{
    BlockingFeatures, FeatureStream, StreamState, stream_features, stream_features_with,
};
