//! Facade crate for featurestream.
//!
//! Turns a path to a GeoJSON, CSV, Shapefile or zipped Shapefile into a lazy
//! stream of GeoJSON-shaped feature records. This crate re-exports the core
//! types and the streaming entry points.

#![forbid(unsafe_code)]

pub use featurestream_core::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_SNIFF_PROBE_BYTES, ErrorKind, FeatureRecord, FileType,
    MIN_SNIFF_PROBE_BYTES, NOT_FOUND_MARKER, StreamError, StreamOptions,
};
pub use featurestream_data::{
    BlockingFeatures, FeatureStream, StreamState, is_feature_collection, sniff, stream_features,
    stream_features_with,
};
