//! Core types for streaming geospatial features.
//!
//! These types are shared by every stage of a streaming request: the
//! normalized [`FeatureRecord`], the [`FileType`] vocabulary reported by the
//! sniffer, the classified [`StreamError`], and the [`StreamOptions`] that
//! tune a request.
#![forbid(unsafe_code)]

mod error;
mod feature;
mod file_type;
mod options;

pub use error::{ErrorKind, NOT_FOUND_MARKER, StreamError};
pub use feature::FeatureRecord;
pub use file_type::FileType;
pub use options::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_SNIFF_PROBE_BYTES, MIN_SNIFF_PROBE_BYTES, StreamOptions,
};
