//! Cheap FeatureCollection-versus-Feature detection.
//!
//! The scan looks for the first line mentioning `"features"` or
//! `"geometry"` and never parses JSON. A bare Feature whose properties name a
//! `"features"` key ahead of its geometry is misreported as a collection,
//! and vice versa.

use std::io::{BufRead, BufReader};

use camino::Utf8Path;
use featurestream_core::StreamError;

const FEATURES_TOKEN: &[u8] = b"\"features\"";
const GEOMETRY_TOKEN: &[u8] = b"\"geometry\"";

/// Whether the GeoJSON document at `path` is a FeatureCollection.
///
/// # Errors
/// Fails when the file cannot be read, or with an invalid-input error when
/// neither token appears anywhere in it.
pub fn is_feature_collection(path: &Utf8Path) -> Result<bool, StreamError> {
    let file =
        featurestream_fs::open_std_file(path).map_err(|err| StreamError::from_io(path, err))?;
    scan_shape(BufReader::new(file))
        .map_err(|err| StreamError::from_io(path, err))?
        .ok_or_else(|| StreamError::invalid(format!("No features or geometry found in {path}")))
}

/// Scan `reader` line by line, stopping at the first token found.
pub(crate) fn scan_shape<R: BufRead>(mut reader: R) -> std::io::Result<Option<bool>> {
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        if contains(&line, FEATURES_TOKEN) {
            return Ok(Some(true));
        }
        if contains(&line, GEOMETRY_TOKEN) {
            return Ok(Some(false));
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
