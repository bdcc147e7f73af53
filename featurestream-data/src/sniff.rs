//! Content-based file type detection.
//!
//! Extensions are never consulted: the first few hundred bytes of a file
//! decide its type. Formats the streamers do not handle are still named, so
//! callers can report what they were given.

use std::io::Read;

use camino::Utf8Path;
use featurestream_core::{FileType, StreamError};
use log::debug;

use crate::decode::sniff_header;

const ZIP_SIGNATURES: [&[u8]; 3] = [b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];
const SHAPEFILE_CODE: [u8; 4] = 9994_i32.to_be_bytes();
const TIFF_SIGNATURES: [&[u8]; 2] = [b"II*\0", b"MM\0*"];
const SQLITE_SIGNATURE: &[u8] = b"SQLite format 3\0";
const BOM: &str = "\u{feff}";

/// Determine the type of the file at `path` from at most `probe_bytes` of
/// its contents.
///
/// # Errors
/// Returns a not-found error when `path` does not exist, a system error when
/// it cannot be read, and an invalid-input error when nothing recognisable
/// was found.
pub fn sniff(path: &Utf8Path, probe_bytes: usize) -> Result<FileType, StreamError> {
    let file =
        featurestream_fs::open_std_file(path).map_err(|err| StreamError::from_io(path, err))?;
    let mut probe = Vec::with_capacity(probe_bytes);
    file.take(u64::try_from(probe_bytes).unwrap_or(u64::MAX))
        .read_to_end(&mut probe)
        .map_err(|err| StreamError::from_io(path, err))?;

    let file_type = detect(&probe)
        .ok_or_else(|| StreamError::invalid("Unable to parse file as geospatial data"))?;
    debug!("sniffed {path} as {file_type}");
    Ok(file_type)
}

/// Classify a probe buffer, returning `None` when no rule matches.
pub(crate) fn detect(probe: &[u8]) -> Option<FileType> {
    if ZIP_SIGNATURES.iter().any(|magic| probe.starts_with(magic)) {
        return Some(FileType::Zip);
    }
    if probe.starts_with(&SHAPEFILE_CODE) {
        return Some(FileType::Shapefile);
    }
    if TIFF_SIGNATURES.iter().any(|magic| probe.starts_with(magic)) {
        return Some(FileType::Unrecognized("tif".into()));
    }
    if probe.starts_with(SQLITE_SIGNATURE) {
        return Some(FileType::Unrecognized("mbtiles".into()));
    }
    detect_text(text_prefix(probe)?)
}

/// The probe as text, or `None` for binary content.
///
/// A multi-byte character cut off by the probe boundary is dropped.
fn text_prefix(probe: &[u8]) -> Option<&str> {
    if probe.contains(&0) {
        return None;
    }
    let text = match std::str::from_utf8(probe) {
        Ok(text) => text,
        Err(err) if err.error_len().is_none() => {
            std::str::from_utf8(&probe[..err.valid_up_to()]).ok()?
        }
        Err(_) => return None,
    };
    Some(text.strip_prefix(BOM).unwrap_or(text))
}

fn detect_text(text: &str) -> Option<FileType> {
    if text.contains("<kml") {
        return Some(FileType::Unrecognized("kml".into()));
    }
    if text.contains("<gpx") {
        return Some(FileType::Unrecognized("gpx".into()));
    }
    if text.trim_start().starts_with('{') {
        if text.contains("\"Topology\"") {
            return Some(FileType::Unrecognized("topojson".into()));
        }
        if text.contains("\"tilejson\"") {
            return Some(FileType::Unrecognized("tilejson".into()));
        }
        if ["\"type\"", "\"features\"", "\"geometry\""]
            .iter()
            .any(|token| text.contains(token))
        {
            return Some(FileType::GeoJson);
        }
        return None;
    }
    let header = text.lines().next()?;
    sniff_header(header).then_some(FileType::Csv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Scratch, decode_fixture_bytes};
    use featurestream_core::ErrorKind;
    use rstest::{fixture, rstest};

    #[fixture]
    fn scratch() -> Scratch {
        Scratch::new()
    }

    #[rstest]
    #[case(b"PK\x03\x04rest".as_slice(), FileType::Zip)]
    #[case(b"PK\x05\x06".as_slice(), FileType::Zip)]
    #[case(b"\x00\x00\x27\x0a\0\0".as_slice(), FileType::Shapefile)]
    #[case(b"II*\0data".as_slice(), FileType::Unrecognized("tif".into()))]
    #[case(b"MM\0*data".as_slice(), FileType::Unrecognized("tif".into()))]
    #[case(b"SQLite format 3\0tiles".as_slice(), FileType::Unrecognized("mbtiles".into()))]
    #[case(b"<?xml version=\"1.0\"?><kml>".as_slice(), FileType::Unrecognized("kml".into()))]
    #[case(b"<gpx version=\"1.1\">".as_slice(), FileType::Unrecognized("gpx".into()))]
    #[case(
        br#"{"type":"Topology","objects":{}}"#.as_slice(),
        FileType::Unrecognized("topojson".into())
    )]
    #[case(br#"{"tilejson":"2.2.0"}"#.as_slice(), FileType::Unrecognized("tilejson".into()))]
    #[case(b"\n  {\"type\": \"FeatureCollection\"".as_slice(), FileType::GeoJson)]
    #[case(b"\xef\xbb\xbf{\"geometry\": null}".as_slice(), FileType::GeoJson)]
    #[case(b"id,lng,lat\nfoo,1,2\n".as_slice(), FileType::Csv)]
    #[case(b"name\tgeojson\n".as_slice(), FileType::Csv)]
    fn detects_known_signatures(#[case] probe: &[u8], #[case] expected: FileType) {
        assert_eq!(detect(probe), Some(expected));
    }

    #[rstest]
    #[case(b"".as_slice())]
    #[case(b"name,value\nalpha,1\n".as_slice())]
    #[case(b"{\"hello\": \"world\"}".as_slice())]
    #[case(b"\x00\x01\x02\x03".as_slice())]
    #[case(b"\xff\xfe\xfd".as_slice())]
    fn rejects_unknown_content(#[case] probe: &[u8]) {
        assert_eq!(detect(probe), None);
    }

    #[rstest]
    fn tolerates_a_truncated_character() {
        let mut probe = b"id,lon,lat\nMal".to_vec();
        probe.extend_from_slice(&"m\u{f6}".as_bytes()[..2]);
        assert_eq!(detect(&probe), Some(FileType::Csv));
    }

    #[rstest]
    fn sniffs_files_on_disk(scratch: Scratch) {
        let zip = scratch.write("upload", decode_fixture_bytes("points.zip"));
        let csv = scratch.copy_fixture("valid-features.csv");
        let geojson = scratch.copy_fixture("valid-feature-collection.geojson");

        assert_eq!(sniff(&zip, 1024).ok(), Some(FileType::Zip));
        assert_eq!(sniff(&csv, 1024).ok(), Some(FileType::Csv));
        assert_eq!(sniff(&geojson, 16).ok(), Some(FileType::GeoJson));
    }

    #[rstest]
    fn missing_files_are_not_found(scratch: Scratch) {
        let path = scratch.root().join("i/do/not/exist.geojson");
        let err = sniff(&path, 1024).err().unwrap_or_else(|| panic!("expected an error"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.message().starts_with("ENOENT"));
    }

    #[rstest]
    fn empty_files_are_unparseable(scratch: Scratch) {
        let path = scratch.write("empty.geojson", "");
        let err = sniff(&path, 1024).err().unwrap_or_else(|| panic!("expected an error"));
        assert!(err.is_invalid());
        assert_eq!(err.message(), "Unable to parse file as geospatial data");
    }
}
