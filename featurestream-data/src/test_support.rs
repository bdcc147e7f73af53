//! Shared fixtures for unit tests across the streaming stages.

use std::{fs, path::PathBuf};

use base64::{Engine as _, engine::general_purpose};
use camino::{Utf8Path, Utf8PathBuf};
use featurestream_core::{FeatureRecord, StreamError};
use tempfile::TempDir;
use tokio::sync::mpsc;

use crate::sink::{FeatureSink, Halt, Message};

/// Large enough that fixture-sized stages never block.
const TEST_CAPACITY: usize = 1024;

/// Records and terminal state observed after running a stage.
#[derive(Debug)]
pub(crate) struct Collected {
    pub(crate) records: Vec<FeatureRecord>,
    pub(crate) error: Option<StreamError>,
}

/// Run `stage` against a fresh sink and collect everything it delivered.
pub(crate) fn run_stage<F>(stage: F) -> Collected
where
    F: FnOnce(&mut FeatureSink) -> Result<(), Halt>,
{
    let (mut sink, receiver) = FeatureSink::channel(TEST_CAPACITY);
    let outcome = stage(&mut sink);
    sink.finish(outcome);
    drain(receiver)
}

fn drain(mut receiver: mpsc::Receiver<Message>) -> Collected {
    let mut collected = Collected {
        records: Vec::new(),
        error: None,
    };
    while let Ok(message) = receiver.try_recv() {
        match message {
            Message::Feature(record) => {
                assert!(
                    collected.error.is_none(),
                    "record delivered after the stream failed"
                );
                collected.records.push(record);
            }
            Message::Failed(err) => collected.error = Some(err),
            Message::Finished => {}
        }
    }
    collected
}

/// A scratch directory whose path is guaranteed to be UTF-8.
#[derive(Debug)]
pub(crate) struct Scratch {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Scratch {
    pub(crate) fn new() -> Self {
        let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("create temp dir: {err}"));
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .unwrap_or_else(|path| panic!("temp dir {path:?} is not UTF-8"));
        Self { _dir: dir, root }
    }

    pub(crate) fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Write `contents` to `name` inside the scratch directory.
    pub(crate) fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> Utf8PathBuf {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .unwrap_or_else(|err| panic!("create fixture dir {parent}: {err}"));
        }
        fs::write(&path, contents).unwrap_or_else(|err| panic!("write fixture {path}: {err}"));
        path
    }

    /// Copy the named file from `tests/fixtures`.
    pub(crate) fn copy_fixture(&self, name: &str) -> Utf8PathBuf {
        let source = fixtures_dir().join(name);
        let contents =
            fs::read(&source).unwrap_or_else(|err| panic!("read fixture {source:?}: {err}"));
        self.write(name, contents)
    }

    /// Decode `tests/fixtures/<name>.b64` into `<target>` inside the scratch directory.
    pub(crate) fn decode_fixture(&self, name: &str, target: &str) -> Utf8PathBuf {
        self.write(target, decode_fixture_bytes(name))
    }
}

/// Directory containing the fixture files.
pub(crate) fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Read and decode a Base64-encoded fixture blob.
pub(crate) fn decode_fixture_bytes(name: &str) -> Vec<u8> {
    let encoded_path = fixtures_dir().join(format!("{name}.b64"));
    let encoded = fs::read_to_string(&encoded_path).unwrap_or_else(|err| {
        panic!("failed to read base64 fixture {encoded_path:?}: {err}");
    });
    let cleaned: String = encoded
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .unwrap_or_else(|err| {
            panic!("failed to decode base64 fixture {encoded_path:?}: {err}");
        })
}

/// Lay the points Shapefile out under `dir/<stem>.*`, optionally omitting sidecars.
pub(crate) fn write_points_shapefile(
    scratch: &Scratch,
    stem: &str,
    sidecars: &[&str],
) -> Utf8PathBuf {
    for extension in sidecars {
        scratch.decode_fixture(&format!("points.{extension}"), &format!("{stem}.{extension}"));
    }
    scratch.decode_fixture("points.shp", &format!("{stem}.shp"))
}
