//! Helpers shared by the integration and behaviour tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use base64::{Engine as _, engine::general_purpose};
use camino::{Utf8Path, Utf8PathBuf};
use featurestream_data::{FeatureRecord, StreamError};
use futures_util::{Stream, StreamExt};
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Directory containing the fixture files.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// A temporary workspace with a UTF-8 root.
pub struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap_or_else(|err| {
            panic!("failed to create temporary workspace: {err}");
        });
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .unwrap_or_else(|path| panic!("temporary workspace {path:?} is not UTF-8"));
        Self { _dir: dir, root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Write raw bytes to `name` inside the workspace.
    pub fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> Utf8PathBuf {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap_or_else(|err| {
                panic!("failed to create {parent}: {err}");
            });
        }
        fs::write(&path, contents).unwrap_or_else(|err| {
            panic!("failed to write fixture {path}: {err}");
        });
        path
    }

    /// Copy a plain-text fixture into the workspace under its own name.
    pub fn copy_fixture(&self, name: &str) -> Utf8PathBuf {
        let source = fixtures_dir().join(name);
        let contents = fs::read(&source).unwrap_or_else(|err| {
            panic!("failed to read fixture {source:?}: {err}");
        });
        self.write(name, contents)
    }

    /// Decode `<name>.b64` into `target` inside the workspace.
    pub fn decode_fixture(&self, name: &str, target: &str) -> Utf8PathBuf {
        let encoded_path = fixtures_dir().join(format!("{name}.b64"));
        let encoded = fs::read_to_string(&encoded_path).unwrap_or_else(|err| {
            panic!("failed to read base64 fixture {encoded_path:?}: {err}");
        });
        let cleaned: String = encoded
            .chars()
            .filter(|ch| !ch.is_ascii_whitespace())
            .collect();
        let decoded = general_purpose::STANDARD
            .decode(cleaned.as_bytes())
            .unwrap_or_else(|err| {
                panic!("failed to decode base64 fixture {encoded_path:?}: {err}");
            });
        self.write(target, decoded)
    }

    /// Lay out the three-point Shapefile as `<stem>.shp` plus `sidecars`.
    pub fn points_shapefile(&self, stem: &str, sidecars: &[&str]) -> Utf8PathBuf {
        for extension in sidecars {
            self.decode_fixture(&format!("points.{extension}"), &format!("{stem}.{extension}"));
        }
        self.decode_fixture("points.shp", &format!("{stem}.shp"))
    }
}

/// Everything a stream delivered, split at its terminal event.
#[derive(Debug)]
pub struct Drained {
    pub records: Vec<FeatureRecord>,
    pub error: Option<StreamError>,
}

impl Drained {
    pub fn expect_error(self) -> StreamError {
        self.error.unwrap_or_else(|| {
            panic!(
                "expected the stream to fail, but it ended after {} records",
                self.records.len()
            )
        })
    }

    pub fn expect_records(self) -> Vec<FeatureRecord> {
        if let Some(err) = self.error {
            panic!("expected the stream to succeed, got {err}");
        }
        self.records
    }
}

/// Drain an async stream, asserting that nothing follows its terminal event.
pub async fn drain<S>(mut stream: S) -> Drained
where
    S: Stream<Item = Result<FeatureRecord, StreamError>> + Unpin,
{
    let mut records = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(record) => records.push(record),
            Err(err) => {
                assert!(
                    stream.next().await.is_none(),
                    "stream yielded an item after its error"
                );
                return Drained {
                    records,
                    error: Some(err),
                };
            }
        }
    }
    Drained {
        records,
        error: None,
    }
}

/// Drain a blocking iterator with the same rules as [`drain`].
pub fn drain_blocking<I>(mut iter: I) -> Drained
where
    I: Iterator<Item = Result<FeatureRecord, StreamError>>,
{
    let mut records = Vec::new();
    while let Some(item) = iter.next() {
        match item {
            Ok(record) => records.push(record),
            Err(err) => {
                assert!(iter.next().is_none(), "iterator yielded an item after its error");
                return Drained {
                    records,
                    error: Some(err),
                };
            }
        }
    }
    Drained {
        records,
        error: None,
    }
}
