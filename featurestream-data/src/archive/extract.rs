//! Sandboxed extraction of a zipped Shapefile.

use std::{
    io::{self, BufReader, Read, Write},
    path::{Component, Path},
};

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use tempfile::TempDir;
use thiserror::Error;
use zip::{ZipArchive, result::ZipError};

const TEMP_PREFIX: &str = "featurestream-";
const SKIPPED_DIR: &str = "__MACOSX";

/// Failures raised while unpacking an archive.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The archive is corrupt or does not hold exactly one Shapefile.
    #[error("{message}")]
    Invalid { message: String },
    /// Reading the archive or writing its contents failed.
    #[error("failed to extract through {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExtractError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    fn io(path: &Utf8Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn from_zip(path: &Utf8Path, err: ZipError) -> Self {
        match err {
            ZipError::Io(source) if !is_corruption(&source) => Self::io(path, source),
            other => Self::invalid(other.to_string()),
        }
    }
}

/// Read failures that describe the archive's bytes rather than the device.
fn is_corruption(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof | io::ErrorKind::Other
    )
}

/// A Shapefile unpacked into a temporary directory.
///
/// The directory and everything in it are removed on drop.
#[derive(Debug)]
pub struct ExtractedShapefile {
    dir: TempDir,
    shp: Utf8PathBuf,
}

impl ExtractedShapefile {
    /// Path of the extracted `.shp` component.
    #[must_use]
    pub fn shp_path(&self) -> &Utf8Path {
        &self.shp
    }

    /// Directory holding the extracted files.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

/// Unpack `archive` and locate its single `.shp` entry.
///
/// Extraction happens beneath `parent` when given, otherwise beneath the
/// system temporary directory. `__MACOSX` metadata and dot-files are
/// skipped.
///
/// # Errors
/// Returns [`ExtractError::Invalid`] for corrupt archives and for archives
/// holding no `.shp` or more than one, and [`ExtractError::Io`] when the
/// filesystem fails.
pub fn extract_shapefile(
    archive: &Utf8Path,
    parent: Option<&Utf8Path>,
) -> Result<ExtractedShapefile, ExtractError> {
    let file = featurestream_fs::open_std_file(archive)
        .map_err(|err| ExtractError::io(archive, err))?;
    let mut zip =
        ZipArchive::new(BufReader::new(file)).map_err(|err| ExtractError::from_zip(archive, err))?;

    let dir = temp_dir(parent)?;
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).map_err(|path| {
        ExtractError::io(
            archive,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("temporary directory {} is not valid UTF-8", path.display()),
            ),
        )
    })?;
    let sandbox = featurestream_fs::open_dir(&root).map_err(|err| ExtractError::io(&root, err))?;

    let mut shapefiles = Vec::new();
    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|err| ExtractError::from_zip(archive, err))?;
        let Some(relative) = entry
            .enclosed_name()
            .map(|name| name.to_path_buf())
            .and_then(|name| Utf8PathBuf::from_path_buf(name).ok())
        else {
            warn!("skipping unsafe entry {:?} in {archive}", entry.name());
            continue;
        };
        if is_skipped(&relative) {
            continue;
        }
        if entry.is_dir() {
            sandbox
                .create_dir_all(&relative)
                .map_err(|err| ExtractError::io(&root.join(&relative), err))?;
            continue;
        }
        if let Some(parent) = relative.parent().filter(|parent| !parent.as_str().is_empty()) {
            sandbox
                .create_dir_all(parent)
                .map_err(|err| ExtractError::io(&root.join(parent), err))?;
        }
        let mut target = sandbox
            .create(&relative)
            .map_err(|err| ExtractError::io(&root.join(&relative), err))?;
        copy_entry(&mut entry, &mut target, &root.join(&relative))?;

        if relative
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("shp"))
        {
            shapefiles.push(relative);
        }
    }

    let shp = match shapefiles.as_slice() {
        [] => return Err(ExtractError::invalid("no .shp file found in archive")),
        [only] => root.join(only),
        many => {
            return Err(ExtractError::invalid(format!(
                "expected one .shp file in archive but found {}",
                many.len()
            )));
        }
    };
    debug!("extracted {archive} to {root}");
    Ok(ExtractedShapefile { dir, shp })
}

fn temp_dir(parent: Option<&Utf8Path>) -> Result<TempDir, ExtractError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(TEMP_PREFIX);
    match parent {
        Some(parent) => {
            featurestream_fs::ensure_dir(parent).map_err(|err| ExtractError::io(parent, err))?;
            builder
                .tempdir_in(parent)
                .map_err(|err| ExtractError::io(parent, err))
        }
        None => builder.tempdir().map_err(|err| {
            let base = std::env::temp_dir();
            ExtractError::io(Utf8Path::new(&base.to_string_lossy()), err)
        }),
    }
}

fn is_skipped(relative: &Utf8Path) -> bool {
    relative.as_std_path().components().any(|component| match component {
        Component::Normal(name) => {
            let name = name.to_string_lossy();
            name == SKIPPED_DIR || name.starts_with('.')
        }
        _ => false,
    })
}

/// Copy one entry, telling corrupt compressed data apart from write failures.
fn copy_entry<R: Read, W: Write>(
    entry: &mut R,
    target: &mut W,
    target_path: &Utf8Path,
) -> Result<(), ExtractError> {
    let mut buffer = [0_u8; 8192];
    loop {
        let read = match entry.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) if is_corruption(&err) => return Err(ExtractError::invalid(err.to_string())),
            Err(err) => return Err(ExtractError::io(target_path, err)),
        };
        target
            .write_all(&buffer[..read])
            .map_err(|err| ExtractError::io(target_path, err))?;
    }
    target
        .flush()
        .map_err(|err| ExtractError::io(target_path, err))
}
