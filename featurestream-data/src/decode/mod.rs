//! Vector decoders for delimited text and Shapefiles.
//!
//! A [`Datasource`] turns a file of a declared [`VectorKind`] into a
//! sequence of GeoJSON features. Each feature carries a synthetic ordinal
//! `id`; callers that expose records to consumers strip it. Diagnostics are
//! prefixed with the plugin that raised them (`CSV Plugin:` or
//! `Shape Plugin:`), except for coordinate parse failures.

use std::{collections::HashMap, fmt, io, ops::ControlFlow, sync::OnceLock};

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use thiserror::Error;

mod delimited;
mod shp;

pub use delimited::CsvDatasource;
pub(crate) use delimited::sniff_header;
pub use shp::ShapeDatasource;

/// Prefix carried by delimited-text diagnostics.
pub const CSV_PLUGIN: &str = "CSV Plugin";
/// Prefix carried by Shapefile diagnostics.
pub const SHAPE_PLUGIN: &str = "Shape Plugin";

/// Source formats the decoders understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorKind {
    /// Delimited text with coordinate or GeoJSON geometry columns.
    Csv,
    /// An ESRI Shapefile addressed by its `.shp` component.
    Shapefile,
}

impl VectorKind {
    /// Name of the plugin that decodes this kind.
    #[must_use]
    pub const fn plugin(self) -> &'static str {
        match self {
            Self::Csv => CSV_PLUGIN,
            Self::Shapefile => SHAPE_PLUGIN,
        }
    }
}

impl fmt::Display for VectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Shapefile => "shp",
        })
    }
}

/// Options used to open a [`Datasource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasourceOptions {
    /// File to decode.
    pub path: Utf8PathBuf,
    /// Declared type of the file.
    pub kind: VectorKind,
    /// Fail on malformed rows instead of skipping them.
    pub strict: bool,
}

impl DatasourceOptions {
    /// Options for a strict decoder over `path`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, kind: VectorKind) -> Self {
        Self {
            path: path.into(),
            kind,
            strict: true,
        }
    }

    /// Choose strict or lenient row handling.
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Failures raised by the decoders.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The file's contents could not be decoded.
    #[error("{message}")]
    Invalid { message: String },
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DecodeError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub(crate) fn io(path: &Utf8Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Role a delimited-text column plays in building geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnRole {
    Longitude,
    Latitude,
    GeoJson,
}

/// Process-wide decoder setup, performed once on first use.
#[derive(Debug)]
pub(crate) struct DecoderRegistry {
    kinds: [VectorKind; 2],
    column_roles: HashMap<&'static str, ColumnRole>,
}

impl DecoderRegistry {
    fn with_default_decoders() -> Self {
        let mut column_roles = HashMap::new();
        for name in ["lon", "lng", "long", "longitude", "x"] {
            column_roles.insert(name, ColumnRole::Longitude);
        }
        for name in ["lat", "latitude", "y"] {
            column_roles.insert(name, ColumnRole::Latitude);
        }
        column_roles.insert("geojson", ColumnRole::GeoJson);
        Self {
            kinds: [VectorKind::Csv, VectorKind::Shapefile],
            column_roles,
        }
    }

    /// Role of a header name, matched case-insensitively.
    pub(crate) fn column_role(&self, name: &str) -> Option<ColumnRole> {
        let normalised = name
            .trim_start_matches('\u{feff}')
            .trim()
            .trim_matches('"')
            .to_ascii_lowercase();
        self.column_roles.get(normalised.as_str()).copied()
    }

    /// Kinds with a registered decoder.
    pub(crate) fn kinds(&self) -> &[VectorKind] {
        &self.kinds
    }
}

/// Register the default decoders, returning the shared registry.
///
/// Safe to call from any number of threads; setup runs at most once.
pub(crate) fn registry() -> &'static DecoderRegistry {
    static REGISTRY: OnceLock<DecoderRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let registry = DecoderRegistry::with_default_decoders();
        debug!(
            "registered vector decoders: {}",
            registry
                .kinds()
                .iter()
                .map(|kind| kind.plugin())
                .collect::<Vec<_>>()
                .join(", ")
        );
        registry
    })
}

/// An opened decoder ready to yield features.
#[derive(Debug)]
pub enum Datasource {
    /// Delimited text decoder.
    Csv(CsvDatasource),
    /// Shapefile decoder.
    Shapefile(ShapeDatasource),
}

impl Datasource {
    /// Open a decoder for `options.path`.
    ///
    /// Header and sidecar problems are detected here, before any feature is
    /// produced.
    pub fn open(options: &DatasourceOptions) -> Result<Self, DecodeError> {
        let registry = registry();
        debug_assert!(registry.kinds().contains(&options.kind));
        match options.kind {
            VectorKind::Csv => CsvDatasource::open(&options.path, options.strict).map(Self::Csv),
            VectorKind::Shapefile => ShapeDatasource::open(&options.path).map(Self::Shapefile),
        }
    }

    /// Feed every decoded feature to `visit` until exhaustion or until
    /// `visit` breaks.
    pub fn for_each_feature<F>(self, visit: F) -> Result<(), DecodeError>
    where
        F: FnMut(geojson::Feature) -> ControlFlow<()>,
    {
        match self {
            Self::Csv(source) => source.for_each_feature(visit),
            Self::Shapefile(source) => source.for_each_feature(visit),
        }
    }
}

/// Build a feature carrying the decoder's synthetic ordinal `id`.
pub(crate) fn numbered_feature(
    ordinal: u64,
    geometry: Option<geojson::Geometry>,
    properties: geojson::JsonObject,
) -> geojson::Feature {
    geojson::Feature {
        bbox: None,
        geometry,
        id: Some(geojson::feature::Id::Number(ordinal.into())),
        properties: Some(properties),
        foreign_members: None,
    }
}
