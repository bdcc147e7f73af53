//! The closed vocabulary of file types the sniffer can report.

use std::fmt;

/// Type of a geospatial file as determined from its contents.
///
/// Formats that can be recognised but not streamed are carried as
/// [`FileType::Unrecognized`] with the sniffer's tag, so error messages can
/// name them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileType {
    /// GeoJSON text holding a Feature or FeatureCollection.
    GeoJson,
    /// Delimited text with a header row and coordinate columns.
    Csv,
    /// The `.shp` component of an ESRI Shapefile.
    Shapefile,
    /// A zip archive expected to contain a Shapefile.
    Zip,
    /// A detected format that cannot be streamed.
    Unrecognized(String),
}

impl FileType {
    /// Canonical tag for the type.
    ///
    /// # Examples
    /// ```
    /// use featurestream_core::FileType;
    ///
    /// assert_eq!(FileType::Shapefile.tag(), "shp");
    /// assert_eq!(FileType::Unrecognized("tif".into()).tag(), "tif");
    /// ```
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::GeoJson => "geojson",
            Self::Csv => "csv",
            Self::Shapefile => "shp",
            Self::Zip => "zip",
            Self::Unrecognized(tag) => tag,
        }
    }

    /// Map a tag back onto the vocabulary.
    ///
    /// Unknown tags become [`FileType::Unrecognized`].
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "geojson" => Self::GeoJson,
            "csv" => Self::Csv,
            "shp" => Self::Shapefile,
            "zip" => Self::Zip,
            other => Self::Unrecognized(other.to_owned()),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
