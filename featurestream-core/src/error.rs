//! Classified errors shared by every streaming stage.
//!
//! Each stage converts its own failures into a [`StreamError`] before they
//! cross into the dispatcher, so consumers can branch on [`ErrorKind`] rather
//! than matching message text. A handful of messages are nevertheless
//! compatibility contracts and are produced verbatim by the stages.

use std::{error::Error as StdError, fmt, io};

use camino::Utf8Path;
use thiserror::Error;

/// Prefix carried by every [`ErrorKind::NotFound`] message.
pub const NOT_FOUND_MARKER: &str = "ENOENT";

type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// Coarse classification attached to every [`StreamError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The input is malformed or of an unsupported type.
    InvalidInput,
    /// The requested path does not exist.
    NotFound,
    /// An I/O or environment failure unrelated to the input's contents.
    System,
}

impl ErrorKind {
    /// Short code matching the conventional error code for the kind.
    ///
    /// # Examples
    /// ```
    /// use featurestream_core::ErrorKind;
    ///
    /// assert_eq!(ErrorKind::InvalidInput.code(), "EINVALID");
    /// assert_eq!(ErrorKind::NotFound.code(), "ENOENT");
    /// ```
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidInput => "EINVALID",
            Self::NotFound => NOT_FOUND_MARKER,
            Self::System => "ESYSTEM",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A failure surfaced through a feature stream.
///
/// The message is the human-readable contract; the kind is the
/// machine-readable one. Neither changes after construction.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StreamError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

impl StreamError {
    /// Classify `message` as invalid input.
    ///
    /// # Examples
    /// ```
    /// use featurestream_core::{ErrorKind, StreamError};
    ///
    /// let err = StreamError::invalid("Unable to parse file as geospatial data");
    /// assert_eq!(err.kind(), ErrorKind::InvalidInput);
    /// assert_eq!(err.to_string(), "Unable to parse file as geospatial data");
    /// ```
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidInput,
            message: message.into(),
            source: None,
        }
    }

    /// Classify `message` as invalid input, retaining the underlying cause.
    #[must_use]
    pub fn invalid_with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            kind: ErrorKind::InvalidInput,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Report that `path` does not exist.
    ///
    /// The message always begins with [`NOT_FOUND_MARKER`].
    ///
    /// # Examples
    /// ```
    /// use std::io;
    /// use camino::Utf8Path;
    /// use featurestream_core::{ErrorKind, StreamError, NOT_FOUND_MARKER};
    ///
    /// let cause = io::Error::from(io::ErrorKind::NotFound);
    /// let err = StreamError::not_found(Utf8Path::new("missing.geojson"), cause);
    /// assert_eq!(err.kind(), ErrorKind::NotFound);
    /// assert!(err.message().starts_with(NOT_FOUND_MARKER));
    /// ```
    #[must_use]
    pub fn not_found(path: &Utf8Path, source: io::Error) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            message: format!("{NOT_FOUND_MARKER}: no such file or directory, open '{path}'"),
            source: Some(Box::new(source)),
        }
    }

    /// Propagate a system-level failure, keeping its message unchanged.
    #[must_use]
    pub fn system<E>(source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            kind: ErrorKind::System,
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Classify an I/O failure raised while touching `path`.
    #[must_use]
    pub fn from_io(path: &Utf8Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::not_found(path, source)
        } else {
            Self::system(source)
        }
    }

    /// Classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the error is classified as invalid input.
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.kind == ErrorKind::InvalidInput
    }

    /// Whether the error reports a missing path.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}
