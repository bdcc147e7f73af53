//! Tunables for a feature streaming request.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Default number of records the producer may run ahead of the consumer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1;

/// Default number of bytes read when sniffing a file's type.
pub const DEFAULT_SNIFF_PROBE_BYTES: usize = 1024;

/// Smallest probe that can still hold every magic number the sniffer checks.
pub const MIN_SNIFF_PROBE_BYTES: usize = 16;

/// Configuration applied to a single streaming request.
///
/// Every field has a default, so partial configuration documents
/// deserialize cleanly.
///
/// # Examples
/// ```
/// use featurestream_core::StreamOptions;
///
/// let options = StreamOptions::default()
///     .with_channel_capacity(8)
///     .with_csv_strict(false);
/// assert_eq!(options.channel_capacity(), 8);
/// assert!(!options.csv_strict);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamOptions {
    /// Records the producer may buffer ahead of the consumer.
    pub channel_capacity: usize,
    /// Bytes inspected when sniffing the file type.
    pub sniff_probe_bytes: usize,
    /// Fail the whole stream on a malformed CSV row rather than skipping it.
    pub csv_strict: bool,
    /// Parent directory for temporary archive extraction.
    ///
    /// Falls back to the system temporary directory when unset.
    pub extract_dir: Option<Utf8PathBuf>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            sniff_probe_bytes: DEFAULT_SNIFF_PROBE_BYTES,
            csv_strict: true,
            extract_dir: None,
        }
    }
}

impl StreamOptions {
    /// Set the backpressure window.
    #[must_use]
    pub const fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the sniffing probe size.
    #[must_use]
    pub const fn with_sniff_probe_bytes(mut self, bytes: usize) -> Self {
        self.sniff_probe_bytes = bytes;
        self
    }

    /// Choose between strict and lenient CSV parsing.
    #[must_use]
    pub const fn with_csv_strict(mut self, strict: bool) -> Self {
        self.csv_strict = strict;
        self
    }

    /// Extract archives beneath `dir`.
    #[must_use]
    pub fn with_extract_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.extract_dir = Some(dir.into());
        self
    }

    /// Backpressure window, never less than one record.
    #[must_use]
    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity.max(1)
    }

    /// Sniffing probe size, never less than [`MIN_SNIFF_PROBE_BYTES`].
    #[must_use]
    pub fn sniff_probe_bytes(&self) -> usize {
        self.sniff_probe_bytes.max(MIN_SNIFF_PROBE_BYTES)
    }
}
