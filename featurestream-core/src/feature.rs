//! The normalized feature record emitted by every stream.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A GeoJSON-shaped feature.
///
/// Records are opaque pass-through values: the streamers never validate the
/// geometry or rewrite the properties. Accessors exist for convenience only.
///
/// # Examples
/// ```
/// use featurestream_core::FeatureRecord;
/// use serde_json::json;
///
/// let record = FeatureRecord::new(json!({
///     "type": "Feature",
///     "properties": { "name": "Null Island" },
///     "geometry": { "type": "Point", "coordinates": [0.0, 0.0] }
/// }));
/// assert_eq!(record.feature_type(), Some("Feature"));
/// assert_eq!(record.geometry_type(), Some("Point"));
/// assert!(record.id().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRecord(Value);

impl FeatureRecord {
    /// Wrap a parsed JSON value.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(value)
    }

    /// The `type` discriminator, normally `"Feature"`.
    #[must_use]
    pub fn feature_type(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    /// The `properties` member when it is an object.
    #[must_use]
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.0.get("properties").and_then(Value::as_object)
    }

    /// The raw `geometry` member, which may be `null`.
    #[must_use]
    pub fn geometry(&self) -> Option<&Value> {
        self.0.get("geometry")
    }

    /// The geometry's `type` discriminator.
    #[must_use]
    pub fn geometry_type(&self) -> Option<&str> {
        self.geometry()
            .and_then(|geometry| geometry.get("type"))
            .and_then(Value::as_str)
    }

    /// The record's `id` member, if any.
    #[must_use]
    pub fn id(&self) -> Option<&Value> {
        self.0.get("id")
    }

    /// Remove and return the record's `id` member.
    pub fn remove_id(&mut self) -> Option<Value> {
        self.0.as_object_mut().and_then(|object| object.remove("id"))
    }

    /// Borrow the underlying JSON value.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consume the record, returning the underlying JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for FeatureRecord {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<FeatureRecord> for Value {
    fn from(record: FeatureRecord) -> Self {
        record.0
    }
}
