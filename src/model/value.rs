//! Attribute values and object snapshots.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

static NULL_VALUE: Value = Value::Null;

/// A concrete attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Boolean value.
    Bool(bool),
    /// String value.
    String(String),
}

/// A tagged attribute value.
///
/// `Unknown` only exists at plan time and is never recorded; serializing
/// it fails.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    /// A concrete value.
    Known(Scalar),
    /// Explicitly absent.
    #[default]
    Null,
    /// Not yet determined.
    Unknown,
}

impl Value {
    /// Creates a known string value.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::Known(Scalar::String(value.into()))
    }

    /// Creates a known boolean value.
    #[must_use]
    pub const fn bool(value: bool) -> Self {
        Self::Known(Scalar::Bool(value))
    }

    /// Maps an optional string to a known value or `Null`.
    #[must_use]
    pub fn optional(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::string)
    }

    /// Returns true for a concrete value.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Returns true for `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true for `Unknown`.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Returns true if the value counts as supplied by the user.
    ///
    /// `Null`, `Unknown` and the empty string do not.
    #[must_use]
    pub fn is_supplied(&self) -> bool {
        match self {
            Self::Known(Scalar::String(s)) => !s.is_empty(),
            Self::Known(Scalar::Bool(_)) => true,
            Self::Null | Self::Unknown => false,
        }
    }

    /// Returns the string content of a known string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Known(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns the content of a known boolean value.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Known(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::string(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::bool(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(Scalar::String(s)) => write!(f, "\"{s}\""),
            Self::Known(Scalar::Bool(b)) => write!(f, "{b}"),
            Self::Null => write!(f, "null"),
            Self::Unknown => write!(f, "(known after apply)"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Known(scalar) => scalar.serialize(serializer),
            Self::Null => serializer.serialize_none(),
            Self::Unknown => Err(serde::ser::Error::custom(
                "unknown values cannot be recorded",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(Option::<Scalar>::deserialize(deserializer)?.map_or(Self::Null, Self::Known))
    }
}

/// An immutable snapshot of an object's attributes.
///
/// Missing attributes read as `Null`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Object {
    attributes: BTreeMap<String, Value>,
}

impl Object {
    /// Creates an empty object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this object with one attribute set.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Gets an attribute value.
    #[must_use]
    pub fn get(&self, name: &str) -> &Value {
        self.attributes.get(name).unwrap_or(&NULL_VALUE)
    }

    /// Gets a known string attribute.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).as_str()
    }

    /// Gets a known boolean attribute.
    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).as_bool()
    }

    /// Returns true if any attribute is `Unknown`.
    #[must_use]
    pub fn has_unknown(&self) -> bool {
        self.attributes.values().any(Value::is_unknown)
    }

    /// Iterates over the attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of attributes set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns true if no attribute is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            attributes: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_attribute_reads_null() {
        let object = Object::new().with("name", "test1");
        assert_eq!(object.get_str("name"), Some("test1"));
        assert!(object.get("description").is_null());
    }

    #[test]
    fn test_recorded_json_shape() {
        let object = Object::new()
            .with("id", "p1")
            .with("archived", false)
            .with("description", Value::Null);

        let json = serde_json::to_string(&object).unwrap();
        assert_eq!(json, r#"{"archived":false,"description":null,"id":"p1"}"#);

        let parsed: Object = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, object);
    }

    #[test]
    fn test_empty_string_is_not_supplied() {
        assert!(Value::string("alice@example.com").is_supplied());
        assert!(Value::bool(false).is_supplied());
        assert!(!Value::string("").is_supplied());
        assert!(!Value::Null.is_supplied());
        assert!(!Value::Unknown.is_supplied());
    }

    #[test]
    fn test_unknown_cannot_be_recorded() {
        let object = Object::new().with("id", Value::Unknown);
        assert!(object.has_unknown());
        assert!(serde_json::to_string(&object).is_err());
    }
}
