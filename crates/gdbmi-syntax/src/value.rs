//! Generic structured values carried by record payloads.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// A payload value: a string, a tuple of named fields or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Text, already escape-decoded.
    String(String),
    /// Named fields.
    Tuple(Tuple),
    /// Ordered values. A list of results is represented as a list of
    /// single-field tuples.
    List(Vec<Value>),
}

impl Value {
    /// Returns the text if this value is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text),
            Self::Tuple(_) | Self::List(_) => None,
        }
    }

    /// Returns the fields if this value is a tuple.
    #[must_use]
    pub const fn as_tuple(&self) -> Option<&Tuple> {
        match self {
            Self::Tuple(tuple) => Some(tuple),
            Self::String(_) | Self::List(_) => None,
        }
    }

    /// Returns the elements if this value is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            Self::String(_) | Self::Tuple(_) => None,
        }
    }

    /// Looks up a field when this value is a tuple.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Self> {
        self.as_tuple().and_then(|tuple| tuple.get(name))
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::String(text.to_owned())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::String(text)
    }
}

impl From<Tuple> for Value {
    fn from(tuple: Tuple) -> Self {
        Self::Tuple(tuple)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(text) => write!(formatter, "{text:?}"),
            Self::Tuple(tuple) => fmt::Display::fmt(tuple, formatter),
            Self::List(items) => {
                formatter.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        formatter.write_str(",")?;
                    }
                    fmt::Display::fmt(item, formatter)?;
                }
                formatter.write_str("]")
            }
        }
    }
}

/// Named fields of a tuple. Field names are unique; inserting an existing
/// name replaces the previous value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Tuple {
    fields: BTreeMap<String, Value>,
}

impl Tuple {
    /// Creates an empty tuple.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    /// Inserts a field, returning the value it replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Looks up a field and returns it only if it is a string.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Removes a field.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Whether a field is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the tuple has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K, V> FromIterator<(K, V)> for Tuple
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tuple = Self::new();
        for (name, value) in iter {
            tuple.insert(name, value);
        }
        tuple
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("{")?;
        for (index, (name, value)) in self.iter().enumerate() {
            if index > 0 {
                formatter.write_str(",")?;
            }
            write!(formatter, "{name}={value}")?;
        }
        formatter.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn later_field_replaces_earlier() {
        let mut tuple = Tuple::new();
        tuple.insert("frame", "a");
        let replaced = tuple.insert("frame", "b");

        assert_eq!(replaced, Some(Value::from("a")));
        assert_eq!(tuple.get_str("frame"), Some("b"));
        assert_eq!(tuple.len(), 1);
    }

    #[rstest]
    fn displays_in_wire_like_form() {
        let inner: Tuple = [("line", "12")].into_iter().collect();
        let mut tuple = Tuple::new();
        tuple.insert("bkpt", inner);
        tuple.insert("ids", vec![Value::from("1"), Value::from("2")]);

        assert_eq!(tuple.to_string(), r#"{bkpt={line="12"},ids=["1","2"]}"#);
    }

    #[rstest]
    fn serialises_to_natural_json() {
        let mut tuple = Tuple::new();
        tuple.insert("msg", "oops");
        tuple.insert("list", vec![Value::from("x")]);

        let json = serde_json::to_value(Value::from(tuple)).expect("serialise");

        assert_eq!(json, serde_json::json!({"msg": "oops", "list": ["x"]}));
    }

    #[rstest]
    fn accessors_reject_other_shapes() {
        let value = Value::from("text");

        assert_eq!(value.as_str(), Some("text"));
        assert!(value.as_tuple().is_none());
        assert!(value.as_list().is_none());
        assert!(value.get("anything").is_none());
    }
}
