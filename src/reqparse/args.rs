use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// The parsed arguments of one request: key → coerced value or default.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Args(Map<String, Value>);

impl Args {
    pub(crate) fn insert(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_owned(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// Deserializes one value; an absent key deserializes from `null`, so
    /// `Option<T>` targets see `None`.
    pub fn value<T: DeserializeOwned>(&self, key: &str) -> Result<T, serde_json::Error> {
        T::deserialize(self.0.get(key).unwrap_or(&Value::Null))
    }

    /// Deserializes every argument into one struct.
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&Value::Object(self.0.clone()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}
