//! Raw upstream bus records and their canonical, validated form.

use serde::Serialize;
use serde_json::{Map, Value};
use std::borrow::Cow;

/// One bus position as delivered upstream: a JSON object whose fields may be
/// missing or carry any JSON type.
#[derive(Debug, Clone, Default)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    /// Wraps a JSON value, returning `None` when it is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The field as text: strings as-is, numbers in their decimal form.
    /// Any other type, or a missing field, yields `None`.
    pub fn text(&self, key: &str) -> Option<Cow<'_, str>> {
        match self.0.get(key)? {
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            _ => None,
        }
    }

    /// Vehicle id, used to tag diagnostics.
    pub fn ordem(&self) -> Option<Cow<'_, str>> {
        self.text("ordem")
    }
}

/// A validated bus position, serialized with the field names downstream
/// consumers already rely on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    pub ordem: Option<String>,
    pub linha: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Always > 0.
    pub velocidade: i64,
    /// Local time, `YYYY-MM-DD HH:MM:SS`.
    pub datahora_captura: String,
    /// Server receipt minus capture, in seconds. May be negative.
    pub atraso_transmissao_segundos: Option<f64>,
}
