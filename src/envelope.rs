//! Locates the bus-record list inside the upstream payload.
//!
//! The feed has changed its envelope more than once, so each known form is a
//! [`ShapeRule`] and [`EnvelopeUnwrapper`] tries them in order. Supporting a
//! new form means adding a rule; nothing downstream changes.

use serde_json::Value;
use tracing::debug;

use crate::error::ShapeError;

/// Recognizes one envelope form.
///
/// `extract` returns `None` when the payload does not have this shape, leaving
/// it untouched for the next rule. On a match it may take the record list out
/// of `payload`.
pub trait ShapeRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, payload: &mut Value) -> Option<Result<Vec<Value>, ShapeError>>;
}

/// The payload is the record list itself.
pub struct BareArray;

impl ShapeRule for BareArray {
    fn name(&self) -> &'static str {
        "bare_array"
    }

    fn extract(&self, payload: &mut Value) -> Option<Result<Vec<Value>, ShapeError>> {
        match payload {
            Value::Array(items) => Some(Ok(std::mem::take(items))),
            _ => None,
        }
    }
}

/// `{"data": "<json text>"}`: the record list is serialized inside a string.
pub struct DataString;

impl ShapeRule for DataString {
    fn name(&self) -> &'static str {
        "data_string"
    }

    fn extract(&self, payload: &mut Value) -> Option<Result<Vec<Value>, ShapeError>> {
        let Value::String(inner) = payload.get("data")? else {
            return None;
        };

        let decoded = match serde_json::from_str::<Value>(inner) {
            Ok(value) => value,
            Err(e) => return Some(Err(ShapeError::InnerJson(e))),
        };

        Some(match decoded {
            Value::Array(items) => Ok(items),
            _ => Err(ShapeError::UnrecognizedShape),
        })
    }
}

/// An object holding the record list under `key`.
pub struct KeyedArray {
    name: &'static str,
    key: &'static str,
}

impl KeyedArray {
    pub const fn new(name: &'static str, key: &'static str) -> Self {
        Self { name, key }
    }
}

impl ShapeRule for KeyedArray {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract(&self, payload: &mut Value) -> Option<Result<Vec<Value>, ShapeError>> {
        match payload.get_mut(self.key)? {
            Value::Array(items) => Some(Ok(std::mem::take(items))),
            _ => None,
        }
    }
}

/// Ordered list of shape rules; the first match wins.
pub struct EnvelopeUnwrapper {
    rules: Vec<Box<dyn ShapeRule>>,
}

impl EnvelopeUnwrapper {
    /// An unwrapper with no rules. Every payload is unrecognized until rules
    /// are added.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule with the lowest priority so far.
    pub fn with_rule(mut self, rule: impl ShapeRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|r| r.name())
    }

    /// Extracts the raw record list from a decoded payload.
    ///
    /// # Errors
    ///
    /// [`ShapeError::InnerJson`] if the `data` string does not decode, and
    /// [`ShapeError::UnrecognizedShape`] if no rule matches.
    pub fn unwrap(&self, mut payload: Value) -> Result<Vec<Value>, ShapeError> {
        for rule in &self.rules {
            if let Some(result) = rule.extract(&mut payload) {
                debug!(rule = rule.name(), ok = result.is_ok(), "Envelope shape matched");
                return result;
            }
        }

        debug!(kind = json_kind(&payload), "No envelope shape matched");
        Err(ShapeError::UnrecognizedShape)
    }
}

impl Default for EnvelopeUnwrapper {
    /// Known feed envelopes, most specific first.
    fn default() -> Self {
        Self::empty()
            .with_rule(BareArray)
            .with_rule(DataString)
            .with_rule(KeyedArray::new("data_array", "data"))
            .with_rule(KeyedArray::new("results_array", "results"))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
