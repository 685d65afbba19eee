use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::rule::RailError;

/// Flat map of named signals describing one candidate action. Rails pick
/// the keys they care about; no schema is enforced here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionContext {
    signals: BTreeMap<String, Value>,
}

impl DecisionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.signals.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.signals.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.signals.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Numeric signal lookup. Numeric strings are accepted since upstream
    /// exporters often quote decimals; anything else present under the key
    /// is an error rather than a silent miss.
    pub fn number(&self, key: &str) -> Result<Option<f64>, RailError> {
        let parsed = match self.signals.get(key) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Number(number)) => number.as_f64(),
            Some(Value::String(raw)) => raw.trim().parse::<f64>().ok(),
            Some(_) => None,
        };

        match parsed {
            Some(value) if value.is_finite() => Ok(Some(value)),
            _ => Err(RailError::InvalidSignal {
                key: key.to_string(),
                expected: "finite number",
            }),
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.signals.get(key).and_then(Value::as_str)
    }
}

impl FromIterator<(String, Value)> for DecisionContext {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            signals: iter.into_iter().collect(),
        }
    }
}
