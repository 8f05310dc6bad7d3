//! Parameter schemas and validated parameter maps.
//!
//! Every indicator declares its recognized options as a list of [`ParamSpec`]s.
//! Callers hand in a loose [`Params`] map which is resolved against that schema
//! before any computation starts.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Integer,
    Decimal,
    Boolean,
    Text,
}

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(i64),
    Boolean(bool),
    Decimal(Decimal),
    Text(String),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Integer(_) => ParamKind::Integer,
            ParamValue::Decimal(_) => ParamKind::Decimal,
            ParamValue::Boolean(_) => ParamKind::Boolean,
            ParamValue::Text(_) => ParamKind::Text,
        }
    }

    /// Numeric view used for bounds checks.
    fn as_decimal(&self) -> Option<Decimal> {
        match self {
            ParamValue::Integer(v) => Some(Decimal::from(*v)),
            ParamValue::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    /// Coerce to `kind` where it is lossless (integer → decimal, integral decimal → integer).
    fn coerce(self, kind: ParamKind) -> Option<ParamValue> {
        match (self, kind) {
            (v @ ParamValue::Integer(_), ParamKind::Integer) => Some(v),
            (v @ ParamValue::Decimal(_), ParamKind::Decimal) => Some(v),
            (v @ ParamValue::Boolean(_), ParamKind::Boolean) => Some(v),
            (v @ ParamValue::Text(_), ParamKind::Text) => Some(v),
            (ParamValue::Integer(v), ParamKind::Decimal) => Some(ParamValue::Decimal(Decimal::from(v))),
            (ParamValue::Decimal(v), ParamKind::Integer) if v.fract().is_zero() => {
                v.to_i64().map(ParamValue::Integer)
            }
            _ => None,
        }
    }

    /// Parse a textual value (e.g. from a CLI flag) into the most specific variant.
    pub fn parse(raw: &str) -> ParamValue {
        let raw = raw.trim();
        if let Ok(v) = raw.parse::<i64>() {
            return ParamValue::Integer(v);
        }
        if let Ok(v) = Decimal::from_str(raw) {
            return ParamValue::Decimal(v);
        }
        match raw {
            "true" => ParamValue::Boolean(true),
            "false" => ParamValue::Boolean(false),
            _ => ParamValue::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Integer(v) => write!(f, "{}", v),
            ParamValue::Decimal(v) => write!(f, "{}", v.normalize()),
            ParamValue::Boolean(v) => write!(f, "{}", v),
            ParamValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Integer(v)
    }
}

impl From<Decimal> for ParamValue {
    fn from(v: Decimal) -> Self {
        ParamValue::Decimal(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Boolean(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

/// Declared schema entry for one parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub default: Option<ParamValue>,
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    /// An optional integer parameter with a default and inclusive bounds.
    pub fn integer(name: &str, default: i64, min: i64, max: i64, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamKind::Integer,
            default: Some(ParamValue::Integer(default)),
            min: Some(Decimal::from(min)),
            max: Some(Decimal::from(max)),
            required: false,
            description: description.to_string(),
        }
    }

    /// An optional decimal parameter with a default and inclusive bounds.
    pub fn decimal(name: &str, default: Decimal, min: Decimal, max: Decimal, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamKind::Decimal,
            default: Some(ParamValue::Decimal(default)),
            min: Some(min),
            max: Some(max),
            required: false,
            description: description.to_string(),
        }
    }

    /// An optional boolean flag.
    pub fn boolean(name: &str, default: bool, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamKind::Boolean,
            default: Some(ParamValue::Boolean(default)),
            min: None,
            max: None,
            required: false,
            description: description.to_string(),
        }
    }

    /// Mark the parameter as required; its default is dropped.
    pub fn required(mut self) -> Self {
        self.required = true;
        self.default = None;
        self
    }

    fn check_bounds(&self, value: &ParamValue) -> Result<(), ParamError> {
        let Some(v) = value.as_decimal() else {
            return Ok(());
        };
        let below = self.min.map(|min| v < min).unwrap_or(false);
        let above = self.max.map(|max| v > max).unwrap_or(false);
        if below || above {
            return Err(ParamError::OutOfRange {
                name: self.name.clone(),
                value: value.to_string(),
                min: self.min.map(|m| m.to_string()),
                max: self.max.map(|m| m.to_string()),
            });
        }
        Ok(())
    }
}

/// Errors raised while resolving parameters against a schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    #[error("missing required parameter '{0}'")]
    Missing(String),
    #[error("parameter '{name}' expects {expected:?}, got {actual:?}")]
    WrongType {
        name: String,
        expected: ParamKind,
        actual: ParamKind,
    },
    #[error("parameter '{name}' = {value} is outside [{min:?}, {max:?}]")]
    OutOfRange {
        name: String,
        value: String,
        min: Option<String>,
        max: Option<String>,
    },
    #[error("unknown parameter '{0}'")]
    Unknown(String),
    #[error("parameter '{name}' is invalid: {reason}")]
    Invalid { name: String, reason: String },
}

/// A parameter map. Keys are kept sorted so the map has one canonical form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Canonical `k=v;k=v` rendering in key order.
    pub fn canonical(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Validate against `schema` and fill in defaults for absent optional parameters.
    pub fn resolve(&self, schema: &[ParamSpec]) -> Result<Params, ParamError> {
        if let Some(unknown) = self.0.keys().find(|k| !schema.iter().any(|s| &s.name == *k)) {
            return Err(ParamError::Unknown(unknown.clone()));
        }

        let mut resolved = BTreeMap::new();
        for spec in schema {
            let value = match self.0.get(&spec.name) {
                Some(value) => {
                    let actual = value.kind();
                    value.clone().coerce(spec.kind).ok_or_else(|| ParamError::WrongType {
                        name: spec.name.clone(),
                        expected: spec.kind,
                        actual,
                    })?
                }
                None if spec.required => return Err(ParamError::Missing(spec.name.clone())),
                None => match &spec.default {
                    Some(default) => default.clone(),
                    None => continue,
                },
            };
            spec.check_bounds(&value)?;
            resolved.insert(spec.name.clone(), value);
        }
        Ok(Params(resolved))
    }

    /// Integer parameter as a `usize`; fails if absent or negative.
    pub fn usize(&self, name: &str) -> Result<usize, ParamError> {
        match self.0.get(name) {
            Some(ParamValue::Integer(v)) => usize::try_from(*v).map_err(|_| ParamError::Invalid {
                name: name.to_string(),
                reason: format!("{} is not a valid count", v),
            }),
            Some(other) => Err(ParamError::WrongType {
                name: name.to_string(),
                expected: ParamKind::Integer,
                actual: other.kind(),
            }),
            None => Err(ParamError::Missing(name.to_string())),
        }
    }

    /// Numeric parameter as a `Decimal`; integers are widened.
    pub fn decimal(&self, name: &str) -> Result<Decimal, ParamError> {
        match self.0.get(name) {
            Some(ParamValue::Decimal(v)) => Ok(*v),
            Some(ParamValue::Integer(v)) => Ok(Decimal::from(*v)),
            Some(other) => Err(ParamError::WrongType {
                name: name.to_string(),
                expected: ParamKind::Decimal,
                actual: other.kind(),
            }),
            None => Err(ParamError::Missing(name.to_string())),
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool, ParamError> {
        match self.0.get(name) {
            Some(ParamValue::Boolean(v)) => Ok(*v),
            Some(other) => Err(ParamError::WrongType {
                name: name.to_string(),
                expected: ParamKind::Boolean,
                actual: other.kind(),
            }),
            None => Err(ParamError::Missing(name.to_string())),
        }
    }
}

impl FromIterator<(String, ParamValue)> for Params {
    fn from_iter<T: IntoIterator<Item = (String, ParamValue)>>(iter: T) -> Self {
        Params(iter.into_iter().collect())
    }
}
