use std::collections::BTreeMap;

use tracing::warn;

use crate::DecodeError;

const MAX_HEALTH_PARAM: &str = "maxHealth";

/// Typed value of a stored game constant or archetype parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Integer value (`int`).
    Int(i64),
    /// Floating point value (`double`).
    Double(f64),
    /// Text value (`string`).
    Str(String),
    /// Boolean value (`boolean`).
    Bool(bool),
    /// Explicit absence of a value (`null`).
    Null,
    /// Member of a named enum type, such as a unit archetype name.
    Enum {
        /// Fully qualified enum type reported by the server.
        kind: String,
        /// Enum member name.
        value: String,
    },
    /// Value of a kind the decoder does not recognise, passed through unchanged.
    Raw {
        /// Kind label reported by the server.
        kind: String,
        /// Untouched value data.
        data: String,
    },
}

impl Value {
    /// Numeric view of the value, available for integers and doubles.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Double(value) => Some(*value),
            _ => None,
        }
    }

    /// Textual view of the value, available for strings, enums and raw data.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            Self::Enum { value, .. } => Some(value),
            Self::Raw { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Boolean view of the value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

/// Converts the server's textual value representation into a typed [`Value`].
///
/// Kinds containing a `.` name an enum type (for example
/// `battlecode.common.RobotType`). Unknown kinds are logged and passed through
/// as [`Value::Raw`].
pub fn parse_value(name: &str, data: &str, kind: &str) -> Result<Value, DecodeError> {
    let invalid = || DecodeError::Value {
        name: name.to_owned(),
        kind: kind.to_owned(),
        data: data.to_owned(),
    };

    let value = match kind {
        "int" => Value::Int(data.trim().parse::<i64>().map_err(|_| invalid())?),
        "double" => Value::Double(data.trim().parse::<f64>().map_err(|_| invalid())?),
        "string" => Value::Str(data.to_owned()),
        "boolean" => Value::Bool(data.trim() == "true"),
        "null" => Value::Null,
        enum_kind if enum_kind.contains('.') => Value::Enum {
            kind: enum_kind.to_owned(),
            value: data.to_owned(),
        },
        other => {
            warn!(constant = name, kind = other, data, "unknown value kind, keeping raw data");
            Value::Raw {
                kind: other.to_owned(),
                data: data.to_owned(),
            }
        }
    };
    Ok(value)
}

/// Named game constants populated from the stored constants message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Constants {
    values: BTreeMap<String, Value>,
}

impl Constants {
    /// Builds the constant table from `(name, value)` pairs.
    #[must_use]
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Self {
            values: entries.into_iter().collect(),
        }
    }

    /// Looks up a constant by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Numeric value of a constant, if present and numeric.
    #[must_use]
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    /// Number of stored constants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Reports whether no constants are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterator over constants in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Static parameter set describing one unit archetype.
#[derive(Clone, Debug, PartialEq)]
pub struct Archetype {
    name: String,
    params: BTreeMap<String, Value>,
}

impl Archetype {
    /// Creates an archetype from its name and parameters.
    #[must_use]
    pub fn new<I>(name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Self {
            name: name.into(),
            params: params.into_iter().collect(),
        }
    }

    /// Archetype name, matching the spawn signal's unit kind.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Health units of this archetype spawn with.
    #[must_use]
    pub fn max_health(&self) -> Option<f64> {
        self.param(MAX_HEALTH_PARAM).and_then(Value::as_f64)
    }
}

/// Catalog of unit archetypes keyed by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArchetypeCatalog {
    archetypes: BTreeMap<String, Archetype>,
}

impl ArchetypeCatalog {
    /// Builds a catalog from archetypes, keyed by their names.
    #[must_use]
    pub fn from_archetypes<I>(archetypes: I) -> Self
    where
        I: IntoIterator<Item = Archetype>,
    {
        Self {
            archetypes: archetypes
                .into_iter()
                .map(|archetype| (archetype.name.clone(), archetype))
                .collect(),
        }
    }

    /// Looks up an archetype by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Archetype> {
        self.archetypes.get(name)
    }

    /// Number of archetypes in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    /// Reports whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }
}
