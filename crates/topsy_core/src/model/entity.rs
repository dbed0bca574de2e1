//! Immutable entity contract shared by every domain record.
//!
//! # Responsibility
//! - Build entities from loosely typed field maps (smart constructor).
//! - Export entities to plain key/value maps.
//! - Produce modified copies without touching the original value.
//!
//! # Invariants
//! - Unknown field names are rejected, never silently dropped.
//! - `replace` returns a new value; the receiver is left intact.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Plain key/value representation of an entity.
pub type Fields = Map<String, Value>;

/// Entity construction or replacement failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidFieldError {
    /// Field name is not declared by the entity.
    UnknownField {
        entity: &'static str,
        field: String,
    },
    /// Required field was not supplied (or supplied as null).
    MissingField {
        entity: &'static str,
        field: &'static str,
    },
    /// Field exists but the value has the wrong shape.
    InvalidValue {
        entity: &'static str,
        message: String,
    },
    /// Input was not a key/value object.
    NotAnObject,
}

impl Display for InvalidFieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField { entity, field } => {
                write!(f, "{entity} has no field `{field}`")
            }
            Self::MissingField { entity, field } => {
                write!(f, "{entity} requires field `{field}`")
            }
            Self::InvalidValue { entity, message } => {
                write!(f, "invalid {entity} value: {message}")
            }
            Self::NotAnObject => write!(f, "entity fields must be a key/value object"),
        }
    }
}

impl Error for InvalidFieldError {}

/// Converts a JSON object into a field map.
pub fn into_fields(value: Value) -> Result<Fields, InvalidFieldError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(InvalidFieldError::NotAnObject),
    }
}

/// Value-object behavior for all domain records.
pub trait Entity: Clone + PartialEq + Serialize + DeserializeOwned {
    /// Entity name used in error messages.
    const KIND: &'static str;
    /// Every field name this entity declares.
    const FIELDS: &'static [&'static str];
    /// Fields that must be present and non-null at construction.
    const REQUIRED: &'static [&'static str];

    /// Builds an entity from a field map, filling defaults for optional fields.
    fn from_fields(fields: Fields) -> Result<Self, InvalidFieldError> {
        if let Some(unknown) = fields
            .keys()
            .find(|key| !Self::FIELDS.contains(&key.as_str()))
        {
            return Err(InvalidFieldError::UnknownField {
                entity: Self::KIND,
                field: unknown.clone(),
            });
        }

        for required in Self::REQUIRED {
            match fields.get(*required) {
                None | Some(Value::Null) => {
                    return Err(InvalidFieldError::MissingField {
                        entity: Self::KIND,
                        field: required,
                    });
                }
                Some(_) => {}
            }
        }

        serde_json::from_value(Value::Object(fields)).map_err(|err| {
            InvalidFieldError::InvalidValue {
                entity: Self::KIND,
                message: err.to_string(),
            }
        })
    }

    /// Exports every field into a plain map.
    fn to_fields(&self) -> Fields {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // Entities are plain structs; serialization always yields an object.
            _ => Fields::new(),
        }
    }

    /// Returns a copy with the given fields overwritten.
    fn replace(&self, changes: Fields) -> Result<Self, InvalidFieldError> {
        let mut fields = self.to_fields();
        for (key, value) in changes {
            if !Self::FIELDS.contains(&key.as_str()) {
                return Err(InvalidFieldError::UnknownField {
                    entity: Self::KIND,
                    field: key,
                });
            }
            fields.insert(key, value);
        }
        Self::from_fields(fields)
    }
}
