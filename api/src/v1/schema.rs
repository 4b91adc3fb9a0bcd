//! Shape and constraint checks for decoded payloads.
//!
//! Responses are decoded to a [`serde_json::Value`] first and only then
//! turned into typed values through [`Schema`], so a malformed entity is
//! reported with the location of the offending field instead of a generic
//! deserialization failure.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use super::{parse_timestamp, Todo};

/// Maximum title length, in UTF-16 code units as browsers count them.
pub const TITLE_MAX_LEN: usize = 255;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{path}: {message}")]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub trait Schema: Sized {
    fn parse_at(value: &Value, path: &str) -> Result<Self, ValidationError>;

    fn parse(value: &Value) -> Result<Self, ValidationError> {
        Self::parse_at(value, "$")
    }

    /// All-or-nothing: the first invalid element rejects the whole array.
    fn parse_array(value: &Value) -> Result<Vec<Self>, ValidationError> {
        let items = value
            .as_array()
            .ok_or_else(|| ValidationError::new("$", "expected array"))?;

        items
            .iter()
            .enumerate()
            .map(|(i, item)| Self::parse_at(item, &format!("$[{i}]")))
            .collect()
    }
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    match title.encode_utf16().count() {
        0 => Err(ValidationError::new("title", "must not be empty")),
        n if n > TITLE_MAX_LEN => Err(ValidationError::new(
            "title",
            format!("must be at most {TITLE_MAX_LEN} characters"),
        )),
        _ => Ok(()),
    }
}

impl Schema for Todo {
    fn parse_at(value: &Value, path: &str) -> Result<Self, ValidationError> {
        let object = value
            .as_object()
            .ok_or_else(|| ValidationError::new(path, "expected object"))?;
        let fields = Fields { object, path };

        let id = fields.string("id")?;
        let id = Uuid::parse_str(id).map_err(|_| fields.error("id", "expected uuid"))?;

        let title = fields.string("title")?;
        validate_title(title).map_err(|err| fields.error("title", &err.message))?;

        let completed_at = fields.nullable_timestamp("completedAt")?;
        let created_at = fields.timestamp("createdAt")?;
        let updated_at = fields.timestamp("updatedAt")?;

        if updated_at < created_at {
            return Err(fields.error("updatedAt", "must not precede createdAt"));
        }

        Ok(Todo {
            id,
            title: title.to_string(),
            completed_at,
            created_at,
            updated_at,
        })
    }
}

struct Fields<'a> {
    object: &'a Map<String, Value>,
    path: &'a str,
}

impl<'a> Fields<'a> {
    fn error(&self, field: &str, message: &str) -> ValidationError {
        ValidationError::new(format!("{}.{field}", self.path), message)
    }

    fn get(&self, field: &str) -> Result<&'a Value, ValidationError> {
        self.object
            .get(field)
            .ok_or_else(|| self.error(field, "required"))
    }

    fn string(&self, field: &str) -> Result<&'a str, ValidationError> {
        self.get(field)?
            .as_str()
            .ok_or_else(|| self.error(field, "expected string"))
    }

    fn timestamp(&self, field: &str) -> Result<DateTime<Utc>, ValidationError> {
        let raw = self.string(field)?;
        parse_timestamp(raw).ok_or_else(|| self.error(field, "expected ISO 8601 datetime"))
    }

    fn nullable_timestamp(&self, field: &str) -> Result<Option<DateTime<Utc>>, ValidationError> {
        match self.get(field)? {
            Value::Null => Ok(None),
            _ => self.timestamp(field).map(Some),
        }
    }
}
