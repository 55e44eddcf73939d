//! Per-operation options
//!
//! Every operation takes a structured options record, so only the fields an operation
//! understands can ever reach the wire. Callers holding loosely shaped data (JSON-like
//! mappings, bare integers, nulls) can convert it with the `TryFrom<serde_json::Value>`
//! impls below; shape errors become [`Error::InvalidArgument`] before anything is sent.
//! Unknown fields inside a mapping are ignored.

use std::time::Duration;

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Error, Result};

/// Options of [`Client::get`](crate::Client::get)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Return the whole subtree of a directory
    pub recursive: Option<bool>,
    /// Sort children by key
    pub sorted: Option<bool>,
    /// Serve the read through consensus
    pub quorum: Option<bool>,
}

/// Options of [`Client::delete`](crate::Client::delete)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Delete a directory and everything below it
    pub recursive: Option<bool>,
    /// Delete an empty directory
    pub dir: Option<bool>,
    /// Only delete if the current value matches
    pub prev_value: Option<String>,
    /// Only delete if the last modification index matches
    pub prev_index: Option<u64>,
}

/// Fields [`Client::set`](crate::Client::set) forwards to the store.
///
/// None of the preconditions are forced; whatever the caller sets is sent as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Time to live in seconds
    pub ttl: Option<u64>,
    /// Create a directory instead of a scalar key
    pub dir: Option<bool>,
    /// Require the key to exist (`true`) or to be absent (`false`)
    pub prev_exist: Option<bool>,
    /// Require the current value to match
    pub prev_value: Option<String>,
    /// Require the last modification index to match
    pub prev_index: Option<u64>,
}

impl SetOptions {
    /// Options carrying only a ttl
    pub fn with_ttl(ttl: u64) -> Self {
        Self {
            ttl: Some(ttl),
            ..Default::default()
        }
    }

    fn from_object(map: &Map<String, Value>) -> Result<Self> {
        Ok(Self {
            ttl: field_u64(map, "ttl")?,
            dir: field_bool(map, "dir")?,
            prev_exist: field_bool(map, "prevExist")?,
            prev_value: field_scalar(map, "prevValue")?,
            prev_index: field_u64(map, "prevIndex")?,
        })
    }
}

impl TryFrom<Value> for SetOptions {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match &value {
            Value::Object(map) => Self::from_object(map),
            other => Err(Error::InvalidArgument(format!(
                "set options must be a mapping, got {}",
                other
            ))),
        }
    }
}

/// The third argument of `set`: nothing, a ttl, or a full field set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TtlOption {
    /// No extra fields
    #[default]
    None,
    /// Only a ttl
    Ttl(u64),
    /// Explicit field set
    Fields(SetOptions),
}

impl TtlOption {
    /// Bare-integer ttl as accepted by older callers.
    #[deprecated(note = "pass `SetOptions::with_ttl` instead")]
    pub fn legacy_ttl(ttl: u64) -> Self {
        warn!("integer ttl passed as set options; use SetOptions instead");
        TtlOption::Ttl(ttl)
    }

    /// Normalize into the field set sent with the request
    pub fn into_fields(self) -> SetOptions {
        match self {
            TtlOption::None => SetOptions::default(),
            TtlOption::Ttl(ttl) => SetOptions::with_ttl(ttl),
            TtlOption::Fields(fields) => fields,
        }
    }
}

impl From<SetOptions> for TtlOption {
    fn from(fields: SetOptions) -> Self {
        TtlOption::Fields(fields)
    }
}

impl From<Option<SetOptions>> for TtlOption {
    fn from(fields: Option<SetOptions>) -> Self {
        fields.map_or(TtlOption::None, TtlOption::Fields)
    }
}

impl From<()> for TtlOption {
    fn from(_: ()) -> Self {
        TtlOption::None
    }
}

impl TryFrom<Value> for TtlOption {
    type Error = Error;

    #[allow(deprecated)]
    fn try_from(value: Value) -> Result<Self> {
        match &value {
            Value::Null => Ok(TtlOption::None),
            Value::Object(map) => Ok(TtlOption::Fields(SetOptions::from_object(map)?)),
            Value::Number(n) => match n.as_u64() {
                Some(ttl) => Ok(TtlOption::legacy_ttl(ttl)),
                None => Err(Error::InvalidArgument(format!(
                    "ttl must be a non-negative integer, got {}",
                    value
                ))),
            },
            other => Err(Error::InvalidArgument(format!(
                "set options must be a mapping, null or an integer ttl, got {}",
                other
            ))),
        }
    }
}

/// The value argument of `set`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetValue {
    /// A scalar value stored under the key
    Scalar(String),
    /// A field mapping: the directory-creation form. Its fields replace the options argument.
    Directory(SetOptions),
}

impl SetValue {
    /// Directory creation with `dir=true` and an optional ttl
    pub fn directory(ttl: Option<u64>) -> Self {
        SetValue::Directory(SetOptions {
            ttl,
            dir: Some(true),
            ..Default::default()
        })
    }
}

impl From<&str> for SetValue {
    fn from(value: &str) -> Self {
        SetValue::Scalar(value.to_string())
    }
}

impl From<String> for SetValue {
    fn from(value: String) -> Self {
        SetValue::Scalar(value)
    }
}

impl From<&String> for SetValue {
    fn from(value: &String) -> Self {
        SetValue::Scalar(value.clone())
    }
}

impl TryFrom<Value> for SetValue {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match &value {
            Value::Object(map) => Ok(SetValue::Directory(SetOptions::from_object(map)?)),
            Value::Array(_) | Value::Null => Err(Error::InvalidArgument(format!(
                "set value must be a scalar or a mapping, got {}",
                value
            ))),
            scalar => Ok(SetValue::Scalar(scalar_to_string(scalar).unwrap_or_default())),
        }
    }
}

/// Options of [`Client::create`](crate::Client::create); `prevExist=false` is always added
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Value of the new key
    pub value: Option<String>,
    /// Time to live in seconds
    pub ttl: Option<u64>,
    /// Create a directory
    pub dir: Option<bool>,
}

impl CreateOptions {
    /// Create a scalar key with the given value
    pub fn value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Default::default()
        }
    }
}

impl TryFrom<Value> for CreateOptions {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        let Value::Object(map) = &value else {
            return Err(Error::InvalidArgument(format!(
                "create options must be a mapping, got {}",
                value
            )));
        };
        Ok(Self {
            value: field_scalar(map, "value")?,
            ttl: field_u64(map, "ttl")?,
            dir: field_bool(map, "dir")?,
        })
    }
}

/// Options of [`Client::watch`](crate::Client::watch)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Resume from this index (`waitIndex`) instead of waiting for the next change
    pub index: Option<u64>,
    /// Watch the whole subtree of a directory
    pub recursive: Option<bool>,
    /// Force a consistency-strict read
    pub consistent: Option<bool>,
    /// Override the client's read timeout for this request
    pub timeout: Option<Duration>,
}

impl WatchOptions {
    /// Watch starting at the given index
    pub fn from_index(index: u64) -> Self {
        Self {
            index: Some(index),
            ..Default::default()
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn field_u64(map: &Map<String, Value>, name: &str) -> Result<Option<u64>> {
    match map.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_u64().map(Some).ok_or_else(|| {
            Error::InvalidArgument(format!("{} must be a non-negative integer, got {}", name, v))
        }),
    }
}

fn field_bool(map: &Map<String, Value>, name: &str) -> Result<Option<bool>> {
    match map.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_bool()
            .map(Some)
            .ok_or_else(|| Error::InvalidArgument(format!("{} must be a boolean, got {}", name, v))),
    }
}

fn field_scalar(map: &Map<String, Value>, name: &str) -> Result<Option<String>> {
    match map.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => scalar_to_string(v)
            .map(Some)
            .ok_or_else(|| Error::InvalidArgument(format!("{} must be a scalar, got {}", name, v))),
    }
}
