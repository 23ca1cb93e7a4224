use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortionKind {
    Large,
    Small,
}

impl PortionKind {
    pub const ALL: [Self; 2] = [Self::Large, Self::Small];

    /// Display label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Large => "Besar",
            Self::Small => "Kecil",
        }
    }
}

impl fmt::Display for PortionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Large => f.write_str("besar"),
            Self::Small => f.write_str("kecil"),
        }
    }
}

/// Opaque record identifier. Records written by older builds carry a
/// numeric millisecond timestamp; new ones get a random string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(u64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// One school's reported portions, in the persisted layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(rename = "nama")]
    pub name: String,
    #[serde(rename = "besar")]
    pub large: u32,
    #[serde(rename = "kecil")]
    pub small: u32,
    /// Milliseconds since the epoch of the last write.
    #[serde(rename = "createdAt", default)]
    pub created_at: u64,
}

impl Record {
    pub fn count(&self, kind: PortionKind) -> u32 {
        match kind {
            PortionKind::Large => self.large,
            PortionKind::Small => self.small,
        }
    }
}

/// Raw form values as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecordForm {
    #[serde(alias = "nama", deserialize_with = "form_text")]
    pub name: String,
    #[serde(alias = "besar", deserialize_with = "form_text")]
    pub large: String,
    #[serde(alias = "kecil", deserialize_with = "form_text")]
    pub small: String,
}

impl RecordForm {
    pub fn new(name: impl Into<String>, large: impl ToString, small: impl ToString) -> Self {
        Self {
            name: name.into(),
            large: large.to_string(),
            small: small.to_string(),
        }
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::NameRequired`] when the name is blank and
    /// [`ValidationError::InvalidCount`] for a negative or oversized count.
    pub fn validate(&self) -> Result<RecordFields, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::NameRequired);
        }
        Ok(RecordFields {
            name,
            large: parse_portion(PortionKind::Large, self.large.as_str())?,
            small: parse_portion(PortionKind::Small, self.small.as_str())?,
        })
    }
}

/// Validated record fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFields {
    pub name: String,
    pub large: u32,
    pub small: u32,
}

/// A persisted entry that survived normalization. `id` is `None` when the
/// stored value was missing or unusable.
#[derive(Debug)]
pub(crate) struct LoadedEntry {
    pub id: Option<RecordId>,
    pub fields: RecordFields,
    pub created_at: u64,
}

impl LoadedEntry {
    pub(crate) fn from_value(value: &serde_json::Value) -> Option<Self> {
        let obj = value.as_object()?;
        let name = value_text(obj.get("nama").or_else(|| obj.get("name")))
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())?;
        let id = match obj.get("id") {
            Some(serde_json::Value::Number(number)) => number.as_u64().map(RecordId::Number),
            Some(serde_json::Value::String(text)) if !text.trim().is_empty() => {
                Some(RecordId::Text(text.clone()))
            }
            _ => None,
        };
        Some(Self {
            id,
            fields: RecordFields {
                name,
                large: coerce_count(obj.get("besar").or_else(|| obj.get("large"))),
                small: coerce_count(obj.get("kecil").or_else(|| obj.get("small"))),
            },
            created_at: obj
                .get("createdAt")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(0),
        })
    }
}

/// Parses a count the way the form always has: the leading integer wins,
/// no digits at all means zero. Negative and oversized values are rejected.
pub fn parse_portion(kind: PortionKind, raw: &str) -> Result<u32, ValidationError> {
    let text = raw.trim();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let end = rest
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];
    if digits.is_empty() {
        return Ok(0);
    }
    let invalid = || ValidationError::InvalidCount {
        kind,
        raw: raw.to_string(),
    };
    let value = digits.parse::<u32>().map_err(|_| invalid())?;
    if negative && value > 0 {
        return Err(invalid());
    }
    Ok(value)
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

pub(crate) fn new_id() -> RecordId {
    let mut bytes = [0_u8; 10];
    OsRng.fill_bytes(&mut bytes);
    let mut hex = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        hex.push_str(format!("{b:02x}").as_str());
    }
    RecordId::Text(format!("id-{}-{hex}", now_millis()))
}

fn value_text(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(text) => Some(text.clone()),
        serde_json::Value::Number(number) => Some(number.to_string()),
        serde_json::Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn coerce_count(value: Option<&serde_json::Value>) -> u32 {
    let parsed = match value {
        Some(v) => {
            if let Some(number) = v.as_u64() {
                Some(number)
            } else if let Some(number) = v.as_f64() {
                // Negative floats saturate to zero.
                Some(number.floor() as u64)
            } else if let Some(text) = v.as_str() {
                parse_portion(PortionKind::Large, text).ok().map(u64::from)
            } else {
                None
            }
        }
        None => None,
    };
    u32::try_from(parsed.unwrap_or(0)).unwrap_or(u32::MAX)
}

fn form_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value_text(value.as_ref()).unwrap_or_default())
}
