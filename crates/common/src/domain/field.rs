use crate::domain::result::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// A rich-text run as the store returns it (`[{ "text": ... }]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// A person reference field element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// An attachment reference field element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub file_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The shape class of a field value, used by diff configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Number,
    Bool,
    TextRuns,
    Users,
    Attachments,
    TextList,
}

/// A cell value in one of the store's recognized shapes.
///
/// Parsing is exhaustive: a JSON shape that matches none of the variants is
/// a typed error, never a silent coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Bool(bool),
    TextRuns(Vec<TextRun>),
    Users(Vec<UserRef>),
    Attachments(Vec<AttachmentRef>),
    TextList(Vec<String>),
}

/// An ordered map of field name to value
pub type FieldSet = BTreeMap<String, FieldValue>;

impl FieldValue {
    /// Parse a single cell from its wire JSON
    pub fn from_json(value: &Value) -> DomainResult<FieldValue> {
        match value {
            Value::String(s) => Ok(FieldValue::Text(s.clone())),
            Value::Bool(b) => Ok(FieldValue::Bool(*b)),
            Value::Number(n) => n
                .as_f64()
                .map(FieldValue::Number)
                .ok_or_else(|| DomainError::UnrecognizedFieldShape(format!("number {n}"))),
            Value::Array(items) => Self::from_array(items),
            other => Err(DomainError::UnrecognizedFieldShape(format!(
                "unsupported JSON type: {other}"
            ))),
        }
    }

    fn from_array(items: &[Value]) -> DomainResult<FieldValue> {
        if items.is_empty() {
            return Ok(FieldValue::TextList(Vec::new()));
        }
        if items.iter().all(|v| v.is_string()) {
            let strings = items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect();
            return Ok(FieldValue::TextList(strings));
        }
        // Arrays of objects are disambiguated by their first element's keys
        let first = items[0]
            .as_object()
            .ok_or_else(|| DomainError::UnrecognizedFieldShape("mixed array".to_string()))?;
        if first.contains_key("file_token") {
            let refs = items
                .iter()
                .map(|v| {
                    serde_json::from_value::<AttachmentRef>(v.clone()).map_err(|e| {
                        DomainError::UnrecognizedFieldShape(format!("attachment element: {e}"))
                    })
                })
                .collect::<DomainResult<Vec<_>>>()?;
            return Ok(FieldValue::Attachments(refs));
        }
        if first.contains_key("text") {
            let runs = items
                .iter()
                .map(|v| {
                    serde_json::from_value::<TextRun>(v.clone()).map_err(|e| {
                        DomainError::UnrecognizedFieldShape(format!("text run element: {e}"))
                    })
                })
                .collect::<DomainResult<Vec<_>>>()?;
            return Ok(FieldValue::TextRuns(runs));
        }
        if first.contains_key("id") {
            let users = items
                .iter()
                .map(|v| {
                    serde_json::from_value::<UserRef>(v.clone()).map_err(|e| {
                        DomainError::UnrecognizedFieldShape(format!("user element: {e}"))
                    })
                })
                .collect::<DomainResult<Vec<_>>>()?;
            return Ok(FieldValue::Users(users));
        }
        Err(DomainError::UnrecognizedFieldShape(format!(
            "object element with keys {:?}",
            first.keys().collect::<Vec<_>>()
        )))
    }

    /// Canonical wire serialization
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) => json!(s),
            FieldValue::Number(n) => json!(n),
            FieldValue::Bool(b) => json!(b),
            FieldValue::TextRuns(runs) => json!(runs),
            FieldValue::Users(users) => json!(users),
            FieldValue::Attachments(refs) => json!(refs),
            FieldValue::TextList(items) => json!(items),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Number(_) => FieldKind::Number,
            FieldValue::Bool(_) => FieldKind::Bool,
            FieldValue::TextRuns(_) => FieldKind::TextRuns,
            FieldValue::Users(_) => FieldKind::Users,
            FieldValue::Attachments(_) => FieldKind::Attachments,
            FieldValue::TextList(_) => FieldKind::TextList,
        }
    }

    /// The scalar text usable as unique-key material, if this shape has one.
    ///
    /// The store returns key fields either as plain text or as a single
    /// text run depending on the column type.
    pub fn as_key_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Number(n) => Some(n.to_string()),
            FieldValue::TextRuns(runs) => runs.first().map(|r| r.text.clone()),
            FieldValue::TextList(items) => items.first().cloned(),
            _ => None,
        }
    }

    /// True for values a create operation should not send
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::TextRuns(runs) => runs.is_empty(),
            FieldValue::Users(users) => users.is_empty(),
            FieldValue::Attachments(refs) => refs.is_empty(),
            FieldValue::TextList(items) => items.is_empty(),
            FieldValue::Number(_) | FieldValue::Bool(_) => false,
        }
    }
}

/// Parse a full `fields` object, skipping explicit nulls
pub fn parse_field_set(map: &Map<String, Value>) -> DomainResult<FieldSet> {
    let mut fields = FieldSet::new();
    for (name, value) in map {
        if value.is_null() {
            continue;
        }
        let parsed = FieldValue::from_json(value).map_err(|e| match e {
            DomainError::UnrecognizedFieldShape(detail) => {
                DomainError::UnrecognizedFieldShape(format!("field '{name}': {detail}"))
            }
            other => other,
        })?;
        fields.insert(name.clone(), parsed);
    }
    Ok(fields)
}

/// Serialize a field set back to its wire JSON object
pub fn field_set_to_json(fields: &FieldSet) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect()
}
