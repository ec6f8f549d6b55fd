//! Row normalization for Bitable records.
//!
//! Bitable columns change shape with their configuration: a text column can
//! arrive as a plain string, a rich-text object, or a list of rich-text
//! segments; a number column can arrive as a number, a numeric string, or a
//! single-element list (lookup/formula columns). Everything here folds those
//! shapes into [`SourceRow`] and never fails.
use serde::Serialize;
use serde_json::{Map, Value};

pub const COL_PART_NUMBER: &str = "PN";
pub const COL_PART_NAME: &str = "English Name";
pub const COL_MODEL_NUMBER: &str = "Model number";
pub const COL_MODEL_NAME: &str = "Model Name-English";
pub const COL_PRICE_EUR: &str = "Price (EUR)";
pub const COL_STOCK: &str = "Current stock";
pub const COL_PICTURES: &str = "Pictures";

/// One canonical spare-parts row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRow {
    pub part_number: String,
    pub part_name: String,
    pub model_number: String,
    pub model_name: String,
    pub price_eur: f64,
    pub stock: i64,
    pub picture: String,
}

/// A text-bearing cell, resolved by [`FieldText::into_text`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldText {
    Empty,
    Scalar(String),
    Structured { text: String },
    Segments(Vec<FieldText>),
}

impl FieldText {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => FieldText::Empty,
            Some(Value::String(s)) => FieldText::Scalar(s.clone()),
            Some(Value::Number(n)) => FieldText::Scalar(n.to_string()),
            Some(Value::Bool(b)) => FieldText::Scalar(b.to_string()),
            Some(Value::Object(obj)) => match obj.get("text") {
                Some(Value::String(text)) => FieldText::Structured { text: text.clone() },
                Some(other) => FieldText::from_value(Some(other)),
                None => FieldText::Empty,
            },
            Some(Value::Array(items)) => FieldText::Segments(
                items
                    .iter()
                    .map(|item| FieldText::from_value(Some(item)))
                    .collect(),
            ),
        }
    }

    pub fn into_text(self) -> String {
        match self {
            FieldText::Empty => String::new(),
            FieldText::Scalar(s) => s,
            FieldText::Structured { text } => text,
            FieldText::Segments(parts) => parts.into_iter().map(FieldText::into_text).collect(),
        }
    }
}

fn text_field(fields: &Map<String, Value>, column: &str) -> String {
    FieldText::from_value(fields.get(column)).into_text()
}

/// List-or-scalar to float; anything unparseable becomes `default`.
pub fn coerce_f64(value: Option<&Value>, default: f64) -> f64 {
    let value = match value {
        Some(Value::Array(items)) => match items.first() {
            Some(first) => first,
            None => return default,
        },
        Some(v) => v,
        None => return default,
    };
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).unwrap_or(default),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .unwrap_or(default),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Object(obj) => match obj.get("text") {
            Some(inner) => coerce_f64(Some(inner), default),
            None => default,
        },
        _ => default,
    }
}

/// Integer coercion with the same list/scalar tolerance; floats truncate.
pub fn coerce_i64(value: Option<&Value>, default: i64) -> i64 {
    let value = match value {
        Some(Value::Array(items)) => match items.first() {
            Some(first) => first,
            None => return default,
        },
        Some(v) => v,
        None => return default,
    };
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(default),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
                .unwrap_or(default)
        }
        Value::Bool(b) => i64::from(*b),
        _ => default,
    }
}

/// URL of the first attachment, or empty.
pub fn first_picture_url(value: Option<&Value>) -> String {
    let Some(first) = value.and_then(|v| v.as_array()).and_then(|a| a.first()) else {
        return String::new();
    };
    ["url", "value"]
        .iter()
        .filter_map(|k| first.get(*k).and_then(|v| v.as_str()))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Map one record's `fields` object onto [`SourceRow`].
///
/// Returns `None` when the part number is missing or blank.
pub fn normalize_record(fields: &Map<String, Value>) -> Option<SourceRow> {
    let part_number = text_field(fields, COL_PART_NUMBER).trim().to_string();
    if part_number.is_empty() {
        return None;
    }

    Some(SourceRow {
        part_number,
        part_name: text_field(fields, COL_PART_NAME),
        model_number: text_field(fields, COL_MODEL_NUMBER),
        model_name: text_field(fields, COL_MODEL_NAME),
        price_eur: coerce_f64(fields.get(COL_PRICE_EUR), 0.0),
        stock: coerce_i64(fields.get(COL_STOCK), 0),
        picture: first_picture_url(fields.get(COL_PICTURES)),
    })
}
