//! Admin form fields: rendering, required-field validation, and conversion
//! of submitted strings into the JSON body the API expects.
//!
//! Forms are posted as `application/x-www-form-urlencoded` pairs. Repeated
//! names (checkbox groups) collect into a list.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde_json::{Map, Value};

/// Format of a `datetime-local` input value.
const DATETIME_LOCAL: &str = "%Y-%m-%dT%H:%M";

/// How a field is entered and what JSON it becomes.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Text,
    TextArea,
    Email,
    /// Whole number.
    Integer,
    /// Decimal number such as a wheel width or a percentage.
    Decimal,
    /// Non-negative amount in dollars.
    Money,
    /// `datetime-local` input, sent as RFC 3339 in UTC.
    DateTime,
    /// Fixed choices of `(value, label)`.
    Select(&'static [(&'static str, &'static str)]),
    /// Id of a document in another resource, picked from a select.
    Reference(&'static str),
    /// Ids of documents in another resource, picked from checkboxes.
    ReferenceList(&'static str),
    /// Comma or newline separated strings.
    List,
}

/// One field of an admin form.
#[derive(Debug, Clone)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FormField {
    /// Create an optional field.
    #[must_use]
    pub const fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
        }
    }

    /// Mark the field required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Resource this field picks documents from, if any.
    #[must_use]
    pub const fn reference(&self) -> Option<&'static str> {
        match self.kind {
            FieldKind::Reference(resource) | FieldKind::ReferenceList(resource) => Some(resource),
            _ => None,
        }
    }
}

// =============================================================================
// Submitted values
// =============================================================================

/// Submitted (or prefilled) form values by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues(BTreeMap<String, Vec<String>>);

impl FormValues {
    /// Collect posted pairs. Repeated names keep every value.
    #[must_use]
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in pairs {
            values.entry(name).or_default().push(value);
        }
        Self(values)
    }

    /// Prefill values from a document fetched from the API.
    #[must_use]
    pub fn from_document(fields: &[FormField], document: &Value) -> Self {
        let mut values = BTreeMap::new();
        for field in fields {
            let Some(value) = document.get(field.name).filter(|v| !v.is_null()) else {
                continue;
            };
            let entries = match &field.kind {
                FieldKind::ReferenceList(_) | FieldKind::List => value
                    .as_array()
                    .map(|items| items.iter().filter_map(reference_id).collect())
                    .unwrap_or_default(),
                FieldKind::DateTime => value
                    .as_str()
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| vec![dt.with_timezone(&Utc).format(DATETIME_LOCAL).to_string()])
                    .unwrap_or_default(),
                _ => reference_id(value).into_iter().collect(),
            };
            values.insert(field.name.to_string(), entries);
        }
        Self(values)
    }

    /// First value of a field, trimmed. Empty when absent.
    #[must_use]
    pub fn get(&self, name: &str) -> &str {
        self.0
            .get(name)
            .and_then(|values| values.first())
            .map_or("", |value| value.trim())
    }

    /// Every non-empty value of a field.
    #[must_use]
    pub fn all(&self, name: &str) -> Vec<&str> {
        self.0
            .get(name)
            .map(|values| {
                values
                    .iter()
                    .map(|value| value.trim())
                    .filter(|value| !value.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The id of a populated-or-bare reference, or a scalar as text.
fn reference_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(object) => object.get("_id").and_then(reference_id),
        _ => None,
    }
}

// =============================================================================
// Conversion
// =============================================================================

/// Field name to error message.
pub type FieldErrors = HashMap<&'static str, String>;

/// Build the JSON body for create (`clear_blank = false`, blank optional
/// fields omitted) or update (`clear_blank = true`, blank optional fields
/// sent as `null`).
///
/// # Errors
///
/// Returns one message per field that is missing or malformed.
pub fn build_payload(
    fields: &[FormField],
    values: &FormValues,
    clear_blank: bool,
) -> Result<Map<String, Value>, FieldErrors> {
    let mut payload = Map::new();
    let mut errors = FieldErrors::new();

    for field in fields {
        let converted = match &field.kind {
            FieldKind::ReferenceList(_) => {
                let ids = values.all(field.name);
                if ids.is_empty() && field.required {
                    Err(format!("{} is required", field.label))
                } else {
                    Ok(Some(ids.into_iter().map(Value::from).collect()))
                }
            }
            FieldKind::List => {
                let items = split_list(values.get(field.name));
                if items.is_empty() && field.required {
                    Err(format!("{} is required", field.label))
                } else {
                    Ok(Some(items.into_iter().map(Value::from).collect()))
                }
            }
            kind => {
                let raw = values.get(field.name);
                if raw.is_empty() {
                    if field.required {
                        Err(format!("{} is required", field.label))
                    } else {
                        Ok(clear_blank.then_some(Value::Null))
                    }
                } else {
                    convert(kind, raw)
                        .map(Some)
                        .map_err(|message| format!("{} {message}", field.label))
                }
            }
        };

        match converted {
            Ok(Some(value)) => {
                payload.insert(field.name.to_string(), value);
            }
            Ok(None) => {}
            Err(message) => {
                errors.insert(field.name, message);
            }
        }
    }

    if errors.is_empty() {
        Ok(payload)
    } else {
        Err(errors)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

fn convert(kind: &FieldKind, raw: &str) -> Result<Value, String> {
    match kind {
        FieldKind::Text
        | FieldKind::TextArea
        | FieldKind::Reference(_)
        | FieldKind::ReferenceList(_)
        | FieldKind::List => Ok(Value::from(raw)),
        FieldKind::Email => rimline_core::types::Email::parse(raw)
            .map(|email| Value::from(email.as_str()))
            .map_err(|_| "must be a valid email address".to_string()),
        FieldKind::Integer => raw
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| "must be a whole number".to_string()),
        FieldKind::Decimal => decimal_value(raw).ok_or_else(|| "must be a number".to_string()),
        FieldKind::Money => {
            let cleaned = raw.trim_start_matches('$').replace(',', "");
            match cleaned.parse::<Decimal>() {
                Ok(amount) if amount.is_sign_negative() => Err("cannot be negative".to_string()),
                Ok(_) => decimal_value(&cleaned).ok_or_else(|| "must be an amount".to_string()),
                Err(_) => Err("must be an amount".to_string()),
            }
        }
        FieldKind::DateTime => parse_datetime(raw)
            .map(|dt| Value::from(dt.to_rfc3339()))
            .ok_or_else(|| "must be a date and time".to_string()),
        FieldKind::Select(options) => options
            .iter()
            .find(|(value, _)| *value == raw)
            .map(|(value, _)| Value::from(*value))
            .ok_or_else(|| "has an unknown value".to_string()),
    }
}

fn decimal_value(raw: &str) -> Option<Value> {
    raw.parse::<Decimal>()
        .ok()
        .and_then(|d| d.to_f64())
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, DATETIME_LOCAL)
                .ok()
                .map(|naive| naive.and_utc())
        })
}

// =============================================================================
// Rendering
// =============================================================================

/// A `<select>` option or checkbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// A field ready for the form template.
#[derive(Debug, Clone)]
pub struct FieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub input_type: &'static str,
    pub step: &'static str,
    pub value: String,
    pub required: bool,
    pub is_textarea: bool,
    pub is_select: bool,
    pub is_checkboxes: bool,
    pub options: Vec<OptionView>,
    pub error: Option<String>,
}

/// Build the views of `fields`.
///
/// `choices` holds `(id, label)` pairs for reference fields, keyed by the
/// referenced resource.
#[must_use]
pub fn field_views(
    fields: &[FormField],
    values: &FormValues,
    errors: &FieldErrors,
    choices: &HashMap<&'static str, Vec<(String, String)>>,
) -> Vec<FieldView> {
    fields
        .iter()
        .map(|field| {
            let value = match field.kind {
                FieldKind::List => values.all(field.name).join(", "),
                _ => values.get(field.name).to_string(),
            };
            let selected = values.all(field.name);
            let mut view = FieldView {
                name: field.name,
                label: field.label,
                input_type: "text",
                step: "",
                value,
                required: field.required,
                is_textarea: false,
                is_select: false,
                is_checkboxes: false,
                options: Vec::new(),
                error: errors.get(field.name).cloned(),
            };

            match &field.kind {
                FieldKind::Text | FieldKind::List => {}
                FieldKind::TextArea => view.is_textarea = true,
                FieldKind::Email => view.input_type = "email",
                FieldKind::Integer => {
                    view.input_type = "number";
                    view.step = "1";
                }
                FieldKind::Decimal | FieldKind::Money => {
                    view.input_type = "number";
                    view.step = "0.01";
                }
                FieldKind::DateTime => view.input_type = "datetime-local",
                FieldKind::Select(options) => {
                    view.is_select = true;
                    view.options = options
                        .iter()
                        .map(|(value, label)| OptionView {
                            value: (*value).to_string(),
                            label: (*label).to_string(),
                            selected: selected.contains(value),
                        })
                        .collect();
                }
                FieldKind::Reference(resource) | FieldKind::ReferenceList(resource) => {
                    view.is_select = matches!(field.kind, FieldKind::Reference(_));
                    view.is_checkboxes = !view.is_select;
                    view.options = choices
                        .get(resource)
                        .map(|pairs| {
                            pairs
                                .iter()
                                .map(|(id, label)| OptionView {
                                    selected: selected.contains(&id.as_str()),
                                    value: id.clone(),
                                    label: label.clone(),
                                })
                                .collect()
                        })
                        .unwrap_or_default();
                }
            }
            view
        })
        .collect()
}
