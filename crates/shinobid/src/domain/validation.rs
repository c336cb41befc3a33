//! Field-level validation of JSON payloads and query strings.
//!
//! Failures are collected rather than short-circuited so a client receives
//! every problem with a payload in one response. Messages and type codes use
//! the wording API clients of this service already match on.

use serde::Serialize;
use serde_json::{Map, Value};

/// Length bounds for a text field, counted in Unicode scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLimits {
    /// Minimum accepted length.
    pub min: usize,
    /// Maximum accepted length.
    pub max: usize,
}

impl TextLimits {
    /// Bounds accepting `min..=max` characters.
    #[must_use]
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Name of the offending field, or `body` for whole-payload problems.
    pub field: String,
    /// Human readable explanation.
    pub message: String,
    /// Stable machine readable error code.
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl FieldError {
    /// Builds a field error.
    pub fn new(field: impl Into<String>, message: impl Into<String>, kind: &'static str) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            kind,
        }
    }

    pub(crate) fn missing(field: &str) -> Self {
        Self::new(field, "Field required", "missing")
    }

    pub(crate) fn not_a_string(field: &str) -> Self {
        Self::new(field, "Input should be a valid string", "string_type")
    }

    pub(crate) fn not_an_integer(field: &str) -> Self {
        Self::new(field, "Input should be a valid integer", "int_type")
    }

    pub(crate) fn unparsable_integer(field: &str) -> Self {
        Self::new(
            field,
            "Input should be a valid integer, unable to parse string as an integer",
            "int_parsing",
        )
    }

    pub(crate) fn below_minimum(field: &str, min: i64) -> Self {
        Self::new(
            field,
            format!("Input should be greater than or equal to {min}"),
            "greater_than_equal",
        )
    }

    pub(crate) fn above_maximum(field: &str, max: i64) -> Self {
        Self::new(
            field,
            format!("Input should be less than or equal to {max}"),
            "less_than_equal",
        )
    }
}

/// Collection of field errors returned when input is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Wraps a single error.
    #[must_use]
    pub fn single(error: FieldError) -> Self {
        Self(vec![error])
    }

    /// Borrows the collected errors.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub(crate) fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Checks `text` against `limits`, returning the error to report if any.
pub(crate) fn check_length(field: &str, text: &str, limits: TextLimits) -> Option<FieldError> {
    let length = text.chars().count();
    if length < limits.min {
        let unit = if limits.min == 1 { "character" } else { "characters" };
        return Some(FieldError::new(
            field,
            format!("String should have at least {} {unit}", limits.min),
            "string_too_short",
        ));
    }
    if length > limits.max {
        let unit = if limits.max == 1 { "character" } else { "characters" };
        return Some(FieldError::new(
            field,
            format!("String should have at most {} {unit}", limits.max),
            "string_too_long",
        ));
    }
    None
}

/// Types that can be built from a JSON request body.
pub trait FromJsonBody: Sized {
    /// Validates `value` and builds the payload.
    fn from_json(value: &Value) -> Result<Self, ValidationErrors>;
}

/// Walks a JSON object, extracting typed fields and recording failures.
///
/// Accessors return a neutral placeholder when a field is rejected;
/// [`ObjectReader::finish`] must be checked before the values are used.
pub(crate) struct ObjectReader<'a> {
    object: &'a Map<String, Value>,
    errors: ValidationErrors,
}

impl<'a> ObjectReader<'a> {
    pub(crate) fn new(value: &'a Value) -> Result<Self, ValidationErrors> {
        match value {
            Value::Object(object) => Ok(Self {
                object,
                errors: ValidationErrors::default(),
            }),
            _ => Err(ValidationErrors::single(FieldError::new(
                "body",
                "Input should be a valid dictionary or object to extract fields from",
                "model_attributes_type",
            ))),
        }
    }

    pub(crate) fn required_text(&mut self, field: &str, limits: TextLimits) -> String {
        match self.object.get(field) {
            None | Some(Value::Null) => {
                self.errors.push(FieldError::missing(field));
                String::new()
            }
            Some(value) => self.text(field, value, limits).unwrap_or_default(),
        }
    }

    /// `None` when absent, `Some(None)` for an explicit `null`.
    pub(crate) fn nullable_text(
        &mut self,
        field: &str,
        limits: TextLimits,
    ) -> Option<Option<String>> {
        match self.object.get(field) {
            None => None,
            Some(Value::Null) => Some(None),
            Some(value) => Some(self.text(field, value, limits)),
        }
    }

    /// Absent fields yield `None`; `null` is rejected.
    pub(crate) fn optional_text(&mut self, field: &str, limits: TextLimits) -> Option<String> {
        match self.object.get(field) {
            None => None,
            Some(Value::Null) => {
                self.errors.push(FieldError::not_a_string(field));
                None
            }
            Some(value) => self.text(field, value, limits),
        }
    }

    pub(crate) fn required_integer(&mut self, field: &str, min: i64) -> i64 {
        match self.object.get(field) {
            None | Some(Value::Null) => {
                self.errors.push(FieldError::missing(field));
                0
            }
            Some(value) => self.integer(field, value, min).unwrap_or_default(),
        }
    }

    /// Absent fields yield `None`; `null` is rejected.
    pub(crate) fn optional_integer(&mut self, field: &str, min: i64) -> Option<i64> {
        match self.object.get(field) {
            None => None,
            Some(Value::Null) => {
                self.errors.push(FieldError::not_an_integer(field));
                None
            }
            Some(value) => self.integer(field, value, min),
        }
    }

    /// `None` when absent, `Some(None)` for an explicit `null`.
    pub(crate) fn nullable_integer(&mut self, field: &str, min: i64) -> Option<Option<i64>> {
        match self.object.get(field) {
            None => None,
            Some(Value::Null) => Some(None),
            Some(value) => Some(self.integer(field, value, min)),
        }
    }

    pub(crate) fn finish(self) -> Result<(), ValidationErrors> {
        self.errors.into_result()
    }

    fn text(&mut self, field: &str, value: &Value, limits: TextLimits) -> Option<String> {
        let Value::String(text) = value else {
            self.errors.push(FieldError::not_a_string(field));
            return None;
        };
        if let Some(error) = check_length(field, text, limits) {
            self.errors.push(error);
            return None;
        }
        Some(text.clone())
    }

    fn integer(&mut self, field: &str, value: &Value, min: i64) -> Option<i64> {
        let Some(number) = value.as_i64() else {
            self.errors.push(FieldError::not_an_integer(field));
            return None;
        };
        if number < min {
            self.errors.push(FieldError::below_minimum(field, min));
            return None;
        }
        Some(number)
    }
}
