//!
//! personas record model and validator
//! ------------------------------------
//! `PersonRecord` is the only entity the service persists. The sole way to build
//! one is [`validate`], which takes the raw (untrusted) JSON body and either
//! returns a record whose fields are within bounds or a [`ValidationError`]
//! listing every violated constraint.
//!
//! Bounds:
//! - name: 1..=100 characters after trimming, stored trimmed.
//! - age: integer in 0..=150.
//! - height: number in (0, 3.0] meters.

use serde::Serialize;
use serde_json::{Map, Value};

pub const NAME_MAX_CHARS: usize = 100;
pub const AGE_MIN: i64 = 0;
pub const AGE_MAX: i64 = 150;
pub const HEIGHT_MAX: f64 = 3.0;

/// A person record that has passed validation.
///
/// Fields are private so a record can never hold out-of-bounds values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonRecord {
    name: String,
    age: i64,
    height: f64,
}

impl PersonRecord {
    pub fn name(&self) -> &str { &self.name }
    pub fn age(&self) -> i64 { self.age }
    pub fn height(&self) -> f64 { self.height }

    /// CSV row form: `[name, age, height]`.
    pub fn to_row(&self) -> Vec<String> {
        vec![self.name.clone(), self.age.to_string(), format_height(self.height)]
    }
}

/// Render a height the way it is stored on disk. Integral values keep a trailing
/// `.0` so that `2` meters is written as `2.0`; values below `1e-4` use
/// scientific form with an at-least-two-digit exponent (`1e-05`).
pub fn format_height(h: f64) -> String {
    if h != 0.0 && h.abs() < 1e-4 {
        let sci = format!("{:e}", h);
        if let Some((mantissa, exp)) = sci.split_once('e') {
            let digits = exp.trim_start_matches('-');
            let sign = if exp.starts_with('-') { '-' } else { '+' };
            return format!("{}e{}{:0>2}", mantissa, sign, digits);
        }
    }
    let s = h.to_string();
    if s.contains('.') { s } else { format!("{}.0", s) }
}

/// One violated constraint on one input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    /// Short constraint tag: `missing`, `type`, `json`, `min_length`, `max_length`, `ge`, `le`, `gt`.
    pub constraint: String,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &str, constraint: &str, message: impl Into<String>) -> Self {
        Self { field: field.to_string(), constraint: constraint.to_string(), message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid person record: {}", summary(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

fn summary(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{} ({}): {}", v.field, v.constraint, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn single(field: &str, constraint: &str, message: impl Into<String>) -> Self {
        Self { violations: vec![FieldViolation::new(field, constraint, message)] }
    }

    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.field.as_str()).collect()
    }
}

/// Validate a raw request body into a [`PersonRecord`].
///
/// Every field is checked independently; all violations are reported together.
pub fn validate(input: &Value) -> Result<PersonRecord, ValidationError> {
    let Some(obj) = input.as_object() else {
        return Err(ValidationError::single("body", "type", "request body must be a JSON object"));
    };
    let mut violations = Vec::new();
    let name = check_name(obj, &mut violations);
    let age = check_age(obj, &mut violations);
    let height = check_height(obj, &mut violations);
    match (name, age, height) {
        (Some(name), Some(age), Some(height)) if violations.is_empty() => Ok(PersonRecord { name, age, height }),
        _ => Err(ValidationError { violations }),
    }
}

fn check_name(obj: &Map<String, Value>, out: &mut Vec<FieldViolation>) -> Option<String> {
    let raw = match obj.get("name") {
        None | Some(Value::Null) => { out.push(FieldViolation::new("name", "missing", "field required")); return None; }
        Some(Value::String(s)) => s,
        Some(_) => { out.push(FieldViolation::new("name", "type", "name must be a string")); return None; }
    };
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if len == 0 {
        out.push(FieldViolation::new("name", "min_length", "name must not be empty"));
        return None;
    }
    if len > NAME_MAX_CHARS {
        out.push(FieldViolation::new("name", "max_length", format!("name must be at most {} characters, got {}", NAME_MAX_CHARS, len)));
        return None;
    }
    Some(trimmed.to_string())
}

fn check_age(obj: &Map<String, Value>, out: &mut Vec<FieldViolation>) -> Option<i64> {
    let age = match obj.get("age") {
        None | Some(Value::Null) => { out.push(FieldViolation::new("age", "missing", "field required")); return None; }
        Some(Value::Number(n)) => n,
        Some(_) => { out.push(FieldViolation::new("age", "type", "age must be an integer")); return None; }
    };
    let Some(value) = integral(age) else {
        out.push(FieldViolation::new("age", "type", format!("age must be an integer, got {}", age)));
        return None;
    };
    // messages quote the submitted number, not the converted one
    if value < AGE_MIN as f64 {
        out.push(FieldViolation::new("age", "ge", format!("age must be >= {}, got {}", AGE_MIN, age)));
        return None;
    }
    if value > AGE_MAX as f64 {
        out.push(FieldViolation::new("age", "le", format!("age must be <= {}, got {}", AGE_MAX, age)));
        return None;
    }
    Some(value as i64)
}

// JSON integers of any size, and floats with no fractional part (30.0, -1e300).
// Values inside the age bounds convert exactly.
fn integral(n: &serde_json::Number) -> Option<f64> {
    if n.is_i64() || n.is_u64() {
        return n.as_f64();
    }
    n.as_f64().filter(|f| f.is_finite() && f.fract() == 0.0)
}

fn check_height(obj: &Map<String, Value>, out: &mut Vec<FieldViolation>) -> Option<f64> {
    let height = match obj.get("height") {
        None | Some(Value::Null) => { out.push(FieldViolation::new("height", "missing", "field required")); return None; }
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) if v.is_finite() => v,
            _ => { out.push(FieldViolation::new("height", "type", "height must be a number")); return None; }
        },
        Some(_) => { out.push(FieldViolation::new("height", "type", "height must be a number")); return None; }
    };
    if height <= 0.0 {
        out.push(FieldViolation::new("height", "gt", format!("height must be > 0, got {}", height)));
        return None;
    }
    if height > HEIGHT_MAX {
        out.push(FieldViolation::new("height", "le", format!("height must be <= {}, got {}", HEIGHT_MAX, height)));
        return None;
    }
    Some(height)
}

#[cfg(test)]
#[path = "persona_tests.rs"]
mod persona_tests;
