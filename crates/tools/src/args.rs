//! Input helpers shared by the tool handlers.

use bizpilot_core::error::ToolError;
use serde_json::Value;

/// Whether the caller explicitly confirmed the action.
///
/// Only a literal JSON `true` counts; `"true"`, `1` and absence do not.
pub fn is_confirmed(input: &Value) -> bool {
    input.get("confirmed").and_then(Value::as_bool) == Some(true)
}

/// A required, non-blank string argument.
pub fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    optional_str(input, key)
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

/// A string argument, treating blank as absent.
pub fn optional_str<'a>(input: &'a Value, key: &str) -> Option<&'a str> {
    input
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// An integer argument. Accepts whole floats (`3.0`) as models sometimes send them.
pub fn optional_i64(input: &Value, key: &str) -> Result<Option<i64>, ToolError> {
    match input.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .or_else(|| v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| ToolError::InvalidArguments(format!("'{key}' must be a whole number"))),
    }
}

/// A money amount in dollars (number, or string like "$1,250.50"), as cents.
pub fn money_cents(input: &Value, key: &str) -> Result<i64, ToolError> {
    let invalid = || ToolError::InvalidArguments(format!("'{key}' must be an amount in dollars"));
    let dollars = match input.get(key) {
        Some(Value::Number(n)) => n.as_f64().ok_or_else(invalid)?,
        Some(Value::String(s)) => s
            .trim()
            .trim_start_matches('$')
            .replace(',', "")
            .parse::<f64>()
            .map_err(|_| invalid())?,
        None | Some(Value::Null) => {
            return Err(ToolError::InvalidArguments(format!("Missing '{key}' argument")));
        }
        Some(_) => return Err(invalid()),
    };
    if !dollars.is_finite() {
        return Err(invalid());
    }
    if dollars < 0.0 {
        return Err(ToolError::InvalidArguments(format!("'{key}' cannot be negative")));
    }
    Ok((dollars * 100.0).round() as i64)
}

/// Format cents as a dollar string, e.g. `1200` -> `"$12.00"`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}
