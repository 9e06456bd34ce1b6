//! Turn raw model output into a typed [`ShipmentPayload`].
//!
//! The model is asked for bare JSON but nothing forces it to comply, so every
//! field is checked here before a record is built.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::shipment::{check_weight, ShipmentPayload};

/// Why a parsed payload was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// `customer_name` or `address` absent, blank, or not a string
    #[error("missing required fields")]
    MissingFields,

    /// An optional field has the wrong shape
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl ValidationError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Parse model output as JSON.
///
/// With `strip_code_fences`, a single surrounding markdown fence
/// (optionally tagged, e.g. ```` ```json ````) is removed first.
pub fn parse_model_output(text: &str, strip_code_fences: bool) -> serde_json::Result<Value> {
    if strip_code_fences {
        serde_json::from_str(strip_fence(text))
    } else {
        serde_json::from_str(text)
    }
}

fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening line.
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}

/// Validate a parsed JSON value.
///
/// Anything other than an object counts as missing the required fields.
pub fn validate_payload(value: &Value) -> Result<ShipmentPayload, ValidationError> {
    let Some(object) = value.as_object() else {
        return Err(ValidationError::MissingFields);
    };

    let (Some(customer_name), Some(address)) = (
        required_text(object, "customer_name"),
        required_text(object, "address"),
    ) else {
        return Err(ValidationError::MissingFields);
    };

    Ok(ShipmentPayload {
        customer_name,
        address,
        tracking_id: optional_text(object, "tracking_id")?,
        delivery_date: optional_date(object, "delivery_date")?,
        package_weight: optional_weight(object, "package_weight")?,
        notes: optional_text(object, "notes")?,
    })
}

fn required_text(object: &Map<String, Value>, field: &str) -> Option<String> {
    object
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// `null`, a missing key and `""` all mean absent.
fn present<'a>(object: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    match object.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(value) => Some(value),
    }
}

fn optional_text(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, ValidationError> {
    match present(object, field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(ValidationError::invalid(
            field,
            format!("expected a string, got {}", type_name(other)),
        )),
    }
}

fn optional_date(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<NaiveDate>, ValidationError> {
    match present(object, field) {
        None => Ok(None),
        Some(Value::String(s)) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ValidationError::invalid(field, format!("expected YYYY-MM-DD, got {s:?}"))),
        Some(other) => Err(ValidationError::invalid(
            field,
            format!("expected a YYYY-MM-DD string, got {}", type_name(other)),
        )),
    }
}

fn optional_weight(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<f64>, ValidationError> {
    let weight = match present(object, field) {
        None => return Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ValidationError::invalid(field, "number out of range"))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ValidationError::invalid(field, format!("expected a number, got {s:?}")))?,
        Some(other) => {
            return Err(ValidationError::invalid(
                field,
                format!("expected a number, got {}", type_name(other)),
            ))
        }
    };

    check_weight(weight).map_err(|reason| ValidationError::invalid(field, reason))?;
    Ok(Some(weight))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_full_payload() {
        let payload = validate_payload(&json!({
            "customer_name": " Jane Doe ",
            "address": "12 Oak St, Springfield",
            "tracking_id": "XZ100",
            "delivery_date": "2024-05-01",
            "package_weight": 2.5,
            "notes": "Leave at door"
        }))
        .unwrap();

        assert_eq!(payload.customer_name, " Jane Doe ");
        assert_eq!(payload.tracking_id.as_deref(), Some("XZ100"));
        assert_eq!(payload.delivery_date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(payload.package_weight, Some(2.5));
        assert_eq!(payload.notes.as_deref(), Some("Leave at door"));
    }

    #[test]
    fn test_padded_values_are_kept_verbatim() {
        let value = json!({
            "customer_name": " Jane Doe ",
            "address": "12 Oak St ",
            "notes": "  fragile"
        });
        let payload = validate_payload(&value).unwrap();

        assert_eq!(payload.customer_name, " Jane Doe ");
        assert_eq!(payload.address, "12 Oak St ");
        assert_eq!(payload.notes.as_deref(), Some("  fragile"));
    }

    #[test]
    fn test_null_and_empty_optionals_are_absent() {
        let payload = validate_payload(&json!({
            "customer_name": "Jane",
            "address": "12 Oak St",
            "tracking_id": null,
            "delivery_date": "",
            "package_weight": null
        }))
        .unwrap();

        assert_eq!(payload.tracking_id, None);
        assert_eq!(payload.delivery_date, None);
        assert_eq!(payload.package_weight, None);
        assert_eq!(payload.notes, None);
    }

    #[test]
    fn test_missing_or_blank_required_fields() {
        for value in [
            json!({"customer_name": "Jane"}),
            json!({"customer_name": "", "address": "12 Oak St"}),
            json!({"customer_name": "Jane", "address": "   "}),
            json!({"customer_name": 7, "address": "12 Oak St"}),
            json!(["Jane", "12 Oak St"]),
            json!("Jane"),
            json!(null),
        ] {
            assert_eq!(
                validate_payload(&value),
                Err(ValidationError::MissingFields),
                "{value}"
            );
        }
    }

    #[test]
    fn test_lenient_scalar_coercions() {
        let payload = validate_payload(&json!({
            "customer_name": "Jane",
            "address": "12 Oak St",
            "tracking_id": 123456,
            "package_weight": "4.75"
        }))
        .unwrap();

        assert_eq!(payload.tracking_id.as_deref(), Some("123456"));
        assert_eq!(payload.package_weight, Some(4.75));
    }

    #[test]
    fn test_invalid_optional_fields() {
        let base = || json!({"customer_name": "Jane", "address": "12 Oak St"});

        let cases = [
            ("delivery_date", json!("05/01/2024")),
            ("delivery_date", json!(20240501)),
            ("package_weight", json!(-1.0)),
            ("package_weight", json!("heavy")),
            ("package_weight", json!("NaN")),
            ("tracking_id", json!(["A", "B"])),
            ("notes", json!({"text": "hi"})),
        ];

        for (field, bad) in cases {
            let mut value = base();
            value[field] = bad;
            match validate_payload(&value) {
                Err(ValidationError::InvalidField { field: got, .. }) => assert_eq!(got, field),
                other => panic!("{field}: expected InvalidField, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_model_output_is_strict_by_default() {
        let fenced = "```json\n{\"customer_name\": \"Jane\"}\n```";
        assert!(parse_model_output(fenced, false).is_err());
        assert_eq!(
            parse_model_output(fenced, true).unwrap(),
            json!({"customer_name": "Jane"})
        );
        assert_eq!(
            parse_model_output("```\n[1]\n```", true).unwrap(),
            json!([1])
        );
        assert!(parse_model_output("not json", true).is_err());
    }

    proptest! {
        #[test]
        fn prop_any_non_blank_name_and_address_is_accepted(
            name in "[ ]{0,3}[A-Za-z0-9][A-Za-z0-9 ,.'-]{0,40}",
            address in "[ ]{0,3}[A-Za-z0-9][A-Za-z0-9 ,.#/-]{0,60}",
        ) {
            let payload = validate_payload(&json!({
                "customer_name": name.clone(),
                "address": address.clone(),
            }))
            .unwrap();

            prop_assert_eq!(payload.customer_name, name);
            prop_assert_eq!(payload.address, address);
        }

        #[test]
        fn prop_non_negative_weights_are_kept(weight in 0.0f64..10_000.0) {
            let payload = validate_payload(&json!({
                "customer_name": "Jane",
                "address": "12 Oak St",
                "package_weight": weight,
            }))
            .unwrap();

            prop_assert_eq!(payload.package_weight, Some(weight));
        }
    }
}
