//! Part and command records
//!
//! Both collections are stored as camelCase JSON arrays. Records written by
//! older tooling used `spId` for the remote identifier; it is accepted on read.
//! The same files may hold floats or numeric strings where integers belong,
//! and negative quantities on hand; those are coerced on read.

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{InventoryError, Result};

/// Current-quantity snapshot entry, one per part number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub part_number: String,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "lenient_quantity")]
    pub quantity_on_hand: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yard: Option<String>,
    /// Identifier assigned by the remote list store once synced
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "spId")]
    pub remote_id: Option<i64>,
}

impl Part {
    pub fn new(
        part_number: impl Into<String>,
        description: impl Into<String>,
        quantity: u64,
    ) -> Self {
        Self {
            part_number: part_number.into(),
            description: description.into(),
            quantity_on_hand: quantity,
            yard: None,
            remote_id: None,
        }
    }

    /// Build a part from an upsert request body.
    ///
    /// `partNumber` and `quantityOnHand` are mandatory; `description` defaults
    /// to the empty string. A negative quantity is rejected.
    pub fn from_request(body: &Value) -> Result<Self> {
        let fields = body.as_object().ok_or_else(InventoryError::missing_fields)?;

        let part_number = required_text(fields, "partNumber")?;
        let quantity = required_integer(fields, "quantityOnHand")?;
        if quantity < 0 {
            return Err(InventoryError::Validation(format!(
                "quantityOnHand must not be negative, got {quantity}"
            )));
        }

        Ok(Self {
            part_number,
            description: optional_text(fields, "description").unwrap_or_default(),
            quantity_on_hand: quantity as u64,
            yard: optional_text(fields, "yard"),
            remote_id: None,
        })
    }

    pub fn matches(&self, part_number: &str) -> bool {
        self.part_number == part_number
    }

    pub fn matches_ignore_case(&self, part_number: &str) -> bool {
        self.part_number.to_lowercase() == part_number.to_lowercase()
    }
}

/// Immutable audit-log entry describing one quantity change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub part_number: String,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "lenient_integer")]
    pub quantity_change: i64,
    pub yard: String,
    pub user: String,
    #[serde(default)]
    pub remarks: String,
    /// Milliseconds since the Unix epoch
    #[serde(deserialize_with = "lenient_integer")]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "spId")]
    pub remote_id: Option<i64>,
}

impl Command {
    /// Build a command from a request body.
    ///
    /// `partNumber`, `quantityChange`, `yard`, `user` and `timestamp` are
    /// mandatory; `description` and `remarks` default to the empty string.
    pub fn from_request(body: &Value) -> Result<Self> {
        let fields = body.as_object().ok_or_else(InventoryError::missing_fields)?;

        Ok(Self {
            part_number: required_text(fields, "partNumber")?,
            description: optional_text(fields, "description").unwrap_or_default(),
            quantity_change: required_integer(fields, "quantityChange")?,
            yard: required_text(fields, "yard")?,
            user: required_text(fields, "user")?,
            remarks: optional_text(fields, "remarks").unwrap_or_default(),
            timestamp: required_integer(fields, "timestamp")?,
            remote_id: None,
        })
    }
}

/// A present, non-null field. Null counts as absent.
fn present<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    fields.get(key).filter(|v| !v.is_null())
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn required_text(fields: &Map<String, Value>, key: &str) -> Result<String> {
    let value = present(fields, key).ok_or_else(InventoryError::missing_fields)?;
    text_of(value).ok_or_else(|| InventoryError::Validation(format!("{key} must be a string")))
}

fn optional_text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    present(fields, key).and_then(text_of)
}

/// Integers may arrive as JSON numbers or as numeric strings. Fractions truncate.
fn integer_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}

fn required_integer(fields: &Map<String, Value>, key: &str) -> Result<i64> {
    let value = present(fields, key).ok_or_else(InventoryError::missing_fields)?;
    integer_of(value).ok_or_else(|| InventoryError::Validation(format!("{key} must be an integer")))
}

fn lenient_integer<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    integer_of(&value).ok_or_else(|| de::Error::custom(format!("expected an integer, got {value}")))
}

/// Quantities on hand never go below zero, even when a stored record says so
fn lenient_quantity<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_integer(deserializer).map(|n| n.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_defaults_optional_fields() {
        let cmd = Command::from_request(&json!({
            "partNumber": "PN1",
            "quantityChange": 5,
            "yard": "Y1",
            "user": "U1",
            "timestamp": 1000
        }))
        .unwrap();

        assert_eq!(cmd.description, "");
        assert_eq!(cmd.remarks, "");
        assert_eq!(cmd.quantity_change, 5);
        assert_eq!(cmd.remote_id, None);
    }

    #[test]
    fn test_command_missing_field_is_rejected() {
        for missing in ["partNumber", "quantityChange", "yard", "user", "timestamp"] {
            let mut body = json!({
                "partNumber": "PN1",
                "quantityChange": 5,
                "yard": "Y1",
                "user": "U1",
                "timestamp": 1000
            });
            body.as_object_mut().unwrap().remove(missing);

            let err = Command::from_request(&body).unwrap_err();
            assert!(matches!(err, InventoryError::Validation(_)), "{missing}");
        }
    }

    #[test]
    fn test_null_counts_as_missing() {
        let err = Command::from_request(&json!({
            "partNumber": "PN1",
            "quantityChange": null,
            "yard": "Y1",
            "user": "U1",
            "timestamp": 1000
        }))
        .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let cmd = Command::from_request(&json!({
            "partNumber": "PN1",
            "quantityChange": "-3",
            "yard": "Y1",
            "user": "U1",
            "timestamp": "1700000000000"
        }))
        .unwrap();
        assert_eq!(cmd.quantity_change, -3);
        assert_eq!(cmd.timestamp, 1_700_000_000_000);

        let err = Command::from_request(&json!({
            "partNumber": "PN1",
            "quantityChange": "lots",
            "yard": "Y1",
            "user": "U1",
            "timestamp": 1
        }))
        .unwrap_err();
        assert!(err.to_string().contains("quantityChange"));
    }

    #[test]
    fn test_part_rejects_negative_quantity() {
        let err = Part::from_request(&json!({"partNumber": "PN1", "quantityOnHand": -1})).unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
    }

    #[test]
    fn test_part_requires_quantity() {
        assert!(Part::from_request(&json!({"partNumber": "PN1"})).is_err());
        assert!(Part::from_request(&json!("PN1")).is_err());
    }

    #[test]
    fn test_legacy_sp_id_alias() {
        let part: Part = serde_json::from_value(json!({
            "partNumber": "PN1",
            "description": "Bolt",
            "quantityOnHand": 4,
            "spId": 17
        }))
        .unwrap();
        assert_eq!(part.remote_id, Some(17));

        let out = serde_json::to_value(&part).unwrap();
        assert_eq!(out["remoteId"], 17);
        assert!(out.get("spId").is_none());
        assert!(out.get("yard").is_none());
    }

    #[test]
    fn test_stored_numbers_are_coerced() {
        let cmd: Command = serde_json::from_value(json!({
            "partNumber": "PN1",
            "quantityChange": "4",
            "yard": "Y1",
            "user": "U1",
            "timestamp": 1610000000000.0,
            "spId": 5
        }))
        .unwrap();
        assert_eq!(cmd.timestamp, 1_610_000_000_000);
        assert_eq!(cmd.quantity_change, 4);
        assert_eq!(cmd.remote_id, Some(5));

        let part: Part = serde_json::from_value(json!({
            "partNumber": "PN9",
            "quantityOnHand": -2
        }))
        .unwrap();
        assert_eq!(part.quantity_on_hand, 0);

        let err = serde_json::from_value::<Part>(json!({
            "partNumber": "PN9",
            "quantityOnHand": "lots"
        }));
        assert!(err.is_err());
    }
}
