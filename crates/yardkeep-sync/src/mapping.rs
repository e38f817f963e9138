//! Translation between local record fields and remote list columns

use chrono::DateTime;
use serde::Serialize;
use serde_json::{Map, Value};

use yardkeep_core::{Command, Part, PartChanges};

use crate::error::{Result, SyncError};

/// Local part field → remote column
pub const PART_FIELDS: &[(&str, &str)] = &[
    ("partNumber", "PartNumber"),
    ("description", "Description"),
    ("quantityOnHand", "QuantityOnHand"),
    ("yard", "Yard"),
];

/// Local command field → remote column
pub const COMMAND_FIELDS: &[(&str, &str)] = &[
    ("partNumber", "PartNumber"),
    ("description", "Description"),
    ("quantityChange", "QuantityChange"),
    ("yard", "Yard"),
    ("user", "User"),
    ("remarks", "Remarks"),
    ("timestamp", "Timestamp"),
];

/// Milliseconds since the epoch → `YYYY-MM-DDTHH:MM:SSZ`, truncated to whole seconds
pub fn iso_timestamp(millis: i64) -> Result<String> {
    let dt = DateTime::from_timestamp(millis.div_euclid(1000), 0)
        .ok_or(SyncError::InvalidTimestamp(millis))?;
    Ok(dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

fn translate<T: Serialize>(record: &T, table: &[(&str, &str)]) -> Map<String, Value> {
    let local = match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };

    table
        .iter()
        .filter_map(|(local_key, remote_key)| {
            local
                .get(*local_key)
                .filter(|v| !v.is_null())
                .map(|v| (remote_key.to_string(), v.clone()))
        })
        .collect()
}

/// Create payload for a part
pub fn part_fields(part: &Part) -> Map<String, Value> {
    translate(part, PART_FIELDS)
}

/// Create payload for a command, with the timestamp as ISO-8601 UTC
pub fn command_fields(command: &Command) -> Result<Map<String, Value>> {
    let mut fields = translate(command, COMMAND_FIELDS);
    fields.insert(
        "Timestamp".to_string(),
        Value::String(iso_timestamp(command.timestamp)?),
    );
    Ok(fields)
}

/// Merge payload holding only the fields present in `changes`
pub fn changed_part_fields(changes: &PartChanges) -> Map<String, Value> {
    let mut fields = Map::new();
    if let Some(ref description) = changes.description {
        fields.insert("Description".to_string(), Value::from(description.clone()));
    }
    if let Some(quantity) = changes.quantity_on_hand {
        fields.insert("QuantityOnHand".to_string(), Value::from(quantity));
    }
    if let Some(ref yard) = changes.yard {
        fields.insert("Yard".to_string(), Value::from(yard.clone()));
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_iso_timestamp() {
        assert_eq!(iso_timestamp(0).unwrap(), "1970-01-01T00:00:00Z");
        assert_eq!(iso_timestamp(1_610_000_000_999).unwrap(), "2021-01-07T06:13:20Z");
        assert_eq!(iso_timestamp(-1).unwrap(), "1969-12-31T23:59:59Z");
        assert!(iso_timestamp(i64::MAX).is_err());
    }

    #[test]
    fn test_part_fields() {
        let mut part = Part::new("PN1", "Bolt", 4);
        part.remote_id = Some(9);

        let fields = part_fields(&part);
        assert_eq!(
            Value::Object(fields),
            json!({"PartNumber": "PN1", "Description": "Bolt", "QuantityOnHand": 4})
        );
    }

    #[test]
    fn test_command_fields() {
        let command = Command {
            part_number: "PN1".to_string(),
            description: "Bolt".to_string(),
            quantity_change: -2,
            yard: "Yard 2".to_string(),
            user: "User5".to_string(),
            remarks: "Damage".to_string(),
            timestamp: 1_610_000_000_000,
            remote_id: None,
        };

        let fields = command_fields(&command).unwrap();
        assert_eq!(
            Value::Object(fields),
            json!({
                "PartNumber": "PN1",
                "Description": "Bolt",
                "QuantityChange": -2,
                "Yard": "Yard 2",
                "User": "User5",
                "Remarks": "Damage",
                "Timestamp": "2021-01-07T06:13:20Z"
            })
        );
    }

    #[test]
    fn test_changed_fields_only() {
        let changes = PartChanges {
            quantity_on_hand: Some(75),
            ..Default::default()
        };
        assert_eq!(
            Value::Object(changed_part_fields(&changes)),
            json!({"QuantityOnHand": 75})
        );
        assert!(changed_part_fields(&PartChanges::default()).is_empty());
    }
}
