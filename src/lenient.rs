// ============================================================================
// Lenient Deserializers
// ============================================================================
//
// Serde helpers that never fail.
//
// Persisted payloads may come from older versions, hand edits or a crash
// mid-write. Each field is read on its own: a wrong type or a missing key
// falls back to the field default instead of rejecting the whole document.

use crate::money::{coerce_decimal, coerce_quantity, non_negative};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use uuid::Uuid;

/// Timestamp layout used in the persisted payload.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

pub fn boolean<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim(), "true" | "1" | "on" | "yes"),
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    })
}

pub fn decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
    Ok(decimal_from_value(&Value::deserialize(d)?))
}

pub fn non_negative_decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
    Ok(non_negative(decimal_from_value(&Value::deserialize(d)?)))
}

pub fn quantity<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => coerce_quantity(&n.to_string()),
        Value::String(s) => coerce_quantity(&s),
        _ => 0,
    })
}

pub fn uuid<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Uuid>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Uuid::parse_str(s.trim()).ok(),
        _ => None,
    })
}

pub fn timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDateTime>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT).ok(),
        _ => None,
    })
}

/// A nested struct whose own fields are lenient. Anything that is not a JSON
/// object yields the struct default.
pub fn object<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(object_from_value(Value::deserialize(d)?))
}

/// A list of lenient structs. Non-array values give an empty list and
/// non-object elements are dropped.
pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(match Value::deserialize(d)? {
        Value::Array(values) => values
            .into_iter()
            .filter(|v| {
                let keep = v.is_object();
                if !keep {
                    log::warn!("dropping malformed stored entry: {}", v);
                }
                keep
            })
            .map(object_from_value)
            .collect(),
        _ => Vec::new(),
    })
}

fn object_from_value<T: DeserializeOwned + Default>(value: Value) -> T {
    if !value.is_object() {
        return T::default();
    }
    serde_json::from_value(value).unwrap_or_default()
}

fn decimal_from_value(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => coerce_decimal(&n.to_string()),
        Value::String(s) => coerce_decimal(s),
        _ => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Probe {
        #[serde(deserialize_with = "string")]
        name: String,
        #[serde(deserialize_with = "boolean")]
        flag: bool,
        #[serde(deserialize_with = "decimal")]
        amount: Decimal,
        #[serde(deserialize_with = "quantity")]
        qty: u32,
    }

    #[test]
    fn test_wrong_types_fall_back_per_field() {
        let probe: Probe =
            serde_json::from_str(r#"{"name": 42, "flag": "true", "amount": "x", "qty": "7"}"#)
                .unwrap();
        assert_eq!(probe.name, "42");
        assert!(probe.flag);
        assert_eq!(probe.amount, Decimal::ZERO);
        assert_eq!(probe.qty, 7);
    }

    #[test]
    fn test_null_and_missing_fields() {
        let probe: Probe = serde_json::from_str(r#"{"name": null, "amount": 12.5}"#).unwrap();
        assert_eq!(probe.name, "");
        assert!(!probe.flag);
        assert_eq!(probe.amount, "12.5".parse::<Decimal>().unwrap());
    }
}
