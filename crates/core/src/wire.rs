//! Lenient deserialisers for columns the row store has held in more than one shape.
//!
//! Earlier revisions of the front desk wrote vitals as strings and later ones as numbers,
//! and blank form values were sometimes stored as `""` instead of `null`. Reading accepts
//! all of these; writing always uses the canonical shape.

use chrono::{NaiveDate, NaiveTime};
use serde::{de::Error, Deserialize, Deserializer};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrText {
    Bool(bool),
    Text(String),
}

/// Parses `HH:MM` or `HH:MM:SS` (with optional fraction).
pub(crate) fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

/// Parses a `YYYY-MM-DD` calendar date.
pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

pub(crate) fn optional_unsigned<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64> + FromStr,
    <T as FromStr>::Err: Display,
{
    let out_of_range = || D::Error::custom("number out of range");

    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Unsigned(n)) => T::try_from(n).map(Some).map_err(|_| out_of_range()),
        Some(NumberOrText::Signed(_)) => Err(out_of_range()),
        Some(NumberOrText::Float(f)) if f >= 0.0 && f.fract() == 0.0 => {
            T::try_from(f as u64).map(Some).map_err(|_| out_of_range())
        }
        Some(NumberOrText::Float(f)) => Err(D::Error::custom(format!("expected integer, got {f}"))),
        Some(NumberOrText::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(s)) => s.trim().parse::<T>().map(Some).map_err(D::Error::custom),
    }
}

pub(crate) fn optional_float<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Unsigned(n)) => Ok(Some(n as f64)),
        Some(NumberOrText::Signed(n)) => Ok(Some(n as f64)),
        Some(NumberOrText::Float(f)) => Ok(Some(f)),
        Some(NumberOrText::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(s)) => s.trim().parse::<f64>().map(Some).map_err(D::Error::custom),
    }
}

pub(crate) fn optional_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<BoolOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolOrText::Bool(b)) => Ok(Some(b)),
        Some(BoolOrText::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(None),
            "true" | "yes" | "y" | "1" => Ok(Some(true)),
            "false" | "no" | "n" | "0" => Ok(Some(false)),
            other => Err(D::Error::custom(format!("expected yes/no, got '{other}'"))),
        },
    }
}

pub(crate) fn optional_time<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_time(&s)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid time '{s}'"))),
    }
}

pub(crate) fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_date(&s)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid date '{s}'"))),
    }
}

/// Reads a text column that should never be null, mapping `null` to `""`.
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reads a nullable text column, mapping `""` to `None`.
pub(crate) fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    <T as FromStr>::Err: Display,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(D::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "optional_unsigned")]
        hr: Option<u32>,
        #[serde(default, deserialize_with = "optional_float")]
        temperature: Option<f64>,
        #[serde(default, deserialize_with = "optional_bool")]
        surgery_done: Option<bool>,
        #[serde(default, deserialize_with = "optional_time")]
        time_of_injury: Option<NaiveTime>,
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let a: Row = serde_json::from_str(r#"{"hr": 88, "temperature": 37.5}"#).unwrap();
        let b: Row = serde_json::from_str(r#"{"hr": "88", "temperature": "37.5"}"#).unwrap();
        assert_eq!(a.hr, Some(88));
        assert_eq!(b.hr, Some(88));
        assert_eq!(a.temperature, Some(37.5));
        assert_eq!(b.temperature, Some(37.5));
    }

    #[test]
    fn blank_strings_and_nulls_read_as_none() {
        let row: Row = serde_json::from_str(
            r#"{"hr": "", "temperature": null, "surgery_done": "", "time_of_injury": ""}"#,
        )
        .unwrap();
        assert_eq!(row.hr, None);
        assert_eq!(row.temperature, None);
        assert_eq!(row.surgery_done, None);
        assert_eq!(row.time_of_injury, None);
    }

    #[test]
    fn negative_integer_is_rejected() {
        assert!(serde_json::from_str::<Row>(r#"{"hr": -4}"#).is_err());
    }

    #[test]
    fn time_accepts_minutes_and_seconds_forms() {
        let short: Row = serde_json::from_str(r#"{"time_of_injury": "14:30"}"#).unwrap();
        let long: Row = serde_json::from_str(r#"{"time_of_injury": "14:30:00"}"#).unwrap();
        assert_eq!(short.time_of_injury, long.time_of_injury);
        assert_eq!(short.time_of_injury, NaiveTime::from_hms_opt(14, 30, 0));
    }

    #[test]
    fn surgery_done_accepts_text_flags() {
        let row: Row = serde_json::from_str(r#"{"surgery_done": "Yes"}"#).unwrap();
        assert_eq!(row.surgery_done, Some(true));
        let row: Row = serde_json::from_str(r#"{"surgery_done": false}"#).unwrap();
        assert_eq!(row.surgery_done, Some(false));
    }
}
