//! `deserialize_with` helpers that accept the loose shapes browsers send:
//! numbers as strings, empty strings for "not set".

use chrono::{NaiveDate, NaiveTime};
use serde::{de::Error, Deserialize, Deserializer};
use serde_json::Value;

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Loose {
    fn as_int(&self) -> Option<i64> {
        match self {
            Loose::Int(i) => Some(*i),
            Loose::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            Loose::Float(_) => None,
            Loose::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            }
        }
    }

    fn as_float(&self) -> Option<f64> {
        let value = match self {
            Loose::Int(i) => Some(*i as f64),
            Loose::Float(f) => Some(*f),
            Loose::Text(s) => s.trim().parse::<f64>().ok(),
        };
        value.filter(|f| f.is_finite())
    }

    fn is_blank(&self) -> bool {
        matches!(self, Loose::Text(s) if s.trim().is_empty())
    }
}

pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    Loose::deserialize(d)?
        .as_int()
        .ok_or_else(|| D::Error::custom("expected an integer"))
}

pub fn opt_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    match Option::<Loose>::deserialize(d)? {
        None => Ok(None),
        Some(v) if v.is_blank() => Ok(None),
        Some(v) => v
            .as_int()
            .map(Some)
            .ok_or_else(|| D::Error::custom("expected an integer")),
    }
}

/// Optional foreign key: `0`, `""` and `null` all mean "none".
pub fn opt_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(opt_int(d)?.filter(|id| *id > 0))
}

pub fn float<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Loose::deserialize(d)?
        .as_float()
        .ok_or_else(|| D::Error::custom("expected a number"))
}

pub fn opt_float<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    match Option::<Loose>::deserialize(d)? {
        None => Ok(None),
        Some(v) if v.is_blank() => Ok(None),
        Some(v) => v
            .as_float()
            .map(Some)
            .ok_or_else(|| D::Error::custom("expected a number")),
    }
}

/// `true`/`false`, `1`/`0` or their string forms.
pub fn opt_flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::Number(n)) => Ok(Some(n.as_f64().map_or(false, |f| f != 0.0))),
        Some(Value::String(s)) => match s.trim() {
            "" => Ok(None),
            "1" | "true" => Ok(Some(true)),
            "0" | "false" => Ok(Some(false)),
            other => Err(D::Error::custom(format!("invalid flag `{other}`"))),
        },
        Some(_) => Err(D::Error::custom("expected a boolean")),
    }
}

pub fn date<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(d)?;
    parse_date(&raw).ok_or_else(|| D::Error::custom(format!("invalid date `{raw}`, expected YYYY-MM-DD")))
}

pub fn opt_date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
    match Option::<String>::deserialize(d)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_date(&raw)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid date `{raw}`, expected YYYY-MM-DD"))),
    }
}

pub fn opt_time<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
    match Option::<String>::deserialize(d)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_time(&raw)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid time `{raw}`, expected HH:MM"))),
    }
}

// Partial updates: absent stays `None` through `#[serde(default)]`, while a
// present `null`/`""` (or `0` for ids) becomes `Some(None)` and clears the column.

pub fn clearable_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Option<i64>>, D::Error> {
    opt_id(d).map(Some)
}

pub fn clearable_date<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<Option<NaiveDate>>, D::Error> {
    opt_date(d).map(Some)
}

pub fn clearable_time<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<Option<NaiveTime>>, D::Error> {
    opt_time(d).map(Some)
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Positive identifier out of an untyped JSON value (`7` or `"7"`).
pub fn value_as_id(value: &Value) -> Option<i64> {
    let id = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    id.filter(|id| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "int")]
        level: i64,
        #[serde(default, deserialize_with = "opt_id")]
        category_id: Option<i64>,
        #[serde(deserialize_with = "float")]
        amount: f64,
        #[serde(default, deserialize_with = "opt_date")]
        due_date: Option<NaiveDate>,
        #[serde(default, deserialize_with = "opt_time")]
        due_time: Option<NaiveTime>,
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let s: Sample = serde_json::from_value(json!({
            "level": "4",
            "category_id": "12",
            "amount": "19.99",
            "due_date": "2024-01-15",
            "due_time": "08:30"
        }))
        .unwrap();
        assert_eq!(s.level, 4);
        assert_eq!(s.category_id, Some(12));
        assert!((s.amount - 19.99).abs() < f64::EPSILON);
        assert_eq!(s.due_date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(s.due_time, NaiveTime::from_hms_opt(8, 30, 0));
    }

    #[test]
    fn test_blank_and_zero_mean_absent() {
        let s: Sample = serde_json::from_value(json!({
            "level": 2,
            "category_id": 0,
            "amount": 5,
            "due_date": "",
            "due_time": null
        }))
        .unwrap();
        assert_eq!(s.category_id, None);
        assert_eq!(s.due_date, None);
        assert_eq!(s.due_time, None);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let err = serde_json::from_value::<Sample>(json!({ "level": "lots", "amount": 1 }));
        assert!(err.is_err());
        let err = serde_json::from_value::<Sample>(json!({
            "level": 1, "amount": 1, "due_date": "15/01/2024"
        }));
        assert!(err.is_err());
    }

    #[test]
    fn test_flags() {
        #[derive(Deserialize)]
        struct Flag {
            #[serde(default, deserialize_with = "opt_flag")]
            is_active: Option<bool>,
        }
        let parse = |v: Value| serde_json::from_value::<Flag>(v).map(|f| f.is_active);
        assert_eq!(parse(json!({ "is_active": 0 })).unwrap(), Some(false));
        assert_eq!(parse(json!({ "is_active": "1" })).unwrap(), Some(true));
        assert_eq!(parse(json!({ "is_active": true })).unwrap(), Some(true));
        assert_eq!(parse(json!({})).unwrap(), None);
        assert!(parse(json!({ "is_active": "maybe" })).is_err());
    }

    #[test]
    fn test_clearable_distinguishes_absent_from_empty() {
        #[derive(Deserialize)]
        struct Patch {
            #[serde(default, deserialize_with = "clearable_date")]
            due_date: Option<Option<NaiveDate>>,
            #[serde(default, deserialize_with = "clearable_id")]
            category_id: Option<Option<i64>>,
        }
        let parse = |v: Value| serde_json::from_value::<Patch>(v).unwrap();

        let absent = parse(json!({}));
        assert_eq!(absent.due_date, None);
        assert_eq!(absent.category_id, None);

        let cleared = parse(json!({ "due_date": null, "category_id": "" }));
        assert_eq!(cleared.due_date, Some(None));
        assert_eq!(cleared.category_id, Some(None));

        let set = parse(json!({ "due_date": "2024-02-01", "category_id": 0 }));
        assert_eq!(set.due_date, Some(NaiveDate::from_ymd_opt(2024, 2, 1)));
        assert_eq!(set.category_id, Some(None));
    }

    #[test]
    fn test_value_as_id() {
        assert_eq!(value_as_id(&json!(7)), Some(7));
        assert_eq!(value_as_id(&json!("7")), Some(7));
        assert_eq!(value_as_id(&json!(0)), None);
        assert_eq!(value_as_id(&json!("x")), None);
        assert_eq!(value_as_id(&json!(null)), None);
    }
}
