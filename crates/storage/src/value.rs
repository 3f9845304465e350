//! Typed values and their storage encoding.
//!
//! The store only holds strings. [`Value::encode`] turns a typed value into
//! the text written to the store, and [`decode_json`] is what a `json` read
//! does with that text on the way back out:
//!
//! | Value | Stored text |
//! |-------|-------------|
//! | `Value::Boolean(true)` | `true` |
//! | `Value::Number(255)` | `255` |
//! | `Value::Number(1e3)` | `1000` |
//! | `Value::String("x")` | `x` |

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Number;

/// Minimum length of a string value, in characters.
pub const MIN_STRING_VALUE_LENGTH: usize = 1;

/// Maximum length of a string value, in characters.
pub const MAX_STRING_VALUE_LENGTH: usize = 1024;

/// Largest magnitude at which every integer is exactly representable as `f64`.
const MAX_SAFE_FLOAT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Integral floats such as `1.0` or `1e3` in integer form, so equal numbers
/// always produce the same text. `-0.0` becomes `0`.
fn integral(n: &Number) -> Option<i64> {
    let f = n.as_f64().filter(|_| n.is_f64())?;
    (f.fract() == 0.0 && f.abs() <= MAX_SAFE_FLOAT_INTEGER).then_some(f as i64)
}

fn encode_number(n: &Number) -> String {
    integral(n).map_or_else(|| n.to_string(), |i| i.to_string())
}

fn serialize_number<S: Serializer>(n: &Number, serializer: S) -> Result<S::Ok, S::Error> {
    match integral(n) {
        Some(i) => serializer.serialize_i64(i),
        None => n.serialize(serializer),
    }
}

/// A tenant's batch of key-value pairs, ordered by key.
pub type Values = BTreeMap<String, Value>;

/// A value a tenant can store.
///
/// The union is closed and ordered: string, then number, then boolean.
/// Serializes as the bare JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A string value.
    String(String),
    /// A JSON number, kept in its parsed representation.
    Number(#[serde(serialize_with = "serialize_number")] Number),
    /// A boolean value.
    Boolean(bool),
}

impl Value {
    /// Encodes the value as the text written to the store.
    ///
    /// # Examples
    ///
    /// ```
    /// use persistent_values_storage::Value;
    ///
    /// assert_eq!(Value::from(true).encode(), "true");
    /// assert_eq!(Value::from(255).encode(), "255");
    /// assert_eq!(Value::from("x").encode(), "x");
    /// ```
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Number(n) => encode_number(n),
            Self::Boolean(b) => b.to_string(),
        }
    }

    /// Returns `true` if this is a string within the accepted length bounds,
    /// or any number or boolean.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        match self {
            Self::String(s) => {
                let len = s.chars().count();
                (MIN_STRING_VALUE_LENGTH..=MAX_STRING_VALUE_LENGTH).contains(&len)
            },
            Self::Number(_) | Self::Boolean(_) => true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Self::Number(value)
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = serde_json::Value;

    /// Narrows an arbitrary JSON value. Anything other than a string, number
    /// or boolean is handed back unchanged.
    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::String(s) => Ok(Self::String(s)),
            serde_json::Value::Number(n) => Ok(Self::Number(n)),
            serde_json::Value::Bool(b) => Ok(Self::Boolean(b)),
            other => Err(other),
        }
    }
}

/// Interprets stored text as JSON, the way a `json` read does.
///
/// Scalars come back typed. Text that does not parse, or parses to `null`,
/// an array or an object, is returned as a string unchanged. A string value
/// that looks like a number or boolean (`"123"`, `"true"`) therefore reads
/// back as that number or boolean.
#[must_use]
pub fn decode_json(text: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(parsed) => Value::try_from(parsed).unwrap_or_else(|_| Value::String(text.to_owned())),
        Err(_) => Value::String(text.to_owned()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn encode_booleans() {
        assert_eq!(Value::from(true).encode(), "true");
        assert_eq!(Value::from(false).encode(), "false");
    }

    #[test]
    fn encode_numbers() {
        assert_eq!(Value::from(255).encode(), "255");
        assert_eq!(Value::from(-3).encode(), "-3");
        let float: Value = serde_json::from_value(json!(1.5)).unwrap();
        assert_eq!(float.encode(), "1.5");
    }

    #[rstest]
    #[case::trailing_zero("1.0", "1")]
    #[case::exponent("1e3", "1000")]
    #[case::negative_zero("-0.0", "0")]
    #[case::negative("-42.0", "-42")]
    #[case::fraction("0.25", "0.25")]
    #[case::beyond_exact_integers("1e300", "1e300")]
    fn encode_integral_floats_as_integers(#[case] input: &str, #[case] expected: &str) {
        let value: Value = serde_json::from_str(input).unwrap();
        assert_eq!(value.encode(), expected);
        assert_eq!(serde_json::to_string(&value).unwrap(), expected);
    }

    #[test]
    fn encode_string_passes_through() {
        assert_eq!(Value::from("x").encode(), "x");
        assert_eq!(Value::from("with spaces | and pipes").encode(), "with spaces | and pipes");
    }

    #[rstest]
    #[case::boolean(Value::from(true))]
    #[case::integer(Value::from(255))]
    #[case::plain_string(Value::from("hello"))]
    fn decode_recovers_encoded_value(#[case] value: Value) {
        assert_eq!(decode_json(&value.encode()), value);
    }

    #[test]
    fn decode_numeric_looking_string_is_lossy() {
        assert_eq!(decode_json(&Value::from("123").encode()), Value::from(123));
    }

    #[rstest]
    #[case::null("null")]
    #[case::array("[1,2]")]
    #[case::object(r#"{"a":1}"#)]
    #[case::not_json("{oops")]
    fn decode_non_scalar_falls_back_to_text(#[case] text: &str) {
        assert_eq!(decode_json(text), Value::String(text.to_owned()));
    }

    #[test]
    fn serializes_as_bare_scalar() {
        let values = vec![Value::from("a"), Value::from(1), Value::from(false)];
        assert_eq!(serde_json::to_value(&values).unwrap(), json!(["a", 1, false]));
    }

    #[test]
    fn try_from_rejects_other_shapes() {
        assert!(Value::try_from(json!(null)).is_err());
        assert!(Value::try_from(json!({"nested": true})).is_err());
        assert!(Value::try_from(json!([1])).is_err());
        assert_eq!(Value::try_from(json!("s")).unwrap(), Value::from("s"));
    }

    #[rstest]
    #[case::empty_string(Value::from(""), false)]
    #[case::single_char(Value::from("a"), true)]
    #[case::at_limit(Value::from("a".repeat(MAX_STRING_VALUE_LENGTH)), true)]
    #[case::over_limit(Value::from("a".repeat(MAX_STRING_VALUE_LENGTH + 1)), false)]
    #[case::number(Value::from(0), true)]
    #[case::boolean(Value::from(false), true)]
    fn well_formed_values(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(value.is_well_formed(), expected);
    }
}
