//! Stateless converters between external text and scalar values.
//!
//! Every converter here is a pair of pure functions: `clean` never touches
//! shared state and `render` output is accepted by the same converter's
//! `clean`.

use std::fmt::Write as _;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use rowbridge_core::{
    ConvertError, InternalValue, RowbridgeError, RowbridgeResult, ValueKind,
    DEFAULT_DATETIME_FORMAT, DEFAULT_DATE_FORMAT, DEFAULT_FALSE_VALUE, DEFAULT_TRUE_VALUE,
};

/// `None` and `Some("")` both mean "no value".
pub(crate) fn present(external: Option<&str>) -> Option<&str> {
    external.filter(|v| !v.is_empty())
}

pub(crate) fn mismatch(converter: &'static str, value: &InternalValue) -> RowbridgeError {
    ConvertError::TypeMismatch {
        converter,
        found: value.kind(),
    }
    .into()
}

fn format_error(expected: ValueKind, value: &str, reason: impl ToString) -> RowbridgeError {
    ConvertError::Format {
        expected,
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

// ============================================================================
// INTEGER / DECIMAL / TEXT
// ============================================================================

/// Base-10 integers in the `i64` range. Wider values are a format error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegerConverter;

impl IntegerConverter {
    pub fn clean(&self, external: Option<&str>) -> RowbridgeResult<InternalValue> {
        let Some(text) = present(external) else {
            return Ok(InternalValue::Null);
        };
        text.trim()
            .parse::<i64>()
            .map(InternalValue::Integer)
            .map_err(|e| format_error(ValueKind::Integer, text, e))
    }

    pub fn render(&self, value: &InternalValue) -> RowbridgeResult<String> {
        match value {
            InternalValue::Null => Ok(String::new()),
            InternalValue::Integer(n) => Ok(n.to_string()),
            other => Err(mismatch("integer", other)),
        }
    }
}

/// Largest exponent magnitude accepted on import. Plain-notation rendering
/// writes out every implied zero, so the exponent has to stay bounded.
pub const MAX_DECIMAL_EXPONENT: u64 = 4096;

/// Arbitrary-precision decimals.
///
/// Digits are never rounded and the scale is kept. There is no negative
/// zero: `-0` cleans to the same value as `0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecimalConverter;

impl DecimalConverter {
    pub fn clean(&self, external: Option<&str>) -> RowbridgeResult<InternalValue> {
        let Some(text) = present(external) else {
            return Ok(InternalValue::Null);
        };
        let value = BigDecimal::from_str(text.trim())
            .map_err(|e| format_error(ValueKind::Decimal, text, e))?;
        let (_, exponent) = value.as_bigint_and_exponent();
        if exponent.unsigned_abs() > MAX_DECIMAL_EXPONENT {
            return Err(format_error(
                ValueKind::Decimal,
                text,
                format!("exponent exceeds {}", MAX_DECIMAL_EXPONENT),
            ));
        }
        Ok(InternalValue::Decimal(value))
    }

    /// Plain notation, never scientific.
    pub fn render(&self, value: &InternalValue) -> RowbridgeResult<String> {
        match value {
            InternalValue::Null => Ok(String::new()),
            InternalValue::Decimal(d) => Ok(d.to_plain_string()),
            other => Err(mismatch("decimal", other)),
        }
    }
}

/// Pass-through text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextConverter;

impl TextConverter {
    /// No transformation: `None` stays `Null`, `""` stays empty text.
    pub fn clean(&self, external: Option<&str>) -> RowbridgeResult<InternalValue> {
        Ok(external.map_or(InternalValue::Null, |v| InternalValue::Text(v.to_string())))
    }

    /// Forces any value to its string form.
    pub fn render(&self, value: &InternalValue) -> RowbridgeResult<String> {
        Ok(value.to_string())
    }
}

// ============================================================================
// BOOLEAN
// ============================================================================

/// Token-based booleans.
///
/// Only the configured true tokens clean to `true`. Everything else,
/// including unrecognized text and absent values, cleans to `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooleanConverter {
    true_values: Vec<String>,
    false_value: String,
}

impl Default for BooleanConverter {
    fn default() -> Self {
        Self {
            true_values: vec![DEFAULT_TRUE_VALUE.to_string()],
            false_value: DEFAULT_FALSE_VALUE.to_string(),
        }
    }
}

impl BooleanConverter {
    /// `true_values` must be non-empty; its first token is what `true` renders as.
    pub fn new(true_values: Vec<String>, false_value: impl Into<String>) -> Self {
        Self {
            true_values,
            false_value: false_value.into(),
        }
    }

    pub fn true_values(&self) -> &[String] {
        &self.true_values
    }

    pub fn false_value(&self) -> &str {
        &self.false_value
    }

    pub fn clean(&self, external: Option<&str>) -> RowbridgeResult<InternalValue> {
        let truthy = external.is_some_and(|v| self.true_values.iter().any(|t| t == v));
        Ok(InternalValue::Boolean(truthy))
    }

    /// `Null` renders as the false token.
    pub fn render(&self, value: &InternalValue) -> RowbridgeResult<String> {
        match value {
            InternalValue::Boolean(true) => Ok(self
                .true_values
                .first()
                .map_or(DEFAULT_TRUE_VALUE, String::as_str)
                .to_string()),
            InternalValue::Boolean(false) | InternalValue::Null => Ok(self.false_value.clone()),
            other => Err(mismatch("boolean", other)),
        }
    }
}

// ============================================================================
// DATE / DATETIME
// ============================================================================

/// Calendar dates in a chrono strftime pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateConverter {
    format: String,
}

impl Default for DateConverter {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMAT)
    }
}

impl DateConverter {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn clean(&self, external: Option<&str>) -> RowbridgeResult<InternalValue> {
        let Some(text) = present(external) else {
            return Ok(InternalValue::Null);
        };
        NaiveDate::parse_from_str(text, &self.format)
            .map(InternalValue::Date)
            .map_err(|e| format_error(ValueKind::Date, text, e))
    }

    pub fn render(&self, value: &InternalValue) -> RowbridgeResult<String> {
        match value {
            InternalValue::Null => Ok(String::new()),
            InternalValue::Date(date) => {
                render_with(ValueKind::Date, &self.format, date, date.format(&self.format))
            }
            other => Err(mismatch("date", other)),
        }
    }
}

/// Date plus time-of-day in a chrono strftime pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeConverter {
    format: String,
}

impl Default for DateTimeConverter {
    fn default() -> Self {
        Self::new(DEFAULT_DATETIME_FORMAT)
    }
}

impl DateTimeConverter {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn clean(&self, external: Option<&str>) -> RowbridgeResult<InternalValue> {
        let Some(text) = present(external) else {
            return Ok(InternalValue::Null);
        };
        NaiveDateTime::parse_from_str(text, &self.format)
            .map(InternalValue::DateTime)
            .map_err(|e| format_error(ValueKind::DateTime, text, e))
    }

    pub fn render(&self, value: &InternalValue) -> RowbridgeResult<String> {
        match value {
            InternalValue::Null => Ok(String::new()),
            InternalValue::DateTime(dt) => {
                render_with(ValueKind::DateTime, &self.format, dt, dt.format(&self.format))
            }
            other => Err(mismatch("datetime", other)),
        }
    }
}

/// Write a chrono `DelayedFormat` without the panic `to_string` has on a
/// pattern that asks for fields the value does not carry.
fn render_with(
    kind: ValueKind,
    format: &str,
    value: &impl std::fmt::Display,
    formatted: impl std::fmt::Display,
) -> RowbridgeResult<String> {
    let mut out = String::new();
    write!(out, "{}", formatted).map_err(|_| {
        format_error(kind, &value.to_string(), format!("pattern {:?} cannot render it", format))
    })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowbridge_test_utils::assertions::assert_format_error;

    #[test]
    fn test_integer_clean() {
        let c = IntegerConverter;
        assert_eq!(c.clean(Some("42")).unwrap(), InternalValue::Integer(42));
        assert_eq!(c.clean(Some(" -7 ")).unwrap(), InternalValue::Integer(-7));
        assert_eq!(c.clean(Some("")).unwrap(), InternalValue::Null);
        assert_eq!(c.clean(None).unwrap(), InternalValue::Null);
        assert_format_error(&c.clean(Some("4.2")));
        assert_format_error(&c.clean(Some("abc")));
        assert_format_error(&c.clean(Some("   ")));
    }

    #[test]
    fn test_integer_is_bounded_to_i64() {
        let c = IntegerConverter;
        assert_eq!(
            c.clean(Some("9223372036854775807")).unwrap(),
            InternalValue::Integer(i64::MAX)
        );
        assert_eq!(
            c.clean(Some("-9223372036854775808")).unwrap(),
            InternalValue::Integer(i64::MIN)
        );
        assert_format_error(&c.clean(Some("9223372036854775808")));
    }

    #[test]
    fn test_integer_render() {
        let c = IntegerConverter;
        assert_eq!(c.render(&InternalValue::Integer(-15)).unwrap(), "-15");
        assert_eq!(c.render(&InternalValue::Null).unwrap(), "");
        assert!(matches!(
            c.render(&InternalValue::Boolean(true)),
            Err(RowbridgeError::Convert(ConvertError::TypeMismatch {
                converter: "integer",
                found: ValueKind::Boolean
            }))
        ));
    }

    #[test]
    fn test_decimal_clean_and_render() {
        let c = DecimalConverter;
        let value = c.clean(Some(" 19.990 ")).unwrap();
        assert_eq!(value, InternalValue::Decimal("19.99".parse().unwrap()));
        assert_eq!(c.render(&value).unwrap(), "19.990");
        assert_eq!(c.clean(None).unwrap(), InternalValue::Null);
        assert_format_error(&c.clean(Some("1,5")));
        assert_format_error(&c.clean(Some("   ")));
    }

    #[test]
    fn test_decimal_beyond_28_significant_digits_is_exact() {
        let c = DecimalConverter;
        for text in [
            "0.12345678901234567890123456789012",
            "123456789012345678901234567890.5",
            "-98765432109876543210987654321098765432.000001",
        ] {
            assert_eq!(c.render(&c.clean(Some(text)).unwrap()).unwrap(), text);
        }
    }

    #[test]
    fn test_decimal_exponent_forms() {
        let c = DecimalConverter;
        assert_eq!(c.render(&c.clean(Some("1.5e3")).unwrap()).unwrap(), "1500");
        assert_eq!(c.render(&c.clean(Some("1E-8")).unwrap()).unwrap(), "0.00000001");
        assert_format_error(&c.clean(Some("1e-5000")));
        assert_format_error(&c.clean(Some("1e5000")));
    }

    #[test]
    fn test_decimal_negative_zero_is_zero() {
        let c = DecimalConverter;
        let value = c.clean(Some("-0")).unwrap();
        assert_eq!(value, c.clean(Some("0")).unwrap());
        assert_eq!(c.render(&value).unwrap(), "0");
    }

    #[test]
    fn test_text_is_pass_through() {
        let c = TextConverter;
        assert_eq!(
            c.clean(Some(" padded ")).unwrap(),
            InternalValue::Text(" padded ".to_string())
        );
        assert_eq!(c.clean(Some("")).unwrap(), InternalValue::Text(String::new()));
        assert_eq!(c.clean(None).unwrap(), InternalValue::Null);
        assert_eq!(c.render(&InternalValue::Integer(5)).unwrap(), "5");
        assert_eq!(c.render(&InternalValue::Null).unwrap(), "");
    }

    #[test]
    fn test_boolean_default_tokens() {
        let c = BooleanConverter::default();
        assert_eq!(c.clean(Some("1")).unwrap(), InternalValue::Boolean(true));
        assert_eq!(c.clean(Some("0")).unwrap(), InternalValue::Boolean(false));
        assert_eq!(
            c.clean(Some("anything-else")).unwrap(),
            InternalValue::Boolean(false)
        );
        assert_eq!(c.clean(Some("true")).unwrap(), InternalValue::Boolean(false));
        assert_eq!(c.clean(None).unwrap(), InternalValue::Boolean(false));
        assert_eq!(c.clean(Some("")).unwrap(), InternalValue::Boolean(false));

        assert_eq!(c.render(&InternalValue::Boolean(true)).unwrap(), "1");
        assert_eq!(c.render(&InternalValue::Boolean(false)).unwrap(), "0");
        assert_eq!(c.render(&InternalValue::Null).unwrap(), "0");
    }

    #[test]
    fn test_boolean_custom_tokens() {
        let c = BooleanConverter::new(vec!["yes".to_string(), "y".to_string()], "no");
        assert_eq!(c.clean(Some("y")).unwrap(), InternalValue::Boolean(true));
        assert_eq!(c.clean(Some("1")).unwrap(), InternalValue::Boolean(false));
        assert_eq!(c.render(&InternalValue::Boolean(true)).unwrap(), "yes");
        assert_eq!(c.render(&InternalValue::Boolean(false)).unwrap(), "no");
    }

    #[test]
    fn test_date_default_format() {
        let c = DateConverter::default();
        let date = NaiveDate::from_ymd_opt(2020, 1, 15).unwrap();
        assert_eq!(c.clean(Some("2020-01-15")).unwrap(), InternalValue::Date(date));
        assert_eq!(c.render(&InternalValue::Date(date)).unwrap(), "2020-01-15");
        assert_eq!(c.clean(Some("")).unwrap(), InternalValue::Null);
        assert_format_error(&c.clean(Some("15/01/2020")));
        assert_format_error(&c.clean(Some("2020-02-30")));
    }

    #[test]
    fn test_date_custom_format_and_old_dates() {
        let c = DateConverter::new("%d/%m/%Y");
        let date = NaiveDate::from_ymd_opt(1850, 7, 4).unwrap();
        assert_eq!(c.render(&InternalValue::Date(date)).unwrap(), "04/07/1850");
        assert_eq!(c.clean(Some("04/07/1850")).unwrap(), InternalValue::Date(date));
    }

    #[test]
    fn test_date_render_with_unusable_pattern_is_an_error() {
        let c = DateConverter::new("%Y-%m-%d %H:%M");
        let date = NaiveDate::from_ymd_opt(2020, 1, 15).unwrap();
        assert_format_error(&c.render(&InternalValue::Date(date)));
    }

    #[test]
    fn test_datetime_default_format() {
        let c = DateTimeConverter::default();
        let dt = NaiveDate::from_ymd_opt(2021, 3, 4)
            .unwrap()
            .and_hms_opt(5, 6, 7)
            .unwrap();
        assert_eq!(
            c.clean(Some("2021-03-04 05:06:07")).unwrap(),
            InternalValue::DateTime(dt)
        );
        assert_eq!(
            c.render(&InternalValue::DateTime(dt)).unwrap(),
            "2021-03-04 05:06:07"
        );
        assert_eq!(c.clean(None).unwrap(), InternalValue::Null);
        assert_format_error(&c.clean(Some("2021-03-04")));
        assert!(c.render(&InternalValue::Date(dt.date())).is_err());
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
