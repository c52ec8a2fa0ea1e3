//! Literal coercion
//!
//! Converts between RDF literals and native values. Decoding goes by the
//! literal's own datatype; encoding uses the datatype declared for the
//! property when there is one.

use super::{ProxyError, ProxyResult};
use crate::rdf::namespace::{rdf, xsd};
use crate::rdf::{Literal, NamedNode};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use serde_json::{json, Value as JsonValue};
use std::fmt;
use tracing::warn;

/// Native form of a literal
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    String(String),
    LangString { value: String, language: String },
    Integer(i64),
    Double(f64),
    Boolean(bool),
    DateTime(DateTime<FixedOffset>),
    Date(NaiveDate),
}

impl NativeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(s) => Some(s),
            NativeValue::LangString { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NativeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NativeValue::Double(d) => Some(*d),
            NativeValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            NativeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            NativeValue::String(_) => "string",
            NativeValue::LangString { .. } => "language-tagged string",
            NativeValue::Integer(_) => "integer",
            NativeValue::Double(_) => "double",
            NativeValue::Boolean(_) => "boolean",
            NativeValue::DateTime(_) => "dateTime",
            NativeValue::Date(_) => "date",
        }
    }

    /// Datatype used when the property declares none
    fn natural_datatype(&self) -> NamedNode {
        match self {
            NativeValue::String(_) => xsd::STRING.into(),
            NativeValue::LangString { .. } => rdf::LANG_STRING.into(),
            NativeValue::Integer(_) => xsd::INTEGER.into(),
            NativeValue::Double(_) => xsd::DOUBLE.into(),
            NativeValue::Boolean(_) => xsd::BOOLEAN.into(),
            NativeValue::DateTime(_) => xsd::DATE_TIME.into(),
            NativeValue::Date(_) => xsd::DATE.into(),
        }
    }

    /// XSD lexical form
    fn lexical(&self) -> String {
        match self {
            NativeValue::String(s) => s.clone(),
            NativeValue::LangString { value, .. } => value.clone(),
            NativeValue::Integer(i) => i.to_string(),
            NativeValue::Double(d) if d.is_nan() => "NaN".to_string(),
            NativeValue::Double(d) if d.is_infinite() => {
                let sign = if *d > 0.0 { "" } else { "-" };
                format!("{}INF", sign)
            }
            NativeValue::Double(d) => d.to_string(),
            NativeValue::Boolean(b) => b.to_string(),
            NativeValue::DateTime(dt) => dt.to_rfc3339(),
            NativeValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// JSON rendering; language-tagged strings become value objects
    pub fn to_json(&self) -> JsonValue {
        match self {
            NativeValue::String(s) => JsonValue::String(s.clone()),
            NativeValue::LangString { value, language } => {
                json!({ "@value": value, "@language": language })
            }
            NativeValue::Integer(i) => json!(i),
            NativeValue::Double(d) if d.is_finite() => json!(d),
            NativeValue::Boolean(b) => JsonValue::Bool(*b),
            other => JsonValue::String(other.lexical()),
        }
    }

    /// Read a JSON scalar or `{"@value", "@language"}` object
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::String(s) => Some(NativeValue::String(s.clone())),
            JsonValue::Bool(b) => Some(NativeValue::Boolean(*b)),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Some(NativeValue::Integer(i)),
                None => n.as_f64().map(NativeValue::Double),
            },
            JsonValue::Object(map) => {
                let value = map.get("@value")?.as_str()?.to_string();
                match map.get("@language").and_then(JsonValue::as_str) {
                    Some(language) => Some(NativeValue::LangString {
                        value,
                        language: language.to_string(),
                    }),
                    None => Some(NativeValue::String(value)),
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lexical())
    }
}

impl From<&str> for NativeValue {
    fn from(value: &str) -> Self {
        NativeValue::String(value.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(value: String) -> Self {
        NativeValue::String(value)
    }
}

impl From<i64> for NativeValue {
    fn from(value: i64) -> Self {
        NativeValue::Integer(value)
    }
}

impl From<i32> for NativeValue {
    fn from(value: i32) -> Self {
        NativeValue::Integer(value.into())
    }
}

impl From<f64> for NativeValue {
    fn from(value: f64) -> Self {
        NativeValue::Double(value)
    }
}

impl From<bool> for NativeValue {
    fn from(value: bool) -> Self {
        NativeValue::Boolean(value)
    }
}

impl From<DateTime<FixedOffset>> for NativeValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        NativeValue::DateTime(value)
    }
}

impl From<NaiveDate> for NativeValue {
    fn from(value: NaiveDate) -> Self {
        NativeValue::Date(value)
    }
}

fn is_integer_type(datatype: &str) -> bool {
    [
        xsd::INTEGER,
        xsd::INT,
        xsd::LONG,
        xsd::SHORT,
        xsd::BYTE,
        xsd::NON_NEGATIVE_INTEGER,
        xsd::POSITIVE_INTEGER,
        xsd::NON_POSITIVE_INTEGER,
        xsd::NEGATIVE_INTEGER,
        xsd::UNSIGNED_LONG,
        xsd::UNSIGNED_INT,
        xsd::UNSIGNED_SHORT,
        xsd::UNSIGNED_BYTE,
    ]
    .iter()
    .any(|d| d.as_str() == datatype)
}

fn is_decimal_type(datatype: &str) -> bool {
    [xsd::DECIMAL, xsd::DOUBLE, xsd::FLOAT]
        .iter()
        .any(|d| d.as_str() == datatype)
}

/// Whether literals of this datatype decode to something other than a string
pub fn is_supported(datatype: &str) -> bool {
    datatype == xsd::STRING.as_str()
        || datatype == rdf::LANG_STRING.as_str()
        || datatype == xsd::BOOLEAN.as_str()
        || datatype == xsd::DATE_TIME.as_str()
        || datatype == xsd::DATE.as_str()
        || is_integer_type(datatype)
        || is_decimal_type(datatype)
}

fn parse_date_time(value: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }
    // xsd:dateTime without a timezone is read as UTC
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    let utc = FixedOffset::east_opt(0)?;
    Some(utc.from_utc_datetime(&naive))
}

fn parse_boolean(value: &str) -> Option<bool> {
    match value {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn decode(literal: &Literal) -> Option<NativeValue> {
    let value = literal.value();
    let datatype = literal.datatype_iri();

    if let Some(language) = literal.language() {
        return Some(NativeValue::LangString {
            value: value.to_string(),
            language: language.to_string(),
        });
    }
    if datatype == xsd::STRING.as_str() {
        return Some(NativeValue::String(value.to_string()));
    }
    if is_integer_type(datatype) {
        return value.trim().parse().ok().map(NativeValue::Integer);
    }
    if is_decimal_type(datatype) {
        return value.trim().parse().ok().map(NativeValue::Double);
    }
    if datatype == xsd::BOOLEAN.as_str() {
        return parse_boolean(value.trim()).map(NativeValue::Boolean);
    }
    if datatype == xsd::DATE_TIME.as_str() {
        return parse_date_time(value.trim()).map(NativeValue::DateTime);
    }
    if datatype == xsd::DATE.as_str() {
        return NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .ok()
            .map(NativeValue::Date);
    }
    None
}

/// Decode a literal.
///
/// Unknown datatypes and malformed lexical forms fall back to the lexical
/// string, or fail with `UnsupportedDatatype` when `strict` is set.
pub fn to_native(literal: &Literal, strict: bool) -> ProxyResult<NativeValue> {
    match decode(literal) {
        Some(native) => Ok(native),
        None if strict => Err(ProxyError::UnsupportedDatatype {
            datatype: literal.datatype_iri().to_string(),
            value: literal.value().to_string(),
        }),
        None => {
            warn!(
                "Falling back to lexical form for {} literal {:?}",
                literal.datatype_iri(),
                literal.value()
            );
            Ok(NativeValue::String(literal.value().to_string()))
        }
    }
}

fn is_string_type(datatype: &str) -> bool {
    datatype == xsd::STRING.as_str() || datatype == rdf::LANG_STRING.as_str()
}

/// Whether a literal of datatype `actual` may back a property declaring `declared`
pub fn datatype_accepts(declared: &str, actual: &str) -> bool {
    declared == actual
        || (is_string_type(declared) && is_string_type(actual))
        || (is_integer_type(declared) && is_integer_type(actual))
        || (is_decimal_type(declared) && is_decimal_type(actual))
}

/// Check that `value` can be stored under the declared datatype and language.
///
/// The error is the reason the value does not fit.
pub fn check_native(
    value: &NativeValue,
    datatype: Option<&NamedNode>,
    language: Option<&str>,
) -> Result<(), String> {
    let Some(datatype) = datatype else {
        return Ok(());
    };
    let declared = datatype.as_str();
    let fits = match value {
        NativeValue::LangString { .. } => is_string_type(declared),
        NativeValue::String(_) if language.is_some() => is_string_type(declared),
        // unknown datatypes carry their lexical form as a string
        NativeValue::String(_) => is_string_type(declared) || !is_supported(declared),
        NativeValue::Integer(_) => is_integer_type(declared),
        NativeValue::Double(_) => is_decimal_type(declared),
        NativeValue::Boolean(_) => declared == xsd::BOOLEAN.as_str(),
        NativeValue::DateTime(_) => declared == xsd::DATE_TIME.as_str(),
        NativeValue::Date(_) => declared == xsd::DATE.as_str(),
    };
    if !fits {
        return Err(format!(
            "{} value {:?} does not fit datatype {}",
            value.kind(),
            value.lexical(),
            declared
        ));
    }
    if matches!(value, NativeValue::LangString { .. }) || language.is_some() {
        return Ok(());
    }
    let literal = Literal::new_typed_literal(value.lexical(), datatype.clone());
    if is_supported(declared) && decode(&literal).is_none() {
        return Err(format!("{:?} is not a valid {}", value.lexical(), declared));
    }
    Ok(())
}

/// Encode a native value for a property declaring `datatype` and `language`.
///
/// The declared language wins for plain strings; otherwise the declared
/// datatype wins. Use `check_native` first to refuse values that do not fit.
pub fn from_native(
    value: &NativeValue,
    datatype: Option<&NamedNode>,
    language: Option<&str>,
) -> ProxyResult<Literal> {
    match (value, language) {
        (NativeValue::LangString { value, language }, _) => {
            return Ok(Literal::new_language_tagged_literal(value.as_str(), language.as_str())?);
        }
        (NativeValue::String(s), Some(language)) => {
            return Ok(Literal::new_language_tagged_literal(s.as_str(), language)?);
        }
        _ => {}
    }

    let datatype = match datatype {
        Some(d) => d.clone(),
        None => value.natural_datatype(),
    };
    Ok(Literal::new_typed_literal(value.lexical(), datatype))
}

/// Native value for a JSON scalar written to a property declaring `datatype`.
///
/// Strings are read as lexical forms of the declared datatype, and whole
/// numbers widen to doubles for decimal properties.
pub fn from_json_typed(value: &JsonValue, datatype: Option<&NamedNode>) -> Option<NativeValue> {
    let native = NativeValue::from_json(value)?;
    let Some(datatype) = datatype else {
        return Some(native);
    };
    let declared = datatype.as_str();
    match native {
        NativeValue::String(s) if is_supported(declared) && !is_string_type(declared) => {
            decode(&Literal::new_typed_literal(s.as_str(), datatype.clone()))
                .or(Some(NativeValue::String(s)))
        }
        NativeValue::Integer(i) if is_decimal_type(declared) => Some(NativeValue::Double(i as f64)),
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(value: &str, datatype: oxrdf::NamedNodeRef<'_>) -> Literal {
        Literal::new_typed_literal(value, datatype.into())
    }

    #[test]
    fn test_decode_common_datatypes() {
        assert_eq!(
            to_native(&typed("42", xsd::INTEGER), false).unwrap(),
            NativeValue::Integer(42)
        );
        assert_eq!(
            to_native(&typed("2.5", xsd::DECIMAL), false).unwrap(),
            NativeValue::Double(2.5)
        );
        assert_eq!(
            to_native(&typed("1", xsd::BOOLEAN), false).unwrap(),
            NativeValue::Boolean(true)
        );
        assert_eq!(
            to_native(&typed("2024-02-29", xsd::DATE), false).unwrap(),
            NativeValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        let dt = to_native(&typed("2024-01-01T10:00:00", xsd::DATE_TIME), false).unwrap();
        assert_eq!(dt.to_string(), "2024-01-01T10:00:00+00:00");
    }

    #[test]
    fn test_language_tagged() {
        let literal = Literal::new_language_tagged_literal("Bonjour", "fr").unwrap();
        assert_eq!(
            to_native(&literal, true).unwrap(),
            NativeValue::LangString {
                value: "Bonjour".to_string(),
                language: "fr".to_string()
            }
        );
    }

    #[test]
    fn test_fallback_and_strict() {
        let custom = Literal::new_typed_literal(
            "abc",
            NamedNode::new("http://example.org/custom").unwrap(),
        );
        assert_eq!(
            to_native(&custom, false).unwrap(),
            NativeValue::String("abc".to_string())
        );
        assert!(matches!(
            to_native(&custom, true),
            Err(ProxyError::UnsupportedDatatype { .. })
        ));

        let malformed = typed("forty-two", xsd::INTEGER);
        assert_eq!(
            to_native(&malformed, false).unwrap(),
            NativeValue::String("forty-two".to_string())
        );
        assert!(to_native(&malformed, true).is_err());
    }

    #[test]
    fn test_encode_uses_declared_datatype() {
        let decimal: NamedNode = xsd::DECIMAL.into();
        let literal = from_native(&NativeValue::Double(3.5), Some(&decimal), None).unwrap();
        assert_eq!(literal.datatype_iri(), xsd::DECIMAL.as_str());
        assert_eq!(literal.value(), "3.5");

        let natural = from_native(&NativeValue::Boolean(false), None, None).unwrap();
        assert_eq!(natural.datatype_iri(), xsd::BOOLEAN.as_str());
    }

    #[test]
    fn test_check_native_pairings() {
        fn fits(value: NativeValue, datatype: oxrdf::NamedNodeRef<'_>) -> bool {
            check_native(&value, Some(&datatype.into()), None).is_ok()
        }

        assert!(fits(NativeValue::from("a"), xsd::STRING));
        assert!(fits(NativeValue::Integer(3), xsd::NON_NEGATIVE_INTEGER));
        assert!(fits(NativeValue::Double(0.5), xsd::FLOAT));
        assert!(fits(NativeValue::Boolean(true), xsd::BOOLEAN));

        assert!(!fits(NativeValue::Integer(5), xsd::STRING));
        assert!(!fits(NativeValue::Integer(3), xsd::DECIMAL));
        assert!(!fits(NativeValue::Double(3.0), xsd::INTEGER));
        assert!(!fits(NativeValue::Boolean(true), xsd::INTEGER));
        assert!(!fits(NativeValue::from("abc"), xsd::INTEGER));
        assert!(!fits(NativeValue::from("2024-01-01"), xsd::DATE));

        // no declared datatype, or an unknown one, takes anything suitable
        assert!(check_native(&NativeValue::Integer(1), None, None).is_ok());
        let custom = NamedNode::new("http://example.org/custom").unwrap();
        assert!(check_native(&NativeValue::from("x"), Some(&custom), None).is_ok());
        assert!(check_native(&NativeValue::Integer(1), Some(&custom), None).is_err());
    }

    #[test]
    fn test_datatype_families() {
        assert!(datatype_accepts(xsd::INTEGER.as_str(), xsd::INT.as_str()));
        assert!(datatype_accepts(xsd::DECIMAL.as_str(), xsd::DOUBLE.as_str()));
        assert!(datatype_accepts(xsd::STRING.as_str(), rdf::LANG_STRING.as_str()));
        assert!(!datatype_accepts(xsd::INTEGER.as_str(), xsd::STRING.as_str()));
        assert!(!datatype_accepts(xsd::INTEGER.as_str(), xsd::DECIMAL.as_str()));
    }

    #[test]
    fn test_json_typed_scalars() {
        let date: NamedNode = xsd::DATE.into();
        let decimal: NamedNode = xsd::DECIMAL.into();
        assert_eq!(
            from_json_typed(&json!("2024-02-29"), Some(&date)),
            Some(NativeValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()))
        );
        assert_eq!(from_json_typed(&json!(2), Some(&decimal)), Some(NativeValue::Double(2.0)));
        assert_eq!(
            from_json_typed(&json!("soon"), Some(&date)),
            Some(NativeValue::from("soon"))
        );
    }

    #[test]
    fn test_encode_language() {
        let literal = from_native(&NativeValue::from("colour"), None, Some("en")).unwrap();
        assert_eq!(literal.language(), Some("en"));
        assert_eq!(literal.value(), "colour");
    }

    #[test]
    fn test_roundtrip_through_literal() {
        let values = [
            NativeValue::from("text"),
            NativeValue::from(-7i64),
            NativeValue::from(0.25),
            NativeValue::from(true),
        ];
        for value in values {
            let literal = from_native(&value, None, None).unwrap();
            assert_eq!(to_native(&literal, true).unwrap(), value);
        }
    }

    #[test]
    fn test_json_scalars() {
        assert_eq!(
            NativeValue::from_json(&json!(5)),
            Some(NativeValue::Integer(5))
        );
        assert_eq!(
            NativeValue::from_json(&json!({"@value": "hi", "@language": "en"})),
            Some(NativeValue::LangString {
                value: "hi".to_string(),
                language: "en".to_string()
            })
        );
        assert_eq!(NativeValue::from_json(&json!([1])), None);
        assert_eq!(NativeValue::Double(f64::INFINITY).to_json(), json!("INF"));
    }
}
