//! The XML Schema primitive catalogue and its lexical mappings.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone};
use log::warn;

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    NormalizedString,
    Token,
    Language,
    Name,
    NcName,
    NmToken,
    NmTokens,
    Id,
    IdRef,
    IdRefs,
    Entity,
    Entities,
    AnyUri,
    QName,
    Notation,
    Boolean,
    Float,
    Double,
    Decimal,
    Integer,
    NonPositiveInteger,
    NegativeInteger,
    Long,
    Int,
    Short,
    Byte,
    NonNegativeInteger,
    PositiveInteger,
    UnsignedLong,
    UnsignedInt,
    UnsignedShort,
    UnsignedByte,
    DateTime,
    Date,
    Time,
    Duration,
    GYearMonth,
    GYear,
    GMonthDay,
    GDay,
    GMonth,
    /// `timeInstant` of the 1999 schema generation.
    TimeInstant,
    HexBinary,
    Base64Binary,
}

const NAMES: &[(&str, Primitive)] = &[
    ("string", Primitive::String),
    ("normalizedString", Primitive::NormalizedString),
    ("token", Primitive::Token),
    ("language", Primitive::Language),
    ("Name", Primitive::Name),
    ("NCName", Primitive::NcName),
    ("NMTOKEN", Primitive::NmToken),
    ("NMTOKENS", Primitive::NmTokens),
    ("ID", Primitive::Id),
    ("IDREF", Primitive::IdRef),
    ("IDREFS", Primitive::IdRefs),
    ("ENTITY", Primitive::Entity),
    ("ENTITIES", Primitive::Entities),
    ("anyURI", Primitive::AnyUri),
    ("QName", Primitive::QName),
    ("NOTATION", Primitive::Notation),
    ("boolean", Primitive::Boolean),
    ("float", Primitive::Float),
    ("double", Primitive::Double),
    ("decimal", Primitive::Decimal),
    ("integer", Primitive::Integer),
    ("nonPositiveInteger", Primitive::NonPositiveInteger),
    ("negativeInteger", Primitive::NegativeInteger),
    ("long", Primitive::Long),
    ("int", Primitive::Int),
    ("short", Primitive::Short),
    ("byte", Primitive::Byte),
    ("nonNegativeInteger", Primitive::NonNegativeInteger),
    ("positiveInteger", Primitive::PositiveInteger),
    ("unsignedLong", Primitive::UnsignedLong),
    ("unsignedInt", Primitive::UnsignedInt),
    ("unsignedShort", Primitive::UnsignedShort),
    ("unsignedByte", Primitive::UnsignedByte),
    ("dateTime", Primitive::DateTime),
    ("date", Primitive::Date),
    ("time", Primitive::Time),
    ("duration", Primitive::Duration),
    ("gYearMonth", Primitive::GYearMonth),
    ("gYear", Primitive::GYear),
    ("gMonthDay", Primitive::GMonthDay),
    ("gDay", Primitive::GDay),
    ("gMonth", Primitive::GMonth),
    ("timeInstant", Primitive::TimeInstant),
    ("timeDuration", Primitive::Duration),
    ("hexBinary", Primitive::HexBinary),
    ("base64Binary", Primitive::Base64Binary),
];

const NAIVE_DATE_TIME: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE: &str = "%Y-%m-%d";

fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn collapse(text: &str) -> String {
    text.split(is_xml_space)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_float(text: &str) -> Option<f64> {
    match text {
        "INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ => text.parse().ok(),
    }
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        format!("{}INF", sign)
    } else {
        value.to_string()
    }
}

/// Optional sign followed by at least one digit.
fn is_integer_literal(text: &str) -> bool {
    let digits = text.strip_prefix(&['+', '-'][..]).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Integer text beyond the 64 bit range, kept verbatim (without a `+`).
fn is_wide_integer(text: &str) -> bool {
    is_integer_literal(text) && text.parse::<i64>().is_err() && text.parse::<u64>().is_err()
}

fn parse_integer(text: &str, unsigned: bool) -> Option<Value> {
    let signed = text.parse::<i64>().ok().map(Value::Int);
    let wide = || text.parse::<u64>().ok().map(Value::UInt);

    let value = if unsigned {
        wide().or(signed)
    } else {
        signed.or_else(wide)
    };

    value.or_else(|| {
        is_integer_literal(text).then(|| Value::String(text.trim_start_matches('+').to_owned()))
    })
}

/// A date with an optional `Z` or `±hh:mm` zone, which is ignored.
fn parse_date(text: &str) -> Option<NaiveDate> {
    let (date, zone) = match (text.get(..10), text.get(10..)) {
        (Some(date), Some(zone)) => (date, zone),
        _ => (text, ""),
    };

    let valid_zone = match zone {
        "" | "Z" => true,
        _ => zone
            .strip_prefix(&['+', '-'][..])
            .map_or(false, |offset| {
                offset.len() == 5 && NaiveTime::parse_from_str(offset, "%H:%M").is_ok()
            }),
    };

    if !valid_zone {
        return None;
    }
    NaiveDate::parse_from_str(date, DATE).ok()
}

fn parse_date_time(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant);
    }

    let naive = NaiveDateTime::parse_from_str(text, NAIVE_DATE_TIME).ok()?;
    FixedOffset::east_opt(0).map(|utc| utc.from_utc_datetime(&naive))
}

impl Primitive {
    /// Looks up a primitive by local name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        NAMES
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, primitive)| *primitive)
    }

    /// Canonical local name in the 2001 namespace.
    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|(_, primitive)| *primitive == self)
            .map_or("anyType", |(name, _)| name)
    }

    fn integer_bounds(self) -> Option<(i128, i128)> {
        Some(match self {
            Primitive::Integer => (i128::MIN, i128::MAX),
            Primitive::NonPositiveInteger => (i128::MIN, 0),
            Primitive::NegativeInteger => (i128::MIN, -1),
            Primitive::Long => (i64::MIN.into(), i64::MAX.into()),
            Primitive::Int => (i32::MIN.into(), i32::MAX.into()),
            Primitive::Short => (i16::MIN.into(), i16::MAX.into()),
            Primitive::Byte => (i8::MIN.into(), i8::MAX.into()),
            Primitive::NonNegativeInteger => (0, i128::MAX),
            Primitive::PositiveInteger => (1, i128::MAX),
            Primitive::UnsignedLong => (0, u64::MAX.into()),
            Primitive::UnsignedInt => (0, u32::MAX.into()),
            Primitive::UnsignedShort => (0, u16::MAX.into()),
            Primitive::UnsignedByte => (0, u8::MAX.into()),
            _ => return None,
        })
    }

    fn is_unsigned(self) -> bool {
        matches!(
            self,
            Primitive::NonNegativeInteger
                | Primitive::PositiveInteger
                | Primitive::UnsignedLong
                | Primitive::UnsignedInt
                | Primitive::UnsignedShort
                | Primitive::UnsignedByte
        )
    }

    /// Maps element text to a value; `None` when the text is not in the
    /// lexical space of the type.
    pub fn decode(self, text: &str) -> Option<Value> {
        let trimmed = text.trim_matches(is_xml_space);

        let value = match self {
            Primitive::String | Primitive::AnyUri | Primitive::QName | Primitive::Notation => {
                Value::String(text.to_owned())
            }

            Primitive::NormalizedString => Value::String(text.replace(is_xml_space, " ")),

            Primitive::Token
            | Primitive::Language
            | Primitive::Name
            | Primitive::NcName
            | Primitive::NmToken
            | Primitive::NmTokens
            | Primitive::Id
            | Primitive::IdRef
            | Primitive::IdRefs
            | Primitive::Entity
            | Primitive::Entities => Value::String(collapse(text)),

            Primitive::Boolean => match trimmed {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => return None,
            },

            Primitive::Float | Primitive::Double | Primitive::Decimal => {
                Value::Float(parse_float(trimmed)?)
            }

            Primitive::Integer
            | Primitive::NonPositiveInteger
            | Primitive::NegativeInteger
            | Primitive::Long
            | Primitive::Int
            | Primitive::Short
            | Primitive::Byte
            | Primitive::NonNegativeInteger
            | Primitive::PositiveInteger
            | Primitive::UnsignedLong
            | Primitive::UnsignedInt
            | Primitive::UnsignedShort
            | Primitive::UnsignedByte => parse_integer(trimmed, self.is_unsigned())?,

            Primitive::DateTime => Value::DateTime(parse_date_time(trimmed)?),

            Primitive::Date => Value::Date(parse_date(trimmed)?),

            Primitive::Time
            | Primitive::Duration
            | Primitive::GYearMonth
            | Primitive::GYear
            | Primitive::GMonthDay
            | Primitive::GDay
            | Primitive::GMonth
            | Primitive::TimeInstant => Value::String(trimmed.to_owned()),

            Primitive::HexBinary => Value::Bytes(hex::decode(trimmed).ok()?),

            Primitive::Base64Binary => {
                let compact: String = text.chars().filter(|c| !is_xml_space(*c)).collect();
                Value::Bytes(STANDARD.decode(compact).ok()?)
            }
        };

        Some(value)
    }

    /// Lexical form of `value` for this type; `None` when the value does not
    /// map onto the type. Integer width and sign are not enforced.
    pub fn encode(self, value: &Value) -> Option<String> {
        if let Some((min, max)) = self.integer_bounds() {
            let number = match value {
                Value::Int(number) => i128::from(*number),
                Value::UInt(number) => i128::from(*number),
                Value::String(text) if is_wide_integer(text) => {
                    return Some(text.trim_start_matches('+').to_owned())
                }
                _ => return None,
            };

            if !(min..=max).contains(&number) {
                warn!("{} is outside the value space of {}", number, self.name());
            }
            return Some(number.to_string());
        }

        match (self, value) {
            (Primitive::Boolean, Value::Bool(flag)) => Some(flag.to_string()),

            (Primitive::Float | Primitive::Double | Primitive::Decimal, Value::Float(number)) => {
                Some(format_float(*number))
            }
            (Primitive::Float | Primitive::Double | Primitive::Decimal, Value::Int(number)) => {
                Some(number.to_string())
            }
            (Primitive::Float | Primitive::Double | Primitive::Decimal, Value::UInt(number)) => {
                Some(number.to_string())
            }

            (Primitive::DateTime, Value::DateTime(instant)) => {
                Some(instant.to_rfc3339_opts(SecondsFormat::AutoSi, false))
            }
            (Primitive::Date, Value::Date(date)) => Some(date.format(DATE).to_string()),
            (Primitive::Date, Value::DateTime(instant)) => {
                Some(instant.date_naive().format(DATE).to_string())
            }

            (Primitive::HexBinary, Value::Bytes(bytes)) => Some(hex::encode_upper(bytes)),
            (Primitive::HexBinary, Value::String(text)) => Some(hex::encode_upper(text)),
            (Primitive::Base64Binary, Value::Bytes(bytes)) => Some(STANDARD.encode(bytes)),
            (Primitive::Base64Binary, Value::String(text)) => Some(STANDARD.encode(text)),

            (
                Primitive::Boolean
                | Primitive::Float
                | Primitive::Double
                | Primitive::Decimal
                | Primitive::DateTime
                | Primitive::Date
                | Primitive::HexBinary
                | Primitive::Base64Binary,
                _,
            ) => None,

            (_, Value::String(text)) => Some(text.clone()),

            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(name: &str, text: &str) -> Option<Value> {
        Primitive::from_name(name).unwrap().decode(text)
    }

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(Primitive::from_name("qname"), Some(Primitive::QName));
        assert_eq!(Primitive::from_name("NCNAME"), Some(Primitive::NcName));
        assert_eq!(Primitive::from_name("timeDuration"), Some(Primitive::Duration));
        assert_eq!(Primitive::from_name("Order"), None);
        assert_eq!(Primitive::Duration.name(), "duration");
    }

    #[test]
    fn normalizes_whitespace() {
        assert_eq!(
            decode("normalizedString", " Being a Dog Is \n a Full-Time Job"),
            Some(" Being a Dog Is   a Full-Time Job".into())
        );
        assert_eq!(
            decode("token", "  Being a Dog Is \n  a Full-Time Job"),
            Some("Being a Dog Is a Full-Time Job".into())
        );
        assert_eq!(decode("string", " a\nb "), Some(" a\nb ".into()));
    }

    #[test]
    fn decodes_booleans() {
        assert_eq!(decode("boolean", "true"), Some(Value::Bool(true)));
        assert_eq!(decode("boolean", "0"), Some(Value::Bool(false)));
        assert_eq!(decode("boolean", "yes"), None);
    }

    #[test]
    fn decodes_numbers_by_signedness() {
        assert_eq!(decode("long", "132323"), Some(Value::Int(132323)));
        assert_eq!(decode("unsignedInt", "4"), Some(Value::UInt(4)));
        assert_eq!(
            decode("integer", "18446744073709551615"),
            Some(Value::UInt(u64::MAX))
        );
        assert_eq!(decode("double", "23.22"), Some(Value::Float(23.22)));
        assert_eq!(decode("float", "-INF"), Some(Value::Float(f64::NEG_INFINITY)));
        assert_eq!(decode("int", "4.5"), None);
    }

    #[test]
    fn decodes_calendar_values() {
        let instant = decode("dateTime", "2019-01-25T08:31:00").unwrap();
        assert_eq!(
            instant,
            Value::DateTime(DateTime::parse_from_rfc3339("2019-01-25T08:31:00+00:00").unwrap())
        );

        assert_eq!(
            decode("date", "2019-01-25+01:00"),
            Some(Value::Date(NaiveDate::from_ymd_opt(2019, 1, 25).unwrap()))
        );
        assert_eq!(decode("gYear", "2019"), Some("2019".into()));
        assert_eq!(
            decode("timeInstant", "20190125T083100.001"),
            Some("20190125T083100.001".into())
        );
    }

    #[test]
    fn decodes_binary() {
        assert_eq!(
            decode("hexBinary", "6465636f646564"),
            Some(Value::Bytes(b"decoded".to_vec()))
        );
        assert_eq!(
            decode("base64Binary", " ZGVjb2Rl\nZA== "),
            Some(Value::Bytes(b"decoded".to_vec()))
        );
    }

    #[test]
    fn keeps_integers_wider_than_64_bits_as_text() {
        assert_eq!(
            decode("integer", "123456789012345678901234"),
            Some("123456789012345678901234".into())
        );
        assert_eq!(
            decode("nonPositiveInteger", "-123456789012345678901234"),
            Some("-123456789012345678901234".into())
        );
        assert_eq!(
            decode("positiveInteger", "+123456789012345678901234"),
            Some("123456789012345678901234".into())
        );
        assert_eq!(decode("integer", "12345678901234567890123x"), None);
        assert_eq!(decode("integer", "-"), None);

        assert_eq!(
            Primitive::Integer.encode(&"123456789012345678901234".into()),
            Some("123456789012345678901234".to_owned())
        );
    }

    #[test]
    fn rejects_dates_with_trailing_text() {
        let date = Some(Value::Date(NaiveDate::from_ymd_opt(2019, 1, 25).unwrap()));

        assert_eq!(decode("date", "2019-01-25"), date);
        assert_eq!(decode("date", "2019-01-25Z"), date);
        assert_eq!(decode("date", "2019-01-25-05:00"), date);
        assert_eq!(decode("date", "2019-01-25garbage"), None);
        assert_eq!(decode("date", "2019-01-25+0100"), None);
        assert_eq!(decode("date", "2019-01-25Z "), None);
    }

    #[test]
    fn encodes_integers_regardless_of_width() {
        assert_eq!(Primitive::Int.encode(&Value::Int(50)), Some("50".to_owned()));
        assert_eq!(
            Primitive::Int.encode(&Value::Int(1 << 40)),
            Some("1099511627776".to_owned())
        );
        assert_eq!(Primitive::Byte.encode(&Value::Int(300)), Some("300".to_owned()));
        assert_eq!(Primitive::UnsignedInt.encode(&Value::Int(-1)), Some("-1".to_owned()));
        assert_eq!(Primitive::Byte.decode("300"), Some(Value::Int(300)));
    }

    #[test]
    fn encodes_within_value_space() {
        assert_eq!(Primitive::Int.encode(&"50".into()), None);
        assert_eq!(Primitive::Integer.encode(&"-50".into()), None);
        assert_eq!(Primitive::Double.encode(&Value::Int(2)), Some("2".to_owned()));
        assert_eq!(
            Primitive::Double.encode(&Value::Float(f64::INFINITY)),
            Some("INF".to_owned())
        );
        assert_eq!(Primitive::Boolean.encode(&Value::Int(1)), None);
    }

    #[test]
    fn encodes_binary_and_calendar_values() {
        assert_eq!(
            Primitive::HexBinary.encode(&"decoded".into()),
            Some("6465636F646564".to_owned())
        );
        assert_eq!(
            Primitive::Base64Binary.encode(&Value::Bytes(b"decoded".to_vec())),
            Some("ZGVjb2RlZA==".to_owned())
        );

        let instant = DateTime::parse_from_rfc3339("2019-01-25T07:31:00Z").unwrap();
        assert_eq!(
            Primitive::DateTime.encode(&Value::DateTime(instant)),
            Some("2019-01-25T07:31:00+00:00".to_owned())
        );
        assert_eq!(
            Primitive::Date.encode(&Value::Date(NaiveDate::from_ymd_opt(2019, 1, 25).unwrap())),
            Some("2019-01-25".to_owned())
        );
    }
}
