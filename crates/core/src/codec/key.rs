//! Order-preserving key encoding.
//!
//! Every key attribute is stored as a string whose byte order matches the
//! logical order of its components:
//!
//! - integers: 20-digit zero-padded decimal, signed values offset by 2^63
//! - timestamps: RFC3339 UTC with nine fractional digits
//! - floats: sign-adjusted IEEE-754 bits as 16 hex digits
//! - enums: canonical label
//! - composites: each component followed by the terminator character

use chrono::{DateTime, Datelike, SecondsFormat, Utc};

use super::{CodecError, Record, Value};
use crate::schema::{ComponentEncoding, KeyAttribute};

/// Default component terminator (ASCII unit separator).
pub const DEFAULT_TERMINATOR: char = '\u{1f}';

const INTEGER_WIDTH: usize = 20;
const SIGNED_OFFSET: i128 = 1 << 63;
const FLOAT_SIGN: u64 = 1 << 63;

/// Key codec configuration, passed explicitly to every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    terminator: char,
}

impl Default for Codec {
    fn default() -> Self {
        Self {
            terminator: DEFAULT_TERMINATOR,
        }
    }
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different composite terminator. It must be a control character
    /// below the space character so that it sorts before printable text.
    pub fn with_terminator(terminator: char) -> Result<Self, CodecError> {
        if terminator == '\0' || terminator >= ' ' {
            return Err(CodecError::encoding(
                "<codec>",
                format!("terminator {terminator:?} must be a control character in 0x01..0x1f"),
            ));
        }
        Ok(Self { terminator })
    }

    pub fn terminator(&self) -> char {
        self.terminator
    }

    /// The character sorting immediately after the terminator.
    pub(crate) fn terminator_successor(&self) -> char {
        // The terminator is at most 0x1f, so the successor is always valid.
        char::from_u32(self.terminator as u32 + 1).unwrap_or(' ')
    }

    /// Encode a full key attribute from the values held by `record`.
    pub fn encode_key(&self, key: &KeyAttribute, record: &Record) -> Result<String, CodecError> {
        let values = key
            .components
            .iter()
            .map(|c| {
                record
                    .get(&c.field)
                    .ok_or_else(|| CodecError::encoding(&c.field, "missing key component"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.encode_key_values(key, &values)
    }

    /// Encode a full key attribute from component values given in order.
    pub fn encode_key_values(
        &self,
        key: &KeyAttribute,
        values: &[&Value],
    ) -> Result<String, CodecError> {
        if values.len() != key.components.len() {
            return Err(CodecError::encoding(
                &key.name,
                format!(
                    "expected {} key components, got {}",
                    key.components.len(),
                    values.len()
                ),
            ));
        }

        if !key.composite {
            let component = &key.components[0];
            let encoded =
                self.encode_component(&component.field, &component.encoding, values[0], false)?;
            if encoded.is_empty() {
                return Err(CodecError::encoding(&component.field, "key values cannot be empty"));
            }
            return Ok(encoded);
        }

        self.encode_key_prefix(key, values)
    }

    /// Encode the leading `values.len()` components of a composite key, each
    /// followed by the terminator.
    pub fn encode_key_prefix(
        &self,
        key: &KeyAttribute,
        values: &[&Value],
    ) -> Result<String, CodecError> {
        let mut encoded = String::new();
        for (component, value) in key.components.iter().zip(values) {
            encoded.push_str(&self.encode_component(
                &component.field,
                &component.encoding,
                value,
                true,
            )?);
            encoded.push(self.terminator);
        }
        Ok(encoded)
    }

    /// Decode a stored key attribute back into its component values.
    pub fn decode_key(
        &self,
        key: &KeyAttribute,
        raw: &str,
    ) -> Result<Vec<(String, Value)>, CodecError> {
        if !key.composite {
            let component = &key.components[0];
            let value = self.decode_component(&component.field, &component.encoding, raw)?;
            return Ok(vec![(component.field.clone(), value)]);
        }

        let body = raw.strip_suffix(self.terminator).ok_or_else(|| {
            CodecError::decoding(&key.name, "composite key is missing its terminator")
        })?;
        let parts: Vec<&str> = body.split(self.terminator).collect();
        if parts.len() != key.components.len() {
            return Err(CodecError::decoding(
                &key.name,
                format!(
                    "expected {} components, found {}",
                    key.components.len(),
                    parts.len()
                ),
            ));
        }

        key.components
            .iter()
            .zip(parts)
            .map(|(component, part)| {
                self.decode_component(&component.field, &component.encoding, part)
                    .map(|value| (component.field.clone(), value))
            })
            .collect()
    }

    /// Encode one component value.
    ///
    /// Strings inside composites may not contain characters at or below the
    /// terminator.
    pub fn encode_component(
        &self,
        field: &str,
        encoding: &ComponentEncoding,
        value: &Value,
        in_composite: bool,
    ) -> Result<String, CodecError> {
        let mismatch = |expected: &str| {
            CodecError::encoding(
                field,
                format!("expected {expected}, found {}", value.type_name()),
            )
        };

        match (encoding, value) {
            (ComponentEncoding::RawString, Value::String(s)) => {
                if in_composite && s.chars().any(|c| c <= self.terminator) {
                    return Err(CodecError::encoding(
                        field,
                        "control characters are not allowed in composite key components",
                    ));
                }
                Ok(s.clone())
            }
            (ComponentEncoding::RawString, _) => Err(mismatch("string")),

            (ComponentEncoding::ZeroPaddedInteger { signed }, Value::Integer(n)) => {
                encode_integer(field, *n, *signed)
            }
            (ComponentEncoding::ZeroPaddedInteger { .. }, _) => Err(mismatch("integer")),

            (ComponentEncoding::OrderedFloat, Value::Float(n)) => encode_float(field, *n),
            (ComponentEncoding::OrderedFloat, _) => Err(mismatch("float")),

            (ComponentEncoding::Boolean, Value::Boolean(b)) => {
                Ok(if *b { "1" } else { "0" }.to_string())
            }
            (ComponentEncoding::Boolean, _) => Err(mismatch("boolean")),

            (ComponentEncoding::Rfc3339Timestamp, Value::Timestamp(ts)) => {
                encode_timestamp(field, ts)
            }
            (ComponentEncoding::Rfc3339Timestamp, _) => Err(mismatch("timestamp")),

            (ComponentEncoding::HexBytes, Value::Bytes(bytes)) => Ok(encode_hex(bytes)),
            (ComponentEncoding::HexBytes, _) => Err(mismatch("bytes")),

            (ComponentEncoding::EnumLabel { labels }, Value::Enum(label))
            | (ComponentEncoding::EnumLabel { labels }, Value::String(label)) => {
                if labels.contains(label) {
                    Ok(label.clone())
                } else {
                    Err(CodecError::encoding(
                        field,
                        format!("unknown enum label '{label}'"),
                    ))
                }
            }
            (ComponentEncoding::EnumLabel { .. }, _) => Err(mismatch("enum")),
        }
    }

    /// Decode one component value.
    pub fn decode_component(
        &self,
        field: &str,
        encoding: &ComponentEncoding,
        raw: &str,
    ) -> Result<Value, CodecError> {
        match encoding {
            ComponentEncoding::RawString => Ok(Value::String(raw.to_string())),
            ComponentEncoding::ZeroPaddedInteger { signed } => decode_integer(field, raw, *signed),
            ComponentEncoding::OrderedFloat => decode_float(field, raw),
            ComponentEncoding::Boolean => match raw {
                "0" => Ok(Value::Boolean(false)),
                "1" => Ok(Value::Boolean(true)),
                _ => Err(CodecError::decoding(field, format!("invalid boolean '{raw}'"))),
            },
            ComponentEncoding::Rfc3339Timestamp => DateTime::parse_from_rfc3339(raw)
                .map(|dt| Value::Timestamp(dt.with_timezone(&Utc)))
                .map_err(|e| CodecError::decoding(field, format!("invalid timestamp: {e}"))),
            ComponentEncoding::HexBytes => decode_hex(field, raw).map(Value::Bytes),
            ComponentEncoding::EnumLabel { labels } => {
                if labels.iter().any(|l| l == raw) {
                    Ok(Value::Enum(raw.to_string()))
                } else {
                    Err(CodecError::decoding(
                        field,
                        format!("unknown enum label '{raw}'"),
                    ))
                }
            }
        }
    }
}

fn encode_integer(field: &str, n: i64, signed: bool) -> Result<String, CodecError> {
    if signed {
        let shifted = (i128::from(n) + SIGNED_OFFSET) as u64;
        Ok(format!("{shifted:0width$}", width = INTEGER_WIDTH))
    } else if n < 0 {
        Err(CodecError::encoding(
            field,
            format!("negative value {n} in unsigned key"),
        ))
    } else {
        Ok(format!("{n:0width$}", width = INTEGER_WIDTH))
    }
}

fn decode_integer(field: &str, raw: &str, signed: bool) -> Result<Value, CodecError> {
    if raw.len() != INTEGER_WIDTH || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::decoding(
            field,
            format!("invalid fixed-width integer '{raw}'"),
        ));
    }
    let parsed: u64 = raw
        .parse()
        .map_err(|e| CodecError::decoding(field, format!("integer out of range: {e}")))?;

    if signed {
        Ok(Value::Integer((i128::from(parsed) - SIGNED_OFFSET) as i64))
    } else {
        i64::try_from(parsed)
            .map(Value::Integer)
            .map_err(|_| CodecError::decoding(field, format!("integer {parsed} out of range")))
    }
}

fn encode_float(field: &str, n: f64) -> Result<String, CodecError> {
    if n.is_nan() {
        return Err(CodecError::encoding(field, "NaN cannot be used in a key"));
    }
    // -0.0 == 0.0, so both must address the same item.
    let n = if n == 0.0 { 0.0 } else { n };
    let bits = n.to_bits();
    let ordered = if bits & FLOAT_SIGN != 0 {
        !bits
    } else {
        bits | FLOAT_SIGN
    };
    Ok(format!("{ordered:016x}"))
}

fn decode_float(field: &str, raw: &str) -> Result<Value, CodecError> {
    if raw.len() != 16 {
        return Err(CodecError::decoding(field, format!("invalid float key '{raw}'")));
    }
    let ordered = u64::from_str_radix(raw, 16)
        .map_err(|e| CodecError::decoding(field, format!("invalid float key: {e}")))?;
    let bits = if ordered & FLOAT_SIGN != 0 {
        ordered & !FLOAT_SIGN
    } else {
        !ordered
    };
    Ok(Value::Float(f64::from_bits(bits)))
}

/// RFC3339 with a fixed fractional width. Years outside 0000-9999 would
/// change the string width and break ordering.
pub(crate) fn encode_timestamp(field: &str, ts: &DateTime<Utc>) -> Result<String, CodecError> {
    if !(0..=9999).contains(&ts.year()) {
        return Err(CodecError::encoding(
            field,
            format!("year {} is outside 0000-9999", ts.year()),
        ));
    }
    Ok(ts.to_rfc3339_opts(SecondsFormat::Nanos, true))
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn decode_hex(field: &str, raw: &str) -> Result<Vec<u8>, CodecError> {
    if raw.len() % 2 != 0 {
        return Err(CodecError::decoding(field, "odd-length hex key"));
    }
    (0..raw.len())
        .step_by(2)
        .map(|i| {
            raw.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| CodecError::decoding(field, format!("invalid hex key '{raw}'")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::KeyComponent;
    use chrono::TimeZone;

    fn single(field: &str, encoding: ComponentEncoding) -> KeyAttribute {
        KeyAttribute {
            name: field.to_string(),
            components: vec![KeyComponent {
                field: field.to_string(),
                encoding,
            }],
            composite: false,
        }
    }

    fn status_version() -> KeyAttribute {
        KeyAttribute {
            name: "status_version".to_string(),
            components: vec![
                KeyComponent {
                    field: "status".to_string(),
                    encoding: ComponentEncoding::RawString,
                },
                KeyComponent {
                    field: "version".to_string(),
                    encoding: ComponentEncoding::ZeroPaddedInteger { signed: true },
                },
            ],
            composite: true,
        }
    }

    fn encode_int(n: i64, signed: bool) -> String {
        Codec::new()
            .encode_component(
                "n",
                &ComponentEncoding::ZeroPaddedInteger { signed },
                &Value::Integer(n),
                false,
            )
            .unwrap()
    }

    #[test]
    fn test_unsigned_integer_is_zero_padded() {
        assert_eq!(encode_int(2, false), "00000000000000000002");
        assert_eq!(encode_int(i64::MAX, false), "09223372036854775807");
    }

    #[test]
    fn test_unsigned_integer_rejects_negative() {
        let err = Codec::new()
            .encode_component(
                "version",
                &ComponentEncoding::ZeroPaddedInteger { signed: false },
                &Value::Integer(-1),
                false,
            )
            .unwrap_err();
        assert!(matches!(err, CodecError::Encoding { .. }));
    }

    #[test]
    fn test_signed_integer_order_matches_numeric_order() {
        let values = [i64::MIN, -1_000, -1, 0, 1, 42, 1_000, i64::MAX];
        let encoded: Vec<String> = values.iter().map(|n| encode_int(*n, true)).collect();

        let mut sorted = encoded.clone();
        sorted.sort();
        assert_eq!(encoded, sorted);
        assert!(encoded.iter().all(|e| e.len() == INTEGER_WIDTH));
    }

    #[test]
    fn test_signed_integer_round_trip() {
        let codec = Codec::new();
        let encoding = ComponentEncoding::ZeroPaddedInteger { signed: true };
        for n in [i64::MIN, -7, 0, 7, i64::MAX] {
            let encoded = encode_int(n, true);
            assert_eq!(
                codec.decode_component("n", &encoding, &encoded).unwrap(),
                Value::Integer(n)
            );
        }
    }

    #[test]
    fn test_timestamp_fixed_width_and_order() {
        let codec = Codec::new();
        let early = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let late = early + chrono::Duration::nanoseconds(1);

        let a = codec
            .encode_component(
                "ts",
                &ComponentEncoding::Rfc3339Timestamp,
                &Value::Timestamp(early),
                false,
            )
            .unwrap();
        let b = codec
            .encode_component(
                "ts",
                &ComponentEncoding::Rfc3339Timestamp,
                &Value::Timestamp(late),
                false,
            )
            .unwrap();

        assert_eq!(a, "2024-01-15T10:30:00.000000000Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(
            codec
                .decode_component("ts", &ComponentEncoding::Rfc3339Timestamp, &b)
                .unwrap(),
            Value::Timestamp(late)
        );
    }

    #[test]
    fn test_float_order_and_round_trip() {
        let codec = Codec::new();
        let values = [f64::NEG_INFINITY, -10.5, -0.25, 0.0, 0.25, 3.0, 1e300];
        let encoded: Vec<String> = values
            .iter()
            .map(|v| {
                codec
                    .encode_component("f", &ComponentEncoding::OrderedFloat, &Value::Float(*v), false)
                    .unwrap()
            })
            .collect();

        let mut sorted = encoded.clone();
        sorted.sort();
        assert_eq!(encoded, sorted);

        for (value, raw) in values.iter().zip(&encoded) {
            assert_eq!(
                codec
                    .decode_component("f", &ComponentEncoding::OrderedFloat, raw)
                    .unwrap(),
                Value::Float(*value)
            );
        }
    }

    #[test]
    fn test_negative_zero_encodes_as_zero() {
        let codec = Codec::new();
        let encode = |v: f64| {
            codec
                .encode_component("f", &ComponentEncoding::OrderedFloat, &Value::Float(v), false)
                .unwrap()
        };

        assert_eq!(encode(-0.0), encode(0.0));
        assert!(encode(-f64::MIN_POSITIVE) < encode(-0.0));
        assert!(encode(-0.0) < encode(f64::MIN_POSITIVE));
    }

    #[test]
    fn test_float_rejects_nan() {
        let result = Codec::new().encode_component(
            "f",
            &ComponentEncoding::OrderedFloat,
            &Value::Float(f64::NAN),
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_enum_encodes_label() {
        let codec = Codec::new();
        let encoding = ComponentEncoding::EnumLabel {
            labels: vec!["active".to_string(), "retired".to_string()],
        };
        assert_eq!(
            codec
                .encode_component("status", &encoding, &Value::Enum("retired".to_string()), false)
                .unwrap(),
            "retired"
        );
        assert!(codec
            .encode_component("status", &encoding, &Value::Enum("lost".to_string()), false)
            .is_err());
        assert!(codec.decode_component("status", &encoding, "lost").is_err());
    }

    #[test]
    fn test_bytes_hex_round_trip() {
        let codec = Codec::new();
        let raw = codec
            .encode_component(
                "b",
                &ComponentEncoding::HexBytes,
                &Value::Bytes(vec![0x00, 0xab, 0xff]),
                false,
            )
            .unwrap();
        assert_eq!(raw, "00abff");
        assert_eq!(
            codec
                .decode_component("b", &ComponentEncoding::HexBytes, &raw)
                .unwrap(),
            Value::Bytes(vec![0x00, 0xab, 0xff])
        );
        assert!(codec
            .decode_component("b", &ComponentEncoding::HexBytes, "abc")
            .is_err());
    }

    #[test]
    fn test_type_mismatch_is_encoding_error() {
        let err = Codec::new()
            .encode_component("n", &ComponentEncoding::Boolean, &Value::from("yes"), false)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot encode field 'n': expected boolean, found string"
        );
    }

    #[test]
    fn test_single_key_rejects_empty_string() {
        let key = single("name", ComponentEncoding::RawString);
        let record = Record::new().with("name", "");
        assert!(Codec::new().encode_key(&key, &record).is_err());
    }

    #[test]
    fn test_composite_key_encoding() {
        let codec = Codec::new();
        let record = Record::new().with("status", "active").with("version", 2i64);
        let encoded = codec.encode_key(&status_version(), &record).unwrap();
        assert_eq!(encoded, "active\u{1f}09223372036854775810\u{1f}");

        let decoded = codec.decode_key(&status_version(), &encoded).unwrap();
        assert_eq!(
            decoded,
            vec![
                ("status".to_string(), Value::from("active")),
                ("version".to_string(), Value::Integer(2)),
            ]
        );
    }

    #[test]
    fn test_composite_order_is_component_then_value() {
        let codec = Codec::new();
        let key = status_version();
        let encode = |status: &str, version: i64| {
            codec
                .encode_key(
                    &key,
                    &Record::new().with("status", status).with("version", version),
                )
                .unwrap()
        };

        let ordered = vec![
            encode("a", 5),
            encode("a", 10),
            encode("ab", -3),
            encode("b", -100),
        ];
        let mut sorted = ordered.clone();
        sorted.sort();
        assert_eq!(ordered, sorted);
    }

    #[test]
    fn test_composite_rejects_control_characters() {
        let record = Record::new().with("status", "a\u{1f}b").with("version", 1i64);
        let err = Codec::new()
            .encode_key(&status_version(), &record)
            .unwrap_err();
        assert!(matches!(err, CodecError::Encoding { field, .. } if field == "status"));
    }

    #[test]
    fn test_composite_missing_component() {
        let record = Record::new().with("status", "a");
        let err = Codec::new()
            .encode_key(&status_version(), &record)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot encode field 'version': missing key component"
        );
    }

    #[test]
    fn test_composite_decode_rejects_wrong_arity() {
        let codec = Codec::new();
        assert!(codec.decode_key(&status_version(), "a\u{1f}").is_err());
        assert!(codec
            .decode_key(&status_version(), "a\u{1f}09223372036854775810")
            .is_err());
    }

    #[test]
    fn test_custom_terminator_validation() {
        assert!(Codec::with_terminator('\u{1e}').is_ok());
        assert!(Codec::with_terminator('#').is_err());
        assert!(Codec::with_terminator('\0').is_err());
    }
}
