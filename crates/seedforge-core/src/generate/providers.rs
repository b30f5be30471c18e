//! Value Generator: dispatch by normalized type, consulting
//! constraints. All composite/typed results are serialized to a string
//! form; the authoritative type hint travels separately in
//! `Record::meta` (Row Builder's job, not this module's).

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveTime, Utc};
use rand::Rng;

use crate::generate::value::{borrowed, owned, Value};
use crate::schema::types::{Constraints, NormalizedType, TypeClass};

const DEFAULT_TEXT_LENGTH: usize = 255;
const TEN_YEARS_DAYS: i64 = 365 * 10;

/// Entry point for a non-JSON, non-name-matched column: called by the row
/// builder after the name matcher declines and `is_json` is false.
pub fn generate_value(normalized: &NormalizedType, constraints: &Constraints, rng: &mut impl Rng) -> Value {
    match normalized.stripped.as_str() {
        "timestamptz" | "timestamp with time zone" => return datetime_with_offset(rng),
        "time" | "time without time zone" => return time_value(rng),
        "year" => return year_value(rng),
        "interval" => return interval_value(rng),
        "hstore" => return hstore_value(rng),
        "bytea" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary" | "varbinary" => {
            return binary_value(constraints, rng)
        }
        "inet" => return network_ip_value(rng),
        "cidr" => return network_cidr_value(rng),
        "macaddr" | "macaddr8" => return mac_address_value(rng),
        "point" => return point_value(rng),
        _ => {}
    }

    if normalized.is_array {
        return array_value(normalized, constraints, rng);
    }

    match normalized.class {
        TypeClass::Int => integer_value(constraints, rng),
        TypeClass::Uint => uint_value(constraints, rng),
        TypeClass::Float => float_value(constraints, rng),
        TypeClass::Bool => Value::Bool(rng.random_bool(0.5)),
        TypeClass::Date => date_value(rng),
        TypeClass::DateTime => datetime_value(rng),
        TypeClass::Uuid => uuid_value(rng),
        TypeClass::Json => generate_json_value(rng),
        TypeClass::Array => array_value(normalized, constraints, rng),
        TypeClass::Text => text_value(constraints, rng),
    }
}

/// Called directly by the Row Builder when `is_json` is set, bypassing the
/// raw-type dispatch above: JSON is generated regardless of raw type.
pub fn generate_json_value(rng: &mut impl Rng) -> Value {
    let payload = serde_json::json!({
        "id": rng.random_range(1..100_000),
        "name": format!("item-{}", rng.random_range(1..10_000)),
        "email": format!("user{}@example.com", rng.random_range(1..10_000)),
        "active": rng.random_bool(0.5),
    });
    owned(payload.to_string())
}

fn integer_value(constraints: &Constraints, rng: &mut impl Rng) -> Value {
    let (mut min, mut max) = (1i64, 1_000_000i64);
    if let Some(v) = constraints.check_min() {
        min = v as i64;
    }
    if let Some(v) = constraints.check_max() {
        max = v as i64;
    }
    if min > max {
        std::mem::swap(&mut min, &mut max);
    }
    Value::Int(rng.random_range(min..=max))
}

fn uint_value(constraints: &Constraints, rng: &mut impl Rng) -> Value {
    let (mut min, mut max) = (0i64, 1_000_000i64);
    if let Some(v) = constraints.check_min() {
        if v >= 0.0 {
            min = v as i64;
        }
    }
    if let Some(v) = constraints.check_max() {
        if v >= 0.0 {
            max = v as i64;
        }
    }
    if min > max {
        std::mem::swap(&mut min, &mut max);
    }
    Value::Int(rng.random_range(min..=max))
}

fn float_value(constraints: &Constraints, rng: &mut impl Rng) -> Value {
    let (mut min, mut max) = (0.0f64, 1000.0f64);
    let mut scale = 2u32;

    let (precision, cscale) = constraints.precision_scale();
    if let Some(s) = cscale {
        scale = s.max(0) as u32;
    }
    if let (Some(p), Some(s)) = (precision, cscale) {
        let bound = 10f64.powi((p - s) as i32) - 10f64.powi(-(s as i32));
        min = -bound;
        max = bound;
    }
    if let Some(v) = constraints.check_min() {
        min = v;
    }
    if let Some(v) = constraints.check_max() {
        max = v;
    }
    if min > max {
        std::mem::swap(&mut min, &mut max);
    }

    let raw: f64 = rng.random_range(min..=max);
    let factor = 10f64.powi(scale as i32);
    Value::Float((raw * factor).round() / factor)
}

fn window_start() -> NaiveDate {
    Utc::now().date_naive() - ChronoDuration::days(TEN_YEARS_DAYS)
}

fn date_value(rng: &mut impl Rng) -> Value {
    let start = window_start();
    let span = (Utc::now().date_naive() - start).num_days().max(1);
    let offset = rng.random_range(0..=span);
    let d = start + ChronoDuration::days(offset);
    owned(d.format("%Y-%m-%d").to_string())
}

fn datetime_value(rng: &mut impl Rng) -> Value {
    let start = window_start();
    let span = (Utc::now().date_naive() - start).num_days().max(1);
    let offset = rng.random_range(0..=span);
    let d = start + ChronoDuration::days(offset);
    let h = rng.random_range(0..24);
    let m = rng.random_range(0..60);
    let s = rng.random_range(0..60);
    let t = NaiveTime::from_hms_opt(h, m, s).unwrap_or_default();
    owned(format!("{} {}", d.format("%Y-%m-%d"), t.format("%H:%M:%S")))
}

fn datetime_with_offset(rng: &mut impl Rng) -> Value {
    let base = datetime_value(rng);
    let offset_hours = rng.random_range(-12..=12);
    let sign = if offset_hours >= 0 { "+" } else { "-" };
    owned(format!("{}{}{:02}:00", base, sign, offset_hours.abs()))
}

fn time_value(rng: &mut impl Rng) -> Value {
    let h = rng.random_range(0..24);
    let m = rng.random_range(0..60);
    let s = rng.random_range(0..60);
    let t = NaiveTime::from_hms_opt(h, m, s).unwrap_or_default();
    owned(t.format("%H:%M:%S").to_string())
}

fn year_value(rng: &mut impl Rng) -> Value {
    let current = Utc::now().date_naive().format("%Y").to_string().parse::<i64>().unwrap_or(2026);
    Value::Int(rng.random_range(1970..=current))
}

fn interval_value(rng: &mut impl Rng) -> Value {
    const UNITS: &[&str] = &["seconds", "minutes", "hours", "days", "weeks", "months", "years"];
    let n = rng.random_range(1..=30);
    let unit = UNITS[rng.random_range(0..UNITS.len())];
    owned(format!("{} {}", n, unit))
}

fn uuid_value(rng: &mut impl Rng) -> Value {
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);
    let uuid = uuid::Builder::from_random_bytes(bytes).into_uuid();
    owned(uuid.to_string())
}

fn hstore_value(rng: &mut impl Rng) -> Value {
    let n = rng.random_range(1..=3);
    let pairs: Vec<String> = (0..n)
        .map(|i| format!("\"k{}\"=>\"v{}\"", i, rng.random_range(0..1000)))
        .collect();
    owned(pairs.join(","))
}

fn binary_value(constraints: &Constraints, rng: &mut impl Rng) -> Value {
    let len = constraints.length().unwrap_or(16).min(256);
    let bytes: Vec<u8> = (0..len).map(|_| rng.random::<u8>()).collect();
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    owned(format!("0x{}", hex))
}

fn array_value(normalized: &NormalizedType, constraints: &Constraints, rng: &mut impl Rng) -> Value {
    let element_type = crate::schema::types::normalize_type(&normalized.stripped);
    let n = rng.random_range(1..=5);
    let elements: Vec<String> = (0..n)
        .map(|_| generate_value(&element_type, constraints, rng).to_boundary_string())
        .collect();
    owned(format!("{{{}}}", elements.join(",")))
}

fn network_ip_value(rng: &mut impl Rng) -> Value {
    if rng.random_bool(0.8) {
        owned(format!(
            "{}.{}.{}.{}",
            rng.random_range(1..255),
            rng.random_range(0..255),
            rng.random_range(0..255),
            rng.random_range(1..255)
        ))
    } else {
        let segments: Vec<String> = (0..8).map(|_| format!("{:x}", rng.random_range(0..0xFFFFu32))).collect();
        owned(segments.join(":"))
    }
}

fn network_cidr_value(rng: &mut impl Rng) -> Value {
    let ip = network_ip_value(rng).to_boundary_string();
    let prefix = rng.random_range(8..32);
    owned(format!("{}/{}", ip, prefix))
}

fn mac_address_value(rng: &mut impl Rng) -> Value {
    let bytes: Vec<String> = (0..6).map(|_| format!("{:02x}", rng.random::<u8>())).collect();
    owned(bytes.join(":"))
}

fn point_value(rng: &mut impl Rng) -> Value {
    let x: f64 = rng.random_range(-180.0..180.0);
    let y: f64 = rng.random_range(-90.0..90.0);
    owned(format!("point({:.6},{:.6})", x, y))
}

fn text_value(constraints: &Constraints, rng: &mut impl Rng) -> Value {
    if let Some(values) = constraints.check_values() {
        if !values.is_empty() {
            return owned(values[rng.random_range(0..values.len())].clone());
        }
    }

    let max_len = constraints.length().unwrap_or(DEFAULT_TEXT_LENGTH).max(1);
    let text = if max_len <= 10 {
        random_letters(rng, max_len.min(10))
    } else if max_len <= 60 {
        short_sentence(rng)
    } else {
        long_sentence(rng)
    };

    if text.chars().count() > max_len {
        owned(text.chars().take(max_len).collect())
    } else {
        owned(text)
    }
}

fn random_letters(rng: &mut impl Rng, len: usize) -> String {
    const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
    (0..len).map(|_| LETTERS[rng.random_range(0..LETTERS.len())] as char).collect()
}

fn short_sentence(rng: &mut impl Rng) -> String {
    use fake::faker::lorem::en::Sentence;
    use fake::Fake;
    Sentence(3..8).fake_with_rng(rng)
}

fn long_sentence(rng: &mut impl Rng) -> String {
    use fake::faker::lorem::en::Sentences;
    use fake::Fake;
    let sentences: Vec<String> = Sentences(2..4).fake_with_rng(rng);
    sentences.join(" ")
}

#[allow(dead_code)]
fn static_pick(options: &'static [&'static str], rng: &mut impl Rng) -> Value {
    borrowed(options[rng.random_range(0..options.len())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{normalize_type, ConstraintValue};
    use rand::SeedableRng;

    fn rng() -> rand::rngs::StdRng {
        rand::rngs::StdRng::seed_from_u64(42)
    }

    #[test]
    fn integer_defaults_to_one_to_million() {
        let mut r = rng();
        let c = Constraints::default();
        for _ in 0..50 {
            if let Value::Int(i) = generate_value(&normalize_type("integer"), &c, &mut r) {
                assert!((1..=1_000_000).contains(&i));
            }
        }
    }

    #[test]
    fn integer_clamps_to_check_bounds() {
        let mut r = rng();
        let mut c = Constraints::default();
        c.0.insert("check_min".into(), ConstraintValue::Int(5));
        c.0.insert("check_max".into(), ConstraintValue::Int(10));
        for _ in 0..50 {
            if let Value::Int(i) = generate_value(&normalize_type("integer"), &c, &mut r) {
                assert!((5..=10).contains(&i));
            }
        }
    }

    #[test]
    fn swapped_bounds_are_corrected() {
        let mut r = rng();
        let mut c = Constraints::default();
        c.0.insert("check_min".into(), ConstraintValue::Int(100));
        c.0.insert("check_max".into(), ConstraintValue::Int(10));
        if let Value::Int(i) = generate_value(&normalize_type("integer"), &c, &mut r) {
            assert!((10..=100).contains(&i));
        }
    }

    #[test]
    fn uint_ignores_negative_bounds() {
        let mut r = rng();
        let mut c = Constraints::default();
        c.0.insert("check_min".into(), ConstraintValue::Int(-50));
        if let Value::Int(i) = generate_value(&normalize_type("oid"), &c, &mut r) {
            assert!(i >= 0);
        }
    }

    #[test]
    fn float_rounds_to_scale() {
        let mut r = rng();
        let mut c = Constraints::default();
        c.0.insert("precision".into(), ConstraintValue::Int(5));
        c.0.insert("scale".into(), ConstraintValue::Int(2));
        c.0.insert("check_min".into(), ConstraintValue::Float(0.0));
        c.0.insert("check_max".into(), ConstraintValue::Float(99.99));
        for _ in 0..50 {
            if let Value::Float(f) = generate_value(&normalize_type("numeric(5,2)"), &c, &mut r) {
                assert!((0.0..=99.99).contains(&f));
                let scaled = (f * 100.0).round();
                assert!((scaled - (f * 100.0)).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn enum_text_picks_from_check_values() {
        let mut r = rng();
        let mut c = Constraints::default();
        c.0.insert(
            "check_values".into(),
            ConstraintValue::StringList(vec!["open".into(), "closed".into()]),
        );
        for _ in 0..20 {
            if let Value::String(s) = generate_value(&normalize_type("text"), &c, &mut r) {
                assert!(s == "open" || s == "closed");
            }
        }
    }

    #[test]
    fn uuid_is_canonical_length() {
        let mut r = rng();
        let c = Constraints::default();
        if let Value::String(s) = generate_value(&normalize_type("uuid"), &c, &mut r) {
            assert_eq!(s.len(), 36);
        }
    }

    #[test]
    fn array_serializes_as_brace_list() {
        let mut r = rng();
        let c = Constraints::default();
        if let Value::String(s) = generate_value(&normalize_type("integer[]"), &c, &mut r) {
            assert!(s.starts_with('{') && s.ends_with('}'));
        }
    }

    #[test]
    fn binary_caps_at_256_bytes() {
        let mut r = rng();
        let mut c = Constraints::default();
        c.0.insert("length".into(), ConstraintValue::Int(9999));
        if let Value::String(s) = generate_value(&normalize_type("bytea"), &c, &mut r) {
            // "0x" + 2 hex chars per byte, capped at 256 bytes.
            assert!(s.len() <= 2 + 256 * 2);
        }
    }
}
