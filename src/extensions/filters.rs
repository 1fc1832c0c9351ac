//! Built-in formatting filters.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use chrono_tz::Tz;
use tera::Value;

pub const DEFAULT_TIMESTAMP_FORMAT: &str = "Y-m-d H:i:s";

fn arg_str<'a>(args: &'a HashMap<String, Value>, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

fn to_number(value: &Value) -> tera::Result<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => {
            let cleaned = s.replace(',', "");
            let cleaned = cleaned.trim();
            if cleaned.is_empty() {
                return Ok(Some(0.0));
            }
            cleaned
                .parse::<f64>()
                .map(Some)
                .map_err(|_| tera::Error::msg(format!("`{s}` is not a number")))
        }
        other => Err(tera::Error::msg(format!("`{other}` is not a number"))),
    }
}

fn group_thousands(digits: &str, separator: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3 * separator.len());
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push_str(separator);
        }
        grouped.push(ch);
    }
    grouped
}

/// Largest number of decimals `number_format` emits.
pub const MAX_DECIMALS: usize = 15;

/// Rounds the shortest decimal representation of `value`, halves away from
/// zero, and returns the integer and fraction digits.
fn round_decimal(value: f64, decimals: usize) -> (String, String) {
    let repr = value.abs().to_string();
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(decimals))
        .collect();
    if frac_part.as_bytes().get(decimals).is_some_and(|digit| *digit >= b'5') {
        let mut carry = true;
        for digit in digits.iter_mut().rev() {
            if *digit == b'9' {
                *digit = b'0';
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, b'1');
        }
    }

    let split = digits.len() - decimals;
    let text = |bytes: &[u8]| bytes.iter().map(|&b| char::from(b)).collect::<String>();
    (text(&digits[..split]), text(&digits[split..]))
}

/// Formats a number with grouped thousands and a fixed number of decimals.
///
/// Rounding works on the shortest decimal form of the value, so `1.005`
/// becomes `1.01` with two decimals. Halves round away from zero and
/// `decimals` is capped at [`MAX_DECIMALS`].
pub fn number_format(value: f64, decimals: usize, decimal_point: &str, separator: &str) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let decimals = decimals.min(MAX_DECIMALS);
    let (int_part, frac_part) = round_decimal(value, decimals);
    let negative = value < 0.0 && int_part.bytes().chain(frac_part.bytes()).any(|b| b != b'0');

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&group_thousands(&int_part, separator));
    if !frac_part.is_empty() {
        out.push_str(decimal_point);
        out.push_str(&frac_part);
    }
    out
}

/// `formatNumber(decimals=0, decimal_point=".", separator=",")`
pub fn format_number(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let Some(number) = to_number(value)? else {
        return Ok(Value::String(String::new()));
    };

    let decimals = match args.get("decimals") {
        Some(v) => v
            .as_u64()
            .ok_or_else(|| tera::Error::msg("`decimals` must be a non-negative integer"))?
            as usize,
        None => 0,
    };
    let decimal_point = arg_str(args, "decimal_point").unwrap_or(".");
    let separator = arg_str(args, "separator").unwrap_or(",");

    Ok(Value::String(number_format(
        number,
        decimals,
        decimal_point,
        separator,
    )))
}

fn push_literal(fmt: &mut String, text: &str) {
    fmt.push_str(&text.replace('%', "%%"));
}

/// Translates `Y-m-d H:i:s` style format letters into a chrono format string.
fn chrono_format<T: TimeZone>(format: &str, moment: &DateTime<T>, zone_name: &str) -> String {
    let mut fmt = String::with_capacity(format.len() * 2);
    let mut chars = format.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(next) = chars.next() {
                    push_literal(&mut fmt, &next.to_string());
                }
            }
            'Y' => fmt.push_str("%Y"),
            'y' => fmt.push_str("%y"),
            'm' => fmt.push_str("%m"),
            'n' => fmt.push_str("%-m"),
            'd' => fmt.push_str("%d"),
            'j' => fmt.push_str("%-d"),
            'H' => fmt.push_str("%H"),
            'G' => fmt.push_str("%-H"),
            'h' => fmt.push_str("%I"),
            'g' => fmt.push_str("%-I"),
            'i' => fmt.push_str("%M"),
            's' => fmt.push_str("%S"),
            'A' => fmt.push_str("%p"),
            'a' => fmt.push_str("%P"),
            'D' => fmt.push_str("%a"),
            'l' => fmt.push_str("%A"),
            'M' => fmt.push_str("%b"),
            'F' => fmt.push_str("%B"),
            'N' => fmt.push_str("%u"),
            'w' => fmt.push_str("%w"),
            'U' => fmt.push_str("%s"),
            'T' => fmt.push_str("%Z"),
            'e' => push_literal(&mut fmt, zone_name),
            'z' => push_literal(&mut fmt, &moment.ordinal0().to_string()),
            other => push_literal(&mut fmt, &other.to_string()),
        }
    }
    fmt
}

/// Formats a unix timestamp in the given IANA zone using `Y-m-d` style letters.
pub fn timestamp_format(timestamp: i64, zone: Option<&str>, format: &str) -> tera::Result<String> {
    let tz = match zone.filter(|z| !z.is_empty()) {
        Some(name) => Tz::from_str(name)
            .map_err(|_| tera::Error::msg(format!("Unknown time zone `{name}`")))?,
        None => Tz::UTC,
    };
    let utc = DateTime::<Utc>::from_timestamp(timestamp, 0)
        .ok_or_else(|| tera::Error::msg(format!("Timestamp `{timestamp}` is out of range")))?;
    let moment = utc.with_timezone(&tz);
    let fmt = chrono_format(format, &moment, tz.name());
    Ok(moment.format(&fmt).to_string())
}

/// `formatTimestamp(timezone=None, format="Y-m-d H:i:s")`
pub fn format_timestamp(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let timestamp = match value {
        Value::Null => 0,
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_default(),
        Value::String(s) if s.trim().is_empty() => 0,
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| tera::Error::msg(format!("`{s}` is not a timestamp")))?,
        other => return Err(tera::Error::msg(format!("`{other}` is not a timestamp"))),
    };
    let zone = arg_str(args, "timezone");
    let format = arg_str(args, "format").unwrap_or(DEFAULT_TIMESTAMP_FORMAT);

    timestamp_format(timestamp, zone, format).map(Value::String)
}
