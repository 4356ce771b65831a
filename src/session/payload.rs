// ABOUTME: Payload inspection helpers mirroring how the web client reads server JSON
// Truthiness checks and template-literal style value formatting

use serde_json::Value;

/// Whether `value` counts as present: not null, false, 0, NaN or the empty string
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

/// Field `key` of `payload` if it is truthy
pub fn truthy_field<'a>(payload: &'a Value, key: &str) -> Option<&'a Value> {
    let field = payload.get(key);
    is_truthy(field).then_some(field).flatten()
}

/// Render a value the way a string template would interpolate it
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                format_float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Some(other) => other.to_string(),
    }
}

/// Number to string conversion as JavaScript does it: shortest round-trip digits,
/// exponent form below 1e-6 and from 1e21 up
fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if f == 0.0 {
        return "0".to_string();
    }

    let sign = if f < 0.0 { "-" } else { "" };
    // `{:e}` yields the shortest digits that round-trip, e.g. `1.2345e3`
    let scientific = format!("{:e}", f.abs());
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();

    let k = i32::try_from(digits.len()).unwrap_or(i32::MAX);
    // Decimal point position relative to the digits
    let n = exponent.parse::<i32>().unwrap_or(0) + 1;
    let zeros = |count: i32| "0".repeat(usize::try_from(count).unwrap_or(0));

    let body = if k <= n && n <= 21 {
        format!("{digits}{}", zeros(n - k))
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(usize::try_from(n).unwrap_or(0));
        format!("{int}.{frac}")
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", zeros(-n))
    } else {
        let e = n - 1;
        let e_sign = if e < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{first}e{e_sign}{}", e.abs())
        } else {
            format!("{first}.{rest}e{e_sign}{}", e.abs())
        }
    };

    format!("{sign}{body}")
}
