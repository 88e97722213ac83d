use thiserror::Error;

/// Receipt totals are stored as integer cents so listings never show
/// floating-point noise. $42.17 = 4217 cents.
pub type Cents = i64;

/// Format cents as a plain decimal string.
/// Example: 4217 -> "42.17", -5 -> "-0.05"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Parse a decimal amount such as "42.17", "42.1", "42" or ".99" into cents.
/// Digits past the second decimal place are truncated.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim().trim_start_matches('$');
    let (negative, input) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let (units_str, decimal_str) = input.split_once('.').unwrap_or((input, ""));
    if units_str.is_empty() && decimal_str.is_empty() {
        return Err(ParseCentsError::Empty);
    }
    if !units_str.chars().all(|c| c.is_ascii_digit())
        || !decimal_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ParseCentsError::InvalidFormat(input.to_string()));
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat(input.to_string()))?
    };

    let decimal_cents: i64 = match decimal_str.len() {
        0 => 0,
        1 => decimal_str.parse::<i64>().unwrap_or(0) * 10,
        _ => decimal_str[..2].parse().unwrap_or(0),
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimal_cents))
        .ok_or_else(|| ParseCentsError::InvalidFormat(input.to_string()))?;
    Ok(if negative { -cents } else { cents })
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    #[error("empty amount")]
    Empty,

    #[error("invalid money format: {0}")]
    InvalidFormat(String),
}
