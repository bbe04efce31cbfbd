use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::MockError;

/// Parses relative durations such as `"7d"`, `"1h30m"` or `"90s"` into seconds.
///
/// The whole input must decompose into `<digits><unit>` components with
/// `unit` one of `s`, `m`, `h`, `d` (any case). Partial matches are rejected,
/// so `"2d3x"` fails instead of parsing as two days.
pub fn parse_duration(input: &str) -> Result<i64, MockError> {
    let invalid = || MockError::InvalidDurationFormat(input.to_string());

    let mut total: i64 = 0;
    let mut components = 0usize;
    let mut digits = String::new();
    for ch in input.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        if digits.is_empty() {
            return Err(invalid());
        }
        let unit_seconds = match ch.to_ascii_lowercase() {
            's' => 1,
            'm' => 60,
            'h' => 3_600,
            'd' => 86_400,
            _ => return Err(invalid()),
        };
        let value: i64 = digits.parse().map_err(|_| invalid())?;
        total = value
            .checked_mul(unit_seconds)
            .and_then(|seconds| total.checked_add(seconds))
            .ok_or_else(invalid)?;
        components += 1;
        digits.clear();
    }

    // Trailing digits without a unit ("30", "1h5") break the grammar.
    if !digits.is_empty() || components == 0 {
        return Err(invalid());
    }
    Ok(total)
}

/// Source of "now" for a mock installation. Read it once per installation and
/// reuse the value for every timeline so fixtures stay internally consistent.
#[derive(Debug, Clone)]
pub struct Clock {
    tz: Tz,
    fixed_now: Option<i64>,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            tz: Tz::UTC,
            fixed_now: None,
        }
    }
}

impl Clock {
    pub fn new(timezone: Option<&str>, fixed_now: Option<i64>) -> Result<Self, MockError> {
        let tz = match timezone.map(str::trim).filter(|value| !value.is_empty()) {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| MockError::UnknownTimezone(name.to_string()))?,
            None => Tz::UTC,
        };
        Ok(Self { tz, fixed_now })
    }

    /// A clock pinned to `now`, used by tests and `--fixed-now` runs.
    pub fn fixed(now: i64) -> Self {
        Self {
            tz: Tz::UTC,
            fixed_now: Some(now),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn now(&self) -> DateTime<Tz> {
        let utc = self
            .fixed_now
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(Utc::now);
        utc.with_timezone(&self.tz)
    }

    pub fn now_seconds(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Parses a Prometheus time parameter: Unix seconds (integer or float) or RFC 3339.
pub fn parse_time_param(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(secs) = trimmed.parse::<f64>() {
        return secs.is_finite().then(|| secs.floor() as i64);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|parsed| parsed.timestamp())
}
