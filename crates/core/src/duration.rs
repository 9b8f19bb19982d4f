//! Retention-window parsing.
//!
//! Result retention is configured as a duration string in the
//! `PnYnDnHnMnS` shape, e.g. `P0Y0D1H0M0S` for one hour. The leading `P`
//! and a `T` before the time part are optional, so `0Y0D0H0M1S` and
//! `PT30M` are accepted too. `M` always means minutes; a year counts as
//! 365 days.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::CoreError;

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;
const MS_PER_YEAR: u64 = 365 * MS_PER_DAY;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^P?(?:(\d+)Y)?(?:(\d+)D)?T?(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)(?:\.(\d{1,3})\d*)?S)?$",
    )
    .expect("valid regex")
});

/// Parse a retention string into a [`Duration`].
pub fn parse_retention(input: &str) -> Result<Duration, CoreError> {
    let trimmed = input.trim().to_ascii_uppercase();
    let caps = DURATION_RE
        .captures(&trimmed)
        .ok_or_else(|| CoreError::InvalidDuration(input.to_string()))?;

    // A bare "P" or "PT" matches the pattern but names no component.
    if caps.iter().skip(1).all(|c| c.is_none()) {
        return Err(CoreError::InvalidDuration(input.to_string()));
    }

    let field = |idx: usize| -> Result<u64, CoreError> {
        caps.get(idx)
            .map(|m| m.as_str().parse::<u64>())
            .transpose()
            .map(|v| v.unwrap_or(0))
            .map_err(|_| CoreError::InvalidDuration(input.to_string()))
    };

    let millis_fraction = match caps.get(6) {
        Some(m) => {
            // Right-pad to three digits: ".5" is 500ms, ".05" is 50ms.
            let digits = format!("{:0<3}", m.as_str());
            digits
                .parse::<u64>()
                .map_err(|_| CoreError::InvalidDuration(input.to_string()))?
        }
        None => 0,
    };

    let parts = [
        (field(1)?, MS_PER_YEAR),
        (field(2)?, MS_PER_DAY),
        (field(3)?, MS_PER_HOUR),
        (field(4)?, MS_PER_MINUTE),
        (field(5)?, MS_PER_SECOND),
    ];

    let mut total: u64 = millis_fraction;
    for (value, unit) in parts {
        total = value
            .checked_mul(unit)
            .and_then(|ms| total.checked_add(ms))
            .ok_or_else(|| CoreError::InvalidDuration(input.to_string()))?;
    }

    Ok(Duration::from_millis(total))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
