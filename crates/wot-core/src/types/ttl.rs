//! Human-readable token lifetimes.
//!
//! Lifetimes are written as a positive integer followed by a single unit
//! letter: `s`, `m`, `h` or `d` (`"60s"`, `"15m"`, `"8h"`, `"7d"`).
//! Parsed lifetimes are capped at [`Ttl::MAX`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A strictly positive lifetime, deserialized from strings like `"15m"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ttl {
    seconds: i64,
}

impl Ttl {
    /// Longest lifetime accepted from configuration (3650 days).
    pub const MAX: Ttl = Ttl::days(3_650);

    /// A lifetime of `n` seconds.
    pub const fn seconds(n: i64) -> Self {
        Self { seconds: n }
    }

    /// A lifetime of `n` minutes.
    pub const fn minutes(n: i64) -> Self {
        Self::seconds(n * 60)
    }

    /// A lifetime of `n` hours.
    pub const fn hours(n: i64) -> Self {
        Self::seconds(n * 3_600)
    }

    /// A lifetime of `n` days.
    pub const fn days(n: i64) -> Self {
        Self::seconds(n * 86_400)
    }

    /// Total length in seconds.
    pub fn as_secs(&self) -> i64 {
        self.seconds
    }

    /// The lifetime as a chrono duration, for `now + ttl` arithmetic.
    pub fn as_duration(&self) -> Duration {
        Duration::seconds(self.seconds)
    }

    /// The instant this lifetime ends when it starts at `from`.
    pub fn expires_at(&self, from: DateTime<Utc>) -> Result<DateTime<Utc>, AppError> {
        from.checked_add_signed(self.as_duration()).ok_or_else(|| {
            AppError::internal(format!("Expiry {self} after {from} is out of range"))
        })
    }
}

impl FromStr for Ttl {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            AppError::configuration(format!(
                "Invalid duration '{s}': use a positive integer with a unit like \"60s\", \"30m\", \"8h\" or \"7d\""
            ))
        };

        let s = s.trim();
        let unit = s.chars().last().ok_or_else(invalid)?;
        let multiplier = match unit {
            's' => 1,
            'm' => 60,
            'h' => 3_600,
            'd' => 86_400,
            _ => return Err(invalid()),
        };

        let digits = &s[..s.len() - unit.len_utf8()];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let value: i64 = digits.parse().map_err(|_| invalid())?;
        let seconds = value.checked_mul(multiplier).ok_or_else(invalid)?;
        if seconds == 0 {
            return Err(invalid());
        }
        if seconds > Self::MAX.seconds {
            return Err(AppError::configuration(format!(
                "Invalid duration '{s}': must not exceed {}",
                Self::MAX
            )));
        }
        Ok(Self { seconds })
    }
}

impl TryFrom<String> for Ttl {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ttl> for String {
    fn from(ttl: Ttl) -> Self {
        ttl.to_string()
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.seconds;
        if s % 86_400 == 0 {
            write!(f, "{}d", s / 86_400)
        } else if s % 3_600 == 0 {
            write!(f, "{}h", s / 3_600)
        } else if s % 60 == 0 {
            write!(f, "{}m", s / 60)
        } else {
            write!(f, "{s}s")
        }
    }
}
