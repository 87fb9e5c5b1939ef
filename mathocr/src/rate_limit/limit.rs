use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseRateLimitError {
    #[error("empty rate limit")]
    Empty,

    #[error("invalid amount in '{0}'")]
    InvalidAmount(String),

    #[error("invalid window in '{0}'")]
    InvalidWindow(String),

    #[error("unknown time unit '{0}'")]
    UnknownUnit(String),
}

/// `amount` requests per `window`, e.g. "30 per minute".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RateLimit {
    amount: u32,
    multiples: u64,
    unit: TimeUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    fn secs(self) -> u64 {
        match self {
            TimeUnit::Second => 1,
            TimeUnit::Minute => 60,
            TimeUnit::Hour => 60 * 60,
            TimeUnit::Day => 24 * 60 * 60,
        }
    }

    fn name(self) -> &'static str {
        match self {
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = ParseRateLimitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        let singular = lower.strip_suffix('s').unwrap_or(&lower);
        match singular {
            "second" | "sec" => Ok(TimeUnit::Second),
            "minute" | "min" => Ok(TimeUnit::Minute),
            "hour" => Ok(TimeUnit::Hour),
            "day" => Ok(TimeUnit::Day),
            _ => Err(ParseRateLimitError::UnknownUnit(s.to_string())),
        }
    }
}

impl RateLimit {
    pub fn per_minute(amount: u32) -> Self {
        Self {
            amount,
            multiples: 1,
            unit: TimeUnit::Minute,
        }
    }

    pub fn per_hour(amount: u32) -> Self {
        Self {
            amount,
            multiples: 1,
            unit: TimeUnit::Hour,
        }
    }

    pub fn per_day(amount: u32) -> Self {
        Self {
            amount,
            multiples: 1,
            unit: TimeUnit::Day,
        }
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.multiples * self.unit.secs())
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if self.multiples == 1 { "" } else { "s" };
        write!(
            f,
            "{} per {} {}{}",
            self.amount,
            self.multiples,
            self.unit.name(),
            plural
        )
    }
}

impl FromStr for RateLimit {
    type Err = ParseRateLimitError;

    /// Accepts `"30 per minute"`, `"10 per 5 minutes"` and `"50/hour"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseRateLimitError::Empty);
        }

        let (amount, window) = match trimmed.split_once('/') {
            Some((amount, window)) => (amount, window),
            None => {
                let lower = trimmed.to_ascii_lowercase();
                let idx = lower
                    .find(" per ")
                    .ok_or_else(|| ParseRateLimitError::InvalidWindow(trimmed.to_string()))?;
                (&trimmed[..idx], &trimmed[idx + " per ".len()..])
            }
        };

        let amount: u32 = amount
            .trim()
            .parse()
            .map_err(|_| ParseRateLimitError::InvalidAmount(trimmed.to_string()))?;
        if amount == 0 {
            return Err(ParseRateLimitError::InvalidAmount(trimmed.to_string()));
        }

        let mut parts = window.split_whitespace();
        let (multiples, unit) = match (parts.next(), parts.next(), parts.next()) {
            (Some(unit), None, None) => (1, unit),
            (Some(count), Some(unit), None) => {
                let count: u64 = count
                    .parse()
                    .map_err(|_| ParseRateLimitError::InvalidWindow(trimmed.to_string()))?;
                (count, unit)
            }
            _ => return Err(ParseRateLimitError::InvalidWindow(trimmed.to_string())),
        };
        if multiples == 0 {
            return Err(ParseRateLimitError::InvalidWindow(trimmed.to_string()));
        }

        Ok(Self {
            amount,
            multiples,
            unit: unit.parse()?,
        })
    }
}

/// Ordered list of limits that must all hold, written `"200 per day;50 per hour"`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub struct RateLimitSet(Vec<RateLimit>);

impl RateLimitSet {
    pub fn new(limits: Vec<RateLimit>) -> Self {
        Self(limits)
    }

    pub fn default_global() -> Self {
        Self(vec![RateLimit::per_day(200), RateLimit::per_hour(50)])
    }

    pub fn default_ocr() -> Self {
        Self(vec![RateLimit::per_minute(30)])
    }

    pub fn limits(&self) -> &[RateLimit] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn longest_window(&self) -> Option<Duration> {
        self.0.iter().map(RateLimit::window).max()
    }
}

impl fmt::Display for RateLimitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(";"))
    }
}

impl FromStr for RateLimitSet {
    type Err = ParseRateLimitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split([';', ','])
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl TryFrom<String> for RateLimitSet {
    type Error = ParseRateLimitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
