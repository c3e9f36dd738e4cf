//! Parsing of the `timeout` (cooldown) setting.
//!
//! Accepted forms:
//!
//! - a YAML number, or a string holding one: seconds, possibly fractional
//! - `[D day[s], ][[HH:]MM:]SS[.ffffff]`, e.g. `10:00` or `00:10:00`
//! - ISO 8601 durations without years or months, e.g. `PT10M` or `P1DT2H`

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Error returned for an unparseable or negative duration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid duration {0:?}: expected seconds, [D days, ][HH:]MM:SS or ISO 8601 (e.g. PT10M)")]
pub struct InvalidDuration(pub String);

static CLOCK_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?P<days>\d+) days?,? )?(?:(?:(?P<hours>\d+):)?(?P<minutes>\d+):)?(?P<seconds>\d+(?:\.\d+)?)$",
    )
    .expect("clock duration regex is valid")
});

static ISO_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^P(?:(?P<days>\d+(?:\.\d+)?)D)?(?:T(?:(?P<hours>\d+(?:\.\d+)?)H)?(?:(?P<minutes>\d+(?:\.\d+)?)M)?(?:(?P<seconds>\d+(?:\.\d+)?)S)?)?$",
    )
    .expect("ISO 8601 duration regex is valid")
});

/// Parses a textual duration.
pub fn parse_duration(text: &str) -> Result<Duration, InvalidDuration> {
    let text = text.trim();
    let invalid = || InvalidDuration(text.to_string());

    if let Ok(seconds) = text.parse::<f64>() {
        return seconds_to_duration(seconds).ok_or_else(invalid);
    }

    let captures = if let Some(c) = CLOCK_FORMAT.captures(text) {
        c
    } else if let Some(c) = ISO_FORMAT.captures(text) {
        // A bare "P" or "PT" carries no components.
        if text.len() <= 2 || text.ends_with('T') {
            return Err(invalid());
        }
        c
    } else {
        return Err(invalid());
    };

    let component = |name: &str, scale: f64| -> f64 {
        captures
            .name(name)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .map_or(0.0, |v| v * scale)
    };
    let total = component("days", 86_400.0)
        + component("hours", 3_600.0)
        + component("minutes", 60.0)
        + component("seconds", 1.0);
    seconds_to_duration(total).ok_or_else(invalid)
}

fn seconds_to_duration(seconds: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(seconds).ok()
}

/// Deserializes a duration from a number of seconds or any textual form
/// accepted by [`parse_duration`].
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(seconds) => seconds_to_duration(seconds)
            .ok_or_else(|| serde::de::Error::custom(InvalidDuration(seconds.to_string()))),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}
