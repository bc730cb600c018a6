// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Value validators shared by the parser and the handlers.
//!
//! Every validator takes the raw token and returns the typed value or the
//! error the user sees: an empty token is a missing value, anything else
//! that does not fit is an invalid value.

use crate::common::config::AppConfig;
use crate::error::{Error, Result};
use crate::native::{ClockLimit, ClockType};

fn invalid(token: &str) -> Error {
    Error::InvalidParameterValue(token.to_string())
}

fn digits(token: &str) -> Result<u64> {
    if token.is_empty() {
        return Err(Error::MissingParameterValue(token.to_string()));
    }
    if !token.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid(token));
    }
    token.parse().map_err(|_| invalid(token))
}

/// Unsigned integer without sign or fraction, zero allowed.
pub fn non_negative_int(token: &str) -> Result<u64> {
    digits(token.trim())
}

/// Unsigned integer greater than zero.
pub fn positive_int(token: &str) -> Result<u64> {
    match digits(token.trim())? {
        0 => Err(invalid(token)),
        value => Ok(value),
    }
}

/// Non-empty free text.
pub fn text(token: &str) -> Result<String> {
    if token.is_empty() {
        return Err(Error::MissingParameterValue(token.to_string()));
    }
    Ok(token.to_string())
}

/// Integer that fits in a byte; accepts a `0x` prefix for DIMM addresses.
pub fn byte(token: &str) -> Result<u8> {
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::MissingParameterValue(token.to_string()));
    }
    let parsed = match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => token.parse::<u8>().ok(),
    };
    parsed.ok_or_else(|| invalid(token))
}

/// Fan speed as a raw level `0..=255` or a percentage `0%..=100%`.
///
/// A percentage is scaled onto the raw range and rounded half up.
pub fn fan_speed(token: &str) -> Result<u64> {
    let token = token.trim();
    match token.strip_suffix('%') {
        Some(percent) => {
            let percent = digits(percent).map_err(|_| invalid(token))?;
            if percent > 100 {
                return Err(invalid(token));
            }
            let scaled = (percent as f64 / 100.0 * AppConfig::MAX_FAN_SPEED as f64).round();
            Ok(scaled as u64)
        }
        None => {
            let level = digits(token)?;
            if level > AppConfig::MAX_FAN_SPEED {
                return Err(invalid(token));
            }
            Ok(level)
        }
    }
}

/// Overdrive percentage `0..=20`, with or without a trailing `%`.
pub fn overdrive_percent(token: &str) -> Result<u32> {
    let token = token.trim();
    let number = token.strip_suffix('%').unwrap_or(token);
    let percent = digits(number).map_err(|e| match e {
        Error::MissingParameterValue(_) if !token.is_empty() => invalid(token),
        other => other,
    })?;
    if percent > u64::from(AppConfig::MAX_OVERDRIVE_PERCENT) {
        return Err(invalid(token));
    }
    Ok(percent as u32)
}

/// OR of `1 << level` over every level; each level must be `0..=63`.
pub fn clock_level_bitmask<S: AsRef<str>>(levels: &[S]) -> Result<u64> {
    if levels.is_empty() {
        return Err(Error::MissingParameterValue("LEVEL".to_string()));
    }
    levels.iter().try_fold(0u64, |mask, level| {
        let token = level.as_ref();
        let level = digits(token.trim())?;
        if level > u64::from(AppConfig::MAX_CLOCK_LEVEL) {
            return Err(invalid(token));
        }
        Ok(mask | (1u64 << level))
    })
}

pub fn clock_type(token: &str) -> Result<ClockType> {
    ClockType::from_name(token.trim()).ok_or_else(|| invalid(token))
}

pub fn clock_limit(token: &str) -> Result<ClockLimit> {
    ClockLimit::from_name(token.trim()).ok_or_else(|| invalid(token))
}

/// Case-insensitive membership in `choices`; returns the canonical spelling.
pub fn choice(token: &str, choices: &[&'static str]) -> Result<&'static str> {
    choices
        .iter()
        .copied()
        .find(|candidate| candidate.eq_ignore_ascii_case(token.trim()))
        .ok_or_else(|| invalid(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_and_non_negative() {
        assert_eq!(positive_int("5").unwrap(), 5);
        assert!(matches!(positive_int("0"), Err(Error::InvalidParameterValue(_))));
        assert!(matches!(positive_int("-1"), Err(Error::InvalidParameterValue(_))));
        assert!(matches!(positive_int("1.5"), Err(Error::InvalidParameterValue(_))));
        assert!(matches!(positive_int(""), Err(Error::MissingParameterValue(_))));
        assert_eq!(non_negative_int("0").unwrap(), 0);
    }

    #[test]
    fn test_fan_percent_matches_raw_level() {
        let from_percent = fan_speed("50%").unwrap() as i64;
        let raw = fan_speed("127").unwrap() as i64;
        assert!((from_percent - raw).abs() <= 1);
        assert_eq!(from_percent, 128);
        assert_eq!(fan_speed("100%").unwrap(), 255);
        assert_eq!(fan_speed("0%").unwrap(), 0);
    }

    #[test]
    fn test_fan_rejects_out_of_range() {
        assert!(fan_speed("256").is_err());
        assert!(fan_speed("101%").is_err());
        assert!(fan_speed("abc%").is_err());
        assert!(fan_speed("-5").is_err());
    }

    #[test]
    fn test_overdrive() {
        assert_eq!(overdrive_percent("20").unwrap(), 20);
        assert_eq!(overdrive_percent("15%").unwrap(), 15);
        assert!(matches!(overdrive_percent("21"), Err(Error::InvalidParameterValue(_))));
        assert!(matches!(overdrive_percent("%"), Err(Error::InvalidParameterValue(_))));
    }

    #[test]
    fn test_clock_level_bitmask() {
        assert_eq!(clock_level_bitmask(&["0", "2", "3"]).unwrap(), 0b1101);
        assert_eq!(clock_level_bitmask(&["63"]).unwrap(), 1u64 << 63);
        assert!(matches!(
            clock_level_bitmask(&["64"]),
            Err(Error::InvalidParameterValue(t)) if t == "64"
        ));
        assert!(clock_level_bitmask::<&str>(&[]).is_err());
    }

    #[test]
    fn test_byte_accepts_hex() {
        assert_eq!(byte("0x80").unwrap(), 0x80);
        assert_eq!(byte("12").unwrap(), 12);
        assert!(byte("0x1ff").is_err());
    }

    #[test]
    fn test_choice_is_case_insensitive() {
        assert_eq!(choice("cpx", &["SPX", "CPX"]).unwrap(), "CPX");
        assert!(choice("xyz", &["SPX"]).is_err());
    }
}
