//! Granularity level parsing.
//!
//! The granularity level controls how much geographic detail is attached to a
//! connection, from timezone-only up to full postal precision. It is resolved
//! once at start-up and never reloaded per-connection.

use log::warn;
use strum_macros::EnumIter as EnumIterMacro;

/// How much geographic detail to expose on each connection.
///
/// Levels are cumulative: a higher level emits every tag a lower level would.
/// The numeric discriminants are the values accepted in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIterMacro)]
pub enum GranularityLevel {
    /// Timezone only.
    Timezone = 1,
    /// Country code and name.
    Country = 2,
    /// Subdivision (state/province) and composite region identifiers.
    Subdivision = 3,
    /// City name.
    City = 4,
    /// Postal code (full detail).
    Postal = 5,
}

impl GranularityLevel {
    /// Default level when configuration is absent or unrecognized: richest
    /// data by default.
    pub const DEFAULT: GranularityLevel = GranularityLevel::Postal;

    /// Resolves a raw configuration value into a level.
    ///
    /// Accepts an integer `1`-`5` or a case-insensitive named synonym
    /// (`timezone`/`tz`, `country`, `subdivision`/`state`/`province`,
    /// `city`, `postal`/`zip`). Absent, empty, or unrecognized input falls
    /// open to [`GranularityLevel::DEFAULT`]; this parse never rejects.
    pub fn resolve(raw: Option<&str>) -> GranularityLevel {
        let Some(raw) = raw else {
            return Self::DEFAULT;
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::DEFAULT;
        }

        if let Ok(level) = trimmed.parse::<i64>() {
            if let Some(parsed) = Self::from_number(level) {
                return parsed;
            }
            warn!(
                "Granularity level {} out of range [1,5], defaulting to {}",
                level,
                Self::DEFAULT
            );
            return Self::DEFAULT;
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "timezone" | "tz" => GranularityLevel::Timezone,
            "country" => GranularityLevel::Country,
            "subdivision" | "state" | "province" => GranularityLevel::Subdivision,
            "city" => GranularityLevel::City,
            "postal" | "zip" => GranularityLevel::Postal,
            other => {
                warn!(
                    "Unrecognized granularity value '{}', defaulting to {}",
                    other,
                    Self::DEFAULT
                );
                Self::DEFAULT
            }
        }
    }

    /// The numeric value of this level, as accepted in configuration.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    fn from_number(n: i64) -> Option<GranularityLevel> {
        match n {
            1 => Some(GranularityLevel::Timezone),
            2 => Some(GranularityLevel::Country),
            3 => Some(GranularityLevel::Subdivision),
            4 => Some(GranularityLevel::City),
            5 => Some(GranularityLevel::Postal),
            _ => None,
        }
    }
}

impl std::fmt::Display for GranularityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GranularityLevel::Timezone => "timezone",
            GranularityLevel::Country => "country",
            GranularityLevel::Subdivision => "subdivision",
            GranularityLevel::City => "city",
            GranularityLevel::Postal => "postal",
        };
        write!(f, "{} ({})", name, self.as_u8())
    }
}
