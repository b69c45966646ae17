//! Core data types for tzrange.
//!
//! This module defines the compiled model and its supporting types:
//! - [`TimezoneDb`] - The root of a compiled tzdb release
//! - [`Timezone`] / [`TimeRange`] - Per-zone transition tables
//! - [`Country`] - ISO 3166 country with its ordered zone list
//! - [`DateKind`] - The three timestamp interpretations of zic sources
//! - [`Conversion`] / [`ConversionStatus`] - Wall→UTC conversion results
//! - [`CompileOptions`] - Compile-time configuration and injected tables

use std::sync::Arc;

use serde::Serialize;

use crate::calendar::Instant;

/// Maximum zone name length in bytes.
pub(crate) const MAX_ZONE_NAME: usize = 32;
/// Maximum country name length in bytes.
pub(crate) const MAX_COUNTRY_NAME: usize = 60;
/// Country code length in bytes.
pub(crate) const COUNTRY_CODE_LEN: usize = 2;
/// Maximum abbreviation length in bytes.
pub(crate) const MAX_ABBREVIATION: usize = 5;

/// How a raw timestamp lifted from the source text is to be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DateKind {
    /// Already UTC (`u`, `g` or `z` suffix).
    Utc,
    /// Local time under the standard offset, no savings (`s` suffix).
    Standard,
    /// Local time under standard plus active savings (`w` or none).
    #[default]
    Wall,
}

impl DateKind {
    /// Resolves a tagged timestamp to UTC. This is the only place the
    /// tag is interpreted.
    pub(crate) fn resolve_to_utc(
        self,
        timestamp: Instant,
        standard_offset_seconds: i32,
        savings_seconds: i32,
    ) -> Instant {
        match self {
            DateKind::Utc => timestamp,
            DateKind::Standard => timestamp - i64::from(standard_offset_seconds),
            DateKind::Wall => {
                timestamp - (i64::from(standard_offset_seconds) + i64::from(savings_seconds))
            }
        }
    }
}

/// One entry of a zone's transition table: from `since` (inclusive)
/// until the next range's `since` (exclusive), local time is UTC plus
/// `offset_seconds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    /// UTC instant this range starts at. The first range of every zone
    /// starts at [`crate::calendar::BEGIN_OF_TIME`].
    pub since: Instant,
    /// Total offset from UTC (standard plus any savings).
    pub offset_seconds: i32,
    /// Zone abbreviation, at most 5 bytes (e.g. "CEST").
    pub abbreviation: String,
}

/// A named IANA zone with its compiled transition table.
#[derive(Debug, Clone, Serialize)]
pub struct Timezone {
    /// IANA name, e.g. "Europe/Berlin". At most 32 bytes.
    pub name: String,
    /// For zones created from a `Link`, the name of the main zone.
    pub alias_of: Option<String>,
    /// Latitude in signed arc-seconds, from `zone1970.tab`.
    pub coordinate_latitude_seconds: i32,
    /// Longitude in signed arc-seconds, from `zone1970.tab`.
    pub coordinate_longitude_seconds: i32,
    /// The transition table. Aliases share their main zone's table.
    pub ranges: Arc<[TimeRange]>,
}

/// An ISO 3166 country and the zones observed in it.
#[derive(Debug, Clone, Serialize)]
pub struct Country {
    /// ISO 3166-1 alpha-2 code.
    pub code: String,
    /// English name, at most 60 bytes.
    pub name: String,
    /// Indices into [`TimezoneDb::timezones`]; the first entry is the
    /// country's default zone.
    pub zones: Vec<usize>,
}

/// A compiled tzdb release.
///
/// Immutable once built; queries may run from any number of threads
/// without synchronization.
#[derive(Debug, Clone, Serialize)]
pub struct TimezoneDb {
    /// Release name from the archive's `version` member, e.g. "2025a".
    pub iana_version: String,
    /// Sorted by `code`.
    pub countries: Vec<Country>,
    /// Sorted by `name`.
    pub timezones: Vec<Timezone>,
}

impl TimezoneDb {
    /// Looks up a zone by its IANA name.
    pub fn zone(&self, name: &str) -> Option<&Timezone> {
        self.timezones
            .binary_search_by(|zone| zone.name.as_str().cmp(name))
            .ok()
            .map(|index| &self.timezones[index])
    }

    /// Looks up a country by its ISO 3166-1 alpha-2 code.
    pub fn country(&self, code: &str) -> Option<&Country> {
        self.countries
            .binary_search_by(|country| country.code.as_str().cmp(code))
            .ok()
            .map(|index| &self.countries[index])
    }
}

/// Outcome category of a wall→UTC conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    /// The wall time maps to exactly one UTC instant.
    Ok,
    /// The wall time occurred twice (clocks were wound back).
    Ambiguous,
    /// The wall time never occurred (clocks were wound forward).
    Invalid,
}

impl std::fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversionStatus::Ok => write!(f, "ok"),
            ConversionStatus::Ambiguous => write!(f, "ambiguous"),
            ConversionStatus::Invalid => write!(f, "invalid"),
        }
    }
}

/// Result of a wall→UTC conversion. All instants are UTC.
///
/// For `Ok`, all three instants are equal. For `Ambiguous`, `earlier`
/// and `later` are the two candidate instants and `closest_valid`
/// equals `earlier`. For `Invalid`, `earlier` and `later` bracket the
/// gap and `closest_valid` is the first instant after the clocks
/// jumped. When converting the two ends of a wall-time interval,
/// `[start.earlier, end.later]` spans the longest valid UTC interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Conversion {
    pub status: ConversionStatus,
    pub earlier: Instant,
    pub later: Instant,
    pub closest_valid: Instant,
}

impl Conversion {
    pub(crate) fn ok(instant: Instant) -> Self {
        Conversion {
            status: ConversionStatus::Ok,
            earlier: instant,
            later: instant,
            closest_valid: instant,
        }
    }
}

/// An injected country alias: a country entry to create that shares
/// another country's zone list (e.g. Kosovo, which `iso3166.tab` does
/// not carry).
#[derive(Debug, Clone)]
pub struct CountryAlias {
    /// Code of the alias entry to create.
    pub alias_code: String,
    /// Name of the alias entry to create.
    pub alias_name: String,
    /// Code of the existing country whose zone list the alias shares.
    pub main_code: String,
}

/// An injected default-zone override: moves the named zone to the
/// front of the country's zone list.
#[derive(Debug, Clone)]
pub struct DefaultZoneOverride {
    pub country_code: String,
    pub zone_name: String,
}

/// Compile-time configuration.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Ceiling year used when a rule's `TO` field is the literal `max`.
    pub max_year: u32,
    /// Country aliases to insert, see [`CountryAlias`].
    pub country_aliases: Vec<CountryAlias>,
    /// Default-zone overrides to apply, see [`DefaultZoneOverride`].
    pub default_zone_overrides: Vec<DefaultZoneOverride>,
    /// Country codes that are known to carry no zone in `zone1970.tab`
    /// and are exempt from the at-least-one-zone invariant.
    pub no_zone_countries: Vec<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            max_year: 2500,
            country_aliases: Vec::new(),
            default_zone_overrides: Vec::new(),
            no_zone_countries: vec!["BV".to_string(), "HM".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_kind_resolution() {
        assert_eq!(DateKind::Utc.resolve_to_utc(1000, 3600, 3600), 1000);
        assert_eq!(DateKind::Standard.resolve_to_utc(1000, 3600, 3600), 1000 - 3600);
        assert_eq!(DateKind::Wall.resolve_to_utc(1000, 3600, 3600), 1000 - 7200);
        assert_eq!(DateKind::Wall.resolve_to_utc(0, -18000, 0), 18000);
    }

    #[test]
    fn date_kind_default_is_wall() {
        assert_eq!(DateKind::default(), DateKind::Wall);
    }

    #[test]
    fn conversion_ok_sets_all_instants() {
        let conversion = Conversion::ok(42);
        assert_eq!(conversion.status, ConversionStatus::Ok);
        assert_eq!(conversion.earlier, 42);
        assert_eq!(conversion.later, 42);
        assert_eq!(conversion.closest_valid, 42);
    }

    #[test]
    fn conversion_status_display() {
        assert_eq!(format!("{}", ConversionStatus::Ok), "ok");
        assert_eq!(format!("{}", ConversionStatus::Ambiguous), "ambiguous");
        assert_eq!(format!("{}", ConversionStatus::Invalid), "invalid");
    }

    #[test]
    fn options_default() {
        let options = CompileOptions::default();
        assert_eq!(options.max_year, 2500);
        assert!(options.country_aliases.is_empty());
        assert!(options.default_zone_overrides.is_empty());
        assert_eq!(options.no_zone_countries, ["BV", "HM"]);
    }

    #[test]
    fn conversion_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ConversionStatus::Ambiguous).unwrap(),
            "\"ambiguous\""
        );
    }

    #[test]
    fn time_range_serialization() {
        let range = TimeRange {
            since: 0,
            offset_seconds: 3600,
            abbreviation: "CET".to_string(),
        };
        let json = serde_json::to_string(&range).unwrap();
        assert_eq!(
            json,
            "{\"since\":0,\"offset_seconds\":3600,\"abbreviation\":\"CET\"}"
        );
    }
}
