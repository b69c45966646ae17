//! UTC↔wall-clock conversion against a compiled [`TimezoneDb`].
//!
//! Wall-clock instants use the same encoding as UTC instants: the local
//! broken-down time read as if it were UTC. `None` as a zone is the UTC
//! sentinel. The exact instant of a transition belongs to the earlier
//! range, so both wall times flanking a spring-forward are valid and
//! both wall times flanking a fall-back are ambiguous.

use crate::calendar::{END_OF_TIME, Instant, SECONDS_PER_DAY};
use crate::models::{Conversion, ConversionStatus, Timezone, TimezoneDb};

/// Converts a UTC instant to the zone's wall-clock instant.
///
/// Instants before the Unix epoch are returned unchanged: the compiled
/// tables record earlier history for continuity, but conversion treats
/// pre-epoch time as UTC.
///
/// # Examples
///
/// ```
/// use tzrange_core::query::wall_from_utc;
///
/// // `None` is the UTC zone.
/// assert_eq!(wall_from_utc(None, 0), 0);
/// ```
pub fn wall_from_utc(zone: Option<&Timezone>, utc: Instant) -> Instant {
    let Some(zone) = zone else {
        return utc;
    };
    if utc < 0 || zone.ranges.is_empty() {
        return utc;
    }

    let upper = zone.ranges.partition_point(|range| range.since <= utc);
    // The first range starts at BEGIN_OF_TIME, so a predecessor always
    // exists.
    debug_assert!(upper > 0);
    utc + i64::from(zone.ranges[upper - 1].offset_seconds)
}

/// Converts a wall-clock instant back to UTC, classifying it as
/// unique, ambiguous (clocks wound back) or invalid (clocks wound
/// forward). See [`Conversion`] for the field semantics.
///
/// # Examples
///
/// ```
/// use tzrange_core::models::ConversionStatus;
/// use tzrange_core::query::utc_from_wall;
///
/// let conversion = utc_from_wall(None, 0);
/// assert_eq!(conversion.status, ConversionStatus::Ok);
/// assert_eq!(conversion.earlier, 0);
/// ```
pub fn utc_from_wall(zone: Option<&Timezone>, wall: Instant) -> Conversion {
    let Some(zone) = zone else {
        return Conversion::ok(wall);
    };
    // Within a day of the epoch the subtraction below could cross into
    // pre-epoch time; treat it as UTC like wall_from_utc does.
    if wall < SECONDS_PER_DAY || zone.ranges.is_empty() {
        return Conversion::ok(wall);
    }

    for (index, current) in zone.ranges.iter().enumerate() {
        let next = zone.ranges.get(index + 1);
        let to = next.map_or(END_OF_TIME, |next| next.since);
        let utc = wall - i64::from(current.offset_seconds);
        if utc > to {
            continue;
        }

        if let Some(next) = next {
            let utc_with_next = wall - i64::from(next.offset_seconds);
            // The wall time exists in both this range and the next.
            if utc_with_next >= to {
                return Conversion {
                    status: ConversionStatus::Ambiguous,
                    earlier: utc,
                    later: utc_with_next,
                    closest_valid: utc,
                };
            }
        }

        if utc < current.since {
            if index == 0 {
                // The first range starts at the beginning of time; a
                // miss here means pre-epoch wall time, which is UTC.
                return Conversion::ok(wall);
            }
            let previous = &zone.ranges[index - 1];
            return Conversion {
                status: ConversionStatus::Invalid,
                earlier: utc,
                later: wall - i64::from(previous.offset_seconds),
                closest_valid: current.since,
            };
        }

        return Conversion::ok(utc);
    }

    unreachable!("range table covers all of time");
}

impl TimezoneDb {
    /// Returns the default zone of a country: the first zone of its
    /// list. `None` means the country is unknown or has no zones and
    /// is to be read as UTC.
    pub fn default_zone_for_country(&self, code: &str) -> Option<&Timezone> {
        let country = self.country(code)?;
        country.zones.first().map(|&index| &self.timezones[index])
    }

    /// [`wall_from_utc`] against a country's default zone. `None` only
    /// when no default zone exists for `code`.
    pub fn wall_from_utc_for_country(&self, code: &str, utc: Instant) -> Option<Instant> {
        let zone = self.default_zone_for_country(code)?;
        Some(wall_from_utc(Some(zone), utc))
    }

    /// [`utc_from_wall`] against a country's default zone. `None` only
    /// when no default zone exists for `code`.
    pub fn utc_from_wall_for_country(&self, code: &str, wall: Instant) -> Option<Conversion> {
        let zone = self.default_zone_for_country(code)?;
        Some(utc_from_wall(Some(zone), wall))
    }
}
