//! The tzdb compiler: archive bytes in, [`TimezoneDb`] out.
//!
//! Per zone, the compiler walks the declared epochs in order and
//! interleaves them with the savings rules in effect, emitting one
//! [`TimeRange`] per observable transition:
//!
//! - Rule bundles are expanded per year at parse time and sorted
//!   lazily, under the standard offset of the first epoch that uses
//!   them; later epochs only re-verify that the order still holds.
//! - A rule's start instant depends on how much savings the *previous*
//!   rule carried (a `2:00` wall-clock switch means 2:00 under the old
//!   clock), so that state is threaded explicitly through the walk and
//!   across epoch boundaries.
//! - Every epoch contributes a boundary range at the cursor with its
//!   bare standard offset; candidates that repeat the previous range's
//!   offset and abbreviation are suppressed.

use std::sync::Arc;

use crate::calendar::{BEGIN_OF_TIME, SECONDS_PER_DAY};
use crate::error::{Result, TzRangeError};
use crate::inflate::gunzip;
use crate::models::{
    COUNTRY_CODE_LEN, CompileOptions, Country, MAX_ABBREVIATION, MAX_COUNTRY_NAME, MAX_ZONE_NAME,
    TimeRange, Timezone, TimezoneDb,
};
use crate::parse::{
    Link, ParsedRule, RuleBundle, SourceFile, ZoneBundle, ZoneEpoch, malformed, parse_source_file,
};
use crate::scan::{next_line, next_text, next_token, parse_latlong};
use crate::tar;

/// The continent source files the compiler reads.
const CONTINENT_FILES: [&str; 7] = [
    "africa",
    "antarctica",
    "asia",
    "australasia",
    "europe",
    "northamerica",
    "southamerica",
];

/// Compiles an IANA tzdb release archive (the full `.tar.gz` bytes)
/// with default options.
///
/// # Errors
///
/// Fails with a descriptive [`TzRangeError`] on a corrupt archive, a
/// declaration the compiler cannot interpret, or a broken cross
/// reference. No partial database is ever returned.
pub fn compile(archive: &[u8]) -> Result<TimezoneDb> {
    compile_with(archive, &CompileOptions::default())
}

/// Compiles an IANA tzdb release archive with explicit
/// [`CompileOptions`].
pub fn compile_with(archive: &[u8], options: &CompileOptions) -> Result<TimezoneDb> {
    let tarball = gunzip(archive)?;
    log::debug!("inflated tzdb archive to {} bytes", tarball.len());

    let iana_version = required_member(&tarball, "version")?.trim_end().to_string();

    let mut links: Vec<Link> = Vec::new();
    let mut timezones: Vec<Timezone> = Vec::new();
    for file_name in CONTINENT_FILES {
        let text = required_member(&tarball, file_name)?;
        let mut parsed = parse_source_file(file_name, text, options.max_year)?;
        links.append(&mut parsed.links);
        compile_file_zones(file_name, &mut parsed, &links, &mut timezones)?;
    }

    resolve_links(&links, &mut timezones)?;
    timezones.sort_by(|a, b| a.name.cmp(&b.name));
    validate_zone_table(&timezones);

    let mut countries = parse_countries(
        "iso3166.tab",
        required_member(&tarball, "iso3166.tab")?,
        options,
    )?;
    countries.sort_by(|a, b| a.code.cmp(&b.code));

    attach_country_zones(
        "zone1970.tab",
        required_member(&tarball, "zone1970.tab")?,
        &mut timezones,
        &mut countries,
    )?;
    apply_injected_tables(options, &mut countries, &timezones)?;

    for country in &countries {
        if country.zones.is_empty()
            && !options.no_zone_countries.iter().any(|code| *code == country.code)
        {
            return Err(TzRangeError::UnresolvedReference(format!(
                "country '{}' ({}) ended up with no zones",
                country.code, country.name
            )));
        }
    }

    log::debug!(
        "compiled tzdb {}: {} zones, {} countries",
        iana_version,
        timezones.len(),
        countries.len()
    );

    Ok(TimezoneDb {
        iana_version,
        countries,
        timezones,
    })
}

fn required_member<'a>(tarball: &'a [u8], name: &str) -> Result<&'a str> {
    let bytes = tar::member(tarball, name);
    if bytes.is_empty() {
        return Err(TzRangeError::CorruptArchive(format!(
            "missing member '{name}' in tzdb archive"
        )));
    }
    std::str::from_utf8(bytes).map_err(|_| {
        TzRangeError::CorruptArchive(format!("member '{name}' is not valid UTF-8"))
    })
}

fn bounded(value: &str, cap: usize, what: &str, context: &str) -> Result<String> {
    if value.len() > cap {
        return Err(TzRangeError::Overflow(format!(
            "{what} '{value}' exceeds {cap} bytes ({context})"
        )));
    }
    Ok(value.to_string())
}

/// Compiles every zone declared in one source file, skipping zones
/// that some `Link` names as an alias (those are created afterwards,
/// sharing their main zone's table).
fn compile_file_zones(
    file_name: &str,
    parsed: &mut SourceFile,
    links: &[Link],
    timezones: &mut Vec<Timezone>,
) -> Result<()> {
    let SourceFile { rules, zones, .. } = parsed;
    for bundle in zones.iter() {
        if links.iter().any(|link| link.alias == bundle.name) {
            continue;
        }
        let ranges = compile_zone(file_name, bundle, rules)?;
        log::trace!("{}: {} ranges", bundle.name, ranges.len());
        timezones.push(Timezone {
            name: bounded(&bundle.name, MAX_ZONE_NAME, "zone name", file_name)?,
            alias_of: None,
            coordinate_latitude_seconds: 0,
            coordinate_longitude_seconds: 0,
            ranges: Arc::from(ranges),
        });
    }
    Ok(())
}

/// Appends `candidate` unless it starts no later than the last range
/// or repeats its offset and abbreviation.
fn push_range(ranges: &mut Vec<TimeRange>, candidate: TimeRange) {
    match ranges.last() {
        None => ranges.push(candidate),
        Some(last) => {
            let redundant = last.offset_seconds == candidate.offset_seconds
                && last.abbreviation == candidate.abbreviation;
            if candidate.since > last.since && !redundant {
                ranges.push(candidate);
            }
        }
    }
}

fn compile_zone(
    file_name: &str,
    bundle: &ZoneBundle,
    rule_bundles: &mut [RuleBundle],
) -> Result<Vec<TimeRange>> {
    const EMPTY: &[ParsedRule] = &[];

    let mut ranges: Vec<TimeRange> = Vec::new();
    let mut cursor = BEGIN_OF_TIME;
    // Savings carried from the rule last seen, across epochs too; zero
    // until any rule is reached.
    let mut previous_savings: i32 = 0;

    for epoch in &bundle.epochs {
        let rules = if epoch.rule.is_empty() {
            EMPTY
        } else {
            let index = rule_bundles
                .iter()
                .position(|rule_bundle| rule_bundle.name == epoch.rule)
                .ok_or_else(|| {
                    TzRangeError::UnresolvedReference(format!(
                        "zone '{}' uses rule '{}' which does not exist (in '{file_name}')",
                        bundle.name, epoch.rule
                    ))
                })?;
            sort_or_verify(&mut rule_bundles[index], epoch, &bundle.name, file_name)?;
            rule_bundles[index].rules.as_slice()
        };

        // The epoch's own boundary: its standard offset with no rule
        // active. For the very first epoch this is the sentinel at
        // BEGIN_OF_TIME that every zone's table starts with.
        push_range(
            &mut ranges,
            TimeRange {
                since: cursor,
                offset_seconds: epoch.standard_offset_seconds,
                abbreviation: format_abbreviation(&epoch.format, None, &bundle.name, file_name)?,
            },
        );

        for (index, rule) in rules.iter().enumerate() {
            let rule_since = rule.active_since_kind.resolve_to_utc(
                rule.active_since,
                epoch.standard_offset_seconds,
                previous_savings,
            );
            let epoch_until = epoch.until_kind.resolve_to_utc(
                epoch.until,
                epoch.standard_offset_seconds,
                previous_savings,
            );

            if rule_since >= epoch_until {
                // The bundle is sorted: every later rule is out of this
                // epoch's window too.
                previous_savings = rule.save_seconds;
                break;
            }
            if rule_since <= cursor {
                // Already elapsed before this epoch's window opened;
                // only its savings survive as carried state.
                previous_savings = rule.save_seconds;
                continue;
            }

            cursor = rule_since;
            push_range(
                &mut ranges,
                TimeRange {
                    since: cursor,
                    offset_seconds: epoch.standard_offset_seconds + rule.save_seconds,
                    abbreviation: format_abbreviation(
                        &epoch.format,
                        Some(rule),
                        &bundle.name,
                        file_name,
                    )?,
                },
            );

            // The sort above is only trustworthy at day granularity;
            // rules switching within 48 hours of each other could have
            // been ordered wrong.
            if let Some(next) = rules.get(index + 1) {
                let next_since = next.active_since_kind.resolve_to_utc(
                    next.active_since,
                    epoch.standard_offset_seconds,
                    rule.save_seconds,
                );
                if next_since - rule_since < 2 * SECONDS_PER_DAY {
                    return Err(TzRangeError::SuspectOrdering(format!(
                        "rules {index} and {} of bundle '{}' switch within 48 hours \
                         (zone '{}' in '{file_name}')",
                        index + 1,
                        epoch.rule,
                        bundle.name
                    )));
                }
            }

            previous_savings = rule.save_seconds;
        }

        let epoch_until = epoch.until_kind.resolve_to_utc(
            epoch.until,
            epoch.standard_offset_seconds,
            previous_savings,
        );
        if cursor < epoch_until {
            cursor = epoch_until;
        } else if cursor != BEGIN_OF_TIME {
            return Err(TzRangeError::MalformedDeclaration(format!(
                "epochs of zone '{}' are not in chronological order (in '{file_name}')",
                bundle.name
            )));
        }
    }

    Ok(ranges)
}

/// Sorts a rule bundle chronologically as seen from `epoch`, or, if an
/// earlier epoch already sorted it, verifies the order still holds
/// under this epoch's standard offset. Standard offsets differing by
/// more than a day between epochs can reorder `lastSun`-style rules.
fn sort_or_verify(
    bundle: &mut RuleBundle,
    epoch: &ZoneEpoch,
    zone_name: &str,
    file_name: &str,
) -> Result<()> {
    let standard_offset = epoch.standard_offset_seconds;
    if !bundle.sorted {
        bundle.rules.sort_by_key(|rule| {
            rule.active_since_kind
                .resolve_to_utc(rule.active_since, standard_offset, 0)
        });
        bundle.sorted = true;
        return Ok(());
    }

    for (index, pair) in bundle.rules.windows(2).enumerate() {
        let a = pair[0]
            .active_since_kind
            .resolve_to_utc(pair[0].active_since, standard_offset, 0);
        let b = pair[1]
            .active_since_kind
            .resolve_to_utc(pair[1].active_since, standard_offset, 0);
        if b < a {
            return Err(TzRangeError::SuspectOrdering(format!(
                "bundle '{}' sorts differently under zone '{zone_name}' \
                 (rules {index} and {}, in '{file_name}')",
                bundle.name,
                index + 1
            )));
        }
    }
    Ok(())
}

/// Renders a zone's abbreviation format against the active rule (or
/// none, for an epoch boundary).
fn format_abbreviation(
    format: &str,
    rule: Option<&ParsedRule>,
    zone_name: &str,
    file_name: &str,
) -> Result<String> {
    let savings = rule.map_or(0, |rule| rule.save_seconds);

    let abbreviation = if let Some(slash) = interior_slash(format) {
        // STD/DST alternatives, e.g. "CET/CEST".
        if savings != 0 {
            format[slash + 1..].to_string()
        } else {
            format[..slash].to_string()
        }
    } else if format.contains('%') {
        let letter = rule.map_or("", |rule| rule.letter.as_str());
        let mut out = String::with_capacity(format.len() + letter.len());
        let bytes = format.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'%' {
                match bytes.get(i + 1) {
                    Some(b's') => out.push_str(letter),
                    Some(b'%') => out.push('%'),
                    _ => {
                        return Err(TzRangeError::MalformedDeclaration(format!(
                            "unsupported % escape in abbreviation format '{format}' \
                             (zone '{zone_name}' in '{file_name}')"
                        )));
                    }
                }
                i += 2;
            } else {
                out.push(char::from(bytes[i]));
                i += 1;
            }
        }
        out
    } else {
        format.to_string()
    };

    if abbreviation.len() > MAX_ABBREVIATION {
        return Err(TzRangeError::Overflow(format!(
            "abbreviation '{abbreviation}' exceeds {MAX_ABBREVIATION} bytes \
             (zone '{zone_name}' in '{file_name}')"
        )));
    }
    Ok(abbreviation)
}

fn interior_slash(format: &str) -> Option<usize> {
    format
        .find('/')
        .filter(|&index| index > 0 && index < format.len() - 1)
}

/// Creates one aliased zone per `Link`, sharing the main zone's range
/// table.
fn resolve_links(links: &[Link], timezones: &mut Vec<Timezone>) -> Result<()> {
    let zone_count_before_links = timezones.len();
    for link in links {
        let alias = {
            let main = timezones[..zone_count_before_links]
                .iter()
                .find(|zone| zone.name == link.main)
                .ok_or_else(|| {
                    TzRangeError::UnresolvedReference(format!(
                        "link alias '{}' references unknown zone '{}'",
                        link.alias, link.main
                    ))
                })?;
            Timezone {
                name: bounded(&link.alias, MAX_ZONE_NAME, "zone name", "Link")?,
                alias_of: Some(main.name.clone()),
                coordinate_latitude_seconds: 0,
                coordinate_longitude_seconds: 0,
                ranges: Arc::clone(&main.ranges),
            }
        };
        timezones.push(alias);
    }
    Ok(())
}

/// Internal-consistency assertions on the finished zone table; see the
/// range invariants in the crate documentation.
fn validate_zone_table(timezones: &[Timezone]) {
    for zone in timezones {
        assert!(
            !zone.ranges.is_empty(),
            "zone '{}' compiled to an empty range table",
            zone.name
        );
        assert_eq!(
            zone.ranges[0].since, BEGIN_OF_TIME,
            "zone '{}' does not start at the beginning of time",
            zone.name
        );
        for pair in zone.ranges.windows(2) {
            assert!(
                pair[0].since < pair[1].since,
                "zone '{}' has non-increasing ranges",
                zone.name
            );
            assert!(
                pair[0].offset_seconds != pair[1].offset_seconds
                    || pair[0].abbreviation != pair[1].abbreviation,
                "zone '{}' has redundant adjacent ranges",
                zone.name
            );
        }
    }
    for pair in timezones.windows(2) {
        assert!(
            pair[0].name != pair[1].name,
            "duplicate zone name '{}'",
            pair[0].name
        );
    }
}

/// Parses `iso3166.tab` into the country table, inserting injected
/// alias countries next to their mains.
fn parse_countries(
    file_name: &str,
    text: &str,
    options: &CompileOptions,
) -> Result<Vec<Country>> {
    let mut countries = Vec::new();
    let mut src = text;
    while let Some(raw_line) = next_line(&mut src) {
        let mut line = raw_line;
        let code = next_token(&mut line);
        let name = next_text(&mut line);
        if name.is_empty() {
            return Err(malformed(file_name, raw_line, "expected country name"));
        }

        countries.push(Country {
            code: bounded(code, COUNTRY_CODE_LEN, "country code", file_name)?,
            name: bounded(name, MAX_COUNTRY_NAME, "country name", file_name)?,
            zones: Vec::new(),
        });

        for alias in &options.country_aliases {
            if alias.main_code == code {
                countries.push(Country {
                    code: bounded(&alias.alias_code, COUNTRY_CODE_LEN, "country code", "alias")?,
                    name: bounded(&alias.alias_name, MAX_COUNTRY_NAME, "country name", "alias")?,
                    zones: Vec::new(),
                });
            }
        }
    }
    Ok(countries)
}

/// Parses `zone1970.tab`: writes each row's coordinates onto the named
/// zone and appends the zone to every listed country.
///
/// Both lookup tables must already be sorted.
fn attach_country_zones(
    file_name: &str,
    text: &str,
    timezones: &mut [Timezone],
    countries: &mut [Country],
) -> Result<()> {
    let mut src = text;
    while let Some(raw_line) = next_line(&mut src) {
        let mut line = raw_line;
        let codes = next_token(&mut line);
        let coordinates = next_token(&mut line);
        if coordinates.is_empty() {
            return Err(malformed(
                file_name,
                raw_line,
                "expected coordinates after country codes",
            ));
        }
        let zone_name = next_token(&mut line);
        if zone_name.is_empty() {
            return Err(malformed(
                file_name,
                raw_line,
                "expected zone name after coordinates",
            ));
        }
        // Anything after the zone name is a comment column.

        let zone_index = timezones
            .binary_search_by(|zone| zone.name.as_str().cmp(zone_name))
            .map_err(|_| unresolved(file_name, raw_line, format!("unknown zone '{zone_name}'")))?;
        let (latitude, longitude) = parse_latlong(coordinates)
            .ok_or_else(|| malformed(file_name, raw_line, "bad coordinates"))?;
        timezones[zone_index].coordinate_latitude_seconds = latitude;
        timezones[zone_index].coordinate_longitude_seconds = longitude;

        for code in codes.split(',') {
            if code.is_empty() {
                continue;
            }
            let country_index = countries
                .binary_search_by(|country| country.code.as_str().cmp(code))
                .map_err(|_| {
                    unresolved(file_name, raw_line, format!("unknown country code '{code}'"))
                })?;
            countries[country_index].zones.push(zone_index);
        }
    }
    Ok(())
}

fn unresolved(file: &str, line: &str, message: impl Into<String>) -> TzRangeError {
    TzRangeError::UnresolvedReference(format!(
        "{} ({}: \"{}\")",
        message.into(),
        file,
        line.trim()
    ))
}

/// Applies the caller-supplied tables: alias countries take over their
/// main's zone list, then default-zone overrides move the named zone to
/// the front of its country's list.
fn apply_injected_tables(
    options: &CompileOptions,
    countries: &mut [Country],
    timezones: &[Timezone],
) -> Result<()> {
    for alias in &options.country_aliases {
        let Ok(main_index) = countries
            .binary_search_by(|country| country.code.as_str().cmp(&alias.main_code))
        else {
            continue;
        };
        let zones = countries[main_index].zones.clone();
        if let Ok(alias_index) =
            countries.binary_search_by(|country| country.code.as_str().cmp(&alias.alias_code))
        {
            countries[alias_index].zones = zones;
        }
    }

    for override_entry in &options.default_zone_overrides {
        let country_index = countries
            .binary_search_by(|country| country.code.as_str().cmp(&override_entry.country_code))
            .map_err(|_| {
                TzRangeError::UnresolvedReference(format!(
                    "default-zone override names unknown country '{}'",
                    override_entry.country_code
                ))
            })?;
        let country = &mut countries[country_index];
        let position = country
            .zones
            .iter()
            .position(|&zone_index| timezones[zone_index].name == override_entry.zone_name)
            .ok_or_else(|| {
                TzRangeError::UnresolvedReference(format!(
                    "country '{}' does not include zone '{}' named by a default-zone override",
                    override_entry.country_code, override_entry.zone_name
                ))
            })?;
        country.zones[..=position].rotate_right(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{Date, END_OF_TIME, instant_from_date};
    use crate::models::DateKind;

    fn ymd(year: i32, month: u32, day: u32) -> i64 {
        instant_from_date(&Date::from_ymd(year, month, day)).unwrap()
    }

    fn compile_zones_from(text: &str) -> Result<Vec<Timezone>> {
        let mut parsed = parse_source_file("test", text, 2030)?;
        let links = std::mem::take(&mut parsed.links);
        let mut timezones = Vec::new();
        compile_file_zones("test", &mut parsed, &links, &mut timezones)?;
        Ok(timezones)
    }

    #[test]
    fn fixed_zone_compiles_to_single_sentinel() {
        let zones = compile_zones_from("Zone\tEtc/Fixed\t5:30\t-\t+0530\n").unwrap();
        assert_eq!(zones.len(), 1);
        let ranges = &zones[0].ranges;
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].since, BEGIN_OF_TIME);
        assert_eq!(ranges[0].offset_seconds, 5 * 3600 + 1800);
        assert_eq!(ranges[0].abbreviation, "+0530");
    }

    #[test]
    fn rule_less_epoch_chain_emits_boundary_ranges() {
        let text = "\
Zone\tPacific/Skip\t-10:29:20\t-\tLMT\t1901
\t\t\t-10:40\t-\t-1040\t1979 Oct
\t\t\t-10:00\t-\t-10\t1994 Dec 31
\t\t\t14:00\t-\t+14
";
        let zones = compile_zones_from(text).unwrap();
        let ranges = &zones[0].ranges;
        assert_eq!(ranges.len(), 4);
        assert_eq!(ranges[0].abbreviation, "LMT");
        assert_eq!(ranges[1].offset_seconds, -(10 * 3600 + 40 * 60));
        assert_eq!(ranges[2].offset_seconds, -10 * 3600);
        assert_eq!(ranges[3].offset_seconds, 14 * 3600);
        // The day-skip: +24 hours exactly, at local 1994-12-31 00:00.
        assert_eq!(ranges[3].offset_seconds - ranges[2].offset_seconds, 86_400);
        assert_eq!(ranges[3].since, ymd(1994, 12, 31) + 10 * 3600);
    }

    #[test]
    fn dst_rules_interleave_with_epochs() {
        let text = "\
Rule\tEU\t1977\t1980\t-\tApr\tSun>=1\t 1:00u\t1:00\tS
Rule\tEU\t1977\tonly\t-\tSep\tlastSun\t 1:00u\t0\t-
Rule\tEU\t1978\tonly\t-\tOct\t 1\t 1:00u\t0\t-
Rule\tEU\t1979\t1995\t-\tSep\tlastSun\t 1:00u\t0\t-
Rule\tEU\t1981\tmax\t-\tMar\tlastSun\t 1:00u\t1:00\tS
Rule\tEU\t1996\tmax\t-\tOct\tlastSun\t 1:00u\t0\t-
Zone\tEurope/Testburg\t0:53:28\t-\tLMT\t1893 Apr
\t\t\t1:00\t-\tCET\t1980
\t\t\t1:00\tEU\tCE%sT
";
        let zones = compile_zones_from(text).unwrap();
        let ranges = &zones[0].ranges;

        assert_eq!(ranges[0].abbreviation, "LMT");
        assert_eq!(ranges[0].offset_seconds, 3208);
        // The 1980 epoch boundary repeats CET +1:00 and is suppressed;
        // the first emitted transition under EU rules is spring 1980.
        assert_eq!(ranges[1].abbreviation, "CET");
        assert_eq!(ranges[1].since, ymd(1893, 4, 1) - 3208);
        assert_eq!(ranges[2].abbreviation, "CEST");
        assert_eq!(ranges[2].since, ymd(1980, 4, 6) + 3600);
        assert_eq!(ranges[2].offset_seconds, 7200);

        // 2021: spring forward March 28 01:00 UTC, fall back
        // October 31 01:00 UTC.
        assert!(ranges.iter().any(|r| r.since == 1_616_893_200 && r.offset_seconds == 7200));
        assert!(ranges.iter().any(|r| r.since == 1_635_642_000 && r.offset_seconds == 3600));

        // Strict alternation after 1980: never two equal neighbours.
        for pair in ranges.windows(2) {
            assert_ne!(pair[0].offset_seconds, pair[1].offset_seconds);
        }
    }

    #[test]
    fn slash_format_picks_side_by_savings() {
        let text = "\
Rule\tAlt\t1990\tmax\t-\tApr\t1\t2:00\t1:00\t-
Rule\tAlt\t1990\tmax\t-\tOct\t1\t2:00\t0\t-
Zone\tTest/Slash\t1:00\tAlt\tXST/XDT
";
        let zones = compile_zones_from(text).unwrap();
        let ranges = &zones[0].ranges;
        assert_eq!(ranges[0].abbreviation, "XST");
        assert_eq!(ranges[1].abbreviation, "XDT");
        assert_eq!(ranges[2].abbreviation, "XST");
    }

    #[test]
    fn unknown_rule_bundle_is_unresolved() {
        let err = compile_zones_from("Zone\tTest/Broken\t1:00\tNoSuch\tX\n").unwrap_err();
        assert!(matches!(err, TzRangeError::UnresolvedReference(_)));
        assert!(err.to_string().contains("NoSuch"));
    }

    #[test]
    fn oversized_abbreviation_overflows() {
        let err = compile_zones_from("Zone\tTest/Wide\t1:00\t-\tTOOWIDE\n").unwrap_err();
        assert!(matches!(err, TzRangeError::Overflow(_)));
    }

    #[test]
    fn rules_switching_within_two_days_are_suspect() {
        let text = "\
Rule\tClose\t2000\tonly\t-\tMar\t1\t0:00\t1:00\tD
Rule\tClose\t2000\tonly\t-\tMar\t2\t0:00\t0\tS
Zone\tTest/Close\t0:00\tClose\tX%sT
";
        let err = compile_zones_from(text).unwrap_err();
        assert!(matches!(err, TzRangeError::SuspectOrdering(_)));
    }

    #[test]
    fn format_abbreviation_variants() {
        let rule = ParsedRule {
            active_since: 0,
            active_since_kind: DateKind::Wall,
            save_seconds: 3600,
            letter: "S".to_string(),
        };
        assert_eq!(format_abbreviation("CE%sT", None, "z", "f").unwrap(), "CET");
        assert_eq!(
            format_abbreviation("CE%sT", Some(&rule), "z", "f").unwrap(),
            "CEST"
        );
        assert_eq!(format_abbreviation("EST/EDT", None, "z", "f").unwrap(), "EST");
        assert_eq!(
            format_abbreviation("EST/EDT", Some(&rule), "z", "f").unwrap(),
            "EDT"
        );
        assert_eq!(format_abbreviation("+14", None, "z", "f").unwrap(), "+14");
        assert_eq!(format_abbreviation("%%", None, "z", "f").unwrap(), "%");
        assert!(matches!(
            format_abbreviation("ABCDEF", None, "z", "f"),
            Err(TzRangeError::Overflow(_))
        ));
    }

    #[test]
    fn sentinel_abbreviation_uses_no_substitution() {
        let text = "\
Rule\tR\t2000\tmax\t-\tApr\t1\t2:00\t1:00\tD
Rule\tR\t2000\tmax\t-\tOct\t1\t2:00\t0\tS
Zone\tTest/Subst\t-5:00\tR\tE%sT
";
        let zones = compile_zones_from(text).unwrap();
        // No rule is active at the beginning of time: bare %s yields
        // "ET", not "EST".
        assert_eq!(zones[0].ranges[0].abbreviation, "ET");
        assert_eq!(zones[0].ranges[0].since, BEGIN_OF_TIME);
    }

    #[test]
    fn linked_alias_shares_ranges() {
        let mut parsed = parse_source_file(
            "test",
            "Zone\tMain/Zone\t2:00\t-\tMMT\nLink\tMain/Zone\tAlias/Zone\n",
            2030,
        )
        .unwrap();
        let links = std::mem::take(&mut parsed.links);
        let mut timezones = Vec::new();
        compile_file_zones("test", &mut parsed, &links, &mut timezones).unwrap();
        resolve_links(&links, &mut timezones).unwrap();

        assert_eq!(timezones.len(), 2);
        assert_eq!(timezones[1].name, "Alias/Zone");
        assert_eq!(timezones[1].alias_of.as_deref(), Some("Main/Zone"));
        assert!(Arc::ptr_eq(&timezones[0].ranges, &timezones[1].ranges));
    }

    #[test]
    fn link_to_unknown_zone_is_unresolved() {
        let links = vec![Link {
            main: "No/Such".to_string(),
            alias: "Alias/Zone".to_string(),
        }];
        let err = resolve_links(&links, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, TzRangeError::UnresolvedReference(_)));
    }

    #[test]
    fn terminal_epoch_reaches_end_of_time() {
        let zones = compile_zones_from("Zone\tTest/Terminal\t0:00\t-\tUTC\n").unwrap();
        let parsed = parse_source_file("test", "Zone\tTest/Terminal\t0:00\t-\tUTC\n", 2030).unwrap();
        assert_eq!(parsed.zones[0].epochs[0].until, END_OF_TIME);
        assert_eq!(zones[0].ranges.len(), 1);
    }
}
