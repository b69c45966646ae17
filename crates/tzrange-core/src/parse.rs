//! Line-oriented parser for the zic declaration language.
//!
//! Each continent source file yields three collections: rule bundles
//! (one `Rule` line expanded into one entry per year it covers), zone
//! bundles (the ordered epochs of each multi-line `Zone` entry) and
//! `Link` declarations. Rules and zones are scoped to their file; links
//! are resolved globally after compilation.

use crate::calendar::{Date, END_OF_TIME, Instant, SECONDS_PER_DAY, date_from_instant, instant_from_date};
use crate::error::{Result, TzRangeError};
use crate::models::DateKind;
use crate::scan::{
    Token, accept, next_line, next_token, parse_hms_signed, parse_hms_with_kind, parse_month,
    parse_unsigned, parse_weekday, parse_year, peek,
};

/// One expanded year of a `Rule` line.
#[derive(Debug, Clone)]
pub(crate) struct ParsedRule {
    /// When the rule takes effect, tagged with its interpretation.
    pub(crate) active_since: Instant,
    pub(crate) active_since_kind: DateKind,
    /// Offset to add on top of the zone's standard offset while active.
    pub(crate) save_seconds: i32,
    /// Substitution for `%s` in the zone's abbreviation format.
    pub(crate) letter: String,
}

/// All expanded rules sharing one name.
#[derive(Debug, Clone)]
pub(crate) struct RuleBundle {
    pub(crate) name: String,
    pub(crate) rules: Vec<ParsedRule>,
    /// Set once the range compiler has sorted the bundle under the
    /// first epoch that uses it.
    pub(crate) sorted: bool,
}

/// One line of a `Zone` entry.
#[derive(Debug, Clone)]
pub(crate) struct ZoneEpoch {
    /// When the epoch ends; `END_OF_TIME` (kind UTC) for the terminal
    /// epoch.
    pub(crate) until: Instant,
    pub(crate) until_kind: DateKind,
    pub(crate) standard_offset_seconds: i32,
    /// Name of the rule bundle in effect, empty for none (a `-` rule
    /// field, or a constant offset already folded into the standard
    /// offset).
    pub(crate) rule: String,
    pub(crate) format: String,
}

/// A named zone and its epochs, in declaration order.
#[derive(Debug, Clone)]
pub(crate) struct ZoneBundle {
    pub(crate) name: String,
    pub(crate) epochs: Vec<ZoneEpoch>,
}

/// A `Link MAIN ALIAS` declaration.
#[derive(Debug, Clone)]
pub(crate) struct Link {
    pub(crate) main: String,
    pub(crate) alias: String,
}

/// Everything parsed out of one continent source file.
#[derive(Debug, Default)]
pub(crate) struct SourceFile {
    pub(crate) rules: Vec<RuleBundle>,
    pub(crate) zones: Vec<ZoneBundle>,
    pub(crate) links: Vec<Link>,
}

/// Attaches archive-member and source-line context to a parse failure.
pub(crate) fn malformed(file: &str, line: &str, message: impl Into<String>) -> TzRangeError {
    TzRangeError::MalformedDeclaration(format!(
        "{} ({}: \"{}\")",
        message.into(),
        file,
        line.trim()
    ))
}

/// The day-of-month selector of a rule or UNTIL field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DayRule {
    /// A plain day number.
    OnDay(u32),
    /// Earliest day >= `day` falling on `weekday` (`Sun>=8`; a bare
    /// weekday means `>= 1`).
    WeekdayOnOrAfter { weekday: u32, day: u32 },
    /// Latest day <= `day` falling on `weekday` (`Sun<=25`; `lastSun`
    /// means `<= 31`, clamped to the month's length).
    WeekdayOnOrBefore { weekday: u32, day: u32 },
}

impl DayRule {
    pub(crate) fn parse(token: &str) -> Option<DayRule> {
        if let Some(day) = parse_unsigned(token) {
            return (day <= 31).then_some(DayRule::OnDay(day));
        }
        if let Some(rest) = token.strip_prefix("last") {
            let weekday = parse_weekday(rest)?;
            return Some(DayRule::WeekdayOnOrBefore { weekday, day: 31 });
        }
        if token.len() < 3 {
            return None;
        }
        let (name, rest) = token.split_at(3);
        let weekday = parse_weekday(name)?;
        if rest.is_empty() {
            return Some(DayRule::WeekdayOnOrAfter { weekday, day: 1 });
        }
        if let Some(day_token) = rest.strip_prefix(">=") {
            let day = parse_unsigned(day_token).filter(|&d| d <= 31)?;
            return Some(DayRule::WeekdayOnOrAfter { weekday, day });
        }
        if let Some(day_token) = rest.strip_prefix("<=") {
            let day = parse_unsigned(day_token).filter(|&d| d <= 31)?;
            return Some(DayRule::WeekdayOnOrBefore { weekday, day });
        }
        None
    }

    /// Resolves the selector to the midnight instant of the matching
    /// day within `(year, month)`.
    pub(crate) fn resolve(self, year: i32, month: u32) -> Option<Instant> {
        match self {
            DayRule::OnDay(day) => instant_from_date(&Date::from_ymd(year, month, day)),
            DayRule::WeekdayOnOrAfter { weekday, day } => {
                let base = instant_from_date(&Date::from_ymd(year, month, day))?;
                (0..7)
                    .map(|offset| base + offset * SECONDS_PER_DAY)
                    .find(|&t| date_from_instant(t).week_day == weekday)
            }
            DayRule::WeekdayOnOrBefore { weekday, day } => {
                // The day may exceed the month's length (lastSun in
                // February); back down to the last valid day first.
                let base = (0..=3).find_map(|back| {
                    let day = day.checked_sub(back)?;
                    instant_from_date(&Date::from_ymd(year, month, day))
                })?;
                (0..7)
                    .map(|offset| base - offset * SECONDS_PER_DAY)
                    .find(|&t| date_from_instant(t).week_day == weekday)
            }
        }
    }
}

/// Parses one continent source file.
pub(crate) fn parse_source_file(file_name: &str, text: &str, max_year: u32) -> Result<SourceFile> {
    let mut parsed = SourceFile::default();
    let mut src = text;
    while let Some(raw_line) = next_line(&mut src) {
        let mut line = raw_line;
        match next_token(&mut line) {
            "Rule" => parse_rule_line(&mut line, &mut parsed.rules, max_year)
                .map_err(|message| malformed(file_name, raw_line, message))?,
            "Zone" => parse_zone_entry(line, &mut src, &mut parsed.zones, file_name, raw_line)?,
            "Link" => parse_link_line(&mut line, &mut parsed.links)
                .map_err(|message| malformed(file_name, raw_line, message))?,
            other => {
                return Err(malformed(
                    file_name,
                    raw_line,
                    format!("unknown command '{other}'"),
                ));
            }
        }
    }

    log::debug!(
        "{}: {} rule bundles, {} zones, {} links",
        file_name,
        parsed.rules.len(),
        parsed.zones.len(),
        parsed.links.len()
    );
    Ok(parsed)
}

fn parse_rule_line(
    line: &mut &str,
    bundles: &mut Vec<RuleBundle>,
    max_year: u32,
) -> std::result::Result<(), String> {
    if !peek(line, Token::Word) {
        return Err("missing rule name".to_string());
    }
    let name = next_token(line);

    let from_year = parse_year(next_token(line)).ok_or("rule FROM year missing or out of range")?;
    let to_token = next_token(line);
    let to_year = match to_token {
        "only" => from_year,
        "max" => max_year,
        _ => parse_year(to_token).ok_or("rule TO year missing or out of range")?,
    };

    if !accept(line, "-") {
        return Err("expected '-' between rule TO year and month".to_string());
    }

    let month = parse_month(next_token(line)).ok_or("bad rule month")?;
    let day_rule = DayRule::parse(next_token(line)).ok_or("bad rule day selector")?;
    let (at_seconds, active_since_kind) =
        parse_hms_with_kind(next_token(line)).ok_or("bad rule AT time")?;
    let save_seconds = parse_hms_signed(next_token(line)).ok_or("bad rule SAVE duration")?;

    let letter = match next_token(line) {
        "-" => String::new(),
        "" => return Err("missing rule abbreviation substitution".to_string()),
        token => token.to_string(),
    };

    if !next_token(line).is_empty() {
        return Err("trailing garbage after rule declaration".to_string());
    }

    let index = match bundles.iter().position(|bundle| bundle.name == name) {
        Some(index) => index,
        None => {
            bundles.push(RuleBundle {
                name: name.to_string(),
                rules: Vec::new(),
                sorted: false,
            });
            bundles.len() - 1
        }
    };

    for year in from_year..=to_year {
        let day_instant = day_rule.resolve(year as i32, month).ok_or_else(|| {
            format!("rule day selector never matches in {year:04}-{month:02}")
        })?;
        bundles[index].rules.push(ParsedRule {
            active_since: day_instant + i64::from(at_seconds),
            active_since_kind,
            save_seconds,
            letter: letter.clone(),
        });
    }
    Ok(())
}

fn parse_zone_entry(
    first_line_rest: &str,
    src: &mut &str,
    zones: &mut Vec<ZoneBundle>,
    file_name: &str,
    first_raw_line: &str,
) -> Result<()> {
    let mut line = first_line_rest;
    if !peek(line, Token::Word) {
        return Err(malformed(file_name, first_raw_line, "missing zone name"));
    }
    let name = next_token(&mut line);

    let index = match zones.iter().position(|bundle| bundle.name == name) {
        Some(index) => index,
        None => {
            zones.push(ZoneBundle {
                name: name.to_string(),
                epochs: Vec::new(),
            });
            zones.len() - 1
        }
    };

    let mut raw_line = first_raw_line;
    loop {
        let (epoch, terminal) = parse_zone_epoch(&mut line)
            .map_err(|message| malformed(file_name, raw_line, message))?;
        zones[index].epochs.push(epoch);
        if terminal {
            return Ok(());
        }

        raw_line = match next_line(src) {
            Some(next) => next,
            None => {
                return Err(malformed(
                    file_name,
                    raw_line,
                    "zone entry not closed by an epoch with an empty UNTIL",
                ));
            }
        };
        line = raw_line;
    }
}

/// Parses one epoch line (everything after the zone name). Returns the
/// epoch and whether it was the terminal one (empty UNTIL).
fn parse_zone_epoch(line: &mut &str) -> std::result::Result<(ZoneEpoch, bool), String> {
    let mut standard_offset_seconds =
        parse_hms_signed(next_token(line)).ok_or("bad zone standard offset")?;

    let rule_token = next_token(line);
    let rule = if rule_token == "-" {
        String::new()
    } else if rule_token.is_empty() {
        return Err("missing zone rule field".to_string());
    } else if let Some(constant) = parse_hms_signed(rule_token) {
        // A constant savings duration folds into the standard offset.
        standard_offset_seconds += constant;
        String::new()
    } else {
        rule_token.to_string()
    };

    let format = next_token(line);
    if format.is_empty() {
        return Err("missing zone abbreviation format".to_string());
    }
    validate_format(format)?;
    let format = format.to_string();

    if peek(line, Token::EndOfLine) {
        let epoch = ZoneEpoch {
            until: END_OF_TIME,
            until_kind: DateKind::Utc,
            standard_offset_seconds,
            rule,
            format,
        };
        return Ok((epoch, true));
    }

    let year_token = next_token(line);
    let year = parse_year(year_token).ok_or("bad zone UNTIL year")? as i32;

    let mut month = 1;
    let mut until = None;
    if peek(line, Token::Month) {
        month = parse_month(next_token(line)).ok_or("bad zone UNTIL month")?;

        // The day selector is optional; commit only if the next token
        // parses as one.
        let mut probe = *line;
        let day_token = next_token(&mut probe);
        if let Some(day_rule) = DayRule::parse(day_token) {
            *line = probe;
            until = Some(
                day_rule
                    .resolve(year, month)
                    .ok_or("zone UNTIL day selector never matches that month")?,
            );
        }
    }
    let mut until = match until {
        Some(instant) => instant,
        None => instant_from_date(&Date::from_ymd(year, month, 1)).ok_or("bad zone UNTIL date")?,
    };

    let mut until_kind = DateKind::Wall;
    let time_token = next_token(line);
    if !time_token.is_empty() {
        let (seconds, kind) = parse_hms_with_kind(time_token).ok_or("bad zone UNTIL time")?;
        until += i64::from(seconds);
        until_kind = kind;
    }

    if !next_token(line).is_empty() {
        return Err("trailing garbage after zone epoch".to_string());
    }

    let epoch = ZoneEpoch {
        until,
        until_kind,
        standard_offset_seconds,
        rule,
        format,
    };
    Ok((epoch, false))
}

fn parse_link_line(line: &mut &str, links: &mut Vec<Link>) -> std::result::Result<(), String> {
    if !peek(line, Token::Word) {
        return Err("missing link main zone name".to_string());
    }
    let main = next_token(line).to_string();
    if !peek(line, Token::Word) {
        return Err("missing link alias name".to_string());
    }
    let alias = next_token(line).to_string();
    if !next_token(line).is_empty() {
        return Err("trailing garbage after link declaration".to_string());
    }
    links.push(Link { main, alias });
    Ok(())
}

/// Every `%` in an abbreviation format must introduce `%s` or `%%`.
fn validate_format(format: &str) -> std::result::Result<(), String> {
    let bytes = format.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            match bytes.get(i + 1) {
                Some(b's' | b'%') => i += 2,
                _ => {
                    return Err(format!(
                        "unsupported % escape in abbreviation format '{format}'"
                    ));
                }
            }
        } else {
            i += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(year: i32, month: u32, day: u32) -> Instant {
        instant_from_date(&Date::from_ymd(year, month, day)).unwrap()
    }

    #[test]
    fn day_rule_forms() {
        assert_eq!(DayRule::parse("23"), Some(DayRule::OnDay(23)));
        assert_eq!(
            DayRule::parse("lastSun"),
            Some(DayRule::WeekdayOnOrBefore { weekday: 0, day: 31 })
        );
        assert_eq!(
            DayRule::parse("Fri"),
            Some(DayRule::WeekdayOnOrAfter { weekday: 5, day: 1 })
        );
        assert_eq!(
            DayRule::parse("Sun>=8"),
            Some(DayRule::WeekdayOnOrAfter { weekday: 0, day: 8 })
        );
        assert_eq!(
            DayRule::parse("Sat<=14"),
            Some(DayRule::WeekdayOnOrBefore { weekday: 6, day: 14 })
        );
        assert_eq!(DayRule::parse("32"), None);
        assert_eq!(DayRule::parse("lastSunday"), None);
        assert_eq!(DayRule::parse("Sun=8"), None);
        assert_eq!(DayRule::parse("Su"), None);
    }

    #[test]
    fn day_rule_resolution() {
        // 2021-03-28 was the last Sunday of that March.
        let last_sun = DayRule::WeekdayOnOrBefore { weekday: 0, day: 31 };
        assert_eq!(last_sun.resolve(2021, 3), Some(ymd(2021, 3, 28)));

        // lastSun in February 2021 clamps 31 down to the 28th, which
        // happened to be a Sunday.
        assert_eq!(last_sun.resolve(2021, 2), Some(ymd(2021, 2, 28)));

        // 2020-03-01 was a Sunday, so Sun>=8 lands on the 8th.
        let sun_after = DayRule::WeekdayOnOrAfter { weekday: 0, day: 8 };
        assert_eq!(sun_after.resolve(2020, 3), Some(ymd(2020, 3, 8)));

        // A bare weekday is the first one of the month.
        let first_sun = DayRule::WeekdayOnOrAfter { weekday: 0, day: 1 };
        assert_eq!(first_sun.resolve(2020, 3), Some(ymd(2020, 3, 1)));

        assert_eq!(DayRule::OnDay(18).resolve(1883, 11), Some(ymd(1883, 11, 18)));
        assert_eq!(DayRule::OnDay(30).resolve(2021, 2), None);
    }

    #[test]
    fn rule_line_expands_per_year() {
        let text = "Rule\tEU\t1981\t1983\t-\tMar\tlastSun\t 1:00u\t1:00\tS\n";
        let parsed = parse_source_file("europe", text, 2500).unwrap();
        assert_eq!(parsed.rules.len(), 1);
        let bundle = &parsed.rules[0];
        assert_eq!(bundle.name, "EU");
        assert!(!bundle.sorted);
        assert_eq!(bundle.rules.len(), 3);
        assert_eq!(
            bundle.rules[0].active_since,
            ymd(1981, 3, 29) + 3600 // last Sunday of March 1981, 01:00
        );
        assert_eq!(bundle.rules[0].active_since_kind, DateKind::Utc);
        assert_eq!(bundle.rules[0].save_seconds, 3600);
        assert_eq!(bundle.rules[0].letter, "S");
    }

    #[test]
    fn rule_to_only_and_max() {
        let text = "\
Rule\tX\t1990\tonly\t-\tJan\t1\t0:00\t0\t-
Rule\tX\t1991\tmax\t-\tJan\t1\t0:00\t1:00\tD
";
        let parsed = parse_source_file("test", text, 1993).unwrap();
        let bundle = &parsed.rules[0];
        // 1990, then 1991..=1993.
        assert_eq!(bundle.rules.len(), 4);
        assert_eq!(bundle.rules[0].letter, "");
        assert_eq!(bundle.rules[0].save_seconds, 0);
    }

    #[test]
    fn zone_entry_with_continuations() {
        let text = "\
Zone\tEurope/Berlin\t0:53:28\t-\tLMT\t1893 Apr
\t\t\t1:00\tC-Eur\tCE%sT\t1945 May 24 2:00
\t\t\t1:00\tEU\tCE%sT
";
        let parsed = parse_source_file("europe", text, 2500).unwrap();
        assert_eq!(parsed.zones.len(), 1);
        let zone = &parsed.zones[0];
        assert_eq!(zone.name, "Europe/Berlin");
        assert_eq!(zone.epochs.len(), 3);

        assert_eq!(zone.epochs[0].standard_offset_seconds, 3208);
        assert_eq!(zone.epochs[0].rule, "");
        assert_eq!(zone.epochs[0].format, "LMT");
        assert_eq!(zone.epochs[0].until, ymd(1893, 4, 1));
        assert_eq!(zone.epochs[0].until_kind, DateKind::Wall);

        assert_eq!(zone.epochs[1].rule, "C-Eur");
        assert_eq!(zone.epochs[1].until, ymd(1945, 5, 24) + 7200);

        assert_eq!(zone.epochs[2].until, END_OF_TIME);
        assert_eq!(zone.epochs[2].until_kind, DateKind::Utc);
    }

    #[test]
    fn zone_constant_rule_field_folds_into_offset() {
        let text = "Zone\tA/B\t5:00\t0:30\t+0530\n";
        let parsed = parse_source_file("asia", text, 2500).unwrap();
        let epoch = &parsed.zones[0].epochs[0];
        assert_eq!(epoch.standard_offset_seconds, 5 * 3600 + 1800);
        assert_eq!(epoch.rule, "");
    }

    #[test]
    fn zone_until_day_and_time_kinds() {
        let text = "\
Zone\tA/B\t1:00\t-\tX\t1980 Apr lastSun 2:00s
\t\t1:00\t-\tY
";
        let parsed = parse_source_file("test", text, 2500).unwrap();
        let epoch = &parsed.zones[0].epochs[0];
        // Last Sunday of April 1980 was the 27th.
        assert_eq!(epoch.until, ymd(1980, 4, 27) + 7200);
        assert_eq!(epoch.until_kind, DateKind::Standard);
    }

    #[test]
    fn unclosed_zone_is_rejected() {
        let text = "Zone\tA/B\t1:00\t-\tX\t1980\n";
        let err = parse_source_file("test", text, 2500).unwrap_err();
        assert!(matches!(err, TzRangeError::MalformedDeclaration(_)));
        assert!(err.to_string().contains("not closed"));
    }

    #[test]
    fn unknown_command_is_rejected() {
        let err = parse_source_file("test", "Zome\tX\n", 2500).unwrap_err();
        assert!(err.to_string().contains("unknown command"));
        assert!(err.to_string().contains("test"));
    }

    #[test]
    fn bad_format_escape_is_rejected() {
        let text = "Zone\tA/B\t1:00\t-\tE%zT\n";
        let err = parse_source_file("test", text, 2500).unwrap_err();
        assert!(err.to_string().contains("% escape"));
    }

    #[test]
    fn links_are_recorded_verbatim() {
        let text = "Link\tEurope/Berlin\tEurope/Busingen\n";
        let parsed = parse_source_file("europe", text, 2500).unwrap();
        assert_eq!(parsed.links.len(), 1);
        assert_eq!(parsed.links[0].main, "Europe/Berlin");
        assert_eq!(parsed.links[0].alias, "Europe/Busingen");
    }

    #[test]
    fn rule_line_errors_name_the_file_and_line() {
        let err = parse_source_file("northamerica", "Rule\tUS\t1600\tonly\t-\tJan\t1\t0\t0\t-\n", 2500)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("FROM year"));
        assert!(message.contains("northamerica"));
        assert!(message.contains("Rule\tUS\t1600"));
    }
}
