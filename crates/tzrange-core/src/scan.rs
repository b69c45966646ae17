//! Lexer primitives for the zic source language and the `.tab` files.
//!
//! All functions operate on `&str` slices that are advanced in place;
//! line extraction, whitespace and `#` comment handling live here, as
//! do the typed token predicates and the small fixed-format parsers
//! (H:M:S durations with their kind suffix, ISO 6709 coordinates).

use crate::models::DateKind;

/// Typed lookahead categories for [`peek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token {
    EndOfLine,
    Word,
    Colon,
    /// Integer in `[1601, 2200]`.
    Year,
    /// Three-letter English month name.
    Month,
    /// Integer in `[0, 31]`.
    DayInMonth,
    /// Three-letter English weekday name.
    Weekday,
}

/// Returns the next non-blank, non-comment line, advancing `src` past
/// it. Returns `None` when the input is exhausted.
pub(crate) fn next_line<'a>(src: &mut &'a str) -> Option<&'a str> {
    while !src.is_empty() {
        let end = src.find(['\n', '\r']).unwrap_or(src.len());
        let line = &src[..end];
        *src = src[end..].trim_start_matches(['\n', '\r']);

        let mut probe = line;
        if !next_token(&mut probe).is_empty() {
            return Some(line);
        }
    }
    None
}

/// Consumes leading whitespace and the next whitespace-delimited token.
/// A token starting with `#` begins a comment: the rest of the line is
/// discarded and an empty token is returned.
pub(crate) fn next_token<'a>(line: &mut &'a str) -> &'a str {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        *line = "";
        return "";
    }
    let end = trimmed
        .find(|c: char| c.is_ascii_whitespace())
        .unwrap_or(trimmed.len());
    let (token, rest) = trimmed.split_at(end);
    *line = rest;
    token
}

/// Consumes the rest of the line up to an embedded `#` comment,
/// trimmed. Used for free-text fields such as country names.
pub(crate) fn next_text<'a>(line: &mut &'a str) -> &'a str {
    let trimmed = line.trim_start();
    let end = trimmed.find('#').unwrap_or(trimmed.len());
    *line = "";
    trimmed[..end].trim_end()
}

/// Consumes the next token only if it equals `expected`.
pub(crate) fn accept(line: &mut &str, expected: &str) -> bool {
    let mut probe = *line;
    if next_token(&mut probe) == expected {
        *line = probe;
        return true;
    }
    false
}

/// Non-destructive typed lookahead at the next token.
pub(crate) fn peek(line: &str, kind: Token) -> bool {
    let mut probe = line;
    let token = next_token(&mut probe);
    if token.is_empty() {
        return kind == Token::EndOfLine;
    }
    match kind {
        Token::EndOfLine => false,
        Token::Word => true,
        Token::Colon => token.starts_with(':'),
        Token::Year => parse_year(token).is_some(),
        Token::Month => parse_month(token).is_some(),
        Token::DayInMonth => parse_unsigned(token).is_some_and(|n| n <= 31),
        Token::Weekday => parse_weekday(token).is_some(),
    }
}

/// Parses an unsigned decimal integer, tolerating a leading `+`.
pub(crate) fn parse_unsigned(token: &str) -> Option<u32> {
    let digits = token.strip_prefix('+').unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Parses a year token in the range the source files may contain.
pub(crate) fn parse_year(token: &str) -> Option<u32> {
    parse_unsigned(token).filter(|&year| (1601..=2200).contains(&year))
}

/// Parses a three-letter English month name. January is 1.
pub(crate) fn parse_month(token: &str) -> Option<u32> {
    let month = match token {
        "Jan" => 1,
        "Feb" => 2,
        "Mar" => 3,
        "Apr" => 4,
        "May" => 5,
        "Jun" => 6,
        "Jul" => 7,
        "Aug" => 8,
        "Sep" => 9,
        "Oct" => 10,
        "Nov" => 11,
        "Dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Parses a three-letter English weekday name. Sunday is 0.
pub(crate) fn parse_weekday(token: &str) -> Option<u32> {
    let weekday = match token {
        "Sun" => 0,
        "Mon" => 1,
        "Tue" => 2,
        "Wed" => 3,
        "Thu" => 4,
        "Fri" => 5,
        "Sat" => 6,
        _ => return None,
    };
    Some(weekday)
}

fn take_number<'a>(rest: &mut &'a str) -> Option<u32> {
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    let (digits, tail) = rest.split_at(end);
    *rest = tail;
    digits.parse().ok()
}

/// Parses `H`, `H:M` or `H:M:S` into seconds.
///
/// Hours above 47 are rejected: the source language allows times past
/// 24:00, but nothing legitimate wraps two whole days.
pub(crate) fn parse_hms(token: &str) -> Option<u32> {
    let mut rest = token;
    let hours = take_number(&mut rest)?;
    if hours > 47 {
        return None;
    }
    let mut minutes = 0;
    let mut seconds = 0;
    if let Some(tail) = rest.strip_prefix(':') {
        rest = tail;
        minutes = take_number(&mut rest)?;
        if minutes > 60 {
            return None;
        }
        if let Some(tail) = rest.strip_prefix(':') {
            rest = tail;
            seconds = take_number(&mut rest)?;
            if seconds > 60 {
                return None;
            }
        }
    }
    if !rest.is_empty() {
        return None;
    }
    Some(hours * 3600 + minutes * 60 + seconds)
}

/// Parses an `H[:M[:S]]` time-of-day with its trailing kind suffix:
/// `s` → standard, `u`/`g`/`z` → UTC, `w` or nothing → wall.
pub(crate) fn parse_hms_with_kind(token: &str) -> Option<(u32, DateKind)> {
    let (body, kind) = match token.as_bytes().last() {
        Some(b's') => (&token[..token.len() - 1], DateKind::Standard),
        Some(b'u' | b'g' | b'z') => (&token[..token.len() - 1], DateKind::Utc),
        Some(b'w') => (&token[..token.len() - 1], DateKind::Wall),
        _ => (token, DateKind::Wall),
    };
    parse_hms(body).map(|seconds| (seconds, kind))
}

/// Parses a signed `H[:M[:S]]` duration into seconds.
pub(crate) fn parse_hms_signed(token: &str) -> Option<i32> {
    let (sign, body) = match token.as_bytes().first() {
        Some(b'-') => (-1, &token[1..]),
        Some(b'+') => (1, &token[1..]),
        _ => (1, token),
    };
    parse_hms(body).map(|seconds| sign * seconds as i32)
}

fn take_digits(rest: &mut &str, count: usize) -> Option<u32> {
    if rest.len() < count || !rest.as_bytes()[..count].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let (digits, tail) = rest.split_at(count);
    *rest = tail;
    digits.parse().ok()
}

/// Parses an ISO 6709 `±DDMM[SS]±DDDMM[SS]` coordinate pair into
/// signed arc-seconds. The seconds field of each half may have zero,
/// one or two digits.
pub(crate) fn parse_latlong(token: &str) -> Option<(i32, i32)> {
    let mut rest = token;
    let mut out = [0i32; 2];
    for (index, value) in out.iter_mut().enumerate() {
        let sign = match rest.as_bytes().first() {
            Some(b'+') => 1,
            Some(b'-') => -1,
            _ => return None,
        };
        rest = &rest[1..];

        // Longitude runs to 180 degrees and has a three-digit field.
        let degree_digits = if index == 1 { 3 } else { 2 };
        let degrees = take_digits(&mut rest, degree_digits)?;
        let minutes = take_digits(&mut rest, 2)?;

        let second_digits = rest
            .bytes()
            .take(2)
            .take_while(u8::is_ascii_digit)
            .count();
        let seconds = if second_digits > 0 {
            take_digits(&mut rest, second_digits)?
        } else {
            0
        };

        *value = ((degrees * 60 + minutes) * 60 + seconds) as i32 * sign;
    }
    rest.is_empty().then_some((out[0], out[1]))
}
