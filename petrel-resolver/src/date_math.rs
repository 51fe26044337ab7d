// Copyright (C) 2024 Quickwit, Inc.
//
// Quickwit is offered under the AGPL v3.0 and as commercial software.
// For commercial licensing, contact us at hello@quickwit.io.
//
// AGPL:
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

//! Date-math rewriting: `<logs-{now/d{uuuu.MM.dd|+02:00}}>` becomes a literal
//! index name rendered against the request clock.
//!
//! A date-math token is bracketed by `<` and `>`. Inside, `{...}` opens a
//! placeholder holding a math expression, optionally followed by a nested
//! `{pattern|tz}` format block. Outside placeholders `\` escapes the next
//! character; unescaped `{` and `}` are reserved.

use once_cell::sync::Lazy;
use regex::Regex;
use time::{Date, Duration, Month, OffsetDateTime, Time, UtcOffset};

use crate::context::Context;
use crate::date_format::JavaDateFormatter;
use crate::{pattern, ResolveError, ResolveResult};

pub(crate) const DEFAULT_DATE_FORMAT: &str = "uuuu.MM.dd";

static DEFAULT_DATE_FORMATTER: Lazy<JavaDateFormatter> = Lazy::new(|| {
    JavaDateFormatter::from_pattern(DEFAULT_DATE_FORMAT)
        .expect("default date format should compile")
});

const EXPRESSION_LEFT_BOUND: char = '<';
const EXPRESSION_RIGHT_BOUND: char = '>';
const LEFT_BOUND: char = '{';
const RIGHT_BOUND: char = '}';
const ESCAPE_CHAR: char = '\\';
const TIME_ZONE_BOUND: char = '|';

/// Rewrites every date-math token of `expressions` against the context clock.
/// A leading `-` is preserved as an exclusion marker only once a wildcard has
/// been seen earlier in the sequence; the rest of the token is still resolved.
pub(crate) fn resolve(context: &Context, expressions: &[String]) -> ResolveResult<Vec<String>> {
    let mut result = Vec::with_capacity(expressions.len());
    let mut wildcard_seen = false;
    for expression in expressions {
        if expression.starts_with('-') && wildcard_seen {
            let resolved = resolve_expression(&expression[1..], context.start_time)?;
            result.push(format!("-{resolved}"));
        } else {
            result.push(resolve_expression(expression, context.start_time)?);
        }
        if pattern::is_wildcard_pattern(expression) {
            wildcard_seen = true;
        }
    }
    Ok(result)
}

/// Rewrites a single expression. Expressions not bracketed by `<...>` pass
/// through byte-for-byte.
pub(crate) fn resolve_expression(expression: &str, now_ms: i64) -> ResolveResult<String> {
    if !expression.starts_with(EXPRESSION_LEFT_BOUND)
        || !expression.ends_with(EXPRESSION_RIGHT_BOUND)
    {
        return Ok(expression.to_string());
    }
    let invalid =
        |reason: String| -> ResolveError { ResolveError::invalid_expression(expression, reason) };

    let text: Vec<char> = expression.chars().collect();
    let mut escape = false;
    let mut in_date_format = false;
    let mut in_placeholder = false;
    let mut output = String::new();
    let mut placeholder = String::new();
    for i in 1..text.len() - 1 {
        let escaped_char = escape;
        if escape {
            escape = false;
        }
        let c = text[i];
        if c == ESCAPE_CHAR {
            if escaped_char {
                output.push(c);
                escape = false;
            } else {
                escape = true;
            }
            continue;
        }
        if in_placeholder {
            match c {
                LEFT_BOUND => {
                    if in_date_format && escaped_char {
                        placeholder.push(c);
                    } else if !in_date_format {
                        in_date_format = true;
                        placeholder.push(c);
                    } else {
                        return Err(invalid(format!(
                            "invalid character in placeholder at position [{i}]"
                        )));
                    }
                }
                RIGHT_BOUND => {
                    if in_date_format && escaped_char {
                        placeholder.push(c);
                    } else if in_date_format {
                        in_date_format = false;
                        placeholder.push(c);
                    } else {
                        let formatted = resolve_placeholder(&placeholder, now_ms)
                            .map_err(&invalid)?;
                        output.push_str(&formatted);
                        placeholder.clear();
                        in_placeholder = false;
                    }
                }
                _ => placeholder.push(c),
            }
        } else {
            match c {
                LEFT_BOUND if !escaped_char => {
                    in_placeholder = true;
                }
                RIGHT_BOUND if !escaped_char => {
                    return Err(invalid(format!(
                        "invalid character at position [{i}]. `{{` and `}}` are reserved \
                         characters and should be escaped when used as part of the index name \
                         using `\\` (e.g. `\\{{text\\}}`)"
                    )));
                }
                _ => output.push(c),
            }
        }
    }
    if in_placeholder {
        return Err(invalid("date math placeholder is open ended".to_string()));
    }
    if output.is_empty() {
        return Err(invalid("nothing captured".to_string()));
    }
    Ok(output)
}

/// Resolves the content of one `{...}` placeholder: the math expression and
/// its optional `{pattern|tz}` format block.
fn resolve_placeholder(placeholder: &str, now_ms: i64) -> Result<String, String> {
    let local_formatter;
    let (math_expression, formatter, time_zone) = match placeholder.find(LEFT_BOUND) {
        None => (placeholder, &*DEFAULT_DATE_FORMATTER, UtcOffset::UTC),
        Some(format_start) => {
            if !placeholder.ends_with(RIGHT_BOUND) {
                return Err("missing closing `}` for date math format".to_string());
            }
            if format_start == placeholder.len() - 2 {
                return Err("missing date format".to_string());
            }
            let math_expression = &placeholder[..format_start];
            let pattern_and_time_zone = &placeholder[format_start + 1..placeholder.len() - 1];
            let (date_pattern, time_zone) = match pattern_and_time_zone.find(TIME_ZONE_BOUND) {
                Some(separator) => (
                    &pattern_and_time_zone[..separator],
                    parse_time_zone(&pattern_and_time_zone[separator + 1..])?,
                ),
                None => (pattern_and_time_zone, UtcOffset::UTC),
            };
            local_formatter = JavaDateFormatter::from_pattern(date_pattern)?;
            (math_expression, &local_formatter, time_zone)
        }
    };
    let date_time = parse_math(math_expression, formatter, time_zone, now_ms)?;
    formatter.format(date_time)
}

static OFFSET_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-](?P<hours>[0-9]{2})(:?(?P<minutes>[0-9]{2}))?$")
        .expect("regular expression should compile")
});

/// Parses the timezone of a format block. The `time` stack carries no tz
/// database, so only `UTC`, `Z` and fixed offsets `±hh[:mm]` are accepted.
fn parse_time_zone(time_zone_str: &str) -> Result<UtcOffset, String> {
    if time_zone_str.eq_ignore_ascii_case("utc") || time_zone_str == "Z" {
        return Ok(UtcOffset::UTC);
    }
    let captures = OFFSET_REGEX.captures(time_zone_str).ok_or_else(|| {
        format!(
            "failed to parse time zone `{time_zone_str}`: only `UTC`, `Z` and fixed offsets \
             ±hh[:mm] are supported"
        )
    })?;
    let hours = captures
        .name("hours")
        .expect("`hours` capture should match")
        .as_str()
        .parse::<i32>()
        .expect("`hours` capture should be an integer");
    let minutes = captures
        .name("minutes")
        .map(|minutes| minutes.as_str())
        .unwrap_or("0")
        .parse::<i32>()
        .expect("`minutes` capture should be an integer");
    let sign = if time_zone_str.starts_with('+') { 1 } else { -1 };
    UtcOffset::from_whole_seconds(sign * (hours * 3600 + minutes * 60))
        .map_err(|_| format!("time zone offset `{time_zone_str}` is invalid"))
}

/// Evaluates a math expression: a `now` or explicit-date anchor followed by
/// `+N`/`-N`/`/` operations over units `y M w d h H m s`.
fn parse_math(
    math: &str,
    formatter: &JavaDateFormatter,
    time_zone: UtcOffset,
    now_ms: i64,
) -> Result<OffsetDateTime, String> {
    let (mut date_time, operations) = if let Some(operations) = math.strip_prefix("now") {
        let now = OffsetDateTime::from_unix_timestamp_nanos(now_ms as i128 * 1_000_000)
            .map_err(|_| format!("request time is out of range for date math [{math}]"))?;
        (now.to_offset(time_zone), operations)
    } else {
        match math.find("||") {
            Some(separator) => (
                formatter.parse(&math[..separator], time_zone)?,
                &math[separator + 2..],
            ),
            None => (formatter.parse(math, time_zone)?, ""),
        }
    };

    let chars: Vec<char> = operations.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let operator = chars[i];
        i += 1;
        match operator {
            '/' => {
                let Some(&unit) = chars.get(i) else {
                    return Err(format!("truncated date math [{math}]"));
                };
                i += 1;
                date_time = round_down(date_time, unit, math)?;
            }
            '+' | '-' => {
                let mut amount = 0i64;
                let mut digits = 0;
                while let Some(digit) = chars.get(i).and_then(|c| c.to_digit(10)) {
                    amount = amount * 10 + digit as i64;
                    digits += 1;
                    i += 1;
                }
                if digits == 0 {
                    amount = 1;
                }
                if operator == '-' {
                    amount = -amount;
                }
                let Some(&unit) = chars.get(i) else {
                    return Err(format!("truncated date math [{math}]"));
                };
                i += 1;
                date_time = add_unit(date_time, amount, unit, math)?;
            }
            _ => {
                return Err(format!(
                    "operator not supported for date math [{math}]: `{operator}`"
                ));
            }
        }
    }
    Ok(date_time)
}

fn add_unit(
    date_time: OffsetDateTime,
    amount: i64,
    unit: char,
    math: &str,
) -> Result<OffsetDateTime, String> {
    let out_of_range = || format!("date math result is out of range [{math}]");
    match unit {
        'y' => add_months(date_time, amount * 12, math),
        'M' => add_months(date_time, amount, math),
        'w' => date_time
            .checked_add(Duration::weeks(amount))
            .ok_or_else(out_of_range),
        'd' => date_time
            .checked_add(Duration::days(amount))
            .ok_or_else(out_of_range),
        'h' | 'H' => date_time
            .checked_add(Duration::hours(amount))
            .ok_or_else(out_of_range),
        'm' => date_time
            .checked_add(Duration::minutes(amount))
            .ok_or_else(out_of_range),
        's' => date_time
            .checked_add(Duration::seconds(amount))
            .ok_or_else(out_of_range),
        _ => Err(format!("unit [{unit}] not supported for date math [{math}]")),
    }
}

fn add_months(
    date_time: OffsetDateTime,
    months: i64,
    math: &str,
) -> Result<OffsetDateTime, String> {
    let month0 = date_time.year() as i64 * 12 + (date_time.month() as u8 as i64 - 1) + months;
    let year = i32::try_from(month0.div_euclid(12))
        .map_err(|_| format!("date math result is out of range [{math}]"))?;
    let month = Month::try_from((month0.rem_euclid(12) + 1) as u8)
        .expect("month index should be in range");
    let day = date_time
        .day()
        .min(time::util::days_in_year_month(year, month));
    let date = Date::from_calendar_date(year, month, day)
        .map_err(|_| format!("date math result is out of range [{math}]"))?;
    Ok(date_time.replace_date(date))
}

/// Rounds down to the start of the unit, in the offset `date_time` carries.
/// Weeks round to Monday.
fn round_down(
    date_time: OffsetDateTime,
    unit: char,
    math: &str,
) -> Result<OffsetDateTime, String> {
    let date_time = match unit {
        's' => date_time
            .replace_nanosecond(0)
            .expect("zero nanosecond should be valid"),
        'm' => date_time
            .replace_second(0)
            .and_then(|dt| dt.replace_nanosecond(0))
            .expect("zero second should be valid"),
        'h' | 'H' => date_time
            .replace_minute(0)
            .and_then(|dt| dt.replace_second(0))
            .and_then(|dt| dt.replace_nanosecond(0))
            .expect("zero minute should be valid"),
        'd' => date_time.replace_time(Time::MIDNIGHT),
        'w' => {
            let days_from_monday = date_time.weekday().number_days_from_monday() as i64;
            date_time
                .replace_time(Time::MIDNIGHT)
                .checked_sub(Duration::days(days_from_monday))
                .ok_or_else(|| format!("date math result is out of range [{math}]"))?
        }
        'M' => date_time
            .replace_day(1)
            .expect("first of month should be valid")
            .replace_time(Time::MIDNIGHT),
        'y' => {
            let january_first = Date::from_calendar_date(date_time.year(), Month::January, 1)
                .expect("january 1st should be valid");
            date_time.replace_date(january_first).replace_time(Time::MIDNIGHT)
        }
        _ => {
            return Err(format!("unit [{unit}] not supported for date math [{math}]"));
        }
    };
    Ok(date_time)
}
