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

//! Java-style date patterns (`uuuu.MM.dd`, `yyyy-MM-dd'T'HH:mm:ss`, ...)
//! compiled to `time` format items. The same compiled items render date-math
//! output and parse explicit date-math anchors.

use std::fmt;
use std::num::NonZeroU8;

use once_cell::sync::Lazy;
use regex::Regex;
use time::format_description::modifier::{
    Day, Hour, Minute, Month as MonthModifier, Padding, Second, Subsecond, SubsecondDigits, Year,
    YearRepr,
};
use time::format_description::{Component, OwnedFormatItem};
use time::parsing::Parsed;
use time::{Month, OffsetDateTime, PrimitiveDateTime, UtcOffset};

fn literal(s: &[u8]) -> OwnedFormatItem {
    OwnedFormatItem::Literal(s.to_vec().into_boxed_slice())
}

fn build_year_item(ptn: &str) -> OwnedFormatItem {
    let mut year = Year::default();
    year.repr = if ptn.len() == 4 {
        YearRepr::Full
    } else {
        YearRepr::LastTwo
    };
    year.padding = Padding::Zero;
    OwnedFormatItem::Component(Component::Year(year))
}

fn build_month_item(ptn: &str) -> OwnedFormatItem {
    let mut month = MonthModifier::default();
    month.padding = if ptn.len() == 2 {
        Padding::Zero
    } else {
        Padding::None
    };
    OwnedFormatItem::Component(Component::Month(month))
}

fn build_day_item(ptn: &str) -> OwnedFormatItem {
    let mut day = Day::default();
    day.padding = if ptn.len() == 2 {
        Padding::Zero
    } else {
        Padding::None
    };
    OwnedFormatItem::Component(Component::Day(day))
}

fn build_hour_item(ptn: &str) -> OwnedFormatItem {
    let mut hour = Hour::default();
    hour.padding = if ptn.len() == 2 {
        Padding::Zero
    } else {
        Padding::None
    };
    hour.is_12_hour_clock = false;
    OwnedFormatItem::Component(Component::Hour(hour))
}

fn build_minute_item(ptn: &str) -> OwnedFormatItem {
    let mut minute = Minute::default();
    minute.padding = if ptn.len() == 2 {
        Padding::Zero
    } else {
        Padding::None
    };
    OwnedFormatItem::Component(Component::Minute(minute))
}

fn build_second_item(ptn: &str) -> OwnedFormatItem {
    let mut second = Second::default();
    second.padding = if ptn.len() == 2 {
        Padding::Zero
    } else {
        Padding::None
    };
    OwnedFormatItem::Component(Component::Second(second))
}

fn build_fraction_of_second_item(_ptn: &str) -> OwnedFormatItem {
    let mut subsecond = Subsecond::default();
    subsecond.digits = SubsecondDigits::OneOrMore;
    OwnedFormatItem::Component(Component::Subsecond(subsecond))
}

fn build_zone_offset_item(_ptn: &str) -> OwnedFormatItem {
    let items: Box<[OwnedFormatItem]> = vec![
        OwnedFormatItem::Component(Component::OffsetHour(Default::default())),
        literal(b":"),
        OwnedFormatItem::Component(Component::OffsetMinute(Default::default())),
    ]
    .into_boxed_slice();
    OwnedFormatItem::Compound(items)
}

type TokenBuilderFn = fn(&str) -> OwnedFormatItem;

/// The recognized pattern tokens, in priority order. Each regex is anchored at
/// the start of the remaining pattern text.
static PATTERN_TOKENS: Lazy<Vec<(Regex, TokenBuilderFn)>> = Lazy::new(|| {
    let tokens: Vec<(&str, TokenBuilderFn)> = vec![
        (r"uu(uu)?", build_year_item),
        (r"yy(yy)?", build_year_item),
        (r"MM?", build_month_item),
        (r"dd?", build_day_item),
        (r"HH?", build_hour_item),
        (r"mm?", build_minute_item),
        (r"ss?", build_second_item),
        (r"S+", build_fraction_of_second_item),
        (r"Z", build_zone_offset_item),
        (r"''", |_| literal(b"'")),
        (r"'[^']+'", |s| literal(s[1..s.len() - 1].as_bytes())),
        (r"[^\w{}]", |s| literal(s.as_bytes())),
    ];
    tokens
        .into_iter()
        .map(|(ptn, builder)| {
            let regex =
                Regex::new(&format!("^{ptn}")).expect("regular expression should compile");
            (regex, builder)
        })
        .collect()
});

fn tokenize_pattern(pattern: &str) -> Result<Box<[OwnedFormatItem]>, String> {
    let mut items = Vec::new();
    let mut remaining = pattern;
    while !remaining.is_empty() {
        let matched = PATTERN_TOKENS.iter().find_map(|(regex, builder)| {
            let matched = regex.find(remaining)?;
            Some((matched.len(), builder(matched.as_str())))
        });
        let Some((match_len, item)) = matched else {
            let position = pattern.len() - remaining.len();
            return Err(format!(
                "failed to parse date format `{pattern}`: pattern at position {position} is not \
                 recognized"
            ));
        };
        items.push(item);
        remaining = &remaining[match_len..];
    }
    Ok(items.into_boxed_slice())
}

/// A compiled Java-style date pattern.
pub(crate) struct JavaDateFormatter {
    pattern: String,
    items: Box<[OwnedFormatItem]>,
}

impl fmt::Debug for JavaDateFormatter {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_struct("JavaDateFormatter")
            .field("pattern", &self.pattern)
            .finish()
    }
}

impl JavaDateFormatter {
    pub fn from_pattern(pattern: &str) -> Result<Self, String> {
        let items = tokenize_pattern(pattern)?;
        Ok(JavaDateFormatter {
            pattern: pattern.to_string(),
            items,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Renders `date_time` with this pattern. The offset to render dates in
    /// must already be applied to `date_time`.
    pub fn format(&self, date_time: OffsetDateTime) -> Result<String, String> {
        date_time
            .format(&self.items)
            .map_err(|error| format!("failed to format date with `{}`: {error}", self.pattern))
    }

    /// Parses an explicit date-math anchor. Fields the pattern does not
    /// provide default to the start of their unit: January, the 1st,
    /// 00:00:00. The offset defaults to `default_offset` unless the pattern
    /// parsed one.
    pub fn parse(
        &self,
        date_str: &str,
        default_offset: UtcOffset,
    ) -> Result<OffsetDateTime, String> {
        let mut parsed = Parsed::new();
        let unparsed = parsed
            .parse_items(date_str.as_bytes(), &self.items)
            .map_err(|error| {
                format!(
                    "failed to parse date `{date_str}` with format `{}`: {error}",
                    self.pattern
                )
            })?;
        if !unparsed.is_empty() {
            return Err(format!(
                "date `{date_str}` does not fully match format `{}`",
                self.pattern
            ));
        }
        if parsed.year().is_none() {
            return Err(format!(
                "date `{date_str}` parsed with format `{}` is missing a year",
                self.pattern
            ));
        }
        if parsed.month().is_none() {
            let _ = parsed.set_month(Month::January);
        }
        if parsed.day().is_none() {
            let _ = parsed.set_day(NonZeroU8::new(1).expect("1 should be non-zero"));
        }
        if parsed.hour_24().is_none() {
            let _ = parsed.set_hour_24(0);
            let _ = parsed.set_minute(0);
            let _ = parsed.set_second(0);
        }
        if parsed.offset_hour().is_some() {
            let offset_date_time: OffsetDateTime = parsed
                .try_into()
                .map_err(|error| format!("invalid date `{date_str}`: {error}"))?;
            return Ok(offset_date_time);
        }
        let primitive_date_time: PrimitiveDateTime = parsed
            .try_into()
            .map_err(|error| format!("invalid date `{date_str}`: {error}"))?;
        Ok(primitive_date_time.assume_offset(default_offset))
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn test_format_default_pattern() {
        let formatter = JavaDateFormatter::from_pattern("uuuu.MM.dd").unwrap();
        let formatted = formatter.format(datetime!(2024-01-15 10:00 UTC)).unwrap();
        assert_eq!(formatted, "2024.01.15");
    }

    #[test]
    fn test_format_variants() {
        let date_time = datetime!(2024-03-07 09:05:02 UTC);
        for (pattern, expected) in [
            ("yyyy.MM.dd", "2024.03.07"),
            ("uuuu-MM", "2024-03"),
            ("yy-M-d", "24-3-7"),
            ("uuuu.MM.dd'T'HH:mm:ss", "2024.03.07T09:05:02"),
            ("HH:mm", "09:05"),
        ] {
            let formatter = JavaDateFormatter::from_pattern(pattern).unwrap();
            assert_eq!(formatter.format(date_time).unwrap(), expected, "{pattern}");
        }
    }

    #[test]
    fn test_unrecognized_pattern() {
        let error = JavaDateFormatter::from_pattern("uuuu.QQ").unwrap_err();
        assert!(error.contains("position 5"), "{error}");
    }

    #[test]
    fn test_parse_full_date() {
        let formatter = JavaDateFormatter::from_pattern("uuuu.MM.dd").unwrap();
        let parsed = formatter.parse("2024.01.15", UtcOffset::UTC).unwrap();
        assert_eq!(parsed, datetime!(2024-01-15 00:00 UTC));
    }

    #[test]
    fn test_parse_fills_missing_fields() {
        let formatter = JavaDateFormatter::from_pattern("uuuu").unwrap();
        let parsed = formatter.parse("2024", UtcOffset::UTC).unwrap();
        assert_eq!(parsed, datetime!(2024-01-01 00:00 UTC));

        let formatter = JavaDateFormatter::from_pattern("uuuu.MM").unwrap();
        let parsed = formatter.parse("2024.06", UtcOffset::UTC).unwrap();
        assert_eq!(parsed, datetime!(2024-06-01 00:00 UTC));
    }

    #[test]
    fn test_parse_assumes_default_offset() {
        let formatter = JavaDateFormatter::from_pattern("uuuu.MM.dd").unwrap();
        let offset = UtcOffset::from_hms(2, 0, 0).unwrap();
        let parsed = formatter.parse("2024.01.15", offset).unwrap();
        assert_eq!(parsed, datetime!(2024-01-15 00:00 +02:00));
    }

    #[test]
    fn test_parse_rejects_trailing_garbage() {
        let formatter = JavaDateFormatter::from_pattern("uuuu.MM.dd").unwrap();
        formatter
            .parse("2024.01.15extra", UtcOffset::UTC)
            .unwrap_err();
        formatter.parse("2024", UtcOffset::UTC).unwrap_err();
    }
}
