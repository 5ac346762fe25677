//! Calendar dates, wall-clock timestamps and the date-class capability.
//!
//! Formatting and parsing use PHP-style `date()` pattern letters because
//! that is what the dialect literal formats are written in:
//!
//! | Letter | Meaning |
//! |---|---|
//! | `d` / `j` | day of month, padded / unpadded |
//! | `m` / `n` | month number, padded / unpadded |
//! | `M` / `F` | month name, short / full |
//! | `Y` / `y` | four / two digit year |
//! | `H` / `G` | 24-hour, padded / unpadded |
//! | `h` / `g` | 12-hour, padded / unpadded |
//! | `i` / `s` / `u` | minutes, seconds, microseconds |
//! | `A` / `a` | `AM`/`PM`, `am`/`pm` |
//! | `T` / `P` / `O` | zone abbreviation, `+05:00`, `+0500` |
//!
//! A backslash escapes the next pattern character.

use serde::{Deserialize, Serialize};
use std::fmt;

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Zone abbreviations understood by the parser, with their UTC offsets.
const ZONES: &[(&str, i32)] = &[
    ("UTC", 0),
    ("GMT", 0),
    ("Z", 0),
    ("EST", -5 * 3600),
    ("EDT", -4 * 3600),
    ("CST", -6 * 3600),
    ("CDT", -5 * 3600),
    ("MST", -7 * 3600),
    ("MDT", -6 * 3600),
    ("PST", -8 * 3600),
    ("PDT", -7 * 3600),
    ("CET", 3600),
    ("CEST", 2 * 3600),
];

/// Formats tried, in order, by [`DateTime::parse`].
const PARSE_FORMATS: &[&str] = &[
    "Y-m-d H:i:s T",
    "Y-m-d H:i:s P",
    "Y-m-d H:i:s O",
    "Y-m-d H:i:s.u",
    "Y-m-d H:i:s",
    "Y-m-d\\TH:i:sP",
    "Y-m-d\\TH:i:sO",
    "Y-m-d\\TH:i:s",
    "Y-m-d H:i",
    "Y-m-d",
];

/// A proleptic Gregorian calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Date {
    year: i32,
    month: u8,
    day: u8,
}

impl Date {
    /// Create a date, returning `None` for impossible days such as February 30th.
    pub fn new(year: i32, month: u8, day: u8) -> Option<Self> {
        if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
            return None;
        }
        Some(Self { year, month, day })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    /// Days since 1970-01-01.
    pub fn to_days(&self) -> i64 {
        let y = i64::from(self.year) - i64::from(self.month <= 2);
        let era = y.div_euclid(400);
        let yoe = y - era * 400;
        let m = i64::from(self.month);
        let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + i64::from(self.day) - 1;
        let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
        era * 146_097 + doe - 719_468
    }

    /// Inverse of [`Date::to_days`].
    pub fn from_days(days: i64) -> Self {
        let z = days + 719_468;
        let era = z.div_euclid(146_097);
        let doe = z - era * 146_097;
        let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
        let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
        let mp = (5 * doy + 2) / 153;
        let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
        let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
        let year = (yoe + era * 400 + i64::from(month <= 2)) as i32;
        Self { year, month, day }
    }

    pub fn format(&self, pattern: &str) -> String {
        DateTime::from(*self).format(pattern)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// A UTC offset, optionally carrying the abbreviation it was written with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Zone {
    abbreviation: Option<String>,
    offset_seconds: i32,
}

impl Zone {
    pub fn utc() -> Self {
        Self {
            abbreviation: Some("UTC".to_string()),
            offset_seconds: 0,
        }
    }

    /// Look up a known abbreviation such as `EST`.
    pub fn from_abbreviation(abbreviation: &str) -> Option<Self> {
        let upper = abbreviation.to_ascii_uppercase();
        ZONES
            .iter()
            .find(|(name, _)| *name == upper)
            .map(|(name, offset)| Self {
                abbreviation: Some((*name).to_string()),
                offset_seconds: *offset,
            })
    }

    pub fn fixed(offset_seconds: i32) -> Self {
        Self {
            abbreviation: None,
            offset_seconds,
        }
    }

    pub fn abbreviation(&self) -> Option<&str> {
        self.abbreviation.as_deref()
    }

    pub fn offset_seconds(&self) -> i32 {
        self.offset_seconds
    }

    fn offset_string(&self, colon: bool) -> String {
        let sign = if self.offset_seconds < 0 { '-' } else { '+' };
        let total = self.offset_seconds.unsigned_abs();
        let (hours, minutes) = (total / 3600, (total % 3600) / 60);
        if colon {
            format!("{sign}{hours:02}:{minutes:02}")
        } else {
            format!("{sign}{hours:02}{minutes:02}")
        }
    }
}

/// A wall-clock timestamp with an optional zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateTime {
    date: Date,
    hour: u8,
    minute: u8,
    second: u8,
    micro: u32,
    zone: Option<Zone>,
}

impl DateTime {
    /// Create a timestamp; `None` when any field is out of range.
    pub fn new(date: Date, hour: u8, minute: u8, second: u8) -> Option<Self> {
        if hour > 23 || minute > 59 || second > 59 {
            return None;
        }
        Some(Self {
            date,
            hour,
            minute,
            second,
            micro: 0,
            zone: None,
        })
    }

    pub fn with_zone(mut self, zone: Zone) -> Self {
        self.zone = Some(zone);
        self
    }

    pub fn with_micro(mut self, micro: u32) -> Self {
        self.micro = micro.min(999_999);
        self
    }

    pub fn date(&self) -> Date {
        self.date
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn second(&self) -> u8 {
        self.second
    }

    pub fn micro(&self) -> u32 {
        self.micro
    }

    pub fn zone(&self) -> Option<&Zone> {
        self.zone.as_ref()
    }

    /// Parse the common literal shapes engines return (`2009-01-01 01:01:01 EST`,
    /// ISO 8601 with an offset, or a bare date).
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        PARSE_FORMATS
            .iter()
            .find_map(|pattern| Self::create_from_format(pattern, text))
    }

    /// Render with a PHP `date()` style pattern.
    pub fn format(&self, pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len() + 8);
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                'd' => out.push_str(&format!("{:02}", self.date.day)),
                'j' => out.push_str(&self.date.day.to_string()),
                'm' => out.push_str(&format!("{:02}", self.date.month)),
                'n' => out.push_str(&self.date.month.to_string()),
                'M' => out.push_str(&MONTHS[usize::from(self.date.month - 1)][..3]),
                'F' => out.push_str(MONTHS[usize::from(self.date.month - 1)]),
                'Y' => out.push_str(&format!("{:04}", self.date.year)),
                'y' => out.push_str(&format!("{:02}", self.date.year.rem_euclid(100))),
                'H' => out.push_str(&format!("{:02}", self.hour)),
                'G' => out.push_str(&self.hour.to_string()),
                'h' => out.push_str(&format!("{:02}", twelve_hour(self.hour))),
                'g' => out.push_str(&twelve_hour(self.hour).to_string()),
                'i' => out.push_str(&format!("{:02}", self.minute)),
                's' => out.push_str(&format!("{:02}", self.second)),
                'u' => out.push_str(&format!("{:06}", self.micro)),
                'A' => out.push_str(if self.hour < 12 { "AM" } else { "PM" }),
                'a' => out.push_str(if self.hour < 12 { "am" } else { "pm" }),
                'T' => {
                    let zone = self.zone.clone().unwrap_or_else(Zone::utc);
                    match zone.abbreviation() {
                        Some(abbr) => out.push_str(abbr),
                        None => out.push_str(&zone.offset_string(true)),
                    }
                }
                'P' => out.push_str(
                    &self
                        .zone
                        .clone()
                        .unwrap_or_else(Zone::utc)
                        .offset_string(true),
                ),
                'O' => out.push_str(
                    &self
                        .zone
                        .clone()
                        .unwrap_or_else(Zone::utc)
                        .offset_string(false),
                ),
                other => out.push(other),
            }
        }
        out
    }

    /// Parse `input` against a PHP `date()` style pattern. The whole input must match.
    pub fn create_from_format(pattern: &str, input: &str) -> Option<Self> {
        let mut cursor = Cursor::new(input);
        let mut fields = Fields::default();
        let mut chars = pattern.chars();

        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    let literal = chars.next()?;
                    cursor.expect_char(literal)?;
                }
                'd' => fields.day = Some(cursor.digits(2, 2)?),
                'j' => fields.day = Some(cursor.digits(1, 2)?),
                'm' => fields.month = Some(cursor.digits(2, 2)?),
                'n' => fields.month = Some(cursor.digits(1, 2)?),
                'M' | 'F' => fields.month = Some(cursor.month_name()?),
                'Y' => fields.year = Some(cursor.digits(4, 4)?),
                'y' => fields.year = Some(2000 + cursor.digits(2, 2)?),
                'H' => fields.hour = Some(cursor.digits(2, 2)?),
                'G' => fields.hour = Some(cursor.digits(1, 2)?),
                'h' => fields.hour12 = Some(cursor.digits(2, 2)?),
                'g' => fields.hour12 = Some(cursor.digits(1, 2)?),
                'i' => fields.minute = Some(cursor.digits(2, 2)?),
                's' => fields.second = Some(cursor.digits(2, 2)?),
                'u' => fields.micro = Some(cursor.micros()?),
                'A' | 'a' => fields.pm = Some(cursor.meridiem()?),
                'T' => fields.zone = Some(cursor.zone()?),
                'P' | 'O' => fields.zone = Some(cursor.offset()?),
                other => cursor.expect_char(other)?,
            }
        }

        if !cursor.is_done() {
            return None;
        }
        fields.build()
    }
}

impl From<Date> for DateTime {
    fn from(date: Date) -> Self {
        Self {
            date,
            hour: 0,
            minute: 0,
            second: 0,
            micro: 0,
            zone: None,
        }
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.zone.is_some() {
            f.write_str(&self.format("Y-m-d H:i:s T"))
        } else {
            f.write_str(&self.format("Y-m-d H:i:s"))
        }
    }
}

/// The date-class capability: a type that can render itself with a pattern and
/// be built back from a pattern and text.
///
/// The connection layer converts engine date strings through the configured
/// date class, so the type must also convert into [`DateTime`].
pub trait DateClass: Sized {
    fn format(&self, pattern: &str) -> String;

    fn create_from_format(pattern: &str, input: &str) -> Option<Self>;
}

impl DateClass for DateTime {
    fn format(&self, pattern: &str) -> String {
        DateTime::format(self, pattern)
    }

    fn create_from_format(pattern: &str, input: &str) -> Option<Self> {
        DateTime::create_from_format(pattern, input)
    }
}

fn twelve_hour(hour: u8) -> u8 {
    match hour % 12 {
        0 => 12,
        h => h,
    }
}

fn is_leap(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        2 if is_leap(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

#[derive(Default)]
struct Fields {
    year: Option<i32>,
    month: Option<i32>,
    day: Option<i32>,
    hour: Option<i32>,
    hour12: Option<i32>,
    pm: Option<bool>,
    minute: Option<i32>,
    second: Option<i32>,
    micro: Option<u32>,
    zone: Option<Zone>,
}

impl Fields {
    fn build(self) -> Option<DateTime> {
        let date = Date::new(
            self.year?,
            u8::try_from(self.month.unwrap_or(1)).ok()?,
            u8::try_from(self.day.unwrap_or(1)).ok()?,
        )?;
        let hour = match (self.hour, self.hour12) {
            (Some(h), _) => h,
            (None, Some(h)) if (1..=12).contains(&h) => {
                let base = h % 12;
                if self.pm.unwrap_or(false) { base + 12 } else { base }
            }
            (None, Some(_)) => return None,
            (None, None) => 0,
        };
        let mut value = DateTime::new(
            date,
            u8::try_from(hour).ok()?,
            u8::try_from(self.minute.unwrap_or(0)).ok()?,
            u8::try_from(self.second.unwrap_or(0)).ok()?,
        )?;
        value.micro = self.micro.unwrap_or(0);
        value.zone = self.zone;
        Some(value)
    }
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }

    fn is_done(&self) -> bool {
        self.rest.is_empty()
    }

    fn expect_char(&mut self, expected: char) -> Option<()> {
        let mut chars = self.rest.chars();
        if chars.next()? == expected {
            self.rest = chars.as_str();
            Some(())
        } else {
            None
        }
    }

    fn digits(&mut self, min: usize, max: usize) -> Option<i32> {
        let len = self
            .rest
            .bytes()
            .take(max)
            .take_while(u8::is_ascii_digit)
            .count();
        if len < min {
            return None;
        }
        let (head, tail) = self.rest.split_at(len);
        self.rest = tail;
        head.parse().ok()
    }

    fn micros(&mut self) -> Option<u32> {
        let len = self
            .rest
            .bytes()
            .take(6)
            .take_while(u8::is_ascii_digit)
            .count();
        if len == 0 {
            return None;
        }
        let (head, tail) = self.rest.split_at(len);
        self.rest = tail;
        let value: u32 = head.parse().ok()?;
        Some(value * 10_u32.pow(6 - len as u32))
    }

    fn alphabetic(&mut self) -> &'a str {
        let len = self
            .rest
            .bytes()
            .take_while(u8::is_ascii_alphabetic)
            .count();
        let (head, tail) = self.rest.split_at(len);
        self.rest = tail;
        head
    }

    fn month_name(&mut self) -> Option<i32> {
        let word = self.alphabetic().to_ascii_lowercase();
        if word.len() < 3 {
            return None;
        }
        MONTHS
            .iter()
            .position(|m| {
                let m = m.to_ascii_lowercase();
                m == word || m[..3] == word
            })
            .map(|idx| idx as i32 + 1)
    }

    fn meridiem(&mut self) -> Option<bool> {
        match self.alphabetic().to_ascii_uppercase().as_str() {
            "AM" => Some(false),
            "PM" => Some(true),
            _ => None,
        }
    }

    fn zone(&mut self) -> Option<Zone> {
        if self.rest.starts_with(['+', '-']) {
            return self.offset();
        }
        Zone::from_abbreviation(self.alphabetic())
    }

    fn offset(&mut self) -> Option<Zone> {
        if self.rest.starts_with('Z') {
            self.rest = &self.rest[1..];
            return Some(Zone::fixed(0));
        }
        let negative = match self.rest.chars().next()? {
            '+' => false,
            '-' => true,
            _ => return None,
        };
        self.rest = &self.rest[1..];
        let hours = self.digits(2, 2)?;
        if self.rest.starts_with(':') {
            self.rest = &self.rest[1..];
        }
        let minutes = self.digits(2, 2)?;
        let seconds = hours * 3600 + minutes * 60;
        Some(Zone::fixed(if negative { -seconds } else { seconds }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DateTime {
        DateTime::parse("2009-01-01 01:01:01 EST").expect("parse sample")
    }

    #[test]
    fn test_iso_like_round_trip_keeps_abbreviation() {
        let dt = sample();
        assert_eq!(dt.format("Y-m-d H:i:s T"), "2009-01-01 01:01:01 EST");
        assert_eq!(dt.zone().map(Zone::offset_seconds), Some(-5 * 3600));
    }

    #[test]
    fn test_oracle_style_format() {
        let dt = sample();
        assert_eq!(dt.format("d-M-Y h:i:s A"), "01-Jan-2009 01:01:01 AM");
        assert_eq!(dt.date().format("d-M-Y"), "01-Jan-2009");
        let parsed = DateTime::create_from_format("d-M-Y h:i:s A", "01-Jan-2009 01:01:01 PM")
            .expect("parse oracle literal");
        assert_eq!(parsed.hour(), 13);
    }

    #[test]
    fn test_parse_bare_date_and_offsets() {
        let date = DateTime::parse("2009-01-01").expect("bare date");
        assert_eq!(date.hour(), 0);
        assert_eq!(date.date(), Date::new(2009, 1, 1).expect("valid"));

        let iso = DateTime::parse("2010-06-15T12:30:00+02:00").expect("iso");
        assert_eq!(iso.zone().map(Zone::offset_seconds), Some(7200));
        assert_eq!(iso.format("P"), "+02:00");
        assert_eq!(iso.format("O"), "+0200");
    }

    #[test]
    fn test_rejects_invalid_input() {
        assert!(Date::new(2009, 2, 29).is_none());
        assert!(Date::new(2008, 2, 29).is_some());
        assert!(DateTime::parse("2009-13-01").is_none());
        assert!(DateTime::parse("not a date").is_none());
        assert!(DateTime::create_from_format("Y-m-d", "2009-01-01 trailing").is_none());
    }

    #[test]
    fn test_days_conversion() {
        let epoch = Date::new(1970, 1, 1).expect("epoch");
        assert_eq!(epoch.to_days(), 0);
        let d = Date::new(2009, 1, 1).expect("valid");
        assert_eq!(Date::from_days(d.to_days()), d);
        assert_eq!(Date::from_days(-1), Date::new(1969, 12, 31).expect("valid"));
    }

    #[test]
    fn test_escaped_pattern_characters() {
        let dt = sample();
        assert_eq!(dt.format("Y-m-d\\TH:i:s"), "2009-01-01T01:01:01");
        assert_eq!(dt.format("\\Y"), "Y");
    }
}
