//! Date tokens and the calendars they are interpreted in.
//!
//! TRACK writes dates as `YYYYMMDDHH`. Climate models commonly run on a
//! 360-day calendar (twelve 30-day months), which `chrono` cannot represent,
//! so [`Datetime360`] carries those dates. Tokens of any other length are the
//! raw integer timestep written by TRACK before dates were attached.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use thiserror::Error;

pub const DAYS_PER_MONTH_360: u32 = 30;
pub const MONTHS_PER_YEAR: u32 = 12;

#[derive(Error, Debug, PartialEq)]
pub enum DateError {
    #[error("invalid date token `{0}`")]
    Invalid(String),
    #[error("`{0}` is not a valid date in the {1} calendar")]
    OutOfRange(String, &'static str),
}

/// Calendar used to interpret 10-character date tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CalendarKind {
    #[default]
    Gregorian,
    Day360,
}

impl CalendarKind {
    pub fn name(&self) -> &'static str {
        match self {
            CalendarKind::Gregorian => "gregorian",
            CalendarKind::Day360 => "360_day",
        }
    }
}

impl FromStr for CalendarKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gregorian" | "standard" | "proleptic_gregorian" => Ok(CalendarKind::Gregorian),
            "360_day" | "360" | "netcdftime" => Ok(CalendarKind::Day360),
            other => Err(format!("unknown calendar `{}`", other)),
        }
    }
}

/// A date-time in the 360-day calendar, to the hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Datetime360 {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
}

impl Datetime360 {
    pub fn from_ymdh_opt(year: i32, month: u32, day: u32, hour: u32) -> Option<Self> {
        let valid = (1..=MONTHS_PER_YEAR).contains(&month)
            && (1..=DAYS_PER_MONTH_360).contains(&day)
            && hour < 24;

        valid.then_some(Datetime360 {
            year,
            month,
            day,
            hour,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    /// Hours elapsed since 0000-01-01 00:00 in the 360-day calendar.
    pub fn hours_since_origin(&self) -> i64 {
        let months = self.year as i64 * MONTHS_PER_YEAR as i64 + (self.month - 1) as i64;
        let days = months * DAYS_PER_MONTH_360 as i64 + (self.day - 1) as i64;
        days * 24 + self.hour as i64
    }

    pub fn from_hours_since_origin(hours: i64) -> Option<Self> {
        let days = hours.div_euclid(24);
        let hour = hours.rem_euclid(24) as u32;
        let months = days.div_euclid(DAYS_PER_MONTH_360 as i64);
        let day = days.rem_euclid(DAYS_PER_MONTH_360 as i64) as u32 + 1;
        let year = months.div_euclid(MONTHS_PER_YEAR as i64);
        let month = months.rem_euclid(MONTHS_PER_YEAR as i64) as u32 + 1;

        Datetime360::from_ymdh_opt(i32::try_from(year).ok()?, month, day, hour)
    }

    pub fn add_hours(&self, hours: i64) -> Option<Self> {
        Datetime360::from_hours_since_origin(self.hours_since_origin() + hours)
    }
}

impl fmt::Display for Datetime360 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:00 (360_day)",
            self.year, self.month, self.day, self.hour
        )
    }
}

/// The time of one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Timestamp {
    Gregorian(NaiveDateTime),
    Day360(Datetime360),
    Step(i64),
}

impl Timestamp {
    /// (year, month, day, hour) for calendar-aware timestamps.
    pub fn ymdh(&self) -> Option<(i32, u32, u32, u32)> {
        match self {
            Timestamp::Gregorian(dt) => Some((dt.year(), dt.month(), dt.day(), dt.hour())),
            Timestamp::Day360(dt) => Some((dt.year(), dt.month(), dt.day(), dt.hour())),
            Timestamp::Step(_) => None,
        }
    }

    pub fn year(&self) -> Option<i32> {
        self.ymdh().map(|(year, ..)| year)
    }

    pub fn month(&self) -> Option<u32> {
        self.ymdh().map(|(_, month, ..)| month)
    }

    /// The token form used in TRACK files: `YYYYMMDDHH` or the bare step.
    pub fn to_token(&self) -> String {
        match self {
            Timestamp::Gregorian(dt) => dt.format("%Y%m%d%H").to_string(),
            Timestamp::Day360(dt) => format!(
                "{:04}{:02}{:02}{:02}",
                dt.year(),
                dt.month(),
                dt.day(),
                dt.hour()
            ),
            Timestamp::Step(step) => step.to_string(),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Gregorian(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
            Timestamp::Day360(dt) => write!(f, "{}", dt),
            Timestamp::Step(step) => write!(f, "step {}", step),
        }
    }
}

/// Parses a TRACK date token.
pub fn parse_date(token: &str, calendar: CalendarKind) -> Result<Timestamp, DateError> {
    let token = token.trim();

    if token.len() != 10 {
        return token
            .parse::<i64>()
            .map(Timestamp::Step)
            .map_err(|_| DateError::Invalid(token.to_string()));
    }

    let (year, month, day, hour) = split_ymdh(token)?;

    match calendar {
        CalendarKind::Day360 => Datetime360::from_ymdh_opt(year, month, day, hour)
            .map(Timestamp::Day360)
            .ok_or_else(|| DateError::OutOfRange(token.to_string(), calendar.name())),
        CalendarKind::Gregorian => NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, 0, 0))
            .map(Timestamp::Gregorian)
            .ok_or_else(|| DateError::OutOfRange(token.to_string(), calendar.name())),
    }
}

fn split_ymdh(token: &str) -> Result<(i32, u32, u32, u32), DateError> {
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DateError::Invalid(token.to_string()));
    }
    let field = |range: std::ops::Range<usize>| -> Result<u32, DateError> {
        token[range]
            .parse()
            .map_err(|_| DateError::Invalid(token.to_string()))
    };

    Ok((field(0..4)? as i32, field(4..6)?, field(6..8)?, field(8..10)?))
}

/// Seconds since the Unix epoch for a Gregorian timestamp.
pub fn gregorian_to_seconds(dt: &NaiveDateTime) -> i64 {
    dt.and_utc().timestamp()
}

pub fn gregorian_from_seconds(seconds: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(seconds, 0).map(|dt| dt.naive_utc())
}

// -- Tests -------------------------------------------------------------------
