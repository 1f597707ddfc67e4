//! Named date presets resolved into `[start, end]` timestamp boundaries.
//!
//! # Responsibility
//! - Resolve presets (today, this week, last month, ...) against a clock.
//! - Parse custom `"<start> - <end>"` ranges.
//!
//! # Invariants
//! - Starts are at `00:00:00`, ends at `23:59:59` of the boundary day.
//! - Weeks run Monday through Sunday.
//! - Resolution reads the injected clock exactly once.

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Timestamp text format used for boundaries and `updated_at` writes.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const CUSTOM_RANGE_SEPARATOR: &str = " - ";

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

/// Local system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePreset {
    Today,
    Yesterday,
    ThisWeek,
    ThisMonth,
    LastMonth,
    ThisYear,
    Custom,
}

impl DatePreset {
    /// Parses both the legacy tags (`date_day`, ...) and readable aliases.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "date_day" | "today" => Some(Self::Today),
            "date_yesterday" | "yesterday" => Some(Self::Yesterday),
            "date_week" | "this_week" => Some(Self::ThisWeek),
            "date_month" | "this_month" => Some(Self::ThisMonth),
            "date_lastmonth" | "last_month" => Some(Self::LastMonth),
            "date_year" | "this_year" => Some(Self::ThisYear),
            "date_other" | "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// Inclusive timestamp range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    fn days(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            start: first.and_time(NaiveTime::MIN),
            end: end_of_day(last),
        }
    }

    pub fn start_text(&self) -> String {
        self.start.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn end_text(&self) -> String {
        self.end.format(TIMESTAMP_FORMAT).to_string()
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{CUSTOM_RANGE_SEPARATOR}{}", self.start_text(), self.end_text())
    }
}

/// Resolves presets against an injected clock.
pub struct DateRangeResolver<C: Clock> {
    clock: C,
}

impl<C: Clock> DateRangeResolver<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Resolves a preset tag; `horizon` is read only for the custom preset.
    ///
    /// Returns `None` for unknown tags and unparseable custom ranges.
    pub fn resolve(&self, preset: &str, horizon: &str) -> Option<DateRange> {
        self.resolve_preset(DatePreset::parse(preset)?, horizon)
    }

    pub fn resolve_preset(&self, preset: DatePreset, horizon: &str) -> Option<DateRange> {
        let today = self.clock.now().date();
        let range = match preset {
            DatePreset::Today => DateRange::days(today, today),
            DatePreset::Yesterday => {
                let yesterday = today.pred_opt()?;
                DateRange::days(yesterday, yesterday)
            }
            DatePreset::ThisWeek => {
                let monday =
                    today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
                DateRange::days(monday, monday + Duration::days(6))
            }
            DatePreset::ThisMonth => {
                let first = today.with_day(1)?;
                DateRange::days(first, last_day_of_month(first)?)
            }
            DatePreset::LastMonth => {
                let first_of_this = today.with_day(1)?;
                let last = first_of_this.pred_opt()?;
                DateRange::days(last.with_day(1)?, last)
            }
            DatePreset::ThisYear => DateRange::days(
                NaiveDate::from_ymd_opt(today.year(), 1, 1)?,
                NaiveDate::from_ymd_opt(today.year(), 12, 31)?,
            ),
            DatePreset::Custom => return parse_custom_range(horizon),
        };
        Some(range)
    }
}

/// Parses `"<start> - <end>"`; each side is a timestamp or a bare date.
pub fn parse_custom_range(horizon: &str) -> Option<DateRange> {
    let (start, end) = horizon.trim().split_once(CUSTOM_RANGE_SEPARATOR)?;
    let start = parse_boundary(start, false)?;
    let end = parse_boundary(end, true)?;
    Some(DateRange { start, end })
}

fn parse_boundary(text: &str, is_end: bool) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(value) = NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT) {
        return Some(value);
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    Some(if is_end {
        end_of_day(date)
    } else {
        date.and_time(NaiveTime::MIN)
    })
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
}

fn last_day_of_month(first: NaiveDate) -> Option<NaiveDate> {
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)?
    };
    next_month.pred_opt()
}
