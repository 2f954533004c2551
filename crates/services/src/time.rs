//! Client timestamps arrive as milliseconds in IST (+05:30). Everything
//! persisted is UTC.

use bson::{DateTime, Document};
use chrono::{Datelike, Utc};
use serde::Serialize;

use crate::error::{ServiceError, ServiceResult};

pub const IST_OFFSET_MILLIS: i64 = 19_800_000;
pub const DAY_MILLIS: i64 = 86_400_000;

/// 0001-01-01T00:00:00Z
pub const MIN_CLIENT_MILLIS: i64 = -62_135_596_800_000;
/// 9999-12-31T23:59:59.999Z
pub const MAX_CLIENT_MILLIS: i64 = 253_402_300_799_999;

/// Upper bound on points in one progress series.
pub const MAX_SERIES_POINTS: usize = 1_000;

fn check_client_millis(field: &str, millis: i64) -> ServiceResult<i64> {
    if (MIN_CLIENT_MILLIS..=MAX_CLIENT_MILLIS).contains(&millis) {
        Ok(millis)
    } else {
        Err(ServiceError::validation(field, "Timestamp is out of range"))
    }
}

/// `utc = ist - offset`. Timestamps outside years 1..=9999 are rejected
/// against `field`.
pub fn ist_to_utc(field: &str, ist_millis: i64) -> ServiceResult<DateTime> {
    let utc = ist_millis
        .checked_sub(IST_OFFSET_MILLIS)
        .ok_or_else(|| ServiceError::validation(field, "Timestamp is out of range"))?;
    Ok(DateTime::from_millis(check_client_millis(field, utc)?))
}

pub fn utc_to_ist_millis(at: DateTime) -> i64 {
    at.timestamp_millis() + IST_OFFSET_MILLIS
}

fn to_chrono(millis: i64) -> chrono::DateTime<Utc> {
    chrono::DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

fn floor_day(millis: i64) -> i64 {
    millis.div_euclid(DAY_MILLIS) * DAY_MILLIS
}

/// Start of the IST calendar day containing `at`.
pub fn ist_day_start(at: DateTime) -> DateTime {
    let ist = utc_to_ist_millis(at);
    DateTime::from_millis(floor_day(ist) - IST_OFFSET_MILLIS)
}

/// Start of the IST week (Monday) containing `at`.
pub fn ist_week_start(at: DateTime) -> DateTime {
    let ist = utc_to_ist_millis(at);
    let days_from_monday = i64::from(to_chrono(ist).weekday().num_days_from_monday());
    DateTime::from_millis(floor_day(ist) - days_from_monday * DAY_MILLIS - IST_OFFSET_MILLIS)
}

/// Start of the IST calendar month containing `at`.
pub fn ist_month_start(at: DateTime) -> DateTime {
    let ist = utc_to_ist_millis(at);
    DateTime::from_millis(first_of_month(ist) - IST_OFFSET_MILLIS)
}

fn first_of_month(millis: i64) -> i64 {
    let day0 = i64::from(to_chrono(millis).day0());
    floor_day(millis) - day0 * DAY_MILLIS
}

/// Target month key: the first day of the UTC month at 00:00 UTC.
pub fn month_key(at: DateTime) -> DateTime {
    DateTime::from_millis(first_of_month(at.timestamp_millis()))
}

/// Month key for a client-supplied IST timestamp. The IST wall clock picks the
/// calendar month.
pub fn month_key_from_ist(field: &str, ist_millis: i64) -> ServiceResult<DateTime> {
    let ist = check_client_millis(field, ist_millis)?;
    Ok(month_key(DateTime::from_millis(ist)))
}

/// Inclusive creation/due window. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DateRange {
    pub start: Option<DateTime>,
    pub end: Option<DateTime>,
}

impl DateRange {
    pub fn new(start: Option<DateTime>, end: Option<DateTime>) -> Self {
        Self { start, end }
    }

    pub fn from_ist_millis(start: Option<i64>, end: Option<i64>) -> ServiceResult<Self> {
        let range = Self {
            start: start.map(|s| ist_to_utc("start", s)).transpose()?,
            end: end.map(|e| ist_to_utc("end", e)).transpose()?,
        };
        if let (Some(start), Some(end)) = (range.start, range.end) {
            if start > end {
                return Err(ServiceError::validation("end", "End is before start"));
            }
        }
        Ok(range)
    }

    pub fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, at: DateTime) -> bool {
        self.start.is_none_or(|start| at >= start) && self.end.is_none_or(|end| at <= end)
    }

    /// `{$gte, $lte}` predicate, or `None` when both bounds are open.
    pub fn to_document(&self) -> Option<Document> {
        if self.is_open() {
            return None;
        }
        let mut cond = Document::new();
        if let Some(start) = self.start {
            cond.insert("$gte", start);
        }
        if let Some(end) = self.end {
            cond.insert("$lte", end);
        }
        Some(cond)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    /// Daily up to 30 days, weekly up to 90, monthly beyond.
    pub fn for_range(start: DateTime, end: DateTime) -> Self {
        let days = (end.timestamp_millis() - start.timestamp_millis()) / DAY_MILLIS;
        if days <= 30 {
            Granularity::Day
        } else if days <= 90 {
            Granularity::Week
        } else {
            Granularity::Month
        }
    }

    pub fn bucket_start(&self, at: DateTime) -> DateTime {
        match self {
            Granularity::Day => ist_day_start(at),
            Granularity::Week => ist_week_start(at),
            Granularity::Month => ist_month_start(at),
        }
    }

    fn next(&self, bucket: DateTime) -> DateTime {
        let millis = bucket.timestamp_millis();
        match self {
            Granularity::Day => DateTime::from_millis(millis + DAY_MILLIS),
            Granularity::Week => DateTime::from_millis(millis + 7 * DAY_MILLIS),
            Granularity::Month => ist_month_start(DateTime::from_millis(millis + 32 * DAY_MILLIS)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressPoint {
    /// Bucket start, UTC millis.
    pub start: i64,
    pub count: u64,
}

/// Counts `instants` per bucket between `start` and `end`, emitting a zero for
/// every empty bucket. Fails once the range needs more than
/// [`MAX_SERIES_POINTS`] buckets.
pub fn bucket_series(
    granularity: Granularity,
    start: DateTime,
    end: DateTime,
    instants: impl IntoIterator<Item = DateTime>,
) -> ServiceResult<Vec<ProgressPoint>> {
    let mut series = Vec::new();
    let mut bucket = granularity.bucket_start(start);
    while bucket <= end {
        if series.len() == MAX_SERIES_POINTS {
            return Err(ServiceError::validation(
                "start",
                "Date range is too wide for a progress series",
            ));
        }
        series.push(ProgressPoint {
            start: bucket.timestamp_millis(),
            count: 0,
        });
        bucket = granularity.next(bucket);
    }

    for at in instants {
        if at < start || at > end {
            continue;
        }
        let key = granularity.bucket_start(at).timestamp_millis();
        if let Ok(i) = series.binary_search_by_key(&key, |p| p.start) {
            series[i].count += 1;
        }
    }
    Ok(series)
}
