//! Acquisition dates and year/month bounds for scene filtering.

use crate::{MosaicError, MosaicResult};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The date a scene was observed.
///
/// Ordered by calendar date, so sorting a cell's scenes by this type gives
/// oldest to newest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AcquisitionDate {
    /// Composite YYYYMMDD value
    pub yyyymmdd: u32,
    pub year: i32,
    /// Day of year, 1-based
    pub day_of_year: u32,
}

impl AcquisitionDate {
    /// Build from a composite YYYYMMDD value.
    pub fn from_yyyymmdd(value: u32) -> MosaicResult<Self> {
        let year = (value / 10_000) as i32;
        let month = (value / 100) % 100;
        let day = value % 100;
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| MosaicError::InvalidDate(value.to_string()))?;
        Ok(Self::from_naive(date))
    }

    /// Build from a year and 1-based day of year.
    pub fn from_year_doy(year: i32, day_of_year: u32) -> MosaicResult<Self> {
        let date = NaiveDate::from_yo_opt(year, day_of_year)
            .ok_or_else(|| MosaicError::InvalidDate(format!("{}/{:03}", year, day_of_year)))?;
        Ok(Self::from_naive(date))
    }

    /// Parse a YYYYMMDD string.
    pub fn parse(s: &str) -> MosaicResult<Self> {
        let trimmed = s.trim();
        if trimmed.len() != 8 {
            return Err(MosaicError::InvalidDate(s.to_string()));
        }
        let value: u32 = trimmed
            .parse()
            .map_err(|_| MosaicError::InvalidDate(s.to_string()))?;
        Self::from_yyyymmdd(value)
    }

    fn from_naive(date: NaiveDate) -> Self {
        Self {
            yyyymmdd: date.year() as u32 * 10_000 + date.month() * 100 + date.day(),
            year: date.year(),
            day_of_year: date.ordinal(),
        }
    }

    pub fn month(&self) -> u32 {
        (self.yyyymmdd / 100) % 100
    }

    pub fn year_month(&self) -> YearMonth {
        YearMonth::new(self.year, self.month())
    }
}

impl fmt::Display for AcquisitionDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.yyyymmdd)
    }
}

/// A year and month used as an inclusive date-filter bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Whether `date` falls inside `[start, end]`.
    ///
    /// The year must be inside the year range; the month is only compared
    /// when the date lies in one of the boundary years.
    pub fn range_contains(start: YearMonth, end: YearMonth, date: &AcquisitionDate) -> bool {
        if date.year < start.year || date.year > end.year {
            return false;
        }
        if date.year == start.year && date.month() < start.month {
            return false;
        }
        if date.year == end.year && date.month() > end.month {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yyyymmdd_computes_doy() {
        let date = AcquisitionDate::from_yyyymmdd(20200601).unwrap();
        assert_eq!(date.year, 2020);
        assert_eq!(date.month(), 6);
        // 2020 is a leap year: 31+29+31+30+31+1
        assert_eq!(date.day_of_year, 153);
    }

    #[test]
    fn test_from_year_doy_matches_composite() {
        let date = AcquisitionDate::from_year_doy(2020, 153).unwrap();
        assert_eq!(date.yyyymmdd, 20200601);
    }

    #[test]
    fn test_invalid_dates_rejected() {
        assert!(AcquisitionDate::from_yyyymmdd(20201341).is_err());
        assert!(AcquisitionDate::parse("2020061").is_err());
        assert!(AcquisitionDate::parse("abcdefgh").is_err());
    }

    #[test]
    fn test_range_contains_boundary_months() {
        let start = YearMonth::new(2019, 6);
        let end = YearMonth::new(2021, 3);
        let inside = AcquisitionDate::from_yyyymmdd(20200115).unwrap();
        let early = AcquisitionDate::from_yyyymmdd(20190515).unwrap();
        let late = AcquisitionDate::from_yyyymmdd(20210401).unwrap();
        let edge = AcquisitionDate::from_yyyymmdd(20210331).unwrap();
        assert!(YearMonth::range_contains(start, end, &inside));
        assert!(!YearMonth::range_contains(start, end, &early));
        assert!(!YearMonth::range_contains(start, end, &late));
        assert!(YearMonth::range_contains(start, end, &edge));
    }
}
