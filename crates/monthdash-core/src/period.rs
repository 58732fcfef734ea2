//! Calendar month used to key inputs, folders, and analysis outputs.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

pub const MIN_YEAR: i32 = 2020;
pub const MAX_YEAR: i32 = 2030;

/// A validated (year, month) pair. Displays as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Build a period, rejecting years outside 2020..=2030 and months outside 1..=12.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for out-of-range values.
    pub fn new(year: i32, month: u32) -> Result<Self, ConfigError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(ConfigError::Validation(format!(
                "year {year} is outside {MIN_YEAR}..={MAX_YEAR}"
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(ConfigError::Validation(format!(
                "month {month} is outside 1..=12"
            )));
        }
        Ok(Self { year, month })
    }

    #[must_use]
    pub fn year(self) -> i32 {
        self.year
    }

    #[must_use]
    pub fn month(self) -> u32 {
        self.month
    }

    /// Folder name for this month, e.g. `2025-08`.
    #[must_use]
    pub fn folder_name(self) -> String {
        self.to_string()
    }

    /// First calendar day of the month.
    #[must_use]
    pub fn first_day(self) -> NaiveDate {
        // Validated in `new`, so the date always exists.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last calendar day of the month.
    #[must_use]
    pub fn last_day(self) -> NaiveDate {
        if self.month == 12 {
            return NaiveDate::from_ymd_opt(self.year, 12, 31).unwrap_or(NaiveDate::MAX);
        }
        NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    /// Whether `date` falls within `[first_day, last_day]`.
    #[must_use]
    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// The following month, or `None` past December of the last supported year.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        if self.month == 12 {
            Self::new(self.year + 1, 1).ok()
        } else {
            Some(Self {
                year: self.year,
                month: self.month + 1,
            })
        }
    }

    /// All months from `start` through `end` inclusive. Empty when `start > end`.
    #[must_use]
    pub fn range_inclusive(start: Self, end: Self) -> Vec<Self> {
        let mut months = Vec::new();
        let mut current = Some(start);
        while let Some(m) = current {
            if m > end {
                break;
            }
            months.push(m);
            current = m.next();
        }
        months
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::Validation(format!("expected YYYY-MM, got '{s}'"));
        let (y, m) = s.trim().split_once('-').ok_or_else(invalid)?;
        if y.len() != 4 || m.len() != 2 {
            return Err(invalid());
        }
        let year = y.parse::<i32>().map_err(|_| invalid())?;
        let month = m.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(y: i32, m: u32) -> YearMonth {
        YearMonth::new(y, m).unwrap()
    }

    #[test]
    fn displays_zero_padded() {
        assert_eq!(ym(2025, 8).to_string(), "2025-08");
        assert_eq!(ym(2025, 12).folder_name(), "2025-12");
    }

    #[test]
    fn rejects_out_of_range_month() {
        assert!(YearMonth::new(2025, 0).is_err());
        assert!(YearMonth::new(2025, 13).is_err());
    }

    #[test]
    fn rejects_out_of_range_year() {
        assert!(YearMonth::new(2019, 5).is_err());
        assert!(YearMonth::new(2031, 5).is_err());
    }

    #[test]
    fn last_day_handles_february_and_december() {
        assert_eq!(
            ym(2024, 2).last_day(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            ym(2025, 12).last_day(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
        );
        assert_eq!(
            ym(2030, 12).last_day(),
            NaiveDate::from_ymd_opt(2030, 12, 31).unwrap()
        );
    }

    #[test]
    fn contains_is_bounded_by_first_and_last_day() {
        let aug = ym(2025, 8);
        assert!(aug.contains(aug.first_day()));
        assert!(aug.contains(aug.last_day()));
        assert!(!aug.contains(NaiveDate::from_ymd_opt(2025, 7, 31).unwrap()));
        assert!(!aug.contains(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()));
    }

    #[test]
    fn parses_folder_names() {
        assert_eq!("2025-08".parse::<YearMonth>().unwrap(), ym(2025, 8));
        assert!("2025-8".parse::<YearMonth>().is_err());
        assert!("202508".parse::<YearMonth>().is_err());
        assert!("2025-13".parse::<YearMonth>().is_err());
    }

    #[test]
    fn range_crosses_year_boundary() {
        let months = YearMonth::range_inclusive(ym(2024, 11), ym(2025, 2));
        let names: Vec<String> = months.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["2024-11", "2024-12", "2025-01", "2025-02"]);
    }

    #[test]
    fn range_is_empty_when_reversed() {
        assert!(YearMonth::range_inclusive(ym(2025, 3), ym(2025, 1)).is_empty());
    }
}
