use crate::error::{CostReportError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated calendar month, rendered as `YYYYMM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|_| Self { year, month })
            .ok_or_else(|| CostReportError::InvalidMonth(format!("{:04}{:02}", year, month)))
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Same month number, one calendar year earlier.
    pub fn prior_year(&self) -> Self {
        Self {
            year: self.year - 1,
            month: self.month,
        }
    }

    /// January of the same year.
    pub fn year_start(&self) -> Self {
        Self {
            year: self.year,
            month: 1,
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        // Constructors guarantee a valid (year, month) pair.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = CostReportError;

    fn from_str(s: &str) -> Result<Self> {
        parse_year_month(s)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = CostReportError;

    fn try_from(value: String) -> Result<Self> {
        parse_year_month(&value)
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

/// Parses "YYYYMM" or "YYYY-MM".
pub fn parse_year_month(raw: &str) -> Result<YearMonth> {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(|c| *c != '-').collect();

    let well_formed = digits.len() == 6
        && digits.chars().all(|c| c.is_ascii_digit())
        && (trimmed.len() == 6 || (trimmed.len() == 7 && trimmed.as_bytes()[4] == b'-'));

    if !well_formed {
        return Err(CostReportError::InvalidMonth(raw.to_string()));
    }

    let year: i32 = digits[..4]
        .parse()
        .map_err(|_| CostReportError::InvalidMonth(raw.to_string()))?;
    let month: u32 = digits[4..]
        .parse()
        .map_err(|_| CostReportError::InvalidMonth(raw.to_string()))?;

    YearMonth::new(year, month).map_err(|_| CostReportError::InvalidMonth(raw.to_string()))
}

/// Normalizes a month cell to `YYYYMM`. Unparseable input is returned trimmed
/// so that it never matches a comparison window but is not lost either.
pub fn normalize_month(raw: &str) -> String {
    match parse_year_month(raw) {
        Ok(ym) => ym.to_string(),
        Err(_) => raw.trim().to_string(),
    }
}

/// Inclusive list of months from `start` to `end`.
pub fn months_between(start: YearMonth, end: YearMonth) -> Vec<YearMonth> {
    let mut months = Vec::new();
    let mut current = start;
    while current <= end {
        months.push(current);
        current = current.next();
    }
    months
}

/// Rounds to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Converts a raw amount into whole reporting units (e.g. millions).
pub fn to_reporting_unit(amount: f64, unit_divisor: f64) -> f64 {
    if unit_divisor == 0.0 || !amount.is_finite() {
        return 0.0;
    }
    (amount / unit_divisor).round()
}

/// Like [`to_reporting_unit`] but keeps one decimal place, for per-person
/// and per-store figures.
pub fn to_reporting_unit_1dp(amount: f64, unit_divisor: f64) -> f64 {
    if unit_divisor == 0.0 || !amount.is_finite() {
        return 0.0;
    }
    round1(amount / unit_divisor)
}
