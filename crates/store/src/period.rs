use articlevec_common::{ArticleVecError, Result};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Inclusive date range named by a month (`2025-07`) or quarter (`2025-Q3`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let invalid = || ArticleVecError::invalid_input(format!("invalid period '{}', expected YYYY-MM or YYYY-Qn", text));

        let (year, rest) = text.split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;

        let (first_month, months) = match rest.strip_prefix(|c: char| c.eq_ignore_ascii_case(&'q')) {
            Some(quarter) => {
                let quarter: u32 = quarter.parse().map_err(|_| invalid())?;
                if !(1..=4).contains(&quarter) {
                    return Err(invalid());
                }
                ((quarter - 1) * 3 + 1, 3)
            }
            None => {
                if rest.len() != 2 {
                    return Err(invalid());
                }
                (rest.parse::<u32>().map_err(|_| invalid())?, 1)
            }
        };

        let start = NaiveDate::from_ymd_opt(year, first_month, 1).ok_or_else(invalid)?;
        let end = last_day_of_month(year, first_month + months - 1).ok_or_else(invalid)?;
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

impl FromStr for Period {
    type Err = ArticleVecError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.month() == self.end.month() {
            write!(f, "{}-{:02}", self.start.year(), self.start.month())
        } else {
            write!(f, "{}-Q{}", self.start.year(), (self.start.month() - 1) / 3 + 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month() {
        let period = Period::parse("2025-02").unwrap();
        assert_eq!(period.start, date(2025, 2, 1));
        assert_eq!(period.end, date(2025, 2, 28));
        assert_eq!(period.to_string(), "2025-02");

        let december = Period::parse("2024-12").unwrap();
        assert_eq!(december.end, date(2024, 12, 31));
    }

    #[test]
    fn test_quarter() {
        let period: Period = "2025-q3".parse().unwrap();
        assert_eq!(period.start, date(2025, 7, 1));
        assert_eq!(period.end, date(2025, 9, 30));
        assert!(period.contains(date(2025, 9, 30)));
        assert!(!period.contains(date(2025, 10, 1)));
        assert_eq!(period.to_string(), "2025-Q3");

        assert_eq!(Period::parse("2024-Q4").unwrap().end, date(2024, 12, 31));
    }

    #[test]
    fn test_invalid() {
        for text in ["2025", "2025-13", "2025-Q5", "2025-7", "July 2025", "2025-Q"] {
            assert!(Period::parse(text).is_err(), "{} should be rejected", text);
        }
    }
}
