//! Cycle-canonical date strings and period arithmetic.
//!
//! The provider expects `YYYY` for annual, `YYYYSn` for semi-annual,
//! `YYYYQn` for quarterly, `YYYYMM` for monthly, `YYYYMMSn` for
//! semi-monthly and `YYYYMMDD` for daily series.

use std::fmt;

use chrono::{Datelike, Days, Months, NaiveDate};

use super::types::Cycle;

/// Strips separators and truncates to the canonical width of `cycle`.
pub fn format_date(raw: &str, cycle: Cycle) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let cleaned: String = raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    let width = match cycle {
        Cycle::Annual => Some(4),
        Cycle::Quarterly | Cycle::Monthly => Some(6),
        Cycle::Daily => Some(8),
        Cycle::SemiAnnual | Cycle::SemiMonthly => None,
    };

    match width {
        Some(w) => cleaned.chars().take(w).collect(),
        None => cleaned,
    }
}

/// A single reporting period. Ordering is chronological within one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Period {
    Year(i32),
    Half { year: i32, half: u32 },
    Quarter { year: i32, quarter: u32 },
    Month { year: i32, month: u32 },
    HalfMonth { year: i32, month: u32, half: u32 },
    Day(NaiveDate),
}

impl Period {
    /// Parses a period string of the given cycle. Separators are tolerated.
    pub fn parse(raw: &str, cycle: Cycle) -> Option<Period> {
        let s = format_date(raw, cycle).to_ascii_uppercase();
        let year = |s: &str| -> Option<i32> { s.get(0..4)?.parse().ok() };
        let num = |s: &str, range: std::ops::Range<usize>| -> Option<u32> {
            s.get(range)?.parse().ok()
        };

        match cycle {
            Cycle::Annual if s.len() == 4 => Some(Period::Year(year(&s)?)),
            Cycle::SemiAnnual if s.len() == 6 && &s[4..5] == "S" => {
                let half = num(&s, 5..6).filter(|h| (1..=2).contains(h))?;
                Some(Period::Half {
                    year: year(&s)?,
                    half,
                })
            }
            Cycle::Quarterly if s.len() == 6 && &s[4..5] == "Q" => {
                let quarter = num(&s, 5..6).filter(|q| (1..=4).contains(q))?;
                Some(Period::Quarter {
                    year: year(&s)?,
                    quarter,
                })
            }
            Cycle::Monthly if s.len() == 6 => {
                let month = num(&s, 4..6).filter(|m| (1..=12).contains(m))?;
                Some(Period::Month {
                    year: year(&s)?,
                    month,
                })
            }
            Cycle::SemiMonthly if s.len() == 8 && &s[6..7] == "S" => {
                let month = num(&s, 4..6).filter(|m| (1..=12).contains(m))?;
                let half = num(&s, 7..8).filter(|h| (1..=2).contains(h))?;
                Some(Period::HalfMonth {
                    year: year(&s)?,
                    month,
                    half,
                })
            }
            Cycle::Daily if s.len() == 8 => NaiveDate::parse_from_str(&s, "%Y%m%d")
                .ok()
                .map(Period::Day),
            _ => None,
        }
    }

    /// Moves the period by `n` steps of its own cycle (negative = earlier).
    ///
    /// Returns `None` when the result falls outside the representable years.
    pub fn shift(self, n: i64) -> Option<Period> {
        let step = |index: i64, per_year: i64| -> Option<(i32, u32)> {
            let shifted = index.checked_add(n)?;
            let year = i32::try_from(shifted.div_euclid(per_year)).ok()?;
            Some((year, shifted.rem_euclid(per_year) as u32 + 1))
        };

        match self {
            Period::Year(y) => {
                let year = i32::try_from(i64::from(y).checked_add(n)?).ok()?;
                Some(Period::Year(year))
            }
            Period::Half { year, half } => {
                let (year, half) = step(year as i64 * 2 + (half as i64 - 1), 2)?;
                Some(Period::Half { year, half })
            }
            Period::Quarter { year, quarter } => {
                let (year, quarter) = step(year as i64 * 4 + (quarter as i64 - 1), 4)?;
                Some(Period::Quarter { year, quarter })
            }
            Period::Month { year, month } => {
                let (year, month) = step(year as i64 * 12 + (month as i64 - 1), 12)?;
                Some(Period::Month { year, month })
            }
            Period::HalfMonth { year, month, half } => {
                let index = year as i64 * 24 + (month as i64 - 1) * 2 + (half as i64 - 1);
                let (year, slot) = step(index, 24)?;
                Some(Period::HalfMonth {
                    year,
                    month: (slot - 1) / 2 + 1,
                    half: (slot - 1) % 2 + 1,
                })
            }
            Period::Day(date) => {
                if n >= 0 {
                    date.checked_add_days(Days::new(n as u64)).map(Period::Day)
                } else {
                    date.checked_sub_days(Days::new(n.unsigned_abs()))
                        .map(Period::Day)
                }
            }
        }
    }

    pub fn year(&self) -> i32 {
        match self {
            Period::Year(y) => *y,
            Period::Half { year, .. }
            | Period::Quarter { year, .. }
            | Period::Month { year, .. }
            | Period::HalfMonth { year, .. } => *year,
            Period::Day(d) => d.year(),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Year(y) => write!(f, "{:04}", y),
            Period::Half { year, half } => write!(f, "{:04}S{}", year, half),
            Period::Quarter { year, quarter } => write!(f, "{:04}Q{}", year, quarter),
            Period::Month { year, month } => write!(f, "{:04}{:02}", year, month),
            Period::HalfMonth { year, month, half } => {
                write!(f, "{:04}{:02}S{}", year, month, half)
            }
            Period::Day(d) => write!(f, "{}", d.format("%Y%m%d")),
        }
    }
}

fn periods_per_year(cycle: Cycle) -> i64 {
    match cycle {
        Cycle::Annual => 1,
        Cycle::SemiAnnual => 2,
        Cycle::Quarterly => 4,
        Cycle::Monthly => 12,
        Cycle::SemiMonthly => 24,
        Cycle::Daily => 365,
    }
}

/// The `years`-long window ending at `item_end`, clipped to `item_start`.
///
/// Returns `None` when `item_end` does not parse for `cycle`, `years` is 0,
/// or the window start would overflow the calendar.
pub fn recent_window(
    cycle: Cycle,
    item_start: &str,
    item_end: &str,
    years: u32,
) -> Option<(String, String)> {
    if years == 0 {
        return None;
    }
    let end = Period::parse(item_end, cycle)?;

    let start = match end {
        Period::Day(date) => date
            .checked_sub_months(Months::new(years.checked_mul(12)?))
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .map(Period::Day)?,
        _ => {
            let steps = periods_per_year(cycle).checked_mul(i64::from(years))? - 1;
            end.shift(-steps)?
        }
    };

    let start = match Period::parse(item_start, cycle) {
        Some(earliest) if start < earliest => earliest,
        _ => start,
    };

    Some((start.to_string(), end.to_string()))
}

/// True when `value` lies inside `[start, end]`; false if any side fails to parse.
pub fn within_window(value: &str, start: &str, end: &str, cycle: Cycle) -> bool {
    match (
        Period::parse(value, cycle),
        Period::parse(start, cycle),
        Period::parse(end, cycle),
    ) {
        (Some(v), Some(s), Some(e)) => s <= v && v <= e,
        _ => false,
    }
}
