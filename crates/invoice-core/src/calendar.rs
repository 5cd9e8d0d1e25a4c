//! # Display Calendar
//!
//! Converts the issue date into the calendar the merchant reads invoices in.
//!
//! The Persian (Solar Hijri) conversion is the arithmetic 33-year cycle
//! algorithm; it agrees with the astronomical calendar for the years 1178
//! to 1633 SH.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Calendar used for the printed invoice date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayCalendar {
    Gregorian,
    #[default]
    Persian,
}

impl DisplayCalendar {
    /// Formats `date` as `yyyy/mm/dd` in this calendar.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::NaiveDate;
    /// use invoice_core::calendar::DisplayCalendar;
    ///
    /// let date = NaiveDate::from_ymd_opt(2023, 6, 3).unwrap();
    /// assert_eq!(DisplayCalendar::Persian.format(date), "1402/03/13");
    /// assert_eq!(DisplayCalendar::Gregorian.format(date), "2023/06/03");
    /// ```
    pub fn format(&self, date: NaiveDate) -> String {
        let (y, m, d) = match self {
            DisplayCalendar::Gregorian => (date.year(), date.month(), date.day()),
            DisplayCalendar::Persian => gregorian_to_persian(date),
        };
        format!("{:04}/{:02}/{:02}", y, m, d)
    }
}

impl std::str::FromStr for DisplayCalendar {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gregorian" => Ok(DisplayCalendar::Gregorian),
            "persian" | "jalali" | "solar_hijri" => Ok(DisplayCalendar::Persian),
            other => Err(format!(
                "Unknown calendar: '{}'. Valid options: gregorian, persian",
                other
            )),
        }
    }
}

/// Converts a Gregorian date to `(year, month, day)` in the Solar Hijri calendar.
pub fn gregorian_to_persian(date: NaiveDate) -> (i32, u32, u32) {
    const DAYS_BEFORE_MONTH: [i64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

    let gy = date.year() as i64;
    let gm = date.month() as usize;
    let gd = date.day() as i64;

    // Leap-day adjustment counts the current year once February has passed.
    let gy2 = if gm > 2 { gy + 1 } else { gy };
    let mut days = 355_666 + 365 * gy + (gy2 + 3) / 4 - (gy2 + 99) / 100 + (gy2 + 399) / 400
        + gd
        + DAYS_BEFORE_MONTH[gm - 1];

    let mut jy = -1595 + 33 * (days / 12_053);
    days %= 12_053;
    jy += 4 * (days / 1461);
    days %= 1461;
    if days > 365 {
        jy += (days - 1) / 365;
        days = (days - 1) % 365;
    }

    let (jm, jd) = if days < 186 {
        (1 + days / 31, 1 + days % 31)
    } else {
        (7 + (days - 186) / 30, 1 + (days - 186) % 30)
    };

    (jy as i32, jm as u32, jd as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_known_persian_dates() {
        assert_eq!(gregorian_to_persian(date(2023, 6, 3)), (1402, 3, 13));
        // Nowruz
        assert_eq!(gregorian_to_persian(date(2024, 3, 20)), (1403, 1, 1));
        assert_eq!(gregorian_to_persian(date(2025, 3, 21)), (1404, 1, 1));
        // Second half of the year has 30-day months
        assert_eq!(gregorian_to_persian(date(2026, 10, 17)), (1405, 7, 25));
    }

    #[test]
    fn test_format_pads() {
        assert_eq!(DisplayCalendar::Gregorian.format(date(2024, 1, 5)), "2024/01/05");
        assert_eq!(DisplayCalendar::Persian.format(date(2024, 3, 20)), "1403/01/01");
    }

    #[test]
    fn test_parse_calendar() {
        assert_eq!("Jalali".parse::<DisplayCalendar>().unwrap(), DisplayCalendar::Persian);
        assert_eq!("gregorian".parse::<DisplayCalendar>().unwrap(), DisplayCalendar::Gregorian);
        assert!("lunar".parse::<DisplayCalendar>().is_err());
    }
}
