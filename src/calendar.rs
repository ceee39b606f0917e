use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::errors::{LoanError, Result};

const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// parse a caller supplied timestamp
///
/// accepts rfc 3339, `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS` (read as utc)
/// and a bare `YYYY-MM-DD` (midnight utc).
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, DATE_FORMAT) {
        return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    }

    Err(LoanError::InvalidDate {
        message: format!("unrecognised timestamp {:?}", input),
    })
}

/// add whole calendar months, clamping the day to the end of shorter months
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| LoanError::InvalidDate {
            message: format!("{} plus {} months is out of range", date, months),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_add_months_clamps_to_month_end() {
        assert_eq!(add_months(date(2024, 1, 31), 1).unwrap(), date(2024, 2, 29));
        assert_eq!(add_months(date(2023, 1, 31), 1).unwrap(), date(2023, 2, 28));
        assert_eq!(add_months(date(2024, 1, 31), 3).unwrap(), date(2024, 4, 30));
        assert_eq!(add_months(date(2024, 1, 31), 2).unwrap(), date(2024, 3, 31));
    }

    #[test]
    fn test_add_months_rolls_year() {
        assert_eq!(add_months(date(2024, 11, 15), 3).unwrap(), date(2025, 2, 15));
        assert_eq!(add_months(date(2024, 6, 1), 0).unwrap(), date(2024, 6, 1));
    }

    #[test]
    fn test_add_months_out_of_range() {
        assert!(add_months(NaiveDate::MAX, 1).is_err());
    }

    #[test]
    fn test_parse_rfc3339_converts_to_utc() {
        let parsed = parse_timestamp("2024-01-31T08:00:00+08:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_plain_formats() {
        let with_time = parse_timestamp("2024-03-05 14:30:00").unwrap();
        assert_eq!(with_time.date_naive(), date(2024, 3, 5));
        assert_eq!(with_time.hour(), 14);

        let date_only = parse_timestamp("2024-03-05").unwrap();
        assert_eq!(date_only, Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_timestamp("next tuesday").unwrap_err();
        assert!(matches!(err, LoanError::InvalidDate { .. }));
        assert!(parse_timestamp("2024-02-30").is_err());
    }
}
