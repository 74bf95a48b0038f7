//! 거래일 타입.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 채팅 명령어와 캐시 파일에 쓰이는 날짜 형식 (`20190703`).
pub const COMPACT_DATE_FORMAT: &str = "%Y%m%d";

/// 개장이 확인된 거래일.
///
/// 윈도우 탐색과 캐시 키는 항상 이 타입을 사용합니다. 임의의 달력 날짜는
/// [`TradingCalendar`](crate::domain::provider::TradingCalendar)를 거쳐서만
/// `TradingDate`가 됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradingDate(NaiveDate);

impl TradingDate {
    /// 캘린더가 개장일로 확인한 날짜를 감쌉니다.
    pub fn confirmed(date: NaiveDate) -> Self {
        Self(date)
    }

    /// 내부 달력 날짜.
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// `YYYYMMDD` 문자열.
    pub fn compact(&self) -> String {
        self.0.format(COMPACT_DATE_FORMAT).to_string()
    }

    /// 해당 월 1일.
    pub fn month_start(&self) -> NaiveDate {
        month_start(self.0)
    }

    /// `days`일 이전의 달력 날짜 (거래일 여부와 무관).
    pub fn days_before(&self, days: i64) -> NaiveDate {
        self.0 - Duration::days(days)
    }
}

impl fmt::Display for TradingDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(COMPACT_DATE_FORMAT))
    }
}

/// `YYYYMMDD` 문자열을 날짜로 파싱합니다.
///
/// 8자리 숫자가 아니면 `None`을 반환합니다.
pub fn parse_compact_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(s, COMPACT_DATE_FORMAT).ok()
}

/// 날짜가 속한 월의 1일.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// 이전 월의 1일.
pub fn previous_month_start(date: NaiveDate) -> NaiveDate {
    month_start(month_start(date) - Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_compact_date() {
        assert_eq!(parse_compact_date("20190703"), Some(ymd(2019, 7, 3)));
        assert_eq!(parse_compact_date("2019073"), None);
        assert_eq!(parse_compact_date("股票"), None);
        assert_eq!(parse_compact_date("20191332"), None);
    }

    #[test]
    fn test_display_is_compact() {
        let date = TradingDate::confirmed(ymd(2019, 7, 3));
        assert_eq!(date.to_string(), "20190703");
        assert_eq!(date.compact(), "20190703");
    }

    #[test]
    fn test_month_helpers() {
        assert_eq!(month_start(ymd(2019, 7, 3)), ymd(2019, 7, 1));
        assert_eq!(previous_month_start(ymd(2019, 7, 3)), ymd(2019, 6, 1));
        assert_eq!(previous_month_start(ymd(2019, 1, 15)), ymd(2018, 12, 1));
    }
}
