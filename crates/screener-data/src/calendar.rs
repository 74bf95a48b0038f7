//! TWSE 거래일 캘린더.
//!
//! 평일을 개장일로 보고, 설정된 휴장일(춘절, 국경일 등)과 주말 보충 개장일로 보정합니다.

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use chrono_tz::Asia::Taipei;
use std::collections::HashSet;
use tracing::debug;

use screener_core::{CalendarConfig, ScreenerResult, SourceError, TradingCalendar, TradingDate};

/// 개장일을 찾기 위해 거슬러 올라가는 최대 일수.
const MAX_LOOKBACK_DAYS: i64 = 30;

/// 대만 현지(Asia/Taipei) 기준 오늘 날짜.
pub fn taipei_today() -> NaiveDate {
    Utc::now().with_timezone(&Taipei).date_naive()
}

/// 설정 기반 TWSE 캘린더.
#[derive(Debug, Clone, Default)]
pub struct TwseCalendar {
    holidays: HashSet<NaiveDate>,
    extra_open_days: HashSet<NaiveDate>,
}

impl TwseCalendar {
    pub fn new(
        holidays: impl IntoIterator<Item = NaiveDate>,
        extra_open_days: impl IntoIterator<Item = NaiveDate>,
    ) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
            extra_open_days: extra_open_days.into_iter().collect(),
        }
    }

    /// 설정에서 캘린더를 만듭니다.
    pub fn from_config(config: &CalendarConfig) -> ScreenerResult<Self> {
        let calendar = Self::new(config.holiday_dates()?, config.extra_open_dates()?);
        debug!(
            holidays = calendar.holidays.len(),
            extra_open_days = calendar.extra_open_days.len(),
            "거래일 캘린더 로드"
        );
        Ok(calendar)
    }

    /// 개장일 여부.
    pub fn is_open(&self, date: NaiveDate) -> bool {
        if self.extra_open_days.contains(&date) {
            return true;
        }
        let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        !weekend && !self.holidays.contains(&date)
    }

    fn walk_back(&self, from: NaiveDate) -> Result<TradingDate, SourceError> {
        (0..=MAX_LOOKBACK_DAYS)
            .map(|offset| from - Duration::days(offset))
            .find(|d| self.is_open(*d))
            .map(TradingDate::confirmed)
            .ok_or_else(|| {
                SourceError::Parse(format!(
                    "{} 이전 {}일 안에 개장일이 없습니다",
                    from, MAX_LOOKBACK_DAYS
                ))
            })
    }
}

#[async_trait]
impl TradingCalendar for TwseCalendar {
    async fn nearest_open_on_or_before(&self, date: NaiveDate) -> Result<TradingDate, SourceError> {
        self.walk_back(date)
    }

    async fn previous_open(&self, date: NaiveDate) -> Result<TradingDate, SourceError> {
        self.walk_back(date - Duration::days(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_weekend_rolls_back_to_friday() {
        let calendar = TwseCalendar::default();
        // 2019-07-06 토요일
        let date = calendar.nearest_open_on_or_before(ymd(2019, 7, 6)).await.unwrap();
        assert_eq!(date.date(), ymd(2019, 7, 5));

        let date = calendar.nearest_open_on_or_before(ymd(2019, 7, 3)).await.unwrap();
        assert_eq!(date.date(), ymd(2019, 7, 3));
    }

    #[tokio::test]
    async fn test_previous_open_skips_holiday() {
        // 2019-06-07 단오절 (금)
        let calendar = TwseCalendar::new([ymd(2019, 6, 7)], []);
        let date = calendar.previous_open(ymd(2019, 6, 10)).await.unwrap();
        assert_eq!(date.date(), ymd(2019, 6, 6));
    }

    #[tokio::test]
    async fn test_extra_open_saturday() {
        let calendar = TwseCalendar::new([], [ymd(2019, 10, 5)]);
        assert!(calendar.is_open(ymd(2019, 10, 5)));
        let date = calendar.previous_open(ymd(2019, 10, 7)).await.unwrap();
        assert_eq!(date.date(), ymd(2019, 10, 5));
    }

    #[tokio::test]
    async fn test_lookback_limit() {
        let closed: Vec<NaiveDate> = (0..40).map(|i| ymd(2019, 1, 1) + Duration::days(i)).collect();
        let calendar = TwseCalendar::new(closed, []);
        assert!(calendar
            .nearest_open_on_or_before(ymd(2019, 2, 5))
            .await
            .is_err());
    }

    #[test]
    fn test_from_config_rejects_bad_date() {
        let config = CalendarConfig {
            holidays: vec!["2019-06-07".to_string()],
            extra_open_days: vec![],
        };
        assert!(TwseCalendar::from_config(&config).is_err());
    }
}
