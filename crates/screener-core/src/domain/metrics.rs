//! 당일 지표 계산.
//!
//! 일봉 이력에서 당일 등락폭, 종가, 상승률, N일 이동평균을 계산합니다.
//! 요청마다 새로 계산하며 캐시하지 않습니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::market_data::DailyBar;

/// 종목의 당일 지표.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMetrics {
    /// 당일 등락폭
    pub today_range: Decimal,
    /// 당일 종가
    pub today_price: Decimal,
    /// 당일 상승률 (%) = 등락폭 / 종가 * 100
    pub today_gain_pct: Decimal,
    /// N일 이동평균
    pub n_day_average: Decimal,
    /// 종가가 이동평균을 상회하는지 여부
    pub above_average: bool,
}

impl StockMetrics {
    /// 일봉(날짜 오름차순, 마지막이 당일)에서 지표를 계산합니다.
    ///
    /// 일봉이 `ma_days`개 미만이거나 `ma_days`가 0이면 `None`.
    /// 종가가 0이면 상승률은 0으로 둡니다.
    pub fn compute(bars: &[DailyBar], ma_days: usize) -> Option<Self> {
        if ma_days == 0 || bars.len() < ma_days {
            return None;
        }

        let today = bars.last()?;
        let today_range = today.change;
        let today_price = today.close;
        let today_gain_pct = today_range
            .checked_div(today_price)
            .map(|ratio| ratio * Decimal::ONE_HUNDRED)
            .unwrap_or(Decimal::ZERO);

        let window = &bars[bars.len() - ma_days..];
        let sum: Decimal = window.iter().map(|b| b.close).sum();
        let n_day_average = sum / Decimal::from(ma_days as u64);

        Some(Self {
            today_range,
            today_price,
            today_gain_pct,
            n_day_average,
            above_average: today_price > n_day_average,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn bar(day: u32, close: Decimal, change: Decimal) -> DailyBar {
        DailyBar {
            date: NaiveDate::from_ymd_opt(2019, 7, day).unwrap(),
            volume: 1_000,
            open: close,
            high: close,
            low: close,
            close,
            change,
        }
    }

    #[test]
    fn test_compute_gain_and_average() {
        let bars = vec![
            bar(1, dec!(100), dec!(0)),
            bar(2, dec!(100), dec!(0)),
            bar(3, dec!(104), dec!(4)),
        ];

        let metrics = StockMetrics::compute(&bars, 3).unwrap();
        assert_eq!(metrics.today_range, dec!(4));
        assert_eq!(metrics.today_price, dec!(104));
        assert_eq!(metrics.n_day_average.round_dp(2), dec!(101.33));
        assert!(metrics.above_average);
        assert!(metrics.today_gain_pct > dec!(3.84) && metrics.today_gain_pct < dec!(3.85));
    }

    #[test]
    fn test_average_uses_last_n_bars_only() {
        let bars = vec![
            bar(1, dec!(10), dec!(0)),
            bar(2, dec!(50), dec!(0)),
            bar(3, dec!(50), dec!(0)),
        ];

        let metrics = StockMetrics::compute(&bars, 2).unwrap();
        assert_eq!(metrics.n_day_average, dec!(50));
        assert!(!metrics.above_average);
    }

    #[test]
    fn test_not_enough_bars() {
        let bars = vec![bar(1, dec!(10), dec!(0)), bar(2, dec!(10), dec!(0))];
        assert!(StockMetrics::compute(&bars, 3).is_none());
        assert!(StockMetrics::compute(&bars, 0).is_none());
    }

    #[test]
    fn test_zero_price_has_zero_gain() {
        let bars = vec![bar(1, dec!(0), dec!(1))];
        let metrics = StockMetrics::compute(&bars, 1).unwrap();
        assert_eq!(metrics.today_gain_pct, Decimal::ZERO);
    }
}
