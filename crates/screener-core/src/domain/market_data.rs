//! 일봉 및 가격 이력.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 일봉 데이터.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBar {
    /// 거래일
    pub date: NaiveDate,
    /// 거래량 (주)
    pub volume: i64,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 전일 대비 (당일 등락폭)
    pub change: Decimal,
}

/// 한 종목의 일봉 이력.
///
/// 월 단위로 로드되며, `earliest_month` 이전 달을 앞에 붙이는 방식으로 확장합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceHistory {
    stock_id: String,
    earliest_month: NaiveDate,
    bars: Vec<DailyBar>,
}

impl PriceHistory {
    /// 한 달치 일봉으로 이력을 생성합니다.
    pub fn new(stock_id: impl Into<String>, month: NaiveDate, mut bars: Vec<DailyBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        Self {
            stock_id: stock_id.into(),
            earliest_month: month,
            bars,
        }
    }

    pub fn stock_id(&self) -> &str {
        &self.stock_id
    }

    /// 현재 로드된 가장 이른 월 (1일).
    pub fn earliest_month(&self) -> NaiveDate {
        self.earliest_month
    }

    /// 전체 일봉 (날짜 오름차순).
    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// `date` 이하의 일봉 (날짜 오름차순).
    pub fn bars_until(&self, date: NaiveDate) -> &[DailyBar] {
        let end = self.bars.partition_point(|b| b.date <= date);
        &self.bars[..end]
    }

    /// 이전 달 일봉을 앞에 붙입니다.
    ///
    /// 이미 있는 날짜는 무시합니다. 일봉이 하나라도 추가되면 `true`.
    pub fn prepend_month(&mut self, month: NaiveDate, bars: Vec<DailyBar>) -> bool {
        self.earliest_month = month;
        let before = self.bars.len();
        let known: HashSet<NaiveDate> = self.bars.iter().map(|b| b.date).collect();
        self.bars
            .extend(bars.into_iter().filter(|b| !known.contains(&b.date)));
        self.bars.sort_by_key(|b| b.date);
        self.bars.dedup_by_key(|b| b.date);
        self.bars.len() > before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar(y: i32, m: u32, d: u32, close: Decimal) -> DailyBar {
        DailyBar {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            volume: 1000,
            open: close,
            high: close,
            low: close,
            close,
            change: Decimal::ZERO,
        }
    }

    #[test]
    fn test_bars_until_excludes_later_days() {
        let history = PriceHistory::new(
            "2330",
            NaiveDate::from_ymd_opt(2019, 7, 1).unwrap(),
            vec![
                bar(2019, 7, 4, dec!(240)),
                bar(2019, 7, 2, dec!(236)),
                bar(2019, 7, 3, dec!(238)),
            ],
        );

        let until = history.bars_until(NaiveDate::from_ymd_opt(2019, 7, 3).unwrap());
        assert_eq!(until.len(), 2);
        assert_eq!(until.last().unwrap().close, dec!(238));
    }

    #[test]
    fn test_prepend_month_reports_growth() {
        let mut history = PriceHistory::new(
            "2330",
            NaiveDate::from_ymd_opt(2019, 7, 1).unwrap(),
            vec![bar(2019, 7, 2, dec!(236))],
        );

        let grew = history.prepend_month(
            NaiveDate::from_ymd_opt(2019, 6, 1).unwrap(),
            vec![bar(2019, 6, 28, dec!(230))],
        );
        assert!(grew);
        assert_eq!(history.bars()[0].close, dec!(230));
        assert_eq!(
            history.earliest_month(),
            NaiveDate::from_ymd_opt(2019, 6, 1).unwrap()
        );

        let grew = history.prepend_month(NaiveDate::from_ymd_opt(2019, 5, 1).unwrap(), vec![]);
        assert!(!grew);
    }
}
