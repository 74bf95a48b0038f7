//! 테스트용 인메모리 협력자.

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use screener_core::{
    month_start, previous_month_start, DailyBar, FlowCategory, FlowRecord, FlowTable,
    MarginTable, MarketDataSource, PriceHistory, RawCache, SourceError, StockListing,
    TradingCalendar, TradingDate,
};

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn trading(y: i32, m: u32, d: u32) -> TradingDate {
    TradingDate::confirmed(ymd(y, m, d))
}

pub fn flow_table(entries: &[(&str, i64)]) -> FlowTable {
    entries
        .iter()
        .map(|(id, total)| {
            (
                id.to_string(),
                FlowRecord {
                    buy_volume: (*total).max(0),
                    sell_volume: (-total).max(0),
                    total_volume: *total,
                },
            )
        })
        .collect()
}

pub fn bar(date: NaiveDate, close: Decimal, change: Decimal) -> DailyBar {
    DailyBar {
        date,
        volume: 1_000,
        open: close,
        high: close,
        low: close,
        close,
        change,
    }
}

/// 평일만 개장하는 캘린더.
#[derive(Default)]
pub struct WeekdayCalendar {
    pub closed: HashSet<NaiveDate>,
}

impl WeekdayCalendar {
    fn is_open(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.closed.contains(&date)
    }
}

#[async_trait]
impl TradingCalendar for WeekdayCalendar {
    async fn nearest_open_on_or_before(&self, date: NaiveDate) -> Result<TradingDate, SourceError> {
        (0..30)
            .map(|i| date - Duration::days(i))
            .find(|d| self.is_open(*d))
            .map(TradingDate::confirmed)
            .ok_or_else(|| SourceError::Parse("no open day".into()))
    }

    async fn previous_open(&self, date: NaiveDate) -> Result<TradingDate, SourceError> {
        self.nearest_open_on_or_before(date - Duration::days(1)).await
    }
}

/// 호출 횟수를 세는 시장 데이터 소스 겸 원본 캐시.
#[derive(Default)]
pub struct FakeSource {
    pub listing: Vec<StockListing>,
    pub flows: HashMap<(FlowCategory, NaiveDate), FlowTable>,
    pub bars: HashMap<String, Vec<DailyBar>>,
    pub margin: Option<MarginTable>,
    /// 첫 조회 시 `NoLocalData`를 돌려줄 키
    pub corrupt: Mutex<HashSet<(FlowCategory, NaiveDate)>>,
    /// 삭제 후에도 계속 손상된 키
    pub always_corrupt: HashSet<(FlowCategory, NaiveDate)>,
    pub flow_delay: Option<std::time::Duration>,
    /// 남은 횟수만큼 `price_history`가 `Network` 에러를 돌려줌
    pub history_failures: AtomicUsize,
    /// 남은 횟수만큼 `fetch_margin`이 `Network` 에러를 돌려줌
    pub margin_failures: AtomicUsize,
    pub flow_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
    pub listing_calls: AtomicUsize,
    pub margin_calls: AtomicUsize,
    pub removed: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn source_key(category: FlowCategory, date: NaiveDate) -> String {
        format!("{}-{}", category, date.format("%Y%m%d"))
    }

    pub fn flow_calls(&self) -> usize {
        self.flow_calls.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn month_bars(&self, stock_id: &str, month: NaiveDate) -> Vec<DailyBar> {
        self.bars
            .get(stock_id)
            .map(|bars| {
                bars.iter()
                    .filter(|b| month_start(b.date) == month)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl MarketDataSource for FakeSource {
    async fn list_stocks(
        &self,
        _category: &str,
        _date: TradingDate,
    ) -> Result<Vec<StockListing>, SourceError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        if self.listing.is_empty() {
            return Err(SourceError::Network("listing unavailable".into()));
        }
        Ok(self.listing.clone())
    }

    async fn fetch_flow(
        &self,
        category: FlowCategory,
        date: TradingDate,
    ) -> Result<FlowTable, SourceError> {
        self.flow_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.flow_delay {
            tokio::time::sleep(delay).await;
        }
        let key = (category, date.date());
        let corrupt = self.corrupt.lock().unwrap().contains(&key);
        if corrupt || self.always_corrupt.contains(&key) {
            return Err(SourceError::NoLocalData {
                source_key: Self::source_key(category, date.date()),
            });
        }
        self.flows
            .get(&key)
            .cloned()
            .ok_or_else(|| SourceError::Parse(format!("no data for {}", date)))
    }

    async fn fetch_margin(&self, _date: TradingDate) -> Result<MarginTable, SourceError> {
        self.margin_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.margin_failures) {
            return Err(SourceError::Network("margin timeout".into()));
        }
        self.margin
            .clone()
            .ok_or_else(|| SourceError::Network("margin unavailable".into()))
    }

    async fn price_history(
        &self,
        stock_id: &str,
        date: TradingDate,
    ) -> Result<PriceHistory, SourceError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.history_failures) {
            return Err(SourceError::Network(format!("STOCK_DAY {} timeout", stock_id)));
        }
        let month = date.month_start();
        Ok(PriceHistory::new(
            stock_id,
            month,
            self.month_bars(stock_id, month),
        ))
    }

    async fn extend_history(&self, history: &mut PriceHistory) -> Result<bool, SourceError> {
        let month = previous_month_start(history.earliest_month());
        let bars = self.month_bars(history.stock_id(), month);
        Ok(history.prepend_month(month, bars))
    }
}

#[async_trait]
impl RawCache for FakeSource {
    async fn remove(&self, source_key: &str) -> Result<(), SourceError> {
        self.removed.lock().unwrap().push(source_key.to_string());
        self.corrupt
            .lock()
            .unwrap()
            .retain(|(category, date)| Self::source_key(*category, *date) != source_key);
        Ok(())
    }
}
