//! 종목별 일봉 이력 캐시.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use screener_core::{
    MarketDataSource, PriceHistory, ScreenerError, ScreenerResult, TradingDate,
};

use crate::single_flight::SingleFlight;
use crate::timeout::with_timeout;

/// `(종목, 거래일)`별 일봉 이력 캐시.
///
/// 기준일 이하 일봉이 `min_bars`개가 될 때까지 한 달씩 과거로 확장합니다.
pub struct HistoryCache {
    source: Arc<dyn MarketDataSource>,
    min_bars: usize,
    max_extensions: usize,
    fetch_timeout: Duration,
    histories: SingleFlight<(String, TradingDate), Arc<PriceHistory>>,
}

impl HistoryCache {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        min_bars: usize,
        max_extensions: usize,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            source,
            min_bars,
            max_extensions,
            fetch_timeout,
            histories: SingleFlight::new(),
        }
    }

    /// 지표 계산에 충분한 이력을 준비합니다.
    ///
    /// # Errors
    ///
    /// - `InsufficientHistory`: 확장 한도에 도달하거나 더 이상 과거 데이터가 없는데도
    ///   일봉이 부족함
    /// - 그 외 데이터 소스 에러
    ///
    /// 실패는 캐시하지 않습니다.
    pub async fn prepare(
        &self,
        stock_id: &str,
        date: TradingDate,
    ) -> ScreenerResult<Arc<PriceHistory>> {
        self.histories
            .get_or_try_init((stock_id.to_string(), date), || self.load(stock_id, date))
            .await
    }

    pub async fn len(&self) -> usize {
        self.histories.len().await
    }

    #[instrument(skip(self))]
    async fn load(&self, stock_id: &str, date: TradingDate) -> ScreenerResult<Arc<PriceHistory>> {
        let mut history = with_timeout(
            self.fetch_timeout,
            format!("STOCK_DAY {} {}", stock_id, date),
            self.source.price_history(stock_id, date),
        )
        .await?;

        let mut extensions = 0;
        while history.bars_until(date.date()).len() < self.min_bars
            && extensions < self.max_extensions
        {
            let grew = with_timeout(
                self.fetch_timeout,
                format!("STOCK_DAY {} 확장", stock_id),
                self.source.extend_history(&mut history),
            )
            .await?;
            extensions += 1;
            if !grew {
                break;
            }
        }

        let available = history.bars_until(date.date()).len();
        if available < self.min_bars {
            return Err(ScreenerError::InsufficientHistory {
                stock_id: stock_id.to_string(),
                available,
                required: self.min_bars,
            });
        }

        debug!(bars = history.len(), extensions, "일봉 이력 준비 완료");
        Ok(Arc::new(history))
    }
}
