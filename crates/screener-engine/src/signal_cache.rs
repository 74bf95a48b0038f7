//! 기관 매매 동향 캐시.
//!
//! `(구분, 거래일)`별 [`FlowTable`]을 프로세스 수명 동안 보관합니다 (삭제 없음).
//! 같은 날짜를 평가하는 모든 종목이 테이블 하나를 공유하므로, 날짜당 조회는 한 번입니다.
//!
//! # 손상 파일 복구
//!
//! 데이터 소스가 `SourceError::NoLocalData`를 반환하면 해당 원본 파일을 지우고
//! 정확히 한 번 다시 조회합니다. 재조회도 실패하면 그 결과를 기억하고, 이후 같은
//! 키 요청은 다시 조회하지 않고 바로 실패합니다.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use screener_core::{
    FlowCategory, FlowTable, MarketDataSource, RawCache, ScreenerResult, SourceError,
    TradingDate,
};

use crate::single_flight::SingleFlight;
use crate::timeout::with_timeout;

type FlowKey = (FlowCategory, TradingDate);

/// `(구분, 거래일)`별 기관 매매 동향 캐시.
pub struct SignalCache {
    source: Arc<dyn MarketDataSource>,
    raw_cache: Arc<dyn RawCache>,
    fetch_timeout: Duration,
    tables: SingleFlight<FlowKey, ScreenerResult<Arc<FlowTable>>>,
}

impl SignalCache {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        raw_cache: Arc<dyn RawCache>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            source,
            raw_cache,
            fetch_timeout,
            tables: SingleFlight::new(),
        }
    }

    /// 기관 매매 동향 테이블을 조회합니다.
    ///
    /// 캐시에 있으면 I/O 없이 반환합니다. 같은 키의 동시 요청은 한 번의 조회를 공유합니다.
    pub async fn get(
        &self,
        category: FlowCategory,
        date: TradingDate,
    ) -> ScreenerResult<Arc<FlowTable>> {
        self.tables
            .get_or_init((category, date), || self.load(category, date))
            .await
    }

    /// 캐시된 키 수 (실패 포함).
    pub async fn len(&self) -> usize {
        self.tables.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.tables.is_empty().await
    }

    #[instrument(skip(self), fields(category = %category, date = %date))]
    async fn load(&self, category: FlowCategory, date: TradingDate) -> ScreenerResult<Arc<FlowTable>> {
        let table = match self.fetch(category, date).await {
            Err(SourceError::NoLocalData { source_key }) => {
                warn!(source_key = %source_key, "원본 파일 손상, 삭제 후 재조회");
                self.raw_cache.remove(&source_key).await?;
                self.fetch(category, date).await
            }
            other => other,
        };

        match table {
            Ok(table) => {
                debug!(stocks = table.len(), "기관 매매 동향 캐시 적재");
                Ok(Arc::new(table))
            }
            Err(e) => {
                warn!(error = %e, "기관 매매 동향 조회 실패");
                Err(e.into())
            }
        }
    }

    async fn fetch(&self, category: FlowCategory, date: TradingDate) -> Result<FlowTable, SourceError> {
        with_timeout(
            self.fetch_timeout,
            format!("{} {}", category.report_code(), date),
            self.source.fetch_flow(category, date),
        )
        .await
    }
}
