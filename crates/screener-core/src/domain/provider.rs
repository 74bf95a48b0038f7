//! 외부 협력자 추상화.
//!
//! 엔진은 다음 trait에만 의존합니다. TWSE 구현은 `screener-data` 크레이트에 있습니다.
//!
//! - [`TradingCalendar`]: 개장일 판단
//! - [`MarketDataSource`]: 종목 목록, 기관 매매 동향, 신용거래, 일봉 이력
//! - [`RawCache`]: 로컬 원본 파일 캐시
//!
//! 모든 호출은 네트워크/디스크 I/O로 블로킹될 수 있습니다. 호출자는 공유 lock을
//! 잡은 채로 호출하지 않아야 합니다.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use super::flow::{FlowCategory, FlowTable, MarginTable};
use super::market_data::PriceHistory;
use crate::types::{StockListing, TradingDate};

// =============================================================================
// 에러 타입
// =============================================================================

/// 협력자 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// 로컬 캐시 파일에 데이터가 없음 (잘리거나 손상된 파일)
    #[error("로컬 캐시 파일에 데이터 없음: {source_key}")]
    NoLocalData { source_key: String },

    /// 네트워크 에러
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 타임아웃
    #[error("타임아웃: {0}")]
    Timeout(String),

    /// 응답 파싱 에러
    #[error("파싱 에러: {0}")]
    Parse(String),

    /// 파일 I/O 에러
    #[error("I/O 에러: {0}")]
    Io(String),
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        SourceError::Io(err.to_string())
    }
}

// =============================================================================
// Trait
// =============================================================================

/// 거래일 캘린더.
#[async_trait]
pub trait TradingCalendar: Send + Sync {
    /// `date` 당일 또는 그 이전의 가장 가까운 개장일.
    async fn nearest_open_on_or_before(&self, date: NaiveDate) -> Result<TradingDate, SourceError>;

    /// `date` 이전(당일 제외)의 가장 가까운 개장일.
    async fn previous_open(&self, date: NaiveDate) -> Result<TradingDate, SourceError>;
}

/// 시장 데이터 소스.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// 카테고리(예: `ALLBUT0999`)에 속한 종목 목록.
    async fn list_stocks(
        &self,
        category: &str,
        date: TradingDate,
    ) -> Result<Vec<StockListing>, SourceError>;

    /// 기관 매매 동향 테이블.
    ///
    /// # Errors
    ///
    /// - `SourceError::NoLocalData`: 로컬 캐시 파일이 손상됨. `source_key`로
    ///   [`RawCache::remove`]를 호출한 뒤 다시 시도할 수 있습니다.
    async fn fetch_flow(
        &self,
        category: FlowCategory,
        date: TradingDate,
    ) -> Result<FlowTable, SourceError>;

    /// 신용거래 잔고 변화 테이블.
    async fn fetch_margin(&self, date: TradingDate) -> Result<MarginTable, SourceError>;

    /// `date`가 속한 월의 일봉 이력.
    async fn price_history(
        &self,
        stock_id: &str,
        date: TradingDate,
    ) -> Result<PriceHistory, SourceError>;

    /// 이력에 이전 달 일봉을 추가합니다. 일봉이 늘었으면 `true`.
    async fn extend_history(&self, history: &mut PriceHistory) -> Result<bool, SourceError>;
}

/// 로컬 원본 파일 캐시.
#[async_trait]
pub trait RawCache: Send + Sync {
    /// 캐시 파일을 삭제합니다. 파일이 없으면 성공으로 취급합니다.
    async fn remove(&self, source_key: &str) -> Result<(), SourceError>;
}
