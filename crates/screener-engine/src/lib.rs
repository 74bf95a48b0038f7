//! TWSE 스크리닝 엔진.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - [`SignalCache`]: `(구분, 거래일)`별 기관 매매 동향 캐시 (손상 파일 1회 복구)
//! - [`OverboughtWindow`]: 최근 K개 거래일 연속 순매수 판정
//! - [`HistoryCache`]: 지표 계산용 일봉 이력 준비
//! - [`Screener`]: 전체/단일 종목 스크리닝
//!
//! 협력자(캘린더, 시장 데이터, 원본 캐시)는 `Arc<dyn ...>`로 주입받습니다.

pub mod history;
pub mod overbought;
pub mod screener;
pub mod signal_cache;
pub mod single_flight;
pub mod stats;
mod timeout;

#[cfg(test)]
mod testing;

pub use history::HistoryCache;
pub use overbought::OverboughtWindow;
pub use screener::{Screener, ScreeningReport};
pub use signal_cache::SignalCache;
pub use single_flight::SingleFlight;
pub use stats::ScreeningStats;
