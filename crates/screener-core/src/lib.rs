//! # Screener Core
//!
//! 대만 증권거래소(TWSE) 일일 스크리너의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 스크리너 전반에서 사용되는 기본 타입을 제공합니다:
//! - 거래일(TradingDate) 및 종목 타입
//! - 기관 매매 동향(FlowTable) 및 신용거래(MarginTable)
//! - 일봉 이력과 당일 지표 계산
//! - 스크리닝 필터(FilterSpec)
//! - 외부 협력자 trait (캘린더, 시장 데이터, 원본 캐시)
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
