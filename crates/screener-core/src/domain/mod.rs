//! 스크리너 도메인 모델.
//!
//! - `flow`: 기관 매매 동향 및 신용거래 테이블
//! - `market_data`: 일봉 및 가격 이력
//! - `metrics`: 당일 상승률/이동평균 지표
//! - `filter`: AND 결합 스크리닝 필터
//! - `evaluation`: 종목 평가 결과
//! - `provider`: 외부 협력자 trait

pub mod evaluation;
pub mod filter;
pub mod flow;
pub mod market_data;
pub mod metrics;
pub mod provider;

pub use evaluation::*;
pub use filter::*;
pub use flow::*;
pub use market_data::*;
pub use metrics::*;
pub use provider::*;
