//! TWSE 데이터 소스.
//!
//! 이 crate는 엔진이 의존하는 협력자 trait의 구현체를 제공합니다:
//! - [`TwseClient`]: TWSE JSON 엔드포인트 기반 `MarketDataSource`
//! - [`FileRawCache`]: 요청 URL별 원본 응답 파일 캐시 (`RawCache`)
//! - [`TwseCalendar`]: 평일 + 휴장일/보충 개장일 기반 `TradingCalendar`

pub mod calendar;
pub mod provider;
pub mod storage;

pub use calendar::{taipei_today, TwseCalendar};
pub use provider::TwseClient;
pub use storage::FileRawCache;
