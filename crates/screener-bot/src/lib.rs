//! TWSE 스크리너 실행 구성.
//!
//! - [`App`]: 설정에서 캘린더, 데이터 소스, 엔진을 조립
//! - [`background`]: 가장 최근 개장일에 대한 사전 스크리닝
//! - [`ScreenerBotHandler`]: 채팅 명령어를 엔진 호출과 응답 메시지로 연결

pub mod app;
pub mod background;
pub mod handler;

pub use app::App;
pub use handler::ScreenerBotHandler;
