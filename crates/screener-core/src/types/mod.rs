//! 기본 타입 정의.

pub mod stock;
pub mod trading_date;

pub use stock::*;
pub use trading_date::*;
