//! 시장 데이터 Provider.

pub mod response;
pub mod twse;

pub use twse::TwseClient;
