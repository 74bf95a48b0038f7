//! 종목 식별 타입.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 종목 목록의 한 항목 (증권코드 + 종목명).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockListing {
    /// 증권코드 (예: "2330")
    pub id: String,
    /// 종목명 (예: "台積電")
    pub name: String,
}

impl StockListing {
    /// 새 목록 항목을 생성합니다.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for StockListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.name)
    }
}
