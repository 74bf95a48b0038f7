//! 기관 매매 동향 및 신용거래 데이터.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 기관 매매 동향 카테고리.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowCategory {
    /// 외국인 (TWT38U)
    Foreign,
    /// 투신 (TWT44U)
    Trust,
}

impl FlowCategory {
    /// 모든 카테고리.
    pub const ALL: [FlowCategory; 2] = [FlowCategory::Foreign, FlowCategory::Trust];

    /// TWSE 리포트 코드.
    pub fn report_code(&self) -> &'static str {
        match self {
            FlowCategory::Foreign => "TWT38U",
            FlowCategory::Trust => "TWT44U",
        }
    }
}

impl fmt::Display for FlowCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowCategory::Foreign => write!(f, "foreign"),
            FlowCategory::Trust => write!(f, "trust"),
        }
    }
}

/// 한 종목, 한 카테고리, 한 거래일의 매매 수량.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRecord {
    /// 매수 수량
    pub buy_volume: i64,
    /// 매도 수량
    pub sell_volume: i64,
    /// 순매수 수량
    pub total_volume: i64,
}

/// (카테고리, 거래일) 하나에 대한 종목별 매매 동향.
///
/// 한 번 만들어지면 수정하지 않습니다. 다시 가져올 때는 테이블 전체를 교체합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowTable {
    records: HashMap<String, FlowRecord>,
}

impl FlowTable {
    /// 종목별 레코드로 테이블을 생성합니다.
    pub fn new(records: HashMap<String, FlowRecord>) -> Self {
        Self { records }
    }

    /// 종목의 레코드.
    pub fn get(&self, stock_id: &str) -> Option<&FlowRecord> {
        self.records.get(stock_id)
    }

    /// 종목의 순매수 수량 (테이블에 없으면 0).
    pub fn total_for(&self, stock_id: &str) -> i64 {
        self.get(stock_id).map(|r| r.total_volume).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<(String, FlowRecord)> for FlowTable {
    fn from_iter<I: IntoIterator<Item = (String, FlowRecord)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// 한 종목의 신용거래 잔고 변화.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginRecord {
    /// 융자(信用交易 融資) 잔고 증감
    pub margin_net: i64,
    /// 대주(融券) 잔고 증감
    pub short_net: i64,
}

impl MarginRecord {
    /// 융자와 대주 잔고가 모두 증가했는지 여부.
    pub fn is_positive(&self) -> bool {
        self.margin_net > 0 && self.short_net > 0
    }
}

/// 한 거래일의 종목별 신용거래 잔고 변화.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarginTable {
    records: HashMap<String, MarginRecord>,
}

impl MarginTable {
    pub fn new(records: HashMap<String, MarginRecord>) -> Self {
        Self { records }
    }

    pub fn get(&self, stock_id: &str) -> Option<&MarginRecord> {
        self.records.get(stock_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<(String, MarginRecord)> for MarginTable {
    fn from_iter<I: IntoIterator<Item = (String, MarginRecord)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
