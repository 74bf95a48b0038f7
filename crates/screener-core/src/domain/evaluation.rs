//! 종목 평가 결과.

use serde::{Deserialize, Serialize};

use super::flow::MarginRecord;
use super::metrics::StockMetrics;
use crate::types::{StockListing, TradingDate};

/// 연속 순매수 윈도우 결과.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverboughtResult {
    /// K개 거래일을 모두 샘플링했고 모든 날 순매수였는지 여부
    pub all_sessions_positive: bool,
    /// 순매수였던 날의 순매수 수량 (최근 순, 길이 K, 빈 칸은 0).
    /// K일을 채우지 못하면 비어 있음
    pub per_session_totals: Vec<i64>,
}

impl OverboughtResult {
    /// 샘플이 부족한 경우의 결과.
    pub fn insufficient() -> Self {
        Self::default()
    }

    /// K일을 모두 샘플링했는지 여부.
    pub fn is_complete(&self) -> bool {
        !self.per_session_totals.is_empty()
    }
}

/// 한 종목의 모든 지표와 신호.
///
/// 필터 통과 여부와 관계없이 응답에 모든 값을 표시합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEvaluation {
    /// 종목
    pub listing: StockListing,
    /// 평가 기준 거래일
    pub date: TradingDate,
    /// 당일 지표
    pub metrics: StockMetrics,
    /// 외국인 연속 순매수
    pub foreign: OverboughtResult,
    /// 투신 연속 순매수
    pub trust: OverboughtResult,
    /// 신용거래 잔고 변화 (MI_MARGN에 없으면 None)
    pub margin: Option<MarginRecord>,
}

impl StockEvaluation {
    /// 외국인 연속 순매수 여부.
    pub fn foreign_overbought(&self) -> bool {
        self.foreign.all_sessions_positive
    }

    /// 투신 연속 순매수 여부.
    pub fn trust_overbought(&self) -> bool {
        self.trust.all_sessions_positive
    }

    /// 신용거래 잔고 증가 여부.
    pub fn margin_positive(&self) -> bool {
        self.margin.map(|m| m.is_positive()).unwrap_or(false)
    }
}

/// 필터 적용 결과.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenedStock {
    pub evaluation: StockEvaluation,
    pub admitted: bool,
}
