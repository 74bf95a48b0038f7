//! 스크리닝 필터.
//!
//! 활성화된 신호만 AND로 결합하여 종목 통과 여부를 결정합니다.
//! 비활성 신호는 판단에 영향을 주지 않으므로(항상 참) 빈 필터는 모든 종목을 통과시킵니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::evaluation::StockEvaluation;
use super::metrics::StockMetrics;

/// 필터 판단 임계값.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterThresholds {
    /// 당일 상승률 임계값 (%), 이 값 이상이면 통과
    pub gain_pct: Decimal,
}

impl Default for FilterThresholds {
    fn default() -> Self {
        Self { gain_pct: dec!(3.5) }
    }
}

/// 알 수 없는 필터 토큰.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("알 수 없는 필터: {0}")]
pub struct UnknownFilterToken(pub String);

/// 활성화된 스크리닝 신호 집합.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterSpec {
    /// 당일 상승률 >= 임계값
    pub price_gain: bool,
    /// 종가 > N일 이동평균
    pub moving_average: bool,
    /// 외국인 연속 순매수
    pub foreign_overbought: bool,
    /// 투신 연속 순매수
    pub trust_overbought: bool,
    /// 신용거래 잔고 증가
    pub margin_positive: bool,
}

impl FilterSpec {
    /// 모든 신호를 활성화한 필터.
    pub fn all() -> Self {
        Self {
            price_gain: true,
            moving_average: true,
            foreign_overbought: true,
            trust_overbought: true,
            margin_positive: true,
        }
    }

    /// 활성화된 신호가 없는지 여부.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// 토큰 목록에서 필터를 만듭니다.
    ///
    /// 지원 토큰: `cp`/`gain`, `ma`, `t38`/`foreign`, `t44`/`trust`, `mtss`/`margin`, `all`
    /// (대소문자 무시).
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self, UnknownFilterToken>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut spec = Self::default();
        for token in tokens {
            let token = token.as_ref();
            if !spec.enable_token(token) {
                return Err(UnknownFilterToken(token.to_string()));
            }
        }
        Ok(spec)
    }

    /// 토큰 하나에 해당하는 신호를 활성화합니다. 알 수 없는 토큰이면 `false`.
    pub fn enable_token(&mut self, token: &str) -> bool {
        match token.trim().to_lowercase().as_str() {
            "cp" | "gain" => self.price_gain = true,
            "ma" => self.moving_average = true,
            "t38" | "foreign" => self.foreign_overbought = true,
            "t44" | "trust" => self.trust_overbought = true,
            "mtss" | "margin" => self.margin_positive = true,
            "all" => *self = Self::all(),
            _ => return false,
        }
        true
    }

    /// 활성화된 신호의 토큰 목록 (표시용).
    pub fn tokens(&self) -> Vec<&'static str> {
        [
            (self.price_gain, "cp"),
            (self.moving_average, "ma"),
            (self.foreign_overbought, "t38"),
            (self.trust_overbought, "t44"),
            (self.margin_positive, "mtss"),
        ]
        .into_iter()
        .filter_map(|(enabled, token)| enabled.then_some(token))
        .collect()
    }

    /// 종목 통과 여부를 판단합니다.
    pub fn admit(
        &self,
        metrics: &StockMetrics,
        foreign_overbought: bool,
        trust_overbought: bool,
        margin_positive: bool,
        thresholds: &FilterThresholds,
    ) -> bool {
        let mut admit = true;
        if self.price_gain {
            admit = admit && metrics.today_gain_pct >= thresholds.gain_pct;
        }
        if self.moving_average {
            admit = admit && metrics.above_average;
        }
        if self.foreign_overbought {
            admit = admit && foreign_overbought;
        }
        if self.trust_overbought {
            admit = admit && trust_overbought;
        }
        if self.margin_positive {
            admit = admit && margin_positive;
        }
        admit
    }

    /// 평가 결과에 필터를 적용합니다.
    pub fn admit_evaluation(
        &self,
        evaluation: &StockEvaluation,
        thresholds: &FilterThresholds,
    ) -> bool {
        self.admit(
            &evaluation.metrics,
            evaluation.foreign_overbought(),
            evaluation.trust_overbought(),
            evaluation.margin_positive(),
            thresholds,
        )
    }
}
