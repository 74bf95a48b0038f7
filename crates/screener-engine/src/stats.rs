//! 스크리닝 통계 구조체.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 스크리닝 패스 통계
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreeningStats {
    /// 목록의 종목 수
    pub total: usize,
    /// 평가 성공 종목 수
    pub evaluated: usize,
    /// 필터 통과 종목 수
    pub admitted: usize,
    /// 이력 부족으로 건너뛴 종목 수
    pub insufficient_history: usize,
    /// 그 외 에러로 건너뛴 종목 수
    pub errors: usize,
    /// 날짜별 평가 결과를 재사용했는지 여부
    pub reused: bool,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl ScreeningStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 건너뛴 종목 수
    pub fn skipped(&self) -> usize {
        self.insufficient_history + self.errors
    }

    /// 평가 성공률 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.evaluated as f64 / self.total as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            evaluated = self.evaluated,
            admitted = self.admitted,
            insufficient_history = self.insufficient_history,
            errors = self.errors,
            reused = self.reused,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "스크리닝 완료"
        );
    }
}
