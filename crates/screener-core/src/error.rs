//! 스크리너 에러 타입.
//!
//! 엔진 경계에서 사용하는 에러(`ScreenerError`)를 정의합니다.
//! 협력자 경계의 에러는 [`crate::domain::provider::SourceError`]를 참고하세요.

use thiserror::Error;

use crate::domain::provider::SourceError;

/// 핵심 스크리너 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScreenerError {
    /// 이력 확장 후에도 지표 계산에 필요한 일봉 수가 부족함
    #[error("이력 데이터 부족: {stock_id} ({available}/{required})")]
    InsufficientHistory {
        stock_id: String,
        available: usize,
        required: usize,
    },

    /// 로컬 원본 파일이 비어 있거나 손상됨 (복구 후에도 실패)
    #[error("로컬 데이터 없음: {source_key}")]
    NoLocalData { source_key: String },

    /// 그 외 데이터 소스/캘린더 조회 실패
    #[error("데이터 조회 실패: {0}")]
    UpstreamFetchFailed(String),

    /// 요청한 날짜의 목록에 없는 종목
    #[error("상장되지 않은 종목: {0}")]
    StockNotListed(String),

    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),
}

/// 스크리너 작업을 위한 Result 타입.
pub type ScreenerResult<T> = Result<T, ScreenerError>;

impl ScreenerError {
    /// 재시도 가능한 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScreenerError::UpstreamFetchFailed(_))
    }

    /// 한 종목에만 해당하는 에러인지 확인합니다.
    ///
    /// 스크리닝 패스에서는 이 에러가 나도 해당 종목만 건너뜁니다.
    pub fn is_stock_scoped(&self) -> bool {
        matches!(
            self,
            ScreenerError::InsufficientHistory { .. } | ScreenerError::StockNotListed(_)
        )
    }
}

impl From<SourceError> for ScreenerError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NoLocalData { source_key } => ScreenerError::NoLocalData { source_key },
            other => ScreenerError::UpstreamFetchFailed(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for ScreenerError {
    fn from(err: config::ConfigError) -> Self {
        ScreenerError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        let upstream = ScreenerError::UpstreamFetchFailed("timeout".to_string());
        assert!(upstream.is_retryable());

        let not_listed = ScreenerError::StockNotListed("9999".to_string());
        assert!(!not_listed.is_retryable());
    }

    #[test]
    fn test_source_error_conversion_keeps_no_local_data() {
        let err: ScreenerError = SourceError::NoLocalData {
            source_key: "abc".to_string(),
        }
        .into();
        assert_eq!(
            err,
            ScreenerError::NoLocalData {
                source_key: "abc".to_string()
            }
        );

        let err: ScreenerError = SourceError::Timeout("TWT38U".to_string()).into();
        assert!(matches!(err, ScreenerError::UpstreamFetchFailed(_)));
    }

    #[test]
    fn test_stock_scoped() {
        let err = ScreenerError::InsufficientHistory {
            stock_id: "2330".to_string(),
            available: 1,
            required: 3,
        };
        assert!(err.is_stock_scoped());
        assert!(!ScreenerError::Config("x".to_string()).is_stock_scoped());
    }
}
