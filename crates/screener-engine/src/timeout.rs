//! 외부 호출 타임아웃.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use screener_core::SourceError;

/// 협력자 호출을 `limit` 안에 끝내도록 감쌉니다. 시간 초과는 `SourceError::Timeout`.
pub(crate) async fn with_timeout<T, F>(
    limit: Duration,
    what: impl Display,
    call: F,
) -> Result<T, SourceError>
where
    F: Future<Output = Result<T, SourceError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout(format!(
            "{} ({}초 초과)",
            what,
            limit.as_secs_f64()
        ))),
    }
}
