//! 채팅 전송 타입 및 trait 정의.

use async_trait::async_trait;

/// 알림 작업용 Result 타입.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// 채팅 전송 에러.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("메시지 전송 실패: {0}")]
    SendFailed(String),

    #[error("잘못된 설정: {0}")]
    InvalidConfig(String),

    #[error("요청 한도 초과: {0}초 후 재시도")]
    RateLimited(u64),

    #[error("네트워크 에러: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("직렬화 에러: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl NotificationError {
    /// 재시도 가능한 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NotificationError::RateLimited(_) | NotificationError::NetworkError(_)
        )
    }
}

/// 채팅 메시지 전송 trait.
///
/// 웹훅 검증, 할당량 등 전송 세부 사항은 구현체가 담당합니다.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// 채팅방에 메시지 한 건을 보냅니다.
    async fn send(&self, chat_id: i64, text: &str) -> NotificationResult<()>;

    /// 전송기 이름을 반환합니다.
    fn name(&self) -> &str;
}

/// 여러 메시지를 순서대로 보냅니다. 첫 실패에서 멈춥니다.
pub async fn send_all<T: ChatTransport + ?Sized>(
    transport: &T,
    chat_id: i64,
    messages: &[String],
) -> NotificationResult<()> {
    for message in messages {
        transport.send(chat_id, message).await?;
    }
    Ok(())
}
