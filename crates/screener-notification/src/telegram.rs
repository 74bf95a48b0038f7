//! 텔레그램 전송기.
//!
//! Telegram Bot API의 `sendMessage`와 `getUpdates`만 사용합니다.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::types::{ChatTransport, NotificationError, NotificationResult};

/// Telegram Bot API 기본 주소.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// `getUpdates` 응답.
#[derive(Debug, Deserialize)]
struct TelegramUpdates {
    ok: bool,
    #[serde(default)]
    result: Vec<TelegramUpdate>,
}

/// 개별 업데이트.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

/// 메시지 정보.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub chat: TelegramChat,
    pub text: Option<String>,
}

/// 채팅 정보.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

/// 텔레그램 전송기.
pub struct TelegramTransport {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl TelegramTransport {
    /// 새 전송기를 생성합니다.
    pub fn new(bot_token: impl Into<String>) -> NotificationResult<Self> {
        let bot_token = bot_token.into();
        if bot_token.trim().is_empty() {
            return Err(NotificationError::InvalidConfig(
                "텔레그램 봇 토큰이 비어 있습니다".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token,
        })
    }

    /// API 주소를 바꿉니다 (테스트용 서버 등).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    /// 채팅방에 텍스트 메시지를 보냅니다.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> NotificationResult<()> {
        let params = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&params)
            .send()
            .await
            .map_err(NotificationError::NetworkError)?;

        if response.status().is_success() {
            debug!(chat_id = chat_id, bytes = text.len(), "응답 전송 완료");
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        // 요청 한도 제한 확인
        if status.as_u16() == 429 {
            warn!(chat_id = chat_id, "텔레그램 요청 한도 초과");
            return Err(NotificationError::RateLimited(60));
        }

        error!(chat_id = chat_id, status = %status, body = %body, "응답 전송 실패");
        Err(NotificationError::SendFailed(format!(
            "HTTP {}: {}",
            status, body
        )))
    }

    /// `offset` 이후의 업데이트를 long polling으로 가져옵니다.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> NotificationResult<Vec<TelegramUpdate>> {
        let params = serde_json::json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });

        let response = self
            .client
            .post(self.method_url("getUpdates"))
            .json(&params)
            .timeout(Duration::from_secs(timeout_secs + 5))
            .send()
            .await
            .map_err(NotificationError::NetworkError)?;

        let body = response.text().await?;
        let updates: TelegramUpdates = serde_json::from_str(&body)?;

        if !updates.ok {
            return Err(NotificationError::SendFailed(
                "텔레그램 API 응답 실패".to_string(),
            ));
        }

        Ok(updates.result)
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send(&self, chat_id: i64, text: &str) -> NotificationResult<()> {
        self.send_message(chat_id, text).await
    }

    fn name(&self) -> &str {
        "telegram"
    }
}
