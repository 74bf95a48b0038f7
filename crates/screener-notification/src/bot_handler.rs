//! 텔레그램 봇 메시지 핸들러.
//!
//! Long polling으로 업데이트를 받아 메시지마다 별도 task에서 처리합니다.
//! 응답 내용은 [`ChatRequestHandler`] 구현체가 만듭니다.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::telegram::{TelegramTransport, TelegramUpdate};
use crate::types::{send_all, ChatTransport, NotificationResult};

/// 채팅 요청 처리 trait.
#[async_trait]
pub trait ChatRequestHandler: Send + Sync + 'static {
    /// 받은 텍스트에 대한 응답 메시지들을 돌려줍니다.
    ///
    /// 빈 목록이면 응답하지 않습니다 (명령어가 아닌 메시지 등).
    async fn handle_text(&self, text: &str) -> Vec<String>;
}

/// 텔레그램 봇 핸들러.
pub struct TelegramBotHandler<H: ChatRequestHandler> {
    transport: Arc<TelegramTransport>,
    handler: Arc<H>,
    last_update_id: RwLock<i64>,
    /// 허용된 채팅 ID 목록 (비어 있으면 모두 허용)
    allowed_chat_ids: Vec<i64>,
    poll_timeout_secs: u64,
}

impl<H: ChatRequestHandler> TelegramBotHandler<H> {
    /// 새 봇 핸들러 생성.
    pub fn new(transport: Arc<TelegramTransport>, handler: Arc<H>) -> Self {
        Self {
            transport,
            handler,
            last_update_id: RwLock::new(0),
            allowed_chat_ids: Vec::new(),
            poll_timeout_secs: 30,
        }
    }

    /// 허용 채팅 ID 설정.
    pub fn with_allowed_chat_ids(mut self, chat_ids: Vec<i64>) -> Self {
        self.allowed_chat_ids = chat_ids;
        self
    }

    /// long polling 타임아웃 설정.
    pub fn with_poll_timeout(mut self, secs: u64) -> Self {
        self.poll_timeout_secs = secs;
        self
    }

    /// 봇 폴링 시작.
    ///
    /// 무한 루프로 업데이트를 수신합니다.
    pub async fn start_polling(&self) {
        if self.allowed_chat_ids.is_empty() {
            warn!("허용 채팅 ID가 설정되지 않아 모든 채팅의 명령어를 처리합니다");
        }
        info!(
            allowed_chats = self.allowed_chat_ids.len(),
            "텔레그램 봇 폴링 시작"
        );

        loop {
            if let Err(e) = self.poll_once().await {
                error!(error = %e, "업데이트 폴링 실패");
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }

    /// 업데이트를 한 번 가져와 메시지별 task를 시작합니다.
    pub async fn poll_once(&self) -> NotificationResult<Vec<JoinHandle<()>>> {
        let offset = *self.last_update_id.read().await + 1;
        let updates = self
            .transport
            .get_updates(offset, self.poll_timeout_secs)
            .await?;

        // 마지막 업데이트 ID 갱신
        if let Some(last) = updates.last() {
            *self.last_update_id.write().await = last.update_id;
        }

        Ok(updates
            .into_iter()
            .filter_map(|update| self.dispatch(update))
            .collect())
    }

    fn dispatch(&self, update: TelegramUpdate) -> Option<JoinHandle<()>> {
        let message = update.message?;
        let chat_id = message.chat.id;

        if !self.allowed_chat_ids.is_empty() && !self.allowed_chat_ids.contains(&chat_id) {
            warn!(chat_id = chat_id, "허용되지 않은 채팅 ID에서 메시지 수신");
            return None;
        }

        let text = message.text?;
        debug!(chat_id = chat_id, text = %text, "메시지 수신");

        let transport = Arc::clone(&self.transport);
        let handler = Arc::clone(&self.handler);
        Some(tokio::spawn(async move {
            let replies = handler.handle_text(&text).await;
            if replies.is_empty() {
                return;
            }
            if let Err(e) = send_all(transport.as_ref(), chat_id, &replies).await {
                error!(
                    chat_id = chat_id,
                    transport = transport.name(),
                    error = %e,
                    "응답 전송 실패"
                );
            }
        }))
    }
}
