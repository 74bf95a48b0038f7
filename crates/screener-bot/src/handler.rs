//! 채팅 명령어 처리.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use screener_core::FilterSpec;
use screener_engine::Screener;
use screener_notification::report::{
    format_command_error, format_error, format_evaluation, format_screening,
    format_unknown_filter,
};
use screener_notification::{
    ChatRequest, ChatRequestHandler, CommandInterpreter, CommandKind, ReplyBatcher,
};

/// 스크리너 봇 핸들러.
///
/// 명령어를 해석해 엔진을 호출하고 응답을 메시지 크기 제한에 맞춰 묶습니다.
pub struct ScreenerBotHandler {
    interpreter: CommandInterpreter,
    screener: Arc<Screener>,
    message_limit: usize,
}

impl ScreenerBotHandler {
    /// 새 핸들러 생성.
    pub fn new(
        interpreter: CommandInterpreter,
        screener: Arc<Screener>,
        message_limit: usize,
    ) -> Self {
        Self {
            interpreter,
            screener,
            message_limit,
        }
    }

    async fn single_stock(&self, request: &ChatRequest) -> Vec<String> {
        if request.arguments.is_empty() {
            return vec![self.interpreter.usage_hint()];
        }

        let ma_days = self.screener.config().ma_days;
        let mut batcher = ReplyBatcher::new(self.message_limit);
        for stock_id in &request.arguments {
            match self.screener.screen_one(request.date, stock_id).await {
                Ok(evaluation) => batcher.append(&format_evaluation(&evaluation, ma_days)),
                Err(e) => {
                    debug!(stock_id = %stock_id, error = %e, "단일 종목 조회 실패");
                    batcher.append(&format_error(&e));
                }
            }
        }
        batcher.flush()
    }

    async fn screen(&self, request: &ChatRequest) -> Vec<String> {
        let filter = match FilterSpec::from_tokens(&request.arguments) {
            Ok(filter) => filter,
            Err(e) => return vec![format_unknown_filter(&e)],
        };

        match self.screener.screen_all(request.date, &filter).await {
            Ok(report) => {
                format_screening(&report, self.screener.config().ma_days, self.message_limit)
            }
            Err(e) => {
                warn!(date = %request.date, error = %e, "스크리닝 실패");
                vec![format_error(&e)]
            }
        }
    }
}

#[async_trait]
impl ChatRequestHandler for ScreenerBotHandler {
    async fn handle_text(&self, text: &str) -> Vec<String> {
        let outcome = self.interpreter.parse(text);
        let parsed = match outcome.command {
            Ok(parsed) => parsed,
            Err(e) => {
                if !e.is_ignorable() {
                    debug!(date = ?outcome.date, error = %e, "명령어 해석 실패");
                }
                return format_command_error(&e, &self.interpreter.usage_hint())
                    .into_iter()
                    .collect();
            }
        };

        let request = match self.interpreter.resolve(parsed).await {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "기준일 정규화 실패");
                return format_command_error(&e, &self.interpreter.usage_hint())
                    .into_iter()
                    .collect();
            }
        };

        info!(
            date = %request.date,
            kind = ?request.kind,
            arguments = ?request.arguments,
            "명령어 처리"
        );
        match request.kind {
            CommandKind::SingleStock => self.single_stock(&request).await,
            CommandKind::Screen => self.screen(&request).await,
        }
    }
}
