//! 스크리너 채팅 프런트엔드.
//!
//! - [`CommandInterpreter`]: `DD [날짜] [종류] [인자...]` 명령어 해석
//! - [`ReplyBatcher`]: 응답 조각을 메시지 크기 제한 안에서 묶음
//! - [`report`]: 평가 결과 응답 포맷
//! - [`TelegramTransport`] / [`TelegramBotHandler`]: 텔레그램 long polling 봇

pub mod bot_handler;
pub mod command;
pub mod reply;
pub mod report;
pub mod telegram;
pub mod types;

pub use bot_handler::{ChatRequestHandler, TelegramBotHandler};
pub use command::{
    ChatRequest, Clock, CommandError, CommandInterpreter, CommandKind, ParseOutcome, ParsedCommand,
};
pub use reply::{ReplyBatcher, DEFAULT_MESSAGE_LIMIT};
pub use telegram::TelegramTransport;
pub use types::{send_all, ChatTransport, NotificationError, NotificationResult};
