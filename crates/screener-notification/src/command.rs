//! 채팅 명령어 해석기.
//!
//! 공백으로 구분된 토큰을 왼쪽부터 읽습니다:
//!
//! ```text
//! <마커> [YYYYMMDD] [종류] [인자...]
//! DD 20190703 股票 2330
//! DD 篩選 cp ma t44
//! ```
//!
//! - 마커가 아니면 `NotACommand` (호출자는 응답하지 않음)
//! - 날짜는 선택 사항. 파싱되지 않는 토큰은 소비하지 않고 다음 단계로 넘깁니다
//! - 종류 키워드를 포함하지 않는 토큰은 `BadCommandKind`
//! - 나머지 토큰은 검증 없이 인자로 모읍니다

use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use screener_core::{parse_compact_date, BotConfig, TradingCalendar, TradingDate};

/// 명령어 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandKind {
    /// 단일 종목 조회 (인자: 종목 코드)
    #[default]
    SingleStock,
    /// 전체 스크리닝 (인자: 필터 토큰)
    Screen,
}

/// 해석이 끝난 채팅 요청.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// 개장일로 정규화된 기준일
    pub date: TradingDate,
    pub kind: CommandKind,
    pub arguments: Vec<String>,
}

/// 캘린더 조회 전의 파싱 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// 명시된 날짜 (없으면 None)
    pub date: Option<NaiveDate>,
    pub kind: CommandKind,
    pub arguments: Vec<String>,
}

/// 파싱 결과. 실패해도 이미 읽은 날짜는 남습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub date: Option<NaiveDate>,
    pub command: Result<ParsedCommand, CommandError>,
}

/// 명령어 해석 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// 명령어가 아닌 일반 메시지
    #[error("명령어가 아닙니다")]
    NotACommand,

    /// 알 수 없는 명령어 종류
    #[error("알 수 없는 명령어: {0}")]
    BadCommandKind(String),

    /// 기준일을 개장일로 정규화하지 못함
    #[error("거래일 조회 실패: {0}")]
    DateUnavailable(String),
}

impl CommandError {
    /// 응답 없이 무시해야 하는 에러인지 확인합니다.
    pub fn is_ignorable(&self) -> bool {
        matches!(self, CommandError::NotACommand)
    }
}

/// 오늘 날짜를 돌려주는 함수.
pub type Clock = fn() -> NaiveDate;

/// 채팅 명령어 해석기.
pub struct CommandInterpreter {
    marker: String,
    single_keywords: Vec<String>,
    screen_keywords: Vec<String>,
    calendar: Arc<dyn TradingCalendar>,
    today: Clock,
}

impl CommandInterpreter {
    /// 새 해석기를 생성합니다.
    ///
    /// `today`는 날짜가 생략된 명령어의 기준 시점입니다 (대만 현지 날짜).
    pub fn new(config: &BotConfig, calendar: Arc<dyn TradingCalendar>, today: Clock) -> Self {
        Self {
            marker: config.marker.clone(),
            single_keywords: config.single_keywords.clone(),
            screen_keywords: config.screen_keywords.clone(),
            calendar,
            today,
        }
    }

    /// 텍스트를 해석하고 기준일을 개장일로 정규화합니다.
    pub async fn interpret(&self, raw: &str) -> Result<ChatRequest, CommandError> {
        let parsed = self.parse(raw).command?;
        self.resolve(parsed).await
    }

    /// 텍스트를 파싱합니다. I/O 없음.
    pub fn parse(&self, raw: &str) -> ParseOutcome {
        let mut tokens = raw.split_whitespace().peekable();

        if tokens.next() != Some(self.marker.as_str()) {
            return ParseOutcome {
                date: None,
                command: Err(CommandError::NotACommand),
            };
        }

        let date = tokens.peek().and_then(|token| parse_compact_date(token));
        if date.is_some() {
            tokens.next();
        }

        let kind = match tokens.next() {
            None => CommandKind::default(),
            Some(token) => match self.kind_of(token) {
                Some(kind) => kind,
                None => {
                    return ParseOutcome {
                        date,
                        command: Err(CommandError::BadCommandKind(token.to_string())),
                    }
                }
            },
        };

        let arguments = tokens.map(str::to_string).collect();
        ParseOutcome {
            date,
            command: Ok(ParsedCommand {
                date,
                kind,
                arguments,
            }),
        }
    }

    /// 날짜를 캘린더로 정규화합니다.
    ///
    /// 명시된 날짜는 당일 또는 직전 개장일로, 생략된 날짜는 오늘 이전의 가장 최근 개장일로 바꿉니다.
    pub async fn resolve(&self, parsed: ParsedCommand) -> Result<ChatRequest, CommandError> {
        let date = match parsed.date {
            Some(date) => self.calendar.nearest_open_on_or_before(date).await,
            None => self.calendar.previous_open((self.today)()).await,
        }
        .map_err(|e| CommandError::DateUnavailable(e.to_string()))?;

        debug!(date = %date, kind = ?parsed.kind, arguments = ?parsed.arguments, "명령어 해석");
        Ok(ChatRequest {
            date,
            kind: parsed.kind,
            arguments: parsed.arguments,
        })
    }

    /// 사용법 안내 문구.
    pub fn usage_hint(&self) -> String {
        format!(
            "用法:\n\
             {marker} [YYYYMMDD] {single} <股票代號>...\n\
             {marker} [YYYYMMDD] {screen} [cp] [ma] [t38] [t44] [mtss] [all]\n\
             例: {marker} 20190703 {single} 2330",
            marker = self.marker,
            single = self.single_keywords.first().map(String::as_str).unwrap_or("股票"),
            screen = self.screen_keywords.first().map(String::as_str).unwrap_or("篩選"),
        )
    }

    fn kind_of(&self, token: &str) -> Option<CommandKind> {
        let matches = |keywords: &[String]| keywords.iter().any(|k| token.contains(k.as_str()));
        if matches(&self.single_keywords) {
            Some(CommandKind::SingleStock)
        } else if matches(&self.screen_keywords) {
            Some(CommandKind::Screen)
        } else {
            None
        }
    }
}
