//! 설정 관리.
//!
//! `config/default.toml`(선택)과 `SCREENER__SECTION__KEY` 형식의 환경 변수에서
//! 애플리케이션 설정을 로드합니다. 모든 섹션은 기본값을 가지므로 설정 파일 없이도
//! 동작합니다.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{ScreenerError, ScreenerResult};
use crate::types::parse_compact_date;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 로깅 설정
    pub logging: LoggingConfig,
    /// 스크리닝 엔진 설정
    pub engine: EngineConfig,
    /// TWSE 데이터 소스 설정
    pub source: SourceConfig,
    /// 거래일 캘린더 설정
    pub calendar: CalendarConfig,
    /// 채팅 명령어 설정
    pub bot: BotConfig,
    /// 텔레그램 설정
    pub telegram: TelegramConfig,
    /// 데몬 모드 설정
    pub daemon: DaemonConfig,
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 스크리닝 결과 캐시 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCachePolicy {
    /// 매 요청마다 전 종목을 다시 평가
    Disabled,
    /// 날짜별 종목 평가 결과를 보관하고 필터만 다시 적용
    #[default]
    PerDate,
}

/// 스크리닝 엔진 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 종목 목록 카테고리 (MI_INDEX type)
    pub category: String,
    /// 이동평균 일수 (최소 필요 일봉 수)
    pub ma_days: usize,
    /// 연속 순매수 판단 거래일 수
    pub window_length: usize,
    /// 당일 상승률 필터 임계값 (%)
    pub gain_threshold_pct: Decimal,
    /// 동시 평가 종목 수
    pub concurrency: usize,
    /// 외부 호출 타임아웃 (초)
    pub fetch_timeout_secs: u64,
    /// 이력 부족 시 이전 달로 확장하는 최대 횟수
    pub max_history_extensions: usize,
    /// 결과 캐시 정책
    pub result_cache: ResultCachePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            category: "ALLBUT0999".to_string(),
            ma_days: 3,
            window_length: 3,
            gain_threshold_pct: dec!(3.5),
            concurrency: 8,
            fetch_timeout_secs: 30,
            max_history_extensions: 6,
            result_cache: ResultCachePolicy::PerDate,
        }
    }
}

impl EngineConfig {
    /// 외부 호출 타임아웃을 Duration으로 반환
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// TWSE 데이터 소스 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// TWSE 기본 URL
    pub base_url: String,
    /// 원본 응답 캐시 디렉토리
    pub cache_dir: String,
    /// 네트워크 요청 간 딜레이 (밀리초)
    pub request_delay_ms: u64,
    /// HTTP User-Agent
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.twse.com.tw".to_string(),
            cache_dir: "./cache/twse".to_string(),
            request_delay_ms: 300,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"
                .to_string(),
        }
    }
}

impl SourceConfig {
    /// 요청 간 딜레이를 Duration으로 반환
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// 거래일 캘린더 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// 평일 휴장일 (YYYYMMDD)
    pub holidays: Vec<String>,
    /// 주말 보충 개장일 (YYYYMMDD)
    pub extra_open_days: Vec<String>,
}

impl CalendarConfig {
    /// 휴장일 목록을 날짜로 파싱합니다.
    pub fn holiday_dates(&self) -> ScreenerResult<Vec<NaiveDate>> {
        parse_date_list("calendar.holidays", &self.holidays)
    }

    /// 보충 개장일 목록을 날짜로 파싱합니다.
    pub fn extra_open_dates(&self) -> ScreenerResult<Vec<NaiveDate>> {
        parse_date_list("calendar.extra_open_days", &self.extra_open_days)
    }
}

fn parse_date_list(key: &str, values: &[String]) -> ScreenerResult<Vec<NaiveDate>> {
    values
        .iter()
        .map(|v| {
            parse_compact_date(v)
                .ok_or_else(|| ScreenerError::Config(format!("{}: 잘못된 날짜 '{}'", key, v)))
        })
        .collect()
}

/// 채팅 명령어 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BotConfig {
    /// 명령어 접두 마커
    pub marker: String,
    /// 단일 종목 조회 키워드
    pub single_keywords: Vec<String>,
    /// 전체 스크리닝 키워드
    pub screen_keywords: Vec<String>,
    /// 메시지 1건의 최대 바이트 수
    pub message_limit: usize,
    /// long polling 타임아웃 (초)
    pub poll_timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            marker: "DD".to_string(),
            single_keywords: vec!["股票".to_string(), "single".to_string()],
            screen_keywords: vec!["篩選".to_string(), "screen".to_string()],
            message_limit: 2000,
            poll_timeout_secs: 30,
        }
    }
}

/// 텔레그램 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// 봇 토큰 (비어 있으면 `TELEGRAM_BOT_TOKEN` 사용)
    pub bot_token: String,
    /// 명령어를 허용할 채팅 ID 목록
    pub allowed_chat_ids: Vec<i64>,
}

/// 데몬 모드 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// 스크리닝 패스 실행 주기 (분 단위)
    pub interval_minutes: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 60,
        }
    }
}

impl DaemonConfig {
    /// 실행 주기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없으면 기본값과 환경 변수만 사용합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> ScreenerResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("SCREENER")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> ScreenerResult<Self> {
        Self::load("config/default.toml")
    }

    /// 값 범위를 검증합니다.
    pub fn validate(&self) -> ScreenerResult<()> {
        if self.engine.ma_days == 0 {
            return Err(ScreenerError::Config("engine.ma_days는 1 이상이어야 합니다".into()));
        }
        if self.engine.window_length == 0 {
            return Err(ScreenerError::Config(
                "engine.window_length는 1 이상이어야 합니다".into(),
            ));
        }
        if self.engine.concurrency == 0 {
            return Err(ScreenerError::Config(
                "engine.concurrency는 1 이상이어야 합니다".into(),
            ));
        }
        if self.daemon.interval_minutes == 0 {
            return Err(ScreenerError::Config(
                "daemon.interval_minutes는 1 이상이어야 합니다".into(),
            ));
        }
        if self.bot.marker.trim().is_empty() {
            return Err(ScreenerError::Config("bot.marker가 비어 있습니다".into()));
        }
        self.calendar.holiday_dates()?;
        self.calendar.extra_open_dates()?;
        Ok(())
    }
}
