//! 컴포넌트 조립.

use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use tracing::{debug, info};

use screener_core::{AppConfig, TradingCalendar, TradingDate};
use screener_data::{taipei_today, FileRawCache, TwseCalendar, TwseClient};
use screener_engine::Screener;
use screener_notification::CommandInterpreter;

/// 조립된 애플리케이션.
pub struct App {
    pub config: AppConfig,
    pub calendar: Arc<dyn TradingCalendar>,
    pub screener: Arc<Screener>,
}

impl App {
    /// 설정에서 TWSE 구현체와 엔진을 생성합니다.
    pub fn build(config: AppConfig) -> anyhow::Result<Self> {
        let calendar: Arc<dyn TradingCalendar> = Arc::new(
            TwseCalendar::from_config(&config.calendar).context("캘린더 설정 오류")?,
        );
        let raw_cache = Arc::new(FileRawCache::new(config.source.cache_dir.clone()));
        let client = Arc::new(
            TwseClient::new(&config.source, Arc::clone(&raw_cache))
                .context("TWSE 클라이언트 생성 실패")?,
        );
        debug!(
            cache_dir = %config.source.cache_dir,
            base_url = %config.source.base_url,
            "데이터 소스 준비"
        );

        let screener = Arc::new(Screener::new(
            config.engine.clone(),
            Arc::clone(&calendar),
            client,
            raw_cache,
        ));
        info!(
            ma_days = config.engine.ma_days,
            window_length = config.engine.window_length,
            concurrency = config.engine.concurrency,
            result_cache = ?config.engine.result_cache,
            "스크리닝 엔진 준비"
        );

        Ok(Self {
            config,
            calendar,
            screener,
        })
    }

    /// 기준일을 개장일로 정규화합니다.
    ///
    /// 날짜가 없으면 오늘(대만 현지) 이전의 가장 최근 개장일을 사용합니다.
    pub async fn resolve_date(&self, date: Option<NaiveDate>) -> anyhow::Result<TradingDate> {
        let resolved = match date {
            Some(date) => self.calendar.nearest_open_on_or_before(date).await,
            None => self.calendar.previous_open(taipei_today()).await,
        }
        .context("거래일 조회 실패")?;
        Ok(resolved)
    }

    /// 채팅 명령어 해석기.
    pub fn interpreter(&self) -> CommandInterpreter {
        CommandInterpreter::new(&self.config.bot, Arc::clone(&self.calendar), taipei_today)
    }
}
