//! 백그라운드 스크리닝.
//!
//! 봇 시작 시와 데몬 주기마다 가장 최근 개장일의 전 종목을 미리 평가합니다.
//! 이후 같은 날짜의 채팅 요청은 엔진 캐시를 재사용합니다.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tracing::{error, info};

use screener_core::{FilterSpec, ScreenerResult, TradingCalendar};
use screener_engine::{Screener, ScreeningReport};
use screener_notification::Clock;

/// `today` 이전의 가장 최근 개장일에 대해 전체 필터로 스크리닝합니다.
pub async fn run_pass(
    screener: &Screener,
    calendar: &dyn TradingCalendar,
    today: NaiveDate,
) -> ScreenerResult<ScreeningReport> {
    let date = calendar.previous_open(today).await?;
    info!(date = %date, "백그라운드 스크리닝 시작");
    screener.screen_all(date, &FilterSpec::all()).await
}

/// 백그라운드 스크리닝 task를 시작합니다. 실패는 로그로만 남깁니다.
pub fn spawn_pass(
    screener: Arc<Screener>,
    calendar: Arc<dyn TradingCalendar>,
    today: Clock,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match run_pass(&screener, calendar.as_ref(), today()).await {
            Ok(report) => info!(
                date = %report.date,
                admitted = report.stats.admitted,
                "백그라운드 스크리닝 완료"
            ),
            Err(e) => error!(error = %e, "백그라운드 스크리닝 실패"),
        }
    })
}
