//! 연속 순매수 윈도우.
//!
//! 기준 거래일부터 개장일을 하나씩 거슬러 올라가며 K개 거래일의 기관 순매수를
//! 샘플링합니다. 조회에 성공한 날만 샘플로 셉니다. 데이터가 비어 있는 날이 이어져도
//! `기준일 - (10 + K)일`보다 이전으로는 가지 않습니다.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use screener_core::{FlowCategory, OverboughtResult, TradingCalendar, TradingDate};

use crate::signal_cache::SignalCache;
use crate::timeout::with_timeout;

/// 거슬러 올라가는 달력 일수 여유분.
const WALK_SLACK_DAYS: i64 = 10;

/// 연속 순매수 판정기.
pub struct OverboughtWindow {
    signals: Arc<SignalCache>,
    calendar: Arc<dyn TradingCalendar>,
    fetch_timeout: Duration,
}

impl OverboughtWindow {
    pub fn new(
        signals: Arc<SignalCache>,
        calendar: Arc<dyn TradingCalendar>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            signals,
            calendar,
            fetch_timeout,
        }
    }

    /// 최근 `window`개 거래일 연속 순매수 여부를 판정합니다.
    ///
    /// `start`를 먼저 샘플링한 뒤 이전 개장일로 이동합니다. `window`개를 채우지 못하면
    /// `all_sessions_positive = false`이고 `per_session_totals`는 비어 있습니다.
    pub async fn evaluate(
        &self,
        stock_id: &str,
        category: FlowCategory,
        start: TradingDate,
        window: usize,
    ) -> OverboughtResult {
        if window == 0 {
            return OverboughtResult::insufficient();
        }

        let bound = start.days_before(WALK_SLACK_DAYS + window as i64);
        let mut date = start;
        let mut sampled = 0;
        let mut totals = Vec::with_capacity(window);

        while sampled < window && date.date() > bound {
            match self.signals.get(category, date).await {
                Ok(table) => {
                    sampled += 1;
                    let total = table.total_for(stock_id);
                    if total > 0 {
                        totals.push(total);
                    }
                }
                Err(e) => {
                    debug!(stock_id, category = %category, date = %date, error = %e, "샘플 제외");
                }
            }
            if sampled == window {
                break;
            }

            date = match with_timeout(
                self.fetch_timeout,
                format!("이전 개장일 {}", date),
                self.calendar.previous_open(date.date()),
            )
            .await
            {
                Ok(previous) => previous,
                Err(e) => {
                    warn!(date = %date, error = %e, "캘린더 조회 실패, 윈도우 중단");
                    break;
                }
            };
        }

        if sampled < window {
            return OverboughtResult::insufficient();
        }

        let all_sessions_positive = totals.len() == window;
        totals.resize(window, 0);
        OverboughtResult {
            all_sessions_positive,
            per_session_totals: totals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{flow_table, trading, ymd, FakeSource, WeekdayCalendar};
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn window_with(
        flows: HashMap<(FlowCategory, NaiveDate), screener_core::FlowTable>,
        calendar: WeekdayCalendar,
    ) -> (OverboughtWindow, Arc<FakeSource>) {
        let source = Arc::new(FakeSource {
            flows,
            ..Default::default()
        });
        let signals = Arc::new(SignalCache::new(
            source.clone(),
            source.clone(),
            Duration::from_secs(5),
        ));
        (
            OverboughtWindow::new(signals, Arc::new(calendar), Duration::from_secs(5)),
            source,
        )
    }

    fn foreign(entries: &[(NaiveDate, i64)]) -> HashMap<(FlowCategory, NaiveDate), screener_core::FlowTable> {
        entries
            .iter()
            .map(|(date, total)| ((FlowCategory::Foreign, *date), flow_table(&[("2330", *total)])))
            .collect()
    }

    #[tokio::test]
    async fn test_three_positive_sessions() {
        // 2019-07-03 (수), 07-02 (화), 07-01 (월)
        let (window, source) = window_with(
            foreign(&[
                (ymd(2019, 7, 3), 800),
                (ymd(2019, 7, 2), 300),
                (ymd(2019, 7, 1), 50),
                (ymd(2019, 6, 28), -10),
            ]),
            WeekdayCalendar::default(),
        );

        let result = window
            .evaluate("2330", FlowCategory::Foreign, trading(2019, 7, 3), 3)
            .await;
        assert!(result.all_sessions_positive);
        assert_eq!(result.per_session_totals, vec![800, 300, 50]);
        assert_eq!(source.flow_calls(), 3);
    }

    #[tokio::test]
    async fn test_walk_crosses_weekend() {
        // 2019-07-08 (월) → 07-05 (금) → 07-04 (목)
        let (window, _) = window_with(
            foreign(&[
                (ymd(2019, 7, 8), 1),
                (ymd(2019, 7, 5), 2),
                (ymd(2019, 7, 4), 3),
            ]),
            WeekdayCalendar::default(),
        );

        let result = window
            .evaluate("2330", FlowCategory::Foreign, trading(2019, 7, 8), 3)
            .await;
        assert_eq!(result.per_session_totals, vec![1, 2, 3]);
        assert!(result.all_sessions_positive);
    }

    #[tokio::test]
    async fn test_negative_session_is_sampled_but_not_positive() {
        let (window, _) = window_with(
            foreign(&[
                (ymd(2019, 7, 3), 800),
                (ymd(2019, 7, 2), -300),
                (ymd(2019, 7, 1), 50),
            ]),
            WeekdayCalendar::default(),
        );

        let result = window
            .evaluate("2330", FlowCategory::Foreign, trading(2019, 7, 3), 3)
            .await;
        assert!(!result.all_sessions_positive);
        assert_eq!(result.per_session_totals, vec![800, 50, 0]);
    }

    #[tokio::test]
    async fn test_missing_stock_counts_as_zero() {
        let mut flows = foreign(&[(ymd(2019, 7, 3), 800), (ymd(2019, 7, 1), 50)]);
        flows.insert(
            (FlowCategory::Foreign, ymd(2019, 7, 2)),
            flow_table(&[("2317", 99)]),
        );
        let (window, _) = window_with(flows, WeekdayCalendar::default());

        let result = window
            .evaluate("2330", FlowCategory::Foreign, trading(2019, 7, 3), 3)
            .await;
        assert!(!result.all_sessions_positive);
        assert_eq!(result.per_session_totals, vec![800, 50, 0]);
    }

    #[tokio::test]
    async fn test_failed_lookups_are_skipped() {
        // 07-02 데이터 없음 → 07-03, 07-01, 06-28 샘플
        let (window, _) = window_with(
            foreign(&[
                (ymd(2019, 7, 3), 5),
                (ymd(2019, 7, 1), 6),
                (ymd(2019, 6, 28), 7),
            ]),
            WeekdayCalendar::default(),
        );

        let result = window
            .evaluate("2330", FlowCategory::Foreign, trading(2019, 7, 3), 3)
            .await;
        assert!(result.all_sessions_positive);
        assert_eq!(result.per_session_totals, vec![5, 6, 7]);
    }

    #[tokio::test]
    async fn test_sparse_data_hits_backward_bound() {
        // 13일 이전까지 데이터가 하나뿐
        let (window, source) = window_with(
            foreign(&[(ymd(2019, 7, 3), 5), (ymd(2019, 6, 14), 6)]),
            WeekdayCalendar::default(),
        );

        let result = window
            .evaluate("2330", FlowCategory::Foreign, trading(2019, 7, 3), 3)
            .await;
        assert!(!result.all_sessions_positive);
        assert!(result.per_session_totals.is_empty());
        assert!(!result.is_complete());
        // 07-03 ~ 06-21 사이의 평일 9일만 조회
        assert_eq!(source.flow_calls(), 9);
    }
}
