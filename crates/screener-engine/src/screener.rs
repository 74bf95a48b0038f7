//! 스크리닝 엔진.
//!
//! 한 거래일에 대해 종목 목록 전체를 평가하고 필터를 적용합니다.
//!
//! # 처리 흐름
//!
//! 1. 종목 목록 조회 (날짜별 캐시)
//! 2. 신용거래 테이블 조회 (날짜별 캐시, 실패 시 신용 신호 없이 진행하고 다음 패스에서 재조회)
//! 3. 종목별 평가를 `engine.concurrency`개씩 병렬 실행 (결과는 목록 순서 유지)
//!    - 일봉 이력 준비 → 당일 지표 계산
//!    - 외국인/투신 연속 순매수 윈도우
//! 4. 필터 적용
//!
//! 한 종목의 실패는 로그와 통계에만 남기고 해당 종목을 결과에서 뺍니다.
//! 목록 조회 실패만 패스 전체를 실패시킵니다. 종목 평가 에러나 신용거래 조회
//! 실패가 있었던 날은 결과를 돌려주되 날짜별 결과 캐시에는 남기지 않습니다.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use screener_core::{
    EngineConfig, FilterSpec, FilterThresholds, FlowCategory, MarginTable, MarketDataSource,
    RawCache, ResultCachePolicy, ScreenedStock, ScreenerError, ScreenerResult, StockEvaluation,
    StockListing, StockMetrics, TradingCalendar, TradingDate,
};

use crate::history::HistoryCache;
use crate::overbought::OverboughtWindow;
use crate::signal_cache::SignalCache;
use crate::single_flight::SingleFlight;
use crate::stats::ScreeningStats;
use crate::timeout::with_timeout;

/// 스크리닝 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningReport {
    /// 기준 거래일
    pub date: TradingDate,
    /// 적용한 필터
    pub filter: FilterSpec,
    /// 평가된 종목 (목록 순서, 통과 여부 포함)
    pub stocks: Vec<ScreenedStock>,
    /// 통계
    pub stats: ScreeningStats,
}

impl ScreeningReport {
    /// 필터를 통과한 종목.
    pub fn admitted(&self) -> impl Iterator<Item = &StockEvaluation> {
        self.stocks
            .iter()
            .filter(|s| s.admitted)
            .map(|s| &s.evaluation)
    }
}

/// 한 거래일의 필터 적용 전 평가 결과.
struct DayEvaluation {
    evaluations: Vec<StockEvaluation>,
    stats: ScreeningStats,
    margin_missing: bool,
}

impl DayEvaluation {
    /// 일시적 실패 없이 끝난 평가인지 확인합니다.
    fn is_complete(&self) -> bool {
        self.stats.errors == 0 && !self.margin_missing
    }
}

/// 스크리닝 엔진.
///
/// 모든 캐시는 이 객체가 소유하며 프로세스 수명 동안 유지됩니다.
pub struct Screener {
    config: EngineConfig,
    thresholds: FilterThresholds,
    source: Arc<dyn MarketDataSource>,
    signals: Arc<SignalCache>,
    histories: HistoryCache,
    window: OverboughtWindow,
    listings: SingleFlight<TradingDate, Arc<Vec<StockListing>>>,
    margins: SingleFlight<TradingDate, Arc<MarginTable>>,
    days: SingleFlight<TradingDate, Arc<DayEvaluation>>,
}

impl Screener {
    pub fn new(
        config: EngineConfig,
        calendar: Arc<dyn TradingCalendar>,
        source: Arc<dyn MarketDataSource>,
        raw_cache: Arc<dyn RawCache>,
    ) -> Self {
        let fetch_timeout = config.fetch_timeout();
        let signals = Arc::new(SignalCache::new(
            Arc::clone(&source),
            raw_cache,
            fetch_timeout,
        ));
        let histories = HistoryCache::new(
            Arc::clone(&source),
            config.ma_days,
            config.max_history_extensions,
            fetch_timeout,
        );
        let window = OverboughtWindow::new(Arc::clone(&signals), calendar, fetch_timeout);

        Self {
            thresholds: FilterThresholds {
                gain_pct: config.gain_threshold_pct,
            },
            config,
            source,
            signals,
            histories,
            window,
            listings: SingleFlight::new(),
            margins: SingleFlight::new(),
            days: SingleFlight::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn thresholds(&self) -> &FilterThresholds {
        &self.thresholds
    }

    /// 기관 매매 동향 캐시.
    pub fn signals(&self) -> &Arc<SignalCache> {
        &self.signals
    }

    /// 전체 종목을 평가하고 필터를 적용합니다.
    ///
    /// `ResultCachePolicy::PerDate`이면 같은 날짜의 평가 결과를 재사용하고 필터만 다시 적용합니다.
    #[instrument(skip(self, filter), fields(date = %date, filter = ?filter.tokens()))]
    pub async fn screen_all(
        &self,
        date: TradingDate,
        filter: &FilterSpec,
    ) -> ScreenerResult<ScreeningReport> {
        let started = Instant::now();
        let fresh = AtomicBool::new(false);

        let day = match self.config.result_cache {
            ResultCachePolicy::Disabled => {
                fresh.store(true, Ordering::Relaxed);
                Arc::new(self.evaluate_day(date).await?)
            }
            ResultCachePolicy::PerDate => {
                self.days
                    .get_or_try_init_if(
                        date,
                        || async {
                            fresh.store(true, Ordering::Relaxed);
                            self.evaluate_day(date).await.map(Arc::new)
                        },
                        |day| {
                            if !day.is_complete() {
                                warn!(
                                    date = %date,
                                    errors = day.stats.errors,
                                    margin_missing = day.margin_missing,
                                    "불완전한 평가 결과, 결과 캐시에 저장하지 않음"
                                );
                            }
                            day.is_complete()
                        },
                    )
                    .await?
            }
        };

        let stocks: Vec<ScreenedStock> = day
            .evaluations
            .iter()
            .map(|evaluation| ScreenedStock {
                admitted: filter.admit_evaluation(evaluation, &self.thresholds),
                evaluation: evaluation.clone(),
            })
            .collect();

        let mut stats = day.stats.clone();
        stats.admitted = stocks.iter().filter(|s| s.admitted).count();
        stats.reused = !fresh.load(Ordering::Relaxed);
        if stats.reused {
            stats.elapsed = started.elapsed();
        }
        stats.log_summary("screen_all");

        Ok(ScreeningReport {
            date,
            filter: *filter,
            stocks,
            stats,
        })
    }

    /// 한 종목을 평가합니다.
    ///
    /// # Errors
    ///
    /// - `StockNotListed`: 해당 날짜 목록에 없는 종목
    /// - `InsufficientHistory`: 지표 계산에 필요한 일봉 부족
    #[instrument(skip(self), fields(date = %date))]
    pub async fn screen_one(
        &self,
        date: TradingDate,
        stock_id: &str,
    ) -> ScreenerResult<StockEvaluation> {
        let stock_id = stock_id.trim();
        let listing = self.listing(date).await?;
        let stock = listing
            .iter()
            .find(|s| s.id == stock_id)
            .cloned()
            .ok_or_else(|| ScreenerError::StockNotListed(stock_id.to_string()))?;

        let margin = self.margin(date).await;
        self.evaluate(&stock, date, margin).await
    }

    async fn evaluate_day(&self, date: TradingDate) -> ScreenerResult<DayEvaluation> {
        let started = Instant::now();
        let listing = self.listing(date).await?;
        let margin = self.margin(date).await;
        info!(date = %date, stocks = listing.len(), "스크리닝 패스 시작");

        let pending: Vec<_> = listing
            .iter()
            .map(|stock| self.evaluate(stock, date, margin.clone()))
            .collect();
        let results: Vec<ScreenerResult<StockEvaluation>> = stream::iter(pending)
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut stats = ScreeningStats {
            total: listing.len(),
            ..Default::default()
        };
        let mut evaluations = Vec::with_capacity(listing.len());

        for (stock, result) in listing.iter().zip(results) {
            match result {
                Ok(evaluation) => {
                    stats.evaluated += 1;
                    evaluations.push(evaluation);
                }
                Err(ScreenerError::InsufficientHistory {
                    available,
                    required,
                    ..
                }) => {
                    stats.insufficient_history += 1;
                    debug!(stock_id = %stock.id, available, required, "이력 부족, 건너뜀");
                }
                Err(e) => {
                    stats.errors += 1;
                    warn!(stock_id = %stock.id, error = %e, "종목 평가 실패, 건너뜀");
                }
            }
        }

        stats.elapsed = started.elapsed();
        Ok(DayEvaluation {
            evaluations,
            stats,
            margin_missing: margin.is_none(),
        })
    }

    async fn evaluate(
        &self,
        stock: &StockListing,
        date: TradingDate,
        margin: Option<Arc<MarginTable>>,
    ) -> ScreenerResult<StockEvaluation> {
        let history = self.histories.prepare(&stock.id, date).await?;
        let bars = history.bars_until(date.date());
        let metrics = StockMetrics::compute(bars, self.config.ma_days).ok_or_else(|| {
            ScreenerError::InsufficientHistory {
                stock_id: stock.id.clone(),
                available: bars.len(),
                required: self.config.ma_days,
            }
        })?;

        let window = self.config.window_length;
        let (foreign, trust) = tokio::join!(
            self.window
                .evaluate(&stock.id, FlowCategory::Foreign, date, window),
            self.window
                .evaluate(&stock.id, FlowCategory::Trust, date, window),
        );

        Ok(StockEvaluation {
            listing: stock.clone(),
            date,
            metrics,
            foreign,
            trust,
            margin: margin.and_then(|table| table.get(&stock.id).copied()),
        })
    }

    async fn listing(&self, date: TradingDate) -> ScreenerResult<Arc<Vec<StockListing>>> {
        self.listings
            .get_or_try_init(date, || async {
                let listing = with_timeout(
                    self.config.fetch_timeout(),
                    format!("MI_INDEX {}", date),
                    self.source.list_stocks(&self.config.category, date),
                )
                .await?;
                Ok::<_, ScreenerError>(Arc::new(listing))
            })
            .await
    }

    /// 신용거래 테이블. 실패는 캐시하지 않고 `None`으로 진행합니다.
    async fn margin(&self, date: TradingDate) -> Option<Arc<MarginTable>> {
        self.margins
            .get_or_try_init(date, || async {
                with_timeout(
                    self.config.fetch_timeout(),
                    format!("MI_MARGN {}", date),
                    self.source.fetch_margin(date),
                )
                .await
                .map(Arc::new)
            })
            .await
            .map_err(|e| {
                warn!(date = %date, error = %e, "신용거래 조회 실패, 신용 신호 없이 진행");
            })
            .ok()
    }
}
