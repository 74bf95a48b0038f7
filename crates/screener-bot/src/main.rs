//! TWSE 일일 스크리너 CLI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use screener_bot::{background, App, ScreenerBotHandler};
use screener_core::{init_logging, parse_compact_date, AppConfig, FilterSpec, LogConfig};
use screener_data::taipei_today;
use screener_notification::report::{format_error, format_evaluation, format_line, format_screening};
use screener_notification::{TelegramBotHandler, TelegramTransport};

#[derive(Parser)]
#[command(name = "screener")]
#[command(about = "TWSE 일일 스크리너", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 경로
    #[arg(long, default_value = "config/default.toml")]
    config: PathBuf,

    /// 로그 레벨 (trace, debug, info, warn, error). 설정 파일 값보다 우선
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 전체 종목 스크리닝 (결과를 로그로 출력)
    Screen {
        /// 기준일 (YYYYMMDD, 생략 시 가장 최근 개장일)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// 필터 (쉼표로 구분, 예: "cp,ma,t38,t44,mtss")
        #[arg(long)]
        filters: Option<String>,
    },

    /// 단일 종목 조회
    Query {
        /// 종목 코드 (예: 2330)
        #[arg(required = true)]
        stocks: Vec<String>,

        /// 기준일 (YYYYMMDD, 생략 시 가장 최근 개장일)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },

    /// 텔레그램 봇 실행 (시작 시 백그라운드 스크리닝)
    Bot,

    /// 데몬 모드: 주기적으로 전체 스크리닝 실행
    Daemon,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    parse_compact_date(value).ok_or_else(|| format!("YYYYMMDD 형식이 아닙니다: {}", value))
}

fn parse_filters(filters: Option<&str>) -> anyhow::Result<FilterSpec> {
    match filters {
        None => Ok(FilterSpec::all()),
        Some(list) => {
            let tokens = list.split(',').map(str::trim).filter(|t| !t.is_empty());
            Ok(FilterSpec::from_tokens(tokens)?)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("설정 로드 실패: {}", cli.config.display()))?;

    // 로깅 초기화
    let mut log_config = LogConfig::from_section(&config.logging);
    if let Some(level) = &cli.log_level {
        log_config.level = level.clone();
    }
    init_logging(log_config).map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    tracing::info!("TWSE Screener 시작");
    let app = App::build(config)?;

    match cli.command {
        Commands::Screen { date, filters } => {
            let filter = parse_filters(filters.as_deref())?;
            let date = app.resolve_date(date).await?;
            let report = app.screener.screen_all(date, &filter).await?;

            let ma_days = app.config.engine.ma_days;
            for stock in &report.stocks {
                tracing::info!(
                    admitted = stock.admitted,
                    "{}",
                    format_line(&stock.evaluation, ma_days)
                );
            }
            for message in format_screening(&report, ma_days, app.config.bot.message_limit) {
                println!("{}", message);
            }
        }
        Commands::Query { stocks, date } => {
            let date = app.resolve_date(date).await?;
            let ma_days = app.config.engine.ma_days;
            for stock_id in &stocks {
                match app.screener.screen_one(date, stock_id).await {
                    Ok(evaluation) => println!("{}\n", format_evaluation(&evaluation, ma_days)),
                    Err(e) => {
                        tracing::warn!(stock_id = %stock_id, error = %e, "종목 조회 실패");
                        println!("{}\n", format_error(&e));
                    }
                }
            }
        }
        Commands::Bot => {
            let token = if app.config.telegram.bot_token.is_empty() {
                std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default()
            } else {
                app.config.telegram.bot_token.clone()
            };
            let transport = Arc::new(TelegramTransport::new(token)?);
            let handler = Arc::new(ScreenerBotHandler::new(
                app.interpreter(),
                Arc::clone(&app.screener),
                app.config.bot.message_limit,
            ));
            let bot = TelegramBotHandler::new(transport, handler)
                .with_allowed_chat_ids(app.config.telegram.allowed_chat_ids.clone())
                .with_poll_timeout(app.config.bot.poll_timeout_secs);

            let pass = background::spawn_pass(
                Arc::clone(&app.screener),
                Arc::clone(&app.calendar),
                taipei_today,
            );

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("종료 신호 수신, 봇 종료 중...");
                }
                _ = bot.start_polling() => {}
            }
            pass.abort();
        }
        Commands::Daemon => {
            tracing::info!(
                "=== 데몬 모드 시작 (주기: {}분) ===",
                app.config.daemon.interval_minutes
            );

            let mut interval = tokio::time::interval(app.config.daemon.interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("종료 신호 수신, 데몬 종료 중...");
                        break;
                    }
                    _ = interval.tick() => {
                        match background::run_pass(&app.screener, app.calendar.as_ref(), taipei_today()).await {
                            Ok(report) => tracing::info!(
                                date = %report.date,
                                admitted = report.stats.admitted,
                                "=== 스크리닝 완료, 다음 실행: {}분 후 ===",
                                app.config.daemon.interval_minutes
                            ),
                            Err(e) => tracing::error!("스크리닝 실패: {}", e),
                        }
                    }
                }
            }
        }
    }

    tracing::info!("TWSE Screener 종료");
    Ok(())
}
