//! 채팅 응답 포맷.
//!
//! 응답은 사용자가 읽는 대만 현지 언어(번체 중국어)로 작성합니다.

use screener_core::{OverboughtResult, ScreenerError, StockEvaluation, UnknownFilterToken};
use screener_engine::ScreeningReport;

use crate::command::CommandError;
use crate::reply::ReplyBatcher;

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "是"
    } else {
        "否"
    }
}

fn window(result: &OverboughtResult) -> String {
    if !result.is_complete() {
        return "否 (資料不足)".to_string();
    }
    let totals: Vec<String> = result
        .per_session_totals
        .iter()
        .map(|t| t.to_string())
        .collect();
    format!("{} [{}]", yes_no(result.all_sessions_positive), totals.join(", "))
}

/// 한 줄 요약. 스크리닝 목록과 CLI 로그에 사용합니다.
pub fn format_line(evaluation: &StockEvaluation, ma_days: usize) -> String {
    let m = &evaluation.metrics;
    format!(
        "{} 漲跌:{:.2} 收盤:{:.2} 漲幅:{:.2}% MA{}:{:.2} 站上均線:{} 外資:{} 投信:{} 融資券:{}",
        evaluation.listing,
        m.today_range,
        m.today_price,
        m.today_gain_pct,
        ma_days,
        m.n_day_average,
        yes_no(m.above_average),
        yes_no(evaluation.foreign_overbought()),
        yes_no(evaluation.trust_overbought()),
        yes_no(evaluation.margin_positive()),
    )
}

/// 단일 종목 상세 응답.
pub fn format_evaluation(evaluation: &StockEvaluation, ma_days: usize) -> String {
    let m = &evaluation.metrics;
    let margin = match evaluation.margin {
        Some(record) => format!(
            "{} (融資 {:+} / 融券 {:+})",
            yes_no(record.is_positive()),
            record.margin_net,
            record.short_net
        ),
        None => "無資料".to_string(),
    };

    [
        format!("{} ({})", evaluation.listing, evaluation.date),
        format!(
            "漲跌: {:.2}  收盤: {:.2}  漲幅: {:.2}%",
            m.today_range, m.today_price, m.today_gain_pct
        ),
        format!(
            "{}日均價: {:.2}  站上均線: {}",
            ma_days,
            m.n_day_average,
            yes_no(m.above_average)
        ),
        format!("外資連續買超: {}", window(&evaluation.foreign)),
        format!("投信連續買超: {}", window(&evaluation.trust)),
        format!("融資融券增加: {}", margin),
    ]
    .join("\n")
}

/// 스크리닝 결과 응답. 통과한 종목만 나열하고 메시지 크기 제한에 맞춰 묶습니다.
pub fn format_screening(report: &ScreeningReport, ma_days: usize, limit: usize) -> Vec<String> {
    let mut batcher = ReplyBatcher::new(limit);
    let filter = report.filter.tokens();
    let filter = if filter.is_empty() {
        "無".to_string()
    } else {
        filter.join(" ")
    };

    batcher.append(&format!(
        "{} 篩選 [{}] 符合 {} / {} 檔",
        report.date, filter, report.stats.admitted, report.stats.evaluated
    ));
    if report.stats.skipped() > 0 {
        batcher.append(&format!(
            "略過 {} 檔 (歷史資料不足 {}, 錯誤 {})",
            report.stats.skipped(),
            report.stats.insufficient_history,
            report.stats.errors
        ));
    }

    let mut any = false;
    for evaluation in report.admitted() {
        any = true;
        batcher.append(&format_line(evaluation, ma_days));
    }
    if !any {
        batcher.append("無符合條件的股票");
    }

    batcher.flush()
}

/// 요청 처리 실패 응답.
pub fn format_error(error: &ScreenerError) -> String {
    match error {
        ScreenerError::InsufficientHistory {
            stock_id,
            available,
            required,
        } => format!(
            "{} 歷史資料不足 ({}/{} 日)",
            stock_id, available, required
        ),
        ScreenerError::NoLocalData { source_key } => {
            format!("本地資料損毀，請稍後再試 ({})", source_key)
        }
        ScreenerError::UpstreamFetchFailed(_) => "證交所資料取得失敗，請稍後再試".to_string(),
        ScreenerError::StockNotListed(stock_id) => format!("查無此股票: {}", stock_id),
        ScreenerError::Config(_) => "伺服器設定錯誤".to_string(),
    }
}

/// 명령어 해석 실패 응답. 명령어가 아닌 메시지는 `None` (무응답).
pub fn format_command_error(error: &CommandError, usage_hint: &str) -> Option<String> {
    match error {
        CommandError::NotACommand => None,
        CommandError::BadCommandKind(token) => {
            Some(format!("無法辨識的指令: {}\n{}", token, usage_hint))
        }
        CommandError::DateUnavailable(_) => Some("無法取得交易日，請稍後再試".to_string()),
    }
}

/// 알 수 없는 필터 토큰 응답.
pub fn format_unknown_filter(error: &UnknownFilterToken) -> String {
    format!(
        "未知的篩選條件: {}\n可用條件: cp ma t38 t44 mtss all",
        error.0
    )
}
