//! TWSE(대만증권거래소) JSON 클라이언트.
//!
//! # 엔드포인트
//!
//! | 용도 | 경로 | 주요 파라미터 |
//! |---|---|---|
//! | 외국인 매매 동향 | `/fund/TWT38U` | `date` |
//! | 투신 매매 동향 | `/fund/TWT44U` | `date` |
//! | 월별 일봉 | `/exchangeReport/STOCK_DAY` | `date`(월 1일), `stockNo` |
//! | 종목 목록 | `/exchangeReport/MI_INDEX` | `date`, `type` |
//! | 신용거래 잔고 | `/exchangeReport/MI_MARGN` | `date`, `selectType=ALL` |
//!
//! # 캐시 동작
//!
//! 모든 요청은 먼저 [`FileRawCache`]를 확인합니다. 캐시 파일이 있는데 데이터가 없으면
//! (잘린 파일, 빈 응답이 저장된 경우) `SourceError::NoLocalData`를 반환하여
//! 호출자가 파일을 지우고 다시 요청하도록 합니다.
//! 네트워크 응답은 데이터가 있을 때만 저장합니다. 진행 중인 월의 일봉은 저장하지 않습니다.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use screener_core::{
    month_start, previous_month_start, DailyBar, FlowCategory, FlowRecord, FlowTable,
    MarginRecord, MarginTable, MarketDataSource, PriceHistory, SourceConfig, SourceError,
    StockListing, TradingDate, COMPACT_DATE_FORMAT,
};

use super::response::{
    parse_change, parse_price, parse_roc_date, parse_volume, RawTable, TwseResponse,
};
use crate::calendar::taipei_today;
use crate::storage::FileRawCache;

/// 네트워크 요청 타임아웃.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// 요청 결과.
enum Fetched {
    /// 데이터가 있는 응답
    Data(TwseResponse),
    /// 네트워크 응답이지만 해당 조건의 데이터가 없음
    Empty,
}

/// TWSE 클라이언트.
pub struct TwseClient {
    client: reqwest::Client,
    base_url: String,
    cache: Arc<FileRawCache>,
    request_delay: Duration,
    /// 다음 네트워크 요청이 가능한 시각
    next_slot: Mutex<Instant>,
}

impl TwseClient {
    /// 새 클라이언트를 생성합니다.
    pub fn new(config: &SourceConfig, cache: Arc<FileRawCache>) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| SourceError::Network(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache,
            request_delay: config.request_delay(),
            next_slot: Mutex::new(Instant::now()),
        })
    }

    /// 공유 원본 캐시.
    pub fn raw_cache(&self) -> Arc<FileRawCache> {
        Arc::clone(&self.cache)
    }

    fn build_url(&self, path: &str, params: &[(&str, String)]) -> Result<String, SourceError> {
        let url = reqwest::Url::parse_with_params(&format!("{}{}", self.base_url, path), params)
            .map_err(|e| SourceError::Parse(format!("잘못된 URL: {}", e)))?;
        Ok(url.to_string())
    }

    /// 요청 간 간격을 유지합니다. lock은 대기 시각 계산에만 사용합니다.
    async fn throttle(&self) {
        let wait_until = {
            let mut next = match self.next_slot.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let now = Instant::now();
            let slot = if *next > now { *next } else { now };
            *next = slot + self.request_delay;
            slot
        };
        tokio::time::sleep_until(wait_until).await;
    }

    /// 캐시 우선으로 JSON을 가져옵니다.
    async fn fetch(
        &self,
        path: &str,
        params: &[(&str, String)],
        cacheable: bool,
    ) -> Result<Fetched, SourceError> {
        let url = self.build_url(path, params)?;
        let source_key = FileRawCache::key_for(&url);

        if let Some(body) = self.cache.load(&source_key).await? {
            return match TwseResponse::parse(&body) {
                Ok(response) if response.has_data() => {
                    debug!(url = %url, "캐시 응답 사용");
                    Ok(Fetched::Data(response))
                }
                _ => {
                    warn!(url = %url, source_key = %source_key, "캐시 파일에 데이터 없음");
                    Err(SourceError::NoLocalData { source_key })
                }
            };
        }

        self.throttle().await;
        debug!(url = %url, "TWSE 요청");

        let response = self.client.get(&url).send().await.map_err(map_reqwest)?;
        if !response.status().is_success() {
            return Err(SourceError::Network(format!(
                "HTTP {}: {}",
                response.status(),
                url
            )));
        }
        let body = response.text().await.map_err(map_reqwest)?;
        let parsed = TwseResponse::parse(&body)
            .map_err(|e| SourceError::Parse(format!("{}: {}", path, e)))?;

        if !parsed.has_data() {
            debug!(url = %url, stat = %parsed.stat, "데이터 없음");
            return Ok(Fetched::Empty);
        }

        if cacheable {
            self.cache.store(&source_key, &body).await?;
        }
        Ok(Fetched::Data(parsed))
    }

    /// 한 달치 일봉.
    async fn fetch_month(&self, stock_id: &str, month: NaiveDate) -> Result<Vec<DailyBar>, SourceError> {
        let params = [
            ("response", "json".to_string()),
            ("date", month.format(COMPACT_DATE_FORMAT).to_string()),
            ("stockNo", stock_id.to_string()),
        ];
        // 진행 중인 월은 매일 바뀌므로 저장하지 않음
        let cacheable = month < month_start(taipei_today());

        match self.fetch("/exchangeReport/STOCK_DAY", &params, cacheable).await? {
            Fetched::Data(response) => parse_bars(&response),
            Fetched::Empty => Ok(Vec::new()),
        }
    }
}

fn map_reqwest(err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        SourceError::Timeout(err.to_string())
    } else {
        SourceError::Network(err.to_string())
    }
}

fn no_data(what: &str, date: TradingDate) -> SourceError {
    SourceError::Parse(format!("{} 데이터 없음: {}", what, date))
}

fn missing_table(what: &str) -> SourceError {
    SourceError::Parse(format!("{}: 필요한 컬럼을 가진 테이블이 없습니다", what))
}

fn parse_flow(response: &TwseResponse, category: FlowCategory) -> Result<FlowTable, SourceError> {
    let table = response
        .find_table(&["證券代號", "買進股數", "賣出股數", "買賣超股數"])
        .ok_or_else(|| missing_table(category.report_code()))?;
    let (Some(code), Some(buy), Some(sell), Some(total)) = (
        table.column("證券代號"),
        table.column("買進股數"),
        table.column("賣出股數"),
        table.column("買賣超股數"),
    ) else {
        return Err(missing_table(category.report_code()));
    };

    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            let id = row.get(code)?.trim().to_string();
            let record = FlowRecord {
                buy_volume: parse_volume(row.get(buy)?)?,
                sell_volume: parse_volume(row.get(sell)?)?,
                total_volume: parse_volume(row.get(total)?)?,
            };
            Some((id, record))
        })
        .collect())
}

fn parse_bars(response: &TwseResponse) -> Result<Vec<DailyBar>, SourceError> {
    let table = response
        .find_table(&["日期", "成交股數", "收盤價", "漲跌價差"])
        .ok_or_else(|| missing_table("STOCK_DAY"))?;
    let col = |name: &str| table.column(name).ok_or_else(|| missing_table("STOCK_DAY"));
    let (date, volume, open, high, low, close, change) = (
        col("日期")?,
        col("成交股數")?,
        col("開盤價")?,
        col("最高價")?,
        col("最低價")?,
        col("收盤價")?,
        col("漲跌價差")?,
    );

    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            // 거래가 없는 날("--")은 건너뜀
            Some(DailyBar {
                date: parse_roc_date(row.get(date)?)?,
                volume: parse_volume(row.get(volume)?)?,
                open: parse_price(row.get(open)?)?,
                high: parse_price(row.get(high)?)?,
                low: parse_price(row.get(low)?)?,
                close: parse_price(row.get(close)?)?,
                change: parse_change(row.get(change)?)?,
            })
        })
        .collect())
}

fn parse_listing(table: &RawTable) -> Vec<StockListing> {
    let (Some(code), Some(name)) = (table.column("證券代號"), table.column("證券名稱")) else {
        return Vec::new();
    };
    table
        .rows
        .iter()
        .filter_map(|row| {
            let id = row.get(code)?.trim();
            let name = row.get(name)?.trim();
            (!id.is_empty()).then(|| StockListing::new(id, name))
        })
        .collect()
}

fn parse_margin(response: &TwseResponse) -> Result<MarginTable, SourceError> {
    let table = response
        .find_table(&["代號", "前日餘額", "今日餘額"])
        .ok_or_else(|| missing_table("MI_MARGN"))?;
    let code = table.column("代號").ok_or_else(|| missing_table("MI_MARGN"))?;
    let previous = table.columns("前日餘額");
    let today = table.columns("今日餘額");
    // 앞쪽이 융자, 뒤쪽이 융권
    if previous.len() < 2 || today.len() < 2 {
        return Err(missing_table("MI_MARGN"));
    }

    let net = |row: &Vec<String>, prev_col: usize, today_col: usize| -> Option<i64> {
        Some(parse_volume(row.get(today_col)?)? - parse_volume(row.get(prev_col)?)?)
    };

    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            let id = row.get(code)?.trim().to_string();
            let record = MarginRecord {
                margin_net: net(row, previous[0], today[0])?,
                short_net: net(row, previous[1], today[1])?,
            };
            Some((id, record))
        })
        .collect())
}

#[async_trait]
impl MarketDataSource for TwseClient {
    async fn list_stocks(
        &self,
        category: &str,
        date: TradingDate,
    ) -> Result<Vec<StockListing>, SourceError> {
        let params = [
            ("response", "json".to_string()),
            ("date", date.compact()),
            ("type", category.to_string()),
        ];
        let Fetched::Data(response) = self.fetch("/exchangeReport/MI_INDEX", &params, true).await?
        else {
            return Err(no_data("MI_INDEX", date));
        };

        let listing = response
            .find_table(&["證券代號", "證券名稱"])
            .map(parse_listing)
            .unwrap_or_default();
        if listing.is_empty() {
            return Err(missing_table("MI_INDEX"));
        }
        debug!(category = category, date = %date, stocks = listing.len(), "종목 목록 조회");
        Ok(listing)
    }

    async fn fetch_flow(
        &self,
        category: FlowCategory,
        date: TradingDate,
    ) -> Result<FlowTable, SourceError> {
        let path = format!("/fund/{}", category.report_code());
        let params = [("response", "json".to_string()), ("date", date.compact())];
        match self.fetch(&path, &params, true).await? {
            Fetched::Data(response) => parse_flow(&response, category),
            Fetched::Empty => Err(no_data(category.report_code(), date)),
        }
    }

    async fn fetch_margin(&self, date: TradingDate) -> Result<MarginTable, SourceError> {
        let params = [
            ("response", "json".to_string()),
            ("date", date.compact()),
            ("selectType", "ALL".to_string()),
        ];
        match self.fetch("/exchangeReport/MI_MARGN", &params, true).await? {
            Fetched::Data(response) => parse_margin(&response),
            Fetched::Empty => Err(no_data("MI_MARGN", date)),
        }
    }

    async fn price_history(
        &self,
        stock_id: &str,
        date: TradingDate,
    ) -> Result<PriceHistory, SourceError> {
        let month = date.month_start();
        let bars = self.fetch_month(stock_id, month).await?;
        Ok(PriceHistory::new(stock_id, month, bars))
    }

    async fn extend_history(&self, history: &mut PriceHistory) -> Result<bool, SourceError> {
        let month = previous_month_start(history.earliest_month());
        let bars = self.fetch_month(history.stock_id(), month).await?;
        debug!(
            stock_id = history.stock_id(),
            year = month.year(),
            month = month.month(),
            bars = bars.len(),
            "이력 확장"
        );
        Ok(history.prepend_month(month, bars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use rust_decimal_macros::dec;
    use screener_core::RawCache;
    use std::collections::HashMap;

    fn date(y: i32, m: u32, d: u32) -> TradingDate {
        TradingDate::confirmed(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn client(base_url: String) -> TwseClient {
        let config = SourceConfig {
            base_url,
            cache_dir: String::new(),
            request_delay_ms: 0,
            ..Default::default()
        };
        let dir = std::env::temp_dir().join(format!("twse-test-{}", uuid::Uuid::new_v4()));
        TwseClient::new(&config, Arc::new(FileRawCache::new(dir))).unwrap()
    }

    const TWT44U_BODY: &str = r#"{
        "stat": "OK",
        "fields": ["", "證券代號", "證券名稱", "買進股數", "賣出股數", "買賣超股數"],
        "data": [
            ["", "2330  ", "台積電", "1,000", "200", "800"],
            ["", "2317", "鴻海", "0", "5,000", "-5,000"]
        ]
    }"#;

    #[tokio::test]
    async fn test_fetch_flow_parses_and_caches() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/fund/TWT44U")
            .match_query(Matcher::UrlEncoded("date".into(), "20190703".into()))
            .with_status(200)
            .with_body(TWT44U_BODY)
            .expect(1)
            .create_async()
            .await;

        let client = client(server.url());
        let table = client
            .fetch_flow(FlowCategory::Trust, date(2019, 7, 3))
            .await
            .unwrap();
        assert_eq!(table.total_for("2330"), 800);
        assert_eq!(table.total_for("2317"), -5_000);
        assert_eq!(table.get("2330").unwrap().buy_volume, 1_000);

        // 두 번째는 파일 캐시에서 읽음
        let again = client
            .fetch_flow(FlowCategory::Trust, date(2019, 7, 3))
            .await
            .unwrap();
        assert_eq!(again, table);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_corrupt_cache_reports_no_local_data() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/fund/TWT38U")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(TWT44U_BODY)
            .create_async()
            .await;

        let client = client(server.url());
        let url = client
            .build_url(
                "/fund/TWT38U",
                &[("response", "json".to_string()), ("date", "20190703".to_string())],
            )
            .unwrap();
        let key = FileRawCache::key_for(&url);
        client.raw_cache().store(&key, "{\"stat\":\"OK\",\"da").await.unwrap();

        let err = client
            .fetch_flow(FlowCategory::Foreign, date(2019, 7, 3))
            .await
            .unwrap_err();
        assert_eq!(err, SourceError::NoLocalData { source_key: key.clone() });

        client.raw_cache().remove(&key).await.unwrap();
        let table = client
            .fetch_flow(FlowCategory::Foreign, date(2019, 7, 3))
            .await
            .unwrap();
        assert_eq!(table.total_for("2330"), 800);
    }

    #[tokio::test]
    async fn test_empty_flow_is_not_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/fund/TWT44U")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"stat": "很抱歉，沒有符合條件的資料!"}"#)
            .expect(2)
            .create_async()
            .await;

        let client = client(server.url());
        for _ in 0..2 {
            let err = client
                .fetch_flow(FlowCategory::Trust, date(2019, 7, 6))
                .await
                .unwrap_err();
            assert!(matches!(err, SourceError::Parse(_)));
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_price_history_and_extend() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/exchangeReport/STOCK_DAY")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("date".into(), "20190701".into()),
                Matcher::UrlEncoded("stockNo".into(), "2330".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"stat": "OK",
                    "fields": ["日期", "成交股數", "成交金額", "開盤價", "最高價", "最低價", "收盤價", "漲跌價差", "成交筆數"],
                    "data": [
                        ["108/07/02", "30,000", "1", "236.00", "240.00", "235.00", "239.00", "+3.00", "1"],
                        ["108/07/03", "25,000", "1", "239.00", "241.00", "237.50", "238.50", "-0.50", "1"]
                    ]}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/exchangeReport/STOCK_DAY")
            .match_query(Matcher::UrlEncoded("date".into(), "20190601".into()))
            .with_status(200)
            .with_body(
                r#"{"stat": "OK",
                    "fields": ["日期", "成交股數", "成交金額", "開盤價", "最高價", "最低價", "收盤價", "漲跌價差", "成交筆數"],
                    "data": [["108/06/28", "10,000", "1", "230.00", "233.00", "229.00", "232.00", "X0.00", "1"]]}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/exchangeReport/STOCK_DAY")
            .match_query(Matcher::UrlEncoded("date".into(), "20190501".into()))
            .with_status(200)
            .with_body(r#"{"stat": "很抱歉，沒有符合條件的資料!"}"#)
            .create_async()
            .await;

        let client = client(server.url());
        let mut history = client.price_history("2330", date(2019, 7, 3)).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.bars()[1].change, dec!(-0.50));
        assert_eq!(history.bars()[0].close, dec!(239.00));

        assert!(client.extend_history(&mut history).await.unwrap());
        assert_eq!(history.len(), 3);
        assert_eq!(history.bars()[0].change, dec!(0.00));

        assert!(!client.extend_history(&mut history).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_stocks_and_margin() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/exchangeReport/MI_INDEX")
            .match_query(Matcher::UrlEncoded("type".into(), "ALLBUT0999".into()))
            .with_status(200)
            .with_body(
                r#"{"stat": "OK", "tables": [
                    {"title": "價格指數", "fields": ["指數", "收盤指數"], "data": [["加權", "1"]]},
                    {"title": "每日收盤行情", "fields": ["證券代號", "證券名稱", "成交股數"],
                     "data": [["2330", "台積電", "1"], ["2317", "鴻海", "1"]]}
                ]}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/exchangeReport/MI_MARGN")
            .match_query(Matcher::UrlEncoded("selectType".into(), "ALL".into()))
            .with_status(200)
            .with_body(
                r#"{"stat": "OK", "tables": [
                    {"title": "融資融券彙總",
                     "fields": ["代號", "名稱", "買進", "賣出", "現金償還", "前日餘額", "今日餘額", "次一營業日限額",
                                "買進", "賣出", "現券償還", "前日餘額", "今日餘額", "次一營業日限額", "資券互抵", "註記"],
                     "data": [["2330", "台積電", "1", "0", "0", "1,000", "1,200", "0", "1", "0", "0", "50", "60", "0", "0", ""],
                              ["2317", "鴻海", "1", "0", "0", "1,000", "900", "0", "1", "0", "0", "50", "70", "0", "0", ""]]}
                ]}"#,
            )
            .create_async()
            .await;

        let client = client(server.url());
        let listing = client.list_stocks("ALLBUT0999", date(2019, 7, 3)).await.unwrap();
        assert_eq!(
            listing,
            vec![StockListing::new("2330", "台積電"), StockListing::new("2317", "鴻海")]
        );

        let margin = client.fetch_margin(date(2019, 7, 3)).await.unwrap();
        assert_eq!(
            margin.get("2330"),
            Some(&MarginRecord {
                margin_net: 200,
                short_net: 10
            })
        );
        assert!(margin.get("2330").unwrap().is_positive());
        assert!(!margin.get("2317").unwrap().is_positive());
    }

    #[test]
    fn test_flow_columns_found_by_name() {
        // 컬럼 순서가 달라도 이름으로 찾음
        let response = TwseResponse::parse(
            r#"{"stat": "OK",
                "fields": ["證券名稱", "買賣超股數", "賣出股數", "買進股數", "證券代號"],
                "data": [["台積電", "5", "1", "6", "2330"]]}"#,
        )
        .unwrap();
        let table = parse_flow(&response, FlowCategory::Foreign).unwrap();
        let expected: HashMap<String, FlowRecord> = [(
            "2330".to_string(),
            FlowRecord {
                buy_volume: 6,
                sell_volume: 1,
                total_volume: 5,
            },
        )]
        .into_iter()
        .collect();
        assert_eq!(table, FlowTable::new(expected));
    }
}
