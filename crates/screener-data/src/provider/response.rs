//! TWSE JSON 응답 정규화.
//!
//! TWSE 엔드포인트는 시기에 따라 형식이 다릅니다:
//! - 구형: `fields` / `data`, 또는 `fields9` / `data9` 같은 번호 붙은 쌍
//! - 신형: `tables: [{ title, fields, data }]`
//!
//! 두 형식을 모두 [`RawTable`] 목록으로 바꾼 뒤, 필요한 컬럼을 가진 테이블을 찾아 씁니다.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// 정상 응답의 `stat` 값.
const STAT_OK: &str = "OK";

/// 헤더와 문자열 셀로 이루어진 표.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub fields: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// 헤더에 `name`을 포함하는 첫 컬럼 위치.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.contains(name))
    }

    /// 헤더에 `name`을 포함하는 모든 컬럼 위치.
    pub fn columns(&self, name: &str) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.contains(name))
            .map(|(i, _)| i)
            .collect()
    }

    /// 필요한 컬럼을 모두 가지고 있는지 여부.
    pub fn has_columns(&self, names: &[&str]) -> bool {
        names.iter().all(|n| self.column(n).is_some())
    }
}

/// 파싱된 TWSE 응답.
#[derive(Debug, Clone)]
pub struct TwseResponse {
    pub stat: String,
    pub tables: Vec<RawTable>,
}

impl TwseResponse {
    /// 응답 본문을 파싱합니다.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(body)?;
        let stat = value
            .get("stat")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
        Ok(Self {
            stat,
            tables: extract_tables(&value),
        })
    }

    /// `stat`이 OK이고 데이터 행이 하나 이상 있는지 여부.
    pub fn has_data(&self) -> bool {
        self.stat.eq_ignore_ascii_case(STAT_OK) && self.tables.iter().any(|t| !t.rows.is_empty())
    }

    /// 필요한 컬럼을 가진 첫 번째 (행이 있는) 테이블.
    pub fn find_table(&self, names: &[&str]) -> Option<&RawTable> {
        self.tables
            .iter()
            .find(|t| !t.rows.is_empty() && t.has_columns(names))
    }
}

fn extract_tables(value: &Value) -> Vec<RawTable> {
    let mut tables = Vec::new();

    if let Some(list) = value.get("tables").and_then(Value::as_array) {
        for table in list {
            if let (Some(fields), Some(rows)) = (table.get("fields"), table.get("data")) {
                tables.push(to_table(fields, rows));
            }
        }
    }

    if let Some(obj) = value.as_object() {
        // fields/data, fields1/data1, ... fields9/data9
        let mut suffixes: Vec<&str> = obj
            .keys()
            .filter_map(|k| k.strip_prefix("fields"))
            .filter(|s| s.chars().all(|c| c.is_ascii_digit()))
            .collect();
        suffixes.sort_by_key(|s| s.parse::<u32>().unwrap_or(0));

        for suffix in suffixes {
            let fields = obj.get(&format!("fields{}", suffix));
            let rows = obj.get(&format!("data{}", suffix));
            if let (Some(fields), Some(rows)) = (fields, rows) {
                tables.push(to_table(fields, rows));
            }
        }
    }

    tables
}

fn to_table(fields: &Value, rows: &Value) -> RawTable {
    let fields = fields
        .as_array()
        .map(|a| a.iter().map(cell_to_string).collect())
        .unwrap_or_default();
    let rows = rows
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(Value::as_array)
                .map(|row| row.iter().map(cell_to_string).collect())
                .collect()
        })
        .unwrap_or_default();
    RawTable { fields, rows }
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// 천 단위 구분자가 있는 정수 (`"1,234"`, `"-5,000"`).
pub fn parse_volume(text: &str) -> Option<i64> {
    let cleaned: String = text.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// 가격 (`"1,234.50"`). 거래가 없으면 `"--"`이므로 `None`.
pub fn parse_price(text: &str) -> Option<Decimal> {
    let cleaned: String = text.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    if cleaned.is_empty() || cleaned.starts_with("--") {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// 등락폭 (`"+1.50"`, `"-0.50"`, `"X0.00"`, `" 0.00"`).
///
/// `X`는 비교 불가(권리락 등) 표시이며 부호로 취급하지 않습니다.
pub fn parse_change(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != ',' && *c != 'X' && *c != '+' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() || cleaned.starts_with("--") {
        return Some(Decimal::ZERO);
    }
    Decimal::from_str(&cleaned).ok()
}

/// 민국 연도 날짜 (`"108/07/03"` → 2019-07-03).
pub fn parse_roc_date(text: &str) -> Option<NaiveDate> {
    let mut parts = text.trim().split('/');
    let year: i32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let day: u32 = parts.next()?.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year + 1911, month, day)
}
