//! 응답 메시지 묶음.
//!
//! 짧은 응답 조각을 채팅 메시지 크기 제한 안에서 최대한 적은 메시지로 묶습니다.
//! 조각 하나는 절대 나누지 않습니다.

/// 메시지 1건의 기본 최대 바이트 수.
pub const DEFAULT_MESSAGE_LIMIT: usize = 2000;

/// 응답 조각 버퍼.
#[derive(Debug, Clone)]
pub struct ReplyBatcher {
    limit: usize,
    buffer: String,
    messages: Vec<String>,
}

impl Default for ReplyBatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE_LIMIT)
    }
}

impl ReplyBatcher {
    /// 메시지당 최대 `limit` 바이트(UTF-8)로 묶는 배처를 생성합니다.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            buffer: String::new(),
            messages: Vec::new(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 조각을 추가합니다.
    ///
    /// 구분자(`\n`)를 포함해 현재 버퍼에 더한 길이가 제한에 닿으면 버퍼를 메시지로
    /// 확정하고 새 버퍼를 시작합니다. 따라서 조각이 둘 이상인 메시지는 항상 제한보다
    /// 짧습니다. 빈 조각은 무시합니다.
    pub fn append(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        if !self.buffer.is_empty() && self.buffer.len() + 1 + fragment.len() >= self.limit {
            let full = std::mem::replace(&mut self.buffer, fragment.to_string());
            self.messages.push(full);
            return;
        }

        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(fragment);
    }

    /// 아직 보내지 않은 내용이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && self.messages.is_empty()
    }

    /// 모든 메시지를 꺼냅니다. 배처는 빈 상태로 돌아갑니다.
    pub fn flush(&mut self) -> Vec<String> {
        if !self.buffer.is_empty() {
            let last = std::mem::take(&mut self.buffer);
            self.messages.push(last);
        }
        std::mem::take(&mut self.messages)
    }
}
