//! 키별 단일 적재 맵.
//!
//! 같은 키에 대한 첫 적재를 키별 lock으로 직렬화합니다. 바깥 맵 lock은 슬롯을
//! 찾거나 만들 때만 잡으므로, 느린 적재 중에도 다른 키는 막히지 않습니다.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

type Slot<V> = Arc<Mutex<Option<V>>>;

/// 키별로 값을 한 번만 적재하는 append-only 맵.
pub struct SingleFlight<K, V> {
    slots: RwLock<HashMap<K, Slot<V>>>,
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// 슬롯 획득 또는 생성.
    async fn slot(&self, key: &K) -> Slot<V> {
        let slots = self.slots.read().await;
        if let Some(slot) = slots.get(key) {
            return slot.clone();
        }
        drop(slots);

        let mut slots = self.slots.write().await;
        slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// 값이 있으면 반환하고, 없으면 `init`으로 적재합니다.
    ///
    /// `init`의 결과는 무엇이든 저장됩니다. 실패도 기억해야 하면 `V`를 `Result`로 둡니다.
    pub async fn get_or_init<F, Fut>(&self, key: K, init: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let slot = self.slot(&key).await;
        let mut value = slot.lock().await;
        if let Some(existing) = value.as_ref() {
            return existing.clone();
        }
        let loaded = init().await;
        *value = Some(loaded.clone());
        loaded
    }

    /// 값이 있으면 반환하고, 없으면 `init`으로 적재합니다. 실패는 저장하지 않습니다.
    pub async fn get_or_try_init<F, Fut, E>(&self, key: K, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.get_or_try_init_if(key, init, |_| true).await
    }

    /// `get_or_try_init`과 같지만 `keep`이 거부한 값은 호출자에게만 돌려주고 저장하지 않습니다.
    ///
    /// 저장하지 않은 키는 다음 호출에서 다시 적재합니다.
    pub async fn get_or_try_init_if<F, Fut, E, P>(&self, key: K, init: F, keep: P) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        P: FnOnce(&V) -> bool,
    {
        let slot = self.slot(&key).await;
        let mut value = slot.lock().await;
        if let Some(existing) = value.as_ref() {
            return Ok(existing.clone());
        }
        let loaded = init().await?;
        if keep(&loaded) {
            *value = Some(loaded.clone());
        }
        Ok(loaded)
    }

    /// 적재 완료된 값. 적재 중이면 끝날 때까지 기다립니다.
    pub async fn get(&self, key: &K) -> Option<V> {
        let slot = self.slots.read().await.get(key).cloned()?;
        let value = slot.lock().await;
        value.clone()
    }

    /// 슬롯 수.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
