//! 원본 응답 파일 캐시.
//!
//! TWSE 응답 본문을 요청 URL의 SHA-256 해시를 이름으로 하는 파일에 저장합니다.
//! 같은 URL은 같은 파일을 가리키므로, 손상된 파일을 지우면 다음 요청에서
//! 네트워크로 다시 가져옵니다.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use screener_core::{RawCache, SourceError};

/// 파일 기반 원본 캐시.
#[derive(Debug, Clone)]
pub struct FileRawCache {
    dir: PathBuf,
}

impl FileRawCache {
    /// 캐시 디렉토리를 지정하여 생성합니다. 디렉토리는 첫 저장 시 만들어집니다.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 요청 URL의 캐시 키 (hex SHA-256).
    pub fn key_for(url: &str) -> String {
        hex::encode(Sha256::digest(url.as_bytes()))
    }

    /// 캐시 키의 파일 경로.
    pub fn path_for(&self, source_key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", source_key))
    }

    /// 캐시된 본문을 읽습니다. 파일이 없으면 `None`.
    pub async fn load(&self, source_key: &str) -> Result<Option<String>, SourceError> {
        match tokio::fs::read_to_string(self.path_for(source_key)).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 본문을 저장합니다.
    ///
    /// 쓰기마다 고유한 임시 파일에 쓴 뒤 rename하므로 읽는 쪽이 쓰다 만 파일을 보지
    /// 않고, 같은 키를 동시에 저장해도 서로의 임시 파일을 건드리지 않습니다.
    pub async fn store(&self, source_key: &str, body: &str) -> Result<(), SourceError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(source_key);
        let tmp = self
            .dir
            .join(format!("{}.{}.tmp", source_key, uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, body).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!(path = %path.display(), bytes = body.len(), "원본 응답 캐시 저장");
        Ok(())
    }
}

#[async_trait]
impl RawCache for FileRawCache {
    async fn remove(&self, source_key: &str) -> Result<(), SourceError> {
        let path = self.path_for(source_key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = %path.display(), "손상된 캐시 파일 삭제");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache() -> FileRawCache {
        FileRawCache::new(std::env::temp_dir().join(format!("raw-cache-{}", uuid::Uuid::new_v4())))
    }

    #[test]
    fn test_key_is_stable_hex() {
        let a = FileRawCache::key_for("https://www.twse.com.tw/fund/TWT44U?date=20190703");
        let b = FileRawCache::key_for("https://www.twse.com.tw/fund/TWT44U?date=20190703");
        let c = FileRawCache::key_for("https://www.twse.com.tw/fund/TWT44U?date=20190704");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_store_load_remove() {
        let cache = temp_cache();
        let key = FileRawCache::key_for("u");

        assert_eq!(cache.load(&key).await.unwrap(), None);
        cache.store(&key, "{\"stat\":\"OK\"}").await.unwrap();
        assert_eq!(
            cache.load(&key).await.unwrap().as_deref(),
            Some("{\"stat\":\"OK\"}")
        );

        cache.remove(&key).await.unwrap();
        assert_eq!(cache.load(&key).await.unwrap(), None);

        // 없는 파일 삭제는 성공
        cache.remove(&key).await.unwrap();
        let _ = tokio::fs::remove_dir_all(cache.dir()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_stores_of_same_key() {
        let cache = temp_cache();
        let key = FileRawCache::key_for("https://www.twse.com.tw/exchangeReport/STOCK_DAY");
        let bodies: Vec<String> = (0..8).map(|i| format!("{{\"writer\":{}}}", i)).collect();

        let tasks: Vec<_> = bodies
            .iter()
            .cloned()
            .map(|body| {
                let cache = cache.clone();
                let key = key.clone();
                tokio::spawn(async move { cache.store(&key, &body).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stored = cache.load(&key).await.unwrap().unwrap();
        assert!(bodies.contains(&stored));

        // 임시 파일이 남지 않음
        let mut entries = tokio::fs::read_dir(cache.dir()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec![format!("{}.json", key)]);
        let _ = tokio::fs::remove_dir_all(cache.dir()).await;
    }
}
