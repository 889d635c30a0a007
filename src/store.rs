use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::Config;

/// Opaque last-classification store. The prober and the status endpoint
/// only ever touch these two operations; everything else about persistence
/// belongs to the backing service.
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, optionally expiring at `expires_at`
    /// (Unix seconds). An expired key reads back as absent.
    async fn put(&self, key: &str, value: &str, expires_at: Option<i64>) -> Result<()>;
}

/// Pick the store implementation the configuration calls for.
pub async fn open(config: &Config) -> Result<Arc<dyn StatusStore>> {
    match &config.redis_url {
        Some(url) => {
            let store = RedisStore::connect(url).await?;
            info!("status store: Redis");
            Ok(Arc::new(store))
        }
        None => {
            info!("status store: in-process (REDIS_URL not set)");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Redis-backed store. One `GET`/`SET` per call over a managed connection;
/// `EXAT` carries the expiration when one is requested.
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client =
            redis::Client::open(url).with_context(|| format!("invalid Redis URL: {url}"))?;
        let conn = ConnectionManager::new(client)
            .await
            .context("failed to connect to Redis")?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl StatusStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.context("redis GET failed")?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: &str, expires_at: Option<i64>) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ts) = expires_at {
            cmd.arg("EXAT").arg(ts);
        }
        cmd.query_async::<()>(&mut conn)
            .await
            .context("redis SET failed")
    }
}

/// In-process fallback store, selected when no Redis URL is configured.
/// Expiry is checked lazily on read, mirroring a TTL'd key vanishing.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, Option<i64>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().await;
        let expired = matches!(
            entries.get(key),
            Some((_, Some(expires_at))) if *expires_at <= Utc::now().timestamp()
        );
        if expired {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|(value, _)| value.clone()))
    }

    async fn put(&self, key: &str, value: &str, expires_at: Option<i64>) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }
}
