use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

#[async_trait]
pub trait OtpStore: Send + Sync {
    async fn put(&self, key: &str, code: &str, ttl: Duration) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn remove(&self, key: &str) -> Result<()>;
}

pub struct RedisOtpStore {
    conn: MultiplexedConnection,
}

impl RedisOtpStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("Invalid Redis URL")?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl OtpStore for RedisOtpStore {
    async fn put(&self, key: &str, code: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(code)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let code: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(code)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL").arg(key).query_async::<()>(&mut conn).await?;
        Ok(())
    }
}

/// Process-local store; expired entries are dropped when read
#[derive(Default)]
pub struct InMemoryOtpStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, (String, Instant)>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn put(&self, key: &str, code: &str, ttl: Duration) -> Result<()> {
        self.entries()
            .insert(key.to_string(), (code.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries();
        match entries.get(key) {
            Some((code, expires_at)) if Instant::now() < *expires_at => Ok(Some(code.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}
