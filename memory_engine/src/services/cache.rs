//! Short-term cache and chat-history client backed by Redis.
//!
//! The client survives a Redis that is down or was never reachable: every
//! operation consults the health register first and reports unavailability
//! instead of failing the caller or silently returning empty data. No
//! in-memory fallback store is substituted; durability is not invented on
//! behalf of a downed store. TTL expiry is Redis's own.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{
    CacheEntry, CacheLookup, ChatTurn, ComponentState, ComponentStatus, WriteOutcome,
    CACHE_COMPONENT,
};
use crate::services::retrieval::ChatStore;
use crate::services::{HealthRegister, StoreProbe};

const PROBE_KEY_PREFIX: &str = "memhub:health:probe";
const PROBE_TTL_SECS: usize = 30;

pub struct CacheClient {
    /// `None` when the driver never initialized; probes then report
    /// `client not available`, distinguished from a live client that
    /// cannot reach the store.
    conn: Option<ConnectionManager>,
    health: Arc<HealthRegister>,
    timeout: Duration,
}

impl CacheClient {
    /// Connect to Redis. Never fails the process: a store that is down at
    /// boot yields a client whose operations report unavailability until
    /// the process is restarted with a reachable store.
    pub async fn connect(
        redis_url: &str,
        timeout: Duration,
        health: Arc<HealthRegister>,
    ) -> Self {
        let conn = match Client::open(redis_url) {
            Ok(client) => {
                match tokio::time::timeout(timeout, ConnectionManager::new(client)).await {
                    Ok(Ok(conn)) => {
                        info!("✅ Cache store connected");
                        Some(conn)
                    }
                    Ok(Err(e)) => {
                        warn!("⚠️  Cache store connection failed: {}", e);
                        None
                    }
                    Err(_) => {
                        warn!("⚠️  Cache store connection timed out after {:?}", timeout);
                        None
                    }
                }
            }
            Err(e) => {
                warn!("⚠️  Cache client creation failed: {}", e);
                None
            }
        };

        Self { conn, health, timeout }
    }

    fn chat_key(session_id: &str) -> String {
        format!("chat:{}", session_id)
    }

    async fn component_failed(&self) -> bool {
        self.health.component_state(CACHE_COMPONENT).await == ComponentState::Failed
    }

    /// Bound a Redis call by the configured timeout and convert failures
    /// at this boundary; raw `redis::RedisError` never travels upward.
    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StoreError::connectivity(e)),
            Err(_) => Err(StoreError::Connectivity(format!(
                "timed out after {:?}",
                self.timeout
            ))),
        }
    }

    /// Get a cached entry. `Miss` means Redis answered and had nothing;
    /// `Unavailable` means the store could not be consulted at all.
    pub async fn get(&self, key: &str) -> Result<CacheLookup<CacheEntry>, StoreError> {
        if self.component_failed().await {
            return Ok(CacheLookup::Unavailable);
        }
        let Some(manager) = &self.conn else {
            return Ok(CacheLookup::Unavailable);
        };

        let mut conn = manager.clone();
        let raw = self
            .bounded(async move { conn.get::<_, Option<String>>(key).await })
            .await?;

        match raw {
            Some(json) => match serde_json::from_str::<CacheEntry>(&json) {
                Ok(entry) => Ok(CacheLookup::Hit(entry)),
                Err(e) => {
                    warn!("⚠️  Corrupt cache entry for {}: {}", key, e);
                    Ok(CacheLookup::Miss)
                }
            },
            None => Ok(CacheLookup::Miss),
        }
    }

    /// Store a value, optionally with a TTL enforced by Redis itself.
    pub async fn set(
        &self,
        key: &str,
        value: &Value,
        ttl: Option<Duration>,
    ) -> Result<WriteOutcome, StoreError> {
        if self.component_failed().await {
            return Ok(WriteOutcome::Unavailable);
        }
        let Some(manager) = &self.conn else {
            return Ok(WriteOutcome::Unavailable);
        };

        let entry = CacheEntry::new(key, value.clone(), ttl.map(|t| t.as_secs()));
        let payload = serde_json::to_string(&entry)
            .map_err(|e| StoreError::Encoding(e.to_string()))?;
        let mut conn = manager.clone();
        match ttl {
            Some(ttl) => {
                self.bounded(async move {
                    conn.set_ex::<_, _, ()>(key, payload, ttl.as_secs() as usize)
                        .await
                })
                .await?
            }
            None => {
                self.bounded(async move { conn.set::<_, _, ()>(key, payload).await })
                    .await?
            }
        }

        Ok(WriteOutcome::Written)
    }

    /// Append one turn to a session's history. Ordering is insertion order
    /// (RPUSH), and sessions are isolated by key.
    pub async fn append_chat_turn(
        &self,
        session_id: &str,
        turn: &ChatTurn,
    ) -> Result<WriteOutcome, StoreError> {
        if self.component_failed().await {
            return Ok(WriteOutcome::Unavailable);
        }
        let Some(manager) = &self.conn else {
            return Ok(WriteOutcome::Unavailable);
        };

        let json = serde_json::to_string(turn)
            .map_err(|e| StoreError::Encoding(e.to_string()))?;
        let key = Self::chat_key(session_id);

        let mut conn = manager.clone();
        self.bounded(async move { conn.rpush::<_, _, ()>(key, json).await })
            .await?;

        Ok(WriteOutcome::Written)
    }

    /// Fetch the most recent `limit` turns for a session, oldest first.
    pub async fn get_chat_history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<CacheLookup<Vec<ChatTurn>>, StoreError> {
        if self.component_failed().await {
            return Ok(CacheLookup::Unavailable);
        }
        let Some(manager) = &self.conn else {
            return Ok(CacheLookup::Unavailable);
        };
        if limit == 0 {
            return Ok(CacheLookup::Hit(Vec::new()));
        }

        let key = Self::chat_key(session_id);
        let start = -(limit as isize);

        let mut conn = manager.clone();
        let lrange_key = key.clone();
        let rows = self
            .bounded(async move {
                conn.lrange::<_, Vec<String>>(lrange_key, start, -1).await
            })
            .await?;

        let turns = rows
            .iter()
            .filter_map(|row| match serde_json::from_str::<ChatTurn>(row) {
                Ok(turn) => Some(turn),
                Err(e) => {
                    warn!("⚠️  Skipping corrupt chat turn in {}: {}", key, e);
                    None
                }
            })
            .collect();

        Ok(CacheLookup::Hit(turns))
    }
}

#[async_trait]
impl StoreProbe for CacheClient {
    fn component_name(&self) -> &str {
        CACHE_COMPONENT
    }

    /// Round-trip set+get under a unique key: the cheapest operation that
    /// proves both read and write capability. Concurrent probes cannot
    /// interfere with each other because each uses its own key.
    async fn probe(&self, timeout: Duration) -> ComponentStatus {
        let Some(manager) = &self.conn else {
            return ComponentStatus::failed(CACHE_COMPONENT, "client not available");
        };

        let token = Uuid::new_v4().to_string();
        let key = format!("{}:{}", PROBE_KEY_PREFIX, token);

        let mut conn = manager.clone();
        let round_trip = async {
            conn.set_ex::<_, _, ()>(&key, &token, PROBE_TTL_SECS).await?;
            conn.get::<_, Option<String>>(&key).await
        };

        let start = Instant::now();
        match tokio::time::timeout(timeout, round_trip).await {
            Ok(Ok(Some(read))) if read == token => ComponentStatus::healthy(
                CACHE_COMPONENT,
                start.elapsed().as_millis() as u64,
            ),
            Ok(Ok(_)) => {
                ComponentStatus::failed(CACHE_COMPONENT, "probe read-back mismatch")
            }
            Ok(Err(e)) => ComponentStatus::failed(CACHE_COMPONENT, e.to_string()),
            Err(_) => ComponentStatus::failed(
                CACHE_COMPONENT,
                format!("timed out after {:?}", timeout),
            ),
        }
    }
}

#[async_trait]
impl ChatStore for CacheClient {
    async fn recent_history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<CacheLookup<Vec<ChatTurn>>, StoreError> {
        self.get_chat_history(session_id, limit).await
    }
}
