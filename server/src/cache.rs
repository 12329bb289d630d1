use anyhow::{anyhow, bail, Result};
use fishhunt_execution::CastCache;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::timeout;

/// Longest wait for a fresh connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
/// Longest wait for a single command.
const RESPONSE_TIMEOUT: Duration = Duration::from_millis(500);
/// How long calls fail fast after a connect or command fault.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

struct Link {
    manager: Option<ConnectionManager>,
    retry_at: Option<Instant>,
}

/// Redis-backed cast cache.
///
/// The connection is opened lazily and dropped after any command error or
/// timeout. For [`RECONNECT_BACKOFF`] after a fault every call fails at once
/// instead of dialing again, so an unreachable host costs one bounded attempt
/// per backoff period. Errors are returned to the caller, which treats them as
/// a cache miss.
pub struct RedisCache {
    client: redis::Client,
    link: Mutex<Link>,
    prefix: String,
}

impl RedisCache {
    pub fn new(url: &str, prefix: String) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            link: Mutex::new(Link {
                manager: None,
                retry_at: None,
            }),
            prefix,
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        let mut link = self.link.lock().await;
        if let Some(manager) = &link.manager {
            return Ok(manager.clone());
        }
        if let Some(retry_at) = link.retry_at {
            let now = Instant::now();
            if now < retry_at {
                bail!(
                    "redis unavailable, reconnecting in {}ms",
                    (retry_at - now).as_millis()
                );
            }
        }
        match timeout(CONNECT_TIMEOUT, self.client.get_connection_manager()).await {
            Ok(Ok(manager)) => {
                link.retry_at = None;
                link.manager = Some(manager.clone());
                Ok(manager)
            }
            Ok(Err(e)) => {
                link.retry_at = Some(Instant::now() + RECONNECT_BACKOFF);
                Err(e.into())
            }
            Err(_) => {
                link.retry_at = Some(Instant::now() + RECONNECT_BACKOFF);
                Err(anyhow!(
                    "redis connect timed out after {}ms",
                    CONNECT_TIMEOUT.as_millis()
                ))
            }
        }
    }

    async fn trip(&self) {
        let mut link = self.link.lock().await;
        link.manager = None;
        link.retry_at = Some(Instant::now() + RECONNECT_BACKOFF);
    }

    /// Runs one command on a shared connection, bounded by [`RESPONSE_TIMEOUT`].
    async fn call<T, F, Fut>(&self, command: F) -> Result<T>
    where
        F: FnOnce(ConnectionManager) -> Fut,
        Fut: Future<Output = redis::RedisResult<T>>,
    {
        let conn = self.connection().await?;
        match timeout(RESPONSE_TIMEOUT, command(conn)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                self.trip().await;
                Err(e.into())
            }
            Err(_) => {
                self.trip().await;
                Err(anyhow!(
                    "redis command timed out after {}ms",
                    RESPONSE_TIMEOUT.as_millis()
                ))
            }
        }
    }
}

impl CastCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = self.key(key);
        self.call(move |mut conn| async move {
            let value: Option<String> = conn.get(key).await?;
            Ok::<_, redis::RedisError>(value)
        })
        .await
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let key = self.key(key);
        let value = value.to_string();
        let millis = (ttl.as_millis() as u64).max(1);
        self.call(move |mut conn| async move {
            let _: () = conn.pset_ex(key, value, millis).await?;
            Ok::<_, redis::RedisError>(())
        })
        .await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let key = self.key(key);
        let millis = self
            .call(move |mut conn| async move {
                let millis: i64 = conn.pttl(key).await?;
                Ok::<_, redis::RedisError>(millis)
            })
            .await?;
        // -2: no such key, -1: no expiry
        Ok(match millis {
            millis if millis > 0 => Some(Duration::from_millis(millis as u64)),
            _ => None,
        })
    }
}
