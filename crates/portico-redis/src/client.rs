//! Redis client implementation with connection management

use crate::Result;
use redis::{aio::ConnectionManager, AsyncCommands};

/// Fixed-window counter script: increment the key and start its expiry
/// window on the first increment only. Returns the post-increment count.
const INCR_WINDOW_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
"#;

/// Redis client with automatic reconnection
#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
}

impl RedisClient {
    /// Connect to Redis server
    ///
    /// Supports both redis:// and rediss:// (TLS) URLs
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// GET - Get string value by key
    pub async fn get(&mut self, key: &str) -> Result<Option<String>> {
        self.conn.get(key).await
    }

    /// SETEX - Set key with expiry in seconds
    pub async fn set_ex(&mut self, key: &str, value: &str, seconds: u64) -> Result<()> {
        self.conn.set_ex(key, value, seconds).await
    }

    /// DEL - Delete one or more keys
    pub async fn del(&mut self, key: &str) -> Result<i64> {
        self.conn.del(key).await
    }

    /// TTL - Get time to live in seconds
    pub async fn ttl(&mut self, key: &str) -> Result<i64> {
        self.conn.ttl(key).await
    }

    /// Atomically increment a fixed-window counter.
    ///
    /// The expiry window starts when the key is first created; later
    /// increments within the window do not extend it. Returns the
    /// post-increment count.
    pub async fn incr_window(&mut self, key: &str, window_secs: u64) -> Result<i64> {
        redis::Script::new(INCR_WINDOW_SCRIPT)
            .key(key)
            .arg(window_secs)
            .invoke_async(&mut self.conn)
            .await
    }

    /// PING - Check connection liveness
    pub async fn ping(&mut self) -> Result<()> {
        let _: () = redis::cmd("PING").query_async(&mut self.conn).await?;
        Ok(())
    }
}
