//! # Portico Redis
//!
//! Low-level Redis client for the Portico API gateway.
//!
//! ## Design Principles
//!
//! - **No business logic** - Pure infrastructure layer
//! - **Generic operations** - Usable by any component that needs a
//!   key-value store with expiry
//! - **Atomic primitives** - INCR-with-window is a single Lua script, so
//!   concurrent callers never race between increment and expiry
//!
//! ## Example
//!
//! ```rust,no_run
//! use portico_redis::RedisClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = RedisClient::connect("redis://localhost:6379").await?;
//!
//!     // Set with expiry
//!     client.set_ex("key", "value", 60).await?;
//!
//!     // Get
//!     let value: Option<String> = client.get("key").await?;
//!
//!     Ok(())
//! }
//! ```

mod client;

pub use client::RedisClient;

// Re-export commonly used types
pub use redis::RedisError;

/// Result type for Redis operations
pub type Result<T> = std::result::Result<T, RedisError>;
