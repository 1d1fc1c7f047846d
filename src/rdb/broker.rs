//! Redis 经纪人实现
//! Redis broker implementation
//!
//! 基于 Redis 列表与键过期实现队列存储：RPUSH/BLPOP 保证原子的
//! 先进先出与至多一次投递，SET EX 承载带 TTL 的状态记录，
//! SCAN 游标用于租户发现。
//! Implements the queue store on Redis lists and key expiry: RPUSH/BLPOP give
//! atomic FIFO with at-most-once delivery, SET EX carries TTL'd status
//! records, and the SCAN cursor backs tenant discovery.

use crate::base::Broker;
use crate::error::Result;
use crate::redis::RedisConfig;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tokio::sync::OnceCell;

/// 每轮 SCAN 的批量提示
/// Batch hint per SCAN round
const SCAN_COUNT: usize = 100;

/// Redis 经纪人实现
/// Redis broker implementation
pub struct RedisBroker {
  client: Client,
  // 惰性建立并缓存的多路复用连接；所有操作克隆同一条连接
  // Lazily established, cached multiplexed connection; every operation
  // clones the same connection
  conn: OnceCell<MultiplexedConnection>,
}

impl RedisBroker {
  /// 从配置创建新的 Redis 经纪人实例
  /// Create a new Redis broker instance from a configuration
  pub fn new(config: RedisConfig) -> Result<Self> {
    let client = Client::open(config.connection_info)?;
    Ok(Self {
      client,
      conn: OnceCell::new(),
    })
  }

  /// 从 Redis URL 创建实例
  /// Create an instance from a Redis URL
  pub fn from_url(url: &str) -> Result<Self> {
    Self::new(RedisConfig::from_url(url)?)
  }

  /// 获取异步连接
  /// Get the asynchronous connection
  async fn conn(&self) -> Result<MultiplexedConnection> {
    let conn = self
      .conn
      .get_or_try_init(|| async { self.client.get_multiplexed_async_connection().await })
      .await?;
    Ok(conn.clone())
  }
}

#[async_trait]
impl Broker for RedisBroker {
  async fn ping(&self) -> Result<()> {
    let mut conn = self.conn().await?;
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;
    Ok(())
  }

  async fn close(&self) -> Result<()> {
    // 多路复用连接随实例析构关闭
    // The multiplexed connection closes when the instance is dropped
    Ok(())
  }

  async fn push(&self, key: &str, payload: &str) -> Result<()> {
    let mut conn = self.conn().await?;
    let _: i64 = conn.rpush(key, payload).await?;
    Ok(())
  }

  async fn pop(&self, key: &str, timeout: Duration) -> Result<Option<String>> {
    let mut conn = self.conn().await?;
    // BLPOP 的 0 表示永久阻塞，这里钳制到最小正超时
    // A BLPOP timeout of 0 blocks forever, clamp to a minimal positive value
    let timeout_secs = timeout.as_secs_f64().max(0.001);
    let reply: Option<(String, String)> = conn.blpop(key, timeout_secs).await?;
    Ok(reply.map(|(_, payload)| payload))
  }

  async fn queue_len(&self, key: &str) -> Result<usize> {
    let mut conn = self.conn().await?;
    let len: i64 = conn.llen(key).await?;
    Ok(len.max(0) as usize)
  }

  async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
    let mut conn = self.conn().await?;
    let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
    Ok(())
  }

  async fn get(&self, key: &str) -> Result<Option<String>> {
    let mut conn = self.conn().await?;
    let value: Option<String> = conn.get(key).await?;
    Ok(value)
  }

  async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>> {
    let mut conn = self.conn().await?;
    let pattern = format!("{prefix}*");
    let mut cursor: u64 = 0;
    let mut keys = Vec::new();
    loop {
      // TYPE 过滤确保只命中队列列表，状态键不会混入
      // The TYPE filter keeps the scan on queue lists, status keys never slip in
      let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
        .arg(cursor)
        .arg("MATCH")
        .arg(&pattern)
        .arg("COUNT")
        .arg(SCAN_COUNT)
        .arg("TYPE")
        .arg("list")
        .query_async(&mut conn)
        .await?;
      keys.extend(batch);
      cursor = next;
      if cursor == 0 {
        break;
      }
    }
    Ok(keys)
  }
}
