//! 内存经纪人实现
//! Memory broker implementation
//!
//! 使用内存数据结构实现队列存储，不依赖任何外部服务。
//! 语义与 Redis 后端对齐：列表为空即消失（扫描可见性一致），
//! 键值带过期时间，弹出在写锁内完成因此跨并发消费者恰好一次。
//! Implements the queue store with in-memory data structures, without any
//! external service. Semantics match the Redis backend: empty lists vanish
//! (scan visibility is identical), values carry an expiry, and pops happen
//! under the write lock so they are exactly-once across concurrent consumers.

use crate::base::Broker;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// 空队列上阻塞弹出的轮询步长
/// Polling step for a blocking pop on an empty queue
const POP_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// 带过期时间的键值条目
/// Value entry with an expiry
struct ValueEntry {
  value: String,
  expires_at: Instant,
}

/// 内存存储
/// Memory storage
#[derive(Default)]
struct MemoryStorage {
  /// 命名列表 - 仅保存非空队列
  /// Named lists - only non-empty queues are kept
  lists: HashMap<String, VecDeque<String>>,
  /// 带 TTL 的键值条目（状态记录）
  /// TTL'd key-value entries (status records)
  entries: HashMap<String, ValueEntry>,
}

/// 内存经纪人实现
/// Memory broker implementation
#[derive(Clone, Default)]
pub struct MemoryBroker {
  storage: Arc<RwLock<MemoryStorage>>,
}

impl MemoryBroker {
  /// 创建新的内存经纪人实例
  /// Create a new memory broker instance
  pub fn new() -> Self {
    Self::default()
  }

  async fn try_pop(&self, key: &str) -> Option<String> {
    let mut storage = self.storage.write().await;
    let queue = storage.lists.get_mut(key)?;
    let item = queue.pop_front();
    if queue.is_empty() {
      // 与 Redis 一致：空列表的键不存在
      // Matches Redis: the key of an empty list does not exist
      storage.lists.remove(key);
    }
    item
  }
}

#[async_trait]
impl Broker for MemoryBroker {
  async fn ping(&self) -> Result<()> {
    // 内存存储始终可用
    // Memory storage is always available
    Ok(())
  }

  async fn close(&self) -> Result<()> {
    Ok(())
  }

  async fn push(&self, key: &str, payload: &str) -> Result<()> {
    let mut storage = self.storage.write().await;
    storage
      .lists
      .entry(key.to_string())
      .or_default()
      .push_back(payload.to_string());
    Ok(())
  }

  async fn pop(&self, key: &str, timeout: Duration) -> Result<Option<String>> {
    let deadline = Instant::now() + timeout;
    loop {
      if let Some(item) = self.try_pop(key).await {
        return Ok(Some(item));
      }
      let now = Instant::now();
      if now >= deadline {
        return Ok(None);
      }
      tokio::time::sleep(POP_POLL_INTERVAL.min(deadline - now)).await;
    }
  }

  async fn queue_len(&self, key: &str) -> Result<usize> {
    let storage = self.storage.read().await;
    Ok(storage.lists.get(key).map(VecDeque::len).unwrap_or(0))
  }

  async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
    let mut storage = self.storage.write().await;
    storage.entries.insert(
      key.to_string(),
      ValueEntry {
        value: value.to_string(),
        expires_at: Instant::now() + ttl,
      },
    );
    Ok(())
  }

  async fn get(&self, key: &str) -> Result<Option<String>> {
    let mut storage = self.storage.write().await;
    match storage.entries.get(key) {
      Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
      Some(_) => {
        // 惰性清理过期条目
        // Lazily purge the expired entry
        storage.entries.remove(key);
        Ok(None)
      }
      None => Ok(None),
    }
  }

  async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>> {
    let storage = self.storage.read().await;
    Ok(
      storage
        .lists
        .keys()
        .filter(|key| key.starts_with(prefix))
        .cloned()
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_push_pop_fifo() {
    let broker = MemoryBroker::new();
    broker.push("q", "a").await.unwrap();
    broker.push("q", "b").await.unwrap();

    let first = broker.pop("q", Duration::from_millis(10)).await.unwrap();
    let second = broker.pop("q", Duration::from_millis(10)).await.unwrap();
    assert_eq!(first.as_deref(), Some("a"));
    assert_eq!(second.as_deref(), Some("b"));
  }

  #[tokio::test]
  async fn test_pop_empty_returns_none_within_timeout() {
    let broker = MemoryBroker::new();
    let started = Instant::now();
    let item = broker.pop("missing", Duration::from_millis(50)).await.unwrap();
    assert!(item.is_none());
    assert!(started.elapsed() < Duration::from_millis(200));
  }

  #[tokio::test]
  async fn test_empty_queue_disappears_from_scan() {
    let broker = MemoryBroker::new();
    broker.push("d:t1:send:high", "x").await.unwrap();
    assert_eq!(broker.scan_keys("d:").await.unwrap().len(), 1);

    broker.pop("d:t1:send:high", Duration::from_millis(10)).await.unwrap();
    assert!(broker.scan_keys("d:").await.unwrap().is_empty());
    assert_eq!(broker.queue_len("d:t1:send:high").await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_value_expiry() {
    let broker = MemoryBroker::new();
    broker
      .set_with_ttl("t1:a1", "{}", Duration::from_millis(30))
      .await
      .unwrap();
    assert!(broker.get("t1:a1").await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(broker.get("t1:a1").await.unwrap().is_none());
  }
}
