//! 存储抽象模块
//! Store abstraction module
//!
//! 定义了与后端队列存储交互的抽象层
//! Defines the abstraction layer for interacting with the backing queue store

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub mod constants;
pub mod keys;

/// 队列存储特性，唯一的持久化与传输层
/// Queue store trait, the sole persistence and transport layer
///
/// 一个提供命名列表原子 push/pop 与键过期能力的网络化键值存储（如 Redis）。
/// 存储是系统中唯一的共享可变资源，只通过这里的原子原语被修改。
/// A networked key-value store offering atomic push/pop on named lists and
/// key expiry (e.g. Redis). The store is the only shared mutable resource in
/// the system and is mutated solely through the atomic primitives here.
#[async_trait]
pub trait Broker: Send + Sync {
  /// 建立/校验连接，幂等
  /// Establish/validate the connection, idempotent
  async fn ping(&self) -> Result<()>;

  /// 关闭连接
  /// Close the connection
  async fn close(&self) -> Result<()>;

  /// 原子追加到命名列表尾部，非阻塞
  /// Atomically append to the tail of a named list, non-blocking
  async fn push(&self, key: &str, payload: &str) -> Result<()>;

  /// 单次原子阻塞弹出，受 `timeout` 约束
  /// Single atomic blocking pop bounded by `timeout`
  ///
  /// `Ok(None)` 表示超时内无条目；传输层故障以 `Err` 区分返回，
  /// 不与空队列混淆。
  /// `Ok(None)` means nothing was available within the timeout; a transport
  /// failure is returned as a distinct `Err`, never conflated with an empty
  /// queue.
  async fn pop(&self, key: &str, timeout: Duration) -> Result<Option<String>>;

  /// 列表当前长度，不存在的键视为 0
  /// Current list length, 0 for a missing key
  async fn queue_len(&self, key: &str) -> Result<usize>;

  /// 带过期时间的幂等覆写
  /// Idempotent overwrite with expiry
  async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

  /// 读取键值，不存在或已过期返回 `None`
  /// Read a value, `None` when missing or expired
  async fn get(&self, key: &str) -> Result<Option<String>>;

  /// 游标驱动的非阻塞扫描，返回匹配前缀的列表键
  /// Cursor-driven non-blocking scan, returns list keys matching the prefix
  ///
  /// 绝不做完整键空间列举。
  /// Never a full keyspace listing.
  async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>>;
}
