//! 队列管理器模块
//! Queue manager module
//!
//! 寻址方案加上入队/出队两个原语，以及旁路的状态存储。
//! The addressing scheme plus the enqueue/dequeue primitives and the
//! side-channel status store.

use crate::action::{Action, ActionStatus, Priority, StatusRecord};
use crate::base::keys::{self, QueueKey};
use crate::base::Broker;
use crate::config::QueueConfig;
use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// 队列管理器
/// Queue manager
///
/// 持有注入的存储句柄；键方案使隔离与优先级排序成为结构性质：
/// 按 (域, 租户, 动作, 优先级) 寻址的消费者不可能被其他租户的积压
/// 或同租户的低优先级条目饿死。
/// Holds an injected store handle; the key scheme makes isolation and
/// priority ordering structural: a consumer addressing
/// (domain, tenant, action, priority) cannot be starved by another tenant's
/// backlog or by lower-priority items of the same tenant.
pub struct QueueManager {
  broker: Arc<dyn Broker>,
  config: QueueConfig,
}

impl QueueManager {
  /// 创建新的队列管理器
  /// Create a new queue manager
  pub fn new(broker: Arc<dyn Broker>, config: QueueConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self { broker, config })
  }

  /// 获取存储句柄
  /// Get the store handle
  pub fn broker(&self) -> &Arc<dyn Broker> {
    &self.broker
  }

  /// 获取配置
  /// Get the configuration
  pub fn config(&self) -> &QueueConfig {
    &self.config
  }

  /// 建立/校验存储连接，幂等
  /// Establish/validate the store connection, idempotent
  pub async fn connect(&self) -> Result<()> {
    self.broker.ping().await
  }

  /// 将动作入队到目标域
  /// Enqueue an action into a target domain
  ///
  /// 非阻塞；存储不可用时关闭式失败 —— `Err` 意味着"未持久入队"，
  /// 调用方不得在失败的入队之后写入 `queued` 状态，也不得静默重试。
  /// Non-blocking; fails closed on store unavailability — an `Err` means
  /// "not durably queued": callers MUST NOT follow a failed enqueue with a
  /// `queued` status write, and must not retry silently.
  pub async fn enqueue(&self, action: &Action, target_domain: &str) -> Result<()> {
    let key = QueueKey::new(
      target_domain,
      action.tenant_id.as_str(),
      action.name(),
      action.priority,
    )
    .to_string();

    if self.config.max_queue_depth > 0 {
      let depth = self.broker.queue_len(&key).await?;
      if depth >= self.config.max_queue_depth {
        return Err(Error::QueueFull { queue: key });
      }
    }

    let payload = action.encode()?;
    self.broker.push(&key, &payload).await
  }

  /// 单次原子阻塞出队，受 `timeout` 约束
  /// Single atomic blocking dequeue bounded by `timeout`
  ///
  /// 至多一次投递：存储的原子弹出保证无重复，但弹出与处理之间的
  /// 崩溃会丢失该条目（无重投）。`Ok(None)` 表示超时内无条目；
  /// 传输层故障以 `Err` 返回。
  /// At-most-once delivery: the store's atomic pop rules out duplication,
  /// but a crash between pop and processing loses the item (no redelivery).
  /// `Ok(None)` means nothing was available within the timeout; a transport
  /// failure comes back as `Err`.
  ///
  /// 无法解码的负载被记录并丢弃（防止毒性消息循环）；若能恢复出
  /// 标识，则尽力将状态置为 `failed`。
  /// An undecodable payload is logged and dropped (preventing poison-message
  /// loops); when the identity is recoverable the status is set to `failed`
  /// on a best-effort basis.
  pub async fn dequeue(
    &self,
    domain: &str,
    tenant_id: &str,
    action_name: &str,
    priority: Priority,
    timeout: Duration,
  ) -> Result<Option<Action>> {
    let key = QueueKey::new(domain, tenant_id, action_name, priority).to_string();
    let raw = match self.broker.pop(&key, timeout).await? {
      Some(raw) => raw,
      None => return Ok(None),
    };

    match Action::decode(&raw) {
      Ok(action) => Ok(Some(action)),
      Err(e) => {
        warn!(queue = %key, "dropping undecodable queue payload: {}", e);
        if let Some((tenant, action_id)) = Action::recover_identity(&raw) {
          let mut metadata = HashMap::new();
          metadata.insert(
            "error".to_string(),
            Value::String(format!("undecodable payload: {e}")),
          );
          if let Err(e) = self
            .set_status(&action_id, &tenant, ActionStatus::Failed, metadata)
            .await
          {
            warn!(action_id = %action_id, "failed to record poison payload status: {}", e);
          }
        }
        Ok(None)
      }
    }
  }

  /// 幂等覆写状态记录并刷新 TTL
  /// Idempotently overwrite the status record and refresh its TTL
  ///
  /// 最后写入者胜出；TTL 等于配置的任务超时时间。
  /// The last writer wins; the TTL equals the configured task timeout.
  pub async fn set_status(
    &self,
    action_id: &str,
    tenant_id: &str,
    status: ActionStatus,
    metadata: HashMap<String, Value>,
  ) -> Result<()> {
    let key = keys::status_key(tenant_id, action_id);
    let record = StatusRecord::new(status, metadata);
    let value = serde_json::to_string(&record)?;
    self
      .broker
      .set_with_ttl(&key, &value, self.config.task_timeout)
      .await
  }

  /// 读取状态记录，不存在或已过期返回 `None`
  /// Read the status record, `None` when missing or expired
  pub async fn get_status(
    &self,
    action_id: &str,
    tenant_id: &str,
  ) -> Result<Option<StatusRecord>> {
    let key = keys::status_key(tenant_id, action_id);
    match self.broker.get(&key).await? {
      Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
      None => Ok(None),
    }
  }
}
