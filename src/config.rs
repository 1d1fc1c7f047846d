//! 配置模块
//! Configuration module
//!
//! 定义了队列管理器和工作者的配置选项
//! Defines configuration options for the queue manager and the worker

use crate::action::Priority;
use crate::base::constants::{
  DEFAULT_DELIVERY_DOMAIN, DEFAULT_DEQUEUE_TIMEOUT, DEFAULT_DOMAIN, DEFAULT_ERROR_COOLDOWN,
  DEFAULT_MAX_QUEUE_DEPTH, DEFAULT_POLL_INTERVAL, DEFAULT_TASK_TIMEOUT,
  DEFAULT_TENANT_BATCH_SIZE, OUTBOUND_CALLBACK_QUEUE, STATUS_UPDATE_QUEUE,
};
use crate::error::{Error, Result};
use std::time::Duration;

/// 队列管理器配置
/// Queue manager configuration
#[derive(Debug, Clone)]
pub struct QueueConfig {
  /// 每个租户队列的最大深度，0 表示不限制
  /// Per-tenant queue depth limit, 0 disables the check
  pub max_queue_depth: usize,
  /// 任务超时时间，决定状态记录的 TTL
  /// Task timeout, drives the status record TTL
  pub task_timeout: Duration,
}

impl Default for QueueConfig {
  fn default() -> Self {
    Self {
      max_queue_depth: DEFAULT_MAX_QUEUE_DEPTH,
      task_timeout: DEFAULT_TASK_TIMEOUT,
    }
  }
}

impl QueueConfig {
  /// 创建新的队列配置
  /// Create a new queue configuration
  pub fn new() -> Self {
    Self::default()
  }

  /// 设置队列深度上限
  /// Set the queue depth limit
  pub fn max_queue_depth(mut self, depth: usize) -> Self {
    self.max_queue_depth = depth;
    self
  }

  /// 设置任务超时时间
  /// Set the task timeout
  pub fn task_timeout(mut self, timeout: Duration) -> Self {
    self.task_timeout = timeout;
    self
  }

  /// 验证配置
  /// Validate the configuration
  pub fn validate(&self) -> Result<()> {
    if self.task_timeout.is_zero() {
      return Err(Error::config("Task timeout must be greater than zero"));
    }
    Ok(())
  }
}

/// 工作者负责轮询的一条命名队列
/// A named queue the worker is responsible for polling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedQueue {
  /// 动作名（队列键的第三段）
  /// Action name (third segment of the queue key)
  pub action_name: String,
  /// 该队列的优先级通道
  /// Priority lane of this queue
  pub priority: Priority,
}

impl OwnedQueue {
  /// 创建新的命名队列
  /// Create a new named queue
  pub fn new<S: Into<String>>(action_name: S, priority: Priority) -> Self {
    Self {
      action_name: action_name.into(),
      priority,
    }
  }
}

/// 工作者配置
/// Worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
  /// 工作者所属域
  /// Domain this worker drains
  pub domain: String,
  /// 按固定顺序轮询的命名队列，排在前面的先被尝试
  /// Named queues polled in fixed order, earlier entries are attempted first
  pub owned_queues: Vec<OwnedQueue>,
  /// 出站投递动作路由到的域
  /// Domain outbound delivery actions are routed to
  pub delivery_domain: String,
  /// 迭代间休眠时间
  /// Sleep between iterations
  pub poll_interval: Duration,
  /// 单次出队的阻塞超时，通常不超过 1 秒
  /// Blocking timeout of a single dequeue, typically at most one second
  pub dequeue_timeout: Duration,
  /// 每个租户每条队列在一次迭代内的最大出队次数
  /// Maximum dequeues per tenant per queue within one iteration
  pub tenant_batch_size: usize,
  /// 迭代级错误后的冷却时间
  /// Cooldown after an iteration-level error
  pub error_cooldown: Duration,
}

impl Default for WorkerConfig {
  fn default() -> Self {
    Self {
      domain: DEFAULT_DOMAIN.to_string(),
      owned_queues: vec![
        OwnedQueue::new(OUTBOUND_CALLBACK_QUEUE, Priority::High),
        OwnedQueue::new(STATUS_UPDATE_QUEUE, Priority::Normal),
      ],
      delivery_domain: DEFAULT_DELIVERY_DOMAIN.to_string(),
      poll_interval: DEFAULT_POLL_INTERVAL,
      dequeue_timeout: DEFAULT_DEQUEUE_TIMEOUT,
      tenant_batch_size: DEFAULT_TENANT_BATCH_SIZE,
      error_cooldown: DEFAULT_ERROR_COOLDOWN,
    }
  }
}

impl WorkerConfig {
  /// 创建新的工作者配置
  /// Create a new worker configuration
  pub fn new() -> Self {
    Self::default()
  }

  /// 设置所属域
  /// Set the domain
  pub fn domain<S: Into<String>>(mut self, domain: S) -> Self {
    self.domain = domain.into();
    self
  }

  /// 设置轮询的命名队列（按给定顺序）
  /// Set the polled named queues (in the given order)
  pub fn owned_queues(mut self, queues: Vec<OwnedQueue>) -> Self {
    self.owned_queues = queues;
    self
  }

  /// 追加一条命名队列
  /// Append a named queue
  pub fn add_queue<S: Into<String>>(mut self, action_name: S, priority: Priority) -> Self {
    self.owned_queues.push(OwnedQueue::new(action_name, priority));
    self
  }

  /// 设置投递域
  /// Set the delivery domain
  pub fn delivery_domain<S: Into<String>>(mut self, domain: S) -> Self {
    self.delivery_domain = domain.into();
    self
  }

  /// 设置迭代间隔
  /// Set the poll interval
  pub fn poll_interval(mut self, interval: Duration) -> Self {
    self.poll_interval = interval;
    self
  }

  /// 设置出队超时
  /// Set the dequeue timeout
  pub fn dequeue_timeout(mut self, timeout: Duration) -> Self {
    self.dequeue_timeout = timeout;
    self
  }

  /// 设置每租户批量大小
  /// Set the per-tenant batch size
  pub fn tenant_batch_size(mut self, batch_size: usize) -> Self {
    self.tenant_batch_size = batch_size.max(1);
    self
  }

  /// 设置错误冷却时间
  /// Set the error cooldown
  pub fn error_cooldown(mut self, cooldown: Duration) -> Self {
    self.error_cooldown = cooldown;
    self
  }

  /// 验证配置
  /// Validate the configuration
  pub fn validate(&self) -> Result<()> {
    if self.domain.trim().is_empty() || self.domain.contains(':') {
      return Err(Error::config("Worker domain must be a non-empty name without ':'"));
    }
    if self.delivery_domain.trim().is_empty() || self.delivery_domain.contains(':') {
      return Err(Error::config(
        "Delivery domain must be a non-empty name without ':'",
      ));
    }
    if self.owned_queues.is_empty() {
      return Err(Error::config("At least one owned queue must be configured"));
    }
    for queue in &self.owned_queues {
      if queue.action_name.trim().is_empty() || queue.action_name.contains(':') {
        return Err(Error::config(format!(
          "Invalid owned queue name: {:?}",
          queue.action_name
        )));
      }
    }
    if self.dequeue_timeout.is_zero() {
      return Err(Error::config("Dequeue timeout must be greater than zero"));
    }
    if self.tenant_batch_size == 0 {
      return Err(Error::config("Tenant batch size must be greater than 0"));
    }
    Ok(())
  }
}
