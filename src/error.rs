//! 错误处理模块
//! Error handling module
//!
//! 定义了 Actionq 库中使用的各种错误类型
//! Defines various error types used in the Actionq library

use thiserror::Error;

/// Actionq 库的结果类型
/// Result type for the Actionq library
pub type Result<T> = std::result::Result<T, Error>;

/// Actionq 错误类型
/// Actionq error type
#[derive(Error, Debug)]
pub enum Error {
  /// Redis connection error
  #[error("Redis connection error: {0}")]
  Redis(#[from] redis::RedisError),

  /// 序列化错误
  /// Serialization error
  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// 队列错误
  /// Queue error
  #[error("Queue error: {message}")]
  Queue { message: String },

  /// 队列已达到租户深度上限
  /// Queue reached the per-tenant depth limit
  #[error("Queue is full: {queue}")]
  QueueFull { queue: String },

  /// 无效的动作类型（必须是 `domain.verb`）
  /// Invalid action type (must be `domain.verb`)
  #[error("Invalid action type: {action_type}")]
  InvalidActionType { action_type: String },

  /// 无效的租户标识
  /// Invalid tenant id
  #[error("Invalid tenant id: {tenant_id:?}")]
  InvalidTenantId { tenant_id: String },

  /// 没有注册对应的处理器
  /// No handler registered for the action
  #[error("No handler registered for {domain}.{action}")]
  HandlerNotFound { domain: String, action: String },

  /// 工作者已在运行
  /// Worker is already running
  #[error("Worker is already running")]
  WorkerRunning,

  /// 配置错误
  /// Configuration error
  #[error("Configuration error: {message}")]
  Config { message: String },

  /// IO 错误
  /// IO error
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  /// 其他错误
  /// Other error
  #[error("Other error: {message}")]
  Other { message: String },
}

impl Error {
  /// 创建队列错误
  /// Create a queue error
  pub fn queue<S: Into<String>>(message: S) -> Self {
    Self::Queue {
      message: message.into(),
    }
  }

  /// 创建配置错误
  /// Create a configuration error
  pub fn config<S: Into<String>>(message: S) -> Self {
    Self::Config {
      message: message.into(),
    }
  }

  /// 创建其他错误
  /// Create another type of error
  pub fn other<S: Into<String>>(message: S) -> Self {
    Self::Other {
      message: message.into(),
    }
  }

  /// 判断是否为传输层故障（存储不可达等），区别于"队列为空"
  /// Whether this is a transport failure (store unreachable etc.), as opposed to "queue empty"
  pub fn is_transport(&self) -> bool {
    matches!(self, Error::Redis(_) | Error::Io(_))
  }
}
