//! 动作模块
//! Action module
//!
//! 定义了动作信封、执行结果和状态相关的数据结构
//! Defines the action envelope, execution result and status data structures

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

/// 动作优先级
/// Action priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  /// 低优先级
  /// Low priority
  Low,
  /// 普通优先级
  /// Normal priority
  #[default]
  Normal,
  /// 高优先级
  /// High priority
  High,
}

impl Priority {
  /// 将优先级转换为字符串
  /// Convert priority to string
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Low => "low",
      Self::Normal => "normal",
      Self::High => "high",
    }
  }
}

impl FromStr for Priority {
  type Err = ();

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    match s {
      "low" => Ok(Self::Low),
      "normal" => Ok(Self::Normal),
      "high" => Ok(Self::High),
      _ => Err(()),
    }
  }
}

impl std::fmt::Display for Priority {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// 动作状态
/// Action status
///
/// 状态记录在每次转换时整体覆写（从不追加），最后写入者胜出。
/// The status record is overwritten as a whole on each transition (never
/// appended); the last writer wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
  /// 已入队，等待工作者取出
  /// Enqueued, waiting for a worker
  Queued,
  /// 已被工作者取出，正在处理
  /// Popped by a worker, being processed
  Processing,
  /// 处理成功
  /// Processed successfully
  Completed,
  /// 处理失败
  /// Processing failed
  Failed,
  /// 超出逻辑截止时间
  /// Exceeded the logical deadline
  Timeout,
  /// 已被取消
  /// Cancelled
  Cancelled,
}

impl ActionStatus {
  /// 将状态转换为字符串
  /// Convert status to string
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Queued => "queued",
      Self::Processing => "processing",
      Self::Completed => "completed",
      Self::Failed => "failed",
      Self::Timeout => "timeout",
      Self::Cancelled => "cancelled",
    }
  }

  /// 是否为终态
  /// Whether this is a terminal status
  pub fn is_terminal(&self) -> bool {
    !matches!(self, Self::Queued | Self::Processing)
  }
}

impl FromStr for ActionStatus {
  type Err = ();

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    match s {
      "queued" => Ok(Self::Queued),
      "processing" => Ok(Self::Processing),
      "completed" => Ok(Self::Completed),
      "failed" => Ok(Self::Failed),
      "timeout" => Ok(Self::Timeout),
      "cancelled" => Ok(Self::Cancelled),
      _ => Err(()),
    }
  }
}

impl std::fmt::Display for ActionStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// 表示一个待分发工作单元的动作信封
/// Action envelope representing a unit of work to be distributed
///
/// `action_id` 在 enqueue → dequeue → 状态更新 → 结果 全程保持稳定。
/// `action_id` is stable across enqueue → dequeue → status update → result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
  /// 全局唯一的动作标识
  /// Globally unique action id
  pub action_id: String,
  /// 动作类型，形如 `domain.verb`
  /// Action type, shaped like `domain.verb`
  pub action_type: String,
  /// 所属租户
  /// Owning tenant
  pub tenant_id: String,
  /// 发起用户（可选）
  /// Originating user (optional)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user_id: Option<String>,
  /// 创建时间
  /// Creation time
  pub created_at: DateTime<Utc>,
  /// 优先级
  /// Priority
  #[serde(default)]
  pub priority: Priority,
  /// 开放元数据
  /// Open metadata map
  #[serde(default)]
  pub metadata: HashMap<String, Value>,
  /// 负载数据
  /// Payload data
  #[serde(default)]
  pub payload: Value,
}

impl Action {
  /// 创建新动作，生成稳定的 UUID 标识
  /// Create a new action with a stable UUID id
  pub fn new<T: AsRef<str>, N: AsRef<str>>(action_type: T, tenant_id: N) -> Result<Self> {
    let action_type = action_type.as_ref();
    match action_type.split_once('.') {
      Some((domain, verb)) if !domain.is_empty() && !verb.is_empty() => {}
      _ => {
        return Err(Error::InvalidActionType {
          action_type: action_type.to_string(),
        });
      }
    }
    let tenant_id = tenant_id.as_ref();
    if tenant_id.trim().is_empty() || tenant_id.contains(':') {
      return Err(Error::InvalidTenantId {
        tenant_id: tenant_id.to_string(),
      });
    }

    Ok(Self {
      action_id: Uuid::new_v4().to_string(),
      action_type: action_type.to_string(),
      tenant_id: tenant_id.to_string(),
      user_id: None,
      created_at: Utc::now(),
      priority: Priority::default(),
      metadata: HashMap::new(),
      payload: Value::Null,
    })
  }

  /// 覆盖自动生成的动作标识
  /// Override the generated action id
  pub fn with_action_id<S: Into<String>>(mut self, action_id: S) -> Self {
    self.action_id = action_id.into();
    self
  }

  /// 设置优先级
  /// Set the priority
  pub fn with_priority(mut self, priority: Priority) -> Self {
    self.priority = priority;
    self
  }

  /// 设置发起用户
  /// Set the originating user
  pub fn with_user<S: Into<String>>(mut self, user_id: S) -> Self {
    self.user_id = Some(user_id.into());
    self
  }

  /// 设置负载数据
  /// Set the payload
  pub fn with_payload(mut self, payload: Value) -> Self {
    self.payload = payload;
    self
  }

  /// 设置整个元数据表
  /// Set the whole metadata map
  pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
    self.metadata = metadata;
    self
  }

  /// 插入一条元数据
  /// Insert a single metadata entry
  pub fn with_metadata_entry<S: Into<String>>(mut self, key: S, value: Value) -> Self {
    self.metadata.insert(key.into(), value);
    self
  }

  /// 动作类型的域段
  /// Domain segment of the action type
  pub fn domain(&self) -> &str {
    self
      .action_type
      .split_once('.')
      .map(|(domain, _)| domain)
      .unwrap_or(&self.action_type)
  }

  /// 动作类型的动词段，即队列键中的动作名
  /// Verb segment of the action type, the action name used in queue keys
  pub fn name(&self) -> &str {
    self
      .action_type
      .split_once('.')
      .map(|(_, verb)| verb)
      .unwrap_or(&self.action_type)
  }

  /// 编码为队列负载
  /// Encode into a queue payload
  pub fn encode(&self) -> Result<String> {
    Ok(serde_json::to_string(self)?)
  }

  /// 从队列负载解码
  /// Decode from a queue payload
  pub fn decode(raw: &str) -> Result<Self> {
    Ok(serde_json::from_str(raw)?)
  }

  /// 从无法完整解码的负载里尽力恢复 (tenant_id, action_id)
  /// Best-effort recovery of (tenant_id, action_id) from an undecodable payload
  ///
  /// 用于毒性消息处理：即使信封损坏，也尽量把失败写进状态记录。
  /// Used for poison-message handling: even with a corrupt envelope, try to
  /// record the failure in the status store.
  pub fn recover_identity(raw: &str) -> Option<(String, String)> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let tenant_id = value.get("tenant_id")?.as_str()?.to_string();
    let action_id = value.get("action_id")?.as_str()?.to_string();
    Some((tenant_id, action_id))
  }
}

/// 标准化的错误描述
/// Normalized error description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionError {
  /// 错误类别
  /// Error category
  pub error_type: String,
  /// 错误信息
  /// Error message
  pub message: String,
}

impl ActionError {
  /// 创建新的错误描述
  /// Create a new error description
  pub fn new<T: Into<String>, M: Into<String>>(error_type: T, message: M) -> Self {
    Self {
      error_type: error_type.into(),
      message: message.into(),
    }
  }
}

/// 统一的动作执行结果
/// Uniform action execution result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
  /// 对应动作的标识
  /// Id of the corresponding action
  pub action_id: String,
  /// 是否成功
  /// Whether the execution succeeded
  pub success: bool,
  /// 成功时的结果数据
  /// Result data on success
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub result: Option<Value>,
  /// 失败时的错误描述
  /// Error description on failure
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<ActionError>,
  /// 执行耗时（秒）
  /// Execution time in seconds
  pub execution_time: f64,
  /// 开放元数据
  /// Open metadata map
  #[serde(default)]
  pub metadata: HashMap<String, Value>,
}

impl ActionResult {
  /// 创建成功结果
  /// Create a success result
  pub fn ok<S: Into<String>>(action_id: S, result: Value, execution_time: f64) -> Self {
    Self {
      action_id: action_id.into(),
      success: true,
      result: Some(result),
      error: None,
      execution_time,
      metadata: HashMap::new(),
    }
  }

  /// 创建失败结果
  /// Create a failure result
  pub fn failed<S: Into<String>>(action_id: S, error: ActionError, execution_time: f64) -> Self {
    Self {
      action_id: action_id.into(),
      success: false,
      result: None,
      error: Some(error),
      execution_time,
      metadata: HashMap::new(),
    }
  }
}

/// 状态记录，按 `<tenant_id>:<action_id>` 键存储，带 TTL
/// Status record, stored under `<tenant_id>:<action_id>` with a TTL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
  /// 当前状态
  /// Current status
  pub status: ActionStatus,
  /// 开放元数据
  /// Open metadata map
  #[serde(default)]
  pub metadata: HashMap<String, Value>,
  /// 最后一次覆写时间
  /// Time of the last overwrite
  pub updated_at: DateTime<Utc>,
}

impl StatusRecord {
  /// 以当前时间创建状态记录
  /// Create a status record stamped with the current time
  pub fn new(status: ActionStatus, metadata: HashMap<String, Value>) -> Self {
    Self {
      status,
      metadata,
      updated_at: Utc::now(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_action_creation() {
    let action = Action::new("orchestrator.websocket_send", "t1").unwrap();
    assert_eq!(action.domain(), "orchestrator");
    assert_eq!(action.name(), "websocket_send");
    assert_eq!(action.tenant_id, "t1");
    assert_eq!(action.priority, Priority::Normal);
    assert!(!action.action_id.is_empty());
  }

  #[test]
  fn test_action_rejects_invalid_type() {
    assert!(matches!(
      Action::new("no_dot", "t1"),
      Err(Error::InvalidActionType { .. })
    ));
    assert!(matches!(
      Action::new(".verb", "t1"),
      Err(Error::InvalidActionType { .. })
    ));
    assert!(matches!(
      Action::new("domain.", "t1"),
      Err(Error::InvalidActionType { .. })
    ));
  }

  #[test]
  fn test_action_rejects_invalid_tenant() {
    assert!(matches!(
      Action::new("a.b", ""),
      Err(Error::InvalidTenantId { .. })
    ));
    assert!(matches!(
      Action::new("a.b", "bad:tenant"),
      Err(Error::InvalidTenantId { .. })
    ));
  }

  #[test]
  fn test_action_roundtrip_keeps_id() {
    let action = Action::new("orchestrator.websocket_send", "t1")
      .unwrap()
      .with_priority(Priority::High)
      .with_user("u1")
      .with_payload(json!({"status": "completed", "response": "hi"}))
      .with_metadata_entry("session_id", json!("s1"));

    let raw = action.encode().unwrap();
    let decoded = Action::decode(&raw).unwrap();
    assert_eq!(decoded, action);
    assert_eq!(decoded.action_id, action.action_id);
  }

  #[test]
  fn test_recover_identity() {
    // 信封损坏（缺少必填字段），但标识仍可恢复
    // Corrupt envelope (missing required fields), identity still recoverable
    let raw = r#"{"action_id":"a9","tenant_id":"t9","payload":12}"#;
    assert!(Action::decode(raw).is_err());
    assert_eq!(
      Action::recover_identity(raw),
      Some(("t9".to_string(), "a9".to_string()))
    );

    assert_eq!(Action::recover_identity("not json"), None);
    assert_eq!(Action::recover_identity(r#"{"action_id":"a"}"#), None);
  }

  #[test]
  fn test_priority_conversions() {
    assert_eq!(Priority::High.as_str(), "high");
    assert_eq!("low".parse::<Priority>(), Ok(Priority::Low));
    assert!("urgent".parse::<Priority>().is_err());
    assert_eq!(Priority::default(), Priority::Normal);
  }

  #[test]
  fn test_status_conversions() {
    assert_eq!(ActionStatus::Completed.as_str(), "completed");
    assert_eq!("timeout".parse::<ActionStatus>(), Ok(ActionStatus::Timeout));
    assert!("done".parse::<ActionStatus>().is_err());
    assert!(ActionStatus::Failed.is_terminal());
    assert!(!ActionStatus::Processing.is_terminal());
  }

  #[test]
  fn test_status_record_serde_shape() {
    let record = StatusRecord::new(ActionStatus::Queued, HashMap::new());
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["status"], "queued");
    assert!(value.get("updated_at").is_some());
  }
}
