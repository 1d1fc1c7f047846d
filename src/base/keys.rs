//! 存储键名方案
//! Store key naming scheme
//!
//! 队列键: `<domain>:<tenant_id>:<action_name>:<priority>`
//! 状态键: `<tenant_id>:<action_id>`
//! Queue key: `<domain>:<tenant_id>:<action_name>:<priority>`
//! Status key: `<tenant_id>:<action_id>`

use crate::action::Priority;
use std::fmt;

/// 组合队列键 - 每个 (域, 租户, 动作, 优先级) 一条独立列表
/// Composite queue key - one independent list per (domain, tenant, action, priority)
///
/// 队列从不跨租户共享；公平性来自按租户迭代，而不是合并条目。
/// A queue is never shared across tenants; fairness comes from iterating
/// tenants, not from merging their items.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueKey {
  pub domain: String,
  pub tenant_id: String,
  pub action_name: String,
  pub priority: Priority,
}

impl QueueKey {
  /// 创建新的队列键
  /// Create a new queue key
  pub fn new<D, T, A>(domain: D, tenant_id: T, action_name: A, priority: Priority) -> Self
  where
    D: Into<String>,
    T: Into<String>,
    A: Into<String>,
  {
    Self {
      domain: domain.into(),
      tenant_id: tenant_id.into(),
      action_name: action_name.into(),
      priority,
    }
  }
}

impl fmt::Display for QueueKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}:{}:{}:{}",
      self.domain, self.tenant_id, self.action_name, self.priority
    )
  }
}

/// 生成状态键
/// Generate a status key
pub fn status_key(tenant_id: &str, action_id: &str) -> String {
  format!("{tenant_id}:{action_id}")
}

/// 生成域前缀，用于租户发现的游标扫描
/// Generate a domain prefix, used by the tenant discovery cursor scan
pub fn domain_prefix(domain: &str) -> String {
  format!("{domain}:")
}

/// 从队列键中提取租户段
/// Extract the tenant segment from a queue key
///
/// 只接受完整的四段键，避免把状态键误认成队列键。
/// Only accepts a full four-segment key, so a status key is never
/// mistaken for a queue key.
pub fn tenant_segment(key: &str) -> Option<&str> {
  let mut parts = key.split(':');
  let domain = parts.next()?;
  let tenant = parts.next()?;
  let action = parts.next()?;
  let priority = parts.next()?;
  if parts.next().is_some() {
    return None;
  }
  if domain.is_empty() || tenant.is_empty() || action.is_empty() {
    return None;
  }
  priority.parse::<Priority>().ok()?;
  Some(tenant)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_queue_key_format() {
    let key = QueueKey::new("orchestrator", "t1", "websocket_send", Priority::High);
    assert_eq!(key.to_string(), "orchestrator:t1:websocket_send:high");

    let key = QueueKey::new("executor", "acme", "status_update", Priority::Normal);
    assert_eq!(key.to_string(), "executor:acme:status_update:normal");
  }

  #[test]
  fn test_status_key_format() {
    assert_eq!(status_key("t1", "a1"), "t1:a1");
  }

  #[test]
  fn test_domain_prefix() {
    assert_eq!(domain_prefix("orchestrator"), "orchestrator:");
  }

  #[test]
  fn test_tenant_segment() {
    assert_eq!(
      tenant_segment("orchestrator:t1:websocket_send:high"),
      Some("t1")
    );
    assert_eq!(tenant_segment("executor:acme:run:low"), Some("acme"));

    // 状态键与残缺键不会被识别为队列键
    // Status keys and malformed keys are not recognized as queue keys
    assert_eq!(tenant_segment("t1:a1"), None);
    assert_eq!(tenant_segment("orchestrator:t1:websocket_send"), None);
    assert_eq!(tenant_segment("orchestrator:t1:send:urgent"), None);
    assert_eq!(tenant_segment("orchestrator::send:high"), None);
    assert_eq!(tenant_segment("a:b:c:high:extra"), None);
  }
}
