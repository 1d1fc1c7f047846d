//! 租户发现模块
//! Tenant discovery module
//!
//! 对存储键空间做非阻塞扫描，找出队列非空的租户。
//! A non-blocking scan over the store keyspace to find tenants with
//! non-empty queues.

use crate::base::keys;
use crate::base::Broker;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// 租户发现
/// Tenant discovery
///
/// 一个租户只要其命名空间下存在任何队列键就算活跃，即便在随后的
/// 出队之前瞬时为空 —— 出队自身的超时会无害地吸收这个竞态。
/// A tenant counts as active the instant any queue key under its namespace
/// exists, even if momentarily empty before the subsequent dequeue — the
/// dequeue's own timeout absorbs this race harmlessly.
pub struct TenantDiscovery {
  broker: Arc<dyn Broker>,
  domain: String,
}

impl TenantDiscovery {
  /// 创建新的租户发现实例
  /// Create a new tenant discovery instance
  pub fn new<S: Into<String>>(broker: Arc<dyn Broker>, domain: S) -> Self {
    Self {
      broker,
      domain: domain.into(),
    }
  }

  /// 所属域
  /// The domain being scanned
  pub fn domain(&self) -> &str {
    &self.domain
  }

  /// 返回当前有队列键的租户集合
  /// Return the set of tenants that currently have queue keys
  ///
  /// 游标驱动、只匹配域前缀，绝不做完整列举。扫描失败返回空集而
  /// 不是抛出 —— 工作者退化为空转，而不是崩溃。
  /// Cursor-driven and matched on the domain prefix only, never a full
  /// listing. A scan failure yields the empty set instead of raising — the
  /// worker degrades to idling, not crashing.
  pub async fn active_tenants(&self) -> HashSet<String> {
    let prefix = keys::domain_prefix(&self.domain);
    match self.broker.scan_keys(&prefix).await {
      Ok(matched) => matched
        .iter()
        .filter_map(|key| keys::tenant_segment(key))
        .map(str::to_string)
        .collect(),
      Err(e) => {
        warn!(domain = %self.domain, "tenant scan failed, treating as no active tenants: {}", e);
        HashSet::new()
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::action::Priority;
  use crate::base::keys::QueueKey;
  use crate::memdb::MemoryBroker;
  use std::time::Duration;

  #[tokio::test]
  async fn test_active_tenants_exact() {
    let broker = Arc::new(MemoryBroker::new());
    let discovery = TenantDiscovery::new(broker.clone(), "orchestrator");

    assert!(discovery.active_tenants().await.is_empty());

    let t1 = QueueKey::new("orchestrator", "t1", "websocket_send", Priority::High).to_string();
    let t2 = QueueKey::new("orchestrator", "t2", "status_update", Priority::Normal).to_string();
    let other = QueueKey::new("executor", "t3", "run", Priority::Low).to_string();
    broker.push(&t1, "{}").await.unwrap();
    broker.push(&t2, "{}").await.unwrap();
    broker.push(&other, "{}").await.unwrap();

    let tenants = discovery.active_tenants().await;
    assert_eq!(tenants.len(), 2);
    assert!(tenants.contains("t1"));
    assert!(tenants.contains("t2"));
    // 其他域的租户不可见
    // Tenants of another domain are not visible
    assert!(!tenants.contains("t3"));
  }

  #[tokio::test]
  async fn test_drained_tenant_disappears() {
    let broker = Arc::new(MemoryBroker::new());
    let discovery = TenantDiscovery::new(broker.clone(), "orchestrator");

    let key = QueueKey::new("orchestrator", "t1", "websocket_send", Priority::High).to_string();
    broker.push(&key, "{}").await.unwrap();
    assert!(discovery.active_tenants().await.contains("t1"));

    broker.pop(&key, Duration::from_millis(10)).await.unwrap();
    assert!(discovery.active_tenants().await.is_empty());
  }

  #[tokio::test]
  async fn test_status_keys_are_not_tenants() {
    let broker = Arc::new(MemoryBroker::new());
    let discovery = TenantDiscovery::new(broker.clone(), "orchestrator");

    // 一个以域名开头的状态键不会被当成队列键
    // A status key that happens to start with the domain is not a queue key
    broker.push("orchestrator:a1", "{}").await.unwrap();
    assert!(discovery.active_tenants().await.is_empty());
  }
}
