use std::time::Duration;

/// 默认工作者所属域
/// Default worker domain
pub const DEFAULT_DOMAIN: &str = "orchestrator";

/// 默认投递域（出站动作被路由到这里）
/// Default delivery domain (outbound actions are routed here)
pub const DEFAULT_DELIVERY_DOMAIN: &str = "gateway";

/// 出站回调队列名（高优先级）
/// Outbound callback queue name (high priority)
pub const OUTBOUND_CALLBACK_QUEUE: &str = "websocket_send";

/// 状态更新队列名（普通优先级）
/// Status update queue name (normal priority)
pub const STATUS_UPDATE_QUEUE: &str = "status_update";

/// 默认任务超时时间，决定状态记录的 TTL
/// Default task timeout, drives the status record TTL
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(300);

/// 默认迭代间隔
/// Default poll interval between iterations
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// 默认出队超时时间
/// Default bounded dequeue timeout
pub const DEFAULT_DEQUEUE_TIMEOUT: Duration = Duration::from_millis(500);

/// 每个租户每条队列在一次迭代内的最大出队次数
/// Maximum dequeue attempts per tenant per queue within one iteration
pub const DEFAULT_TENANT_BATCH_SIZE: usize = 10;

/// 每个租户队列的默认最大深度，0 表示不限制
/// Default per-tenant queue depth limit, 0 disables the check
pub const DEFAULT_MAX_QUEUE_DEPTH: usize = 1000;

/// 迭代级错误后的冷却时间
/// Cooldown after an iteration-level error
pub const DEFAULT_ERROR_COOLDOWN: Duration = Duration::from_secs(1);

/// 版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_constants() {
    assert_eq!(DEFAULT_DOMAIN, "orchestrator");
    assert_eq!(DEFAULT_TASK_TIMEOUT, Duration::from_secs(300));
    assert!(DEFAULT_DEQUEUE_TIMEOUT <= Duration::from_secs(1));
  }
}
