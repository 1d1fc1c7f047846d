//! 实时投递边界模块
//! Live-delivery boundary module
//!
//! 工作者向连接管理器发出"发送给会话/租户"的请求；零个匹配的
//! 在线连接不是错误，只是尽力而为的事实。
//! The worker emits "send to session/tenant" requests towards the
//! connection manager; zero matching live connections is not an error,
//! delivery is best-effort.

use crate::action::Action;
use crate::dispatch::{ActionDispatcher, ActionHandler};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// 投递消息类别
/// Delivery message kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryKind {
  /// 最终答案
  /// Final answer
  Answer,
  /// 终态错误
  /// Terminal error
  Error,
  /// 中间进度
  /// Intermediate progress
  Progress,
}

impl DeliveryKind {
  /// 对应的出站动作动词
  /// Corresponding outbound action verb
  pub fn verb(&self) -> &'static str {
    match self {
      Self::Answer => "deliver_answer",
      Self::Error => "deliver_error",
      Self::Progress => "deliver_progress",
    }
  }
}

/// 发送给连接管理器的投递请求
/// Delivery request handed to the connection manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRequest {
  /// 目标租户
  /// Target tenant
  pub tenant_id: String,
  /// 目标会话（可选，缺省为租户内广播）
  /// Target session (optional, defaults to a tenant-wide broadcast)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub session_id: Option<String>,
  /// 消息类别
  /// Message kind
  pub message_type: DeliveryKind,
  /// 消息数据
  /// Message data
  pub message_data: Value,
}

/// 在线会话投递端口（连接管理器边界）
/// Live session delivery port (the connection-manager boundary)
#[async_trait]
pub trait SessionSink: Send + Sync {
  /// 发送请求，返回命中的在线连接数
  /// Send the request, returning the number of live connections matched
  async fn send(&self, request: &DeliveryRequest) -> Result<usize>;
}

/// 丢弃一切的投递端口
/// Delivery port that drops everything
///
/// 用于没有接入连接管理器的部署。
/// For deployments without a connection manager attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl SessionSink for NullSink {
  async fn send(&self, request: &DeliveryRequest) -> Result<usize> {
    debug!(tenant_id = %request.tenant_id, "dropping delivery, no connection manager attached");
    Ok(0)
  }
}

/// 记录收到请求的投递端口，用于测试与嵌入场景
/// Delivery port that records received requests, for tests and embedding
#[derive(Clone, Default)]
pub struct MemorySink {
  sent: Arc<Mutex<Vec<DeliveryRequest>>>,
}

impl MemorySink {
  /// 创建新的记录端口
  /// Create a new recording sink
  pub fn new() -> Self {
    Self::default()
  }

  /// 已记录的请求快照
  /// Snapshot of the recorded requests
  pub fn sent(&self) -> Vec<DeliveryRequest> {
    self.sent.lock().expect("sink lock poisoned").clone()
  }
}

#[async_trait]
impl SessionSink for MemorySink {
  async fn send(&self, request: &DeliveryRequest) -> Result<usize> {
    self
      .sent
      .lock()
      .expect("sink lock poisoned")
      .push(request.clone());
    Ok(1)
  }
}

/// 把投递端口适配成动作处理器
/// Adapts a delivery port into an action handler
pub struct SessionDeliveryHandler {
  sink: Arc<dyn SessionSink>,
}

impl SessionDeliveryHandler {
  /// 创建新的投递处理器
  /// Create a new delivery handler
  pub fn new(sink: Arc<dyn SessionSink>) -> Self {
    Self { sink }
  }
}

#[async_trait]
impl ActionHandler for SessionDeliveryHandler {
  async fn handle(&self, action: Action) -> Result<Value> {
    let request: DeliveryRequest = serde_json::from_value(action.payload)?;
    let delivered = self.sink.send(&request).await?;
    if delivered == 0 {
      // 尽力而为：没有在线连接只记录，不算失败
      // Best-effort: no live connection is only logged, not a failure
      debug!(tenant_id = %request.tenant_id, "no live sessions matched the delivery");
    }
    Ok(json!({ "delivered": delivered }))
  }
}

/// 为三种投递动词注册同一个端口
/// Register one sink for all three delivery verbs
pub fn register_delivery_handlers(
  dispatcher: &mut ActionDispatcher,
  domain: &str,
  sink: Arc<dyn SessionSink>,
) {
  for kind in [DeliveryKind::Answer, DeliveryKind::Error, DeliveryKind::Progress] {
    dispatcher.register_arc(
      domain,
      kind.verb(),
      Arc::new(SessionDeliveryHandler::new(Arc::clone(&sink))),
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_delivery_handler_forwards_to_sink() {
    let sink = MemorySink::new();
    let mut dispatcher = ActionDispatcher::new();
    register_delivery_handlers(&mut dispatcher, "gateway", Arc::new(sink.clone()));
    assert!(dispatcher.contains("gateway", "deliver_answer"));
    assert!(dispatcher.contains("gateway", "deliver_error"));
    assert!(dispatcher.contains("gateway", "deliver_progress"));

    let request = DeliveryRequest {
      tenant_id: "t1".to_string(),
      session_id: Some("s1".to_string()),
      message_type: DeliveryKind::Answer,
      message_data: json!({"response": "hi"}),
    };
    let action = Action::new("gateway.deliver_answer", "t1")
      .unwrap()
      .with_payload(serde_json::to_value(&request).unwrap());

    let result = dispatcher.dispatch(action).await;
    assert!(result.success);
    assert_eq!(result.result, Some(json!({"delivered": 1})));
    assert_eq!(sink.sent(), vec![request]);
  }

  #[tokio::test]
  async fn test_zero_live_connections_is_not_an_error() {
    let mut dispatcher = ActionDispatcher::new();
    register_delivery_handlers(&mut dispatcher, "gateway", Arc::new(NullSink));

    let request = DeliveryRequest {
      tenant_id: "t1".to_string(),
      session_id: None,
      message_type: DeliveryKind::Progress,
      message_data: json!({"status": "processing"}),
    };
    let action = Action::new("gateway.deliver_progress", "t1")
      .unwrap()
      .with_payload(serde_json::to_value(&request).unwrap());

    let result = dispatcher.dispatch(action).await;
    assert!(result.success);
    assert_eq!(result.result, Some(json!({"delivered": 0})));
  }

  #[tokio::test]
  async fn test_malformed_delivery_payload_fails_cleanly() {
    let mut dispatcher = ActionDispatcher::new();
    register_delivery_handlers(&mut dispatcher, "gateway", Arc::new(NullSink));

    let action = Action::new("gateway.deliver_answer", "t1")
      .unwrap()
      .with_payload(json!("not a delivery request"));
    let result = dispatcher.dispatch(action).await;
    assert!(!result.success);
    assert_eq!(result.error.unwrap().error_type, "handler_error");
  }

  #[test]
  fn test_delivery_kind_verbs() {
    assert_eq!(DeliveryKind::Answer.verb(), "deliver_answer");
    assert_eq!(DeliveryKind::Error.verb(), "deliver_error");
    assert_eq!(DeliveryKind::Progress.verb(), "deliver_progress");
  }

  #[test]
  fn test_delivery_request_wire_shape() {
    let request = DeliveryRequest {
      tenant_id: "t1".to_string(),
      session_id: None,
      message_type: DeliveryKind::Error,
      message_data: json!({"error": {"error_type": "execution_error", "message": "boom"}}),
    };
    let value = serde_json::to_value(&request).unwrap();
    assert_eq!(value["message_type"], "error");
    assert!(value.get("session_id").is_none());
  }
}
