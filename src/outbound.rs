//! 结果到出站动作的转换模块
//! Result-to-outbound-action translation module
//!
//! 对执行结果状态的全函数：`completed` → 投递答案，`failed`/`timeout`
//! → 投递错误，其余一切（包括未识别的字符串）→ 投递进度。
//! 全性很重要：等在实时连接上的客户端绝不能没有终态信号。
//! A total function over the execution-result status: `completed` →
//! deliver answer, `failed`/`timeout` → deliver error, anything else
//! (including unrecognized strings) → deliver progress. Totality matters: a
//! client waiting on a live connection must never be left without a signal.

use crate::action::{Action, ActionError};
use crate::delivery::{DeliveryKind, DeliveryRequest};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

const FALLBACK_ERROR_MESSAGE: &str = "action failed without error details";

/// 从已出队动作的负载构造投递请求
/// Build the delivery request from a dequeued action's payload
///
/// 动作负载携带上游的执行结果；其中的 `status` 字段驱动转换。
/// The action payload carries the upstream execution result; its `status`
/// field drives the translation.
pub fn delivery_request(action: &Action) -> DeliveryRequest {
  let status = action
    .payload
    .get("status")
    .and_then(Value::as_str)
    .unwrap_or_default();

  let (message_type, message_data) = match status {
    "completed" => (DeliveryKind::Answer, answer_data(&action.payload)),
    "failed" | "timeout" => (DeliveryKind::Error, error_data(&action.payload, status)),
    _ => (DeliveryKind::Progress, action.payload.clone()),
  };

  DeliveryRequest {
    tenant_id: action.tenant_id.clone(),
    session_id: action
      .metadata
      .get("session_id")
      .and_then(Value::as_str)
      .map(str::to_string),
    message_type,
    message_data,
  }
}

/// 将已出队的动作转换为出站投递动作
/// Translate a dequeued action into an outbound delivery action
///
/// 出站动作是新的工作单元（新的 `action_id`）；来源动作通过
/// `source_action_id` 元数据关联。
/// The outbound action is a new unit of work (fresh `action_id`); the source
/// action is linked via the `source_action_id` metadata entry.
pub fn outbound_action(action: &Action, delivery_domain: &str) -> Action {
  let request = delivery_request(action);
  let verb = request.message_type.verb();

  let mut metadata = HashMap::new();
  metadata.insert(
    "source_action_id".to_string(),
    Value::String(action.action_id.clone()),
  );

  Action {
    action_id: Uuid::new_v4().to_string(),
    action_type: format!("{delivery_domain}.{verb}"),
    tenant_id: action.tenant_id.clone(),
    user_id: action.user_id.clone(),
    created_at: Utc::now(),
    priority: action.priority,
    metadata,
    payload: serde_json::to_value(&request).unwrap_or(Value::Null),
  }
}

/// 答案数据：负载去掉 `status` 后的其余字段
/// Answer data: the payload fields with `status` removed
fn answer_data(payload: &Value) -> Value {
  match payload {
    Value::Object(map) => {
      let mut map = map.clone();
      map.remove("status");
      Value::Object(map)
    }
    other => json!({ "response": other.clone() }),
  }
}

/// 错误数据：标准化为 `{error_type, message}`
/// Error data: normalized into `{error_type, message}`
fn error_data(payload: &Value, status: &str) -> Value {
  let default_type = if status == "timeout" {
    "timeout"
  } else {
    "execution_error"
  };

  let normalized = match payload.get("error") {
    Some(Value::Object(map)) => ActionError::new(
      map
        .get("error_type")
        .or_else(|| map.get("type"))
        .and_then(Value::as_str)
        .unwrap_or(default_type),
      map
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(FALLBACK_ERROR_MESSAGE),
    ),
    Some(Value::String(message)) => ActionError::new(default_type, message.clone()),
    _ => ActionError::new(
      default_type,
      payload
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(FALLBACK_ERROR_MESSAGE),
    ),
  };

  json!({ "error": normalized })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::action::Priority;

  fn action_with_status(payload: Value) -> Action {
    Action::new("orchestrator.websocket_send", "t1")
      .unwrap()
      .with_payload(payload)
  }

  #[test]
  fn test_completed_becomes_answer() {
    let action = action_with_status(json!({
      "status": "completed",
      "response": "hi",
      "sources": ["doc-1"],
    }))
    .with_metadata_entry("session_id", json!("s1"));

    let request = delivery_request(&action);
    assert_eq!(request.message_type, DeliveryKind::Answer);
    assert_eq!(request.tenant_id, "t1");
    assert_eq!(request.session_id.as_deref(), Some("s1"));
    assert_eq!(request.message_data["response"], "hi");
    assert_eq!(request.message_data["sources"], json!(["doc-1"]));
    assert!(request.message_data.get("status").is_none());
  }

  #[test]
  fn test_failed_and_timeout_become_error() {
    let failed = action_with_status(json!({
      "status": "failed",
      "error": {"error_type": "llm_error", "message": "model unavailable"},
    }));
    let request = delivery_request(&failed);
    assert_eq!(request.message_type, DeliveryKind::Error);
    assert_eq!(request.message_data["error"]["error_type"], "llm_error");
    assert_eq!(request.message_data["error"]["message"], "model unavailable");

    let timeout = action_with_status(json!({"status": "timeout"}));
    let request = delivery_request(&timeout);
    assert_eq!(request.message_type, DeliveryKind::Error);
    assert_eq!(request.message_data["error"]["error_type"], "timeout");
    assert_eq!(
      request.message_data["error"]["message"],
      FALLBACK_ERROR_MESSAGE
    );
  }

  #[test]
  fn test_error_normalization_variants() {
    let string_error = action_with_status(json!({"status": "failed", "error": "boom"}));
    let request = delivery_request(&string_error);
    assert_eq!(request.message_data["error"]["error_type"], "execution_error");
    assert_eq!(request.message_data["error"]["message"], "boom");

    let bare_message = action_with_status(json!({"status": "failed", "message": "went wrong"}));
    let request = delivery_request(&bare_message);
    assert_eq!(request.message_data["error"]["message"], "went wrong");

    let legacy_type = action_with_status(json!({
      "status": "failed",
      "error": {"type": "parse_error", "message": "bad input"},
    }));
    let request = delivery_request(&legacy_type);
    assert_eq!(request.message_data["error"]["error_type"], "parse_error");
  }

  #[test]
  fn test_translation_is_total() {
    // 每个状态值都要产生一个出站动作，包括未识别的字符串
    // Every status value must yield an outbound action, including
    // unrecognized strings
    let statuses = [
      json!({"status": "completed"}),
      json!({"status": "failed"}),
      json!({"status": "timeout"}),
      json!({"status": "processing", "progress": 40}),
      json!({"status": "retrieving_documents"}),
      json!({"status": ""}),
      json!({"status": 42}),
      json!({"no_status": true}),
      json!("bare string payload"),
      Value::Null,
    ];

    for payload in statuses {
      let action = action_with_status(payload);
      let outbound = outbound_action(&action, "gateway");
      assert_eq!(outbound.domain(), "gateway");
      assert!(outbound.name().starts_with("deliver_"));
      assert_eq!(outbound.tenant_id, "t1");
    }
  }

  #[test]
  fn test_unknown_status_passes_raw_fields_through() {
    let action = action_with_status(json!({"status": "searching", "progress": 70}));
    let request = delivery_request(&action);
    assert_eq!(request.message_type, DeliveryKind::Progress);
    assert_eq!(request.message_data["status"], "searching");
    assert_eq!(request.message_data["progress"], 70);
  }

  #[test]
  fn test_outbound_action_links_source() {
    let action = action_with_status(json!({"status": "completed", "response": "hi"}))
      .with_priority(Priority::High);
    let outbound = outbound_action(&action, "gateway");

    assert_ne!(outbound.action_id, action.action_id);
    assert_eq!(
      outbound.metadata["source_action_id"],
      json!(action.action_id)
    );
    assert_eq!(outbound.priority, Priority::High);
    assert_eq!(outbound.action_type, "gateway.deliver_answer");

    let request: DeliveryRequest = serde_json::from_value(outbound.payload).unwrap();
    assert_eq!(request.message_data["response"], "hi");
  }
}
