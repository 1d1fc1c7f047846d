//! 动作分发器模块
//! Action dispatcher module
//!
//! 按 (域, 动作名) 将动作路由到处理器，处理器返回统一的执行结果。
//! 注册表在启动时解析完成，取代对具体类型的分支判断。
//! Routes actions to handlers by (domain, action name); handlers return a
//! uniform execution result. The registry is resolved at startup, replacing
//! branching on concrete types.

use crate::action::{Action, ActionError, ActionResult};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// 动作处理器特性
/// Action handler trait
#[async_trait]
pub trait ActionHandler: Send + Sync {
  /// 处理动作，返回结果数据
  /// Process an action and return its result data
  async fn handle(&self, action: Action) -> Result<Value>;
}

type BoxFuture<T> = std::pin::Pin<Box<dyn Future<Output = T> + Send>>;

/// 函数式处理器适配器
/// Functional handler adapter
struct HandlerFunc {
  func: Arc<dyn Fn(Action) -> BoxFuture<Result<Value>> + Send + Sync>,
}

#[async_trait]
impl ActionHandler for HandlerFunc {
  async fn handle(&self, action: Action) -> Result<Value> {
    (self.func)(action).await
  }
}

/// 动作分发器
/// Action dispatcher
///
/// `dispatch` 是全函数：处理器错误被捕获并转换为失败的
/// [`ActionResult`]，从不向调用方的循环传播；缺失的处理器产生
/// `handler_not_found` 类型的失败结果。
/// `dispatch` is total: handler errors are caught and converted into a
/// failed [`ActionResult`], never propagating to the caller's loop; a
/// missing handler yields a failed result of type `handler_not_found`.
#[derive(Default)]
pub struct ActionDispatcher {
  handlers: HashMap<(String, String), Arc<dyn ActionHandler>>,
}

impl ActionDispatcher {
  /// 创建新的分发器
  /// Create a new dispatcher
  pub fn new() -> Self {
    Self::default()
  }

  /// 注册处理器
  /// Register a handler
  pub fn register<H>(&mut self, domain: &str, action_name: &str, handler: H)
  where
    H: ActionHandler + 'static,
  {
    self.register_arc(domain, action_name, Arc::new(handler));
  }

  /// 注册共享的处理器实例
  /// Register a shared handler instance
  pub fn register_arc(&mut self, domain: &str, action_name: &str, handler: Arc<dyn ActionHandler>) {
    self
      .handlers
      .insert((domain.to_string(), action_name.to_string()), handler);
  }

  /// 注册异步处理函数
  /// Register an asynchronous handler function
  pub fn register_fn<F, Fut>(&mut self, domain: &str, action_name: &str, func: F)
  where
    F: Fn(Action) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
  {
    let func = Arc::new(func);
    let wrapped = move |action: Action| -> BoxFuture<Result<Value>> {
      let func = Arc::clone(&func);
      Box::pin(async move { func(action).await })
    };
    self.register_arc(
      domain,
      action_name,
      Arc::new(HandlerFunc {
        func: Arc::new(wrapped),
      }),
    );
  }

  /// 已注册的处理器数量
  /// Number of registered handlers
  pub fn len(&self) -> usize {
    self.handlers.len()
  }

  /// 是否没有任何处理器
  /// Whether no handler is registered
  pub fn is_empty(&self) -> bool {
    self.handlers.is_empty()
  }

  /// 是否注册了指定处理器
  /// Whether the given handler is registered
  pub fn contains(&self, domain: &str, action_name: &str) -> bool {
    self
      .handlers
      .contains_key(&(domain.to_string(), action_name.to_string()))
  }

  /// 分发动作并返回统一结果
  /// Dispatch an action and return the uniform result
  pub async fn dispatch(&self, action: Action) -> ActionResult {
    let action_id = action.action_id.clone();
    let key = (action.domain().to_string(), action.name().to_string());
    let started = Instant::now();

    let outcome = match self.handlers.get(&key) {
      Some(handler) => handler.handle(action).await,
      None => Err(Error::HandlerNotFound {
        domain: key.0.clone(),
        action: key.1.clone(),
      }),
    };
    let execution_time = started.elapsed().as_secs_f64();

    match outcome {
      Ok(result) => ActionResult::ok(action_id, result, execution_time),
      Err(e) => {
        warn!(action_id = %action_id, "handler for {}.{} failed: {}", key.0, key.1, e);
        let error_type = match &e {
          Error::HandlerNotFound { .. } => "handler_not_found",
          _ => "handler_error",
        };
        ActionResult::failed(
          action_id,
          ActionError::new(error_type, e.to_string()),
          execution_time,
        )
      }
    }
  }
}
