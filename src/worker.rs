//! 工作者模块
//! Worker module
//!
//! 单个协作式循环：反复发现活跃租户，按固定顺序为每个租户排空一组
//! 命名队列，并把结果转换为出站投递动作。
//! A single cooperative loop: repeatedly discovers active tenants, drains a
//! fixed, ordered set of named queues per tenant, and converts results into
//! outbound delivery actions.
//!
//! 公平性模型：每次迭代对每个租户的每条队列至多做
//! `tenant_batch_size` 次短超时出队尝试 —— 租户间轮转、租户内按
//! 优先级排序，没有租户能独占工作者。
//! Fairness model: each iteration makes at most `tenant_batch_size`
//! short-timeout dequeue attempts per queue per tenant —
//! round-robin-over-tenants, priority-ordered-within-tenant, so no tenant
//! can monopolize the worker.
//!
//! 水平扩展：多个独立的工作者进程对着同一存储键空间运行；正确性
//! 完全依赖存储的原子弹出（竞争消费者模式），没有选主，没有租户
//! 分片，重复的工作者只会增加吞吐。
//! Horizontal scaling: multiple independent worker processes run against the
//! same store keyspace; correctness rests solely on the store's atomic pop
//! (competing consumers), no leader election, no tenant partitioning,
//! duplicate workers only add throughput.

use crate::action::{Action, ActionStatus};
use crate::config::WorkerConfig;
use crate::discovery::TenantDiscovery;
use crate::dispatch::ActionDispatcher;
use crate::error::{Error, Result};
use crate::outbound;
use crate::queue::QueueManager;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 工作者状态
/// Worker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerState {
  // 未运行
  Stopped,
  // 循环进行中
  Running,
  // 已请求停止，等待循环退出
  Stopping,
}

/// 队列排空工作者
/// Queue draining worker
///
/// `stop()` 翻转一个在迭代之间检查的标志（协作式而非抢占式）；
/// 其延迟上界为一次出队超时加一次休眠间隔。
/// `stop()` flips a flag checked between iterations (cooperative, not
/// preemptive); its latency is bounded by one dequeue timeout plus one
/// sleep interval.
pub struct Worker {
  manager: Arc<QueueManager>,
  discovery: Arc<TenantDiscovery>,
  dispatcher: Arc<ActionDispatcher>,
  config: WorkerConfig,
  state: WorkerState,
  running: Arc<AtomicBool>,
  shutdown: CancellationToken,
  handle: Option<JoinHandle<()>>,
}

impl Worker {
  /// 创建新的工作者
  /// Create a new worker
  pub fn new(
    manager: Arc<QueueManager>,
    dispatcher: Arc<ActionDispatcher>,
    config: WorkerConfig,
  ) -> Result<Self> {
    config.validate()?;
    let discovery = Arc::new(TenantDiscovery::new(
      Arc::clone(manager.broker()),
      config.domain.clone(),
    ));
    Ok(Self {
      manager,
      discovery,
      dispatcher,
      config,
      state: WorkerState::Stopped,
      running: Arc::new(AtomicBool::new(false)),
      shutdown: CancellationToken::new(),
      handle: None,
    })
  }

  /// 工作者是否在运行
  /// Whether the worker is running
  pub fn is_running(&self) -> bool {
    self.state == WorkerState::Running
  }

  /// 启动排空循环
  /// Start the draining loop
  pub fn start(&mut self) -> Result<()> {
    // Stopping 状态下旧循环可能尚未退出，同样拒绝
    // In the Stopping state the old loop may not have exited yet, reject as well
    if self.state != WorkerState::Stopped {
      return Err(Error::WorkerRunning);
    }

    self.shutdown = CancellationToken::new();
    self.running.store(true, Ordering::SeqCst);

    let ctx = WorkerContext {
      manager: Arc::clone(&self.manager),
      discovery: Arc::clone(&self.discovery),
      dispatcher: Arc::clone(&self.dispatcher),
      config: self.config.clone(),
      running: Arc::clone(&self.running),
      shutdown: self.shutdown.clone(),
    };
    self.handle = Some(tokio::spawn(async move { ctx.run().await }));
    self.state = WorkerState::Running;
    Ok(())
  }

  /// 请求停止；在迭代之间生效
  /// Request a stop; takes effect between iterations
  pub fn stop(&mut self) {
    if self.state != WorkerState::Running {
      return;
    }
    self.running.store(false, Ordering::SeqCst);
    self.shutdown.cancel();
    self.state = WorkerState::Stopping;
  }

  /// 停止并等待循环退出
  /// Stop and wait for the loop to exit
  pub async fn shutdown(&mut self) {
    self.stop();
    if let Some(handle) = self.handle.take() {
      let _ = handle.await;
    }
    self.state = WorkerState::Stopped;
  }
}

/// 循环内部共享的上下文
/// Context shared inside the loop
struct WorkerContext {
  manager: Arc<QueueManager>,
  discovery: Arc<TenantDiscovery>,
  dispatcher: Arc<ActionDispatcher>,
  config: WorkerConfig,
  running: Arc<AtomicBool>,
  shutdown: CancellationToken,
}

impl WorkerContext {
  /// 循环主体：发现、排空、休眠，直到显式停止
  /// Loop body: discover, drain, sleep, until an explicit stop
  ///
  /// 本循环的契约是绝不向外抛出 —— 所有故障被捕获、记录并继续。
  /// The loop's contract is to never raise out — every failure is caught,
  /// logged and survived.
  async fn run(&self) {
    info!(domain = %self.config.domain, "worker started");
    while self.running.load(Ordering::SeqCst) {
      match self.run_iteration().await {
        Ok(0) => debug!(domain = %self.config.domain, "nothing to do this iteration"),
        Ok(processed) => debug!(domain = %self.config.domain, "processed {} actions", processed),
        Err(e) => {
          // 冷却避免紧密失败循环
          // Cooldown prevents a tight failure loop
          error!(domain = %self.config.domain, "iteration failed: {}", e);
          self.idle(self.config.error_cooldown).await;
        }
      }
      if !self.running.load(Ordering::SeqCst) {
        break;
      }
      self.idle(self.config.poll_interval).await;
    }
    info!(domain = %self.config.domain, "worker stopped");
  }

  /// 单次迭代：租户轮转
  /// One iteration: round-robin over tenants
  async fn run_iteration(&self) -> Result<usize> {
    let tenants = self.discovery.active_tenants().await;
    if tenants.is_empty() {
      return Ok(0);
    }

    let mut processed = 0;
    for tenant in &tenants {
      // 租户边界：一个租户的失败不中止本次迭代
      // Tenant boundary: one tenant's failure does not abort the iteration
      match self.drain_tenant(tenant).await {
        Ok(count) => processed += count,
        Err(e) => error!(tenant = %tenant, "draining tenant failed: {}", e),
      }
    }
    Ok(processed)
  }

  /// 按固定顺序排空一个租户的命名队列
  /// Drain one tenant's named queues in fixed order
  async fn drain_tenant(&self, tenant: &str) -> Result<usize> {
    let mut processed = 0;
    for queue in &self.config.owned_queues {
      for _ in 0..self.config.tenant_batch_size {
        let dequeued = self
          .manager
          .dequeue(
            &self.config.domain,
            tenant,
            &queue.action_name,
            queue.priority,
            self.config.dequeue_timeout,
          )
          .await;
        match dequeued {
          Ok(Some(action)) => {
            self.process_action(tenant, action).await;
            processed += 1;
          }
          // 超时内无条目，转到下一条队列
          // Nothing within the timeout, move to the next queue
          Ok(None) => break,
          Err(e) => {
            // 传输层故障不是空队列：单独记录，本条队列本轮放弃
            // A transport failure is not an empty queue: logged distinctly,
            // this queue is given up for this round
            warn!(
              tenant = %tenant,
              queue = %queue.action_name,
              "dequeue transport failure: {}", e
            );
            break;
          }
        }
      }
    }
    Ok(processed)
  }

  /// 处理一个已出队的动作；任何故障都被吸收在条目边界内
  /// Process one dequeued action; every failure is absorbed at the item
  /// boundary
  async fn process_action(&self, tenant: &str, action: Action) {
    debug!(
      action_id = %action.action_id,
      action_type = %action.action_type,
      "processing dequeued action"
    );

    if let Err(e) = self
      .manager
      .set_status(
        &action.action_id,
        tenant,
        ActionStatus::Processing,
        HashMap::new(),
      )
      .await
    {
      warn!(action_id = %action.action_id, "failed to write processing status: {}", e);
    }

    // 结果状态 → 出站投递动作（全函数），再经注册表路由执行
    // Result status → outbound delivery action (total), then routed through
    // the registry for execution
    let outbound = outbound::outbound_action(&action, &self.config.delivery_domain);
    let result = self.dispatcher.dispatch(outbound).await;

    let status = if result.success {
      ActionStatus::Completed
    } else {
      ActionStatus::Failed
    };
    let mut metadata = HashMap::new();
    metadata.insert("execution_time".to_string(), json!(result.execution_time));
    if let Some(error) = &result.error {
      metadata.insert("error".to_string(), json!(error));
    }

    if let Err(e) = self
      .manager
      .set_status(&action.action_id, tenant, status, metadata)
      .await
    {
      warn!(action_id = %action.action_id, "failed to write terminal status: {}", e);
    }
  }

  /// 可被停止打断的休眠
  /// Sleep that a stop request can interrupt
  async fn idle(&self, duration: Duration) {
    tokio::select! {
      _ = self.shutdown.cancelled() => {}
      _ = tokio::time::sleep(duration) => {}
    }
  }
}
