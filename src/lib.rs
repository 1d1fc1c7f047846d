//! # Actionq
//!
//! Multi-tenant priority action queue with a fair draining worker, backed by Redis
//!
//! Actionq 是多租户服务网格的异步任务分发骨干：前置服务按租户、域和
//! 优先级入队动作，工作者池公平地排空这些队列，并把结果经实时连接
//! 送回等待的客户端。
//! Actionq is the asynchronous task-distribution backbone of a multi-tenant
//! service mesh: front-facing services enqueue actions tagged by tenant,
//! domain and priority, and a worker pool drains those queues fairly and
//! delivers results back to waiting clients over a live connection.
//!
//! ## 特性
//! ## Features
//!
//! - 结构性的租户隔离：每个 (域, 租户, 动作, 优先级) 一条独立队列
//!   - Structural tenant isolation: one queue per (domain, tenant, action, priority)
//! - 租户间轮转、租户内按优先级的公平排空
//!   - Fair draining, round-robin over tenants and priority-ordered within a tenant
//! - 基于存储原子弹出的至多一次投递
//!   - At-most-once delivery built on the store's atomic pop
//! - 竞争消费者式水平扩展，无需选主
//!   - Horizontal scaling as competing consumers, no leader election
//! - 带 TTL 的旁路状态记录，幂等覆写
//!   - Side-channel TTL'd status records with idempotent overwrites
//! - 结果状态到出站投递动作的全函数转换
//!   - Total translation of result statuses into outbound delivery actions
//! - (域, 动作名) 处理器注册表，启动时解析完成
//!   - A (domain, action-name) handler registry resolved at startup
//! - 内存后端，用于测试与无 Redis 嵌入
//!   - In-memory backend for tests and Redis-less embedding
//!
//! ## 快速开始
//! ## Quick Start
//!
//! ```rust,no_run
//! use actionq::action::{Action, ActionStatus, Priority};
//! use actionq::config::{QueueConfig, WorkerConfig};
//! use actionq::delivery::{register_delivery_handlers, NullSink};
//! use actionq::dispatch::ActionDispatcher;
//! use actionq::queue::QueueManager;
//! use actionq::rdb::RedisBroker;
//! use actionq::worker::Worker;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 创建存储句柄与队列管理器
//!     // Create the store handle and the queue manager
//!     let broker = Arc::new(RedisBroker::from_url("redis://127.0.0.1:6379")?);
//!     let manager = Arc::new(QueueManager::new(broker, QueueConfig::default())?);
//!     manager.connect().await?;
//!
//!     // 生产者：入队成功后才写入 queued 状态
//!     // Producer: the queued status is written only after a successful enqueue
//!     let action = Action::new("orchestrator.websocket_send", "tenant-1")?
//!         .with_priority(Priority::High)
//!         .with_payload(json!({"status": "completed", "response": "hi"}));
//!     manager.enqueue(&action, "orchestrator").await?;
//!     manager
//!         .set_status(&action.action_id, &action.tenant_id, ActionStatus::Queued, Default::default())
//!         .await?;
//!
//!     // 工作者：注册投递处理器并启动排空循环
//!     // Worker: register the delivery handlers and start the draining loop
//!     let mut dispatcher = ActionDispatcher::new();
//!     register_delivery_handlers(&mut dispatcher, "gateway", Arc::new(NullSink));
//!     let mut worker = Worker::new(manager, Arc::new(dispatcher), WorkerConfig::default())?;
//!     worker.start()?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     worker.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod base;
pub mod config;
pub mod delivery;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod memdb;
pub mod outbound;
pub mod queue;
pub mod rdb;
pub mod redis;
pub mod worker;
