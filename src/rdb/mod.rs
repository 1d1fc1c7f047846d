//! Redis 后端模块
//! Redis backend module

mod broker;

pub use broker::RedisBroker;
