//! Redis 配置和连接管理模块
//! Redis configuration and connection management module

use crate::error::{Error, Result};
use redis::{ConnectionInfo, IntoConnectionInfo};

/// Redis 连接配置
/// Redis connection configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
  /// Redis 连接信息
  /// Redis connection info
  pub connection_info: ConnectionInfo,
}

impl RedisConfig {
  /// 创建新的 Redis 配置
  /// Create a new Redis configuration
  pub fn new<T: IntoConnectionInfo>(connection_info: T) -> Result<Self> {
    let connection_info = connection_info
      .into_connection_info()
      .map_err(|e| Error::other(format!("Invalid Redis connection info: {}", e)))?;

    Ok(Self { connection_info })
  }

  /// 从 Redis URL 创建配置
  /// Create configuration from a Redis URL
  pub fn from_url(url: &str) -> Result<Self> {
    Self::new(url)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_redis_config_creation() {
    let config = RedisConfig::from_url("redis://127.0.0.1:6379").unwrap();
    assert_eq!(config.connection_info.addr.to_string(), "127.0.0.1:6379");
  }

  #[test]
  fn test_redis_config_rejects_garbage() {
    assert!(RedisConfig::from_url("not a url").is_err());
  }
}
