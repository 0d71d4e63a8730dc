/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use crate::tools::error::AppError;
use fred::{
    clients::SubscriberClient,
    interfaces::ClientLike,
    types::{Blocking, Builder, ReconnectPolicy, RedisConfig, RespVersion, TracingConfig},
};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub partition: usize,
    pub pool_size: usize,
    pub reconnect_max_attempts: u32,
    /// Reconnect delay in milliseconds
    pub reconnect_delay: u32,
    /// TTL in seconds
    pub default_ttl: u32,
}

impl Default for RedisSettings {
    fn default() -> Self {
        RedisSettings {
            host: String::from("localhost"),
            port: 6379,
            partition: 0,
            pool_size: 10,
            reconnect_max_attempts: 5,
            reconnect_delay: 1000,
            default_ttl: 3600,
        }
    }
}

impl RedisSettings {
    fn connection_config(&self) -> Result<RedisConfig, AppError> {
        let redis_connection_url = format!(
            "redis://{}:{}/{}", //URI Schema
            self.host, self.port, self.partition
        );
        let mut config = RedisConfig::from_url(&redis_connection_url)
            .map_err(|err| AppError::InternalError(format!("Invalid Redis URL : {err}")))?;

        config.version = RespVersion::RESP3;
        config.tracing = TracingConfig::new(true);
        config.blocking = Blocking::Error;

        Ok(config)
    }

    fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new_constant(self.reconnect_max_attempts, self.reconnect_delay)
    }
}

pub struct RedisConnectionPool {
    pub pool: fred::clients::RedisPool,
    pub default_ttl: u32,
}

impl RedisConnectionPool {
    /// Create a new Redis connection pool
    pub async fn new(conf: RedisSettings) -> Result<Self, AppError> {
        let pool = Builder::from_config(conf.connection_config()?)
            .set_policy(conf.reconnect_policy())
            .build_pool(conf.pool_size)
            .map_err(|err| {
                AppError::InternalError(format!("Failed to build Redis pool : {err}"))
            })?;

        pool.init().await.map_err(|err| {
            AppError::InternalError(format!("Redis connection failed : {err}"))
        })?;

        Ok(Self {
            pool,
            default_ttl: conf.default_ttl,
        })
    }
}

/// Builds a dedicated pub/sub connection; regular command pools cannot
/// be used for SUBSCRIBE in RESP3 without fencing off a connection.
pub async fn new_subscriber_client(conf: &RedisSettings) -> Result<SubscriberClient, AppError> {
    let subscriber = Builder::from_config(conf.connection_config()?)
        .set_policy(conf.reconnect_policy())
        .build_subscriber_client()
        .map_err(|err| {
            AppError::InternalError(format!("Failed to build Redis subscriber : {err}"))
        })?;

    subscriber.init().await.map_err(|err| {
        AppError::InternalError(format!("Redis subscriber connection failed : {err}"))
    })?;

    // Re-subscribes to tracked channels after a reconnect.
    subscriber.manage_subscriptions();

    Ok(subscriber)
}
