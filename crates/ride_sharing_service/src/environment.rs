/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
#![allow(clippy::expect_used)]

use std::{env::var, sync::Arc};

use crate::{
    common::{geo_polygon::read_geo_polygon, types::*},
    outbound::external::HttpBookingStatusDispatcher,
    redis::types::{new_subscriber_client, RedisConnectionPool, RedisSettings},
    tools::logger::LoggerConfig,
    tracking::{notifier::RedisChangeNotifier, store::RedisLocationStore},
};
use rdkafka::{error::KafkaError, producer::FutureProducer, ClientConfig};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub workers: usize,
    pub logger_cfg: LoggerConfig,
    pub persistent_redis_cfg: RedisConfig,
    pub non_persistent_redis_cfg: RedisConfig,
    pub auth_url: String,
    pub auth_api_key: String,
    pub auth_token_expiry: u32,
    pub booking_status_callback_url: String,
    pub redis_expiry: u32,
    pub max_location_accuracy: f64,
    pub last_location_timestamp_expiry: u32,
    pub location_update_limit: usize,
    pub location_update_interval: u64,
    pub location_history_retention: u32,
    pub history_trim_delay: u64,
    pub feed_rows_per_actor: usize,
    pub default_search_radius: f64,
    pub kafka_cfg: KafkaConfig,
    pub location_update_topic: String,
    pub request_timeout: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KafkaConfig {
    pub kafka_key: String,
    pub kafka_host: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RedisConfig {
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_pool_size: usize,
    pub redis_partition: usize,
    pub reconnect_max_attempts: u32,
    pub reconnect_delay: u32,
    pub default_ttl: u32,
}

impl From<RedisConfig> for RedisSettings {
    fn from(cfg: RedisConfig) -> Self {
        RedisSettings {
            host: cfg.redis_host,
            port: cfg.redis_port,
            partition: cfg.redis_partition,
            pool_size: cfg.redis_pool_size,
            reconnect_max_attempts: cfg.reconnect_max_attempts,
            reconnect_delay: cfg.reconnect_delay,
            default_ttl: cfg.default_ttl,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub persistent_redis: Arc<RedisConnectionPool>,
    pub non_persistent_redis: Arc<RedisConnectionPool>,
    pub change_notifier: Arc<RedisChangeNotifier>,
    pub location_store: Arc<RedisLocationStore>,
    pub booking_status_dispatcher: Arc<HttpBookingStatusDispatcher>,
    pub polygon: Vec<MultiPolygonBody>,
    pub auth_url: Url,
    pub auth_api_key: String,
    pub auth_token_expiry: u32,
    pub redis_expiry: u32,
    pub max_location_accuracy: Accuracy,
    pub last_location_timestamp_expiry: u32,
    pub location_update_limit: usize,
    pub location_update_interval: u64,
    pub location_history_retention: u32,
    pub history_trim_delay: u64,
    pub feed_rows_per_actor: usize,
    pub default_search_radius: Radius,
    pub request_timeout: u64,
}

impl AppState {
    pub async fn new(app_config: AppConfig) -> AppState {
        let persistent_redis = Arc::new(
            RedisConnectionPool::new(app_config.persistent_redis_cfg.into())
                .await
                .expect("Failed to create Generic Redis connection pool"),
        );

        let non_persistent_redis_settings: RedisSettings =
            app_config.non_persistent_redis_cfg.into();

        let non_persistent_redis = Arc::new(
            RedisConnectionPool::new(non_persistent_redis_settings.clone())
                .await
                .expect("Failed to create Location Redis connection pool"),
        );

        let subscriber = new_subscriber_client(&non_persistent_redis_settings)
            .await
            .expect("Failed to create Redis subscriber client");
        let change_notifier = Arc::new(RedisChangeNotifier::new(subscriber));

        let geo_config_path = var("GEO_CONFIG").unwrap_or_else(|_| "./geo_config".to_string());
        let polygons = read_geo_polygon(&geo_config_path).expect("Failed to read geoJSON");

        let producer: Option<FutureProducer>;

        let result: Result<FutureProducer, KafkaError> = ClientConfig::new()
            .set(
                app_config.kafka_cfg.kafka_key,
                app_config.kafka_cfg.kafka_host,
            )
            .set("compression.type", "lz4")
            .create();

        match result {
            Ok(val) => {
                producer = Some(val);
            }
            Err(err) => {
                producer = None;
                info!(
                    tag = "[Kafka Connection]",
                    "Error connecting to kafka config: {err}"
                );
            }
        }

        let location_store = Arc::new(RedisLocationStore::new(
            non_persistent_redis.clone(),
            producer,
            app_config.location_update_topic,
            app_config.location_history_retention,
            app_config.feed_rows_per_actor,
        ));

        let booking_status_dispatcher = Arc::new(HttpBookingStatusDispatcher {
            callback_url: Url::parse(app_config.booking_status_callback_url.as_str())
                .expect("Failed to parse booking_status_callback_url."),
            api_key: app_config.auth_api_key.clone(),
        });

        AppState {
            persistent_redis,
            non_persistent_redis,
            change_notifier,
            location_store,
            booking_status_dispatcher,
            polygon: polygons,
            auth_url: Url::parse(app_config.auth_url.as_str()).expect("Failed to parse auth_url."),
            auth_api_key: app_config.auth_api_key,
            auth_token_expiry: app_config.auth_token_expiry,
            redis_expiry: app_config.redis_expiry,
            max_location_accuracy: Accuracy(app_config.max_location_accuracy),
            last_location_timestamp_expiry: app_config.last_location_timestamp_expiry,
            location_update_limit: app_config.location_update_limit,
            location_update_interval: app_config.location_update_interval,
            location_history_retention: app_config.location_history_retention,
            history_trim_delay: app_config.history_trim_delay,
            feed_rows_per_actor: app_config.feed_rows_per_actor,
            default_search_radius: Radius(app_config.default_search_radius),
            request_timeout: app_config.request_timeout,
        }
    }
}
