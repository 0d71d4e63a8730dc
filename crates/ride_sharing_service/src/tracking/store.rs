/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;
use crate::kafka::producers::kafka_stream_location_update;
use crate::redis::commands::{
    append_location_sample, get_active_actor_ids, get_location_rows, publish_location_update,
};
use crate::redis::types::RedisConnectionPool;
use crate::tools::error::AppError;
use crate::tools::prometheus::{LOCATION_NOTIFICATIONS, TOTAL_LOCATION_UPDATES};
use crate::tracking::ingestor::SampleSink;
use crate::tracking::presenter::LocationFeed;
use async_trait::async_trait;
use rdkafka::producer::FutureProducer;
use std::sync::Arc;
use tracing::error;

/// Redis-backed location store: append-only history rows, Kafka mirror
/// for durable history, change notifications over pub/sub.
pub struct RedisLocationStore {
    redis: Arc<RedisConnectionPool>,
    producer: Option<FutureProducer>,
    location_update_topic: String,
    history_retention: u32,
    feed_rows_per_actor: usize,
}

impl RedisLocationStore {
    pub fn new(
        redis: Arc<RedisConnectionPool>,
        producer: Option<FutureProducer>,
        location_update_topic: String,
        history_retention: u32,
        feed_rows_per_actor: usize,
    ) -> Self {
        Self {
            redis,
            producer,
            location_update_topic,
            history_retention,
            feed_rows_per_actor,
        }
    }
}

#[async_trait]
impl SampleSink for RedisLocationStore {
    async fn submit_sample(&self, sample: LocationSample) -> Result<(), AppError> {
        append_location_sample(&self.redis, &self.history_retention, &sample).await?;
        TOTAL_LOCATION_UPDATES.inc();

        kafka_stream_location_update(&self.producer, &self.location_update_topic, &sample).await;

        let event = ChangeEvent {
            topic: sample.actor_kind.into(),
            actor_id: sample.actor_id.clone(),
            recorded_at: sample.recorded_at,
        };
        match publish_location_update(&self.redis, &event).await {
            Ok(()) => LOCATION_NOTIFICATIONS.inc(),
            // The row landed; subscribers catch up on their next fetch.
            Err(err) => error!(tag = "[Change Notification Failed]", error = %err),
        }

        Ok(())
    }
}

#[async_trait]
impl LocationFeed for RedisLocationStore {
    async fn location_rows(&self, topic: ChangeTopic) -> Result<Vec<LocationSample>, AppError> {
        let kind = ActorKind::from(topic);
        let actor_ids = get_active_actor_ids(&self.redis, &kind).await?;

        get_location_rows(&self.redis, &actor_ids, self.feed_rows_per_actor).await
    }
}
