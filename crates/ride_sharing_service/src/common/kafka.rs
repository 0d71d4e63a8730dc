use std::time::Duration;

use rdkafka::{
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
};
use serde::Serialize;
use tracing::{error, info};

pub async fn push_to_kafka<T>(producer: &Option<FutureProducer>, topic: &str, key: &str, message: T)
where
    T: Serialize,
{
    let message = match serde_json::to_string(&message) {
        Ok(message) => message,
        Err(err) => {
            error!(tag = "[Kafka Serialization Failed]", error = %err);
            return;
        }
    };

    match producer {
        Some(producer) => {
            _ = producer
                .send(
                    FutureRecord::to(topic).key(key).payload(&message),
                    Timeout::After(Duration::from_secs(1)),
                )
                .await;
        }
        None => {
            info!("Producer is None, unable to send message");
        }
    }
}
