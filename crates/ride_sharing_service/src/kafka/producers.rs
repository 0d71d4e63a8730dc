/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use super::types::LocationUpdate;
use crate::common::{kafka::push_to_kafka, types::*};
use chrono::Utc;
use rdkafka::producer::FutureProducer;

pub async fn kafka_stream_location_update(
    producer: &Option<FutureProducer>,
    topic: &str,
    sample: &LocationSample,
) {
    let ActorId(key) = &sample.actor_id;

    let message = LocationUpdate {
        a_id: sample.actor_id.to_owned(),
        kind: sample.actor_kind,
        t_id: sample.trip_id.to_owned(),
        ts: sample.recorded_at,
        st: TimeStamp(Utc::now()),
        pt: sample.pt,
        acc: sample.acc,
        speed: sample.speed,
        heading: sample.heading,
    };

    push_to_kafka(producer, topic, key.as_str(), message).await;
}
