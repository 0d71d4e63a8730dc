/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;
use crate::redis::{keys::*, types::RedisConnectionPool};
use crate::tools::error::AppError;
use fred::{
    interfaces::{
        GeoInterface, KeysInterface, PubsubInterface, SetsInterface, SortedSetsInterface,
    },
    types::{
        Expiration, GeoPosition, GeoRadiusInfo, GeoUnit, GeoValue, RedisValue, SortOrder,
    },
};
use std::fmt::Debug;
use tracing::warn;

impl RedisConnectionPool {
    // set key with expiry
    pub async fn set_with_expiry<V>(&self, key: &str, value: V, expiry: u32) -> Result<(), AppError>
    where
        V: TryInto<RedisValue> + Debug + Send + Sync,
        V::Error: Into<fred::error::RedisError> + Send + Sync,
    {
        let output: Result<(), _> = self
            .pool
            .set(key, value, Some(Expiration::EX(expiry.into())), None, false)
            .await;

        output.map_err(|err| AppError::WriteFailed(err.to_string()))
    }

    // set key with the pool's default TTL
    pub async fn set_key<V>(&self, key: &str, value: V) -> Result<(), AppError>
    where
        V: TryInto<RedisValue> + Debug + Send + Sync,
        V::Error: Into<fred::error::RedisError> + Send + Sync,
    {
        self.set_with_expiry(key, value, self.default_ttl).await
    }

    pub async fn set_expiry(&self, key: &str, seconds: i64) -> Result<(), AppError> {
        let output: Result<(), _> = self.pool.expire(key, seconds).await;

        output.map_err(|err| AppError::WriteFailed(err.to_string()))
    }

    // get key
    pub async fn get_key(&self, key: &str) -> Result<Option<String>, AppError> {
        let output: Result<RedisValue, _> = self.pool.get(key).await;

        match output {
            Ok(RedisValue::String(val)) => Ok(Some(val.to_string())),
            Ok(RedisValue::Null) => Ok(None),
            Ok(_) => Err(AppError::ReadFailed("GET returned a non-string".to_string())),
            Err(err) => Err(AppError::ReadFailed(err.to_string())),
        }
    }

    // delete key
    pub async fn delete_key(&self, key: &str) -> Result<(), AppError> {
        let output: Result<(), _> = self.pool.del(key).await;

        output.map_err(|err| AppError::WriteFailed(err.to_string()))
    }

    //ZADD
    pub async fn zadd(&self, key: &str, values: Vec<(f64, &str)>) -> Result<(), AppError> {
        let output: Result<(), _> = self.pool.zadd(key, None, None, false, false, values).await;

        output.map_err(|err| AppError::WriteFailed(err.to_string()))
    }

    //ZRANGE (members come back in score order)
    pub async fn zrange(&self, key: &str, min: i64, max: i64) -> Result<Vec<String>, AppError> {
        let output: Result<RedisValue, _> =
            self.pool.zrange(key, min, max, None, false, None, false).await;

        match output {
            Ok(RedisValue::Array(val)) => Ok(val
                .into_iter()
                .filter_map(|member| member.into_string())
                .collect()),
            Ok(RedisValue::String(member)) => Ok(vec![member.to_string()]),
            Ok(RedisValue::Null) => Ok(vec![]),
            Ok(_) => Err(AppError::ReadFailed("ZRANGE returned a non-array".to_string())),
            Err(err) => Err(AppError::ReadFailed(err.to_string())),
        }
    }

    //ZREM
    pub async fn zrem(&self, key: &str, member: &str) -> Result<(), AppError> {
        let output: Result<(), _> = self.pool.zrem(key, member).await;

        output.map_err(|err| AppError::WriteFailed(err.to_string()))
    }

    //ZREMRANGEBYSCORE
    pub async fn zremrange_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<u64, AppError> {
        let output: Result<u64, _> = self.pool.zremrangebyscore(key, min, max).await;

        output.map_err(|err| AppError::WriteFailed(err.to_string()))
    }

    //SADD
    pub async fn sadd(&self, key: &str, member: &str) -> Result<(), AppError> {
        let output: Result<(), _> = self.pool.sadd(key, member).await;

        output.map_err(|err| AppError::WriteFailed(err.to_string()))
    }

    //SMEMBERS
    pub async fn smembers(&self, key: &str) -> Result<Vec<String>, AppError> {
        let output: Result<Vec<String>, _> = self.pool.smembers(key).await;

        output.map_err(|err| AppError::ReadFailed(err.to_string()))
    }

    //GEOADD
    pub async fn geo_add<V>(&self, key: &str, values: V) -> Result<(), AppError>
    where
        V: Into<fred::types::MultipleGeoValues> + Send + Debug,
    {
        let output: Result<(), _> = self.pool.geoadd(key, None, false, values).await;

        output.map_err(|err| AppError::WriteFailed(err.to_string()))
    }

    //GEOSEARCH
    pub async fn geo_search(
        &self,
        key: &str,
        from_lonlat: GeoPosition,
        by_radius: (f64, GeoUnit),
    ) -> Result<Vec<GeoRadiusInfo>, AppError> {
        let output: Result<RedisValue, _> = self
            .pool
            .geosearch(
                key,
                None,
                Some(from_lonlat),
                Some(by_radius),
                None,
                Some(SortOrder::Asc),
                None,
                true,
                true,
                false,
            )
            .await;

        output
            .and_then(|value| value.into_geo_radius_result(true, true, false))
            .map_err(|err| AppError::ReadFailed(err.to_string()))
    }

    //PUBLISH
    pub async fn publish(&self, channel: &str, payload: &str) -> Result<(), AppError> {
        let output: Result<i64, _> = self.pool.next().publish(channel, payload).await;

        output
            .map(|_| ())
            .map_err(|err| AppError::WriteFailed(err.to_string()))
    }
}

pub async fn set_trip_details(
    redis: &RedisConnectionPool,
    expiry: &u32,
    trip: &Trip,
) -> Result<(), AppError> {
    let value = serde_json::to_string(trip)
        .map_err(|err| AppError::SerializationError(err.to_string()))?;

    redis
        .set_with_expiry(&trip_details_key(&trip.trip_id), value, *expiry)
        .await
}

pub async fn get_trip_details(
    redis: &RedisConnectionPool,
    trip_id: &TripId,
) -> Result<Option<Trip>, AppError> {
    redis
        .get_key(&trip_details_key(trip_id))
        .await?
        .map(|value| {
            serde_json::from_str::<Trip>(&value)
                .map_err(|err| AppError::DeserializationError(err.to_string()))
        })
        .transpose()
}

pub async fn delete_trip_details(
    redis: &RedisConnectionPool,
    trip_id: &TripId,
) -> Result<(), AppError> {
    redis.delete_key(&trip_details_key(trip_id)).await
}

/// Indexes a trip for search: origin coordinates into the geo set and
/// departure time into the upcoming-trips ordering.
pub async fn add_trip_to_search_index(
    redis: &RedisConnectionPool,
    trip: &Trip,
) -> Result<(), AppError> {
    let TripId(trip_id) = &trip.trip_id;

    if let Some(Point {
        lat: Latitude(lat),
        lon: Longitude(lon),
    }) = trip.origin.coordinates
    {
        redis
            .geo_add(
                &trip_origin_geo_key(),
                GeoValue {
                    coordinates: GeoPosition {
                        latitude: lat,
                        longitude: lon,
                    },
                    member: trip_id.as_str().into(),
                },
            )
            .await?;
    }

    let TimeStamp(departure_time) = trip.departure_time;
    redis
        .zadd(
            &upcoming_trips_key(),
            vec![(departure_time.timestamp() as f64, trip_id.as_str())],
        )
        .await
}

pub async fn remove_trip_from_search_index(
    redis: &RedisConnectionPool,
    TripId(trip_id): &TripId,
) -> Result<(), AppError> {
    redis.zrem(&trip_origin_geo_key(), trip_id).await?;
    redis.zrem(&upcoming_trips_key(), trip_id).await
}

pub async fn search_trip_ids_by_origin(
    redis: &RedisConnectionPool,
    origin: &Point,
    Radius(radius_km): &Radius,
) -> Result<Vec<TripId>, AppError> {
    let Point {
        lat: Latitude(lat),
        lon: Longitude(lon),
    } = *origin;

    let nearby = redis
        .geo_search(
            &trip_origin_geo_key(),
            GeoPosition {
                latitude: lat,
                longitude: lon,
            },
            (*radius_km, GeoUnit::Kilometers),
        )
        .await?;

    let mut trip_ids = Vec::with_capacity(nearby.len());
    for info in nearby {
        match info.member {
            RedisValue::String(trip_id) => trip_ids.push(TripId(trip_id.to_string())),
            _ => warn!("Invalid RedisValue variant in trip origin geo set"),
        }
    }

    Ok(trip_ids)
}

pub async fn set_booking_details(
    redis: &RedisConnectionPool,
    expiry: &u32,
    booking: &Booking,
) -> Result<(), AppError> {
    let value = serde_json::to_string(booking)
        .map_err(|err| AppError::SerializationError(err.to_string()))?;

    redis
        .set_with_expiry(&booking_details_key(&booking.booking_id), value, *expiry)
        .await
}

pub async fn get_booking_details(
    redis: &RedisConnectionPool,
    booking_id: &BookingId,
) -> Result<Option<Booking>, AppError> {
    redis
        .get_key(&booking_details_key(booking_id))
        .await?
        .map(|value| {
            serde_json::from_str::<Booking>(&value)
                .map_err(|err| AppError::DeserializationError(err.to_string()))
        })
        .transpose()
}

pub async fn index_booking(
    redis: &RedisConnectionPool,
    booking: &Booking,
) -> Result<(), AppError> {
    let BookingId(booking_id) = &booking.booking_id;

    redis
        .sadd(&trip_bookings_key(&booking.trip_id), booking_id)
        .await?;
    redis
        .sadd(&passenger_bookings_key(&booking.passenger_id), booking_id)
        .await
}

pub async fn get_trip_booking_ids(
    redis: &RedisConnectionPool,
    trip_id: &TripId,
) -> Result<Vec<BookingId>, AppError> {
    Ok(redis
        .smembers(&trip_bookings_key(trip_id))
        .await?
        .into_iter()
        .map(BookingId)
        .collect())
}

/// Appends one location row. Every call lands a new member in the
/// actor's history set; nothing is updated in place.
pub async fn append_location_sample(
    redis: &RedisConnectionPool,
    retention: &u32,
    sample: &LocationSample,
) -> Result<(), AppError> {
    let row = serde_json::to_string(sample)
        .map_err(|err| AppError::SerializationError(err.to_string()))?;

    let TimeStamp(recorded_at) = sample.recorded_at;
    let score = recorded_at.timestamp_millis() as f64;
    let history_key = location_history_key(&sample.actor_id);

    redis.zadd(&history_key, vec![(score, row.as_str())]).await?;
    redis.set_expiry(&history_key, (*retention).into()).await?;

    let ActorId(actor_id) = &sample.actor_id;
    redis
        .zadd(
            &active_actors_key(&sample.actor_kind),
            vec![(recorded_at.timestamp() as f64, actor_id.as_str())],
        )
        .await
}

pub async fn get_active_actor_ids(
    redis: &RedisConnectionPool,
    kind: &ActorKind,
) -> Result<Vec<ActorId>, AppError> {
    Ok(redis
        .zrange(&active_actors_key(kind), 0, -1)
        .await?
        .into_iter()
        .map(ActorId)
        .collect())
}

/// Fetches the most recent rows per actor, newest last. The caller
/// collapses them with `latest_per_actor`.
pub async fn get_location_rows(
    redis: &RedisConnectionPool,
    actor_ids: &[ActorId],
    per_actor: usize,
) -> Result<Vec<LocationSample>, AppError> {
    let mut rows = Vec::new();

    for actor_id in actor_ids {
        let members = redis
            .zrange(&location_history_key(actor_id), -(per_actor as i64), -1)
            .await?;

        for member in members {
            match serde_json::from_str::<LocationSample>(&member) {
                Ok(sample) => rows.push(sample),
                Err(err) => {
                    warn!(tag = "[Malformed Location Row]", error = %err);
                }
            }
        }
    }

    Ok(rows)
}

pub async fn set_last_location_ts(
    redis: &RedisConnectionPool,
    expiry: &u32,
    actor_id: &ActorId,
    TimeStamp(ts): &TimeStamp,
) -> Result<(), AppError> {
    redis
        .set_with_expiry(&last_location_ts_key(actor_id), ts.to_rfc3339(), *expiry)
        .await
}

pub async fn get_last_location_ts(
    redis: &RedisConnectionPool,
    actor_id: &ActorId,
) -> Result<Option<TimeStamp>, AppError> {
    Ok(redis
        .get_key(&last_location_ts_key(actor_id))
        .await?
        .and_then(|ts| chrono::DateTime::parse_from_rfc3339(&ts).ok())
        .map(|ts| TimeStamp(ts.with_timezone(&chrono::Utc))))
}

pub async fn publish_location_update(
    redis: &RedisConnectionPool,
    event: &ChangeEvent,
) -> Result<(), AppError> {
    let payload = serde_json::to_string(event)
        .map_err(|err| AppError::SerializationError(err.to_string()))?;

    redis
        .publish(&location_updates_channel(&event.topic), &payload)
        .await
}

/// Drops history rows and active-actor entries recorded before the
/// cutoff. Returns how many history rows were removed.
pub async fn trim_location_history(
    redis: &RedisConnectionPool,
    kind: &ActorKind,
    TimeStamp(cutoff): &TimeStamp,
) -> Result<u64, AppError> {
    let actor_ids = get_active_actor_ids(redis, kind).await?;

    let mut removed = 0;
    for actor_id in &actor_ids {
        removed += redis
            .zremrange_by_score(
                &location_history_key(actor_id),
                f64::MIN,
                cutoff.timestamp_millis() as f64,
            )
            .await?;
    }

    redis
        .zremrange_by_score(
            &active_actors_key(kind),
            f64::MIN,
            cutoff.timestamp() as f64,
        )
        .await?;

    Ok(removed)
}
