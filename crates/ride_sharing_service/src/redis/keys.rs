/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;

// Persistent Redis
pub fn trip_details_key(TripId(trip_id): &TripId) -> String {
    format!("rss:ds:trip_details:{trip_id}")
}

// Persistent Redis
pub fn booking_details_key(BookingId(booking_id): &BookingId) -> String {
    format!("rss:ds:booking_details:{booking_id}")
}

// Persistent Redis
pub fn trip_bookings_key(TripId(trip_id): &TripId) -> String {
    format!("rss:ds:trip_bookings:{trip_id}")
}

// Persistent Redis
pub fn passenger_bookings_key(ActorId(passenger_id): &ActorId) -> String {
    format!("rss:ds:passenger_bookings:{passenger_id}")
}

// Persistent Redis
pub fn auth_token_key(Token(token): &Token) -> String {
    format!("rss:auth:actor:{token}")
}

// Persistent Redis
pub fn sliding_rate_limiter_key(ActorId(actor_id): &ActorId) -> String {
    format!("rss:ratelimit:{actor_id}")
}

// Persistent Redis
pub fn health_check_key() -> String {
    "rss:health_check".to_string()
}

// Non Persistent Redis
pub fn trip_origin_geo_key() -> String {
    "rss:ts:trip_origins".to_string()
}

// Non Persistent Redis
pub fn upcoming_trips_key() -> String {
    "rss:ts:upcoming_trips".to_string()
}

// Non Persistent Redis
pub fn location_history_key(ActorId(actor_id): &ActorId) -> String {
    format!("rss:al:history:{actor_id}")
}

// Non Persistent Redis
pub fn active_actors_key(kind: &ActorKind) -> String {
    format!("rss:al:active:{kind}")
}

// Non Persistent Redis
pub fn last_location_ts_key(ActorId(actor_id): &ActorId) -> String {
    format!("rss:al:last_ts:{actor_id}")
}

// Pub/Sub channel
pub fn location_updates_channel(topic: &ChangeTopic) -> String {
    format!("rss:al:updates:{topic}")
}
