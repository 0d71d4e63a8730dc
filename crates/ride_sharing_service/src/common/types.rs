/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use chrono::{DateTime, Utc};
use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Deserialize, Serialize, Clone, Debug, Eq, Hash, PartialEq)]
pub struct ActorId(pub String);
#[derive(Deserialize, Serialize, Clone, Debug, Eq, Hash, PartialEq)]
pub struct TripId(pub String);
#[derive(Deserialize, Serialize, Clone, Debug, Eq, Hash, PartialEq)]
pub struct BookingId(pub String);
#[derive(Deserialize, Serialize, Clone, Debug, Eq, PartialEq)]
pub struct SampleId(pub String);
#[derive(Deserialize, Serialize, Clone, Debug, Eq, PartialEq)]
pub struct Token(pub String);
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Copy)]
pub struct Latitude(pub f64);
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Copy)]
pub struct Longitude(pub f64);
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Copy)]
pub struct Direction(pub f64);
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, PartialOrd, Copy)]
pub struct SpeedInMetersPerSecond(pub f64);
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, PartialOrd, Copy)]
pub struct Accuracy(pub f64);
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Hash, Ord)]
pub struct TimeStamp(pub DateTime<Utc>);
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub struct SeatCount(pub u32);
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Copy)]
pub struct Price(pub f64);
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Copy)]
pub struct Radius(pub f64);

#[derive(Debug, Clone, Copy, EnumString, Display, Serialize, Deserialize, Eq, Hash, PartialEq)]
pub enum ActorKind {
    DRIVER,
    PASSENGER,
}

#[derive(Debug, Clone, Copy, EnumString, Display, Serialize, Deserialize, Eq, Hash, PartialEq)]
pub enum TripStatus {
    SCHEDULED,
    ACTIVE,
    COMPLETED,
    CANCELLED,
}

#[derive(Debug, Clone, Copy, EnumString, Display, Serialize, Deserialize, Eq, Hash, PartialEq)]
pub enum BookingStatus {
    PENDING,
    ACCEPTED,
    REJECTED,
    CANCELLED,
}

/// Logical pub/sub topic of the change notifier, one per actor kind.
#[derive(Debug, Clone, Copy, EnumString, Display, Serialize, Deserialize, Eq, Hash, PartialEq)]
pub enum ChangeTopic {
    #[strum(serialize = "DRIVER_LOCATIONS")]
    #[serde(rename = "DRIVER_LOCATIONS")]
    DriverLocations,
    #[strum(serialize = "PASSENGER_LOCATIONS")]
    #[serde(rename = "PASSENGER_LOCATIONS")]
    PassengerLocations,
}

impl From<ActorKind> for ChangeTopic {
    fn from(kind: ActorKind) -> Self {
        match kind {
            ActorKind::DRIVER => ChangeTopic::DriverLocations,
            ActorKind::PASSENGER => ChangeTopic::PassengerLocations,
        }
    }
}

impl From<ChangeTopic> for ActorKind {
    fn from(topic: ChangeTopic) -> Self {
        match topic {
            ChangeTopic::DriverLocations => ActorKind::DRIVER,
            ChangeTopic::PassengerLocations => ActorKind::PASSENGER,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Copy)]
pub struct Point {
    pub lat: Latitude,
    pub lon: Longitude,
}

/// A named endpoint of a trip. Coordinates are optional because riders
/// may post free-text origins/destinations without a geocoded position.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Place {
    pub label: String,
    pub coordinates: Option<Point>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub trip_id: TripId,
    pub driver_id: ActorId,
    pub origin: Place,
    pub destination: Place,
    pub departure_time: TimeStamp,
    pub total_seats: SeatCount,
    pub available_seats: SeatCount,
    pub price: Price,
    pub status: TripStatus,
    pub created_at: TimeStamp,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub booking_id: BookingId,
    pub trip_id: TripId,
    pub passenger_id: ActorId,
    pub seats_requested: SeatCount,
    pub status: BookingStatus,
    pub message: Option<String>,
    pub created_at: TimeStamp,
}

/// One appended location row. Updates never mutate an existing row;
/// only the row with the maximum timestamp per actor is presented.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub sample_id: SampleId,
    pub actor_id: ActorId,
    pub actor_kind: ActorKind,
    pub trip_id: Option<TripId>,
    pub pt: Point,
    pub heading: Option<Direction>,
    pub speed: Option<SpeedInMetersPerSecond>,
    pub acc: Option<Accuracy>,
    pub recorded_at: TimeStamp,
}

impl LocationSample {
    pub fn is_moving(&self) -> bool {
        matches!(self.speed, Some(SpeedInMetersPerSecond(speed)) if speed > 0.0)
    }
}

/// Payload published on a change-notifier channel after a row lands.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub topic: ChangeTopic,
    pub actor_id: ActorId,
    pub recorded_at: TimeStamp,
}

#[derive(Debug, Clone)]
pub struct MultiPolygonBody {
    pub region: String,
    pub multipolygon: MultiPolygon<f64>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct APISuccess {
    result: String,
}

impl Default for APISuccess {
    fn default() -> Self {
        Self {
            result: "Success".to_string(),
        }
    }
}
