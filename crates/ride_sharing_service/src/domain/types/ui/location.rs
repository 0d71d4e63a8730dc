use crate::common::types::*;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UpdateLocationRequest {
    pub pt: Point,
    pub ts: TimeStamp,
    pub acc: Option<Accuracy>,
    pub speed: Option<SpeedInMetersPerSecond>,
    pub heading: Option<Direction>,
    #[serde(rename = "tripId")]
    pub trip_id: Option<TripId>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TripLocationResponse {
    pub trip_id: TripId,
    pub driver_id: ActorId,
    pub pt: Point,
    pub ts: TimeStamp,
    pub moving: bool,
    pub heading: Option<Direction>,
}
