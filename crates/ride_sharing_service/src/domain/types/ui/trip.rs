use crate::common::types::*;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripRequest {
    pub origin: Place,
    pub destination: Place,
    pub departure_time: TimeStamp,
    pub seats: SeatCount,
    pub price: Price,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripResponse {
    pub trip_id: TripId,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TripStatusUpdateRequest {
    pub status: TripStatus,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SearchTripsRequest {
    pub origin: Point,
    pub radius: Option<Radius>,
    pub departure_after: Option<TimeStamp>,
    pub destination: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SearchTripsResponse {
    pub trips: Vec<Trip>,
}
