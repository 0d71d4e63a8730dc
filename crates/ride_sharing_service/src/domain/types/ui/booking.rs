use crate::common::types::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub trip_id: TripId,
    pub seats_requested: SeatCount,
    pub message: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingResponse {
    pub booking_id: BookingId,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Copy, EnumString, Display, Serialize, Deserialize, Eq, PartialEq)]
pub enum BookingVerdict {
    ACCEPT,
    REJECT,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BookingVerdictRequest {
    pub verdict: BookingVerdict,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TripBookingsResponse {
    pub bookings: Vec<Booking>,
}
