/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use actix_web::{
    http::{header::ContentType, StatusCode},
    HttpResponse, ResponseError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    error_message: String,
    pub error_code: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InternalError(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    UnprocessibleRequest(String),
    #[error("Content length ({0} Bytes) greater than allowed maximum limit : ({1} Bytes)")]
    LargePayloadSize(usize, usize),
    #[error("{0}")]
    SerializationError(String),
    #[error("{0}")]
    DeserializationError(String),
    #[error("{0}")]
    ExternalAPICallError(String),
    #[error("Authentication failed")]
    AuthFailed,
    #[error("Token expired")]
    TokenExpired,
    #[error("Location access requires a secure transport context")]
    InsecureContext,
    #[error("Permission denied : {0}")]
    PermissionDenied(String),
    #[error("Write rejected by store : {0}")]
    WriteFailed(String),
    #[error("Read failed : {0}")]
    ReadFailed(String),
    #[error("Trip not found : {0}")]
    TripNotFound(String),
    #[error("Booking not found : {0}")]
    BookingNotFound(String),
    #[error("Driver location not found : {0}")]
    DriverLocationNotFound(String),
    #[error("Requested {0} seats but only {1} available")]
    NotEnoughSeats(u32, u32),
    #[error("A driver cannot book a seat on their own trip")]
    SelfBookingNotAllowed,
    #[error("Departure time is in the past")]
    DepartureInPast,
    #[error("Invalid Trip Status : TripId - {0}, Trip Status - {1}")]
    InvalidTripStatus(String, String),
    #[error("Invalid Booking Status : BookingId - {0}, Booking Status - {1}")]
    InvalidBookingStatus(String, String),
    #[error("Location is unserviceable : (Lat : {0}, Lon : {1})")]
    Unserviceable(f64, f64),
    #[error("{0}")]
    HitsLimitExceeded(String),
    #[error("Request timed out")]
    RequestTimeout,
    #[error("Kafka Push Failed : {0}")]
    KafkaPushFailed(String),
}

impl AppError {
    fn error_message(&self) -> ErrorBody {
        ErrorBody {
            error_message: self.to_string(),
            error_code: self.code(),
        }
    }

    pub fn code(&self) -> String {
        match self {
            AppError::InternalError(_) => "INTERNAL_ERROR",
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::UnprocessibleRequest(_) => "UNPROCESSIBLE_REQUEST",
            AppError::LargePayloadSize(_, _) => "LARGE_PAYLOAD_SIZE",
            AppError::SerializationError(_) => "SERIALIZATION_ERROR",
            AppError::DeserializationError(_) => "DESERIALIZATION_ERROR",
            AppError::ExternalAPICallError(_) => "EXTERNAL_API_CALL_ERROR",
            AppError::AuthFailed => "INVALID_TOKEN",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::InsecureContext => "INSECURE_CONTEXT",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::WriteFailed(_) => "WRITE_FAILED",
            AppError::ReadFailed(_) => "READ_FAILED",
            AppError::TripNotFound(_) => "TRIP_NOT_FOUND",
            AppError::BookingNotFound(_) => "BOOKING_NOT_FOUND",
            AppError::DriverLocationNotFound(_) => "DRIVER_LOCATION_NOT_FOUND",
            AppError::NotEnoughSeats(_, _) => "NOT_ENOUGH_SEATS",
            AppError::SelfBookingNotAllowed => "SELF_BOOKING_NOT_ALLOWED",
            AppError::DepartureInPast => "DEPARTURE_IN_PAST",
            AppError::InvalidTripStatus(_, _) => "INVALID_TRIP_STATUS",
            AppError::InvalidBookingStatus(_, _) => "INVALID_BOOKING_STATUS",
            AppError::Unserviceable(_, _) => "LOCATION_NOT_SERVICEABLE",
            AppError::HitsLimitExceeded(_) => "HITS_LIMIT_EXCEED",
            AppError::RequestTimeout => "REQUEST_TIMEOUT",
            AppError::KafkaPushFailed(_) => "KAFKA_PUSH_FAILED",
        }
        .to_string()
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(self.error_message())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UnprocessibleRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::LargePayloadSize(_, _) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::DeserializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ExternalAPICallError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::AuthFailed => StatusCode::UNAUTHORIZED,
            AppError::TokenExpired => StatusCode::BAD_REQUEST,
            AppError::InsecureContext => StatusCode::FORBIDDEN,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::WriteFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ReadFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::TripNotFound(_) => StatusCode::NOT_FOUND,
            AppError::BookingNotFound(_) => StatusCode::NOT_FOUND,
            AppError::DriverLocationNotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotEnoughSeats(_, _) => StatusCode::BAD_REQUEST,
            AppError::SelfBookingNotAllowed => StatusCode::BAD_REQUEST,
            AppError::DepartureInPast => StatusCode::BAD_REQUEST,
            AppError::InvalidTripStatus(_, _) => StatusCode::BAD_REQUEST,
            AppError::InvalidBookingStatus(_, _) => StatusCode::BAD_REQUEST,
            AppError::Unserviceable(_, _) => StatusCode::BAD_REQUEST,
            AppError::HitsLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            AppError::KafkaPushFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
