/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use actix_web::{
    get, post,
    web::{Data, Json, Path},
    HttpRequest,
};

use crate::{
    common::types::*,
    domain::{action::ui::booking, api::ui::token_from_headers, types::ui::booking::*},
    environment::AppState,
};

use crate::tools::error::AppError;

#[post("/ui/booking")]
pub async fn create_booking(
    data: Data<AppState>,
    param_obj: Json<CreateBookingRequest>,
    req: HttpRequest,
) -> Result<Json<CreateBookingResponse>, AppError> {
    let token = token_from_headers(&req)?;

    Ok(Json(
        booking::create_booking(token, data, param_obj.into_inner()).await?,
    ))
}

#[post("/ui/booking/{bookingId}/respond")]
pub async fn respond_to_booking(
    data: Data<AppState>,
    path: Path<String>,
    param_obj: Json<BookingVerdictRequest>,
    req: HttpRequest,
) -> Result<Json<APISuccess>, AppError> {
    let booking_id = BookingId(path.into_inner());
    let token = token_from_headers(&req)?;

    Ok(Json(
        booking::respond_to_booking(token, data, booking_id, param_obj.into_inner()).await?,
    ))
}

#[post("/ui/booking/{bookingId}/cancel")]
pub async fn cancel_booking(
    data: Data<AppState>,
    path: Path<String>,
    req: HttpRequest,
) -> Result<Json<APISuccess>, AppError> {
    let booking_id = BookingId(path.into_inner());
    let token = token_from_headers(&req)?;

    Ok(Json(
        booking::cancel_booking(token, data, booking_id).await?,
    ))
}

#[get("/ui/trip/{tripId}/bookings")]
pub async fn list_trip_bookings(
    data: Data<AppState>,
    path: Path<String>,
    req: HttpRequest,
) -> Result<Json<TripBookingsResponse>, AppError> {
    let trip_id = TripId(path.into_inner());
    let token = token_from_headers(&req)?;

    Ok(Json(
        booking::list_trip_bookings(token, data, trip_id).await?,
    ))
}
