/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use actix_web::{
    delete, get, post,
    web::{Data, Json, Path},
    HttpRequest,
};

use crate::{
    common::types::*,
    domain::{action::ui::trip, api::ui::token_from_headers, types::ui::trip::*},
    environment::AppState,
};

use crate::tools::error::AppError;

#[post("/ui/trip")]
pub async fn create_trip(
    data: Data<AppState>,
    param_obj: Json<CreateTripRequest>,
    req: HttpRequest,
) -> Result<Json<CreateTripResponse>, AppError> {
    let token = token_from_headers(&req)?;

    Ok(Json(
        trip::create_trip(token, data, param_obj.into_inner()).await?,
    ))
}

#[post("/ui/trip/search")]
pub async fn search_trips(
    data: Data<AppState>,
    param_obj: Json<SearchTripsRequest>,
) -> Result<Json<SearchTripsResponse>, AppError> {
    Ok(Json(
        trip::search_trips(data, param_obj.into_inner()).await?,
    ))
}

#[get("/ui/trip/{tripId}")]
pub async fn get_trip(data: Data<AppState>, path: Path<String>) -> Result<Json<Trip>, AppError> {
    let trip_id = TripId(path.into_inner());

    Ok(Json(trip::get_trip(data, trip_id).await?))
}

#[post("/ui/trip/{tripId}/status")]
pub async fn update_trip_status(
    data: Data<AppState>,
    path: Path<String>,
    param_obj: Json<TripStatusUpdateRequest>,
    req: HttpRequest,
) -> Result<Json<APISuccess>, AppError> {
    let trip_id = TripId(path.into_inner());
    let token = token_from_headers(&req)?;

    Ok(Json(
        trip::update_trip_status(token, data, trip_id, param_obj.into_inner()).await?,
    ))
}

#[delete("/ui/trip/{tripId}")]
pub async fn delete_trip(
    data: Data<AppState>,
    path: Path<String>,
    req: HttpRequest,
) -> Result<Json<APISuccess>, AppError> {
    let trip_id = TripId(path.into_inner());
    let token = token_from_headers(&req)?;

    Ok(Json(trip::delete_trip(token, data, trip_id).await?))
}
