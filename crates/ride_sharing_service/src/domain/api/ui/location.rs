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
    domain::{
        action::ui::location,
        api::ui::token_from_headers,
        types::ui::location::{TripLocationResponse, UpdateLocationRequest},
    },
    environment::AppState,
};

use crate::tools::error::AppError;

#[post("/ui/location")]
pub async fn update_actor_location(
    data: Data<AppState>,
    param_obj: Json<Vec<UpdateLocationRequest>>,
    req: HttpRequest,
) -> Result<Json<APISuccess>, AppError> {
    let request_body = param_obj.into_inner();

    if request_body.is_empty() {
        return Err(AppError::InvalidRequest(
            "Vec<UpdateLocationRequest> is empty".to_string(),
        ));
    }

    let token = token_from_headers(&req)?;

    Ok(Json(
        location::update_actor_location(token, data, request_body).await?,
    ))
}

#[get("/ui/location/{tripId}")]
pub async fn track_trip_location(
    data: Data<AppState>,
    path: Path<String>,
    req: HttpRequest,
) -> Result<Json<TripLocationResponse>, AppError> {
    let trip_id = TripId(path.into_inner());
    let token = token_from_headers(&req)?;

    Ok(Json(
        location::track_trip_location(token, data, trip_id).await?,
    ))
}
