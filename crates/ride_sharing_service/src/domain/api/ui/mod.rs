/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
pub mod booking;
pub mod healthcheck;
pub mod location;
pub mod trip;

use crate::common::types::Token;
use crate::tools::error::AppError;
use actix_web::HttpRequest;

pub fn token_from_headers(req: &HttpRequest) -> Result<Token, AppError> {
    req.headers()
        .get("token")
        .and_then(|header_value| header_value.to_str().ok())
        .map(|token| Token(token.to_string()))
        .ok_or(AppError::InvalidRequest("Token not found".to_string()))
}
