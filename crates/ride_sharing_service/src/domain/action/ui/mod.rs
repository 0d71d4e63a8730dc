/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
pub mod booking;
pub mod location;
pub mod trip;

use crate::common::types::Token;
use crate::environment::AppState;
use crate::outbound::external::authenticate_actor;
use crate::outbound::types::AuthResponseData;
use crate::redis::keys::auth_token_key;
use crate::tools::error::AppError;
use actix_web::web::Data;

/// Resolves a bearer token to an actor, with a Redis-cached mapping in
/// front of the auth collaborator.
pub async fn authenticate(
    data: &Data<AppState>,
    token: &Token,
) -> Result<AuthResponseData, AppError> {
    if let Some(cached) = data.persistent_redis.get_key(&auth_token_key(token)).await? {
        return serde_json::from_str::<AuthResponseData>(&cached)
            .map_err(|err| AppError::DeserializationError(err.to_string()));
    }

    let response = authenticate_actor(&data.auth_url, token, &data.auth_api_key).await?;

    let serialized = serde_json::to_string(&response)
        .map_err(|err| AppError::SerializationError(err.to_string()))?;
    data.persistent_redis
        .set_with_expiry(&auth_token_key(token), serialized, data.auth_token_expiry)
        .await?;

    Ok(response)
}
