/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use crate::call_external_api;
use crate::tools::error::AppError;
use crate::tools::prometheus::CALL_EXTERNAL_API;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::str::FromStr;
use tracing::{error, info};

/// Sends an HTTP request to an external collaborator and deserializes
/// the JSON response.
///
/// Headers are passed as `(name, value)` pairs; the body, when given,
/// is serialized to JSON. Non-success statuses map to
/// `ExternalAPICallError`; the call duration is observed on the
/// `CALL_EXTERNAL_API` histogram either way.
pub async fn call_api<T, U>(
    method: Method,
    url: &Url,
    headers: Vec<(&str, &str)>,
    body: Option<U>,
) -> Result<T, AppError>
where
    T: DeserializeOwned,
    U: Serialize + Debug,
{
    let start_time = std::time::Instant::now();

    let client = Client::new();

    let mut header_map = HeaderMap::new();

    for (header_key, header_value) in headers {
        let header_name = HeaderName::from_str(header_key)
            .map_err(|_| AppError::InvalidRequest(format!("Invalid Header Name : {header_key}")))?;
        let header_value = HeaderValue::from_str(header_value).map_err(|_| {
            AppError::InvalidRequest(format!("Invalid Header Value : {header_value}"))
        })?;

        header_map.insert(header_name, header_value);
    }

    let mut request = client
        .request(method.to_owned(), url.to_owned())
        .headers(header_map);

    if let Some(body) = &body {
        let body = serde_json::to_string(body)
            .map_err(|err| AppError::SerializationError(err.to_string()))?;
        request = request.body(body);
    }

    let host = url.host_str().unwrap_or("unknown").to_string();

    let response = request.send().await.map_err(|err| {
        call_external_api!(
            method.as_str(),
            host.as_str(),
            "CONNECTION_ERROR",
            start_time
        );
        error!(tag = "[External API Call Failed]", error = %err);
        AppError::ExternalAPICallError(err.to_string())
    })?;

    let status = response.status();
    call_external_api!(method.as_str(), host.as_str(), status.as_str(), start_time);

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!(
            tag = "[External API Call Failed]",
            status = %status,
            response = %body
        );
        return Err(AppError::ExternalAPICallError(format!(
            "{status} : {body}"
        )));
    }

    info!(tag = "[External API Call]", status = %status, url = %url);

    response
        .json::<T>()
        .await
        .map_err(|err| AppError::DeserializationError(err.to_string()))
}
