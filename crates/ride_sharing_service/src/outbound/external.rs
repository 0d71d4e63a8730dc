/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use super::types::*;
use crate::common::types::*;
use crate::tools::callapi::call_api;
use crate::tools::error::AppError;
use crate::tools::prometheus::BOOKING_STATUS_UPDATES;
use async_trait::async_trait;
use reqwest::{Method, Url};
use tracing::error;

pub async fn authenticate_actor(
    auth_url: &Url,
    Token(token): &Token,
    auth_api_key: &str,
) -> Result<AuthResponseData, AppError> {
    call_api::<AuthResponseData, String>(
        Method::GET,
        auth_url,
        vec![
            ("content-type", "application/json"),
            ("token", token),
            ("api-key", auth_api_key),
        ],
        None,
    )
    .await
}

/// Delivery channel for booking status callbacks.
#[async_trait]
pub trait BookingStatusDispatcher: Send + Sync {
    async fn dispatch(&self, update: &BookingStatusUpdate) -> Result<(), AppError>;
}

pub struct HttpBookingStatusDispatcher {
    pub callback_url: Url,
    pub api_key: String,
}

#[async_trait]
impl BookingStatusDispatcher for HttpBookingStatusDispatcher {
    async fn dispatch(&self, update: &BookingStatusUpdate) -> Result<(), AppError> {
        call_api::<APISuccess, &BookingStatusUpdate>(
            Method::POST,
            &self.callback_url,
            vec![
                ("content-type", "application/json"),
                ("api-key", self.api_key.as_str()),
            ],
            Some(update),
        )
        .await
        .map(|_| ())
    }
}

/// Fire-and-forget dispatch after a booking status write. A failed
/// delivery is logged and dropped; it never surfaces to the caller and
/// never touches the persisted status.
pub async fn notify_booking_status(
    dispatcher: &dyn BookingStatusDispatcher,
    update: BookingStatusUpdate,
) {
    BOOKING_STATUS_UPDATES
        .with_label_values(&[update.status.to_string().as_str()])
        .inc();

    if let Err(err) = dispatcher.dispatch(&update).await {
        let BookingId(booking_id) = &update.booking_id;
        error!(
            tag = "[Booking Notification Failed]",
            booking_id = %booking_id,
            error = %err
        );
    }
}
