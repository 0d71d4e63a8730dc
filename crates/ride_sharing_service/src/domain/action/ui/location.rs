use crate::common::latest_location::latest_per_actor;
use crate::common::sliding_window_rate_limiter::sliding_window_limiter;
use crate::common::types::*;
use crate::common::utils::get_region;
use crate::domain::action::ui::authenticate;
use crate::domain::types::ui::location::*;
use crate::environment::AppState;
use crate::redis::commands::{
    get_booking_details, get_last_location_ts, get_location_rows, get_trip_booking_ids,
    get_trip_details, set_last_location_ts,
};
use crate::redis::keys::sliding_rate_limiter_key;
use crate::tools::error::AppError;
use crate::tracking::ingestor::SampleSink;
use actix_web::web::Data;
use tracing::info;
use uuid::Uuid;

/// Appends a batch of position rows for the authenticated actor.
///
/// Rows are sorted by timestamp; rows older than the actor's last
/// persisted timestamp or worse than the accuracy cutoff are dropped.
/// Each surviving row is a fresh insert, never an update.
pub async fn update_actor_location(
    token: Token,
    data: Data<AppState>,
    mut request_body: Vec<UpdateLocationRequest>,
) -> Result<APISuccess, AppError> {
    let auth = authenticate(&data, &token).await?;

    let first = request_body.first().ok_or_else(|| {
        AppError::InvalidRequest("Vec<UpdateLocationRequest> is empty".to_string())
    })?;
    get_region(&first.pt.lat, &first.pt.lon, &data.polygon)?;

    sliding_window_limiter(
        &data.persistent_redis,
        &sliding_rate_limiter_key(&auth.actor_id),
        data.location_update_limit,
        data.location_update_interval as u32,
    )
    .await?;

    request_body.sort_by(|a, b| (a.ts).cmp(&b.ts));

    let ActorId(actor_id) = &auth.actor_id;
    info!(
        tag = "[Location Updates]",
        actor_id = %actor_id,
        count = request_body.len()
    );

    let last_ts = get_last_location_ts(&data.non_persistent_redis, &auth.actor_id).await?;
    let Accuracy(accuracy_cutoff) = data.max_location_accuracy;

    let filtered_request_body: Vec<UpdateLocationRequest> = request_body
        .into_iter()
        .filter(|request| {
            request
                .acc
                .map_or(true, |Accuracy(acc)| acc <= accuracy_cutoff)
                && last_ts.map_or(true, |last| request.ts >= last)
        })
        .collect();

    if let Some(latest) = filtered_request_body.last() {
        set_last_location_ts(
            &data.non_persistent_redis,
            &data.last_location_timestamp_expiry,
            &auth.actor_id,
            &latest.ts,
        )
        .await?;
    }

    for loc in filtered_request_body {
        let sample = LocationSample {
            sample_id: SampleId(Uuid::new_v4().to_string()),
            actor_id: auth.actor_id.clone(),
            actor_kind: auth.actor_kind,
            trip_id: loc.trip_id,
            pt: loc.pt,
            heading: loc.heading,
            speed: loc.speed,
            acc: loc.acc,
            recorded_at: loc.ts,
        };
        data.location_store.submit_sample(sample).await?;
    }

    Ok(APISuccess::default())
}

/// Latest known driver position for a trip, visible only to the trip's
/// driver and to passengers holding an accepted booking on it.
pub async fn track_trip_location(
    token: Token,
    data: Data<AppState>,
    trip_id: TripId,
) -> Result<TripLocationResponse, AppError> {
    let auth = authenticate(&data, &token).await?;

    let TripId(raw_trip_id) = &trip_id;
    let trip = get_trip_details(&data.persistent_redis, &trip_id)
        .await?
        .ok_or_else(|| AppError::TripNotFound(raw_trip_id.to_string()))?;

    authorize_trip_visibility(&data, &trip, &auth.actor_id).await?;

    let rows = get_location_rows(
        &data.non_persistent_redis,
        std::slice::from_ref(&trip.driver_id),
        data.feed_rows_per_actor,
    )
    .await?;

    let ActorId(raw_driver_id) = &trip.driver_id;
    let latest = latest_per_actor(rows)
        .remove(&trip.driver_id)
        .ok_or_else(|| AppError::DriverLocationNotFound(raw_driver_id.to_string()))?;

    let moving = latest.is_moving();
    Ok(TripLocationResponse {
        trip_id,
        driver_id: trip.driver_id,
        pt: latest.pt,
        ts: latest.recorded_at,
        moving,
        heading: latest.heading,
    })
}

async fn authorize_trip_visibility(
    data: &Data<AppState>,
    trip: &Trip,
    actor_id: &ActorId,
) -> Result<(), AppError> {
    if trip.driver_id == *actor_id {
        return Ok(());
    }

    for booking_id in get_trip_booking_ids(&data.persistent_redis, &trip.trip_id).await? {
        if let Some(booking) = get_booking_details(&data.persistent_redis, &booking_id).await? {
            if booking.passenger_id == *actor_id && booking.status == BookingStatus::ACCEPTED {
                return Ok(());
            }
        }
    }

    Err(AppError::PermissionDenied(
        "trip location is visible only to its participants".to_string(),
    ))
}
