use crate::common::types::*;
use crate::common::utils::{distance_between_in_meters, get_region};
use crate::domain::action::ui::authenticate;
use crate::domain::types::ui::trip::*;
use crate::environment::AppState;
use crate::redis::commands::{
    add_trip_to_search_index, delete_trip_details, get_trip_details,
    remove_trip_from_search_index, search_trip_ids_by_origin, set_trip_details,
};
use crate::tools::error::AppError;
use actix_web::web::Data;
use chrono::Utc;
use uuid::Uuid;

/// Driver-initiated lifecycle: SCHEDULED -> ACTIVE -> COMPLETED, with
/// CANCELLED reachable while the trip has not completed.
pub fn validate_status_transition(trip: &Trip, to: TripStatus) -> Result<(), AppError> {
    use TripStatus::*;

    let allowed = matches!(
        (trip.status, to),
        (SCHEDULED, ACTIVE) | (ACTIVE, COMPLETED) | (SCHEDULED, CANCELLED) | (ACTIVE, CANCELLED)
    );

    if allowed {
        Ok(())
    } else {
        let TripId(trip_id) = &trip.trip_id;
        Err(AppError::InvalidTripStatus(
            trip_id.to_string(),
            trip.status.to_string(),
        ))
    }
}

pub async fn create_trip(
    token: Token,
    data: Data<AppState>,
    request_body: CreateTripRequest,
) -> Result<CreateTripResponse, AppError> {
    let auth = authenticate(&data, &token).await?;

    if auth.actor_kind != ActorKind::DRIVER {
        return Err(AppError::PermissionDenied(
            "only drivers may post trips".to_string(),
        ));
    }

    let TimeStamp(departure_time) = request_body.departure_time;
    if departure_time <= Utc::now() {
        return Err(AppError::DepartureInPast);
    }

    let SeatCount(seats) = request_body.seats;
    if seats == 0 {
        return Err(AppError::InvalidRequest(
            "seat count must be positive".to_string(),
        ));
    }

    if let Some(pt) = request_body.origin.coordinates {
        get_region(&pt.lat, &pt.lon, &data.polygon)?;
    }

    let trip = Trip {
        trip_id: TripId(Uuid::new_v4().to_string()),
        driver_id: auth.actor_id,
        origin: request_body.origin,
        destination: request_body.destination,
        departure_time: request_body.departure_time,
        total_seats: request_body.seats,
        available_seats: request_body.seats,
        price: request_body.price,
        status: TripStatus::SCHEDULED,
        created_at: TimeStamp(Utc::now()),
    };

    set_trip_details(&data.persistent_redis, &data.redis_expiry, &trip).await?;
    add_trip_to_search_index(&data.non_persistent_redis, &trip).await?;

    Ok(CreateTripResponse {
        trip_id: trip.trip_id,
    })
}

pub async fn get_trip(data: Data<AppState>, trip_id: TripId) -> Result<Trip, AppError> {
    let TripId(raw_trip_id) = &trip_id;

    get_trip_details(&data.persistent_redis, &trip_id)
        .await?
        .ok_or_else(|| AppError::TripNotFound(raw_trip_id.to_string()))
}

pub async fn update_trip_status(
    token: Token,
    data: Data<AppState>,
    trip_id: TripId,
    request_body: TripStatusUpdateRequest,
) -> Result<APISuccess, AppError> {
    let auth = authenticate(&data, &token).await?;

    let TripId(raw_trip_id) = &trip_id;
    let trip = get_trip_details(&data.persistent_redis, &trip_id)
        .await?
        .ok_or_else(|| AppError::TripNotFound(raw_trip_id.to_string()))?;

    if trip.driver_id != auth.actor_id {
        return Err(AppError::PermissionDenied(
            "only the trip's driver may change its status".to_string(),
        ));
    }

    validate_status_transition(&trip, request_body.status)?;

    let updated = Trip {
        status: request_body.status,
        ..trip
    };
    set_trip_details(&data.persistent_redis, &data.redis_expiry, &updated).await?;

    // Completed and cancelled trips stop being searchable.
    if matches!(
        request_body.status,
        TripStatus::COMPLETED | TripStatus::CANCELLED
    ) {
        remove_trip_from_search_index(&data.non_persistent_redis, &trip_id).await?;
    }

    Ok(APISuccess::default())
}

pub async fn delete_trip(
    token: Token,
    data: Data<AppState>,
    trip_id: TripId,
) -> Result<APISuccess, AppError> {
    let auth = authenticate(&data, &token).await?;

    let TripId(raw_trip_id) = &trip_id;
    let trip = get_trip_details(&data.persistent_redis, &trip_id)
        .await?
        .ok_or_else(|| AppError::TripNotFound(raw_trip_id.to_string()))?;

    if trip.driver_id != auth.actor_id {
        return Err(AppError::PermissionDenied(
            "only the trip's driver may delete it".to_string(),
        ));
    }

    remove_trip_from_search_index(&data.non_persistent_redis, &trip_id).await?;
    delete_trip_details(&data.persistent_redis, &trip_id).await?;

    Ok(APISuccess::default())
}

/// Proximity search over scheduled trips, optionally narrowed by
/// destination label and earliest departure.
pub async fn search_trips(
    data: Data<AppState>,
    request_body: SearchTripsRequest,
) -> Result<SearchTripsResponse, AppError> {
    let radius = request_body.radius.unwrap_or(data.default_search_radius);
    let departure_after = request_body
        .departure_after
        .unwrap_or(TimeStamp(Utc::now()));

    let trip_ids =
        search_trip_ids_by_origin(&data.non_persistent_redis, &request_body.origin, &radius)
            .await?;

    let destination_filter = request_body
        .destination
        .as_ref()
        .map(|destination| destination.to_lowercase());

    let mut trips = Vec::new();
    for trip_id in trip_ids {
        // The index may be ahead of the record store; missing records
        // are skipped rather than failing the whole search.
        let Some(trip) = get_trip_details(&data.persistent_redis, &trip_id).await? else {
            continue;
        };

        if trip.status != TripStatus::SCHEDULED || trip.departure_time < departure_after {
            continue;
        }

        // The geo index can lag the record store after edits; re-check
        // the distance against the current origin coordinates.
        if let Some(origin) = trip.origin.coordinates {
            let Radius(radius_km) = radius;
            if distance_between_in_meters(&request_body.origin, &origin) > radius_km * 1000.0 {
                continue;
            }
        }

        if let Some(destination) = &destination_filter {
            if !trip
                .destination
                .label
                .to_lowercase()
                .contains(destination.as_str())
            {
                continue;
            }
        }

        trips.push(trip);
    }

    Ok(SearchTripsResponse { trips })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip_with_status(status: TripStatus) -> Trip {
        Trip {
            trip_id: TripId("trip-1".to_string()),
            driver_id: ActorId("driver-1".to_string()),
            origin: Place {
                label: "A".to_string(),
                coordinates: None,
            },
            destination: Place {
                label: "B".to_string(),
                coordinates: None,
            },
            departure_time: TimeStamp(Utc::now()),
            total_seats: SeatCount(3),
            available_seats: SeatCount(3),
            price: Price(100.0),
            status,
            created_at: TimeStamp(Utc::now()),
        }
    }

    #[test]
    fn scheduled_trips_can_activate_or_cancel() {
        let trip = trip_with_status(TripStatus::SCHEDULED);
        assert!(validate_status_transition(&trip, TripStatus::ACTIVE).is_ok());
        assert!(validate_status_transition(&trip, TripStatus::CANCELLED).is_ok());
        assert!(validate_status_transition(&trip, TripStatus::COMPLETED).is_err());
    }

    #[test]
    fn active_trips_can_complete_or_cancel() {
        let trip = trip_with_status(TripStatus::ACTIVE);
        assert!(validate_status_transition(&trip, TripStatus::COMPLETED).is_ok());
        assert!(validate_status_transition(&trip, TripStatus::CANCELLED).is_ok());
        assert!(validate_status_transition(&trip, TripStatus::SCHEDULED).is_err());
    }

    #[test]
    fn terminal_trips_cannot_transition() {
        for status in [TripStatus::COMPLETED, TripStatus::CANCELLED] {
            let trip = trip_with_status(status);
            for to in [
                TripStatus::SCHEDULED,
                TripStatus::ACTIVE,
                TripStatus::COMPLETED,
                TripStatus::CANCELLED,
            ] {
                assert!(validate_status_transition(&trip, to).is_err());
            }
        }
    }
}
