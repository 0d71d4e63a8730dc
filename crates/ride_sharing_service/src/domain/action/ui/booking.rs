use crate::common::types::*;
use crate::domain::action::ui::authenticate;
use crate::domain::types::ui::booking::*;
use crate::environment::AppState;
use crate::outbound::external::notify_booking_status;
use crate::outbound::types::BookingStatusUpdate;
use crate::redis::commands::{
    get_booking_details, get_trip_booking_ids, get_trip_details, index_booking,
    set_booking_details, set_trip_details,
};
use crate::tools::error::AppError;
use actix_web::web::Data;
use chrono::Utc;
use uuid::Uuid;

/// Guard for a new booking request. Checked before anything is
/// persisted; a failed guard leaves no row behind.
pub fn validate_booking_request(
    trip: &Trip,
    passenger_id: &ActorId,
    SeatCount(seats_requested): SeatCount,
) -> Result<(), AppError> {
    if trip.driver_id == *passenger_id {
        return Err(AppError::SelfBookingNotAllowed);
    }

    if trip.status != TripStatus::SCHEDULED {
        let TripId(trip_id) = &trip.trip_id;
        return Err(AppError::InvalidTripStatus(
            trip_id.to_string(),
            trip.status.to_string(),
        ));
    }

    let TimeStamp(departure_time) = trip.departure_time;
    if departure_time <= Utc::now() {
        return Err(AppError::DepartureInPast);
    }

    if seats_requested == 0 {
        return Err(AppError::InvalidRequest(
            "seat count must be positive".to_string(),
        ));
    }

    let SeatCount(available) = trip.available_seats;
    if seats_requested > available {
        return Err(AppError::NotEnoughSeats(seats_requested, available));
    }

    Ok(())
}

/// Guard for a driver verdict on a booking.
pub fn validate_booking_response(
    trip: &Trip,
    booking: &Booking,
    actor_id: &ActorId,
) -> Result<(), AppError> {
    if trip.driver_id != *actor_id {
        return Err(AppError::PermissionDenied(
            "only the trip's driver may respond to bookings".to_string(),
        ));
    }

    if booking.status != BookingStatus::PENDING {
        let BookingId(booking_id) = &booking.booking_id;
        return Err(AppError::InvalidBookingStatus(
            booking_id.to_string(),
            booking.status.to_string(),
        ));
    }

    Ok(())
}

/// Guard for a passenger cancelling their own booking.
pub fn validate_booking_cancellation(
    booking: &Booking,
    actor_id: &ActorId,
) -> Result<(), AppError> {
    if booking.passenger_id != *actor_id {
        return Err(AppError::PermissionDenied(
            "only the booking's passenger may cancel it".to_string(),
        ));
    }

    if !matches!(
        booking.status,
        BookingStatus::PENDING | BookingStatus::ACCEPTED
    ) {
        let BookingId(booking_id) = &booking.booking_id;
        return Err(AppError::InvalidBookingStatus(
            booking_id.to_string(),
            booking.status.to_string(),
        ));
    }

    Ok(())
}

pub async fn create_booking(
    token: Token,
    data: Data<AppState>,
    request_body: CreateBookingRequest,
) -> Result<CreateBookingResponse, AppError> {
    let auth = authenticate(&data, &token).await?;

    let TripId(raw_trip_id) = &request_body.trip_id;
    let trip = get_trip_details(&data.persistent_redis, &request_body.trip_id)
        .await?
        .ok_or_else(|| AppError::TripNotFound(raw_trip_id.to_string()))?;

    validate_booking_request(&trip, &auth.actor_id, request_body.seats_requested)?;

    let booking = Booking {
        booking_id: BookingId(Uuid::new_v4().to_string()),
        trip_id: request_body.trip_id,
        passenger_id: auth.actor_id,
        seats_requested: request_body.seats_requested,
        status: BookingStatus::PENDING,
        message: request_body.message,
        created_at: TimeStamp(Utc::now()),
    };

    set_booking_details(&data.persistent_redis, &data.redis_expiry, &booking).await?;
    index_booking(&data.persistent_redis, &booking).await?;

    Ok(CreateBookingResponse {
        booking_id: booking.booking_id,
        status: booking.status,
    })
}

/// Driver accepts or rejects a pending booking. The status write
/// happens first; the notification dispatch afterwards is fire and
/// forget, so its outcome cannot alter the persisted status.
pub async fn respond_to_booking(
    token: Token,
    data: Data<AppState>,
    booking_id: BookingId,
    request_body: BookingVerdictRequest,
) -> Result<APISuccess, AppError> {
    let auth = authenticate(&data, &token).await?;

    let BookingId(raw_booking_id) = &booking_id;
    let booking = get_booking_details(&data.persistent_redis, &booking_id)
        .await?
        .ok_or_else(|| AppError::BookingNotFound(raw_booking_id.to_string()))?;

    let TripId(raw_trip_id) = &booking.trip_id;
    let trip = get_trip_details(&data.persistent_redis, &booking.trip_id)
        .await?
        .ok_or_else(|| AppError::TripNotFound(raw_trip_id.to_string()))?;

    validate_booking_response(&trip, &booking, &auth.actor_id)?;

    let status = match request_body.verdict {
        BookingVerdict::ACCEPT => {
            let SeatCount(requested) = booking.seats_requested;
            let SeatCount(available) = trip.available_seats;
            if requested > available {
                return Err(AppError::NotEnoughSeats(requested, available));
            }

            let updated_trip = Trip {
                available_seats: SeatCount(available - requested),
                ..trip
            };
            set_trip_details(&data.persistent_redis, &data.redis_expiry, &updated_trip).await?;

            BookingStatus::ACCEPTED
        }
        BookingVerdict::REJECT => BookingStatus::REJECTED,
    };

    let updated_booking = Booking { status, ..booking };
    set_booking_details(&data.persistent_redis, &data.redis_expiry, &updated_booking).await?;

    notify_booking_status(
        data.booking_status_dispatcher.as_ref(),
        BookingStatusUpdate {
            booking_id: updated_booking.booking_id,
            trip_id: updated_booking.trip_id,
            passenger_id: updated_booking.passenger_id,
            status: updated_booking.status,
            seats_requested: updated_booking.seats_requested,
        },
    )
    .await;

    Ok(APISuccess::default())
}

pub async fn cancel_booking(
    token: Token,
    data: Data<AppState>,
    booking_id: BookingId,
) -> Result<APISuccess, AppError> {
    let auth = authenticate(&data, &token).await?;

    let BookingId(raw_booking_id) = &booking_id;
    let booking = get_booking_details(&data.persistent_redis, &booking_id)
        .await?
        .ok_or_else(|| AppError::BookingNotFound(raw_booking_id.to_string()))?;

    validate_booking_cancellation(&booking, &auth.actor_id)?;

    // Seats held by an accepted booking go back on sale.
    if booking.status == BookingStatus::ACCEPTED {
        if let Some(trip) = get_trip_details(&data.persistent_redis, &booking.trip_id).await? {
            let SeatCount(available) = trip.available_seats;
            let SeatCount(requested) = booking.seats_requested;
            let updated_trip = Trip {
                available_seats: SeatCount(available + requested),
                ..trip
            };
            set_trip_details(&data.persistent_redis, &data.redis_expiry, &updated_trip).await?;
        }
    }

    let updated_booking = Booking {
        status: BookingStatus::CANCELLED,
        ..booking
    };
    set_booking_details(&data.persistent_redis, &data.redis_expiry, &updated_booking).await?;

    Ok(APISuccess::default())
}

pub async fn list_trip_bookings(
    token: Token,
    data: Data<AppState>,
    trip_id: TripId,
) -> Result<TripBookingsResponse, AppError> {
    let auth = authenticate(&data, &token).await?;

    let TripId(raw_trip_id) = &trip_id;
    let trip = get_trip_details(&data.persistent_redis, &trip_id)
        .await?
        .ok_or_else(|| AppError::TripNotFound(raw_trip_id.to_string()))?;

    if trip.driver_id != auth.actor_id {
        return Err(AppError::PermissionDenied(
            "only the trip's driver may list its bookings".to_string(),
        ));
    }

    let mut bookings = Vec::new();
    for booking_id in get_trip_booking_ids(&data.persistent_redis, &trip_id).await? {
        if let Some(booking) = get_booking_details(&data.persistent_redis, &booking_id).await? {
            bookings.push(booking);
        }
    }

    Ok(TripBookingsResponse { bookings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn scheduled_trip() -> Trip {
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
            departure_time: TimeStamp(Utc::now() + Duration::hours(2)),
            total_seats: SeatCount(3),
            available_seats: SeatCount(3),
            price: Price(100.0),
            status: TripStatus::SCHEDULED,
            created_at: TimeStamp(Utc::now()),
        }
    }

    fn pending_booking() -> Booking {
        Booking {
            booking_id: BookingId("booking-1".to_string()),
            trip_id: TripId("trip-1".to_string()),
            passenger_id: ActorId("passenger-1".to_string()),
            seats_requested: SeatCount(2),
            status: BookingStatus::PENDING,
            message: None,
            created_at: TimeStamp(Utc::now()),
        }
    }

    #[test]
    fn seats_exceeding_availability_are_rejected() {
        let trip = scheduled_trip();
        let outcome =
            validate_booking_request(&trip, &ActorId("passenger-1".to_string()), SeatCount(4));

        assert!(matches!(outcome, Err(AppError::NotEnoughSeats(4, 3))));
    }

    #[test]
    fn drivers_cannot_book_their_own_trip() {
        let trip = scheduled_trip();
        let outcome = validate_booking_request(&trip, &trip.driver_id.clone(), SeatCount(1));

        assert!(matches!(outcome, Err(AppError::SelfBookingNotAllowed)));
    }

    #[test]
    fn bookings_on_departed_trips_are_rejected() {
        let trip = Trip {
            departure_time: TimeStamp(Utc::now() - Duration::hours(1)),
            ..scheduled_trip()
        };
        let outcome =
            validate_booking_request(&trip, &ActorId("passenger-1".to_string()), SeatCount(1));

        assert!(matches!(outcome, Err(AppError::DepartureInPast)));
    }

    #[test]
    fn valid_request_passes_all_guards() {
        let trip = scheduled_trip();
        let outcome =
            validate_booking_request(&trip, &ActorId("passenger-1".to_string()), SeatCount(2));

        assert!(outcome.is_ok());
    }

    #[test]
    fn only_the_driver_may_respond() {
        let trip = scheduled_trip();
        let booking = pending_booking();

        let outcome =
            validate_booking_response(&trip, &booking, &ActorId("passenger-1".to_string()));
        assert!(matches!(outcome, Err(AppError::PermissionDenied(_))));

        let outcome = validate_booking_response(&trip, &booking, &trip.driver_id.clone());
        assert!(outcome.is_ok());
    }

    #[test]
    fn responses_require_a_pending_booking() {
        let trip = scheduled_trip();
        let booking = Booking {
            status: BookingStatus::ACCEPTED,
            ..pending_booking()
        };

        let outcome = validate_booking_response(&trip, &booking, &trip.driver_id.clone());
        assert!(matches!(
            outcome,
            Err(AppError::InvalidBookingStatus(_, _))
        ));
    }

    #[test]
    fn cancellation_is_limited_to_the_passenger() {
        let booking = pending_booking();

        let outcome = validate_booking_cancellation(&booking, &ActorId("driver-1".to_string()));
        assert!(matches!(outcome, Err(AppError::PermissionDenied(_))));

        let outcome = validate_booking_cancellation(&booking, &booking.passenger_id.clone());
        assert!(outcome.is_ok());
    }

    #[test]
    fn rejected_bookings_cannot_be_cancelled() {
        let booking = Booking {
            status: BookingStatus::REJECTED,
            ..pending_booking()
        };

        let outcome = validate_booking_cancellation(&booking, &booking.passenger_id.clone());
        assert!(matches!(
            outcome,
            Err(AppError::InvalidBookingStatus(_, _))
        ));
    }
}
