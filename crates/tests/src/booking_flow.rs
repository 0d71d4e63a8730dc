/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use async_trait::async_trait;
use chrono::{Duration, Utc};
use ride_sharing_service::common::types::*;
use ride_sharing_service::domain::action::ui::booking::{
    validate_booking_request, validate_booking_response,
};
use ride_sharing_service::outbound::external::{notify_booking_status, BookingStatusDispatcher};
use ride_sharing_service::outbound::types::BookingStatusUpdate;
use ride_sharing_service::tools::error::AppError;
use std::sync::atomic::{AtomicUsize, Ordering};

struct FailingDispatcher {
    attempts: AtomicUsize,
}

#[async_trait]
impl BookingStatusDispatcher for FailingDispatcher {
    async fn dispatch(&self, _update: &BookingStatusUpdate) -> Result<(), AppError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AppError::ExternalAPICallError(
            "notification service unavailable".to_string(),
        ))
    }
}

fn posted_trip() -> Trip {
    Trip {
        trip_id: TripId("trip-1".to_string()),
        driver_id: ActorId("driver-1".to_string()),
        origin: Place {
            label: "A".to_string(),
            coordinates: Some(Point {
                lat: Latitude(12.93),
                lon: Longitude(77.62),
            }),
        },
        destination: Place {
            label: "B".to_string(),
            coordinates: Some(Point {
                lat: Latitude(13.05),
                lon: Longitude(77.58),
            }),
        },
        departure_time: TimeStamp(Utc::now() + Duration::hours(3)),
        total_seats: SeatCount(3),
        available_seats: SeatCount(3),
        price: Price(240.0),
        status: TripStatus::SCHEDULED,
        created_at: TimeStamp(Utc::now()),
    }
}

fn booking_for(trip: &Trip, passenger: &str, seats: u32) -> Booking {
    Booking {
        booking_id: BookingId("booking-1".to_string()),
        trip_id: trip.trip_id.clone(),
        passenger_id: ActorId(passenger.to_string()),
        seats_requested: SeatCount(seats),
        status: BookingStatus::PENDING,
        message: Some("two of us, small bags".to_string()),
        created_at: TimeStamp(Utc::now()),
    }
}

/// Trip with 3 seats, a non-driver books 2: the request passes every
/// guard and the booking starts out pending.
#[test]
fn booking_request_on_open_trip_starts_pending() {
    let trip = posted_trip();
    let passenger = ActorId("passenger-1".to_string());

    validate_booking_request(&trip, &passenger, SeatCount(2)).expect("guards should pass");

    let booking = booking_for(&trip, "passenger-1", 2);
    assert_eq!(booking.status, BookingStatus::PENDING);
}

#[test]
fn overbooking_is_rejected_and_nothing_is_created() {
    let trip = posted_trip();
    let passenger = ActorId("passenger-1".to_string());

    let outcome = validate_booking_request(&trip, &passenger, SeatCount(4));

    assert!(matches!(outcome, Err(AppError::NotEnoughSeats(4, 3))));
}

/// Driver accepts: seats come off the trip, the booking flips to
/// ACCEPTED, and a notification dispatch is attempted. The dispatcher
/// failing must not touch the accepted status.
#[tokio::test]
async fn acceptance_survives_a_failed_notification_dispatch() {
    let trip = posted_trip();
    let booking = booking_for(&trip, "passenger-1", 2);

    validate_booking_response(&trip, &booking, &trip.driver_id).expect("driver may respond");

    let SeatCount(available) = trip.available_seats;
    let SeatCount(requested) = booking.seats_requested;
    let trip = Trip {
        available_seats: SeatCount(available - requested),
        ..trip
    };
    let booking = Booking {
        status: BookingStatus::ACCEPTED,
        ..booking
    };

    let dispatcher = FailingDispatcher {
        attempts: AtomicUsize::new(0),
    };
    notify_booking_status(
        &dispatcher,
        BookingStatusUpdate {
            booking_id: booking.booking_id.clone(),
            trip_id: booking.trip_id.clone(),
            passenger_id: booking.passenger_id.clone(),
            status: booking.status,
            seats_requested: booking.seats_requested,
        },
    )
    .await;

    assert_eq!(dispatcher.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(booking.status, BookingStatus::ACCEPTED);
    assert_eq!(trip.available_seats, SeatCount(1));
}

#[test]
fn non_drivers_cannot_respond_to_bookings() {
    let trip = posted_trip();
    let booking = booking_for(&trip, "passenger-1", 2);

    let outcome =
        validate_booking_response(&trip, &booking, &ActorId("passenger-2".to_string()));

    assert!(matches!(outcome, Err(AppError::PermissionDenied(_))));
}
