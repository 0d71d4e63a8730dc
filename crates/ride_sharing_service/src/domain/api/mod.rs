/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
pub mod ui;

use actix_web::web::ServiceConfig;

pub fn handler(config: &mut ServiceConfig) {
    config
        .service(ui::location::update_actor_location)
        .service(ui::location::track_trip_location)
        .service(ui::trip::create_trip)
        .service(ui::trip::search_trips)
        .service(ui::trip::get_trip)
        .service(ui::trip::update_trip_status)
        .service(ui::trip::delete_trip)
        .service(ui::booking::create_booking)
        .service(ui::booking::respond_to_booking)
        .service(ui::booking::cancel_booking)
        .service(ui::booking::list_trip_bookings)
        .service(ui::healthcheck::health_check);
}
