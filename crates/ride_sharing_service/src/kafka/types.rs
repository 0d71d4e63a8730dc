/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;
use serde::Serialize;

/// Row mirrored to the location history topic, keyed by actor id.
#[derive(Serialize)]
pub struct LocationUpdate {
    pub a_id: ActorId,
    pub kind: ActorKind,
    pub t_id: Option<TripId>,
    pub ts: TimeStamp,
    pub st: TimeStamp,
    pub pt: Point,
    pub acc: Option<Accuracy>,
    pub speed: Option<SpeedInMetersPerSecond>,
    pub heading: Option<Direction>,
}
