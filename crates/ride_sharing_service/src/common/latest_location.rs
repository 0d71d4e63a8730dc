/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;
use rustc_hash::FxHashMap;

/// Collapses location rows to at most one row per actor.
///
/// Rows are folded into a map keyed by actor id; an entry is replaced
/// only when a strictly greater timestamp is seen, so input ordering
/// does not matter and equal-timestamp rows keep the first one folded.
/// Running the fold twice over the same snapshot yields the same actor
/// set with samples of equal timestamp.
pub fn latest_per_actor<I>(samples: I) -> FxHashMap<ActorId, LocationSample>
where
    I: IntoIterator<Item = LocationSample>,
{
    let mut latest: FxHashMap<ActorId, LocationSample> = FxHashMap::default();

    for sample in samples {
        match latest.get(&sample.actor_id) {
            Some(current) if current.recorded_at >= sample.recorded_at => {}
            _ => {
                latest.insert(sample.actor_id.clone(), sample);
            }
        }
    }

    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample(actor: &str, at_secs: i64, lat: f64) -> LocationSample {
        LocationSample {
            sample_id: SampleId(format!("{actor}-{at_secs}")),
            actor_id: ActorId(actor.to_string()),
            actor_kind: ActorKind::DRIVER,
            trip_id: None,
            pt: Point {
                lat: Latitude(lat),
                lon: Longitude(77.59),
            },
            heading: None,
            speed: None,
            acc: None,
            recorded_at: TimeStamp(Utc.timestamp_opt(at_secs, 0).unwrap()),
        }
    }

    #[test]
    fn returns_one_row_per_actor_with_max_timestamp() {
        let rows = vec![
            sample("driver-1", 1, 10.0),
            sample("driver-1", 2, 20.0),
            sample("driver-2", 5, 30.0),
            sample("driver-2", 3, 40.0),
        ];

        let latest = latest_per_actor(rows);

        assert_eq!(latest.len(), 2);
        assert_eq!(
            latest[&ActorId("driver-1".to_string())].pt.lat,
            Latitude(20.0)
        );
        assert_eq!(
            latest[&ActorId("driver-2".to_string())].pt.lat,
            Latitude(30.0)
        );
    }

    #[test]
    fn later_row_replaces_earlier_regardless_of_input_order() {
        let rows = vec![sample("driver-1", 2, 20.0), sample("driver-1", 1, 10.0)];

        let latest = latest_per_actor(rows);

        assert_eq!(latest.len(), 1);
        assert_eq!(
            latest[&ActorId("driver-1".to_string())].recorded_at,
            TimeStamp(Utc.timestamp_opt(2, 0).unwrap())
        );
    }

    #[test]
    fn equal_timestamps_keep_one_qualifying_row() {
        let rows = vec![sample("driver-1", 7, 10.0), sample("driver-1", 7, 99.0)];

        let latest = latest_per_actor(rows.clone());

        assert_eq!(latest.len(), 1);
        let kept = &latest[&ActorId("driver-1".to_string())];
        assert_eq!(kept.recorded_at, TimeStamp(Utc.timestamp_opt(7, 0).unwrap()));
        assert!(rows.contains(kept));
    }

    #[test]
    fn repeated_runs_on_same_snapshot_are_idempotent() {
        let rows = vec![
            sample("driver-1", 7, 10.0),
            sample("driver-1", 7, 99.0),
            sample("passenger-1", 4, 12.0),
        ];

        let first = latest_per_actor(rows.clone());
        let second = latest_per_actor(rows);

        assert_eq!(first.len(), second.len());
        for (actor_id, kept) in first {
            assert_eq!(kept.recorded_at, second[&actor_id].recorded_at);
        }
    }

    #[test]
    fn empty_input_yields_empty_view() {
        let latest = latest_per_actor(Vec::new());
        assert!(latest.is_empty());
    }
}
