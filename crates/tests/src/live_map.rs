/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use ride_sharing_service::common::types::*;
use ride_sharing_service::tools::error::AppError;
use ride_sharing_service::tracking::ingestor::{
    GeolocationOptions, PositionFix, PositionSource, PositionWatch, WatchHandle,
};
use ride_sharing_service::tracking::notifier::InProcessChangeNotifier;
use ride_sharing_service::tracking::presenter::{
    CanvasError, LiveMapPresenter, LocationFeed, MapCanvas, MapMarker, Viewport, ViewportPolicy,
    TripEndpoints,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct StaticFeed {
    rows: Mutex<Vec<LocationSample>>,
}

impl StaticFeed {
    fn new(rows: Vec<LocationSample>) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(rows),
        })
    }

    fn replace(&self, rows: Vec<LocationSample>) {
        *self.rows.lock().unwrap() = rows;
    }
}

#[async_trait]
impl LocationFeed for StaticFeed {
    async fn location_rows(&self, _topic: ChangeTopic) -> Result<Vec<LocationSample>, AppError> {
        Ok(self.rows.lock().unwrap().clone())
    }
}

#[derive(Default)]
struct RecordingCanvas {
    rendered: Vec<Vec<MapMarker>>,
    viewports: Vec<Viewport>,
    fail_viewport: bool,
}

impl MapCanvas for RecordingCanvas {
    fn render_markers(&mut self, markers: &[MapMarker]) {
        self.rendered.push(markers.to_vec());
    }

    fn apply_viewport(&mut self, viewport: &Viewport) -> Result<(), CanvasError> {
        if self.fail_viewport {
            return Err(CanvasError("map widget not initialized".to_string()));
        }
        self.viewports.push(*viewport);
        Ok(())
    }
}

fn sample(actor: &str, at_secs: i64, lat: f64, speed: f64) -> LocationSample {
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
        speed: Some(SpeedInMetersPerSecond(speed)),
        acc: None,
        recorded_at: TimeStamp(Utc.timestamp_opt(at_secs, 0).unwrap()),
    }
}

fn presenter(
    feed: Arc<StaticFeed>,
    notifier: Arc<InProcessChangeNotifier>,
) -> LiveMapPresenter<RecordingCanvas> {
    LiveMapPresenter::new(
        feed,
        notifier,
        RecordingCanvas::default(),
        ChangeTopic::DriverLocations,
        ViewportPolicy::default(),
    )
}

/// Two rows for the same driver at t=1 and t=2: only the t=2 row is
/// rendered after mount.
#[tokio::test]
async fn mount_renders_only_the_latest_row_per_actor() {
    let feed = StaticFeed::new(vec![
        sample("driver-1", 1, 10.0, 0.0),
        sample("driver-1", 2, 20.0, 3.5),
    ]);
    let notifier = Arc::new(InProcessChangeNotifier::new());

    let mut presenter = presenter(feed, notifier);
    presenter.mount().await.unwrap();

    assert!(presenter.is_subscribed());
    assert_eq!(presenter.markers().len(), 1);
    let marker = &presenter.markers()[&ActorId("driver-1".to_string())];
    assert_eq!(marker.position.lat, Latitude(20.0));
    assert!(marker.moving);
}

/// A change notification triggers a refetch, and the fresh snapshot
/// fully replaces the marker set: actors gone from the store disappear.
#[tokio::test]
async fn change_events_replace_the_marker_set_atomically() {
    let feed = StaticFeed::new(vec![
        sample("driver-1", 5, 11.0, 0.0),
        sample("driver-2", 5, 12.0, 0.0),
    ]);
    let notifier = Arc::new(InProcessChangeNotifier::new());

    let mut presenter = presenter(feed.clone(), notifier.clone());
    presenter.mount().await.unwrap();
    assert_eq!(presenter.markers().len(), 2);

    feed.replace(vec![sample("driver-2", 9, 13.0, 2.0)]);
    notifier.notify(ChangeEvent {
        topic: ChangeTopic::DriverLocations,
        actor_id: ActorId("driver-2".to_string()),
        recorded_at: TimeStamp(Utc.timestamp_opt(9, 0).unwrap()),
    });

    assert!(presenter.on_change().await);
    assert_eq!(presenter.markers().len(), 1);
    assert!(presenter
        .markers()
        .contains_key(&ActorId("driver-2".to_string())));
}

#[tokio::test]
async fn unmounting_twice_is_safe_and_releases_the_subscription() {
    let feed = StaticFeed::new(vec![]);
    let notifier = Arc::new(InProcessChangeNotifier::new());

    let mut presenter = presenter(feed, notifier.clone());
    presenter.mount().await.unwrap();

    presenter.unmount();
    presenter.unmount();
    assert!(!presenter.is_subscribed());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        notifier.active_subscriptions(ChangeTopic::DriverLocations),
        0
    );
}

#[tokio::test]
async fn mounting_twice_keeps_a_single_subscription() {
    let feed = StaticFeed::new(vec![]);
    let notifier = Arc::new(InProcessChangeNotifier::new());

    let mut presenter = presenter(feed, notifier.clone());
    presenter.mount().await.unwrap();
    presenter.mount().await.unwrap();

    assert_eq!(
        notifier.active_subscriptions(ChangeTopic::DriverLocations),
        1
    );
}

/// With a selected trip the viewport fits both endpoints, capped at the
/// policy's max zoom; without one it follows the user's own position.
#[tokio::test]
async fn viewport_prefers_the_selected_trip_over_own_position() {
    let feed = StaticFeed::new(vec![]);
    let notifier = Arc::new(InProcessChangeNotifier::new());
    let policy = ViewportPolicy::default();

    let mut presenter = presenter(feed, notifier);
    presenter.set_own_position(Some(Point {
        lat: Latitude(12.97),
        lon: Longitude(77.59),
    }));

    let follow = presenter.viewport().unwrap();
    assert_eq!(follow.zoom, policy.follow_zoom);

    presenter.select_trip(Some(TripEndpoints {
        origin: Point {
            lat: Latitude(12.9300),
            lon: Longitude(77.6200),
        },
        destination: Point {
            lat: Latitude(12.9301),
            lon: Longitude(77.6201),
        },
    }));

    let fitted = presenter.viewport().unwrap();
    assert_eq!(fitted.zoom, policy.max_zoom);
    assert!((fitted.center.lat.0 - 12.93005).abs() < 1e-6);
}

struct OneShotSource {
    fix: Option<PositionFix>,
}

#[async_trait]
impl PositionSource for OneShotSource {
    async fn current_position(
        &self,
        _options: &GeolocationOptions,
    ) -> Result<PositionFix, AppError> {
        self.fix
            .clone()
            .ok_or_else(|| AppError::PermissionDenied("location unavailable".to_string()))
    }

    fn watch_position(&self, _options: &GeolocationOptions) -> PositionWatch {
        let (_tx, rx) = tokio::sync::mpsc::channel(1);
        PositionWatch {
            fixes: rx,
            handle: WatchHandle::new(),
        }
    }
}

/// `follow` takes a one-shot device fix for centering; an unavailable
/// fix keeps whatever position was already known.
#[tokio::test]
async fn follow_uses_a_one_shot_fix_and_tolerates_failure() {
    let feed = StaticFeed::new(vec![]);
    let notifier = Arc::new(InProcessChangeNotifier::new());
    let mut presenter = presenter(feed, notifier);

    let own = Point {
        lat: Latitude(12.97),
        lon: Longitude(77.59),
    };
    let source = OneShotSource {
        fix: Some(PositionFix {
            pt: own,
            heading: None,
            speed: None,
            acc: None,
            recorded_at: TimeStamp(Utc::now()),
        }),
    };
    presenter
        .follow(&source, &GeolocationOptions::default())
        .await;
    assert_eq!(presenter.viewport().unwrap().center, own);

    let broken = OneShotSource { fix: None };
    presenter
        .follow(&broken, &GeolocationOptions::default())
        .await;
    assert_eq!(presenter.viewport().unwrap().center, own);
}

/// A canvas that cannot adjust its viewport yet must not fail the
/// refresh; markers still land.
#[tokio::test]
async fn viewport_failures_are_swallowed() {
    let feed = StaticFeed::new(vec![sample("driver-1", 3, 10.0, 0.0)]);
    let notifier = Arc::new(InProcessChangeNotifier::new());

    let mut presenter = LiveMapPresenter::new(
        feed,
        notifier,
        RecordingCanvas {
            fail_viewport: true,
            ..RecordingCanvas::default()
        },
        ChangeTopic::DriverLocations,
        ViewportPolicy::default(),
    );
    presenter.set_own_position(Some(Point {
        lat: Latitude(12.97),
        lon: Longitude(77.59),
    }));

    presenter.mount().await.unwrap();

    assert_eq!(presenter.markers().len(), 1);
    assert_eq!(presenter.canvas().rendered.len(), 1);
    assert!(presenter.canvas().viewports.is_empty());
}
