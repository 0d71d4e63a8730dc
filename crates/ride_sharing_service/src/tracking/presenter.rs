/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::latest_location::latest_per_actor;
use crate::common::types::*;
use crate::tools::error::AppError;
use crate::tracking::ingestor::{GeolocationOptions, PositionSource};
use crate::tracking::notifier::{ChangeNotifier, Subscription};
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{error, warn};

/// Read side of the location store, scoped to one change topic.
#[async_trait]
pub trait LocationFeed: Send + Sync {
    async fn location_rows(&self, topic: ChangeTopic) -> Result<Vec<LocationSample>, AppError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub actor_id: ActorId,
    pub position: Point,
    pub heading: Option<Direction>,
    /// Styling only; never drives a control decision.
    pub moving: bool,
}

impl From<LocationSample> for MapMarker {
    fn from(sample: LocationSample) -> Self {
        let moving = sample.is_moving();
        MapMarker {
            actor_id: sample.actor_id,
            position: sample.pt,
            heading: sample.heading,
            moving,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: Point,
    pub zoom: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ViewportPolicy {
    /// Extra margin around fitted endpoints, as a ratio of their span.
    pub fit_padding_ratio: f64,
    pub max_zoom: f64,
    /// Zoom used when following the user's own position.
    pub follow_zoom: f64,
}

impl Default for ViewportPolicy {
    fn default() -> Self {
        Self {
            fit_padding_ratio: 0.2,
            max_zoom: 16.0,
            follow_zoom: 15.0,
        }
    }
}

/// Both endpoints of the selected trip. Only constructible when the
/// trip actually carries coordinates for origin and destination.
#[derive(Debug, Clone, Copy)]
pub struct TripEndpoints {
    pub origin: Point,
    pub destination: Point,
}

impl TripEndpoints {
    pub fn of_trip(trip: &Trip) -> Option<Self> {
        match (trip.origin.coordinates, trip.destination.coordinates) {
            (Some(origin), Some(destination)) => Some(Self {
                origin,
                destination,
            }),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct CanvasError(pub String);

impl fmt::Display for CanvasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The map widget. Marker replacement is infallible; viewport moves may
/// fail while the widget is not initialized yet.
pub trait MapCanvas: Send {
    fn render_markers(&mut self, markers: &[MapMarker]);
    fn apply_viewport(&mut self, viewport: &Viewport) -> Result<(), CanvasError>;
}

/// Fits both endpoints with padding, capped at the policy's max zoom.
pub fn fit_viewport(origin: &Point, destination: &Point, policy: &ViewportPolicy) -> Viewport {
    let Latitude(lat1) = origin.lat;
    let Longitude(lon1) = origin.lon;
    let Latitude(lat2) = destination.lat;
    let Longitude(lon2) = destination.lon;

    let mid_lat = (lat1 + lat2) / 2.0;
    let center = Point {
        lat: Latitude(mid_lat),
        lon: Longitude((lon1 + lon2) / 2.0),
    };

    // Longitude degrees shrink with latitude; normalize so the span is
    // comparable on both axes.
    let lat_span = (lat1 - lat2).abs();
    let lon_span = (lon1 - lon2).abs() * mid_lat.to_radians().cos().abs();
    let span = lat_span.max(lon_span).max(1e-4) * (1.0 + 2.0 * policy.fit_padding_ratio);

    let zoom = (360.0 / span).log2().clamp(1.0, policy.max_zoom);

    Viewport { center, zoom }
}

/// Live map view: keeps the latest position per relevant actor and
/// redraws markers whenever the change notifier fires.
///
/// State machine: Idle (no subscription) -> Subscribed on `mount`,
/// back to Idle on `unmount`. Both transitions are idempotent.
pub struct LiveMapPresenter<C: MapCanvas> {
    feed: Arc<dyn LocationFeed>,
    notifier: Arc<dyn ChangeNotifier>,
    canvas: C,
    topic: ChangeTopic,
    policy: ViewportPolicy,
    selected_trip: Option<TripEndpoints>,
    own_position: Option<Point>,
    markers: FxHashMap<ActorId, MapMarker>,
    subscription: Option<Subscription>,
}

impl<C: MapCanvas> LiveMapPresenter<C> {
    pub fn new(
        feed: Arc<dyn LocationFeed>,
        notifier: Arc<dyn ChangeNotifier>,
        canvas: C,
        topic: ChangeTopic,
        policy: ViewportPolicy,
    ) -> Self {
        Self {
            feed,
            notifier,
            canvas,
            topic,
            policy,
            selected_trip: None,
            own_position: None,
            markers: FxHashMap::default(),
            subscription: None,
        }
    }

    pub fn select_trip(&mut self, endpoints: Option<TripEndpoints>) {
        self.selected_trip = endpoints;
    }

    pub fn set_own_position(&mut self, position: Option<Point>) {
        self.own_position = position;
    }

    /// One-shot read of the user's own position for viewport centering.
    /// Best effort; an unavailable fix leaves the previous position.
    pub async fn follow(&mut self, source: &dyn PositionSource, options: &GeolocationOptions) {
        match source.current_position(options).await {
            Ok(fix) => self.set_own_position(Some(fix.pt)),
            Err(err) => warn!(tag = "[Own Position Unavailable]", error = %err),
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn markers(&self) -> &FxHashMap<ActorId, MapMarker> {
        &self.markers
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    /// Subscribes and does the initial full fetch. Subscribing first
    /// means rows landing during the fetch only cause a redundant
    /// refresh, never a miss.
    pub async fn mount(&mut self) -> Result<(), AppError> {
        if self.subscription.is_some() {
            return Ok(());
        }

        let subscription = self.notifier.subscribe(self.topic).await?;
        self.subscription = Some(subscription);

        self.refresh().await
    }

    pub fn unmount(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    /// Waits for the next change event and refreshes. Returns whether
    /// the presenter is still subscribed; a failed refresh keeps the
    /// subscription alive and only logs.
    pub async fn on_change(&mut self) -> bool {
        let event = match self.subscription.as_mut() {
            Some(subscription) => subscription.recv().await,
            None => return false,
        };

        match event {
            Some(_) => {
                if let Err(err) = self.refresh().await {
                    error!(tag = "[Live Map Refresh Failed]", error = %err);
                }
                true
            }
            None => false,
        }
    }

    /// Re-runs the latest-per-actor query and atomically replaces the
    /// rendered marker set; markers for actors absent from the fresh
    /// snapshot do not survive.
    pub async fn refresh(&mut self) -> Result<(), AppError> {
        let rows = self.feed.location_rows(self.topic).await?;

        self.markers = latest_per_actor(rows)
            .into_iter()
            .map(|(actor_id, sample)| (actor_id, MapMarker::from(sample)))
            .collect();

        let markers: Vec<MapMarker> = self.markers.values().cloned().collect();
        self.canvas.render_markers(&markers);
        self.recenter();

        Ok(())
    }

    fn recenter(&mut self) {
        let Some(viewport) = self.viewport() else {
            return;
        };
        // Best effort: the widget may not be ready yet.
        if let Err(err) = self.canvas.apply_viewport(&viewport) {
            warn!(tag = "[Viewport Adjustment Skipped]", error = %err);
        }
    }

    pub fn viewport(&self) -> Option<Viewport> {
        if let Some(TripEndpoints {
            origin,
            destination,
        }) = self.selected_trip
        {
            return Some(fit_viewport(&origin, &destination, &self.policy));
        }

        self.own_position.map(|center| Viewport {
            center,
            zoom: self.policy.follow_zoom,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64) -> Point {
        Point {
            lat: Latitude(lat),
            lon: Longitude(lon),
        }
    }

    #[test]
    fn fit_centers_on_the_midpoint() {
        let viewport = fit_viewport(
            &point(12.90, 77.50),
            &point(13.10, 77.70),
            &ViewportPolicy::default(),
        );

        assert_eq!(viewport.center, point(13.0, 77.6));
    }

    #[test]
    fn fit_zoom_is_capped_for_nearby_endpoints() {
        let policy = ViewportPolicy::default();
        let viewport = fit_viewport(&point(12.9000, 77.5000), &point(12.9001, 77.5001), &policy);

        assert_eq!(viewport.zoom, policy.max_zoom);
    }

    #[test]
    fn wider_spans_zoom_further_out() {
        let policy = ViewportPolicy::default();
        let near = fit_viewport(&point(12.9, 77.5), &point(13.0, 77.6), &policy);
        let far = fit_viewport(&point(12.9, 77.5), &point(18.9, 83.5), &policy);

        assert!(far.zoom < near.zoom);
    }

    #[test]
    fn endpoints_require_both_coordinates() {
        let trip = Trip {
            trip_id: TripId("trip-1".to_string()),
            driver_id: ActorId("driver-1".to_string()),
            origin: Place {
                label: "A".to_string(),
                coordinates: Some(point(12.9, 77.5)),
            },
            destination: Place {
                label: "B".to_string(),
                coordinates: None,
            },
            departure_time: TimeStamp(chrono::Utc::now()),
            total_seats: SeatCount(3),
            available_seats: SeatCount(3),
            price: Price(120.0),
            status: TripStatus::SCHEDULED,
            created_at: TimeStamp(chrono::Utc::now()),
        };

        assert!(TripEndpoints::of_trip(&trip).is_none());
    }
}
