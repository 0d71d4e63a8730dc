/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;
use crate::tools::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct GeolocationOptions {
    pub high_accuracy: bool,
    /// Bound on a single sample attempt; expiry skips the attempt, the
    /// stream keeps running.
    pub timeout: Duration,
    /// Fixes recorded longer ago than this are discarded.
    pub max_sample_age: Duration,
}

impl Default for GeolocationOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            max_sample_age: Duration::from_secs(30),
        }
    }
}

/// One raw position reading from the device.
#[derive(Debug, Clone)]
pub struct PositionFix {
    pub pt: Point,
    pub heading: Option<Direction>,
    pub speed: Option<SpeedInMetersPerSecond>,
    pub acc: Option<Accuracy>,
    pub recorded_at: TimeStamp,
}

/// Runtime preconditions of the sampling loop, checked before the
/// watch starts.
#[derive(Debug, Clone, Copy)]
pub struct DeviceContext {
    pub secure_transport: bool,
    pub location_permission: bool,
}

/// Explicit stop handle for a position watch, owned by whoever started
/// it. Stopping is synchronous, idempotent and multi-call safe.
#[derive(Clone, Default)]
pub struct WatchHandle {
    stopped: Arc<AtomicBool>,
}

impl WatchHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

pub struct PositionWatch {
    pub fixes: mpsc::Receiver<PositionFix>,
    pub handle: WatchHandle,
}

/// Device geolocation collaborator.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// One-shot position read.
    async fn current_position(&self, options: &GeolocationOptions)
        -> Result<PositionFix, AppError>;

    /// Starts a continuous watch. The source is expected to observe the
    /// returned handle and wind down once it is stopped.
    fn watch_position(&self, options: &GeolocationOptions) -> PositionWatch;
}

/// Where sampled rows land. Implemented by the Redis/Kafka-backed store
/// and by in-memory fakes in tests.
#[async_trait]
pub trait SampleSink: Send + Sync {
    async fn submit_sample(&self, sample: LocationSample) -> Result<(), AppError>;
}

/// A running location-sharing stream.
pub struct SharingStream {
    handle: WatchHandle,
    task: JoinHandle<Result<(), AppError>>,
}

impl SharingStream {
    pub fn handle(&self) -> WatchHandle {
        self.handle.clone()
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    /// Waits for the stream to wind down and reports why it stopped.
    pub async fn join(self) -> Result<(), AppError> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_cancelled() => Ok(()),
            Err(err) => Err(AppError::InternalError(format!(
                "location sharing task panicked : {err}"
            ))),
        }
    }
}

/// Samples the device position on the watch cadence and appends each
/// fix as a new row through the sink.
pub struct LocationIngestor {
    actor_id: ActorId,
    actor_kind: ActorKind,
    trip_id: Option<TripId>,
    sink: Arc<dyn SampleSink>,
    options: GeolocationOptions,
}

impl LocationIngestor {
    pub fn new(
        actor_id: ActorId,
        actor_kind: ActorKind,
        trip_id: Option<TripId>,
        sink: Arc<dyn SampleSink>,
        options: GeolocationOptions,
    ) -> Self {
        Self {
            actor_id,
            actor_kind,
            trip_id,
            sink,
            options,
        }
    }

    /// Starts sharing. Fails fast with `InsecureContext` or
    /// `PermissionDenied` before any watch is registered; in that case
    /// no row is ever written.
    pub fn start(
        &self,
        ctx: &DeviceContext,
        source: &dyn PositionSource,
    ) -> Result<SharingStream, AppError> {
        if !ctx.secure_transport {
            return Err(AppError::InsecureContext);
        }
        if !ctx.location_permission {
            return Err(AppError::PermissionDenied(
                "location access denied by device".to_string(),
            ));
        }

        let PositionWatch { fixes, handle } = source.watch_position(&self.options);

        let task = tokio::spawn(run_watch(
            fixes,
            handle.clone(),
            self.actor_id.clone(),
            self.actor_kind,
            self.trip_id.clone(),
            self.sink.clone(),
            self.options,
        ));

        Ok(SharingStream { handle, task })
    }
}

async fn run_watch(
    mut fixes: mpsc::Receiver<PositionFix>,
    handle: WatchHandle,
    actor_id: ActorId,
    actor_kind: ActorKind,
    trip_id: Option<TripId>,
    sink: Arc<dyn SampleSink>,
    options: GeolocationOptions,
) -> Result<(), AppError> {
    loop {
        if handle.is_stopped() {
            return Ok(());
        }

        let fix = match tokio::time::timeout(options.timeout, fixes.recv()).await {
            Err(_) => {
                let ActorId(actor) = &actor_id;
                warn!(tag = "[Sample Attempt Timed Out]", actor_id = %actor);
                continue;
            }
            Ok(None) => return Ok(()),
            Ok(Some(fix)) => fix,
        };

        let TimeStamp(recorded_at) = fix.recorded_at;
        let age = Utc::now().signed_duration_since(recorded_at);
        if age.num_milliseconds() > options.max_sample_age.as_millis() as i64 {
            debug!(tag = "[Stale Fix Discarded]", age_ms = %age.num_milliseconds());
            continue;
        }

        let sample = LocationSample {
            sample_id: SampleId(Uuid::new_v4().to_string()),
            actor_id: actor_id.clone(),
            actor_kind,
            trip_id: trip_id.clone(),
            pt: fix.pt,
            heading: fix.heading,
            speed: fix.speed,
            acc: fix.acc,
            recorded_at: fix.recorded_at,
        };

        // Awaiting each submission keeps one write in flight per actor,
        // so rows cannot race each other into the store.
        if let Err(err) = sink.submit_sample(sample).await {
            handle.stop();
            error!(tag = "[Location Sharing Halted]", error = %err);
            return Err(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSink {
        samples: Mutex<Vec<LocationSample>>,
        fail_after: Option<usize>,
    }

    impl RecordingSink {
        fn new(fail_after: Option<usize>) -> Arc<Self> {
            Arc::new(Self {
                samples: Mutex::new(Vec::new()),
                fail_after,
            })
        }

        fn count(&self) -> usize {
            self.samples.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SampleSink for RecordingSink {
        async fn submit_sample(&self, sample: LocationSample) -> Result<(), AppError> {
            let mut samples = self.samples.lock().unwrap();
            if let Some(limit) = self.fail_after {
                if samples.len() >= limit {
                    return Err(AppError::WriteFailed("insert rejected".to_string()));
                }
            }
            samples.push(sample);
            Ok(())
        }
    }

    struct ScriptedSource {
        fixes: Mutex<Vec<PositionFix>>,
    }

    impl ScriptedSource {
        fn new(fixes: Vec<PositionFix>) -> Self {
            Self {
                fixes: Mutex::new(fixes),
            }
        }
    }

    #[async_trait]
    impl PositionSource for ScriptedSource {
        async fn current_position(
            &self,
            _options: &GeolocationOptions,
        ) -> Result<PositionFix, AppError> {
            self.fixes
                .lock()
                .unwrap()
                .first()
                .cloned()
                .ok_or_else(|| AppError::PermissionDenied("no fix available".to_string()))
        }

        fn watch_position(&self, _options: &GeolocationOptions) -> PositionWatch {
            let fixes = std::mem::take(&mut *self.fixes.lock().unwrap());
            let (tx, rx) = mpsc::channel(16);
            tokio::spawn(async move {
                for fix in fixes {
                    if tx.send(fix).await.is_err() {
                        break;
                    }
                }
            });
            PositionWatch {
                fixes: rx,
                handle: WatchHandle::new(),
            }
        }
    }

    fn fix_at(age: chrono::Duration, lat: f64) -> PositionFix {
        PositionFix {
            pt: Point {
                lat: Latitude(lat),
                lon: Longitude(77.59),
            },
            heading: None,
            speed: Some(SpeedInMetersPerSecond(4.2)),
            acc: Some(Accuracy(5.0)),
            recorded_at: TimeStamp(Utc::now() - age),
        }
    }

    fn ingestor(sink: Arc<dyn SampleSink>) -> LocationIngestor {
        LocationIngestor::new(
            ActorId("driver-1".to_string()),
            ActorKind::DRIVER,
            Some(TripId("trip-1".to_string())),
            sink,
            GeolocationOptions {
                timeout: Duration::from_millis(200),
                ..GeolocationOptions::default()
            },
        )
    }

    #[tokio::test]
    async fn insecure_context_fails_before_any_row_is_written() {
        let sink = RecordingSink::new(None);
        let source = ScriptedSource::new(vec![fix_at(chrono::Duration::zero(), 12.97)]);

        let ctx = DeviceContext {
            secure_transport: false,
            location_permission: true,
        };
        let outcome = ingestor(sink.clone()).start(&ctx, &source);

        assert!(matches!(outcome, Err(AppError::InsecureContext)));
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn missing_permission_fails_before_any_row_is_written() {
        let sink = RecordingSink::new(None);
        let source = ScriptedSource::new(vec![fix_at(chrono::Duration::zero(), 12.97)]);

        let ctx = DeviceContext {
            secure_transport: true,
            location_permission: false,
        };
        let outcome = ingestor(sink.clone()).start(&ctx, &source);

        assert!(matches!(outcome, Err(AppError::PermissionDenied(_))));
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn write_failure_halts_the_stream_without_retry() {
        let sink = RecordingSink::new(Some(1));
        let source = ScriptedSource::new(vec![
            fix_at(chrono::Duration::zero(), 12.97),
            fix_at(chrono::Duration::zero(), 12.98),
            fix_at(chrono::Duration::zero(), 12.99),
        ]);

        let ctx = DeviceContext {
            secure_transport: true,
            location_permission: true,
        };
        let stream = ingestor(sink.clone()).start(&ctx, &source).unwrap();
        let handle = stream.handle();

        let outcome = stream.join().await;

        assert!(matches!(outcome, Err(AppError::WriteFailed(_))));
        assert!(handle.is_stopped());
        assert_eq!(sink.count(), 1);
    }

    #[tokio::test]
    async fn stale_fixes_are_discarded() {
        let sink = RecordingSink::new(None);
        let source = ScriptedSource::new(vec![
            fix_at(chrono::Duration::seconds(120), 12.90),
            fix_at(chrono::Duration::zero(), 12.97),
        ]);

        let ctx = DeviceContext {
            secure_transport: true,
            location_permission: true,
        };
        let stream = ingestor(sink.clone()).start(&ctx, &source).unwrap();
        stream.join().await.unwrap();

        assert_eq!(sink.count(), 1);
        let samples = sink.samples.lock().unwrap();
        assert_eq!(samples[0].pt.lat, Latitude(12.97));
    }

    #[tokio::test]
    async fn stopping_twice_is_safe() {
        let sink = RecordingSink::new(None);
        let source = ScriptedSource::new(vec![fix_at(chrono::Duration::zero(), 12.97)]);

        let ctx = DeviceContext {
            secure_transport: true,
            location_permission: true,
        };
        let stream = ingestor(sink).start(&ctx, &source).unwrap();

        stream.stop();
        stream.stop();
        assert!(stream.handle().is_stopped());
        stream.join().await.unwrap();
    }
}
