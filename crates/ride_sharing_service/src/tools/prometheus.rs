/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
#![allow(clippy::expect_used)]

use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use prometheus::{
    opts, register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};

pub static INCOMING_API: once_cell::sync::Lazy<HistogramVec> = once_cell::sync::Lazy::new(|| {
    register_histogram_vec!(
        opts!("http_request_duration_seconds", "Incoming API requests").into(),
        &["method", "handler", "status_code", "code", "version"]
    )
    .expect("Failed to register incoming API metrics")
});

pub static CALL_EXTERNAL_API: once_cell::sync::Lazy<HistogramVec> =
    once_cell::sync::Lazy::new(|| {
        register_histogram_vec!(
            opts!("external_api_call_duration_seconds", "Outbound API calls").into(),
            &["method", "host", "status_code"]
        )
        .expect("Failed to register external API call metrics")
    });

pub static TOTAL_LOCATION_UPDATES: once_cell::sync::Lazy<IntCounter> =
    once_cell::sync::Lazy::new(|| {
        register_int_counter!("total_location_updates", "Total Location Updates")
            .expect("Failed to register total location updates metrics")
    });

pub static LOCATION_NOTIFICATIONS: once_cell::sync::Lazy<IntCounter> =
    once_cell::sync::Lazy::new(|| {
        register_int_counter!(
            "location_change_notifications",
            "Location Change Notifications Published"
        )
        .expect("Failed to register location change notification metrics")
    });

pub static BOOKING_STATUS_UPDATES: once_cell::sync::Lazy<IntCounterVec> =
    once_cell::sync::Lazy::new(|| {
        register_int_counter_vec!(
            opts!("booking_status_updates", "Booking Status Updates"),
            &["status"]
        )
        .expect("Failed to register booking status update metrics")
    });

pub static HISTORY_TRIM_LATENCY: once_cell::sync::Lazy<HistogramVec> =
    once_cell::sync::Lazy::new(|| {
        register_histogram_vec!(
            opts!("history_trim_latency", "Location History Trimmer Monitoring").into(),
            &[]
        )
        .expect("Failed to register history trim latency metrics")
    });

/// Observes the duration of an incoming API request.
///
/// # Arguments
///
/// * `$method` - The HTTP method of the request (e.g., GET, POST).
/// * `$endpoint` - The endpoint or route of the request.
/// * `$status` - The HTTP status code of the response.
/// * `$code` - A specific code detailing more about the response, if available.
/// * `$start` - The time when the request was received.
#[macro_export]
macro_rules! incoming_api {
    ($method:expr, $endpoint:expr, $status:expr, $code:expr, $start:expr) => {
        let duration = $start.elapsed().as_secs_f64();
        let version = std::env::var("DEPLOYMENT_VERSION").unwrap_or("DEV".to_string());
        INCOMING_API
            .with_label_values(&[$method, $endpoint, $status, $code, version.as_str()])
            .observe(duration);
    };
}

#[macro_export]
macro_rules! call_external_api {
    ($method:expr, $host:expr, $status:expr, $start:expr) => {
        let duration = $start.elapsed().as_secs_f64();
        CALL_EXTERNAL_API
            .with_label_values(&[$method, $host, $status])
            .observe(duration);
    };
}

#[macro_export]
macro_rules! history_trim_latency {
    ($start:expr, $end:expr) => {
        let duration = abs_diff_utc_as_sec($start, $end);
        HISTORY_TRIM_LATENCY.with_label_values(&[]).observe(duration);
    };
}

/// Builds the `PrometheusMetrics` middleware exposing `/metrics`.
///
/// Touches each static metric once so the registry reports them from
/// process start rather than first use.
pub fn prometheus_metrics() -> PrometheusMetrics {
    let prometheus = PrometheusMetricsBuilder::new("rss")
        .endpoint("/metrics")
        .build()
        .expect("Failed to build prometheus metrics middleware");

    once_cell::sync::Lazy::force(&INCOMING_API);
    once_cell::sync::Lazy::force(&CALL_EXTERNAL_API);
    once_cell::sync::Lazy::force(&TOTAL_LOCATION_UPDATES);
    once_cell::sync::Lazy::force(&LOCATION_NOTIFICATIONS);
    once_cell::sync::Lazy::force(&BOOKING_STATUS_UPDATES);
    once_cell::sync::Lazy::force(&HISTORY_TRIM_LATENCY);

    prometheus
}
