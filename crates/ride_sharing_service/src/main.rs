/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use actix_web::{web, App, HttpServer};
use chrono::{Duration as ChronoDuration, Utc};
use ride_sharing_service::{
    common::{types::*, utils::abs_diff_utc_as_sec},
    domain::api,
    environment::{AppConfig, AppState},
    history_trim_latency,
    middleware::*,
    redis::commands::trim_location_history,
    tools::error::AppError,
    tools::logger::{error, info, setup_tracing},
    tools::prometheus::{prometheus_metrics, HISTORY_TRIM_LATENCY},
};
use std::{
    env::var,
    sync::atomic::{AtomicBool, Ordering},
};
use std::{sync::Arc, time::Duration};
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::interval;
use tracing_actix_web::TracingLogger;

pub fn read_dhall_config(config_path: &str) -> Result<AppConfig, String> {
    let config = serde_dhall::from_file(config_path).parse::<AppConfig>();
    match config {
        Ok(config) => Ok(config),
        Err(e) => Err(format!("Error reading config: {}", e)),
    }
}

/// Prunes location rows older than the retention window on a fixed
/// cadence. The history is append-only; this is the only place rows
/// leave the store.
async fn run_history_trimmer(
    data: web::Data<AppState>,
    graceful_termination_requested: Arc<AtomicBool>,
) {
    let mut timer = interval(Duration::from_secs(data.history_trim_delay));

    loop {
        timer.tick().await;

        let start_time = Utc::now();
        let cutoff = TimeStamp(
            start_time - ChronoDuration::seconds(data.location_history_retention as i64),
        );

        for kind in [ActorKind::DRIVER, ActorKind::PASSENGER] {
            match trim_location_history(&data.non_persistent_redis, &kind, &cutoff).await {
                Ok(removed) => {
                    if removed > 0 {
                        info!(tag = "[History Trimmed]", kind = %kind, rows = %removed);
                    }
                }
                Err(err) => {
                    error!(tag = "[History Trim Failed]", kind = %kind, error = %err);
                }
            }
        }

        history_trim_latency!(start_time, Utc::now());

        if graceful_termination_requested.load(Ordering::Relaxed) {
            info!(tag = "[Graceful Shutting Down]", "History trimmer stopped");
            break;
        }
    }
}

#[actix_web::main]
async fn start_server() -> std::io::Result<()> {
    let dhall_config_path = var("DHALL_CONFIG")
        .unwrap_or_else(|_| "./dhall_config/ride_sharing_service.dhall".to_string());
    let app_config = read_dhall_config(&dhall_config_path).unwrap_or_else(|err| {
        println!("Dhall Config Reading Error : {}", err);
        std::process::exit(1);
    });

    let _guard = setup_tracing(app_config.logger_cfg);

    let port = app_config.port;
    let workers = app_config.workers;

    let app_state = AppState::new(app_config).await;

    let data = web::Data::new(app_state);

    let graceful_termination_requested = Arc::new(AtomicBool::new(false));
    let graceful_termination_requested_sigterm = graceful_termination_requested.to_owned();
    let graceful_termination_requested_sigint = graceful_termination_requested.to_owned();
    // Listen for SIGTERM signal.
    tokio::spawn(async move {
        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to bind SIGTERM");
        sigterm.recv().await;
        graceful_termination_requested_sigterm.store(true, Ordering::Relaxed);
    });
    // Listen for SIGINT (Ctrl+C) signal.
    tokio::spawn(async move {
        let mut ctrl_c = signal(SignalKind::interrupt()).expect("Failed to bind SIGINT");
        ctrl_c.recv().await;
        graceful_termination_requested_sigint.store(true, Ordering::Relaxed);
    });

    let trimmer_data = data.clone();
    let trimmer_thread = tokio::spawn(async move {
        run_history_trimmer(trimmer_data, graceful_termination_requested).await;
    });

    // Built once; building per worker would re-register the collectors.
    let prometheus = prometheus_metrics();

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .app_data(
                web::JsonConfig::default()
                    .error_handler(|err, _| AppError::UnprocessibleRequest(err.to_string()).into()),
            )
            .wrap(IncomingRequestMetrics)
            .wrap(RequestTimeout)
            .wrap(TracingLogger::<DomainRootSpanBuilder>::new())
            .wrap(prometheus.clone())
            .configure(api::handler)
    })
    .workers(workers)
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    trimmer_thread.await.expect("History trimmer panicked");

    Ok(())
}

fn main() {
    start_server().expect("Failed to start the server");
}
