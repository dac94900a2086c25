//! Polling proxy: refreshes the snapshot on a timer and serves the latest
//! published bytes over HTTP.

use crate::pipeline::Aggregator;
use crate::writers::SnapshotCache;
use anyhow::Context;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use ticker_common::symbols::whitelist_json;
use tokio::net::TcpListener;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

const JSON: &str = "application/json";

pub fn router(cache: SnapshotCache) -> Router {
    Router::new()
        .route("/", get(rates))
        .route("/rates", get(rates))
        .route("/whitelist", get(whitelist))
        .with_state(cache)
}

async fn rates(State(cache): State<SnapshotCache>) -> Response {
    ([(header::CONTENT_TYPE, JSON)], cache.latest().await).into_response()
}

async fn whitelist() -> Response {
    match whitelist_json() {
        Ok(body) => ([(header::CONTENT_TYPE, JSON)], body).into_response(),
        Err(e) => {
            error!(error = %e, "whitelist serialization failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Runs an aggregation now and then once per `period`, forever.
///
/// A failed run leaves the last published snapshot untouched.
pub async fn poll(aggregator: Arc<Aggregator>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match aggregator.run().await {
            Ok(snapshot) => info!(symbols = snapshot.table().len(), "snapshot refreshed"),
            Err(e) => warn!(error = %e, "refresh failed, keeping previous snapshot"),
        }
    }
}

/// Serves `cache` on `listener` while polling in the background until
/// `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    aggregator: Aggregator,
    cache: SnapshotCache,
    period: Duration,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("listener has no local address")?;
    let poller = tokio::spawn(poll(Arc::new(aggregator), period));

    info!(%addr, poll_interval_secs = period.as_secs(), "snapshot server listening");
    let served = axum::serve(listener, router(cache))
        .with_graceful_shutdown(shutdown)
        .await
        .context("snapshot server failed");

    poller.abort();
    info!("snapshot server stopped");
    served
}

/// Resolves on Ctrl-C
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
