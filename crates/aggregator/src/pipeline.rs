//! One aggregation run: fetch every source concurrently, merge in source
//! order, validate, serialize and hand the bytes to each writer.

use crate::merge::{merge_tables, validate_required};
use crate::writers::SnapshotWriter;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use ticker_common::{RateTable, Result, Snapshot, TickerConfig, TickerError};
use ticker_sources::RateFetcher;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

pub struct Aggregator {
    base_symbol: String,
    required_symbols: Vec<String>,
    fetchers: Vec<Arc<dyn RateFetcher>>,
    writers: Vec<Arc<dyn SnapshotWriter>>,
}

impl Aggregator {
    pub fn new(
        base_symbol: impl Into<String>,
        required_symbols: Vec<String>,
        fetchers: Vec<Arc<dyn RateFetcher>>,
        writers: Vec<Arc<dyn SnapshotWriter>>,
    ) -> Self {
        Self {
            base_symbol: base_symbol.into(),
            required_symbols,
            fetchers,
            writers,
        }
    }

    pub fn from_config(
        config: &TickerConfig,
        fetchers: Vec<Arc<dyn RateFetcher>>,
        writers: Vec<Arc<dyn SnapshotWriter>>,
    ) -> Self {
        Self::new(
            config.base_symbol.clone(),
            config.required_symbols.clone(),
            fetchers,
            writers,
        )
    }

    /// Runs every fetcher on its own task and waits for all of them.
    ///
    /// Tables come back in fetcher order. When several fetchers fail, the
    /// error of the earliest one in that order is returned.
    pub async fn fetch_all(&self) -> Result<Vec<RateTable>> {
        let handles = self.fetchers.iter().map(|fetcher| {
            let fetcher = Arc::clone(fetcher);
            let span = info_span!("fetch", source = %fetcher.name());
            tokio::spawn(
                async move {
                    let started = Instant::now();
                    let result = fetcher.fetch().await;
                    match &result {
                        Ok(table) => info!(
                            symbols = table.len(),
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "source fetched"
                        ),
                        Err(e) => error!(error = %e, "source failed"),
                    }
                    result
                }
                .instrument(span),
            )
        });

        let names: Vec<String> = self.fetchers.iter().map(|f| f.name().to_string()).collect();
        let joined = join_all(handles).await;

        let mut tables = Vec::with_capacity(joined.len());
        for (name, outcome) in names.into_iter().zip(joined) {
            let table = outcome.map_err(|e| TickerError::Task {
                name,
                message: e.to_string(),
            })??;
            tables.push(table);
        }
        Ok(tables)
    }

    /// Produces and publishes one snapshot.
    ///
    /// Nothing is written unless every source succeeded and every required
    /// symbol is present. Writers run in sequence and the first failure ends
    /// the run.
    pub async fn run(&self) -> Result<Snapshot> {
        let run_id = Uuid::new_v4();
        let span = info_span!("aggregation", %run_id);
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&self) -> Result<Snapshot> {
        let tables = self.fetch_all().await?;

        let merged = merge_tables(&self.base_symbol, tables);
        validate_required(&merged, &self.required_symbols).map_err(|e| {
            error!(error = %e, "snapshot rejected");
            e
        })?;

        let snapshot = Snapshot::new(self.base_symbol.as_str(), merged);
        let bytes = snapshot.to_json_bytes()?;
        info!(symbols = snapshot.table().len(), bytes = bytes.len(), "snapshot ready");

        for writer in &self.writers {
            writer.write(&bytes).await.map_err(|e| {
                error!(writer = writer.name(), error = %e, "writer failed");
                e
            })?;
            info!(writer = writer.name(), "snapshot written");
        }
        Ok(snapshot)
    }
}
