//! One end-to-end run: fetch, normalize, merge, write.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{error, info, warn};
use trendfeed_core::{CanonicalRecord, MediaType, OutputDocument, PipelineConfig, PipelineError};
use trendfeed_metadata::merge::build_bucket;
use trendfeed_metadata::normalize::Normalizer;
use trendfeed_metadata::provider::{FeedProvider, fetch_all};
use trendfeed_store::writer::DocumentWriter;

/// What a successful run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub document: OutputDocument,
    pub path: PathBuf,
    /// Sources that failed this run. Their buckets were built without them.
    pub unavailable: Vec<PipelineError>,
}

/// Run the pipeline once.
///
/// Fails with [`PipelineError::AllSourcesEmpty`] when no source produced a
/// usable record; nothing is written in that case, so the previous document
/// stays in place.
pub async fn run(
    config: &PipelineConfig,
    provider: &dyn FeedProvider,
) -> Result<RunSummary, PipelineError> {
    config.validate()?;
    let normalizer = Normalizer::new(config.images.clone(), config.defaults.clone())
        .map_err(|e| PipelineError::Config(e.to_string()))?;
    let writer = DocumentWriter::new(&config.output, config.utc_offset_hours)
        .map_err(|e| PipelineError::Config(e.to_string()))?;

    let sources = config.referenced_sources();
    info!(sources = sources.len(), buckets = config.buckets.len(), "pipeline started");

    let outcomes = fetch_all(provider, &sources).await;

    let mut normalized: HashMap<String, Vec<CanonicalRecord>> = HashMap::new();
    let mut unavailable = Vec::new();
    for (source, outcome) in sources.iter().zip(outcomes) {
        match outcome.result {
            Ok(items) => {
                let records = normalizer.normalize_all(&items, source);
                info!(
                    source = %source.name,
                    fetched = items.len(),
                    usable = records.len(),
                    "normalized source"
                );
                normalized.insert(outcome.source, records);
            }
            Err(e) => unavailable.push(PipelineError::SourceUnavailable {
                name: outcome.source,
                reason: e.to_string(),
            }),
        }
    }

    let usable: usize = normalized.values().map(Vec::len).sum();
    if usable == 0 {
        warn!(
            unavailable = unavailable.len(),
            "no usable records from any source, keeping previous document"
        );
        return Err(PipelineError::AllSourcesEmpty);
    }

    let buckets = config
        .buckets
        .iter()
        .map(|bucket| build_bucket(bucket, &normalized))
        .collect();

    let document = writer
        .write(buckets)
        .map_err(|e| PipelineError::WriteFailure {
            path: writer.path().to_path_buf(),
            reason: e.to_string(),
        })?;

    let summary = RunSummary {
        document,
        path: writer.path().to_path_buf(),
        unavailable,
    };
    log_summary(&summary);
    Ok(summary)
}

fn log_summary(summary: &RunSummary) {
    for bucket in &summary.document.buckets {
        let movies = bucket
            .records
            .iter()
            .filter(|r| r.media_type == MediaType::Movie)
            .count();
        let tv = bucket
            .records
            .iter()
            .filter(|r| r.media_type == MediaType::Tv)
            .count();
        info!(
            bucket = %bucket.name,
            items = bucket.records.len(),
            movies,
            tv,
            "bucket ready"
        );
    }
    for err in &summary.unavailable {
        warn!(code = err.code(), error = %err, "built without source");
    }
    info!(
        path = %summary.path.display(),
        last_updated = %summary.document.last_updated,
        records = summary.document.record_count(),
        "pipeline finished"
    );
}

/// Run the pipeline now and then every `period` until Ctrl-C.
///
/// A failed cycle is logged and the previous document is left alone; the
/// loop keeps going.
pub async fn run_every(config: &PipelineConfig, provider: &dyn FeedProvider, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = run(config, provider).await {
                    error!(code = e.code(), error = %e, "pipeline run failed");
                }
                info!(next_in_secs = period.as_secs(), "waiting for next run");
            }
        }
    }
}
