//! Bucket merge engine.
//!
//! Merge rules:
//! 1. Sources are concatenated in configured priority order.
//! 2. Each source is truncated to its own cap before concatenation, so the
//!    mixture ratio between sources holds whatever the global cap is.
//! 3. The concatenation is truncated to the bucket's global cap.
//! 4. No sorting: upstream order is preserved within each source.

use std::collections::HashMap;

use tracing::debug;
use trendfeed_core::config::BucketConfig;
use trendfeed_core::{Bucket, CanonicalRecord};

/// One source's records and how many of them a bucket may take.
#[derive(Debug, Clone, Copy)]
pub struct MergeInput<'a> {
    pub records: &'a [CanonicalRecord],
    pub cap: usize,
}

/// Per-source cap, then global cap.
pub fn merge_limited(inputs: &[MergeInput<'_>], max_items: usize) -> Vec<CanonicalRecord> {
    inputs
        .iter()
        .flat_map(|input| input.records.iter().take(input.cap))
        .take(max_items)
        .cloned()
        .collect()
}

/// Build one bucket from the normalized records of every source.
///
/// A source missing from `normalized` (unavailable this run) contributes
/// nothing.
pub fn build_bucket(
    config: &BucketConfig,
    normalized: &HashMap<String, Vec<CanonicalRecord>>,
) -> Bucket {
    let inputs: Vec<MergeInput<'_>> = config
        .take
        .iter()
        .map(|take| MergeInput {
            records: normalized
                .get(&take.source)
                .map(Vec::as_slice)
                .unwrap_or_default(),
            cap: take.cap,
        })
        .collect();

    let records = merge_limited(&inputs, config.max_items);
    debug!(bucket = %config.name, items = records.len(), "merged bucket");
    Bucket::new(config.name.clone(), records)
}
