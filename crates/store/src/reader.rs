use std::path::Path;

use trendfeed_core::OutputDocument;

use crate::StoreError;
use crate::timestamp::parse_timestamp;

/// Buckets the widget host expects in every document.
pub const REQUIRED_BUCKETS: &[&str] = &[
    "today_global",
    "week_global_all",
    "popular_movies",
    "popular_tvshows",
];

pub fn read_document(path: &Path) -> Result<OutputDocument, StoreError> {
    let contents = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Check `last_updated` and the presence of each required bucket.
pub fn validate_document(document: &OutputDocument, required: &[&str]) -> Result<(), StoreError> {
    if parse_timestamp(&document.last_updated).is_none() {
        return Err(StoreError::Invalid(format!(
            "last_updated is not `YYYY-MM-DD HH:MM:SS`: {:?}",
            document.last_updated
        )));
    }

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| document.bucket(name).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(StoreError::Invalid(format!(
            "missing buckets: {}",
            missing.join(", ")
        )));
    }

    Ok(())
}
