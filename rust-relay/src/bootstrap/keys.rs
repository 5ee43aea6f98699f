//! Routing keys file parsing.
//!
//! The file is a CSV with one routing key per row in the first column. Row
//! `n` belongs to replica `n`.

use std::path::Path;

use crate::error::StartupError;
use crate::queue::RoutingKey;

/// Read every row's first column from the routing keys file.
pub async fn load_routing_keys(path: &Path) -> Result<Vec<String>, StartupError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| StartupError::KeysFile {
            path: path.to_path_buf(),
            source,
        })?;

    parse_routing_keys(&raw).map_err(|source| StartupError::KeysFormat {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse CSV rows, keeping the first column.
///
/// Quoted fields follow the usual CSV rules, so a key may contain commas or
/// doubled quotes. Blank lines are skipped and rows may differ in length.
pub fn parse_routing_keys(raw: &str) -> csv::Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(raw.as_bytes());

    let mut keys = Vec::new();
    for record in reader.records() {
        let record = record?;
        keys.push(record.get(0).unwrap_or_default().trim().to_string());
    }

    Ok(keys)
}

/// Pick the key for a 1-based replica index.
pub fn select_routing_key(keys: &[String], index: usize) -> Result<RoutingKey, StartupError> {
    let raw = index
        .checked_sub(1)
        .and_then(|i| keys.get(i))
        .ok_or(StartupError::KeyUnavailable {
            index,
            available: keys.len(),
        })?;

    RoutingKey::new(raw).ok_or(StartupError::EmptyKey { index })
}
