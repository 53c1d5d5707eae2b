//! JSON-lines import of harvested abstracts.

use std::path::Path;

use super::{AbstractStore, StoreError};
use crate::models::Abstract;

/// Read one [`Abstract`] per line from `path` and upsert each into `store`.
///
/// Blank lines are skipped. The first malformed line aborts the import with its
/// 1-based line number; records before it stay imported. Returns the number of
/// records upserted.
pub async fn import_jsonl(store: &dyn AbstractStore, path: &Path) -> Result<usize, StoreError> {
    let contents = tokio::fs::read_to_string(path).await?;
    let mut imported = 0;

    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record: Abstract =
            serde_json::from_str(line).map_err(|e| StoreError::InvalidRecord {
                line: index + 1,
                message: e.to_string(),
            })?;
        if record.arxiv_id.trim().is_empty() {
            return Err(StoreError::InvalidRecord {
                line: index + 1,
                message: "missing arxiv_id".to_string(),
            });
        }

        store.upsert_abstract(&record).await?;
        imported += 1;
    }

    tracing::debug!("Imported {} records into {} store", imported, store.name());
    Ok(imported)
}
