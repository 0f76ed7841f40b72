use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::fetch::StoreClient;
use crate::table::DataTable;

/// Source of raw file bytes. The production implementation is the remote
/// store client; tests inject a directory of fixture files so every view
/// computation is deterministic.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, file: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

impl Fetcher for StoreClient {
    async fn fetch(&self, file: &str) -> Result<Vec<u8>> {
        self.download(file).await
    }
}

/// Reads fixture files from a local directory. Used by tests and offline
/// runs against previously exported extracts.
pub struct FileFetcher {
    pub dir: PathBuf,
}

impl Fetcher for FileFetcher {
    async fn fetch(&self, file: &str) -> Result<Vec<u8>> {
        let path = self.dir.join(file);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading fixture `{}`", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SheetKey {
    file: String,
    sheet: Option<String>,
}

struct CachedBytes {
    bytes: Arc<Vec<u8>>,
    fetched_at: DateTime<Utc>,
}

/// Read-through cache of loaded extracts, keyed by (file, sheet).
///
/// Each file is fetched at most once per process; every sheet of a workbook
/// parses from the same downloaded bytes. There is no invalidation: a
/// snapshot lives until process restart, and every view computes from the
/// same immutable tables. Tables come out behind `Arc`, so concurrent
/// viewers share them without copying or locking during computation.
pub struct TableStore<F: Fetcher> {
    fetcher: F,
    bytes: RwLock<HashMap<String, CachedBytes>>,
    tables: RwLock<HashMap<SheetKey, Arc<DataTable>>>,
}

impl<F: Fetcher> TableStore<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            bytes: RwLock::new(HashMap::new()),
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// A CSV file as a table.
    pub async fn csv(&self, file: &str) -> Result<Arc<DataTable>> {
        self.table(file, None).await
    }

    /// One named sheet of an XLSX workbook.
    pub async fn sheet(&self, file: &str, sheet: &str) -> Result<Arc<DataTable>> {
        self.table(file, Some(sheet)).await
    }

    /// When the file was last fetched, if it has been.
    pub fn fetched_at(&self, file: &str) -> Option<DateTime<Utc>> {
        self.bytes
            .read()
            .expect("bytes cache lock poisoned")
            .get(file)
            .map(|c| c.fetched_at)
    }

    async fn table(&self, file: &str, sheet: Option<&str>) -> Result<Arc<DataTable>> {
        let key = SheetKey {
            file: file.to_string(),
            sheet: sheet.map(str::to_string),
        };
        if let Some(table) = self
            .tables
            .read()
            .expect("table cache lock poisoned")
            .get(&key)
        {
            debug!(file, ?sheet, "table cache hit");
            return Ok(Arc::clone(table));
        }

        let bytes = self.file_bytes(file).await?;
        let parsed = match sheet {
            Some(name) => DataTable::from_xlsx_sheet(&bytes, name),
            None => DataTable::from_csv(file, &bytes),
        }
        .with_context(|| format!("parsing `{file}`"))?;
        info!(file, ?sheet, rows = parsed.len(), "parsed table");

        let table = Arc::new(parsed);
        self.tables
            .write()
            .expect("table cache lock poisoned")
            .entry(key)
            .or_insert_with(|| Arc::clone(&table));
        Ok(table)
    }

    async fn file_bytes(&self, file: &str) -> Result<Arc<Vec<u8>>> {
        if let Some(cached) = self
            .bytes
            .read()
            .expect("bytes cache lock poisoned")
            .get(file)
        {
            return Ok(Arc::clone(&cached.bytes));
        }

        // Not held across the await: fetch outside the lock, then insert.
        // A racing viewer may fetch twice; last write wins harmlessly.
        let fetched = Arc::new(self.fetcher.fetch(file).await?);
        let mut cache = self.bytes.write().expect("bytes cache lock poisoned");
        let entry = cache.entry(file.to_string()).or_insert_with(|| CachedBytes {
            bytes: Arc::clone(&fetched),
            fetched_at: Utc::now(),
        });
        Ok(Arc::clone(&entry.bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn csv_is_fetched_once_and_served_from_cache() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data4web_gpp.csv");
        fs::write(&path, "country,value\nFrance,0.21\n").unwrap();

        let store = TableStore::new(FileFetcher {
            dir: dir.path().to_path_buf(),
        });

        let first = store.csv("data4web_gpp.csv").await.unwrap();
        assert_eq!(first.len(), 1);
        assert!(store.fetched_at("data4web_gpp.csv").is_some());

        // Deleting the backing file proves the second read is a cache hit.
        fs::remove_file(&path).unwrap();
        let second = store.csv("data4web_gpp.csv").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn missing_file_is_an_error_not_a_panic() {
        let dir = tempdir().unwrap();
        let store = TableStore::new(FileFetcher {
            dir: dir.path().to_path_buf(),
        });
        assert!(store.csv("nope.csv").await.is_err());
    }
}
