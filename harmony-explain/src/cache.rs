//! Explanation cache
//!
//! Durable mapping from an unordered participant pair to its explanation
//! record. The whole file is loaded into memory at startup and rewritten in
//! full on every update; there is no append log.
//!
//! ## Storage Format
//!
//! A single pretty-printed JSON object keyed by `"min-max"`:
//! `{ "0-3": { ...record... }, "1-2": { ... } }`

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use harmony_core::{ExplanationRecord, PairKey};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;

/// Default cache location
pub const DEFAULT_CACHE_PATH: &str = "data/llm_explanations_cache.json";

pub struct ExplanationCache {
    /// Backing file; `None` keeps the cache in memory only
    path: Option<PathBuf>,
    entries: RwLock<HashMap<PairKey, ExplanationRecord>>,
    /// Serializes whole-file rewrites so concurrent puts cannot lose updates
    write_lock: Mutex<()>,
    /// Bumped by every `clear`; guarded writes from an older generation are dropped
    generation: AtomicU64,
}

impl ExplanationCache {
    /// Open the cache file, loading every entry
    ///
    /// A missing file yields an empty cache. An unreadable or corrupt file is
    /// logged and also yields an empty cache; it is replaced on the next put.
    #[instrument]
    pub async fn open(path: impl AsRef<Path> + std::fmt::Debug) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => parse_entries(&bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No explanation cache at {:?}, starting empty", path);
                HashMap::new()
            }
            Err(e) => {
                warn!("Failed to read explanation cache {:?}: {}", path, e);
                HashMap::new()
            }
        };

        info!("Loaded {} cached explanations from {:?}", entries.len(), path);

        Ok(Self {
            path: Some(path),
            entries: RwLock::new(entries),
            write_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        })
    }

    /// Create an in-memory cache (for testing)
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &PairKey) -> Option<ExplanationRecord> {
        let record = self.entries.read().get(key).cloned();
        debug!(
            "Explanation cache {} for key: {}",
            if record.is_some() { "hit" } else { "miss" },
            key
        );
        record
    }

    pub fn contains(&self, key: &PairKey) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Store a record, overwriting any previous one, and rewrite the file
    #[instrument(skip(self, record))]
    pub async fn put(&self, key: PairKey, record: ExplanationRecord) -> Result<()> {
        let _writer = self.write_lock.lock().await;
        self.entries.write().insert(key, record);
        self.persist().await
    }

    /// Store a record only if the cache has not been cleared since `generation`
    ///
    /// Returns `false` when the record was discarded.
    #[instrument(skip(self, record))]
    pub async fn put_if_generation(
        &self,
        key: PairKey,
        record: ExplanationRecord,
        generation: u64,
    ) -> Result<bool> {
        let _writer = self.write_lock.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            return Ok(false);
        }
        self.entries.write().insert(key, record);
        self.persist().await?;
        Ok(true)
    }

    /// Current clear generation, read before work whose result is cached later
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Drop every entry and invalidate guarded writes still in progress
    pub async fn clear(&self) -> Result<()> {
        let _writer = self.write_lock.lock().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.write().clear();
        self.persist().await
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Rewrite the backing file; caller must hold `write_lock`
    async fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = {
            let entries = self.entries.read();
            let ordered: BTreeMap<String, &ExplanationRecord> = entries
                .iter()
                .map(|(key, record)| (key.to_string(), record))
                .collect();
            serde_json::to_vec_pretty(&ordered)?
        };

        // Write-then-rename so a crash never leaves a truncated cache
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, path).await?;

        debug!("Persisted explanation cache ({} bytes)", json.len());
        Ok(())
    }
}

/// Parse the on-disk map, skipping entries with a bad key or record
fn parse_entries(bytes: &[u8]) -> HashMap<PairKey, ExplanationRecord> {
    let raw: HashMap<String, serde_json::Value> = match serde_json::from_slice(bytes) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Explanation cache is corrupt, starting empty: {}", e);
            return HashMap::new();
        }
    };

    raw.into_iter()
        .filter_map(|(key, value)| {
            let key: PairKey = match key.parse() {
                Ok(k) => k,
                Err(e) => {
                    warn!("Skipping cache entry: {}", e);
                    return None;
                }
            };
            match serde_json::from_value::<ExplanationRecord>(value) {
                Ok(record) => Some((key, record)),
                Err(e) => {
                    warn!("Skipping cache entry {}: {}", key, e);
                    None
                }
            }
        })
        .collect()
}
