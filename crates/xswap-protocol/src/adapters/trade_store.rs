//! Trade store adapters.

use crate::domain::{StoreError, Trade, TradeId};
use crate::ports::outbound::TradeStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

fn with_id(trade: &Trade) -> Trade {
    let mut stored = trade.clone();
    if stored.id.is_none() {
        stored.id = Some(TradeId::generate());
    }
    stored
}

/// In-memory trade store for tests and the demo.
#[derive(Debug, Default)]
pub struct InMemoryTradeStore {
    trades: RwLock<HashMap<TradeId, Trade>>,
}

impl InMemoryTradeStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored trades.
    pub fn len(&self) -> usize {
        self.trades.read().len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.trades.read().is_empty()
    }
}

impl TradeStore for InMemoryTradeStore {
    fn save(&self, trade: &Trade) -> Result<Trade, StoreError> {
        let stored = with_id(trade);
        if let Some(id) = stored.id {
            self.trades.write().insert(id, stored.clone());
        }
        Ok(stored)
    }

    fn get(&self, id: &TradeId) -> Result<Option<Trade>, StoreError> {
        Ok(self.trades.read().get(id).cloned())
    }

    fn list(&self) -> Result<Vec<TradeId>, StoreError> {
        let mut ids: Vec<TradeId> = self.trades.read().keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

/// One pretty-printed JSON file per trade, `<dir>/<id>.json`.
///
/// Writes go through a temp file and a rename so a crash never leaves a
/// half-written record behind.
#[derive(Debug, Clone)]
pub struct FileTradeStore {
    dir: PathBuf,
}

impl FileTradeStore {
    /// Store rooted at `dir`. The directory is created on first save.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Directory holding the trade files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &TradeId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

impl TradeStore for FileTradeStore {
    fn save(&self, trade: &Trade) -> Result<Trade, StoreError> {
        let stored = with_id(trade);
        let id = stored
            .id
            .ok_or_else(|| StoreError::NotFound("trade id".into()))?;

        std::fs::create_dir_all(&self.dir)?;
        let bytes = serde_json::to_vec_pretty(&stored)?;

        let path = self.path_for(&id);
        let temp_path = path.with_extension("json.tmp");
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        std::fs::rename(&temp_path, &path)?;

        debug!("[xswap] Saved trade {} to {}", id, path.display());
        Ok(stored)
    }

    fn get(&self, id: &TradeId) -> Result<Option<Trade>, StoreError> {
        let path = self.path_for(id);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    fn list(&self) -> Result<Vec<TradeId>, StoreError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<TradeId>().ok())
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, ChainSide, Commitment, Leg, RefundEnvelope};

    fn trade() -> Trade {
        Trade::new(
            Commitment::of(&[4u8; 32]),
            Leg::new("XLM", 10, Address::new("a1"), Address::new("b1"), 200),
            Leg::new("ETH", 3, Address::new("b2"), Address::new("a2"), 100),
        )
    }

    #[test]
    fn test_memory_save_assigns_id() {
        let store = InMemoryTradeStore::new();
        let saved = store.save(&trade()).unwrap();
        let id = saved.id.unwrap();
        assert_eq!(store.get(&id).unwrap(), Some(saved.clone()));

        let again = store.save(&saved).unwrap();
        assert_eq!(again.id, Some(id));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_memory_get_missing() {
        let store = InMemoryTradeStore::new();
        assert_eq!(store.get(&TradeId::generate()).unwrap(), None);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_file_roundtrip_preserves_refund_tx() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTradeStore::new(dir.path().join("trades"));

        let mut t = trade();
        t.initial_side = Some(ChainSide::ChainA);
        t.chain_a.holding_account = Some(Address::new("escrow"));
        t.chain_a.refund_tx = Some(RefundEnvelope::new("7b2274657273223a"));
        let saved = store.save(&t).unwrap();
        let id = saved.id.unwrap();

        let loaded = store.get(&id).unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(store.list().unwrap(), vec![id]);

        let raw = std::fs::read_to_string(dir.path().join("trades").join(format!("{}.json", id)))
            .unwrap();
        assert!(raw.contains("\"refundTx\": \"7b2274657273223a\""));
    }

    #[test]
    fn test_file_overwrite_keeps_single_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTradeStore::new(dir.path());
        let mut saved = store.save(&trade()).unwrap();
        saved.chain_b.holding_account = Some(Address::new("escrow-b"));
        store.save(&saved).unwrap();

        assert_eq!(store.list().unwrap().len(), 1);
        let id = saved.id.unwrap();
        assert_eq!(
            store.get(&id).unwrap().unwrap().chain_b.holding_account,
            Some(Address::new("escrow-b"))
        );
    }

    #[test]
    fn test_file_missing_dir_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTradeStore::new(dir.path().join("absent"));
        assert!(store.list().unwrap().is_empty());
        assert_eq!(store.get(&TradeId::generate()).unwrap(), None);
    }

    #[test]
    fn test_file_corrupt_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTradeStore::new(dir.path());
        let id = TradeId::generate();
        std::fs::write(dir.path().join(format!("{}.json", id)), b"{not json").unwrap();
        assert!(matches!(store.get(&id), Err(StoreError::Serialization(_))));
    }
}
