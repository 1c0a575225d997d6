use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::block::Block;

/// File name of the single persisted state document.
pub const DATA_FILE: &str = "blockchain.json";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The on-disk layout: everything a node needs to restart lives in one
/// JSON document. Balances are derived state and are never persisted.
#[derive(Debug, Serialize, Deserialize)]
pub struct PersistedState {
    pub chain: Vec<Block>,
    pub difficulty: u32,
    pub nodes: Vec<String>,
}

/// Whole-document persistence for chain, difficulty and peer set.
///
/// Every state-changing event rewrites the full document; writes go to a
/// temp file first and are renamed into place so readers never observe a
/// torn document. A missing or unreadable file is treated as a fresh node.
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Open a store rooted at `data_dir`, creating the directory if needed.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        fs::create_dir_all(data_dir.as_ref())?;
        Ok(Self {
            path: data_dir.as_ref().join(DATA_FILE),
        })
    }

    /// Persist the full state document.
    pub fn save(
        &self,
        chain: &[Block],
        difficulty: u32,
        nodes: &HashSet<String>,
    ) -> Result<(), StorageError> {
        let document = PersistedState {
            chain: chain.to_vec(),
            difficulty,
            nodes: nodes.iter().cloned().collect(),
        };

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_vec_pretty(&document)?)?;
        fs::rename(&tmp_path, &self.path)?;
        tracing::debug!(blocks = chain.len(), path = %self.path.display(), "state persisted");
        Ok(())
    }

    /// Load the persisted document, or `None` for a fresh node. A corrupt
    /// document is logged and treated as absent.
    pub fn load(&self) -> Option<PersistedState> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "corrupt state file, starting fresh");
                None
            }
        }
    }

    /// Lightweight re-read of just the peer set, used by gossip to see
    /// registrations made by other workers sharing this file. Absent or
    /// corrupt state yields an empty set.
    pub fn load_peers(&self) -> HashSet<String> {
        self.load()
            .map(|state| state.nodes.into_iter().collect())
            .unwrap_or_default()
    }
}
