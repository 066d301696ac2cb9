//! Presence registry: client-side mirror of the server's peer list.
//!
//! Every `clients` push replaces the whole snapshot. Targets carry the
//! generation they were built in, so a target from an older list can no
//! longer be used to message anyone.

use std::sync::{PoisonError, RwLock};

use serde_json::json;

use castwire_core::error::{CastwireError, Result};
use castwire_core::protocol::{paths, Envelope};

/// Message sent when the caller does not supply one.
pub const DEFAULT_GREETING: &str = "Hello! how are you?";

/// One selectable peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerTarget {
    pub index: usize,
    pub id: String,
    pub label: String,
    generation: u64,
}

impl PeerTarget {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `toclient` envelope addressed to this peer.
    pub fn direct_message(&self, message: &str) -> Envelope {
        Envelope::new(paths::TO_CLIENT).with_data(json!({
            "id": self.id,
            "message": message,
        }))
    }
}

#[derive(Default)]
struct Snapshot {
    generation: u64,
    targets: Vec<PeerTarget>,
}

#[derive(Default)]
pub struct PresenceRegistry {
    inner: RwLock<Snapshot>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot with `ids`, in the order received.
    pub fn replace(&self, ids: Vec<String>) -> Vec<PeerTarget> {
        let mut snap = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let generation = snap.generation + 1;
        let targets: Vec<PeerTarget> = ids
            .into_iter()
            .enumerate()
            .map(|(index, id)| PeerTarget {
                index,
                label: format!("Client {}", index + 1),
                id,
                generation,
            })
            .collect();

        snap.generation = generation;
        snap.targets = targets.clone();
        targets
    }

    pub fn targets(&self) -> Vec<PeerTarget> {
        self.read(|s| s.targets.clone())
    }

    pub fn ids(&self) -> Vec<String> {
        self.read(|s| s.targets.iter().map(|t| t.id.clone()).collect())
    }

    pub fn get(&self, index: usize) -> Option<PeerTarget> {
        self.read(|s| s.targets.get(index).cloned())
    }

    pub fn len(&self) -> usize {
        self.read(|s| s.targets.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn generation(&self) -> u64 {
        self.read(|s| s.generation)
    }

    /// Build the direct message for `target`, rejecting targets from an older snapshot.
    pub fn direct_message(&self, target: &PeerTarget, message: &str) -> Result<Envelope> {
        let current = self.generation();
        if target.generation != current {
            return Err(CastwireError::BadEnvelope(format!(
                "peer target {} is stale (generation {} != {current})",
                target.id, target.generation
            )));
        }
        Ok(target.direct_message(message))
    }

    fn read<T>(&self, f: impl FnOnce(&Snapshot) -> T) -> T {
        let snap = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&snap)
    }
}
