//! Stage-2 bundle cache with TTL expiry.
//!
//! Entries remember the index entry they were parsed from and a stamp of the
//! manifest file at parse time. A lookup against a different entry (the
//! winner changed) or a manifest edited since (same winner, new content) is
//! a miss.

use crate::bundle::{CapabilityBundle, IndexEntry, MANIFEST_FILE};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// Modification time and length of a bundle's manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl ManifestStamp {
    /// Stamp of `bundle_dir/SKILL.md`; `None` if it cannot be read.
    pub fn read(bundle_dir: &Path) -> Option<Self> {
        let metadata = std::fs::metadata(bundle_dir.join(MANIFEST_FILE)).ok()?;
        Some(Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    bundle: Arc<CapabilityBundle>,
    source: IndexEntry,
    stamp: Option<ManifestStamp>,
    /// `None` when `now + ttl` is not representable; such entries never expire
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }

    fn is_current(&self) -> bool {
        ManifestStamp::read(&self.source.location) == self.stamp
    }
}

/// Name-keyed cache of fully parsed bundles.
#[derive(Debug)]
pub struct BundleCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl BundleCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Live bundle parsed from exactly `source`, with its manifest unchanged.
    pub fn get(&self, source: &IndexEntry) -> Option<Arc<CapabilityBundle>> {
        let entries = self.entries.read();
        let entry = entries.get(&source.name)?;
        if entry.source == *source && entry.is_live(Instant::now()) && entry.is_current() {
            Some(entry.bundle.clone())
        } else {
            None
        }
    }

    /// Store `bundle` parsed from `source`. `stamp` must be read before parsing.
    pub fn insert(
        &self,
        source: IndexEntry,
        stamp: Option<ManifestStamp>,
        bundle: Arc<CapabilityBundle>,
    ) {
        let entry = CacheEntry {
            bundle,
            expires_at: Instant::now().checked_add(self.ttl),
            source,
            stamp,
        };
        self.entries.write().insert(entry.source.name.clone(), entry);
    }

    pub fn remove(&self, name: &str) -> bool {
        self.entries.write().remove(name).is_some()
    }

    /// Drop every entry. Returns how many were evicted.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let evicted = entries.len();
        entries.clear();
        evicted
    }

    /// Keep only entries for which `keep(source)` holds, dropping expired
    /// and edited ones along the way. Returns how many were evicted.
    pub fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&IndexEntry) -> bool,
    {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now) && keep(&entry.source) && entry.is_current());
        before - entries.len()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
