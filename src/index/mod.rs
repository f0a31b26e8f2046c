//! Capability Index
//!
//! Authoritative name → winning bundle table built from the storage resolver
//! and the metadata-only parser, plus a TTL cache of fully parsed bundles.
//!
//! Rebuilds scan into a scratch table without holding any lock and then
//! install it with a single pointer swap, so readers only ever see complete
//! snapshots.

pub mod cache;
pub mod resolve;

use crate::bundle::{self, BundleLimits, CapabilityBundle, IndexEntry};
use crate::config::IndexConfig;
use crate::error::{IndexError, ParseError, ParseErrorKind};
use crate::storage::StorageResolver;
use cache::{BundleCache, ManifestStamp};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use resolve::{resolve_conflicts, Conflict, Resolution};

/// Rebuild throttle and cache lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSettings {
    pub min_rebuild_interval: Duration,
    pub cache_ttl: Duration,
}

impl Default for IndexSettings {
    fn default() -> Self {
        IndexSettings::from(&IndexConfig::default())
    }
}

impl From<&IndexConfig> for IndexSettings {
    fn from(config: &IndexConfig) -> Self {
        Self {
            min_rebuild_interval: config.min_rebuild_interval(),
            cache_ttl: config.cache_ttl(),
        }
    }
}

/// Cache eviction target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTarget<'a> {
    Name(&'a str),
    All,
}

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub generation: u64,
    pub entries: usize,
    pub cached: usize,
    pub rebuilds: u64,
    pub throttled: u64,
    /// Bundles excluded by the most recent rebuilds because they failed to parse
    pub skipped: u64,
    /// Same-name collisions seen across rebuilds (ties and shadowing)
    pub conflicts: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Calls into the full (Stage-2) parser
    pub full_parses: u64,
}

#[derive(Debug, Default)]
struct Counters {
    rebuilds: AtomicU64,
    throttled: AtomicU64,
    skipped: AtomicU64,
    conflicts: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    full_parses: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
struct Snapshot {
    generation: u64,
    entries: BTreeMap<String, IndexEntry>,
    diagnostics: Vec<ParseError>,
}

/// Priority-resolved skill index shared across execution units.
#[derive(Debug)]
pub struct CapabilityIndex {
    resolver: StorageResolver,
    limits: BundleLimits,
    settings: IndexSettings,
    snapshot: RwLock<Arc<Snapshot>>,
    cache: BundleCache,
    last_rebuild: Mutex<Option<Instant>>,
    counters: Counters,
}

impl CapabilityIndex {
    /// Create an empty index. Nothing is scanned until `rebuild` is called.
    pub fn new(resolver: StorageResolver, limits: BundleLimits, settings: IndexSettings) -> Self {
        Self {
            resolver,
            limits,
            settings,
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            cache: BundleCache::new(settings.cache_ttl),
            last_rebuild: Mutex::new(None),
            counters: Counters::default(),
        }
    }

    pub fn resolver(&self) -> &StorageResolver {
        &self.resolver
    }

    pub fn limits(&self) -> &BundleLimits {
        &self.limits
    }

    /// Rescan all tiers and install a new snapshot. Returns the entry count.
    ///
    /// Without `force`, a call within `min_rebuild_interval` of the previous
    /// rebuild returns the current count without touching the filesystem.
    pub fn rebuild(&self, force: bool) -> usize {
        {
            let mut last = self.last_rebuild.lock();
            if !force {
                if let Some(at) = *last {
                    if at.elapsed() < self.settings.min_rebuild_interval {
                        Counters::bump(&self.counters.throttled);
                        tracing::debug!("Index rebuild throttled");
                        return self.len();
                    }
                }
            }
            *last = Some(Instant::now());
        }

        let started = Instant::now();
        let mut candidates = Vec::new();
        let mut diagnostics = Vec::new();
        for location in self.resolver.enumerate() {
            match bundle::parse_metadata_only(&location, &self.limits) {
                Ok(entry) => candidates.push(entry),
                Err(err) => {
                    tracing::warn!(
                        tier = %location.tier,
                        path = %location.dir.display(),
                        "Skipping invalid skill bundle: {}",
                        err
                    );
                    diagnostics.push(err);
                }
            }
        }

        let scanned = candidates.len() + diagnostics.len();
        let resolution = resolve_conflicts(candidates);
        for conflict in &resolution.conflicts {
            if conflict.tie {
                tracing::warn!(
                    skill = %conflict.name,
                    kept = %conflict.winner.display(),
                    discarded = %conflict.loser.display(),
                    "Skill name conflict with equal precedence; first discovered wins"
                );
            } else {
                tracing::debug!(
                    skill = %conflict.name,
                    kept = %conflict.winner.display(),
                    shadowed = %conflict.loser.display(),
                    "Skill shadowed by higher precedence bundle"
                );
            }
        }
        self.counters
            .skipped
            .fetch_add(diagnostics.len() as u64, Ordering::Relaxed);
        self.counters
            .conflicts
            .fetch_add(resolution.conflicts.len() as u64, Ordering::Relaxed);

        let count = resolution.winners.len();
        let installed = {
            let mut guard = self.snapshot.write();
            let next = Arc::new(Snapshot {
                generation: guard.generation + 1,
                entries: resolution.winners,
                diagnostics,
            });
            *guard = next.clone();
            next
        };
        Counters::bump(&self.counters.rebuilds);

        let evicted = self
            .cache
            .retain(|source| installed.entries.get(&source.name) == Some(source));

        tracing::info!(
            generation = installed.generation,
            skills = count,
            scanned,
            skipped = installed.diagnostics.len(),
            evicted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Capability index rebuilt"
        );
        count
    }

    /// Stage-1 metadata for every winning bundle, sorted by name.
    pub fn list_discoverable(&self) -> Vec<IndexEntry> {
        let snapshot = self.snapshot.read().clone();
        snapshot.entries.values().cloned().collect()
    }

    /// Winning entry for `name`, if indexed.
    pub fn get_entry(&self, name: &str) -> Option<IndexEntry> {
        let name = bundle::normalize_name(name);
        self.snapshot.read().entries.get(&name).cloned()
    }

    /// Full bundle for `name`, served from cache while it is live.
    pub fn get_full(&self, name: &str) -> Result<Arc<CapabilityBundle>, IndexError> {
        let name = bundle::normalize_name(name);
        let entry = self
            .snapshot
            .read()
            .entries
            .get(&name)
            .cloned()
            .ok_or_else(|| IndexError::NotFound { name: name.clone() })?;

        if let Some(bundle) = self.cache.get(&entry) {
            Counters::bump(&self.counters.cache_hits);
            return Ok(bundle);
        }
        Counters::bump(&self.counters.cache_misses);
        Counters::bump(&self.counters.full_parses);

        let stamp = ManifestStamp::read(&entry.location);
        let parsed = bundle::parse_full(
            &entry.location,
            entry.source_tier,
            entry.source_priority,
            &self.limits,
        )?;
        if parsed.name != entry.name {
            return Err(ParseError::new(
                ParseErrorKind::Malformed,
                &entry.location.join(bundle::MANIFEST_FILE),
                format!(
                    "manifest now names '{}' but was indexed as '{}'; rebuild the index",
                    parsed.name, entry.name
                ),
            )
            .with_field("name")
            .into());
        }

        let parsed = Arc::new(parsed);
        self.cache.insert(entry, stamp, parsed.clone());
        Ok(parsed)
    }

    /// Evict cached bundles. Returns how many entries were dropped.
    pub fn invalidate(&self, target: CacheTarget<'_>) -> usize {
        let evicted = match target {
            CacheTarget::Name(name) => {
                usize::from(self.cache.remove(&bundle::normalize_name(name)))
            }
            CacheTarget::All => self.cache.clear(),
        };
        tracing::debug!(?target, evicted, "Bundle cache invalidated");
        evicted
    }

    /// Parse failures recorded by the most recent rebuild.
    pub fn diagnostics(&self) -> Vec<ParseError> {
        self.snapshot.read().diagnostics.clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn generation(&self) -> u64 {
        self.snapshot.read().generation
    }

    pub fn stats(&self) -> IndexStats {
        let (generation, entries) = {
            let snapshot = self.snapshot.read();
            (snapshot.generation, snapshot.entries.len())
        };
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        IndexStats {
            generation,
            entries,
            cached: self.cache.len(),
            rebuilds: load(&self.counters.rebuilds),
            throttled: load(&self.counters.throttled),
            skipped: load(&self.counters.skipped),
            conflicts: load(&self.counters.conflicts),
            cache_hits: load(&self.counters.cache_hits),
            cache_misses: load(&self.counters.cache_misses),
            full_parses: load(&self.counters.full_parses),
        }
    }
}
