use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::{
    cache::source::{GifSource, SourceKey, load_bytes, resolve_key},
    foundation::error::{AnimError, AnimResult},
    foundation::memo::Memo,
    timeline::frames::Timeline,
};

/// Options for [`DecodeCache`].
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheOpts {
    /// Directory relative file sources resolve against. Must be absolute when set.
    pub base_dir: Option<PathBuf>,
    /// Worker threads for background compositing; `None` lets rayon decide.
    pub threads: Option<usize>,
    /// Composite upcoming frames on the worker pool while playback runs.
    pub prefetch: bool,
}

impl Default for CacheOpts {
    fn default() -> Self {
        Self {
            base_dir: None,
            threads: None,
            prefetch: true,
        }
    }
}

struct CacheEntry {
    timeline: Memo<Timeline>,
}

struct Slot {
    refs: usize,
    entry: Arc<CacheEntry>,
}

/// Shared, reference-counted store of decoded timelines keyed by source identity.
///
/// The key map is guarded by one lock held only for insert, lookup and eviction. Decoding happens
/// outside that lock inside the entry's compute-once cell, so concurrent first acquisitions of
/// one key run a single decode and every waiter receives its result (or its error).
pub struct DecodeCache {
    opts: CacheOpts,
    pool: rayon::ThreadPool,
    entries: Mutex<HashMap<SourceKey, Slot>>,
    decodes: AtomicU64,
}

impl DecodeCache {
    /// Create a cache with its own worker pool.
    pub fn new(opts: CacheOpts) -> AnimResult<Self> {
        if let Some(base) = &opts.base_dir
            && !base.is_absolute()
        {
            return Err(AnimError::validation(format!(
                "cache base_dir '{}' must be absolute",
                base.display()
            )));
        }
        let pool = build_thread_pool(opts.threads)?;
        Ok(Self {
            opts,
            pool,
            entries: Mutex::new(HashMap::new()),
            decodes: AtomicU64::new(0),
        })
    }

    /// Options the cache was built with.
    pub fn opts(&self) -> &CacheOpts {
        &self.opts
    }

    /// Canonical key `source` is stored under.
    pub fn key_for(&self, source: &GifSource) -> AnimResult<SourceKey> {
        resolve_key(source, self.opts.base_dir.as_deref())
    }

    /// Shared timeline for `source`, decoding it on first acquisition.
    ///
    /// Every successful call takes one reference that must be given back with
    /// [`DecodeCache::release`]. The first frame is composited before this returns. A failed
    /// acquisition takes no reference.
    pub fn acquire(&self, source: &GifSource) -> AnimResult<Arc<Timeline>> {
        let key = self.key_for(source)?;

        let entry = {
            let mut entries = self.entries.lock();
            let hit = entries.contains_key(&key);
            let slot = entries.entry(key.clone()).or_insert_with(|| Slot {
                refs: 0,
                entry: Arc::new(CacheEntry {
                    timeline: Memo::new(),
                }),
            });
            slot.refs += 1;
            tracing::debug!(%key, refs = slot.refs, hit, "cache acquire");
            Arc::clone(&slot.entry)
        };

        let result = entry.timeline.get_or_compute(|| {
            self.decodes.fetch_add(1, Ordering::SeqCst);
            decode_source(source, &key)
        });

        if let Err(err) = &result {
            tracing::debug!(%key, error = %err, "cache decode failed");
            self.release(&key)?;
        }
        result
    }

    /// Give back one reference to `key`; the entry is evicted when none remain.
    ///
    /// Returns the number of references still held.
    pub fn release(&self, key: &SourceKey) -> AnimResult<usize> {
        let mut entries = self.entries.lock();
        let Some(slot) = entries.get_mut(key) else {
            return Err(AnimError::validation(format!("'{key}' is not in the cache")));
        };
        slot.refs -= 1;
        let remaining = slot.refs;
        if remaining == 0 {
            entries.remove(key);
            tracing::debug!(%key, "cache evict");
        } else {
            tracing::debug!(%key, refs = remaining, "cache release");
        }
        Ok(remaining)
    }

    /// Number of decodes started since the cache was created.
    pub fn decode_count(&self) -> u64 {
        self.decodes.load(Ordering::SeqCst)
    }

    /// References currently held on `key` (0 when absent).
    pub fn ref_count(&self, key: &SourceKey) -> usize {
        self.entries.lock().get(key).map_or(0, |s| s.refs)
    }

    /// Whether `key` has a live entry.
    pub fn contains(&self, key: &SourceKey) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no entries are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Composite frame `index` of `timeline` on the worker pool unless prefetch is disabled or the
    /// frame is already done. Returns whether work was scheduled.
    pub fn prefetch(&self, timeline: &Arc<Timeline>, index: usize) -> bool {
        if !self.opts.prefetch
            || index >= timeline.frame_count()
            || timeline.is_materialized(index)
        {
            return false;
        }
        let timeline = Arc::clone(timeline);
        self.pool.spawn(move || {
            if let Err(err) = timeline.frame(index) {
                tracing::debug!(index, error = %err, "prefetch failed");
            }
        });
        tracing::debug!(index, "prefetch scheduled");
        true
    }
}

impl std::fmt::Debug for DecodeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeCache")
            .field("opts", &self.opts)
            .field("entries", &self.len())
            .field("decodes", &self.decode_count())
            .finish()
    }
}

fn decode_source(source: &GifSource, key: &SourceKey) -> AnimResult<Timeline> {
    let bytes = load_bytes(source, key)?;
    let timeline = Timeline::from_bytes(&bytes)?;
    timeline.frame(0)?;
    Ok(timeline)
}

fn build_thread_pool(threads: Option<usize>) -> AnimResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(AnimError::validation(
            "cache 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("animgif-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| AnimError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/cache/store.rs"]
mod tests;
