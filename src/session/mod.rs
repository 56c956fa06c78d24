/// Attach/detach API tying the cache to per-consumer playback.
pub mod handle;
