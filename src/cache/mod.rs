//! Reference-counted sharing of decoded timelines.

/// Source descriptions and their canonical keys.
pub mod source;
/// The cache itself.
pub mod store;
