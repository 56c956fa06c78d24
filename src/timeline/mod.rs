/// Lazily composited frame sequence with cumulative timestamps.
pub mod frames;
