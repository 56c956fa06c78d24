//! Turning decoded indices into full-canvas RGBA rasters.

/// Frame rendering and disposal planning.
pub mod compositor;
/// Raster helpers: transparent canvases, rect clearing, de-interlacing.
pub mod raster;
