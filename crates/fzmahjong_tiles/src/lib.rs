//! Fuzhou mahjong tile vocabulary.
//!
//! Pure value types shared by the client: tiles, the gold (wildcard)
//! designation, run-candidate search and presentation helpers. Nothing in
//! this crate performs I/O.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod chi;
mod display;
mod images;
mod tile;

pub use chi::{ChiCandidate, RunPosition, chi_candidates};
pub use images::{
    DEFAULT_TILE_IMAGE_BASE, FALLBACK_TILE_IMAGE, all_tile_image_paths, tile_image_path,
};
pub use tile::{Tile, TileError, TileFace, TileKind};
