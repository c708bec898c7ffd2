//! Tile image lookup.
//!
//! Maps a `(kind, rank)` pair to an asset path. The lookup is total: any
//! input without a mapping resolves to the fallback asset.

use strum::IntoEnumIterator;

use crate::TileKind;

/// Default base path for tile images.
pub const DEFAULT_TILE_IMAGE_BASE: &str = "/images/tiles/";

/// File name of the fallback image.
pub const FALLBACK_TILE_IMAGE: &str = "default.png";

const FLOWER_FILES: [&str; 8] = [
    "chun.png", "xia.png", "qiu.png", "dong.png", "mei.png", "lan.png", "zu.png", "ju.png",
];

fn tile_file_name(kind: TileKind, rank: i64) -> Option<String> {
    if !kind.accepts_rank(rank) {
        return None;
    }
    let name = match kind {
        TileKind::Wan => format!("{rank}m.png"),
        TileKind::Tiao => format!("{rank}s.png"),
        TileKind::Bing => format!("{rank}p.png"),
        TileKind::Wind => format!("{rank}z.png"),
        // Dragons follow the winds in the honor sheet: 5z, 6z, 7z.
        TileKind::Dragon => format!("{}z.png", rank + 4),
        TileKind::Flower => FLOWER_FILES[(rank - 1) as usize].to_string(),
    };
    Some(name)
}

/// Returns the image path for a tile, or the fallback path if none exists.
pub fn tile_image_path(base: &str, kind: TileKind, rank: i64) -> String {
    let file = tile_file_name(kind, rank).unwrap_or_else(|| FALLBACK_TILE_IMAGE.to_string());
    format!("{base}{file}")
}

/// Returns the image path for every valid tile face, for preloading.
pub fn all_tile_image_paths(base: &str) -> Vec<String> {
    TileKind::iter()
        .flat_map(|kind| (1..=i64::from(kind.max_rank())).map(move |rank| (kind, rank)))
        .map(|(kind, rank)| tile_image_path(base, kind, rank))
        .collect()
}
