//! Human-readable tile names.

use std::fmt;

use crate::{Tile, TileFace, TileKind};

const WIND_NAMES: [&str; 4] = ["东", "南", "西", "北"];
const DRAGON_NAMES: [&str; 3] = ["中", "白", "发"];
const FLOWER_NAMES: [&str; 8] = ["春", "夏", "秋", "冬", "梅", "兰", "竹", "菊"];

impl TileKind {
    /// Short Chinese label for the kind.
    pub fn label(self) -> &'static str {
        match self {
            Self::Wan => "万",
            Self::Tiao => "条",
            Self::Bing => "饼",
            Self::Wind => "风",
            Self::Dragon => "字",
            Self::Flower => "花",
        }
    }
}

impl fmt::Display for TileFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Ranks are validated on construction, so indexing is in range.
        let idx = usize::from(self.rank() - 1);
        match self.kind() {
            TileKind::Wan | TileKind::Tiao | TileKind::Bing => {
                write!(f, "{}{}", self.rank(), self.kind().label())
            }
            TileKind::Wind => f.write_str(WIND_NAMES[idx]),
            TileKind::Dragon => f.write_str(DRAGON_NAMES[idx]),
            TileKind::Flower => f.write_str(FLOWER_NAMES[idx]),
        }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.face().fmt(f)
    }
}
