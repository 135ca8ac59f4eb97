//! Procedural map generation for the sandbox.
//!
//! The playable square is Grass sprinkled with resources, small lakes and
//! (optionally) stone outcrops, framed by a Void border.

use foray_types::{GameSettings, Material, Position};
use rand::Rng;

use crate::grid::TileGrid;

/// Per-tile probability of each scattered material, checked in order.
const SCATTER: [(Material, f64); 6] = [
    (Material::Foliage, 0.08),
    (Material::Tree, 0.05),
    (Material::Ore, 0.02),
    (Material::Crystal, 0.015),
    (Material::Herb, 0.02),
    (Material::Stone, 0.04),
];

/// Lakes per 1000 playable tiles.
const LAKES_PER_MILLE: u32 = 3;

/// Share of lake tiles that hold fish.
const FISH_SHARE: f64 = 0.25;

/// Generate a fresh map for `settings`.
pub fn generate<R: Rng>(settings: &GameSettings, rng: &mut R) -> TileGrid {
    let mut grid = TileGrid::filled(settings.total_size(), Material::Void);
    let lo = i32::try_from(settings.map_border).unwrap_or(0);
    let hi = i32::try_from(settings.map_border.saturating_add(settings.map_size))
        .unwrap_or(lo)
        .saturating_sub(1);

    for row in lo..=hi {
        for col in lo..=hi {
            let roll: f64 = rng.random();
            let mut acc = 0.0;
            let mut material = Material::Grass;
            for (candidate, p) in SCATTER {
                acc += p;
                if roll < acc {
                    material = candidate;
                    break;
                }
            }
            if material == Material::Stone && settings.disable_stone {
                material = Material::Grass;
            }
            let _ = grid.set(Position::new(row, col), material);
        }
    }

    let lakes = settings
        .map_size
        .saturating_mul(settings.map_size)
        .saturating_mul(LAKES_PER_MILLE)
        / 1000;
    for _ in 0..lakes.max(1) {
        let centre = Position::new(rng.random_range(lo..=hi), rng.random_range(lo..=hi));
        let radius: i32 = rng.random_range(1..=2);
        for d_row in -radius..=radius {
            for d_col in -radius..=radius {
                let pos = centre.offset(d_row, d_col);
                if pos.row < lo || pos.row > hi || pos.col < lo || pos.col > hi {
                    continue;
                }
                let material = if rng.random_bool(FISH_SHARE) {
                    Material::Fish
                } else {
                    Material::Water
                };
                let _ = grid.set(pos, material);
            }
        }
    }

    // The centre tile always stays walkable so the safe zone is reachable.
    let _ = grid.set(settings.center(), Material::Grass);
    grid
}
