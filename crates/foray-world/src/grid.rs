//! The square tile grid shared by the simulation and the pathfinder.

use foray_types::{Bounds, Material, Position};
use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// A square grid of materials indexed by `(row, col)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    size: u32,
    tiles: Vec<Material>,
}

impl TileGrid {
    /// A `size` x `size` grid filled with `fill`.
    pub fn filled(size: u32, fill: Material) -> Self {
        let len = usize::try_from(size)
            .ok()
            .and_then(|s| s.checked_mul(s))
            .unwrap_or(0);
        Self {
            size,
            tiles: vec![fill; len],
        }
    }

    /// Build a grid from row-major rows. Rows shorter than the first are
    /// padded with [`Material::Void`].
    pub fn from_rows(rows: &[Vec<Material>]) -> Self {
        let size = u32::try_from(rows.len()).unwrap_or(0);
        let mut grid = Self::filled(size, Material::Void);
        for (r, row) in rows.iter().enumerate() {
            for (c, material) in row.iter().enumerate() {
                if let (Ok(r), Ok(c)) = (i32::try_from(r), i32::try_from(c)) {
                    let _ = grid.set(Position::new(r, c), *material);
                }
            }
        }
        grid
    }

    /// Side length.
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Bounds covering the whole grid.
    pub fn bounds(&self) -> Bounds {
        let max = i32::try_from(self.size)
            .unwrap_or(i32::MAX)
            .saturating_sub(1);
        Bounds::new(0, max, 0, max)
    }

    fn index(&self, pos: Position) -> Option<usize> {
        let r = u32::try_from(pos.row).ok()?;
        let c = u32::try_from(pos.col).ok()?;
        if r >= self.size || c >= self.size {
            return None;
        }
        let flat = r.checked_mul(self.size)?.checked_add(c)?;
        usize::try_from(flat).ok()
    }

    /// Whether `pos` lies on the grid.
    pub fn is_valid(&self, pos: Position) -> bool {
        self.index(pos).is_some()
    }

    /// Material at `pos`, or `None` off the grid.
    pub fn get(&self, pos: Position) -> Option<Material> {
        self.index(pos).and_then(|i| self.tiles.get(i).copied())
    }

    /// Whether an agent may stand on `pos`.
    pub fn is_habitable(&self, pos: Position) -> bool {
        self.get(pos).is_some_and(|m| !m.is_impassable())
    }

    /// Overwrite the material at `pos`.
    pub fn set(&mut self, pos: Position, material: Material) -> Result<(), WorldError> {
        let idx = self.index(pos).ok_or(WorldError::OffMap(pos))?;
        let slot = self.tiles.get_mut(idx).ok_or(WorldError::OffMap(pos))?;
        *slot = material;
        Ok(())
    }

    /// Every position holding `material`, in row-major order.
    pub fn positions_of(&self, material: Material) -> Vec<Position> {
        self.iter()
            .filter(|(_, m)| *m == material)
            .map(|(p, _)| p)
            .collect()
    }

    /// Iterate `(position, material)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, Material)> + '_ {
        let size = usize::try_from(self.size).unwrap_or(0).max(1);
        self.tiles.iter().enumerate().filter_map(move |(i, m)| {
            let r = i32::try_from(i.checked_div(size)?).ok()?;
            let c = i32::try_from(i.checked_rem(size)?).ok()?;
            Some((Position::new(r, c), *m))
        })
    }
}
