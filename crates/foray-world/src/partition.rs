//! Three-band axis partitioning and the 3x3 area grid built on it.
//!
//! An inclusive axis range of `n` cells is split into three contiguous bands
//! whose lengths differ by at most one. With `base = n / 3`:
//!
//! | `n % 3` | band 0 | band 1 | band 2 |
//! |---|---|---|---|
//! | 0 | base | base | base |
//! | 1 | base | base + 1 | base |
//! | 2 | base + 1 | base | base + 1 |
//!
//! Applying the split to both axes of a [`Bounds`] yields the nine
//! [`Area`]s. The same code serves the absolute map partition (a player's
//! region) and the window-relative one (observation areas).

use foray_types::{Area, Bounds, Position};

use crate::error::WorldError;

/// Inclusive `(start, end)` of each of the three bands.
pub fn bands(start: i32, end: i32) -> Result<[(i32, i32); 3], WorldError> {
    if end < start {
        return Err(WorldError::EmptyRange { start, end });
    }
    let n = end
        .checked_sub(start)
        .and_then(|d| d.checked_add(1))
        .ok_or(WorldError::ArithmeticOverflow)?;
    let base = n / 3;
    let (l1, l2) = match n % 3 {
        0 => (base, base),
        1 => (base, base.saturating_add(1)),
        _ => (base.saturating_add(1), base),
    };
    let e1 = start
        .checked_add(l1)
        .and_then(|v| v.checked_sub(1))
        .ok_or(WorldError::ArithmeticOverflow)?;
    let e2 = e1.checked_add(l2).ok_or(WorldError::ArithmeticOverflow)?;
    Ok([
        (start, e1),
        (e1.saturating_add(1), e2),
        (e2.saturating_add(1), end),
    ])
}

/// Which band (0, 1 or 2) of `[start, end]` contains `x`.
pub fn which_part(start: i32, end: i32, x: i32) -> Result<u8, WorldError> {
    if !(start..=end).contains(&x) {
        return Err(WorldError::OutOfRange { x, start, end });
    }
    let [(_, e1), (_, e2), _] = bands(start, end)?;
    if x <= e1 {
        Ok(0)
    } else if x <= e2 {
        Ok(1)
    } else {
        Ok(2)
    }
}

/// Midpoint of each band, truncated toward zero.
pub fn range_midpoints(start: i32, end: i32) -> Result<[i32; 3], WorldError> {
    let b = bands(start, end)?;
    let mid = |(s, e): (i32, i32)| {
        s.checked_add(e)
            .map(|sum| sum / 2)
            .ok_or(WorldError::ArithmeticOverflow)
    };
    Ok([mid(b[0])?, mid(b[1])?, mid(b[2])?])
}

/// The area of `bounds` that contains `pos`.
pub fn area_of(bounds: Bounds, pos: Position) -> Result<Area, WorldError> {
    let row = which_part(bounds.min_row, bounds.max_row, pos.row)?;
    let col = which_part(bounds.min_col, bounds.max_col, pos.col)?;
    Area::from_bands(row, col).ok_or(WorldError::ArithmeticOverflow)
}

/// The cell at the middle of `area` within `bounds`.
pub fn area_midpoint(bounds: Bounds, area: Area) -> Result<Position, WorldError> {
    let rows = range_midpoints(bounds.min_row, bounds.max_row)?;
    let cols = range_midpoints(bounds.min_col, bounds.max_col)?;
    let (r, c) = area.bands();
    let row = rows
        .get(usize::from(r))
        .copied()
        .ok_or(WorldError::ArithmeticOverflow)?;
    let col = cols
        .get(usize::from(c))
        .copied()
        .ok_or(WorldError::ArithmeticOverflow)?;
    Ok(Position::new(row, col))
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    fn lengths(start: i32, end: i32) -> [i32; 3] {
        let b = bands(start, end).unwrap_or_default();
        b.map(|(s, e)| e.saturating_sub(s).saturating_add(1))
    }

    #[test]
    fn band_sizes_follow_remainder_policy() {
        assert_eq!(lengths(0, 14), [5, 5, 5]);
        assert_eq!(lengths(0, 15), [5, 6, 5]);
        assert_eq!(lengths(0, 16), [6, 5, 6]);
        assert_eq!(lengths(10, 10), [0, 1, 0]);
    }

    #[test]
    fn every_cell_in_exactly_one_band() {
        for n in 1..40 {
            let start = 7;
            let end = start + n - 1;
            let mut counts = [0_i32; 3];
            for x in start..=end {
                let part = which_part(start, end, x);
                assert!(part.is_ok());
                let idx = usize::from(part.unwrap_or(3));
                if let Some(c) = counts.get_mut(idx) {
                    *c += 1;
                }
            }
            assert_eq!(counts.iter().sum::<i32>(), n);
            let max = counts.iter().max().copied().unwrap_or(0);
            let min = counts.iter().min().copied().unwrap_or(0);
            assert!(max - min <= 1, "n={n} counts={counts:?}");
        }
    }

    #[test]
    fn outside_range_is_rejected() {
        assert_eq!(
            which_part(0, 9, 10),
            Err(WorldError::OutOfRange {
                x: 10,
                start: 0,
                end: 9
            })
        );
        assert!(which_part(0, 9, -1).is_err());
        assert!(bands(5, 4).is_err());
    }

    #[test]
    fn midpoints_truncate() {
        assert_eq!(range_midpoints(0, 14).unwrap_or_default(), [2, 7, 12]);
        assert_eq!(range_midpoints(0, 15).unwrap_or_default(), [2, 7, 13]);
    }

    #[test]
    fn window_areas() {
        let window = Bounds::new(10, 24, 30, 44);
        assert_eq!(
            area_of(window, Position::new(17, 37)).unwrap_or(Area::North),
            Area::Center
        );
        assert_eq!(
            area_of(window, Position::new(10, 44)).unwrap_or(Area::Center),
            Area::Northeast
        );
        assert_eq!(
            area_of(window, Position::new(24, 30)).unwrap_or(Area::Center),
            Area::Southwest
        );
        assert_eq!(
            area_midpoint(window, Area::West).unwrap_or(Position::new(0, 0)),
            Position::new(17, 32)
        );
    }
}
