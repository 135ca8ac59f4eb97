//! The closing fog field.
//!
//! After onset the fog edge starts at the playable border and advances
//! toward the map centre at `fog_speed` tiles per tick, stopping at the
//! permanent safe square of side `fog_final_size`. A tile's value is its
//! Chebyshev distance past the edge: positive inside the fog (the damage it
//! deals per tick), near zero on the edge, negative on ground the fog has
//! not reached. The permanent safe square reports `-total_size`.

use foray_types::{GameSettings, Position};

/// Fog value of `pos` at `tick`. Before onset every tile reports the
/// permanent-safety value.
pub fn fog_value(settings: &GameSettings, tick: u32, pos: Position) -> f64 {
    let protected = -f64::from(settings.total_size());
    let Some(onset) = settings.fog_onset else {
        return protected;
    };
    if tick < onset {
        return protected;
    }
    let half_final = f64::from(settings.fog_final_size) / 2.0;
    let distance = f64::from(pos.linf(settings.center()));
    if distance <= half_final {
        return protected;
    }
    let elapsed = f64::from(tick.saturating_sub(onset));
    let start_edge = f64::from(settings.map_size) / 2.0;
    let edge = elapsed
        .mul_add(-settings.fog_speed, start_edge)
        .max(half_final);
    distance - edge
}

/// Whole-point damage dealt by a fog value, capped at 100.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn fog_damage(value: f64) -> u32 {
    if value > 0.5 {
        value.ceil().clamp(0.0, 100.0) as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> GameSettings {
        GameSettings {
            map_size: 32,
            map_border: 8,
            fog_onset: Some(10),
            fog_speed: 0.5,
            fog_final_size: 8,
            ..GameSettings::default()
        }
    }

    #[test]
    fn inactive_before_onset() {
        let s = settings();
        let v = fog_value(&s, 9, Position::new(8, 8));
        assert!(v < 0.0);
        assert_eq!(fog_damage(v), 0);
    }

    #[test]
    fn edge_advances_inward() {
        let s = settings();
        // Centre is (24, 24); the playable border sits 16 tiles out.
        let border = Position::new(24, 8);
        assert!(fog_value(&s, 10, border).abs() < 1e-10);
        assert!(fog_value(&s, 20, border) > 0.5);
        assert_eq!(fog_damage(fog_value(&s, 20, border)), 5);
        let inner = Position::new(24, 18);
        assert!(fog_value(&s, 20, inner) < 0.0);
    }

    #[test]
    fn safe_square_never_fogs() {
        let s = settings();
        let v = fog_value(&s, 10_000, Position::new(26, 22));
        assert!(v < -30.0);
    }
}
