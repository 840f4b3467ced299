//! Zoom preset tables and stepping between them.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Granularity {
    #[default]
    Coarse,
    Fine,
}

pub const COARSE_ZOOM_LEVELS: [f64; 15] = [
    1.0, 2.0, 5.0, 10.0, 20.0, 25.0, 50.0, 75.0, 100.0, 200.0, 300.0, 500.0, 1000.0, 2000.0,
    10000.0,
];

pub const FINE_ZOOM_LEVELS: [f64; 60] = [
    0.0005, 0.001, 0.002, 0.0025, 0.005, 0.0075, 0.01, 0.02, 0.025, 0.05, 0.075, 0.1, 0.2, 0.25,
    0.5, 0.75, 1.0, 1.5, 2.0, 2.5, 3.0, 4.0, 5.0, 6.0, 7.5, 10.0, 12.5, 15.0, 20.0, 25.0, 30.0,
    40.0, 50.0, 60.0, 70.0, 75.0, 80.0, 90.0, 100.0, 125.0, 150.0, 175.0, 200.0, 250.0, 300.0,
    350.0, 400.0, 500.0, 600.0, 700.0, 800.0, 1000.0, 1500.0, 2000.0, 2500.0, 3000.0, 4000.0,
    5000.0, 7500.0, 10000.0,
];

pub const MIN_ZOOM_LEVEL: f64 = 0.0005;
pub const MAX_ZOOM_LEVEL: f64 = 10000.0;
pub const DEFAULT_ZOOM_LEVEL: f64 = 100.0;

impl Granularity {
    pub fn levels(self) -> &'static [f64] {
        match self {
            Granularity::Coarse => &COARSE_ZOOM_LEVELS,
            Granularity::Fine => &FINE_ZOOM_LEVELS,
        }
    }
}

/// Smallest preset strictly greater than `current`. Past the last preset the
/// zoom is left unchanged.
pub fn next_zoom_in(current: f64, granularity: Granularity) -> f64 {
    granularity
        .levels()
        .iter()
        .copied()
        .find(|level| *level > current)
        .unwrap_or(current)
}

/// Largest preset strictly smaller than `current`. Below the first preset the
/// zoom is left unchanged.
pub fn next_zoom_out(current: f64, granularity: Granularity) -> f64 {
    granularity
        .levels()
        .iter()
        .rev()
        .copied()
        .find(|level| *level < current)
        .unwrap_or(current)
}

/// Bring a zoom level into the supported range. Zero, negative and
/// non-finite values fall back to the default.
pub fn clamp_zoom(zoom_level: f64) -> f64 {
    if !zoom_level.is_finite() || zoom_level <= 0.0 {
        return DEFAULT_ZOOM_LEVEL;
    }
    zoom_level.clamp(MIN_ZOOM_LEVEL, MAX_ZOOM_LEVEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_ascending() {
        for granularity in [Granularity::Coarse, Granularity::Fine] {
            let levels = granularity.levels();
            assert!(levels.windows(2).all(|w| w[0] < w[1]), "{granularity:?} not ascending");
            assert_eq!(levels[levels.len() - 1], MAX_ZOOM_LEVEL);
        }
        assert_eq!(COARSE_ZOOM_LEVELS[0], 1.0);
        assert_eq!(FINE_ZOOM_LEVELS[0], MIN_ZOOM_LEVEL);
    }

    #[test]
    fn test_step_from_between_presets() {
        assert_eq!(next_zoom_in(110.0, Granularity::Coarse), 200.0);
        assert_eq!(next_zoom_out(110.0, Granularity::Coarse), 100.0);
        assert_eq!(next_zoom_in(110.0, Granularity::Fine), 125.0);
    }

    #[test]
    fn test_step_saturates_at_ends() {
        assert_eq!(next_zoom_in(10000.0, Granularity::Coarse), 10000.0);
        assert_eq!(next_zoom_out(1.0, Granularity::Coarse), 1.0);
        assert_eq!(next_zoom_out(0.0005, Granularity::Fine), 0.0005);
        assert_eq!(next_zoom_out(0.5, Granularity::Coarse), 0.5, "Zooming out never zooms in");
        assert_eq!(next_zoom_out(0.0001, Granularity::Fine), 0.0001);
        assert_eq!(next_zoom_in(20000.0, Granularity::Fine), 20000.0, "Zooming in never zooms out");
    }

    #[test]
    fn test_clamp_zoom_rejects_unusable_levels() {
        assert_eq!(clamp_zoom(0.0), DEFAULT_ZOOM_LEVEL);
        assert_eq!(clamp_zoom(-5.0), DEFAULT_ZOOM_LEVEL);
        assert_eq!(clamp_zoom(f64::NAN), DEFAULT_ZOOM_LEVEL);
        assert_eq!(clamp_zoom(f64::INFINITY), DEFAULT_ZOOM_LEVEL);
        assert_eq!(clamp_zoom(0.00001), MIN_ZOOM_LEVEL);
        assert_eq!(clamp_zoom(1e9), MAX_ZOOM_LEVEL);
        assert_eq!(clamp_zoom(42.0), 42.0);
    }

    #[test]
    fn test_in_then_out_returns_to_preset() {
        for granularity in [Granularity::Coarse, Granularity::Fine] {
            let levels = granularity.levels();
            for level in &levels[..levels.len() - 1] {
                let back = next_zoom_out(next_zoom_in(*level, granularity), granularity);
                assert_eq!(back, *level, "{granularity:?} preset {level}");
            }
        }
    }
}
