//! Genomic coordinate <-> screen pixel transform
//!
//! A viewport shows a fixed-width window of `window_size` pixels onto one
//! sequence. Its state is the lowest visible genomic coordinate (`start`),
//! the zoom level in percent and the orientation.
//!
//! # Coordinate Systems
//!
//! - **Genomic space**: 1-based, inclusive positions on the direct strand.
//!
//! - **Screen space**: pixel offsets `0..window_size` from the left edge of
//!   the window.
//!
//! # Transformation
//!
//! With `scale = zoom_level / 100` (pixels per base) the window covers
//! `ceil(window_size / scale)` bases, so
//!
//! ```text
//! end = start + ceil(window_size / scale) - 1
//! ```
//!
//! In DIRECT orientation offsets grow from `start` to the right; in REVERSE
//! orientation they grow from `end` to the right. Because one pixel can cover
//! several bases (scale < 1) and one base several pixels (scale > 1), both
//! directions return inclusive ranges.

use crate::model::Orientation;

const SNAP_EPSILON: f64 = 1e-9;

/// Which pixel of a base's pixel span is treated as its canonical position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    Left,
    Right,
    Center,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub start: i64,
    pub zoom_level: f64,
    pub orientation: Orientation,
    pub window_size: u32,
}

// Values produced by float division that land within rounding noise of an
// integer are treated as that integer.
fn snap(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < SNAP_EPSILON {
        rounded
    } else {
        value
    }
}

fn floor(value: f64) -> i64 {
    snap(value).floor() as i64
}

fn ceil(value: f64) -> i64 {
    snap(value).ceil() as i64
}

/// Number of bases covered by `window_size` pixels at `scale`. A scale that is
/// zero, negative or not finite is read as one base per pixel.
pub fn visible_bases(window_size: u32, scale: f64) -> i64 {
    let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
    ceil(window_size as f64 / scale).max(1)
}

impl Viewport {
    pub fn new(start: i64, zoom_level: f64, orientation: Orientation, window_size: u32) -> Self {
        Self { start, zoom_level, orientation, window_size }
    }

    /// Pixels per base. An unusable zoom level reads as one pixel per base.
    pub fn scale(&self) -> f64 {
        let scale = self.zoom_level / 100.0;
        if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            1.0
        }
    }

    pub fn visible_bases(&self) -> i64 {
        visible_bases(self.window_size, self.scale())
    }

    pub fn end(&self) -> i64 {
        self.start.saturating_add(self.visible_bases() - 1)
    }

    pub fn contains(&self, genomic: i64) -> bool {
        genomic >= self.start && genomic <= self.end()
    }

    /// Inclusive genomic range drawn at pixel `x`.
    pub fn genomic_from_screen(&self, x: i64) -> [i64; 2] {
        let scale = self.scale();
        let first_offset = floor(x as f64 / scale);
        let last_offset = ceil((x + 1) as f64 / scale) - 1;
        match self.orientation {
            Orientation::Direct => [self.start + first_offset, self.start + last_offset],
            Orientation::Reverse => {
                let end = self.end();
                [end - last_offset, end - first_offset]
            }
        }
    }

    /// Inclusive pixel range covered by genomic position `genomic`.
    pub fn screen_from_genomic(&self, genomic: i64) -> [i64; 2] {
        let scale = self.scale();
        let offset = match self.orientation {
            Orientation::Direct => genomic - self.start,
            Orientation::Reverse => self.end() - genomic,
        };
        let first = floor(offset as f64 * scale);
        let last = ceil((offset + 1) as f64 * scale) - 1;
        [first, last.max(first)]
    }

    /// The start coordinate that makes `genomic` one of the bases drawn at
    /// `pixel`. When the pixel touches several bases, `anchor` picks which one
    /// `genomic` becomes: the leftmost on screen, the rightmost, or the middle.
    /// At scales that do not divide the window a base cut by the window edge
    /// stays partly visible.
    pub fn start_for_anchor(&self, genomic: i64, pixel: i64, anchor: Anchor) -> i64 {
        let scale = self.scale();
        // Offsets, counted from the left edge, of the bases touching `pixel`.
        let first = floor(pixel as f64 / scale);
        let last = ceil((pixel + 1) as f64 / scale) - 1;
        let offset = match anchor {
            Anchor::Left => first,
            Anchor::Right => last,
            Anchor::Center | Anchor::None => (first + last) / 2,
        };
        match self.orientation {
            Orientation::Direct => genomic - offset,
            Orientation::Reverse => genomic + offset - self.visible_bases() + 1,
        }
    }

    /// The viewport spanning exactly `start..=end` across the window.
    pub fn spanning(start: i64, end: i64, orientation: Orientation, window_size: u32) -> Self {
        let bases = (end - start + 1).max(1);
        let zoom_level = window_size as f64 / bases as f64 * 100.0;
        Self::new(start, zoom_level, orientation, window_size)
    }
}
