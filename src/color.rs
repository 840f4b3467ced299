//! RGB colors and the linear gradients derived from them.
//!
//! Colors serialize as `#RRGGBB` strings so that preference files stay
//! readable. Gradients are never edited directly; they are derived from a
//! track's background and foreground (or secondary) colors and cached in the
//! settings store until one of those colors changes.

use crate::error::SettingsError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const DEFAULT_GRADIENT_STEPS: usize = 256;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

static NAMED_COLORS: Lazy<HashMap<&'static str, Color>> = Lazy::new(|| {
    HashMap::from([
        ("black", Color::BLACK),
        ("white", Color::WHITE),
        ("red", Color::RED),
        ("green", Color::rgb(0, 200, 0)),
        ("blue", Color::BLUE),
        ("yellow", Color::rgb(255, 255, 0)),
        ("cyan", Color::rgb(0, 255, 255)),
        ("magenta", Color::rgb(255, 0, 255)),
        ("orange", Color::rgb(255, 200, 0)),
        ("pink", Color::rgb(255, 175, 175)),
        ("gray", Color::GRAY),
        ("grey", Color::GRAY),
        ("lightgray", Color::LIGHT_GRAY),
        ("lightgrey", Color::LIGHT_GRAY),
        ("darkgray", Color::rgb(64, 64, 64)),
        ("darkgrey", Color::rgb(64, 64, 64)),
    ])
});

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const LIGHT_GRAY: Color = Color::rgb(192, 192, 192);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB`, `RRGGBB`, `r,g,b` or a color name.
    pub fn parse(text: &str) -> Result<Self, SettingsError> {
        let trimmed = text.trim();
        let invalid = || SettingsError::InvalidColor(text.to_string());

        if let Some(color) = NAMED_COLORS.get(trimmed.to_ascii_lowercase().as_str()) {
            return Ok(*color);
        }

        if trimmed.contains(',') {
            let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
            if parts.len() != 3 {
                return Err(invalid());
            }
            let channel = |s: &str| s.parse::<u8>().map_err(|_| invalid());
            return Ok(Self::rgb(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?));
        }

        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Linear interpolation towards `other`; `t` is clamped to [0, 1].
    pub fn lerp(self, other: Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color::rgb(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl TryFrom<String> for Color {
    type Error = SettingsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse(&value)
    }
}

/// A linear color ramp, used to shade numeric tracks by value.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorGradient {
    pub from: Color,
    pub to: Color,
    pub steps: usize,
}

impl ColorGradient {
    pub fn new(from: Color, to: Color) -> Self {
        Self { from, to, steps: DEFAULT_GRADIENT_STEPS }
    }

    /// The base color of the ramp, i.e. the color drawn at full value.
    pub fn base_color(&self) -> Color {
        self.to
    }

    pub fn color_at(&self, fraction: f64) -> Color {
        self.from.lerp(self.to, fraction)
    }

    pub fn colors(&self) -> Vec<Color> {
        let steps = self.steps.max(2);
        (0..steps)
            .map(|i| self.color_at(i as f64 / (steps - 1) as f64))
            .collect()
    }

    /// Rebuild a gradient from the full color list written by older versions.
    pub fn from_legacy_colors(colors: &[Color]) -> Option<Self> {
        let (first, last) = (colors.first()?, colors.last()?);
        Some(Self { from: *first, to: *last, steps: colors.len().max(2) })
    }
}
