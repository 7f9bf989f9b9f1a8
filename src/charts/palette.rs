//! Color Palette Module
//! Color parsing and cycling shared by all charts.

use plotters::style::{RGBAColor, RGBColor};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum PaletteError {
    #[error("Invalid color '{0}'")]
    InvalidColor(String),
    #[error("Palette has no colors")]
    Empty,
}

/// Default Manhattan plot colors
pub const MANHATTAN_COLORS: [RGBColor; 2] = [
    RGBColor(0x3B, 0x54, 0x88), // Navy
    RGBColor(0x53, 0xBB, 0xD5), // Sky
];

pub const COLORFUL: [RGBColor; 4] = [
    RGBColor(0x6D, 0xC0, 0x66), // Green
    RGBColor(0xFD, 0x48, 0x2F), // Red
    RGBColor(0x8A, 0x2B, 0xE2), // Violet
    RGBColor(0x33, 0x99, 0xFF), // Blue
];

pub const GRAYSCALE: [RGBColor; 2] = [RGBColor(0, 0, 0), RGBColor(0x96, 0x96, 0x96)];

pub const TAB10: [RGBColor; 10] = [
    RGBColor(0x1f, 0x77, 0xb4), // Blue
    RGBColor(0xff, 0x7f, 0x0e), // Orange
    RGBColor(0x2c, 0xa0, 0x2c), // Green
    RGBColor(0xd6, 0x27, 0x28), // Red
    RGBColor(0x94, 0x67, 0xbd), // Purple
    RGBColor(0x8c, 0x56, 0x4b), // Brown
    RGBColor(0xe3, 0x77, 0xc2), // Pink
    RGBColor(0x7f, 0x7f, 0x7f), // Gray
    RGBColor(0xbc, 0xbd, 0x22), // Olive
    RGBColor(0x17, 0xbe, 0xcf), // Cyan
];

/// Venn fills as (r, g, b, alpha), one per set.
pub const VENN_COLORS: [(f64, f64, f64, f64); 6] = [
    (0.361, 0.753, 0.384, 0.5),
    (0.353, 0.608, 0.831, 0.5),
    (0.965, 0.925, 0.337, 0.6),
    (0.945, 0.353, 0.376, 0.4),
    (1.000, 0.459, 0.000, 0.3),
    (0.322, 0.322, 0.745, 0.2),
];

/// Build an RGBA color from unit-interval channels.
pub fn rgba_from_unit(r: f64, g: f64, b: f64, a: f64) -> RGBAColor {
    let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    RGBAColor(channel(r), channel(g), channel(b), a.clamp(0.0, 1.0))
}

/// Parse `#RRGGBB`, `#RGB` or a basic color name.
pub fn parse_color(spec: &str) -> Result<RGBColor, PaletteError> {
    let s = spec.trim();
    let invalid = || PaletteError::InvalidColor(spec.to_string());

    if let Some(hex) = s.strip_prefix('#') {
        let digits: Vec<u8> = hex
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(invalid)?;
        return match digits.as_slice() {
            [r, g, b] => Ok(RGBColor(r * 17, g * 17, b * 17)),
            [r1, r2, g1, g2, b1, b2] => Ok(RGBColor(r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2)),
            _ => Err(invalid()),
        };
    }

    let color = match s.to_lowercase().as_str() {
        "r" | "red" => RGBColor(0xFF, 0, 0),
        "g" | "green" => RGBColor(0, 0x80, 0),
        "b" | "blue" => RGBColor(0, 0, 0xFF),
        "k" | "black" => RGBColor(0, 0, 0),
        "w" | "white" => RGBColor(0xFF, 0xFF, 0xFF),
        "c" | "cyan" => RGBColor(0, 0xBF, 0xBF),
        "m" | "magenta" => RGBColor(0xBF, 0, 0xBF),
        "y" | "yellow" => RGBColor(0xBF, 0xBF, 0),
        "gray" | "grey" => RGBColor(0x80, 0x80, 0x80),
        "orange" => RGBColor(0xFF, 0xA5, 0),
        "purple" => RGBColor(0x80, 0, 0x80),
        _ => return Err(invalid()),
    };
    Ok(color)
}

/// Parse a comma separated color list such as `#000000,#969696`.
pub fn parse_color_list(spec: &str) -> Result<Vec<RGBColor>, PaletteError> {
    spec.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(parse_color)
        .collect()
}

/// Cycles through a fixed list of colors.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorCycle {
    colors: Vec<RGBColor>,
}

impl ColorCycle {
    pub fn new(colors: Vec<RGBColor>) -> Result<Self, PaletteError> {
        if colors.is_empty() {
            return Err(PaletteError::Empty);
        }
        Ok(Self { colors })
    }

    /// Parse color specs; an empty list falls back to `default`.
    pub fn from_specs(specs: &[String], default: &[RGBColor]) -> Result<Self, PaletteError> {
        if specs.is_empty() {
            return Self::new(default.to_vec());
        }
        let mut colors = Vec::with_capacity(specs.len());
        for spec in specs {
            colors.extend(parse_color_list(spec)?);
        }
        Self::new(colors)
    }

    /// Get color for the `index`-th item.
    pub fn color(&self, index: usize) -> RGBColor {
        self.colors[index % self.colors.len()]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_color("#3B5488").unwrap(), RGBColor(0x3B, 0x54, 0x88));
        assert_eq!(parse_color("#fff").unwrap(), RGBColor(255, 255, 255));
        assert_eq!(parse_color(" #000000 ").unwrap(), RGBColor(0, 0, 0));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(parse_color("r").unwrap(), RGBColor(255, 0, 0));
        assert_eq!(parse_color("Black").unwrap(), RGBColor(0, 0, 0));
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(
            parse_color("#12345"),
            Err(PaletteError::InvalidColor("#12345".into()))
        );
        assert!(parse_color("#GGGGGG").is_err());
        assert!(parse_color("chartreuse-ish").is_err());
    }

    #[test]
    fn test_parse_color_list() {
        let colors = parse_color_list("#000000,#969696").unwrap();
        assert_eq!(colors, GRAYSCALE.to_vec());
        assert!(parse_color_list("#000000,nope").is_err());
    }

    #[test]
    fn test_cycle_wraps() {
        let cycle = ColorCycle::new(MANHATTAN_COLORS.to_vec()).unwrap();
        assert_eq!(cycle.color(0), MANHATTAN_COLORS[0]);
        assert_eq!(cycle.color(1), MANHATTAN_COLORS[1]);
        assert_eq!(cycle.color(2), MANHATTAN_COLORS[0]);
        assert_eq!(cycle.len(), 2);
    }

    #[test]
    fn test_cycle_from_specs() {
        let cycle = ColorCycle::from_specs(&[], &COLORFUL).unwrap();
        assert_eq!(cycle.len(), 4);

        let cycle = ColorCycle::from_specs(&["#000000,#969696".into(), "r".into()], &COLORFUL).unwrap();
        assert_eq!(cycle.len(), 3);
        assert_eq!(cycle.color(2), RGBColor(255, 0, 0));

        assert_eq!(ColorCycle::new(Vec::new()), Err(PaletteError::Empty));
    }

    #[test]
    fn test_rgba_from_unit() {
        let c = rgba_from_unit(1.0, 0.0, 0.5, 0.4);
        assert_eq!((c.0, c.1, c.2), (255, 0, 128));
        assert!((c.3 - 0.4).abs() < 1e-12);
    }
}
