//! Categorical color palettes and point shapes.

use std::fmt;
use std::str::FromStr;

use crate::render::RenderError;

pub const TABLEAU10: &[&str] = &[
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f",
    "#edc948", "#b07aa1", "#ff9da7", "#9c755f", "#bab0ac",
];

pub const CATEGORY10: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd",
    "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
];

pub const SET1: &[&str] = &[
    "#e41a1c", "#377eb8", "#4daf4a", "#984ea3", "#ff7f00",
    "#ffff33", "#a65628", "#f781bf", "#999999",
];

pub const DARK2: &[&str] = &[
    "#1b9e77", "#d95f02", "#7570b3", "#e7298a", "#66a61e",
    "#e6ab02", "#a6761d", "#666666",
];

/// Marker shapes in assignment order.
pub const SHAPES: &[&str] = &[
    "circle",
    "square",
    "triangle-up",
    "diamond",
    "cross",
    "triangle-down",
    "triangle-left",
    "triangle-right",
];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Palette {
    #[default]
    Tableau10,
    Category10,
    Set1,
    Dark2,
}

impl Palette {
    pub fn colors(self) -> &'static [&'static str] {
        match self {
            Palette::Tableau10 => TABLEAU10,
            Palette::Category10 => CATEGORY10,
            Palette::Set1 => SET1,
            Palette::Dark2 => DARK2,
        }
    }

    /// Color for the `index`-th category; cycles past the palette length.
    pub fn color(self, index: usize) -> [f32; 4] {
        let colors = self.colors();
        hex_to_rgba(colors[index % colors.len()]).unwrap_or([0.0, 0.0, 0.0, 1.0])
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Palette::Tableau10 => "tableau10",
            Palette::Category10 => "category10",
            Palette::Set1 => "set1",
            Palette::Dark2 => "dark2",
        })
    }
}

impl FromStr for Palette {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tableau10" | "tableau" => Ok(Palette::Tableau10),
            "category10" => Ok(Palette::Category10),
            "set1" => Ok(Palette::Set1),
            "dark2" => Ok(Palette::Dark2),
            other => Err(RenderError::Style(format!("unknown palette '{other}'"))),
        }
    }
}

pub fn shape(index: usize) -> &'static str {
    SHAPES[index % SHAPES.len()]
}

/// Parses `#rrggbb` or `#rrggbbaa` into linear `[r, g, b, a]` in `0..=1`.
pub fn hex_to_rgba(hex: &str) -> Option<[f32; 4]> {
    let digits = hex.strip_prefix('#')?;
    if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| -> Option<f32> {
        u8::from_str_radix(&digits[i..i + 2], 16)
            .ok()
            .map(|v| v as f32 / 255.0)
    };
    let alpha = if digits.len() == 8 { channel(6)? } else { 1.0 };
    Some([channel(0)?, channel(2)?, channel(4)?, alpha])
}

pub fn rgba_to_hex(color: [f32; 4]) -> String {
    let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    if color[3] >= 1.0 {
        format!("#{:02x}{:02x}{:02x}", byte(color[0]), byte(color[1]), byte(color[2]))
    } else {
        format!(
            "#{:02x}{:02x}{:02x}{:02x}",
            byte(color[0]),
            byte(color[1]),
            byte(color[2]),
            byte(color[3])
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Palette, hex_to_rgba, rgba_to_hex, shape};
    use pretty_assertions::assert_eq;

    #[test]
    fn palettes_cycle() {
        assert_eq!(rgba_to_hex(Palette::Tableau10.color(0)), "#4e79a7");
        assert_eq!(Palette::Set1.color(9), Palette::Set1.color(0));
        assert_eq!(shape(0), "circle");
        assert_eq!(shape(8), "circle");
    }

    #[test]
    fn parses_palette_names() {
        assert_eq!("Dark2".parse::<Palette>().unwrap(), Palette::Dark2);
        assert_eq!("tableau".parse::<Palette>().unwrap(), Palette::Tableau10);
        assert!("viridis".parse::<Palette>().is_err());
    }

    #[test]
    fn hex_conversion() {
        assert_eq!(hex_to_rgba("#ff000080").map(rgba_to_hex).as_deref(), Some("#ff000080"));
        assert_eq!(hex_to_rgba("#000000"), Some([0.0, 0.0, 0.0, 1.0]));
        assert_eq!(hex_to_rgba("ff0000"), None);
        assert_eq!(hex_to_rgba("#ff00"), None);
        assert_eq!(hex_to_rgba("#gg0000"), None);
    }
}
