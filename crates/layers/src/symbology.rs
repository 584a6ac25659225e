use formats::LocalityDataset;
use serde::Serialize;

use crate::palette::{Palette, shape};

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct FillStyle {
    pub visible: bool,
    pub color: [f32; 4],
}

impl FillStyle {
    pub const fn new(color: [f32; 4]) -> Self {
        Self {
            visible: true,
            color,
        }
    }

    pub const fn none() -> Self {
        Self {
            visible: false,
            color: [0.0, 0.0, 0.0, 0.0],
        }
    }
}

impl Default for FillStyle {
    fn default() -> Self {
        // Light grey land.
        Self::new([0.87, 0.87, 0.87, 1.0])
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct StrokeStyle {
    pub color: [f32; 4],
    pub width_px: f32,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: [0.35, 0.35, 0.35, 1.0],
            width_px: 0.5,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize)]
pub struct PolygonStyle {
    pub fill: FillStyle,
    pub stroke: StrokeStyle,
}

/// Marker appearance for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStyle {
    pub category: String,
    pub color: [f32; 4],
    pub shape: &'static str,
    pub size_px: f32,
}

/// Category to marker assignment for a point layer, in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMapping {
    entries: Vec<CategoryStyle>,
}

impl CategoryMapping {
    pub const DEFAULT_SIZE_PX: f32 = 6.0;

    /// Assigns palette colors and shapes to `categories` by position.
    pub fn new<'a>(categories: impl IntoIterator<Item = &'a str>, palette: Palette) -> Self {
        let mut entries: Vec<CategoryStyle> = Vec::new();
        for category in categories {
            if entries.iter().any(|e| e.category == category) {
                continue;
            }
            let i = entries.len();
            entries.push(CategoryStyle {
                category: category.to_string(),
                color: palette.color(i),
                shape: shape(i),
                size_px: Self::DEFAULT_SIZE_PX,
            });
        }
        Self { entries }
    }

    pub fn for_dataset(dataset: &LocalityDataset, palette: Palette) -> Self {
        Self::new(dataset.categories(), palette)
    }

    /// Same color and shape for every category.
    pub fn uniform<'a>(
        categories: impl IntoIterator<Item = &'a str>,
        color: [f32; 4],
        shape: &'static str,
    ) -> Self {
        let mut mapping = Self::new(categories, Palette::default());
        for e in &mut mapping.entries {
            e.color = color;
            e.shape = shape;
        }
        mapping
    }

    pub fn with_size(mut self, size_px: f32) -> Self {
        for e in &mut self.entries {
            e.size_px = size_px;
        }
        self
    }

    pub fn entries(&self) -> &[CategoryStyle] {
        &self.entries
    }

    pub fn style_for(&self, category: &str) -> Option<&CategoryStyle> {
        self.entries.iter().find(|e| e.category == category)
    }
}
