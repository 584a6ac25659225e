use formats::LocalityDataset;
use geo::Coord;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelStyle {
    pub font_size_px: f32,
    pub color: [f32; 4],
    pub halo_color: [f32; 4],
    pub halo_width_px: f32,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size_px: 11.0,
            color: [0.1, 0.1, 0.1, 1.0],
            halo_color: [1.0, 1.0, 1.0, 0.85],
            halo_width_px: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelAnchor {
    pub text: String,
    /// Map coordinates in the figure CRS.
    pub position: Coord<f64>,
    pub priority: f32,
    pub style: LabelStyle,
}

/// One anchor per record with a non-empty label, in dataset order and with
/// equal priority.
pub fn anchors_for_dataset(dataset: &LocalityDataset, style: &LabelStyle) -> Vec<LabelAnchor> {
    dataset
        .iter()
        .filter(|r| !r.label().trim().is_empty())
        .map(|r| LabelAnchor {
            text: r.label().trim().to_string(),
            position: r.position(),
            priority: 1.0,
            style: style.clone(),
        })
        .collect()
}

pub trait LabelProjector {
    fn project(&self, position: Coord<f64>) -> Option<[f32; 2]>;
}

/// Where a label box sits relative to its anchor.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelOffset {
    Center,
    Right,
    Left,
    Above,
    Below,
}

impl LabelOffset {
    pub const CANDIDATES: [LabelOffset; 5] = [
        LabelOffset::Center,
        LabelOffset::Right,
        LabelOffset::Left,
        LabelOffset::Above,
        LabelOffset::Below,
    ];

    /// Box centre for a label of `half` extents at `anchor`, `gap` pixels
    /// away from the anchor. Screen y grows downwards.
    fn center(self, anchor: [f32; 2], half: [f32; 2], gap: f32) -> [f32; 2] {
        match self {
            LabelOffset::Center => anchor,
            LabelOffset::Right => [anchor[0] + half[0] + gap, anchor[1]],
            LabelOffset::Left => [anchor[0] - half[0] - gap, anchor[1]],
            LabelOffset::Above => [anchor[0], anchor[1] - half[1] - gap],
            LabelOffset::Below => [anchor[0], anchor[1] + half[1] + gap],
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LabelLayoutConfig {
    pub viewport_px: [f32; 2],
    pub cell_px: f32,
    pub padding_px: f32,
    /// Distance between the anchor and an offset label box.
    pub gap_px: f32,
    pub max_labels: usize,
}

impl Default for LabelLayoutConfig {
    fn default() -> Self {
        Self {
            viewport_px: [1.0, 1.0],
            cell_px: 4.0,
            padding_px: 2.0,
            gap_px: 4.0,
            max_labels: 400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedLabel2D {
    pub text: String,
    /// Centre of the label box.
    pub screen_pos_px: [f32; 2],
    pub size_px: [f32; 2],
    pub offset: LabelOffset,
    pub priority: f32,
    pub style: LabelStyle,
}

impl PlacedLabel2D {
    /// `[min_x, min_y, max_x, max_y]` in pixels, padding excluded.
    pub fn rect_px(&self) -> [f32; 4] {
        let hw = self.size_px[0] * 0.5;
        let hh = self.size_px[1] * 0.5;
        [
            self.screen_pos_px[0] - hw,
            self.screen_pos_px[1] - hh,
            self.screen_pos_px[0] + hw,
            self.screen_pos_px[1] + hh,
        ]
    }
}

/// Greedy grid layout. Labels are taken by descending priority (stable for
/// ties); each tries [`LabelOffset::CANDIDATES`] in order and is dropped when
/// every candidate collides with an already placed label or leaves the
/// viewport.
pub fn layout_labels_2d<P: LabelProjector>(
    labels: &[LabelAnchor],
    projector: &P,
    config: LabelLayoutConfig,
) -> Vec<PlacedLabel2D> {
    let mut order: Vec<&LabelAnchor> = labels.iter().collect();
    order.sort_by(|a, b| {
        b.priority
            .partial_cmp(&a.priority)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut out = Vec::new();
    let mut occupied: HashSet<u64> = HashSet::new();
    let cell_px = config.cell_px.max(1.0);

    for label in order {
        if out.len() >= config.max_labels {
            break;
        }

        let Some(anchor) = projector.project(label.position) else {
            continue;
        };
        if !anchor[0].is_finite() || !anchor[1].is_finite() {
            continue;
        }

        let size = estimate_text_size(label.text.as_str(), &label.style);
        let half = [
            size[0] * 0.5 + config.padding_px,
            size[1] * 0.5 + config.padding_px,
        ];

        for offset in LabelOffset::CANDIDATES {
            let center = offset.center(anchor, half, config.gap_px);
            if center[0] - half[0] < 0.0
                || center[1] - half[1] < 0.0
                || center[0] + half[0] > config.viewport_px[0]
                || center[1] + half[1] > config.viewport_px[1]
            {
                continue;
            }
            if !try_place_label(&mut occupied, center, half, cell_px) {
                continue;
            }
            out.push(PlacedLabel2D {
                text: label.text.clone(),
                screen_pos_px: center,
                size_px: size,
                offset,
                priority: label.priority,
                style: label.style.clone(),
            });
            break;
        }
    }

    out
}

fn estimate_text_size(text: &str, style: &LabelStyle) -> [f32; 2] {
    let count = text.chars().count().max(1) as f32;
    let width = style.font_size_px * 0.6 * count;
    [width, style.font_size_px]
}

fn try_place_label(
    occupied: &mut HashSet<u64>,
    screen: [f32; 2],
    half_size: [f32; 2],
    cell_px: f32,
) -> bool {
    let min_x = ((screen[0] - half_size[0]) / cell_px).floor() as i32;
    let max_x = ((screen[0] + half_size[0]) / cell_px).floor() as i32;
    let min_y = ((screen[1] - half_size[1]) / cell_px).floor() as i32;
    let max_y = ((screen[1] + half_size[1]) / cell_px).floor() as i32;

    for cy in min_y..=max_y {
        for cx in min_x..=max_x {
            if occupied.contains(&cell_key(cx, cy)) {
                return false;
            }
        }
    }

    for cy in min_y..=max_y {
        for cx in min_x..=max_x {
            occupied.insert(cell_key(cx, cy));
        }
    }

    true
}

fn cell_key(cx: i32, cy: i32) -> u64 {
    ((cx as u32 as u64) << 32) | (cy as u32 as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formats::LocalityDataset;
    use proptest::prelude::*;

    struct IdentityProjector;

    impl LabelProjector for IdentityProjector {
        fn project(&self, position: Coord<f64>) -> Option<[f32; 2]> {
            Some([position.x as f32, position.y as f32])
        }
    }

    fn anchor(text: &str, x: f64, y: f64, priority: f32) -> LabelAnchor {
        LabelAnchor {
            text: text.into(),
            position: Coord { x, y },
            priority,
            style: LabelStyle::default(),
        }
    }

    fn config() -> LabelLayoutConfig {
        LabelLayoutConfig {
            viewport_px: [200.0, 200.0],
            ..LabelLayoutConfig::default()
        }
    }

    fn overlaps(a: [f32; 4], b: [f32; 4]) -> bool {
        a[0] < b[2] && b[0] < a[2] && a[1] < b[3] && b[1] < a[3]
    }

    #[test]
    fn colliding_label_moves_to_next_offset() {
        let labels = vec![anchor("A", 100.0, 100.0, 1.0), anchor("B", 104.0, 100.0, 1.0)];
        let placed = layout_labels_2d(&labels, &IdentityProjector, config());
        assert_eq!(placed.len(), 2);
        assert_eq!(placed[0].offset, LabelOffset::Center);
        assert_eq!(placed[1].offset, LabelOffset::Right);
        assert!(!overlaps(placed[0].rect_px(), placed[1].rect_px()));
    }

    #[test]
    fn higher_priority_wins_and_crowded_labels_drop() {
        let mut labels: Vec<LabelAnchor> =
            (0..10).map(|i| anchor(&format!("L{i}"), 100.0, 100.0, 1.0)).collect();
        labels.push(anchor("top", 100.0, 100.0, 5.0));
        let placed = layout_labels_2d(&labels, &IdentityProjector, config());
        assert_eq!(placed[0].text, "top");
        assert!(placed.len() <= LabelOffset::CANDIDATES.len());
    }

    #[test]
    fn labels_outside_the_viewport_are_skipped() {
        let labels = vec![anchor("far", -500.0, 20.0, 1.0), anchor("edge", 0.0, 100.0, 1.0)];
        let placed = layout_labels_2d(&labels, &IdentityProjector, config());
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].offset, LabelOffset::Right);
    }

    #[test]
    fn dataset_anchors_skip_blank_labels() {
        let ds = LocalityDataset::from_records([(1.0, 2.0, " 1 ", "A"), (3.0, 4.0, "", "A")]).unwrap();
        let anchors = anchors_for_dataset(&ds, &LabelStyle::default());
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].text, "1");
        assert_eq!(anchors[0].position, Coord { x: 1.0, y: 2.0 });
    }

    proptest! {
        #[test]
        fn placed_labels_never_overlap(
            points in prop::collection::vec((0.0f64..200.0, 0.0f64..200.0, 1usize..8), 0..60)
        ) {
            let labels: Vec<LabelAnchor> = points
                .iter()
                .map(|(x, y, len)| anchor(&"x".repeat(*len), *x, *y, 1.0))
                .collect();
            let placed = layout_labels_2d(&labels, &IdentityProjector, config());
            for (i, a) in placed.iter().enumerate() {
                for b in &placed[i + 1..] {
                    prop_assert!(!overlaps(a.rect_px(), b.rect_px()), "{:?} / {:?}", a, b);
                }
            }
        }
    }
}
