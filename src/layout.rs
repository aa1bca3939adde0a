//! Millimeter Layout - Shelf Packing
//!
//! Positions are derived state. Every mutation re-packs the full request
//! list; nothing outside this module ever assigns `x`/`y`.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::catalog::{PaperSpec, SizeKey};

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static PACK_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_pack_call_count() -> u32 {
    PACK_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_pack_call_count() {
    PACK_CALL_COUNT.store(0, Ordering::SeqCst)
}

/// Quarter-turn rotation of a placed card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// Next stop in the 0 -> 90 -> 180 -> 270 -> 0 cycle.
    pub fn turned(self) -> Self {
        match self {
            Rotation::R0 => Rotation::R90,
            Rotation::R90 => Rotation::R180,
            Rotation::R180 => Rotation::R270,
            Rotation::R270 => Rotation::R0,
        }
    }

    /// 90 and 270 swap the card's footprint axes.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::R90 | Rotation::R270)
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::R0),
            90 => Ok(Rotation::R90),
            180 => Ok(Rotation::R180),
            270 => Ok(Rotation::R270),
            other => Err(format!("rotation must be 0, 90, 180 or 270, got {other}")),
        }
    }
}

/// Page margins in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Margins {
    /// The same margin on all four sides (the linked-margins control).
    pub fn uniform(mm: f64) -> Self {
        Self {
            top: mm,
            bottom: mm,
            left: mm,
            right: mm,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(5.0)
    }
}

/// Stroked outline around each placed card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorderStyle {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_border_width")]
    pub width_mm: f64,
    #[serde(default = "default_border_color")]
    pub color: String,
}

fn default_true() -> bool {
    true
}

fn default_border_width() -> f64 {
    0.3
}

fn default_border_color() -> String {
    "#000000".to_string()
}

impl BorderStyle {
    /// Border color as opaque RGBA, `None` when the string is not `#rrggbb`.
    pub fn rgba(&self) -> Option<[u8; 4]> {
        let hex = self.color.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some([r, g, b, 255])
    }
}

impl Default for BorderStyle {
    fn default() -> Self {
        Self {
            enabled: true,
            width_mm: default_border_width(),
            color: default_border_color(),
        }
    }
}

/// User-adjustable layout settings; a paper change is deliberately not part
/// of this struct because it invalidates every placed coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub margins: Margins,
    pub spacing_mm: f64,
    pub border: BorderStyle,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margins: Margins::default(),
            spacing_mm: 0.5,
            border: BorderStyle::default(),
        }
    }
}

/// A photo instance the user asked for; carries no position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRequest {
    pub instance_id: u32,
    pub source_image_id: String,
    pub size_key: SizeKey,
    pub width_mm: f64,
    pub height_mm: f64,
    #[serde(default)]
    pub rotation: Rotation,
}

impl PhotoRequest {
    /// Footprint on the sheet, axes swapped for sideways rotations.
    pub fn effective_size(&self) -> (f64, f64) {
        if self.rotation.swaps_axes() {
            (self.height_mm, self.width_mm)
        } else {
            (self.width_mm, self.height_mm)
        }
    }
}

/// A packed photo instance. `x`/`y` locate the top-left of the effective
/// (rotation-aware) footprint relative to the printable area origin;
/// `width_mm`/`height_mm` stay the unrotated physical card size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedPhoto {
    pub instance_id: u32,
    pub source_image_id: String,
    pub size_key: SizeKey,
    pub x: f64,
    pub y: f64,
    pub width_mm: f64,
    pub height_mm: f64,
    pub rotation: Rotation,
}

impl PlacedPhoto {
    pub fn effective_width(&self) -> f64 {
        if self.rotation.swaps_axes() {
            self.height_mm
        } else {
            self.width_mm
        }
    }

    pub fn effective_height(&self) -> f64 {
        if self.rotation.swaps_axes() {
            self.width_mm
        } else {
            self.height_mm
        }
    }

    /// Back to a position-free request, for the next re-pack.
    pub fn to_request(&self) -> PhotoRequest {
        PhotoRequest {
            instance_id: self.instance_id,
            source_image_id: self.source_image_id.clone(),
            size_key: self.size_key.clone(),
            width_mm: self.width_mm,
            height_mm: self.height_mm,
            rotation: self.rotation,
        }
    }
}

/// Printable width and height: paper minus margins.
pub fn printable_size(paper: &PaperSpec, margins: &Margins) -> (f64, f64) {
    (
        paper.width_mm - margins.horizontal(),
        paper.height_mm - margins.vertical(),
    )
}

/// Shelf-packs the requests into the paper's printable area and centers the
/// resulting group.
///
/// Greedy row heuristic, not an optimal packer: larger items go first
/// (descending by longest effective side, ties in input order), rows fill
/// left to right and wrap when out of width, no backtracking. Requests that
/// cannot be placed are dropped from the result; a shorter output is the
/// fit signal callers react to, never an error.
pub fn pack(
    requests: &[PhotoRequest],
    paper: &PaperSpec,
    config: &LayoutConfig,
) -> Vec<PlacedPhoto> {
    #[cfg(feature = "test-hooks")]
    PACK_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

    let (available_w, available_h) = printable_size(paper, &config.margins);
    let spacing = config.spacing_mm;

    let mut ordered: Vec<&PhotoRequest> = requests.iter().collect();
    ordered.sort_by(|a, b| {
        let (aw, ah) = a.effective_size();
        let (bw, bh) = b.effective_size();
        bw.max(bh).total_cmp(&aw.max(ah))
    });

    let mut cursor_x = 0.0_f64;
    let mut cursor_y = 0.0_f64;
    let mut row_height = 0.0_f64;
    let mut placed: Vec<PlacedPhoto> = Vec::with_capacity(ordered.len());

    for request in ordered {
        let (eff_w, eff_h) = request.effective_size();

        // Row cannot take this item's width plus the gap: wrap.
        if cursor_x > 0.0 && cursor_x + spacing + eff_w > available_w {
            cursor_x = 0.0;
            cursor_y += row_height + spacing;
            row_height = 0.0;
        }

        // No room below the current row; dropped, not queued.
        if cursor_y + eff_h > available_h {
            continue;
        }
        // Wider than the whole printable area; can never be placed.
        if cursor_x == 0.0 && eff_w > available_w {
            continue;
        }

        // The gap is charged when the item lands, so the cursor always sits
        // at the previous item's right edge.
        let x = if cursor_x == 0.0 { 0.0 } else { cursor_x + spacing };
        placed.push(PlacedPhoto {
            instance_id: request.instance_id,
            source_image_id: request.source_image_id.clone(),
            size_key: request.size_key.clone(),
            x,
            y: cursor_y,
            width_mm: request.width_mm,
            height_mm: request.height_mm,
            rotation: request.rotation,
        });
        cursor_x = x + eff_w;
        row_height = row_height.max(eff_h);
    }

    if placed.is_empty() {
        return placed;
    }

    let mut max_x = 0.0_f64;
    let mut max_y = 0.0_f64;
    for photo in &placed {
        max_x = max_x.max(photo.x + photo.effective_width());
        max_y = max_y.max(photo.y + photo.effective_height());
    }
    let offset_x = ((available_w - max_x) / 2.0).max(0.0);
    let offset_y = ((available_h - max_y) / 2.0).max(0.0);
    for photo in &mut placed {
        photo.x += offset_x;
        photo.y += offset_y;
    }

    debug!(
        "packed {} of {} requests onto {} ({:.1}x{:.1} mm printable)",
        placed.len(),
        requests.len(),
        paper.key,
        available_w,
        available_h
    );
    placed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(width_mm: f64, height_mm: f64) -> PaperSpec {
        PaperSpec {
            key: "test".to_string(),
            name: "Test".to_string(),
            width_mm,
            height_mm,
        }
    }

    fn request(id: u32, width_mm: f64, height_mm: f64, rotation: Rotation) -> PhotoRequest {
        PhotoRequest {
            instance_id: id,
            source_image_id: "img".to_string(),
            size_key: "sz".to_string(),
            width_mm,
            height_mm,
            rotation,
        }
    }

    fn zero_margin_config(spacing_mm: f64) -> LayoutConfig {
        LayoutConfig {
            margins: Margins::uniform(0.0),
            spacing_mm,
            ..LayoutConfig::default()
        }
    }

    // ── rotation ──

    #[test]
    fn rotation_cycles_through_quarter_turns() {
        let mut rotation = Rotation::R0;
        for expected in [90, 180, 270, 0] {
            rotation = rotation.turned();
            assert_eq!(rotation.degrees(), expected);
        }
    }

    #[test]
    fn sideways_rotations_swap_footprint() {
        let upright = request(0, 20.0, 30.0, Rotation::R0);
        let sideways = request(1, 20.0, 30.0, Rotation::R90);
        assert_eq!(upright.effective_size(), (20.0, 30.0));
        assert_eq!(sideways.effective_size(), (30.0, 20.0));
        assert!(!Rotation::R180.swaps_axes());
        assert!(Rotation::R270.swaps_axes());
    }

    #[test]
    fn rotation_rejects_off_grid_degrees() {
        assert!(Rotation::try_from(45u16).is_err());
        assert_eq!(Rotation::try_from(270u16).unwrap(), Rotation::R270);
    }

    // ── packing ──

    #[test]
    fn single_item_is_centered_both_ways() {
        let placed = pack(
            &[request(0, 40.0, 40.0, Rotation::R0)],
            &paper(100.0, 100.0),
            &zero_margin_config(0.0),
        );
        assert_eq!(placed.len(), 1);
        assert!((placed[0].x - 30.0).abs() < 1e-9);
        assert!((placed[0].y - 30.0).abs() < 1e-9);
    }

    #[test]
    fn rows_wrap_when_out_of_width() {
        // Three 40mm cards on a 100mm row: two fit, the third wraps.
        let requests: Vec<_> = (0..3)
            .map(|id| request(id, 40.0, 20.0, Rotation::R0))
            .collect();
        let placed = pack(&requests, &paper(100.0, 100.0), &zero_margin_config(2.0));
        assert_eq!(placed.len(), 3);
        assert_eq!(placed[0].y, placed[1].y);
        assert!(placed[2].y > placed[0].y);
        assert!((placed[1].x - placed[0].x - 42.0).abs() < 1e-9);
    }

    #[test]
    fn unplaceable_items_are_dropped_silently() {
        let requests = vec![
            request(0, 300.0, 20.0, Rotation::R0),
            request(1, 40.0, 40.0, Rotation::R0),
        ];
        let placed = pack(&requests, &paper(100.0, 100.0), &zero_margin_config(0.0));
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].instance_id, 1);
    }

    #[test]
    fn wide_item_fits_once_rotated() {
        // 120x30 does not fit a 100mm row upright but does sideways.
        let upright = pack(
            &[request(0, 120.0, 30.0, Rotation::R0)],
            &paper(100.0, 200.0),
            &zero_margin_config(0.0),
        );
        assert!(upright.is_empty());

        let sideways = pack(
            &[request(0, 120.0, 30.0, Rotation::R90)],
            &paper(100.0, 200.0),
            &zero_margin_config(0.0),
        );
        assert_eq!(sideways.len(), 1);
        assert_eq!(sideways[0].effective_width(), 30.0);
        assert_eq!(sideways[0].effective_height(), 120.0);
        assert_eq!(sideways[0].width_mm, 120.0);
    }

    #[test]
    fn margins_shrink_the_printable_area() {
        let (w, h) = printable_size(
            &paper(210.0, 297.0),
            &Margins {
                top: 5.0,
                bottom: 5.0,
                left: 5.0,
                right: 5.0,
            },
        );
        assert_eq!(w, 200.0);
        assert_eq!(h, 287.0);
    }

    #[test]
    fn larger_items_are_placed_first() {
        let requests = vec![
            request(0, 20.0, 20.0, Rotation::R0),
            request(1, 60.0, 60.0, Rotation::R0),
        ];
        let placed = pack(&requests, &paper(100.0, 200.0), &zero_margin_config(0.0));
        assert_eq!(placed[0].instance_id, 1);
        assert_eq!(placed[1].instance_id, 0);
    }

    // ── border color ──

    #[test]
    fn border_color_parses_hex() {
        let border = BorderStyle {
            color: "#1a2B3c".to_string(),
            ..BorderStyle::default()
        };
        assert_eq!(border.rgba(), Some([0x1a, 0x2b, 0x3c, 255]));

        let bad = BorderStyle {
            color: "red".to_string(),
            ..BorderStyle::default()
        };
        assert_eq!(bad.rgba(), None);
    }
}
