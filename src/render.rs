//! Sheet Compositing - Millimeters to Pixels
//!
//! Converts a committed layout plus source images into the print-resolution
//! bitmap. Everything upstream thinks in millimeters; this module is the
//! only place pixels exist.

use std::collections::HashMap;
use std::io::Cursor;

use chrono::{DateTime, Utc};
use image::imageops::FilterType;
use image::{imageops, DynamicImage, ImageBuffer, Rgba, RgbaImage};
use log::{debug, error};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::PaperSpec;
use crate::hashing::{compute_manifest_hash, sha256_hex};
use crate::layout::{LayoutConfig, PlacedPhoto, Rotation};
use crate::loader::{ImageLoadError, ImageLoader};
use crate::session::LayoutSession;
use crate::ENGINE_VERSION;

/// Print-quality raster target; every mm-to-px conversion uses it.
pub const PRINT_DPI: f64 = 300.0;

const MM_PER_INCH: f64 = 25.4;
const SHEET_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const FALLBACK_BORDER: [u8; 4] = [0, 0, 0, 255];

/// Millimeters to pixels at the fixed print DPI.
pub fn mm_to_px(mm: f64) -> f64 {
    mm * PRINT_DPI / MM_PER_INCH
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Image load failed: {0}")]
    ImageLoad(String),

    #[error("Could not encode sheet: {0}")]
    Encode(#[from] image::ImageError),
}

/// Composites the committed layout into a full-resolution sheet.
///
/// All referenced sources are loaded up front, in parallel; if any of them
/// fails the whole render aborts with one aggregated message and no partial
/// bitmap. Compositing itself is sequential, in list order.
pub fn render_sheet<L: ImageLoader + ?Sized>(
    placed: &[PlacedPhoto],
    paper: &PaperSpec,
    config: &LayoutConfig,
    loader: &L,
) -> Result<RgbaImage, RenderError> {
    let sheet_w = mm_to_px(paper.width_mm).round() as u32;
    let sheet_h = mm_to_px(paper.height_mm).round() as u32;
    let mut sheet = ImageBuffer::from_pixel(sheet_w, sheet_h, SHEET_BACKGROUND);

    let sources = preload_sources(placed, loader)?;

    for photo in placed {
        if let Some(source) = sources.get(&photo.source_image_id) {
            draw_photo(&mut sheet, photo, source, config);
        }
    }

    debug!(
        "rendered {} photo(s) onto {} at {}x{} px",
        placed.len(),
        paper.key,
        sheet_w,
        sheet_h
    );
    Ok(sheet)
}

/// Loads the distinct sources a layout references, in parallel. All of them
/// must succeed.
fn preload_sources<L: ImageLoader + ?Sized>(
    placed: &[PlacedPhoto],
    loader: &L,
) -> Result<HashMap<String, DynamicImage>, RenderError> {
    let mut ids: Vec<&str> = placed.iter().map(|p| p.source_image_id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();

    let results: Vec<(String, Result<DynamicImage, ImageLoadError>)> = ids
        .par_iter()
        .map(|id| (id.to_string(), loader.load(id)))
        .collect();

    let mut sources = HashMap::new();
    let mut failures: Vec<String> = Vec::new();
    for (id, result) in results {
        match result {
            Ok(image) => {
                sources.insert(id, image);
            }
            Err(e) => failures.push(format!("{} ({})", id, e)),
        }
    }

    if !failures.is_empty() {
        error!("render aborted, {} source(s) failed to load", failures.len());
        return Err(RenderError::ImageLoad(failures.join("; ")));
    }
    Ok(sources)
}

/// Centered cover-fit crop: the largest source region with the destination's
/// aspect ratio. Returns `(x, y, width, height)` in source pixels.
pub fn cover_crop(src_w: u32, src_h: u32, dest_aspect: f64) -> (u32, u32, u32, u32) {
    let src_aspect = src_w as f64 / src_h as f64;
    if src_aspect > dest_aspect {
        // Source is wider than the card; trim the sides.
        let crop_w = ((src_h as f64 * dest_aspect).round() as u32).clamp(1, src_w);
        let sx = (src_w - crop_w) / 2;
        (sx, 0, crop_w, src_h)
    } else {
        // Source is taller; trim top and bottom.
        let crop_h = ((src_w as f64 / dest_aspect).round() as u32).clamp(1, src_h);
        let sy = (src_h - crop_h) / 2;
        (0, sy, src_w, crop_h)
    }
}

fn draw_photo(
    sheet: &mut RgbaImage,
    photo: &PlacedPhoto,
    source: &DynamicImage,
    config: &LayoutConfig,
) {
    let card_w = mm_to_px(photo.width_mm).round() as u32;
    let card_h = mm_to_px(photo.height_mm).round() as u32;
    if card_w == 0 || card_h == 0 {
        return;
    }

    let left = mm_to_px(config.margins.left + photo.x).round() as i64;
    let top = mm_to_px(config.margins.top + photo.y).round() as i64;

    // Cover crop to the unrotated card aspect, scale to the card, then turn
    // the whole card in place. Quarter turns are lossless, so this equals
    // rotating the drawing context about the footprint center.
    let (sx, sy, sw, sh) = cover_crop(
        source.width(),
        source.height(),
        photo.width_mm / photo.height_mm,
    );
    let card = source
        .crop_imm(sx, sy, sw, sh)
        .resize_exact(card_w, card_h, FilterType::Lanczos3);

    let oriented = match photo.rotation {
        Rotation::R0 => card,
        Rotation::R90 => card.rotate90(),
        Rotation::R180 => card.rotate180(),
        Rotation::R270 => card.rotate270(),
    };

    imageops::overlay(sheet, &oriented, left, top);

    if config.border.enabled {
        let thickness = mm_to_px(config.border.width_mm).round() as u32;
        if thickness > 0 {
            let color = Rgba(config.border.rgba().unwrap_or(FALLBACK_BORDER));
            stroke_rect(
                sheet,
                left,
                top,
                oriented.width(),
                oriented.height(),
                thickness,
                color,
            );
        }
    }
}

/// Strokes a rectangle outline with the band centered on the edge, half
/// inside and half outside, clipped to the sheet.
fn stroke_rect(
    sheet: &mut RgbaImage,
    left: i64,
    top: i64,
    width: u32,
    height: u32,
    thickness: u32,
    color: Rgba<u8>,
) {
    let right = left + width as i64;
    let bottom = top + height as i64;
    let half = (thickness / 2) as i64;
    let t = thickness as i64;
    let span_w = width as i64 + t;
    let span_h = height as i64 + t;

    fill_rect(sheet, left - half, top - half, span_w, t, color);
    fill_rect(sheet, left - half, bottom - half, span_w, t, color);
    fill_rect(sheet, left - half, top - half, t, span_h, color);
    fill_rect(sheet, right - half, top - half, t, span_h, color);
}

fn fill_rect(sheet: &mut RgbaImage, x: i64, y: i64, w: i64, h: i64, color: Rgba<u8>) {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + w).min(sheet.width() as i64);
    let y1 = (y + h).min(sheet.height() as i64);
    for yy in y0..y1 {
        for xx in x0..x1 {
            sheet.put_pixel(xx as u32, yy as u32, color);
        }
    }
}

/// Lossless encoding for download and for the print document.
pub fn encode_png(sheet: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    let mut buffer = Vec::new();
    sheet.write_to(&mut Cursor::new(&mut buffer), image::ImageOutputFormat::Png)?;
    Ok(buffer)
}

/// Suggested name for a downloaded sheet.
pub fn download_file_name(paper: &PaperSpec) -> String {
    format!("print-layout-{}.png", paper.key)
}

/// Hash-bearing record of a rendered sheet: enough to prove what was printed
/// and to reproduce it exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetManifest {
    pub id: String,
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
    pub paper: PaperSpec,
    pub width_px: u32,
    pub height_px: u32,
    pub photo_count: usize,
    pub content_hash: String,
    pub layout_hash: String,
}

pub fn sheet_manifest(
    session: &LayoutSession,
    png: &[u8],
    width_px: u32,
    height_px: u32,
) -> Result<SheetManifest, serde_json::Error> {
    Ok(SheetManifest {
        id: Uuid::new_v4().to_string(),
        engine_version: ENGINE_VERSION.to_string(),
        created_at: Utc::now(),
        paper: session.paper.clone(),
        width_px,
        height_px,
        photo_count: session.placed.len(),
        content_hash: sha256_hex(png),
        layout_hash: compute_manifest_hash(&session.placed)?,
    })
}
