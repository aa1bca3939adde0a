//! Automatic Sheet Filling - Feasibility Probing
//!
//! Proposes one instance at a time and keeps it only when the packer still
//! places everything; no utilization math, just probing.

use log::debug;

use crate::catalog::{PaperSpec, PhotoSizeSpec};
use crate::layout::{pack, LayoutConfig, PhotoRequest, PlacedPhoto, Rotation};

/// Accepted-instance ceiling for the multi-size search. Single-size fills
/// terminate on the first refusal and are not capped.
pub const MULTI_SIZE_INSTANCE_CAP: usize = 50;

/// Fills the sheet with as many instances of the allowed sizes as the packer
/// will take, using one source image.
///
/// Instance ids start at `first_instance_id` and increase by one per
/// accepted instance, so callers can keep their counters monotonic. The
/// returned layout replaces whatever was on the sheet before.
pub fn auto_fill(
    source_image_id: &str,
    allowed_sizes: &[PhotoSizeSpec],
    paper: &PaperSpec,
    config: &LayoutConfig,
    first_instance_id: u32,
) -> Vec<PlacedPhoto> {
    if allowed_sizes.is_empty() {
        return Vec::new();
    }

    // Largest formats claim space first.
    let mut sizes: Vec<&PhotoSizeSpec> = allowed_sizes.iter().collect();
    sizes.sort_by(|a, b| b.area_mm2().total_cmp(&a.area_mm2()));
    let multi_size = sizes.len() > 1;

    let mut accepted: Vec<PhotoRequest> = Vec::new();
    let mut next_id = first_instance_id;

    loop {
        let mut added_this_cycle = false;

        for size in &sizes {
            let mut attempt = accepted.clone();
            attempt.push(PhotoRequest {
                instance_id: next_id,
                source_image_id: source_image_id.to_string(),
                size_key: size.key.clone(),
                width_mm: size.width_mm,
                height_mm: size.height_mm,
                rotation: Rotation::R0,
            });

            // Accept only when everything, old and new, still fits.
            let packed = pack(&attempt, paper, config);
            if packed.len() == attempt.len() {
                accepted = attempt;
                next_id += 1;
                added_this_cycle = true;
            }
        }

        if !added_this_cycle || (multi_size && accepted.len() > MULTI_SIZE_INSTANCE_CAP) {
            break;
        }
    }

    debug!(
        "auto fill accepted {} instance(s) across {} size(s) on {}",
        accepted.len(),
        sizes.len(),
        paper.key
    );
    pack(&accepted, paper, config)
}
