//! Layout Session - Functional Core
//!
//! The session owns paper, settings and the committed layout. Every mutation
//! returns a new session whose positions were recomputed by the packer;
//! rendering and printing consume session snapshots and never write back.

use serde::{Deserialize, Serialize};

use crate::autofill::auto_fill;
use crate::catalog::{PaperSpec, PhotoSizeSpec};
use crate::layout::{pack, LayoutConfig, PhotoRequest, PlacedPhoto, Rotation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSession {
    pub paper: PaperSpec,
    pub config: LayoutConfig,
    pub placed: Vec<PlacedPhoto>,
    next_instance_id: u32,
}

impl LayoutSession {
    pub fn new(paper: PaperSpec, config: LayoutConfig) -> Self {
        Self {
            paper,
            config,
            placed: Vec::new(),
            next_instance_id: 0,
        }
    }

    fn requests(&self) -> Vec<PhotoRequest> {
        self.placed.iter().map(PlacedPhoto::to_request).collect()
    }

    fn with_layout(&self, requests: &[PhotoRequest], next_instance_id: u32) -> Self {
        Self {
            paper: self.paper.clone(),
            config: self.config.clone(),
            placed: pack(requests, &self.paper, &self.config),
            next_instance_id,
        }
    }

    /// Adds one upright instance. The packer may still refuse it, in which
    /// case the new session's layout is simply no longer holding it.
    pub fn add(&self, source_image_id: &str, size: &PhotoSizeSpec) -> Self {
        self.add_rotated(source_image_id, size, Rotation::R0)
    }

    pub fn add_rotated(
        &self,
        source_image_id: &str,
        size: &PhotoSizeSpec,
        rotation: Rotation,
    ) -> Self {
        let mut requests = self.requests();
        requests.push(PhotoRequest {
            instance_id: self.next_instance_id,
            source_image_id: source_image_id.to_string(),
            size_key: size.key.clone(),
            width_mm: size.width_mm,
            height_mm: size.height_mm,
            rotation,
        });
        self.with_layout(&requests, self.next_instance_id + 1)
    }

    /// Removes the most recently placed instance matching source and size,
    /// then re-packs. A session without a match is returned unchanged.
    pub fn remove_one(&self, source_image_id: &str, size_key: &str) -> Self {
        let mut requests = self.requests();
        match requests
            .iter()
            .rposition(|r| r.source_image_id == source_image_id && r.size_key == size_key)
        {
            Some(index) => {
                requests.remove(index);
                self.with_layout(&requests, self.next_instance_id)
            }
            None => self.clone(),
        }
    }

    /// Drops exactly one instance by id and re-packs; survivors slide into
    /// the vacated space. An unknown id leaves the layout as it was.
    pub fn remove(&self, instance_id: u32) -> Self {
        let mut requests = self.requests();
        requests.retain(|r| r.instance_id != instance_id);
        self.with_layout(&requests, self.next_instance_id)
    }

    /// Drops every instance of a source, whatever its size or rotation, and
    /// re-packs the rest. Discarding a source image cascades through here.
    pub fn remove_source(&self, source_image_id: &str) -> Self {
        let mut requests = self.requests();
        requests.retain(|r| r.source_image_id != source_image_id);
        self.with_layout(&requests, self.next_instance_id)
    }

    /// Turns one instance to its next quarter stop and re-packs; the swapped
    /// footprint can push other photos around or off the sheet.
    pub fn rotate(&self, instance_id: u32) -> Self {
        let mut requests = self.requests();
        if let Some(request) = requests.iter_mut().find(|r| r.instance_id == instance_id) {
            request.rotation = request.rotation.turned();
        }
        self.with_layout(&requests, self.next_instance_id)
    }

    /// Paper-relative coordinates cannot survive a paper change; the layout
    /// starts over on the new sheet.
    pub fn set_paper(&self, paper: PaperSpec) -> Self {
        Self {
            paper,
            config: self.config.clone(),
            placed: Vec::new(),
            next_instance_id: self.next_instance_id,
        }
    }

    /// New margins, spacing or border; the existing photos are re-packed
    /// under the new settings and some may no longer fit.
    pub fn set_config(&self, config: LayoutConfig) -> Self {
        let requests = self.requests();
        Self {
            paper: self.paper.clone(),
            placed: pack(&requests, &self.paper, &config),
            config,
            next_instance_id: self.next_instance_id,
        }
    }

    /// Replaces the whole sheet with a maximal arrangement of one image at
    /// the allowed sizes.
    pub fn auto_fill(&self, source_image_id: &str, sizes: &[PhotoSizeSpec]) -> Self {
        let placed = auto_fill(
            source_image_id,
            sizes,
            &self.paper,
            &self.config,
            self.next_instance_id,
        );
        let next_instance_id = self.next_instance_id + placed.len() as u32;
        Self {
            paper: self.paper.clone(),
            config: self.config.clone(),
            placed,
            next_instance_id,
        }
    }

    /// Placed instances using this source at this size.
    pub fn count(&self, source_image_id: &str, size_key: &str) -> usize {
        self.placed
            .iter()
            .filter(|p| p.source_image_id == source_image_id && p.size_key == size_key)
            .count()
    }

    pub fn photo_count(&self) -> usize {
        self.placed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }
}
