//! Image Sources - Loader Capability
//!
//! The engine never decodes platform-specifically. Archive, upload or AI
//! output, everything arrives through this trait as a stable id plus a
//! decodable bitmap.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use image::DynamicImage;
use thiserror::Error;

pub type ImageId = String;

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("Unknown image: {0}")]
    NotFound(ImageId),

    #[error("Cannot read {id}: {source}")]
    Io {
        id: ImageId,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot decode {id}: {source}")]
    Decode {
        id: ImageId,
        #[source]
        source: image::ImageError,
    },

    #[error("Malformed data URL for {0}")]
    DataUrl(ImageId),
}

/// Supplies decodable bitmaps by stable id.
///
/// `Sync` because the renderer loads all referenced sources in parallel
/// before compositing.
pub trait ImageLoader: Sync {
    fn load(&self, id: &str) -> Result<DynamicImage, ImageLoadError>;
}

/// Resolves ids as file names under a root directory.
pub struct FileImageLoader {
    root: PathBuf,
}

impl FileImageLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ImageLoader for FileImageLoader {
    fn load(&self, id: &str) -> Result<DynamicImage, ImageLoadError> {
        let path = self.root.join(id);
        if !path.is_file() {
            return Err(ImageLoadError::NotFound(id.to_string()));
        }
        let bytes = fs::read(&path).map_err(|source| ImageLoadError::Io {
            id: id.to_string(),
            source,
        })?;
        image::load_from_memory(&bytes).map_err(|source| ImageLoadError::Decode {
            id: id.to_string(),
            source,
        })
    }
}

/// Holds encoded images in memory; accepts raw bytes or `data:` URLs.
#[derive(Default)]
pub struct MemoryImageLoader {
    images: HashMap<ImageId, Vec<u8>>,
}

impl MemoryImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<ImageId>, bytes: Vec<u8>) {
        self.images.insert(id.into(), bytes);
    }

    /// Accepts `data:image/...;base64,` URLs, the form browser-side
    /// collaborators hand over.
    pub fn insert_data_url(&mut self, id: &str, url: &str) -> Result<(), ImageLoadError> {
        let (_, payload) = url
            .split_once("base64,")
            .ok_or_else(|| ImageLoadError::DataUrl(id.to_string()))?;
        let bytes =
            base64::Engine::decode(&base64::engine::general_purpose::STANDARD, payload)
                .map_err(|_| ImageLoadError::DataUrl(id.to_string()))?;
        self.images.insert(id.to_string(), bytes);
        Ok(())
    }
}

impl ImageLoader for MemoryImageLoader {
    fn load(&self, id: &str) -> Result<DynamicImage, ImageLoadError> {
        let bytes = self
            .images
            .get(id)
            .ok_or_else(|| ImageLoadError::NotFound(id.to_string()))?;
        image::load_from_memory(bytes).map_err(|source| ImageLoadError::Decode {
            id: id.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_without_base64_marker_is_rejected() {
        let mut loader = MemoryImageLoader::new();
        let err = loader.insert_data_url("photo", "data:image/png,plain").unwrap_err();
        assert!(matches!(err, ImageLoadError::DataUrl(_)));
    }

    #[test]
    fn missing_id_reports_not_found() {
        let loader = MemoryImageLoader::new();
        assert!(matches!(
            loader.load("nope").unwrap_err(),
            ImageLoadError::NotFound(_)
        ));
    }
}
