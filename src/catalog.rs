//! Size Catalog - Papers and Photo Formats

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub type SizeKey = String;

/// A sheet of paper, dimensions in millimeters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperSpec {
    pub key: SizeKey,
    pub name: String,
    pub width_mm: f64,
    pub height_mm: f64,
}

/// A physical photo print format, dimensions in millimeters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoSizeSpec {
    pub key: SizeKey,
    pub name: String,
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PhotoSizeSpec {
    pub fn area_mm2(&self) -> f64 {
        self.width_mm * self.height_mm
    }
}

/// Extra sizes a shop drops into the catalog directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    #[serde(default)]
    papers: Vec<PaperSpec>,
    #[serde(default)]
    photo_sizes: Vec<PhotoSizeSpec>,
}

/// Size catalog - built-in papers and photo formats plus shop additions.
///
/// Keys are stable identifiers (`a4`, `3x4`, `visa_eu`); listing order is
/// deterministic.
pub struct SizeCatalog {
    papers: BTreeMap<SizeKey, PaperSpec>,
    photo_sizes: BTreeMap<SizeKey, PhotoSizeSpec>,
}

impl SizeCatalog {
    pub fn new() -> Self {
        Self {
            papers: BTreeMap::new(),
            photo_sizes: BTreeMap::new(),
        }
    }

    /// The fixed enumerations every installation ships with.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for (key, name, width_mm, height_mm) in [
            ("a4", "A4 (21 x 29.7 cm)", 210.0, 297.0),
            ("10x15", "10 x 15 cm", 102.0, 152.0),
            ("13x18", "13 x 18 cm", 127.0, 178.0),
        ] {
            catalog.register_paper(PaperSpec {
                key: key.to_string(),
                name: name.to_string(),
                width_mm,
                height_mm,
            });
        }
        for (key, name, width_mm, height_mm) in [
            ("2x3", "2 x 3 cm", 20.0, 30.0),
            ("3x4", "3 x 4 cm", 30.0, 40.0),
            ("4x6", "4 x 6 cm", 40.0, 60.0),
            ("visa_eu", "Visa EU (3.5 x 4.5 cm)", 35.0, 45.0),
            ("visa_us", "Visa US (5.1 x 5.1 cm)", 51.0, 51.0),
        ] {
            catalog.register_photo_size(PhotoSizeSpec {
                key: key.to_string(),
                name: name.to_string(),
                width_mm,
                height_mm,
            });
        }
        catalog
    }

    /// Built-ins plus any JSON files found in `dir`; malformed files are
    /// skipped, shop entries override built-ins on key collision.
    pub fn load_from_dir(dir: &Path) -> Result<Self, std::io::Error> {
        let mut catalog = Self::builtin();
        if dir.exists() {
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension().map_or(false, |e| e == "json") {
                    if let Ok(content) = fs::read_to_string(&path) {
                        if let Ok(file) = serde_json::from_str::<CatalogFile>(&content) {
                            for paper in file.papers {
                                catalog.register_paper(paper);
                            }
                            for size in file.photo_sizes {
                                catalog.register_photo_size(size);
                            }
                        }
                    }
                }
            }
        }
        Ok(catalog)
    }

    pub fn paper(&self, key: &str) -> Option<&PaperSpec> {
        self.papers.get(key)
    }

    pub fn photo_size(&self, key: &str) -> Option<&PhotoSizeSpec> {
        self.photo_sizes.get(key)
    }

    pub fn papers(&self) -> Vec<&PaperSpec> {
        self.papers.values().collect()
    }

    pub fn photo_sizes(&self) -> Vec<&PhotoSizeSpec> {
        self.photo_sizes.values().collect()
    }

    pub fn register_paper(&mut self, paper: PaperSpec) {
        self.papers.insert(paper.key.clone(), paper);
    }

    pub fn register_photo_size(&mut self, size: PhotoSizeSpec) {
        self.photo_sizes.insert(size.key.clone(), size);
    }
}

impl Default for SizeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_has_standard_entries() {
        let catalog = SizeCatalog::builtin();
        let a4 = catalog.paper("a4").unwrap();
        assert_eq!(a4.width_mm, 210.0);
        assert_eq!(a4.height_mm, 297.0);
        let visa = catalog.photo_size("visa_eu").unwrap();
        assert_eq!(visa.width_mm, 35.0);
        assert_eq!(visa.height_mm, 45.0);
        assert_eq!(catalog.papers().len(), 3);
        assert_eq!(catalog.photo_sizes().len(), 5);
    }

    #[test]
    fn shop_files_extend_and_override() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = fs::File::create(dir.path().join("shop.json")).unwrap();
        write!(
            file,
            r#"{{
                "papers": [{{"key": "a3", "name": "A3", "widthMm": 297.0, "heightMm": 420.0}}],
                "photoSizes": [{{"key": "3x4", "name": "3 x 4 cm (shop)", "widthMm": 30.0, "heightMm": 40.0}}]
            }}"#
        )
        .unwrap();

        let catalog = SizeCatalog::load_from_dir(dir.path()).unwrap();
        assert_eq!(catalog.paper("a3").unwrap().height_mm, 420.0);
        assert_eq!(catalog.photo_size("3x4").unwrap().name, "3 x 4 cm (shop)");
        assert!(catalog.paper("a4").is_some());
    }

    #[test]
    fn malformed_shop_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "not json at all").unwrap();
        let catalog = SizeCatalog::load_from_dir(dir.path()).unwrap();
        assert_eq!(catalog.papers().len(), 3);
    }
}
