//! SheetPress Core - Photo Sheet Layout & Print Engine
//!
//! # The Five Rules (Non-Negotiable)
//! 1. Millimeters Are Truth
//! 2. The Packer Owns Every Position
//! 3. Jobs Are Validated, Never Trusted
//! 4. Renders Are Whole Or Absent
//! 5. Manifests Enable Reprints

pub mod catalog;
pub mod layout;
pub mod autofill;
pub mod session;
pub mod validate;
pub mod job;
pub mod loader;
pub mod render;
pub mod print;
pub mod hashing;

pub use catalog::{PaperSpec, PhotoSizeSpec, SizeCatalog, SizeKey};
pub use layout::{pack, BorderStyle, LayoutConfig, Margins, PhotoRequest, PlacedPhoto, Rotation};
pub use autofill::{auto_fill, MULTI_SIZE_INSTANCE_CAP};
pub use session::LayoutSession;
pub use validate::{LayoutCheck, LayoutRule, LayoutViolation, ViolationSeverity};
pub use job::{JobError, JobRunner, LayoutJob};
pub use loader::{FileImageLoader, ImageLoadError, ImageLoader, MemoryImageLoader};
pub use render::{
    cover_crop, encode_png, mm_to_px, render_sheet, sheet_manifest, RenderError, SheetManifest,
    PRINT_DPI,
};
pub use print::{
    execute_print, prepare_preview, FilePrintSink, PrintDocument, PrintError, PrintPreview,
    PrintSink, PrintSurface,
};
pub use hashing::{canonical_json, compute_job_hash, compute_manifest_hash};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const MIN_JOB_VERSION: &str = "1.0.0";
