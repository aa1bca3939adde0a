//! Print Dispatch - Physically Scaled Output
//!
//! Builds the preview and drives the print flow. The host print pipeline
//! honoring "100% scale" is a trusted external boundary; the instructions
//! shipped with every preview exist because this engine cannot enforce it.

use std::fs;
use std::path::PathBuf;

use log::info;
use thiserror::Error;

use crate::catalog::PaperSpec;
use crate::loader::ImageLoader;
use crate::render::{encode_png, render_sheet, RenderError};
use crate::session::LayoutSession;

#[derive(Debug, Error)]
pub enum PrintError {
    #[error("Print surface unavailable: {0}")]
    SurfaceUnavailable(String),

    #[error("Print document image failed to load: {0}")]
    DocumentImageLoad(String),

    #[error("Print command failed: {0}")]
    PrintFailed(String),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Rendered sheet plus the guidance the engine cannot enforce.
#[derive(Debug, Clone)]
pub struct PrintPreview {
    pub paper: PaperSpec,
    pub width_px: u32,
    pub height_px: u32,
    pub png: Vec<u8>,
    pub instructions: Vec<String>,
}

/// What the user must set by hand on the host side.
pub fn print_instructions(paper: &PaperSpec) -> Vec<String> {
    vec![
        format!(
            "Load {} paper ({} x {} mm).",
            paper.name, paper.width_mm, paper.height_mm
        ),
        "Set print scale to 100% (Actual size); any fit-to-page option breaks physical sizes."
            .to_string(),
        "Set printer margins to None.".to_string(),
    ]
}

/// Renders the session and encodes it losslessly for preview and print.
pub fn prepare_preview<L: ImageLoader + ?Sized>(
    session: &LayoutSession,
    loader: &L,
) -> Result<PrintPreview, PrintError> {
    let sheet = render_sheet(&session.placed, &session.paper, &session.config, loader)?;
    let (width_px, height_px) = sheet.dimensions();
    let png = encode_png(&sheet)?;
    Ok(PrintPreview {
        paper: session.paper.clone(),
        width_px,
        height_px,
        png,
        instructions: print_instructions(&session.paper),
    })
}

/// Self-contained single-page document: page size fixed to the paper's
/// physical dimensions, zero margin, the sheet image at 100% x 100%.
#[derive(Debug, Clone)]
pub struct PrintDocument {
    pub paper: PaperSpec,
    pub html: String,
}

impl PrintDocument {
    pub fn from_preview(preview: &PrintPreview) -> Self {
        let data =
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &preview.png);
        let html = format!(
            "<!DOCTYPE html>\n\
             <html>\n<head>\n<style>\n\
             @page {{ size: {width}mm {height}mm; margin: 0; }}\n\
             html, body {{ margin: 0; padding: 0; }}\n\
             img {{ display: block; width: 100%; height: 100%; }}\n\
             </style>\n</head>\n<body>\n\
             <img src=\"data:image/png;base64,{data}\" />\n\
             </body>\n</html>\n",
            width = preview.paper.width_mm,
            height = preview.paper.height_mm,
            data = data,
        );
        Self {
            paper: preview.paper.clone(),
            html,
        }
    }
}

/// One shot at a physical print. Dropping a surface closes it.
pub trait PrintSurface {
    /// Hands the document over and waits until its image is ready.
    fn load_document(&mut self, doc: &PrintDocument) -> Result<(), PrintError>;

    /// Invokes the host print command.
    fn print(&mut self) -> Result<(), PrintError>;
}

/// Opens print-capable surfaces; the host may refuse.
pub trait PrintSink {
    fn open(&mut self, paper: &PaperSpec) -> Result<Box<dyn PrintSurface>, PrintError>;
}

/// The full print flow: open, load, print, close. Any failure aborts and
/// the surface closes on drop. No retries.
pub fn execute_print(sink: &mut dyn PrintSink, preview: &PrintPreview) -> Result<(), PrintError> {
    let doc = PrintDocument::from_preview(preview);
    let mut surface = sink.open(&preview.paper)?;
    surface.load_document(&doc)?;
    surface.print()?;
    Ok(())
}

/// Writes the print document to disk for hand-off to the host's print
/// pipeline (a browser or an HTML-to-print tool).
pub struct FilePrintSink {
    dir: PathBuf,
}

impl FilePrintSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Where the document for this paper will land.
    pub fn document_path(&self, paper: &PaperSpec) -> PathBuf {
        self.dir.join(format!("print-{}.html", paper.key))
    }
}

impl PrintSink for FilePrintSink {
    fn open(&mut self, paper: &PaperSpec) -> Result<Box<dyn PrintSurface>, PrintError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| PrintError::SurfaceUnavailable(e.to_string()))?;
        Ok(Box::new(FilePrintSurface {
            path: self.document_path(paper),
            loaded: false,
        }))
    }
}

struct FilePrintSurface {
    path: PathBuf,
    loaded: bool,
}

impl PrintSurface for FilePrintSurface {
    fn load_document(&mut self, doc: &PrintDocument) -> Result<(), PrintError> {
        fs::write(&self.path, &doc.html)
            .map_err(|e| PrintError::DocumentImageLoad(e.to_string()))?;
        self.loaded = true;
        Ok(())
    }

    fn print(&mut self) -> Result<(), PrintError> {
        if !self.loaded {
            return Err(PrintError::PrintFailed("no document loaded".to_string()));
        }
        info!("print document ready at {}", self.path.display());
        Ok(())
    }
}
