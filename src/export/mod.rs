//! Exporting the staff.
//!
//! The rendered staff can be saved as a one-page PDF (or a PNG snapshot) and
//! the note list as a Standard MIDI File. Files are written into the output
//! directory under fixed names.

mod pdf;

pub use pdf::PdfWriter;

use crate::midi::notation_to_midi;
use crate::notation::NotationEvent;
use crate::render::RasterSurface;
use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Base name of every exported file.
pub const EXPORT_STEM: &str = "pentagrama";

/// Errors raised while exporting.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to build PDF: {0}")]
    Pdf(String),
    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Turns a captured image into a document.
pub trait DocumentWriter {
    /// Builds the document bytes for `image`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] if the document cannot be produced.
    fn write(&self, image: &RgbImage) -> Result<Vec<u8>, ExportError>;

    /// File extension of the produced documents, without the dot.
    fn extension(&self) -> &'static str;
}

/// Produces export bytes and writes them into the output directory.
pub struct ExportService {
    writer: Box<dyn DocumentWriter>,
    output_dir: PathBuf,
}

impl ExportService {
    pub fn new<P: AsRef<Path>>(writer: Box<dyn DocumentWriter>, output_dir: P) -> Self {
        Self {
            writer,
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Captures `surface` and wraps it in a document.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Pdf`] if the document cannot be built.
    pub fn export_pdf(&self, surface: &RasterSurface) -> Result<Vec<u8>, ExportError> {
        self.writer.write(&surface.capture())
    }

    /// Encodes the notes as a single-track MIDI file, one sequential note
    /// per event.
    pub fn export_midi(&self, events: &[NotationEvent]) -> Vec<u8> {
        notation_to_midi(events)
    }

    /// Writes `pentagrama.<ext>` into the output directory.
    ///
    /// # Returns
    ///
    /// The path of the written file.
    pub fn save_pdf(&self, surface: &RasterSurface) -> Result<PathBuf, ExportError> {
        let bytes = self.export_pdf(surface)?;
        self.save(self.writer.extension(), &bytes)
    }

    /// Writes `pentagrama.mid` into the output directory.
    pub fn save_midi(&self, events: &[NotationEvent]) -> Result<PathBuf, ExportError> {
        let bytes = self.export_midi(events);
        self.save("mid", &bytes)
    }

    /// Writes `pentagrama.png` into the output directory.
    pub fn save_png(&self, surface: &RasterSurface) -> Result<PathBuf, ExportError> {
        let bytes = surface.encode_png()?;
        self.save("png", &bytes)
    }

    fn save(&self, extension: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self
            .output_dir
            .join(format!("{}.{}", EXPORT_STEM, extension));
        fs::write(&path, bytes)?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "Exported");
        Ok(path)
    }
}
