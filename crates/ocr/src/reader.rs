use std::path::Path;

use meisai_core::Page;

use crate::recognizer::{OcrBackend, OcrError};

/// Owns one OCR backend and turns image paths into [`Page`]s.
pub struct OcrReader<B: OcrBackend> {
    backend: B,
}

impl<B: OcrBackend> OcrReader<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn read(&self, path: &Path) -> Result<Page, OcrError> {
        std::fs::metadata(path).map_err(|source| OcrError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let boxes = self.backend.recognize(path)?;
        tracing::info!("Recognized {} text boxes in {}", boxes.len(), path.display());
        Ok(Page::new(boxes))
    }
}
