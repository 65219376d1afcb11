use std::path::{Path, PathBuf};

use meisai_core::TransactionList;
use thiserror::Error;

use crate::convert::{ConvertError, PageConverter};
use crate::reader::OcrReader;
use crate::recognizer::{OcrBackend, OcrError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("OCR failed for {path}: {source}")]
    Ocr {
        path: PathBuf,
        #[source]
        source: OcrError,
    },
    #[error("Could not extract transactions from {path}: {source}")]
    Convert {
        path: PathBuf,
        #[source]
        source: ConvertError,
    },
}

/// Orchestrates: read image → convert page → accumulate.
pub struct StatementPipeline<B: OcrBackend> {
    reader: OcrReader<B>,
    converter: PageConverter,
}

impl<B: OcrBackend> StatementPipeline<B> {
    pub fn new(reader: OcrReader<B>, converter: PageConverter) -> Self {
        Self { reader, converter }
    }

    /// Process a single image.
    pub fn process_file(&self, path: &Path) -> Result<TransactionList, PipelineError> {
        let page = self.reader.read(path).map_err(|source| PipelineError::Ocr {
            path: path.to_path_buf(),
            source,
        })?;
        let list = self
            .converter
            .read_to_transactions(&page)
            .map_err(|source| PipelineError::Convert {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::info!("Extracted {} transactions from {}", list.len(), path.display());
        Ok(list)
    }

    /// Process images in order, concatenating their transactions.
    /// The first failing image aborts the whole batch.
    pub fn process_all<P: AsRef<Path>>(&self, paths: &[P]) -> Result<TransactionList, PipelineError> {
        let mut all = TransactionList::new();
        for path in paths {
            all.extend(self.process_file(path.as_ref())?);
        }
        Ok(all)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
