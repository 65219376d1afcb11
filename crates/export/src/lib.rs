pub mod sink;
pub mod tsv;

pub use sink::{export, ExportSink, WriterSink};
#[cfg(feature = "clipboard")]
pub use sink::ClipboardSink;
pub use tsv::{to_tsv_string, write_tsv};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Clipboard error: {0}")]
    Clipboard(String),
}
